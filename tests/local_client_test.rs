//! LocalClientSaver against a mock desktop application

mod common;

use std::sync::Arc;

use citesave::save_context::PageCapture;
use citesave::utils::{LOST_CONNECTION_MESSAGE, OA_NOT_FOUND_TITLE};
use citesave::{
    Attachment, AttachmentProgress, Item, SaveContext, SaveCoordinator, SaveResult,
};
use common::{CLOSED_PORT_URL, DoneRecorder, RecordingSink, init_tracing, journal_article, test_config};
use futures::future::BoxFuture;
use mockito::{Matcher, Server};
use parking_lot::Mutex;
use serde_json::{Value, json};

const JSON: &str = "application/json";

struct FixedCapture;

impl PageCapture for FixedCapture {
    fn capture(&self) -> BoxFuture<'_, SaveResult<Vec<u8>>> {
        Box::pin(async { Ok(b"<html><body>captured</body></html>".to_vec()) })
    }
}

async fn mock_upload_destination(server: &mut Server, files_editable: bool) {
    mock_ping(server, json!({ "supportsAttachmentUpload": true })).await;
    server
        .mock("POST", "/connector/getSelectedCollection")
        .with_header("content-type", JSON)
        .with_body(json!({ "filesEditable": files_editable }).to_string())
        .create_async()
        .await;
}

fn last_failure(reports: &[AttachmentProgress]) -> Option<&str> {
    match reports.last() {
        Some(AttachmentProgress::Failed(reason)) => Some(reason.as_str()),
        _ => None,
    }
}

async fn mock_ping(server: &mut Server, prefs: Value) -> mockito::Mock {
    server
        .mock("POST", "/connector/ping")
        .with_header("content-type", JSON)
        .with_body(json!({ "prefs": prefs }).to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn polled_progress_reaches_callbacks_once() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({ "supportsAttachmentUpload": false })).await;
    let save = server
        .mock("POST", "/connector/saveItems")
        .match_body(Matcher::PartialJson(json!({ "sessionID": "s1" })))
        .with_status(201)
        .with_header("content-type", JSON)
        .with_body(r#"{"items":[]}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/sessionProgress")
        .with_header("content-type", JSON)
        .with_body(
            json!({
                "items": [{ "id": "i1", "attachments": [{ "id": "a1", "progress": 100 }] }],
                "done": true
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let context = SaveContext::new(format!("{}/article", server.url()));
    let coordinator = SaveCoordinator::new(config, context).unwrap();
    let progress = RecordingSink::new();
    let done = DoneRecorder::new();

    let items = coordinator
        .save_items(
            vec![journal_article("https://x/file.pdf")],
            "s1",
            progress.clone(),
            done.clone(),
        )
        .await
        .unwrap();

    save.assert_async().await;
    assert_eq!(items.len(), 1);
    assert_eq!(progress.all(), vec![("a1".to_string(), AttachmentProgress::Percent(100))]);
    let calls = done.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0][0].title.as_deref(), Some("T"));
    assert!(calls[0][0].attachments.is_empty());
}

#[tokio::test]
async fn failed_poll_fails_outstanding_attachments() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({})).await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/sessionProgress")
        .with_header("content-type", JSON)
        .with_body(
            json!({
                "items": [{ "id": "i1", "attachments": [{ "id": "a1", "progress": 40 }] }],
                "done": false
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/sessionProgress")
        .with_status(500)
        .create_async()
        .await;

    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/article")).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(
            vec![journal_article("https://x/file.pdf")],
            "s1",
            progress.clone(),
            DoneRecorder::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        progress.for_attachment("a1"),
        vec![
            AttachmentProgress::Percent(40),
            AttachmentProgress::Failed(LOST_CONNECTION_MESSAGE.to_string()),
        ]
    );
}

#[tokio::test]
async fn missing_session_progress_falls_back_to_attachment_progress() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({})).await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/sessionProgress")
        .with_status(404)
        .create_async()
        .await;
    let legacy = server
        .mock("POST", "/connector/attachmentProgress")
        .match_body(Matcher::Json(json!(["a1"])))
        .with_header("content-type", JSON)
        .with_body("[100]")
        .expect(1)
        .create_async()
        .await;

    let item = Item::new("book")
        .with_title("T")
        .with_attachment(Attachment::new("https://x/file.pdf", "application/pdf").with_id("a1"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/book")).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(vec![item], "s1", progress.clone(), DoneRecorder::new())
        .await
        .unwrap();

    legacy.assert_async().await;
    assert_eq!(progress.for_attachment("a1"), vec![AttachmentProgress::DONE]);
}

#[tokio::test]
async fn snapshot_travels_through_single_file_call() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({})).await;
    let payload: Arc<Mutex<Option<Value>>> = Arc::default();
    let captured = Arc::clone(&payload);
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .with_body_from_request(move |request| {
            let body = request.body().cloned().unwrap_or_default();
            *captured.lock() = serde_json::from_slice(&body).ok();
            Vec::new()
        })
        .create_async()
        .await;
    let single_file = server
        .mock("POST", "/connector/saveSingleFile")
        .match_body(Matcher::PartialJson(json!({ "sessionID": "s1" })))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/sessionProgress")
        .with_header("content-type", JSON)
        .with_body(r#"{"items":[],"done":true}"#)
        .create_async()
        .await;

    let page = format!("{}/article", server.url());
    let item = Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(&page, "text/html").with_id("snap"))
        .with_attachment(Attachment::new("https://x/file.pdf", "application/pdf").with_id("pdf"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let context = SaveContext::new(&page).with_capture(Arc::new(FixedCapture));
    let coordinator = SaveCoordinator::new(config, context).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(vec![item], "s1", progress.clone(), DoneRecorder::new())
        .await
        .unwrap();

    single_file.assert_async().await;
    let payload = payload.lock().clone().expect("saveItems body");
    assert_eq!(payload["singleFile"], true);
    let attachments = payload["items"][0]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["mimeType"], "application/pdf");
    assert_eq!(
        progress.for_attachment("snap"),
        vec![AttachmentProgress::Percent(0), AttachmentProgress::DONE]
    );
}

#[tokio::test]
async fn uploads_attachments_when_application_accepts_them() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({ "supportsAttachmentUpload": true })).await;
    server
        .mock("POST", "/connector/getSelectedCollection")
        .with_header("content-type", JSON)
        .with_body(r#"{"id":"C1","name":"Library","filesEditable":true}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("GET", "/file.pdf")
        .with_header("content-type", "application/pdf")
        .with_body("%PDF-1.4 test")
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/connector/saveAttachment")
        .match_query(Matcher::UrlEncoded("sessionID".into(), "s1".into()))
        .match_header("content-type", "application/pdf")
        .match_header("x-metadata", Matcher::Regex(r#""id":"a1""#.into()))
        .match_body("%PDF-1.4 test")
        .with_status(201)
        .expect(1)
        .create_async()
        .await;
    let oa = server
        .mock("POST", "/connector/hasOAAttachments")
        .expect(0)
        .create_async()
        .await;

    let pdf_url = format!("{}/file.pdf", server.url());
    let item = Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(&pdf_url, "application/pdf").with_id("a1"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new(format!("{}/article", server.url()))).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(vec![item], "s1", progress.clone(), DoneRecorder::new())
        .await
        .unwrap();

    upload.assert_async().await;
    oa.assert_async().await;
    assert_eq!(
        progress.for_attachment("a1"),
        vec![
            AttachmentProgress::Percent(0),
            AttachmentProgress::Percent(50),
            AttachmentProgress::DONE,
        ]
    );
}

#[tokio::test]
async fn open_access_search_runs_for_items_without_full_text() {
    let mut server = Server::new_async().await;
    mock_ping(&mut server, json!({ "supportsAttachmentUpload": true })).await;
    server
        .mock("POST", "/connector/getSelectedCollection")
        .with_header("content-type", JSON)
        .with_body(r#"{"filesEditable":true}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/hasOAAttachments")
        .with_header("content-type", JSON)
        .with_body("true")
        .create_async()
        .await;
    server
        .mock("POST", "/connector/saveOAAttachment")
        .with_header("content-type", JSON)
        .with_body(r#""Accepted Version""#)
        .create_async()
        .await;

    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/article")).unwrap();
    let progress = RecordingSink::new();

    let items = coordinator
        .save_items(
            vec![Item::new("journalArticle").with_title("T")],
            "s1",
            progress.clone(),
            DoneRecorder::new(),
        )
        .await
        .unwrap();

    let reports: Vec<_> = progress.all().into_iter().map(|(_, p)| p).collect();
    assert_eq!(reports, vec![AttachmentProgress::Percent(0), AttachmentProgress::DONE]);
    assert_eq!(items[0].attachments.len(), 1);
    assert_eq!(items[0].attachments[0].title.as_deref(), Some("Accepted Version"));
}

#[tokio::test]
async fn failed_primary_ends_failed_when_another_primary_succeeds() {
    init_tracing();
    let mut server = Server::new_async().await;
    mock_upload_destination(&mut server, true).await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server.mock("GET", "/bad.pdf").with_status(404).create_async().await;
    server
        .mock("GET", "/good.pdf")
        .with_header("content-type", "application/pdf")
        .with_body("%PDF-1.4 good")
        .create_async()
        .await;
    server
        .mock("POST", "/connector/saveAttachment")
        .match_query(Matcher::Any)
        .with_status(201)
        .create_async()
        .await;
    let oa = server
        .mock("POST", "/connector/hasOAAttachments")
        .expect(0)
        .create_async()
        .await;

    let item = Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(format!("{}/bad.pdf", server.url()), "application/pdf").with_id("bad"))
        .with_attachment(Attachment::new(format!("{}/good.pdf", server.url()), "application/pdf").with_id("good"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/article")).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(vec![item], "s1", progress.clone(), DoneRecorder::new())
        .await
        .unwrap();

    oa.assert_async().await;
    let bad = progress.for_attachment("bad");
    assert_eq!(bad.first(), Some(&AttachmentProgress::Percent(0)));
    assert!(last_failure(&bad).is_some(), "{bad:?}");
    assert_eq!(progress.for_attachment("good").last(), Some(&AttachmentProgress::DONE));
}

#[tokio::test]
async fn every_failed_primary_ends_failed_after_empty_open_access_search() {
    init_tracing();
    let mut server = Server::new_async().await;
    mock_upload_destination(&mut server, true).await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server.mock("GET", "/first.pdf").with_status(404).create_async().await;
    server.mock("GET", "/second.pdf").with_status(404).create_async().await;
    let has_oa = server
        .mock("POST", "/connector/hasOAAttachments")
        .with_header("content-type", JSON)
        .with_body("false")
        .expect(1)
        .create_async()
        .await;
    let save_oa = server
        .mock("POST", "/connector/saveOAAttachment")
        .expect(0)
        .create_async()
        .await;

    let item = Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(format!("{}/first.pdf", server.url()), "application/pdf").with_id("first"))
        .with_attachment(Attachment::new(format!("{}/second.pdf", server.url()), "application/pdf").with_id("second"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/article")).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(vec![item], "s1", progress.clone(), DoneRecorder::new())
        .await
        .unwrap();

    has_oa.assert_async().await;
    save_oa.assert_async().await;
    assert_eq!(last_failure(&progress.for_attachment("first")), Some(OA_NOT_FOUND_TITLE));
    let second = progress.for_attachment("second");
    assert_eq!(second.first(), Some(&AttachmentProgress::Percent(0)));
    assert!(
        last_failure(&second).is_some_and(|reason| reason != OA_NOT_FOUND_TITLE),
        "{second:?}"
    );
}

#[tokio::test]
async fn empty_open_access_search_fails_placeholder() {
    let mut server = Server::new_async().await;
    mock_upload_destination(&mut server, true).await;
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("POST", "/connector/hasOAAttachments")
        .with_header("content-type", JSON)
        .with_body("false")
        .create_async()
        .await;

    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let coordinator = SaveCoordinator::new(config, SaveContext::new("https://x/article")).unwrap();
    let progress = RecordingSink::new();

    coordinator
        .save_items(
            vec![Item::new("journalArticle").with_title("T")],
            "s1",
            progress.clone(),
            DoneRecorder::new(),
        )
        .await
        .unwrap();

    let reports: Vec<_> = progress.all().into_iter().map(|(_, p)| p).collect();
    assert_eq!(
        reports,
        vec![
            AttachmentProgress::Percent(0),
            AttachmentProgress::Failed(OA_NOT_FOUND_TITLE.to_string()),
        ]
    );
}

#[tokio::test]
async fn locked_collection_gets_no_single_file_flag() {
    let mut server = Server::new_async().await;
    mock_upload_destination(&mut server, false).await;
    let payload: Arc<Mutex<Option<Value>>> = Arc::default();
    let captured = Arc::clone(&payload);
    server
        .mock("POST", "/connector/saveItems")
        .with_status(201)
        .with_body_from_request(move |request| {
            let body = request.body().cloned().unwrap_or_default();
            *captured.lock() = serde_json::from_slice(&body).ok();
            Vec::new()
        })
        .create_async()
        .await;
    let single_file = server
        .mock("POST", "/connector/saveSingleFile")
        .expect(0)
        .create_async()
        .await;

    let page = format!("{}/article", server.url());
    let item = Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(&page, "text/html").with_id("snap"));
    let config = test_config(&server.url(), CLOSED_PORT_URL);
    let context = SaveContext::new(&page).with_capture(Arc::new(FixedCapture));
    let coordinator = SaveCoordinator::new(config, context).unwrap();

    coordinator
        .save_items(vec![item], "s1", RecordingSink::new(), DoneRecorder::new())
        .await
        .unwrap();

    single_file.assert_async().await;
    let payload = payload.lock().clone().expect("saveItems body");
    assert!(payload.get("singleFile").is_none(), "{payload}");
}
