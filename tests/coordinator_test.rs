//! Destination fallback rules of SaveCoordinator

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use citesave::{Item, SaveCoordinator, SaveDestination, SaveError, SaveOutcome, SaveResult, Session};
use common::{DoneRecorder, RecordingSink};
use futures::future::BoxFuture;

struct Stub {
    name: &'static str,
    calls: AtomicUsize,
    result: SaveResult<SaveOutcome>,
}

impl Stub {
    fn new(name: &'static str, result: SaveResult<SaveOutcome>) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
            result,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SaveDestination for Stub {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_save<'a>(&'a self, _items: Vec<Item>, _session: &'a Session) -> BoxFuture<'a, SaveResult<SaveOutcome>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.result.clone();
        Box::pin(async move { result })
    }
}

fn outcome(tag: &str) -> SaveResult<SaveOutcome> {
    let item = Item::new("book").with_title(tag);
    Ok(SaveOutcome {
        items: vec![item.clone()],
        done: vec![item],
    })
}

async fn run(local: &Arc<Stub>, cloud: &Arc<Stub>) -> (SaveResult<Vec<Item>>, Arc<DoneRecorder>) {
    let coordinator = SaveCoordinator::with_destinations(local.clone(), cloud.clone());
    let done = DoneRecorder::new();
    let result = coordinator
        .save_items(vec![Item::new("book")], "s1", RecordingSink::new(), done.clone())
        .await;
    (result, done)
}

#[tokio::test]
async fn unreachable_local_falls_back_once() {
    let local = Stub::new("local", Err(SaveError::Unreachable("connection refused".into())));
    let cloud = Stub::new("cloud", outcome("cloud"));

    let (result, done) = run(&local, &cloud).await;

    let items = result.unwrap();
    assert_eq!(items[0].title.as_deref(), Some("cloud"));
    assert_eq!((local.calls(), cloud.calls()), (1, 1));
    assert_eq!(done.calls.lock().len(), 1);
}

#[tokio::test]
async fn successful_local_save_never_touches_cloud() {
    let local = Stub::new("local", outcome("local"));
    let cloud = Stub::new("cloud", outcome("cloud"));

    let (result, done) = run(&local, &cloud).await;

    assert_eq!(result.unwrap()[0].title.as_deref(), Some("local"));
    assert_eq!(cloud.calls(), 0);
    assert_eq!(done.calls.lock().len(), 1);
}

#[tokio::test]
async fn reached_but_failing_local_never_falls_back() {
    let errors = [
        SaveError::Rejected {
            status: 409,
            message: "Collection is read-only".into(),
            value: None,
        },
        SaveError::Timeout("sessionProgress".into()),
        SaveError::Http {
            status: 500,
            url: "http://127.0.0.1:23119/connector/saveItems".into(),
        },
        SaveError::InvalidResponse("garbage".into()),
    ];
    for error in errors {
        let local = Stub::new("local", Err(error.clone()));
        let cloud = Stub::new("cloud", outcome("cloud"));

        let (result, done) = run(&local, &cloud).await;

        assert_eq!(result.unwrap_err().to_string(), error.to_string());
        assert_eq!(cloud.calls(), 0, "{error}");
        assert!(done.calls.lock().is_empty());
    }
}

#[tokio::test]
async fn cloud_error_after_fallback_surfaces() {
    let local = Stub::new("local", Err(SaveError::Unreachable("connection refused".into())));
    let cloud = Stub::new(
        "cloud",
        Err(SaveError::Rejected {
            status: 403,
            message: "Not authorized".into(),
            value: None,
        }),
    );

    let (result, done) = run(&local, &cloud).await;

    assert_eq!(result.unwrap_err().status(), Some(403));
    assert!(done.calls.lock().is_empty());
}
