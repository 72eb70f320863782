//! Rewriting fetched HTML into a self-describing UTF-8 snapshot

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, WINDOWS_1252};
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

use crate::utils::DEFAULT_SNAPSHOT_CHARSET;

/// Decode `bytes` with `charset`, point relative links at `source_url` and
/// declare the document as UTF-8
///
/// A `<base href>` is appended to `<head>`, every `<meta http-equiv=
/// "content-type">` is removed and a UTF-8 declaration for `mime_type` becomes
/// the first child of `<head>`. Returns the re-serialized UTF-8 bytes.
pub fn rewrite_snapshot(
    bytes: &[u8],
    charset: Option<&str>,
    mime_type: &str,
    source_url: &str,
) -> Result<Vec<u8>> {
    let label = charset.unwrap_or(DEFAULT_SNAPSHOT_CHARSET);
    let encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        log::debug!("Unknown charset {label}, decoding snapshot as windows-1252");
        WINDOWS_1252
    });
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::debug!("Snapshot of {source_url} contained malformed {label} sequences");
    }

    let document = kuchiki::parse_html().one(text.into_owned());
    let head = head_of(&document)?;

    // Collect before detaching
    let content_type_metas: Vec<NodeRef> = document
        .select("meta[http-equiv]")
        .map_err(|()| anyhow!("Invalid CSS selector: meta[http-equiv]"))?
        .filter(|meta| {
            meta.attributes
                .borrow()
                .get("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"))
        })
        .map(|meta| meta.as_node().clone())
        .collect();
    for meta in content_type_metas {
        meta.detach();
    }

    let declaration = format!("{mime_type}; charset=UTF-8");
    let fragment = kuchiki::parse_html().one(format!(
        "<meta http-equiv=\"Content-Type\" content=\"{}\"><base href=\"{}\">",
        html_escape::encode_double_quoted_attribute(&declaration),
        html_escape::encode_double_quoted_attribute(source_url),
    ));
    let base = take_first(&fragment, "base")?;
    let meta = take_first(&fragment, "meta")?;
    head.append(base);
    head.prepend(meta);

    let mut output = Vec::new();
    document
        .serialize(&mut output)
        .context("Failed to serialize HTML snapshot")?;
    Ok(output)
}

fn head_of(document: &NodeRef) -> Result<NodeRef> {
    if let Ok(head) = document.select_first("head") {
        return Ok(head.as_node().clone());
    }
    // The HTML parser always synthesizes <head>; documents built otherwise may lack it
    let html = document
        .select_first("html")
        .map_err(|()| anyhow!("Snapshot has no document element"))?;
    let fragment = kuchiki::parse_html().one("<head></head>");
    let head = take_first(&fragment, "head")?;
    html.as_node().prepend(head.clone());
    Ok(head)
}

fn take_first(fragment: &NodeRef, selector: &str) -> Result<NodeRef> {
    let node = fragment
        .select_first(selector)
        .map_err(|()| anyhow!("Failed to build <{selector}> element"))?
        .as_node()
        .clone();
    node.detach();
    Ok(node)
}
