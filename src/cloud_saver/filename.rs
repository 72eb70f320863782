//! Destination filenames derived from item metadata

use once_cell::sync::Lazy;
use regex::Regex;

use crate::item_model::{Attachment, Item};
use crate::utils::{DEFAULT_ATTACHMENT_BASENAME, FILENAME_TITLE_CHARS};

static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("Invalid year regex"));

/// `"{creators} - {year} - {title}"`, skipping the parts the item lacks
///
/// One creator gives their surname, two give `"A and B"`, more give
/// `"A et al."`. The title is cut to its first 50 characters.
#[must_use]
pub fn base_name(item: &Item) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);

    let surname = |i: usize| {
        item.creators
            .get(i)
            .and_then(|c| c.surname())
            .unwrap_or_default()
    };
    match item.creators.len() {
        0 => {}
        1 => parts.push(surname(0).to_string()),
        2 => parts.push(format!("{} and {}", surname(0), surname(1))),
        _ => parts.push(format!("{} et al.", surname(0))),
    }

    if let Some(date) = item.date.as_deref()
        && let Some(year) = YEAR_REGEX.captures(date).and_then(|c| c.get(1))
    {
        parts.push(year.as_str().to_string());
    }

    if let Some(title) = item.title.as_deref().filter(|t| !t.is_empty()) {
        parts.push(title.chars().take(FILENAME_TITLE_CHARS).collect());
    }

    let joined = parts.join(" - ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        DEFAULT_ATTACHMENT_BASENAME.to_string()
    } else {
        sanitize_filename::sanitize(trimmed)
    }
}

/// Filename for `attachment` given the item's base name
#[must_use]
pub fn attachment_filename(base_name: &str, attachment: &Attachment) -> String {
    match attachment.mime().as_deref() {
        Some("application/pdf") => format!("{base_name}.pdf"),
        Some("text/html" | "application/xhtml+xml") => format!("{base_name}.html"),
        _ => base_name.to_string(),
    }
}
