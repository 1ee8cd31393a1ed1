//! Derives entry fields from the text and images of a single page.
//!
//! Every page of the export follows the same layout:
//!
//! ```text
//! <running header>
//! <entry title>            (or "Notes" on a continuation page)
//! By <author> - ...
//! ... - Added 05 Jan 2020 09:15 AM
//! Notes
//! <note lines ...>
//! <footer>
//! ```

use crate::dates::parse_added_timestamp;
use crate::page::{PageImage, PageView};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Marker line that opens the free-text note section.
pub const NOTES_MARKER: &str = "Notes";

static AUTHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"By (.*?) -").expect("valid regex"));
static ADDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- Added (.. ... .... ..:.. ..)").expect("valid regex"));

/// Fields found on one page. `None` means the page says nothing about that field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageFields {
    pub title: Option<String>,
    pub note: Option<String>,
    pub author: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
    pub images: Vec<PageImage>,
}

/// Extracts every field the page carries.
///
/// # Arguments
///
/// * `page` - The page view. Its images are moved into the result, minus the
///   leading avatar.
///
/// # Returns
///
/// An error only when a `- Added` timestamp is present but malformed. Fields
/// that are simply missing are left as `None`.
pub fn extract_fields(page: PageView) -> Result<PageFields> {
    let lines = content_lines(&page.text);
    let captured_at = parse_captured_at(&page.text)
        .with_context(|| format!("reading capture time on page {}", page.index))?;

    Ok(PageFields {
        title: parse_title(&lines),
        note: parse_note(&lines),
        author: parse_author(&page.text),
        captured_at,
        images: content_images(page.images),
    })
}

/// Splits page text into lines, dropping the running header on the first line.
pub fn content_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .skip(1)
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

/// The first content line is the entry title, unless the page is a continuation
/// page that opens straight into the note section.
pub fn parse_title(lines: &[&str]) -> Option<String> {
    match lines.first() {
        Some(&line) if line != NOTES_MARKER => Some(line.to_string()),
        _ => None,
    }
}

/// Joins every line between the `Notes` marker and the page footer (the last line).
///
/// A marker with nothing between it and the footer yields an empty note, which
/// still counts as a note being present.
pub fn parse_note(lines: &[&str]) -> Option<String> {
    let marker = lines.iter().position(|&line| line == NOTES_MARKER)?;
    let body_start = marker + 1;
    let body_end = lines.len().saturating_sub(1).max(body_start);
    Some(lines[body_start..body_end].join(" "))
}

/// Name between `By ` and the next ` -` on the author line.
pub fn parse_author(text: &str) -> Option<String> {
    AUTHOR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
}

/// Capture time from the first `- Added DD Mon YYYY HH:MM AM|PM` on the page.
pub fn parse_captured_at(text: &str) -> Result<Option<NaiveDateTime>> {
    match ADDED_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(stamp) => parse_added_timestamp(stamp.as_str()).map(Some),
        None => Ok(None),
    }
}

/// Every image except the leading avatar.
pub fn content_images(images: Vec<PageImage>) -> Vec<PageImage> {
    images.into_iter().skip(1).collect()
}
