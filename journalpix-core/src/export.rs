//! Walks a document page by page, assembling entries and emitting their photographs.

use crate::accumulator::EntryAccumulator;
use crate::config::Config;
use crate::dates::truncate_to_minute;
use crate::entry::{CompletedEntry, Entry};
use crate::page::DocumentReader;
use crate::parse_page::extract_fields;
use crate::paths::image_file_name;
use crate::pdf::PdfDocument;
use crate::sink::{DryRunSink, Exiftool, FsImageSink, ImageRecord, ImageSink};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// An entry whose photographs were handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEntry {
    pub title: String,
    pub author: String,
    pub note: String,
    pub captured_at: NaiveDateTime,
    /// Zero-based index of the page on which the entry became complete.
    pub page_index: usize,
    pub files: Vec<PathBuf>,
}

/// Outcome of a full pass over a document.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub pages_scanned: usize,
    pub entries: Vec<EmittedEntry>,
    /// True when the document ended with an entry still missing fields.
    pub unfinished: bool,
}

impl ExportSummary {
    pub fn image_count(&self) -> usize {
        self.entries.iter().map(|e| e.files.len()).sum()
    }
}

/// Scans pages from `start_page` (zero-based) to the end, emitting every entry
/// as soon as it becomes complete.
///
/// Pages are processed strictly in document order. An entry that is still
/// incomplete when the pages run out is dropped.
pub fn export_pages(
    reader: &dyn DocumentReader,
    sink: &mut dyn ImageSink,
    start_page: usize,
) -> Result<ExportSummary> {
    let mut accumulator = EntryAccumulator::new();
    let mut summary = ExportSummary::default();

    for index in start_page..reader.page_count() {
        let page = reader
            .page(index)
            .with_context(|| format!("reading page {index}"))?;
        let fields = extract_fields(page)?;
        accumulator.update(fields);
        summary.pages_scanned += 1;
        tracing::debug!(page = index, entry = %accumulator.current(), "merged page");

        if !accumulator.is_valid() {
            continue;
        }
        if let Some(entry) = accumulator.reset().into_completed() {
            let files = emit_entry(&entry, sink)
                .with_context(|| format!("writing images of '{}'", entry.title))?;
            tracing::debug!(page = index, entry = %entry, "emitted entry");
            summary.entries.push(EmittedEntry {
                title: entry.title,
                author: entry.author,
                note: entry.note,
                captured_at: entry.captured_at,
                page_index: index,
                files,
            });
        }
    }

    if accumulator.current() != &Entry::default() {
        tracing::debug!(entry = %accumulator.current(), "dropping incomplete entry at end of document");
        summary.unfinished = true;
    }

    Ok(summary)
}

/// Hands every image of `entry` to the sink, in identifier order.
pub fn emit_entry(entry: &CompletedEntry, sink: &mut dyn ImageSink) -> Result<Vec<PathBuf>> {
    let caption = entry.signed_caption();
    let taken_at = truncate_to_minute(entry.captured_at);

    entry
        .images
        .iter()
        .map(|(id, data)| {
            let file_name = image_file_name(&entry.title, id);
            sink.write_image(&ImageRecord {
                file_name: &file_name,
                data,
                caption: &caption,
                taken_at,
            })
        })
        .collect()
}

/// Runs a whole export as described by a [`Config`].
#[derive(Debug)]
pub struct Exporter {
    pub config: Config,
}

impl Exporter {
    /// Creates an `Exporter`, loading configuration from standard paths.
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(Config::load()?))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Opens the configured PDF and writes every complete entry to the output directory.
    ///
    /// With `dry_run` set nothing is written; the summary lists the files that
    /// would have been created.
    pub fn run(&self, dry_run: bool) -> Result<ExportSummary> {
        let document = PdfDocument::open(&self.config.input)?;
        tracing::debug!(
            input = %self.config.input.display(),
            pages = document.page_count(),
            start_page = self.config.start_page,
            "opened document"
        );

        let mut sink: Box<dyn ImageSink> = if dry_run {
            Box::new(DryRunSink::new(self.config.output_dir.clone()))
        } else {
            let tagger = self
                .config
                .tag_captions
                .then(|| Exiftool::new(self.config.exiftool.clone()));
            Box::new(FsImageSink::new(self.config.output_dir.clone(), tagger)?)
        };

        export_pages(&document, sink.as_mut(), self.config.start_page)
    }
}
