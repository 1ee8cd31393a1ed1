use crate::page::{PageImage, PageView};
use crate::sink::{ImageRecord, ImageSink};
use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Test helper to build a page whose image payloads are the identifiers' bytes.
pub fn page(index: usize, text: &str, image_ids: &[&str]) -> PageView {
    let images = image_ids
        .iter()
        .map(|id| PageImage::new(*id, id.as_bytes().to_vec()))
        .collect();
    PageView::pair(index, text.to_string(), images)
}

/// An owned copy of an [`ImageRecord`].
#[derive(Debug, Clone)]
pub struct RecordedImage {
    pub file_name: String,
    pub data: Vec<u8>,
    pub caption: String,
    pub taken_at: NaiveDateTime,
}

/// Sink that keeps every image it receives in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<RecordedImage>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            records: Vec::new(),
            fail: true,
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.file_name.clone()).collect()
    }
}

impl ImageSink for RecordingSink {
    fn write_image(&mut self, image: &ImageRecord<'_>) -> Result<PathBuf> {
        if self.fail {
            bail!("disk full");
        }
        self.records.push(RecordedImage {
            file_name: image.file_name.to_string(),
            data: image.data.to_vec(),
            caption: image.caption.to_string(),
            taken_at: image.taken_at,
        });
        Ok(PathBuf::from(image.file_name))
    }
}
