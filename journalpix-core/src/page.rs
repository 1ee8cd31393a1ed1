//! The per-page view consumed by the field extractor, and the reader capability that produces it.

use anyhow::{Result, bail};

/// An image embedded in a page, keyed by its identifier within the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub id: String,
    pub data: Vec<u8>,
}

impl PageImage {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }
}

/// Text and images of a single page, in document order.
///
/// The first image of every page is the decorative avatar printed next to the
/// author line and never belongs to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// Zero-based position of the page in the document.
    pub index: usize,
    pub text: String,
    pub images: Vec<PageImage>,
}

impl PageView {
    pub fn pair(index: usize, text: String, images: Vec<PageImage>) -> Self {
        Self {
            index,
            text,
            images,
        }
    }
}

/// Read access to a paginated document.
pub trait DocumentReader {
    fn page_count(&self) -> usize;
    /// Plain text of the page at `index`, lines separated by `\n`.
    fn page_text(&self, index: usize) -> Result<String>;
    /// Embedded images of the page at `index`, in the order the page declares them.
    fn page_images(&self, index: usize) -> Result<Vec<PageImage>>;

    fn page(&self, index: usize) -> Result<PageView> {
        let text = self.page_text(index)?;
        let images = self.page_images(index)?;
        Ok(PageView::pair(index, text, images))
    }
}

/// A document that is already fully loaded in memory.
impl DocumentReader for Vec<PageView> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        match self.get(index) {
            Some(page) => Ok(page.text.clone()),
            None => bail!("page {index} is out of range ({} pages)", self.len()),
        }
    }

    fn page_images(&self, index: usize) -> Result<Vec<PageImage>> {
        match self.get(index) {
            Some(page) => Ok(page.images.clone()),
            None => bail!("page {index} is out of range ({} pages)", self.len()),
        }
    }
}
