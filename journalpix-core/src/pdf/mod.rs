//! PDF backend for [`DocumentReader`], built on `lopdf`.
//!
//! Text is rebuilt line by line from each page's content stream; images come
//! from a walk over the page's `/XObject` resources. The two never share state,
//! so [`DocumentReader::page`] pairs them per page.

mod images;
mod text;

use crate::page::{DocumentReader, PageImage};
use anyhow::{Context, Result, anyhow};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Upper bound on `/Parent` hops while looking for inherited resources.
const MAX_PARENT_DEPTH: usize = 32;

pub struct PdfDocument {
    doc: Document,
    /// Page objects in document order.
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| anyhow!("page {index} is out of range ({} pages)", self.pages.len()))
    }

    /// The page's `/XObject` dictionary, inherited from an ancestor when the page has none.
    fn xobjects(&self, page_id: ObjectId) -> Result<Option<&Dictionary>> {
        let mut node = self.doc.get_dictionary(page_id)?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                let resources = self.resolve(resources)?.as_dict()?;
                if let Ok(xobjects) = resources.get(b"XObject") {
                    return Ok(Some(self.resolve(xobjects)?.as_dict()?));
                }
            }
            match node.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => node = self.doc.get_dictionary(parent)?,
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        Ok(self.doc.dereference(object)?.1)
    }
}

impl DocumentReader for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let page_id = self.page_id(index)?;
        text::page_text(&self.doc, page_id)
            .with_context(|| format!("extracting text of page {index}"))
    }

    fn page_images(&self, index: usize) -> Result<Vec<PageImage>> {
        let page_id = self.page_id(index)?;
        let Some(xobjects) = self
            .xobjects(page_id)
            .with_context(|| format!("reading resources of page {index}"))?
        else {
            return Ok(Vec::new());
        };
        images::collect(self, xobjects).with_context(|| format!("reading images of page {index}"))
    }
}
