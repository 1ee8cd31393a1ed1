use crate::entry::Entry;
use crate::parse_page::PageFields;
use std::mem;

/// Merges page fields into the entry currently being assembled.
///
/// Scalar fields take the value from the most recent page that carries them.
/// Images accumulate until the entry is handed off with [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct EntryAccumulator {
    current: Entry,
}

impl EntryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, fields: PageFields) {
        let entry = &mut self.current;
        if let Some(title) = fields.title {
            entry.title = Some(title);
        }
        if let Some(note) = fields.note {
            entry.note = Some(note);
        }
        if let Some(author) = fields.author {
            entry.author = Some(author);
        }
        if let Some(captured_at) = fields.captured_at {
            entry.captured_at = Some(captured_at);
        }
        for image in fields.images {
            entry.images.insert(image.id, image.data);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.current.is_valid()
    }

    /// Starts a fresh, empty entry and returns the one that was being assembled.
    pub fn reset(&mut self) -> Entry {
        mem::take(&mut self.current)
    }

    pub fn current(&self) -> &Entry {
        &self.current
    }
}
