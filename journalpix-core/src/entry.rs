use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

/// A journal entry while it is being assembled from one or more pages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: Option<String>,
    pub author: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    /// Image identifier -> raw bytes.
    pub images: BTreeMap<String, Vec<u8>>,
}

/// A journal entry with every field present, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEntry {
    pub title: String,
    pub author: String,
    pub captured_at: NaiveDateTime,
    pub note: String,
    pub images: BTreeMap<String, Vec<u8>>,
}

impl Entry {
    /// An entry is complete once every scalar field is set and it holds at least one image.
    pub fn is_valid(&self) -> bool {
        self.title.is_some()
            && self.author.is_some()
            && self.captured_at.is_some()
            && self.note.is_some()
            && !self.images.is_empty()
    }

    pub fn into_completed(self) -> Option<CompletedEntry> {
        if self.images.is_empty() {
            return None;
        }
        Some(CompletedEntry {
            title: self.title?,
            author: self.author?,
            captured_at: self.captured_at?,
            note: self.note?,
            images: self.images,
        })
    }
}

impl CompletedEntry {
    /// Caption embedded into each image: `"<title>: <note> -<author>"`.
    pub fn signed_caption(&self) -> String {
        format!("{}: {} -{}", self.title, self.note, self.author)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Entry: {} - {}, {} pictures>",
            self.title.as_deref().unwrap_or("?"),
            self.author.as_deref().unwrap_or("?"),
            self.images.len()
        )
    }
}

impl fmt::Display for CompletedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Entry: {} - {}, {} pictures>",
            self.title,
            self.author,
            self.images.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn full_entry() -> Entry {
        let mut images = BTreeMap::new();
        images.insert("Im1.jpg".to_string(), vec![0xFF, 0xD8]);
        Entry {
            title: Some("My Trip".into()),
            author: Some("Alice".into()),
            captured_at: NaiveDate::from_ymd_opt(2020, 1, 5)
                .unwrap()
                .and_hms_opt(9, 15, 0),
            note: Some("Had fun".into()),
            images,
        }
    }

    #[test]
    fn empty_entry_is_not_valid() {
        assert!(!Entry::default().is_valid());
        assert!(Entry::default().into_completed().is_none());
    }

    #[test]
    fn complete_entry_is_valid() {
        let entry = full_entry();
        assert!(entry.is_valid());
        let completed = entry.into_completed().unwrap();
        assert_eq!(completed.title, "My Trip");
        assert_eq!(completed.images.len(), 1);
    }

    #[test]
    fn each_missing_field_blocks_validity() {
        let mut no_title = full_entry();
        no_title.title = None;
        let mut no_author = full_entry();
        no_author.author = None;
        let mut no_time = full_entry();
        no_time.captured_at = None;
        let mut no_note = full_entry();
        no_note.note = None;
        let mut no_images = full_entry();
        no_images.images.clear();

        for entry in [no_title, no_author, no_time, no_note, no_images] {
            assert!(!entry.is_valid());
            assert!(entry.into_completed().is_none());
        }
    }

    #[test]
    fn empty_note_still_counts_as_set() {
        let mut entry = full_entry();
        entry.note = Some(String::new());
        assert!(entry.is_valid());
    }

    #[test]
    fn caption_joins_title_note_and_author() {
        let completed = full_entry().into_completed().unwrap();
        assert_eq!(completed.signed_caption(), "My Trip: Had fun -Alice");

        let mut quiet = completed;
        quiet.note = String::new();
        assert_eq!(quiet.signed_caption(), "My Trip:  -Alice");
    }

    #[test]
    fn display_summarises_entry() {
        assert_eq!(
            full_entry().to_string(),
            "<Entry: My Trip - Alice, 1 pictures>"
        );
        assert_eq!(Entry::default().to_string(), "<Entry: ? - ?, 0 pictures>");
    }
}
