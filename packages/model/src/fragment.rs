//! # Fragments and Notes
//!
//! A note is an ordered list of fragments. Order is render order and
//! navigation order, so insertion order is document order.

use chrono::{DateTime, Utc};

/// Identity assigned by the remote store on creation
pub type NoteId = i64;

/// One atomic content unit of a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Editable text run (may contain literal newlines)
    Text(String),

    /// Stored image, referenced by its name
    Image(String),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(text.into())
    }

    pub fn image(image_ref: impl Into<String>) -> Self {
        Fragment::Image(image_ref.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Fragment::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub fragments: Vec<Fragment>,
    pub last_modified: DateTime<Utc>,
}

impl Note {
    /// Note stamped with the current time
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self::with_timestamp(fragments, Utc::now())
    }

    pub fn with_timestamp(fragments: Vec<Fragment>, last_modified: DateTime<Utc>) -> Self {
        Self {
            fragments,
            last_modified,
        }
    }

    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Length of `text` in characters
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` at a character offset, clamped to the text length
pub fn split_text_at(text: &str, char_offset: usize) -> (&str, &str) {
    let byte_offset = text
        .char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    text.split_at(byte_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_counts_chars_not_bytes() {
        assert_eq!(split_text_at("héllo", 2), ("hé", "llo"));
        assert_eq!(split_text_at("ab", 0), ("", "ab"));
        assert_eq!(split_text_at("ab", 2), ("ab", ""));
        assert_eq!(split_text_at("ab", 10), ("ab", ""));
        assert_eq!(char_len("héllo"), 5);
    }

    #[test]
    fn test_fragment_variants() {
        let text = Fragment::text("a");
        let image = Fragment::image("cat.png");

        assert!(text.is_text());
        assert!(!image.is_text());
        assert_eq!(text.as_text(), Some("a"));
        assert_eq!(image.as_text(), None);
    }
}
