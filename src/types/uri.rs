//! Source identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Dot-separated identifier of an author (`0310Tabari`) or a book
/// (`0310Tabari.Tarikh`).
///
/// Ordering is lexicographic on the full string so that maps keyed by
/// `SourceUri` iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUri(String);

impl SourceUri {
    /// Create a URI, trimming surrounding whitespace.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let trimmed = uri.trim();
        if trimmed.len() == uri.len() {
            Self(uri)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The author component (everything before the first dot).
    pub fn author(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// True if the URI names an author without a book qualifier.
    pub fn is_author_only(&self) -> bool {
        !self.0.contains('.')
    }

    /// True if this URI is a book written by the given author URI.
    pub fn is_book_of(&self, author: &SourceUri) -> bool {
        !self.is_author_only() && self.author() == author.as_str()
    }
}

impl fmt::Display for SourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceUri {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for SourceUri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
