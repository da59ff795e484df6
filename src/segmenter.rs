//! Milestone segmentation of marked-up texts.
//!
//! Texts carry a metadata header terminated by [`HEADER_END_MARKER`].
//! After the header, the literal `ms` followed by digits marks the *end*
//! of a milestone: the body of milestone `N` is the text between the
//! previous marker and `msN`. Text after the final marker belongs to no
//! milestone.
//!
//! Segmentation performs no normalization; callers normalize bodies as
//! they need.

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::{CaptureMatches, Regex};

use crate::types::{Milestone, MilestoneId};

/// Literal that ends the metadata header of a marked-up text.
pub const HEADER_END_MARKER: &str = "#META#Header#End#";

const MILESTONE_PATTERN: &str = r"ms(\d+)";

fn milestone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MILESTONE_PATTERN).expect("milestone pattern is valid"))
}

/// Strip everything up to and including the last header-end marker.
///
/// A text without the marker is returned whole.
pub fn strip_header(text: &str) -> &str {
    match text.rfind(HEADER_END_MARKER) {
        Some(idx) => &text[idx + HEADER_END_MARKER.len()..],
        None => text,
    }
}

/// Lazily segment a text into milestones.
///
/// The iterator is finite, ordered by position in the text, and yields
/// nothing for a text with no markers.
pub fn segment(text: &str) -> Milestones<'_> {
    let content = strip_header(text);
    Milestones {
        content,
        matches: milestone_regex().captures_iter(content),
        last_end: 0,
    }
}

/// Collect the milestone ids of a text in order.
pub fn milestone_ids(text: &str) -> Vec<MilestoneId> {
    segment(text).map(|m| m.id).collect()
}

/// Read a text file, dropping a leading byte-order mark.
pub fn read_text(path: &Path) -> io::Result<String> {
    let mut text = std::fs::read_to_string(path)?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

/// Iterator over the milestones of a text.
pub struct Milestones<'t> {
    content: &'t str,
    matches: CaptureMatches<'static, 't>,
    last_end: usize,
}

impl<'t> Iterator for Milestones<'t> {
    type Item = Milestone<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = self.matches.next()?;
            let (whole, digits) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(digits)) => (whole, digits),
                _ => continue,
            };
            let body = &self.content[self.last_end..whole.start()];
            self.last_end = whole.end();

            match digits.as_str().parse::<MilestoneId>() {
                Ok(id) => return Some(Milestone::new(id, body)),
                Err(e) => {
                    // Too many digits for an id: treat the marker as text.
                    tracing::warn!(marker = whole.as_str(), error = %e, "ignoring milestone marker");
                }
            }
        }
    }
}
