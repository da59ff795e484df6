//! Locating corpus text files.

use std::path::{Path, PathBuf};

/// Status suffixes a corpus text file may carry.
pub const SUFFIX_VARIANTS: [&str; 3] = ["inProgress", "completed", "mARkdown"];

/// Candidate locations for a text, in probe order.
///
/// The exact path comes first; then, if the path ends in a known suffix,
/// the path without it; then the suffix-less path with each known suffix
/// appended.
pub fn candidate_paths(path: &Path) -> Vec<PathBuf> {
    let raw = path.to_string_lossy();
    let mut candidates = vec![path.to_path_buf()];

    let stem = match raw.rsplit_once('.') {
        Some((stem, ext)) if SUFFIX_VARIANTS.contains(&ext) => {
            candidates.push(PathBuf::from(stem));
            stem
        }
        _ => raw.as_ref(),
    };

    for suffix in SUFFIX_VARIANTS {
        let candidate = PathBuf::from(format!("{stem}.{suffix}"));
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    candidates
}

/// First existing file among [`candidate_paths`].
pub fn resolve_text_path(path: &Path) -> Option<PathBuf> {
    candidate_paths(path).into_iter().find(|p| p.is_file())
}
