//! Text normalization for citation matching.
//!
//! ## Purpose
//!
//! Citation strings and corpus texts must be compared in the same
//! normalized form. Two transformations are defined:
//!
//! ```text
//! clean_markup(text)  = collapse_ws(strip_page_tags(text) with non-alphanumerics → ' ')
//! normalize(text)     = heavy Arabic orthographic folding
//! ```
//!
//! Corpus milestone bodies go through both; citation strings only through
//! `normalize`. The folding is idempotent: normalizing twice equals
//! normalizing once.
//!
//! The core algorithm only depends on the [`TextNormalizer`] trait, so
//! other folding rules can be swapped in.

use std::sync::OnceLock;

use regex::Regex;

/// Version of the heavy normalization rules.
///
/// Increment when the folding changes; corpus hit tables computed with a
/// different version are not comparable.
pub const NORMALIZATION_VERSION: &str = "ara_heavy_v1";

/// A deterministic, idempotent text normalization.
pub trait TextNormalizer: Send + Sync {
    /// Normalize a string.
    fn normalize(&self, text: &str) -> String;

    /// Identifier recorded alongside results computed with this normalizer.
    fn version(&self) -> &str;
}

/// Heavy Arabic normalization.
///
/// - removes tashkeel (U+064B..=U+065F, U+0670) and tatweel (U+0640)
/// - folds alef variants (أ إ آ ٱ) to bare alef
/// - folds alef maqsura (ى) to yaa and taa marbuta (ة) to haa
/// - folds hamza carriers (ؤ → و, ئ → ي) and drops standalone hamza (ء)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeavyArabicNormalizer;

impl HeavyArabicNormalizer {
    /// Create the normalizer.
    pub fn new() -> Self {
        Self
    }
}

impl TextNormalizer for HeavyArabicNormalizer {
    fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if is_diacritic(ch) || ch == TATWEEL || ch == HAMZA {
                continue;
            }
            out.push(fold(ch));
        }
        out
    }

    fn version(&self) -> &str {
        NORMALIZATION_VERSION
    }
}

const TATWEEL: char = '\u{0640}';
const HAMZA: char = '\u{0621}';

fn is_diacritic(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn fold(ch: char) -> char {
    match ch {
        // أ إ آ ٱ
        '\u{0623}' | '\u{0625}' | '\u{0622}' | '\u{0671}' => '\u{0627}',
        // ى
        '\u{0649}' => '\u{064A}',
        // ة
        '\u{0629}' => '\u{0647}',
        // ؤ
        '\u{0624}' => '\u{0648}',
        // ئ
        '\u{0626}' => '\u{064A}',
        other => other,
    }
}

fn page_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PageV\w+P\w+").expect("page tag pattern is valid"))
}

/// Remove OpenITI markup from a milestone body.
///
/// Page tags are dropped, every character that is neither alphanumeric
/// nor whitespace becomes a space, and whitespace runs collapse to a
/// single space. Leading and trailing whitespace is trimmed.
pub fn clean_markup(text: &str) -> String {
    let without_tags = page_tag_regex().replace_all(text, " ");
    let mut out = String::with_capacity(without_tags.len());
    let mut pending_space = false;
    for ch in without_tags.chars() {
        // Tashkeel are combining marks, not alphanumeric, but must survive
        // cleaning so the normalizer sees them.
        let keep = ch.is_alphanumeric() || is_diacritic(ch) || ch == TATWEEL;
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}
