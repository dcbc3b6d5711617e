//! Title normalization for tier-2 matching and title-based candidate keys.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-, diacritic- and punctuation-insensitive form of a title.
///
/// Decomposes to NFKD, drops combining marks, lowercases, turns every
/// non-alphanumeric run into a single space and trims. Leading articles are
/// kept: "The Thing" and "Thing" are different titles.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else if c == '\'' || c == '\u{2019}' {
            // "Schindler's" and "Schindlers" normalize alike.
        } else {
            pending_space = true;
        }
    }

    out
}
