//! Per-block text canonicalization.

use unicode_normalization::UnicodeNormalization;

/// Canonical form of a block's text: NFC-composed, whitespace runs (including
/// newlines and tabs) collapsed to a single space, trimmed.
///
/// Idempotent; whitespace-only input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase for marker comparison. Drops the combining dot above left behind
/// by lowercasing a dotted capital I, so `İÇİNDEKİLER` folds to `içindekiler`.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase().replace('\u{0307}', "")
}
