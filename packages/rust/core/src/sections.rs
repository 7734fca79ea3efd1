//! Section tracking: which title does each block belong to?
//!
//! A section is the span of blocks following a title up to the next title.
//! The tracker walks the stream once, in order, and never looks ahead.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use docchunk_shared::{Block, BlockType, UNTITLED_SECTION_ID};

/// The section a block was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRef {
    /// Slug of the governing title.
    pub id: String,
    /// Normalized text of the governing title; empty before the first title.
    pub title: String,
}

impl SectionRef {
    /// The implicit section for blocks that precede any title.
    pub fn untitled() -> Self {
        Self {
            id: UNTITLED_SECTION_ID.to_string(),
            title: String::new(),
        }
    }
}

/// Running "current section" state for one document.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    current: SectionRef,
}

impl Default for SectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionTracker {
    pub fn new() -> Self {
        Self {
            current: SectionRef::untitled(),
        }
    }

    /// Feed the next block in stream order and return its section.
    ///
    /// A title block starts (and belongs to) a new section, whether or not it
    /// later turns out to be noise.
    pub fn observe(&mut self, block: &Block) -> SectionRef {
        if block.block_type == BlockType::Title {
            self.current = SectionRef {
                id: slugify(&block.normalized_text),
                title: block.normalized_text.clone(),
            };
        }
        self.current.clone()
    }
}

/// Stable identifier for a title: lowercase ASCII alphanumerics with every
/// other run collapsed to `_`, no leading/trailing `_`.
///
/// Accented Latin letters lose their marks (`ş` → `s`, `é` → `e`) and the
/// dotless `ı` maps to `i`. A title with nothing left maps to
/// [`UNTITLED_SECTION_ID`].
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = match c {
            'ı' => 'i',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        UNTITLED_SECTION_ID.to_string()
    } else {
        slug
    }
}
