//! Noise classification: decide which blocks are unfit for embedding.
//!
//! Rules form a decision list evaluated top to bottom; the first rule that
//! matches decides the verdict. Every rule but one is local to the block and
//! its section. The boilerplate rule needs a [`BoilerplateIndex`] built by a
//! full pass over the document before any block can be classified.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use docchunk_shared::{
    Block, BlockType, DocChunkError, NoiseConfig, NoiseReason, NoiseVerdict, Result,
};

use crate::normalize::fold_case;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}\s+(?:ocak|şubat|mart|nisan|mayıs|haziran|temmuz|ağustos|eylül|ekim|kasım|aralık|january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{2,4})\b",
    )
    .expect("valid regex")
});

// Dot leaders, with or without spaces between the dots, or ellipsis runs.
static LEADER_DOTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.\s?){4,}|…{2,}").expect("valid regex"));

// "Methods 12": a short label followed by nothing but a page number.
static TRAILING_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^.!?:;,]*\p{L}[^.!?:;,]*\s\d{1,3}$").expect("valid regex")
});

// "1. Introduction", "2) Method"; a letter must follow so "12.03.2024" is left to the date rule.
static ENUMERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}[.)]\s*\p{L}.{0,99}$").expect("valid regex"));

static PAGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-–—]\s*)?\d{1,4}(?:\s*[-–—])?$|^[-–—.·•]+$").expect("valid regex")
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-z0-9-]+\.)+(?:com|org|net|edu|gov|io|co|info|biz|dev|ai|app|tr|uk|de|eu)(?::\d+)?(?:[/?#]\S*)?$",
    )
    .expect("valid regex")
});

const TRAILING_PAGE_MAX_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Boilerplate index (pass 1)
// ---------------------------------------------------------------------------

/// Distinct pages on which each normalized text occurs, for one document.
///
/// Built once per document and dropped with it; never shared across
/// documents. Only [`BoilerplateIndex::build`] creates one, so the page
/// threshold always comes from a validated [`NoiseConfig`].
#[derive(Debug, Clone)]
pub struct BoilerplateIndex {
    pages_by_text: HashMap<String, BTreeSet<u32>>,
    min_pages: usize,
}

impl BoilerplateIndex {
    /// Scan every block of the document. Read-only.
    pub fn build(blocks: &[Block], config: &NoiseConfig) -> Self {
        let mut pages_by_text: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for block in blocks {
            let text = &block.normalized_text;
            if text.is_empty() || text.chars().count() < config.boilerplate_min_chars {
                continue;
            }
            pages_by_text
                .entry(text.clone())
                .or_default()
                .insert(block.page);
        }

        let index = Self {
            pages_by_text,
            min_pages: config.boilerplate_min_pages,
        };
        debug!(
            distinct_texts = index.pages_by_text.len(),
            repeated = index.repeated_count(),
            "boilerplate index built"
        );
        index
    }

    /// Whether `text` occurs on at least `boilerplate_min_pages` distinct pages.
    pub fn is_boilerplate(&self, text: &str) -> bool {
        self.pages_by_text
            .get(text)
            .is_some_and(|pages| pages.len() >= self.min_pages)
    }

    /// Number of texts that qualify as boilerplate.
    pub fn repeated_count(&self) -> usize {
        self.pages_by_text
            .values()
            .filter(|pages| pages.len() >= self.min_pages)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Classifier (pass 2)
// ---------------------------------------------------------------------------

/// What a rule may look at besides the block itself.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    /// Title of the section the block was attributed to.
    pub section_title: &'a str,
    pub boilerplate: &'a BoilerplateIndex,
}

struct Rule {
    reason: NoiseReason,
    matches: fn(&NoiseClassifier, &Block, &DocumentContext<'_>) -> bool,
}

/// The decision list. Order is the priority.
const RULES: &[Rule] = &[
    Rule {
        reason: NoiseReason::HeaderFooter,
        matches: NoiseClassifier::is_page_furniture,
    },
    Rule {
        reason: NoiseReason::Toc,
        matches: NoiseClassifier::is_toc,
    },
    Rule {
        reason: NoiseReason::TocLine,
        matches: NoiseClassifier::is_toc_line,
    },
    Rule {
        reason: NoiseReason::PageNumber,
        matches: NoiseClassifier::is_page_number,
    },
    Rule {
        reason: NoiseReason::Date,
        matches: NoiseClassifier::is_date,
    },
    Rule {
        reason: NoiseReason::Copyright,
        matches: NoiseClassifier::is_copyright,
    },
    Rule {
        reason: NoiseReason::Link,
        matches: NoiseClassifier::is_link,
    },
    Rule {
        reason: NoiseReason::UiText,
        matches: NoiseClassifier::is_ui_text,
    },
    Rule {
        reason: NoiseReason::Boilerplate,
        matches: NoiseClassifier::is_boilerplate,
    },
];

/// Marker sets and thresholds compiled from [`NoiseConfig`].
#[derive(Debug, Clone)]
pub struct NoiseClassifier {
    toc_markers: Vec<String>,
    copyright_markers: Vec<String>,
    ui_re: Option<Regex>,
    date_max_chars: usize,
    ui_max_chars: usize,
    toc_line_max_chars: usize,
}

impl NoiseClassifier {
    pub fn new(config: &NoiseConfig) -> Result<Self> {
        let fold_all = |markers: &[String]| -> Vec<String> {
            markers
                .iter()
                .map(|m| fold_case(m.trim()))
                .filter(|m| !m.is_empty())
                .collect()
        };

        // An empty alternation would match everywhere, so no markers means no rule.
        let ui_markers = fold_all(&config.ui_markers);
        let ui_re = if ui_markers.is_empty() {
            None
        } else {
            let alternatives = ui_markers
                .iter()
                .map(|m| regex::escape(m))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{alternatives})\b"))
                .map_err(|e| DocChunkError::config(format!("invalid noise.ui_markers: {e}")))?;
            Some(re)
        };

        Ok(Self {
            toc_markers: fold_all(&config.toc_markers),
            copyright_markers: fold_all(&config.copyright_markers),
            ui_re,
            date_max_chars: config.date_max_chars,
            ui_max_chars: config.ui_max_chars,
            toc_line_max_chars: config.toc_line_max_chars,
        })
    }

    /// Classify one block. Never fails: an empty block is noise with
    /// reason `none`, since there is nothing to embed.
    pub fn classify(&self, block: &Block, ctx: &DocumentContext<'_>) -> NoiseVerdict {
        if block.normalized_text.is_empty() {
            return NoiseVerdict::empty();
        }
        RULES
            .iter()
            .find(|rule| (rule.matches)(self, block, ctx))
            .map_or_else(NoiseVerdict::keep, |rule| NoiseVerdict::noise(rule.reason))
    }

    fn is_page_furniture(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        block.hierarchy_level() == 4
    }

    fn is_toc(&self, block: &Block, ctx: &DocumentContext<'_>) -> bool {
        self.is_toc_marker(ctx.section_title) || self.is_toc_marker(&block.normalized_text)
    }

    fn is_toc_marker(&self, text: &str) -> bool {
        let folded = fold_case(text.trim().trim_end_matches([':', '.']).trim());
        !folded.is_empty() && self.toc_markers.iter().any(|m| *m == folded)
    }

    fn is_toc_line(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        if !matches!(block.block_type, BlockType::Other | BlockType::Paragraph) {
            return false;
        }
        let text = block.normalized_text.as_str();
        let len = text.chars().count();

        LEADER_DOTS_RE.is_match(text)
            || (len <= TRAILING_PAGE_MAX_CHARS && TRAILING_PAGE_RE.is_match(text))
            || (len < self.toc_line_max_chars && ENUMERATION_RE.is_match(text))
    }

    fn is_page_number(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        PAGE_NUMBER_RE.is_match(&block.normalized_text)
    }

    fn is_date(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        let text = &block.normalized_text;
        text.chars().count() < self.date_max_chars && DATE_RE.is_match(text)
    }

    fn is_copyright(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        let text = &block.normalized_text;
        if text.contains('©') {
            return true;
        }
        let folded = fold_case(text);
        self.copyright_markers.iter().any(|m| folded.contains(m.as_str()))
    }

    fn is_link(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        let tokens: Vec<&str> = block.normalized_text.split_whitespace().collect();
        let urls = tokens.iter().filter(|t| is_url_token(t)).count();
        urls * 2 > tokens.len()
    }

    fn is_ui_text(&self, block: &Block, _ctx: &DocumentContext<'_>) -> bool {
        let text = &block.normalized_text;
        let Some(ui_re) = &self.ui_re else {
            return false;
        };
        text.chars().count() < self.ui_max_chars && ui_re.is_match(&fold_case(text))
    }

    fn is_boilerplate(&self, block: &Block, ctx: &DocumentContext<'_>) -> bool {
        ctx.boilerplate.is_boilerplate(&block.normalized_text)
    }
}

/// A scheme URL with a host, a `www.` address, or a bare domain with a common TLD.
fn is_url_token(token: &str) -> bool {
    let token = token.trim_matches(|c: char| "()<>[]{}\"'“”‘’,;.".contains(c));
    if token.is_empty() {
        return false;
    }
    let lower = token.to_lowercase();
    if lower.starts_with("www.") {
        return true;
    }
    if let Ok(url) = Url::parse(token) {
        if url.host_str().is_some() {
            return true;
        }
    }
    DOMAIN_RE.is_match(&lower)
}
