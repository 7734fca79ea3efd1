//! Core domain types for docchunk: blocks in, chunks out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Section id used before the first title and for titles that slugify to nothing.
pub const UNTITLED_SECTION_ID: &str = "untitled";

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// Coarse layout type assigned by the upstream PDF partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Title,
    ListItem,
    Paragraph,
    Table,
    Header,
    Footer,
    Other,
}

impl BlockType {
    /// Map a partitioner category (`Title`, `NarrativeText`, ...) or one of our
    /// own snake_case names to a block type. Unknown categories become `Other`.
    pub fn from_category(category: &str) -> Self {
        match category.trim() {
            "Title" | "title" => Self::Title,
            "NarrativeText" | "paragraph" => Self::Paragraph,
            "ListItem" | "list_item" => Self::ListItem,
            "Table" | "table" => Self::Table,
            "Header" | "header" => Self::Header,
            "Footer" | "footer" => Self::Footer,
            _ => Self::Other,
        }
    }

    /// Structural depth: 1 = title, 2 = list item, 3 = body, 4 = page furniture.
    pub fn hierarchy_level(self) -> u8 {
        match self {
            Self::Title => 1,
            Self::ListItem => 2,
            Self::Paragraph | Self::Table | Self::Other => 3,
            Self::Header | Self::Footer => 4,
        }
    }

    /// Types whose text may be appended to a chunk's content.
    pub fn is_content(self) -> bool {
        matches!(self, Self::ListItem | Self::Paragraph | Self::Table)
    }

    /// Snake_case name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::ListItem => "list_item",
            Self::Paragraph => "paragraph",
            Self::Table => "table",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text unit extracted from a page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable reference, `block_{n}` where `n` is the element's input position.
    pub id: String,
    /// 1-based page number.
    pub page: u32,
    /// Position among the blocks of the same page, 0-based.
    pub index_in_page: u32,
    /// Layout type.
    pub block_type: BlockType,
    /// Text exactly as extracted.
    pub raw_text: String,
    /// Canonical form used for classification and chunk content.
    pub normalized_text: String,
    /// `[x1, y1, x2, y2]` when the partitioner supplied coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl Block {
    /// See [`BlockType::hierarchy_level`].
    pub fn hierarchy_level(&self) -> u8 {
        self.block_type.hierarchy_level()
    }
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// Why a block was (or was not) excluded from embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseReason {
    HeaderFooter,
    Toc,
    TocLine,
    PageNumber,
    Date,
    Copyright,
    Link,
    UiText,
    Boilerplate,
    None,
}

/// Classification outcome for one block. Never mutated after computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseVerdict {
    pub is_noise: bool,
    pub reason: NoiseReason,
}

impl NoiseVerdict {
    /// Signal: keep the block.
    pub const fn keep() -> Self {
        Self {
            is_noise: false,
            reason: NoiseReason::None,
        }
    }

    /// Noise with the rule that matched.
    pub const fn noise(reason: NoiseReason) -> Self {
        Self {
            is_noise: true,
            reason,
        }
    }

    /// Noise with nothing to embed (empty text).
    pub const fn empty() -> Self {
        Self::noise(NoiseReason::None)
    }
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// An embedding unit: a section title paired with its qualifying content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `page_{page}_section_{section_id}_{sequence}`.
    pub chunk_id: String,
    /// Section title; empty for content outside any opening title.
    pub title: String,
    /// Content block texts joined in stream order.
    pub content: String,
    /// Page of the title (or of the first content block when untitled).
    pub page: u32,
    pub section_id: String,
    /// Contributing blocks in stream order, title first when present.
    pub block_ids: Vec<String>,
}

impl Chunk {
    /// Text to hand to an embedding model.
    pub fn embedding_text(&self) -> String {
        if self.title.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n\n{}", self.title, self.content)
        }
    }
}

/// Per-block audit record, emitted before any filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text: String,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub section_id: String,
    pub section_title: String,
    pub hierarchy_level: u8,
    /// Provisional id computed before assembly; see the assembler for final ids.
    pub chunk_id: String,
    pub block_index_in_page: u32,
    pub is_noise: bool,
    pub noise_reason: NoiseReason,
    pub normalized_text: String,
}

/// Counters collected over one document run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Elements received from the partitioner (including skipped ones).
    pub elements: usize,
    /// Elements skipped as malformed.
    pub skipped: usize,
    /// Blocks that made it into the pipeline.
    pub blocks: usize,
    /// Noise blocks grouped by reason.
    pub noise_by_reason: BTreeMap<NoiseReason, usize>,
    /// Chunks emitted.
    pub chunks: usize,
}

/// Everything produced for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentReport {
    pub blocks: Vec<BlockRecord>,
    pub chunks: Vec<Chunk>,
    pub stats: PipelineStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_from_partitioner_categories() {
        assert_eq!(BlockType::from_category("Title"), BlockType::Title);
        assert_eq!(BlockType::from_category("NarrativeText"), BlockType::Paragraph);
        assert_eq!(BlockType::from_category("ListItem"), BlockType::ListItem);
        assert_eq!(BlockType::from_category(" Footer "), BlockType::Footer);
        assert_eq!(BlockType::from_category("list_item"), BlockType::ListItem);
        assert_eq!(BlockType::from_category("FigureCaption"), BlockType::Other);
        assert_eq!(BlockType::from_category(""), BlockType::Other);
    }

    #[test]
    fn hierarchy_levels_are_fixed_per_type() {
        assert_eq!(BlockType::Title.hierarchy_level(), 1);
        assert_eq!(BlockType::ListItem.hierarchy_level(), 2);
        assert_eq!(BlockType::Paragraph.hierarchy_level(), 3);
        assert_eq!(BlockType::Table.hierarchy_level(), 3);
        assert_eq!(BlockType::Other.hierarchy_level(), 3);
        assert_eq!(BlockType::Header.hierarchy_level(), 4);
        assert_eq!(BlockType::Footer.hierarchy_level(), 4);
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&BlockType::ListItem).expect("serialize");
        assert_eq!(json, "\"list_item\"");
        let json = serde_json::to_string(&NoiseReason::TocLine).expect("serialize");
        assert_eq!(json, "\"toc_line\"");
        let json = serde_json::to_string(&NoiseReason::UiText).expect("serialize");
        assert_eq!(json, "\"ui_text\"");
    }

    #[test]
    fn block_record_uses_type_key() {
        let record = BlockRecord {
            block_id: "block_0".into(),
            block_type: BlockType::Title,
            text: "Introduction".into(),
            page: 1,
            bbox: None,
            section_id: "introduction".into(),
            section_title: "Introduction".into(),
            hierarchy_level: 1,
            chunk_id: "page_1_section_introduction_001".into(),
            block_index_in_page: 0,
            is_noise: false,
            noise_reason: NoiseReason::None,
            normalized_text: "Introduction".into(),
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["type"], "title");
        assert_eq!(value["noise_reason"], "none");
        assert!(value.get("bbox").is_none());
    }

    #[test]
    fn embedding_text_joins_title_and_content() {
        let mut chunk = Chunk {
            chunk_id: "page_1_section_introduction_0".into(),
            title: "Introduction".into(),
            content: "This report covers...".into(),
            page: 1,
            section_id: "introduction".into(),
            block_ids: vec!["block_0".into(), "block_1".into()],
        };
        assert_eq!(chunk.embedding_text(), "Introduction\n\nThis report covers...");

        chunk.title.clear();
        assert_eq!(chunk.embedding_text(), "This report covers...");
    }

    #[test]
    fn stats_serialize_reason_keys() {
        let mut stats = PipelineStats::default();
        stats.noise_by_reason.insert(NoiseReason::Copyright, 2);
        let value = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(value["noise_by_reason"]["copyright"], 2);
    }
}
