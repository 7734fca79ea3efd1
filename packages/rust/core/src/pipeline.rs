//! End-to-end structuring pipeline: blocks → sections → verdicts → chunks.
//!
//! One [`StructureEngine`] holds the compiled configuration and can process
//! any number of documents. Per-document state (boilerplate index, section
//! tracker, chunk sequence counters) lives only for the duration of a single
//! [`StructureEngine::process`] call.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use docchunk_shared::{AppConfig, Block, BlockRecord, DocumentReport, PipelineStats, Result};

use crate::assembler::{ClassifiedBlock, assemble};
use crate::elements::{ParsedElements, parse_elements, parse_elements_json};
use crate::noise::{BoilerplateIndex, DocumentContext, NoiseClassifier};
use crate::sections::SectionTracker;

/// Configured engine. Cheap to share by reference; holds no document state.
#[derive(Debug, Clone)]
pub struct StructureEngine {
    config: AppConfig,
    classifier: NoiseClassifier,
}

impl StructureEngine {
    /// Validate the config and compile the noise rules.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let classifier = NoiseClassifier::new(&config.noise)?;
        Ok(Self { config, classifier })
    }

    /// Run both passes over one document's blocks, in stream order.
    ///
    /// An empty stream yields an empty report, not an error.
    #[instrument(skip_all, fields(blocks = blocks.len()))]
    pub fn process(&self, blocks: &[Block]) -> DocumentReport {
        // Pass 1: cross-page frequency, scoped to this document.
        let boilerplate = BoilerplateIndex::build(blocks, &self.config.noise);

        // Pass 2: sections, verdicts, records.
        let mut tracker = SectionTracker::new();
        let mut seen_in_section: HashMap<String, usize> = HashMap::new();
        let mut stats = PipelineStats {
            elements: blocks.len(),
            blocks: blocks.len(),
            ..PipelineStats::default()
        };
        let mut records = Vec::with_capacity(blocks.len());
        let mut classified = Vec::with_capacity(blocks.len());

        for block in blocks {
            let section = tracker.observe(block);
            let ctx = DocumentContext {
                section_title: &section.title,
                boilerplate: &boilerplate,
            };
            let verdict = self.classifier.classify(block, &ctx);
            trace!(
                block_id = %block.id,
                section_id = %section.id,
                is_noise = verdict.is_noise,
                reason = ?verdict.reason,
                "block classified"
            );

            if verdict.is_noise {
                *stats.noise_by_reason.entry(verdict.reason).or_default() += 1;
            }

            let seen = seen_in_section.entry(section.id.clone()).or_default();
            *seen += 1;

            records.push(BlockRecord {
                block_id: block.id.clone(),
                block_type: block.block_type,
                text: block.raw_text.clone(),
                page: block.page,
                bbox: block.bbox,
                section_id: section.id.clone(),
                section_title: section.title.clone(),
                hierarchy_level: block.hierarchy_level(),
                chunk_id: format!("page_{}_section_{}_{:03}", block.page, section.id, seen),
                block_index_in_page: block.index_in_page,
                is_noise: verdict.is_noise,
                noise_reason: verdict.reason,
                normalized_text: block.normalized_text.clone(),
            });
            classified.push(ClassifiedBlock {
                block,
                section,
                verdict,
            });
        }

        let noise_total: usize = stats.noise_by_reason.values().sum();
        debug!(
            sections = seen_in_section.len(),
            noise = noise_total,
            "classification pass complete"
        );

        let chunks = assemble(&classified, &self.config.chunking);
        stats.chunks = chunks.len();
        debug!(chunks = chunks.len(), "assembly complete");

        DocumentReport {
            blocks: records,
            chunks,
            stats,
        }
    }

    /// Ingest partitioner elements, skipping malformed ones, then process.
    #[instrument(skip_all, fields(elements = elements.len()))]
    pub fn process_elements(&self, elements: &[Value]) -> DocumentReport {
        self.process_parsed(parse_elements(elements))
    }

    /// Parse an element JSON document and process it.
    ///
    /// Fails only when the document is not JSON or has no element list.
    #[instrument(skip_all, fields(bytes = input.len()))]
    pub fn process_json(&self, input: &str) -> Result<DocumentReport> {
        let parsed = parse_elements_json(input)?;
        Ok(self.process_parsed(parsed))
    }

    fn process_parsed(&self, parsed: ParsedElements) -> DocumentReport {
        let mut report = self.process(&parsed.blocks);
        report.stats.elements = parsed.total;
        report.stats.skipped = parsed.skipped.len();

        info!(
            elements = report.stats.elements,
            skipped = report.stats.skipped,
            blocks = report.stats.blocks,
            chunks = report.stats.chunks,
            "document processed"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use docchunk_shared::{BlockType, DocChunkError, NoiseReason};
    use serde_json::json;

    fn engine() -> StructureEngine {
        StructureEngine::new(AppConfig::default()).expect("default config is valid")
    }

    fn blocks(rows: &[(u32, BlockType, &str)]) -> Vec<Block> {
        let mut per_page: HashMap<u32, u32> = HashMap::new();
        rows.iter()
            .enumerate()
            .map(|(i, (page, block_type, text))| {
                let slot = per_page.entry(*page).or_default();
                let index_in_page = *slot;
                *slot += 1;
                Block {
                    id: format!("block_{i}"),
                    page: *page,
                    index_in_page,
                    block_type: *block_type,
                    raw_text: (*text).to_string(),
                    normalized_text: crate::normalize::normalize(text),
                    bbox: None,
                }
            })
            .collect()
    }

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    #[test]
    fn introduction_scenario() {
        let input = blocks(&[
            (1, BlockType::Title, "Introduction"),
            (1, BlockType::Paragraph, "This report covers..."),
        ]);
        let report = engine().process(&input);

        assert_eq!(report.chunks.len(), 1);
        let chunk = &report.chunks[0];
        assert_eq!(chunk.title, "Introduction");
        assert_eq!(chunk.content, "This report covers...");
        assert_eq!(chunk.page, 1);
        assert_eq!(chunk.section_id, "introduction");
        assert_eq!(chunk.chunk_id, "page_1_section_introduction_0");
        assert_eq!(chunk.block_ids, vec!["block_0", "block_1"]);
    }

    #[test]
    fn title_only_document_has_no_chunks() {
        let input = blocks(&[(1, BlockType::Title, "Appendix")]);
        let report = engine().process(&input);
        assert!(report.chunks.is_empty());
        assert_eq!(report.blocks.len(), 1);
        assert!(!report.blocks[0].is_noise);
    }

    #[test]
    fn copyright_line_is_excluded() {
        let input = blocks(&[(2, BlockType::Paragraph, "© 2023 Corp, all rights reserved")]);
        let report = engine().process(&input);
        assert!(report.blocks[0].is_noise);
        assert_eq!(report.blocks[0].noise_reason, NoiseReason::Copyright);
        assert!(report.chunks.is_empty());
        assert_eq!(report.stats.noise_by_reason.get(&NoiseReason::Copyright), Some(&1));
    }

    #[test]
    fn empty_document() {
        let report = engine().process(&[]);
        assert!(report.blocks.is_empty());
        assert!(report.chunks.is_empty());
        assert_eq!(report.stats, PipelineStats::default());
    }

    #[test]
    fn toc_section_yields_no_chunks() {
        let input = blocks(&[
            (1, BlockType::Title, "Table of Contents"),
            (1, BlockType::ListItem, "Introduction"),
            (1, BlockType::ListItem, "Methods and materials"),
            (2, BlockType::Title, "Introduction"),
            (2, BlockType::Paragraph, "The study begins here."),
        ]);
        let report = engine().process(&input);

        for record in &report.blocks[..3] {
            assert!(record.is_noise, "{}", record.block_id);
            assert_eq!(record.noise_reason, NoiseReason::Toc);
            assert_eq!(record.section_id, "table_of_contents");
        }
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].section_id, "introduction");
        assert_eq!(report.chunks[0].page, 2);
    }

    #[test]
    fn boilerplate_needs_three_pages() {
        let input = blocks(&[
            (1, BlockType::Title, "Overview"),
            (1, BlockType::Paragraph, "ACME Corporation internal draft"),
            (1, BlockType::Paragraph, "Seen twice only"),
            (2, BlockType::Paragraph, "ACME Corporation internal draft"),
            (2, BlockType::Paragraph, "Seen twice only"),
            (3, BlockType::Paragraph, "ACME Corporation internal draft"),
            (3, BlockType::Paragraph, "Body text on page three."),
        ]);
        let report = engine().process(&input);

        for record in &report.blocks {
            match record.normalized_text.as_str() {
                "ACME Corporation internal draft" => {
                    assert!(record.is_noise);
                    assert_eq!(record.noise_reason, NoiseReason::Boilerplate);
                }
                "Seen twice only" => assert!(!record.is_noise),
                _ => {}
            }
        }
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(
            report.chunks[0].content,
            "Seen twice only\n\nSeen twice only\n\nBody text on page three."
        );
    }

    #[test]
    fn block_records_carry_section_and_preview_ids() {
        let input = blocks(&[
            (1, BlockType::Paragraph, "Preamble before any heading."),
            (1, BlockType::Title, "Giriş ve Amaç"),
            (1, BlockType::Paragraph, "Bu çalışma..."),
            (2, BlockType::ListItem, "Birinci madde"),
        ]);
        let report = engine().process(&input);
        let records = &report.blocks;

        assert_eq!(records[0].section_id, "untitled");
        assert_eq!(records[0].section_title, "");
        assert_eq!(records[0].chunk_id, "page_1_section_untitled_001");
        assert_eq!(records[1].hierarchy_level, 1);
        assert_eq!(records[1].chunk_id, "page_1_section_giris_ve_amac_001");
        assert_eq!(records[2].chunk_id, "page_1_section_giris_ve_amac_002");
        assert_eq!(records[3].chunk_id, "page_2_section_giris_ve_amac_003");
        assert_eq!(records[3].section_title, "Giriş ve Amaç");
        assert_eq!(records[3].hierarchy_level, 2);
        assert_eq!(records[3].block_index_in_page, 0);

        let ids: Vec<_> = report.chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["page_1_section_untitled_0", "page_1_section_giris_ve_amac_0"]
        );
    }

    #[test]
    fn chunk_ids_are_unique_with_repeated_headings() {
        let input = blocks(&[
            (1, BlockType::Title, "Notes"),
            (1, BlockType::Paragraph, "First note body."),
            (1, BlockType::Title, "Notes"),
            (1, BlockType::Paragraph, "Second note body."),
            (2, BlockType::Title, "Notes"),
            (2, BlockType::Paragraph, "Third note body."),
            (2, BlockType::Title, "notes!"),
            (2, BlockType::Paragraph, "Fourth note body."),
        ]);
        let report = engine().process(&input);

        assert_eq!(report.chunks.len(), 4);
        let ids: HashSet<_> = report.chunks.iter().map(|c| c.chunk_id.clone()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains("page_2_section_notes_1"));
    }

    #[test]
    fn chunk_blocks_are_non_noise_in_stream_order() {
        let input = blocks(&[
            (1, BlockType::Header, "Company Handbook"),
            (1, BlockType::Title, "Policies"),
            (1, BlockType::Paragraph, "Employees must read this."),
            (1, BlockType::Paragraph, "12.03.2024"),
            (1, BlockType::ListItem, "Wear badges at all times."),
            (1, BlockType::Footer, "1"),
        ]);
        let report = engine().process(&input);
        let noise: HashSet<_> = report
            .blocks
            .iter()
            .filter(|r| r.is_noise)
            .map(|r| r.block_id.clone())
            .collect();

        assert_eq!(report.chunks.len(), 1);
        let chunk = &report.chunks[0];
        assert_eq!(chunk.block_ids, vec!["block_1", "block_2", "block_4"]);
        assert!(chunk.block_ids.iter().all(|id| !noise.contains(id)));
        assert_eq!(
            report.stats.noise_by_reason.get(&NoiseReason::HeaderFooter),
            Some(&2)
        );
        assert_eq!(report.stats.noise_by_reason.get(&NoiseReason::Date), Some(&1));
    }

    #[test]
    fn documents_do_not_share_boilerplate() {
        let engine = engine();
        let doc = blocks(&[
            (1, BlockType::Title, "Summary"),
            (1, BlockType::Paragraph, "Shared footer text"),
            (2, BlockType::Paragraph, "Shared footer text"),
        ]);
        // Each run sees the text on two pages only, never three.
        for _ in 0..3 {
            let report = engine.process(&doc);
            assert!(report.blocks.iter().all(|r| !r.is_noise));
        }
    }

    #[test]
    fn process_elements_skips_malformed() {
        let elements = vec![
            json!({"category": "Title", "text": "Scope", "page_number": 1}),
            json!({"category": "NarrativeText", "page_number": 1}),
            json!({"category": "NarrativeText", "text": "Covers the core system.", "page_number": 1}),
        ];
        let report = engine().process_elements(&elements);

        assert_eq!(report.stats.elements, 3);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.blocks, 2);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].block_ids, vec!["block_0", "block_2"]);
    }

    #[test]
    fn process_json_reads_metadata_pages() {
        let input = r#"[
            {"type": "Title", "text": "Introduction", "metadata": {"page_number": 1}},
            {"type": "NarrativeText", "text": "This report covers...", "metadata": {"page_number": 1}}
        ]"#;
        let report = engine().process_json(input).expect("process");

        assert_eq!(report.stats.skipped, 0);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].chunk_id, "page_1_section_introduction_0");
    }

    #[test]
    fn process_json_rejects_non_json() {
        assert!(matches!(
            engine().process_json("not json"),
            Err(DocChunkError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.noise.boilerplate_min_pages = 0;
        assert!(matches!(
            StructureEngine::new(config),
            Err(DocChunkError::Config { .. })
        ));
    }

    #[test]
    fn fixture_document() {
        let input = std::fs::read_to_string(fixture_path("json/elements.fixture.json"))
            .unwrap_or_else(|e| panic!("failed to read fixture: {e}"));
        let report = engine().process_json(&input).expect("fixture parses");

        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.blocks.len(), report.stats.blocks);

        let titles: Vec<_> = report.chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Giriş ve Amaç", "Kurulum", "Sonuçlar"]);

        let toc_blocks = report
            .blocks
            .iter()
            .filter(|r| r.noise_reason == NoiseReason::Toc)
            .count();
        assert_eq!(toc_blocks, 3);

        let boilerplate = report
            .blocks
            .iter()
            .filter(|r| r.noise_reason == NoiseReason::Boilerplate)
            .count();
        assert_eq!(boilerplate, 3);

        for chunk in &report.chunks {
            assert!(!chunk.content.is_empty());
            assert!(!chunk.content.contains("Gizli"));
        }
        let ids: HashSet<_> = report.chunks.iter().map(|c| &c.chunk_id).collect();
        assert_eq!(ids.len(), report.chunks.len());
    }
}
