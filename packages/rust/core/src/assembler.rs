//! Chunk assembler.
//!
//! Walks classified blocks in stream order and groups each section's title
//! with the content blocks that follow it into one [`Chunk`]. Noise never
//! enters a chunk, and a section that ends with nothing but its title is
//! dropped.

use std::collections::HashMap;

use tracing::trace;

use docchunk_shared::{Block, BlockType, Chunk, ChunkingConfig, NoiseVerdict};

use crate::sections::SectionRef;

/// A block with its section attribution and noise verdict, ready for assembly.
#[derive(Debug, Clone)]
pub struct ClassifiedBlock<'a> {
    pub block: &'a Block,
    pub section: SectionRef,
    pub verdict: NoiseVerdict,
}

/// Group classified blocks into chunks.
pub fn assemble(blocks: &[ClassifiedBlock<'_>], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut assembler = ChunkAssembler::new(config);
    for item in blocks {
        assembler.push(item);
    }
    assembler.finish()
}

/// A chunk being accumulated.
#[derive(Debug)]
struct Candidate {
    title: String,
    section_id: String,
    page: u32,
    parts: Vec<String>,
    block_ids: Vec<String>,
}

impl Candidate {
    fn titled(title: &Block, section: &SectionRef) -> Self {
        Self {
            title: title.normalized_text.clone(),
            section_id: section.id.clone(),
            page: title.page,
            parts: Vec::new(),
            block_ids: vec![title.id.clone()],
        }
    }

    /// Content with no opening title in front of it.
    fn untitled(first: &Block, section: &SectionRef) -> Self {
        Self {
            title: String::new(),
            section_id: section.id.clone(),
            page: first.page,
            parts: Vec::new(),
            block_ids: Vec::new(),
        }
    }

    fn push(&mut self, block: &Block) {
        self.parts.push(block.normalized_text.clone());
        self.block_ids.push(block.id.clone());
    }
}

/// Streaming assembler state for one document.
pub struct ChunkAssembler<'c> {
    config: &'c ChunkingConfig,
    open: Option<Candidate>,
    /// Next sequence number per `(page, section_id)`.
    sequences: HashMap<(u32, String), usize>,
    chunks: Vec<Chunk>,
}

impl<'c> ChunkAssembler<'c> {
    pub fn new(config: &'c ChunkingConfig) -> Self {
        Self {
            config,
            open: None,
            sequences: HashMap::new(),
            chunks: Vec::new(),
        }
    }

    /// Feed the next block in stream order.
    pub fn push(&mut self, item: &ClassifiedBlock<'_>) {
        let block = item.block;

        if block.block_type == BlockType::Title {
            self.close();
            if item.verdict.is_noise {
                trace!(
                    block_id = %block.id,
                    reason = ?item.verdict.reason,
                    "noise title does not open a chunk"
                );
            } else if self.config.skip_name_like_titles && is_name_like(&block.normalized_text) {
                trace!(block_id = %block.id, "name-like title does not open a chunk");
            } else {
                self.open = Some(Candidate::titled(block, &item.section));
            }
            return;
        }

        if item.verdict.is_noise || !block.block_type.is_content() {
            return;
        }

        if self
            .open
            .as_ref()
            .is_some_and(|c| c.section_id != item.section.id)
        {
            self.close();
        }

        self.open
            .get_or_insert_with(|| Candidate::untitled(block, &item.section))
            .push(block);
    }

    /// Close any open candidate and return every emitted chunk in order.
    pub fn finish(mut self) -> Vec<Chunk> {
        self.close();
        self.chunks
    }

    fn close(&mut self) {
        let Some(candidate) = self.open.take() else {
            return;
        };
        if candidate.parts.is_empty() {
            trace!(section_id = %candidate.section_id, "title-only section discarded");
            return;
        }

        let sequence = self
            .sequences
            .entry((candidate.page, candidate.section_id.clone()))
            .or_insert(0);
        let chunk_id = format!(
            "page_{}_section_{}_{}",
            candidate.page, candidate.section_id, sequence
        );
        *sequence += 1;

        self.chunks.push(Chunk {
            chunk_id,
            title: candidate.title,
            content: candidate.parts.join(self.config.content_separator.as_str()),
            page: candidate.page,
            section_id: candidate.section_id,
            block_ids: candidate.block_ids,
        });
    }
}

/// Very short, or a single word: more likely an author name or a label than a heading.
fn is_name_like(title: &str) -> bool {
    let len = title.chars().count();
    len < 4 || (!title.contains(' ') && len < 20)
}
