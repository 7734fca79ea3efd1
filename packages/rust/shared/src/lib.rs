//! Shared types, error model, and configuration for docchunk.
//!
//! Depended on by the engine and the CLI. Holds the unified error type
//! ([`DocChunkError`]), the block and chunk records that flow through the
//! pipeline, and the TOML configuration with its loaders.

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, NoiseConfig, config_dir, config_file_path, init_config,
    init_config_at, load_config, load_config_from,
};
pub use error::{DocChunkError, Result};
pub use types::{
    Block, BlockRecord, BlockType, Chunk, DocumentReport, NoiseReason, NoiseVerdict, PipelineStats,
    UNTITLED_SECTION_ID,
};
