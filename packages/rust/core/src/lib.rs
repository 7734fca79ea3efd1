//! Structuring engine for docchunk.
//!
//! Turns the flat block stream of a partitioned PDF into section-attributed,
//! noise-classified block records and embedding-ready chunks. The entry point
//! is [`pipeline::StructureEngine`].

pub mod assembler;
pub mod elements;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod sections;

pub use pipeline::StructureEngine;
