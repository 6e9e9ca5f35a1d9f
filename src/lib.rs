#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Greedy online grouping of records into batches.
pub mod batcher;
/// Sequence-to-window chunking.
pub mod chunker;
/// Padding and stacking of batches into uniform containers.
pub mod collator;
/// Pipeline configuration types and normalization.
pub mod config;
/// Centralized constants (reserved fields, derived size-field names).
pub mod constants;
/// Record, value, and array data model.
pub mod data;
/// Padding-efficiency metrics over collated batches.
pub mod metrics;
/// Stage composition into a single pipeline iterator.
pub mod pipeline;
/// Field-wise size accounting used by the batcher.
pub mod sizes;
/// Upstream dataset interfaces and the in-memory source.
pub mod source;
/// Shared type aliases.
pub mod types;
/// Record-construction helpers for tests and demos.
pub mod utils;

mod errors;

pub use batcher::Batcher;
pub use chunker::Chunker;
pub use collator::{collate, CollatedBatch, CollatedValue};
pub use config::{
    BatchPlan, BatchingConfig, BudgetSpec, ChunkPlan, ChunkingConfig, FieldSpec, PipelineConfig,
    Window,
};
pub use data::{Array, ArrayData, DType, Record, Value};
pub use errors::PipelineError;
pub use metrics::{padding_stats, FieldFill, PaddingStats};
pub use pipeline::DataPipeline;
pub use sizes::{BatchBudget, FieldSizes};
pub use source::{InMemorySource, RecordSource};
pub use types::{FieldName, SeqIdx, SeqTag, SourceId, TokenCount};
