use thiserror::Error;

use crate::types::FieldName;

/// Error type for pipeline configuration and data-consistency failures.
///
/// All variants are unrecoverable at the point of detection: malformed data or
/// configuration is a programming defect, not a transient condition. The
/// pipeline stops producing further batches after yielding one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("inconsistent chunking: {details}")]
    InconsistentChunking { details: String },
    #[error("cannot collate an empty batch")]
    EmptyBatch,
    #[error("unsupported value in field '{field}': {details}")]
    UnsupportedValue { field: FieldName, details: String },
}
