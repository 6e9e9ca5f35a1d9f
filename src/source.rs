//! Upstream dataset interfaces.
//!
//! Ownership model:
//! - `RecordSource` is the pipeline-facing interface that produces records.
//! - `InMemorySource` is the built-in implementation backed by a `Vec`,
//!   used by tests and demos.
//!
//! The pipeline imposes no ordering on a source beyond "consumed in the
//! order produced", and it never requires more than one pass.

use crate::data::Record;
use crate::errors::PipelineError;
use crate::types::SourceId;

/// Pipeline-facing record producer.
///
/// A source only needs to support a single iteration pass; restartability is
/// an implementation choice. Any blocking I/O belongs inside the returned
/// iterator, never in the pipeline itself.
pub trait RecordSource {
    /// Stable source identifier used in logs and error reporting.
    fn id(&self) -> &str;

    /// Open one streaming pass over the source's records.
    fn records(&self) -> Result<Box<dyn Iterator<Item = Record> + Send>, PipelineError>;
}

/// A restartable source over an owned record list.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    id: SourceId,
    records: Vec<Record>,
}

impl InMemorySource {
    /// Create a source named `id` over `records`.
    pub fn new(id: impl Into<SourceId>, records: Vec<Record>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    /// Number of records served per pass.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn records(&self) -> Result<Box<dyn Iterator<Item = Record> + Send>, PipelineError> {
        Ok(Box::new(self.records.clone().into_iter()))
    }
}
