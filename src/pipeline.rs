//! Composition of the chunking, batching, and collation stages.
//!
//! The pipeline is demand-driven end to end: pulling one collated batch pulls
//! at most one batch from the batcher, which pulls records one at a time from
//! the (optionally chunked) source. Dropping the pipeline mid-iteration is
//! the only cancellation mechanism needed; no state outlives the batch in
//! progress.

use crate::batcher::Batcher;
use crate::chunker::Chunker;
use crate::collator::{collate, CollatedBatch};
use crate::config::PipelineConfig;
use crate::data::Record;
use crate::errors::PipelineError;

type OkRecords<I> = std::iter::Map<I, fn(Record) -> Result<Record, PipelineError>>;

/// Optional chunking stage between the source and the batcher.
enum Stage<I> {
    Whole(I),
    Chunked(Chunker<I>),
}

impl<I> Iterator for Stage<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Stage::Whole(records) => records.next(),
            Stage::Chunked(chunker) => chunker.next(),
        }
    }
}

/// The full preparation pipeline: source → chunker → batcher → collator.
///
/// Yields `Result<CollatedBatch, PipelineError>`; after the first error no
/// further batches are produced, but batches already yielded remain valid.
/// A pipeline is a single-consumer value; it is not meant to be shared.
pub struct DataPipeline<I>
where
    I: Iterator<Item = Record>,
{
    batches: Batcher<Stage<OkRecords<I>>>,
    failed: bool,
}

impl<I> DataPipeline<I>
where
    I: Iterator<Item = Record>,
{
    /// Validate `config`, normalize it once, and wire the stages over
    /// `source`. Configuration errors surface here, before iteration.
    pub fn new<S>(source: S, config: PipelineConfig) -> Result<Self, PipelineError>
    where
        S: IntoIterator<Item = Record, IntoIter = I>,
    {
        let batch_plan = config.batching.normalize()?;
        let records: OkRecords<I> =
            source.into_iter().map(Ok as fn(Record) -> Result<Record, PipelineError>);
        let stage = match &config.chunking {
            Some(chunking) => Stage::Chunked(Chunker::new(records, chunking.normalize()?)),
            None => Stage::Whole(records),
        };
        Ok(Self {
            batches: Batcher::new(stage, batch_plan),
            failed: false,
        })
    }
}

impl<I> Iterator for DataPipeline<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Result<CollatedBatch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.batches.next()? {
            Ok(batch) => {
                let collated = collate(&batch);
                if collated.is_err() {
                    self.failed = true;
                }
                Some(collated)
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
