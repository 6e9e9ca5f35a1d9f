//! Greedy online grouping of records into token-budgeted batches.
//!
//! Single pass, no reordering: each record either joins the batch under
//! construction or flushes it and starts the next one. Batches here are still
//! plain record lists; padding and stacking happen in the collator.

use tracing::debug;

use crate::config::BatchPlan;
use crate::data::Record;
use crate::errors::PipelineError;
use crate::sizes::FieldSizes;

/// Lazy batching adapter over a record iterator.
///
/// Holds only the batch under construction. A record whose padded cost would
/// push any field over its budget flushes the current batch first; a single
/// record is never blocked, even when it exceeds its budget alone. After
/// yielding an error the iterator is fused.
pub struct Batcher<I> {
    source: I,
    plan: BatchPlan,
    current: Vec<Record>,
    current_max: FieldSizes,
    exhausted: bool,
    failed: bool,
}

impl<I> Batcher<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    /// Wrap `source` with a normalized batching plan.
    pub fn new(source: I, plan: BatchPlan) -> Self {
        Self {
            source,
            plan,
            current: Vec::new(),
            current_max: FieldSizes::empty(),
            exhausted: false,
            failed: false,
        }
    }

    fn take_current(&mut self) -> Vec<Record> {
        self.current_max = FieldSizes::empty();
        std::mem::take(&mut self.current)
    }

    fn push_record(&mut self, record: Record) {
        self.current_max = FieldSizes::of_record(&record);
        self.current.push(record);
    }
}

impl<I> Iterator for Batcher<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    type Item = Result<Vec<Record>, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || (self.exhausted && self.current.is_empty()) {
            return None;
        }

        loop {
            if self.exhausted {
                let batch = self.take_current();
                if self.plan.drop_last {
                    debug!(seqs = batch.len(), "dropped final under-filled batch");
                    return None;
                }
                return Some(Ok(batch));
            }

            match self.source.next() {
                None => {
                    self.exhausted = true;
                    if self.current.is_empty() {
                        return None;
                    }
                }
                Some(Err(err)) => {
                    self.failed = true;
                    return Some(Err(err));
                }
                Some(Ok(record)) => {
                    if self.current.len() == self.plan.max_seqs {
                        let batch = self.take_current();
                        self.push_record(record);
                        debug!(seqs = batch.len(), "flushed batch at max_seqs");
                        return Some(Ok(batch));
                    }

                    let lengths = FieldSizes::of_record(&record);
                    let max_if_included = self.current_max.elementwise_max(&lengths);
                    let cost_if_included =
                        max_if_included.scaled(self.current.len() as u64 + 1);

                    if !self.current.is_empty()
                        && cost_if_included.any_exceeds(&self.plan.budget)
                    {
                        let batch = self.take_current();
                        self.current_max = lengths;
                        self.current.push(record);
                        debug!(seqs = batch.len(), "flushed batch at token budget");
                        return Some(Ok(batch));
                    }

                    self.current.push(record);
                    self.current_max = max_if_included;
                }
            }
        }
    }
}
