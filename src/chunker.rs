//! Splits each incoming sequence into fixed-size windows per field.
//!
//! One record in, zero-or-more chunk records out. Fields without a window
//! geometry are copied into every chunk of their source record, so sibling
//! chunks never share data.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::{ChunkPlan, Window};
use crate::constants::fields;
use crate::data::{Record, Value};
use crate::errors::PipelineError;
use crate::types::FieldName;

/// Lazy chunking adapter over a record iterator.
///
/// Buffers only the chunks of the record currently being split; upstream is
/// pulled again only once those are drained. After yielding an error the
/// iterator is fused.
pub struct Chunker<I> {
    source: I,
    plan: ChunkPlan,
    // Uniform plans resolve against the first record's field set, once.
    resolved: Option<IndexMap<FieldName, Window>>,
    pending: VecDeque<Record>,
    failed: bool,
}

impl<I> Chunker<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    /// Wrap `source` with a normalized chunking plan.
    pub fn new(source: I, plan: ChunkPlan) -> Self {
        Self {
            source,
            plan,
            resolved: None,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    fn ensure_windows(&mut self, record: &Record) -> Result<(), PipelineError> {
        if self.resolved.is_none() {
            let windows = match &self.plan {
                ChunkPlan::PerField(windows) => windows.clone(),
                ChunkPlan::Uniform(window) => {
                    let windows: IndexMap<FieldName, Window> = record
                        .field_names()
                        .filter(|name| !fields::is_reserved(name))
                        .map(|name| (name.clone(), *window))
                        .collect();
                    if windows.is_empty() {
                        return Err(PipelineError::Configuration(
                            "record carries no chunkable fields besides reserved metadata"
                                .to_string(),
                        ));
                    }
                    windows
                }
            };
            self.resolved = Some(windows);
        }
        Ok(())
    }

    fn chunk_record(&mut self, record: Record) -> Result<(), PipelineError> {
        self.ensure_windows(&record)?;
        let windows = self.resolved.as_ref().expect("resolved above");

        // Window out every active field up front; counts must agree before
        // anything is emitted.
        let mut field_chunks: IndexMap<&FieldName, Vec<Value>> = IndexMap::new();
        let mut num_chunks: Option<usize> = None;
        for (field, window) in windows {
            let value = record.get(field).ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "chunking is configured for field '{field}' but the record does not carry it"
                ))
            })?;
            let array = match value {
                Value::Array(array) if array.rank() >= 1 => array,
                _ => {
                    return Err(PipelineError::Configuration(format!(
                        "field '{field}' is not chunkable: expected an array with a leading axis"
                    )));
                }
            };
            let length = array.leading_len().expect("rank checked above");
            let mut chunks = Vec::new();
            let mut start = 0;
            while start < length {
                let window_array = array
                    .slice_leading(start, start + window.size)
                    .expect("rank checked above");
                chunks.push(Value::Array(window_array));
                start += window.step;
            }

            match num_chunks {
                None => num_chunks = Some(chunks.len()),
                Some(expected) if expected != chunks.len() => {
                    return Err(PipelineError::InconsistentChunking {
                        details: format!(
                            "field '{field}' produced {} chunks where earlier fields produced \
                             {expected} (seq_tag: {:?})",
                            chunks.len(),
                            record.seq_tag()
                        ),
                    });
                }
                Some(_) => {}
            }
            field_chunks.insert(field, chunks);
        }

        let num_chunks = num_chunks.unwrap_or(0);
        if num_chunks == 0 {
            return Err(PipelineError::InconsistentChunking {
                details: format!(
                    "record produced no chunks; zero-length sequences are not valid input \
                     (seq_tag: {:?})",
                    record.seq_tag()
                ),
            });
        }
        debug!(
            seq_tag = ?record.seq_tag(),
            chunks = num_chunks,
            "split sequence into chunks"
        );

        for index in 0..num_chunks {
            // Cloning the source record deep-copies passthrough fields, so
            // sibling chunks never alias each other's data.
            let mut chunk = record.clone();
            for (field, chunks) in &field_chunks {
                chunk.insert((*field).clone(), chunks[index].clone());
            }
            self.pending.push_back(chunk);
        }
        Ok(())
    }
}

impl<I> Iterator for Chunker<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            match self.source.next()? {
                Ok(record) => {
                    if let Err(err) = self.chunk_record(record) {
                        self.failed = true;
                        return Some(Err(err));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
