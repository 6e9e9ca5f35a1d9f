//! Record-construction helpers shared by tests and demos.

use crate::constants::fields;
use crate::data::{Array, Record, Value};
use crate::types::{SeqIdx, SeqTag};

/// Convenience helper to build a record with reserved metadata plus
/// 1-dimensional `i64` array fields.
pub fn make_record<S, F>(seq_tag: S, seq_idx: SeqIdx, array_fields: F) -> Record
where
    S: Into<SeqTag>,
    F: IntoIterator<Item = (&'static str, Vec<i64>)>,
{
    let mut record = Record::new();
    record.insert(fields::SEQ_TAG, Value::Str(seq_tag.into()));
    record.insert(fields::SEQ_IDX, Value::Int(seq_idx));
    for (name, values) in array_fields {
        record.insert(name, Array::from_i64(values));
    }
    record
}
