use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::types::{FieldName, SeqIdx, SeqTag};

/// Element type of an [`Array`] payload.
///
/// The output numeric model supports everything except the unsigned widths
/// above `u8`: `U32` is silently widened to `I64` during collation, while
/// `U16` and `U64` have no widening rule and are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl DType {
    /// Whether this dtype can appear in collated output as-is.
    pub fn is_supported_output(self) -> bool {
        !matches!(self, DType::U16 | DType::U32 | DType::U64)
    }
}

/// Typed flat storage behind an [`Array`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Applies an expression to the typed storage vector of an `ArrayData`,
/// rewrapping the result in the same variant.
macro_rules! map_array_data {
    ($data:expr, $vec:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($vec) => ArrayData::Bool($body),
            ArrayData::I8($vec) => ArrayData::I8($body),
            ArrayData::I16($vec) => ArrayData::I16($body),
            ArrayData::I32($vec) => ArrayData::I32($body),
            ArrayData::I64($vec) => ArrayData::I64($body),
            ArrayData::U8($vec) => ArrayData::U8($body),
            ArrayData::U16($vec) => ArrayData::U16($body),
            ArrayData::U32($vec) => ArrayData::U32($body),
            ArrayData::U64($vec) => ArrayData::U64($body),
            ArrayData::F32($vec) => ArrayData::F32($body),
            ArrayData::F64($vec) => ArrayData::F64($body),
        }
    };
}

impl ArrayData {
    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::I8(v) => v.len(),
            ArrayData::I16(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::U8(v) => v.len(),
            ArrayData::U16(v) => v.len(),
            ArrayData::U32(v) => v.len(),
            ArrayData::U64(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
        }
    }

    /// Whether no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dense multi-dimensional array: a shape plus row-major flat storage.
///
/// `shape` may be empty, which denotes a zero-axis (scalar) array holding
/// exactly one element. The leading axis is the "time"/length axis used for
/// chunking and batch-cost accounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    /// Build an array from a shape and matching flat storage.
    ///
    /// Fails when the element count implied by `shape` does not match the
    /// storage length.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, PipelineError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PipelineError::Configuration(format!(
                "array shape {shape:?} implies {expected} elements but storage holds {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Build a 1-dimensional `i64` array.
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::I64(values),
        }
    }

    /// Build a 1-dimensional `f32` array.
    pub fn from_f32(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::F32(values),
        }
    }

    /// Build a 1-dimensional `u32` array (widened to `i64` at collation).
    pub fn from_u32(values: Vec<u32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::U32(values),
        }
    }

    /// Build a zero-axis scalar array holding a single `i64`.
    pub fn scalar_i64(value: i64) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::I64(vec![value]),
        }
    }

    /// Build a zero-axis scalar array holding a single `f64`.
    pub fn scalar_f64(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::F64(vec![value]),
        }
    }

    /// Build a zero-axis scalar array holding a single `bool`.
    pub fn scalar_bool(value: bool) -> Self {
        Self {
            shape: Vec::new(),
            data: ArrayData::Bool(vec![value]),
        }
    }

    // Used by collation to assemble stacked outputs whose shape is derived
    // from already-validated inputs.
    pub(crate) fn from_parts(shape: Vec<usize>, data: ArrayData) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// Per-axis extents; empty for a zero-axis scalar array.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Element type tag.
    pub fn dtype(&self) -> DType {
        match &self.data {
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::I8(_) => DType::I8,
            ArrayData::I16(_) => DType::I16,
            ArrayData::I32(_) => DType::I32,
            ArrayData::I64(_) => DType::I64,
            ArrayData::U8(_) => DType::U8,
            ArrayData::U16(_) => DType::U16,
            ArrayData::U32(_) => DType::U32,
            ArrayData::U64(_) => DType::U64,
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
        }
    }

    /// Flat row-major storage.
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Extent of the leading axis, or `None` for a zero-axis array.
    pub fn leading_len(&self) -> Option<usize> {
        self.shape.first().copied()
    }

    /// Copy out the half-open window `[start, end)` along the leading axis.
    ///
    /// Returns `None` for zero-axis arrays. `end` is clamped to the leading
    /// extent; an out-of-range `start` yields an empty window.
    pub fn slice_leading(&self, start: usize, end: usize) -> Option<Array> {
        let leading = self.leading_len()?;
        let start = start.min(leading);
        let end = end.min(leading);
        let inner: usize = self.shape[1..].iter().product();
        let mut shape = self.shape.clone();
        shape[0] = end - start;
        let data = map_array_data!(&self.data, v => v[start * inner..end * inner].to_vec());
        Some(Array { shape, data })
    }

    /// Apply the collation dtype rules: `u32` widens to `i64`, the remaining
    /// unsigned widths above `u8` are rejected, everything else passes
    /// through unchanged.
    pub fn normalize_dtype(self, field: &str) -> Result<Array, PipelineError> {
        match self.data {
            ArrayData::U32(values) => Ok(Array {
                shape: self.shape,
                data: ArrayData::I64(values.into_iter().map(i64::from).collect()),
            }),
            ArrayData::U16(_) | ArrayData::U64(_) => Err(PipelineError::UnsupportedValue {
                field: field.to_string(),
                details: format!("dtype {:?} has no supported output representation", self.dtype()),
            }),
            _ => Ok(self),
        }
    }
}

/// A single record value: a multi-dimensional array or a plain scalar.
///
/// Numeric scalars (`Int`, `Float`, `Bool`) participate in collation as
/// zero-axis values; `Str` values pass through collation unpadded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Array(Array),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Sequence length used for batch-cost accounting: the leading-axis
    /// extent for arrays with at least one axis, and 1 for everything else.
    pub fn seq_len(&self) -> usize {
        match self {
            Value::Array(array) => array.leading_len().unwrap_or(1),
            _ => 1,
        }
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

/// One dataset item: an ordered mapping from field name to value.
///
/// Field order is preserved and stable across all records of one dataset.
/// Cloning a record deep-copies every value; sibling chunks produced from the
/// same source record never alias each other's data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: IndexMap<FieldName, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field value.
    pub fn insert(&mut self, name: impl Into<FieldName>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether the record carries a field with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.fields.iter()
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The reserved `seq_tag` field, when present and a string.
    pub fn seq_tag(&self) -> Option<&SeqTag> {
        match self.get(crate::constants::fields::SEQ_TAG) {
            Some(Value::Str(tag)) => Some(tag),
            _ => None,
        }
    }

    /// The reserved `seq_idx` field, when present and an integer.
    pub fn seq_idx(&self) -> Option<SeqIdx> {
        match self.get(crate::constants::fields::SEQ_IDX) {
            Some(Value::Int(idx)) => Some(*idx),
            _ => None,
        }
    }
}

impl From<IndexMap<FieldName, Value>> for Record {
    fn from(fields: IndexMap<FieldName, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(FieldName, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (FieldName, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_shape_must_match_storage() {
        let err = Array::new(vec![2, 3], ArrayData::I64(vec![1, 2, 3]));
        assert!(matches!(err, Err(PipelineError::Configuration(_))));
        let ok = Array::new(vec![2, 3], ArrayData::I64((0..6).collect()));
        assert!(ok.is_ok());
    }

    #[test]
    fn slice_leading_truncates_at_bounds() {
        let array = Array::from_i64((0..7).collect());
        let window = array.slice_leading(6, 9).unwrap();
        assert_eq!(window.shape(), &[1]);
        assert_eq!(window.data(), &ArrayData::I64(vec![6]));
    }

    #[test]
    fn slice_leading_respects_inner_axes() {
        let array = Array::new(vec![3, 2], ArrayData::F32(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        let window = array.slice_leading(1, 3).unwrap();
        assert_eq!(window.shape(), &[2, 2]);
        assert_eq!(window.data(), &ArrayData::F32(vec![2.0, 3.0, 4.0, 5.0]));
    }

    #[test]
    fn zero_axis_array_has_no_leading_slice() {
        assert!(Array::scalar_i64(7).slice_leading(0, 1).is_none());
    }

    #[test]
    fn u32_widens_to_i64() {
        let widened = Array::from_u32(vec![1, 2, u32::MAX])
            .normalize_dtype("data")
            .unwrap();
        assert_eq!(widened.dtype(), DType::I64);
        assert_eq!(widened.data(), &ArrayData::I64(vec![1, 2, u32::MAX as i64]));
    }

    #[test]
    fn u64_is_rejected() {
        let array = Array::new(vec![1], ArrayData::U64(vec![1])).unwrap();
        let err = array.normalize_dtype("data");
        assert!(matches!(err, Err(PipelineError::UnsupportedValue { .. })));
    }

    #[test]
    fn scalar_seq_len_is_one() {
        assert_eq!(Value::Int(5).seq_len(), 1);
        assert_eq!(Value::Str("tag".into()).seq_len(), 1);
        assert_eq!(Value::Array(Array::scalar_i64(3)).seq_len(), 1);
        assert_eq!(Value::Array(Array::from_i64(vec![1, 2, 3])).seq_len(), 3);
    }

    #[test]
    fn record_serde_round_trip() {
        let mut record = Record::new();
        record.insert("seq_tag", Value::Str("seq-0".into()));
        record.insert("seq_idx", Value::Int(0));
        record.insert("data", Array::from_i64(vec![1, 2, 3]));
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.seq_tag().map(String::as_str), Some("seq-0"));
        assert_eq!(back.seq_idx(), Some(0));
    }
}
