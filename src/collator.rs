//! Pads and stacks one batch of records into uniform containers.
//!
//! Every numeric field is right-padded with its dtype's zero along every axis
//! to the per-axis maximum observed in the batch, then stacked along a new
//! leading batch axis. For each such field the collated output additionally
//! carries `<field>:size0` (batch cardinality) and `<field>:size<k>` (the
//! ordered pre-pad extents of axis `k`, one per record). String values pass
//! through unpadded as plain per-batch sequences.

use indexmap::IndexMap;

use crate::constants::collate::size_field;
use crate::data::{Array, ArrayData, DType, Record, Value};
use crate::errors::PipelineError;
use crate::types::FieldName;

/// One collated field: a padded, stacked array or a raw passthrough sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum CollatedValue {
    /// Padded containers stacked along a new leading batch axis.
    Tensor(Array),
    /// Non-numeric values in batch order, unpadded.
    Raw(Vec<Value>),
}

/// A padded batch: ordered field map plus derived size-metadata fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollatedBatch {
    fields: IndexMap<FieldName, CollatedValue>,
}

impl CollatedBatch {
    /// Look up a collated field or derived size field by name.
    pub fn get(&self, name: &str) -> Option<&CollatedValue> {
        self.fields.get(name)
    }

    /// Look up a field expected to be a stacked tensor.
    pub fn tensor(&self, name: &str) -> Option<&Array> {
        match self.fields.get(name) {
            Some(CollatedValue::Tensor(array)) => Some(array),
            _ => None,
        }
    }

    /// Pre-pad extents of `field` along `axis` (>= 1), in batch order.
    pub fn axis_sizes(&self, field: &str, axis: usize) -> Option<Vec<i64>> {
        match self.tensor(&size_field(field, axis))?.data() {
            ArrayData::I64(sizes) => Some(sizes.clone()),
            _ => None,
        }
    }

    /// Batch cardinality recorded for `field`, when the field was stacked.
    pub fn cardinality(&self, field: &str) -> Option<i64> {
        match self.tensor(&size_field(field, 0))?.data() {
            ArrayData::I64(values) => values.first().copied(),
            _ => None,
        }
    }

    /// Field names (including derived size fields) in output order.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }

    /// Iterate collated fields in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &CollatedValue)> {
        self.fields.iter()
    }
}

/// Extracts same-variant storage slices from arrays whose dtype uniformity
/// was validated beforehand, pads, stacks, and rewraps them.
macro_rules! stack_as {
    ($variant:ident, $arrays:expr, $shapes:expr, $max_shape:expr) => {{
        let slices: Vec<&[_]> = $arrays
            .iter()
            .map(|array| match array.data() {
                ArrayData::$variant(values) => values.as_slice(),
                data => unreachable!("dtype validated uniform, got {data:?}"),
            })
            .collect();
        ArrayData::$variant(pad_stack(&slices, $shapes, $max_shape))
    }};
}

/// Collate a non-empty batch of records sharing one field-name set.
///
/// The first record's key set is authoritative; a record missing one of its
/// fields, mixed dtypes or ranks within a field, and field names that collide
/// with derived `<field>:size<k>` names are all fatal.
pub fn collate(batch: &[Record]) -> Result<CollatedBatch, PipelineError> {
    let first = batch.first().ok_or(PipelineError::EmptyBatch)?;

    let mut fields: IndexMap<FieldName, CollatedValue> = IndexMap::new();
    for field in first.field_names() {
        let mut values = Vec::with_capacity(batch.len());
        for record in batch {
            values.push(record.get(field).ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "record {:?} does not carry field '{field}' present in the batch's first \
                     record",
                    record.seq_tag()
                ))
            })?);
        }

        if matches!(values[0], Value::Str(_)) {
            // No padding and no derived size fields for non-numeric values.
            let raw = values.into_iter().cloned().collect();
            fields.insert(field.clone(), CollatedValue::Raw(raw));
            continue;
        }

        let arrays = numeric_arrays(field, &values)?;
        let stacked = stack_padded(field, &arrays)?;
        let rank = arrays[0].rank();

        fields.insert(field.clone(), CollatedValue::Tensor(stacked));
        insert_derived(&mut fields, first, field, 0, Array::scalar_i64(batch.len() as i64))?;
        for axis in 1..=rank {
            let extents: Vec<i64> = arrays
                .iter()
                .map(|array| array.shape()[axis - 1] as i64)
                .collect();
            insert_derived(&mut fields, first, field, axis, Array::from_i64(extents))?;
        }
    }

    Ok(CollatedBatch { fields })
}

/// Convert every record's value for one field into a dtype-normalized array,
/// requiring uniform dtype and rank across the batch.
fn numeric_arrays(field: &str, values: &[&Value]) -> Result<Vec<Array>, PipelineError> {
    let mut arrays = Vec::with_capacity(values.len());
    for value in values {
        let array = match value {
            Value::Array(array) => array.clone(),
            Value::Int(value) => Array::scalar_i64(*value),
            Value::Float(value) => Array::scalar_f64(*value),
            Value::Bool(value) => Array::scalar_bool(*value),
            Value::Str(_) => {
                return Err(PipelineError::UnsupportedValue {
                    field: field.to_string(),
                    details: "field mixes string and numeric values across the batch".to_string(),
                });
            }
        };
        arrays.push(array.normalize_dtype(field)?);
    }

    let dtype = arrays[0].dtype();
    let rank = arrays[0].rank();
    for array in &arrays[1..] {
        if array.dtype() != dtype || array.rank() != rank {
            return Err(PipelineError::UnsupportedValue {
                field: field.to_string(),
                details: format!(
                    "cannot stack {:?} of rank {} with {dtype:?} of rank {rank}",
                    array.dtype(),
                    array.rank()
                ),
            });
        }
    }
    Ok(arrays)
}

/// Pad all arrays to the per-axis maximum and stack on a new leading axis.
fn stack_padded(field: &str, arrays: &[Array]) -> Result<Array, PipelineError> {
    let rank = arrays[0].rank();
    let mut max_shape = vec![0usize; rank];
    for array in arrays {
        for (axis, extent) in array.shape().iter().enumerate() {
            max_shape[axis] = max_shape[axis].max(*extent);
        }
    }

    let shapes: Vec<&[usize]> = arrays.iter().map(Array::shape).collect();
    let data = match arrays[0].dtype() {
        DType::Bool => stack_as!(Bool, arrays, &shapes, &max_shape),
        DType::I8 => stack_as!(I8, arrays, &shapes, &max_shape),
        DType::I16 => stack_as!(I16, arrays, &shapes, &max_shape),
        DType::I32 => stack_as!(I32, arrays, &shapes, &max_shape),
        DType::I64 => stack_as!(I64, arrays, &shapes, &max_shape),
        DType::U8 => stack_as!(U8, arrays, &shapes, &max_shape),
        DType::F32 => stack_as!(F32, arrays, &shapes, &max_shape),
        DType::F64 => stack_as!(F64, arrays, &shapes, &max_shape),
        dtype => {
            return Err(PipelineError::UnsupportedValue {
                field: field.to_string(),
                details: format!("dtype {dtype:?} escaped normalization"),
            });
        }
    };

    let mut stacked_shape = Vec::with_capacity(rank + 1);
    stacked_shape.push(arrays.len());
    stacked_shape.extend_from_slice(&max_shape);
    Ok(Array::from_parts(stacked_shape, data))
}

/// Right-pad each source into a zero-filled destination of `max_shape` and
/// concatenate along a new leading axis.
fn pad_stack<T: Copy + Default>(
    slices: &[&[T]],
    shapes: &[&[usize]],
    max_shape: &[usize],
) -> Vec<T> {
    let per_item: usize = max_shape.iter().product();
    let mut out = vec![T::default(); slices.len() * per_item];
    for (index, (slice, shape)) in slices.iter().zip(shapes.iter()).enumerate() {
        copy_padded(
            slice,
            shape,
            &mut out[index * per_item..(index + 1) * per_item],
            max_shape,
        );
    }
    out
}

fn copy_padded<T: Copy>(src: &[T], src_shape: &[usize], dst: &mut [T], dst_shape: &[usize]) {
    if src_shape.is_empty() {
        if let (Some(value), Some(slot)) = (src.first(), dst.first_mut()) {
            *slot = *value;
        }
        return;
    }
    let src_inner: usize = src_shape[1..].iter().product();
    let dst_inner: usize = dst_shape[1..].iter().product();
    for index in 0..src_shape[0] {
        copy_padded(
            &src[index * src_inner..(index + 1) * src_inner],
            &src_shape[1..],
            &mut dst[index * dst_inner..(index + 1) * dst_inner],
            &dst_shape[1..],
        );
    }
}

fn insert_derived(
    fields: &mut IndexMap<FieldName, CollatedValue>,
    first: &Record,
    field: &str,
    axis: usize,
    sizes: Array,
) -> Result<(), PipelineError> {
    let name = size_field(field, axis);
    if first.contains(&name) {
        return Err(PipelineError::Configuration(format!(
            "field '{name}' collides with the derived size field of '{field}'"
        )));
    }
    fields.insert(name, CollatedValue::Tensor(sizes));
    Ok(())
}
