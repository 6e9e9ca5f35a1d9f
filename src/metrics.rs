//! Padding-efficiency metrics over collated batches.

use crate::collator::CollatedBatch;
use crate::constants::collate::SIZE_SEPARATOR;
use crate::types::FieldName;

/// Aggregate padding metrics for one collated batch.
#[derive(Clone, Debug, PartialEq)]
pub struct PaddingStats {
    /// Padded cells across all stacked fields.
    pub total_cells: u64,
    /// Cells occupied by real (pre-pad) data.
    pub occupied_cells: u64,
    /// `occupied_cells / total_cells`, 1.0 for an empty field set.
    pub fill_ratio: f64,
    /// Per-field breakdown in batch field order.
    pub per_field: Vec<FieldFill>,
}

/// Padding metrics for a single stacked field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFill {
    pub field: FieldName,
    pub total_cells: u64,
    pub occupied_cells: u64,
    pub fill_ratio: f64,
}

/// Compute fill ratios for every stacked field of a collated batch.
///
/// Derived `<field>:size<k>` entries and raw passthrough fields are skipped.
/// Returns `None` when the batch has no stacked fields.
pub fn padding_stats(batch: &CollatedBatch) -> Option<PaddingStats> {
    let mut per_field = Vec::new();
    for field in batch.field_names() {
        if field.contains(SIZE_SEPARATOR) {
            continue;
        }
        let Some(tensor) = batch.tensor(field) else {
            continue;
        };
        let total_cells: u64 = tensor.shape().iter().product::<usize>() as u64;
        let rank = tensor.rank().saturating_sub(1);
        let occupied_cells = if rank == 0 {
            // Stacked scalars carry no padding.
            total_cells
        } else {
            let per_axis: Vec<Vec<i64>> = (1..=rank)
                .map(|axis| batch.axis_sizes(field, axis))
                .collect::<Option<_>>()?;
            let records = per_axis[0].len();
            (0..records)
                .map(|idx| {
                    per_axis
                        .iter()
                        .map(|sizes| sizes[idx] as u64)
                        .product::<u64>()
                })
                .sum()
        };
        per_field.push(FieldFill {
            field: field.clone(),
            total_cells,
            occupied_cells,
            fill_ratio: ratio(occupied_cells, total_cells),
        });
    }

    if per_field.is_empty() {
        return None;
    }
    let total_cells: u64 = per_field.iter().map(|fill| fill.total_cells).sum();
    let occupied_cells: u64 = per_field.iter().map(|fill| fill.occupied_cells).sum();
    Some(PaddingStats {
        total_cells,
        occupied_cells,
        fill_ratio: ratio(occupied_cells, total_cells),
        per_field,
    })
}

fn ratio(occupied: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        occupied as f64 / total as f64
    }
}
