//! Field-wise size accounting for the greedy batcher.
//!
//! The batcher compares vector-valued costs (one entry per field) against
//! vector-valued limits. Keeping those as explicit value types keeps the
//! grouping algorithm itself a single reusable unit.

use indexmap::IndexMap;

use crate::data::Record;
use crate::types::{FieldName, TokenCount};

/// Per-field sequence lengths, with elementwise max and scalar multiply.
///
/// Entry order follows the record that produced the sizes, so log output and
/// error messages list fields in dataset order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSizes {
    entries: IndexMap<FieldName, TokenCount>,
}

impl FieldSizes {
    /// Sizes with no entries; the identity for [`FieldSizes::elementwise_max`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Measure a record: leading-axis extent per array field, 1 for scalars.
    pub fn of_record(record: &Record) -> Self {
        Self {
            entries: record
                .iter()
                .map(|(name, value)| (name.clone(), value.seq_len() as TokenCount))
                .collect(),
        }
    }

    /// Look up one field's size; absent fields count as 0.
    pub fn get(&self, field: &str) -> TokenCount {
        self.entries.get(field).copied().unwrap_or(0)
    }

    /// Entry-wise maximum over the union of both key sets.
    pub fn elementwise_max(&self, other: &FieldSizes) -> FieldSizes {
        let mut entries = self.entries.clone();
        for (field, size) in &other.entries {
            entries
                .entry(field.clone())
                .and_modify(|current| *current = (*current).max(*size))
                .or_insert(*size);
        }
        FieldSizes { entries }
    }

    /// Multiply every entry by a scalar (padded cost of a batch of `factor`).
    pub fn scaled(&self, factor: TokenCount) -> FieldSizes {
        FieldSizes {
            entries: self
                .entries
                .iter()
                .map(|(field, size)| (field.clone(), size.saturating_mul(factor)))
                .collect(),
        }
    }

    /// Whether any entry strictly exceeds its budget limit.
    ///
    /// Strict comparison: a cost exactly at the limit fits.
    pub fn any_exceeds(&self, budget: &BatchBudget) -> bool {
        self.entries.iter().any(|(field, cost)| match budget.limit_for(field) {
            Some(limit) => *cost > limit,
            None => false,
        })
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, TokenCount)> {
        self.entries.iter().map(|(field, size)| (field, *size))
    }
}

/// Per-field caps on padded extent (`max_len_in_batch * batch_len`).
///
/// A field without an entry is unbounded. The uniform form applies one cap to
/// every field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchBudget {
    per_field: IndexMap<FieldName, TokenCount>,
    uniform: Option<TokenCount>,
}

impl BatchBudget {
    /// A budget that bounds nothing.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// One cap applied to every field.
    pub fn uniform(limit: TokenCount) -> Self {
        Self {
            per_field: IndexMap::new(),
            uniform: Some(limit),
        }
    }

    /// Individual caps for the named fields; unnamed fields are unbounded.
    pub fn per_field(limits: IndexMap<FieldName, TokenCount>) -> Self {
        Self {
            per_field: limits,
            uniform: None,
        }
    }

    /// The cap for one field, or `None` when unbounded.
    pub fn limit_for(&self, field: &str) -> Option<TokenCount> {
        self.per_field.get(field).copied().or(self.uniform)
    }

    /// Smallest configured cap, used for construction-time validation.
    pub fn min_limit(&self) -> Option<TokenCount> {
        self.per_field
            .values()
            .copied()
            .chain(self.uniform)
            .min()
    }
}
