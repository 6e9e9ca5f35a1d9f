use indexmap::IndexMap;

use crate::errors::PipelineError;
use crate::sizes::BatchBudget;
use crate::types::{FieldName, TokenCount};

/// A per-field integer setting, given either as one value for every field or
/// as an explicit map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSpec {
    /// One value applied to every eligible field.
    Uniform(usize),
    /// Explicit values for the named fields only.
    PerField(IndexMap<FieldName, usize>),
}

/// Controls how sequences are sliced into fixed-size windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window length per field. The uniform form applies to every
    /// non-reserved field of the first record seen.
    pub size: FieldSpec,
    /// Window start stride per field; defaults to `size` (non-overlapping).
    /// When given, its form and key set must match `size`.
    pub step: Option<FieldSpec>,
}

impl ChunkingConfig {
    /// Non-overlapping windows of `size` elements for every eligible field.
    pub fn uniform(size: usize) -> Self {
        Self {
            size: FieldSpec::Uniform(size),
            step: None,
        }
    }

    /// Validate and collapse the accepted input forms into a [`ChunkPlan`].
    ///
    /// Runs once at pipeline construction; iteration never re-parses the
    /// configuration.
    pub fn normalize(&self) -> Result<ChunkPlan, PipelineError> {
        match (&self.size, &self.step) {
            (FieldSpec::Uniform(size), None) => ChunkPlan::uniform(*size, *size),
            (FieldSpec::Uniform(size), Some(FieldSpec::Uniform(step))) => {
                ChunkPlan::uniform(*size, *step)
            }
            (FieldSpec::PerField(sizes), None) => {
                ChunkPlan::per_field(sizes, sizes)
            }
            (FieldSpec::PerField(sizes), Some(FieldSpec::PerField(steps))) => {
                ChunkPlan::per_field(sizes, steps)
            }
            _ => Err(PipelineError::Configuration(
                "chunk size and step must both be uniform or both be per-field maps".to_string(),
            )),
        }
    }
}

/// One field's normalized window geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Window length; the final window of a sequence is truncated, not padded.
    pub size: usize,
    /// Start stride; smaller than `size` means overlapping windows.
    pub step: usize,
}

/// Normalized chunking settings: an explicit per-field window map, or one
/// window geometry applied to all non-reserved fields (resolved against the
/// first record at iteration time).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPlan {
    /// Apply one geometry to every non-reserved field.
    Uniform(Window),
    /// Apply explicit per-field geometries; other fields pass through whole.
    PerField(IndexMap<FieldName, Window>),
}

impl ChunkPlan {
    fn uniform(size: usize, step: usize) -> Result<Self, PipelineError> {
        Ok(ChunkPlan::Uniform(Self::window(size, step, None)?))
    }

    fn per_field(
        sizes: &IndexMap<FieldName, usize>,
        steps: &IndexMap<FieldName, usize>,
    ) -> Result<Self, PipelineError> {
        if sizes.is_empty() {
            return Err(PipelineError::Configuration(
                "per-field chunk size map must not be empty".to_string(),
            ));
        }
        let mut size_keys: Vec<&FieldName> = sizes.keys().collect();
        let mut step_keys: Vec<&FieldName> = steps.keys().collect();
        size_keys.sort();
        step_keys.sort();
        if size_keys != step_keys {
            return Err(PipelineError::Configuration(format!(
                "chunk size fields {size_keys:?} do not match chunk step fields {step_keys:?}"
            )));
        }
        let mut windows = IndexMap::new();
        for (field, size) in sizes {
            let step = steps.get(field).copied();
            windows.insert(field.clone(), Self::window(*size, step.unwrap_or(*size), Some(field))?);
        }
        Ok(ChunkPlan::PerField(windows))
    }

    fn window(size: usize, step: usize, field: Option<&str>) -> Result<Window, PipelineError> {
        let subject = match field {
            Some(field) => format!("chunking of field '{field}'"),
            None => "chunking".to_string(),
        };
        if size == 0 {
            return Err(PipelineError::Configuration(format!(
                "{subject}: chunk size must be strictly positive"
            )));
        }
        // Step 0 means "unset": fall back to non-overlapping windows.
        let step = if step == 0 { size } else { step };
        Ok(Window { size, step })
    }
}

/// A per-field token budget, given either uniformly or as an explicit map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BudgetSpec {
    /// One cap applied to every field.
    Uniform(TokenCount),
    /// Caps for the named fields; unnamed fields are unbounded.
    PerField(IndexMap<FieldName, TokenCount>),
}

/// Controls how records are grouped into batches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchingConfig {
    /// Cap on padded extent (`max_len_in_batch * batch_len`) per field;
    /// `None` means unbounded.
    pub budget: Option<BudgetSpec>,
    /// Cap on records per batch; `None` means unbounded.
    pub max_seqs: Option<usize>,
    /// Discard the final (possibly under-filled) batch instead of emitting it.
    pub drop_last: bool,
}

impl BatchingConfig {
    /// Validate and collapse the accepted input forms into a [`BatchPlan`].
    pub fn normalize(&self) -> Result<BatchPlan, PipelineError> {
        let budget = match &self.budget {
            None => BatchBudget::unbounded(),
            Some(BudgetSpec::Uniform(limit)) => BatchBudget::uniform(*limit),
            Some(BudgetSpec::PerField(limits)) => BatchBudget::per_field(limits.clone()),
        };
        if budget.min_limit() == Some(0) {
            return Err(PipelineError::Configuration(
                "batch token budget must be strictly positive".to_string(),
            ));
        }
        if self.max_seqs == Some(0) {
            return Err(PipelineError::Configuration(
                "max_seqs must be strictly positive".to_string(),
            ));
        }
        Ok(BatchPlan {
            budget,
            max_seqs: self.max_seqs.unwrap_or(usize::MAX),
            drop_last: self.drop_last,
        })
    }
}

/// Normalized batching settings consumed by the batcher.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchPlan {
    /// Per-field padded-extent caps.
    pub budget: BatchBudget,
    /// Record-count cap (`usize::MAX` when unbounded).
    pub max_seqs: usize,
    /// Discard the final under-filled batch.
    pub drop_last: bool,
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Optional chunking stage; `None` passes sequences through whole.
    pub chunking: Option<ChunkingConfig>,
    /// Batching stage settings.
    pub batching: BatchingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_map(pairs: &[(&str, usize)]) -> IndexMap<FieldName, usize> {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), *value))
            .collect()
    }

    #[test]
    fn uniform_step_defaults_to_size() {
        let plan = ChunkingConfig::uniform(50).normalize().unwrap();
        assert_eq!(plan, ChunkPlan::Uniform(Window { size: 50, step: 50 }));
    }

    #[test]
    fn zero_step_means_non_overlapping() {
        let config = ChunkingConfig {
            size: FieldSpec::Uniform(50),
            step: Some(FieldSpec::Uniform(0)),
        };
        let plan = config.normalize().unwrap();
        assert_eq!(plan, ChunkPlan::Uniform(Window { size: 50, step: 50 }));
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = ChunkingConfig::uniform(0).normalize();
        assert!(matches!(err, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn mixed_size_step_forms_are_rejected() {
        let config = ChunkingConfig {
            size: FieldSpec::Uniform(50),
            step: Some(FieldSpec::PerField(field_map(&[("data", 25)]))),
        };
        assert!(matches!(
            config.normalize(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn per_field_key_sets_must_match() {
        let config = ChunkingConfig {
            size: FieldSpec::PerField(field_map(&[("data", 50), ("classes", 10)])),
            step: Some(FieldSpec::PerField(field_map(&[("data", 25)]))),
        };
        assert!(matches!(
            config.normalize(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn overlapping_per_field_steps_are_allowed() {
        let config = ChunkingConfig {
            size: FieldSpec::PerField(field_map(&[("data", 50)])),
            step: Some(FieldSpec::PerField(field_map(&[("data", 25)]))),
        };
        match config.normalize().unwrap() {
            ChunkPlan::PerField(windows) => {
                assert_eq!(windows["data"], Window { size: 50, step: 25 });
            }
            plan => panic!("expected per-field plan, got {plan:?}"),
        }
    }

    #[test]
    fn empty_per_field_size_map_is_rejected() {
        let config = ChunkingConfig {
            size: FieldSpec::PerField(IndexMap::new()),
            step: None,
        };
        assert!(matches!(
            config.normalize(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn batching_rejects_zero_limits() {
        let config = BatchingConfig {
            budget: Some(BudgetSpec::Uniform(0)),
            max_seqs: None,
            drop_last: false,
        };
        assert!(matches!(
            config.normalize(),
            Err(PipelineError::Configuration(_))
        ));

        let config = BatchingConfig {
            budget: None,
            max_seqs: Some(0),
            drop_last: false,
        };
        assert!(matches!(
            config.normalize(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn absent_limits_mean_unbounded() {
        let plan = BatchingConfig::default().normalize().unwrap();
        assert_eq!(plan.max_seqs, usize::MAX);
        assert_eq!(plan.budget.limit_for("data"), None);
    }
}
