/// Name of a record field.
/// Examples: `data`, `classes`, `audio_features`
pub type FieldName = String;
/// Stable string identifier of a source sequence.
/// Example: `train-clean/103-1240-0000`
pub type SeqTag = String;
/// Zero-based index of a sequence within its dataset epoch.
pub type SeqIdx = i64;
/// Padded-extent cost unit (`max_len_in_batch * batch_len`) used by budgets.
pub type TokenCount = u64;
/// Stable identifier of an upstream record source.
/// Examples: `in_memory`, `librispeech_train`
pub type SourceId = String;
