/// Constants describing reserved record fields.
pub mod fields {
    /// Reserved field holding the stable string identifier of a sequence.
    /// Never chunked; copied into every chunk of its source record.
    pub const SEQ_TAG: &str = "seq_tag";
    /// Reserved field holding the integer index of a sequence.
    /// Never chunked; copied into every chunk of its source record.
    pub const SEQ_IDX: &str = "seq_idx";

    /// Returns true for fields that are passthrough metadata, never chunked.
    pub fn is_reserved(name: &str) -> bool {
        name == SEQ_TAG || name == SEQ_IDX
    }
}

/// Constants describing derived size-metadata fields emitted by collation.
pub mod collate {
    /// Separator between a field name and its derived size suffix.
    /// Example derived name: `data:size1`.
    pub const SIZE_SEPARATOR: &str = ":size";

    /// Derived field name carrying the pre-pad extents of `field` along `axis`.
    /// Axis 0 is batch cardinality; axes >= 1 are the value's own axes.
    pub fn size_field(field: &str, axis: usize) -> String {
        format!("{field}{SIZE_SEPARATOR}{axis}")
    }
}
