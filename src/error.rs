use thiserror::Error;

/// Error taxonomy for the describe/diff/transform pipeline.
///
/// `Format`, `Validation`, and `SchemaMismatch` are fatal to the whole run:
/// a single corrupted value means the descriptor or the input is
/// systematically wrong, so there is no per-row recovery. `UnsupportedChange`
/// is recoverable; the row loop logs it and keeps going.
#[derive(Debug, Error)]
pub enum RecastError {
    /// The input cannot be split into a usable layout (e.g. an empty sample file).
    #[error("format error: {0}")]
    Format(String),

    /// A data value violates the fixed-width/decimal/sign invariants
    /// required by a managed type transition.
    #[error("column {column}: bad value {value:?}: {reason}")]
    Validation {
        column: String,
        value: String,
        reason: String,
    },

    /// A row carries fewer fields than the transformation descriptor requires.
    #[error("line {line}: row has {found} column(s), descriptor requires {expected}")]
    SchemaMismatch {
        line: u64,
        found: usize,
        expected: usize,
    },

    /// A change kind that is recognized but has no implementation.
    #[error("column {column}: change '{kind}' is not implemented")]
    UnsupportedChange { column: String, kind: String },
}
