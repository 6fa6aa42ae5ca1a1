//! Error types for sparse matrix operations and factorizations.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by matrix construction, analysis, factorization and solves.
///
/// Numerical outcomes such as an indefinite matrix or a singular pivot column
/// are ordinary values of this type; callers decide whether to retry with a
/// different ordering or tolerance.
#[derive(Error, Debug)]
pub enum Error {
    /// Operand dimensions are incompatible.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Expected (rows, columns).
        expected: (usize, usize),
        /// Actual (rows, columns).
        got: (usize, usize),
    },

    /// A triplet entry lies outside the matrix dimensions.
    #[error("entry ({row}, {col}) is outside the {m}-by-{n} matrix")]
    EntryOutOfBounds {
        row: usize,
        col: usize,
        m: usize,
        n: usize,
    },

    /// The operation requires a square matrix.
    #[error("matrix must be square, got {m}-by-{n}")]
    NotSquare { m: usize, n: usize },

    /// The matrix holds a nonzero pattern but no numerical values.
    #[error("matrix has no numerical values")]
    PatternOnly,

    /// An array is not a permutation of `0..n`.
    #[error("invalid permutation of length {n}")]
    InvalidPermutation { n: usize },

    /// A Cholesky pivot was not positive.
    #[error("matrix is not positive definite (column {column})")]
    NotPositiveDefinite { column: usize },

    /// No acceptable pivot exists in a column of an LU factorization.
    #[error("matrix is singular (column {column})")]
    Singular { column: usize },

    /// The triangular factor R of a QR factorization has a zero or negligible
    /// diagonal entry.
    #[error("matrix is rank deficient (column {column} of R)")]
    RankDeficient { column: usize },

    /// A downdate would make the factor indefinite.
    #[error("downdate failed at column {column}; the factor is left unchanged")]
    DowndateFailed { column: usize },

    /// An update produced a non-finite value in the factor.
    #[error("update failed at column {column}; the factor is left unchanged")]
    UpdateFailed { column: usize },

    /// An update column has an entry off the elimination-tree path of its first row.
    #[error("update entry in row {row} is not on the elimination tree path")]
    UpdatePattern { row: usize },

    /// QR factorization requires at least as many rows as columns.
    #[error("QR factorization requires m >= n, got {m}-by-{n}")]
    Underdetermined { m: usize, n: usize },

    /// Malformed matrix record.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Index base other than 0 or 1.
    #[error("index base must be 0 or 1, got {0}")]
    InvalidBase(usize),

    /// Storage for the triplet matrix could not be grown.
    #[error("out of memory: failed to grow storage to {capacity} entries")]
    OutOfMemory { capacity: usize },

    /// I/O failure while reading a matrix.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
