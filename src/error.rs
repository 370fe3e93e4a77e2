//! Error types
//!
//! Every failure aborts the whole transform: there is no best-effort mode.
//! - `ParseError`: malformed toolpath text
//! - `IntegrityError`: an internal invariant was violated (logic defect)
//! - `TableError`: malformed lookup table or coefficient list
//! - `ProfileError`: unreadable or malformed machine profile
//! - `SettingError`: a numeric setting outside its valid range

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::Point;

/// Malformed toolpath text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// An argument value that is not a number
    #[error("invalid numeric value '{token}' for command '{code}' in line '{line}' (parsed so far: {partial_args})")]
    InvalidNumber {
        /// The offending source line.
        line: String,
        /// The command code on that line.
        code: String,
        /// The token that failed to parse.
        token: String,
        /// Arguments parsed before the failure.
        partial_args: String,
    },

    /// A motion command names an axis without giving a coordinate
    #[error("axis '{axis}' has no numeric value in line '{line}'")]
    MissingAxisValue { line: String, axis: char },
}

/// Internal invariant violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("invalid move length {length} for line '{line}'")]
    InvalidLength { line: String, length: f64 },

    #[error("split move ends at {actual:?} instead of {expected:?}")]
    SplitMismatch { expected: Point, actual: Point },
}

/// Malformed lookup table or coefficient file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("malformed row {row}: '{content}'")]
    MalformedRow { row: usize, content: String },

    #[error("lookup table columns differ in length ({starts}, {ends}, {offsets})")]
    MisalignedColumns {
        starts: usize,
        ends: usize,
        offsets: usize,
    },

    #[error("lookup table has no rows")]
    Empty,

    #[error("expected {expected} model coefficients, found {found}")]
    CoefficientCount { expected: usize, found: usize },
}

/// Machine profile loading failures
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown profile '{0}'")]
    Unknown(String),
}

/// Settings that cannot drive a compensation pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingError {
    #[error("{name} must be a positive finite number, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

/// Umbrella error for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Setting(#[from] SettingError),

    #[error("invalid layer pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
