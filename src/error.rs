//! Typed input errors that callers can detect with [`Report::downcast_ref`](color_eyre::eyre::Report::downcast_ref).

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the content of an input table.
///
/// These travel inside a [`Report`](color_eyre::eyre::Report), file path context is
/// attached by the caller with `wrap_err_with`.
///
/// ```rust
/// use color_eyre::eyre::Report;
/// use strainer::InputError;
///
/// let report = Report::new(InputError::UnmappedScaffold { scaffold: "s1".to_string() })
///     .wrap_err("Failed to filter SNVs.");
/// assert!(matches!(
///     report.downcast_ref::<InputError>(),
///     Some(InputError::UnmappedScaffold { .. })
/// ));
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InputError {
    #[error("Scaffold {scaffold:?} is not assigned to any genome.")]
    UnmappedScaffold { scaffold: String },

    #[error("Column {column:?} is missing from table: {path:?}")]
    MissingColumn { column: String, path: Option<PathBuf> },

    #[error("Invalid value {value:?} in column {column:?}: {reason}")]
    InvalidField { column: String, value: String, reason: String },

    #[error("Scaffold {scaffold:?} is assigned to more than one genome: {first:?} and {second:?}")]
    DuplicateScaffold { scaffold: String, first: String, second: String },

    #[error("SNV {id:?} is observed more than once in experiment {experiment:?}.")]
    DuplicateObservation { id: String, experiment: String },
}

impl InputError {
    /// Shorthand for an [`InputError::InvalidField`].
    pub fn invalid_field(column: &str, value: &str, reason: impl ToString) -> Self {
        InputError::InvalidField {
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
