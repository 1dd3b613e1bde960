//! # Error Kinds
//!
//! All public operations return `eyre::Result`. Failures that callers may want
//! to branch on are raised as a [`StructError`] inside the report, so the
//! kind survives propagation through `?`:
//!
//! ```ignore
//! match storage.read(&field) {
//!     Err(e) if error_kind(&e) == Some(ErrorKind::AbsentChild) => { /* not set yet */ }
//!     other => { other?; }
//! }
//! ```
//!
//! | Kind | Raised by |
//! |------|-----------|
//! | `Schema` | `StructBuilder::build`, `compile` on a flagged root |
//! | `Compilation` | oversized stride, oversized union, layout invariant violation at commit |
//! | `UnknownField` | path resolution, handle used against another schema |
//! | `TypeMismatch` | wrong value variant, out-of-range integer, wrong handle kind |
//! | `Index` | cursor out of bounds, no cursor, growth of a fixed storage |
//! | `AbsentChild` | read under an optional child that is not present |
//! | `UnselectedUnion` | read of a union slot that never had a member selected |
//! | `NotFound` | list retrieval before creation |

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructError {
    #[error("schema error at '{path}': {detail}")]
    Schema { path: String, detail: String },

    #[error("compilation error at '{path}': {detail}")]
    Compilation { path: String, detail: String },

    #[error("unknown field or struct '{path}'")]
    UnknownField { path: String },

    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("index {index} out of bounds for capacity {capacity}")]
    Index { index: usize, capacity: usize },

    #[error("no structure selected")]
    NoSelection,

    #[error("optional child '{path}' is absent at index {index}")]
    AbsentChild { path: String, index: usize },

    #[error("union '{path}' has no selected member at index {index}")]
    UnselectedUnion { path: String, index: usize },

    #[error("list '{path}' has not been created at index {index}")]
    NotFound { path: String, index: usize },
}

/// Fieldless discriminant of [`StructError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    Compilation,
    UnknownField,
    TypeMismatch,
    Index,
    AbsentChild,
    UnselectedUnion,
    NotFound,
}

impl StructError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StructError::Schema { .. } => ErrorKind::Schema,
            StructError::Compilation { .. } => ErrorKind::Compilation,
            StructError::UnknownField { .. } => ErrorKind::UnknownField,
            StructError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            StructError::Index { .. } | StructError::NoSelection => ErrorKind::Index,
            StructError::AbsentChild { .. } => ErrorKind::AbsentChild,
            StructError::UnselectedUnion { .. } => ErrorKind::UnselectedUnion,
            StructError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub(crate) fn schema(path: impl Into<String>, detail: impl Into<String>) -> Self {
        StructError::Schema {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn compilation(path: impl Into<String>, detail: impl Into<String>) -> Self {
        StructError::Compilation {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn unknown(path: impl Into<String>) -> Self {
        StructError::UnknownField { path: path.into() }
    }

    pub(crate) fn mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        StructError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Extracts the [`ErrorKind`] carried by a report, if it carries one.
pub fn error_kind(report: &eyre::Report) -> Option<ErrorKind> {
    report.downcast_ref::<StructError>().map(StructError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_eyre_conversion() {
        let report: eyre::Report = StructError::NoSelection.into();
        assert_eq!(error_kind(&report), Some(ErrorKind::Index));
    }

    #[test]
    fn plain_eyre_report_has_no_kind() {
        let report = eyre::eyre!("something else");
        assert_eq!(error_kind(&report), None);
    }

    #[test]
    fn messages_name_the_path() {
        let err = StructError::AbsentChild {
            path: "Child.Opt".into(),
            index: 3,
        };
        assert_eq!(
            err.to_string(),
            "optional child 'Child.Opt' is absent at index 3"
        );
    }
}
