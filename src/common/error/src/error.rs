//! Core error types for Tessel.

use thiserror::Error;

/// Result type alias using `TesselError`.
pub type TesselResult<T> = std::result::Result<T, TesselError>;

/// Core error type for Tessel operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TesselError {
    /// Two expressions in one list share a display name.
    #[error("DuplicateNameError: {0}")]
    DuplicateName(String),

    /// A required column reference could not be found in the binding schema.
    #[error("UnresolvedColumnError: {0}")]
    UnresolvedColumn(String),

    /// An expression is type-inconsistent with its resolved inputs.
    #[error("TypeResolutionError: {0}")]
    TypeResolution(String),

    /// A requested projection name is absent.
    #[error("NotFoundError: {0}")]
    NotFound(String),

    /// The same name is bound to structurally different expressions.
    #[error("ConflictError: {0}")]
    Conflict(String),

    /// Partition or tile invariants are violated.
    #[error("StructuralInvariantError: {0}")]
    StructuralInvariant(String),

    /// A join mode other than inner was requested.
    #[error("UnsupportedJoinError: {0}")]
    UnsupportedJoin(String),

    /// Type mismatch inside a block kernel.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// Block or expression execution error.
    #[error("ExecutionError: {0}")]
    ExecutionError(String),

    /// Internal error (bug in Tessel).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Arrow error.
    #[error("ArrowError: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl TesselError {
    /// Create a new `DuplicateName` error.
    pub fn duplicate_name<S: Into<String>>(msg: S) -> Self {
        Self::DuplicateName(msg.into())
    }

    /// Create a new `UnresolvedColumn` error.
    pub fn unresolved_column<S: Into<String>>(msg: S) -> Self {
        Self::UnresolvedColumn(msg.into())
    }

    /// Create a new `TypeResolution` error.
    pub fn type_resolution<S: Into<String>>(msg: S) -> Self {
        Self::TypeResolution(msg.into())
    }

    /// Create a new `NotFound` error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new `Conflict` error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new `StructuralInvariant` error.
    pub fn structural<S: Into<String>>(msg: S) -> Self {
        Self::StructuralInvariant(msg.into())
    }

    /// Create a new `UnsupportedJoin` error.
    pub fn unsupported_join<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedJoin(msg.into())
    }

    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `ExecutionError`.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Ensure a condition holds, returning an `ExecutionError` if not.
///
/// Prefixing the message with a variant name picks the variant:
/// `ensure!(cond, StructuralInvariant: "...")`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::TesselError::$variant(format!($($msg)*)));
        }
    };
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::TesselError::ExecutionError($msg.to_string()));
        }
    };
}

/// Return early with a `ValueError`.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::TesselError::ValueError(format!($($arg)*)))
    };
}

/// Return early with a `StructuralInvariant` error.
#[macro_export]
macro_rules! structural_err {
    ($($arg:tt)*) => {
        return Err($crate::TesselError::StructuralInvariant(format!($($arg)*)))
    };
}
