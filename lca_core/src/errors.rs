//! # Error Types
//!
//! Structured error types for lca_core. Errors fall into two groups:
//!
//! - **Fatal** errors abort the call that raised them: the building model or
//!   the impact database cannot be used at all ([`LcaError::ModelAccess`],
//!   [`LcaError::DatabaseUnavailable`]).
//! - **Data-quality** errors describe a single element, material or scenario
//!   ([`LcaError::DatabaseMiss`], [`LcaError::UnitConversion`],
//!   [`LcaError::UnitMismatch`]). The analysis and optioneering engines catch
//!   these, count them and attach them to their results.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::errors::{LcaError, LcaResult};
//!
//! fn require_density(material_id: &str, density: Option<f64>) -> LcaResult<f64> {
//!     match density {
//!         Some(d) if d > 0.0 => Ok(d),
//!         _ => Err(LcaError::missing_density(material_id)),
//!     }
//! }
//!
//! let err = require_density("KBOB_CONCRETE_C30_37", None).unwrap_err();
//! assert_eq!(err.error_code(), "UNIT_CONVERSION");
//! assert!(!err.is_fatal());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for lca_core operations
pub type LcaResult<T> = Result<T, LcaError>;

/// Structured error type for LCA operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum LcaError {
    /// The building model lacks a capability the core needs
    #[error("Model access error ({schema}): {reason}")]
    ModelAccess { schema: String, reason: String },

    /// The impact database cannot be queried
    #[error("Database unavailable: {reason}")]
    DatabaseUnavailable { reason: String },

    /// A database identifier has no entry
    #[error("Material '{material_id}' not found in database")]
    DatabaseMiss { material_id: String },

    /// A quantity could not be converted into the entry's reference unit
    #[error("Unit conversion failed for '{material_id}': {reason}")]
    UnitConversion { material_id: String, reason: String },

    /// The element offers no quantity of the kind the entry's factors expect
    #[error("Unit mismatch for '{material_id}': factors are per {expected}, element provides {found}")]
    UnitMismatch {
        material_id: String,
        expected: String,
        found: String,
    },

    /// An input value is invalid (out of range, empty, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl LcaError {
    /// Create a ModelAccess error
    pub fn model_access(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::ModelAccess {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    /// Create a DatabaseUnavailable error
    pub fn database_unavailable(reason: impl Into<String>) -> Self {
        LcaError::DatabaseUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a DatabaseMiss error
    pub fn database_miss(material_id: impl Into<String>) -> Self {
        LcaError::DatabaseMiss {
            material_id: material_id.into(),
        }
    }

    /// Create a UnitConversion error for an entry without a usable density
    pub fn missing_density(material_id: impl Into<String>) -> Self {
        LcaError::UnitConversion {
            material_id: material_id.into(),
            reason: "density is missing or zero, cannot convert volume to mass".to_string(),
        }
    }

    /// Create a UnitMismatch error
    pub fn unit_mismatch(
        material_id: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        LcaError::UnitMismatch {
            material_id: material_id.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        LcaError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Whether this error makes the model or database unusable for the whole call
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LcaError::ModelAccess { .. } | LcaError::DatabaseUnavailable { .. }
        )
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LcaError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            LcaError::ModelAccess { .. } => "MODEL_ACCESS",
            LcaError::DatabaseUnavailable { .. } => "DATABASE_UNAVAILABLE",
            LcaError::DatabaseMiss { .. } => "DATABASE_MISS",
            LcaError::UnitConversion { .. } => "UNIT_CONVERSION",
            LcaError::UnitMismatch { .. } => "UNIT_MISMATCH",
            LcaError::InvalidInput { .. } => "INVALID_INPUT",
            LcaError::FileError { .. } => "FILE_ERROR",
            LcaError::FileLocked { .. } => "FILE_LOCKED",
            LcaError::SerializationError { .. } => "SERIALIZATION_ERROR",
            LcaError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for LcaError {
    fn from(e: serde_json::Error) -> Self {
        LcaError::SerializationError {
            reason: e.to_string(),
        }
    }
}
