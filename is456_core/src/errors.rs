//! # Error Types
//!
//! Structured error types for is456_core. Every domain error carries the
//! offending values and, where a code rule was violated, the clause it came
//! from. That keeps the audit trail intact when an error crosses the API
//! boundary and gets rendered by a UI or written to a report.
//!
//! Two layers exist:
//!
//! - [`CalcError`] - raised by the engines, one variant per failure kind
//! - [`ApiError`] - what the orchestration API hands out: the `CalcError`
//!   plus a clause citation and an actionable suggestion
//!
//! "Design not achievable" outcomes (section too small for the moment,
//! no cheap compliant arrangement) are *not* errors. They come back as
//! result objects with explicit flags.
//!
//! ## Example
//!
//! ```rust
//! use is456_core::errors::{CalcError, CalcResult};
//!
//! fn validate_span(span_mm: f64) -> CalcResult<()> {
//!     if span_mm <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "span_mm",
//!             span_mm.to_string(),
//!             "Span must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_span(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for is456_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for design operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (negative force, NaN, empty case list)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Geometry violates a code minimum/maximum dimension rule
    #[error("Dimension error for '{field}': {value} - {reason} [{clause}]")]
    Dimension {
        field: String,
        value: String,
        reason: String,
        clause: String,
    },

    /// Unrecognized or invalid material grade
    #[error("Material error: {grade} - {reason} [{clause}]")]
    Material {
        grade: String,
        reason: String,
        clause: String,
    },

    /// No bar or stirrup arrangement fits the section
    #[error(
        "No feasible arrangement for {required_ast_mm2:.0} mm² \
         in {available_width_mm:.0} mm: {reason} [{clause}]"
    )]
    Configuration {
        required_ast_mm2: f64,
        available_width_mm: f64,
        reason: String,
        clause: String,
    },

    /// A check failed and the caller asked for strict mode
    #[error("Compliance failure ({}): {reason} [{clause}]", .failed_checks.join(", "))]
    Compliance {
        failed_checks: Vec<String>,
        reason: String,
        clause: String,
    },

    /// An injected design table is malformed
    #[error("Table error in '{table}': {reason}")]
    Table { table: String, reason: String },

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

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a Dimension error
    pub fn dimension(
        field: impl Into<String>,
        value: f64,
        reason: impl Into<String>,
        clause: impl Into<String>,
    ) -> Self {
        CalcError::Dimension {
            field: field.into(),
            value: format!("{value}"),
            reason: reason.into(),
            clause: clause.into(),
        }
    }

    /// Create a Material error
    pub fn material(
        grade: impl Into<String>,
        reason: impl Into<String>,
        clause: impl Into<String>,
    ) -> Self {
        CalcError::Material {
            grade: grade.into(),
            reason: reason.into(),
            clause: clause.into(),
        }
    }

    /// Create a Configuration error
    pub fn configuration(
        required_ast_mm2: f64,
        available_width_mm: f64,
        reason: impl Into<String>,
        clause: impl Into<String>,
    ) -> Self {
        CalcError::Configuration {
            required_ast_mm2,
            available_width_mm,
            reason: reason.into(),
            clause: clause.into(),
        }
    }

    /// Create a Compliance error
    pub fn compliance(
        failed_checks: Vec<String>,
        reason: impl Into<String>,
        clause: impl Into<String>,
    ) -> Self {
        CalcError::Compliance {
            failed_checks,
            reason: reason.into(),
            clause: clause.into(),
        }
    }

    /// Create a Table error
    pub fn table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::Table {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::Dimension { .. } => "DIMENSION_ERROR",
            CalcError::Material { .. } => "MATERIAL_ERROR",
            CalcError::Configuration { .. } => "CONFIGURATION_ERROR",
            CalcError::Compliance { .. } => "COMPLIANCE_ERROR",
            CalcError::Table { .. } => "TABLE_ERROR",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Code clause the error refers to, if any
    pub fn clause(&self) -> Option<&str> {
        match self {
            CalcError::Dimension { clause, .. }
            | CalcError::Material { clause, .. }
            | CalcError::Configuration { clause, .. }
            | CalcError::Compliance { clause, .. } => Some(clause.as_str()),
            _ => None,
        }
    }

    /// Actionable suggestion for the engineer
    pub fn suggestion(&self) -> String {
        match self {
            CalcError::InvalidInput { field, .. } => {
                format!("Correct the value of '{field}' and resubmit")
            }
            CalcError::Dimension { field, .. } => match field.as_str() {
                "span_mm" => "Reduce the span or increase the beam width".to_string(),
                "total_depth_mm" | "effective_depth_mm" => {
                    "Increase the overall depth of the section".to_string()
                }
                "width_mm" => "Increase the beam width".to_string(),
                "clear_cover_mm" => {
                    "Use a clear cover that leaves room for stirrups and bars".to_string()
                }
                _ => "Revise the section dimensions".to_string(),
            },
            CalcError::Material { .. } => {
                "Use a standard grade: M15-M50 concrete, Fe250/Fe415/Fe500/Fe550 steel".to_string()
            }
            CalcError::Configuration { .. } => {
                "Increase the beam width or allow larger bar diameters".to_string()
            }
            CalcError::Compliance { failed_checks, .. } => {
                if failed_checks.iter().any(|c| c == "Deflection") {
                    "Increase depth or reduce the span".to_string()
                } else if failed_checks.iter().any(|c| c == "Shear") {
                    "Increase the section size or the stirrup diameter".to_string()
                } else {
                    "Increase depth or revise the reinforcement".to_string()
                }
            }
            CalcError::Table { .. } => "Check the injected design table data".to_string(),
            CalcError::FileError { .. } => "Check the path and file permissions".to_string(),
            CalcError::FileLocked { .. } => {
                "Wait for the other user to close the file, then retry".to_string()
            }
            CalcError::SerializationError { .. } => {
                "Check the input document against the documented schema".to_string()
            }
            CalcError::VersionMismatch { .. } => {
                "Open the file with a matching version of the tool".to_string()
            }
            CalcError::Internal { .. } => "Report this as a bug".to_string(),
        }
    }
}

/// Error returned at the orchestration API boundary.
///
/// Wraps a [`CalcError`] with its clause reference and a suggestion so the
/// caller never has to interpret a raw engine error.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[error("[{code}] {message} (clause: {clause}; suggestion: {suggestion})")]
pub struct ApiError {
    /// Short code, same as [`CalcError::error_code`]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Clause citation, or "n/a" for non-code errors
    pub clause: String,
    /// What the engineer should try next
    pub suggestion: String,
    /// The structured engine error
    pub details: CalcError,
}

impl From<CalcError> for ApiError {
    fn from(error: CalcError) -> Self {
        ApiError {
            code: error.error_code().to_string(),
            message: error.to_string(),
            clause: error.clause().unwrap_or("n/a").to_string(),
            suggestion: error.suggestion(),
            details: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error =
            CalcError::dimension("width_mm", -230.0, "Width must be positive", "IS 456 Cl. 23.3");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"Dimension\""));
        assert!(json.contains("\"details\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::material("M7", "x", "y").error_code(), "MATERIAL_ERROR");
        assert_eq!(
            CalcError::configuration(900.0, 150.0, "x", "y").error_code(),
            "CONFIGURATION_ERROR"
        );
    }

    #[test]
    fn test_api_error_carries_clause_and_suggestion() {
        let api: ApiError =
            CalcError::dimension("span_mm", 20000.0, "Too slender", "IS 456:2000 Cl. 23.3").into();
        assert_eq!(api.code, "DIMENSION_ERROR");
        assert_eq!(api.clause, "IS 456:2000 Cl. 23.3");
        assert!(api.suggestion.contains("span"));
        assert!(api.to_string().contains("suggestion"));
    }

    #[test]
    fn test_non_code_error_has_no_clause() {
        let api: ApiError = CalcError::invalid_input("mu_knm", "-1", "negative").into();
        assert_eq!(api.clause, "n/a");
    }

    #[test]
    fn test_compliance_suggestion_mentions_depth_for_deflection() {
        let err =
            CalcError::compliance(vec!["Deflection".into()], "fails", "IS 456:2000 Cl. 23.2.1");
        assert!(err.suggestion().contains("depth"));
    }
}
