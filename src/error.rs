//! Error types for the storcli gateway
//!
//! Every failure the gateway can report is a variant of [`Error`]. The
//! variants group into the small taxonomy exposed to HTTP clients, see
//! [`ErrorKind`].

use thiserror::Error;

/// Unified error type for the gateway
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Tool Output Errors
    // =========================================================================
    #[error("Invalid storcli response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Cannot parse {field} from {value:?}")]
    FieldParse { field: &'static str, value: String },

    #[error("Missing field in storcli response: {field}")]
    MissingField { field: String },

    #[error("storcli command failed{}: {description}", controller_suffix(.controller))]
    ToolCommand {
        controller: Option<u32>,
        description: String,
        error_code: Option<i64>,
    },

    #[error("Failed to launch {command}: {reason}")]
    Launch {
        command: String,
        os_code: Option<i32>,
        reason: String,
    },

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Request validation failed: {0}")]
    Validation(String),

    #[error("No such virtual drive on /c{controller}: {virtual_drive}")]
    NoSuchVirtualDrive { controller: u32, virtual_drive: String },

    #[error("Ambiguous virtual drive on /c{controller}: {matches} candidates match")]
    AmbiguousVirtualDrive { controller: u32, matches: usize },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn controller_suffix(controller: &Option<u32>) -> String {
    controller
        .map(|c| format!(" on controller {}", c))
        .unwrap_or_default()
}

/// Client-facing error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tool output could not be understood
    InvalidResponse,
    /// The tool reported a non-success status
    ToolCommand,
    /// The tool binary could not be started
    Launch,
    /// Caller input rejected before any tool invocation
    Validation,
    /// Lookup found no virtual drive
    NoSuchVirtualDrive,
    /// Lookup found more than one virtual drive
    AmbiguousVirtualDrive,
    /// Anything else
    Internal,
}

impl Error {
    pub(crate) fn invalid_response(reason: impl Into<String>) -> Self {
        Error::InvalidResponse {
            reason: reason.into(),
        }
    }

    pub(crate) fn field_parse(field: &'static str, value: impl Into<String>) -> Self {
        Error::FieldParse {
            field,
            value: value.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Error::MissingField {
            field: field.into(),
        }
    }

    /// Classify this error into the client-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidResponse { .. }
            | Error::FieldParse { .. }
            | Error::MissingField { .. } => ErrorKind::InvalidResponse,
            Error::ToolCommand { .. } => ErrorKind::ToolCommand,
            Error::Launch { .. } => ErrorKind::Launch,
            Error::Validation(_) => ErrorKind::Validation,
            Error::NoSuchVirtualDrive { .. } => ErrorKind::NoSuchVirtualDrive,
            Error::AmbiguousVirtualDrive { .. } => ErrorKind::AmbiguousVirtualDrive,
            Error::Configuration(_)
            | Error::Internal(_)
            | Error::Json(_)
            | Error::Yaml(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Error code reported by the tool or the OS, if any
    pub fn native_code(&self) -> Option<i64> {
        match self {
            Error::ToolCommand { error_code, .. } => *error_code,
            Error::Launch { os_code, .. } => os_code.map(i64::from),
            _ => None,
        }
    }

    /// Check if the error was caused by the caller
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NoSuchVirtualDrive | ErrorKind::AmbiguousVirtualDrive
        )
    }
}

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = Error::field_parse("size", "10 PB");
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);

        let err = Error::Validation("drives missing".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_client_error());

        let err = Error::AmbiguousVirtualDrive {
            controller: 0,
            matches: 2,
        };
        assert_eq!(err.kind(), ErrorKind::AmbiguousVirtualDrive);
    }

    #[test]
    fn test_native_code() {
        let err = Error::ToolCommand {
            controller: Some(1),
            description: "Failed".into(),
            error_code: Some(42),
        };
        assert_eq!(err.native_code(), Some(42));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "storcli command failed on controller 1: Failed");

        let err = Error::Launch {
            command: "storcli64".into(),
            os_code: Some(2),
            reason: "not found".into(),
        };
        assert_eq!(err.native_code(), Some(2));

        assert_eq!(Error::invalid_response("x").native_code(), None);
    }
}
