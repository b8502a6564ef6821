//! Response envelope
//!
//! Every API response, success or failure, has the shape
//! `{"error_code": .., "error_message": .., "data": ..}`.

use crate::error::{Error, ErrorKind, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

/// Error code reported when neither the tool nor the OS supplied one
pub const GENERIC_ERROR_CODE: i64 = 42;

/// Wire format of every API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub error_code: i64,
    pub error_message: Option<String>,
    pub data: Value,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            error_code: 0,
            error_message: None,
            data,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self {
            error_code: error_code(err),
            error_message: Some(err.to_string()),
            data: Value::Null,
        }
    }
}

/// Error code exposed to clients
pub fn error_code(err: &Error) -> i64 {
    err.native_code().unwrap_or(GENERIC_ERROR_CODE)
}

/// HTTP status for an error
pub fn status_code(err: &Error) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NoSuchVirtualDrive => StatusCode::NOT_FOUND,
        ErrorKind::AmbiguousVirtualDrive => StatusCode::CONFLICT,
        ErrorKind::InvalidResponse
        | ErrorKind::ToolCommand
        | ErrorKind::Launch
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Successful handler result
#[derive(Debug)]
pub struct ApiReply {
    status: StatusCode,
    data: Value,
}

impl ApiReply {
    /// 200 with serialized data
    pub fn ok<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            status: StatusCode::OK,
            data: serde_json::to_value(data)?,
        })
    }

    /// 201 with serialized data
    pub fn created<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            status: StatusCode::CREATED,
            data: serde_json::to_value(data)?,
        })
    }

    /// 200 without data
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            data: Value::Null,
        }
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::ok(self.data))).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(Envelope::from_error(&self))).into_response()
    }
}

/// Handler result type
pub type ApiResult = std::result::Result<ApiReply, Error>;
