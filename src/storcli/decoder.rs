//! Response Decoder
//!
//! Turns raw storcli output into one payload per controller. storcli
//! wraps every reply in the same envelope:
//!
//! ```text
//! {"Controllers": [
//!     {"Command Status": {"Controller": 0, "Status": "Success", ...},
//!      "Response Data": {...}}
//! ]}
//! ```
//!
//! Some builds print debug text before the JSON body, which the
//! permissive mode skips.

use crate::domain::ports::CommandOutput;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Response data keyed by controller id
pub type ControllerPayloads = BTreeMap<u32, Value>;

/// How strictly the raw text must be JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// The whole output must be one JSON document
    Strict,
    /// Skip anything before the first `{` and after the document
    #[default]
    Permissive,
}

// =============================================================================
// Raw Envelope
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "Controllers")]
    controllers: Vec<RawControllerReply>,
}

#[derive(Debug, Deserialize)]
struct RawControllerReply {
    #[serde(rename = "Command Status")]
    command_status: RawCommandStatus,
    #[serde(rename = "Response Data", default)]
    response_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCommandStatus {
    #[serde(rename = "Controller", default)]
    controller: Option<Value>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "ErrCd", default)]
    error_code: Option<Value>,
    #[serde(rename = "Detailed Status", default)]
    detailed_status: Option<Value>,
}

impl RawCommandStatus {
    fn controller_id(&self) -> Option<u32> {
        self.controller.as_ref().and_then(value_as_u32)
    }

    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("Success")
    }

    fn first_detail(&self) -> Option<&Value> {
        match self.detailed_status.as_ref()? {
            Value::Array(items) => items.first(),
            obj @ Value::Object(_) => Some(obj),
            _ => None,
        }
    }

    /// Tool-supplied error code, falling back to the detailed status block
    fn tool_error_code(&self) -> Option<i64> {
        self.error_code
            .as_ref()
            .and_then(value_as_i64)
            .or_else(|| self.first_detail().and_then(|d| d.get("ErrCd")).and_then(value_as_i64))
    }

    fn error_description(&self) -> String {
        self.description
            .clone()
            .or_else(|| {
                self.first_detail()
                    .and_then(|d| d.get("ErrMsg"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_u32(value: &Value) -> Option<u32> {
    value_as_i64(value).and_then(|v| u32::try_from(v).ok())
}

// =============================================================================
// Decoding
// =============================================================================

/// Locate the JSON body inside the raw output
fn json_body(stdout: &str, mode: DecodeMode) -> Result<&str> {
    match mode {
        DecodeMode::Strict => Ok(stdout),
        DecodeMode::Permissive => stdout
            .find('{')
            .map(|start| &stdout[start..])
            .ok_or_else(|| Error::invalid_response("no JSON object in storcli output")),
    }
}

/// Parse the raw text into a JSON value
pub fn parse_json(stdout: &str, mode: DecodeMode) -> Result<Value> {
    let body = json_body(stdout, mode)?;
    match mode {
        DecodeMode::Strict => serde_json::from_str(body)
            .map_err(|e| Error::invalid_response(format!("malformed JSON: {}", e))),
        DecodeMode::Permissive => serde_json::Deserializer::from_str(body)
            .into_iter::<Value>()
            .next()
            .unwrap_or_else(|| Ok(Value::Null))
            .map_err(|e| Error::invalid_response(format!("malformed JSON: {}", e))),
    }
}

/// Decode one tool invocation into per-controller payloads.
///
/// Fails with [`Error::InvalidResponse`] when the output is not the
/// expected envelope, whatever the exit code was, and with
/// [`Error::ToolCommand`] on the first controller whose status is not
/// `Success`.
pub fn decode(output: &CommandOutput, mode: DecodeMode) -> Result<ControllerPayloads> {
    let json = parse_json(&output.stdout, mode)?;
    let reply: RawReply = serde_json::from_value(json)
        .map_err(|e| Error::invalid_response(format!("unexpected reply layout: {}", e)))?;

    let mut payloads = ControllerPayloads::new();
    for entry in reply.controllers {
        let status = entry.command_status;
        let controller = status.controller_id();

        if !status.is_success() {
            let error_code = status
                .tool_error_code()
                .or_else(|| output.failure_code().map(i64::from));
            let description = status.error_description();
            warn!(
                controller = ?controller,
                error_code = ?error_code,
                "storcli reported failure: {}",
                description
            );
            return Err(Error::ToolCommand {
                controller,
                description,
                error_code,
            });
        }

        let controller = controller
            .ok_or_else(|| Error::invalid_response("command status without controller id"))?;
        let data = entry
            .response_data
            .unwrap_or_else(|| Value::Object(Default::default()));
        payloads.insert(controller, data);
    }

    debug!("Decoded storcli reply for {} controller(s)", payloads.len());
    Ok(payloads)
}
