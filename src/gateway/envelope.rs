// src/gateway/envelope.rs
//! The dual success/failure shape every command answers with.
//!
//! On the wire a command either returns a JSON-encoded string (success) or
//! an object `{ "ok": false, "error": "..." }`. [`Envelope`] is that shape
//! as a type; [`Envelope::decode`] turns it into a `Result` so callers
//! pattern-match instead of inspecting flags.

use crate::error::AppError;
use serde::de::{DeserializeOwned, Error as _};
use serde_json::Value;

/// Message used when a failure envelope carries no `error` text.
const UNKNOWN_BACKEND_ERROR: &str = "unknown backend error";

/// Raw answer of a single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// `{ ok: false, error }`
    Failure { error: String },
    /// JSON text of the successful result, not yet parsed.
    Payload(String),
}

impl Envelope {
    pub fn payload(json: impl Into<String>) -> Self {
        Envelope::Payload(json.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Envelope::Failure {
            error: error.into(),
        }
    }

    /// Serializes `value` into a success envelope.
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Envelope::Payload)
    }

    /// Normalizes an untyped wire value into an envelope.
    ///
    /// The failure shape is checked first: any object with `ok == false`
    /// is a failure. A JSON string is the payload. Anything else is a
    /// decode error for `command`.
    pub fn from_raw(command: &str, raw: Value) -> Result<Self, AppError> {
        match raw {
            Value::Object(map) if map.get("ok") == Some(&Value::Bool(false)) => {
                let error = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_BACKEND_ERROR);
                Ok(Envelope::failure(error))
            }
            Value::String(json) => Ok(Envelope::Payload(json)),
            other => Err(AppError::Decode {
                command: command.to_string(),
                source: serde_json::Error::custom(format!(
                    "expected a JSON string payload or a failure envelope, got {}",
                    other
                )),
            }),
        }
    }

    /// The wire form of this envelope.
    pub fn to_raw(&self) -> Value {
        match self {
            Envelope::Failure { error } => serde_json::json!({ "ok": false, "error": error }),
            Envelope::Payload(json) => Value::String(json.clone()),
        }
    }

    /// Surfaces a failure envelope as [`AppError::Gateway`].
    pub fn into_payload(self, command: &str) -> Result<String, AppError> {
        match self {
            Envelope::Failure { error } => Err(AppError::gateway(command, error)),
            Envelope::Payload(json) => Ok(json),
        }
    }

    /// Checks for failure, then parses the payload into `T`.
    pub fn decode<T: DeserializeOwned>(self, command: &str) -> Result<T, AppError> {
        let json = self.into_payload(command)?;
        serde_json::from_str(&json).map_err(|source| AppError::Decode {
            command: command.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Configuration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn failure_shape_wins_over_everything_else() {
        let raw = json!({ "ok": false, "error": "not found" });
        let envelope = Envelope::from_raw("get_block_command", raw).unwrap();
        assert_eq!(envelope, Envelope::failure("not found"));

        let err = envelope.decode::<Configuration>("get_block_command").unwrap_err();
        assert_eq!(err.to_string(), "not found");
    }

    #[test]
    fn failure_without_message_still_fails() {
        let envelope = Envelope::from_raw("x", json!({ "ok": false })).unwrap();
        assert_eq!(envelope, Envelope::failure(UNKNOWN_BACKEND_ERROR));
    }

    #[test]
    fn string_payload_is_parsed_as_json() {
        let raw = json!(r#"{"workspaceId":"W"}"#);
        let config: Configuration = Envelope::from_raw("load_configuration_command", raw)
            .unwrap()
            .decode("load_configuration_command")
            .unwrap();
        assert_eq!(config.workspace_id.as_str(), "W");
    }

    #[test]
    fn unparseable_payload_is_a_decode_error() {
        let err = Envelope::payload("{not json")
            .decode::<Configuration>("load_configuration_command")
            .unwrap_err();
        assert!(matches!(err, AppError::Decode { .. }));
    }

    #[test]
    fn non_string_success_values_are_rejected() {
        let err = Envelope::from_raw("get_block_command", json!({ "id": "x" })).unwrap_err();
        assert!(matches!(err, AppError::Decode { ref command, .. } if command == "get_block_command"));
    }

    #[test]
    fn wire_form_round_trips() {
        for envelope in [Envelope::failure("boom"), Envelope::payload("\"x\"")] {
            let back = Envelope::from_raw("c", envelope.to_raw()).unwrap();
            assert_eq!(back, envelope);
        }
    }
}
