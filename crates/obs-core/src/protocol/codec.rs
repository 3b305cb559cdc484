//! JSON codec for encoding and decoding obs-websocket messages.
//!
//! Wire format (one WebSocket text frame per message):
//! ```text
//! {"op": <u8 opcode>, "d": { ...opcode-specific payload... }}
//! ```
//!
//! serde cannot dispatch on an integer tag, so decoding is a two-step
//! process: the envelope is parsed first with the payload kept as a raw
//! [`Value`], then the payload is converted into the struct matching `op`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{
    Event, Hello, Identified, Identify, ObsMessage, OpCode, Reidentify, Request, RequestResponse,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid JSON or does not have the `{op, d}` shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The opcode is not defined by obs-websocket v5.
    #[error("unknown opcode: {0}")]
    UnknownOpCode(u8),

    /// The opcode is defined but this client does not implement it.
    #[error("unsupported opcode: {0:?}")]
    UnsupportedOpCode(OpCode),

    /// The `d` payload could not be parsed into the struct for its opcode.
    #[error("malformed {op:?} payload: {reason}")]
    MalformedPayload { op: OpCode, reason: String },

    /// The message could not be serialized.
    #[error("failed to serialize message: {0}")]
    Serialize(String),
}

#[derive(Serialize)]
struct OutgoingEnvelope<'a, T: Serialize> {
    op: u8,
    d: &'a T,
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    op: u8,
    #[serde(default)]
    d: Value,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`ObsMessage`] into the JSON text of a single WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use obs_core::protocol::{decode_message, encode_message};
/// use obs_core::protocol::messages::{Identified, ObsMessage};
///
/// let msg = ObsMessage::Identified(Identified { negotiated_rpc_version: 1 });
/// let text = encode_message(&msg).unwrap();
/// assert_eq!(decode_message(&text).unwrap(), msg);
/// ```
pub fn encode_message(msg: &ObsMessage) -> Result<String, ProtocolError> {
    let op = msg.op_code() as u8;
    let result = match msg {
        ObsMessage::Hello(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::Identify(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::Identified(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::Reidentify(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::Event(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::Request(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
        ObsMessage::RequestResponse(d) => serde_json::to_string(&OutgoingEnvelope { op, d }),
    };
    result.map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodes one [`ObsMessage`] from the text of a WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the text is not a valid envelope, the opcode
/// is unknown or unsupported, or the payload does not match the opcode.
pub fn decode_message(text: &str) -> Result<ObsMessage, ProtocolError> {
    let envelope: IncomingEnvelope = serde_json::from_str(text)
        .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;

    let op = OpCode::try_from(envelope.op).map_err(|_| ProtocolError::UnknownOpCode(envelope.op))?;
    let d = envelope.d;

    match op {
        OpCode::Hello => payload::<Hello>(op, d).map(ObsMessage::Hello),
        OpCode::Identify => payload::<Identify>(op, d).map(ObsMessage::Identify),
        OpCode::Identified => payload::<Identified>(op, d).map(ObsMessage::Identified),
        OpCode::Reidentify => payload::<Reidentify>(op, d).map(ObsMessage::Reidentify),
        OpCode::Event => payload::<Event>(op, d).map(ObsMessage::Event),
        OpCode::Request => payload::<Request>(op, d).map(ObsMessage::Request),
        OpCode::RequestResponse => {
            payload::<RequestResponse>(op, d).map(ObsMessage::RequestResponse)
        }
        OpCode::RequestBatch | OpCode::RequestBatchResponse => {
            Err(ProtocolError::UnsupportedOpCode(op))
        }
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn payload<T: serde::de::DeserializeOwned>(op: OpCode, d: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(d).map_err(|e| ProtocolError::MalformedPayload {
        op,
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{AuthChallenge, RequestStatus};
    use serde_json::json;

    #[test]
    fn test_decode_hello_with_authentication() {
        // Arrange: a Hello as sent by a password-protected server
        let text = r#"{"op":0,"d":{"obsWebSocketVersion":"5.4.2","rpcVersion":1,
            "authentication":{"challenge":"+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=",
            "salt":"lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI="}}}"#;

        // Act
        let msg = decode_message(text).expect("decode must succeed");

        // Assert
        match msg {
            ObsMessage::Hello(hello) => {
                assert_eq!(hello.obs_websocket_version, "5.4.2");
                assert_eq!(hello.rpc_version, 1);
                assert!(matches!(hello.authentication, Some(AuthChallenge { .. })));
            }
            other => panic!("expected Hello, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_hello_without_authentication() {
        let text = r#"{"op":0,"d":{"obsWebSocketVersion":"5.0.0","rpcVersion":1}}"#;
        let msg = decode_message(text).unwrap();
        assert!(matches!(msg, ObsMessage::Hello(Hello { authentication: None, .. })));
    }

    #[test]
    fn test_hello_version_field_keeps_capital_s() {
        // Arrange
        let hello = ObsMessage::Hello(Hello {
            obs_websocket_version: "5.4.2".to_string(),
            rpc_version: 1,
            authentication: None,
        });

        // Act
        let text = encode_message(&hello).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        // Assert
        assert_eq!(value["d"]["obsWebSocketVersion"], "5.4.2");
        assert!(value["d"].get("obsWebsocketVersion").is_none());
    }

    #[test]
    fn test_decode_failed_request_response_keeps_comment() {
        let text = json!({
            "op": 7,
            "d": {
                "requestType": "CreateScene",
                "requestId": "x-1",
                "requestStatus": {"result": false, "code": 601, "comment": "A scene with that name already exists."}
            }
        })
        .to_string();

        let msg = decode_message(&text).unwrap();

        let ObsMessage::RequestResponse(resp) = msg else {
            panic!("expected RequestResponse");
        };
        assert_eq!(
            resp.request_status,
            RequestStatus {
                result: false,
                code: 601,
                comment: Some("A scene with that name already exists.".to_string()),
            }
        );
        assert!(resp.response_data.is_none());
    }

    #[test]
    fn test_encode_request_produces_op_6_envelope() {
        let msg = ObsMessage::Request(Request {
            request_type: "SetCurrentProgramScene".to_string(),
            request_id: "id-7".to_string(),
            request_data: json!({"sceneName": "Main"}).as_object().cloned(),
        });

        let text = encode_message(&msg).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["op"], 6);
        assert_eq!(value["d"]["requestData"]["sceneName"], "Main");
    }

    #[test]
    fn test_decode_unknown_opcode_returns_error() {
        let result = decode_message(r#"{"op":4,"d":{}}"#);
        assert_eq!(result, Err(ProtocolError::UnknownOpCode(4)));
    }

    #[test]
    fn test_decode_batch_opcode_is_unsupported() {
        let result = decode_message(r#"{"op":9,"d":{}}"#);
        assert_eq!(
            result,
            Err(ProtocolError::UnsupportedOpCode(OpCode::RequestBatchResponse))
        );
    }

    #[test]
    fn test_decode_non_json_returns_malformed_envelope() {
        let result = decode_message("not json at all");
        assert!(matches!(result, Err(ProtocolError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_decode_payload_missing_required_field() {
        // Identified without negotiatedRpcVersion
        let result = decode_message(r#"{"op":2,"d":{}}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedPayload {
                op: OpCode::Identified,
                ..
            })
        ));
    }
}
