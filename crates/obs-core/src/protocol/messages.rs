//! All obs-websocket v5 protocol message types.
//!
//! Every frame on the wire is a JSON text frame of the form
//! `{"op": <opcode>, "d": {...}}`.  The payload structs below describe the
//! `d` object for each opcode; field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Protocol constants ────────────────────────────────────────────────────────

/// RPC version this client speaks.  Sent in `Identify`.
pub const RPC_VERSION: u32 = 1;

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// All opcodes defined by obs-websocket v5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Hello = 0,
    Identify = 1,
    Identified = 2,
    Reidentify = 3,
    Event = 5,
    Request = 6,
    RequestResponse = 7,
    RequestBatch = 8,
    RequestBatchResponse = 9,
}

impl TryFrom<u8> for OpCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(OpCode::Hello),
            1 => Ok(OpCode::Identify),
            2 => Ok(OpCode::Identified),
            3 => Ok(OpCode::Reidentify),
            5 => Ok(OpCode::Event),
            6 => Ok(OpCode::Request),
            7 => Ok(OpCode::RequestResponse),
            8 => Ok(OpCode::RequestBatch),
            9 => Ok(OpCode::RequestBatchResponse),
            _ => Err(()),
        }
    }
}

// ── Event subscription bitmask ────────────────────────────────────────────────

/// Bit flags for the `eventSubscriptions` field of `Identify` / `Reidentify`.
pub mod event_subscription {
    pub const NONE: u32 = 0;
    pub const GENERAL: u32 = 1 << 0;
    pub const CONFIG: u32 = 1 << 1;
    pub const SCENES: u32 = 1 << 2;
    pub const INPUTS: u32 = 1 << 3;
    pub const TRANSITIONS: u32 = 1 << 4;
    pub const FILTERS: u32 = 1 << 5;
    pub const OUTPUTS: u32 = 1 << 6;
    pub const SCENE_ITEMS: u32 = 1 << 7;
    pub const MEDIA_INPUTS: u32 = 1 << 8;
    pub const VENDORS: u32 = 1 << 9;
    pub const UI: u32 = 1 << 10;
    /// Every low-volume category.  This is the server's default.
    pub const ALL: u32 = GENERAL
        | CONFIG
        | SCENES
        | INPUTS
        | TRANSITIONS
        | FILTERS
        | OUTPUTS
        | SCENE_ITEMS
        | MEDIA_INPUTS
        | VENDORS
        | UI;
    // High-volume categories must be requested explicitly.
    pub const INPUT_VOLUME_METERS: u32 = 1 << 16;
    pub const INPUT_ACTIVE_STATE_CHANGED: u32 = 1 << 17;
    pub const INPUT_SHOW_STATE_CHANGED: u32 = 1 << 18;
    pub const SCENE_ITEM_TRANSFORM_CHANGED: u32 = 1 << 19;
}

// ── Request status codes ──────────────────────────────────────────────────────

/// Numeric `requestStatus.code` values reported by the server.
///
/// Only the codes this client reacts to are listed; any other value is carried
/// through verbatim in error reports.
pub mod status_code {
    pub const SUCCESS: u16 = 100;
    pub const MISSING_REQUEST_TYPE: u16 = 203;
    pub const UNKNOWN_REQUEST_TYPE: u16 = 204;
    pub const GENERIC_ERROR: u16 = 205;
    pub const NOT_READY: u16 = 207;
    pub const MISSING_REQUEST_FIELD: u16 = 300;
    pub const INVALID_REQUEST_FIELD: u16 = 400;
    pub const REQUEST_FIELD_OUT_OF_RANGE: u16 = 402;
    pub const OUTPUT_RUNNING: u16 = 500;
    pub const OUTPUT_NOT_RUNNING: u16 = 501;
    pub const OUTPUT_PAUSED: u16 = 502;
    pub const OUTPUT_NOT_PAUSED: u16 = 503;
    pub const OUTPUT_DISABLED: u16 = 504;
    pub const STUDIO_MODE_ACTIVE: u16 = 505;
    pub const STUDIO_MODE_NOT_ACTIVE: u16 = 506;
    pub const RESOURCE_NOT_FOUND: u16 = 600;
    pub const RESOURCE_ALREADY_EXISTS: u16 = 601;
    pub const INVALID_RESOURCE_TYPE: u16 = 602;
    pub const NOT_ENOUGH_RESOURCES: u16 = 603;
    pub const RESOURCE_CREATION_FAILED: u16 = 700;
    pub const RESOURCE_ACTION_FAILED: u16 = 701;
    pub const REQUEST_PROCESSING_FAILED: u16 = 702;
}

// ── WebSocket close codes ─────────────────────────────────────────────────────

/// Application close codes the server uses when it terminates a session.
pub mod close_code {
    pub const UNKNOWN_REASON: u16 = 4000;
    pub const MESSAGE_DECODE_ERROR: u16 = 4002;
    pub const MISSING_DATA_FIELD: u16 = 4003;
    pub const INVALID_DATA_FIELD_TYPE: u16 = 4004;
    pub const INVALID_DATA_FIELD_VALUE: u16 = 4005;
    pub const UNKNOWN_OP_CODE: u16 = 4006;
    pub const NOT_IDENTIFIED: u16 = 4007;
    pub const ALREADY_IDENTIFIED: u16 = 4008;
    pub const AUTHENTICATION_FAILED: u16 = 4009;
    pub const UNSUPPORTED_RPC_VERSION: u16 = 4010;
    pub const SESSION_INVALIDATED: u16 = 4011;
    pub const UNSUPPORTED_FEATURE: u16 = 4012;

    /// Returns a short human-readable description of a close code, if known.
    pub fn describe(code: u16) -> Option<&'static str> {
        match code {
            1000 => Some("normal closure"),
            1001 => Some("server going away"),
            UNKNOWN_REASON => Some("unknown reason"),
            MESSAGE_DECODE_ERROR => Some("server could not decode a message"),
            MISSING_DATA_FIELD => Some("message was missing a data field"),
            INVALID_DATA_FIELD_TYPE => Some("message had a data field of the wrong type"),
            INVALID_DATA_FIELD_VALUE => Some("message had an invalid data field value"),
            UNKNOWN_OP_CODE => Some("server does not know the opcode"),
            NOT_IDENTIFIED => Some("request sent before identification"),
            ALREADY_IDENTIFIED => Some("identify sent twice"),
            AUTHENTICATION_FAILED => Some("authentication failed"),
            UNSUPPORTED_RPC_VERSION => Some("unsupported RPC version"),
            SESSION_INVALIDATED => Some("session invalidated by the server"),
            UNSUPPORTED_FEATURE => Some("unsupported feature"),
            _ => None,
        }
    }
}

// ── Per-opcode payload structs ────────────────────────────────────────────────

/// Authentication challenge offered by the server in [`Hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

/// Opcode 0: first message sent by the server after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(rename = "obsWebSocketVersion")]
    pub obs_websocket_version: String,
    pub rpc_version: u32,
    /// Present only when the server requires a password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthChallenge>,
}

/// Opcode 1: the client's reply to [`Hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_subscriptions: Option<u32>,
}

/// Opcode 2: the server accepted the identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    pub negotiated_rpc_version: u32,
}

/// Opcode 3: change session parameters after identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reidentify {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_subscriptions: Option<u32>,
}

/// Opcode 5: an event pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: String,
    /// The subscription category bit this event belongs to.
    pub event_intent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Map<String, Value>>,
}

/// Opcode 6: a request issued by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    /// Correlation id; echoed back in the matching [`RequestResponse`].
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Map<String, Value>>,
}

/// Outcome block inside a [`RequestResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: u16,
    /// Human-readable failure description; usually absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Opcode 7: the server's reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Map<String, Value>>,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// A decoded obs-websocket message of any supported opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum ObsMessage {
    Hello(Hello),
    Identify(Identify),
    Identified(Identified),
    Reidentify(Reidentify),
    Event(Event),
    Request(Request),
    RequestResponse(RequestResponse),
}

impl ObsMessage {
    /// Returns the opcode this message is sent under.
    pub fn op_code(&self) -> OpCode {
        match self {
            ObsMessage::Hello(_) => OpCode::Hello,
            ObsMessage::Identify(_) => OpCode::Identify,
            ObsMessage::Identified(_) => OpCode::Identified,
            ObsMessage::Reidentify(_) => OpCode::Reidentify,
            ObsMessage::Event(_) => OpCode::Event,
            ObsMessage::Request(_) => OpCode::Request,
            ObsMessage::RequestResponse(_) => OpCode::RequestResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_code_try_from_known_values() {
        assert_eq!(OpCode::try_from(0), Ok(OpCode::Hello));
        assert_eq!(OpCode::try_from(7), Ok(OpCode::RequestResponse));
        assert_eq!(OpCode::try_from(9), Ok(OpCode::RequestBatchResponse));
    }

    #[test]
    fn test_op_code_try_from_gap_value_is_rejected() {
        // Opcode 4 is unassigned in obs-websocket v5.
        assert_eq!(OpCode::try_from(4), Err(()));
        assert_eq!(OpCode::try_from(200), Err(()));
    }

    #[test]
    fn test_event_subscription_all_covers_low_volume_bits_only() {
        assert_eq!(event_subscription::ALL, 0x7FF);
        assert_eq!(
            event_subscription::ALL & event_subscription::INPUT_VOLUME_METERS,
            0
        );
    }

    #[test]
    fn test_close_code_describe_authentication_failed() {
        assert_eq!(
            close_code::describe(close_code::AUTHENTICATION_FAILED),
            Some("authentication failed")
        );
        assert_eq!(close_code::describe(4999), None);
    }

    #[test]
    fn test_request_serializes_with_camel_case_fields() {
        let req = Request {
            request_type: "GetSceneList".to_string(),
            request_id: "abc-1".to_string(),
            request_data: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["requestType"], "GetSceneList");
        assert_eq!(json["requestId"], "abc-1");
        // Absent request data must not be serialized as `null`.
        assert!(json.get("requestData").is_none());
    }

    #[test]
    fn test_message_op_code_matches_variant() {
        let msg = ObsMessage::Identified(Identified {
            negotiated_rpc_version: 1,
        });
        assert_eq!(msg.op_code(), OpCode::Identified);
    }
}
