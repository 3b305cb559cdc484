//! Scene, input, and output data as returned by the server.
//!
//! These mirror the `responseData` objects of the requests the capability
//! modules issue.  Field names are camelCase on the wire.  Fields that older
//! server builds omit are `Option` or carry a serde default so that decoding
//! never fails on a missing optional field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Scenes ────────────────────────────────────────────────────────────────────

/// One entry of `GetSceneList.scenes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneInfo {
    pub scene_name: String,
    #[serde(default)]
    pub scene_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_uuid: Option<String>,
}

/// Response of `GetSceneList`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneList {
    #[serde(default)]
    pub current_program_scene_name: Option<String>,
    /// `None` when studio mode is off.
    #[serde(default)]
    pub current_preview_scene_name: Option<String>,
    #[serde(default)]
    pub scenes: Vec<SceneInfo>,
}

impl SceneList {
    /// Returns `true` if a scene with exactly this name exists.
    pub fn contains(&self, scene_name: &str) -> bool {
        self.scenes.iter().any(|s| s.scene_name == scene_name)
    }
}

/// One entry of `GetSceneItemList.sceneItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    pub scene_item_id: i64,
    pub source_name: String,
    #[serde(default)]
    pub scene_item_index: u32,
    #[serde(default = "default_true")]
    pub scene_item_enabled: bool,
    #[serde(default)]
    pub scene_item_locked: bool,
    /// `None` for nested scenes and groups.
    #[serde(default)]
    pub input_kind: Option<String>,
    #[serde(default)]
    pub is_group: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// How a scene item is fitted into its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundsType {
    #[serde(rename = "OBS_BOUNDS_NONE")]
    None,
    #[serde(rename = "OBS_BOUNDS_STRETCH")]
    Stretch,
    #[serde(rename = "OBS_BOUNDS_SCALE_INNER")]
    ScaleInner,
    #[serde(rename = "OBS_BOUNDS_SCALE_OUTER")]
    ScaleOuter,
    #[serde(rename = "OBS_BOUNDS_SCALE_TO_WIDTH")]
    ScaleToWidth,
    #[serde(rename = "OBS_BOUNDS_SCALE_TO_HEIGHT")]
    ScaleToHeight,
    #[serde(rename = "OBS_BOUNDS_MAX_ONLY")]
    MaxOnly,
}

/// A partial scene item transform for `SetSceneItemTransform`.
///
/// Only the fields that are `Some` are sent; the server leaves the others
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItemTransform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_type: Option<BoundsType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_alignment: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_height: Option<f64>,
}

impl SceneItemTransform {
    /// Places the item at the origin, unscaled, stretched to `width`×`height`.
    pub fn stretch_to(width: f64, height: f64) -> Self {
        Self {
            position_x: Some(0.0),
            position_y: Some(0.0),
            rotation: Some(0.0),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            bounds_type: Some(BoundsType::Stretch),
            bounds_alignment: Some(0),
            bounds_width: Some(width),
            bounds_height: Some(height),
            ..Self::default()
        }
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// One entry of `GetInputList.inputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    pub input_name: String,
    pub input_kind: String,
    #[serde(default)]
    pub unversioned_input_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_uuid: Option<String>,
}

/// Response of `GetInputSettings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSettings {
    #[serde(default)]
    pub input_settings: Map<String, Value>,
    #[serde(default)]
    pub input_kind: Option<String>,
}

/// Audio monitoring mode of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorType {
    #[serde(rename = "OBS_MONITORING_TYPE_NONE")]
    None,
    #[serde(rename = "OBS_MONITORING_TYPE_MONITOR_ONLY")]
    MonitorOnly,
    #[serde(rename = "OBS_MONITORING_TYPE_MONITOR_AND_OUTPUT")]
    MonitorAndOutput,
}

/// Playback command for a media input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaAction {
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_NONE")]
    None,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PLAY")]
    Play,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PAUSE")]
    Pause,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_STOP")]
    Stop,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_RESTART")]
    Restart,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_NEXT")]
    Next,
    #[serde(rename = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PREVIOUS")]
    Previous,
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Response of `GetStreamStatus` and `GetOutputStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputStatus {
    pub output_active: bool,
    #[serde(default)]
    pub output_reconnecting: bool,
    #[serde(default)]
    pub output_timecode: Option<String>,
    /// Milliseconds.
    #[serde(default)]
    pub output_duration: u64,
    #[serde(default)]
    pub output_congestion: Option<f64>,
    #[serde(default)]
    pub output_bytes: u64,
    #[serde(default)]
    pub output_skipped_frames: u64,
    #[serde(default)]
    pub output_total_frames: u64,
}

/// Response of `GetRecordStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    pub output_active: bool,
    #[serde(default)]
    pub output_paused: bool,
    #[serde(default)]
    pub output_timecode: Option<String>,
    #[serde(default)]
    pub output_duration: u64,
    #[serde(default)]
    pub output_bytes: u64,
}

/// Response of `GetStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub available_disk_space: f64,
    pub active_fps: f64,
    pub average_frame_render_time: f64,
    pub render_skipped_frames: u64,
    pub render_total_frames: u64,
    pub output_skipped_frames: u64,
    pub output_total_frames: u64,
    #[serde(default)]
    pub web_socket_session_incoming_messages: u64,
    #[serde(default)]
    pub web_socket_session_outgoing_messages: u64,
}

/// Response of `GetStreamServiceSettings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamServiceSettings {
    pub stream_service_type: String,
    #[serde(default)]
    pub stream_service_settings: Map<String, Value>,
}
