//! An in-memory model of the OBS request surface.
//!
//! [`SimulatedObs`] answers the requests the capability modules issue with the
//! same status codes a real server uses (600 not found, 601 already exists,
//! 500/501 output already running / not running, ...).  It backs
//! [`super::FakeTransport`] so scenario tests can assert on resulting state,
//! not just on the calls that were made.

use obs_core::protocol::messages::status_code;
use serde_json::{json, Map, Value};

use crate::infrastructure::transport::TransportError;

/// One scene and its items, in stacking order (index 0 at the bottom).
#[derive(Debug, Clone, PartialEq)]
pub struct SimScene {
    pub name: String,
    pub items: Vec<SimItem>,
}

/// A scene item.
#[derive(Debug, Clone, PartialEq)]
pub struct SimItem {
    pub id: i64,
    pub source_name: String,
    pub enabled: bool,
    pub transform: Map<String, Value>,
}

/// An input source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimInput {
    pub name: String,
    pub kind: String,
    pub settings: Map<String, Value>,
    pub muted: bool,
    pub volume_mul: f64,
    pub monitor_type: String,
    pub last_media_action: Option<String>,
    pub refreshes: u32,
}

/// The whole simulated server state.  Fields are public so tests can set up
/// and inspect scenarios directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedObs {
    pub scenes: Vec<SimScene>,
    pub inputs: Vec<SimInput>,
    pub program_scene: String,
    pub preview_scene: Option<String>,
    pub studio_mode: bool,
    pub streaming: bool,
    pub recording: bool,
    pub record_paused: bool,
    pub virtual_cam: bool,
    pub replay_buffer: bool,
    pub stream_service_type: String,
    pub stream_service_settings: Map<String, Value>,
    pub output_settings: Map<String, Value>,
    next_item_id: i64,
    saved_replays: u32,
}

/// Input kinds reported by `GetInputKindList`.
pub const INPUT_KINDS: &[&str] = &[
    "browser_source",
    "color_source_v3",
    "display_capture",
    "ffmpeg_source",
    "image_source",
    "text_ft2_source_v2",
    "wasapi_input_capture",
];

/// Output names known to `GetOutputStatus` / `GetOutputSettings`.
pub const OUTPUT_NAMES: &[&str] = &[
    "simple_stream",
    "simple_file_output",
    "virtualcam_output",
    "Replay Buffer",
];

type Reply = Result<Map<String, Value>, TransportError>;

fn remote(code: u16, comment: impl Into<String>) -> TransportError {
    TransportError::Remote {
        code,
        comment: comment.into(),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn ok(value: Value) -> Reply {
    Ok(object(value))
}

fn done() -> Reply {
    Ok(Map::new())
}

fn str_param<'a>(params: &'a Map<String, Value>, field: &str) -> Result<&'a str, TransportError> {
    params.get(field).and_then(Value::as_str).ok_or_else(|| {
        remote(
            status_code::MISSING_REQUEST_FIELD,
            format!("Your request is missing the `{field}` field."),
        )
    })
}

fn bool_param(params: &Map<String, Value>, field: &str) -> Result<bool, TransportError> {
    params.get(field).and_then(Value::as_bool).ok_or_else(|| {
        remote(
            status_code::MISSING_REQUEST_FIELD,
            format!("Your request is missing the `{field}` field."),
        )
    })
}

fn int_param(params: &Map<String, Value>, field: &str) -> Result<i64, TransportError> {
    params.get(field).and_then(Value::as_i64).ok_or_else(|| {
        remote(
            status_code::MISSING_REQUEST_FIELD,
            format!("Your request is missing the `{field}` field."),
        )
    })
}

fn merge(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        target.insert(key.clone(), value.clone());
    }
}

impl Default for SimulatedObs {
    fn default() -> Self {
        Self::with_scenes(&["Scene"])
    }
}

impl SimulatedObs {
    /// A server with the given scenes, no inputs, and the first scene live.
    pub fn with_scenes(names: &[&str]) -> Self {
        Self {
            scenes: names
                .iter()
                .map(|name| SimScene {
                    name: name.to_string(),
                    items: Vec::new(),
                })
                .collect(),
            inputs: Vec::new(),
            program_scene: names.first().map(|n| n.to_string()).unwrap_or_default(),
            preview_scene: None,
            studio_mode: false,
            streaming: false,
            recording: false,
            record_paused: false,
            virtual_cam: false,
            replay_buffer: false,
            stream_service_type: "rtmp_common".to_string(),
            stream_service_settings: object(json!({"server": "auto", "service": "Twitch"})),
            output_settings: Map::new(),
            next_item_id: 1,
            saved_replays: 0,
        }
    }

    /// Scene names in list order.
    pub fn scene_names(&self) -> Vec<String> {
        self.scenes.iter().map(|s| s.name.clone()).collect()
    }

    /// Input names in creation order.
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|i| i.name.clone()).collect()
    }

    /// Looks up an input by name.
    pub fn input(&self, name: &str) -> Option<&SimInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Looks up a scene by name.
    pub fn scene(&self, name: &str) -> Option<&SimScene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    /// Adds an input and places it in `scene_name`, as `CreateInput` would.
    pub fn add_input(&mut self, scene_name: &str, name: &str, kind: &str) -> Option<i64> {
        let id = self.next_item_id;
        let scene = self.scenes.iter_mut().find(|s| s.name == scene_name)?;
        scene.items.push(SimItem {
            id,
            source_name: name.to_string(),
            enabled: true,
            transform: Map::new(),
        });
        self.next_item_id += 1;
        self.inputs.push(SimInput {
            name: name.to_string(),
            kind: kind.to_string(),
            settings: Map::new(),
            muted: false,
            volume_mul: 1.0,
            monitor_type: "OBS_MONITORING_TYPE_NONE".to_string(),
            last_media_action: None,
            refreshes: 0,
        });
        Some(id)
    }

    fn source_exists(&self, name: &str) -> bool {
        self.scene(name).is_some() || self.input(name).is_some()
    }

    fn scene_mut(&mut self, name: &str) -> Result<&mut SimScene, TransportError> {
        self.scenes
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                remote(
                    status_code::RESOURCE_NOT_FOUND,
                    format!("No source was found by the name of `{name}`."),
                )
            })
    }

    fn input_mut(&mut self, name: &str) -> Result<&mut SimInput, TransportError> {
        self.inputs
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| {
                remote(
                    status_code::RESOURCE_NOT_FOUND,
                    format!("No source was found by the name of `{name}`."),
                )
            })
    }

    fn item_mut<'a>(
        &'a mut self,
        scene_name: &str,
        item_id: i64,
    ) -> Result<&'a mut SimItem, TransportError> {
        self.scene_mut(scene_name)?
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| {
                remote(
                    status_code::RESOURCE_NOT_FOUND,
                    format!("No scene items were found in scene `{scene_name}` with the ID `{item_id}`."),
                )
            })
    }

    fn require_studio_mode(&self) -> Result<(), TransportError> {
        if self.studio_mode {
            Ok(())
        } else {
            Err(remote(
                status_code::STUDIO_MODE_NOT_ACTIVE,
                "Studio mode is not active.",
            ))
        }
    }

    /// Answers one request the way the server would.
    pub fn handle(&mut self, method: &str, params: &Map<String, Value>) -> Reply {
        match method {
            "GetVersion" => ok(json!({
                "obsVersion": "30.1.2",
                "obsWebSocketVersion": "5.4.2",
                "rpcVersion": 1,
                "availableRequests": [],
                "supportedImageFormats": ["png", "jpg"]
            })),

            // ── Scenes ──
            "GetSceneList" => {
                let scenes: Vec<Value> = self
                    .scenes
                    .iter()
                    .enumerate()
                    .map(|(index, scene)| {
                        json!({"sceneIndex": index, "sceneName": scene.name, "sceneUuid": format!("scene-{index}")})
                    })
                    .collect();
                let preview = if self.studio_mode {
                    json!(self.preview_scene)
                } else {
                    Value::Null
                };
                ok(json!({
                    "currentProgramSceneName": self.program_scene,
                    "currentPreviewSceneName": preview,
                    "scenes": scenes
                }))
            }
            "GetCurrentProgramScene" => ok(json!({
                "currentProgramSceneName": self.program_scene,
                "sceneName": self.program_scene
            })),
            "SetCurrentProgramScene" => {
                let name = str_param(params, "sceneName")?;
                self.scene_mut(name)?;
                self.program_scene = name.to_string();
                done()
            }
            "GetCurrentPreviewScene" => {
                self.require_studio_mode()?;
                ok(json!({
                    "currentPreviewSceneName": self.preview_scene,
                    "sceneName": self.preview_scene
                }))
            }
            "SetCurrentPreviewScene" => {
                self.require_studio_mode()?;
                let name = str_param(params, "sceneName")?;
                self.scene_mut(name)?;
                self.preview_scene = Some(name.to_string());
                done()
            }
            "CreateScene" => {
                let name = str_param(params, "sceneName")?;
                if self.source_exists(name) {
                    return Err(remote(
                        status_code::RESOURCE_ALREADY_EXISTS,
                        "A source already exists by that scene name.",
                    ));
                }
                self.scenes.push(SimScene {
                    name: name.to_string(),
                    items: Vec::new(),
                });
                ok(json!({"sceneUuid": format!("scene-{}", self.scenes.len() - 1)}))
            }
            "RemoveScene" => {
                let name = str_param(params, "sceneName")?.to_string();
                self.scene_mut(&name)?;
                self.scenes.retain(|s| s.name != name);
                if self.program_scene == name {
                    self.program_scene = self
                        .scenes
                        .first()
                        .map(|s| s.name.clone())
                        .unwrap_or_default();
                }
                if self.preview_scene.as_deref() == Some(name.as_str()) {
                    self.preview_scene = Some(self.program_scene.clone());
                }
                done()
            }
            "SetSceneName" => {
                let name = str_param(params, "sceneName")?.to_string();
                let new_name = str_param(params, "newSceneName")?.to_string();
                self.scene_mut(&name)?;
                if self.source_exists(&new_name) {
                    return Err(remote(
                        status_code::RESOURCE_ALREADY_EXISTS,
                        "A source already exists by that new scene name.",
                    ));
                }
                self.scene_mut(&name)?.name = new_name.clone();
                if self.program_scene == name {
                    self.program_scene = new_name.clone();
                }
                if self.preview_scene.as_deref() == Some(name.as_str()) {
                    self.preview_scene = Some(new_name);
                }
                done()
            }

            // ── Scene items ──
            "GetSceneItemList" => {
                let name = str_param(params, "sceneName")?.to_string();
                let items = self.scene_mut(&name)?.items.clone();
                let items: Vec<Value> = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let kind = self.input(&item.source_name).map(|i| i.kind.clone());
                        json!({
                            "sceneItemId": item.id,
                            "sourceName": item.source_name,
                            "sceneItemIndex": index,
                            "sceneItemEnabled": item.enabled,
                            "sceneItemLocked": false,
                            "inputKind": kind,
                            "isGroup": kind.is_none().then_some(false)
                        })
                    })
                    .collect();
                ok(json!({"sceneItems": items}))
            }
            "GetSceneItemId" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let source = str_param(params, "sourceName")?;
                let id = self
                    .scene_mut(&scene)?
                    .items
                    .iter()
                    .find(|item| item.source_name == source)
                    .map(|item| item.id)
                    .ok_or_else(|| {
                        remote(
                            status_code::RESOURCE_NOT_FOUND,
                            "No scene items were found in the specified scene by that name or offset.",
                        )
                    })?;
                ok(json!({"sceneItemId": id}))
            }
            "CreateSceneItem" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let source = str_param(params, "sourceName")?.to_string();
                let enabled = params
                    .get("sceneItemEnabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                if !self.source_exists(&source) {
                    return Err(remote(
                        status_code::RESOURCE_NOT_FOUND,
                        format!("No source was found by the name of `{source}`."),
                    ));
                }
                let id = self.next_item_id;
                self.scene_mut(&scene)?.items.push(SimItem {
                    id,
                    source_name: source,
                    enabled,
                    transform: Map::new(),
                });
                self.next_item_id += 1;
                ok(json!({"sceneItemId": id}))
            }
            "RemoveSceneItem" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let id = int_param(params, "sceneItemId")?;
                self.item_mut(&scene, id)?;
                self.scene_mut(&scene)?.items.retain(|item| item.id != id);
                done()
            }
            "SetSceneItemEnabled" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let id = int_param(params, "sceneItemId")?;
                let enabled = bool_param(params, "sceneItemEnabled")?;
                self.item_mut(&scene, id)?.enabled = enabled;
                done()
            }
            "SetSceneItemTransform" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let id = int_param(params, "sceneItemId")?;
                let transform = params
                    .get("sceneItemTransform")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                merge(&mut self.item_mut(&scene, id)?.transform, &transform);
                done()
            }
            "SetSceneItemIndex" => {
                let scene_name = str_param(params, "sceneName")?.to_string();
                let id = int_param(params, "sceneItemId")?;
                let index = int_param(params, "sceneItemIndex")?;
                self.item_mut(&scene_name, id)?;
                let scene = self.scene_mut(&scene_name)?;
                if let Some(from) = scene.items.iter().position(|item| item.id == id) {
                    let item = scene.items.remove(from);
                    let to = usize::try_from(index).unwrap_or(0).min(scene.items.len());
                    scene.items.insert(to, item);
                }
                done()
            }

            // ── Inputs ──
            "GetInputKindList" => ok(json!({"inputKinds": INPUT_KINDS})),
            "GetInputList" => {
                let filter = params.get("inputKind").and_then(Value::as_str);
                let inputs: Vec<Value> = self
                    .inputs
                    .iter()
                    .filter(|i| filter.map_or(true, |kind| i.kind == kind))
                    .map(|i| {
                        json!({
                            "inputName": i.name,
                            "inputKind": i.kind,
                            "unversionedInputKind": i.kind.trim_end_matches("_v2").trim_end_matches("_v3")
                        })
                    })
                    .collect();
                ok(json!({"inputs": inputs}))
            }
            "CreateInput" => {
                let scene = str_param(params, "sceneName")?.to_string();
                let name = str_param(params, "inputName")?.to_string();
                let kind = str_param(params, "inputKind")?.to_string();
                self.scene_mut(&scene)?;
                if self.source_exists(&name) {
                    return Err(remote(
                        status_code::RESOURCE_ALREADY_EXISTS,
                        "A source already exists by that input name.",
                    ));
                }
                if !INPUT_KINDS.contains(&kind.as_str()) {
                    return Err(remote(
                        status_code::INVALID_RESOURCE_TYPE,
                        format!("The input kind `{kind}` is not available."),
                    ));
                }
                let id = self.add_input(&scene, &name, &kind).unwrap_or_default();
                if let Some(settings) = params.get("inputSettings").and_then(Value::as_object) {
                    let input = self.input_mut(&name)?;
                    merge(&mut input.settings, settings);
                }
                if let Some(false) = params.get("sceneItemEnabled").and_then(Value::as_bool) {
                    self.item_mut(&scene, id)?.enabled = false;
                }
                ok(json!({"inputUuid": format!("input-{id}"), "sceneItemId": id}))
            }
            "RemoveInput" => {
                let name = str_param(params, "inputName")?.to_string();
                self.input_mut(&name)?;
                self.inputs.retain(|i| i.name != name);
                for scene in &mut self.scenes {
                    scene.items.retain(|item| item.source_name != name);
                }
                done()
            }
            "GetInputSettings" => {
                let name = str_param(params, "inputName")?;
                let input = self.input_mut(name)?;
                ok(json!({"inputSettings": input.settings, "inputKind": input.kind}))
            }
            "SetInputSettings" => {
                let name = str_param(params, "inputName")?;
                let settings = params
                    .get("inputSettings")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let overlay = params
                    .get("overlay")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let input = self.input_mut(name)?;
                if overlay {
                    merge(&mut input.settings, &settings);
                } else {
                    input.settings = settings;
                }
                done()
            }
            "GetInputMute" => {
                let input = self.input_mut(str_param(params, "inputName")?)?;
                ok(json!({"inputMuted": input.muted}))
            }
            "SetInputMute" => {
                let muted = bool_param(params, "inputMuted")?;
                self.input_mut(str_param(params, "inputName")?)?.muted = muted;
                done()
            }
            "ToggleInputMute" => {
                let input = self.input_mut(str_param(params, "inputName")?)?;
                input.muted = !input.muted;
                ok(json!({"inputMuted": input.muted}))
            }
            "SetInputVolume" => {
                let volume = params
                    .get("inputVolumeMul")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| {
                        remote(
                            status_code::MISSING_REQUEST_FIELD,
                            "You must specify one volume parameter.",
                        )
                    })?;
                if !(0.0..=20.0).contains(&volume) {
                    return Err(remote(
                        status_code::REQUEST_FIELD_OUT_OF_RANGE,
                        "The field value of `inputVolumeMul` is out of range.",
                    ));
                }
                self.input_mut(str_param(params, "inputName")?)?.volume_mul = volume;
                done()
            }
            "SetInputAudioMonitorType" => {
                let monitor = str_param(params, "monitorType")?.to_string();
                self.input_mut(str_param(params, "inputName")?)?.monitor_type = monitor;
                done()
            }
            "TriggerMediaInputAction" => {
                let action = str_param(params, "mediaAction")?.to_string();
                self.input_mut(str_param(params, "inputName")?)?.last_media_action = Some(action);
                done()
            }
            "PressInputPropertiesButton" => {
                str_param(params, "propertyName")?;
                self.input_mut(str_param(params, "inputName")?)?.refreshes += 1;
                done()
            }

            // ── Outputs ──
            "GetStreamStatus" => ok(json!({
                "outputActive": self.streaming,
                "outputReconnecting": false,
                "outputTimecode": "00:00:00.000",
                "outputDuration": 0,
                "outputCongestion": 0.0,
                "outputBytes": 0,
                "outputSkippedFrames": 0,
                "outputTotalFrames": 0
            })),
            "StartStream" => toggle(&mut self.streaming, true),
            "StopStream" => toggle(&mut self.streaming, false),
            "GetRecordStatus" => ok(json!({
                "outputActive": self.recording,
                "outputPaused": self.record_paused,
                "outputTimecode": "00:00:00.000",
                "outputDuration": 0,
                "outputBytes": 0
            })),
            "StartRecord" => toggle(&mut self.recording, true),
            "StopRecord" => {
                toggle(&mut self.recording, false)?;
                self.record_paused = false;
                ok(json!({"outputPath": "/videos/recording.mkv"}))
            }
            "PauseRecord" => {
                if !self.recording {
                    return Err(remote(status_code::OUTPUT_NOT_RUNNING, "Output is not running."));
                }
                if self.record_paused {
                    return Err(remote(status_code::OUTPUT_PAUSED, "Output is already paused."));
                }
                self.record_paused = true;
                done()
            }
            "ResumeRecord" => {
                if !self.recording {
                    return Err(remote(status_code::OUTPUT_NOT_RUNNING, "Output is not running."));
                }
                if !self.record_paused {
                    return Err(remote(status_code::OUTPUT_NOT_PAUSED, "Output is not paused."));
                }
                self.record_paused = false;
                done()
            }
            "GetVirtualCamStatus" => ok(json!({"outputActive": self.virtual_cam})),
            "StartVirtualCam" => toggle(&mut self.virtual_cam, true),
            "StopVirtualCam" => toggle(&mut self.virtual_cam, false),
            "GetReplayBufferStatus" => ok(json!({"outputActive": self.replay_buffer})),
            "StartReplayBuffer" => toggle(&mut self.replay_buffer, true),
            "StopReplayBuffer" => toggle(&mut self.replay_buffer, false),
            "SaveReplayBuffer" => {
                if !self.replay_buffer {
                    return Err(remote(status_code::OUTPUT_NOT_RUNNING, "Output is not running."));
                }
                self.saved_replays += 1;
                done()
            }
            "GetLastReplayBufferReplay" => {
                if !self.replay_buffer {
                    return Err(remote(status_code::OUTPUT_NOT_RUNNING, "Output is not running."));
                }
                ok(json!({"savedReplayPath": format!("/videos/replay-{}.mkv", self.saved_replays)}))
            }
            "GetStats" => ok(json!({
                "cpuUsage": 3.5,
                "memoryUsage": 512.0,
                "availableDiskSpace": 102400.0,
                "activeFps": 60.0,
                "averageFrameRenderTime": 1.2,
                "renderSkippedFrames": 0,
                "renderTotalFrames": 3600,
                "outputSkippedFrames": 0,
                "outputTotalFrames": 3600,
                "webSocketSessionIncomingMessages": 10,
                "webSocketSessionOutgoingMessages": 10
            })),
            "GetStreamServiceSettings" => ok(json!({
                "streamServiceType": self.stream_service_type,
                "streamServiceSettings": self.stream_service_settings
            })),
            "SetStreamServiceSettings" => {
                self.stream_service_type = str_param(params, "streamServiceType")?.to_string();
                self.stream_service_settings = params
                    .get("streamServiceSettings")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                done()
            }
            "GetOutputStatus" => {
                let name = known_output(params)?;
                let active = match name {
                    "simple_stream" => self.streaming,
                    "simple_file_output" => self.recording,
                    "virtualcam_output" => self.virtual_cam,
                    _ => self.replay_buffer,
                };
                ok(json!({
                    "outputActive": active,
                    "outputReconnecting": false,
                    "outputTimecode": "00:00:00.000",
                    "outputDuration": 0,
                    "outputCongestion": 0.0,
                    "outputBytes": 0,
                    "outputSkippedFrames": 0,
                    "outputTotalFrames": 0
                }))
            }
            "GetOutputSettings" => {
                let name = known_output(params)?;
                let settings = self.output_settings.get(name).cloned().unwrap_or(json!({}));
                ok(json!({"outputSettings": settings}))
            }
            "SetOutputSettings" => {
                let name = known_output(params)?.to_string();
                let settings = params
                    .get("outputSettings")
                    .cloned()
                    .unwrap_or(json!({}));
                self.output_settings.insert(name, settings);
                done()
            }

            // ── Studio mode ──
            "GetStudioModeEnabled" => ok(json!({"studioModeEnabled": self.studio_mode})),
            "SetStudioModeEnabled" => {
                let enabled = bool_param(params, "studioModeEnabled")?;
                if enabled == self.studio_mode {
                    return Err(if enabled {
                        remote(status_code::STUDIO_MODE_ACTIVE, "Studio mode is already active.")
                    } else {
                        remote(status_code::STUDIO_MODE_NOT_ACTIVE, "Studio mode is not active.")
                    });
                }
                self.preview_scene = enabled.then(|| self.program_scene.clone());
                self.studio_mode = enabled;
                done()
            }

            _ => Err(remote(
                status_code::UNKNOWN_REQUEST_TYPE,
                "Your request type is not valid.",
            )),
        }
    }
}

fn toggle(flag: &mut bool, on: bool) -> Reply {
    if *flag == on {
        let (code, comment) = if on {
            (status_code::OUTPUT_RUNNING, "The output is already running.")
        } else {
            (status_code::OUTPUT_NOT_RUNNING, "The output is not running.")
        };
        return Err(remote(code, comment));
    }
    *flag = on;
    done()
}

fn known_output(params: &Map<String, Value>) -> Result<&str, TransportError> {
    let name = str_param(params, "outputName")?;
    if OUTPUT_NAMES.contains(&name) {
        Ok(name)
    } else {
        Err(remote(
            status_code::RESOURCE_NOT_FOUND,
            format!("No output was found by the name of `{name}`."),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        object(value)
    }

    #[test]
    fn test_create_scene_twice_reports_already_exists() {
        let mut obs = SimulatedObs::default();
        assert!(obs.handle("CreateScene", &params(json!({"sceneName": "A"}))).is_ok());

        let err = obs
            .handle("CreateScene", &params(json!({"sceneName": "A"})))
            .unwrap_err();

        assert!(matches!(err, TransportError::Remote { code: 601, .. }));
        assert_eq!(obs.scene_names(), vec!["Scene", "A"]);
    }

    #[test]
    fn test_remove_input_also_removes_its_scene_items() {
        // Arrange
        let mut obs = SimulatedObs::default();
        obs.add_input("Scene", "Mic", "wasapi_input_capture");

        // Act
        obs.handle("RemoveInput", &params(json!({"inputName": "Mic"})))
            .unwrap();

        // Assert
        assert!(obs.inputs.is_empty());
        assert!(obs.scene("Scene").unwrap().items.is_empty());
    }

    #[test]
    fn test_start_stream_twice_reports_output_running() {
        let mut obs = SimulatedObs::default();
        obs.handle("StartStream", &Map::new()).unwrap();
        let err = obs.handle("StartStream", &Map::new()).unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: 500, .. }));
    }

    #[test]
    fn test_preview_requires_studio_mode() {
        let mut obs = SimulatedObs::default();
        let err = obs.handle("GetCurrentPreviewScene", &Map::new()).unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: 506, .. }));

        obs.handle("SetStudioModeEnabled", &params(json!({"studioModeEnabled": true})))
            .unwrap();
        let reply = obs.handle("GetCurrentPreviewScene", &Map::new()).unwrap();
        assert_eq!(reply["currentPreviewSceneName"], "Scene");

        let again = obs
            .handle("SetStudioModeEnabled", &params(json!({"studioModeEnabled": true})))
            .unwrap_err();
        assert!(matches!(again, TransportError::Remote { code: 505, .. }));
    }

    #[test]
    fn test_unknown_request_type() {
        let mut obs = SimulatedObs::default();
        let err = obs.handle("DoSomethingOdd", &Map::new()).unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: 204, .. }));
    }
}
