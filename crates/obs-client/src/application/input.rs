//! InputModule: input sources (capture devices, media, browser, text, ...).

use obs_core::domain::entities::{InputInfo, InputSettings, MediaAction, MonitorType};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::application::gateway::{args, RpcGateway};
use crate::application::outcome::{applied, Outcome, Tolerate};
use crate::error::ObsError;

/// Largest volume multiplier the server accepts (+26 dB).
pub const MAX_VOLUME_MUL: f64 = 20.0;

/// Input operations.
#[derive(Clone)]
pub struct InputModule {
    gateway: RpcGateway,
}

impl InputModule {
    pub fn new(gateway: RpcGateway) -> Self {
        Self { gateway }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Input kinds the server can create.
    pub async fn kinds(&self) -> Result<Vec<String>, ObsError> {
        self.gateway
            .call_field("GetInputKindList", Map::new(), "inputKinds")
            .await
    }

    /// Inputs, optionally only those of one kind.
    pub async fn list(&self, kind: Option<&str>) -> Result<Vec<InputInfo>, ObsError> {
        let params = match kind {
            Some(kind) => args(json!({"inputKind": kind})),
            None => Map::new(),
        };
        self.gateway.call_field("GetInputList", params, "inputs").await
    }

    pub async fn exists(&self, input_name: &str) -> Result<bool, ObsError> {
        Ok(self
            .list(None)
            .await?
            .iter()
            .any(|input| input.input_name == input_name))
    }

    pub async fn settings(&self, input_name: &str) -> Result<InputSettings, ObsError> {
        self.gateway
            .call_as("GetInputSettings", args(json!({"inputName": input_name})))
            .await
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Creates an input of `kind` inside `scene_name`.  An existing input of
    /// that name is left as is.
    pub async fn create(
        &self,
        scene_name: &str,
        input_name: &str,
        kind: &str,
        settings: Map<String, Value>,
    ) -> Result<Outcome, ObsError> {
        if input_name.trim().is_empty() {
            return Err(ObsError::InvalidArgument(
                "input name must not be empty".to_string(),
            ));
        }
        if self.exists(input_name).await? {
            debug!(input = input_name, "input already exists");
            return Ok(Outcome::AlreadyExists);
        }
        let outcome = self
            .gateway
            .call_outcome(
                "CreateInput",
                args(json!({
                    "sceneName": scene_name,
                    "inputName": input_name,
                    "inputKind": kind,
                    "inputSettings": settings,
                    "sceneItemEnabled": true
                })),
                Tolerate::AlreadyExists,
            )
            .await?;
        if outcome.is_applied() {
            info!(input = input_name, kind, scene = scene_name, "created input");
        }
        Ok(outcome)
    }

    /// Removes an input and every scene item showing it.
    pub async fn remove(&self, input_name: &str) -> Result<Outcome, ObsError> {
        let outcome = self
            .gateway
            .call_outcome(
                "RemoveInput",
                args(json!({"inputName": input_name})),
                Tolerate::NotFound,
            )
            .await?;
        if outcome.is_applied() {
            info!(input = input_name, "removed input");
        }
        Ok(outcome)
    }

    /// Removes every input.  Returns how many were removed.
    pub async fn remove_all(&self) -> Result<usize, ObsError> {
        let mut removed = 0;
        for input in self.list(None).await? {
            if self.remove(&input.input_name).await?.is_applied() {
                removed += 1;
            }
        }
        info!(removed, "removed inputs");
        Ok(removed)
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    /// Writes `settings`.  With `overlay` the keys are merged into the current
    /// settings; without it they replace them.
    pub async fn set_settings(
        &self,
        input_name: &str,
        settings: Map<String, Value>,
        overlay: bool,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetInputSettings",
                    args(json!({
                        "inputName": input_name,
                        "inputSettings": settings,
                        "overlay": overlay
                    })),
                )
                .await,
        )
    }

    /// Points a browser source at `url`, keeping its other settings.
    pub async fn set_browser_url(&self, input_name: &str, url: &str) -> Result<Outcome, ObsError> {
        let mut settings = self.settings(input_name).await?.input_settings;
        settings.insert("url".to_string(), Value::String(url.to_string()));
        self.set_settings(input_name, settings, true).await
    }

    /// Reloads a browser source, bypassing its cache.
    pub async fn refresh_browser(&self, input_name: &str) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "PressInputPropertiesButton",
                    args(json!({"inputName": input_name, "propertyName": "refreshnocache"})),
                )
                .await,
        )
    }

    // ── Audio ─────────────────────────────────────────────────────────────────

    pub async fn set_muted(&self, input_name: &str, muted: bool) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetInputMute",
                    args(json!({"inputName": input_name, "inputMuted": muted})),
                )
                .await,
        )
    }

    /// Flips the mute state and returns the new one.
    pub async fn toggle_mute(&self, input_name: &str) -> Result<bool, ObsError> {
        self.gateway
            .call_field(
                "ToggleInputMute",
                args(json!({"inputName": input_name})),
                "inputMuted",
            )
            .await
    }

    /// Sets the volume as a linear multiplier, `0.0` (silent) to
    /// [`MAX_VOLUME_MUL`].
    pub async fn set_volume(&self, input_name: &str, multiplier: f64) -> Result<Outcome, ObsError> {
        if !(0.0..=MAX_VOLUME_MUL).contains(&multiplier) {
            return Err(ObsError::InvalidArgument(format!(
                "volume multiplier must be between 0 and {MAX_VOLUME_MUL}, got {multiplier}"
            )));
        }
        applied(
            self.gateway
                .call(
                    "SetInputVolume",
                    args(json!({"inputName": input_name, "inputVolumeMul": multiplier})),
                )
                .await,
        )
    }

    pub async fn set_audio_monitor(
        &self,
        input_name: &str,
        monitor: MonitorType,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetInputAudioMonitorType",
                    args(json!({"inputName": input_name, "monitorType": monitor})),
                )
                .await,
        )
    }

    // ── Media ─────────────────────────────────────────────────────────────────

    pub async fn control_media(
        &self,
        input_name: &str,
        action: MediaAction,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "TriggerMediaInputAction",
                    args(json!({"inputName": input_name, "mediaAction": action})),
                )
                .await,
        )
    }
}
