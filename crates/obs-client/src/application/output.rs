//! OutputModule: streaming, recording, virtual camera, replay buffer.
//!
//! Starting an output that is already running (or stopping one that is not)
//! returns [`Outcome::Unchanged`] rather than an error.  Settings changes
//! propagate every server failure.

use obs_core::domain::entities::{OutputStatus, RecordStatus, Stats, StreamServiceSettings};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::application::gateway::{args, RpcGateway};
use crate::application::outcome::{applied, Outcome, Tolerate};
use crate::error::ObsError;

/// Output operations.
#[derive(Clone)]
pub struct OutputModule {
    gateway: RpcGateway,
}

impl OutputModule {
    pub fn new(gateway: RpcGateway) -> Self {
        Self { gateway }
    }

    /// Sends a parameterless toggle request and logs when it took effect.
    async fn toggle(&self, method: &str, label: &str) -> Result<Outcome, ObsError> {
        let outcome = self
            .gateway
            .call_outcome(method, Map::new(), Tolerate::AlreadyInState)
            .await?;
        if outcome.is_applied() {
            info!(output = label, "done");
        }
        Ok(outcome)
    }

    // ── Stream ────────────────────────────────────────────────────────────────

    pub async fn start_stream(&self) -> Result<Outcome, ObsError> {
        self.toggle("StartStream", "start stream").await
    }

    pub async fn stop_stream(&self) -> Result<Outcome, ObsError> {
        self.toggle("StopStream", "stop stream").await
    }

    pub async fn stream_status(&self) -> Result<OutputStatus, ObsError> {
        self.gateway.call_as("GetStreamStatus", Map::new()).await
    }

    pub async fn stream_service_settings(&self) -> Result<StreamServiceSettings, ObsError> {
        self.gateway
            .call_as("GetStreamServiceSettings", Map::new())
            .await
    }

    pub async fn set_stream_service_settings(
        &self,
        settings: &StreamServiceSettings,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetStreamServiceSettings",
                    args(json!({
                        "streamServiceType": settings.stream_service_type,
                        "streamServiceSettings": settings.stream_service_settings
                    })),
                )
                .await,
        )
    }

    // ── Record ────────────────────────────────────────────────────────────────

    pub async fn start_recording(&self) -> Result<Outcome, ObsError> {
        self.toggle("StartRecord", "start recording").await
    }

    /// Stops recording and returns the path of the finished file, or `None`
    /// when nothing was recording.
    pub async fn stop_recording(&self) -> Result<Option<String>, ObsError> {
        let result = self
            .gateway
            .call_tolerating("StopRecord", Map::new(), Tolerate::AlreadyInState)
            .await;
        match result {
            Ok(mut data) => {
                let path = data
                    .remove("outputPath")
                    .and_then(|v| v.as_str().map(str::to_string));
                info!(path = ?path, "stopped recording");
                Ok(path)
            }
            Err(e) if e.remote_kind() == Some(Tolerate::AlreadyInState.kind()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn pause_recording(&self) -> Result<Outcome, ObsError> {
        self.toggle("PauseRecord", "pause recording").await
    }

    pub async fn resume_recording(&self) -> Result<Outcome, ObsError> {
        self.toggle("ResumeRecord", "resume recording").await
    }

    pub async fn record_status(&self) -> Result<RecordStatus, ObsError> {
        self.gateway.call_as("GetRecordStatus", Map::new()).await
    }

    // ── Virtual camera ────────────────────────────────────────────────────────

    pub async fn start_virtual_cam(&self) -> Result<Outcome, ObsError> {
        self.toggle("StartVirtualCam", "start virtual camera").await
    }

    pub async fn stop_virtual_cam(&self) -> Result<Outcome, ObsError> {
        self.toggle("StopVirtualCam", "stop virtual camera").await
    }

    // ── Replay buffer ─────────────────────────────────────────────────────────

    pub async fn start_replay_buffer(&self) -> Result<Outcome, ObsError> {
        self.toggle("StartReplayBuffer", "start replay buffer").await
    }

    pub async fn stop_replay_buffer(&self) -> Result<Outcome, ObsError> {
        self.toggle("StopReplayBuffer", "stop replay buffer").await
    }

    /// Saves the replay buffer to disk.  `Unchanged` when it is not running.
    pub async fn save_replay_buffer(&self) -> Result<Outcome, ObsError> {
        self.toggle("SaveReplayBuffer", "save replay buffer").await
    }

    /// Path of the most recently saved replay.
    pub async fn last_replay_path(&self) -> Result<String, ObsError> {
        self.gateway
            .call_field("GetLastReplayBufferReplay", Map::new(), "savedReplayPath")
            .await
    }

    // ── Generic outputs ───────────────────────────────────────────────────────

    /// Performance counters of the running instance.
    pub async fn stats(&self) -> Result<Stats, ObsError> {
        self.gateway.call_as("GetStats", Map::new()).await
    }

    pub async fn output_status(&self, output_name: &str) -> Result<OutputStatus, ObsError> {
        self.gateway
            .call_as("GetOutputStatus", args(json!({"outputName": output_name})))
            .await
    }

    pub async fn output_settings(&self, output_name: &str) -> Result<Map<String, Value>, ObsError> {
        self.gateway
            .call_field(
                "GetOutputSettings",
                args(json!({"outputName": output_name})),
                "outputSettings",
            )
            .await
    }

    pub async fn set_output_settings(
        &self,
        output_name: &str,
        settings: Map<String, Value>,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetOutputSettings",
                    args(json!({"outputName": output_name, "outputSettings": settings})),
                )
                .await,
        )
    }
}
