//! StudioModule: studio mode and the preview scene.
//!
//! In studio mode the program output keeps showing one scene while another
//! is prepared in the preview.  Turning studio mode on when it is already on
//! (or off when off) is [`Outcome::Unchanged`].  Reading the preview while
//! studio mode is off gives `None`; setting it fails.

use serde_json::{json, Map};
use tracing::info;

use crate::application::gateway::{args, RpcGateway};
use crate::application::outcome::{applied, Outcome, Tolerate};
use crate::error::ObsError;

/// Studio mode operations.
#[derive(Clone)]
pub struct StudioModule {
    gateway: RpcGateway,
}

impl StudioModule {
    pub fn new(gateway: RpcGateway) -> Self {
        Self { gateway }
    }

    pub async fn enabled(&self) -> Result<bool, ObsError> {
        self.gateway
            .call_field("GetStudioModeEnabled", Map::new(), "studioModeEnabled")
            .await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<Outcome, ObsError> {
        let outcome = self
            .gateway
            .call_outcome(
                "SetStudioModeEnabled",
                args(json!({"studioModeEnabled": enabled})),
                Tolerate::AlreadyInState,
            )
            .await?;
        info!(enabled, "studio mode set");
        Ok(outcome)
    }

    /// The preview scene, or `None` when studio mode is off.
    pub async fn current_preview_scene(&self) -> Result<Option<String>, ObsError> {
        self.gateway
            .call_field_or_none(
                "GetCurrentPreviewScene",
                Map::new(),
                "currentPreviewSceneName",
                Tolerate::AlreadyInState,
            )
            .await
    }

    pub async fn set_preview_scene(&self, scene_name: &str) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetCurrentPreviewScene",
                    args(json!({"sceneName": scene_name})),
                )
                .await,
        )
    }

    /// Puts `scene_name` on program output without checking that it exists
    /// first.  A missing scene fails with [`ObsError::RemoteCall`].
    pub async fn set_program_scene(&self, scene_name: &str) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetCurrentProgramScene",
                    args(json!({"sceneName": scene_name})),
                )
                .await,
        )
    }
}
