//! Multi-step workflows built from the capability modules.
//!
//! - [`clean`] empties the running OBS instance: every input goes, then every
//!   scene except the one OBS insists on keeping.
//! - [`sample`] cleans, builds a demo scene (a display capture stretched to
//!   1920×1080 plus a text source), enables studio mode, and puts the demo
//!   scene on program output.

use obs_client::{ObsClient, ObsError, Outcome};
use obs_core::domain::entities::SceneItemTransform;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub const SAMPLE_SCENE: &str = "サンプルシーン";
pub const DISPLAY_CAPTURE: &str = "ディスプレイキャプチャー";
pub const SAMPLE_TEXT: &str = "サンプルテキスト";

const DISPLAY_CAPTURE_KIND: &str = "display_capture";
const TEXT_KIND: &str = "text_ft2_source_v2";
const CANVAS_WIDTH: f64 = 1920.0;
const CANVAS_HEIGHT: f64 = 1080.0;

/// What [`clean`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub inputs_removed: usize,
    pub scenes_removed: usize,
}

/// Removes all inputs, then all scenes but the last.
///
/// # Errors
///
/// Propagates the first hard error from either module.
pub async fn clean(client: &ObsClient) -> Result<CleanReport, ObsError> {
    let inputs_removed = client.inputs().remove_all().await?;
    let scenes_removed = client.scenes().remove_all().await?;
    info!(inputs_removed, scenes_removed, "cleaned OBS");
    Ok(CleanReport {
        inputs_removed,
        scenes_removed,
    })
}

/// Builds the sample scene from a clean slate.
///
/// # Errors
///
/// Propagates the first hard error.  Sources that already exist are left as
/// they are.
pub async fn sample(client: &ObsClient) -> Result<CleanReport, ObsError> {
    let report = clean(client).await?;

    client.scenes().create(SAMPLE_SCENE).await?;
    add_display_capture(client).await?;
    add_text(client).await?;

    client.studio().set_enabled(true).await?;
    client.studio().set_program_scene(SAMPLE_SCENE).await?;
    info!(scene = SAMPLE_SCENE, "sample scene is live");
    Ok(report)
}

async fn add_display_capture(client: &ObsClient) -> Result<(), ObsError> {
    let created = client
        .inputs()
        .create(SAMPLE_SCENE, DISPLAY_CAPTURE, DISPLAY_CAPTURE_KIND, Map::new())
        .await?;
    if created != Outcome::Applied {
        debug!(input = DISPLAY_CAPTURE, %created, "keeping existing display capture");
        return Ok(());
    }

    let scenes = client.scenes();
    let Some(item_id) = scenes.item_id(SAMPLE_SCENE, DISPLAY_CAPTURE).await? else {
        return Err(ObsError::UnexpectedResponse {
            method: "GetSceneItemId".to_string(),
            reason: format!("{DISPLAY_CAPTURE} was created but has no scene item"),
        });
    };
    scenes
        .set_item_transform(
            SAMPLE_SCENE,
            item_id,
            &SceneItemTransform::stretch_to(CANVAS_WIDTH, CANVAS_HEIGHT),
        )
        .await?;
    info!(input = DISPLAY_CAPTURE, "display capture stretched to the canvas");
    Ok(())
}

async fn add_text(client: &ObsClient) -> Result<(), ObsError> {
    client
        .inputs()
        .create(SAMPLE_SCENE, SAMPLE_TEXT, TEXT_KIND, text_settings())
        .await?;
    Ok(())
}

fn text_settings() -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert("text".to_string(), json!("こんにちは、OBS WebSocket!"));
    settings.insert("font".to_string(), json!({"face": "Arial", "size": 36}));
    settings
}
