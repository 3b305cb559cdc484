//! SceneModule: scenes and scene items.
//!
//! Every mutating operation re-reads the scene list first instead of caching
//! it, so its existence checks reflect the server as it is now.  At least one
//! scene must always exist; removing the last one is refused locally.

use obs_core::domain::entities::{SceneItem, SceneItemTransform, SceneList};
use serde_json::{json, Map};
use tracing::{debug, info, warn};

use crate::application::gateway::{args, RpcGateway};
use crate::application::outcome::{applied, Outcome, Refusal, Tolerate};
use crate::error::ObsError;

/// Scene operations.
#[derive(Clone)]
pub struct SceneModule {
    gateway: RpcGateway,
}

fn require_name(what: &str, name: &str) -> Result<(), ObsError> {
    if name.trim().is_empty() {
        Err(ObsError::InvalidArgument(format!("{what} must not be empty")))
    } else {
        Ok(())
    }
}

impl SceneModule {
    pub fn new(gateway: RpcGateway) -> Self {
        Self { gateway }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// All scenes plus the current program (and preview) scene.
    pub async fn list(&self) -> Result<SceneList, ObsError> {
        self.gateway.call_as("GetSceneList", Map::new()).await
    }

    pub async fn exists(&self, scene_name: &str) -> Result<bool, ObsError> {
        Ok(self.list().await?.contains(scene_name))
    }

    /// Name of the scene currently on program output.
    pub async fn current_program_scene(&self) -> Result<String, ObsError> {
        self.gateway
            .call_field("GetCurrentProgramScene", Map::new(), "currentProgramSceneName")
            .await
    }

    /// Items of `scene_name`, bottom first.
    pub async fn items(&self, scene_name: &str) -> Result<Vec<SceneItem>, ObsError> {
        self.gateway
            .call_field(
                "GetSceneItemList",
                args(json!({"sceneName": scene_name})),
                "sceneItems",
            )
            .await
    }

    /// Id of the item showing `source_name` in `scene_name`, or `None` if the
    /// scene has no such item.
    pub async fn item_id(&self, scene_name: &str, source_name: &str) -> Result<Option<i64>, ObsError> {
        self.gateway
            .call_field_or_none(
                "GetSceneItemId",
                args(json!({"sceneName": scene_name, "sourceName": source_name})),
                "sceneItemId",
                Tolerate::NotFound,
            )
            .await
    }

    // ── Scenes ────────────────────────────────────────────────────────────────

    /// Puts `scene_name` on program output.
    pub async fn switch(&self, scene_name: &str) -> Result<Outcome, ObsError> {
        if !self.exists(scene_name).await? {
            debug!(scene = scene_name, "cannot switch to a scene that does not exist");
            return Ok(Outcome::NotFound);
        }
        let outcome = self
            .gateway
            .call_outcome(
                "SetCurrentProgramScene",
                args(json!({"sceneName": scene_name})),
                Tolerate::NotFound,
            )
            .await?;
        if outcome.is_applied() {
            info!(scene = scene_name, "switched program scene");
        }
        Ok(outcome)
    }

    /// Creates an empty scene.  An existing scene of that name is left as is.
    pub async fn create(&self, scene_name: &str) -> Result<Outcome, ObsError> {
        require_name("scene name", scene_name)?;
        if self.exists(scene_name).await? {
            debug!(scene = scene_name, "scene already exists");
            return Ok(Outcome::AlreadyExists);
        }
        let outcome = self
            .gateway
            .call_outcome(
                "CreateScene",
                args(json!({"sceneName": scene_name})),
                Tolerate::AlreadyExists,
            )
            .await?;
        if outcome.is_applied() {
            info!(scene = scene_name, "created scene");
        }
        Ok(outcome)
    }

    /// Removes a scene, refusing to remove the only one left.
    pub async fn remove(&self, scene_name: &str) -> Result<Outcome, ObsError> {
        let list = self.list().await?;
        if !list.contains(scene_name) {
            debug!(scene = scene_name, "scene to remove does not exist");
            return Ok(Outcome::NotFound);
        }
        if list.scenes.len() <= 1 {
            warn!(scene = scene_name, "refusing to remove the last remaining scene");
            return Ok(Outcome::Refused(Refusal::LastScene));
        }
        let outcome = self
            .gateway
            .call_outcome(
                "RemoveScene",
                args(json!({"sceneName": scene_name})),
                Tolerate::NotFound,
            )
            .await?;
        if outcome.is_applied() {
            info!(scene = scene_name, "removed scene");
        }
        Ok(outcome)
    }

    /// Removes every scene except the last one standing.  Returns how many
    /// were removed.
    pub async fn remove_all(&self) -> Result<usize, ObsError> {
        let names: Vec<String> = self
            .list()
            .await?
            .scenes
            .into_iter()
            .map(|s| s.scene_name)
            .collect();

        let mut removed = 0;
        for name in names {
            match self.remove(&name).await? {
                Outcome::Applied => removed += 1,
                Outcome::Refused(_) => break,
                _ => {}
            }
        }
        info!(removed, "removed scenes");
        Ok(removed)
    }

    /// Renames `scene_name` to `new_name`.
    pub async fn rename(&self, scene_name: &str, new_name: &str) -> Result<Outcome, ObsError> {
        require_name("new scene name", new_name)?;
        let list = self.list().await?;
        if !list.contains(scene_name) {
            debug!(scene = scene_name, "scene to rename does not exist");
            return Ok(Outcome::NotFound);
        }
        if list.contains(new_name) {
            debug!(scene = new_name, "a scene with the new name already exists");
            return Ok(Outcome::AlreadyExists);
        }
        applied(
            self.gateway
                .call(
                    "SetSceneName",
                    args(json!({"sceneName": scene_name, "newSceneName": new_name})),
                )
                .await,
        )
    }

    // ── Scene items ───────────────────────────────────────────────────────────

    /// Adds an existing source to `scene_name` and returns the new item id.
    pub async fn add_item(
        &self,
        scene_name: &str,
        source_name: &str,
        enabled: bool,
    ) -> Result<i64, ObsError> {
        self.gateway
            .call_field(
                "CreateSceneItem",
                args(json!({
                    "sceneName": scene_name,
                    "sourceName": source_name,
                    "sceneItemEnabled": enabled
                })),
                "sceneItemId",
            )
            .await
    }

    pub async fn remove_item(&self, scene_name: &str, item_id: i64) -> Result<Outcome, ObsError> {
        self.gateway
            .call_outcome(
                "RemoveSceneItem",
                args(json!({"sceneName": scene_name, "sceneItemId": item_id})),
                Tolerate::NotFound,
            )
            .await
    }

    /// Shows or hides an item.
    pub async fn set_item_enabled(
        &self,
        scene_name: &str,
        item_id: i64,
        enabled: bool,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetSceneItemEnabled",
                    args(json!({
                        "sceneName": scene_name,
                        "sceneItemId": item_id,
                        "sceneItemEnabled": enabled
                    })),
                )
                .await,
        )
    }

    /// Applies the `Some` fields of `transform` to an item.
    pub async fn set_item_transform(
        &self,
        scene_name: &str,
        item_id: i64,
        transform: &SceneItemTransform,
    ) -> Result<Outcome, ObsError> {
        let transform = serde_json::to_value(transform)
            .map_err(|e| ObsError::InvalidArgument(format!("unencodable transform: {e}")))?;
        applied(
            self.gateway
                .call(
                    "SetSceneItemTransform",
                    args(json!({
                        "sceneName": scene_name,
                        "sceneItemId": item_id,
                        "sceneItemTransform": transform
                    })),
                )
                .await,
        )
    }

    /// Moves an item to `index` in the stacking order (0 is the bottom).
    pub async fn reorder_item(
        &self,
        scene_name: &str,
        item_id: i64,
        index: u32,
    ) -> Result<Outcome, ObsError> {
        applied(
            self.gateway
                .call(
                    "SetSceneItemIndex",
                    args(json!({
                        "sceneName": scene_name,
                        "sceneItemId": item_id,
                        "sceneItemIndex": index
                    })),
                )
                .await,
        )
    }
}
