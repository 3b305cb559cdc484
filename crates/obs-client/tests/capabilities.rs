//! Integration tests for the scene, input, output, and studio modules.
//!
//! Each test connects an [`ObsClient`] to a [`FakeTransport`] whose simulated
//! server keeps real state, so assertions can check both the returned
//! [`Outcome`] and what the server ended up with.

use std::sync::Arc;

use obs_client::infrastructure::transport::fake::{FakeTransport, SimulatedObs};
use obs_client::{
    ConnectOptions, ObsClient, ObsError, Outcome, Refusal, RemoteErrorKind, SessionConfig,
    TransportError,
};
use obs_core::domain::entities::{MediaAction, MonitorType, SceneItemTransform};
use serde_json::{json, Map, Value};

async fn client_for(server: SimulatedObs) -> (ObsClient, Arc<FakeTransport>) {
    let fake = Arc::new(FakeTransport::with_server(server));
    let client =
        ObsClient::with_transport(SessionConfig::default(), fake.clone()).expect("valid config");
    client.connect(ConnectOptions::none()).await.expect("connect");
    (client, fake)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ── Scenes ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_existing_scene_is_a_soft_no_op() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["Scene", "A"])).await;

    // Act
    let outcome = client.scenes().create("A").await.unwrap();

    // Assert
    assert_eq!(outcome, Outcome::AlreadyExists);
    assert_eq!(fake.call_count("CreateScene"), 0);
    let names = fake.inspect_server(|obs| obs.scene_names());
    assert_eq!(names.iter().filter(|n| *n == "A").count(), 1);
}

#[tokio::test]
async fn test_create_race_with_server_duplicate_is_absorbed() {
    // Arrange: the existence check sees nothing but the server disagrees.
    let (client, fake) = client_for(SimulatedObs::default()).await;
    fake.set_responder(|method, _| match method {
        "GetSceneList" => Ok(object(json!({"scenes": []}))),
        _ => Err(TransportError::Remote {
            code: 601,
            comment: "A source already exists by that scene name.".to_string(),
        }),
    });

    // Act
    let outcome = client.scenes().create("A").await.unwrap();

    // Assert
    assert_eq!(outcome, Outcome::AlreadyExists);
    assert_eq!(fake.call_count("CreateScene"), 1);
}

#[tokio::test]
async fn test_create_with_empty_name_is_invalid() {
    let (client, fake) = client_for(SimulatedObs::default()).await;

    let err = client.scenes().create("  ").await.unwrap_err();

    assert!(matches!(err, ObsError::InvalidArgument(_)));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_removing_the_last_scene_is_refused() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["Only"])).await;

    // Act
    let outcome = client.scenes().remove("Only").await.unwrap();

    // Assert
    assert_eq!(outcome, Outcome::Refused(Refusal::LastScene));
    assert_eq!(fake.call_count("RemoveScene"), 0);
    assert_eq!(fake.inspect_server(|obs| obs.scene_names()), vec!["Only"]);
}

#[tokio::test]
async fn test_remove_missing_scene_is_not_found() {
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["A", "B"])).await;

    let outcome = client.scenes().remove("C").await.unwrap();

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(fake.call_count("RemoveScene"), 0);
}

#[tokio::test]
async fn test_remove_all_keeps_one_scene() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["A", "B", "C", "D"])).await;

    // Act
    let removed = client.scenes().remove_all().await.unwrap();

    // Assert
    assert_eq!(removed, 3);
    assert_eq!(fake.inspect_server(|obs| obs.scenes.len()), 1);
}

#[tokio::test]
async fn test_switch_to_missing_scene_sends_nothing() {
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["A"])).await;

    let outcome = client.scenes().switch("Nope").await.unwrap();

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(fake.call_count("SetCurrentProgramScene"), 0);
}

#[tokio::test]
async fn test_switch_and_rename_scene() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["A", "B"])).await;
    let scenes = client.scenes();

    // Act
    assert_eq!(scenes.switch("B").await.unwrap(), Outcome::Applied);
    assert_eq!(scenes.rename("B", "Live").await.unwrap(), Outcome::Applied);

    // Assert
    assert_eq!(scenes.current_program_scene().await.unwrap(), "Live");
    assert_eq!(scenes.rename("A", "Live").await.unwrap(), Outcome::AlreadyExists);
    assert_eq!(scenes.rename("Gone", "X").await.unwrap(), Outcome::NotFound);
    assert_eq!(fake.inspect_server(|obs| obs.scene_names()), vec!["A", "Live"]);
}

#[tokio::test]
async fn test_scene_items_can_be_placed_and_hidden() {
    // Arrange
    let mut server = SimulatedObs::with_scenes(&["Main"]);
    server.add_input("Main", "Camera", "dshow_input");
    let (client, fake) = client_for(server).await;
    let scenes = client.scenes();

    // Act
    let id = scenes.item_id("Main", "Camera").await.unwrap().expect("item exists");
    let transformed = scenes
        .set_item_transform("Main", id, &SceneItemTransform::stretch_to(1920.0, 1080.0))
        .await
        .unwrap();
    let hidden = scenes.set_item_enabled("Main", id, false).await.unwrap();

    // Assert
    assert_eq!(transformed, Outcome::Applied);
    assert_eq!(hidden, Outcome::Applied);
    assert_eq!(scenes.item_id("Main", "Nothing").await.unwrap(), None);
    let item = fake.inspect_server(|obs| obs.scene("Main").unwrap().items[0].clone());
    assert!(!item.enabled);
    assert_eq!(item.transform["boundsType"], "OBS_BOUNDS_STRETCH");
    assert_eq!(item.transform["boundsWidth"], 1920.0);

    let items = scenes.items("Main").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source_name, "Camera");
}

// ── Inputs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_and_remove_inputs() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::with_scenes(&["Main"])).await;
    let inputs = client.inputs();

    // Act
    let created = inputs
        .create("Main", "Clock", "text_ft2_source_v2", object(json!({"text": "12:00"})))
        .await
        .unwrap();
    let again = inputs
        .create("Main", "Clock", "text_ft2_source_v2", Map::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(created, Outcome::Applied);
    assert_eq!(again, Outcome::AlreadyExists);
    assert_eq!(fake.call_count("CreateInput"), 1);
    let listed = inputs.list(Some("text_ft2_source_v2")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(inputs.settings("Clock").await.unwrap().input_settings["text"], "12:00");

    assert_eq!(inputs.remove("Clock").await.unwrap(), Outcome::Applied);
    assert_eq!(inputs.remove("Clock").await.unwrap(), Outcome::NotFound);
}

#[tokio::test]
async fn test_remove_all_inputs() {
    let mut server = SimulatedObs::with_scenes(&["Main"]);
    server.add_input("Main", "Mic", "wasapi_input_capture");
    server.add_input("Main", "Desktop", "wasapi_output_capture");
    let (client, fake) = client_for(server).await;

    let removed = client.inputs().remove_all().await.unwrap();

    assert_eq!(removed, 2);
    assert!(fake.inspect_server(|obs| obs.inputs.is_empty()));
}

#[tokio::test]
async fn test_volume_out_of_range_is_rejected_locally() {
    // Arrange
    let mut server = SimulatedObs::default();
    server.add_input("Scene", "Mic", "wasapi_input_capture");
    let (client, fake) = client_for(server).await;
    let inputs = client.inputs();

    // Act / Assert
    for bad in [-0.1, 20.5, f64::NAN] {
        let err = inputs.set_volume("Mic", bad).await.unwrap_err();
        assert!(matches!(err, ObsError::InvalidArgument(_)), "volume {bad}");
    }
    assert_eq!(fake.call_count("SetInputVolume"), 0);

    assert_eq!(inputs.set_volume("Mic", 0.5).await.unwrap(), Outcome::Applied);
    assert_eq!(fake.inspect_server(|obs| obs.input("Mic").unwrap().volume_mul), 0.5);
}

#[tokio::test]
async fn test_mute_monitor_and_media_controls() {
    // Arrange
    let mut server = SimulatedObs::default();
    server.add_input("Scene", "Clip", "ffmpeg_source");
    let (client, fake) = client_for(server).await;
    let inputs = client.inputs();

    // Act
    inputs.set_muted("Clip", true).await.unwrap();
    let after_toggle = inputs.toggle_mute("Clip").await.unwrap();
    inputs
        .set_audio_monitor("Clip", MonitorType::MonitorAndOutput)
        .await
        .unwrap();
    inputs.control_media("Clip", MediaAction::Restart).await.unwrap();

    // Assert
    assert!(!after_toggle);
    let clip = fake.inspect_server(|obs| obs.input("Clip").unwrap().clone());
    assert!(!clip.muted);
    assert_eq!(clip.monitor_type, "OBS_MONITORING_TYPE_MONITOR_AND_OUTPUT");
    assert_eq!(
        clip.last_media_action.as_deref(),
        Some("OBS_WEBSOCKET_MEDIA_INPUT_ACTION_RESTART")
    );
}

#[tokio::test]
async fn test_setters_on_missing_input_propagate_not_found() {
    // Arrange
    let mut server = SimulatedObs::default();
    server.add_input("Scene", "Mic", "wasapi_input_capture");
    let (client, fake) = client_for(server).await;
    let inputs = client.inputs();

    // Act
    let muted = inputs.set_muted("missing", true).await;
    let volume = inputs.set_volume("missing", 0.5).await;
    let settings = inputs.set_settings("missing", Map::new(), true).await;
    let removed = inputs.remove("missing").await;

    // Assert
    for result in [muted, volume, settings] {
        assert!(
            matches!(
                result,
                Err(ObsError::RemoteCall {
                    kind: RemoteErrorKind::NotFound,
                    ..
                })
            ),
            "got {result:?}"
        );
    }
    assert_eq!(removed.unwrap(), Outcome::NotFound);
    assert_eq!(fake.call_count("SetInputMute"), 1);
    assert!(!fake.inspect_server(|obs| obs.input("Mic").unwrap().muted));
}

#[tokio::test]
async fn test_toggle_mute_on_missing_input_is_a_remote_error() {
    let (client, _fake) = client_for(SimulatedObs::default()).await;

    let err = client.inputs().toggle_mute("Ghost").await.unwrap_err();

    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::NotFound));
}

#[tokio::test]
async fn test_browser_url_keeps_other_settings() {
    // Arrange
    let mut server = SimulatedObs::default();
    server.add_input("Scene", "Overlay", "browser_source");
    server.inputs[0].settings = object(json!({"url": "https://old", "width": 1280}));
    let (client, fake) = client_for(server).await;

    // Act
    let outcome = client
        .inputs()
        .set_browser_url("Overlay", "https://new")
        .await
        .unwrap();
    client.inputs().refresh_browser("Overlay").await.unwrap();

    // Assert
    assert_eq!(outcome, Outcome::Applied);
    let overlay = fake.inspect_server(|obs| obs.input("Overlay").unwrap().clone());
    assert_eq!(overlay.settings["url"], "https://new");
    assert_eq!(overlay.settings["width"], 1280);
    assert_eq!(overlay.refreshes, 1);

    let missing = client.inputs().set_browser_url("Nope", "https://x").await.unwrap_err();
    assert_eq!(missing.remote_kind(), Some(RemoteErrorKind::NotFound));
}

// ── Outputs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_output_toggles_report_unchanged_when_already_in_state() {
    let (client, _fake) = client_for(SimulatedObs::default()).await;
    let outputs = client.outputs();

    assert_eq!(outputs.start_stream().await.unwrap(), Outcome::Applied);
    assert_eq!(outputs.start_stream().await.unwrap(), Outcome::Unchanged);
    assert!(outputs.stream_status().await.unwrap().output_active);
    assert_eq!(outputs.stop_stream().await.unwrap(), Outcome::Applied);
    assert_eq!(outputs.stop_stream().await.unwrap(), Outcome::Unchanged);

    assert_eq!(outputs.stop_virtual_cam().await.unwrap(), Outcome::Unchanged);
    assert_eq!(outputs.start_virtual_cam().await.unwrap(), Outcome::Applied);
}

#[tokio::test]
async fn test_recording_lifecycle_returns_output_path() {
    // Arrange
    let (client, _fake) = client_for(SimulatedObs::default()).await;
    let outputs = client.outputs();

    // Act
    assert_eq!(outputs.stop_recording().await.unwrap(), None);
    outputs.start_recording().await.unwrap();
    assert_eq!(outputs.pause_recording().await.unwrap(), Outcome::Applied);
    assert!(outputs.record_status().await.unwrap().output_paused);
    assert_eq!(outputs.resume_recording().await.unwrap(), Outcome::Applied);
    let path = outputs.stop_recording().await.unwrap();

    // Assert
    assert_eq!(path.as_deref(), Some("/videos/recording.mkv"));
    assert!(!outputs.record_status().await.unwrap().output_active);
}

#[tokio::test]
async fn test_replay_buffer_save_requires_running_buffer() {
    let (client, _fake) = client_for(SimulatedObs::default()).await;
    let outputs = client.outputs();

    assert_eq!(outputs.save_replay_buffer().await.unwrap(), Outcome::Unchanged);
    outputs.start_replay_buffer().await.unwrap();
    assert_eq!(outputs.save_replay_buffer().await.unwrap(), Outcome::Applied);
    assert_eq!(outputs.last_replay_path().await.unwrap(), "/videos/replay-1.mkv");
}

#[tokio::test]
async fn test_stats_and_stream_service_settings() {
    let (client, _fake) = client_for(SimulatedObs::default()).await;
    let outputs = client.outputs();

    let stats = outputs.stats().await.unwrap();
    assert!(stats.active_fps > 0.0);

    let mut service = outputs.stream_service_settings().await.unwrap();
    assert_eq!(service.stream_service_type, "rtmp_common");
    service
        .stream_service_settings
        .insert("key".to_string(), json!("abc"));
    outputs.set_stream_service_settings(&service).await.unwrap();
    let reread = outputs.stream_service_settings().await.unwrap();
    assert_eq!(reread.stream_service_settings["key"], "abc");
}

// ── Studio mode ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_studio_mode_and_preview_scene() {
    // Arrange
    let (client, _fake) = client_for(SimulatedObs::with_scenes(&["A", "B"])).await;
    let studio = client.studio();

    // Assert: no preview while studio mode is off.
    assert!(!studio.enabled().await.unwrap());
    assert_eq!(studio.current_preview_scene().await.unwrap(), None);
    let refused = studio.set_preview_scene("B").await.unwrap_err();
    assert_eq!(refused.remote_kind(), Some(RemoteErrorKind::AlreadyInState));

    // Act
    assert_eq!(studio.set_enabled(true).await.unwrap(), Outcome::Applied);
    assert_eq!(studio.set_enabled(true).await.unwrap(), Outcome::Unchanged);
    studio.set_preview_scene("B").await.unwrap();

    // Assert
    assert!(studio.enabled().await.unwrap());
    assert_eq!(studio.current_preview_scene().await.unwrap().as_deref(), Some("B"));
    assert_eq!(studio.set_program_scene("B").await.unwrap(), Outcome::Applied);
    assert_eq!(client.scenes().current_program_scene().await.unwrap(), "B");
    let missing = studio.set_program_scene("Nope").await.unwrap_err();
    assert!(
        matches!(
            missing,
            ObsError::RemoteCall {
                kind: RemoteErrorKind::NotFound,
                ..
            }
        ),
        "got {missing:?}"
    );
}
