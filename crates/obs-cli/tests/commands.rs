//! Integration tests for `obsctl` command dispatch.
//!
//! Commands are parsed with `Cli::parse_from` and executed against an
//! [`ObsClient`] on the in-memory transport; output is captured in a
//! `Vec<u8>`.

use std::future;
use std::sync::Arc;

use clap::Parser;
use obs_cli::cli::{Cli, Command};
use obs_cli::commands;
use obs_cli::workflows::{DISPLAY_CAPTURE, SAMPLE_SCENE, SAMPLE_TEXT};
use obs_client::infrastructure::storage::config::{load_config_from, AppConfig};
use obs_client::infrastructure::transport::fake::{FakeTransport, SimulatedObs};
use obs_client::{ConnectOptions, ObsClient, SessionConfig};

async fn client_for(server: SimulatedObs) -> (ObsClient, Arc<FakeTransport>) {
    let fake = Arc::new(FakeTransport::with_server(server));
    let client =
        ObsClient::with_transport(SessionConfig::default(), fake.clone()).expect("valid config");
    client.connect(ConnectOptions::none()).await.expect("connect");
    (client, fake)
}

/// Parses `args` as an obsctl command line and runs it.
async fn run(client: &ObsClient, args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::parse_from(std::iter::once("obsctl").chain(args.iter().copied()));
    let mut out = Vec::new();
    commands::execute(&cli.command, client, &mut out, future::ready(())).await?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

#[tokio::test]
async fn test_scenes_list_marks_the_program_scene() {
    // Arrange
    let (client, _fake) = client_for(SimulatedObs::with_scenes(&["Intro", "Live"])).await;

    // Act
    let out = run(&client, &["scenes", "list"]).await.unwrap();

    // Assert
    assert!(out.contains("* Intro"), "got {out}");
    assert!(out.contains("  Live"), "got {out}");
}

#[tokio::test]
async fn test_scenes_create_reports_outcome_and_is_idempotent() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::default()).await;

    // Act
    let first = run(&client, &["scenes", "create", "Break"]).await.unwrap();
    let second = run(&client, &["scenes", "create", "Break"]).await.unwrap();

    // Assert
    assert!(first.starts_with("create scene:"));
    assert_ne!(first, second);
    assert_eq!(fake.call_count("CreateScene"), 1);
    assert!(fake
        .inspect_server(|obs| obs.scene_names())
        .contains(&"Break".to_string()));
}

#[tokio::test]
async fn test_inputs_create_with_settings_and_mute() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::default()).await;

    // Act
    run(
        &client,
        &[
            "inputs",
            "create",
            "Scene",
            "Clock",
            "text_ft2_source_v2",
            "--settings",
            r#"{"text": "12:00"}"#,
        ],
    )
    .await
    .unwrap();
    run(&client, &["inputs", "mute", "Clock"]).await.unwrap();
    let listed = run(&client, &["inputs", "list"]).await.unwrap();

    // Assert
    assert!(listed.contains("Clock\ttext_ft2_source_v2"));
    let (text, muted) = fake.inspect_server(|obs| {
        let input = obs.input("Clock").expect("input exists");
        (input.settings["text"].clone(), input.muted)
    });
    assert_eq!(text, "12:00");
    assert!(muted);
}

#[tokio::test]
async fn test_inputs_mute_on_missing_input_fails() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::default()).await;

    // Act
    let muted = run(&client, &["inputs", "mute", "Typo"]).await;
    let removed = run(&client, &["inputs", "remove", "Typo"]).await.unwrap();

    // Assert
    assert!(muted.is_err());
    assert!(removed.starts_with("remove input:"), "got {removed}");
    assert_eq!(fake.call_count("SetInputMute"), 1);
}

#[tokio::test]
async fn test_clean_removes_inputs_then_scenes() {
    // Arrange
    let mut server = SimulatedObs::with_scenes(&["A", "B", "C"]);
    server.add_input("A", "Mic", "wasapi_input_capture");
    server.add_input("B", "Cam", "display_capture");
    let (client, fake) = client_for(server).await;

    // Act
    let out = run(&client, &["clean"]).await.unwrap();

    // Assert
    assert_eq!(out.trim(), "removed 2 inputs and 2 scenes");
    fake.inspect_server(|obs| {
        assert!(obs.input_names().is_empty());
        assert_eq!(obs.scene_names().len(), 1);
    });
}

#[tokio::test]
async fn test_sample_builds_the_demo_scene() {
    // Arrange
    let mut server = SimulatedObs::with_scenes(&["Scene", "Old"]);
    server.add_input("Old", "Leftover", "image_source");
    let (client, fake) = client_for(server).await;

    // Act
    run(&client, &["sample"]).await.unwrap();

    // Assert
    fake.inspect_server(|obs| {
        assert!(obs.input("Leftover").is_none());
        assert_eq!(obs.program_scene, SAMPLE_SCENE);
        assert!(obs.studio_mode);

        let scene = obs.scene(SAMPLE_SCENE).expect("sample scene exists");
        let capture = scene
            .items
            .iter()
            .find(|item| item.source_name == DISPLAY_CAPTURE)
            .expect("display capture item");
        assert_eq!(capture.transform["boundsWidth"].as_f64(), Some(1920.0));
        assert_eq!(capture.transform["boundsHeight"].as_f64(), Some(1080.0));

        let text = obs.input(SAMPLE_TEXT).expect("text input");
        assert_eq!(text.kind, "text_ft2_source_v2");
        assert_eq!(text.settings["text"], "こんにちは、OBS WebSocket!");
        assert_eq!(text.settings["font"]["size"], 36);
    });
}

#[tokio::test]
async fn test_call_rejects_non_object_params_before_sending() {
    // Arrange
    let (client, fake) = client_for(SimulatedObs::default()).await;

    // Act
    let bad_json = run(&client, &["call", "GetVersion", "{not json"]).await;
    let array = run(&client, &["call", "GetVersion", "[1]"]).await;

    // Assert
    assert!(bad_json.is_err());
    assert!(array.is_err());
    assert_eq!(fake.call_count("GetVersion"), 0);
}

#[tokio::test]
async fn test_call_pretty_prints_the_reply() {
    let (client, _fake) = client_for(SimulatedObs::default()).await;

    let out = run(&client, &["call", "GetVersion"]).await.unwrap();

    assert!(out.contains("\"obsWebSocketVersion\": \"5.4.2\""), "got {out}");
}

#[tokio::test]
async fn test_watch_stops_when_shutdown_completes() {
    // Arrange
    let (client, _fake) = client_for(SimulatedObs::default()).await;
    let cli = Cli::parse_from(["obsctl", "watch", "CurrentProgramSceneChanged"]);
    let mut out = Vec::new();

    // Act
    let result = commands::execute(&cli.command, &client, &mut out, future::ready(())).await;

    // Assert
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_config_init_does_not_overwrite_existing_file() {
    // Arrange
    let path = std::env::temp_dir().join(format!(
        "obsctl-test-{}/config.toml",
        std::process::id()
    ));
    let cli = Cli::parse_from(["obsctl", "config", "init"]);
    let Command::Config { action } = &cli.command else {
        panic!("expected a config command");
    };
    let mut custom = AppConfig::default();
    custom.connection.url = "ws://custom:4455".to_string();

    // Act
    let mut first = Vec::new();
    commands::config(action, &path, &custom, &mut first).unwrap();
    let written = load_config_from(&path).unwrap();
    let mut second = Vec::new();
    commands::config(action, &path, &custom, &mut second).unwrap();

    // Assert
    assert_eq!(written, AppConfig::default());
    assert!(String::from_utf8(second).unwrap().contains("already exists"));
    assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
