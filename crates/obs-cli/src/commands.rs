//! Command dispatch for `obsctl`.
//!
//! Every handler writes its human-readable result to `out` so tests can
//! capture it; `main` passes stdout.

use std::future::Future;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use obs_client::infrastructure::storage::config::{save_config_to, AppConfig};
use obs_client::{ObsClient, Outcome, ServerEvent, ANY_EVENT};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::cli::{
    Command, ConfigAction, InputAction, OutputAction, RecordAction, SceneAction, StudioAction,
    ToggleAction,
};
use crate::workflows;

/// Runs a command that needs a connected client.
///
/// `Watch` prints events until `shutdown` completes; every other command
/// ignores it.
///
/// # Errors
///
/// Returns the first failure, with context naming the command.
pub async fn execute<W, S>(
    command: &Command,
    client: &ObsClient,
    out: &mut W,
    shutdown: S,
) -> anyhow::Result<()>
where
    W: Write,
    S: Future<Output = ()>,
{
    match command {
        Command::Scenes { action } => scenes(action, client, out).await,
        Command::Inputs { action } => inputs(action, client, out).await,
        Command::Stream { action } => stream(action, client, out).await,
        Command::Record { action } => record(action, client, out).await,
        Command::VirtualCam { action } => virtual_cam(action, client, out).await,
        Command::Studio { action } => studio(action, client, out).await,
        Command::Call { method, params } => call(method, params.as_deref(), client, out).await,
        Command::Watch { events } => watch(events, client, out, shutdown).await,
        Command::Clean => {
            let report = workflows::clean(client).await.context("clean failed")?;
            writeln!(
                out,
                "removed {} inputs and {} scenes",
                report.inputs_removed, report.scenes_removed
            )?;
            Ok(())
        }
        Command::Sample => {
            workflows::sample(client).await.context("sample failed")?;
            writeln!(out, "sample scene {:?} is on program", workflows::SAMPLE_SCENE)?;
            Ok(())
        }
        Command::Config { .. } => bail!("config commands do not use a connection"),
    }
}

/// Runs a `config` subcommand.  Needs no server.
///
/// # Errors
///
/// Returns an error if the file cannot be serialized or written.
pub fn config<W: Write>(
    action: &ConfigAction,
    path: &Path,
    effective: &AppConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Path => writeln!(out, "{}", path.display())?,
        ConfigAction::Show => {
            let mut shown = effective.clone();
            if shown.connection.password.is_some() {
                shown.connection.password = Some("<redacted>".to_string());
            }
            write!(out, "{}", toml::to_string_pretty(&shown)?)?;
        }
        ConfigAction::Init => {
            if path.exists() {
                writeln!(out, "config file already exists at {}", path.display())?;
            } else {
                save_config_to(path, &AppConfig::default())
                    .with_context(|| format!("cannot write {}", path.display()))?;
                writeln!(out, "wrote default config to {}", path.display())?;
            }
        }
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, what: &str, outcome: Outcome) -> anyhow::Result<()> {
    writeln!(out, "{what}: {outcome}")?;
    Ok(())
}

fn parse_object(text: &str, what: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).with_context(|| format!("{what} is not JSON"))? {
        Value::Object(map) => Ok(map),
        _ => bail!("{what} must be a JSON object"),
    }
}

// ── Scenes ────────────────────────────────────────────────────────────────────

async fn scenes<W: Write>(action: &SceneAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let scenes = client.scenes();
    match action {
        SceneAction::List => {
            let list = scenes.list().await?;
            for scene in &list.scenes {
                let live = list.current_program_scene_name.as_deref() == Some(&scene.scene_name);
                writeln!(out, "{} {}", if live { "*" } else { " " }, scene.scene_name)?;
            }
        }
        SceneAction::Current => writeln!(out, "{}", scenes.current_program_scene().await?)?,
        SceneAction::Create { name } => report(out, "create scene", scenes.create(name).await?)?,
        SceneAction::Remove { name } => report(out, "remove scene", scenes.remove(name).await?)?,
        SceneAction::Switch { name } => report(out, "switch scene", scenes.switch(name).await?)?,
        SceneAction::Rename { name, new_name } => {
            report(out, "rename scene", scenes.rename(name, new_name).await?)?
        }
        SceneAction::Items { scene } => {
            for item in scenes.items(scene).await? {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    item.scene_item_id,
                    item.source_name,
                    if item.scene_item_enabled { "visible" } else { "hidden" }
                )?;
            }
        }
    }
    Ok(())
}

// ── Inputs ────────────────────────────────────────────────────────────────────

async fn inputs<W: Write>(action: &InputAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let inputs = client.inputs();
    match action {
        InputAction::List { kind } => {
            for input in inputs.list(kind.as_deref()).await? {
                writeln!(out, "{}\t{}", input.input_name, input.input_kind)?;
            }
        }
        InputAction::Kinds => {
            for kind in inputs.kinds().await? {
                writeln!(out, "{kind}")?;
            }
        }
        InputAction::Create {
            scene,
            name,
            kind,
            settings,
        } => {
            let settings = match settings {
                Some(text) => parse_object(text, "--settings")?,
                None => Map::new(),
            };
            report(out, "create input", inputs.create(scene, name, kind, settings).await?)?
        }
        InputAction::Remove { name } => report(out, "remove input", inputs.remove(name).await?)?,
        InputAction::Mute { name } => report(out, "mute", inputs.set_muted(name, true).await?)?,
        InputAction::Unmute { name } => report(out, "unmute", inputs.set_muted(name, false).await?)?,
        InputAction::Volume { name, multiplier } => {
            report(out, "set volume", inputs.set_volume(name, *multiplier).await?)?
        }
        InputAction::Refresh { name } => {
            report(out, "refresh", inputs.refresh_browser(name).await?)?
        }
    }
    Ok(())
}

// ── Outputs ───────────────────────────────────────────────────────────────────

async fn stream<W: Write>(action: &OutputAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let outputs = client.outputs();
    match action {
        OutputAction::Start => report(out, "start stream", outputs.start_stream().await?),
        OutputAction::Stop => report(out, "stop stream", outputs.stop_stream().await?),
        OutputAction::Status => {
            let status = outputs.stream_status().await?;
            writeln!(
                out,
                "streaming: {}  timecode: {}  reconnecting: {}",
                status.output_active,
                status.output_timecode.as_deref().unwrap_or("-"),
                status.output_reconnecting
            )?;
            Ok(())
        }
    }
}

async fn record<W: Write>(action: &RecordAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let outputs = client.outputs();
    match action {
        RecordAction::Start => report(out, "start recording", outputs.start_recording().await?),
        RecordAction::Stop => {
            match outputs.stop_recording().await? {
                Some(path) => writeln!(out, "recording saved to {path}")?,
                None => writeln!(out, "stop recording: not recording")?,
            }
            Ok(())
        }
        RecordAction::Pause => report(out, "pause recording", outputs.pause_recording().await?),
        RecordAction::Resume => report(out, "resume recording", outputs.resume_recording().await?),
        RecordAction::Status => {
            let status = outputs.record_status().await?;
            writeln!(
                out,
                "recording: {}  paused: {}  timecode: {}",
                status.output_active,
                status.output_paused,
                status.output_timecode.as_deref().unwrap_or("-")
            )?;
            Ok(())
        }
    }
}

async fn virtual_cam<W: Write>(action: &ToggleAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let outputs = client.outputs();
    match action {
        ToggleAction::Start => report(out, "start virtual camera", outputs.start_virtual_cam().await?),
        ToggleAction::Stop => report(out, "stop virtual camera", outputs.stop_virtual_cam().await?),
    }
}

// ── Studio mode ───────────────────────────────────────────────────────────────

async fn studio<W: Write>(action: &StudioAction, client: &ObsClient, out: &mut W) -> anyhow::Result<()> {
    let studio = client.studio();
    match action {
        StudioAction::On => report(out, "studio mode on", studio.set_enabled(true).await?),
        StudioAction::Off => report(out, "studio mode off", studio.set_enabled(false).await?),
        StudioAction::Preview { scene: Some(scene) } => {
            report(out, "set preview scene", studio.set_preview_scene(scene).await?)
        }
        StudioAction::Preview { scene: None } => {
            match studio.current_preview_scene().await? {
                Some(name) => writeln!(out, "{name}")?,
                None => writeln!(out, "studio mode is off")?,
            }
            Ok(())
        }
    }
}

// ── Raw calls and events ──────────────────────────────────────────────────────

async fn call<W: Write>(
    method: &str,
    params: Option<&str>,
    client: &ObsClient,
    out: &mut W,
) -> anyhow::Result<()> {
    let params = match params {
        Some(text) => parse_object(text, "request data")?,
        None => Map::new(),
    };
    let reply = client.call(method, params).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&Value::Object(reply))?)?;
    Ok(())
}

async fn watch<W, S>(events: &[String], client: &ObsClient, out: &mut W, shutdown: S) -> anyhow::Result<()>
where
    W: Write,
    S: Future<Output = ()>,
{
    let types: Vec<&str> = if events.is_empty() {
        vec![ANY_EVENT]
    } else {
        events.iter().map(String::as_str).collect()
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let subscriptions: Vec<_> = types
        .iter()
        .map(|event_type| {
            let tx = tx.clone();
            client.on(event_type, move |event| {
                tx.send(event.clone())
                    .map_err(|_| anyhow::anyhow!("event printer has stopped"))
            })
        })
        .collect();
    drop(tx);

    tokio::pin!(shutdown);
    let result = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            event = rx.recv() => {
                let Some(event) = event else { break Ok(()) };
                let line = format!("{} {}", event.event_type, Value::Object(event.data));
                if let Err(e) = writeln!(out, "{line}") {
                    break Err(e.into());
                }
            }
        }
    };

    for id in subscriptions {
        client.off(id);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_rejects_non_objects() {
        assert!(parse_object(r#"{"sceneName": "A"}"#, "x").is_ok());
        assert!(parse_object("[1, 2]", "x").is_err());
        assert!(parse_object("not json", "x").is_err());
    }

    #[test]
    fn test_config_show_redacts_password() {
        // Arrange
        let mut effective = AppConfig::default();
        effective.connection.password = Some("hunter2".to_string());
        let mut out = Vec::new();

        // Act
        config(
            &ConfigAction::Show,
            Path::new("/tmp/unused.toml"),
            &effective,
            &mut out,
        )
        .unwrap();

        // Assert
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<redacted>"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("ws://localhost:4455"));
    }
}
