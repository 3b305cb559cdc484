//! Command-line definition for `obsctl`.
//!
//! # Precedence (for beginners)
//!
//! Every connection setting can come from three places.  The first one that
//! is present wins:
//!
//! 1. a command-line flag (`--url ws://...`) or its environment variable
//!    (`OBS_WEBSOCKET_URL=ws://...`); clap treats both the same way,
//! 2. the TOML config file (`[connection] url = "..."`),
//! 3. the compiled-in default.
//!
//! | Variable                 | Flag               |
//! |--------------------------|--------------------|
//! | `OBS_WEBSOCKET_URL`      | `--url`            |
//! | `OBS_WEBSOCKET_PASSWORD` | `--password`       |
//! | `OBS_RETRY_ATTEMPTS`     | `--retry-attempts` |
//! | `OBS_RETRY_DELAY_MS`     | `--retry-delay-ms` |
//! | `OBS_AUTO_RECONNECT`     | `--auto-reconnect` |
//! | `OBS_LOG_LEVEL`          | `--log-level`      |
//! | `OBS_CONFIG`             | `--config`         |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use obs_client::infrastructure::storage::config::{config_file_path, AppConfig, ConfigError};

/// Remote control for OBS Studio over obs-websocket.
#[derive(Debug, Parser)]
#[command(name = "obsctl", author, version, about, long_about = None)]
pub struct Cli {
    /// WebSocket endpoint of the obs-websocket server.
    #[arg(long, global = true, env = "OBS_WEBSOCKET_URL")]
    pub url: Option<String>,

    /// obs-websocket server password.
    #[arg(long, global = true, env = "OBS_WEBSOCKET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Reconnection attempts after the server drops the connection.
    #[arg(long, global = true, env = "OBS_RETRY_ATTEMPTS")]
    pub retry_attempts: Option<u32>,

    /// Milliseconds between reconnection attempts.
    #[arg(long, global = true, env = "OBS_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Reconnect automatically when the server drops the connection.
    #[arg(
        long,
        global = true,
        env = "OBS_AUTO_RECONNECT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub auto_reconnect: Option<bool>,

    /// Minimum log level (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` overrides it when set.
    #[arg(long, global = true, env = "OBS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "OBS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, create, remove, and switch scenes
    Scenes {
        #[command(subcommand)]
        action: SceneAction,
    },

    /// Manage input sources
    Inputs {
        #[command(subcommand)]
        action: InputAction,
    },

    /// Control streaming
    Stream {
        #[command(subcommand)]
        action: OutputAction,
    },

    /// Control recording
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Control the virtual camera
    #[command(name = "virtualcam")]
    VirtualCam {
        #[command(subcommand)]
        action: ToggleAction,
    },

    /// Studio mode and the preview scene
    Studio {
        #[command(subcommand)]
        action: StudioAction,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Send a raw request and print the response data
    Call {
        /// Request type, e.g. `GetVersion`
        method: String,
        /// Request data as a JSON object
        params: Option<String>,
    },

    /// Print server events until Ctrl+C
    Watch {
        /// Event types to print (all events when omitted)
        events: Vec<String>,
    },

    /// Remove every input, then every scene that may be removed
    Clean,

    /// Clean, then build the sample scene and put it on program output
    Sample,
}

#[derive(Debug, Subcommand)]
pub enum SceneAction {
    /// List all scenes
    List,
    /// Print the program scene
    Current,
    /// Create an empty scene
    Create { name: String },
    /// Remove a scene (the last one is kept)
    Remove { name: String },
    /// Put a scene on program output
    Switch { name: String },
    /// Rename a scene
    Rename { name: String, new_name: String },
    /// List the items of a scene
    Items { scene: String },
}

#[derive(Debug, Subcommand)]
pub enum InputAction {
    /// List inputs
    List {
        /// Only inputs of this kind
        #[arg(long)]
        kind: Option<String>,
    },
    /// List the input kinds the server can create
    Kinds,
    /// Create an input inside a scene
    Create {
        scene: String,
        name: String,
        kind: String,
        /// Input settings as a JSON object
        #[arg(long)]
        settings: Option<String>,
    },
    /// Remove an input
    Remove { name: String },
    /// Mute an input
    Mute { name: String },
    /// Unmute an input
    Unmute { name: String },
    /// Set the volume as a multiplier (0.0 to 20.0)
    Volume { name: String, multiplier: f64 },
    /// Reload a browser source
    Refresh { name: String },
}

#[derive(Debug, Subcommand)]
pub enum OutputAction {
    Start,
    Stop,
    Status,
}

#[derive(Debug, Subcommand)]
pub enum RecordAction {
    Start,
    /// Stop and print the path of the recording
    Stop,
    Pause,
    Resume,
    Status,
}

#[derive(Debug, Subcommand)]
pub enum ToggleAction {
    Start,
    Stop,
}

#[derive(Debug, Subcommand)]
pub enum StudioAction {
    /// Enable studio mode
    On,
    /// Disable studio mode
    Off,
    /// Print the preview scene, or set it when a name is given
    Preview { scene: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file unless one exists
    Init,
}

impl Cli {
    /// The config file this invocation reads.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformConfigDir`] when `--config` is absent
    /// and the platform directory cannot be determined.
    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path(),
        }
    }

    /// Overlays the flags and environment variables onto `file`.
    pub fn apply_overrides(&self, mut file: AppConfig) -> AppConfig {
        let c = &mut file.connection;
        if let Some(url) = &self.url {
            c.url = url.clone();
        }
        if let Some(password) = &self.password {
            c.password = Some(password.clone());
        }
        if let Some(attempts) = self.retry_attempts {
            c.retry_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay_ms {
            c.retry_delay_ms = delay;
        }
        if let Some(auto) = self.auto_reconnect {
            c.auto_reconnect = auto;
        }
        if let Some(level) = &self.log_level {
            file.logging.level = level.clone();
        }
        file
    }
}

impl Command {
    /// Whether the command talks to the server.
    pub fn needs_connection(&self) -> bool {
        !matches!(self, Command::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_subcommand_with_global_flags() {
        // Arrange / Act
        let cli = Cli::parse_from([
            "obsctl",
            "scenes",
            "rename",
            "Old",
            "New",
            "--url",
            "ws://studio:4455",
        ]);

        // Assert
        assert_eq!(cli.url.as_deref(), Some("ws://studio:4455"));
        assert!(matches!(
            cli.command,
            Command::Scenes {
                action: SceneAction::Rename { ref name, ref new_name }
            } if name == "Old" && new_name == "New"
        ));
    }

    #[test]
    fn test_auto_reconnect_flag_without_value_means_true() {
        let cli = Cli::parse_from(["obsctl", "--auto-reconnect", "clean"]);
        assert_eq!(cli.auto_reconnect, Some(true));

        let cli = Cli::parse_from(["obsctl", "--auto-reconnect=false", "clean"]);
        assert_eq!(cli.auto_reconnect, Some(false));
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        // Arrange
        let mut file = AppConfig::default();
        file.connection.url = "ws://from-file:4455".to_string();
        file.connection.retry_attempts = 9;
        let cli = Cli::parse_from([
            "obsctl",
            "--url",
            "ws://from-flag:4455",
            "--log-level",
            "debug",
            "stream",
            "status",
        ]);

        // Act
        let merged = cli.apply_overrides(file);

        // Assert
        assert_eq!(merged.connection.url, "ws://from-flag:4455");
        assert_eq!(merged.connection.retry_attempts, 9);
        assert_eq!(merged.logging.level, "debug");
    }

    #[test]
    fn test_config_commands_need_no_connection() {
        let cli = Cli::parse_from(["obsctl", "config", "show"]);
        assert!(!cli.command.needs_connection());

        let cli = Cli::parse_from(["obsctl", "virtualcam", "start"]);
        assert!(cli.command.needs_connection());
    }
}
