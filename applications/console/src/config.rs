/// Console configuration
use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use twindeck_core::{Deck, LaneRole};
use twindeck_playback::DeckPreferences;

/// Default configuration file, read from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "twindeck.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub mixer: MixerSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub playback: DeckPreferences,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MixerSettings {
    /// Mixer executable
    #[serde(default = "default_mixer_command")]
    pub command: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    /// Prefix of informational reply lines
    #[serde(default = "default_reply_prefix")]
    pub reply_prefix: String,

    /// Mixer subsystem every request is addressed to
    #[serde(default = "default_target")]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_session_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_left_file")]
    pub left: String,

    #[serde(default = "default_right_file")]
    pub right: String,

    #[serde(default = "default_interlude_file")]
    pub interlude: String,

    /// Write the lanes back when the console shuts down
    #[serde(default = "default_save_on_exit")]
    pub save_on_exit: bool,
}

impl SessionSettings {
    /// Session file of one lane
    pub fn path(&self, role: LaneRole) -> PathBuf {
        let name = match role {
            LaneRole::Primary(Deck::Left) => &self.left,
            LaneRole::Primary(Deck::Right) => &self.right,
            LaneRole::Interlude => &self.interlude,
        };
        self.directory.join(name)
    }
}

impl ConsoleConfig {
    /// Load configuration from file and environment
    ///
    /// `path` overrides [`DEFAULT_CONFIG_FILE`]; a missing default file is
    /// fine, a missing explicit file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConsoleError::Config(format!(
                        "configuration file {} not found",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. TWINDECK_PLAYBACK__DJ_ALARM=true
        settings = settings.add_source(
            config::Environment::with_prefix("TWINDECK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ConsoleError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.mixer.command.as_os_str().is_empty() {
            return Err(ConsoleError::Config(
                "mixer command is required (set TWINDECK_MIXER__COMMAND)".to_string(),
            ));
        }

        if self.mixer.target.is_empty() {
            return Err(ConsoleError::Config("mixer target is empty".to_string()));
        }

        let tick = self.playback.tick_interval_ms;
        if !(10..=1000).contains(&tick) {
            return Err(ConsoleError::Config(format!(
                "tick interval must be between 10 and 1000 ms, got {tick}"
            )));
        }

        let files = [
            &self.session.left,
            &self.session.right,
            &self.session.interlude,
        ];
        if files.iter().any(|name| name.is_empty()) {
            return Err(ConsoleError::Config(
                "session file names must not be empty".to_string(),
            ));
        }
        if files[0] == files[1] || files[0] == files[2] || files[1] == files[2] {
            return Err(ConsoleError::Config(
                "each lane needs its own session file".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            command: default_mixer_command(),
            args: Vec::new(),
            reply_prefix: default_reply_prefix(),
            target: default_target(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            directory: default_session_directory(),
            left: default_left_file(),
            right: default_right_file(),
            interlude: default_interlude_file(),
            save_on_exit: default_save_on_exit(),
        }
    }
}

// Default values
fn default_mixer_command() -> PathBuf {
    PathBuf::from("idjcmixer")
}

fn default_reply_prefix() -> String {
    "idjcmixer".to_string()
}

fn default_target() -> String {
    "mx".to_string()
}

fn default_session_directory() -> PathBuf {
    PathBuf::from("./session")
}

fn default_left_file() -> String {
    "left_session".to_string()
}

fn default_right_file() -> String {
    "right_session".to_string()
}

fn default_interlude_file() -> String {
    "interlude_session".to_string()
}

fn default_save_on_exit() -> bool {
    true
}
