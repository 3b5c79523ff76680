//! Configuration settings for the remotepad daemon.
//!
//! Settings come either from a TOML file (`--config`) or from the positional
//! command line form `<descriptor-path> <port> [controls...]`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DaemonError, DaemonResult};
use crate::registry::{Control, ControlKind, ControlRegistry};

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub descriptor: DescriptorConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    pub controls: Vec<ControlConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Descriptor file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorConfig {
    /// Path to the Avahi service file the daemon owns.
    pub path: PathBuf,
}

/// TCP socket configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocketConfig {
    /// Port to listen on; 0 picks an ephemeral port.
    #[serde(default)]
    pub port: u16,
}

/// One exposed control.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    pub kind: ControlKind,
    /// Initial value; the kind's default when omitted.
    pub value: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DaemonResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DaemonError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| DaemonError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from the positional command line form:
    /// `<descriptor-path> <port> [controls...]` where each control is one of
    /// `-b/--button`, `-p/--colorpicker`, `-t/--textfield`, `-c/--checkbox`.
    pub fn from_args(args: &[String]) -> DaemonResult<Self> {
        if args.len() < 2 {
            return Err(DaemonError::Config {
                message: "Expected <descriptor-path> and <port> arguments".to_string(),
            });
        }

        let path = PathBuf::from(&args[0]);

        let port: u16 = args[1].parse().map_err(|_| DaemonError::Config {
            message: format!("Given port '{}' is not a valid port number", args[1]),
        })?;

        let mut controls = Vec::new();
        for flag in &args[2..] {
            let kind = match flag.as_str() {
                "-b" | "--button" => ControlKind::Toggle,
                "-p" | "--colorpicker" => ControlKind::ColorPicker,
                "-t" | "--textfield" => ControlKind::TextField,
                "-c" | "--checkbox" => ControlKind::Checkbox,
                other => {
                    return Err(DaemonError::Config {
                        message: format!("Unknown control flag '{other}'"),
                    })
                }
            };
            controls.push(ControlConfig { kind, value: None });
        }

        let settings = Settings {
            descriptor: DescriptorConfig { path },
            socket: SocketConfig { port },
            controls,
            logging: LoggingConfig::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Build the control registry from the configured controls.
    pub fn registry(&self) -> ControlRegistry {
        ControlRegistry::new(
            self.controls
                .iter()
                .map(|c| match &c.value {
                    Some(value) => Control::new(c.kind, value.clone()),
                    None => Control::with_default(c.kind),
                })
                .collect(),
        )
    }

    fn validate(&self) -> DaemonResult<()> {
        let path = &self.descriptor.path;
        if path.extension().and_then(|e| e.to_str()) != Some("service") {
            return Err(DaemonError::Config {
                message: format!(
                    "Descriptor path {} is not an Avahi .service file",
                    path.display()
                ),
            });
        }

        if self.controls.is_empty() {
            return Err(DaemonError::Config {
                message: "Configure at least one control".to_string(),
            });
        }

        for (i, control) in self.controls.iter().enumerate() {
            if self.controls[..i].iter().any(|c| c.kind == control.kind) {
                return Err(DaemonError::Config {
                    message: format!("Control kind '{}' configured more than once", control.kind),
                });
            }
        }

        Ok(())
    }
}
