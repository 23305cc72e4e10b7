//! Bridge configuration.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. a TOML file (explicit path, or [`default_config_path`] if it exists)
//! 3. environment variables `EVOLV_BRIDGE__<SECTION>__<KEY>`,
//!    e.g. `EVOLV_BRIDGE__SERVER__PORT=8080`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::protocol::ChannelDialect;
use crate::state::AdapterState;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "EVOLV_BRIDGE";

/// Weakest and strongest RSSI accepted for a simulated peripheral.
pub const RSSI_RANGE: std::ops::RangeInclusive<i32> = -127..=20;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),

    /// A source could not be read, parsed or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A single field failed validation.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("Configuration has {} invalid fields", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Which central-manager implementation the server drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process [`crate::simulated::SimulatedRadio`].
    #[default]
    Simulated,
    /// BlueZ via D-Bus. Requires the `bluetooth` cargo feature.
    Bluez,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => f.write_str("simulated"),
            Self::Bluez => f.write_str("bluez"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Bluetooth backend and channel encoding.
    pub bluetooth: BluetoothConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4028,
        }
    }
}

/// Bluetooth settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Central-manager implementation.
    pub backend: Backend,
    /// Reply encoding expected by the application shell.
    pub dialect: ChannelDialect,
    /// Settings for the simulated backend.
    pub simulated: SimulatedConfig,
}

/// Simulated radio settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// State the radio reports once the handle is created.
    pub initial_state: AdapterState,
    /// How often each peripheral advertises, in milliseconds.
    pub advertise_interval_ms: u64,
    /// Peripherals in range of the simulated radio.
    pub peripherals: Vec<SimulatedPeripheral>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            initial_state: AdapterState::PoweredOn,
            advertise_interval_ms: 1000,
            peripherals: vec![SimulatedPeripheral {
                name: "Evolv28-SIM".to_string(),
                rssi: -55,
            }],
        }
    }
}

/// A simulated advertising peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPeripheral {
    /// Advertised name.
    pub name: String,
    /// Advertised signal strength in dBm.
    pub rssi: i32,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a file, and the environment.
    ///
    /// With `path = None` the [`default_config_path`] is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` does not exist, a source cannot
    /// be parsed, or the merged result fails [`Config::validate`].
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_layered(path, environment())
    }

    fn load_layered(
        path: Option<&Path>,
        environment: ::config::Environment,
    ) -> ConfigResult<Self> {
        let file = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => ::config::File::from(path),
            None => ::config::File::from(default_config_path()).required(false),
        };

        let config: Self = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a single problem or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: &str| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.server.host.trim().is_empty() {
            invalid("server.host", "must not be empty");
        }
        if self.server.port == 0 {
            invalid("server.port", "must be between 1 and 65535");
        }
        if self.logging.level.trim().is_empty() {
            invalid("logging.level", "must not be empty");
        }

        let simulated = &self.bluetooth.simulated;
        if simulated.advertise_interval_ms == 0 {
            invalid("bluetooth.simulated.advertise_interval_ms", "must be greater than 0");
        }
        for (index, peripheral) in simulated.peripherals.iter().enumerate() {
            if peripheral.name.is_empty() {
                invalid(
                    &format!("bluetooth.simulated.peripherals[{index}].name"),
                    "must not be empty",
                );
            }
            if !RSSI_RANGE.contains(&peripheral.rssi) {
                invalid(
                    &format!("bluetooth.simulated.peripherals[{index}].rssi"),
                    "must be between -127 and 20 dBm",
                );
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// The `host:port` string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `EVOLV_BRIDGE__SECTION__KEY` variables, e.g. `EVOLV_BRIDGE__SERVER__PORT`.
fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Where configuration is read from when no path is given.
///
/// On Linux: `/etc/evolv-bridge/config.toml`.
/// Elsewhere: the platform config directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/evolv-bridge/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "evolv-bridge").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 4028);
        assert_eq!(config.bluetooth.backend, Backend::Simulated);
        assert_eq!(config.bluetooth.dialect, ChannelDialect::Ios);
        assert_eq!(config.bluetooth.simulated.initial_state, AdapterState::PoweredOn);
        assert_eq!(config.bind_address(), "127.0.0.1:4028");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[server]
port = 9000

[bluetooth]
dialect = "macos"

[bluetooth.simulated]
initial_state = "unauthorized"
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.bluetooth.dialect, ChannelDialect::Macos);
        assert_eq!(config.bluetooth.simulated.initial_state, AdapterState::Unauthorized);
        assert_eq!(config.bluetooth.simulated.advertise_interval_ms, 1000);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_peripherals() {
        let file = write_config(
            r#"
[[bluetooth.simulated.peripherals]]
name = "Evolv28-A1"
rssi = -48

[[bluetooth.simulated.peripherals]]
name = "Speaker"
rssi = -80
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        let names: Vec<_> = config
            .bluetooth
            .simulated
            .peripherals
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["Evolv28-A1", "Speaker"]);
    }

    fn environment_with(vars: &[(&str, &str)]) -> ::config::Environment {
        let source: ::config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        environment().source(Some(source))
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let file = write_config(
            r#"
[server]
port = 9000

[bluetooth.simulated]
initial_state = "unauthorized"
advertise_interval_ms = 250
"#,
        );
        let env = environment_with(&[
            ("EVOLV_BRIDGE__SERVER__PORT", "8080"),
            ("EVOLV_BRIDGE__BLUETOOTH__SIMULATED__INITIAL_STATE", "powered_off"),
            ("EVOLV_BRIDGE__LOGGING__PRODUCTION", "true"),
        ]);

        let config = Config::load_layered(Some(file.path()), env).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bluetooth.simulated.initial_state, AdapterState::PoweredOff);
        assert_eq!(config.bluetooth.simulated.advertise_interval_ms, 250);
        assert!(config.logging.production);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_path_variable_is_not_a_key() {
        let file = write_config("");
        let env = environment_with(&[
            ("EVOLV_BRIDGE_CONFIG", "/etc/evolv-bridge/other.toml"),
            ("EVOLV_BRIDGE_LOG_LEVEL", "debug"),
        ]);

        let config = Config::load_layered(Some(file.path()), env).unwrap();
        assert_eq!(config.server.port, 4028);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_environment_value_fails_validation() {
        let file = write_config("");
        let env = environment_with(&[("EVOLV_BRIDGE__SERVER__PORT", "0")]);

        match Config::load_layered(Some(file.path()), env).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "server.port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_unparseable_value_is_a_load_error() {
        let file = write_config(
            r#"
[bluetooth]
backend = "carrier-pigeon"
"#,
        );
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_single_validation_error() {
        let mut config = Config::default();
        config.server.port = 0;
        match config.validate().unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "server.port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_validation_errors_are_collected() {
        let mut config = Config::default();
        config.server.host = " ".to_string();
        config.bluetooth.simulated.advertise_interval_ms = 0;
        config.bluetooth.simulated.peripherals.push(SimulatedPeripheral {
            name: String::new(),
            rssi: 50,
        });

        match config.validate().unwrap_err() {
            ConfigError::MultipleValidationErrors(errors) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }
}
