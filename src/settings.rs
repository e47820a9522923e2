use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct HueSettings {
    pub addr: String,
    pub username: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct MqttSettings {
    /// Instance name, used as MQTT client id and as topic prefix
    pub name: String,
    pub url: String,
    pub retain_status: bool,
    pub keep_alive_seconds: u64,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub hue_bridge: HueSettings,
    pub mqtt: MqttSettings,
    pub polling_interval_ms: u64,
    pub log_level: String,
}

impl Settings {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Every bridge request must finish within half of the polling interval.
    pub fn request_timeout(&self) -> Duration {
        self.polling_interval() / 2
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.polling_interval_ms == 0 {
            return Err(ConfigError::Message(
                "polling_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.mqtt.name.is_empty() || self.mqtt.name.contains(['+', '#', '/']) {
            return Err(ConfigError::Message(format!(
                "mqtt.name {:?} is not usable as a topic prefix",
                self.mqtt.name
            )));
        }

        if self.hue_bridge.addr.is_empty() || self.hue_bridge.username.is_empty() {
            return Err(ConfigError::Message(
                "hue_bridge.addr and hue_bridge.username are required".to_string(),
            ));
        }

        Ok(self)
    }
}

fn settings_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("mqtt.name", "hue")?
        .set_default("mqtt.url", "mqtt://127.0.0.1")?
        .set_default("mqtt.retain_status", false)?
        .set_default("mqtt.keep_alive_seconds", 30_i64)?
        .set_default("polling_interval_ms", 3000_i64)?
        .set_default("log_level", "info")
}

/// Single-level variable names kept working next to the nested
/// `SIMPLEHUE2MQTT_HUE_BRIDGE__ADDR` style, mapped onto settings keys.
const FLAT_ENV_NAMES: [(&str, &str); 6] = [
    ("SIMPLEHUE2MQTT_BRIDGE_ADDRESS", "hue_bridge.addr"),
    ("SIMPLEHUE2MQTT_BRIDGE_USERNAME", "hue_bridge.username"),
    ("SIMPLEHUE2MQTT_MQTT_URL", "mqtt.url"),
    ("SIMPLEHUE2MQTT_NAME", "mqtt.name"),
    ("SIMPLEHUE2MQTT_POLLING_INTERVAL", "polling_interval_ms"),
    ("SIMPLEHUE2MQTT_VERBOSITY", "log_level"),
];

fn with_flat_env_names<F>(
    builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    FLAT_ENV_NAMES
        .iter()
        .try_fold(builder, |builder, &(var, key)| {
            builder.set_override_option(key, lookup(var))
        })
}

pub fn read_settings() -> Result<Settings, ConfigError> {
    let builder = settings_builder()?
        .add_source(File::with_name("Settings").required(false))
        .add_source(
            Environment::with_prefix("SIMPLEHUE2MQTT")
                .prefix_separator("_")
                .separator("__"),
        );

    with_flat_env_names(builder, |var| std::env::var(var).ok())?
        .build()?
        .try_deserialize::<Settings>()?
        .validate()
}
