//! Bridge configuration
//!
//! Loaded from YAML. One `xrs_radio` entry per radio, then one list per
//! entity platform:
//!
//! ```yaml
//! xrs_radio:
//!   - id: radio
//!     mac_address: "AA:BB:CC:DD:EE:FF"
//!     port: /dev/rfcomm0
//!     location_interval: 30s
//! binary_sensor:
//!   - type: connected
//!     name: Radio connected
//! number:
//!   - type: volume
//!     max_value: 20
//! ```
//!
//! `xrs_id` may be omitted on entities when exactly one radio is configured.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::entity::{EntitySink, NumberTraits, TypedEntity};
use crate::error::ConfigError;
use crate::hub::{HubSettings, RadioHub, Transport};
use crate::keys::{Category, SignalKey};
use crate::location::{DEFAULT_LOCATION_INTERVAL, MAX_LOCATION_INTERVAL};

fn default_hub_id() -> String {
    "xrs_radio".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_location_interval() -> Duration {
    DEFAULT_LOCATION_INTERVAL
}

fn default_max_value() -> f32 {
    31.0
}

fn default_step() -> f32 {
    1.0
}

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Configured radios
    #[serde(rename = "xrs_radio")]
    pub hubs: Vec<HubConfig>,
    #[serde(default)]
    pub binary_sensor: Vec<EntityConfig>,
    #[serde(default)]
    pub sensor: Vec<EntityConfig>,
    #[serde(default)]
    pub text_sensor: Vec<EntityConfig>,
    #[serde(default)]
    pub switch: Vec<EntityConfig>,
    #[serde(default)]
    pub number: Vec<NumberConfig>,
    #[serde(default)]
    pub select: Vec<EntityConfig>,
}

/// One radio
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    #[serde(default = "default_hub_id")]
    pub id: String,
    /// Bluetooth address, `AA:BB:CC:DD:EE:FF`
    pub mac_address: String,
    /// Serial device the SPP link is bound to
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Id of the latitude sensor to publish location to
    #[serde(default)]
    pub latitude_sensor: Option<String>,
    /// Id of the longitude sensor to publish location to
    #[serde(default)]
    pub longitude_sensor: Option<String>,
    #[serde(
        default = "default_location_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub location_interval: Duration,
}

/// Binary sensor, sensor, text sensor, switch or select entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Key name within the platform, case-insensitive
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Radio this entity belongs to
    #[serde(default)]
    pub xrs_id: Option<String>,
}

/// Number entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumberConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub xrs_id: Option<String>,
    #[serde(default)]
    pub min_value: f32,
    #[serde(default = "default_max_value")]
    pub max_value: f32,
    #[serde(default = "default_step")]
    pub step: f32,
}

/// A resolved entity entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Owning radio
    pub hub_id: String,
    pub key: SignalKey,
    /// Display name
    pub name: String,
    /// Bounds for number entities
    pub bounds: Option<NumberTraits>,
}

/// Creates the front-end sinks entities publish into
pub trait SinkFactory {
    /// Sink for a configured entity
    fn entity_sink(&mut self, descriptor: &EntityDescriptor) -> Box<dyn EntitySink>;

    /// Sink for an external location sensor
    fn location_sink(&mut self, hub_id: &str, sensor_id: &str) -> Box<dyn EntitySink>;
}

/// Accepts `500ms`, `30s`, `5min`, `2h`, or a bare number of seconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(s) => Ok(Duration::from_secs(s)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse a duration with an `ms`, `s`, `min` or `h` suffix
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration {:?}", text))?;

    let scale: u64 = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "min" => 60,
        "h" => 3600,
        other => return Err(format!("unknown duration unit {:?} in {:?}", other, text)),
    };
    value
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration {:?} is too large", text))
}

fn is_mac_address(text: &str) -> bool {
    let parts: Vec<&str> = text.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

impl BridgeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn hub(&self, hub_id: &str) -> Option<&HubConfig> {
        self.hubs.iter().find(|h| h.id == hub_id)
    }

    /// Check hub settings and resolve every entity
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hubs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one xrs_radio is required".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for hub in &self.hubs {
            if !ids.insert(hub.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate xrs_radio id {:?}", hub.id)));
            }
            if !is_mac_address(&hub.mac_address) {
                return Err(ConfigError::Invalid(format!(
                    "{}: mac_address {:?} is not AA:BB:CC:DD:EE:FF",
                    hub.id, hub.mac_address
                )));
            }
            if hub.latitude_sensor.is_some() != hub.longitude_sensor.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "{}: latitude_sensor and longitude_sensor must be set together",
                    hub.id
                )));
            }
            if hub.location_interval.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{}: location_interval must be positive",
                    hub.id
                )));
            }
            if hub.location_interval > MAX_LOCATION_INTERVAL {
                return Err(ConfigError::Invalid(format!(
                    "{}: location_interval must be at most {:?}",
                    hub.id, MAX_LOCATION_INTERVAL
                )));
            }
        }

        self.descriptors().map(|_| ())
    }

    fn resolve_hub(&self, xrs_id: Option<&str>) -> Result<String, ConfigError> {
        match xrs_id {
            Some(id) => self
                .hub(id)
                .map(|h| h.id.clone())
                .ok_or_else(|| ConfigError::UnknownHub(id.to_string())),
            None if self.hubs.len() == 1 => Ok(self.hubs[0].id.clone()),
            None => Err(ConfigError::Invalid(
                "xrs_id is required when more than one xrs_radio is configured".to_string(),
            )),
        }
    }

    fn describe(
        &self,
        category: Category,
        kind: &str,
        name: Option<&str>,
        xrs_id: Option<&str>,
    ) -> Result<EntityDescriptor, ConfigError> {
        let key = category.key(kind).map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown {} type {:?}, expected one of: {}",
                category,
                kind,
                category.key_names().join(", ")
            ))
        })?;
        let hub_id = self.resolve_hub(xrs_id)?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", hub_id, key.name()));
        Ok(EntityDescriptor {
            hub_id,
            key,
            name,
            bounds: None,
        })
    }

    /// Every configured entity, resolved to its hub and key
    ///
    /// A second entry for the same (platform, type) on one radio is an error.
    pub fn descriptors(&self) -> Result<Vec<EntityDescriptor>, ConfigError> {
        let mut out: Vec<EntityDescriptor> = Vec::new();

        let plain = [
            (Category::Binary, &self.binary_sensor),
            (Category::Sensor, &self.sensor),
            (Category::Text, &self.text_sensor),
            (Category::Switch, &self.switch),
            (Category::Select, &self.select),
        ];
        for (category, entries) in plain {
            for entry in entries {
                out.push(self.describe(
                    category,
                    &entry.kind,
                    entry.name.as_deref(),
                    entry.xrs_id.as_deref(),
                )?);
            }
        }

        for entry in &self.number {
            let mut descriptor = self.describe(
                Category::Number,
                &entry.kind,
                entry.name.as_deref(),
                entry.xrs_id.as_deref(),
            )?;
            let bounds = NumberTraits::new(entry.min_value, entry.max_value, entry.step)
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", descriptor.name, e)))?;
            descriptor.bounds = Some(bounds);
            out.push(descriptor);
        }

        let mut seen = HashSet::new();
        for descriptor in &out {
            if !seen.insert((descriptor.hub_id.as_str(), descriptor.key)) {
                return Err(ConfigError::DuplicateEntity {
                    hub: descriptor.hub_id.clone(),
                    key: descriptor.key,
                });
            }
        }

        Ok(out)
    }

    /// Construct, populate and freeze the hub for `hub_id`
    pub fn build_hub(
        &self,
        hub_id: &str,
        transport: Box<dyn Transport>,
        sinks: &mut dyn SinkFactory,
    ) -> Result<RadioHub, ConfigError> {
        let config = self
            .hub(hub_id)
            .ok_or_else(|| ConfigError::UnknownHub(hub_id.to_string()))?;

        let settings = HubSettings {
            mac_address: config.mac_address.clone(),
            location_interval: config.location_interval,
        };
        let mut hub = RadioHub::new(settings, transport);

        for descriptor in self.descriptors()?.into_iter().filter(|d| d.hub_id == hub_id) {
            let sink = sinks.entity_sink(&descriptor);
            let mut entity = TypedEntity::new(descriptor.key, descriptor.name.clone(), sink);
            if let Some(bounds) = descriptor.bounds {
                entity = entity.with_bounds(bounds)?;
            }
            hub.register(entity)?;
        }

        if let (Some(lat), Some(lon)) = (&config.latitude_sensor, &config.longitude_sensor) {
            hub.set_location_sensors(
                sinks.location_sink(hub_id, lat),
                sinks.location_sink(hub_id, lon),
            );
        }

        hub.freeze();
        info!("Built hub {} ({})", hub_id, config.mac_address);
        Ok(hub)
    }
}
