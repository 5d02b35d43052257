//! The per-device entity hub
//!
//! A [`RadioHub`] owns every entity registered for one radio, routes decoded
//! radio events to them, and forwards front-end commands to the radio link.
//!
//! # Lifecycle
//!
//! 1. Construct with the device address and a [`Transport`]
//! 2. [`RadioHub::register`] every configured entity
//! 3. [`RadioHub::freeze`]
//!
//! Dispatch before freezing is dropped; registration after freezing fails.
//! The hub is owned by a single task (see [`crate::actor`]), so nothing in
//! here locks.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::entity::{EntitySink, StateValue, TypedEntity};
use crate::error::HubError;
use crate::keys::{
    BinaryKey, NumberKey, SelectKey, SensorKey, SignalKey, SwitchKey, TextKey,
};
use crate::location::{LocationFix, LocationSchedule, DEFAULT_LOCATION_INTERVAL};

/// A validated command on its way to the radio
#[derive(Debug, Clone, PartialEq)]
pub struct HubCommand {
    /// Target entity
    pub key: SignalKey,
    /// Value after validation and clamping
    pub value: StateValue,
}

/// Outbound half of the radio link
pub trait Transport: Send {
    /// Hand a command to the link; never blocks
    fn send(&mut self, command: HubCommand);
}

/// Bounded queue to the hub actor; a full queue drops the command
impl Transport for mpsc::Sender<HubCommand> {
    fn send(&mut self, command: HubCommand) {
        match self.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                warn!("Command queue full, dropping {}", cmd.key);
            }
            Err(mpsc::error::TrySendError::Closed(cmd)) => {
                debug!("Command queue closed, dropping {}", cmd.key);
            }
        }
    }
}

/// Observability counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Values accepted by an entity
    pub dispatched: u64,
    /// Events for keys with no registered entity, or before freeze
    pub unroutable: u64,
    /// Values of the wrong type or naming an unknown option
    pub rejected: u64,
    /// Commands handed to the transport
    pub commands_sent: u64,
    /// Commands dropped because the link was down
    pub commands_dropped: u64,
    /// Commands pulled into number bounds
    pub commands_clamped: u64,
    /// Latitude/longitude publications
    pub location_reports: u64,
}

/// Hub construction parameters
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Bluetooth address of the radio, `AA:BB:CC:DD:EE:FF`
    pub mac_address: String,
    /// Location publication interval
    pub location_interval: Duration,
}

impl HubSettings {
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            location_interval: DEFAULT_LOCATION_INTERVAL,
        }
    }
}

/// Key-to-entity map for one category
struct Registry<K> {
    entries: HashMap<K, TypedEntity>,
}

impl<K: Eq + Hash> Registry<K> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, key: K, entity: TypedEntity) -> Result<(), HubError> {
        if self.entries.contains_key(&key) {
            return Err(HubError::DuplicateRegistration(entity.key()));
        }
        self.entries.insert(key, entity);
        Ok(())
    }

    fn get(&self, key: &K) -> Option<&TypedEntity> {
        self.entries.get(key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut TypedEntity> {
        self.entries.get_mut(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct LocationSensors {
    latitude: Box<dyn EntitySink>,
    longitude: Box<dyn EntitySink>,
}

/// Entity hub for one radio
pub struct RadioHub {
    mac_address: String,
    frozen: bool,
    connected: bool,
    binary: Registry<BinaryKey>,
    sensor: Registry<SensorKey>,
    text: Registry<TextKey>,
    switch: Registry<SwitchKey>,
    number: Registry<NumberKey>,
    select: Registry<SelectKey>,
    location_sensors: Option<LocationSensors>,
    schedule: LocationSchedule,
    fix: Option<LocationFix>,
    transport: Box<dyn Transport>,
    stats: HubStats,
}

impl fmt::Debug for RadioHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioHub")
            .field("mac_address", &self.mac_address)
            .field("frozen", &self.frozen)
            .field("connected", &self.connected)
            .field("entities", &self.entity_count())
            .field("location_interval", &self.schedule.interval())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RadioHub {
    pub fn new(settings: HubSettings, transport: Box<dyn Transport>) -> Self {
        Self {
            mac_address: settings.mac_address,
            frozen: false,
            connected: false,
            binary: Registry::new(),
            sensor: Registry::new(),
            text: Registry::new(),
            switch: Registry::new(),
            number: Registry::new(),
            select: Registry::new(),
            location_sensors: None,
            schedule: LocationSchedule::new(settings.location_interval, Instant::now()),
            fix: None,
            transport,
            stats: HubStats::default(),
        }
    }

    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> HubStats {
        self.stats
    }

    pub fn location_interval(&self) -> Duration {
        self.schedule.interval()
    }

    /// Last cached position fix
    pub fn location_fix(&self) -> Option<LocationFix> {
        self.fix
    }

    /// Number of registered entities across all categories
    pub fn entity_count(&self) -> usize {
        self.binary.len()
            + self.sensor.len()
            + self.text.len()
            + self.switch.len()
            + self.number.len()
            + self.select.len()
    }

    /// Add an entity under its (category, key)
    pub fn register(&mut self, entity: TypedEntity) -> Result<(), HubError> {
        if self.frozen {
            return Err(HubError::RegistryFrozen(entity.key()));
        }
        let key = entity.key();
        match key {
            SignalKey::Binary(k) => self.binary.insert(k, entity)?,
            SignalKey::Sensor(k) => self.sensor.insert(k, entity)?,
            SignalKey::Text(k) => self.text.insert(k, entity)?,
            SignalKey::Switch(k) => self.switch.insert(k, entity)?,
            SignalKey::Number(k) => self.number.insert(k, entity)?,
            SignalKey::Select(k) => self.select.insert(k, entity)?,
        }
        debug!("Registered {} for {}", key, self.mac_address);
        Ok(())
    }

    /// End the registration phase
    pub fn freeze(&mut self) {
        if !self.frozen {
            info!(
                "Hub {} ready with {} entities",
                self.mac_address,
                self.entity_count()
            );
        }
        self.frozen = true;
    }

    pub fn entity(&self, key: SignalKey) -> Option<&TypedEntity> {
        match key {
            SignalKey::Binary(k) => self.binary.get(&k),
            SignalKey::Sensor(k) => self.sensor.get(&k),
            SignalKey::Text(k) => self.text.get(&k),
            SignalKey::Switch(k) => self.switch.get(&k),
            SignalKey::Number(k) => self.number.get(&k),
            SignalKey::Select(k) => self.select.get(&k),
        }
    }

    fn entity_mut(&mut self, key: SignalKey) -> Option<&mut TypedEntity> {
        match key {
            SignalKey::Binary(k) => self.binary.get_mut(&k),
            SignalKey::Sensor(k) => self.sensor.get_mut(&k),
            SignalKey::Text(k) => self.text.get_mut(&k),
            SignalKey::Switch(k) => self.switch.get_mut(&k),
            SignalKey::Number(k) => self.number.get_mut(&k),
            SignalKey::Select(k) => self.select.get_mut(&k),
        }
    }

    /// Route a decoded radio event to its entity
    ///
    /// Unregistered keys are dropped silently. Bad values are logged and
    /// counted; nothing is returned to the caller.
    pub fn dispatch(&mut self, key: impl Into<SignalKey>, value: impl Into<StateValue>) {
        let key = key.into();
        if !self.frozen {
            warn!("Dispatch of {} before hub is frozen, dropping", key);
            self.stats.unroutable += 1;
            return;
        }

        let Some(entity) = self.entity_mut(key) else {
            self.stats.unroutable += 1;
            return;
        };

        match entity.publish(value.into()) {
            Ok(()) => self.stats.dispatched += 1,
            Err(e) => {
                warn!("Rejected value: {}", e);
                self.stats.rejected += 1;
            }
        }
    }

    /// Forward a command to the link without any entity lookup
    ///
    /// Dropped when the link is down.
    pub fn send_command(&mut self, key: impl Into<SignalKey>, value: impl Into<StateValue>) {
        let key = key.into();
        if !self.connected {
            debug!("Link down, dropping command for {}", key);
            self.stats.commands_dropped += 1;
            return;
        }
        self.transport.send(HubCommand {
            key,
            value: value.into(),
        });
        self.stats.commands_sent += 1;
    }

    /// Front-end entry point: validate against the entity, then send
    pub fn command(&mut self, key: SignalKey, value: StateValue) -> Result<(), HubError> {
        let entity = self.entity(key).ok_or(HubError::UnknownEntity(key))?;
        let prepared = entity.prepare_command(value)?;
        if prepared.clamped {
            debug!("Clamped command for {} to {}", key, prepared.value);
            self.stats.commands_clamped += 1;
        }
        self.send_command(key, prepared.value);
        Ok(())
    }

    /// Replace the option set and selection of a select entity, if registered
    pub fn refresh_select_options(
        &mut self,
        key: SelectKey,
        options: Vec<String>,
        selected: Option<String>,
    ) {
        if let Some(entity) = self.select.get_mut(&key) {
            if let Err(e) = entity.refresh_options(options, selected) {
                warn!("Option refresh failed: {}", e);
            }
        }
    }

    /// Record link state and publish `binary_sensor.connected`
    pub fn notify_connection_state(&mut self, connected: bool) {
        if connected != self.connected {
            info!(
                "Radio {} {}",
                self.mac_address,
                if connected { "connected" } else { "disconnected" }
            );
        }
        self.connected = connected;
        self.dispatch(BinaryKey::Connected, connected);
    }

    /// Attach the externally owned latitude/longitude sensors
    pub fn set_location_sensors(
        &mut self,
        latitude: Box<dyn EntitySink>,
        longitude: Box<dyn EntitySink>,
    ) {
        self.location_sensors = Some(LocationSensors {
            latitude,
            longitude,
        });
    }

    /// Change the publication interval; restarts the window schedule
    pub fn set_location_interval(&mut self, interval: Duration) {
        self.set_location_interval_at(interval, Instant::now());
    }

    /// [`RadioHub::set_location_interval`] with an explicit clock reading
    pub fn set_location_interval_at(&mut self, interval: Duration, now: Instant) {
        self.schedule.reset(interval, now);
    }

    /// Cache a position fix; NaN coordinates are ignored
    pub fn update_location_fix(&mut self, latitude: f64, longitude: f64) {
        match LocationFix::new(latitude, longitude) {
            Some(fix) => self.fix = Some(fix),
            None => warn!("Ignoring location fix with NaN coordinates"),
        }
    }

    /// Timer callback
    ///
    /// Returns the cached fix once per elapsed window. When both location
    /// sensors are attached, latitude and longitude are published then.
    ///
    /// Sensor values are `f32`, about 7 significant digits (roughly 1e-5
    /// degrees at 100+ degrees of longitude). The returned fix keeps full
    /// `f64` precision for the upload to the radio.
    pub fn poll_location(&mut self, now: Instant) -> Option<LocationFix> {
        if !self.schedule.poll(now) {
            return None;
        }
        let fix = self.fix?;
        if let Some(sensors) = self.location_sensors.as_mut() {
            sensors
                .latitude
                .publish_state(&StateValue::Float(fix.latitude as f32));
            sensors
                .longitude
                .publish_state(&StateValue::Float(fix.longitude as f32));
            self.stats.location_reports += 1;
        }
        Some(fix)
    }
}
