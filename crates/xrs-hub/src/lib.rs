//! XRS Radio Entity Hub
//!
//! This crate exposes the state and controls of an XRS two-way radio as typed
//! entities (binary sensors, sensors, text sensors, switches, numbers and
//! selects) for a home-automation front-end.
//!
//! # Architecture
//!
//! - [`RadioHub`] keeps one registry per entity category and routes radio
//!   events to entities and front-end commands to the radio
//! - [`TypedEntity`] is the single entity type; its category decides whether
//!   it is writable and what kind of value it carries
//! - [`XrsDevice`] translates AT notifications into dispatches and hub
//!   commands into AT commands
//! - [`RadioLink`] moves lines over the serial/SPP link and
//!   [`run_hub_actor`] owns the hub inside a single task
//! - [`BridgeConfig`] loads the YAML configuration and builds hubs
//!
//! # Example
//!
//! ```rust
//! use xrs_hub::{HubCommand, HubSettings, NullSink, RadioHub, SwitchKey, TypedEntity, XrsDevice};
//! use tokio::sync::mpsc;
//!
//! let (command_tx, _command_rx) = mpsc::channel::<HubCommand>(8);
//! let mut hub = RadioHub::new(HubSettings::new("AA:BB:CC:DD:EE:FF"), Box::new(command_tx));
//! hub.register(TypedEntity::new(SwitchKey::Scan, "Scan", Box::new(NullSink))).unwrap();
//! hub.freeze();
//!
//! let mut device = XrsDevice::new();
//! device.handle_line("+WGSCAN: 1", &mut hub);
//! assert_eq!(
//!     hub.entity(SwitchKey::Scan.into()).and_then(|e| e.state()),
//!     Some(&true.into())
//! );
//! ```

pub mod actor;
pub mod channels;
pub mod config;
pub mod device;
pub mod entity;
pub mod error;
pub mod hub;
pub mod keys;
pub mod link;
pub mod location;

pub use actor::{run_hub_actor, HubHandle, HubInput, AT_QUEUE_CAPACITY, COMMAND_QUEUE_CAPACITY, INPUT_QUEUE_CAPACITY};
pub use channels::ChannelTable;
pub use config::{BridgeConfig, EntityDescriptor, HubConfig, SinkFactory};
pub use device::XrsDevice;
pub use entity::{EntityDetail, EntitySink, NullSink, NumberTraits, SelectOptions, StateValue, TypedEntity};
pub use error::{ConfigError, HubError};
pub use hub::{HubCommand, HubSettings, HubStats, RadioHub, Transport};
pub use keys::{
    BinaryKey, Category, CategoryBehavior, NumberKey, SelectKey, SensorKey, SignalKey, SwitchKey,
    TextKey, ValueType,
};
pub use link::{run_serial_link, Backoff, LinkExit, RadioLink};
pub use location::{LocationFix, DEFAULT_LOCATION_INTERVAL, MAX_LOCATION_INTERVAL};
