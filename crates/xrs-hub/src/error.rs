//! Error types for the hub and its configuration

use thiserror::Error;

use crate::keys::{Category, SignalKey};

/// Errors raised by hub operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    /// Another entity already occupies this (category, key)
    #[error("duplicate registration for {0}")]
    DuplicateRegistration(SignalKey),

    /// Registration attempted after the hub was frozen
    #[error("registry is frozen, cannot register {0}")]
    RegistryFrozen(SignalKey),

    /// Key name not known within its category
    #[error("unknown {category} type: {name:?}")]
    UnknownSignal {
        /// Category the name was looked up in
        category: Category,
        /// Name as supplied
        name: String,
    },

    /// Not of the form `platform.name`
    #[error("invalid entity key: {0:?}")]
    InvalidKey(String),

    /// No entity registered under this key
    #[error("no entity registered for {0}")]
    UnknownEntity(SignalKey),

    /// Command sent to a read-only category
    #[error("{0} is read-only")]
    NotWritable(SignalKey),

    /// Value has the wrong type or is not a number
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Target entity
        key: SignalKey,
        /// What was wrong
        reason: String,
    },

    /// Selection is not a member of the current option set
    #[error("{value:?} is not an option of {key}")]
    StaleSelection {
        /// Target select entity
        key: SignalKey,
        /// Rejected option
        value: String,
    },

    /// The hub actor has stopped
    #[error("hub actor is not running")]
    ActorStopped,

    /// Number bounds fail `step > 0` and `min <= max`
    #[error("invalid number bounds: min={min}, max={max}, step={step}")]
    InvalidBounds {
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
        /// Step size
        step: f32,
    },
}

/// Errors raised while loading or applying configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or shape error
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Semantic validation failed
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// No hub with this id
    #[error("unknown hub id: {0:?}")]
    UnknownHub(String),

    /// Two entries for the same (platform, type) on one radio
    #[error("{hub}: {key} is configured more than once")]
    DuplicateEntity {
        /// Owning radio
        hub: String,
        key: SignalKey,
    },

    /// Registration failed while building a hub
    #[error(transparent)]
    Hub(#[from] HubError),
}
