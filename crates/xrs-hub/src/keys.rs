//! Logical signal keys
//!
//! Every piece of radio state or control that can be exposed as an entity is
//! identified by a key within one of six categories. Key spaces are
//! independent per category: `switch.scan` and `binary_sensor.scanning` are
//! different signals even though they track the same radio flag.
//!
//! The configuration name of each key is fixed here at build time; lookups by
//! name are case-insensitive.

use std::fmt;
use std::str::FromStr;

use crate::error::HubError;

/// Value type carried by a category's entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// On/off state
    Bool,
    /// Numeric reading or control value
    Float,
    /// Free text or an option label
    Text,
}

/// Per-category behavior record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryBehavior {
    /// Whether entities of this category accept commands
    pub writable: bool,
    /// Type of the published value
    pub value_type: ValueType,
}

/// Entity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Read-only on/off state
    Binary,
    /// Read-only numeric reading
    Sensor,
    /// Read-only text reading
    Text,
    /// Writable on/off control
    Switch,
    /// Writable numeric control with bounds
    Number,
    /// Writable choice from a dynamic option set
    Select,
}

impl Category {
    /// All categories, in registry order
    pub const ALL: [Category; 6] = [
        Category::Binary,
        Category::Sensor,
        Category::Text,
        Category::Switch,
        Category::Number,
        Category::Select,
    ];

    /// Configuration platform name
    pub fn platform(&self) -> &'static str {
        match self {
            Category::Binary => "binary_sensor",
            Category::Sensor => "sensor",
            Category::Text => "text_sensor",
            Category::Switch => "switch",
            Category::Number => "number",
            Category::Select => "select",
        }
    }

    /// Look up a category by platform name
    pub fn from_platform(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.platform().eq_ignore_ascii_case(name.trim()))
    }

    /// Behavior shared by every entity of this category
    pub fn behavior(&self) -> CategoryBehavior {
        let (writable, value_type) = match self {
            Category::Binary => (false, ValueType::Bool),
            Category::Sensor => (false, ValueType::Float),
            Category::Text => (false, ValueType::Text),
            Category::Switch => (true, ValueType::Bool),
            Category::Number => (true, ValueType::Float),
            Category::Select => (true, ValueType::Text),
        };
        CategoryBehavior {
            writable,
            value_type,
        }
    }

    /// Resolve a key name within this category
    pub fn key(&self, name: &str) -> Result<SignalKey, HubError> {
        match self {
            Category::Binary => name.parse::<BinaryKey>().map(SignalKey::Binary),
            Category::Sensor => name.parse::<SensorKey>().map(SignalKey::Sensor),
            Category::Text => name.parse::<TextKey>().map(SignalKey::Text),
            Category::Switch => name.parse::<SwitchKey>().map(SignalKey::Switch),
            Category::Number => name.parse::<NumberKey>().map(SignalKey::Number),
            Category::Select => name.parse::<SelectKey>().map(SignalKey::Select),
        }
    }

    /// Configuration names of every key in this category
    pub fn key_names(&self) -> Vec<&'static str> {
        match self {
            Category::Binary => BinaryKey::ALL.iter().map(|k| k.name()).collect(),
            Category::Sensor => SensorKey::ALL.iter().map(|k| k.name()).collect(),
            Category::Text => TextKey::ALL.iter().map(|k| k.name()).collect(),
            Category::Switch => SwitchKey::ALL.iter().map(|k| k.name()).collect(),
            Category::Number => NumberKey::ALL.iter().map(|k| k.name()).collect(),
            Category::Select => SelectKey::ALL.iter().map(|k| k.name()).collect(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform())
    }
}

/// Declares a per-category key enum together with its static name table
macro_rules! signal_keys {
    (
        $(#[$meta:meta])*
        $name:ident in $category:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every key of this category, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Canonical configuration name
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Look up a key by configuration name, ignoring ASCII case
            pub fn from_name(name: &str) -> Option<Self> {
                let name = name.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|k| k.name().eq_ignore_ascii_case(name))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = HubError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s).ok_or_else(|| HubError::UnknownSignal {
                    category: Category::$category,
                    name: s.to_string(),
                })
            }
        }

        impl From<$name> for SignalKey {
            fn from(key: $name) -> Self {
                SignalKey::$category(key)
            }
        }
    };
}

signal_keys! {
    /// Read-only flags
    BinaryKey in Binary {
        Connected => "connected",
        PttActive => "ptt_active",
        PttData => "ptt_data",
        PowerLow => "power_low",
        Scanning => "scanning",
        DuplexEnabled => "duplex_enabled",
        SilentMemory => "silent_memory",
        QuietMemory => "quiet_memory",
        QuietMode => "quiet_mode",
    }
}

signal_keys! {
    /// Numeric readings
    SensorKey in Sensor {
        Channel => "channel",
        Zone => "zone",
        Volume => "volume",
        /// Seconds left on a voice+data transmission
        PttTimer => "ptt_timer",
    }
}

signal_keys! {
    /// Text readings
    TextKey in Text {
        Manufacturer => "manufacturer",
        Model => "model",
        Firmware => "firmware",
        Serial => "serial",
        /// Last unsolicited notification line
        LastMessage => "last_message",
        PowerState => "power_state",
        PttState => "ptt_state",
        ChannelLabel => "channel_label",
    }
}

signal_keys! {
    /// On/off controls
    SwitchKey in Switch {
        /// Periodic position upload to the radio (handled by the bridge)
        LocationMode => "location_mode",
        Scan => "scan",
        Duplex => "duplex",
        QuietMode => "quiet_mode",
        QuietMemory => "quiet_memory",
        SilentMemory => "silent_memory",
    }
}

signal_keys! {
    /// Numeric controls
    NumberKey in Number {
        Volume => "volume",
    }
}

signal_keys! {
    /// Choices from a dynamic option set
    SelectKey in Select {
        Zone => "zone",
        Channel => "channel",
    }
}

/// A signal key tagged with its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKey {
    Binary(BinaryKey),
    Sensor(SensorKey),
    Text(TextKey),
    Switch(SwitchKey),
    Number(NumberKey),
    Select(SelectKey),
}

impl SignalKey {
    /// Category this key belongs to
    pub fn category(&self) -> Category {
        match self {
            SignalKey::Binary(_) => Category::Binary,
            SignalKey::Sensor(_) => Category::Sensor,
            SignalKey::Text(_) => Category::Text,
            SignalKey::Switch(_) => Category::Switch,
            SignalKey::Number(_) => Category::Number,
            SignalKey::Select(_) => Category::Select,
        }
    }

    /// Configuration name within the category
    pub fn name(&self) -> &'static str {
        match self {
            SignalKey::Binary(k) => k.name(),
            SignalKey::Sensor(k) => k.name(),
            SignalKey::Text(k) => k.name(),
            SignalKey::Switch(k) => k.name(),
            SignalKey::Number(k) => k.name(),
            SignalKey::Select(k) => k.name(),
        }
    }

    /// Every key of every category
    pub fn all() -> impl Iterator<Item = SignalKey> {
        BinaryKey::ALL
            .iter()
            .copied()
            .map(SignalKey::from)
            .chain(SensorKey::ALL.iter().copied().map(SignalKey::from))
            .chain(TextKey::ALL.iter().copied().map(SignalKey::from))
            .chain(SwitchKey::ALL.iter().copied().map(SignalKey::from))
            .chain(NumberKey::ALL.iter().copied().map(SignalKey::from))
            .chain(SelectKey::ALL.iter().copied().map(SignalKey::from))
    }
}

/// Formats as `platform.name`, e.g. `switch.scan`
impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category(), self.name())
    }
}

/// Parses `platform.name`, e.g. `binary_sensor.connected`
impl FromStr for SignalKey {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || HubError::InvalidKey(s.to_string());
        let (platform, name) = s.trim().split_once('.').ok_or_else(unknown)?;
        let category = Category::from_platform(platform).ok_or_else(unknown)?;
        category.key(name)
    }
}
