//! Typed entities
//!
//! One entity type covers all six categories. What differs between them is
//! captured by the category's [`CategoryBehavior`] record plus an
//! [`EntityDetail`]: number bounds for numeric controls, a dynamic option set
//! for selections.
//!
//! Entities never publish on their own. The hub calls [`TypedEntity::publish`]
//! when the radio reports a value; front-end commands go through
//! [`TypedEntity::prepare_command`] and travel to the radio without touching
//! local state.

use std::fmt;

use crate::error::HubError;
use crate::keys::{Category, CategoryBehavior, SignalKey, ValueType};

/// A value published by or commanded to an entity
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Float(f32),
    Text(String),
}

impl StateValue {
    /// Type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            StateValue::Bool(_) => ValueType::Bool,
            StateValue::Float(_) => ValueType::Float,
            StateValue::Text(_) => ValueType::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            StateValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<f32> for StateValue {
    fn from(value: f32) -> Self {
        StateValue::Float(value)
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Text(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(true) => f.write_str("ON"),
            StateValue::Bool(false) => f.write_str("OFF"),
            StateValue::Float(v) => write!(f, "{}", v),
            StateValue::Text(s) => f.write_str(s),
        }
    }
}

/// Receives everything an entity publishes
///
/// This is the seam to the outside world (a home-automation front-end, a
/// JSON stream, a test recorder). Implementations must not block.
pub trait EntitySink: Send {
    /// A new state value was published
    fn publish_state(&mut self, value: &StateValue);

    /// A select entity's option set and selection were replaced together
    fn publish_options(&mut self, _options: &[String], _selected: Option<&str>) {}
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EntitySink for NullSink {
    fn publish_state(&mut self, _value: &StateValue) {}
}

/// Bounds of a numeric control, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberTraits {
    min: f32,
    max: f32,
    step: f32,
}

impl NumberTraits {
    /// Validate and build bounds: `step > 0` and `min <= max`
    pub fn new(min: f32, max: f32, step: f32) -> Result<Self, HubError> {
        // NaN fails every comparison, so it is rejected here too
        if !(step > 0.0 && min <= max) || !min.is_finite() || !max.is_finite() {
            return Err(HubError::InvalidBounds { min, max, step });
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Clamp into `[min, max]`
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Volume range of the radio
impl Default for NumberTraits {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 31.0,
            step: 1.0,
        }
    }
}

/// Dynamic option set of a select entity
///
/// The selection, when present, is always one of the options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    options: Vec<String>,
    selected: Option<String>,
}

impl SelectOptions {
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }

    /// Replace options and selection together
    ///
    /// A selection that is not in `options` is dropped.
    pub fn replace(&mut self, options: Vec<String>, selected: Option<String>) {
        self.selected = selected.filter(|s| options.contains(s));
        self.options = options;
    }

    /// Select an existing option; returns false if it is not in the set
    fn select(&mut self, value: &str) -> bool {
        if !self.contains(value) {
            return false;
        }
        self.selected = Some(value.to_string());
        true
    }
}

/// Category-specific detail of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDetail {
    /// Binary, sensor, text and switch entities
    Plain,
    /// Numeric control bounds
    Number(NumberTraits),
    /// Selection option set
    Select(SelectOptions),
}

/// Result of validating a front-end command
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
    /// Value to send to the radio
    pub value: StateValue,
    /// Whether a numeric value was pulled into bounds
    pub clamped: bool,
}

/// An entity registered with a hub
pub struct TypedEntity {
    key: SignalKey,
    name: String,
    detail: EntityDetail,
    state: Option<StateValue>,
    sink: Box<dyn EntitySink>,
}

impl fmt::Debug for TypedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEntity")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("detail", &self.detail)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TypedEntity {
    /// Create an entity with the category's default detail
    ///
    /// Numbers get the radio's volume bounds (0..31 step 1); selects start
    /// with an empty option set.
    pub fn new(key: impl Into<SignalKey>, name: impl Into<String>, sink: Box<dyn EntitySink>) -> Self {
        let key = key.into();
        let detail = match key.category() {
            Category::Number => EntityDetail::Number(NumberTraits::default()),
            Category::Select => EntityDetail::Select(SelectOptions::default()),
            _ => EntityDetail::Plain,
        };
        Self {
            key,
            name: name.into(),
            detail,
            state: None,
            sink,
        }
    }

    /// Replace the bounds of a numeric control
    pub fn with_bounds(mut self, bounds: NumberTraits) -> Result<Self, HubError> {
        match &mut self.detail {
            EntityDetail::Number(traits) => {
                *traits = bounds;
                Ok(self)
            }
            _ => Err(HubError::InvalidValue {
                key: self.key,
                reason: "bounds only apply to number entities".to_string(),
            }),
        }
    }

    pub fn key(&self) -> SignalKey {
        self.key
    }

    pub fn category(&self) -> Category {
        self.key.category()
    }

    pub fn behavior(&self) -> CategoryBehavior {
        self.category().behavior()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> &EntityDetail {
        &self.detail
    }

    /// Last published value
    pub fn state(&self) -> Option<&StateValue> {
        self.state.as_ref()
    }

    /// Numeric bounds, for number entities
    pub fn bounds(&self) -> Option<&NumberTraits> {
        match &self.detail {
            EntityDetail::Number(traits) => Some(traits),
            _ => None,
        }
    }

    /// Current option set, for select entities
    pub fn options(&self) -> Option<&SelectOptions> {
        match &self.detail {
            EntityDetail::Select(options) => Some(options),
            _ => None,
        }
    }

    fn check_type(&self, value: &StateValue) -> Result<(), HubError> {
        let expected = self.behavior().value_type;
        if value.value_type() != expected {
            return Err(HubError::InvalidValue {
                key: self.key,
                reason: format!("expected {:?}, got {:?}", expected, value.value_type()),
            });
        }
        Ok(())
    }

    /// Publish a value reported by the radio
    ///
    /// Every accepted value is forwarded to the sink, repeated values
    /// included. Selections must name a current option.
    pub(crate) fn publish(&mut self, value: StateValue) -> Result<(), HubError> {
        self.check_type(&value)?;

        if let (EntityDetail::Select(options), StateValue::Text(selection)) =
            (&mut self.detail, &value)
        {
            if !options.select(selection) {
                return Err(HubError::StaleSelection {
                    key: self.key,
                    value: selection.clone(),
                });
            }
        }

        self.sink.publish_state(&value);
        self.state = Some(value);
        Ok(())
    }

    /// Validate a front-end command without changing local state
    pub fn prepare_command(&self, value: StateValue) -> Result<PreparedCommand, HubError> {
        if !self.behavior().writable {
            return Err(HubError::NotWritable(self.key));
        }
        self.check_type(&value)?;

        match (&self.detail, value) {
            (EntityDetail::Number(traits), StateValue::Float(v)) => {
                if v.is_nan() {
                    return Err(HubError::InvalidValue {
                        key: self.key,
                        reason: "not a number".to_string(),
                    });
                }
                let clamped = traits.clamp(v);
                Ok(PreparedCommand {
                    value: StateValue::Float(clamped),
                    clamped: clamped != v,
                })
            }
            (EntityDetail::Select(options), StateValue::Text(choice)) => {
                if !options.contains(&choice) {
                    return Err(HubError::StaleSelection {
                        key: self.key,
                        value: choice,
                    });
                }
                Ok(PreparedCommand {
                    value: StateValue::Text(choice),
                    clamped: false,
                })
            }
            (_, value) => Ok(PreparedCommand {
                value,
                clamped: false,
            }),
        }
    }

    /// Replace the option set and selection of a select entity
    pub(crate) fn refresh_options(
        &mut self,
        options: Vec<String>,
        selected: Option<String>,
    ) -> Result<(), HubError> {
        let EntityDetail::Select(set) = &mut self.detail else {
            return Err(HubError::InvalidValue {
                key: self.key,
                reason: "options only apply to select entities".to_string(),
            });
        };

        set.replace(options, selected);
        self.state = set.selected().map(StateValue::from);
        self.sink.publish_options(set.options(), set.selected());
        Ok(())
    }
}
