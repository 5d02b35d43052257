//! JSON-lines front-end
//!
//! Entities publish to stdout, one JSON object per line:
//!
//! ```text
//! {"event":"state","hub":"radio","entity":"switch.scan","name":"Scan","value":true}
//! {"event":"options","hub":"radio","entity":"select.zone","options":["Zone 1"],"selected":"Zone 1"}
//! ```
//!
//! Requests arrive on stdin in the same format:
//!
//! ```text
//! {"op":"command","entity":"number.volume","value":12}
//! {"op":"location","latitude":-33.8688,"longitude":151.2093}
//! {"op":"stats","hub":"radio"}
//! ```
//!
//! `hub` may be left out when only one radio is configured.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use xrs_hub::{
    EntityDescriptor, EntitySink, HubHandle, HubStats, SignalKey, SinkFactory, StateValue,
    ValueType,
};

/// One line written to stdout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    State {
        hub: String,
        entity: String,
        name: String,
        value: Value,
    },
    Options {
        hub: String,
        entity: String,
        options: Vec<String>,
        selected: Option<String>,
    },
    CommandResult {
        hub: String,
        entity: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Stats {
        hub: String,
        stats: HubStats,
    },
    Error {
        message: String,
    },
}

/// One line read from stdin
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Command {
        #[serde(default)]
        hub: Option<String>,
        entity: String,
        value: Value,
    },
    Location {
        #[serde(default)]
        hub: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    Stats {
        #[serde(default)]
        hub: Option<String>,
    },
}

pub fn state_json(value: &StateValue) -> Value {
    match value {
        StateValue::Bool(b) => Value::Bool(*b),
        StateValue::Float(f) => serde_json::Number::from_f64(f64::from(*f))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        StateValue::Text(s) => Value::String(s.clone()),
    }
}

/// Convert a request value to the type the entity expects
///
/// Booleans also accept `"ON"`/`"OFF"`; numbers also accept numeric strings.
pub fn value_for(key: SignalKey, value: &Value) -> Result<StateValue, String> {
    let expected = key.category().behavior().value_type;
    let converted = match (expected, value) {
        (ValueType::Bool, Value::Bool(b)) => Some(StateValue::Bool(*b)),
        (ValueType::Bool, Value::String(s)) => match s.to_ascii_uppercase().as_str() {
            "ON" | "TRUE" => Some(StateValue::Bool(true)),
            "OFF" | "FALSE" => Some(StateValue::Bool(false)),
            _ => None,
        },
        (ValueType::Float, Value::Number(n)) => n.as_f64().map(|f| StateValue::Float(f as f32)),
        (ValueType::Float, Value::String(s)) => {
            s.trim().parse::<f32>().ok().map(StateValue::Float)
        }
        (ValueType::Text, Value::String(s)) => Some(StateValue::Text(s.clone())),
        _ => None,
    };
    converted.ok_or_else(|| format!("{} expects a {:?} value, got {}", key, expected, value))
}

/// Entity sink that forwards publications to the stdout writer
pub struct JsonSink {
    hub: String,
    entity: String,
    name: String,
    events: mpsc::UnboundedSender<Event>,
}

impl EntitySink for JsonSink {
    fn publish_state(&mut self, value: &StateValue) {
        let _ = self.events.send(Event::State {
            hub: self.hub.clone(),
            entity: self.entity.clone(),
            name: self.name.clone(),
            value: state_json(value),
        });
    }

    fn publish_options(&mut self, options: &[String], selected: Option<&str>) {
        let _ = self.events.send(Event::Options {
            hub: self.hub.clone(),
            entity: self.entity.clone(),
            options: options.to_vec(),
            selected: selected.map(str::to_string),
        });
    }
}

pub struct JsonSinkFactory {
    events: mpsc::UnboundedSender<Event>,
}

impl JsonSinkFactory {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self { events }
    }
}

impl SinkFactory for JsonSinkFactory {
    fn entity_sink(&mut self, descriptor: &EntityDescriptor) -> Box<dyn EntitySink> {
        Box::new(JsonSink {
            hub: descriptor.hub_id.clone(),
            entity: descriptor.key.to_string(),
            name: descriptor.name.clone(),
            events: self.events.clone(),
        })
    }

    fn location_sink(&mut self, hub_id: &str, sensor_id: &str) -> Box<dyn EntitySink> {
        Box::new(JsonSink {
            hub: hub_id.to_string(),
            entity: sensor_id.to_string(),
            name: sensor_id.to_string(),
            events: self.events.clone(),
        })
    }
}

/// Write events to stdout until every sender is gone
pub async fn write_events(mut events: mpsc::UnboundedReceiver<Event>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(event) = events.recv().await {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", event, e);
                continue;
            }
        };
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Pick the target hub; `None` is allowed when there is only one
fn resolve<'a>(
    handles: &'a HashMap<String, HubHandle>,
    hub: Option<&str>,
) -> Result<(&'a str, &'a HubHandle), String> {
    match hub {
        Some(id) => handles
            .get_key_value(id)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| format!("unknown hub {:?}", id)),
        None if handles.len() == 1 => handles
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| "no hubs configured".to_string()),
        None => Err("several hubs configured, \"hub\" is required".to_string()),
    }
}

async fn handle_request(
    request: Request,
    handles: &HashMap<String, HubHandle>,
) -> Result<Option<Event>, String> {
    match request {
        Request::Command { hub, entity, value } => {
            let (hub, handle) = resolve(handles, hub.as_deref())?;
            let key: SignalKey = entity.parse().map_err(|e| format!("{}", e))?;
            let value = value_for(key, &value)?;
            let error = handle.command(key, value).await.err().map(|e| e.to_string());
            Ok(Some(Event::CommandResult {
                hub: hub.to_string(),
                entity: key.to_string(),
                error,
            }))
        }
        Request::Location {
            hub,
            latitude,
            longitude,
        } => {
            let (_, handle) = resolve(handles, hub.as_deref())?;
            handle
                .update_location(latitude, longitude)
                .await
                .map_err(|e| e.to_string())?;
            Ok(None)
        }
        Request::Stats { hub } => {
            let (hub, handle) = resolve(handles, hub.as_deref())?;
            let stats = handle.stats().await.map_err(|e| e.to_string())?;
            Ok(Some(Event::Stats {
                hub: hub.to_string(),
                stats,
            }))
        }
    }
}

/// Read requests from stdin until it closes
pub async fn read_requests(
    handles: &HashMap<String, HubHandle>,
    events: mpsc::UnboundedSender<Event>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("Request: {}", line);

        let result = match serde_json::from_str::<Request>(line) {
            Ok(request) => handle_request(request, handles).await,
            Err(e) => Err(format!("bad request: {}", e)),
        };
        let event = match result {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(message) => {
                warn!("{}", message);
                Event::Error { message }
            }
        };
        let _ = events.send(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xrs_hub::{NumberKey, SelectKey, SwitchKey, TextKey};

    #[test]
    fn test_value_conversion_follows_category() {
        assert_eq!(
            value_for(SwitchKey::Scan.into(), &json!("on")),
            Ok(StateValue::Bool(true))
        );
        assert_eq!(
            value_for(NumberKey::Volume.into(), &json!(12)),
            Ok(StateValue::Float(12.0))
        );
        assert_eq!(
            value_for(NumberKey::Volume.into(), &json!("7.5")),
            Ok(StateValue::Float(7.5))
        );
        assert_eq!(
            value_for(SelectKey::Zone.into(), &json!("Zone 2")),
            Ok(StateValue::from("Zone 2"))
        );
        assert!(value_for(SwitchKey::Scan.into(), &json!(1)).is_err());
        assert!(value_for(TextKey::Model.into(), &json!(true)).is_err());
    }

    #[test]
    fn test_requests_parse() {
        let request: Request =
            serde_json::from_str(r#"{"op":"command","entity":"switch.scan","value":true}"#)
                .unwrap();
        assert_eq!(
            request,
            Request::Command {
                hub: None,
                entity: "switch.scan".to_string(),
                value: json!(true),
            }
        );

        let request: Request =
            serde_json::from_str(r#"{"op":"location","hub":"radio","latitude":1.5,"longitude":2.5}"#)
                .unwrap();
        assert!(matches!(request, Request::Location { latitude, .. } if latitude == 1.5));

        assert!(serde_json::from_str::<Request>(r#"{"op":"reboot"}"#).is_err());
    }

    #[test]
    fn test_sink_emits_state_and_options() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut factory = JsonSinkFactory::new(tx);
        let descriptor = EntityDescriptor {
            hub_id: "radio".to_string(),
            key: SelectKey::Zone.into(),
            name: "Zone".to_string(),
            bounds: None,
        };
        let mut sink = factory.entity_sink(&descriptor);

        sink.publish_options(&["Zone 1".to_string()], Some("Zone 1"));
        sink.publish_state(&StateValue::from("Zone 1"));

        let options = serde_json::to_value(rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            options,
            json!({
                "event": "options",
                "hub": "radio",
                "entity": "select.zone",
                "options": ["Zone 1"],
                "selected": "Zone 1",
            })
        );
        let state = serde_json::to_value(rx.try_recv().unwrap()).unwrap();
        assert_eq!(state["value"], json!("Zone 1"));
        assert_eq!(state["name"], json!("Zone"));
    }

    #[test]
    fn test_resolve_requires_hub_when_ambiguous() {
        let (tx, _rx) = mpsc::channel(1);
        let mut handles = HashMap::new();
        handles.insert("a".to_string(), HubHandle::new(tx.clone()));
        assert_eq!(resolve(&handles, None).map(|(id, _)| id), Ok("a"));

        handles.insert("b".to_string(), HubHandle::new(tx));
        assert!(resolve(&handles, None).is_err());
        assert_eq!(resolve(&handles, Some("b")).map(|(id, _)| id), Ok("b"));
        assert!(resolve(&handles, Some("c")).is_err());
    }

    #[test]
    fn test_command_result_omits_missing_error() {
        let event = Event::CommandResult {
            hub: "radio".to_string(),
            entity: "switch.scan".to_string(),
            error: None,
        };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"event": "command_result", "hub": "radio", "entity": "switch.scan"})
        );
    }
}
