//! Hub actor
//!
//! One task owns a [`RadioHub`] and its [`XrsDevice`]. Everything that
//! touches the hub arrives as a message, so the hub itself needs no locking:
//!
//! - [`HubInput`] from the link (lines, up/down) and the front-end (commands,
//!   location fixes)
//! - [`HubCommand`]s queued by the hub's own transport
//! - the location interval timer
//!
//! AT commands produced here go to the link task through a bounded queue.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use xrs_protocol::AtCommand;

use crate::device::XrsDevice;
use crate::entity::StateValue;
use crate::error::HubError;
use crate::hub::{HubCommand, HubStats, RadioHub};
use crate::keys::SignalKey;

/// Capacity of the hub's outbound command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Capacity of the actor's inbound queue
pub const INPUT_QUEUE_CAPACITY: usize = 256;

/// Capacity of the queue from the actor to the link
pub const AT_QUEUE_CAPACITY: usize = 64;

/// Messages handled by the hub actor
#[derive(Debug)]
pub enum HubInput {
    /// The link to the radio opened
    LinkUp,
    /// The link to the radio closed
    LinkDown,
    /// A complete line from the radio
    Line(String),
    /// Front-end command for an entity
    Command {
        /// Target entity
        key: SignalKey,
        /// Requested value
        value: StateValue,
        /// Validation result
        response: Option<oneshot::Sender<Result<(), HubError>>>,
    },
    /// New position fix for location reporting
    LocationFix {
        /// Decimal degrees
        latitude: f64,
        /// Decimal degrees
        longitude: f64,
    },
    /// Snapshot of the hub counters
    GetStats {
        /// Channel to send the counters back
        response: oneshot::Sender<HubStats>,
    },
    /// Stop the actor
    Shutdown,
}

/// Cloneable front-end handle to a running hub actor
#[derive(Debug, Clone)]
pub struct HubHandle {
    input_tx: mpsc::Sender<HubInput>,
}

impl HubHandle {
    pub fn new(input_tx: mpsc::Sender<HubInput>) -> Self {
        Self { input_tx }
    }

    /// Send a command and wait for validation
    ///
    /// `Ok` means the command was accepted by its entity; delivery to the
    /// radio is fire-and-forget.
    pub async fn command(&self, key: SignalKey, value: StateValue) -> Result<(), HubError> {
        let (response, rx) = oneshot::channel();
        self.input_tx
            .send(HubInput::Command {
                key,
                value,
                response: Some(response),
            })
            .await
            .map_err(|_| HubError::ActorStopped)?;
        rx.await.map_err(|_| HubError::ActorStopped)?
    }

    /// Cache a new position fix
    pub async fn update_location(&self, latitude: f64, longitude: f64) -> Result<(), HubError> {
        self.input_tx
            .send(HubInput::LocationFix {
                latitude,
                longitude,
            })
            .await
            .map_err(|_| HubError::ActorStopped)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (response, rx) = oneshot::channel();
        self.input_tx
            .send(HubInput::GetStats { response })
            .await
            .map_err(|_| HubError::ActorStopped)?;
        rx.await.map_err(|_| HubError::ActorStopped)
    }

    pub async fn shutdown(&self) {
        let _ = self.input_tx.send(HubInput::Shutdown).await;
    }
}

fn send_at(at_tx: &mpsc::Sender<AtCommand>, command: AtCommand) {
    match at_tx.try_send(command) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(cmd)) => warn!("Link queue full, dropping {}", cmd),
        Err(mpsc::error::TrySendError::Closed(cmd)) => debug!("Link gone, dropping {}", cmd),
    }
}

/// Run the hub actor until shutdown; returns the hub for inspection
///
/// `command_rx` must be the receiving end of the queue the hub was built
/// with as its transport.
pub async fn run_hub_actor(
    mut hub: RadioHub,
    mut device: XrsDevice,
    mut input_rx: mpsc::Receiver<HubInput>,
    mut command_rx: mpsc::Receiver<HubCommand>,
    at_tx: mpsc::Sender<AtCommand>,
) -> RadioHub {
    info!("Hub actor for {} started", hub.mac_address());

    let period: Duration = hub.location_interval();
    let start = Instant::now();
    let mut location_timer = interval_at(start.checked_add(period).unwrap_or(start), period);
    location_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            input = input_rx.recv() => {
                let Some(input) = input else { break; };
                match input {
                    HubInput::LinkUp => {
                        for command in device.on_link_up(&mut hub) {
                            send_at(&at_tx, command);
                        }
                    }

                    HubInput::LinkDown => device.on_link_down(&mut hub),

                    HubInput::Line(line) => {
                        debug!("RX {}: {}", hub.mac_address(), line);
                        device.handle_line(&line, &mut hub);
                    }

                    HubInput::Command { key, value, response } => {
                        let result = hub.command(key, value);
                        if let Err(e) = &result {
                            warn!("Command rejected: {}", e);
                        }
                        if let Some(response) = response {
                            let _ = response.send(result);
                        }
                    }

                    HubInput::LocationFix { latitude, longitude } => {
                        hub.update_location_fix(latitude, longitude);
                    }

                    HubInput::GetStats { response } => {
                        let _ = response.send(hub.stats());
                    }

                    HubInput::Shutdown => break,
                }
            }

            Some(command) = command_rx.recv() => {
                if let Some(at) = device.command_for(&command, &mut hub) {
                    send_at(&at_tx, at);
                }
            }

            _ = location_timer.tick() => {
                if let Some(fix) = hub.poll_location(Instant::now().into_std()) {
                    if let Some(at) = device.location_upload(fix) {
                        send_at(&at_tx, at);
                    }
                }
            }
        }
    }

    info!("Hub actor for {} stopped", hub.mac_address());
    hub
}
