//! Virtual XRS radio
//!
//! Answers AT commands the way a real radio does and queues unsolicited
//! notifications when its simulated front panel is operated.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xrs_protocol::{AtCommand, AtNotification, ChannelEntry, MAX_VOLUME};

/// A programmed channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimChannel {
    pub zone: u8,
    pub channel: u8,
    pub rx_mhz: f32,
    pub tx_mhz: f32,
    #[serde(default)]
    pub label: String,
}

impl From<&SimChannel> for ChannelEntry {
    fn from(c: &SimChannel) -> Self {
        ChannelEntry {
            zone: c.zone,
            channel: c.channel,
            rx_mhz: c.rx_mhz,
            tx_mhz: c.tx_mhz,
            label: c.label.clone(),
        }
    }
}

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualXrsConfig {
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
    pub serial: String,
    /// Answer to `AT+GOI?`
    pub owner: String,
    pub initial_volume: u8,
    pub initial_zone: u8,
    pub initial_channel: u8,
    /// Programmed channels; empty means the radio reports no table
    pub channels: Vec<SimChannel>,
}

impl Default for VirtualXrsConfig {
    fn default() -> Self {
        let channel = |zone, channel, mhz, label: &str| SimChannel {
            zone,
            channel,
            rx_mhz: mhz,
            tx_mhz: mhz,
            label: label.to_string(),
        };
        Self {
            manufacturer: "GME".to_string(),
            model: "XRS-660".to_string(),
            firmware: "1.2.0".to_string(),
            serial: "SIM0001".to_string(),
            owner: "Virtual".to_string(),
            initial_volume: 10,
            initial_zone: 1,
            initial_channel: 1,
            channels: vec![
                channel(1, 1, 476.425, "Calling"),
                channel(1, 40, 476.950, "Repeater"),
                channel(2, 5, 477.100, ""),
            ],
        }
    }
}

/// A simulated XRS radio
#[derive(Debug)]
pub struct VirtualXrsRadio {
    config: VirtualXrsConfig,
    echo: bool,
    volume: u8,
    zone: u8,
    channel: u8,
    scan: bool,
    duplex: bool,
    quiet_mode: bool,
    quiet_memory: bool,
    silent_memory: bool,
    ptt_state: u8,
    power_state: u8,
    last_location: Option<(f64, f64)>,
    pending_output: VecDeque<AtNotification>,
}

impl VirtualXrsRadio {
    pub fn new(config: VirtualXrsConfig) -> Self {
        Self {
            echo: false,
            volume: config.initial_volume.min(MAX_VOLUME as u8),
            zone: config.initial_zone,
            channel: config.initial_channel,
            scan: false,
            duplex: false,
            quiet_mode: false,
            quiet_memory: false,
            silent_memory: false,
            ptt_state: 0,
            power_state: 1,
            last_location: None,
            pending_output: VecDeque::new(),
            config,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn scan(&self) -> bool {
        self.scan
    }

    pub fn duplex(&self) -> bool {
        self.duplex
    }

    pub fn quiet_mode(&self) -> bool {
        self.quiet_mode
    }

    pub fn quiet_memory(&self) -> bool {
        self.quiet_memory
    }

    pub fn silent_memory(&self) -> bool {
        self.silent_memory
    }

    pub fn ptt_state(&self) -> u8 {
        self.ptt_state
    }

    pub fn power_state(&self) -> u8 {
        self.power_state
    }

    /// Last position uploaded with `AT+WGTLOC`
    pub fn last_location(&self) -> Option<(f64, f64)> {
        self.last_location
    }

    /// Next queued line for the bridge
    pub fn take_output(&mut self) -> Option<AtNotification> {
        self.pending_output.pop_front()
    }

    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    fn queue(&mut self, notification: AtNotification) {
        self.pending_output.push_back(notification);
    }

    /// Handle one command line; returns the parsed command, if valid
    pub fn handle_line(&mut self, line: &str) -> Option<AtCommand> {
        if self.echo {
            self.queue(AtNotification::Unrecognized(line.trim().to_string()));
        }
        match AtCommand::parse(line) {
            Ok(command) => {
                self.handle_command(&command);
                Some(command)
            }
            Err(e) => {
                warn!("Virtual radio rejected {:?}: {}", line, e);
                self.queue(AtNotification::Error);
                None
            }
        }
    }

    /// Apply a command and queue the radio's answer
    pub fn handle_command(&mut self, command: &AtCommand) {
        debug!("Virtual radio handling {}", command);
        match command {
            AtCommand::EchoOn => self.echo = true,
            AtCommand::VerboseOn => {}
            AtCommand::QueryManufacturer => {
                self.queue(AtNotification::Manufacturer(self.config.manufacturer.clone()))
            }
            AtCommand::QueryModel => self.queue(AtNotification::Model(self.config.model.clone())),
            AtCommand::QueryFirmware => {
                self.queue(AtNotification::Firmware(self.config.firmware.clone()))
            }
            AtCommand::QuerySerial => self.queue(AtNotification::Serial(self.config.serial.clone())),
            AtCommand::QueryOwner => {
                let line = format!("+GOI: {}", self.config.owner);
                self.queue(AtNotification::Other(line));
            }
            AtCommand::RequestChannelTable => {
                let rows: Vec<ChannelEntry> = self.config.channels.iter().map(ChannelEntry::from).collect();
                for row in rows {
                    self.queue(AtNotification::ChannelEntry(row));
                }
                self.queue(AtNotification::ZoneChannel {
                    zone: self.zone,
                    channel: self.channel,
                });
                self.queue(AtNotification::Volume(self.volume));
            }
            AtCommand::SetVolume(v) => {
                self.volume = (*v).min(MAX_VOLUME as u8);
                self.queue(AtNotification::Volume(self.volume));
            }
            AtCommand::SetScan(on) => {
                self.scan = *on;
                self.queue(AtNotification::Scan(*on));
            }
            AtCommand::SetDuplex(on) => {
                self.duplex = *on;
                self.queue(AtNotification::Duplex(*on));
            }
            AtCommand::SetQuietMode(on) => {
                self.quiet_mode = *on;
                self.queue(AtNotification::QuietMode(*on));
            }
            AtCommand::SetQuietMemory(on) => {
                self.quiet_memory = *on;
                self.queue(AtNotification::QuietMemory(*on));
            }
            AtCommand::SetSilentMemory(on) => {
                self.silent_memory = *on;
                self.queue(AtNotification::SilentMemory(*on));
            }
            AtCommand::SelectZone(zone) => {
                self.zone = *zone;
                if let Some(first) = self.config.channels.iter().find(|c| c.zone == *zone) {
                    self.channel = first.channel;
                }
                self.queue(AtNotification::ZoneChannel {
                    zone: self.zone,
                    channel: self.channel,
                });
            }
            AtCommand::SelectChannel { zone, channel } => {
                let programmed = self.config.channels.is_empty()
                    || self
                        .config
                        .channels
                        .iter()
                        .any(|c| c.zone == *zone && c.channel == *channel);
                if !programmed {
                    self.queue(AtNotification::Error);
                    return;
                }
                self.zone = *zone;
                self.channel = *channel;
                self.queue(AtNotification::ZoneChannel {
                    zone: *zone,
                    channel: *channel,
                });
            }
            AtCommand::ReportLocation {
                latitude,
                longitude,
            } => self.last_location = Some((*latitude, *longitude)),
        }
        self.queue(AtNotification::Ok);
    }

    /// Operate the PTT key
    pub fn set_ptt(&mut self, state: u8, timer: u32) {
        self.ptt_state = state;
        self.queue(AtNotification::Ptt { state, timer });
    }

    /// Change the power state
    pub fn set_power(&mut self, state: u8) {
        self.power_state = state;
        self.queue(AtNotification::Power(state));
    }

    /// Turn the volume knob
    pub fn turn_volume(&mut self, volume: u8) {
        let volume = volume.min(MAX_VOLUME as u8);
        if volume != self.volume {
            self.volume = volume;
            self.queue(AtNotification::Volume(volume));
        }
    }

    /// Change channel from the front panel
    pub fn change_channel(&mut self, zone: u8, channel: u8) {
        self.zone = zone;
        self.channel = channel;
        self.queue(AtNotification::ZoneChannel { zone, channel });
    }
}

impl Default for VirtualXrsRadio {
    fn default() -> Self {
        Self::new(VirtualXrsConfig::default())
    }
}
