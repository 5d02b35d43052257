//! XRS device adapter
//!
//! Translates between the radio's AT lines and hub operations. Notifications
//! update the adapter's copy of the radio state and are dispatched to the
//! matching entities; hub commands become AT commands.

use tracing::{debug, warn};
use xrs_protocol::{AtCommand, AtNotification, ParseError, MAX_VOLUME};

use crate::channels::{parse_channel_option, parse_zone_option, zone_option, ChannelTable};
use crate::entity::StateValue;
use crate::hub::{HubCommand, RadioHub};
use crate::keys::{BinaryKey, NumberKey, SelectKey, SensorKey, SignalKey, SwitchKey, TextKey};
use crate::location::LocationFix;

/// PTT state reported while transmitting voice and data
const PTT_VOICE_DATA: u8 = 2;

/// Power state reported on low battery
const POWER_LOW_BATTERY: u8 = 5;

/// Human-readable power state
pub fn power_state_text(state: u8) -> &'static str {
    match state {
        0 => "Booting",
        1 => "Running",
        2 => "Reset initiated",
        3 => "Power down initiated",
        4 => "Power down",
        5 => "Low battery",
        _ => "Unknown",
    }
}

/// Human-readable PTT state
pub fn ptt_state_text(state: u8) -> &'static str {
    match state {
        0 => "Idle",
        1 => "Transmitting voice",
        2 => "Transmitting voice+data",
        _ => "Unknown",
    }
}

/// Last known radio state plus the translation logic
#[derive(Debug, Clone, Default)]
pub struct XrsDevice {
    manufacturer: String,
    model: String,
    firmware: String,
    serial: String,
    /// 0 until the radio reports a zone
    zone: u8,
    /// 0 until the radio reports a channel
    channel: u8,
    volume: u8,
    ptt_state: u8,
    ptt_timer: u32,
    power_state: Option<u8>,
    scan: bool,
    duplex: bool,
    quiet_mode: bool,
    quiet_memory: bool,
    silent_memory: bool,
    location_mode: bool,
    channels: ChannelTable,
}

impl XrsDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn location_mode(&self) -> bool {
        self.location_mode
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Link opened: mark connected, publish a snapshot, return the handshake
    pub fn on_link_up(&mut self, hub: &mut RadioHub) -> Vec<AtCommand> {
        hub.notify_connection_state(true);
        self.publish_snapshot(hub);
        AtCommand::handshake().to_vec()
    }

    /// Link closed
    pub fn on_link_down(&mut self, hub: &mut RadioHub) {
        hub.notify_connection_state(false);
    }

    /// Parse and apply one line from the radio
    pub fn handle_line(&mut self, line: &str, hub: &mut RadioHub) {
        match AtNotification::parse(line) {
            Ok(notification) => self.handle_notification(notification, hub),
            Err(ParseError::Empty) => {}
            Err(e) => warn!("Ignoring radio line {:?}: {}", line, e),
        }
    }

    /// Apply a parsed notification
    pub fn handle_notification(&mut self, notification: AtNotification, hub: &mut RadioHub) {
        match notification {
            AtNotification::Ok | AtNotification::Error => {}
            AtNotification::Unrecognized(line) => debug!("Unhandled radio line: {}", line),
            AtNotification::Manufacturer(s) => {
                hub.dispatch(TextKey::Manufacturer, s.as_str());
                self.manufacturer = s;
            }
            AtNotification::Model(s) => {
                hub.dispatch(TextKey::Model, s.as_str());
                self.model = s;
            }
            AtNotification::Firmware(s) => {
                hub.dispatch(TextKey::Firmware, s.as_str());
                self.firmware = s;
            }
            AtNotification::Serial(s) => {
                hub.dispatch(TextKey::Serial, s.as_str());
                self.serial = s;
            }
            AtNotification::Volume(v) => {
                self.volume = v;
                self.publish_volume(hub);
            }
            AtNotification::ZoneChannel { zone, channel } => {
                self.zone = zone;
                self.channel = channel;
                hub.dispatch(SensorKey::Channel, f32::from(channel));
                self.publish_zone(hub);
                self.publish_channel_selection(hub);
            }
            AtNotification::Zone(zone) => {
                self.zone = zone;
                self.publish_zone(hub);
            }
            AtNotification::Ptt { state, timer } => {
                self.ptt_state = state;
                self.ptt_timer = timer;
                self.publish_ptt(hub);
            }
            AtNotification::Power(state) => {
                self.power_state = Some(state);
                self.publish_power(hub);
            }
            AtNotification::Scan(on) => {
                self.scan = on;
                hub.dispatch(BinaryKey::Scanning, on);
                hub.dispatch(SwitchKey::Scan, on);
            }
            AtNotification::Duplex(on) => {
                self.duplex = on;
                hub.dispatch(BinaryKey::DuplexEnabled, on);
                hub.dispatch(SwitchKey::Duplex, on);
            }
            AtNotification::SilentMemory(on) => {
                self.silent_memory = on;
                hub.dispatch(BinaryKey::SilentMemory, on);
                hub.dispatch(SwitchKey::SilentMemory, on);
            }
            AtNotification::QuietMemory(on) => {
                self.quiet_memory = on;
                hub.dispatch(BinaryKey::QuietMemory, on);
                hub.dispatch(SwitchKey::QuietMemory, on);
            }
            AtNotification::QuietMode(on) => {
                self.quiet_mode = on;
                hub.dispatch(BinaryKey::QuietMode, on);
                hub.dispatch(SwitchKey::QuietMode, on);
            }
            AtNotification::ChannelEntry(entry) => {
                let current = entry.zone == self.zone && entry.channel == self.channel;
                self.channels.upsert(entry);
                self.refresh_options(hub);
                if current {
                    self.publish_label(hub);
                }
            }
            AtNotification::Other(line) => hub.dispatch(TextKey::LastMessage, line),
        }
    }

    /// Publish everything known, e.g. right after the link comes up
    pub fn publish_snapshot(&self, hub: &mut RadioHub) {
        for (key, value) in [
            (TextKey::Manufacturer, &self.manufacturer),
            (TextKey::Model, &self.model),
            (TextKey::Firmware, &self.firmware),
            (TextKey::Serial, &self.serial),
        ] {
            if !value.is_empty() {
                hub.dispatch(key, value.as_str());
            }
        }

        self.publish_volume(hub);
        self.publish_ptt(hub);
        self.publish_power(hub);

        for (binary, switch, on) in [
            (BinaryKey::Scanning, SwitchKey::Scan, self.scan),
            (BinaryKey::DuplexEnabled, SwitchKey::Duplex, self.duplex),
            (BinaryKey::SilentMemory, SwitchKey::SilentMemory, self.silent_memory),
            (BinaryKey::QuietMemory, SwitchKey::QuietMemory, self.quiet_memory),
            (BinaryKey::QuietMode, SwitchKey::QuietMode, self.quiet_mode),
        ] {
            hub.dispatch(binary, on);
            hub.dispatch(switch, on);
        }
        hub.dispatch(SwitchKey::LocationMode, self.location_mode);

        if self.zone != 0 {
            hub.dispatch(SensorKey::Zone, f32::from(self.zone));
        }
        if self.channel != 0 {
            hub.dispatch(SensorKey::Channel, f32::from(self.channel));
            self.publish_label(hub);
        }
        self.refresh_options(hub);
    }

    /// Translate a validated hub command into an AT command
    ///
    /// Location mode is handled locally and echoed back to the hub. It still
    /// travels through [`RadioHub::send_command`] first, so a location-mode
    /// toggle made while the radio is disconnected is dropped like any other
    /// command and the upload flag keeps its previous value.
    pub fn command_for(&mut self, command: &HubCommand, hub: &mut RadioHub) -> Option<AtCommand> {
        let at = match (command.key, &command.value) {
            (SignalKey::Number(NumberKey::Volume), StateValue::Float(v)) => {
                let volume = v.round().clamp(0.0, MAX_VOLUME as f32) as u8;
                Some(AtCommand::SetVolume(volume))
            }
            (SignalKey::Switch(switch), StateValue::Bool(on)) => match switch {
                SwitchKey::Scan => Some(AtCommand::SetScan(*on)),
                SwitchKey::Duplex => Some(AtCommand::SetDuplex(*on)),
                SwitchKey::QuietMode => Some(AtCommand::SetQuietMode(*on)),
                SwitchKey::QuietMemory => Some(AtCommand::SetQuietMemory(*on)),
                SwitchKey::SilentMemory => Some(AtCommand::SetSilentMemory(*on)),
                SwitchKey::LocationMode => {
                    self.location_mode = *on;
                    hub.dispatch(SwitchKey::LocationMode, *on);
                    return None;
                }
            },
            (SignalKey::Select(SelectKey::Zone), StateValue::Text(option)) => {
                parse_zone_option(option).map(AtCommand::SelectZone)
            }
            (SignalKey::Select(SelectKey::Channel), StateValue::Text(option)) => {
                parse_channel_option(option)
                    .map(|(zone, channel)| AtCommand::SelectChannel { zone, channel })
            }
            _ => None,
        };

        if at.is_none() {
            warn!("No radio command for {} = {}", command.key, command.value);
        }
        at
    }

    /// Position upload for a location tick, when location mode is on
    pub fn location_upload(&self, fix: LocationFix) -> Option<AtCommand> {
        self.location_mode.then_some(AtCommand::ReportLocation {
            latitude: fix.latitude,
            longitude: fix.longitude,
        })
    }

    fn publish_volume(&self, hub: &mut RadioHub) {
        hub.dispatch(SensorKey::Volume, f32::from(self.volume));
        hub.dispatch(NumberKey::Volume, f32::from(self.volume));
    }

    fn publish_ptt(&self, hub: &mut RadioHub) {
        let data = self.ptt_state == PTT_VOICE_DATA;
        let timer = if data && self.ptt_timer > 0 {
            self.ptt_timer as f32
        } else {
            0.0
        };
        hub.dispatch(BinaryKey::PttActive, matches!(self.ptt_state, 1 | 2));
        hub.dispatch(BinaryKey::PttData, data);
        hub.dispatch(SensorKey::PttTimer, timer);
        hub.dispatch(TextKey::PttState, ptt_state_text(self.ptt_state));
    }

    fn publish_power(&self, hub: &mut RadioHub) {
        let Some(state) = self.power_state else {
            return;
        };
        hub.dispatch(BinaryKey::PowerLow, state == POWER_LOW_BATTERY);
        hub.dispatch(TextKey::PowerState, power_state_text(state));
    }

    fn publish_label(&self, hub: &mut RadioHub) {
        hub.dispatch(TextKey::ChannelLabel, self.channels.label(self.zone, self.channel));
    }

    fn publish_zone(&self, hub: &mut RadioHub) {
        hub.dispatch(SensorKey::Zone, f32::from(self.zone));
        if self.channel != 0 {
            self.publish_label(hub);
        }
        hub.dispatch(SelectKey::Zone, zone_option(self.zone));
    }

    fn publish_channel_selection(&self, hub: &mut RadioHub) {
        let options = self.channels.channel_options();
        match ChannelTable::find_channel_option(&options, self.zone, self.channel) {
            Some(option) => hub.dispatch(SelectKey::Channel, option),
            None => debug!(
                "Channel Z{} / Ch {} is not in the channel table",
                self.zone, self.channel
            ),
        }
    }

    fn refresh_options(&self, hub: &mut RadioHub) {
        let zones = self.channels.zone_options();
        let zone = (self.zone != 0).then(|| zone_option(self.zone));
        hub.refresh_select_options(SelectKey::Zone, zones, zone);

        let channels = self.channels.channel_options();
        let channel = ChannelTable::find_channel_option(&channels, self.zone, self.channel);
        hub.refresh_select_options(SelectKey::Channel, channels, channel);
    }
}
