//! Channel table and select option labels
//!
//! The radio reports its programmed channels as `+WGCHSQ:` rows. The table
//! drives the zone and channel select options and the channel label sensor.
//! Until the radio has reported anything, a default grid of 8 zones by 80
//! channels is offered.

use xrs_protocol::args::leading_int;
use xrs_protocol::{ChannelEntry, CHANNEL_RANGE, ZONE_RANGE};

/// Channels per zone in the default grid
pub const DEFAULT_CHANNELS_PER_ZONE: u8 = 80;

/// Option label for a zone: `Zone 3`
pub fn zone_option(zone: u8) -> String {
    format!("Zone {}", zone)
}

/// Option label for a channel: `Z1 / Ch 40` or `Z1 / Ch 40: Repeater`
pub fn channel_option(zone: u8, channel: u8, label: &str) -> String {
    if label.is_empty() {
        format!("Z{} / Ch {}", zone, channel)
    } else {
        format!("Z{} / Ch {}: {}", zone, channel, label)
    }
}

/// Parse a zone selection: `Zone 3` or a bare `3`
///
/// Returns `None` unless the zone is in 1..=8.
pub fn parse_zone_option(value: &str) -> Option<u8> {
    let value = value.trim();
    let number = value.strip_prefix("Zone").unwrap_or(value);
    leading_int(number)
        .and_then(|z| u8::try_from(z).ok())
        .filter(|z| ZONE_RANGE.contains(z))
}

/// Parse a channel selection: `Z1 / Ch 40[: label]` or `1,40`
///
/// Returns `None` unless the zone is in 1..=8 and the channel in 1..=255.
pub fn parse_channel_option(value: &str) -> Option<(u8, u8)> {
    let value = value.trim();
    let (zone, channel) = match value.strip_prefix('Z') {
        Some(rest) => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            let zone = leading_int(&rest[..digits])?;
            let rest = rest[digits..].trim_start().strip_prefix('/')?;
            let rest = rest.trim_start().strip_prefix("Ch")?;
            (zone, leading_int(rest)?)
        }
        None => {
            let (zone, channel) = value.split_once(',')?;
            (leading_int(zone)?, leading_int(channel)?)
        }
    };
    let zone = u8::try_from(zone).ok().filter(|z| ZONE_RANGE.contains(z))?;
    let channel = u8::try_from(channel)
        .ok()
        .filter(|c| CHANNEL_RANGE.contains(c))?;
    Some((zone, channel))
}

/// Channels reported by the radio, kept sorted by zone then channel
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    entries: Vec<ChannelEntry>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    /// Insert or replace the row for `(zone, channel)`
    pub fn upsert(&mut self, entry: ChannelEntry) {
        match self
            .entries
            .binary_search_by_key(&(entry.zone, entry.channel), |e| (e.zone, e.channel))
        {
            Ok(pos) => self.entries[pos] = entry,
            Err(pos) => self.entries.insert(pos, entry),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, zone: u8, channel: u8) -> Option<&ChannelEntry> {
        self.entries
            .iter()
            .find(|e| e.zone == zone && e.channel == channel)
    }

    /// Programmed label, or `Z1 / Ch 40` when there is none
    pub fn label(&self, zone: u8, channel: u8) -> String {
        match self.get(zone, channel) {
            Some(entry) if !entry.label.is_empty() => entry.label.clone(),
            _ => channel_option(zone, channel, ""),
        }
    }

    /// Zone select options
    pub fn zone_options(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return ZONE_RANGE.map(zone_option).collect();
        }
        let mut zones: Vec<u8> = self.entries.iter().map(|e| e.zone).collect();
        zones.dedup();
        zones.into_iter().map(zone_option).collect()
    }

    /// Channel select options
    pub fn channel_options(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return ZONE_RANGE
                .flat_map(|z| (1..=DEFAULT_CHANNELS_PER_ZONE).map(move |c| channel_option(z, c, "")))
                .collect();
        }
        self.entries
            .iter()
            .map(|e| channel_option(e.zone, e.channel, &e.label))
            .collect()
    }

    /// The option naming `(zone, channel)` among `options`, if any
    pub fn find_channel_option(options: &[String], zone: u8, channel: u8) -> Option<String> {
        let bare = channel_option(zone, channel, "");
        let labelled = format!("{}:", bare);
        options
            .iter()
            .find(|o| **o == bare || o.starts_with(&labelled))
            .cloned()
    }
}
