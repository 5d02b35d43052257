//! Lines sent by the radio (radio → bridge)
//!
//! # Format
//! - Final result codes: `OK`, `ERROR`
//! - Notifications: `+PREFIX: arg1,arg2,...`
//! - Terminator: CRLF
//!
//! # Known notifications
//! - `+GMI:` / `+GMM:` / `+GMR:` / `+GSN:` - manufacturer, model, firmware, serial
//! - `+WGAV:` - volume (0-31)
//! - `+WGCHS:` - current zone and channel
//! - `+WHZS:` - current zone
//! - `+WGPTT:` - PTT state (0 idle, 1 voice, 2 voice+data) and data timer
//! - `+WGPOW:` - power state (0-5)
//! - `+WGSCAN:` / `+WGDUP:` / `+WGCSM:` / `+WGSQM:` / `+WGSSQ:` - mode flags
//! - `+WGCHSQ:` - one row of the channel/squelch table

use std::fmt;

use crate::args::{extract_payload, leading_int, split_args, unquote};
use crate::error::ParseError;

/// Highest volume step the radio reports
pub const MAX_VOLUME: i64 = 31;

/// One entry of the radio's channel/squelch table
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    /// Zone number
    pub zone: u8,
    /// Channel number within the zone
    pub channel: u8,
    /// Receive frequency in MHz
    pub rx_mhz: f32,
    /// Transmit frequency in MHz
    pub tx_mhz: f32,
    /// Channel label (may be empty)
    pub label: String,
}

/// A parsed line from the radio
#[derive(Debug, Clone, PartialEq)]
pub enum AtNotification {
    /// Final result code `OK`
    Ok,
    /// Final result code `ERROR`
    Error,
    /// `+GMI: <manufacturer>`
    Manufacturer(String),
    /// `+GMM: <model>`
    Model(String),
    /// `+GMR: <firmware>`
    Firmware(String),
    /// `+GSN: <serial>`
    Serial(String),
    /// `+WGAV: <volume>`, clamped to 0..=31
    Volume(u8),
    /// `+WGCHS: <zone>,<channel>`
    ZoneChannel { zone: u8, channel: u8 },
    /// `+WHZS: <zone>`
    Zone(u8),
    /// `+WGPTT: <state>[,<timer>]`
    Ptt { state: u8, timer: u32 },
    /// `+WGPOW: <state>`
    Power(u8),
    /// `+WGSCAN: <0|1>`
    Scan(bool),
    /// `+WGDUP: <0|1>`
    Duplex(bool),
    /// `+WGCSM: <0|1>`
    SilentMemory(bool),
    /// `+WGSQM: <0|1>`
    QuietMemory(bool),
    /// `+WGSSQ: <0|1>`
    QuietMode(bool),
    /// `+WGCHSQ: <zone>,<channel>,<rx>,<tx>,"<label>"`
    ChannelEntry(ChannelEntry),
    /// Any other `+` notification, kept verbatim
    Other(String),
    /// A line that is neither a result code nor a notification (e.g. command echo)
    Unrecognized(String),
}

fn int_arg(prefix: &'static str, field: &str) -> Result<i64, ParseError> {
    leading_int(field).ok_or_else(|| ParseError::InvalidNumber {
        prefix,
        value: field.to_string(),
    })
}

fn byte_arg(prefix: &'static str, field: &str) -> Result<u8, ParseError> {
    let value = int_arg(prefix, field)?;
    u8::try_from(value).map_err(|_| ParseError::OutOfRange { prefix, value })
}

fn flag_arg(prefix: &'static str, payload: &str) -> Result<bool, ParseError> {
    Ok(int_arg(prefix, payload)? != 0)
}

fn args<'a>(line: &'a str, prefix: &'static str) -> Result<Vec<&'a str>, ParseError> {
    let payload = extract_payload(line, prefix).unwrap_or_default();
    let fields = split_args(payload);
    if fields.is_empty() {
        return Err(ParseError::MissingPayload(prefix));
    }
    Ok(fields)
}

impl AtNotification {
    /// Parse a single line (without its CRLF terminator)
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        match line {
            "OK" => return Ok(Self::Ok),
            "ERROR" => return Ok(Self::Error),
            _ => {}
        }

        if !line.starts_with('+') {
            return Ok(Self::Unrecognized(line.to_string()));
        }

        let (prefix, _) = line.split_once(':').unwrap_or((line, ""));

        let notification = match prefix {
            "+GMI" => Self::Manufacturer(text_payload(line, "+GMI:")),
            "+GMM" => Self::Model(text_payload(line, "+GMM:")),
            "+GMR" => Self::Firmware(text_payload(line, "+GMR:")),
            "+GSN" => Self::Serial(text_payload(line, "+GSN:")),
            "+WGAV" => {
                let fields = args(line, "+WGAV:")?;
                let volume = int_arg("+WGAV:", fields[0])?.clamp(0, MAX_VOLUME);
                Self::Volume(volume as u8)
            }
            "+WGCHS" => {
                let fields = args(line, "+WGCHS:")?;
                if fields.len() < 2 {
                    return Err(ParseError::MissingPayload("+WGCHS:"));
                }
                Self::ZoneChannel {
                    zone: byte_arg("+WGCHS:", fields[0])?,
                    channel: byte_arg("+WGCHS:", fields[1])?,
                }
            }
            "+WHZS" => {
                let fields = args(line, "+WHZS:")?;
                Self::Zone(byte_arg("+WHZS:", fields[0])?)
            }
            "+WGPTT" => {
                let fields = args(line, "+WGPTT:")?;
                let state = byte_arg("+WGPTT:", fields[0])?;
                let timer = fields
                    .get(1)
                    .and_then(|f| leading_int(f))
                    .and_then(|t| u32::try_from(t).ok())
                    .unwrap_or(0);
                Self::Ptt { state, timer }
            }
            "+WGPOW" => {
                let fields = args(line, "+WGPOW:")?;
                Self::Power(byte_arg("+WGPOW:", fields[0])?)
            }
            "+WGSCAN" => Self::Scan(flag_arg("+WGSCAN:", args(line, "+WGSCAN:")?[0])?),
            "+WGDUP" => Self::Duplex(flag_arg("+WGDUP:", args(line, "+WGDUP:")?[0])?),
            "+WGCSM" => Self::SilentMemory(flag_arg("+WGCSM:", args(line, "+WGCSM:")?[0])?),
            "+WGSQM" => Self::QuietMemory(flag_arg("+WGSQM:", args(line, "+WGSQM:")?[0])?),
            "+WGSSQ" => Self::QuietMode(flag_arg("+WGSSQ:", args(line, "+WGSSQ:")?[0])?),
            "+WGCHSQ" => Self::ChannelEntry(parse_channel_entry(line)?),
            _ => Self::Other(line.to_string()),
        };

        Ok(notification)
    }

    /// Encode as wire bytes, CRLF terminated
    pub fn encode(&self) -> Vec<u8> {
        format!("{}\r\n", self).into_bytes()
    }
}

fn text_payload(line: &str, prefix: &str) -> String {
    extract_payload(line, prefix).unwrap_or_default().to_string()
}

fn parse_channel_entry(line: &str) -> Result<ChannelEntry, ParseError> {
    const PREFIX: &str = "+WGCHSQ:";
    let fields = args(line, PREFIX)?;
    if fields.len() < 2 {
        return Err(ParseError::MissingPayload(PREFIX));
    }

    let zone = byte_arg(PREFIX, fields[0])?;
    let channel = byte_arg(PREFIX, fields[1])?;

    let (rx_mhz, tx_mhz) = if fields.len() >= 4 {
        (
            fields[2].parse::<f32>().unwrap_or(0.0),
            fields[3].parse::<f32>().unwrap_or(0.0),
        )
    } else {
        (0.0, 0.0)
    };

    // The label is always the last field, whatever precedes it
    let label = fields.last().map(|f| unquote(f)).unwrap_or_default();

    Ok(ChannelEntry {
        zone,
        channel,
        rx_mhz,
        tx_mhz,
        label: label.to_string(),
    })
}

impl fmt::Display for AtNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::Manufacturer(s) => write!(f, "+GMI: {}", s),
            Self::Model(s) => write!(f, "+GMM: {}", s),
            Self::Firmware(s) => write!(f, "+GMR: {}", s),
            Self::Serial(s) => write!(f, "+GSN: {}", s),
            Self::Volume(v) => write!(f, "+WGAV: {}", v),
            Self::ZoneChannel { zone, channel } => write!(f, "+WGCHS: {},{}", zone, channel),
            Self::Zone(zone) => write!(f, "+WHZS: {}", zone),
            Self::Ptt { state, timer } => write!(f, "+WGPTT: {},{}", state, timer),
            Self::Power(state) => write!(f, "+WGPOW: {}", state),
            Self::Scan(on) => write!(f, "+WGSCAN: {}", u8::from(*on)),
            Self::Duplex(on) => write!(f, "+WGDUP: {}", u8::from(*on)),
            Self::SilentMemory(on) => write!(f, "+WGCSM: {}", u8::from(*on)),
            Self::QuietMemory(on) => write!(f, "+WGSQM: {}", u8::from(*on)),
            Self::QuietMode(on) => write!(f, "+WGSSQ: {}", u8::from(*on)),
            Self::ChannelEntry(e) => write!(
                f,
                "+WGCHSQ: {},{},{:.3},{:.3},\"{}\"",
                e.zone, e.channel, e.rx_mhz, e.tx_mhz, e.label
            ),
            Self::Other(line) | Self::Unrecognized(line) => write!(f, "{}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_codes() {
        assert_eq!(AtNotification::parse("OK"), Ok(AtNotification::Ok));
        assert_eq!(AtNotification::parse("ERROR"), Ok(AtNotification::Error));
        assert_eq!(AtNotification::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_identity() {
        assert_eq!(
            AtNotification::parse("+GMI: Motorola Solutions "),
            Ok(AtNotification::Manufacturer("Motorola Solutions".into()))
        );
        assert_eq!(
            AtNotification::parse("+GSN:XRS123"),
            Ok(AtNotification::Serial("XRS123".into()))
        );
    }

    #[test]
    fn test_parse_volume_clamps() {
        assert_eq!(AtNotification::parse("+WGAV: 12"), Ok(AtNotification::Volume(12)));
        assert_eq!(AtNotification::parse("+WGAV: 99"), Ok(AtNotification::Volume(31)));
        assert_eq!(AtNotification::parse("+WGAV: -3"), Ok(AtNotification::Volume(0)));
        assert!(AtNotification::parse("+WGAV: loud").is_err());
    }

    #[test]
    fn test_parse_zone_channel() {
        assert_eq!(
            AtNotification::parse("+WGCHS: 2,40"),
            Ok(AtNotification::ZoneChannel { zone: 2, channel: 40 })
        );
        assert_eq!(AtNotification::parse("+WHZS: 3"), Ok(AtNotification::Zone(3)));
        assert_eq!(
            AtNotification::parse("+WGCHS: 2"),
            Err(ParseError::MissingPayload("+WGCHS:"))
        );
    }

    #[test]
    fn test_parse_ptt_with_and_without_timer() {
        assert_eq!(
            AtNotification::parse("+WGPTT: 2,15"),
            Ok(AtNotification::Ptt { state: 2, timer: 15 })
        );
        assert_eq!(
            AtNotification::parse("+WGPTT: 1"),
            Ok(AtNotification::Ptt { state: 1, timer: 0 })
        );
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(AtNotification::parse("+WGSCAN: 1"), Ok(AtNotification::Scan(true)));
        assert_eq!(AtNotification::parse("+WGDUP: 0"), Ok(AtNotification::Duplex(false)));
        assert_eq!(
            AtNotification::parse("+WGCSM: 1"),
            Ok(AtNotification::SilentMemory(true))
        );
        assert_eq!(
            AtNotification::parse("+WGSQM: 2"),
            Ok(AtNotification::QuietMemory(true))
        );
        assert_eq!(AtNotification::parse("+WGSSQ: 0"), Ok(AtNotification::QuietMode(false)));
    }

    #[test]
    fn test_parse_channel_entry() {
        let parsed = AtNotification::parse("+WGCHSQ: 1,40,476.425,476.425,\"CH40\"").unwrap();
        assert_eq!(
            parsed,
            AtNotification::ChannelEntry(ChannelEntry {
                zone: 1,
                channel: 40,
                rx_mhz: 476.425,
                tx_mhz: 476.425,
                label: "CH40".into(),
            })
        );
    }

    #[test]
    fn test_parse_channel_entry_without_frequencies() {
        let parsed = AtNotification::parse("+WGCHSQ: 3,7").unwrap();
        let AtNotification::ChannelEntry(entry) = parsed else {
            panic!("expected channel entry");
        };
        assert_eq!(entry.zone, 3);
        assert_eq!(entry.channel, 7);
        assert_eq!(entry.rx_mhz, 0.0);
        // With only two fields the last one doubles as the label
        assert_eq!(entry.label, "7");
    }

    #[test]
    fn test_parse_other_notifications() {
        assert_eq!(
            AtNotification::parse("+WGMSG: \"hello\""),
            Ok(AtNotification::Other("+WGMSG: \"hello\"".into()))
        );
        assert_eq!(
            AtNotification::parse("AT+GMI?"),
            Ok(AtNotification::Unrecognized("AT+GMI?".into()))
        );
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(AtNotification::Volume(7).to_string(), "+WGAV: 7");
        assert_eq!(
            AtNotification::ZoneChannel { zone: 1, channel: 40 }.encode(),
            b"+WGCHS: 1,40\r\n"
        );
        assert_eq!(AtNotification::Scan(true).to_string(), "+WGSCAN: 1");
    }
}
