//! Commands sent to the radio (bridge → radio)
//!
//! Commands are ASCII lines terminated by CRLF. Queries end with `?`,
//! settings use `=`.

use std::fmt;

use crate::args::{leading_int, split_args};
use crate::error::ParseError;
use crate::notification::MAX_VOLUME;

/// Valid zone numbers
pub const ZONE_RANGE: std::ops::RangeInclusive<u8> = 1..=8;

/// Valid channel numbers within a zone
pub const CHANNEL_RANGE: std::ops::RangeInclusive<u8> = 1..=255;

/// A command understood by the radio
#[derive(Debug, Clone, PartialEq)]
pub enum AtCommand {
    /// `ATE1` - enable command echo
    EchoOn,
    /// `ATV1` - verbose result codes
    VerboseOn,
    /// `AT+GMI?`
    QueryManufacturer,
    /// `AT+GMM?`
    QueryModel,
    /// `AT+GMR?`
    QueryFirmware,
    /// `AT+GSN?`
    QuerySerial,
    /// `AT+GOI?`
    QueryOwner,
    /// `AT_WGCHSQ` - dump the channel/squelch table as `+WGCHSQ:` lines
    RequestChannelTable,
    /// `AT+WGAV=<0-31>`
    SetVolume(u8),
    /// `AT+WGSCAN=<0|1>`
    SetScan(bool),
    /// `AT+WGDUP=<0|1>`
    SetDuplex(bool),
    /// `AT+WGSSQ=<0|1>`
    SetQuietMode(bool),
    /// `AT+WGSQM=<0|1>`
    SetQuietMemory(bool),
    /// `AT+WGCSM=<0|1>`
    SetSilentMemory(bool),
    /// `AT+WGZS=<zone>`
    SelectZone(u8),
    /// `AT+WGCHS=<zone>,<channel>`
    SelectChannel { zone: u8, channel: u8 },
    /// `AT+WGTLOC=000000,<lat>,<lon>` - upload the bridge's position
    ReportLocation { latitude: f64, longitude: f64 },
}

impl AtCommand {
    /// Commands sent right after the link opens
    pub fn handshake() -> [AtCommand; 8] {
        [
            AtCommand::EchoOn,
            AtCommand::VerboseOn,
            AtCommand::QueryManufacturer,
            AtCommand::QueryModel,
            AtCommand::QueryFirmware,
            AtCommand::QuerySerial,
            AtCommand::QueryOwner,
            AtCommand::RequestChannelTable,
        ]
    }

    /// Encode as wire bytes, CRLF terminated
    pub fn encode(&self) -> Vec<u8> {
        format!("{}\r\n", self).into_bytes()
    }

    /// Parse a command line (without its CRLF terminator)
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let simple = match line {
            "ATE1" => Some(AtCommand::EchoOn),
            "ATV1" => Some(AtCommand::VerboseOn),
            "AT+GMI?" => Some(AtCommand::QueryManufacturer),
            "AT+GMM?" => Some(AtCommand::QueryModel),
            "AT+GMR?" => Some(AtCommand::QueryFirmware),
            "AT+GSN?" => Some(AtCommand::QuerySerial),
            "AT+GOI?" => Some(AtCommand::QueryOwner),
            "AT_WGCHSQ" => Some(AtCommand::RequestChannelTable),
            _ => None,
        };
        if let Some(cmd) = simple {
            return Ok(cmd);
        }

        let Some((name, params)) = line.split_once('=') else {
            return Err(ParseError::UnknownCommand(line.to_string()));
        };
        let fields = split_args(params);

        match name {
            "AT+WGAV" => {
                let v = number(&fields, 0, "AT+WGAV=")?;
                if !(0..=MAX_VOLUME).contains(&v) {
                    return Err(ParseError::OutOfRange {
                        prefix: "AT+WGAV=",
                        value: v,
                    });
                }
                Ok(AtCommand::SetVolume(v as u8))
            }
            "AT+WGSCAN" => Ok(AtCommand::SetScan(number(&fields, 0, "AT+WGSCAN=")? != 0)),
            "AT+WGDUP" => Ok(AtCommand::SetDuplex(number(&fields, 0, "AT+WGDUP=")? != 0)),
            "AT+WGSSQ" => Ok(AtCommand::SetQuietMode(number(&fields, 0, "AT+WGSSQ=")? != 0)),
            "AT+WGSQM" => Ok(AtCommand::SetQuietMemory(number(&fields, 0, "AT+WGSQM=")? != 0)),
            "AT+WGCSM" => Ok(AtCommand::SetSilentMemory(number(&fields, 0, "AT+WGCSM=")? != 0)),
            "AT+WGZS" => Ok(AtCommand::SelectZone(zone(&fields, 0, "AT+WGZS=")?)),
            "AT+WGCHS" => {
                let zone = zone(&fields, 0, "AT+WGCHS=")?;
                let ch = number(&fields, 1, "AT+WGCHS=")?;
                let channel = u8::try_from(ch)
                    .ok()
                    .filter(|c| CHANNEL_RANGE.contains(c))
                    .ok_or(ParseError::OutOfRange {
                        prefix: "AT+WGCHS=",
                        value: ch,
                    })?;
                Ok(AtCommand::SelectChannel { zone, channel })
            }
            "AT+WGTLOC" => {
                if fields.len() < 3 {
                    return Err(ParseError::MissingPayload("AT+WGTLOC="));
                }
                let coord = |field: &str| {
                    field.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                        prefix: "AT+WGTLOC=",
                        value: field.to_string(),
                    })
                };
                Ok(AtCommand::ReportLocation {
                    latitude: coord(fields[1])?,
                    longitude: coord(fields[2])?,
                })
            }
            _ => Err(ParseError::UnknownCommand(line.to_string())),
        }
    }
}

fn number(fields: &[&str], index: usize, prefix: &'static str) -> Result<i64, ParseError> {
    let field = fields
        .get(index)
        .ok_or(ParseError::MissingPayload(prefix))?;
    leading_int(field).ok_or_else(|| ParseError::InvalidNumber {
        prefix,
        value: field.to_string(),
    })
}

fn zone(fields: &[&str], index: usize, prefix: &'static str) -> Result<u8, ParseError> {
    let value = number(fields, index, prefix)?;
    u8::try_from(value)
        .ok()
        .filter(|z| ZONE_RANGE.contains(z))
        .ok_or(ParseError::OutOfRange { prefix, value })
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::EchoOn => write!(f, "ATE1"),
            AtCommand::VerboseOn => write!(f, "ATV1"),
            AtCommand::QueryManufacturer => write!(f, "AT+GMI?"),
            AtCommand::QueryModel => write!(f, "AT+GMM?"),
            AtCommand::QueryFirmware => write!(f, "AT+GMR?"),
            AtCommand::QuerySerial => write!(f, "AT+GSN?"),
            AtCommand::QueryOwner => write!(f, "AT+GOI?"),
            AtCommand::RequestChannelTable => write!(f, "AT_WGCHSQ"),
            AtCommand::SetVolume(v) => write!(f, "AT+WGAV={}", v),
            AtCommand::SetScan(on) => write!(f, "AT+WGSCAN={}", u8::from(*on)),
            AtCommand::SetDuplex(on) => write!(f, "AT+WGDUP={}", u8::from(*on)),
            AtCommand::SetQuietMode(on) => write!(f, "AT+WGSSQ={}", u8::from(*on)),
            AtCommand::SetQuietMemory(on) => write!(f, "AT+WGSQM={}", u8::from(*on)),
            AtCommand::SetSilentMemory(on) => write!(f, "AT+WGCSM={}", u8::from(*on)),
            AtCommand::SelectZone(zone) => write!(f, "AT+WGZS={}", zone),
            AtCommand::SelectChannel { zone, channel } => {
                write!(f, "AT+WGCHS={},{}", zone, channel)
            }
            AtCommand::ReportLocation {
                latitude,
                longitude,
            } => write!(f, "AT+WGTLOC=000000,{:.6},{:.6}", latitude, longitude),
        }
    }
}
