//! XRS Radio AT Protocol Library
//!
//! This crate provides parsing and encoding for the line-oriented AT
//! protocol spoken by XRS two-way radios over a Bluetooth SPP link.
//!
//! # Architecture
//!
//! - [`AtCodec`] frames the incoming byte stream into lines
//! - [`AtNotification`] is a parsed line from the radio (radio → bridge)
//! - [`AtCommand`] is a command for the radio (bridge → radio)
//! - [`args`] holds the payload helpers shared by both directions
//!
//! # Example
//!
//! ```rust
//! use xrs_protocol::{AtCodec, AtCommand, AtNotification};
//!
//! let mut codec = AtCodec::new();
//! codec.push_bytes(b"+WGCHS: 1,40\r\n");
//! assert_eq!(
//!     codec.next_notification(),
//!     Some(AtNotification::ZoneChannel { zone: 1, channel: 40 })
//! );
//!
//! assert_eq!(AtCommand::SetVolume(10).encode(), b"AT+WGAV=10\r\n");
//! ```

pub mod args;
pub mod codec;
pub mod command;
pub mod error;
pub mod notification;

pub use codec::AtCodec;
pub use command::{AtCommand, CHANNEL_RANGE, ZONE_RANGE};
pub use error::ParseError;
pub use notification::{AtNotification, ChannelEntry, MAX_VOLUME};
