//! Streaming line framer for the radio link
//!
//! Bytes arrive in arbitrary chunks from the serial/SPP link. The codec
//! buffers them and yields complete lines; `\r` is dropped and empty lines
//! are skipped.

use crate::error::ParseError;
use crate::notification::AtNotification;

/// Maximum line length (reasonable limit to prevent buffer overflow)
const MAX_LINE_LEN: usize = 256;

/// Streaming CRLF line codec
///
/// A line longer than the limit is dropped whole, up to its terminator.
#[derive(Debug)]
pub struct AtCodec {
    buffer: Vec<u8>,
    /// Bytes of the unterminated line at the end of `buffer`
    partial: usize,
    /// Skipping the rest of an overlong line
    discarding: bool,
}

impl AtCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
            partial: 0,
            discarding: false,
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            match byte {
                b'\r' => {}
                b'\n' if self.discarding => self.discarding = false,
                _ if self.discarding => {}
                b'\n' => {
                    self.buffer.push(byte);
                    self.partial = 0;
                }
                _ => {
                    self.buffer.push(byte);
                    self.partial += 1;
                    if self.partial > MAX_LINE_LEN {
                        tracing::warn!("Dropping radio line longer than {} bytes", MAX_LINE_LEN);
                        self.buffer.truncate(self.buffer.len() - self.partial);
                        self.partial = 0;
                        self.discarding = true;
                    }
                }
            }
        }
    }

    /// Try to extract the next complete, non-empty line
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let term_pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let line_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]);
            if !line.trim().is_empty() {
                return Some(line.into_owned());
            }
        }
    }

    /// Try to extract and parse the next line
    ///
    /// Lines that fail to parse are returned as [`AtNotification::Unrecognized`].
    pub fn next_notification(&mut self) -> Option<AtNotification> {
        let line = self.next_line()?;
        match AtNotification::parse(&line) {
            Ok(notification) => Some(notification),
            Err(ParseError::Empty) => None,
            Err(e) => {
                tracing::warn!("Failed to parse radio line {:?}: {}", line, e);
                Some(AtNotification::Unrecognized(line))
            }
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.partial = 0;
        self.discarding = false;
    }
}

impl Default for AtCodec {
    fn default() -> Self {
        Self::new()
    }
}
