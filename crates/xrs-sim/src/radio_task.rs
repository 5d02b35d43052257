//! Virtual radio actor task
//!
//! Owns a [`VirtualXrsRadio`] on one end of an async stream (usually half of
//! `tokio::io::duplex()`). The task:
//! - reads AT command lines from the stream and writes the radio's answers
//! - applies front-panel actions from a command channel
//! - reports every command it accepted on a broadcast channel

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use xrs_protocol::{AtCodec, AtCommand};

use crate::VirtualXrsRadio;

/// Front-panel actions for a running virtual radio
#[derive(Debug, Clone)]
pub enum VirtualRadioCommand {
    /// Key or release PTT
    Ptt { state: u8, timer: u32 },
    /// Change power state
    Power(u8),
    /// Turn the volume knob
    Volume(u8),
    /// Change channel
    Channel { zone: u8, channel: u8 },
    /// Stop the task
    Shutdown,
}

async fn flush_output<S>(stream: &mut S, radio: &mut VirtualXrsRadio) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    if !radio.has_output() {
        return Ok(());
    }
    while let Some(notification) = radio.take_output() {
        stream.write_all(&notification.encode()).await?;
    }
    stream.flush().await
}

/// Run the virtual radio until the stream closes or shutdown is requested
///
/// Returns the radio so callers can inspect its final state.
pub async fn run_virtual_radio_task<S>(
    mut stream: S,
    mut radio: VirtualXrsRadio,
    mut cmd_rx: mpsc::Receiver<VirtualRadioCommand>,
    command_tx: broadcast::Sender<AtCommand>,
) -> io::Result<VirtualXrsRadio>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = AtCodec::new();
    let mut buf = [0u8; 1024];

    info!("Starting virtual radio task");

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual radio stream closed");
                        break;
                    }
                    Ok(n) => {
                        codec.push_bytes(&buf[..n]);
                        while let Some(line) = codec.next_line() {
                            if let Some(command) = radio.handle_line(&line) {
                                let _ = command_tx.send(command);
                            }
                        }
                        flush_output(&mut stream, &mut radio).await?;
                    }
                    Err(e) => {
                        warn!("Virtual radio stream error: {}", e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualRadioCommand::Ptt { state, timer }) => radio.set_ptt(state, timer),
                    Some(VirtualRadioCommand::Power(state)) => radio.set_power(state),
                    Some(VirtualRadioCommand::Volume(volume)) => radio.turn_volume(volume),
                    Some(VirtualRadioCommand::Channel { zone, channel }) => {
                        radio.change_channel(zone, channel)
                    }
                    Some(VirtualRadioCommand::Shutdown) | None => {
                        info!("Shutdown requested for virtual radio");
                        break;
                    }
                }
                flush_output(&mut stream, &mut radio).await?;
            }
        }
    }

    info!("Virtual radio task ended");
    Ok(radio)
}
