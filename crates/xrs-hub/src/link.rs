//! Async byte link to the radio
//!
//! The radio is reached over Bluetooth SPP, which the host exposes as a
//! serial device (`/dev/rfcommN`, `COMn`). A [`RadioLink`] frames incoming
//! bytes into lines for the hub actor and writes outgoing AT commands.
//!
//! Generic over the I/O type so tests can use `tokio::io::duplex()` in place
//! of a serial port. [`run_serial_link`] keeps reopening the port with
//! exponential backoff for as long as the hub actor is alive.

use std::io::{self, ErrorKind};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};
use xrs_protocol::{AtCodec, AtCommand};

use crate::actor::HubInput;

/// First reconnect delay
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Reconnect delay ceiling
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Doubling reconnect delay
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }

    /// Back to the initial delay after a successful connect
    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a link session ended
#[derive(Debug)]
pub enum LinkExit {
    /// The radio closed the connection
    Closed,
    /// Read or write failed
    Failed(io::Error),
    /// The hub actor is gone
    Shutdown,
}

/// One connected session with the radio
pub struct RadioLink<T> {
    name: String,
    io: T,
    codec: AtCodec,
    buffer: Vec<u8>,
}

impl RadioLink<SerialStream> {
    /// Open a serial (or rfcomm) port
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, tokio_serial::Error> {
        let stream = tokio_serial::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        Ok(Self::new(port_name, stream))
    }
}

impl<T> RadioLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, io: T) -> Self {
        Self {
            name: name.into(),
            io,
            codec: AtCodec::new(),
            buffer: vec![0u8; 1024],
        }
    }

    /// Write one command, CRLF terminated
    pub async fn write_command(&mut self, command: &AtCommand) -> io::Result<()> {
        debug!("TX {}: {}", self.name, command);
        self.io.write_all(&command.encode()).await?;
        self.io.flush().await
    }

    /// Run the session until the link drops or the hub actor goes away
    ///
    /// Sends [`HubInput::LinkUp`] on entry and [`HubInput::LinkDown`] on exit.
    pub async fn run(
        mut self,
        hub_tx: &mpsc::Sender<HubInput>,
        at_rx: &mut mpsc::Receiver<AtCommand>,
    ) -> LinkExit {
        info!("Link {} up", self.name);
        if hub_tx.send(HubInput::LinkUp).await.is_err() {
            return LinkExit::Shutdown;
        }

        let exit = loop {
            tokio::select! {
                command = at_rx.recv() => {
                    let Some(command) = command else {
                        break LinkExit::Shutdown;
                    };
                    if let Err(e) = self.write_command(&command).await {
                        warn!("Write error on {}: {}", self.name, e);
                        break LinkExit::Failed(e);
                    }
                }

                result = self.io.read(&mut self.buffer) => {
                    match result {
                        Ok(0) => break LinkExit::Closed,
                        Ok(n) => {
                            self.codec.push_bytes(&self.buffer[..n]);
                            let mut hub_gone = false;
                            while let Some(line) = self.codec.next_line() {
                                if hub_tx.send(HubInput::Line(line)).await.is_err() {
                                    hub_gone = true;
                                    break;
                                }
                            }
                            if hub_gone {
                                break LinkExit::Shutdown;
                            }
                        }
                        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                        Err(e) => {
                            warn!("Read error on {}: {}", self.name, e);
                            break LinkExit::Failed(e);
                        }
                    }
                }
            }
        };

        info!("Link {} down: {:?}", self.name, exit);
        let _ = hub_tx.send(HubInput::LinkDown).await;
        exit
    }
}

/// Keep a serial link open, reconnecting with backoff
///
/// Returns once the hub actor has shut down.
pub async fn run_serial_link(
    port_name: String,
    baud_rate: u32,
    hub_tx: mpsc::Sender<HubInput>,
    mut at_rx: mpsc::Receiver<AtCommand>,
) {
    let mut backoff = Backoff::new();

    loop {
        match RadioLink::open(&port_name, baud_rate) {
            Ok(link) => {
                backoff.reset();
                if let LinkExit::Shutdown = link.run(&hub_tx, &mut at_rx).await {
                    break;
                }
            }
            Err(e) => warn!("Failed to open {}: {}", port_name, e),
        }

        let delay = backoff.next_delay();
        info!("Reconnecting to {} in {:?}", port_name, delay);
        if !wait_offline(delay, &mut at_rx).await {
            break;
        }
    }

    info!("Link supervisor for {} stopped", port_name);
}

/// Sleep while discarding commands; false if the command queue closed
async fn wait_offline(delay: Duration, at_rx: &mut mpsc::Receiver<AtCommand>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = at_rx.recv() => match command {
                Some(command) => debug!("Link down, dropping {}", command),
                None => return false,
            },
        }
    }
}
