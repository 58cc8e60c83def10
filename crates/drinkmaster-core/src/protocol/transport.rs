//! Line-oriented link to the controller
//!
//! The controller is half-duplex from the host's point of view: one frame
//! goes out, then newline-terminated text comes back.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::serial::{clear_input, configure_port, open_port};
use super::{LinkSettings, TransportError};

/// Longest run of bytes without a newline before it is discarded
const MAX_PENDING_BYTES: usize = 4096;

/// Byte link the handshake runs over
pub trait LineTransport {
    /// Write the whole frame and block until it has been handed to the driver
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read the next complete line, without its terminator.
    ///
    /// Returns `Ok(None)` when no full line arrived within the per-call
    /// timeout or before `deadline`, whichever comes first. Partial lines
    /// are never returned.
    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, TransportError>;
}

impl<T: LineTransport + ?Sized> LineTransport for &mut T {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, TransportError> {
        (**self).read_line(deadline)
    }
}

impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, TransportError> {
        (**self).read_line(deadline)
    }
}

/// Serial link held open for one handshake. The port closes on drop.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    port_name: String,
    read_timeout: Duration,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open and configure the port described by `settings`
    pub fn open(settings: &LinkSettings) -> Result<Self, TransportError> {
        let mut port = open_port(settings)?;
        configure_port(port.as_mut())?;
        clear_input(port.as_mut())?;

        info!(
            port = %settings.port_name,
            baud = settings.baud_rate,
            "serial link open"
        );

        Ok(Self::from_port(
            port,
            settings.port_name.clone(),
            settings.read_timeout,
        ))
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPort>, port_name: String, read_timeout: Duration) -> Self {
        Self {
            port,
            port_name,
            read_timeout,
            pending: Vec::new(),
        }
    }

    /// Name the port was opened under
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }
}

impl LineTransport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes).map_err(TransportError::Write)?;
        self.port.flush().map_err(TransportError::Write)?;
        debug!(port = %self.port_name, bytes = bytes.len(), "frame written");
        Ok(())
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, TransportError> {
        let call_deadline = (Instant::now() + self.read_timeout).min(deadline);
        let mut chunk = [0u8; 64];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= call_deadline {
                return Ok(None);
            }
            self.port
                .set_timeout(call_deadline - now)
                .map_err(TransportError::Configure)?;

            let Some(n) = read_chunk(self.port.as_mut(), &mut chunk)? else {
                return Ok(None);
            };
            self.pending.extend_from_slice(&chunk[..n]);
            if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
                warn!(
                    port = %self.port_name,
                    bytes = self.pending.len(),
                    "discarding unterminated controller output"
                );
                self.pending.clear();
            }
        }
    }
}

/// One read from the device; `None` when the read timed out.
///
/// A zero-length read means the device went away (USB unplug, closed pty).
fn read_chunk<R>(reader: &mut R, chunk: &mut [u8]) -> Result<Option<usize>, TransportError>
where
    R: Read + ?Sized,
{
    loop {
        match reader.read(chunk) {
            Ok(0) => {
                return Err(TransportError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial device closed",
                )))
            }
            Ok(n) => return Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::Read(e)),
        }
    }
}

/// Opens the link for one dispense.
///
/// [`crate::dispense::DispenseQueue`] calls this once per queued frame, on the
/// blocking thread pool, while it holds the link.
pub trait LinkOpener: Send + Sync + 'static {
    /// Transport produced for one handshake
    type Transport: LineTransport;

    /// Open the link described by `settings`
    fn open(&self, settings: &LinkSettings) -> Result<Self::Transport, TransportError>;
}

/// Opens real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl LinkOpener for SerialOpener {
    type Transport = SerialTransport;

    fn open(&self, settings: &LinkSettings) -> Result<SerialTransport, TransportError> {
        SerialTransport::open(settings)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        debug!(port = %self.port_name, "closing serial link");
    }
}
