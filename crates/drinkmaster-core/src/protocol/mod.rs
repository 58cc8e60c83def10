//! Dispenser Controller Protocol
//!
//! Implements the frame format and line-based acknowledgement handshake used
//! to hand a pour list to the dispenser's embedded controller.
//!
//! The host writes one binary frame, then the controller answers with a
//! `received` line once it has parsed the frame and a `done` line once the
//! pour is finished. Anything else it prints is treated as debug output.

mod config;
mod diagnostics;
mod error;
mod frame;
pub mod handshake;
pub mod serial;
mod transport;

pub use config::{LinkSettings, TransportConfig};
pub use diagnostics::Diagnostics;
pub use error::{ConfigError, FrameError, TransportError};
pub use frame::{Frame, FrameBuilder};
pub use handshake::{Handshake, HandshakeOutcome, HandshakeState};
pub use serial::{list_ports, PortInfo};
pub use transport::{LineTransport, LinkOpener, SerialOpener, SerialTransport};

/// Default baud rate of the controller's UART
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default bound for a single `read_line` call in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default overall handshake deadline in milliseconds.
/// Covers both the `received` and the `done` acknowledgement.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 60_000;

/// Separator after every frame entry, and end-of-frame marker
pub const FRAME_SENTINEL: u8 = 0xFF;

/// Line sent by the controller once the frame has been parsed
pub const RECEIVED_TOKEN: &str = "received";

/// Line sent by the controller once dispensing has finished
pub const DONE_TOKEN: &str = "done";

/// Number of controller lines kept for failure reports
pub const DIAGNOSTIC_CAPACITY: usize = 10;
