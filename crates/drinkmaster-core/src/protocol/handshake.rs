//! Send/acknowledge handshake
//!
//! After the frame is written the controller must print `received`, then
//! `done`, both before one shared deadline taken when the handshake starts.
//! A late `received` therefore leaves less time for `done`; the shared
//! deadline bounds how long a single pour can hold the machine.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{Diagnostics, LineTransport, TransportError, DONE_TOKEN, RECEIVED_TOKEN};
use crate::error::DispenseError;

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Nothing sent yet
    Idle,
    /// Frame written and flushed
    Sent,
    /// Waiting for `received`
    AwaitingReceived,
    /// Waiting for `done`
    AwaitingDone,
    /// Controller finished the pour
    Confirmed,
    /// Deadline passed without `received`
    ReceivedTimeoutFailure,
    /// Deadline passed after `received` but without `done`
    DoneTimeoutFailure,
    /// Link fault
    TransportFailure,
    /// Cancellation token fired
    Cancelled,
}

impl HandshakeState {
    /// True once the handshake can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::Confirmed
                | HandshakeState::ReceivedTimeoutFailure
                | HandshakeState::DoneTimeoutFailure
                | HandshakeState::TransportFailure
                | HandshakeState::Cancelled
        )
    }
}

/// Terminal outcome of one handshake attempt
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// `received` then `done` arrived in time
    Confirmed,
    /// No `received` before the deadline; the pour never started
    ReceivedTimeout(Diagnostics),
    /// `received` arrived but `done` did not; the pour may be partial
    DoneTimeout(Diagnostics),
    /// The cancellation token fired first
    Cancelled(Diagnostics),
    /// Writing or reading the link failed
    TransportError(TransportError),
}

impl HandshakeOutcome {
    /// True for [`HandshakeOutcome::Confirmed`]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, HandshakeOutcome::Confirmed)
    }

    /// Map failures onto [`DispenseError`]
    pub fn into_result(self) -> Result<(), DispenseError> {
        match self {
            HandshakeOutcome::Confirmed => Ok(()),
            HandshakeOutcome::ReceivedTimeout(diagnostics) => {
                Err(DispenseError::ReceivedTimeout { diagnostics })
            }
            HandshakeOutcome::DoneTimeout(diagnostics) => {
                Err(DispenseError::DoneTimeout { diagnostics })
            }
            HandshakeOutcome::Cancelled(diagnostics) => {
                Err(DispenseError::Cancelled { diagnostics })
            }
            HandshakeOutcome::TransportError(e) => Err(DispenseError::Transport(e)),
        }
    }
}

/// One send/acknowledge exchange with the controller
#[derive(Debug)]
pub struct Handshake {
    timeout: Duration,
    state: HandshakeState,
    diagnostics: Diagnostics,
    cancel: Option<CancellationToken>,
}

impl Handshake {
    /// Handshake whose deadline is `timeout` after it starts
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: HandshakeState::Idle,
            diagnostics: Diagnostics::new(),
            cancel: None,
        }
    }

    /// Allow an external token to end the wait early.
    /// The token is checked between reads, so a read in progress finishes first.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Current state, terminal after [`Handshake::run`] returns
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Most recent controller lines seen by the last run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Send `frame` and wait for both acknowledgements.
    ///
    /// Runs to a terminal state exactly once; nothing is retried.
    pub fn run<T>(&mut self, transport: &mut T, frame: &[u8]) -> HandshakeOutcome
    where
        T: LineTransport + ?Sized,
    {
        self.state = HandshakeState::Idle;
        self.diagnostics.clear();

        let started = Instant::now();
        let deadline = started + self.timeout;

        if let Err(e) = transport.send(frame) {
            return self.transport_failure(e);
        }
        self.transition(HandshakeState::Sent);
        self.transition(HandshakeState::AwaitingReceived);

        while Instant::now() < deadline {
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                self.transition(HandshakeState::Cancelled);
                warn!(diagnostics = %self.diagnostics, "handshake cancelled");
                return HandshakeOutcome::Cancelled(self.diagnostics.clone());
            }

            let raw = match transport.read_line(deadline) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => return self.transport_failure(e),
            };
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            self.diagnostics.push(line);

            match self.state {
                HandshakeState::AwaitingReceived if line.eq_ignore_ascii_case(RECEIVED_TOKEN) => {
                    self.transition(HandshakeState::AwaitingDone);
                }
                HandshakeState::AwaitingDone if line.eq_ignore_ascii_case(DONE_TOKEN) => {
                    self.transition(HandshakeState::Confirmed);
                    info!(elapsed_ms = started.elapsed().as_millis() as u64, "dispense confirmed");
                    return HandshakeOutcome::Confirmed;
                }
                _ => trace!(line, "controller output"),
            }
        }

        let diagnostics = self.diagnostics.clone();
        if self.state == HandshakeState::AwaitingReceived {
            self.transition(HandshakeState::ReceivedTimeoutFailure);
            warn!(%diagnostics, "controller never acknowledged the frame");
            HandshakeOutcome::ReceivedTimeout(diagnostics)
        } else {
            self.transition(HandshakeState::DoneTimeoutFailure);
            warn!(%diagnostics, "controller did not report completion");
            HandshakeOutcome::DoneTimeout(diagnostics)
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!(from = ?self.state, to = ?next, "handshake transition");
        self.state = next;
    }

    fn transport_failure(&mut self, e: TransportError) -> HandshakeOutcome {
        self.transition(HandshakeState::TransportFailure);
        warn!(error = %e, "serial link failed during handshake");
        HandshakeOutcome::TransportError(e)
    }
}
