//! Dispense errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{ConfigError, Diagnostics, TransportError};

/// Failure of a "send frame" request, as reported to the service boundary
#[derive(Error, Debug)]
pub enum DispenseError {
    /// Link settings were missing or invalid; nothing was sent
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The serial link failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No `received` before the deadline
    #[error("Controller did not acknowledge the frame in time (last output: {diagnostics})")]
    ReceivedTimeout {
        /// Last controller lines
        diagnostics: Diagnostics,
    },

    /// `received` but no `done` before the deadline
    #[error("Controller did not finish dispensing in time (last output: {diagnostics})")]
    DoneTimeout {
        /// Last controller lines
        diagnostics: Diagnostics,
    },

    /// The caller's cancellation token fired
    #[error("Dispense cancelled")]
    Cancelled {
        /// Last controller lines
        diagnostics: Diagnostics,
    },

    /// The blocking worker panicked or was aborted
    #[error("Dispense worker failed: {0}")]
    Worker(String),
}

/// User-visible failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Link parameters missing or unusable
    Configuration,
    /// Wire disconnected or port unusable
    Transport,
    /// Controller never acknowledged the frame
    NeverStarted,
    /// Controller acknowledged but never finished; may have poured partially
    Stalled,
    /// Caller gave up before a terminal answer
    Cancelled,
    /// Bug or runtime failure inside the core
    Internal,
}

impl DispenseError {
    /// Category reported to the caller
    pub fn kind(&self) -> FailureKind {
        match self {
            DispenseError::Config(_) => FailureKind::Configuration,
            DispenseError::Transport(_) => FailureKind::Transport,
            DispenseError::ReceivedTimeout { .. } => FailureKind::NeverStarted,
            DispenseError::DoneTimeout { .. } => FailureKind::Stalled,
            DispenseError::Cancelled { .. } => FailureKind::Cancelled,
            DispenseError::Worker(_) => FailureKind::Internal,
        }
    }

    /// Controller output captured before the failure, if any
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            DispenseError::ReceivedTimeout { diagnostics }
            | DispenseError::DoneTimeout { diagnostics }
            | DispenseError::Cancelled { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }

    /// Whether sending the whole frame again may succeed without operator action.
    ///
    /// Stalled and cancelled pours are not retryable: the controller may
    /// already have dispensed part of the drink.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Transport | FailureKind::NeverStarted
        )
    }
}
