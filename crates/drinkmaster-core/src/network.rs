//! Deferred network disconnect
//!
//! After the operator joins a Wi-Fi network the machine drops it again after
//! a fixed period. Only one disconnect may be pending: arming the timer again
//! replaces the earlier deadline instead of stacking a second one.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How long a joined network stays connected
pub const DISCONNECT_AFTER: Duration = Duration::from_secs(60 * 60 * 12);

/// Owner of the single pending disconnect action
#[derive(Debug, Default)]
pub struct DisconnectTimer {
    pending: Option<JoinHandle<()>>,
}

impl DisconnectTimer {
    /// Timer with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, cancelling any previously armed action.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.cancel() {
            debug!("replacing pending network disconnect");
        }

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("disconnect timer elapsed, dropping network");
            action();
        }));
    }

    /// Arm with the default [`DISCONNECT_AFTER`] delay
    pub fn arm_default<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm(DISCONNECT_AFTER, action);
    }

    /// Cancel the pending action. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether an action is armed and has not run yet
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DisconnectTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
