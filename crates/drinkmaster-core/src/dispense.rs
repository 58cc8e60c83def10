//! Dispense trigger
//!
//! Ties resolution, encoding and the handshake together. Building a frame is
//! pure; sending one takes the serial link for the whole handshake, so
//! concurrent callers go through [`DispenseQueue`].

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DispenseError;
use crate::model::{Inventory, RecipeLine};
use crate::protocol::{
    Frame, Handshake, LineTransport, LinkOpener, SerialOpener, TransportConfig,
};
use crate::resolver::{resolve_recipe, ResolutionReport};

/// A frame together with the resolution it was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispensePlan {
    /// Wire frame for the controller
    pub frame: Frame,
    /// How each recipe line was resolved
    pub resolution: ResolutionReport,
}

impl DispensePlan {
    /// True when every ingredient of the recipe will be poured
    pub fn is_complete(&self) -> bool {
        self.resolution.is_complete()
    }
}

/// Resolve a recipe against an inventory snapshot and encode the frame.
///
/// Ingredients without an active slot are left out of the frame and listed in
/// the plan's resolution report.
pub fn build_frame(recipe: &[RecipeLine], inventory: &Inventory) -> DispensePlan {
    let resolution = resolve_recipe(recipe, inventory);
    let frame = Frame::encode(&resolution.assignments);
    debug!(
        entries = frame.entry_count(),
        unresolved = resolution.unresolved.len(),
        "built dispense frame"
    );
    DispensePlan { frame, resolution }
}

/// Run the handshake for `frame` over an already open transport
pub fn send_over<T>(
    transport: &mut T,
    frame: &Frame,
    timeout: Duration,
    cancel: Option<CancellationToken>,
) -> Result<(), DispenseError>
where
    T: LineTransport + ?Sized,
{
    let mut handshake = Handshake::new(timeout);
    if let Some(token) = cancel {
        handshake = handshake.with_cancellation(token);
    }
    handshake.run(transport, frame.as_bytes()).into_result()
}

/// Open the configured serial link, send `frame` and wait for completion.
///
/// Configuration problems are reported before the port is touched. The port
/// is closed again on every return path.
pub fn send_frame(
    config: &TransportConfig,
    frame: &Frame,
    cancel: Option<CancellationToken>,
) -> Result<(), DispenseError> {
    send_frame_with(&SerialOpener, config, frame, cancel)
}

/// [`send_frame`] over a link produced by `opener`
pub fn send_frame_with<O>(
    opener: &O,
    config: &TransportConfig,
    frame: &Frame,
    cancel: Option<CancellationToken>,
) -> Result<(), DispenseError>
where
    O: LinkOpener + ?Sized,
{
    let settings = config.validate()?;
    let mut transport = opener.open(&settings)?;
    info!(
        port = %settings.port_name,
        entries = frame.entry_count(),
        "sending dispense frame"
    );
    send_over(&mut transport, frame, settings.handshake_timeout, cancel)
}

/// Serializes dispense requests so only one handshake owns the link at a time.
///
/// Waiters are served in arrival order. Each handshake runs on the blocking
/// thread pool.
#[derive(Debug)]
pub struct DispenseQueue<O = SerialOpener> {
    link: Arc<Mutex<TransportConfig>>,
    opener: Arc<O>,
}

impl<O> Clone for DispenseQueue<O> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
            opener: Arc::clone(&self.opener),
        }
    }
}

impl DispenseQueue {
    /// Queue dispenses over the serial port named in `config`
    pub fn new(config: TransportConfig) -> Self {
        Self::with_opener(config, SerialOpener)
    }
}

impl<O: LinkOpener> DispenseQueue<O> {
    /// Queue dispenses over links produced by `opener`
    pub fn with_opener(config: TransportConfig, opener: O) -> Self {
        Self {
            link: Arc::new(Mutex::new(config)),
            opener: Arc::new(opener),
        }
    }

    /// Replace the link configuration once any in-flight dispense finishes
    pub async fn reconfigure(&self, config: TransportConfig) {
        *self.link.lock().await = config;
    }

    /// Current link configuration
    pub async fn config(&self) -> TransportConfig {
        self.link.lock().await.clone()
    }

    /// Queue `frame` for sending and wait for the handshake outcome
    pub async fn send(&self, frame: Frame) -> Result<(), DispenseError> {
        self.send_cancellable(frame, None).await
    }

    /// Like [`DispenseQueue::send`], with a token that can end the wait early
    pub async fn send_cancellable(
        &self,
        frame: Frame,
        cancel: Option<CancellationToken>,
    ) -> Result<(), DispenseError> {
        let guard = self.link.clone().lock_owned().await;
        let opener = Arc::clone(&self.opener);

        tokio::task::spawn_blocking(move || {
            send_frame_with(opener.as_ref(), &guard, &frame, cancel)
        })
        .await
        .map_err(|e| DispenseError::Worker(e.to_string()))?
    }

    /// Build the frame for `recipe` and send it
    pub async fn dispense(
        &self,
        recipe: &[RecipeLine],
        inventory: &Inventory,
    ) -> Result<DispensePlan, DispenseError> {
        let plan = build_frame(recipe, inventory);
        self.send(plan.frame.clone()).await?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::model::{FillerAssignment, IngredientRef, SlotAssignment};

    #[test]
    fn test_build_frame_is_pure() {
        let inventory = Inventory::new(
            vec![SlotAssignment::new(2, IngredientRef::alcohol(1))],
            vec![FillerAssignment::new(8, 3)],
        );
        let recipe = vec![
            RecipeLine::new(IngredientRef::mixer(3), 120),
            RecipeLine::new(IngredientRef::alcohol(1), 40),
        ];

        let first = build_frame(&recipe, &inventory);
        let second = build_frame(&recipe, &inventory);
        assert_eq!(first, second);
        assert_eq!(first.frame.as_bytes(), &[2, 40, 0xFF, 8, 120, 0xFF, 0xFF]);
        assert!(first.is_complete());
    }

    #[test]
    fn test_send_without_port_fails_before_io() {
        let err = send_frame(&TransportConfig::default(), &Frame::encode(&[]), None).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert!(!err.is_retryable());
    }
}
