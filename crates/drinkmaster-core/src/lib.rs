//! # DrinkMaster Core Library
//!
//! Turns drink recipes into pours on the DrinkMaster dispenser.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Resolution of recipe ingredients to dispenser slots and filler pumps
//! - Encoding of the pour list into the controller's binary frame
//! - The serial `received`/`done` handshake with the embedded controller
//! - A queue that serializes dispense requests over the single serial link
//! - The re-armable deferred network disconnect
//!
//! ## Example
//!
//! ```rust,ignore
//! use drinkmaster_core::{dispense, protocol::TransportConfig};
//!
//! let plan = dispense::build_frame(&recipe, &inventory);
//! if !plan.is_complete() {
//!     println!("missing: {:?}", plan.resolution.unresolved);
//! }
//!
//! let config = TransportConfig::from_env()?;
//! dispense::send_frame(&config, &plan.frame, None)?;
//! ```

pub mod dispense;
pub mod error;
pub mod model;
pub mod network;
pub mod protocol;
pub mod resolver;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispense::{build_frame, send_frame, DispensePlan, DispenseQueue};
    pub use crate::error::{DispenseError, FailureKind};
    pub use crate::model::{
        FillerAssignment, IngredientKind, IngredientRef, Inventory, RecipeLine, SlotAssignment,
    };
    pub use crate::network::DisconnectTimer;
    pub use crate::protocol::{
        Diagnostics, Frame, Handshake, HandshakeOutcome, HandshakeState, LineTransport,
        LinkOpener, SerialOpener, SerialTransport, TransportConfig,
    };
    pub use crate::resolver::{resolve_line, resolve_recipe, Resolution, ResolutionReport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
