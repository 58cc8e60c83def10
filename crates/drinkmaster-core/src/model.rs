//! Recipe and machine inventory data
//!
//! These are the values handed to the core by the recipe and inventory
//! providers. They are plain snapshots: nothing here talks to the machine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Slot numbers of the shared bank (alcohol or mixer)
pub const SLOT_RANGE: RangeInclusive<u8> = 1..=6;

/// Slot numbers of the filler pump bank (mixers only)
pub const FILLER_RANGE: RangeInclusive<u8> = 7..=10;

/// Kind of stocked substance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientKind {
    /// Spirit; only ever poured from a shared slot
    Alcohol,
    /// Non-alcoholic mixer; filler pumps first, then shared slots
    Mixer,
}

impl fmt::Display for IngredientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngredientKind::Alcohol => write!(f, "alcohol"),
            IngredientKind::Mixer => write!(f, "mixer"),
        }
    }
}

/// Reference to a stocked alcohol or mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientRef {
    /// Alcohol or mixer
    #[serde(rename = "type")]
    pub kind: IngredientKind,
    /// Catalogue id, unique within its kind
    pub id: u32,
}

impl IngredientRef {
    /// Reference to alcohol `id`
    pub fn alcohol(id: u32) -> Self {
        Self {
            kind: IngredientKind::Alcohol,
            id,
        }
    }

    /// Reference to mixer `id`
    pub fn mixer(id: u32) -> Self {
        Self {
            kind: IngredientKind::Mixer,
            id,
        }
    }
}

impl fmt::Display for IngredientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// One line of a drink recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    /// What to pour
    pub ingredient: IngredientRef,
    /// Requested amount in millilitres
    #[serde(default)]
    pub amount_ml: u32,
    /// Display ordering only; pour order follows slot numbers
    #[serde(default)]
    pub order_index: Option<i32>,
    /// Free text shown to the operator
    #[serde(default)]
    pub note: Option<String>,
}

impl RecipeLine {
    /// Line without ordering or note
    pub fn new(ingredient: IngredientRef, amount_ml: u32) -> Self {
        Self {
            ingredient,
            amount_ml,
            order_index: None,
            note: None,
        }
    }
}

/// Assignment of an ingredient to one of the shared slots (1-6)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// Shared slot, 1-6
    pub slot_number: u8,
    /// Ingredient loaded in the slot
    pub ingredient: IngredientRef,
    /// Inactive slots are never poured from
    #[serde(default = "default_active")]
    pub active: bool,
}

impl SlotAssignment {
    /// Active assignment
    pub fn new(slot_number: u8, ingredient: IngredientRef) -> Self {
        Self {
            slot_number,
            ingredient,
            active: true,
        }
    }

    /// Same assignment, marked inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Assignment of a mixer to one of the filler pumps (7-10)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerAssignment {
    /// Filler pump, 7-10
    pub slot_number: u8,
    /// Mixer connected to the pump
    pub mixer_id: u32,
    /// Inactive pumps are never poured from
    #[serde(default = "default_active")]
    pub active: bool,
}

impl FillerAssignment {
    /// Active assignment
    pub fn new(slot_number: u8, mixer_id: u32) -> Self {
        Self {
            slot_number,
            mixer_id,
            active: true,
        }
    }

    /// Same assignment, marked inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

fn default_active() -> bool {
    true
}

/// Problems found in an inventory snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Shared assignment outside 1-6
    #[error("Slot {0} is outside the shared bank (1-6)")]
    SlotOutOfRange(u8),

    /// Filler assignment outside 7-10
    #[error("Filler slot {0} is outside the filler bank (7-10)")]
    FillerOutOfRange(u8),

    /// Two assignments claim the same slot number
    #[error("Slot {0} is assigned more than once")]
    DuplicateSlot(u8),
}

/// Snapshot of the machine's slot and filler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Shared bank
    #[serde(default)]
    pub slots: Vec<SlotAssignment>,
    /// Filler pump bank
    #[serde(default)]
    pub fillers: Vec<FillerAssignment>,
}

impl Inventory {
    /// Snapshot from both banks
    pub fn new(slots: Vec<SlotAssignment>, fillers: Vec<FillerAssignment>) -> Self {
        Self { slots, fillers }
    }

    /// Active shared-bank assignments, in snapshot order
    pub fn active_slots(&self) -> impl Iterator<Item = &SlotAssignment> {
        self.slots.iter().filter(|s| s.active)
    }

    /// Active filler assignments, in snapshot order
    pub fn active_fillers(&self) -> impl Iterator<Item = &FillerAssignment> {
        self.fillers.iter().filter(|f| f.active)
    }

    /// Check bank ranges and slot uniqueness.
    ///
    /// Resolution does not require this to pass; it is offered to the
    /// inventory provider for validating operator edits. Inactive rows are
    /// checked too since they still occupy their slot number.
    pub fn check(&self) -> Result<(), Vec<InventoryError>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for slot in &self.slots {
            if !SLOT_RANGE.contains(&slot.slot_number) {
                errors.push(InventoryError::SlotOutOfRange(slot.slot_number));
            }
            if !seen.insert(slot.slot_number) {
                errors.push(InventoryError::DuplicateSlot(slot.slot_number));
            }
        }
        for filler in &self.fillers {
            if !FILLER_RANGE.contains(&filler.slot_number) {
                errors.push(InventoryError::FillerOutOfRange(filler.slot_number));
            }
            if !seen.insert(filler.slot_number) {
                errors.push(InventoryError::DuplicateSlot(filler.slot_number));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
