//! Slot resolution
//!
//! Maps recipe ingredients onto physical dispenser slots using an inventory
//! snapshot. Alcohol only ever comes from the shared bank. Mixers prefer the
//! filler pumps and fall back to a shared slot holding the same mixer.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{IngredientKind, IngredientRef, Inventory, RecipeLine};

/// Highest volume a single frame entry can carry
pub const MAX_VOLUME_ML: u8 = u8::MAX;

/// Outcome of resolving a single recipe line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Ingredient is stocked at `slot`; `volume` is already saturated
    Resolved {
        /// Slot or filler number
        slot: u8,
        /// Volume byte
        volume: u8,
    },
    /// No active slot or filler holds this ingredient
    Unresolved(IngredientRef),
}

impl Resolution {
    /// The `(slot, volume)` pair, if resolved
    pub fn assignment(&self) -> Option<(u8, u8)> {
        match *self {
            Resolution::Resolved { slot, volume } => Some((slot, volume)),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// Saturate a requested amount to the single-byte volume field
pub fn volume_byte(amount_ml: u32) -> u8 {
    u8::try_from(amount_ml).unwrap_or(MAX_VOLUME_ML)
}

/// Find the slot currently holding `ingredient`.
///
/// First active match wins; duplicates in the snapshot are not an error here.
pub fn find_slot(ingredient: &IngredientRef, inventory: &Inventory) -> Option<u8> {
    match ingredient.kind {
        IngredientKind::Alcohol => inventory
            .active_slots()
            .find(|s| s.ingredient == *ingredient)
            .map(|s| s.slot_number),
        IngredientKind::Mixer => inventory
            .active_fillers()
            .find(|f| f.mixer_id == ingredient.id)
            .map(|f| f.slot_number)
            .or_else(|| {
                inventory
                    .active_slots()
                    .find(|s| s.ingredient == *ingredient)
                    .map(|s| s.slot_number)
            }),
    }
}

/// Resolve one recipe line against an inventory snapshot
pub fn resolve_line(line: &RecipeLine, inventory: &Inventory) -> Resolution {
    match find_slot(&line.ingredient, inventory) {
        Some(slot) => Resolution::Resolved {
            slot,
            volume: volume_byte(line.amount_ml),
        },
        None => Resolution::Unresolved(line.ingredient),
    }
}

/// Result of resolving a whole recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// `(slot, volume)` pairs in recipe order
    pub assignments: Vec<(u8, u8)>,
    /// Ingredients left out because nothing dispenses them
    pub unresolved: Vec<IngredientRef>,
}

impl ResolutionReport {
    /// True when every recipe line found a slot
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolve every line of a recipe.
///
/// Unresolved lines never fail the pass; they are listed in the report so
/// the caller can decide whether a partial drink is acceptable.
pub fn resolve_recipe(lines: &[RecipeLine], inventory: &Inventory) -> ResolutionReport {
    let mut report = ResolutionReport::default();

    for line in lines {
        match resolve_line(line, inventory) {
            Resolution::Resolved { slot, volume } => {
                debug!(ingredient = %line.ingredient, slot, volume, "resolved ingredient");
                report.assignments.push((slot, volume));
            }
            Resolution::Unresolved(ingredient) => {
                warn!(%ingredient, "no active slot for ingredient, leaving it out");
                report.unresolved.push(ingredient);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FillerAssignment, SlotAssignment};
    use pretty_assertions::assert_eq;

    fn inventory() -> Inventory {
        Inventory::new(
            vec![
                SlotAssignment::new(1, IngredientRef::alcohol(1)),
                SlotAssignment::new(2, IngredientRef::alcohol(2)).inactive(),
                SlotAssignment::new(3, IngredientRef::mixer(7)),
                SlotAssignment::new(4, IngredientRef::mixer(8)),
            ],
            vec![
                FillerAssignment::new(9, 7),
                FillerAssignment::new(10, 8).inactive(),
                FillerAssignment::new(7, 5),
            ],
        )
    }

    #[test]
    fn test_volume_saturation() {
        assert_eq!(volume_byte(40), 40);
        assert_eq!(volume_byte(255), 255);
        assert_eq!(volume_byte(256), 255);
        assert_eq!(volume_byte(500), 255);
        assert_eq!(volume_byte(0), 0);
    }

    #[test]
    fn test_alcohol_resolves_to_shared_slot() {
        let line = RecipeLine::new(IngredientRef::alcohol(1), 40);
        assert_eq!(
            resolve_line(&line, &inventory()),
            Resolution::Resolved { slot: 1, volume: 40 }
        );
    }

    #[test]
    fn test_inactive_slot_is_ignored() {
        let line = RecipeLine::new(IngredientRef::alcohol(2), 40);
        assert_eq!(
            resolve_line(&line, &inventory()),
            Resolution::Unresolved(IngredientRef::alcohol(2))
        );
    }

    #[test]
    fn test_mixer_prefers_filler() {
        let line = RecipeLine::new(IngredientRef::mixer(7), 100);
        assert_eq!(
            resolve_line(&line, &inventory()),
            Resolution::Resolved { slot: 9, volume: 100 }
        );
    }

    #[test]
    fn test_mixer_falls_back_when_filler_inactive() {
        let line = RecipeLine::new(IngredientRef::mixer(8), 100);
        assert_eq!(find_slot(&line.ingredient, &inventory()), Some(4));
    }

    #[test]
    fn test_alcohol_never_uses_filler() {
        // Filler 7 holds mixer id 5; an alcohol with id 5 must not match it.
        let line = RecipeLine::new(IngredientRef::alcohol(5), 40);
        assert_eq!(resolve_line(&line, &inventory()).assignment(), None);
    }

    #[test]
    fn test_mixer_does_not_match_alcohol_slot() {
        let line = RecipeLine::new(IngredientRef::mixer(1), 40);
        assert_eq!(find_slot(&line.ingredient, &inventory()), None);
    }

    #[test]
    fn test_first_active_match_wins() {
        let inventory = Inventory::new(
            vec![
                SlotAssignment::new(5, IngredientRef::alcohol(3)),
                SlotAssignment::new(2, IngredientRef::alcohol(3)),
            ],
            vec![],
        );
        assert_eq!(find_slot(&IngredientRef::alcohol(3), &inventory), Some(5));
    }

    #[test]
    fn test_resolve_recipe_reports_unresolved() {
        let lines = vec![
            RecipeLine::new(IngredientRef::mixer(7), 150),
            RecipeLine::new(IngredientRef::alcohol(42), 40),
            RecipeLine::new(IngredientRef::alcohol(1), 500),
        ];

        let report = resolve_recipe(&lines, &inventory());
        assert_eq!(report.assignments, vec![(9, 150), (1, 255)]);
        assert_eq!(report.unresolved, vec![IngredientRef::alcohol(42)]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_empty_recipe_is_complete() {
        let report = resolve_recipe(&[], &inventory());
        assert!(report.assignments.is_empty());
        assert!(report.is_complete());
    }
}
