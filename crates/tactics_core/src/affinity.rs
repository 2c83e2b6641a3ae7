//! Elemental affinity: multipliers and granted abilities.
//!
//! A run picks one alignment gem. Each unit's element relates to it as
//! matching, neutral or counter, which drives a damage/heal multiplier and the
//! abilities the unit learns at battle start.
//!
//! | Relation | Multiplier | Abilities granted |
//! |----------|-----------:|-------------------|
//! | Matching | 115% | four-ability bundle of the unit's element |
//! | Neutral  | 105% | none |
//! | Counter  |  95% | one ward keyed to the alignment's element |
//!
//! Activating the alignment collapses every multiplier to 100% for the rest
//! of the battle. Abilities already granted stay.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abilities::{element_bundle, ward_ability, Ability};
use crate::math::{scale_round_half_up, Percent};

/// The six elements, in three opposed pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    /// Opposes water.
    Fire,
    /// Opposes fire.
    Water,
    /// Opposes wind.
    Earth,
    /// Opposes earth.
    Wind,
    /// Opposes dark.
    Light,
    /// Opposes light.
    Dark,
}

impl Element {
    /// Every element in declaration order.
    pub const ALL: [Element; 6] = [
        Element::Fire,
        Element::Water,
        Element::Earth,
        Element::Wind,
        Element::Light,
        Element::Dark,
    ];

    /// The opposed element.
    #[must_use]
    pub const fn counter(self) -> Self {
        match self {
            Element::Fire => Element::Water,
            Element::Water => Element::Fire,
            Element::Earth => Element::Wind,
            Element::Wind => Element::Earth,
            Element::Light => Element::Dark,
            Element::Dark => Element::Light,
        }
    }

    /// Lowercase key used in ability ids.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Earth => "earth",
            Element::Wind => "wind",
            Element::Light => "light",
            Element::Dark => "dark",
        }
    }

    /// Capitalized display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Earth => "Earth",
            Element::Wind => "Wind",
            Element::Light => "Light",
            Element::Dark => "Dark",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How a unit's element relates to the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffinityRelation {
    /// Same element.
    Matching,
    /// Unrelated element.
    Neutral,
    /// The unit's element is the alignment's opposite.
    Counter,
}

impl AffinityRelation {
    /// Bonus multiplier before activation.
    #[must_use]
    pub const fn multiplier(self) -> Percent {
        match self {
            AffinityRelation::Matching => Percent(115),
            AffinityRelation::Neutral => Percent(105),
            AffinityRelation::Counter => Percent(95),
        }
    }
}

/// Classify a unit element against an alignment element.
#[must_use]
pub fn relationship(unit: Element, alignment: Element) -> AffinityRelation {
    if unit == alignment {
        AffinityRelation::Matching
    } else if unit == alignment.counter() {
        AffinityRelation::Counter
    } else {
        AffinityRelation::Neutral
    }
}

/// Affinity state misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AffinityError {
    /// Activation already used this battle.
    #[error("Affinity already activated this battle")]
    AlreadyActivated,

    /// No alignment selected, nothing to activate.
    #[error("No alignment selected")]
    NoAlignment,
}

/// The run's selected alignment plus the per-battle activation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AffinityState {
    /// Selected alignment, if any.
    pub alignment: Option<Element>,
    /// Once set, every multiplier is 100% until the next battle.
    pub activated: bool,
}

impl AffinityState {
    /// State with the given alignment, not activated.
    #[must_use]
    pub const fn aligned(alignment: Element) -> Self {
        Self {
            alignment: Some(alignment),
            activated: false,
        }
    }

    /// State without any alignment.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            alignment: None,
            activated: false,
        }
    }

    /// Spend the one activation of this battle.
    pub fn activate(&mut self) -> Result<(), AffinityError> {
        if self.alignment.is_none() {
            return Err(AffinityError::NoAlignment);
        }
        if self.activated {
            return Err(AffinityError::AlreadyActivated);
        }
        self.activated = true;
        Ok(())
    }

    /// Clear activation at the start of a battle.
    pub fn reset_for_battle(&mut self) {
        self.activated = false;
    }

    /// Relation of `unit` to the alignment, `None` without alignment.
    #[must_use]
    pub fn relation(&self, unit: Element) -> Option<AffinityRelation> {
        self.alignment.map(|alignment| relationship(unit, alignment))
    }

    /// Current multiplier for a unit of the given element.
    #[must_use]
    pub fn multiplier(&self, unit: Element) -> Percent {
        if self.activated {
            return Percent::HUNDRED;
        }
        self.relation(unit)
            .map_or(Percent::HUNDRED, AffinityRelation::multiplier)
    }
}

/// Scale a damage or heal value by the unit's affinity, rounding half up.
#[must_use]
pub fn apply(base_value: i32, unit: Element, state: &AffinityState) -> i32 {
    scale_round_half_up(base_value, state.multiplier(unit))
}

/// Abilities a unit learns from the alignment at battle start.
///
/// Depends only on the alignment, not on activation.
#[must_use]
pub fn granted_abilities(unit: Element, state: &AffinityState) -> Vec<Ability> {
    let Some(alignment) = state.alignment else {
        return Vec::new();
    };
    match relationship(unit, alignment) {
        AffinityRelation::Matching => element_bundle(unit),
        AffinityRelation::Counter => vec![ward_ability(alignment)],
        AffinityRelation::Neutral => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationships() {
        assert_eq!(
            relationship(Element::Fire, Element::Fire),
            AffinityRelation::Matching
        );
        assert_eq!(
            relationship(Element::Water, Element::Fire),
            AffinityRelation::Counter
        );
        assert_eq!(
            relationship(Element::Earth, Element::Fire),
            AffinityRelation::Neutral
        );
        assert_eq!(
            relationship(Element::Light, Element::Dark),
            AffinityRelation::Counter
        );
    }

    #[test]
    fn test_counter_pairs_are_symmetric() {
        for element in Element::ALL {
            assert_eq!(element.counter().counter(), element);
            assert_ne!(element.counter(), element);
        }
    }

    #[test]
    fn test_apply_matching_inactive_and_activated() {
        let mut state = AffinityState::aligned(Element::Fire);
        assert_eq!(apply(100, Element::Fire, &state), 115);
        state.activate().unwrap();
        assert_eq!(apply(100, Element::Fire, &state), 100);
    }

    #[test]
    fn test_apply_neutral_and_counter() {
        let state = AffinityState::aligned(Element::Fire);
        assert_eq!(apply(100, Element::Wind, &state), 105);
        assert_eq!(apply(100, Element::Water, &state), 95);
    }

    #[test]
    fn test_no_alignment_is_identity() {
        let state = AffinityState::none();
        assert_eq!(apply(77, Element::Dark, &state), 77);
        assert!(granted_abilities(Element::Dark, &state).is_empty());
    }

    #[test]
    fn test_activation_is_once_per_battle() {
        let mut state = AffinityState::aligned(Element::Earth);
        assert_eq!(state.activate(), Ok(()));
        assert_eq!(state.activate(), Err(AffinityError::AlreadyActivated));
        state.reset_for_battle();
        assert_eq!(state.activate(), Ok(()));
    }

    #[test]
    fn test_activation_without_alignment_fails() {
        let mut state = AffinityState::none();
        assert_eq!(state.activate(), Err(AffinityError::NoAlignment));
    }

    #[test]
    fn test_granted_abilities_by_relation() {
        let state = AffinityState::aligned(Element::Fire);
        let matching = granted_abilities(Element::Fire, &state);
        assert_eq!(matching.len(), 4);
        assert!(matching.iter().all(|a| a.id.starts_with("fire_")));

        let counter = granted_abilities(Element::Water, &state);
        assert_eq!(counter.len(), 1);
        assert_eq!(counter[0].id, "ward_fire");

        assert!(granted_abilities(Element::Light, &state).is_empty());
    }

    #[test]
    fn test_activation_keeps_granted_abilities() {
        let mut state = AffinityState::aligned(Element::Wind);
        state.activate().unwrap();
        assert_eq!(granted_abilities(Element::Wind, &state).len(), 4);
    }
}
