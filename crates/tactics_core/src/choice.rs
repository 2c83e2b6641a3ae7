//! Opponent choice generation.
//!
//! Every battle offers exactly three opponents drawn from the catalog. An
//! offer is valid when:
//!
//! - at least one opponent is `Standard`,
//! - at most one opponent is `Hard`,
//! - no two opponents share a primary tag,
//! - no two adjacent opponents (in offer order) share a lead role.
//!
//! Attempt `n` samples from `rng.fork(n)`, so every attempt is reproducible
//! on its own. When no attempt passes, the last sampled offer is returned
//! anyway: the generator always produces three previews.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::affinity::Element;
use crate::data::{Difficulty, OpponentCatalog, OpponentSpec, Role, UnitTemplate};
use crate::rng::ForkRng;
use crate::roster::RosterUnit;
use crate::stats::Rank;

/// Opponents per offer.
pub const CHOICES_PER_OFFER: usize = 3;

/// Default attempt bound.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// What the player sees of one enemy unit before picking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Template id.
    pub template_id: String,
    /// Display name.
    pub name: String,
    /// Element.
    pub element: Element,
    /// Role.
    pub role: Role,
    /// Rank.
    pub rank: Rank,
}

impl From<&UnitTemplate> for UnitSummary {
    fn from(template: &UnitTemplate) -> Self {
        Self {
            template_id: template.id.clone(),
            name: template.name.clone(),
            element: template.element,
            role: template.role,
            rank: template.rank,
        }
    }
}

/// One offered opponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpponentPreview {
    /// Catalog id.
    pub opponent_id: String,
    /// Display name.
    pub name: String,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Primary tag.
    pub primary_tag: String,
    /// Counter tags, copied from the catalog entry.
    pub counter_tags: Vec<String>,
    /// Enemy units in roster order.
    pub units: Vec<UnitSummary>,
    /// Never populated.
    #[serde(default)]
    pub threat_score: Option<u32>,
}

impl OpponentPreview {
    /// Build the preview of a catalog entry.
    #[must_use]
    pub fn from_spec(spec: &OpponentSpec) -> Self {
        Self {
            opponent_id: spec.id.clone(),
            name: spec.name.clone(),
            difficulty: spec.difficulty,
            primary_tag: spec.primary_tag.clone(),
            counter_tags: spec.counter_tags.clone(),
            units: spec.units.iter().map(UnitSummary::from).collect(),
            threat_score: None,
        }
    }

    /// Role of the first unit.
    #[must_use]
    pub fn lead_role(&self) -> Option<Role> {
        self.units.first().map(|unit| unit.role)
    }
}

/// Choice generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    /// Attempts before falling back to the last sampled offer. At least 1.
    pub max_attempts: u32,
}

impl Default for ChoiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ChoiceConfig {
    /// Builder method to set the attempt bound.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// A rule an offer broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceViolation {
    /// No `Standard` opponent.
    NoStandard,
    /// More than one `Hard` opponent.
    TooManyHard,
    /// Two opponents share this primary tag.
    DuplicateTag(String),
    /// Neighbours share this lead role.
    AdjacentRole(Role),
}

/// Offer plus generation diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOutcome {
    /// The offer.
    pub previews: [OpponentPreview; CHOICES_PER_OFFER],
    /// Attempts used, 1-based.
    pub attempts: u32,
    /// Whether no attempt satisfied every rule.
    pub degraded: bool,
}

/// Generate the three-way offer for a battle.
///
/// `rng` is the choice fork for this battle. The player team hint is
/// accepted for interface compatibility and only logged.
#[must_use]
pub fn generate_choices(
    rng: &ForkRng,
    battle_index: u32,
    catalog: &OpponentCatalog,
    player_team_hint: Option<&[RosterUnit]>,
    config: &ChoiceConfig,
) -> [OpponentPreview; CHOICES_PER_OFFER] {
    generate_choices_detailed(rng, battle_index, catalog, player_team_hint, config).previews
}

/// Like [`generate_choices`], also reporting attempts and degradation.
#[must_use]
pub fn generate_choices_detailed(
    rng: &ForkRng,
    battle_index: u32,
    catalog: &OpponentCatalog,
    player_team_hint: Option<&[RosterUnit]>,
    config: &ChoiceConfig,
) -> ChoiceOutcome {
    if let Some(team) = player_team_hint {
        debug!(battle_index, team_size = team.len(), "Player team hint ignored");
    }

    let max_attempts = config.max_attempts.max(1);
    let mut last = sample_offer(&mut rng.fork(0u32), catalog);
    let mut attempts = 1;
    loop {
        let violations = check_offer(&last);
        if violations.is_empty() {
            debug!(battle_index, attempts, "Choice offer accepted");
            return ChoiceOutcome {
                previews: to_previews(&last),
                attempts,
                degraded: false,
            };
        }
        debug!(battle_index, attempt = attempts - 1, ?violations, "Choice offer rejected");
        if attempts >= max_attempts {
            break;
        }
        last = sample_offer(&mut rng.fork(attempts), catalog);
        attempts += 1;
    }

    warn!(
        battle_index,
        attempts,
        ids = ?last.iter().map(|spec| spec.id.as_str()).collect::<Vec<_>>(),
        "No valid choice offer found, using last attempt"
    );
    ChoiceOutcome {
        previews: to_previews(&last),
        attempts,
        degraded: true,
    }
}

/// Three distinct catalog entries in draw order.
fn sample_offer<'a>(rng: &mut ForkRng, catalog: &'a OpponentCatalog) -> [&'a OpponentSpec; 3] {
    let entries = catalog.entries();
    let picks = rng.sample_distinct(entries.len(), CHOICES_PER_OFFER);
    // Catalogs are validated to hold at least three entries.
    let at = |n: usize| &entries[picks.get(n).copied().unwrap_or(n) % entries.len()];
    [at(0), at(1), at(2)]
}

fn to_previews(offer: &[&OpponentSpec; 3]) -> [OpponentPreview; CHOICES_PER_OFFER] {
    offer.map(OpponentPreview::from_spec)
}

/// Every rule the offer breaks, empty when it is valid.
#[must_use]
pub fn check_offer(offer: &[&OpponentSpec]) -> Vec<ChoiceViolation> {
    let mut violations = Vec::new();

    if !offer.iter().any(|spec| spec.difficulty == Difficulty::Standard) {
        violations.push(ChoiceViolation::NoStandard);
    }
    let hard = offer
        .iter()
        .filter(|spec| spec.difficulty == Difficulty::Hard)
        .count();
    if hard > 1 {
        violations.push(ChoiceViolation::TooManyHard);
    }

    let mut tags = HashSet::new();
    for spec in offer {
        if !tags.insert(spec.primary_tag.as_str()) {
            violations.push(ChoiceViolation::DuplicateTag(spec.primary_tag.clone()));
        }
    }

    for pair in offer.windows(2) {
        if let (Some(a), Some(b)) = (pair[0].lead_role(), pair[1].lead_role()) {
            if a == b {
                violations.push(ChoiceViolation::AdjacentRole(a));
            }
        }
    }
    violations
}
