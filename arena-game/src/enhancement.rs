//! Blacksmith enhancement: success odds, tiered costs and item power growth.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameResult, Resource, StateError};
use crate::items::{MAX_ENHANCE_LEVEL, PowerPolicy};
use crate::player::Player;
use crate::rng::RandomSource;

/// Gold and power stones consumed by one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceCost {
    pub target_level: u8,
    pub gold: u64,
    #[serde(default)]
    pub power_stones: u64,
}

/// Attempt costs keyed by the level being attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceCostTable {
    #[serde(default = "EnhanceCostTable::default_gold")]
    pub default_gold: u64,
    #[serde(default = "EnhanceCostTable::default_tiers")]
    pub tiers: Vec<EnhanceCost>,
}

impl EnhanceCostTable {
    const fn default_gold() -> u64 {
        150
    }

    fn default_tiers() -> Vec<EnhanceCost> {
        (1..=MAX_ENHANCE_LEVEL)
            .map(|target_level| EnhanceCost {
                target_level,
                gold: Self::default_gold(),
                power_stones: u64::from(target_level.saturating_sub(4)),
            })
            .collect()
    }

    #[must_use]
    pub fn cost_for(&self, target_level: u8) -> EnhanceCost {
        self.tiers
            .iter()
            .find(|tier| tier.target_level == target_level)
            .copied()
            .unwrap_or(EnhanceCost {
                target_level,
                gold: self.default_gold,
                power_stones: 0,
            })
    }
}

impl Default for EnhanceCostTable {
    fn default() -> Self {
        Self {
            default_gold: Self::default_gold(),
            tiers: Self::default_tiers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Success chance keyed by the level being attempted.
    #[serde(default = "EnhanceConfig::default_success")]
    pub success: BTreeMap<u8, f64>,
    /// Chance used when the table has no entry.
    #[serde(default = "EnhanceConfig::default_fallback_chance")]
    pub fallback_chance: f64,
    #[serde(default)]
    pub costs: EnhanceCostTable,
}

impl EnhanceConfig {
    fn default_success() -> BTreeMap<u8, f64> {
        BTreeMap::from([
            (1, 0.90),
            (2, 0.80),
            (3, 0.70),
            (4, 0.60),
            (5, 0.50),
            (6, 0.40),
            (7, 0.30),
            (8, 0.15),
            (9, 0.10),
        ])
    }

    const fn default_fallback_chance() -> f64 {
        0.90
    }

    /// Chance that an item at `current_level` reaches the next level.
    #[must_use]
    pub fn success_chance(&self, current_level: u8) -> f64 {
        self.success
            .get(&current_level.saturating_add(1))
            .copied()
            .unwrap_or(self.fallback_chance)
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            success: Self::default_success(),
            fallback_chance: Self::default_fallback_chance(),
            costs: EnhanceCostTable::default(),
        }
    }
}

/// Result of a single enhancement attempt. Failure is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceOutcome {
    pub item_id: u64,
    pub success: bool,
    pub previous_level: u8,
    pub new_level: u8,
    pub item_power: u64,
    pub player_power: u64,
    pub cost: EnhanceCost,
    pub chance: f64,
    pub roll: f64,
}

/// Try to raise an item by one level.
///
/// Costs are checked before anything changes and are consumed whether or not
/// the roll succeeds.
///
/// # Errors
///
/// `NotFound`/`ItemDeleted` for unusable items, `MaxEnhanceLevel` at level 9,
/// `InsufficientResource` when gold or power stones are short.
pub fn attempt_enhance(
    player: &mut Player,
    item_id: u64,
    cfg: &EnhanceConfig,
    policy: PowerPolicy,
    rng: &mut impl RandomSource,
) -> GameResult<EnhanceOutcome> {
    let item = player.inventory.active(item_id)?;
    if item.is_maxed() {
        return Err(StateError::MaxEnhanceLevel {
            item_id,
            level: item.enhance_level,
        }
        .into());
    }
    let previous_level = item.enhance_level;
    let target = previous_level + 1;
    let cost = cfg.costs.cost_for(target);
    Player::ensure(Resource::Gold, player.gold, cost.gold)?;
    Player::ensure(Resource::PowerStones, player.power_stones, cost.power_stones)?;

    player.gold -= cost.gold;
    player.power_stones -= cost.power_stones;

    let chance = cfg.success_chance(previous_level);
    let roll = rng.uniform();
    let success = roll <= chance;

    let item = player.inventory.active_mut(item_id)?;
    if success {
        item.level_up();
    }
    let new_level = item.enhance_level;
    let item_power = item.power;
    let player_power = player.recompute_power(policy);

    log::debug!(
        "enhance item {item_id} +{previous_level} -> +{target}: roll {roll:.3} vs {chance:.2} ({})",
        if success { "success" } else { "failure" }
    );

    Ok(EnhanceOutcome {
        item_id,
        success,
        previous_level,
        new_level,
        item_power,
        player_power,
        cost,
        chance,
        roll,
    })
}
