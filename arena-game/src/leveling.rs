//! Experience curve, level lookup and level-up rewards.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::numbers::u64_to_f64;
use crate::player::Player;

/// Cumulative experience required per level, indexed by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelCurve {
    thresholds: Vec<u64>,
}

impl LevelCurve {
    pub const DEFAULT_THRESHOLDS: [u64; 15] = [
        0, 100, 300, 600, 1000, 1500, 2100, 2800, 3600, 4500, 5500, 6600, 7800, 9100, 10500,
    ];

    #[must_use]
    pub fn new(thresholds: Vec<u64>) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Highest tabulated level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.thresholds.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Cumulative experience needed to reach `level`.
    ///
    /// # Errors
    ///
    /// Returns `LevelOutOfRange` past the last tabulated level.
    pub fn required_experience(&self, level: u32) -> GameResult<u64> {
        usize::try_from(level)
            .ok()
            .and_then(|idx| self.thresholds.get(idx).copied())
            .ok_or(GameError::LevelOutOfRange {
                level,
                max_level: self.max_level(),
            })
    }

    /// Highest level whose requirement is met, never below 1 and capped at the
    /// last tabulated level. Meeting a requirement exactly reaches that level.
    #[must_use]
    pub fn level_for_experience(&self, total_experience: u64) -> u32 {
        let mut level = 1;
        for (idx, required) in self.thresholds.iter().enumerate().skip(1) {
            if total_experience >= *required {
                level = u32::try_from(idx).unwrap_or(u32::MAX);
            } else {
                break;
            }
        }
        level
    }

    /// Experience into the current level and the span of that level.
    ///
    /// # Errors
    ///
    /// Returns `LevelOutOfRange` when the player's level is off the curve.
    pub fn progress_within_level(&self, player: &Player) -> GameResult<LevelProgress> {
        let level = player.level.max(1);
        let floor = self.required_experience(level - 1)?;
        let ceiling = self.required_experience(level)?;
        Ok(LevelProgress {
            current_exp: player.experience.saturating_sub(floor),
            required_exp: ceiling.saturating_sub(floor),
        })
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLDS.to_vec())
    }
}

/// Progress-bar numerator and denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub current_exp: u64,
    pub required_exp: u64,
}

impl LevelProgress {
    /// Completed fraction in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.required_exp == 0 {
            return 1.0;
        }
        let ratio = u64_to_f64(self.current_exp) / u64_to_f64(self.required_exp);
        ratio.clamp(0.0, 1.0)
    }
}

/// Bonus granted on reaching a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReward {
    pub level: u32,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub fame: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardTable {
    levels: Vec<LevelReward>,
}

impl RewardTable {
    #[must_use]
    pub fn new(levels: Vec<LevelReward>) -> Self {
        Self { levels }
    }

    #[must_use]
    pub fn reward_for(&self, level: u32) -> Option<LevelReward> {
        self.levels.iter().find(|entry| entry.level == level).copied()
    }

    #[must_use]
    pub fn entries(&self) -> &[LevelReward] {
        &self.levels
    }
}

/// Result of [`add_experience`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceGain {
    pub amount: u64,
    pub previous_level: u32,
    pub new_level: u32,
    /// One entry per level crossed that carries a bonus, ascending.
    pub rewards: Vec<LevelReward>,
    pub total_gold: u64,
    pub total_fame: u64,
}

impl ExperienceGain {
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.new_level > self.previous_level
    }
}

/// Add experience, recompute the level and apply per-level bonuses.
pub fn add_experience(
    player: &mut Player,
    amount: u64,
    curve: &LevelCurve,
    rewards: &RewardTable,
) -> ExperienceGain {
    let previous_level = player.level;
    player.experience = player.experience.saturating_add(amount);
    let new_level = curve
        .level_for_experience(player.experience)
        .max(previous_level);

    let earned: Vec<LevelReward> = (previous_level.saturating_add(1)..=new_level)
        .filter_map(|level| rewards.reward_for(level))
        .collect();
    let total_gold = earned
        .iter()
        .map(|reward| reward.gold)
        .fold(0_u64, u64::saturating_add);
    let total_fame = earned
        .iter()
        .map(|reward| reward.fame)
        .fold(0_u64, u64::saturating_add);

    player.level = new_level;
    player.gold = player.gold.saturating_add(total_gold);
    player.fame = player.fame.saturating_add(total_fame);

    if new_level > previous_level {
        log::info!(
            "player {} leveled {} -> {} (+{} gold, +{} fame)",
            player.id,
            previous_level,
            new_level,
            total_gold,
            total_fame
        );
    }

    ExperienceGain {
        amount,
        previous_level,
        new_level,
        rewards: earned,
        total_gold,
        total_fame,
    }
}
