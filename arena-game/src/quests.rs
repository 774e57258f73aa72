//! Daily arena quest: fight a few battles, claim a small bundle.

use serde::{Deserialize, Serialize};

use crate::error::{GameResult, StateError};
use crate::leveling::{ExperienceGain, LevelCurve, RewardTable, add_experience};
use crate::player::Player;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestConfig {
    #[serde(default = "QuestConfig::default_arena_target")]
    pub arena_target: u32,
    #[serde(default = "QuestConfig::default_reward_experience")]
    pub reward_experience: u64,
    #[serde(default = "QuestConfig::default_reward_gold")]
    pub reward_gold: u64,
    #[serde(default = "QuestConfig::default_reward_power_stones")]
    pub reward_power_stones: u64,
}

impl QuestConfig {
    const fn default_arena_target() -> u32 {
        3
    }

    const fn default_reward_experience() -> u64 {
        10
    }

    const fn default_reward_gold() -> u64 {
        10
    }

    const fn default_reward_power_stones() -> u64 {
        1
    }
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            arena_target: Self::default_arena_target(),
            reward_experience: Self::default_reward_experience(),
            reward_gold: Self::default_reward_gold(),
            reward_power_stones: Self::default_reward_power_stones(),
        }
    }
}

/// Per-player quest progress; reset at the UTC day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyQuest {
    pub progress: u32,
    pub claimed: bool,
}

impl DailyQuest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn is_complete(&self, cfg: &QuestConfig) -> bool {
        self.progress >= cfg.arena_target
    }

    /// Count one arena battle; returns `true` while progress still moved.
    pub fn record_arena_battle(&mut self, cfg: &QuestConfig) -> bool {
        if self.progress >= cfg.arena_target {
            return false;
        }
        self.progress += 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestReward {
    pub gold: u64,
    pub power_stones: u64,
    pub experience: ExperienceGain,
}

/// Pay out a completed, unclaimed daily quest.
///
/// # Errors
///
/// `QuestIncomplete` before the target is reached, `QuestClaimed` on repeat.
pub fn claim_quest_reward(
    player: &mut Player,
    cfg: &QuestConfig,
    curve: &LevelCurve,
    rewards: &RewardTable,
) -> GameResult<QuestReward> {
    if player.quest.claimed {
        return Err(StateError::QuestClaimed.into());
    }
    if !player.quest.is_complete(cfg) {
        return Err(StateError::QuestIncomplete.into());
    }
    player.quest.claimed = true;
    player.gold = player.gold.saturating_add(cfg.reward_gold);
    player.power_stones = player.power_stones.saturating_add(cfg.reward_power_stones);
    let experience = add_experience(player, cfg.reward_experience, curve, rewards);
    Ok(QuestReward {
        gold: cfg.reward_gold,
        power_stones: cfg.reward_power_stones,
        experience,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::player::PlayerId;

    #[test]
    fn progress_caps_at_target() {
        let cfg = QuestConfig::default();
        let mut quest = DailyQuest::default();
        assert!(quest.record_arena_battle(&cfg));
        assert!(quest.record_arena_battle(&cfg));
        assert!(quest.record_arena_battle(&cfg));
        assert!(!quest.record_arena_battle(&cfg));
        assert_eq!(quest.progress, 3);
        assert!(quest.is_complete(&cfg));
    }

    #[test]
    fn reward_is_claimable_once() {
        let cfg = QuestConfig::default();
        let curve = LevelCurve::default();
        let table = RewardTable::default();
        let mut player = Player::new(PlayerId::new(3), "quester").unwrap();

        assert_eq!(
            claim_quest_reward(&mut player, &cfg, &curve, &table),
            Err(GameError::InvalidState(StateError::QuestIncomplete))
        );
        player.quest.progress = 3;
        let reward = claim_quest_reward(&mut player, &cfg, &curve, &table).unwrap();
        assert_eq!(reward.gold, 10);
        assert_eq!(player.gold, 110);
        assert_eq!(player.power_stones, 1);
        assert_eq!(player.experience, 10);
        assert_eq!(
            claim_quest_reward(&mut player, &cfg, &curve, &table),
            Err(GameError::InvalidState(StateError::QuestClaimed))
        );
    }
}
