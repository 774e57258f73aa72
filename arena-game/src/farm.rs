//! PvE farming: one pass/fail roll per attempt against a catalog monster.

use serde::{Deserialize, Serialize};

use crate::combat::success_chance;
use crate::config::EngineConfig;
use crate::error::{GameResult, Resource};
use crate::leveling::{ExperienceGain, add_experience};
use crate::player::Player;
use crate::rng::RandomSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: String,
    pub name: String,
    pub power: u64,
    pub experience_reward: u64,
    pub gold_reward: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Attempts per monster per UTC day.
    #[serde(default = "FarmConfig::default_daily_attempts")]
    pub daily_attempts: u32,
}

impl FarmConfig {
    const fn default_daily_attempts() -> u32 {
        5
    }
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            daily_attempts: Self::default_daily_attempts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmOutcome {
    pub monster_id: String,
    pub success: bool,
    pub chance: f64,
    pub roll: f64,
    pub gold_gained: u64,
    pub experience: Option<ExperienceGain>,
    pub attempts_left: u32,
}

/// Attempts the player still has against `monster_id` today.
#[must_use]
pub fn attempts_left(player: &Player, monster_id: &str, cfg: &FarmConfig) -> u32 {
    let used = player.farm_attempts.get(monster_id).copied().unwrap_or(0);
    cfg.daily_attempts.saturating_sub(used)
}

/// Spend one attempt and roll against the monster.
///
/// # Errors
///
/// `InsufficientResource` when today's attempts are used up.
pub fn farm_monster(
    player: &mut Player,
    monster: &Monster,
    cfg: &EngineConfig,
    rng: &mut impl RandomSource,
) -> GameResult<FarmOutcome> {
    let left = attempts_left(player, &monster.id, &cfg.farm);
    Player::ensure(Resource::FarmAttempts, u64::from(left), 1)?;
    *player.farm_attempts.entry(monster.id.clone()).or_insert(0) += 1;

    let chance = success_chance(player.power, monster.power);
    let roll = rng.uniform();
    let success = roll <= chance;

    let (gold_gained, experience) = if success {
        player.gold = player.gold.saturating_add(monster.gold_reward);
        let gain = add_experience(
            player,
            monster.experience_reward,
            &cfg.leveling,
            &cfg.rewards,
        );
        (monster.gold_reward, Some(gain))
    } else {
        (0, None)
    };

    log::debug!(
        "farm {} by player {}: roll {roll:.3} vs {chance:.3} -> {success}",
        monster.id,
        player.id
    );

    Ok(FarmOutcome {
        monster_id: monster.id.clone(),
        success,
        chance,
        roll,
        gold_gained,
        experience,
        attempts_left: left - 1,
    })
}
