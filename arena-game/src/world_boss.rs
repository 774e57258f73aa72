//! Shared world boss: one attack per player per battle, ranked contributions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GameResult, StateError};
use crate::numbers::{floor_f64_to_u64, u64_to_f64};
use crate::player::{Player, PlayerId};
use crate::rng::RandomSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    #[serde(default = "BossConfig::default_name")]
    pub name: String,
    #[serde(default = "BossConfig::default_max_health")]
    pub max_health: u64,
    #[serde(default = "BossConfig::default_gold_reward")]
    pub gold_reward: u64,
    #[serde(default = "BossConfig::default_duration_hours")]
    pub duration_hours: i64,
    /// Damage multiplier range `[min, max)` applied to attacker power.
    #[serde(default = "BossConfig::default_min_multiplier")]
    pub min_multiplier: f64,
    #[serde(default = "BossConfig::default_max_multiplier")]
    pub max_multiplier: f64,
}

impl BossConfig {
    fn default_name() -> String {
        String::from("Ancient Dragon")
    }

    const fn default_max_health() -> u64 {
        10_000
    }

    const fn default_gold_reward() -> u64 {
        1_000
    }

    const fn default_duration_hours() -> i64 {
        24
    }

    const fn default_min_multiplier() -> f64 {
        0.5
    }

    const fn default_max_multiplier() -> f64 {
        1.0
    }
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            max_health: Self::default_max_health(),
            gold_reward: Self::default_gold_reward(),
            duration_hours: Self::default_duration_hours(),
            min_multiplier: Self::default_min_multiplier(),
            max_multiplier: Self::default_max_multiplier(),
        }
    }
}

/// `max(1, ⌊power × uniform(min, max)⌋)`.
pub fn roll_boss_damage(power: u64, cfg: &BossConfig, rng: &mut impl RandomSource) -> u64 {
    let multiplier = rng.uniform_between(cfg.min_multiplier, cfg.max_multiplier);
    floor_f64_to_u64(u64_to_f64(power) * multiplier).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEntry {
    pub player_id: PlayerId,
    pub username: String,
    pub damage: u64,
    pub attacked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedContribution {
    pub rank: u32,
    pub player_id: PlayerId,
    pub username: String,
    pub damage: u64,
    pub champion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossAttack {
    pub battle_id: u64,
    pub player_id: PlayerId,
    pub damage: u64,
    pub remaining_health: u64,
    /// This attack brought the boss down.
    pub killing_blow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossReward {
    pub player_id: PlayerId,
    pub rank: u32,
    pub damage: u64,
    pub gold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBoss {
    pub battle_id: u64,
    pub name: String,
    pub max_health: u64,
    pub current_health: u64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub gold_reward: u64,
    #[serde(default)]
    pub contributions: Vec<DamageEntry>,
    #[serde(default)]
    pub rewards_distributed: bool,
    /// Stored revision; `0` until first saved.
    #[serde(default)]
    pub version: u64,
}

impl WorldBoss {
    #[must_use]
    pub fn spawn(
        battle_id: u64,
        name: impl Into<String>,
        max_health: u64,
        starts_at: DateTime<Utc>,
        duration: Duration,
        gold_reward: u64,
    ) -> Self {
        Self {
            battle_id,
            name: name.into(),
            max_health,
            current_health: max_health,
            starts_at,
            ends_at: starts_at + duration,
            gold_reward,
            contributions: Vec::new(),
            rewards_distributed: false,
            version: 0,
        }
    }

    #[must_use]
    pub fn from_config(battle_id: u64, cfg: &BossConfig, starts_at: DateTime<Utc>) -> Self {
        Self::spawn(
            battle_id,
            cfg.name.clone(),
            cfg.max_health,
            starts_at,
            Duration::hours(cfg.duration_hours),
            cfg.gold_reward,
        )
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.current_health == 0
    }

    #[must_use]
    pub fn has_attacked(&self, player_id: PlayerId) -> bool {
        self.contributions
            .iter()
            .any(|entry| entry.player_id == player_id)
    }

    #[must_use]
    pub fn total_damage(&self) -> u64 {
        self.contributions
            .iter()
            .map(|entry| entry.damage)
            .fold(0_u64, u64::saturating_add)
    }

    /// Record a player's single attack against this battle.
    ///
    /// # Errors
    ///
    /// `BossNotActive` outside the time window, `BossDefeated` once health is
    /// gone, `AlreadyAttacked` on a repeat attack.
    pub fn attack(
        &mut self,
        player: &Player,
        now: DateTime<Utc>,
        cfg: &BossConfig,
        rng: &mut impl RandomSource,
    ) -> GameResult<BossAttack> {
        if !self.is_active(now) {
            return Err(StateError::BossNotActive {
                battle_id: self.battle_id,
            }
            .into());
        }
        if self.is_defeated() {
            return Err(StateError::BossDefeated {
                battle_id: self.battle_id,
            }
            .into());
        }
        if self.has_attacked(player.id) {
            return Err(StateError::AlreadyAttacked {
                player_id: player.id,
                battle_id: self.battle_id,
            }
            .into());
        }

        let damage = roll_boss_damage(player.power, cfg, rng);
        self.current_health = self.current_health.saturating_sub(damage);
        self.contributions.push(DamageEntry {
            player_id: player.id,
            username: player.username.clone(),
            damage,
            attacked_at: now,
        });
        let killing_blow = self.is_defeated();
        if killing_blow {
            log::info!("{} (battle {}) defeated by {}", self.name, self.battle_id, player.id);
        }
        Ok(BossAttack {
            battle_id: self.battle_id,
            player_id: player.id,
            damage,
            remaining_health: self.current_health,
            killing_blow,
        })
    }

    /// Contributions by damage descending; earlier attacks win ties. Rank 1 is
    /// the champion.
    #[must_use]
    pub fn rankings(&self) -> Vec<RankedContribution> {
        let mut order: Vec<(usize, &DamageEntry)> = self.contributions.iter().enumerate().collect();
        order.sort_by(|(ia, a), (ib, b)| b.damage.cmp(&a.damage).then(ia.cmp(ib)));
        order
            .into_iter()
            .zip(1_u32..)
            .map(|((_, entry), rank)| RankedContribution {
                rank,
                player_id: entry.player_id,
                username: entry.username.clone(),
                damage: entry.damage,
                champion: rank == 1,
            })
            .collect()
    }

    /// Split the gold pool by damage share, floored, once the boss is down.
    ///
    /// # Errors
    ///
    /// `BossStillAlive` before defeat, `RewardsDistributed` on repeat.
    pub fn distribute_rewards(&mut self) -> GameResult<Vec<BossReward>> {
        if !self.is_defeated() {
            return Err(StateError::BossStillAlive {
                battle_id: self.battle_id,
            }
            .into());
        }
        if self.rewards_distributed {
            return Err(StateError::RewardsDistributed {
                battle_id: self.battle_id,
            }
            .into());
        }
        let total = u128::from(self.total_damage().max(1));
        let pool = u128::from(self.gold_reward);
        let rewards = self
            .rankings()
            .into_iter()
            .map(|ranked| BossReward {
                player_id: ranked.player_id,
                rank: ranked.rank,
                damage: ranked.damage,
                gold: u64::try_from(pool * u128::from(ranked.damage) / total).unwrap_or(0),
            })
            .collect();
        self.rewards_distributed = true;
        Ok(rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::rng::ScriptedSource;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn raider(id: u64, power: u64) -> Player {
        let mut player = Player::new(PlayerId::new(id), format!("r{id}")).unwrap();
        player.power = power;
        player
    }

    fn boss(health: u64) -> WorldBoss {
        WorldBoss::spawn(7, "Ancient Dragon", health, noon(), Duration::hours(1), 1_000)
    }

    #[test]
    fn half_multiplier_lands_exactly_on_zero() {
        let mut boss = boss(10_000);
        boss.current_health = 500;
        let attack = boss
            .attack(
                &raider(1, 1000),
                noon(),
                &BossConfig::default(),
                &mut ScriptedSource::constant(0.0),
            )
            .unwrap();
        assert_eq!(attack.damage, 500);
        assert_eq!(attack.remaining_health, 0);
        assert!(attack.killing_blow);
        assert!(boss.is_defeated());
    }

    #[test]
    fn damage_is_at_least_one() {
        let cfg = BossConfig::default();
        assert_eq!(roll_boss_damage(0, &cfg, &mut ScriptedSource::constant(0.9)), 1);
        assert_eq!(roll_boss_damage(1, &cfg, &mut ScriptedSource::constant(0.0)), 1);
    }

    #[test]
    fn one_attack_per_player() {
        let mut boss = boss(10_000);
        let cfg = BossConfig::default();
        let mut rng = ScriptedSource::constant(0.5);
        let player = raider(1, 100);
        boss.attack(&player, noon(), &cfg, &mut rng).unwrap();
        assert_eq!(
            boss.attack(&player, noon(), &cfg, &mut rng),
            Err(GameError::InvalidState(StateError::AlreadyAttacked {
                player_id: player.id,
                battle_id: 7
            }))
        );
        assert_eq!(boss.contributions.len(), 1);
    }

    #[test]
    fn attacks_outside_window_or_after_defeat_are_rejected() {
        let mut boss = boss(10);
        let cfg = BossConfig::default();
        let mut rng = ScriptedSource::constant(0.0);
        assert!(matches!(
            boss.attack(&raider(1, 100), noon() + Duration::hours(2), &cfg, &mut rng),
            Err(GameError::InvalidState(StateError::BossNotActive { .. }))
        ));
        boss.attack(&raider(1, 100), noon(), &cfg, &mut rng).unwrap();
        assert!(matches!(
            boss.attack(&raider(2, 100), noon(), &cfg, &mut rng),
            Err(GameError::InvalidState(StateError::BossDefeated { .. }))
        ));
    }

    #[test]
    fn rankings_and_rewards_follow_damage() {
        let mut boss = boss(1_000);
        let cfg = BossConfig::default();
        let mut rng = ScriptedSource::constant(0.0);
        assert!(boss.distribute_rewards().is_err());
        boss.attack(&raider(1, 200), noon(), &cfg, &mut rng).unwrap();
        boss.attack(&raider(2, 600), noon(), &cfg, &mut rng).unwrap();
        boss.attack(&raider(3, 200), noon(), &cfg, &mut rng).unwrap();
        boss.attack(&raider(4, 2000), noon(), &cfg, &mut rng).unwrap();
        assert!(boss.is_defeated());

        let ranks = boss.rankings();
        assert_eq!(ranks[0].player_id, PlayerId::new(4));
        assert!(ranks[0].champion);
        assert_eq!(ranks[2].player_id, PlayerId::new(1));
        assert_eq!(ranks[3].player_id, PlayerId::new(3));
        assert!(ranks.iter().skip(1).all(|entry| !entry.champion));

        let rewards = boss.distribute_rewards().unwrap();
        let gold: Vec<u64> = rewards.iter().map(|reward| reward.gold).collect();
        assert_eq!(gold, vec![666, 200, 66, 66]);
        assert!(rewards.iter().map(|r| r.gold).sum::<u64>() <= 1_000);
        assert_eq!(
            boss.distribute_rewards(),
            Err(GameError::InvalidState(StateError::RewardsDistributed {
                battle_id: 7
            }))
        );
    }
}
