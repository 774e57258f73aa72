//! Versioned economy configuration injected into every engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arena::ArenaConfig;
use crate::casino::CasinoConfig;
use crate::enhancement::EnhanceConfig;
use crate::farm::FarmConfig;
use crate::items::PowerPolicy;
use crate::leveling::{LevelCurve, RewardTable};
use crate::market::MarketConfig;
use crate::quests::QuestConfig;
use crate::world_boss::BossConfig;

const DEFAULT_ECONOMY_DATA: &str = include_str!("../data/economy.json");

/// Starting values for newly registered players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "PlayerConfig::default_starting_level")]
    pub starting_level: u32,
    #[serde(default = "PlayerConfig::default_starting_gold")]
    pub starting_gold: u64,
    #[serde(default = "PlayerConfig::default_base_power")]
    pub base_power: u64,
    #[serde(default)]
    pub power_policy: PowerPolicy,
}

impl PlayerConfig {
    const fn default_starting_level() -> u32 {
        1
    }

    const fn default_starting_gold() -> u64 {
        100
    }

    const fn default_base_power() -> u64 {
        1_000
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            starting_level: Self::default_starting_level(),
            starting_gold: Self::default_starting_gold(),
            base_power: Self::default_base_power(),
            power_policy: PowerPolicy::default(),
        }
    }
}

/// Every table the engines read, loaded once and immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_version")]
    pub version: u32,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub leveling: LevelCurve,
    #[serde(default)]
    pub rewards: RewardTable,
    #[serde(default)]
    pub enhance: EnhanceConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub boss: BossConfig,
    #[serde(default)]
    pub casino: CasinoConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub quest: QuestConfig,
    #[serde(default)]
    pub farm: FarmConfig,
}

/// Errors raised when economy configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid economy JSON: {0}")]
    Parse(String),
    #[error("experience curve must start at 0 and have at least two levels")]
    CurveTooShort,
    #[error("experience curve must be strictly increasing (level {level})")]
    CurveNotIncreasing { level: usize },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("bet limits invalid (min {min}, max {max})")]
    BetLimits { min: u64, max: u64 },
    #[error("scratch prize table must be non-empty with positive weights")]
    PrizeTable,
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
}

impl EngineConfig {
    const fn default_version() -> u32 {
        1
    }

    /// Parse caller-supplied economy data; missing sections take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Defaults built in code, ignoring the embedded asset.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            version: Self::default_version(),
            player: PlayerConfig::default(),
            leveling: LevelCurve::default(),
            rewards: RewardTable::default(),
            enhance: EnhanceConfig::default(),
            arena: ArenaConfig::default(),
            boss: BossConfig::default(),
            casino: CasinoConfig::default(),
            market: MarketConfig::default(),
            quest: QuestConfig::default(),
            farm: FarmConfig::default(),
        }
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_curve()?;
        self.validate_chances()?;
        self.validate_casino()?;
        self.validate_daily_caps()?;
        Ok(())
    }

    fn validate_curve(&self) -> Result<(), ConfigError> {
        let thresholds = self.leveling.thresholds();
        if thresholds.len() < 2 || thresholds[0] != 0 {
            return Err(ConfigError::CurveTooShort);
        }
        if let Some(level) = thresholds
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(ConfigError::CurveNotIncreasing { level: level + 1 });
        }
        Ok(())
    }

    fn validate_chances(&self) -> Result<(), ConfigError> {
        let chances = self
            .enhance
            .success
            .values()
            .copied()
            .chain(std::iter::once(self.enhance.fallback_chance));
        for value in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field: "enhance.success",
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        let boss = &self.boss;
        if !(0.0..=boss.max_multiplier).contains(&boss.min_multiplier) {
            return Err(ConfigError::RangeViolation {
                field: "boss.min_multiplier",
                min: 0.0,
                max: boss.max_multiplier,
                value: boss.min_multiplier,
            });
        }
        Ok(())
    }

    fn validate_casino(&self) -> Result<(), ConfigError> {
        let casino = &self.casino;
        if casino.min_bet == 0 || casino.min_bet > casino.max_bet {
            return Err(ConfigError::BetLimits {
                min: casino.min_bet,
                max: casino.max_bet,
            });
        }
        let scratch = &casino.scratch;
        if scratch.prizes.is_empty() || scratch.prizes.iter().any(|prize| prize.weight <= 0.0) {
            return Err(ConfigError::PrizeTable);
        }
        if scratch.max_repeats == 0 {
            return Err(ConfigError::NotPositive {
                field: "scratch.max_repeats",
            });
        }
        if scratch.cells == 0 {
            return Err(ConfigError::NotPositive {
                field: "scratch.cells",
            });
        }
        Ok(())
    }

    fn validate_daily_caps(&self) -> Result<(), ConfigError> {
        if self.arena.daily_matches == 0 {
            return Err(ConfigError::NotPositive {
                field: "arena.daily_matches",
            });
        }
        if self.farm.daily_attempts == 0 {
            return Err(ConfigError::NotPositive {
                field: "farm.daily_attempts",
            });
        }
        if self.quest.arena_target == 0 {
            return Err(ConfigError::NotPositive {
                field: "quest.arena_target",
            });
        }
        if self.boss.max_health == 0 {
            return Err(ConfigError::NotPositive {
                field: "boss.max_health",
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_ECONOMY_DATA).unwrap_or_else(|_| Self::builtin())
    }
}
