//! The player aggregate.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::error::{GameError, GameResult, Resource, ValidationError};
use crate::items::{Inventory, PowerPolicy};
use crate::quests::DailyQuest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub level: u32,
    /// Cumulative experience; only explicit resets lower it.
    pub experience: u64,
    pub gold: u64,
    pub fame: u64,
    pub power_stones: u64,
    /// Power the player has with no items at all.
    pub base_power: u64,
    /// Cached `base_power` plus item power, see [`Player::recompute_power`].
    pub power: u64,
    pub daily_matches_left: u32,
    #[serde(default)]
    pub last_daily_reset: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub quest: DailyQuest,
    /// Farm attempts used today, keyed by monster id.
    #[serde(default)]
    pub farm_attempts: BTreeMap<String, u32>,
    /// Optimistic concurrency token maintained by the repository.
    #[serde(default)]
    pub version: u64,
}

impl Player {
    /// Register a player with the default starting values.
    ///
    /// # Errors
    ///
    /// Returns `EmptyUsername` when the trimmed username is empty.
    pub fn new(id: PlayerId, username: impl Into<String>) -> GameResult<Self> {
        Self::with_config(id, username, &PlayerConfig::default(), 10)
    }

    /// Register a player with explicit starting values.
    ///
    /// # Errors
    ///
    /// Returns `EmptyUsername` when the trimmed username is empty.
    pub fn with_config(
        id: PlayerId,
        username: impl Into<String>,
        cfg: &PlayerConfig,
        daily_matches: u32,
    ) -> GameResult<Self> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(ValidationError::EmptyUsername.into());
        }
        Ok(Self {
            id,
            username,
            level: cfg.starting_level.max(1),
            experience: 0,
            gold: cfg.starting_gold,
            fame: 0,
            power_stones: 0,
            base_power: cfg.base_power,
            power: cfg.base_power,
            daily_matches_left: daily_matches,
            last_daily_reset: None,
            inventory: Inventory::new(),
            quest: DailyQuest::default(),
            farm_attempts: BTreeMap::new(),
            version: 0,
        })
    }

    /// Refresh the cached power from base power and the counted items.
    pub fn recompute_power(&mut self, policy: PowerPolicy) -> u64 {
        self.power = self
            .base_power
            .saturating_add(self.inventory.total_power(policy));
        self.power
    }

    /// # Errors
    ///
    /// Returns `InsufficientResource` without touching gold when short.
    pub fn spend_gold(&mut self, amount: u64) -> GameResult<()> {
        self.gold = Self::checked_spend(Resource::Gold, self.gold, amount)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InsufficientResource` without touching fame when short.
    pub fn spend_fame(&mut self, amount: u64) -> GameResult<()> {
        self.fame = Self::checked_spend(Resource::Fame, self.fame, amount)?;
        Ok(())
    }

    /// Lower fame, flooring at zero.
    pub fn lose_fame(&mut self, amount: u64) {
        self.fame = self.fame.saturating_sub(amount);
    }

    pub(crate) fn ensure(resource: Resource, available: u64, required: u64) -> GameResult<()> {
        if available < required {
            return Err(GameError::short(resource, required, available));
        }
        Ok(())
    }

    fn checked_spend(resource: Resource, available: u64, amount: u64) -> GameResult<u64> {
        Self::ensure(resource, available, amount)?;
        Ok(available - amount)
    }
}
