//! Persistence seams and in-memory adapters.
//!
//! Engines never persist; the orchestrating service loads a [`Player`], runs
//! the engine on a copy and writes back a [`PlayerPatch`] guarded by the
//! version it loaded.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Entity, RepoError};
use crate::items::Inventory;
use crate::player::{Player, PlayerId};
use crate::quests::DailyQuest;
use crate::world_boss::WorldBoss;

/// Changed fields only; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPatch {
    pub level: Option<u32>,
    pub experience: Option<u64>,
    pub gold: Option<u64>,
    pub fame: Option<u64>,
    pub power_stones: Option<u64>,
    pub power: Option<u64>,
    pub daily_matches_left: Option<u32>,
    pub last_daily_reset: Option<DateTime<Utc>>,
    pub inventory: Option<Inventory>,
    pub quest: Option<DailyQuest>,
    pub farm_attempts: Option<BTreeMap<String, u32>>,
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

impl PlayerPatch {
    /// Fields that differ between two snapshots of the same player.
    #[must_use]
    pub fn diff(before: &Player, after: &Player) -> Self {
        Self {
            level: changed(&before.level, &after.level),
            experience: changed(&before.experience, &after.experience),
            gold: changed(&before.gold, &after.gold),
            fame: changed(&before.fame, &after.fame),
            power_stones: changed(&before.power_stones, &after.power_stones),
            power: changed(&before.power, &after.power),
            daily_matches_left: changed(&before.daily_matches_left, &after.daily_matches_left),
            last_daily_reset: changed(&before.last_daily_reset, &after.last_daily_reset).flatten(),
            inventory: changed(&before.inventory, &after.inventory),
            quest: changed(&before.quest, &after.quest),
            farm_attempts: changed(&before.farm_attempts, &after.farm_attempts),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, player: &mut Player) {
        if let Some(level) = self.level {
            player.level = level;
        }
        if let Some(experience) = self.experience {
            player.experience = experience;
        }
        if let Some(gold) = self.gold {
            player.gold = gold;
        }
        if let Some(fame) = self.fame {
            player.fame = fame;
        }
        if let Some(power_stones) = self.power_stones {
            player.power_stones = power_stones;
        }
        if let Some(power) = self.power {
            player.power = power;
        }
        if let Some(matches) = self.daily_matches_left {
            player.daily_matches_left = matches;
        }
        if let Some(reset) = self.last_daily_reset {
            player.last_daily_reset = Some(reset);
        }
        if let Some(inventory) = self.inventory {
            player.inventory = inventory;
        }
        if let Some(quest) = self.quest {
            player.quest = quest;
        }
        if let Some(farm_attempts) = self.farm_attempts {
            player.farm_attempts = farm_attempts;
        }
    }
}

/// Selection for matchmaking pools and leaderboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub exclude: Option<PlayerId>,
    pub min_power: Option<u64>,
    pub max_power: Option<u64>,
    pub limit: Option<usize>,
}

impl CandidateFilter {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            exclude: None,
            min_power: None,
            max_power: None,
            limit: None,
        }
    }

    #[must_use]
    pub const fn excluding(player_id: PlayerId) -> Self {
        Self {
            exclude: Some(player_id),
            ..Self::all()
        }
    }

    #[must_use]
    pub fn matches(&self, player: &Player) -> bool {
        self.exclude != Some(player.id)
            && self.min_power.is_none_or(|min| player.power >= min)
            && self.max_power.is_none_or(|max| player.power <= max)
    }
}

pub trait PlayerRepository {
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    fn get(&self, player_id: PlayerId) -> Result<Player, RepoError>;

    /// Store a new player at version 1.
    ///
    /// # Errors
    ///
    /// `Duplicate` when the id is taken.
    fn insert(&self, player: Player) -> Result<Player, RepoError>;

    /// Apply `patch` if the stored version still equals `expected_version`,
    /// then bump the version.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Conflict` on a stale version.
    fn update(
        &self,
        player_id: PlayerId,
        expected_version: u64,
        patch: PlayerPatch,
    ) -> Result<Player, RepoError>;

    /// Players matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Player>, RepoError>;

    /// Next unused player id.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn next_id(&self) -> Result<PlayerId, RepoError>;
}

pub trait BossRepository {
    /// Most recently spawned battle, if any.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn latest(&self) -> Result<Option<WorldBoss>, RepoError>;

    /// # Errors
    ///
    /// `NotFound` for unknown battles.
    fn get(&self, battle_id: u64) -> Result<WorldBoss, RepoError>;

    /// Write `boss` if the stored revision still equals `expected_version`
    /// (`0` for a battle that was never saved), then bump the version.
    ///
    /// # Errors
    ///
    /// `BossConflict` on a stale version.
    fn save(&self, boss: &WorldBoss, expected_version: u64) -> Result<WorldBoss, RepoError>;
}

/// Shared-handle player store; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlayerRepository {
    players: Rc<RefCell<HashMap<PlayerId, Player>>>,
}

impl InMemoryPlayerRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.borrow().is_empty()
    }
}

fn player_not_found(player_id: PlayerId) -> RepoError {
    RepoError::NotFound {
        entity: Entity::Player,
        id: player_id.to_string(),
    }
}

impl PlayerRepository for InMemoryPlayerRepository {
    fn get(&self, player_id: PlayerId) -> Result<Player, RepoError> {
        self.players
            .borrow()
            .get(&player_id)
            .cloned()
            .ok_or_else(|| player_not_found(player_id))
    }

    fn insert(&self, mut player: Player) -> Result<Player, RepoError> {
        let mut players = self.players.borrow_mut();
        if players.contains_key(&player.id) {
            return Err(RepoError::Duplicate(player.id));
        }
        player.version = 1;
        players.insert(player.id, player.clone());
        Ok(player)
    }

    fn update(
        &self,
        player_id: PlayerId,
        expected_version: u64,
        patch: PlayerPatch,
    ) -> Result<Player, RepoError> {
        let mut players = self.players.borrow_mut();
        let stored = players
            .get_mut(&player_id)
            .ok_or_else(|| player_not_found(player_id))?;
        if stored.version != expected_version {
            return Err(RepoError::Conflict {
                id: player_id,
                expected: expected_version,
                found: stored.version,
            });
        }
        patch.apply(stored);
        stored.version += 1;
        Ok(stored.clone())
    }

    fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Player>, RepoError> {
        let players = self.players.borrow();
        let mut matching: Vec<Player> = players
            .values()
            .filter(|player| filter.matches(player))
            .cloned()
            .collect();
        matching.sort_by_key(|player| player.id);
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    fn next_id(&self) -> Result<PlayerId, RepoError> {
        let players = self.players.borrow();
        let highest = players.keys().map(|id| id.get()).max().unwrap_or(0);
        Ok(PlayerId::new(highest + 1))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBossRepository {
    battles: Rc<RefCell<BTreeMap<u64, WorldBoss>>>,
}

impl InMemoryBossRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BossRepository for InMemoryBossRepository {
    fn latest(&self) -> Result<Option<WorldBoss>, RepoError> {
        Ok(self
            .battles
            .borrow()
            .last_key_value()
            .map(|(_, boss)| boss.clone()))
    }

    fn get(&self, battle_id: u64) -> Result<WorldBoss, RepoError> {
        self.battles
            .borrow()
            .get(&battle_id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                entity: Entity::Boss,
                id: battle_id.to_string(),
            })
    }

    fn save(&self, boss: &WorldBoss, expected_version: u64) -> Result<WorldBoss, RepoError> {
        let mut battles = self.battles.borrow_mut();
        let found = battles.get(&boss.battle_id).map_or(0, |stored| stored.version);
        if found != expected_version {
            return Err(RepoError::BossConflict {
                battle_id: boss.battle_id,
                expected: expected_version,
                found,
            });
        }
        let mut stored = boss.clone();
        stored.version = expected_version + 1;
        battles.insert(stored.battle_id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_boss::BossConfig;
    use chrono::TimeZone;

    fn player(raw: u64, power: u64) -> Player {
        let mut player = Player::new(PlayerId::new(raw), format!("p{raw}")).unwrap();
        player.power = power;
        player
    }

    #[test]
    fn diff_captures_only_changes() {
        let before = player(1, 1_000);
        let mut after = before.clone();
        after.gold += 50;
        after.quest.progress = 2;
        let patch = PlayerPatch::diff(&before, &after);
        assert_eq!(patch.gold, Some(150));
        assert!(patch.quest.is_some());
        assert_eq!(patch.fame, None);
        assert_eq!(patch.inventory, None);
        assert!(PlayerPatch::diff(&before, &before).is_empty());

        let mut applied = before;
        patch.apply(&mut applied);
        assert_eq!(applied, after);
    }

    #[test]
    fn stale_versions_are_rejected() {
        let repo = InMemoryPlayerRepository::new();
        let stored = repo.insert(player(1, 1_000)).unwrap();
        assert_eq!(stored.version, 1);
        let patch = PlayerPatch {
            gold: Some(500),
            ..PlayerPatch::default()
        };
        let updated = repo.update(stored.id, 1, patch.clone()).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.gold, 500);
        assert_eq!(
            repo.update(stored.id, 1, patch),
            Err(RepoError::Conflict {
                id: stored.id,
                expected: 1,
                found: 2
            })
        );
        assert_eq!(repo.get(stored.id).unwrap().gold, 500);
    }

    #[test]
    fn duplicates_and_missing_players() {
        let repo = InMemoryPlayerRepository::new();
        repo.insert(player(1, 1_000)).unwrap();
        assert_eq!(
            repo.insert(player(1, 1_000)),
            Err(RepoError::Duplicate(PlayerId::new(1)))
        );
        assert!(matches!(
            repo.get(PlayerId::new(2)),
            Err(RepoError::NotFound { .. })
        ));
        assert_eq!(repo.next_id().unwrap(), PlayerId::new(2));
    }

    #[test]
    fn candidates_filter_by_power_and_exclusion() {
        let repo = InMemoryPlayerRepository::new();
        for (raw, power) in [(3, 900), (1, 1_000), (2, 1_300), (4, 700)] {
            repo.insert(player(raw, power)).unwrap();
        }
        let filter = CandidateFilter {
            exclude: Some(PlayerId::new(1)),
            min_power: Some(800),
            max_power: Some(1_200),
            limit: None,
        };
        let ids: Vec<u64> = repo
            .list_candidates(&filter)
            .unwrap()
            .iter()
            .map(|p| p.id.get())
            .collect();
        assert_eq!(ids, vec![3]);
        let limited = CandidateFilter {
            limit: Some(2),
            ..CandidateFilter::all()
        };
        assert_eq!(repo.list_candidates(&limited).unwrap().len(), 2);
        let clone = repo.clone();
        assert_eq!(clone.len(), 4);
    }

    #[test]
    fn boss_repository_tracks_latest_battle() {
        let repo = InMemoryBossRepository::new();
        assert_eq!(repo.latest().unwrap(), None);
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        repo.save(&WorldBoss::from_config(1, &BossConfig::default(), start), 0)
            .unwrap();
        let second = repo
            .save(&WorldBoss::from_config(2, &BossConfig::default(), start), 0)
            .unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(repo.latest().unwrap().map(|boss| boss.battle_id), Some(2));
        assert!(repo.get(3).is_err());
    }

    #[test]
    fn stale_boss_writes_are_rejected() {
        let repo = InMemoryBossRepository::new();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let spawned = repo
            .save(&WorldBoss::from_config(1, &BossConfig::default(), start), 0)
            .unwrap();

        let mut first = spawned.clone();
        first.current_health -= 100;
        let written = repo.save(&first, spawned.version).unwrap();
        assert_eq!(written.version, 2);

        let mut stale = spawned.clone();
        stale.current_health -= 5;
        assert_eq!(
            repo.save(&stale, spawned.version),
            Err(RepoError::BossConflict {
                battle_id: 1,
                expected: 1,
                found: 2
            })
        );
        assert_eq!(repo.get(1).unwrap().current_health, first.current_health);
        assert!(repo.save(&spawned, 0).is_err());
    }
}
