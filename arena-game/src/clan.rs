//! Clan membership bookkeeping.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Entity, GameError, GameResult, StateError, ValidationError};
use crate::player::{Player, PlayerId};

pub const CLAN_CAPACITY: usize = 20;

static CLAN_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _-]{3,24}$").ok());

/// Trimmed name of 3 to 24 letters, digits, spaces, `_` or `-`.
///
/// # Errors
///
/// `InvalidClanName` otherwise.
pub fn validate_clan_name(name: &str) -> GameResult<String> {
    let trimmed = name.trim();
    let valid = CLAN_NAME
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(trimmed));
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidClanName(name.to_string()).into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clan {
    pub id: u64,
    pub name: String,
    pub leader: PlayerId,
    /// Join order, leader included.
    pub members: Vec<PlayerId>,
}

impl Clan {
    #[must_use]
    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.members.contains(&player_id)
    }
}

/// What happened to the clan when a member left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Departure {
    Left,
    LeaderChanged { new_leader: PlayerId },
    Disbanded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanDirectory {
    clans: BTreeMap<u64, Clan>,
    membership: HashMap<PlayerId, u64>,
    next_id: u64,
    capacity: Option<usize>,
}

impl ClanDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    fn capacity(&self) -> usize {
        self.capacity.unwrap_or(CLAN_CAPACITY)
    }

    #[must_use]
    pub fn get(&self, clan_id: u64) -> Option<&Clan> {
        self.clans.get(&clan_id)
    }

    #[must_use]
    pub fn clan_of(&self, player_id: PlayerId) -> Option<&Clan> {
        self.membership
            .get(&player_id)
            .and_then(|clan_id| self.clans.get(clan_id))
    }

    pub fn clans(&self) -> impl Iterator<Item = &Clan> {
        self.clans.values()
    }

    fn ensure_clanless(&self, player_id: PlayerId) -> GameResult<()> {
        if self.membership.contains_key(&player_id) {
            return Err(StateError::AlreadyInClan(player_id).into());
        }
        Ok(())
    }

    fn membership_of(&self, player_id: PlayerId) -> GameResult<u64> {
        self.membership
            .get(&player_id)
            .copied()
            .ok_or_else(|| StateError::NotInClan(player_id).into())
    }

    fn clan_mut(&mut self, clan_id: u64) -> GameResult<&mut Clan> {
        self.clans
            .get_mut(&clan_id)
            .ok_or_else(|| GameError::not_found(Entity::Clan, clan_id))
    }

    /// Found a clan led by `leader`.
    ///
    /// # Errors
    ///
    /// `InvalidClanName`, `ClanNameTaken` (case-insensitive) or `AlreadyInClan`.
    pub fn create_clan(&mut self, leader: PlayerId, name: &str) -> GameResult<&Clan> {
        let name = validate_clan_name(name)?;
        let folded = name.to_lowercase();
        if self
            .clans
            .values()
            .any(|clan| clan.name.to_lowercase() == folded)
        {
            return Err(ValidationError::ClanNameTaken(name).into());
        }
        self.ensure_clanless(leader)?;

        self.next_id += 1;
        let clan_id = self.next_id;
        self.membership.insert(leader, clan_id);
        log::info!("player {leader} founded clan {clan_id} ({name})");
        let clan = self.clans.entry(clan_id).or_insert(Clan {
            id: clan_id,
            name,
            leader,
            members: vec![leader],
        });
        Ok(clan)
    }

    /// # Errors
    ///
    /// `NotFound`, `AlreadyInClan` or `ClanFull`.
    pub fn join_clan(&mut self, player_id: PlayerId, clan_id: u64) -> GameResult<()> {
        let capacity = self.capacity();
        self.ensure_clanless(player_id)?;
        let clan = self.clan_mut(clan_id)?;
        if clan.members.len() >= capacity {
            return Err(StateError::ClanFull { capacity }.into());
        }
        clan.members.push(player_id);
        self.membership.insert(player_id, clan_id);
        Ok(())
    }

    /// Leave the current clan. A departing leader hands over to the
    /// strongest remaining member per `roster`; the last member disbands it.
    ///
    /// # Errors
    ///
    /// `NotInClan`.
    pub fn leave_clan(&mut self, player_id: PlayerId, roster: &[Player]) -> GameResult<Departure> {
        let clan_id = self.membership_of(player_id)?;
        let clan = self.clan_mut(clan_id)?;
        clan.members.retain(|member| *member != player_id);

        let departure = if clan.members.is_empty() {
            Departure::Disbanded
        } else if clan.leader == player_id {
            let power_of = |id: PlayerId| {
                roster
                    .iter()
                    .find(|player| player.id == id)
                    .map_or(0, |player| player.power)
            };
            let mut successor = clan.members[0];
            for member in &clan.members {
                let better = (power_of(*member), std::cmp::Reverse(*member))
                    > (power_of(successor), std::cmp::Reverse(successor));
                if better {
                    successor = *member;
                }
            }
            clan.leader = successor;
            Departure::LeaderChanged {
                new_leader: successor,
            }
        } else {
            Departure::Left
        };

        self.membership.remove(&player_id);
        if departure == Departure::Disbanded {
            self.clans.remove(&clan_id);
            log::info!("clan {clan_id} disbanded");
        }
        Ok(departure)
    }

    /// Leader-only removal of another member.
    ///
    /// # Errors
    ///
    /// `NotInClan`, `NotClanLeader` or `CannotRemoveSelf`.
    pub fn remove_member(&mut self, leader: PlayerId, member: PlayerId) -> GameResult<()> {
        if leader == member {
            return Err(StateError::CannotRemoveSelf.into());
        }
        let clan_id = self.membership_of(leader)?;
        if self.membership.get(&member) != Some(&clan_id) {
            return Err(StateError::NotInClan(member).into());
        }
        let clan = self.clan_mut(clan_id)?;
        if clan.leader != leader {
            return Err(StateError::NotClanLeader(leader).into());
        }
        clan.members.retain(|id| *id != member);
        self.membership.remove(&member);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> PlayerId {
        PlayerId::new(raw)
    }

    fn member(raw: u64, power: u64) -> Player {
        let mut player = Player::new(id(raw), format!("m{raw}")).unwrap();
        player.power = power;
        player
    }

    #[test]
    fn names_are_validated() {
        assert_eq!(validate_clan_name("  Iron Wolves ").unwrap(), "Iron Wolves");
        assert!(validate_clan_name("ab").is_err());
        assert!(validate_clan_name("way too long for any clan name").is_err());
        assert!(validate_clan_name("bad!name").is_err());
        assert!(validate_clan_name("under_score-ok").is_ok());
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut clans = ClanDirectory::new();
        clans.create_clan(id(1), "Night Watch").unwrap();
        assert_eq!(
            clans.create_clan(id(2), "night watch").unwrap_err(),
            GameError::Validation(ValidationError::ClanNameTaken("night watch".into()))
        );
        assert_eq!(
            clans.create_clan(id(1), "Second").unwrap_err(),
            GameError::InvalidState(StateError::AlreadyInClan(id(1)))
        );
    }

    #[test]
    fn join_respects_capacity() {
        let mut clans = ClanDirectory::with_capacity(2);
        let clan_id = clans.create_clan(id(1), "Tiny").unwrap().id;
        clans.join_clan(id(2), clan_id).unwrap();
        assert_eq!(
            clans.join_clan(id(3), clan_id),
            Err(GameError::InvalidState(StateError::ClanFull { capacity: 2 }))
        );
        assert!(clans.join_clan(id(3), 99).is_err());
        assert_eq!(clans.clan_of(id(2)).map(|clan| clan.id), Some(clan_id));
    }

    #[test]
    fn leader_departure_hands_over_to_strongest() {
        let mut clans = ClanDirectory::new();
        let clan_id = clans.create_clan(id(1), "Ravens").unwrap().id;
        for raw in 2..=4 {
            clans.join_clan(id(raw), clan_id).unwrap();
        }
        let roster = vec![member(1, 5_000), member(2, 1_200), member(3, 2_400), member(4, 2_400)];
        assert_eq!(
            clans.leave_clan(id(1), &roster).unwrap(),
            Departure::LeaderChanged { new_leader: id(3) }
        );
        assert_eq!(clans.get(clan_id).unwrap().leader, id(3));
        assert!(clans.clan_of(id(1)).is_none());
        assert_eq!(clans.leave_clan(id(2), &roster).unwrap(), Departure::Left);
    }

    #[test]
    fn last_member_disbands() {
        let mut clans = ClanDirectory::new();
        let clan_id = clans.create_clan(id(7), "Solo").unwrap().id;
        assert_eq!(clans.leave_clan(id(7), &[]).unwrap(), Departure::Disbanded);
        assert!(clans.get(clan_id).is_none());
        assert!(clans.leave_clan(id(7), &[]).is_err());
        assert!(clans.create_clan(id(8), "Solo").is_ok());
    }

    #[test]
    fn only_the_leader_removes_members() {
        let mut clans = ClanDirectory::new();
        let clan_id = clans.create_clan(id(1), "Keepers").unwrap().id;
        clans.join_clan(id(2), clan_id).unwrap();
        clans.join_clan(id(3), clan_id).unwrap();
        assert_eq!(
            clans.remove_member(id(2), id(3)),
            Err(GameError::InvalidState(StateError::NotClanLeader(id(2))))
        );
        assert_eq!(
            clans.remove_member(id(1), id(1)),
            Err(GameError::InvalidState(StateError::CannotRemoveSelf))
        );
        clans.remove_member(id(1), id(3)).unwrap();
        assert!(clans.clan_of(id(3)).is_none());
        assert_eq!(clans.get(clan_id).unwrap().members, vec![id(1), id(2)]);
    }
}
