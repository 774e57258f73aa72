//! Error taxonomy shared by every engine and the orchestrating service.
//!
//! Probabilistic results (a lost battle, a failed enhancement, a losing bet) are
//! never errors; they come back as structured outcomes. Errors here always mean
//! the intent was rejected before any state was mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::player::PlayerId;

/// Currency or counter a player can run short of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Gold,
    Fame,
    PowerStones,
    Experience,
    Level,
    DailyMatches,
    FarmAttempts,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Gold => "gold",
            Self::Fame => "fame",
            Self::PowerStones => "power stones",
            Self::Experience => "experience",
            Self::Level => "level",
            Self::DailyMatches => "daily matches",
            Self::FarmAttempts => "farm attempts",
        };
        f.write_str(label)
    }
}

/// Kind of entity referenced by a [`GameError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Player,
    Item,
    CatalogItem,
    Monster,
    Boss,
    Clan,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Player => "player",
            Self::Item => "item",
            Self::CatalogItem => "catalog item",
            Self::Monster => "monster",
            Self::Boss => "world boss",
            Self::Clan => "clan",
        };
        f.write_str(label)
    }
}

/// Input rejected before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bet {bet} outside allowed range {min}..={max}")]
    InvalidBet { bet: u64, min: u64, max: u64 },
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("invalid clan name {0:?}")]
    InvalidClanName(String),
    #[error("clan name {0:?} is already taken")]
    ClanNameTaken(String),
    #[error("a player cannot challenge themselves")]
    SelfChallenge,
    #[error("player already registered")]
    AlreadyRegistered,
}

/// Intent not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("player {player_id} already attacked boss battle {battle_id}")]
    AlreadyAttacked { player_id: PlayerId, battle_id: u64 },
    #[error("boss battle {battle_id} is not active")]
    BossNotActive { battle_id: u64 },
    #[error("boss battle {battle_id} is already defeated")]
    BossDefeated { battle_id: u64 },
    #[error("boss battle {battle_id} is still running")]
    BossStillAlive { battle_id: u64 },
    #[error("rewards for boss battle {battle_id} were already distributed")]
    RewardsDistributed { battle_id: u64 },
    #[error("item {item_id} is already at max enhance level {level}")]
    MaxEnhanceLevel { item_id: u64, level: u8 },
    #[error("item {item_id} has been sold")]
    ItemDeleted { item_id: u64 },
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },
    #[error("it is not the {0} turn")]
    NotYourTurn(&'static str),
    #[error("casino round already settled")]
    RoundSettled,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("player {0} is already in a clan")]
    AlreadyInClan(PlayerId),
    #[error("player {0} is not in a clan")]
    NotInClan(PlayerId),
    #[error("player {0} is not the clan leader")]
    NotClanLeader(PlayerId),
    #[error("clan is full ({capacity} members)")]
    ClanFull { capacity: usize },
    #[error("clan leader cannot remove themselves")]
    CannotRemoveSelf,
    #[error("daily quest is not complete")]
    QuestIncomplete,
    #[error("daily quest reward already claimed")]
    QuestClaimed,
}

/// Engine error returned by every fallible intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResource {
        resource: Resource,
        required: u64,
        available: u64,
    },
    #[error(transparent)]
    InvalidState(#[from] StateError),
    #[error("player {player_id} was modified concurrently (expected v{expected}, found v{found})")]
    ConcurrentModification {
        player_id: PlayerId,
        expected: u64,
        found: u64,
    },
    #[error("boss battle {battle_id} was modified concurrently (expected v{expected}, found v{found})")]
    BossModified {
        battle_id: u64,
        expected: u64,
        found: u64,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },
    #[error("level {level} is beyond the experience curve (max {max_level})")]
    LevelOutOfRange { level: u32, max_level: u32 },
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Coarse classification callers use to decide between retrying and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientResource,
    InvalidStateTransition,
    ConcurrentModification,
    NotFound,
    Storage,
}

impl GameError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::LevelOutOfRange { .. } => ErrorKind::Validation,
            Self::InsufficientResource { .. } => ErrorKind::InsufficientResource,
            Self::InvalidState(_) => ErrorKind::InvalidStateTransition,
            Self::ConcurrentModification { .. } | Self::BossModified { .. } => {
                ErrorKind::ConcurrentModification
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Only a stale write can succeed when replayed against fresh state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::BossModified { .. }
        )
    }

    pub(crate) fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) const fn short(resource: Resource, required: u64, available: u64) -> Self {
        Self::InsufficientResource {
            resource,
            required,
            available,
        }
    }
}

/// Errors reported by repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },
    #[error("stale write for {id}: expected v{expected}, found v{found}")]
    Conflict {
        id: PlayerId,
        expected: u64,
        found: u64,
    },
    #[error("stale write for boss battle {battle_id}: expected v{expected}, found v{found}")]
    BossConflict {
        battle_id: u64,
        expected: u64,
        found: u64,
    },
    #[error("player {0} already exists")]
    Duplicate(PlayerId),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<RepoError> for GameError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict {
                id,
                expected,
                found,
            } => Self::ConcurrentModification {
                player_id: id,
                expected,
                found,
            },
            RepoError::BossConflict {
                battle_id,
                expected,
                found,
            } => Self::BossModified {
                battle_id,
                expected,
                found,
            },
            RepoError::Duplicate(_) => ValidationError::AlreadyRegistered.into(),
            RepoError::Backend(message) => Self::Storage(message),
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
