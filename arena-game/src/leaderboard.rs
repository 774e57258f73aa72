//! Ranked views over a set of players.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId};

pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    Fame,
    Level,
    Power,
}

impl LeaderboardKind {
    #[must_use]
    pub fn score(self, player: &Player) -> u64 {
        match self {
            Self::Fame => player.fame,
            Self::Level => u64::from(player.level),
            Self::Power => player.power,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub player_id: PlayerId,
    pub username: String,
    pub score: u64,
}

/// Highest score first, ties broken by ascending player id.
#[must_use]
pub fn rank_players(players: &[Player], kind: LeaderboardKind, limit: usize) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by_key(|player| (Reverse(kind.score(player)), player.id));
    sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            rank: index + 1,
            player_id: player.id,
            username: player.username.clone(),
            score: kind.score(player),
        })
        .collect()
}

/// Position of `player_id` over the full, unlimited ordering.
#[must_use]
pub fn player_rank(players: &[Player], kind: LeaderboardKind, player_id: PlayerId) -> Option<usize> {
    rank_players(players, kind, players.len())
        .into_iter()
        .find(|entry| entry.player_id == player_id)
        .map(|entry| entry.rank)
}
