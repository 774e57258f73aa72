//! Casino minigames sharing one bet contract.
//!
//! Each game resolves to a [`CasinoSettlement`]; gold moves only when a round
//! is settled, so an abandoned round costs nothing.

pub mod blackjack;
pub mod coin_flip;
pub mod scratch;

use serde::{Deserialize, Serialize};

use crate::error::{GameResult, Resource, ValidationError};
use crate::player::Player;

pub use blackjack::{
    BlackjackPhase, BlackjackResult, BlackjackRound, Card, Deck, Rank, Suit, hand_value,
};
pub use coin_flip::{CoinFlipOutcome, CoinSide, flip_coin, play_coin_flip};
pub use scratch::{
    PrizeWeight, ScratchConfig, ScratchOutcome, draw_cells, play_scratch_card, winning_value,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasinoConfig {
    #[serde(default = "CasinoConfig::default_min_bet")]
    pub min_bet: u64,
    #[serde(default = "CasinoConfig::default_max_bet")]
    pub max_bet: u64,
    /// Dealer keeps drawing while below this total.
    #[serde(default = "CasinoConfig::default_dealer_stand")]
    pub dealer_stand: u32,
    #[serde(default)]
    pub scratch: ScratchConfig,
}

impl CasinoConfig {
    const fn default_min_bet() -> u64 {
        10
    }

    const fn default_max_bet() -> u64 {
        1_000
    }

    const fn default_dealer_stand() -> u32 {
        17
    }
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            min_bet: Self::default_min_bet(),
            max_bet: Self::default_max_bet(),
            dealer_stand: Self::default_dealer_stand(),
            scratch: ScratchConfig::default(),
        }
    }
}

/// `min_bet <= bet <= max_bet` and `bet <= gold`.
///
/// # Errors
///
/// `InvalidBet` outside the limits, `InsufficientResource` when gold is short.
pub fn validate_bet(bet: u64, player: &Player, cfg: &CasinoConfig) -> GameResult<()> {
    if bet < cfg.min_bet || bet > cfg.max_bet {
        return Err(ValidationError::InvalidBet {
            bet,
            min: cfg.min_bet,
            max: cfg.max_bet,
        }
        .into());
    }
    Player::ensure(Resource::Gold, player.gold, bet)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasinoGame {
    CoinFlip,
    Blackjack,
    ScratchCard,
}

/// Gold movement for one settled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasinoSettlement {
    pub game: CasinoGame,
    /// Stake or entry cost.
    pub stake: u64,
    /// Gross amount paid back to the player.
    pub payout: u64,
    pub net: i64,
    pub gold_after: u64,
}

/// Take `stake`, pay `payout`, and report the net change.
pub(crate) fn settle(
    player: &mut Player,
    game: CasinoGame,
    stake: u64,
    payout: u64,
) -> GameResult<CasinoSettlement> {
    player.spend_gold(stake)?;
    player.gold = player.gold.saturating_add(payout);
    let net = i128::from(payout) - i128::from(stake);
    let net = i64::try_from(net).unwrap_or(if net < 0 { i64::MIN } else { i64::MAX });
    log::info!(
        "casino {game:?} for player {}: stake {stake}, payout {payout}, net {net}",
        player.id
    );
    Ok(CasinoSettlement {
        game,
        stake,
        payout,
        net,
        gold_after: player.gold,
    })
}
