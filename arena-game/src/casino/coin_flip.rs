//! Coin flip: call a side, double or nothing.

use serde::{Deserialize, Serialize};

use super::{CasinoConfig, CasinoGame, CasinoSettlement, settle, validate_bet};
use crate::error::GameResult;
use crate::player::Player;
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSide {
    Heads,
    Tails,
}

/// Heads on draws below one half.
pub fn flip_coin(rng: &mut impl RandomSource) -> CoinSide {
    if rng.uniform() < 0.5 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinFlipOutcome {
    pub call: CoinSide,
    pub landed: CoinSide,
    pub won: bool,
    pub settlement: CasinoSettlement,
}

/// Validate the bet, flip, and settle: a win pays twice the bet.
///
/// # Errors
///
/// Bet validation errors only; a lost flip is an outcome.
pub fn play_coin_flip(
    player: &mut Player,
    bet: u64,
    call: CoinSide,
    cfg: &CasinoConfig,
    rng: &mut impl RandomSource,
) -> GameResult<CoinFlipOutcome> {
    validate_bet(bet, player, cfg)?;
    let landed = flip_coin(rng);
    let won = landed == call;
    let payout = if won { bet.saturating_mul(2) } else { 0 };
    let settlement = settle(player, CasinoGame::CoinFlip, bet, payout)?;
    Ok(CoinFlipOutcome {
        call,
        landed,
        won,
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerId;
    use crate::rng::{RngSource, ScriptedSource};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn losing_call_costs_exactly_the_bet() {
        let mut player = Player::new(PlayerId::new(1), "flipper").unwrap();
        player.gold = 500;
        let before = player.clone();
        let outcome = play_coin_flip(
            &mut player,
            100,
            CoinSide::Heads,
            &CasinoConfig::default(),
            &mut ScriptedSource::constant(0.7),
        )
        .unwrap();
        assert_eq!(outcome.landed, CoinSide::Tails);
        assert!(!outcome.won);
        assert_eq!(player.gold, 400);
        assert_eq!(
            Player {
                gold: before.gold,
                ..player.clone()
            },
            before
        );
    }

    #[test]
    fn winning_call_nets_the_bet() {
        let mut player = Player::new(PlayerId::new(1), "flipper").unwrap();
        let outcome = play_coin_flip(
            &mut player,
            100,
            CoinSide::Heads,
            &CasinoConfig::default(),
            &mut ScriptedSource::constant(0.2),
        )
        .unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.settlement.net, 100);
        assert_eq!(player.gold, 200);
    }

    #[test]
    fn coin_is_fair_over_many_flips() {
        let mut rng = RngSource::new(ChaCha20Rng::seed_from_u64(2024));
        let trials = 100_000;
        let heads = (0..trials)
            .filter(|_| flip_coin(&mut rng) == CoinSide::Heads)
            .count();
        let share = f64::from(u32::try_from(heads).unwrap()) / f64::from(trials);
        assert!((share - 0.5).abs() < 0.01, "heads share {share}");
    }
}
