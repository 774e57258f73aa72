//! Direct player-versus-player challenge resolved by a single roll.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{GameResult, ValidationError};
use crate::leveling::{ExperienceGain, add_experience};
use crate::numbers::u64_to_f64;
use crate::player::{Player, PlayerId};
use crate::rng::RandomSource;

/// `0.5 + (c - t) / (c + t) * 0.5`, or even odds when both sides have no power.
#[must_use]
pub fn challenge_win_probability(challenger_power: u64, target_power: u64) -> f64 {
    let total = u64_to_f64(challenger_power) + u64_to_f64(target_power);
    if total <= 0.0 {
        return 0.5;
    }
    let edge = (u64_to_f64(challenger_power) - u64_to_f64(target_power)) / total;
    edge.mul_add(0.5, 0.5)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeOutcome {
    pub challenger: PlayerId,
    pub target: PlayerId,
    pub winner: PlayerId,
    pub win_probability: f64,
    pub roll: f64,
    pub winner_fame: u64,
    pub loser_fame: u64,
    /// Only set when the challenger wins.
    pub experience: Option<ExperienceGain>,
}

impl ChallengeOutcome {
    #[must_use]
    pub fn challenger_won(&self) -> bool {
        self.winner == self.challenger
    }
}

/// Resolve a challenge and apply fame to both sides.
///
/// # Errors
///
/// `SelfChallenge` when both ids match.
pub fn resolve_challenge(
    challenger: &mut Player,
    target: &mut Player,
    cfg: &EngineConfig,
    rng: &mut impl RandomSource,
) -> GameResult<ChallengeOutcome> {
    if challenger.id == target.id {
        return Err(ValidationError::SelfChallenge.into());
    }
    let win_probability = challenge_win_probability(challenger.power, target.power);
    let roll = rng.uniform();
    let challenger_won = roll < win_probability;

    let (winner, loser) = if challenger_won {
        (&mut *challenger, &mut *target)
    } else {
        (&mut *target, &mut *challenger)
    };
    winner.fame = winner.fame.saturating_add(cfg.arena.win_fame);
    loser.lose_fame(cfg.arena.loss_fame);
    let winner_id = winner.id;
    let winner_fame = winner.fame;
    let loser_fame = loser.fame;

    let experience = challenger_won.then(|| {
        add_experience(
            challenger,
            cfg.arena.win_experience,
            &cfg.leveling,
            &cfg.rewards,
        )
    });

    log::info!(
        "challenge {} -> {}: winner {} (p={win_probability:.3}, roll={roll:.3})",
        challenger.id,
        target.id,
        winner_id
    );

    Ok(ChallengeOutcome {
        challenger: challenger.id,
        target: target.id,
        winner: winner_id,
        win_probability,
        roll,
        winner_fame,
        loser_fame,
        experience,
    })
}
