//! Damage rolls, turn resolution and opponent selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameResult, StateError};
use crate::numbers::{floor_f64_to_u64, round_f64_to_u64, u64_to_f64};
use crate::player::{Player, PlayerId};
use crate::rng::RandomSource;

const SUCCESS_BASE: f64 = 0.5;
const SUCCESS_SWING: f64 = 0.4;
const SUCCESS_MIN: f64 = 0.1;
const SUCCESS_MAX: f64 = 0.9;

/// Inclusive damage range for an attack power.
#[must_use]
pub const fn damage_bounds(attack_power: u64) -> (u64, u64) {
    let half = attack_power / 2;
    let min = if half == 0 { 1 } else { half };
    let max = attack_power.saturating_add(half);
    if max < min { (min, min) } else { (min, max) }
}

/// Uniform integer damage in `[max(1, ⌊p/2⌋), ⌊1.5p⌋]`.
pub fn roll_damage(attack_power: u64, rng: &mut impl RandomSource) -> u64 {
    let (min, max) = damage_bounds(attack_power);
    let span = u64_to_f64(max - min + 1);
    let offset = floor_f64_to_u64(rng.uniform() * span);
    min.saturating_add(offset).min(max)
}

/// Starting health for a combatant: `⌊2p + 50⌋`.
#[must_use]
pub const fn health_for_power(power: u64) -> u64 {
    power.saturating_mul(2).saturating_add(50)
}

/// Single pass/fail chance for PvE encounters, clamped to `[0.1, 0.9]`.
#[must_use]
pub fn success_chance(player_power: u64, monster_power: u64) -> f64 {
    let player = u64_to_f64(player_power);
    let monster = u64_to_f64(monster_power);
    let chance = if player_power > monster_power {
        let edge = if monster_power == 0 {
            SUCCESS_SWING
        } else {
            (player - monster) / monster
        };
        SUCCESS_BASE + edge.min(SUCCESS_SWING)
    } else if player_power < monster_power {
        let deficit = if player_power == 0 {
            SUCCESS_SWING
        } else {
            (monster - player) / player
        };
        SUCCESS_BASE - deficit.min(SUCCESS_SWING)
    } else {
        SUCCESS_BASE
    };
    chance.clamp(SUCCESS_MIN, SUCCESS_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
        }
    }
}

/// Opponent chosen by matchmaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opponent {
    /// `None` for a synthesized bot.
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub power: u64,
}

impl Opponent {
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.player_id.is_none()
    }
}

/// First candidate within 80%..=120% of the player's power, or a bot.
pub fn matchmaking_opponent(
    player: &Player,
    candidates: &[Player],
    rng: &mut impl RandomSource,
) -> Opponent {
    let target = u128::from(player.power);
    let found = candidates.iter().find(|candidate| {
        let power = u128::from(candidate.power);
        candidate.id != player.id && power * 5 >= target * 4 && power * 5 <= target * 6
    });
    if let Some(candidate) = found {
        log::debug!(
            "matched player {} with {} (power {})",
            player.id,
            candidate.id,
            candidate.power
        );
        return Opponent {
            player_id: Some(candidate.id),
            name: candidate.username.clone(),
            power: candidate.power,
        };
    }
    let factor = rng.uniform_between(0.8, 1.2);
    let power = round_f64_to_u64(u64_to_f64(player.power) * factor);
    log::debug!("no candidate for player {}; bot power {power}", player.id);
    Opponent {
        player_id: None,
        name: String::from("Arena Bot"),
        power,
    }
}

/// One side of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub power: u64,
    pub max_health: u64,
    pub health: u64,
}

impl Combatant {
    #[must_use]
    pub fn new(player_id: Option<PlayerId>, name: impl Into<String>, power: u64) -> Self {
        let max_health = health_for_power(power);
        Self {
            player_id,
            name: name.into(),
            power,
            max_health,
            health: max_health,
        }
    }

    #[must_use]
    pub fn from_player(player: &Player) -> Self {
        Self::new(Some(player.id), player.username.clone(), player.power)
    }

    #[must_use]
    pub fn from_opponent(opponent: &Opponent) -> Self {
        Self::new(opponent.player_id, opponent.name.clone(), opponent.power)
    }

    #[must_use]
    pub const fn is_down(&self) -> bool {
        self.health == 0
    }

    /// Health-bar fraction in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health == 0 {
            return 0.0;
        }
        u64_to_f64(self.health) / u64_to_f64(self.max_health)
    }

    /// Change power mid-battle, keeping the same share of health.
    pub fn rescale(&mut self, new_power: u64) {
        let new_max = health_for_power(new_power);
        if self.max_health > 0 {
            let scaled =
                u128::from(self.health) * u128::from(new_max) / u128::from(self.max_health);
            self.health = u64::try_from(scaled).unwrap_or(new_max).min(new_max);
        } else {
            self.health = new_max;
        }
        self.power = new_power;
        self.max_health = new_max;
    }
}

/// A single resolved turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub number: u32,
    pub actor: Side,
    pub damage: u64,
    pub target_health: u64,
}

impl fmt::Display for TurnRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "turn {}: {} hits {} for {} ({} hp left)",
            self.number,
            self.actor.label(),
            self.actor.opposite().label(),
            self.damage,
            self.target_health
        )
    }
}

/// Ephemeral battle state; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSession {
    pub attacker: Combatant,
    pub defender: Combatant,
    pub turn: Side,
    pub log: Vec<TurnRecord>,
    pub winner: Option<Side>,
}

impl BattleSession {
    /// Start a battle; the attacker moves first.
    #[must_use]
    pub const fn new(attacker: Combatant, defender: Combatant) -> Self {
        Self {
            attacker,
            defender,
            turn: Side::Attacker,
            log: Vec::new(),
            winner: None,
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    #[must_use]
    pub const fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    pub const fn combatant_mut(&mut self, side: Side) -> &mut Combatant {
        match side {
            Side::Attacker => &mut self.attacker,
            Side::Defender => &mut self.defender,
        }
    }

    /// Presentation lines for the battle log, oldest first.
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(ToString::to_string).collect()
    }
}

/// Resolve the turn of whichever side is due to act.
///
/// # Errors
///
/// Returns `InvalidTransition` once the battle is over.
pub fn resolve_turn(
    session: &mut BattleSession,
    rng: &mut impl RandomSource,
) -> GameResult<TurnRecord> {
    let actor = session.turn;
    strike(session, actor, rng)
}

/// Resolve a turn on behalf of `actor`.
///
/// # Errors
///
/// Returns `NotYourTurn` when `actor` is not due and `InvalidTransition` once
/// the battle is over.
pub fn strike(
    session: &mut BattleSession,
    actor: Side,
    rng: &mut impl RandomSource,
) -> GameResult<TurnRecord> {
    if session.is_finished() {
        return Err(StateError::InvalidTransition {
            phase: "battle finished",
            action: "attack",
        }
        .into());
    }
    if session.turn != actor {
        return Err(StateError::NotYourTurn(actor.label()).into());
    }

    let number = u32::try_from(session.log.len())
        .unwrap_or(u32::MAX)
        .saturating_add(1);
    let damage = roll_damage(session.combatant(actor).power, rng);
    let target = session.combatant_mut(actor.opposite());
    target.health = target.health.saturating_sub(damage);
    let target_down = target.is_down();
    let record = TurnRecord {
        number,
        actor,
        damage,
        target_health: target.health,
    };
    log::debug!("{record}");
    session.log.push(record);

    if target_down {
        session.winner = Some(actor);
    } else {
        session.turn = actor.opposite();
    }
    Ok(record)
}

/// Alternate turns until one side reaches zero health; returns the winner.
pub fn run_to_completion(session: &mut BattleSession, rng: &mut impl RandomSource) -> Side {
    while session.winner.is_none() {
        if resolve_turn(session, rng).is_err() {
            break;
        }
    }
    session.winner.unwrap_or(Side::Defender)
}
