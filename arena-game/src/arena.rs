//! PvP arena: `idle -> matchmaking -> battle -> finished -> idle`.
//!
//! Nothing touches the player until [`ArenaSession::settle`]; a session
//! abandoned before that leaves no trace.

use serde::{Deserialize, Serialize};

use crate::combat::{
    BattleSession, Combatant, Opponent, Side, TurnRecord, matchmaking_opponent, resolve_turn,
};
use crate::config::EngineConfig;
use crate::error::{GameResult, Resource, StateError};
use crate::leveling::{ExperienceGain, add_experience};
use crate::player::{Player, PlayerId};
use crate::rng::RandomSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default = "ArenaConfig::default_daily_matches")]
    pub daily_matches: u32,
    #[serde(default = "ArenaConfig::default_win_fame")]
    pub win_fame: u64,
    #[serde(default = "ArenaConfig::default_win_gold")]
    pub win_gold: u64,
    #[serde(default = "ArenaConfig::default_win_experience")]
    pub win_experience: u64,
    #[serde(default = "ArenaConfig::default_loss_fame")]
    pub loss_fame: u64,
}

impl ArenaConfig {
    const fn default_daily_matches() -> u32 {
        10
    }

    const fn default_win_fame() -> u64 {
        100
    }

    const fn default_win_gold() -> u64 {
        100
    }

    const fn default_win_experience() -> u64 {
        10
    }

    const fn default_loss_fame() -> u64 {
        50
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            daily_matches: Self::default_daily_matches(),
            win_fame: Self::default_win_fame(),
            win_gold: Self::default_win_gold(),
            win_experience: Self::default_win_experience(),
            loss_fame: Self::default_loss_fame(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleResult {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaPhase {
    Idle,
    Matchmaking,
    Battle,
    Finished(BattleResult),
}

impl ArenaPhase {
    const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Matchmaking => "matchmaking",
            Self::Battle => "in battle",
            Self::Finished(_) => "finished",
        }
    }
}

/// Committed result of one arena battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaReport {
    pub opponent: Opponent,
    pub result: BattleResult,
    pub turns: Vec<TurnRecord>,
    pub fame_change: i64,
    pub gold_gained: u64,
    pub experience: Option<ExperienceGain>,
    pub daily_matches_left: u32,
    pub quest_progressed: bool,
}

/// One player's arena flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSession {
    player_id: PlayerId,
    phase: ArenaPhase,
    opponent: Option<Opponent>,
    battle: Option<BattleSession>,
}

impl ArenaSession {
    #[must_use]
    pub const fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            phase: ArenaPhase::Idle,
            opponent: None,
            battle: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> ArenaPhase {
        self.phase
    }

    #[must_use]
    pub const fn opponent(&self) -> Option<&Opponent> {
        self.opponent.as_ref()
    }

    #[must_use]
    pub const fn battle(&self) -> Option<&BattleSession> {
        self.battle.as_ref()
    }

    fn expect_phase(&self, wanted: ArenaPhase, action: &'static str) -> GameResult<()> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                phase: self.phase.label(),
                action,
            }
            .into())
        }
    }

    /// Leave `idle`; requires a daily match to be left.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `idle`, `InsufficientResource` with no
    /// matches left.
    pub fn start_matchmaking(&mut self, player: &Player) -> GameResult<()> {
        self.expect_phase(ArenaPhase::Idle, "start matchmaking")?;
        Player::ensure(
            Resource::DailyMatches,
            u64::from(player.daily_matches_left),
            1,
        )?;
        self.phase = ArenaPhase::Matchmaking;
        Ok(())
    }

    /// Pick an opponent and open the battle. Instantaneous; any pacing delay
    /// belongs to the presentation layer.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `matchmaking`.
    pub fn resolve_matchmaking(
        &mut self,
        player: &Player,
        candidates: &[Player],
        rng: &mut impl RandomSource,
    ) -> GameResult<&Opponent> {
        self.expect_phase(ArenaPhase::Matchmaking, "resolve matchmaking")?;
        let opponent = matchmaking_opponent(player, candidates, rng);
        self.battle = Some(BattleSession::new(
            Combatant::from_player(player),
            Combatant::from_opponent(&opponent),
        ));
        self.phase = ArenaPhase::Battle;
        Ok(&*self.opponent.insert(opponent))
    }

    /// Resolve the next turn; the player is always the attacker side.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `battle`.
    pub fn take_turn(&mut self, rng: &mut impl RandomSource) -> GameResult<TurnRecord> {
        self.expect_phase(ArenaPhase::Battle, "take a turn")?;
        let battle = self.battle.as_mut().ok_or(StateError::InvalidTransition {
            phase: "battle",
            action: "take a turn",
        })?;
        let record = resolve_turn(battle, rng)?;
        if let Some(winner) = battle.winner {
            let result = if winner == Side::Attacker {
                BattleResult::Win
            } else {
                BattleResult::Lose
            };
            self.phase = ArenaPhase::Finished(result);
        }
        Ok(record)
    }

    /// Play turns until the battle ends.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `battle`.
    pub fn fight(&mut self, rng: &mut impl RandomSource) -> GameResult<BattleResult> {
        loop {
            self.take_turn(rng)?;
            if let ArenaPhase::Finished(result) = self.phase {
                return Ok(result);
            }
        }
    }

    /// Drop an unfinished session without side effects.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` once the battle has a result; that result must be
    /// settled.
    pub fn abandon(&mut self) -> GameResult<()> {
        if matches!(self.phase, ArenaPhase::Finished(_)) {
            return Err(StateError::InvalidTransition {
                phase: self.phase.label(),
                action: "abandon",
            }
            .into());
        }
        *self = Self::new(self.player_id);
        Ok(())
    }

    /// Commit rewards for a finished battle and return to `idle`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the battle is finished.
    pub fn settle(&mut self, player: &mut Player, cfg: &EngineConfig) -> GameResult<ArenaReport> {
        let ArenaPhase::Finished(result) = self.phase else {
            return Err(StateError::InvalidTransition {
                phase: self.phase.label(),
                action: "settle",
            }
            .into());
        };
        let opponent = self.opponent.take().ok_or(StateError::InvalidTransition {
            phase: "finished",
            action: "settle",
        })?;
        let turns = self.battle.take().map(|battle| battle.log).unwrap_or_default();

        let (fame_change, gold_gained, experience) = apply_battle_rewards(player, result, cfg);
        player.daily_matches_left = player.daily_matches_left.saturating_sub(1);
        let quest_progressed = player.quest.record_arena_battle(&cfg.quest);
        self.phase = ArenaPhase::Idle;

        log::info!(
            "arena battle for player {} vs {}: {:?} ({} turns)",
            player.id,
            opponent.name,
            result,
            turns.len()
        );

        Ok(ArenaReport {
            opponent,
            result,
            turns,
            fame_change,
            gold_gained,
            experience,
            daily_matches_left: player.daily_matches_left,
            quest_progressed,
        })
    }
}

/// Win: fame, gold and experience. Loss: fame only, floored at zero.
pub fn apply_battle_rewards(
    player: &mut Player,
    result: BattleResult,
    cfg: &EngineConfig,
) -> (i64, u64, Option<ExperienceGain>) {
    match result {
        BattleResult::Win => {
            player.fame = player.fame.saturating_add(cfg.arena.win_fame);
            player.gold = player.gold.saturating_add(cfg.arena.win_gold);
            let gain = add_experience(
                player,
                cfg.arena.win_experience,
                &cfg.leveling,
                &cfg.rewards,
            );
            (
                i64::try_from(cfg.arena.win_fame).unwrap_or(i64::MAX),
                cfg.arena.win_gold,
                Some(gain),
            )
        }
        BattleResult::Lose => {
            let before = player.fame;
            player.lose_fame(cfg.arena.loss_fame);
            let lost = i64::try_from(before - player.fame).unwrap_or(i64::MAX);
            (-lost, 0, None)
        }
    }
}

/// Run the whole flow in one call: matchmaking, battle and settlement.
///
/// # Errors
///
/// `InsufficientResource` when no daily matches are left.
pub fn run_arena_battle(
    player: &mut Player,
    candidates: &[Player],
    cfg: &EngineConfig,
    rng: &mut impl RandomSource,
) -> GameResult<ArenaReport> {
    let mut session = ArenaSession::new(player.id);
    session.start_matchmaking(player)?;
    session.resolve_matchmaking(player, candidates, rng)?;
    session.fight(rng)?;
    session.settle(player, cfg)
}
