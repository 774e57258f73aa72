//! Arena Game Engine
//!
//! Platform-agnostic economy and combat resolution for a browser RPG: leveling,
//! arena battles, item enhancement, the world boss and the casino.
//! This crate holds no UI, network or database code; persistence goes through
//! the repository traits in [`repository`].

pub mod arena;
pub mod casino;
pub mod challenge;
pub mod clan;
pub mod clock;
pub mod combat;
pub mod config;
pub mod data;
pub mod engine;
pub mod enhancement;
pub mod error;
pub mod events;
pub mod farm;
pub mod items;
pub mod leaderboard;
pub mod leveling;
pub mod market;
pub mod numbers;
pub mod player;
pub mod quests;
pub mod repository;
pub mod rng;
pub mod world_boss;

// Re-export commonly used types
pub use arena::{
    ArenaConfig, ArenaPhase, ArenaReport, ArenaSession, BattleResult, apply_battle_rewards,
    run_arena_battle,
};
pub use casino::{
    BlackjackPhase, BlackjackResult, BlackjackRound, CasinoConfig, CasinoGame, CasinoSettlement,
    Card, CoinFlipOutcome, CoinSide, Deck, PrizeWeight, Rank, ScratchConfig, ScratchOutcome, Suit,
    flip_coin, hand_value, play_coin_flip, play_scratch_card, validate_bet,
};
pub use challenge::{ChallengeOutcome, challenge_win_probability, resolve_challenge};
pub use clan::{CLAN_CAPACITY, Clan, ClanDirectory, Departure, validate_clan_name};
pub use clock::{
    Clock, FixedClock, SystemClock, apply_daily_reset, is_past_reset_boundary, next_reset_at,
};
pub use combat::{
    BattleSession, Combatant, Opponent, Side, TurnRecord, damage_bounds, health_for_power,
    matchmaking_opponent, resolve_turn, roll_damage, run_to_completion, strike, success_chance,
};
pub use config::{ConfigError, EngineConfig, PlayerConfig};
pub use data::{Catalog, DataError, StaticDataLoader};
pub use engine::GameEngine;
pub use enhancement::{EnhanceConfig, EnhanceCost, EnhanceCostTable, EnhanceOutcome, attempt_enhance};
pub use error::{
    Entity, ErrorKind, GameError, GameResult, RepoError, Resource, StateError, ValidationError,
};
pub use events::{
    EngineEvent, EventId, EventKind, EventLog, EventSeverity, EventSink, NullSink, UiSurfaceHint,
};
pub use farm::{FarmConfig, FarmOutcome, Monster, attempts_left, farm_monster};
pub use items::{
    Inventory, ItemKind, ItemTemplate, MAX_ENHANCE_LEVEL, PlayerItem, PowerPolicy, enhanced_power,
};
pub use leaderboard::{LeaderboardEntry, LeaderboardKind, player_rank, rank_players};
pub use leveling::{
    ExperienceGain, LevelCurve, LevelProgress, LevelReward, RewardTable, add_experience,
};
pub use market::{
    MarketConfig, Purchase, Sale, buy_item, buy_power_stone, equip_item, sell_item,
};
pub use player::{Player, PlayerId};
pub use quests::{DailyQuest, QuestConfig, QuestReward, claim_quest_reward};
pub use repository::{
    BossRepository, CandidateFilter, InMemoryBossRepository, InMemoryPlayerRepository,
    PlayerPatch, PlayerRepository,
};
pub use rng::{CountingRng, RandomSource, RngBundle, RngSource, ScriptedSource};
pub use world_boss::{
    BossAttack, BossConfig, BossReward, DamageEntry, RankedContribution, WorldBoss,
    roll_boss_damage,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the item and monster catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Ok(Catalog {
                items: vec![ItemTemplate {
                    id: "practice_blade".into(),
                    name: "Practice Blade".into(),
                    kind: ItemKind::Weapon,
                    base_power: 10,
                    price: 20,
                    required_level: 1,
                }],
                monsters: Vec::new(),
            })
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str("{}").unwrap();
            Ok(parsed)
        }
    }

    #[test]
    fn engine_uses_injected_loader() {
        let clock = FixedClock::new(chrono::Utc::now());
        let mut engine = GameEngine::new(
            InMemoryPlayerRepository::new(),
            InMemoryBossRepository::new(),
            clock,
            7,
        )
        .load_catalog(&FixtureLoader)
        .unwrap();
        let player = engine.register_player("tester").unwrap();
        let purchase = engine.buy_item(player.id, "practice_blade").unwrap();
        assert_eq!(purchase.gold_left, 80);
        let cfg: EngineConfig = FixtureLoader.load_config("economy").unwrap();
        assert_eq!(cfg.arena, ArenaConfig::default());
    }
}
