//! Orchestrating service: load, reset, run an engine, persist, publish.

use crate::arena::{ArenaReport, run_arena_battle};
use crate::casino::{
    BlackjackRound, CasinoSettlement, CoinFlipOutcome, CoinSide, ScratchOutcome, play_coin_flip,
    play_scratch_card,
};
use crate::challenge::{ChallengeOutcome, resolve_challenge};
use crate::clock::{Clock, apply_daily_reset};
use crate::config::EngineConfig;
use crate::data::Catalog;
use crate::enhancement::{EnhanceOutcome, attempt_enhance};
use crate::error::{Entity, GameError, GameResult};
use crate::events::{EngineEvent, EventKind, EventLog, EventSeverity, EventSink, UiSurfaceHint};
use crate::farm::{FarmOutcome, farm_monster};
use crate::leaderboard::{LeaderboardEntry, LeaderboardKind, rank_players};
use crate::leveling::{ExperienceGain, LevelProgress, add_experience};
use crate::market::{Purchase, Sale, buy_item, buy_power_stone, equip_item, sell_item};
use crate::player::{Player, PlayerId};
use crate::quests::{QuestReward, claim_quest_reward};
use crate::repository::{BossRepository, CandidateFilter, PlayerPatch, PlayerRepository};
use crate::rng::RngBundle;
use crate::world_boss::{BossAttack, BossReward, WorldBoss};
use crate::DataLoader;

fn checked<T>(intent: &str, player_id: PlayerId, result: GameResult<T>) -> GameResult<T> {
    if let Err(err) = &result {
        log::warn!("{intent} rejected for player {player_id}: {err}");
    }
    result
}

/// Game service owning the repositories, clock, configuration and catalog.
pub struct GameEngine<P, B, C, S = EventLog>
where
    P: PlayerRepository,
    B: BossRepository,
    C: Clock,
    S: EventSink,
{
    players: P,
    bosses: B,
    clock: C,
    config: EngineConfig,
    catalog: Catalog,
    rng: RngBundle,
    events: S,
}

impl<P, B, C> GameEngine<P, B, C, EventLog>
where
    P: PlayerRepository,
    B: BossRepository,
    C: Clock,
{
    /// Engine with default economy, empty catalog and an in-memory event log.
    pub fn new(players: P, bosses: B, clock: C, seed: u64) -> Self {
        Self::with_sink(players, bosses, clock, seed, EventLog::new())
    }
}

impl<P, B, C, S> GameEngine<P, B, C, S>
where
    P: PlayerRepository,
    B: BossRepository,
    C: Clock,
    S: EventSink,
{
    pub fn with_sink(players: P, bosses: B, clock: C, seed: u64, events: S) -> Self {
        Self {
            players,
            bosses,
            clock,
            config: EngineConfig::default(),
            catalog: Catalog::empty(),
            rng: RngBundle::from_user_seed(seed),
            events,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the catalog with the one served by `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the catalog cannot be loaded.
    pub fn load_catalog<L: DataLoader>(mut self, loader: &L) -> Result<Self, L::Error> {
        self.catalog = loader.load_catalog()?;
        Ok(self)
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn events(&self) -> &S {
        &self.events
    }

    pub const fn events_mut(&mut self) -> &mut S {
        &mut self.events
    }

    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn players(&self) -> &P {
        &self.players
    }

    fn publish(&mut self, event: EngineEvent) {
        self.events.publish(event);
    }

    /// Stored snapshot plus a working copy with the daily reset applied.
    fn load(&self, player_id: PlayerId) -> GameResult<(Player, Player)> {
        let loaded = self.players.get(player_id)?;
        let mut working = loaded.clone();
        apply_daily_reset(
            &mut working,
            self.clock.now_utc(),
            self.config.arena.daily_matches,
        );
        Ok((loaded, working))
    }

    /// Write the delta between `loaded` and `working`, guarded by version.
    fn write(&self, loaded: &Player, working: &Player) -> GameResult<Player> {
        let patch = PlayerPatch::diff(loaded, working);
        if patch.is_empty() {
            return Ok(loaded.clone());
        }
        Ok(self.players.update(loaded.id, loaded.version, patch)?)
    }

    /// Write every pair or none: when one write fails, the ones that already
    /// landed are restored to their loaded snapshot.
    fn write_all(&self, writes: &[(Player, Player)]) -> GameResult<Vec<Player>> {
        let mut committed = Vec::with_capacity(writes.len());
        for (loaded, working) in writes {
            match self.write(loaded, working) {
                Ok(stored) => committed.push(stored),
                Err(err) => {
                    self.revert(writes.iter().map(|(loaded, _)| loaded).zip(&committed));
                    return Err(err);
                }
            }
        }
        Ok(committed)
    }

    fn revert<'a>(&self, restores: impl IntoIterator<Item = (&'a Player, &'a Player)>) {
        for (loaded, stored) in restores {
            let patch = PlayerPatch::diff(stored, loaded);
            if patch.is_empty() {
                continue;
            }
            match self.players.update(stored.id, stored.version, patch) {
                Ok(_) => log::debug!("reverted player {} to v{}", stored.id, loaded.version),
                Err(err) => log::error!("failed to revert player {}: {err}", stored.id),
            }
        }
    }

    fn publish_reset(&mut self, loaded: &Player, working: &Player) {
        if working.last_daily_reset == loaded.last_daily_reset {
            return;
        }
        if let Some(reset_at) = working.last_daily_reset {
            self.publish(
                EngineEvent::new(EventKind::DailyReset, Some(working.id))
                    .tagged("daily")
                    .with_payload(&reset_at),
            );
        }
    }

    /// Persist one player and announce a daily reset once it is stored.
    fn commit(&mut self, loaded: &Player, working: &Player) -> GameResult<Player> {
        let stored = self.write(loaded, working)?;
        self.publish_reset(loaded, working);
        Ok(stored)
    }

    fn publish_level_up(&mut self, player_id: PlayerId, gain: &ExperienceGain) {
        if gain.leveled_up() {
            self.publish(
                EngineEvent::new(EventKind::LevelUp, Some(player_id))
                    .tagged("progression")
                    .severity(EventSeverity::Notable)
                    .surface(UiSurfaceHint::Modal, "level.up")
                    .with_payload(gain),
            );
        }
    }

    /// Current player state with any pending daily reset persisted.
    ///
    /// # Errors
    ///
    /// `NotFound`, or a repository conflict.
    pub fn player(&mut self, player_id: PlayerId) -> GameResult<Player> {
        let (loaded, working) = self.load(player_id)?;
        self.commit(&loaded, &working)
    }

    /// # Errors
    ///
    /// `EmptyUsername`, or `AlreadyRegistered` when the id is taken.
    pub fn register_player(&mut self, username: &str) -> GameResult<Player> {
        let player_id = self.players.next_id()?;
        let mut player = Player::with_config(
            player_id,
            username,
            &self.config.player,
            self.config.arena.daily_matches,
        )?;
        player.last_daily_reset = Some(self.clock.now_utc());
        let stored = self.players.insert(player)?;
        log::info!("registered player {} ({})", stored.id, stored.username);
        self.publish(
            EngineEvent::new(EventKind::PlayerRegistered, Some(stored.id))
                .tagged("account")
                .with_payload(&stored.username),
        );
        Ok(stored)
    }

    /// # Errors
    ///
    /// `NotFound`, `LevelOutOfRange`.
    pub fn level_progress(&mut self, player_id: PlayerId) -> GameResult<LevelProgress> {
        let player = self.player(player_id)?;
        self.config.leveling.progress_within_level(&player)
    }

    /// # Errors
    ///
    /// `NotFound`, or a repository conflict.
    pub fn gain_experience(&mut self, player_id: PlayerId, amount: u64) -> GameResult<ExperienceGain> {
        let (loaded, mut working) = self.load(player_id)?;
        let gain = add_experience(
            &mut working,
            amount,
            &self.config.leveling,
            &self.config.rewards,
        );
        self.commit(&loaded, &working)?;
        self.publish_level_up(player_id, &gain);
        Ok(gain)
    }

    /// # Errors
    ///
    /// `NotFound` for unknown catalog items, `InsufficientResource` for gold or level.
    pub fn buy_item(&mut self, player_id: PlayerId, template_id: &str) -> GameResult<Purchase> {
        let (loaded, mut working) = self.load(player_id)?;
        let template = checked("buy_item", player_id, self.catalog.item(template_id))?;
        let purchase = checked(
            "buy_item",
            player_id,
            buy_item(&mut working, template, self.config.player.power_policy),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::ItemPurchased, Some(player_id))
                .tagged("market")
                .surface(UiSurfaceHint::Toast, "market.purchased")
                .with_payload(&purchase),
        );
        Ok(purchase)
    }

    /// # Errors
    ///
    /// `NotFound` or `ItemDeleted`.
    pub fn sell_item(&mut self, player_id: PlayerId, item_id: u64) -> GameResult<Sale> {
        let (loaded, mut working) = self.load(player_id)?;
        let sale = checked(
            "sell_item",
            player_id,
            sell_item(
                &mut working,
                item_id,
                &self.config.market,
                self.config.player.power_policy,
            ),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::ItemSold, Some(player_id))
                .tagged("market")
                .with_payload(&sale),
        );
        Ok(sale)
    }

    /// # Errors
    ///
    /// `InsufficientResource` when fame is short.
    pub fn buy_power_stone(&mut self, player_id: PlayerId) -> GameResult<u64> {
        let (loaded, mut working) = self.load(player_id)?;
        let stones = checked(
            "buy_power_stone",
            player_id,
            buy_power_stone(&mut working, &self.config.market),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::PowerStonePurchased, Some(player_id))
                .tagged("market")
                .with_payload(&stones),
        );
        Ok(stones)
    }

    /// # Errors
    ///
    /// `NotFound` or `ItemDeleted`.
    pub fn equip_item(&mut self, player_id: PlayerId, item_id: u64) -> GameResult<u64> {
        let (loaded, mut working) = self.load(player_id)?;
        let power = checked(
            "equip_item",
            player_id,
            equip_item(&mut working, item_id, self.config.player.power_policy),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::ItemEquipped, Some(player_id))
                .tagged("inventory")
                .with_payload(&item_id),
        );
        Ok(power)
    }

    /// # Errors
    ///
    /// See [`attempt_enhance`].
    pub fn enhance_item(&mut self, player_id: PlayerId, item_id: u64) -> GameResult<EnhanceOutcome> {
        let (loaded, mut working) = self.load(player_id)?;
        let outcome = checked(
            "enhance_item",
            player_id,
            attempt_enhance(
                &mut working,
                item_id,
                &self.config.enhance,
                self.config.player.power_policy,
                &mut *self.rng.enhance(),
            ),
        )?;
        self.commit(&loaded, &working)?;
        let severity = if outcome.success {
            EventSeverity::Notable
        } else {
            EventSeverity::Info
        };
        self.publish(
            EngineEvent::new(EventKind::ItemEnhanced, Some(player_id))
                .tagged("blacksmith")
                .severity(severity)
                .surface(UiSurfaceHint::Toast, "blacksmith.result")
                .with_payload(&outcome),
        );
        Ok(outcome)
    }

    /// Matchmake against stored players, fight to the end and settle.
    ///
    /// # Errors
    ///
    /// `InsufficientResource` when no daily matches are left.
    pub fn run_arena_battle(&mut self, player_id: PlayerId) -> GameResult<ArenaReport> {
        let (loaded, mut working) = self.load(player_id)?;
        let candidates = self
            .players
            .list_candidates(&CandidateFilter::excluding(player_id))?;
        let report = checked(
            "run_arena_battle",
            player_id,
            run_arena_battle(
                &mut working,
                &candidates,
                &self.config,
                &mut *self.rng.combat(),
            ),
        )?;
        self.commit(&loaded, &working)?;

        self.publish(
            EngineEvent::new(EventKind::MatchFound, Some(player_id))
                .tagged("arena")
                .with_payload(&report.opponent),
        );
        for turn in &report.turns {
            self.publish(
                EngineEvent::new(EventKind::TurnResolved, Some(player_id))
                    .tagged("arena")
                    .surface(UiSurfaceHint::Log, "arena.turn")
                    .with_payload(turn),
            );
        }
        self.publish(
            EngineEvent::new(EventKind::BattleFinished, Some(player_id))
                .tagged("arena")
                .severity(EventSeverity::Notable)
                .surface(UiSurfaceHint::Modal, "arena.result")
                .with_payload(&report.result),
        );
        if let Some(gain) = &report.experience {
            self.publish_level_up(player_id, gain);
        }
        if report.quest_progressed {
            self.publish(
                EngineEvent::new(EventKind::QuestProgressed, Some(player_id))
                    .tagged("quest")
                    .with_payload(&working.quest),
            );
        }
        Ok(report)
    }

    /// Resolve a direct challenge. Both players are stored or neither is.
    ///
    /// # Errors
    ///
    /// `SelfChallenge`, `NotFound`, or a repository conflict.
    pub fn challenge_player(
        &mut self,
        challenger_id: PlayerId,
        target_id: PlayerId,
    ) -> GameResult<ChallengeOutcome> {
        if challenger_id == target_id {
            return checked(
                "challenge_player",
                challenger_id,
                Err(crate::error::ValidationError::SelfChallenge.into()),
            );
        }
        let (challenger_loaded, mut challenger) = self.load(challenger_id)?;
        let (target_loaded, mut target) = self.load(target_id)?;
        let outcome = checked(
            "challenge_player",
            challenger_id,
            resolve_challenge(
                &mut challenger,
                &mut target,
                &self.config,
                &mut *self.rng.combat(),
            ),
        )?;
        let writes = [(challenger_loaded, challenger), (target_loaded, target)];
        self.write_all(&writes)?;
        for (loaded, working) in &writes {
            self.publish_reset(loaded, working);
        }
        self.publish(
            EngineEvent::new(EventKind::ChallengeResolved, Some(challenger_id))
                .tagged("challenge")
                .surface(UiSurfaceHint::Toast, "challenge.result")
                .with_payload(&outcome),
        );
        if let Some(gain) = &outcome.experience {
            self.publish_level_up(challenger_id, gain);
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// `NotFound` for unknown monsters, `InsufficientResource` when attempts are spent.
    pub fn farm_monster(&mut self, player_id: PlayerId, monster_id: &str) -> GameResult<FarmOutcome> {
        let (loaded, mut working) = self.load(player_id)?;
        let monster = checked("farm_monster", player_id, self.catalog.monster(monster_id))?;
        let outcome = checked(
            "farm_monster",
            player_id,
            farm_monster(&mut working, monster, &self.config, &mut *self.rng.combat()),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::FarmResolved, Some(player_id))
                .tagged("farm")
                .with_payload(&outcome),
        );
        if let Some(gain) = &outcome.experience {
            self.publish_level_up(player_id, gain);
        }
        Ok(outcome)
    }

    /// Start a new battle from the boss config, beginning now.
    ///
    /// # Errors
    ///
    /// Repository failures.
    pub fn spawn_world_boss(&mut self) -> GameResult<WorldBoss> {
        let battle_id = self
            .bosses
            .latest()?
            .map_or(1, |boss| boss.battle_id.saturating_add(1));
        let boss = WorldBoss::from_config(battle_id, &self.config.boss, self.clock.now_utc());
        let boss = self.bosses.save(&boss, 0)?;
        log::info!("spawned {} as battle {battle_id}", boss.name);
        Ok(boss)
    }

    /// # Errors
    ///
    /// Repository failures.
    pub fn current_world_boss(&self) -> GameResult<Option<WorldBoss>> {
        Ok(self.bosses.latest()?)
    }

    /// Attack the latest battle once. The player is stored first; a stale
    /// boss write restores it.
    ///
    /// # Errors
    ///
    /// `NotFound` without a battle, a repository conflict on either record,
    /// otherwise see [`WorldBoss::attack`].
    pub fn attack_world_boss(&mut self, player_id: PlayerId) -> GameResult<BossAttack> {
        let (loaded, working) = self.load(player_id)?;
        let mut boss = self
            .bosses
            .latest()?
            .ok_or_else(|| GameError::not_found(Entity::Boss, "latest"))?;
        let expected_version = boss.version;
        let now = self.clock.now_utc();
        let attack = checked(
            "attack_world_boss",
            player_id,
            boss.attack(&working, now, &self.config.boss, &mut *self.rng.boss()),
        )?;
        let stored = self.write(&loaded, &working)?;
        if let Err(err) = self.bosses.save(&boss, expected_version) {
            self.revert([(&loaded, &stored)]);
            return checked("attack_world_boss", player_id, Err(err.into()));
        }
        self.publish_reset(&loaded, &working);
        self.publish(
            EngineEvent::new(EventKind::BossDamaged, Some(player_id))
                .tagged("boss")
                .surface(UiSurfaceHint::Log, "boss.damage")
                .with_payload(&attack),
        );
        if attack.killing_blow {
            self.publish(
                EngineEvent::new(EventKind::BossDefeated, Some(player_id))
                    .tagged("boss")
                    .severity(EventSeverity::Notable)
                    .surface(UiSurfaceHint::Modal, "boss.defeated")
                    .with_payload(&boss.rankings()),
            );
        }
        Ok(attack)
    }

    /// Pay the gold pool of a defeated battle. Every raider is loaded
    /// before any write; credits land first and the battle is marked paid
    /// last, so a failure anywhere leaves nothing paid.
    ///
    /// # Errors
    ///
    /// `NotFound`, `BossStillAlive`, `RewardsDistributed`, or a repository
    /// conflict on a raider or the battle.
    pub fn distribute_boss_rewards(&mut self, battle_id: u64) -> GameResult<Vec<BossReward>> {
        let mut boss = self.bosses.get(battle_id)?;
        let expected_version = boss.version;
        let rewards = boss.distribute_rewards()?;
        let mut writes = Vec::with_capacity(rewards.len());
        for reward in &rewards {
            let (loaded, mut working) = self.load(reward.player_id)?;
            working.gold = working.gold.saturating_add(reward.gold);
            writes.push((loaded, working));
        }
        let committed = self.write_all(&writes)?;
        if let Err(err) = self.bosses.save(&boss, expected_version) {
            self.revert(writes.iter().map(|(loaded, _)| loaded).zip(&committed));
            return Err(err.into());
        }
        for (loaded, working) in &writes {
            self.publish_reset(loaded, working);
        }
        log::info!(
            "distributed {} gold across {} raiders for battle {battle_id}",
            rewards.iter().map(|reward| reward.gold).sum::<u64>(),
            rewards.len()
        );
        Ok(rewards)
    }

    fn publish_casino(&mut self, player_id: PlayerId, settlement: &CasinoSettlement) {
        self.publish(
            EngineEvent::new(EventKind::CasinoSettled, Some(player_id))
                .tagged("casino")
                .surface(UiSurfaceHint::Toast, "casino.settled")
                .with_payload(settlement),
        );
    }

    /// # Errors
    ///
    /// Bet validation errors.
    pub fn flip_coin(
        &mut self,
        player_id: PlayerId,
        bet: u64,
        call: CoinSide,
    ) -> GameResult<CoinFlipOutcome> {
        let (loaded, mut working) = self.load(player_id)?;
        let outcome = checked(
            "flip_coin",
            player_id,
            play_coin_flip(
                &mut working,
                bet,
                call,
                &self.config.casino,
                &mut *self.rng.casino(),
            ),
        )?;
        self.commit(&loaded, &working)?;
        self.publish_casino(player_id, &outcome.settlement);
        Ok(outcome)
    }

    /// # Errors
    ///
    /// `InsufficientResource` when gold does not cover the entry cost.
    pub fn play_scratch_card(&mut self, player_id: PlayerId) -> GameResult<ScratchOutcome> {
        let (loaded, mut working) = self.load(player_id)?;
        let outcome = checked(
            "play_scratch_card",
            player_id,
            play_scratch_card(
                &mut working,
                &self.config.casino.scratch,
                &mut *self.rng.casino(),
            ),
        )?;
        self.commit(&loaded, &working)?;
        self.publish_casino(player_id, &outcome.settlement);
        Ok(outcome)
    }

    /// Validate the bet and deal a blackjack round. Nothing is persisted
    /// until [`GameEngine::settle_blackjack`].
    ///
    /// # Errors
    ///
    /// Bet validation errors.
    pub fn open_blackjack(&mut self, player_id: PlayerId, bet: u64) -> GameResult<BlackjackRound> {
        let (_, working) = self.load(player_id)?;
        let mut round = checked(
            "open_blackjack",
            player_id,
            BlackjackRound::open(bet, &working, &self.config.casino),
        )?;
        round.deal(&mut *self.rng.casino())?;
        Ok(round)
    }

    /// # Errors
    ///
    /// See [`BlackjackRound::settle`].
    pub fn settle_blackjack(
        &mut self,
        player_id: PlayerId,
        round: &mut BlackjackRound,
    ) -> GameResult<CasinoSettlement> {
        let (loaded, mut working) = self.load(player_id)?;
        let settlement = checked("settle_blackjack", player_id, round.settle(&mut working))?;
        self.commit(&loaded, &working)?;
        self.publish_casino(player_id, &settlement);
        Ok(settlement)
    }

    /// # Errors
    ///
    /// `QuestIncomplete` or `QuestClaimed`.
    pub fn claim_quest_reward(&mut self, player_id: PlayerId) -> GameResult<QuestReward> {
        let (loaded, mut working) = self.load(player_id)?;
        let reward = checked(
            "claim_quest_reward",
            player_id,
            claim_quest_reward(
                &mut working,
                &self.config.quest,
                &self.config.leveling,
                &self.config.rewards,
            ),
        )?;
        self.commit(&loaded, &working)?;
        self.publish(
            EngineEvent::new(EventKind::QuestRewardClaimed, Some(player_id))
                .tagged("quest")
                .surface(UiSurfaceHint::Toast, "quest.claimed")
                .with_payload(&reward),
        );
        self.publish_level_up(player_id, &reward.experience);
        Ok(reward)
    }

    /// # Errors
    ///
    /// Repository failures.
    pub fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: usize,
    ) -> GameResult<Vec<LeaderboardEntry>> {
        let players = self.players.list_candidates(&CandidateFilter::all())?;
        Ok(rank_players(&players, kind, limit))
    }
}
