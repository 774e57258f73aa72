use anyhow::{Context, Result};
use arena_game::{
    EngineEvent, FixedClock, GameEngine, InMemoryBossRepository, InMemoryPlayerRepository,
    PlayerId, StaticDataLoader,
};
use chrono::{DateTime, Utc};
use std::hash::Hasher;
use twox_hash::XxHash64;

pub type SimEngine = GameEngine<InMemoryPlayerRepository, InMemoryBossRepository, FixedClock>;

/// 2026-01-05 09:00 UTC. Simulations never read the wall clock.
const SIM_EPOCH_SECS: i64 = 1_767_603_600;

/// A seeded engine over in-memory stores with a registered roster.
pub struct Sandbox {
    pub engine: SimEngine,
    pub players: InMemoryPlayerRepository,
    pub roster: Vec<PlayerId>,
}

impl Sandbox {
    /// # Errors
    ///
    /// Fails if the embedded catalog does not load or registration is rejected.
    pub fn new(seed: u64, roster_size: usize) -> Result<Self> {
        let start = DateTime::<Utc>::from_timestamp(SIM_EPOCH_SECS, 0)
            .context("simulation epoch out of range")?;
        let players = InMemoryPlayerRepository::new();
        let mut engine = GameEngine::new(
            players.clone(),
            InMemoryBossRepository::new(),
            FixedClock::new(start),
            seed,
        )
        .load_catalog(&StaticDataLoader)
        .context("loading embedded catalog")?;
        let roster = (0..roster_size)
            .map(|idx| {
                engine
                    .register_player(&format!("sim-{idx:02}"))
                    .map(|player| player.id)
                    .with_context(|| format!("registering sim-{idx:02}"))
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!("sandbox seed {seed} with {roster_size} players");
        Ok(Self {
            engine,
            players,
            roster,
        })
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.engine.events_mut().drain()
    }
}

/// Stable hash of a serialized event stream.
///
/// # Errors
///
/// Serialization failures.
pub fn fingerprint(events: &[EngineEvent]) -> Result<u64> {
    let bytes = serde_json::to_vec(events).context("serializing events")?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    Ok(hasher.finish())
}
