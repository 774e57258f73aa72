//! Wall-clock access and UTC daily reset boundaries.

use std::cell::Cell;

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::player::Player;

/// Source of the current UTC time.
pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_utc(&self) -> DateTime<Utc> {
        (**self).now_utc()
    }
}

/// True when `now` falls on a later UTC calendar day than `last_reset`.
#[must_use]
pub fn is_past_reset_boundary(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive() > last_reset.date_naive()
}

/// The next UTC midnight strictly after `now`.
#[must_use]
pub fn next_reset_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .map_or(now, |tomorrow| tomorrow.and_time(NaiveTime::MIN).and_utc())
}

/// Restore the player's daily counters when a UTC day boundary has passed.
///
/// Returns `true` when a reset was applied.
pub fn apply_daily_reset(player: &mut Player, now: DateTime<Utc>, daily_matches: u32) -> bool {
    let due = player
        .last_daily_reset
        .is_none_or(|last| is_past_reset_boundary(last, now));
    if !due {
        return false;
    }
    player.daily_matches_left = daily_matches;
    player.quest.reset();
    player.farm_attempts.clear();
    player.last_daily_reset = Some(now);
    log::debug!("daily reset applied for player {}", player.id);
    true
}
