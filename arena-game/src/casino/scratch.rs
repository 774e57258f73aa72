//! Scratch cards: six weighted cells, three of a kind pays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CasinoGame, CasinoSettlement, settle};
use crate::error::{GameResult, Resource};
use crate::player::Player;
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrizeWeight {
    pub value: u64,
    /// Relative weight; only ratios matter.
    pub weight: f64,
}

impl PrizeWeight {
    #[must_use]
    pub const fn new(value: u64, weight: f64) -> Self {
        Self { value, weight }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScratchConfig {
    #[serde(default = "ScratchConfig::default_entry_cost")]
    pub entry_cost: u64,
    #[serde(default = "ScratchConfig::default_cells")]
    pub cells: usize,
    /// Most times one value may appear on a single card.
    #[serde(default = "ScratchConfig::default_max_repeats")]
    pub max_repeats: usize,
    /// Matching cells needed to win.
    #[serde(default = "ScratchConfig::default_win_count")]
    pub win_count: usize,
    #[serde(default = "ScratchConfig::default_prizes")]
    pub prizes: Vec<PrizeWeight>,
}

impl ScratchConfig {
    const fn default_entry_cost() -> u64 {
        10
    }

    const fn default_cells() -> usize {
        6
    }

    const fn default_max_repeats() -> usize {
        3
    }

    const fn default_win_count() -> usize {
        3
    }

    fn default_prizes() -> Vec<PrizeWeight> {
        vec![
            PrizeWeight::new(5, 30.0),
            PrizeWeight::new(10, 20.0),
            PrizeWeight::new(25, 15.0),
            PrizeWeight::new(50, 10.0),
            PrizeWeight::new(100, 5.0),
            PrizeWeight::new(500, 5.0),
            PrizeWeight::new(1_000, 2.5),
            PrizeWeight::new(2_000, 1.0),
            PrizeWeight::new(5_000, 0.5),
            PrizeWeight::new(10_000, 0.1),
        ]
    }

    /// Smallest prize value, used once every value is capped.
    #[must_use]
    pub fn lowest_prize(&self) -> u64 {
        self.prizes.iter().map(|prize| prize.value).min().unwrap_or(0)
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            entry_cost: Self::default_entry_cost(),
            cells: Self::default_cells(),
            max_repeats: Self::default_max_repeats(),
            win_count: Self::default_win_count(),
            prizes: Self::default_prizes(),
        }
    }
}

/// Fill a card. Values that reached `max_repeats` drop out of later draws.
pub fn draw_cells(cfg: &ScratchConfig, rng: &mut impl RandomSource) -> Vec<u64> {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    let mut cells = Vec::with_capacity(cfg.cells);
    for _ in 0..cfg.cells {
        let available: Vec<&PrizeWeight> = cfg
            .prizes
            .iter()
            .filter(|prize| counts.get(&prize.value).copied().unwrap_or(0) < cfg.max_repeats)
            .collect();
        let value = pick_weighted(&available, rng).unwrap_or_else(|| cfg.lowest_prize());
        *counts.entry(value).or_insert(0) += 1;
        cells.push(value);
    }
    cells
}

fn pick_weighted(available: &[&PrizeWeight], rng: &mut impl RandomSource) -> Option<u64> {
    let last = available.last()?;
    let total: f64 = available.iter().map(|prize| prize.weight).sum();
    let mut remaining = rng.uniform() * total;
    for prize in available {
        if remaining < prize.weight {
            return Some(prize.value);
        }
        remaining -= prize.weight;
    }
    Some(last.value)
}

/// Highest value appearing at least `win_count` times.
#[must_use]
pub fn winning_value(cells: &[u64], win_count: usize) -> Option<u64> {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for value in cells {
        *counts.entry(*value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .rev()
        .find(|(_, count)| *count >= win_count)
        .map(|(value, _)| value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchOutcome {
    pub cells: Vec<u64>,
    pub prize: Option<u64>,
    pub settlement: CasinoSettlement,
}

/// Buy a card for the entry cost, reveal it, and pay any prize.
///
/// # Errors
///
/// `InsufficientResource` when gold does not cover the entry cost.
pub fn play_scratch_card(
    player: &mut Player,
    cfg: &ScratchConfig,
    rng: &mut impl RandomSource,
) -> GameResult<ScratchOutcome> {
    Player::ensure(Resource::Gold, player.gold, cfg.entry_cost)?;
    let cells = draw_cells(cfg, rng);
    let prize = winning_value(&cells, cfg.win_count);
    let settlement = settle(
        player,
        CasinoGame::ScratchCard,
        cfg.entry_cost,
        prize.unwrap_or(0),
    )?;
    Ok(ScratchOutcome {
        cells,
        prize,
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerId;
    use crate::rng::{RngSource, ScriptedSource};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn no_value_exceeds_the_cap() {
        let cfg = ScratchConfig::default();
        let cells = draw_cells(&cfg, &mut ScriptedSource::constant(0.0));
        assert_eq!(cells, vec![5, 5, 5, 10, 10, 10]);
    }

    #[test]
    fn all_capped_falls_back_to_lowest() {
        let cfg = ScratchConfig {
            prizes: vec![PrizeWeight::new(50, 1.0), PrizeWeight::new(20, 1.0)],
            cells: 8,
            ..ScratchConfig::default()
        };
        let cells = draw_cells(&cfg, &mut ScriptedSource::constant(0.0));
        assert_eq!(cells, vec![50, 50, 50, 20, 20, 20, 20, 20]);
    }

    #[test]
    fn highest_qualifying_value_wins() {
        assert_eq!(winning_value(&[5, 5, 5, 10, 10, 10], 3), Some(10));
        assert_eq!(winning_value(&[5, 5, 10, 10, 25, 50], 3), None);
        assert_eq!(winning_value(&[100, 5, 100, 25, 100, 5], 3), Some(100));
    }

    #[test]
    fn card_costs_entry_and_pays_prize() {
        let mut player = Player::new(PlayerId::new(1), "scratcher").unwrap();
        let outcome = play_scratch_card(
            &mut player,
            &ScratchConfig::default(),
            &mut ScriptedSource::constant(0.0),
        )
        .unwrap();
        assert_eq!(outcome.prize, Some(10));
        assert_eq!(outcome.settlement.net, 0);
        assert_eq!(player.gold, 100);

        player.gold = 9;
        assert!(
            play_scratch_card(
                &mut player,
                &ScratchConfig::default(),
                &mut ScriptedSource::constant(0.5)
            )
            .is_err()
        );
        assert_eq!(player.gold, 9);
    }

    #[test]
    fn first_cell_frequencies_track_weights() {
        let cfg = ScratchConfig::default();
        let total: f64 = cfg.prizes.iter().map(|prize| prize.weight).sum();
        let mut rng = RngSource::new(ChaCha8Rng::seed_from_u64(77));
        let rounds = 100_000_u32;
        let mut first: BTreeMap<u64, u32> = BTreeMap::new();
        for _ in 0..rounds {
            let cells = draw_cells(&cfg, &mut rng);
            let mut seen: BTreeMap<u64, usize> = BTreeMap::new();
            for value in &cells {
                *seen.entry(*value).or_insert(0) += 1;
            }
            assert!(seen.values().all(|count| *count <= cfg.max_repeats));
            *first.entry(cells[0]).or_insert(0) += 1;
        }
        for prize in &cfg.prizes {
            let expected = prize.weight / total;
            let observed =
                f64::from(first.get(&prize.value).copied().unwrap_or(0)) / f64::from(rounds);
            assert!(
                (observed - expected).abs() < 0.01,
                "prize {} observed {observed} expected {expected}",
                prize.value
            );
        }
    }
}
