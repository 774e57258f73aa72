use anyhow::{Result, ensure};
use arena_game::casino::{draw_cells, winning_value};
use arena_game::numbers::usize_to_f64;
use arena_game::{
    BlackjackPhase, BlackjackResult, BlackjackRound, CasinoConfig, CasinoSettlement, CoinSide,
    Player, PlayerId, RngSource, ScratchConfig, flip_coin, play_coin_flip, play_scratch_card,
};
use std::collections::BTreeMap;

const FLIPS: usize = 10_000;
const BLACKJACK_ROUNDS: usize = 500;
const SCRATCH_CARDS: usize = 20_000;

fn gambler(gold: u64) -> Result<Player> {
    let mut player = Player::new(PlayerId::new(1), "gambler")?;
    player.gold = gold;
    Ok(player)
}

fn check_settlement(settlement: &CasinoSettlement, gold_before: u64, player: &Player) -> Result<()> {
    let expected = gold_before - settlement.stake + settlement.payout;
    ensure!(
        player.gold == expected && settlement.gold_after == expected,
        "{:?}: gold {} after staking {} for {}, expected {expected}",
        settlement.game,
        player.gold,
        settlement.stake,
        settlement.payout
    );
    ensure!(
        settlement.net == i64::try_from(settlement.payout)? - i64::try_from(settlement.stake)?,
        "{:?}: net {} disagrees with the gold moved",
        settlement.game,
        settlement.net
    );
    Ok(())
}

pub fn coin_flip_fairness(seed: u64) -> Result<()> {
    let mut rng = RngSource::seeded(seed);
    let heads = (0..FLIPS)
        .filter(|_| flip_coin(&mut rng) == CoinSide::Heads)
        .count();
    let ratio = usize_to_f64(heads) / usize_to_f64(FLIPS);
    ensure!(
        (0.47..=0.53).contains(&ratio),
        "heads landed {ratio:.4} of {FLIPS} flips"
    );

    let cfg = CasinoConfig::default();
    let mut player = gambler(100_000)?;
    for round in 0..200 {
        let call = if round % 2 == 0 {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        let before = player.gold;
        let outcome = play_coin_flip(&mut player, cfg.min_bet, call, &cfg, &mut rng)?;
        ensure!(
            outcome.won == (outcome.landed == call),
            "round {round}: called {call:?}, landed {:?}, won {}",
            outcome.landed,
            outcome.won
        );
        check_settlement(&outcome.settlement, before, &player)?;
    }
    Ok(())
}

pub fn blackjack_rules(seed: u64) -> Result<()> {
    let cfg = CasinoConfig::default();
    let mut rng = RngSource::seeded(seed);
    let mut player = gambler(1_000_000)?;
    let mut results: BTreeMap<String, usize> = BTreeMap::new();

    for round_number in 0..BLACKJACK_ROUNDS {
        let mut round = BlackjackRound::open(cfg.min_bet, &player, &cfg)?;
        round.deal(&mut rng)?;
        ensure!(
            round.player_hand().len() == 2 && round.dealer_hand().len() == 2,
            "round {round_number}: bad opening deal"
        );
        while round.phase() == BlackjackPhase::PlayerTurn && round.player_total() < cfg.dealer_stand {
            round.hit()?;
        }
        let result = match round.phase() {
            BlackjackPhase::PlayerTurn => round.stand()?,
            BlackjackPhase::Resolved(result) => result,
            phase => anyhow::bail!("round {round_number}: stuck in {phase:?}"),
        };

        let (player_total, dealer_total) = (round.player_total(), round.dealer_total());
        let consistent = match result {
            BlackjackResult::PlayerBust => player_total > 21,
            BlackjackResult::DealerBust => player_total <= 21 && dealer_total > 21,
            BlackjackResult::PlayerHigher => player_total > dealer_total,
            BlackjackResult::DealerHigher => player_total < dealer_total && dealer_total <= 21,
            BlackjackResult::Push => player_total == dealer_total,
        };
        ensure!(
            consistent,
            "round {round_number}: {result:?} with player {player_total} dealer {dealer_total}"
        );
        if result != BlackjackResult::PlayerBust {
            ensure!(
                dealer_total >= cfg.dealer_stand,
                "round {round_number}: dealer stood on {dealer_total}"
            );
        }

        let before = player.gold;
        let settlement = round.settle(&mut player)?;
        ensure!(
            settlement.payout == result.payout(cfg.min_bet),
            "round {round_number}: {result:?} paid {}",
            settlement.payout
        );
        check_settlement(&settlement, before, &player)?;
        ensure!(
            round.settle(&mut player).is_err(),
            "round {round_number} settled twice"
        );
        *results.entry(format!("{result:?}")).or_default() += 1;
    }
    log::debug!("seed {seed}: blackjack results {results:?}");
    Ok(())
}

pub fn scratch_distribution(seed: u64) -> Result<()> {
    let cfg = ScratchConfig::default();
    let mut rng = RngSource::seeded(seed);
    let mut seen: BTreeMap<u64, usize> = BTreeMap::new();

    for card in 0..SCRATCH_CARDS {
        let cells = draw_cells(&cfg, &mut rng);
        ensure!(cells.len() == cfg.cells, "card {card}: {} cells", cells.len());
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        for value in &cells {
            *counts.entry(*value).or_default() += 1;
            *seen.entry(*value).or_default() += 1;
        }
        ensure!(
            counts.values().all(|count| *count <= cfg.max_repeats),
            "card {card}: {cells:?} breaks the repeat cap"
        );
        let expected = counts
            .iter()
            .filter(|(_, count)| **count >= cfg.win_count)
            .map(|(value, _)| *value)
            .max();
        ensure!(
            winning_value(&cells, cfg.win_count) == expected,
            "card {card}: {cells:?} paid the wrong prize"
        );
    }

    let total_weight: f64 = cfg.prizes.iter().map(|prize| prize.weight).sum();
    let lowest = cfg.lowest_prize();
    let lowest_weight = cfg
        .prizes
        .iter()
        .find(|prize| prize.value == lowest)
        .map_or(0.0, |prize| prize.weight);
    let lowest_share = usize_to_f64(seen.get(&lowest).copied().unwrap_or_default())
        / usize_to_f64(SCRATCH_CARDS * cfg.cells);
    ensure!(
        lowest_share >= lowest_weight / total_weight * 0.9,
        "lowest prize {lowest} appeared in only {lowest_share:.3} of cells"
    );

    let mut player = gambler(1_000_000)?;
    for card in 0..500 {
        let before = player.gold;
        let outcome = play_scratch_card(&mut player, &cfg, &mut rng)?;
        ensure!(
            outcome.settlement.stake == cfg.entry_cost,
            "card {card}: charged {}",
            outcome.settlement.stake
        );
        ensure!(
            outcome.settlement.payout == outcome.prize.unwrap_or(0),
            "card {card}: prize {:?} paid {}",
            outcome.prize,
            outcome.settlement.payout
        );
        check_settlement(&outcome.settlement, before, &player)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casino_scenarios_hold_across_seeds() {
        for seed in [2, 11, 1337] {
            coin_flip_fairness(seed).unwrap();
            blackjack_rules(seed).unwrap();
            scratch_distribution(seed).unwrap();
        }
    }

    #[test]
    fn settlement_check_flags_missing_gold() {
        let mut player = gambler(100).unwrap();
        let settlement = CasinoSettlement {
            game: arena_game::CasinoGame::CoinFlip,
            stake: 10,
            payout: 20,
            net: 10,
            gold_after: 110,
        };
        assert!(check_settlement(&settlement, 100, &player).is_err());
        player.gold = 110;
        assert!(check_settlement(&settlement, 100, &player).is_ok());
    }
}
