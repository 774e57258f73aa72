use anyhow::Result;

pub mod casino;
pub mod progression;

/// Check run once per iteration seed.
pub type ScenarioCheck = fn(u64) -> Result<()>;

#[derive(Debug, Clone, Copy)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

impl TestScenario {
    const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        check: ScenarioCheck,
    ) -> Self {
        Self {
            key,
            name,
            description,
            check,
        }
    }
}

const SCENARIOS: [TestScenario; 8] = [
    TestScenario::new(
        "leveling-curve",
        "Leveling Curve",
        "Random experience grants never lower level or experience and land on the curve",
        progression::leveling_curve,
    ),
    TestScenario::new(
        "arena-season",
        "Arena Season",
        "A full day of arena matches honours rewards, quest progress and the daily cap",
        progression::arena_season,
    ),
    TestScenario::new(
        "enhance-to-max",
        "Enhance to Max",
        "Enhancing an item to +9 charges every attempt and stops at the cap",
        progression::enhance_to_max,
    ),
    TestScenario::new(
        "coin-flip-fairness",
        "Coin Flip Fairness",
        "Heads lands about half the time and settlements conserve gold",
        casino::coin_flip_fairness,
    ),
    TestScenario::new(
        "blackjack-rules",
        "Blackjack Rules",
        "Dealer stands on 17, results match the totals and payouts match results",
        casino::blackjack_rules,
    ),
    TestScenario::new(
        "scratch-distribution",
        "Scratch Card Distribution",
        "Cells respect the repeat cap and the highest qualifying prize is paid",
        casino::scratch_distribution,
    ),
    TestScenario::new(
        "world-boss-raid",
        "World Boss Raid",
        "Shared boss health, one attack per player, proportional payouts",
        progression::world_boss_raid,
    ),
    TestScenario::new(
        "deterministic-replay",
        "Deterministic Replay",
        "The same seed replays an engine session to an identical event fingerprint",
        progression::deterministic_replay,
    ),
];

#[must_use]
pub fn all_scenarios() -> &'static [TestScenario] {
    &SCENARIOS
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    SCENARIOS
        .iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
        .copied()
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn scenario_keys_are_unique() {
        let keys: HashSet<&str> = SCENARIOS.iter().map(|scenario| scenario.key).collect();
        assert_eq!(keys.len(), SCENARIOS.len());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let scenario = get_scenario("Arena-Season").unwrap();
        assert_eq!(scenario.name, "Arena Season");
        assert!(get_scenario("smoke").is_none());
    }

    #[test]
    fn every_scenario_passes_on_a_fixed_seed() {
        for scenario in all_scenarios() {
            (scenario.check)(1337).unwrap_or_else(|err| panic!("{}: {err:#}", scenario.key));
        }
    }
}
