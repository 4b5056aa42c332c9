//! Reference skirmish model.
//!
//! A deliberately small stochastic battle: two forces exchange fire in
//! simultaneous rounds until one (or both) is destroyed or the round limit
//! runs out. Each living unit picks a random living enemy and rolls 2d6
//! against its gunnery target; a hit removes `damage` points of armor.

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::simulation::{Simulator, TrialContext};
use crate::types::{AutoResolveError, TrialOutcome};

const DEFAULT_MAX_ROUNDS: u32 = 50;

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One combat unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub name: String,
    /// 2d6 target number needed to hit (2 = always hits, 12 = rarely).
    pub gunnery: u8,
    pub damage: u32,
    /// Damage the unit absorbs before it is destroyed.
    pub armor: u32,
}

impl UnitProfile {
    pub fn new(name: &str, gunnery: u8, damage: u32, armor: u32) -> Self {
        Self {
            name: name.to_string(),
            gunnery,
            damage,
            armor,
        }
    }
}

/// Both forces plus the round limit. Outcomes are reported for `player`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skirmish {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    pub player: Vec<UnitProfile>,
    pub opponent: Vec<UnitProfile>,
}

impl Skirmish {
    /// Check the scenario can be fought at all.
    pub fn validate(&self) -> Result<(), AutoResolveError> {
        if self.max_rounds == 0 {
            return Err(AutoResolveError::InvalidScenario(
                "max_rounds must be at least 1".into(),
            ));
        }
        for (side, units) in [("player", &self.player), ("opponent", &self.opponent)] {
            if units.is_empty() {
                return Err(AutoResolveError::InvalidScenario(format!(
                    "{side} force has no units"
                )));
            }
            for unit in units {
                if !(2..=12).contains(&unit.gunnery) {
                    return Err(AutoResolveError::InvalidScenario(format!(
                        "{side} unit '{}' has gunnery {} outside 2..=12",
                        unit.name, unit.gunnery
                    )));
                }
                if unit.armor == 0 {
                    return Err(AutoResolveError::InvalidScenario(format!(
                        "{side} unit '{}' has no armor",
                        unit.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fight one battle with the given RNG.
    pub fn fight<R: Rng>(&self, rng: &mut R) -> TrialOutcome {
        let mut player: Vec<u32> = self.player.iter().map(|u| u.armor).collect();
        let mut opponent: Vec<u32> = self.opponent.iter().map(|u| u.armor).collect();

        for round in 1..=self.max_rounds {
            // Fire is simultaneous: both volleys are rolled before either lands.
            let player_hits = volley(&self.player, &player, &opponent, rng);
            let opponent_hits = volley(&self.opponent, &opponent, &player, rng);
            apply(&mut opponent, &player_hits);
            apply(&mut player, &opponent_hits);

            let player_alive = player.iter().any(|&a| a > 0);
            let opponent_alive = opponent.iter().any(|&a| a > 0);
            let outcome = match (player_alive, opponent_alive) {
                (true, false) => Some(TrialOutcome::Win),
                (false, true) => Some(TrialOutcome::Loss),
                (false, false) => Some(TrialOutcome::Draw),
                (true, true) => None,
            };
            if let Some(outcome) = outcome {
                trace!(round, %outcome, "Skirmish decided");
                return outcome;
            }
        }

        TrialOutcome::Draw
    }

    /// Two lances of roughly equal strength. Handy for demos and tests.
    pub fn sample() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            player: vec![
                UnitProfile::new("Atlas", 7, 20, 60),
                UnitProfile::new("Griffin", 6, 10, 35),
                UnitProfile::new("Wolverine", 7, 10, 35),
                UnitProfile::new("Locust", 8, 5, 15),
            ],
            opponent: vec![
                UnitProfile::new("Marauder", 7, 15, 50),
                UnitProfile::new("Shadow Hawk", 7, 10, 35),
                UnitProfile::new("Phoenix Hawk", 7, 8, 30),
                UnitProfile::new("Stinger", 8, 5, 15),
            ],
        }
    }
}

/// Roll every living shooter's attack. Returns `(target index, damage)` hits.
fn volley<R: Rng>(
    shooters: &[UnitProfile],
    shooter_armor: &[u32],
    target_armor: &[u32],
    rng: &mut R,
) -> Vec<(usize, u32)> {
    let targets: Vec<usize> = (0..target_armor.len())
        .filter(|&i| target_armor[i] > 0)
        .collect();
    let mut hits = Vec::new();

    for (unit, _) in shooters
        .iter()
        .zip(shooter_armor)
        .filter(|(_, &armor)| armor > 0)
    {
        let Some(&target) = targets.choose(rng) else {
            break;
        };
        let roll: u8 = rng.gen_range(1..=6) + rng.gen_range(1..=6);
        if roll >= unit.gunnery {
            hits.push((target, unit.damage));
        }
    }
    hits
}

fn apply(armor: &mut [u32], hits: &[(usize, u32)]) {
    for &(target, damage) in hits {
        armor[target] = armor[target].saturating_sub(damage);
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// [`Simulator`] over [`Skirmish`] scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkirmishSimulator;

impl Simulator for SkirmishSimulator {
    type Params = Skirmish;

    fn run_trial(&self, params: &Skirmish, ctx: TrialContext) -> Result<TrialOutcome> {
        params.validate()?;
        let mut rng = match ctx.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(params.fight(&mut rng))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
