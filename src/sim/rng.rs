//! All battle randomness flows through one `BattleRng`. Every draw point is
//! an independently overridable seam so deterministic tests and damage-range
//! predictors can force outcomes without touching the pipeline.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Crit denominators by crit stage: 1/16, 1/8, 1/2, always.
const CRIT_ROLL: [u32; 4] = [16, 8, 2, 1];

#[derive(Clone, Debug)]
pub struct BattleRng {
    rng: SmallRng,
    /// Force the damage randomizer to a fixed percent in 85..=100.
    pub damage_roll: Option<u8>,
    /// Force every crit roll.
    pub crit_roll: Option<bool>,
    /// Force every accuracy roll.
    pub accuracy_roll: Option<bool>,
    /// Force every secondary-effect chance roll.
    pub secondary_roll: Option<bool>,
    /// Force speed ties: the side index that acts first.
    pub speed_tie_winner: Option<usize>,
    /// Force the multihit count (clamped into the move's table).
    pub multihit_roll: Option<u8>,
}

impl BattleRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            damage_roll: None,
            crit_roll: None,
            accuracy_roll: None,
            secondary_roll: None,
            speed_tie_winner: None,
            multihit_roll: None,
        }
    }

    /// The 85-100% damage spread: `100 - randrange(16)`.
    pub fn damage_randomizer(&mut self) -> u32 {
        match self.damage_roll {
            Some(pct) => pct.clamp(85, 100) as u32,
            None => 100 - self.rng.gen_range(0..16u32),
        }
    }

    pub fn critical_hit(&mut self, crit_ratio: u8) -> bool {
        match self.crit_roll {
            Some(forced) => forced,
            None => {
                let denom = CRIT_ROLL[(crit_ratio as usize).min(3)];
                self.rng.gen_range(0..denom) == 0
            }
        }
    }

    /// `accuracy` is the final percentage after boosts; truncated like the
    /// reference (randrange(100) >= int(acc) misses).
    pub fn accuracy_check(&mut self, accuracy: f32) -> bool {
        match self.accuracy_roll {
            Some(forced) => forced,
            None => self.rng.gen_range(0..100) < accuracy as i32,
        }
    }

    pub fn secondary_check(&mut self, chance: u8) -> bool {
        match self.secondary_roll {
            Some(forced) => forced,
            None => self.rng.gen_range(0..100u32) < chance as u32,
        }
    }

    /// Resolve a speed tie between the two sides; returns the side to act
    /// first.
    pub fn speed_tie(&mut self) -> usize {
        match self.speed_tie_winner {
            Some(side) => side,
            None => usize::from(self.rng.gen_bool(0.5)),
        }
    }

    /// Uniform choice from a multihit table (weighted by repetition).
    pub fn multihit(&mut self, table: &[u8]) -> u8 {
        debug_assert!(!table.is_empty());
        match self.multihit_roll {
            Some(forced) => forced.clamp(table[0], *table.last().unwrap()),
            None => table[self.rng.gen_range(0..table.len())],
        }
    }

    /// Random component of an event-queue ordering key.
    pub fn event_tiebreak(&mut self) -> u32 {
        self.rng.gen()
    }

    /// 1-in-n chance (full paralysis, thaw, confusion self-hit...).
    pub fn one_in(&mut self, n: u32) -> bool {
        self.rng.gen_range(0..n) == 0
    }

    /// Inclusive range draw (confusion duration and similar turn counts).
    pub fn turn_count(&mut self, lo: u8, hi: u8) -> u8 {
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform index into a non-empty list (forced random switches).
    pub fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.rng.gen_range(0..len)
    }
}
