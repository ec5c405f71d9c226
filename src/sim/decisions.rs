//! Shipped `DecisionSource` implementations: random players for rollouts and
//! scripted/auto players for tests.

use crate::sim::effect::Choice;
use crate::sim::engine::DecisionSource;
use crate::sim::side::BattleField;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Picks a uniformly random move; never switches voluntarily.
#[derive(Clone, Debug)]
pub struct RandomDecisionSource {
    rng: SmallRng,
}

impl RandomDecisionSource {
    pub fn new(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }
}

impl DecisionSource for RandomDecisionSource {
    fn select_move_or_switch(
        &mut self,
        moves: &[Choice],
        _switches: &[usize],
        can_mega_evolve: bool,
        _view: &BattleField,
    ) -> (Choice, bool) {
        let choice = moves[self.rng.gen_range(0..moves.len())];
        (choice, can_mega_evolve && self.rng.gen_bool(0.5))
    }

    fn select_forced_switch(&mut self, switches: &[usize], _view: &BattleField) -> usize {
        switches[self.rng.gen_range(0..switches.len())]
    }
}

/// Random moves, with a 1-in-10 voluntary switch when the bench allows.
#[derive(Clone, Debug)]
pub struct RandomWithSwitches {
    rng: SmallRng,
}

impl RandomWithSwitches {
    pub fn new(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }
}

impl DecisionSource for RandomWithSwitches {
    fn select_move_or_switch(
        &mut self,
        moves: &[Choice],
        switches: &[usize],
        can_mega_evolve: bool,
        _view: &BattleField,
    ) -> (Choice, bool) {
        if !switches.is_empty() && self.rng.gen_range(0..10) == 0 {
            let slot = switches[self.rng.gen_range(0..switches.len())];
            return (Choice::Switch(slot), false);
        }
        let choice = moves[self.rng.gen_range(0..moves.len())];
        (choice, can_mega_evolve && self.rng.gen_bool(0.5))
    }

    fn select_forced_switch(&mut self, switches: &[usize], _view: &BattleField) -> usize {
        switches[self.rng.gen_range(0..switches.len())]
    }
}

/// Replays a fixed decision script; test harness use. Panics when the script
/// runs dry. Forced switches consume the next scripted `Switch` if one is
/// queued, else fall back to the first legal slot.
#[derive(Clone, Debug)]
pub struct ScriptedDecisionSource {
    decisions: Vec<Choice>,
    counter: usize,
    pub mega_on: bool,
}

impl ScriptedDecisionSource {
    pub fn new(decisions: Vec<Choice>) -> Self {
        Self { decisions, counter: 0, mega_on: false }
    }

    fn next(&mut self) -> Choice {
        let choice = self.decisions[self.counter];
        self.counter += 1;
        choice
    }
}

impl DecisionSource for ScriptedDecisionSource {
    fn select_move_or_switch(
        &mut self,
        _moves: &[Choice],
        _switches: &[usize],
        can_mega_evolve: bool,
        _view: &BattleField,
    ) -> (Choice, bool) {
        (self.next(), can_mega_evolve && self.mega_on)
    }

    fn select_forced_switch(&mut self, switches: &[usize], _view: &BattleField) -> usize {
        if let Some(Choice::Switch(slot)) = self.decisions.get(self.counter).copied() {
            self.counter += 1;
            if switches.contains(&slot) {
                return slot;
            }
        }
        switches[0]
    }
}

/// Always takes the first legal choice.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoDecisionSource;

impl DecisionSource for AutoDecisionSource {
    fn select_move_or_switch(
        &mut self,
        moves: &[Choice],
        _switches: &[usize],
        _can_mega_evolve: bool,
        _view: &BattleField,
    ) -> (Choice, bool) {
        (moves[0], false)
    }

    fn select_forced_switch(&mut self, switches: &[usize], _view: &BattleField) -> usize {
        switches[0]
    }
}
