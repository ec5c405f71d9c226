//! Side (one player's team state) and BattleField (the whole battle).

use crate::sim::effect::{
    Effect, EffectRegistry, EffectSource, Fail, Holder, MonRef, WeatherKind, HAZARDS,
};
use crate::sim::pokemon::{Pokemon, Status};

#[derive(Clone, Debug)]
pub struct Side {
    pub index: usize,
    pub team: Vec<Pokemon>,
    /// Team slot of the active pokemon. Unset while a replacement is due.
    /// Invariant: when set, the active pokemon is not fainted.
    pub active: Option<usize>,
    pub has_mega_evolved: bool,
    pub last_fainted_on_turn: Option<u32>,
    pub effects: EffectRegistry,
}

impl Side {
    pub fn new(team: Vec<Pokemon>, index: usize) -> Self {
        assert!(index < 2);
        assert!(!team.is_empty() && team.len() <= 6, "team must have 1-6 members");
        Self {
            index,
            team,
            active: None,
            has_mega_evolved: false,
            last_fainted_on_turn: None,
            effects: EffectRegistry::new(),
        }
    }

    pub fn active_pokemon(&self) -> Option<&Pokemon> {
        self.active.map(|slot| &self.team[slot])
    }

    pub fn active_pokemon_mut(&mut self) -> Option<&mut Pokemon> {
        self.active.map(move |slot| &mut self.team[slot])
    }

    /// Bench slots, in team order.
    pub fn bench(&self) -> impl Iterator<Item = (usize, &Pokemon)> {
        self.team
            .iter()
            .enumerate()
            .filter(move |(slot, _)| Some(*slot) != self.active)
    }

    pub fn remaining_pokemon_on_bench(&self) -> usize {
        self.bench().filter(|(_, p)| p.status != Some(Status::Fnt)).count()
    }

    pub fn remaining_pokemon(&self) -> usize {
        self.team.iter().filter(|p| p.status != Some(Status::Fnt)).count()
    }

    pub fn clear_hazards(&mut self) {
        for hazard in HAZARDS {
            self.effects.remove(EffectSource::Hazard(hazard));
        }
    }
}

#[derive(Clone, Debug)]
pub struct BattleField {
    pub sides: [Side; 2],
    pub effects: EffectRegistry,
    /// Cached source of the attached weather effect, if any.
    pub weather: Option<WeatherKind>,
    /// Monotonic, +1 per completed turn init.
    pub turns: u32,
    /// Winning side index; set once, never changed.
    pub win: Option<usize>,
    pub last_move_used: Option<String>,
}

impl BattleField {
    pub fn new(side0: Side, side1: Side) -> Self {
        Self {
            sides: [side0, side1],
            effects: EffectRegistry::new(),
            weather: None,
            turns: 0,
            win: None,
            last_move_used: None,
        }
    }

    pub fn mon(&self, mon: MonRef) -> &Pokemon {
        &self.sides[mon.side].team[mon.slot]
    }

    pub fn mon_mut(&mut self, mon: MonRef) -> &mut Pokemon {
        &mut self.sides[mon.side].team[mon.slot]
    }

    pub fn active_ref(&self, side: usize) -> Option<MonRef> {
        self.sides[side].active.map(|slot| MonRef { side, slot })
    }

    /// The active pokemon opposite `mon`, if any.
    pub fn foe_ref(&self, mon: MonRef) -> Option<MonRef> {
        self.active_ref(1 - mon.side)
    }

    pub fn registry(&self, holder: Holder) -> &EffectRegistry {
        match holder {
            Holder::Mon(mon) => &self.mon(mon).effects,
            Holder::Side(side) => &self.sides[side].effects,
            Holder::Field => &self.effects,
        }
    }

    pub fn registry_mut(&mut self, holder: Holder) -> &mut EffectRegistry {
        match holder {
            Holder::Mon(mon) => &mut self.mon_mut(mon).effects,
            Holder::Side(side) => &mut self.sides[side].effects,
            Holder::Field => &mut self.effects,
        }
    }

    /// Attach a weather effect, replacing the current one. A trio weather can
    /// only be replaced by another trio weather; re-setting the same weather
    /// is a `Fail` no-op.
    pub fn set_weather(&mut self, effect: Effect) -> Result<(), Fail> {
        let EffectSource::Weather(kind) = effect.source else {
            panic!("set_weather called with non-weather effect {:?}", effect.source);
        };
        if let Some(current) = self.weather {
            if current == kind {
                return Err(Fail);
            }
            if current.is_trio() && !kind.is_trio() {
                return Err(Fail);
            }
            self.effects.remove(EffectSource::Weather(current));
        }
        self.weather = Some(kind);
        self.effects
            .set(effect)
            .expect("weather cache out of sync with field registry");
        Ok(())
    }

    pub fn clear_weather(&mut self) {
        if let Some(current) = self.weather.take() {
            self.effects.remove(EffectSource::Weather(current));
        }
    }

    /// Removing the current weather through the registry clears the cache.
    pub fn remove_field_effect(&mut self, source: EffectSource) -> Option<Effect> {
        let removed = self.effects.remove(source);
        if removed.is_some() {
            if let EffectSource::Weather(kind) = source {
                if self.weather == Some(kind) {
                    self.weather = None;
                }
            }
        }
        removed
    }
}
