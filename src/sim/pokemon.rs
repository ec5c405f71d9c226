//! A pokemon in a battle: identity plus mutable battle state plus its
//! attached effects.

use crate::data::moves::Move;
use crate::data::types::{effectiveness, Type};
use crate::sim::effect::{
    EffectRegistry, Hooks, Immunity, VolatileKind, WeatherKind,
};
use crate::sim::stats::{default_spread, BaseStats, Boosts, PokemonStats, Stat};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Major status ailments. `Fnt` is assigned exclusively by the engine's
/// faint primitive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Brn,
    Fnt,
    Frz,
    Par,
    Psn,
    Slp,
    Tox,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Species identity: everything a pokemon is outside of battle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesData {
    pub name: String,
    pub base_stats: BaseStats,
    pub types: [Type; 2],
    pub weight: f32,
}

/// An ability: a name plus its hook table. The concrete ability catalog is
/// external; `Ability::none()` carries the empty table.
#[derive(Clone, Debug)]
pub struct Ability {
    pub name: String,
    pub hooks: &'static Hooks,
}

impl Ability {
    pub fn new(name: &str, hooks: &'static Hooks) -> Self {
        Self { name: name.to_string(), hooks }
    }

    pub fn none() -> Self {
        Self::new("noability", &Hooks::NONE)
    }
}

/// A held item: a name plus its hook table, like abilities.
#[derive(Clone, Debug)]
pub struct Item {
    pub name: String,
    pub hooks: &'static Hooks,
}

impl Item {
    pub fn new(name: &str, hooks: &'static Hooks) -> Self {
        Self { name: name.to_string(), hooks }
    }
}

/// Mega forme supplied at construction; applied once per battle per side.
#[derive(Clone, Debug)]
pub struct MegaForme {
    pub species: SpeciesData,
    pub ability: Ability,
}

/// One moveset slot: the move plus its remaining PP.
#[derive(Clone, Debug)]
pub struct MoveSlot {
    pub mv: Move,
    pub pp: u8,
}

/// What hit this pokemon this turn (for counter/avalanche-style callbacks).
#[derive(Clone, Debug)]
pub struct AttackRecord {
    pub move_name: String,
    pub damage: u16,
}

#[derive(Clone, Debug)]
pub struct Pokemon {
    pub species: SpeciesData,
    pub level: u8,
    pub gender: Option<Gender>,
    pub evs: [u8; 6],
    pub ivs: [u8; 6],
    pub stats: PokemonStats,
    pub hp: u16,
    pub status: Option<Status>,
    pub boosts: Boosts,
    /// Current types; may diverge from species types mid-battle and reverts
    /// on switch-out.
    pub types: [Type; 2],
    pub moveset: Vec<MoveSlot>,
    pub ability: Ability,
    pub base_ability: Ability,
    pub item: Option<Item>,
    pub mega_forme: Option<Box<MegaForme>>,
    pub is_mega: bool,

    pub is_active: bool,
    pub has_moved_this_turn: bool,
    pub will_move_this_turn: bool,
    pub damage_done_this_turn: u16,
    pub was_attacked_this_turn: Option<AttackRecord>,
    pub hit_by_crit: bool,
    pub turns_out: u16,
    pub last_move_used: Option<String>,
    pub is_switching_out: bool,
    pub must_switch: bool,
    /// Rest-style sleep is exempt from sleep clause and wakes faster.
    pub is_resting: bool,
    /// Turns spent asleep; checked at before-move time, not between turns.
    pub turns_slept: Option<u8>,

    pub effects: EffectRegistry,
}

impl Pokemon {
    pub fn new(
        species: SpeciesData,
        level: u8,
        moveset: Vec<Move>,
        ability: Ability,
        item: Option<Item>,
    ) -> Result<Self> {
        Self::with_spread(species, level, moveset, ability, item, None, None, None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_spread(
        species: SpeciesData,
        level: u8,
        moveset: Vec<Move>,
        ability: Ability,
        item: Option<Item>,
        gender: Option<Gender>,
        evs: Option<[u8; 6]>,
        ivs: Option<[u8; 6]>,
    ) -> Result<Self> {
        if level == 0 || level > 100 {
            bail!("level must be in 1..=100, got {}", level);
        }
        if species.name.is_empty() {
            bail!("species name must not be empty");
        }

        let (evs, ivs) = match (evs, ivs) {
            (Some(evs), Some(ivs)) => (evs, ivs),
            _ => {
                use crate::data::moves::{normalize_move_name, MoveCategory};
                let ids: Vec<String> =
                    moveset.iter().map(|m| normalize_move_name(&m.name)).collect();
                let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                let physical = moveset
                    .iter()
                    .filter(|m| m.category == MoveCategory::Physical && m.base_power > 0)
                    .count();
                let special = moveset
                    .iter()
                    .filter(|m| m.category == MoveCategory::Special && m.base_power > 0)
                    .count();
                let sitrus_bellydrum = item.as_ref().is_some_and(|i| i.name == "sitrusberry")
                    && id_refs.contains(&"bellydrum");
                default_spread(
                    species.base_stats,
                    level,
                    species.types,
                    &id_refs,
                    physical,
                    special,
                    sitrus_bellydrum,
                )
            }
        };

        let stats = PokemonStats::calculate(species.base_stats, level, evs, ivs);
        let types = species.types;
        let moveset = moveset.into_iter().map(|mv| MoveSlot { pp: mv.max_pp, mv }).collect();

        Ok(Self {
            hp: stats.max_hp,
            stats,
            types,
            level,
            gender,
            evs,
            ivs,
            moveset,
            base_ability: ability.clone(),
            ability,
            item,
            mega_forme: None,
            is_mega: false,
            species,
            status: None,
            boosts: Boosts::default(),
            is_active: false,
            has_moved_this_turn: false,
            will_move_this_turn: false,
            damage_done_this_turn: 0,
            was_attacked_this_turn: None,
            hit_by_crit: false,
            turns_out: 0,
            last_move_used: None,
            is_switching_out: false,
            must_switch: false,
            is_resting: false,
            turns_slept: None,
            effects: EffectRegistry::new(),
        })
    }

    pub fn with_mega_forme(mut self, forme: MegaForme) -> Self {
        self.mega_forme = Some(Box::new(forme));
        self
    }

    pub fn is_fainted(&self) -> bool {
        debug_assert!(
            (self.status == Some(Status::Fnt)) == (self.hp == 0),
            "hp/fnt invariant broken: hp={} status={:?}",
            self.hp,
            self.status
        );
        self.status == Some(Status::Fnt)
    }

    pub fn can_mega_evolve(&self, side_has_mega_evolved: bool) -> bool {
        self.mega_forme.is_some() && !self.is_mega && !side_has_mega_evolved
    }

    /// A stat after boost stages: stage n > 0 multiplies by (2+n)/2, stage
    /// n < 0 divides by (2+|n|)/2, truncating.
    pub fn calculate_stat(&self, stat: Stat, override_boost: Option<i8>) -> u32 {
        let base = self.stats.get(stat) as u32;
        let boost = override_boost.unwrap_or_else(|| self.boosts.get(stat));
        apply_boost_factor(base, boost)
    }

    pub fn cure_status(&mut self) {
        if matches!(self.status, None | Some(Status::Fnt)) {
            return;
        }
        let status = self.status.take().unwrap();
        self.effects.remove(crate::sim::effect::EffectSource::Status(status));
        self.is_resting = false;
        self.turns_slept = None;
    }

    /// Type-chart immunity to a move, after effect overrides. Status-category
    /// moves bypass the chart unless flagged otherwise; powder moves never
    /// affect grass types.
    pub fn is_immune_to_move(&self, user: &Pokemon, mv: &Move) -> bool {
        use crate::data::moves::{MoveCategory, FLAG_STATUS_CHECKS_IMMUNITY};
        for effect in self.effects.iter() {
            if let Some(handler) = effect.hooks.on_get_immunity {
                // type immunity first, then the move itself
                let immune = handler(effect, self, Immunity::Type(mv.typ))
                    .or_else(|| handler(effect, self, Immunity::Move(mv)));
                if let Some(immune) = immune {
                    return immune;
                }
            }
        }
        let _ = user;
        if self.types.contains(&Type::Grass) && mv.is_powder() {
            return true;
        }
        if mv.category == MoveCategory::Status && !mv.has_flag(FLAG_STATUS_CHECKS_IMMUNITY) {
            return false;
        }
        effectiveness(mv.typ, self.types) == 0.0
    }

    /// Immunity to a non-move thing: a type, status, weather chip, or powder.
    pub fn is_immune_to(&self, thing: Immunity) -> bool {
        for effect in self.effects.iter() {
            if let Some(handler) = effect.hooks.on_get_immunity {
                if let Some(immune) = handler(effect, self, thing) {
                    return immune;
                }
            }
        }
        match thing {
            Immunity::Type(typ) => effectiveness(typ, self.types) == 0.0,
            Immunity::Status(status) => {
                let immune_types: &[Type] = match status {
                    Status::Brn => &[Type::Fire],
                    Status::Par => &[Type::Electric],
                    Status::Psn | Status::Tox => &[Type::Poison, Type::Steel],
                    Status::Frz => &[Type::Ice],
                    Status::Slp | Status::Fnt => &[],
                };
                self.types.iter().any(|t| immune_types.contains(t))
            }
            Immunity::Weather(WeatherKind::Sandstorm) => self
                .types
                .iter()
                .any(|t| matches!(t, Type::Ground | Type::Rock | Type::Steel)),
            Immunity::Weather(WeatherKind::Hail) => self.types.contains(&Type::Ice),
            Immunity::Weather(_) => false,
            Immunity::Powder => self.types.contains(&Type::Grass),
            Immunity::Volatile(_) => false,
            Immunity::Move(_) => false,
        }
    }

    pub fn has_volatile(&self, kind: VolatileKind) -> bool {
        self.effects.has(crate::sim::effect::EffectSource::Volatile(kind))
    }

    pub fn pp(&self, slot: usize) -> u8 {
        self.moveset[slot].pp
    }
}

/// Stage multiplier shared by stats and (conceptually) nothing else: the
/// (2+n)/2 table, truncating toward zero.
pub fn apply_boost_factor(value: u32, boost: i8) -> u32 {
    debug_assert!((-6..=6).contains(&boost));
    if boost >= 0 {
        value * (2 + boost as u32) / 2
    } else {
        value * 2 / (2 + (-boost) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::moves::{Move, MoveCategory};

    fn species() -> SpeciesData {
        SpeciesData {
            name: "dummy".to_string(),
            base_stats: BaseStats { hp: 100, atk: 100, def: 100, spa: 100, spd: 100, spe: 100 },
            types: [Type::Normal, Type::NoType],
            weight: 100.0,
        }
    }

    fn tackle() -> Move {
        Move::new("tackle", Type::Normal, MoveCategory::Physical, 50, 56)
    }

    #[test]
    fn test_construction_uses_default_spread() {
        let mon = Pokemon::new(species(), 100, vec![tackle()], Ability::none(), None).unwrap();
        assert_eq!(mon.evs, [85; 6]);
        assert_eq!(mon.ivs, [31; 6]);
        assert_eq!(mon.hp, mon.stats.max_hp);
        assert_eq!(mon.stats.atk, 257);
    }

    #[test]
    fn test_bad_level_is_rejected() {
        assert!(Pokemon::new(species(), 0, vec![], Ability::none(), None).is_err());
        assert!(Pokemon::new(species(), 101, vec![], Ability::none(), None).is_err());
    }

    #[test]
    fn test_boost_factor_table() {
        assert_eq!(apply_boost_factor(100, 0), 100);
        assert_eq!(apply_boost_factor(100, 1), 150);
        assert_eq!(apply_boost_factor(100, 2), 200);
        assert_eq!(apply_boost_factor(100, 6), 400);
        assert_eq!(apply_boost_factor(100, -1), 66);
        assert_eq!(apply_boost_factor(100, -6), 25);
    }

    #[test]
    fn test_status_immunity_by_type() {
        let mut data = species();
        data.types = [Type::Electric, Type::NoType];
        let mon = Pokemon::new(data, 50, vec![tackle()], Ability::none(), None).unwrap();
        assert!(mon.is_immune_to(Immunity::Status(Status::Par)));
        assert!(!mon.is_immune_to(Immunity::Status(Status::Brn)));
    }

    #[test]
    fn test_status_moves_bypass_type_chart() {
        let mut data = species();
        data.types = [Type::Ghost, Type::NoType];
        let ghost = Pokemon::new(data, 50, vec![], Ability::none(), None).unwrap();
        let user = Pokemon::new(species(), 50, vec![tackle()], Ability::none(), None).unwrap();

        let mut growl = Move::new("growl", Type::Normal, MoveCategory::Status, 0, 64);
        assert!(!ghost.is_immune_to_move(&user, &growl));

        growl.category = MoveCategory::Physical;
        assert!(ghost.is_immune_to_move(&user, &growl));
    }
}
