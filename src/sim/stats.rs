//! Stat calculation, boost stages, and the default EV/IV spread heuristic.

use crate::data::types::{effectiveness, Type};
use crate::sim::effect::Fail;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Atk,
    Def,
    Spa,
    Spd,
    Spe,
    Acc,
    Evn,
}

/// Base stats as printed in the species data.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u16,
    pub atk: u16,
    pub def: u16,
    pub spa: u16,
    pub spd: u16,
    pub spe: u16,
}

/// Computed stats of a battle pokemon. Immutable after construction except
/// through forme changes, which recompute the whole set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PokemonStats {
    pub max_hp: u16,
    pub atk: u16,
    pub def: u16,
    pub spa: u16,
    pub spd: u16,
    pub spe: u16,
}

impl PokemonStats {
    pub fn calculate(base: BaseStats, level: u8, evs: [u8; 6], ivs: [u8; 6]) -> Self {
        Self {
            max_hp: calc_hp(base.hp, ivs[0], evs[0], level),
            atk: calc_stat(base.atk, ivs[1], evs[1], level),
            def: calc_stat(base.def, ivs[2], evs[2], level),
            spa: calc_stat(base.spa, ivs[3], evs[3], level),
            spd: calc_stat(base.spd, ivs[4], evs[4], level),
            spe: calc_stat(base.spe, ivs[5], evs[5], level),
        }
    }

    pub fn get(&self, stat: Stat) -> u16 {
        match stat {
            Stat::Atk => self.atk,
            Stat::Def => self.def,
            Stat::Spa => self.spa,
            Stat::Spd => self.spd,
            Stat::Spe => self.spe,
            Stat::Acc | Stat::Evn => unreachable!("acc/evn are boost-only stages"),
        }
    }
}

pub fn calc_hp(base: u16, iv: u8, ev: u8, level: u8) -> u16 {
    if base == 1 {
        // shedinja
        return 1;
    }
    let inner = 2 * base as u32 + iv as u32 + (ev as u32 / 4) + 100;
    (inner * level as u32 / 100 + 10) as u16
}

pub fn calc_stat(base: u16, iv: u8, ev: u8, level: u8) -> u16 {
    let inner = 2 * base as u32 + iv as u32 + (ev as u32 / 4);
    (inner * level as u32 / 100 + 5) as u16
}

/// The seven boost stages, each clamped to [-6, 6].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Boosts {
    pub atk: i8,
    pub def: i8,
    pub spa: i8,
    pub spd: i8,
    pub spe: i8,
    pub acc: i8,
    pub evn: i8,
}

impl Boosts {
    pub fn get(&self, stat: Stat) -> i8 {
        match stat {
            Stat::Atk => self.atk,
            Stat::Def => self.def,
            Stat::Spa => self.spa,
            Stat::Spd => self.spd,
            Stat::Spe => self.spe,
            Stat::Acc => self.acc,
            Stat::Evn => self.evn,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i8) {
        let slot = match stat {
            Stat::Atk => &mut self.atk,
            Stat::Def => &mut self.def,
            Stat::Spa => &mut self.spa,
            Stat::Spd => &mut self.spd,
            Stat::Spe => &mut self.spe,
            Stat::Acc => &mut self.acc,
            Stat::Evn => &mut self.evn,
        };
        *slot = value;
    }

    pub const STATS: [Stat; 7] = [
        Stat::Atk,
        Stat::Def,
        Stat::Spa,
        Stat::Spd,
        Stat::Spe,
        Stat::Acc,
        Stat::Evn,
    ];

    /// Apply a delta, clamping every stage to [-6, 6].
    /// Returns `Err(Fail)` when no stage actually changed.
    pub fn apply(&mut self, delta: &Boosts) -> Result<(), Fail> {
        let prev = *self;
        for stat in Self::STATS {
            let next = self.get(stat).saturating_add(delta.get(stat)).clamp(-6, 6);
            self.set(stat, next);
        }
        if prev == *self {
            return Err(Fail);
        }
        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        Self::STATS.iter().all(|&s| self.get(s) == 0)
    }

    pub fn atk(n: i8) -> Self {
        Boosts { atk: n, ..Boosts::default() }
    }

    pub fn spe(n: i8) -> Self {
        Boosts { spe: n, ..Boosts::default() }
    }
}

/// Default EV/IV spread: 85 EVs / 31 IVs across the board, with the
/// moveset-keyed adjustments the reference format uses:
/// - gyro ball carriers run 0 speed and dump the spare EVs into attack
/// - trick room carriers run 0 speed and dump the spare EVs into HP
/// - an HP divisible by 4 (or by 2 at 4x) against rock chip damage drops
///   4 HP EVs into the dominant attacking stat
pub fn default_spread(
    base: BaseStats,
    level: u8,
    types: [Type; 2],
    move_ids: &[&str],
    physical_moves: usize,
    special_moves: usize,
    has_sitrus_and_bellydrum: bool,
) -> ([u8; 6], [u8; 6]) {
    const HP: usize = 0;
    const ATK: usize = 1;
    const SPA: usize = 3;

    let mut evs: [u8; 6];
    let mut ivs: [u8; 6];

    if move_ids.iter().any(|m| *m == "gyroball") {
        evs = [85, 170, 85, 85, 85, 0];
        ivs = [31, 31, 31, 31, 31, 0];
    } else if move_ids.iter().any(|m| *m == "trickroom") {
        evs = [170, 85, 85, 85, 85, 0];
        ivs = [31, 31, 31, 31, 31, 0];
    } else {
        evs = [85; 6];
        ivs = [31; 6];
    }

    let hp = calc_hp(base.hp, ivs[HP], evs[HP], level);

    if has_sitrus_and_bellydrum && hp % 2 == 1 {
        evs[HP] -= 4;
        evs[ATK] += 4;
    } else {
        let rock = effectiveness(Type::Rock, types);
        if (rock == 2.0 && hp % 4 == 0) || (rock == 4.0 && hp % 2 == 0) {
            evs[HP] -= 4;
            evs[if physical_moves > special_moves { ATK } else { SPA }] += 4;
        }
    }

    (evs, ivs)
}
