//! Move data. The large move catalog lives outside this crate; callers build
//! `Move` values (directly or through the serde model) and hand them to
//! `Pokemon::new`. Only the moves the engine itself needs are defined here:
//! struggle and the confusion self-hit.

use crate::data::types::Type;
use crate::sim::effect::{HookResult, MonRef, VolatileKind};
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::Status;
use crate::sim::stats::Boosts;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

pub const FLAG_CONTACT: u32 = 1 << 0;
pub const FLAG_SOUND: u32 = 1 << 1;
pub const FLAG_POWDER: u32 = 1 << 2;
pub const FLAG_BULLET: u32 = 1 << 3;
pub const FLAG_PROTECT: u32 = 1 << 4;
pub const FLAG_PUNCH: u32 = 1 << 5;
pub const FLAG_BITE: u32 = 1 << 6;
pub const FLAG_PULSE: u32 = 1 << 7;
/// Status moves normally bypass type immunity; this flag opts back in
/// (thunder-wave style).
pub const FLAG_STATUS_CHECKS_IMMUNITY: u32 = 1 << 8;
/// Using this move thaws a frozen user before the before-move gate.
pub const FLAG_THAWS_USER: u32 = 1 << 9;
/// Being hit by this move thaws a frozen target.
pub const FLAG_THAWS_TARGET: u32 = 1 << 10;

pub type CheckSuccessFn = fn(&mut BattleEngine, MonRef, Option<MonRef>, &Move) -> HookResult;
pub type DamageCallbackFn = fn(&BattleEngine, MonRef, MonRef) -> u16;
pub type BasePowerFn = fn(&BattleEngine, MonRef, MonRef, &Move) -> u16;
pub type OnSuccessFn = fn(&mut BattleEngine, MonRef, Option<MonRef>, &Move) -> HookResult;
pub type OnMoveFailFn = fn(&mut BattleEngine, MonRef, &Move);
pub type OnTryHitFn = fn(&mut BattleEngine, MonRef, &Move);
pub type SelfModifyFn = fn(&mut BattleEngine, MonRef, Option<MonRef>, &mut Move);
pub type AfterSecondaryFn = fn(&mut BattleEngine, MonRef, Option<MonRef>, &Move);
pub type SecondaryCallbackFn = fn(&mut BattleEngine, MonRef, MonRef);

/// A secondary effect: applied with `chance`% probability after a successful
/// hit, to the target or (with `affects_user`) the user.
#[derive(Clone, Debug)]
pub struct SecondaryEffect {
    pub chance: u8,
    pub effect: SecondaryKind,
    pub affects_user: bool,
}

/// Exactly one payload per secondary effect.
#[derive(Clone, Debug)]
pub enum SecondaryKind {
    Boosts(Boosts),
    Status(Status),
    Volatile(VolatileKind),
    Callback(SecondaryCallbackFn),
}

impl SecondaryEffect {
    pub fn status(chance: u8, status: Status) -> Self {
        Self { chance, effect: SecondaryKind::Status(status), affects_user: false }
    }

    pub fn volatile(chance: u8, volatile: VolatileKind) -> Self {
        Self { chance, effect: SecondaryKind::Volatile(volatile), affects_user: false }
    }

    pub fn boosts(chance: u8, boosts: Boosts) -> Self {
        Self { chance, effect: SecondaryKind::Boosts(boosts), affects_user: false }
    }
}

/// One move definition. Execution always works on a clone, so per-use
/// mutations (retyping, power changes) never leak into the shared catalog.
#[derive(Clone, Debug)]
pub struct Move {
    pub name: String,
    pub typ: Type,
    pub category: MoveCategory,
    pub base_power: u16,
    pub max_pp: u8,
    /// `None` always hits.
    pub accuracy: Option<u8>,
    pub priority: i8,
    /// Same-type attack bonus factor; abilities may raise it on the clone.
    pub stab: f32,
    pub crit_ratio: u8,
    pub always_crit: bool,
    pub never_crit: bool,
    /// Possible hit counts, weighted by repetition. `None` is a single hit.
    pub multihit: Option<Vec<u8>>,
    /// Percent of dealt damage taken as recoil.
    pub recoil: u8,
    /// Percent of dealt damage healed to the user.
    pub drain: u8,
    pub selfdestruct: bool,
    /// Self-targeting moves take the reduced fast path.
    pub targets_user: bool,
    /// Volt-switch style: the user must switch out after a successful hit.
    pub switch_user: bool,
    /// Hits through substitutes and screens.
    pub infiltrates: bool,
    pub flags: u32,
    pub ignore_accuracy_boosts: bool,
    pub ignore_evasion_boosts: bool,
    pub ignore_offensive_boosts: bool,
    pub ignore_defensive_boosts: bool,
    pub ignore_substitute: bool,
    /// Psyshock-style: damage is computed against this defensive category.
    pub defensive_category: Option<MoveCategory>,
    /// Foul-play-style: use the target's attack stat.
    pub use_opponent_attack: bool,
    pub target_status: Option<Status>,
    pub user_boosts: Option<Boosts>,
    pub secondary_effects: Vec<SecondaryEffect>,
    pub check_success: Option<CheckSuccessFn>,
    /// Fixed-damage moves (seismic-toss style) bypass the damage formula.
    pub damage_callback: Option<DamageCallbackFn>,
    pub base_power_callback: Option<BasePowerFn>,
    pub on_success: Option<OnSuccessFn>,
    pub on_move_fail: Option<OnMoveFailFn>,
    pub on_try_hit: Option<OnTryHitFn>,
    pub on_modify_move: Option<SelfModifyFn>,
    pub on_after_move_secondary: Option<AfterSecondaryFn>,
}

impl Default for Move {
    fn default() -> Self {
        Self {
            name: String::new(),
            typ: Type::Normal,
            category: MoveCategory::Physical,
            base_power: 0,
            max_pp: 16,
            accuracy: Some(100),
            priority: 0,
            stab: 1.5,
            crit_ratio: 0,
            always_crit: false,
            never_crit: false,
            multihit: None,
            recoil: 0,
            drain: 0,
            selfdestruct: false,
            targets_user: false,
            switch_user: false,
            infiltrates: false,
            flags: FLAG_PROTECT,
            ignore_accuracy_boosts: false,
            ignore_evasion_boosts: false,
            ignore_offensive_boosts: false,
            ignore_defensive_boosts: false,
            ignore_substitute: false,
            defensive_category: None,
            use_opponent_attack: false,
            target_status: None,
            user_boosts: None,
            secondary_effects: Vec::new(),
            check_success: None,
            damage_callback: None,
            base_power_callback: None,
            on_success: None,
            on_move_fail: None,
            on_try_hit: None,
            on_modify_move: None,
            on_after_move_secondary: None,
        }
    }
}

impl Move {
    pub fn new(name: &str, typ: Type, category: MoveCategory, base_power: u16, max_pp: u8) -> Self {
        Self {
            name: name.to_string(),
            typ,
            category,
            base_power,
            max_pp,
            ..Move::default()
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn makes_contact(&self) -> bool {
        self.has_flag(FLAG_CONTACT)
    }

    pub fn is_sound(&self) -> bool {
        self.has_flag(FLAG_SOUND)
    }

    pub fn is_powder(&self) -> bool {
        self.has_flag(FLAG_POWDER)
    }

    pub fn is_protectable(&self) -> bool {
        self.has_flag(FLAG_PROTECT)
    }
}

/// Normalizes display names to catalog ids: "Gyro Ball" -> "gyroball".
pub fn normalize_move_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn struggle_recoil(engine: &mut BattleEngine, user: MonRef, _target: Option<MonRef>, _mv: &Move) {
    // struggle recoil is 1/4 max HP, cause-less direct damage
    let max_hp = engine.battlefield.mon(user).stats.max_hp;
    engine.direct_damage(user, (max_hp / 4).max(1));
}

/// Selected automatically when every moveset slot is out of PP. Typeless,
/// uncounterable by PP pressure (max_pp = 0 skips deduction).
pub static STRUGGLE: Lazy<Move> = Lazy::new(|| Move {
    name: "struggle".to_string(),
    typ: Type::NoType,
    category: MoveCategory::Physical,
    base_power: 50,
    max_pp: 0,
    accuracy: None,
    on_after_move_secondary: Some(struggle_recoil),
    ..Move::default()
});

/// The self-hit rolled while confused: typeless 40 BP physical, no crit,
/// no STAB, computed against the user's own defense.
pub static CONFUSION_HIT: Lazy<Move> = Lazy::new(|| Move {
    name: "confusiondamage".to_string(),
    typ: Type::NoType,
    category: MoveCategory::Physical,
    base_power: 40,
    max_pp: 0,
    accuracy: None,
    never_crit: true,
    stab: 1.0,
    flags: 0,
    ..Move::default()
});

/// Recoil helper shared by the engine and move callbacks.
pub fn recoil_damage(total_damage: u16, recoil_pct: u8) -> u16 {
    if recoil_pct == 0 || total_damage == 0 {
        return 0;
    }
    let raw = (total_damage as f64 * recoil_pct as f64 / 100.0).round() as u16;
    raw.max(1)
}
