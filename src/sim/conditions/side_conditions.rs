//! Side-scoped conditions: entry hazards, screens, and team-wide effects.

use crate::data::moves::{Move, MoveCategory};
use crate::data::types::{effectiveness, Type};
use crate::sim::effect::{
    Cause, DamageSource, Effect, EffectRef, EffectRegistry, EffectSource, EffectState, Fail,
    HazardKind, Holder, Hooks, HookResult, Immunity, MonRef, SideConditionKind,
};
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::Status;
use crate::sim::stats::Boosts;

fn side_condition(kind: SideConditionKind, hooks: &'static Hooks) -> Effect {
    Effect::new(EffectSource::SideCondition(kind), hooks)
}

/// Lay a hazard on a side's registry. Spikes stack to 3 layers and toxic
/// spikes to 2; further layers (and duplicate single-layer hazards) fail.
pub fn add_hazard(registry: &mut EffectRegistry, kind: HazardKind) -> Result<(), Fail> {
    let source = EffectSource::Hazard(kind);
    let cap = match kind {
        HazardKind::Spikes => 3,
        HazardKind::ToxicSpikes => 2,
        HazardKind::StealthRock | HazardKind::StickyWeb => 1,
    };
    if let Some(effect) = registry.get_mut(source) {
        let layers = effect.state.layers();
        if layers >= cap {
            return Err(Fail);
        }
        effect.state = EffectState::Layers(layers + 1);
        return Ok(());
    }
    registry.set(hazard_effect(kind))
}

pub fn hazard_effect(kind: HazardKind) -> Effect {
    let hooks: &'static Hooks = match kind {
        HazardKind::Spikes => &SPIKES_HOOKS,
        HazardKind::StealthRock => &STEALTH_ROCK_HOOKS,
        HazardKind::StickyWeb => &STICKY_WEB_HOOKS,
        HazardKind::ToxicSpikes => &TOXIC_SPIKES_HOOKS,
    };
    Effect::new(EffectSource::Hazard(kind), hooks).with_state(EffectState::Layers(1))
}

// ------------------------------------------------------------------- spikes

fn spikes_switch_in(engine: &mut BattleEngine, er: EffectRef, mon: MonRef) {
    if engine.battlefield.mon(mon).is_immune_to(Immunity::Type(Type::Ground)) {
        return;
    }
    let layers = engine.effect(er).map(|e| e.state.layers()).unwrap_or(0);
    // 1, 2, 3 layers do 1/8, 1/6, 1/4 of max HP
    let divisor = match layers {
        1 => 8,
        2 => 6,
        _ => 4,
    };
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let _ = engine.damage(
        mon,
        (max_hp / divisor).max(1),
        Cause::Hazard,
        DamageSource::Effect(er.source),
        None,
        0,
    );
}

static SPIKES_HOOKS: Hooks = Hooks {
    on_switch_in: Some(spikes_switch_in),
    ..Hooks::NONE
};

// ------------------------------------------------------------- stealth rock

fn stealth_rock_switch_in(engine: &mut BattleEngine, er: EffectRef, mon: MonRef) {
    let types = engine.battlefield.mon(mon).types;
    let eff = effectiveness(Type::Rock, types);
    if eff == 0.0 {
        return;
    }
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let amount = (max_hp as f32 * eff / 8.0) as u16;
    let _ = engine.damage(
        mon,
        amount.max(1),
        Cause::Hazard,
        DamageSource::Effect(er.source),
        None,
        0,
    );
}

static STEALTH_ROCK_HOOKS: Hooks = Hooks {
    on_switch_in: Some(stealth_rock_switch_in),
    ..Hooks::NONE
};

// --------------------------------------------------------------- sticky web

fn sticky_web_switch_in(engine: &mut BattleEngine, _er: EffectRef, mon: MonRef) {
    // an earlier hazard may already have knocked the entrant out
    if engine.battlefield.mon(mon).is_fainted() {
        return;
    }
    if engine.battlefield.mon(mon).is_immune_to(Immunity::Type(Type::Ground)) {
        return;
    }
    let _ = engine.apply_boosts(mon, &Boosts::spe(-1), false);
}

static STICKY_WEB_HOOKS: Hooks = Hooks {
    on_switch_in: Some(sticky_web_switch_in),
    ..Hooks::NONE
};

// ------------------------------------------------------------- toxic spikes

fn toxic_spikes_switch_in(engine: &mut BattleEngine, er: EffectRef, mon: MonRef) {
    if engine.battlefield.mon(mon).is_fainted() {
        return;
    }
    if engine.battlefield.mon(mon).is_immune_to(Immunity::Type(Type::Ground)) {
        return;
    }
    if engine.battlefield.mon(mon).types.contains(&Type::Poison) {
        // grounded poison types soak up the spikes
        engine.remove_effect(er.holder, er.source);
        return;
    }
    let layers = engine.effect(er).map(|e| e.state.layers()).unwrap_or(0);
    let status = if layers >= 2 { Status::Tox } else { Status::Psn };
    let _ = engine.set_status(mon, status, None, false);
}

static TOXIC_SPIKES_HOOKS: Hooks = Hooks {
    on_switch_in: Some(toxic_spikes_switch_in),
    ..Hooks::NONE
};

// ------------------------------------------------------------------ screens

fn reflect_modify_foe_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    foe: MonRef,
    mv: &Move,
    target: MonRef,
    crit: bool,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    if mv.category == MoveCategory::Physical && !crit && !mv.infiltrates && foe != target {
        damage * 0.5
    } else {
        damage
    }
}

fn light_screen_modify_foe_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    foe: MonRef,
    mv: &Move,
    target: MonRef,
    crit: bool,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    if mv.category == MoveCategory::Special && !crit && !mv.infiltrates && foe != target {
        damage * 0.5
    } else {
        damage
    }
}

static REFLECT_HOOKS: Hooks = Hooks {
    on_modify_foe_damage: Some(reflect_modify_foe_damage),
    ..Hooks::NONE
};

static LIGHT_SCREEN_HOOKS: Hooks = Hooks {
    on_modify_foe_damage: Some(light_screen_modify_foe_damage),
    ..Hooks::NONE
};

pub fn reflect(duration: u8) -> Effect {
    side_condition(SideConditionKind::Reflect, &REFLECT_HOOKS).with_duration(duration)
}

pub fn light_screen(duration: u8) -> Effect {
    side_condition(SideConditionKind::LightScreen, &LIGHT_SCREEN_HOOKS).with_duration(duration)
}

// ---------------------------------------------------------------- safeguard

fn safeguard_set_status(
    _engine: &mut BattleEngine,
    _er: EffectRef,
    _status: Status,
    target: MonRef,
    setter: Option<MonRef>,
    infiltrates: bool,
) -> HookResult {
    match setter {
        Some(setter) if setter != target && !infiltrates => Err(Fail),
        _ => Ok(()),
    }
}

static SAFEGUARD_HOOKS: Hooks = Hooks {
    on_set_status: Some(safeguard_set_status),
    ..Hooks::NONE
};

pub fn safeguard(duration: u8) -> Effect {
    side_condition(SideConditionKind::Safeguard, &SAFEGUARD_HOOKS).with_duration(duration)
}

// ----------------------------------------------------------------- tailwind

fn tailwind_modify_spe(_engine: &BattleEngine, _er: EffectRef, _mon: MonRef, spe: u32) -> u32 {
    2 * spe
}

static TAILWIND_HOOKS: Hooks = Hooks {
    on_modify_spe: Some(tailwind_modify_spe),
    ..Hooks::NONE
};

pub fn tailwind() -> Effect {
    side_condition(SideConditionKind::Tailwind, &TAILWIND_HOOKS).with_duration(4)
}

// --------------------------------------------------------------------- wish

fn wish_timeout(engine: &mut BattleEngine, er: EffectRef) {
    let Holder::Side(side) = er.holder else { return };
    let heal = match engine.effect(er) {
        Some(Effect { state: EffectState::PendingHeal(hp), .. }) => *hp,
        _ => return,
    };
    if let Some(active) = engine.battlefield.active_ref(side) {
        let _ = engine.heal(active, heal, Cause::Other, None);
    }
}

static WISH_HOOKS: Hooks = Hooks {
    on_timeout: Some(wish_timeout),
    ..Hooks::NONE
};

/// Heals whatever is active on the side when the countdown lands.
pub fn wish(heal: u16) -> Effect {
    side_condition(SideConditionKind::Wish, &WISH_HOOKS)
        .with_duration(2)
        .with_state(EffectState::PendingHeal(heal.max(1)))
}

// ------------------------------------------------------------- healing wish

fn healing_wish_switch_in(engine: &mut BattleEngine, er: EffectRef, mon: MonRef) {
    if engine.battlefield.mon(mon).is_fainted() {
        return;
    }
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let hp = engine.battlefield.mon(mon).hp;
    let _ = engine.heal(mon, max_hp - hp, Cause::Other, None);
    engine.cure_status(mon);
    engine.remove_effect(er.holder, er.source);
}

static HEALING_WISH_HOOKS: Hooks = Hooks {
    on_switch_in: Some(healing_wish_switch_in),
    on_switch_in_prio: 1,
    ..Hooks::NONE
};

/// Fully restores the next pokemon sent in on this side.
pub fn healing_wish() -> Effect {
    side_condition(SideConditionKind::HealingWish, &HEALING_WISH_HOOKS)
}
