//! The major status ailments as effects. Attached by the engine's
//! `set_status` primitive and re-attached on switch-in.

use crate::data::moves::{Move, MoveCategory, FLAG_THAWS_TARGET, FLAG_THAWS_USER};
use crate::sim::effect::{
    Cause, DamageSource, Effect, EffectRef, EffectSource, EffectState, Fail, Hooks, HookResult,
    MonRef,
};
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::Status;

/// The effect matching a major status.
pub fn status_effect(status: Status) -> Effect {
    let hooks: &'static Hooks = match status {
        Status::Brn => &BURN_HOOKS,
        Status::Frz => &FREEZE_HOOKS,
        Status::Par => &PARALYZE_HOOKS,
        Status::Psn => &POISON_HOOKS,
        Status::Slp => &SLEEP_HOOKS,
        Status::Tox => &TOXIC_HOOKS,
        Status::Fnt => unreachable!("fainting is not an attachable effect"),
    };
    let effect = Effect::new(EffectSource::Status(status), hooks);
    match status {
        Status::Tox => effect.with_state(EffectState::Stage(0)),
        _ => effect,
    }
}

fn residual_chip(engine: &mut BattleEngine, er: EffectRef, mon: Option<MonRef>, divisor: u16) {
    let Some(mon) = mon else { return };
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let _ = engine.damage(
        mon,
        (max_hp / divisor).max(1),
        Cause::Residual,
        DamageSource::Effect(er.source),
        None,
        0,
    );
}

// ---------------------------------------------------------------- paralysis

fn par_modify_spe(engine: &BattleEngine, _er: EffectRef, mon: MonRef, spe: u32) -> u32 {
    if engine.battlefield.mon(mon).ability.name != "quickfeet" {
        spe / 4
    } else {
        spe
    }
}

fn par_before_move(engine: &mut BattleEngine, _er: EffectRef, user: MonRef, _mv: &Move) -> HookResult {
    if engine.rng.one_in(4) {
        engine.log_cant(user, "par");
        return Err(Fail);
    }
    Ok(())
}

static PARALYZE_HOOKS: Hooks = Hooks {
    on_modify_spe: Some(par_modify_spe),
    on_before_move: Some(par_before_move),
    on_before_move_prio: 1,
    ..Hooks::NONE
};

// ------------------------------------------------------------------- freeze

fn frz_before_move(engine: &mut BattleEngine, _er: EffectRef, user: MonRef, mv: &Move) -> HookResult {
    debug_assert_eq!(engine.battlefield.mon(user).status, Some(Status::Frz));
    if engine.rng.one_in(5) || mv.has_flag(FLAG_THAWS_USER) {
        engine.cure_status(user);
        Ok(())
    } else {
        engine.log_cant(user, "frz");
        Err(Fail)
    }
}

fn frz_after_foe_hit(engine: &mut BattleEngine, _er: EffectRef, _foe: MonRef, mv: &Move, target: MonRef) {
    if mv.typ == crate::data::types::Type::Fire || mv.has_flag(FLAG_THAWS_TARGET) {
        engine.cure_status(target);
    }
}

static FREEZE_HOOKS: Hooks = Hooks {
    on_before_move: Some(frz_before_move),
    on_before_move_prio: 10,
    on_after_foe_hit: Some(frz_after_foe_hit),
    ..Hooks::NONE
};

// -------------------------------------------------------------------- sleep

fn slp_before_move(engine: &mut BattleEngine, _er: EffectRef, user: MonRef, _mv: &Move) -> HookResult {
    debug_assert_eq!(engine.battlefield.mon(user).status, Some(Status::Slp));
    let resting = engine.battlefield.mon(user).is_resting;
    let turns_slept = engine.battlefield.mon(user).turns_slept.unwrap_or(0);

    // wakes before moving, not between turns
    let wakes = if resting {
        turns_slept >= 2
    } else {
        turns_slept >= 3
            || (turns_slept == 2 && engine.rng.one_in(2))
            || (turns_slept == 1 && engine.rng.one_in(3))
    };
    if wakes {
        engine.cure_status(user);
        return Ok(());
    }

    engine.battlefield.mon_mut(user).turns_slept = Some(turns_slept + 1);
    engine.log_cant(user, "slp");
    Err(Fail)
}

static SLEEP_HOOKS: Hooks = Hooks {
    on_before_move: Some(slp_before_move),
    on_before_move_prio: 10,
    ..Hooks::NONE
};

// --------------------------------------------------------------------- burn

fn brn_modify_damage(
    engine: &BattleEngine,
    _er: EffectRef,
    user: MonRef,
    mv: &Move,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    if mv.category == MoveCategory::Physical
        && mv.name != "facade"
        && engine.battlefield.mon(user).ability.name != "guts"
    {
        damage * 0.5
    } else {
        damage
    }
}

fn brn_residual(engine: &mut BattleEngine, er: EffectRef, mon: Option<MonRef>, _foe: Option<MonRef>) {
    residual_chip(engine, er, mon, 8);
}

static BURN_HOOKS: Hooks = Hooks {
    on_modify_damage: Some(brn_modify_damage),
    on_residual: Some(brn_residual),
    on_residual_prio: -9,
    ..Hooks::NONE
};

// ------------------------------------------------------------------- poison

fn psn_residual(engine: &mut BattleEngine, er: EffectRef, mon: Option<MonRef>, _foe: Option<MonRef>) {
    residual_chip(engine, er, mon, 8);
}

static POISON_HOOKS: Hooks = Hooks {
    on_residual: Some(psn_residual),
    on_residual_prio: -9,
    ..Hooks::NONE
};

// -------------------------------------------------------------------- toxic

fn tox_residual(engine: &mut BattleEngine, er: EffectRef, mon: Option<MonRef>, _foe: Option<MonRef>) {
    let Some(mon) = mon else { return };
    let stage = {
        let Some(effect) = engine.effect_mut(er) else { return };
        let stage = effect.state.stage().saturating_add(1);
        effect.state = EffectState::Stage(stage);
        stage
    };
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let amount = ((max_hp / 16) as u32 * stage as u32).max(1) as u16;
    let _ = engine.damage(mon, amount, Cause::Residual, DamageSource::Effect(er.source), None, 0);
}

static TOXIC_HOOKS: Hooks = Hooks {
    on_residual: Some(tox_residual),
    on_residual_prio: -9,
    ..Hooks::NONE
};
