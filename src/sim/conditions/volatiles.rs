//! Volatile conditions: transient per-pokemon effects cleared on switch-out.

use crate::data::moves::Move;
use crate::sim::effect::{
    Cause, DamageSource, Effect, EffectRef, EffectSource, EffectState, Fail, Hooks, HookResult,
    MonRef, SubstituteHit, VolatileKind,
};
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::Status;

fn volatile(kind: VolatileKind, hooks: &'static Hooks) -> Effect {
    Effect::new(EffectSource::Volatile(kind), hooks)
}

/// Volatiles carried along by a baton pass. Everything else clears with the
/// outgoing pokemon.
pub fn baton_passes(kind: VolatileKind) -> bool {
    matches!(
        kind,
        VolatileKind::Confuse
            | VolatileKind::LeechSeed
            | VolatileKind::PerishSong
            | VolatileKind::Substitute
    )
}

// ------------------------------------------------------------------- flinch

fn flinch_before_move(engine: &mut BattleEngine, _er: EffectRef, user: MonRef, _mv: &Move) -> HookResult {
    engine.log_cant(user, "flinch");
    Err(Fail)
}

static FLINCH_HOOKS: Hooks = Hooks {
    on_before_move: Some(flinch_before_move),
    on_before_move_prio: 8,
    ..Hooks::NONE
};

/// Lasts through exactly one residual sweep: blocks one move, gone next turn.
pub fn flinch() -> Effect {
    volatile(VolatileKind::Flinch, &FLINCH_HOOKS).with_duration(1)
}

// ---------------------------------------------------------------- confusion

fn confuse_before_move(engine: &mut BattleEngine, er: EffectRef, user: MonRef, _mv: &Move) -> HookResult {
    let turns_left = match engine.effect(er) {
        Some(effect) => effect.state.turns(),
        None => return Ok(()),
    };
    if turns_left == 0 {
        engine.remove_effect(er.holder, er.source);
        return Ok(());
    }
    if let Some(effect) = engine.effect_mut(er) {
        effect.state = EffectState::Turns(turns_left - 1);
    }
    if engine.rng.one_in(2) {
        engine.confusion_hit(user);
        return Err(Fail);
    }
    Ok(())
}

static CONFUSE_HOOKS: Hooks = Hooks {
    on_before_move: Some(confuse_before_move),
    on_before_move_prio: 3,
    ..Hooks::NONE
};

/// Confusion runs 1-4 move attempts; the counter is checked at before-move
/// time, not between turns.
pub fn confuse(turns: u8) -> Effect {
    volatile(VolatileKind::Confuse, &CONFUSE_HOOKS).with_state(EffectState::Turns(turns))
}

// --------------------------------------------------------------- substitute

fn substitute_on_hit(
    engine: &mut BattleEngine,
    er: EffectRef,
    foe: MonRef,
    mv: &Move,
    target: MonRef,
) -> SubstituteHit {
    if mv.is_sound() || mv.ignore_substitute || mv.infiltrates || foe == target {
        return SubstituteHit::Bypassed;
    }

    let damage = match engine.calculate_damage(foe, mv, target) {
        Err(Fail) => return SubstituteHit::Failed,
        Ok(None) => return SubstituteHit::Absorbed,
        Ok(Some(damage)) => damage,
    };

    let stored = engine.effect(er).map(|e| e.state.stored_hp()).unwrap_or(0);
    let dealt = damage.min(stored);
    let remaining = stored - dealt;
    if let Some(effect) = engine.effect_mut(er) {
        effect.state = EffectState::StoredHp(remaining);
    }
    if remaining == 0 {
        engine.remove_effect(er.holder, er.source);
        engine.log_end(target, "Substitute");
    }

    // the reduced post-hit subset, so move_hit can exit fast
    if let Some(boosts) = mv.user_boosts {
        let _ = engine.apply_boosts(foe, &boosts, true);
    } else if mv.recoil > 0 {
        let recoil = crate::data::moves::recoil_damage(dealt, mv.recoil);
        let _ = engine.damage(foe, recoil, Cause::Recoil, DamageSource::Move(mv), None, 0);
    } else if mv.drain > 0 {
        let heal = ((dealt as f64 * mv.drain as f64 / 100.0).ceil()) as u16;
        let _ = engine.heal(foe, heal, Cause::Drain, Some(target));
    }

    for s_effect in &mv.secondary_effects {
        if s_effect.affects_user {
            engine.apply_secondary_effect(foe, s_effect, foe);
        }
    }

    engine.battlefield.mon_mut(foe).damage_done_this_turn = dealt;
    engine.battlefield.mon_mut(foe).must_switch = mv.switch_user;
    engine.battlefield.mon_mut(target).was_attacked_this_turn =
        Some(crate::sim::pokemon::AttackRecord { move_name: mv.name.clone(), damage: 0 });

    SubstituteHit::Absorbed
}

static SUBSTITUTE_HOOKS: Hooks = Hooks {
    on_hit_substitute: Some(substitute_on_hit),
    ..Hooks::NONE
};

/// A substitute storing `hp` (normally ¼ of the maker's max HP).
pub fn substitute(hp: u16) -> Effect {
    volatile(VolatileKind::Substitute, &SUBSTITUTE_HOOKS).with_state(EffectState::StoredHp(hp))
}

// --------------------------------------------------------------- baton pass

/// Marker read by the switch-out primitive: transfers boosts and the
/// baton-passable volatiles to the incoming pokemon.
pub fn baton_pass() -> Effect {
    volatile(VolatileKind::BatonPass, &Hooks::NONE)
}

// ------------------------------------------------------------------ protect

fn protect_foe_try_hit(
    _engine: &mut BattleEngine,
    _er: EffectRef,
    _foe: MonRef,
    mv: &Move,
    _target: MonRef,
) -> HookResult {
    if !mv.is_protectable() {
        return Ok(());
    }
    Err(Fail)
}

static PROTECT_HOOKS: Hooks = Hooks {
    on_foe_try_hit: Some(protect_foe_try_hit),
    on_foe_try_hit_prio: 3,
    ..Hooks::NONE
};

pub fn protect() -> Effect {
    volatile(VolatileKind::Protect, &PROTECT_HOOKS).with_duration(1)
}

// -------------------------------------------------------------------- taunt

fn taunt_move_choices(
    engine: &mut BattleEngine,
    _er: EffectRef,
    mon: MonRef,
    choices: Vec<crate::sim::effect::Choice>,
) -> Vec<crate::sim::effect::Choice> {
    use crate::data::moves::MoveCategory;
    use crate::sim::effect::Choice;
    choices
        .into_iter()
        .filter(|choice| match choice {
            Choice::Move(slot) => {
                engine.battlefield.mon(mon).moveset[*slot].mv.category != MoveCategory::Status
            }
            _ => true,
        })
        .collect()
}

static TAUNT_HOOKS: Hooks = Hooks {
    on_get_move_choices: Some(taunt_move_choices),
    ..Hooks::NONE
};

pub fn taunt(duration: u8) -> Effect {
    volatile(VolatileKind::Taunt, &TAUNT_HOOKS).with_duration(duration)
}

// -------------------------------------------------------- choice/locked moves

fn locked_move_choices(
    engine: &mut BattleEngine,
    er: EffectRef,
    mon: MonRef,
    choices: Vec<crate::sim::effect::Choice>,
) -> Vec<crate::sim::effect::Choice> {
    use crate::sim::effect::Choice;
    let locked = match engine.effect(er) {
        Some(Effect { state: EffectState::LockedMove(name), .. }) => name.clone(),
        _ => return choices,
    };
    let slot = engine
        .battlefield
        .mon(mon)
        .moveset
        .iter()
        .position(|s| s.mv.name == locked);
    match slot {
        Some(slot) => choices
            .into_iter()
            .filter(|choice| matches!(choice, Choice::Move(s) if *s == slot))
            .collect(),
        None => {
            // the remembered move is gone; drop the lock
            engine.remove_effect(er.holder, er.source);
            choices
        }
    }
}

static CHOICE_LOCK_HOOKS: Hooks = Hooks {
    on_get_move_choices: Some(locked_move_choices),
    ..Hooks::NONE
};

/// Choice-item style lock to the first move used.
pub fn choice_lock(move_name: &str) -> Effect {
    volatile(VolatileKind::ChoiceLock, &CHOICE_LOCK_HOOKS)
        .with_state(EffectState::LockedMove(move_name.to_string()))
}

/// Rampage lock (outrage style): same choice filtering, and the engine skips
/// PP deduction while it is attached.
pub fn locked_move(move_name: &str, turns: u8) -> Effect {
    volatile(VolatileKind::LockedMove, &CHOICE_LOCK_HOOKS)
        .with_state(EffectState::LockedMove(move_name.to_string()))
        .with_duration(turns)
}

// ------------------------------------------------------------------ trapped

fn trapped_trap_check(_engine: &BattleEngine, _er: EffectRef, _mon: MonRef) -> bool {
    true
}

static TRAPPED_HOOKS: Hooks = Hooks {
    on_trap_check: Some(trapped_trap_check),
    ..Hooks::NONE
};

pub fn trapped() -> Effect {
    volatile(VolatileKind::Trapped, &TRAPPED_HOOKS)
}

// -------------------------------------------------------------- perish song

fn perish_timeout(engine: &mut BattleEngine, er: EffectRef) {
    if let crate::sim::effect::Holder::Mon(mon) = er.holder {
        engine.faint(mon, Cause::Direct, None);
    }
}

static PERISH_SONG_HOOKS: Hooks = Hooks {
    on_timeout: Some(perish_timeout),
    ..Hooks::NONE
};

/// Faints the holder when the count runs out (3 residuals after the turn the
/// song was heard).
pub fn perish_song() -> Effect {
    volatile(VolatileKind::PerishSong, &PERISH_SONG_HOOKS).with_duration(4)
}

// --------------------------------------------------------------- leech seed

fn leech_seed_residual(
    engine: &mut BattleEngine,
    er: EffectRef,
    mon: Option<MonRef>,
    foe: Option<MonRef>,
) {
    let Some(mon) = mon else { return };
    let Some(foe) = foe else { return };
    if engine.battlefield.mon(foe).is_fainted() {
        return;
    }
    let max_hp = engine.battlefield.mon(mon).stats.max_hp;
    let _ = engine.damage(
        mon,
        (max_hp / 8).max(1),
        Cause::Residual,
        DamageSource::Effect(er.source),
        Some(foe),
        100,
    );
}

static LEECH_SEED_HOOKS: Hooks = Hooks {
    on_residual: Some(leech_seed_residual),
    on_residual_prio: -8,
    ..Hooks::NONE
};

pub fn leech_seed() -> Effect {
    volatile(VolatileKind::LeechSeed, &LEECH_SEED_HOOKS)
}

// ------------------------------------------------------------- destiny bond

fn destiny_bond_before_move(
    engine: &mut BattleEngine,
    er: EffectRef,
    _user: MonRef,
    _mv: &Move,
) -> HookResult {
    // wears off as soon as the holder acts again
    engine.remove_effect(er.holder, er.source);
    Ok(())
}

fn destiny_bond_faint(engine: &mut BattleEngine, _er: EffectRef, mon: MonRef, cause: Cause) {
    if cause == Cause::Move {
        if let Some(foe) = engine.foe_of(mon) {
            engine.faint(foe, Cause::Direct, None);
        }
    }
}

static DESTINY_BOND_HOOKS: Hooks = Hooks {
    on_before_move: Some(destiny_bond_before_move),
    on_before_move_prio: 100,
    on_faint: Some(destiny_bond_faint),
    ..Hooks::NONE
};

pub fn destiny_bond() -> Effect {
    volatile(VolatileKind::DestinyBond, &DESTINY_BOND_HOOKS)
}

// --------------------------------------------------------------- two-turn / yawn

/// Marker for the invulnerable half of a two-turn move; dropped when the
/// before-move gate fails.
pub fn two_turn_move() -> Effect {
    volatile(VolatileKind::TwoTurnMove, &Hooks::NONE)
}

fn yawn_timeout(engine: &mut BattleEngine, er: EffectRef) {
    if let crate::sim::effect::Holder::Mon(mon) = er.holder {
        if !engine.battlefield.mon(mon).is_fainted() {
            let _ = engine.set_status(mon, Status::Slp, None, false);
        }
    }
}

static YAWN_HOOKS: Hooks = Hooks {
    on_timeout: Some(yawn_timeout),
    ..Hooks::NONE
};

pub fn yawn() -> Effect {
    volatile(VolatileKind::Yawn, &YAWN_HOOKS).with_duration(2)
}

/// Marker negating secondary-effect hooks on the user's own moves.
pub fn sheer_force() -> Effect {
    volatile(VolatileKind::SheerForce, &Hooks::NONE)
}
