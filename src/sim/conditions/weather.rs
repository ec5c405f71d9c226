//! Weathers and pseudo-weathers. The three trio weathers carry no duration
//! and only end via another trio weather or an explicit clear; the ordinary
//! four run on the standard countdown (5 turns, or 8 from extension items).

use crate::data::moves::{Move, MoveCategory};
use crate::data::types::{effectiveness_against, Type};
use crate::sim::effect::{
    Cause, DamageSource, Effect, EffectRef, EffectSource, Fail, Hooks, HookResult, Immunity,
    MonRef, PseudoWeatherKind, WeatherKind,
};
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::Status;

pub const DEFAULT_WEATHER_DURATION: u8 = 5;

/// Build the effect for a weather. Trio weathers get no duration.
pub fn weather_effect(kind: WeatherKind) -> Effect {
    let effect = Effect::new(EffectSource::Weather(kind), weather_hooks(kind));
    if kind.is_trio() {
        effect
    } else {
        effect.with_duration(DEFAULT_WEATHER_DURATION)
    }
}

pub fn weather_effect_with_duration(kind: WeatherKind, duration: u8) -> Effect {
    debug_assert!(!kind.is_trio());
    Effect::new(EffectSource::Weather(kind), weather_hooks(kind)).with_duration(duration)
}

fn weather_hooks(kind: WeatherKind) -> &'static Hooks {
    match kind {
        WeatherKind::SunnyDay => &SUN_HOOKS,
        WeatherKind::DesolateLand => &DESOLATE_LAND_HOOKS,
        WeatherKind::RainDance => &RAIN_HOOKS,
        WeatherKind::PrimordialSea => &PRIMORDIAL_SEA_HOOKS,
        WeatherKind::Sandstorm => &SANDSTORM_HOOKS,
        WeatherKind::Hail => &HAIL_HOOKS,
        WeatherKind::DeltaStream => &DELTA_STREAM_HOOKS,
    }
}

/// Shared residual: let every active's effects react to the weather.
fn dispatch_on_weather(engine: &mut BattleEngine, kind: WeatherKind, actives: [Option<MonRef>; 2]) {
    for mon in actives.into_iter().flatten() {
        for source in engine.battlefield.mon(mon).effects.sources() {
            let er = EffectRef { holder: crate::sim::effect::Holder::Mon(mon), source };
            let Some(handler) = engine.effect(er).and_then(|e| e.hooks.on_weather) else {
                continue;
            };
            handler(engine, er, mon, kind);
        }
    }
}

fn weather_chip(engine: &mut BattleEngine, kind: WeatherKind, actives: [Option<MonRef>; 2]) {
    for mon in actives.into_iter().flatten() {
        if engine.battlefield.mon(mon).is_fainted() {
            continue;
        }
        let max_hp = engine.battlefield.mon(mon).stats.max_hp;
        let _ = engine.damage(
            mon,
            (max_hp / 16).max(1),
            Cause::Weather,
            DamageSource::Weather(kind),
            None,
            0,
        );
    }
}

// ---------------------------------------------------------------- sun / rain

fn sun_modify_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    match mv.typ {
        Type::Fire => damage * 1.5,
        Type::Water => damage * 0.5,
        _ => damage,
    }
}

fn sun_set_status(
    _engine: &mut BattleEngine,
    _er: EffectRef,
    status: Status,
    _target: MonRef,
    _setter: Option<MonRef>,
    _infiltrates: bool,
) -> HookResult {
    // nothing freezes under harsh sunlight
    if status == Status::Frz {
        return Err(Fail);
    }
    Ok(())
}

fn sun_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::SunnyDay, [p0, p1]);
}

static SUN_HOOKS: Hooks = Hooks {
    on_modify_damage: Some(sun_modify_damage),
    on_set_status: Some(sun_set_status),
    on_residual: Some(sun_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

fn desolate_modify_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    if mv.typ == Type::Fire {
        damage * 1.5
    } else {
        damage
    }
}

fn desolate_try_hit(
    _engine: &mut BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _target: MonRef,
) -> HookResult {
    // water moves evaporate
    if mv.category != MoveCategory::Status && mv.typ == Type::Water {
        return Err(Fail);
    }
    Ok(())
}

fn desolate_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::DesolateLand, [p0, p1]);
}

static DESOLATE_LAND_HOOKS: Hooks = Hooks {
    on_modify_damage: Some(desolate_modify_damage),
    on_set_status: Some(sun_set_status),
    on_try_hit: Some(desolate_try_hit),
    on_residual: Some(desolate_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

fn rain_modify_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    match mv.typ {
        Type::Water => damage * 1.5,
        Type::Fire => damage * 0.5,
        _ => damage,
    }
}

fn rain_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::RainDance, [p0, p1]);
}

static RAIN_HOOKS: Hooks = Hooks {
    on_modify_damage: Some(rain_modify_damage),
    on_residual: Some(rain_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

fn primordial_modify_damage(
    _engine: &BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _effectiveness: f32,
    damage: f64,
) -> f64 {
    if mv.typ == Type::Water {
        damage * 1.5
    } else {
        damage
    }
}

fn primordial_try_hit(
    _engine: &mut BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    mv: &Move,
    _target: MonRef,
) -> HookResult {
    // fire moves fizzle out
    if mv.category != MoveCategory::Status && mv.typ == Type::Fire {
        return Err(Fail);
    }
    Ok(())
}

fn primordial_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::PrimordialSea, [p0, p1]);
}

static PRIMORDIAL_SEA_HOOKS: Hooks = Hooks {
    on_modify_damage: Some(primordial_modify_damage),
    on_try_hit: Some(primordial_try_hit),
    on_residual: Some(primordial_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

// ------------------------------------------------------------- sand / hail

fn sandstorm_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::Sandstorm, [p0, p1]);
    let chip: Vec<Option<MonRef>> = [p0, p1]
        .into_iter()
        .map(|mon| {
            mon.filter(|&m| {
                !engine.battlefield.mon(m).is_immune_to(Immunity::Weather(WeatherKind::Sandstorm))
            })
        })
        .collect();
    weather_chip(engine, WeatherKind::Sandstorm, [chip[0], chip[1]]);
}

fn sandstorm_modify_spd(
    engine: &BattleEngine,
    _er: EffectRef,
    mon: MonRef,
    _mv: &Move,
    spd: u32,
) -> u32 {
    if engine.battlefield.mon(mon).types.contains(&Type::Rock) {
        spd * 3 / 2
    } else {
        spd
    }
}

static SANDSTORM_HOOKS: Hooks = Hooks {
    on_residual: Some(sandstorm_residual),
    on_residual_prio: -1,
    on_modify_spd: Some(sandstorm_modify_spd),
    ..Hooks::NONE
};

fn hail_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::Hail, [p0, p1]);
    let chip: Vec<Option<MonRef>> = [p0, p1]
        .into_iter()
        .map(|mon| {
            mon.filter(|&m| {
                !engine.battlefield.mon(m).is_immune_to(Immunity::Weather(WeatherKind::Hail))
            })
        })
        .collect();
    weather_chip(engine, WeatherKind::Hail, [chip[0], chip[1]]);
}

static HAIL_HOOKS: Hooks = Hooks {
    on_residual: Some(hail_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

// ------------------------------------------------------------- delta stream

fn delta_stream_modify_effectiveness(
    engine: &BattleEngine,
    _er: EffectRef,
    _user: MonRef,
    move_type: Type,
    target: MonRef,
    effectiveness: f32,
) -> f32 {
    let target_types = engine.battlefield.mon(target).types;
    if target_types.contains(&Type::Flying) && effectiveness_against(move_type, Type::Flying) == 2.0 {
        effectiveness * 0.5
    } else {
        effectiveness
    }
}

fn delta_stream_residual(engine: &mut BattleEngine, _er: EffectRef, p0: Option<MonRef>, p1: Option<MonRef>) {
    dispatch_on_weather(engine, WeatherKind::DeltaStream, [p0, p1]);
}

static DELTA_STREAM_HOOKS: Hooks = Hooks {
    on_modify_effectiveness: Some(delta_stream_modify_effectiveness),
    on_residual: Some(delta_stream_residual),
    on_residual_prio: -1,
    ..Hooks::NONE
};

// --------------------------------------------------------------- trick room

/// Inverts the speed component of move ordering while attached. The engine
/// consults it when building event keys.
pub fn trick_room() -> Effect {
    Effect::new(EffectSource::PseudoWeather(PseudoWeatherKind::TrickRoom), &Hooks::NONE)
        .with_duration(5)
}
