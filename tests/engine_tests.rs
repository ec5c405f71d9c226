//! Engine primitive and invariant tests: mutation primitives, registry
//! semantics, ordering, and determinism.

use pokemon_battle_engine::prelude::*;
use pokemon_battle_engine::sim::conditions::volatiles;
use pokemon_battle_engine::sim::effect::{Cause, DamageSource, Immunity};

fn species(name: &str, types: [Type; 2]) -> SpeciesData {
    SpeciesData {
        name: name.to_string(),
        base_stats: BaseStats { hp: 100, atk: 100, def: 100, spa: 100, spd: 100, spe: 100 },
        types,
        weight: 100.0,
    }
}

fn species_spe(name: &str, types: [Type; 2], spe: u16) -> SpeciesData {
    let mut data = species(name, types);
    data.base_stats.spe = spe;
    data
}

fn tackle() -> Move {
    Move::new("tackle", Type::Normal, MoveCategory::Physical, 50, 56)
}

fn mon(data: SpeciesData, moves: Vec<Move>) -> Pokemon {
    Pokemon::new(data, 100, moves, Ability::none(), None).unwrap()
}

fn engine_1v1() -> BattleEngine {
    let a = mon(species("attacker", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("defender", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 1).unwrap();
    engine.init_battle();
    engine
}

fn active(engine: &BattleEngine, side: usize) -> MonRef {
    engine.battlefield.active_ref(side).unwrap()
}

#[test]
fn test_damage_noop_on_zero_amount() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    let dealt = engine
        .damage(target, 0, Cause::Other, DamageSource::None, None, 0)
        .unwrap();
    assert_eq!(dealt, 0);
    assert_eq!(engine.battlefield.mon(target).hp, 362);
}

#[test]
fn test_damage_faints_at_zero_and_sets_winner() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    let dealt = engine
        .damage(target, 9999, Cause::Other, DamageSource::None, None, 0)
        .unwrap();
    assert_eq!(dealt, 362); // clamped to remaining hp
    assert_eq!(engine.battlefield.mon(target).hp, 0);
    assert_eq!(engine.battlefield.mon(target).status, Some(Status::Fnt));
    // fainted mon is no longer the side's active member
    assert_eq!(engine.battlefield.sides[1].active, None);
    engine.resolve_faint_queue();
    assert_eq!(engine.battlefield.win, Some(0));
}

#[test]
fn test_faint_is_idempotent() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    engine.faint(target, Cause::Other, None);
    let snapshot = format!("{:?}", engine.battlefield.mon(target));
    engine.faint(target, Cause::Other, None);
    assert_eq!(snapshot, format!("{:?}", engine.battlefield.mon(target)));
    engine.resolve_faint_queue();
    assert_eq!(engine.battlefield.win, Some(0));
    // the winner is set once and never changed
    let attacker = active(&engine, 0);
    engine.faint(attacker, Cause::Other, None);
    engine.resolve_faint_queue();
    assert_eq!(engine.battlefield.win, Some(0));
}

#[test]
fn test_damage_on_fainted_is_noop() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    engine.faint(target, Cause::Other, None);
    let dealt = engine
        .damage(target, 50, Cause::Other, DamageSource::None, None, 0)
        .unwrap();
    assert_eq!(dealt, 0);
}

#[test]
fn test_heal_clamps_to_max_and_ignores_fainted() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    engine.battlefield.mon_mut(target).hp = 100;
    engine.heal(target, 9999, Cause::Other, None).unwrap();
    assert_eq!(engine.battlefield.mon(target).hp, 362);

    engine.faint(target, Cause::Other, None);
    engine.heal(target, 50, Cause::Other, None).unwrap();
    assert_eq!(engine.battlefield.mon(target).hp, 0);
}

#[test]
fn test_duplicate_effect_is_rejected_not_replaced() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    let holder = Holder::Mon(target);
    assert!(engine.set_effect(holder, volatiles::substitute(90)).is_ok());
    assert_eq!(engine.set_effect(holder, volatiles::substitute(10)), Err(Fail));
    let stored = engine
        .battlefield
        .mon(target)
        .effects
        .get(EffectSource::Volatile(VolatileKind::Substitute))
        .unwrap()
        .state
        .stored_hp();
    assert_eq!(stored, 90);
}

#[test]
fn test_boosts_clamp_and_report_fail() {
    let mut engine = engine_1v1();
    let target = active(&engine, 0);
    assert!(engine.apply_boosts(target, &Boosts::atk(6), true).is_ok());
    assert_eq!(engine.battlefield.mon(target).boosts.atk, 6);
    // already at +6: nothing changes, so it fails
    assert_eq!(engine.apply_boosts(target, &Boosts::atk(2), true), Err(Fail));
    assert!(engine.apply_boosts(target, &Boosts::atk(-12), true).is_ok());
    assert_eq!(engine.battlefield.mon(target).boosts.atk, -6);
}

#[test]
fn test_set_status_rejects_double_status() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    assert!(engine.set_status(target, Status::Brn, None, false).is_ok());
    assert_eq!(engine.set_status(target, Status::Par, None, false), Err(Fail));
    assert_eq!(engine.battlefield.mon(target).status, Some(Status::Brn));
}

#[test]
fn test_status_type_immunity() {
    let fire = mon(species("torch", [Type::Fire, Type::NoType]), vec![tackle()]);
    let other = mon(species("other", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![fire], vec![other], 3).unwrap();
    engine.init_battle();
    let target = active(&engine, 0);
    assert_eq!(engine.set_status(target, Status::Brn, None, false), Err(Fail));
}

#[test]
fn test_sleep_clause_blocks_second_sleeper() {
    let a = mon(species("lead", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b1 = mon(species("sleeper1", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b2 = mon(species("sleeper2", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b1, b2], 4).unwrap();
    engine.init_battle();
    let first = MonRef { side: 1, slot: 0 };
    let second = MonRef { side: 1, slot: 1 };
    assert!(engine.set_status(first, Status::Slp, None, false).is_ok());
    assert_eq!(engine.set_status(second, Status::Slp, None, false), Err(Fail));
}

#[test]
fn test_toxic_damage_escalates() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    engine.set_status(target, Status::Tox, None, false).unwrap();
    let max_hp = engine.battlefield.mon(target).stats.max_hp;

    engine.run_residual();
    assert_eq!(engine.battlefield.mon(target).hp, max_hp - max_hp / 16);
    engine.run_residual();
    assert_eq!(engine.battlefield.mon(target).hp, max_hp - 3 * (max_hp / 16));
}

#[test]
fn test_burn_ticks_an_eighth_per_residual() {
    let mut engine = engine_1v1();
    let target = active(&engine, 1);
    engine.set_status(target, Status::Brn, None, false).unwrap();
    let max_hp = engine.battlefield.mon(target).stats.max_hp;
    engine.run_residual();
    assert_eq!(engine.battlefield.mon(target).hp, max_hp - max_hp / 8);
}

#[test]
fn test_type_immune_move_fails() {
    let a = mon(
        species("normal", [Type::Normal, Type::NoType]),
        vec![tackle()],
    );
    let b = mon(species("spectre", [Type::Ghost, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 5).unwrap();
    engine.init_battle();
    let user = active(&engine, 0);
    let target = active(&engine, 1);
    assert_eq!(engine.calculate_damage(user, &tackle(), target), Err(Fail));
}

#[test]
fn test_damage_result_is_at_least_one() {
    // pitiful 1 BP move into a wall still does 1 damage
    let weak = Move::new("falseswipe", Type::Fighting, MoveCategory::Physical, 1, 64);
    let a = mon(species("weakling", [Type::Normal, Type::NoType]), vec![weak.clone()]);
    let mut b_species = species("wall", [Type::Normal, Type::NoType]);
    b_species.base_stats.def = 250;
    let b = mon(b_species, vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 6).unwrap();
    engine.init_battle();
    engine.rng.crit_roll = Some(false);
    engine.rng.damage_roll = Some(85);
    let user = active(&engine, 0);
    let target = active(&engine, 1);
    // 0.5x effectiveness of fighting into a ghost would be immune; normal wall is 1x
    let damage = engine.calculate_damage(user, &weak, target).unwrap().unwrap();
    assert!(damage >= 1);
}

#[test]
fn test_effective_speed_paralysis_and_tailwind() {
    let mut engine = engine_1v1();
    let mon0 = active(&engine, 0);
    let base = engine.effective_spe(mon0);
    engine.set_status(mon0, Status::Par, None, false).unwrap();
    assert_eq!(engine.effective_spe(mon0), base / 4);

    engine
        .battlefield
        .sides[0]
        .effects
        .set(pokemon_battle_engine::sim::conditions::side_conditions::tailwind())
        .unwrap();
    assert_eq!(engine.effective_spe(mon0), base / 4 * 2);
}

#[test]
fn test_struggle_when_out_of_pp() {
    let mut engine = engine_1v1();
    let user = active(&engine, 0);
    engine.battlefield.mon_mut(user).moveset[0].pp = 0;
    let choices = engine.get_move_choices(user);
    assert_eq!(choices, vec![Choice::Struggle]);
}

#[test]
fn test_weather_immunity_blocks_sand_chip() {
    let rock = mon(species("boulder", [Type::Rock, Type::NoType]), vec![tackle()]);
    assert!(rock.is_immune_to(Immunity::Weather(WeatherKind::Sandstorm)));
    let soft = mon(species("soft", [Type::Normal, Type::NoType]), vec![tackle()]);
    assert!(!soft.is_immune_to(Immunity::Weather(WeatherKind::Sandstorm)));
}

#[test]
fn test_sandstorm_chips_only_vulnerable_actives() {
    let a = mon(species("boulder", [Type::Rock, Type::NoType]), vec![tackle()]);
    let b = mon(species("soft", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 8).unwrap();
    engine.init_battle();
    engine
        .set_effect(
            Holder::Field,
            pokemon_battle_engine::sim::conditions::weather::weather_effect(WeatherKind::Sandstorm),
        )
        .unwrap();
    let rock = active(&engine, 0);
    let soft = active(&engine, 1);
    let soft_max = engine.battlefield.mon(soft).stats.max_hp;
    engine.run_residual();
    assert_eq!(engine.battlefield.mon(rock).hp, engine.battlefield.mon(rock).stats.max_hp);
    assert_eq!(engine.battlefield.mon(soft).hp, soft_max - soft_max / 16);
}

#[test]
fn test_priority_move_outruns_faster_attacker() {
    let mut quick = Move::new("quickjab", Type::Normal, MoveCategory::Physical, 40, 48);
    quick.priority = 1;
    let slow = mon(species_spe("slowpoke", [Type::Normal, Type::NoType], 20), vec![quick]);
    let fast = mon(species_spe("speedster", [Type::Normal, Type::NoType], 200), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![slow], vec![fast], 9).unwrap();
    engine.init_battle();
    engine.rng.accuracy_roll = Some(true);
    engine.rng.crit_roll = Some(false);
    engine.rng.damage_roll = Some(100);
    // the fast side would KO, but the priority user acts first
    let fast_ref = active(&engine, 1);
    engine.battlefield.mon_mut(fast_ref).hp = 1;
    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let outcome = engine.run_turn(&mut dm0, &mut dm1);
    assert_eq!(outcome, TurnOutcome::Finished { winner: 0 });
    let slow_ref = active(&engine, 0);
    assert_eq!(
        engine.battlefield.mon(slow_ref).hp,
        engine.battlefield.mon(slow_ref).stats.max_hp
    );
}

#[test]
fn test_turn_counter_increments_once_per_turn() {
    let mut engine = engine_1v1();
    engine.rng.accuracy_roll = Some(true);
    engine.rng.crit_roll = Some(false);
    engine.rng.damage_roll = Some(85);
    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0); 3]);
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0); 3]);
    assert_eq!(engine.battlefield.turns, 0);
    for expected in 1..=3 {
        let _ = engine.run_turn(&mut dm0, &mut dm1);
        assert_eq!(engine.battlefield.turns, expected);
    }
}

#[test]
fn test_pp_deducted_once_and_not_refunded_on_miss() {
    let mut engine = engine_1v1();
    engine.rng.accuracy_roll = Some(false); // every move misses
    engine.rng.crit_roll = Some(false);
    let user = active(&engine, 0);
    let pp_before = engine.battlefield.mon(user).pp(0);
    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let _ = engine.run_turn(&mut dm0, &mut dm1);
    assert_eq!(engine.battlefield.mon(user).pp(0), pp_before - 1);
}

#[test]
fn test_determinism_same_seeds_same_states() {
    let build = || {
        let a1 = mon(species("alpha", [Type::Normal, Type::NoType]), vec![tackle()]);
        let a2 = mon(species("beta", [Type::Fire, Type::NoType]), vec![tackle()]);
        let b1 = mon(species("gamma", [Type::Water, Type::NoType]), vec![tackle()]);
        let b2 = mon(species("delta", [Type::Grass, Type::NoType]), vec![tackle()]);
        BattleEngine::new(vec![a1, a2], vec![b1, b2], 42).unwrap()
    };
    let mut left = build();
    let mut right = build();
    let mut left_dm0 = RandomWithSwitches::new(7);
    let mut left_dm1 = RandomWithSwitches::new(8);
    let mut right_dm0 = RandomWithSwitches::new(7);
    let mut right_dm1 = RandomWithSwitches::new(8);

    for _ in 0..30 {
        let left_outcome = left.run_turn(&mut left_dm0, &mut left_dm1);
        let right_outcome = right.run_turn(&mut right_dm0, &mut right_dm1);
        assert_eq!(left_outcome, right_outcome);
        assert_eq!(
            format!("{:?}", left.battlefield),
            format!("{:?}", right.battlefield)
        );
        if left_outcome != TurnOutcome::Completed {
            break;
        }
    }
}

#[test]
fn test_clone_branches_independently() {
    let mut engine = engine_1v1();
    let mut branch = engine.clone();
    let target = active(&branch, 1);
    branch
        .damage(target, 100, Cause::Other, DamageSource::None, None, 0)
        .unwrap();
    assert_eq!(branch.battlefield.mon(target).hp, 262);
    assert_eq!(engine.battlefield.mon(target).hp, 362);
}

#[test]
fn test_baton_pass_transfers_boosts_and_substitute() {
    let a1 = mon(species("passer", [Type::Normal, Type::NoType]), vec![tackle()]);
    let a2 = mon(species("receiver", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("watcher", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a1, a2], vec![b], 11).unwrap();
    engine.init_battle();
    let passer = active(&engine, 0);
    engine.apply_boosts(passer, &Boosts::atk(2), true).unwrap();
    engine.set_effect(Holder::Mon(passer), volatiles::substitute(90)).unwrap();
    engine
        .set_effect(Holder::Mon(passer), volatiles::baton_pass())
        .unwrap();

    engine.run_switch(Some(passer), MonRef { side: 0, slot: 1 });
    let receiver = active(&engine, 0);
    assert_eq!(receiver.slot, 1);
    assert_eq!(engine.battlefield.mon(receiver).boosts.atk, 2);
    assert!(engine.battlefield.mon(receiver).has_volatile(VolatileKind::Substitute));
    // the marker itself does not transfer, and the passer is cleaned out
    assert!(!engine.battlefield.mon(receiver).has_volatile(VolatileKind::BatonPass));
    let benched = MonRef { side: 0, slot: 0 };
    assert!(engine.battlefield.mon(benched).effects.is_empty());
    assert_eq!(engine.battlefield.mon(benched).boosts.atk, 0);
}

#[test]
fn test_switch_out_without_baton_pass_clears_everything() {
    let a1 = mon(species("out", [Type::Normal, Type::NoType]), vec![tackle()]);
    let a2 = mon(species("in", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("watcher", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a1, a2], vec![b], 12).unwrap();
    engine.init_battle();
    let outgoing = active(&engine, 0);
    engine.apply_boosts(outgoing, &Boosts::atk(3), true).unwrap();
    engine.set_effect(Holder::Mon(outgoing), volatiles::substitute(90)).unwrap();

    engine.run_switch(Some(outgoing), MonRef { side: 0, slot: 1 });
    let incoming = active(&engine, 0);
    assert_eq!(engine.battlefield.mon(incoming).boosts.atk, 0);
    assert!(!engine.battlefield.mon(incoming).has_volatile(VolatileKind::Substitute));
    let benched = MonRef { side: 0, slot: 0 };
    assert_eq!(engine.battlefield.mon(benched).boosts.atk, 0);
}
