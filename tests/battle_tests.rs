//! Scenario tests for the full turn pipeline: documented damage values,
//! flinch, entry hazards, substitutes, permanent weather, and mid-turn
//! forced switches.

use pokemon_battle_engine::prelude::*;
use pokemon_battle_engine::sim::conditions::{side_conditions, volatiles, weather};
use pokemon_battle_engine::sim::effect::Fail;

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

fn fix_rolls(engine: &mut BattleEngine) {
    engine.rng.accuracy_roll = Some(true);
    engine.rng.crit_roll = Some(false);
    engine.rng.damage_roll = Some(100);
}

fn active(engine: &BattleEngine, side: usize) -> MonRef {
    engine.battlefield.active_ref(side).unwrap()
}

/// Equal-level attacker and defender, no items/abilities/
/// status, 102-power same-type physical move, neutral defender, crits off,
/// randomizer pinned at 100%.
///
/// Level 100, base-100 stats, default 85/31 spread: atk = def = 257.
/// ((2*100/5 + 2) * 102 * 257 / 257) / 50 + 2 = 87, then STAB: 87*1.5 = 130.
#[test]
fn test_documented_damage_value() {
    let strong = Move::new("megatackle", Type::Normal, MoveCategory::Physical, 102, 16);
    let a = mon(species("attacker", [Type::Normal, Type::NoType]), vec![strong.clone()]);
    let b = mon(species("defender", [Type::Psychic, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 1).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let damage = engine
        .calculate_damage(active(&engine, 0), &strong, active(&engine, 1))
        .unwrap()
        .unwrap();
    assert_eq!(damage, 130);

    // 85% roll for the same attack: 87*85/100 = 73, then STAB: 109
    engine.rng.damage_roll = Some(85);
    let min_damage = engine
        .calculate_damage(active(&engine, 0), &strong, active(&engine, 1))
        .unwrap()
        .unwrap();
    assert_eq!(min_damage, 109);
}

/// A one-turn flinch skips exactly one move and is gone the
/// next turn.
#[test]
fn test_flinch_skips_exactly_one_move() {
    let mut fang = tackle();
    fang.name = "flinchfang".to_string();
    fang.secondary_effects = vec![SecondaryEffect::volatile(100, VolatileKind::Flinch)];
    let fast = mon(species_spe("biter", [Type::Normal, Type::NoType], 130), vec![fang]);
    let slow = mon(species_spe("victim", [Type::Normal, Type::NoType], 30), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![fast], vec![slow], 2).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);
    engine.rng.secondary_roll = Some(true);

    let biter = active(&engine, 0);
    let max_hp = engine.battlefield.mon(biter).stats.max_hp;

    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0); 2]);
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0); 2]);

    // turn 1: the victim flinches and does not move
    let _ = engine.run_turn(&mut dm0, &mut dm1);
    assert_eq!(engine.battlefield.mon(biter).hp, max_hp);
    // the flinch was consumed by the residual sweep
    let victim = active(&engine, 1);
    assert!(!engine.battlefield.mon(victim).has_volatile(VolatileKind::Flinch));

    // turn 2: it flinches again only after moving? No: the fast biter acts
    // first every turn, so the victim flinches every turn it is slower.
    // Disable the secondary to see it act.
    engine.rng.secondary_roll = Some(false);
    let _ = engine.run_turn(&mut dm0, &mut dm1);
    assert!(engine.battlefield.mon(biter).hp < max_hp);
}

/// Three spikes layers deal exactly 1/4 max HP to a grounded
/// entrant; a flying entrant takes nothing.
#[test]
fn test_three_spikes_layers_quarter_hp() {
    let a = mon(species("setter", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b1 = mon(species("lead", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b2 = mon(species("grounded", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b3 = mon(species("bird", [Type::Flying, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b1, b2, b3], 3).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    for _ in 0..3 {
        side_conditions::add_hazard(&mut engine.battlefield.sides[1].effects, HazardKind::Spikes)
            .unwrap();
    }
    // a fourth layer is rejected
    assert_eq!(
        side_conditions::add_hazard(&mut engine.battlefield.sides[1].effects, HazardKind::Spikes),
        Err(Fail)
    );

    let lead = active(&engine, 1);
    engine.run_switch(Some(lead), MonRef { side: 1, slot: 1 });
    let grounded = MonRef { side: 1, slot: 1 };
    engine.post_switch_in(grounded);
    let max_hp = engine.battlefield.mon(grounded).stats.max_hp;
    assert_eq!(engine.battlefield.mon(grounded).hp, max_hp - max_hp / 4);

    engine.run_switch(Some(grounded), MonRef { side: 1, slot: 2 });
    let bird = MonRef { side: 1, slot: 2 };
    engine.post_switch_in(bird);
    assert_eq!(engine.battlefield.mon(bird).hp, engine.battlefield.mon(bird).stats.max_hp);
}

#[test]
fn test_stealth_rock_scales_with_rock_weakness() {
    let a = mon(species("setter", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b1 = mon(species("lead", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b2 = mon(species("moth", [Type::Fire, Type::Flying]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b1, b2], 4).unwrap();
    engine.init_battle();

    side_conditions::add_hazard(&mut engine.battlefield.sides[1].effects, HazardKind::StealthRock)
        .unwrap();
    let lead = active(&engine, 1);
    engine.run_switch(Some(lead), MonRef { side: 1, slot: 1 });
    let moth = MonRef { side: 1, slot: 1 };
    engine.post_switch_in(moth);
    // 4x rock weakness: half of max HP on entry
    let max_hp = engine.battlefield.mon(moth).stats.max_hp;
    assert_eq!(engine.battlefield.mon(moth).hp, max_hp - max_hp / 2);
}

/// A 1/4-max-HP substitute absorbs hits until its stored HP
/// runs out, then later hits reach the real pokemon.
#[test]
fn test_substitute_absorbs_then_pops() {
    let a = mon(species("attacker", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("subber", [Type::Psychic, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 5).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let attacker = active(&engine, 0);
    let subber = active(&engine, 1);
    let max_hp = engine.battlefield.mon(subber).stats.max_hp;
    engine
        .set_effect(Holder::Mon(subber), volatiles::substitute(max_hp / 4))
        .unwrap();

    // tackle at 100%: ((42 * 50 * 257 / 257) / 50 + 2) = 44; no STAB vs
    // psychic? attacker is normal, tackle is normal: STAB 66
    let mv = tackle();
    let _ = engine.use_move(attacker, &mv, Some(subber));
    assert_eq!(engine.battlefield.mon(subber).hp, max_hp);
    let stored = engine
        .battlefield
        .mon(subber)
        .effects
        .get(EffectSource::Volatile(VolatileKind::Substitute))
        .unwrap()
        .state
        .stored_hp();
    assert_eq!(stored, max_hp / 4 - 66);

    // second hit pops it (90 - 66 leaves 24 < 66)
    let _ = engine.use_move(attacker, &mv, Some(subber));
    assert_eq!(engine.battlefield.mon(subber).hp, max_hp);
    assert!(!engine.battlefield.mon(subber).has_volatile(VolatileKind::Substitute));

    // third hit lands on the real target
    let _ = engine.use_move(attacker, &mv, Some(subber));
    assert_eq!(engine.battlefield.mon(subber).hp, max_hp - 66);
}

/// A trio weather never expires by countdown and resists
/// ordinary weather; only another trio weather or an explicit clear ends it.
#[test]
fn test_trio_weather_persists() {
    let a = mon(species("a", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("b", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 6).unwrap();
    engine.init_battle();

    engine
        .set_effect(Holder::Field, weather::weather_effect(WeatherKind::DesolateLand))
        .unwrap();
    for _ in 0..8 {
        engine.run_residual();
    }
    assert_eq!(engine.battlefield.weather, Some(WeatherKind::DesolateLand));

    // ordinary weather bounces off
    assert_eq!(
        engine.set_effect(Holder::Field, weather::weather_effect(WeatherKind::RainDance)),
        Err(Fail)
    );
    assert_eq!(engine.battlefield.weather, Some(WeatherKind::DesolateLand));

    // another trio weather replaces it
    engine
        .set_effect(Holder::Field, weather::weather_effect(WeatherKind::PrimordialSea))
        .unwrap();
    assert_eq!(engine.battlefield.weather, Some(WeatherKind::PrimordialSea));

    engine.battlefield.clear_weather();
    assert_eq!(engine.battlefield.weather, None);
}

#[test]
fn test_ordinary_weather_expires_by_countdown() {
    let a = mon(species("a", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("b", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 7).unwrap();
    engine.init_battle();

    engine
        .set_effect(Holder::Field, weather::weather_effect(WeatherKind::RainDance))
        .unwrap();
    for _ in 0..4 {
        engine.run_residual();
        assert_eq!(engine.battlefield.weather, Some(WeatherKind::RainDance));
    }
    engine.run_residual();
    assert_eq!(engine.battlefield.weather, None);
}

#[test]
fn test_desolate_land_evaporates_water_moves() {
    let surf = Move::new("surf", Type::Water, MoveCategory::Special, 90, 24);
    let a = mon(species("surfer", [Type::Water, Type::NoType]), vec![surf]);
    let b = mon(species("target", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 8).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);
    engine
        .set_effect(Holder::Field, weather::weather_effect(WeatherKind::DesolateLand))
        .unwrap();

    let surfer = active(&engine, 0);
    let target = active(&engine, 1);
    let mv = engine.battlefield.mon(surfer).moveset[0].mv.clone();
    assert_eq!(engine.use_move(surfer, &mv, Some(target)), Err(Fail));
    assert_eq!(
        engine.battlefield.mon(target).hp,
        engine.battlefield.mon(target).stats.max_hp
    );
}

/// A pivot move enters the must-switch path mid-turn, the
/// replacement comes from the DecisionSource, and the residual phase still
/// runs exactly once.
#[test]
fn test_pivot_move_forces_midturn_switch() {
    let mut pivot = tackle();
    pivot.name = "voltswitch".to_string();
    pivot.switch_user = true;
    let a1 = mon(species_spe("pivoter", [Type::Normal, Type::NoType], 150), vec![pivot]);
    let a2 = mon(species("fresh", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species_spe("anchor", [Type::Normal, Type::NoType], 50), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a1, a2], vec![b], 9).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    // reflect's countdown doubles as a residual-ran-once probe
    engine.battlefield.sides[0].effects.set(side_conditions::reflect(5)).unwrap();

    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0), Choice::Switch(1)]);
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let outcome = engine.run_turn(&mut dm0, &mut dm1);
    assert_eq!(outcome, TurnOutcome::Completed);

    // the pivoter's side finished the turn on its replacement
    assert_eq!(engine.battlefield.sides[0].active, Some(1));
    assert_eq!(engine.battlefield.turns, 1);
    // residual ran once, not zero or twice
    let reflect_left = engine.battlefield.sides[0]
        .effects
        .get(EffectSource::SideCondition(SideConditionKind::Reflect))
        .unwrap()
        .duration;
    assert_eq!(reflect_left, Some(4));
    // the slower anchor still got its move off against the replacement
    let fresh = active(&engine, 0);
    assert!(engine.battlefield.mon(fresh).hp < engine.battlefield.mon(fresh).stats.max_hp);
}

#[test]
fn test_reflect_halves_physical_damage() {
    let a = mon(species("attacker", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("walled", [Type::Psychic, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 10).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let attacker = active(&engine, 0);
    let walled = active(&engine, 1);
    let mv = tackle();
    let bare = engine.calculate_damage(attacker, &mv, walled).unwrap().unwrap();
    engine.battlefield.sides[1].effects.set(side_conditions::reflect(5)).unwrap();
    let screened = engine.calculate_damage(attacker, &mv, walled).unwrap().unwrap();
    assert_eq!(bare, 66);
    assert_eq!(screened, 33);
}

#[test]
fn test_protect_blocks_protectable_moves() {
    let a = mon(species("attacker", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("turtle", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 11).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let attacker = active(&engine, 0);
    let turtle = active(&engine, 1);
    engine.set_effect(Holder::Mon(turtle), volatiles::protect()).unwrap();
    assert_eq!(engine.use_move(attacker, &tackle(), Some(turtle)), Err(Fail));
    assert_eq!(
        engine.battlefield.mon(turtle).hp,
        engine.battlefield.mon(turtle).stats.max_hp
    );

    // the shield expires with the residual sweep
    engine.run_residual();
    assert!(!engine.battlefield.mon(turtle).has_volatile(VolatileKind::Protect));
}

#[test]
fn test_perish_song_timeout_faints_holder() {
    let a1 = mon(species("singer", [Type::Normal, Type::NoType]), vec![tackle()]);
    let a2 = mon(species("backup", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("listener", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a1, a2], vec![b], 12).unwrap();
    engine.init_battle();
    let singer = active(&engine, 0);
    engine.set_effect(Holder::Mon(singer), volatiles::perish_song()).unwrap();

    for _ in 0..3 {
        engine.run_residual();
        assert!(!engine.battlefield.mon(singer).is_fainted());
    }
    engine.run_residual();
    assert!(engine.battlefield.mon(singer).is_fainted());
}

#[test]
fn test_wish_heals_on_timeout() {
    let a = mon(species("wisher", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("other", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 13).unwrap();
    engine.init_battle();
    let wisher = active(&engine, 0);
    let max_hp = engine.battlefield.mon(wisher).stats.max_hp;
    engine.battlefield.mon_mut(wisher).hp = 100;
    engine.battlefield.sides[0].effects.set(side_conditions::wish(max_hp / 2)).unwrap();

    engine.run_residual();
    assert_eq!(engine.battlefield.mon(wisher).hp, 100);
    engine.run_residual();
    assert_eq!(engine.battlefield.mon(wisher).hp, 100 + max_hp / 2);
}

#[test]
fn test_struggle_recoils_quarter_max_hp() {
    let a = mon(species("empty", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("wall", [Type::Ghost, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 14).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let user = active(&engine, 0);
    let wall = active(&engine, 1);
    engine.battlefield.mon_mut(user).moveset[0].pp = 0;
    let max_hp = engine.battlefield.mon(user).stats.max_hp;
    let wall_max = engine.battlefield.mon(wall).stats.max_hp;

    let mut dm0 = AutoDecisionSource;
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let _ = engine.run_turn(&mut dm0, &mut dm1);

    // struggle is typeless: it hits the ghost, and gets no same-type bonus
    assert_eq!(engine.battlefield.mon(wall).hp, wall_max - 44);
    // and costs the user a quarter of its max HP, regardless of damage dealt
    let expected_recoil = max_hp / 4;
    let wall_tackle = 44; // ghost attacker, no STAB on tackle
    assert_eq!(
        engine.battlefield.mon(user).hp,
        max_hp - expected_recoil - wall_tackle
    );
}

#[test]
fn test_taunt_filters_status_moves() {
    let growl = Move::new("growl", Type::Normal, MoveCategory::Status, 0, 64);
    let a = mon(species("talker", [Type::Normal, Type::NoType]), vec![growl, tackle()]);
    let b = mon(species("other", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 15).unwrap();
    engine.init_battle();
    let talker = active(&engine, 0);

    assert_eq!(engine.get_move_choices(talker), vec![Choice::Move(0), Choice::Move(1)]);
    engine.set_effect(Holder::Mon(talker), volatiles::taunt(3)).unwrap();
    assert_eq!(engine.get_move_choices(talker), vec![Choice::Move(1)]);
}

#[test]
fn test_trapped_blocks_voluntary_switches_only() {
    let a1 = mon(species("caught", [Type::Normal, Type::NoType]), vec![tackle()]);
    let a2 = mon(species("bench", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b = mon(species("trapper", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a1, a2], vec![b], 16).unwrap();
    engine.init_battle();
    let caught = active(&engine, 0);
    engine.set_effect(Holder::Mon(caught), volatiles::trapped()).unwrap();

    assert!(engine.get_switch_choices(0, Some(caught), false).is_empty());
    assert_eq!(engine.get_switch_choices(0, None, true), vec![1]);
}

#[test]
fn test_trick_room_inverts_move_order() {
    let slow = mon(species_spe("tortoise", [Type::Normal, Type::NoType], 20), vec![tackle()]);
    let fast = mon(species_spe("hare", [Type::Normal, Type::NoType], 200), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![slow], vec![fast], 17).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);
    engine.set_effect(Holder::Field, weather::trick_room()).unwrap();

    // under trick room the slow side moves first; give it a KO to prove it
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
fn test_chain_fainting_on_hazards_resolicits_switches() {
    // three spikes layers; replacements come in at 4 HP and chain-faint
    let a = mon(species("setter", [Type::Normal, Type::NoType]), vec![tackle()]);
    let b1 = mon(species("lead", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut b2 = mon(species("frail1", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut b3 = mon(species("frail2", [Type::Normal, Type::NoType]), vec![tackle()]);
    b2.hp = 4;
    b3.hp = 4;
    let mut engine = BattleEngine::new(vec![a], vec![b1, b2, b3], 18).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    for _ in 0..3 {
        side_conditions::add_hazard(&mut engine.battlefield.sides[1].effects, HazardKind::Spikes)
            .unwrap();
    }
    // KO the lead so turn init must pull in the frail bench
    let lead = active(&engine, 1);
    engine.faint(lead, pokemon_battle_engine::sim::effect::Cause::Other, None);
    engine.resolve_faint_queue();

    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let mut dm1 = ScriptedDecisionSource::new(vec![
        Choice::Switch(1),
        Choice::Switch(2),
        Choice::Move(0),
    ]);
    let outcome = engine.run_turn(&mut dm0, &mut dm1);
    // both frail replacements died to spikes on entry: side 0 wins
    assert_eq!(outcome, TurnOutcome::Finished { winner: 0 });
}

#[test]
fn test_mega_evolution_changes_stats_once() {
    let base = species("mega-capable", [Type::Normal, Type::NoType]);
    let mut mega_species = species("mega-forme", [Type::Normal, Type::Dark]);
    mega_species.base_stats.atk = 150;
    let a = mon(base, vec![tackle()])
        .with_mega_forme(pokemon_battle_engine::sim::pokemon::MegaForme {
            species: mega_species,
            ability: Ability::none(),
        });
    let b = mon(species("other", [Type::Normal, Type::NoType]), vec![tackle()]);
    let mut engine = BattleEngine::new(vec![a], vec![b], 19).unwrap();
    engine.init_battle();
    fix_rolls(&mut engine);

    let mut dm0 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    dm0.mega_on = true;
    let mut dm1 = ScriptedDecisionSource::new(vec![Choice::Move(0)]);
    let _ = engine.run_turn(&mut dm0, &mut dm1);

    let evolved = active(&engine, 0);
    assert!(engine.battlefield.mon(evolved).is_mega);
    assert_eq!(engine.battlefield.mon(evolved).species.name, "mega-forme");
    assert_eq!(engine.battlefield.mon(evolved).types, [Type::Normal, Type::Dark]);
    assert!(engine.battlefield.sides[0].has_mega_evolved);
    assert_eq!(engine.battlefield.mon(evolved).stats.atk, 357); // 150 base
}
