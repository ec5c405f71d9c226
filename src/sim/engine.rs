//! The battle engine: turn state machine, event loop, mutation primitives,
//! and the damage/move pipelines.
//!
//! All battle state lives in the [`BattleField`]; the engine adds only
//! intra-turn state (the event queue and faint queue, both always empty
//! between turns) and the RNG. Cloning the engine is the supported branching
//! mechanism for search layers: everything is a value, hook tables are
//! `&'static`, and a clone shares nothing mutable with the original.

use crate::battle_logger::{showdown_ident, BattleLogger};
use crate::data::moves::{recoil_damage, Move, MoveCategory, SecondaryEffect, SecondaryKind, STRUGGLE};
use crate::data::types::effectiveness;
use crate::sim::conditions::statuses::status_effect;
use crate::sim::conditions::volatiles::{self, baton_passes};
use crate::sim::damage::{base_damage, gf_round, ACCURACY_BOOST_FACTOR};
use crate::sim::effect::{
    Cause, Choice, DamageSource, Effect, EffectRef, EffectSource, EffectState, Fail, Holder, Hooks,
    Immunity, MonRef, ResidualFn, SubstituteHit, TimeoutFn, VolatileKind,
};
use crate::sim::events::{
    insort, Event, EventKind, OrderKey, INSTA_SWITCH_PRIORITY, MEGA_EVO_PRIORITY,
    MOVE_PRIORITY_BASE, POST_SWITCH_PRIORITY, SWITCH_PRIORITY,
};
use crate::sim::pokemon::{Pokemon, Status};
use crate::sim::rng::BattleRng;
use crate::sim::side::{BattleField, Side};
use crate::sim::stats::{Boosts, Stat};
use anyhow::{bail, Result};

/// Where the engine is in the battle lifecycle. Observable between turns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnState {
    NotStarted,
    BetweenTurns,
    Terminal,
}

/// Tagged result of running one turn; replaces exception-style breakpoints.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnOutcome {
    Completed,
    Finished { winner: usize },
}

/// Chooses actions for one side. Called synchronously; must not block.
pub trait DecisionSource {
    /// Pick a move or voluntary switch for the turn, plus whether to
    /// mega-evolve this turn.
    fn select_move_or_switch(
        &mut self,
        moves: &[Choice],
        switches: &[usize],
        can_mega_evolve: bool,
        view: &BattleField,
    ) -> (Choice, bool);

    /// Pick a replacement (fainted active, or a pivot move's forced switch).
    /// `switches` is never empty when this is called.
    fn select_forced_switch(&mut self, switches: &[usize], view: &BattleField) -> usize;
}

/// One residual-phase entry: timeouts of expired effects and `on_residual`
/// handlers, gathered across actives/sides/field into a single list and run
/// in one global priority order.
enum ResidualEntry {
    Timeout { handler: TimeoutFn, er: EffectRef },
    Residual { handler: ResidualFn, er: EffectRef, mon: Option<MonRef>, foe: Option<MonRef> },
}

#[derive(Clone, Debug)]
pub struct BattleEngine {
    pub battlefield: BattleField,
    pub rng: BattleRng,
    pub logger: Option<BattleLogger>,
    /// Kept ascending; popped from the back.
    event_queue: Vec<Event>,
    /// LIFO.
    faint_queue: Vec<MonRef>,
    turn_state: TurnState,
}

impl BattleEngine {
    /// `team0`/`team1` must each hold 1-6 pokemon.
    pub fn new(team0: Vec<Pokemon>, team1: Vec<Pokemon>, seed: u64) -> Result<Self> {
        if team0.is_empty() || team0.len() > 6 || team1.is_empty() || team1.len() > 6 {
            bail!("each team must have 1-6 pokemon");
        }
        Ok(Self::from_battlefield(
            BattleField::new(Side::new(team0, 0), Side::new(team1, 1)),
            seed,
        ))
    }

    /// Alternate constructor from an existing battlefield (between turns).
    pub fn from_battlefield(battlefield: BattleField, seed: u64) -> Self {
        Self {
            battlefield,
            rng: BattleRng::from_seed(seed),
            logger: None,
            event_queue: Vec::new(),
            faint_queue: Vec::new(),
            turn_state: TurnState::NotStarted,
        }
    }

    pub fn with_logger(mut self) -> Self {
        self.logger = Some(BattleLogger::new());
        self
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    /// The active pokemon opposite `mon`; `None` if that slot is empty.
    pub fn foe_of(&self, mon: MonRef) -> Option<MonRef> {
        self.battlefield.foe_ref(mon)
    }

    // ------------------------------------------------------------ dispatch

    pub fn effect(&self, er: EffectRef) -> Option<&Effect> {
        self.battlefield.registry(er.holder).get(er.source)
    }

    pub fn effect_mut(&mut self, er: EffectRef) -> Option<&mut Effect> {
        self.battlefield.registry_mut(er.holder).get_mut(er.source)
    }

    /// The hook table of a still-attached effect. Dispatch re-checks this
    /// before every call so handlers removed mid-dispatch are skipped.
    fn live_hooks(&self, er: EffectRef) -> Option<&'static Hooks> {
        self.effect(er).map(|e| e.hooks)
    }

    /// Collect the subscribers to one hook over a fixed holder set, in
    /// descending declared priority; the sort is stable, so ties keep
    /// attachment order.
    fn collect_handlers(
        &self,
        holders: &[Holder],
        has: impl Fn(&Hooks) -> bool,
        prio: impl Fn(&Hooks) -> i8,
    ) -> Vec<EffectRef> {
        let mut subs: Vec<(EffectRef, i8)> = Vec::new();
        for &holder in holders {
            for effect in self.battlefield.registry(holder).iter() {
                if has(effect.hooks) {
                    subs.push((EffectRef { holder, source: effect.source }, prio(effect.hooks)));
                }
            }
        }
        subs.sort_by_key(|&(_, p)| std::cmp::Reverse(p));
        subs.into_iter().map(|(er, _)| er).collect()
    }

    // -------------------------------------------------- effect attachment

    /// Attach an effect to an entity. Duplicate sources fail; ability/item
    /// effects fire `on_start` exactly once (the `started` flag survives
    /// trace/forme changes). Weather goes through the field's weather slot.
    pub fn set_effect(&mut self, holder: Holder, effect: Effect) -> Result<(), Fail> {
        if let Holder::Mon(mon) = holder {
            assert!(!self.battlefield.mon(mon).is_fainted(), "set_effect on fainted pokemon");
            if let EffectSource::Volatile(kind) = effect.source {
                if self.battlefield.mon(mon).is_immune_to(Immunity::Volatile(kind)) {
                    return Err(Fail);
                }
            }
        }
        if let (Holder::Field, EffectSource::Weather(kind)) = (holder, effect.source) {
            let result = self.battlefield.set_weather(effect);
            if result.is_ok() {
                self.log_weather(kind);
            }
            return result;
        }

        let source = effect.source;
        let hooks = effect.hooks;
        let started = effect.started;
        self.battlefield.registry_mut(holder).set(effect)?;

        let activates = matches!(source, EffectSource::Ability | EffectSource::Item);
        if activates && !started {
            if let Some(e) = self.battlefield.registry_mut(holder).get_mut(source) {
                e.started = true;
            }
            if let Some(handler) = hooks.on_start {
                handler(self, EffectRef { holder, source });
            }
        }
        Ok(())
    }

    /// Detach an effect, firing `on_end`. Removing an absent effect is a
    /// no-op. Removing the current weather clears the field's weather cache.
    pub fn remove_effect(&mut self, holder: Holder, source: EffectSource) -> bool {
        let removed = match holder {
            Holder::Field => self.battlefield.remove_field_effect(source),
            _ => self.battlefield.registry_mut(holder).remove(source),
        };
        let Some(effect) = removed else {
            return false;
        };
        if let Some(handler) = effect.hooks.on_end {
            handler(self, EffectRef { holder, source });
        }
        if let (Holder::Mon(mon), EffectSource::Status(status)) = (holder, source) {
            let m = self.battlefield.mon_mut(mon);
            if m.status == Some(status) {
                m.status = None;
            }
        }
        true
    }

    /// Fire `on_end` for everything attached to a pokemon, then drop it all.
    /// Used by faint and switch-out; deliberately not `on_switch_out`.
    fn clear_effects(&mut self, mon: MonRef) {
        let holder = Holder::Mon(mon);
        for source in self.battlefield.mon(mon).effects.sources() {
            let er = EffectRef { holder, source };
            if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_end) {
                handler(self, er);
            }
        }
        self.battlefield.mon_mut(mon).effects.clear();
    }

    /// Fire a pending ability `on_start` if it has not activated yet.
    fn ability_start(&mut self, mon: MonRef) {
        let er = EffectRef { holder: Holder::Mon(mon), source: EffectSource::Ability };
        let pending = match self.effect(er) {
            Some(e) if !e.started => e.hooks.on_start,
            _ => return,
        };
        if let Some(e) = self.effect_mut(er) {
            e.started = true;
        }
        if let Some(handler) = pending {
            handler(self, er);
        }
    }

    /// Replace a pokemon's ability for as long as it stays active.
    pub fn change_ability(&mut self, mon: MonRef, ability: crate::sim::pokemon::Ability) {
        assert!(self.battlefield.mon(mon).is_active, "changing inactive pokemon's ability");
        self.remove_effect(Holder::Mon(mon), EffectSource::Ability);
        let hooks = ability.hooks;
        self.battlefield.mon_mut(mon).ability = ability;
        let _ = self.set_effect(Holder::Mon(mon), Effect::new(EffectSource::Ability, hooks));
    }

    // ------------------------------------------------ mutation primitives

    /// Deal damage. No-op (0) on fainted targets and zero amounts; weather
    /// damage respects weather immunity; `on_damage` handlers may clamp the
    /// amount or veto with `Fail`; faints the target at 0 HP.
    pub fn damage(
        &mut self,
        target: MonRef,
        amount: u16,
        cause: Cause,
        source: DamageSource,
        attacker: Option<MonRef>,
        drain_pct: u8,
    ) -> Result<u16, Fail> {
        if self.battlefield.mon(target).is_fainted() {
            return Ok(0);
        }
        assert!(self.battlefield.mon(target).is_active, "damaging inactive pokemon");
        debug_assert!(cause != Cause::Move || attacker.is_some());
        if amount == 0 {
            return Ok(0);
        }

        if cause == Cause::Weather {
            if let DamageSource::Weather(kind) = source {
                if self.battlefield.mon(target).is_immune_to(Immunity::Weather(kind)) {
                    return Ok(0);
                }
            }
        }

        let mut amount = amount.max(1);
        let handlers = self.collect_handlers(
            &[Holder::Mon(target)],
            |h| h.on_damage.is_some(),
            |h| h.on_damage_prio,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_damage) else { continue };
            amount = handler(self, er, target, cause, amount)?;
        }

        let mon = self.battlefield.mon_mut(target);
        let dealt = amount.min(mon.hp);
        mon.hp -= dealt;
        let (hp, max_hp) = (mon.hp, mon.stats.max_hp);
        self.log_damage(target, hp, max_hp);

        if drain_pct > 0 {
            if let Some(attacker) = attacker {
                if !self.battlefield.mon(attacker).is_fainted() {
                    let heal = (dealt as f64 * drain_pct as f64 / 100.0).ceil() as u16;
                    let _ = self.heal(attacker, heal, Cause::Drain, Some(target));
                }
            }
        }

        let handlers = self.collect_handlers(
            &[Holder::Mon(target)],
            |h| h.on_after_damage.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_after_damage) else {
                continue;
            };
            handler(self, er, target, dealt, cause, attacker);
        }

        if self.battlefield.mon(target).hp == 0 {
            self.faint(target, cause, attacker);
        }
        Ok(dealt)
    }

    /// Cause-less damage that bypasses `on_damage` (substitute cost,
    /// struggle recoil, confusion self-hits).
    pub fn direct_damage(&mut self, target: MonRef, amount: u16) {
        if self.battlefield.mon(target).is_fainted() {
            return;
        }
        let amount = amount.max(1);
        let mon = self.battlefield.mon_mut(target);
        let dealt = amount.min(mon.hp);
        mon.hp -= dealt;
        let (hp, max_hp) = (mon.hp, mon.stats.max_hp);
        self.log_damage(target, hp, max_hp);
        if self.battlefield.mon(target).hp == 0 {
            self.faint(target, Cause::Direct, None);
        }
    }

    /// Heal up to max HP. No-op on fainted targets; not interceptable except
    /// by the foe's `on_foe_heal` veto (used by drain healing).
    pub fn heal(
        &mut self,
        target: MonRef,
        amount: u16,
        cause: Cause,
        foe: Option<MonRef>,
    ) -> Result<(), Fail> {
        if self.battlefield.mon(target).is_fainted() {
            return Ok(());
        }
        if let Some(foe) = foe {
            let handlers = self.collect_handlers(
                &[Holder::Mon(foe)],
                |h| h.on_foe_heal.is_some(),
                |_| 0,
            );
            for er in handlers {
                let Some(handler) = self.live_hooks(er).and_then(|h| h.on_foe_heal) else {
                    continue;
                };
                handler(self, er, target, amount, cause)?;
            }
        }
        let mon = self.battlefield.mon_mut(target);
        mon.hp = mon.hp.saturating_add(amount).min(mon.stats.max_hp);
        let (hp, max_hp) = (mon.hp, mon.stats.max_hp);
        self.log_heal(target, hp, max_hp);
        Ok(())
    }

    /// Faint a pokemon: idempotent; the only assignment site of `Fnt`.
    /// Clears the side's active pointer, queues faint resolution, fires
    /// `on_faint`/`on_foe_faint`, then drops all effects without switch-out
    /// semantics.
    pub fn faint(&mut self, target: MonRef, cause: Cause, attacker: Option<MonRef>) {
        if self.battlefield.mon(target).status == Some(Status::Fnt) {
            return;
        }
        let turns = self.battlefield.turns;
        {
            let mon = self.battlefield.mon_mut(target);
            mon.hp = 0;
            mon.status = Some(Status::Fnt);
            mon.is_active = false;
        }
        let side = &mut self.battlefield.sides[target.side];
        side.last_fainted_on_turn = Some(turns);
        if side.active == Some(target.slot) {
            side.active = None;
        }
        self.faint_queue.push(target);
        self.log_faint(target);

        for source in self.battlefield.mon(target).effects.sources() {
            let er = EffectRef { holder: Holder::Mon(target), source };
            if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_faint) {
                handler(self, er, target, cause);
            }
        }
        if let Some(attacker) = attacker {
            if !self.battlefield.mon(attacker).is_fainted() {
                for source in self.battlefield.mon(attacker).effects.sources() {
                    let er = EffectRef { holder: Holder::Mon(attacker), source };
                    if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_foe_faint) {
                        handler(self, er, attacker, cause, target);
                    }
                }
            }
        }
        self.clear_effects(target);
    }

    /// Set a major status. Fails if already statused, immune, blocked by
    /// sleep clause (one non-resting sleeper per side), or vetoed by any
    /// `on_set_status` handler on the target, its side, or the field.
    pub fn set_status(
        &mut self,
        target: MonRef,
        status: Status,
        setter: Option<MonRef>,
        infiltrates: bool,
    ) -> Result<(), Fail> {
        assert_ne!(status, Status::Fnt, "Fnt is assigned only by faint()");
        assert!(!self.battlefield.mon(target).is_fainted());

        if status == Status::Slp {
            let side = &self.battlefield.sides[target.side];
            let another_sleeper = side.team.iter().enumerate().any(|(slot, p)| {
                slot != target.slot && p.status == Some(Status::Slp) && !p.is_resting
            });
            if another_sleeper {
                // sleep clause
                return Err(Fail);
            }
        }

        if self.battlefield.mon(target).status.is_some()
            || self.battlefield.mon(target).is_immune_to(Immunity::Status(status))
        {
            return Err(Fail);
        }

        let handlers = self.collect_handlers(
            &[Holder::Mon(target), Holder::Side(target.side), Holder::Field],
            |h| h.on_set_status.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_set_status) else {
                continue;
            };
            handler(self, er, status, target, setter, infiltrates)?;
        }

        {
            let mon = self.battlefield.mon_mut(target);
            mon.status = Some(status);
            if status == Status::Slp {
                mon.turns_slept = Some(0);
            }
        }
        self.battlefield
            .mon_mut(target)
            .effects
            .set(status_effect(status))
            .expect("status effect cannot already be attached");
        self.log_status(target, status);

        let handlers = self.collect_handlers(
            &[Holder::Mon(target)],
            |h| h.on_after_set_status.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_after_set_status) else {
                continue;
            };
            handler(self, er, status, target, setter);
        }
        Ok(())
    }

    pub fn cure_status(&mut self, mon: MonRef) {
        self.battlefield.mon_mut(mon).cure_status();
        self.log_cure(mon);
    }

    /// Apply boost stages. The delta passes through the active ability's
    /// `on_boost` only; each stage clamps to [-6, 6]; reports `Fail` when
    /// nothing changed.
    pub fn apply_boosts(
        &mut self,
        target: MonRef,
        delta: &Boosts,
        self_induced: bool,
    ) -> Result<(), Fail> {
        assert!(!self.battlefield.mon(target).is_fainted());
        assert!(self.battlefield.mon(target).is_active);

        let mut delta = *delta;
        let er = EffectRef { holder: Holder::Mon(target), source: EffectSource::Ability };
        if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_boost) {
            delta = handler(self, er, target, delta, self_induced);
        }
        let result = self.battlefield.mon_mut(target).boosts.apply(&delta);
        if result.is_ok() {
            self.log_boosts(target, &delta);
        }
        result
    }

    /// Confuse a pokemon (blocked by safeguard unless the inflicter
    /// infiltrates).
    pub fn confuse(&mut self, target: MonRef, infiltrates: bool) -> Result<(), Fail> {
        if !infiltrates
            && self.battlefield.sides[target.side].effects.has(EffectSource::SideCondition(
                crate::sim::effect::SideConditionKind::Safeguard,
            ))
        {
            return Err(Fail);
        }
        let turns = self.rng.turn_count(1, 4);
        self.set_effect(Holder::Mon(target), volatiles::confuse(turns))
    }

    /// A confused pokemon hits itself with the typeless 40 BP self-hit.
    pub fn confusion_hit(&mut self, mon: MonRef) {
        assert!(self.battlefield.mon(mon).is_active);
        let mv: &Move = &crate::data::moves::CONFUSION_HIT;
        if let Ok(Some(amount)) = self.calculate_damage(mon, mv, mon) {
            let _ = self.damage(mon, amount, Cause::Confusion, DamageSource::Move(mv), Some(mon), 0);
        }
    }

    // ------------------------------------------------------------ switching

    /// Legal voluntary switches for a side: non-fainted bench, filtered by
    /// trapping effects unless forced.
    pub fn get_switch_choices(&mut self, side: usize, mon: Option<MonRef>, forced: bool) -> Vec<usize> {
        let side_state = &self.battlefield.sides[side];
        let mut choices: Vec<usize> = side_state
            .team
            .iter()
            .enumerate()
            .filter(|(slot, p)| {
                p.status != Some(Status::Fnt) && side_state.active != Some(*slot)
            })
            .map(|(slot, _)| slot)
            .collect();

        if !forced {
            if let Some(mon) = mon {
                let handlers = self.collect_handlers(
                    &[Holder::Mon(mon)],
                    |h| h.on_trap_check.is_some(),
                    |_| 0,
                );
                for er in handlers {
                    let Some(handler) = self.live_hooks(er).and_then(|h| h.on_trap_check) else {
                        continue;
                    };
                    if handler(self, er, mon) {
                        return Vec::new();
                    }
                }
                let handlers = self.collect_handlers(
                    &[Holder::Mon(mon)],
                    |h| h.on_get_switch_choices.is_some(),
                    |_| 0,
                );
                for er in handlers {
                    let Some(handler) =
                        self.live_hooks(er).and_then(|h| h.on_get_switch_choices)
                    else {
                        continue;
                    };
                    choices = handler(self, er, mon, choices);
                }
            }
        }
        choices
    }

    /// Legal moves: moveset slots with PP, run through
    /// `on_get_move_choices`; struggle when nothing remains.
    pub fn get_move_choices(&mut self, mon: MonRef) -> Vec<Choice> {
        let mut choices: Vec<Choice> = self
            .battlefield
            .mon(mon)
            .moveset
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.pp > 0)
            .map(|(i, _)| Choice::Move(i))
            .collect();

        let handlers = self.collect_handlers(
            &[Holder::Mon(mon)],
            |h| h.on_get_move_choices.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_get_move_choices) else {
                continue;
            };
            choices = handler(self, er, mon, choices);
        }
        if choices.is_empty() {
            vec![Choice::Struggle]
        } else {
            choices
        }
    }

    /// Swap the active pokemon. The outgoing side runs baton-pass transfer,
    /// `on_switch_out`, then clears down; the incoming side re-attaches
    /// ability/item/status effects. Entry hazards fire later, in
    /// `post_switch_in`.
    pub fn run_switch(&mut self, outgoing: Option<MonRef>, incoming: MonRef) {
        if let Some(out) = outgoing {
            assert_eq!(out.side, incoming.side);
            assert_ne!(out.slot, incoming.slot);
            assert!(self.battlefield.mon(out).is_active);
        }
        assert!(!self.battlefield.mon(incoming).is_active);
        assert!(!self.battlefield.mon(incoming).is_fainted());

        if let Some(out) = outgoing {
            self.switch_out(out, incoming);
        }
        // the outgoing pokemon may have fainted during switch-out
        // interception; the replacement then gets re-chosen at faint
        // resolution instead
        if outgoing.map_or(true, |out| !self.battlefield.mon(out).is_fainted()) {
            self.switch_in(incoming);
        }
    }

    fn switch_out(&mut self, outgoing: MonRef, incoming: MonRef) {
        self.battlefield.mon_mut(outgoing).is_switching_out = true;

        if self.battlefield.mon(outgoing).has_volatile(VolatileKind::BatonPass) {
            // boosts and the baton-passable volatiles ride along
            let boosts = self.battlefield.mon(outgoing).boosts;
            self.battlefield.mon_mut(incoming).boosts = boosts;
            for source in self.battlefield.mon(outgoing).effects.sources() {
                if let EffectSource::Volatile(kind) = source {
                    if baton_passes(kind) {
                        if let Some(effect) =
                            self.battlefield.mon_mut(outgoing).effects.remove(source)
                        {
                            let _ = self.battlefield.mon_mut(incoming).effects.set(effect);
                        }
                    }
                }
            }
        }

        for source in self.battlefield.mon(outgoing).effects.sources() {
            let er = EffectRef { holder: Holder::Mon(outgoing), source };
            if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_switch_out) {
                handler(self, er, outgoing);
            }
        }

        self.clear_effects(outgoing);
        let mon = self.battlefield.mon_mut(outgoing);
        mon.boosts = Boosts::default();
        mon.types = mon.species.types;
        mon.is_active = false;
        mon.is_switching_out = false;
        mon.turns_out = 0;
        self.battlefield.sides[outgoing.side].active = None;
    }

    fn switch_in(&mut self, incoming: MonRef) {
        assert!(!self.battlefield.mon(incoming).is_fainted());
        {
            let mon = self.battlefield.mon_mut(incoming);
            mon.is_active = true;
            mon.has_moved_this_turn = false;
            mon.will_move_this_turn = false;
            mon.damage_done_this_turn = 0;
            mon.was_attacked_this_turn = None;
            mon.hit_by_crit = false;
            mon.last_move_used = None;
            mon.turns_out = 0;
            mon.must_switch = false;
            mon.ability = mon.base_ability.clone();
        }
        self.battlefield.sides[incoming.side].active = Some(incoming.slot);
        self.log_switch(incoming);

        // ability activates later, in post_switch_in
        let ability_hooks = self.battlefield.mon(incoming).ability.hooks;
        let _ = self
            .battlefield
            .mon_mut(incoming)
            .effects
            .set(Effect::new(EffectSource::Ability, ability_hooks));

        if let Some(item_hooks) = self.battlefield.mon(incoming).item.as_ref().map(|i| i.hooks) {
            let _ = self.set_effect(Holder::Mon(incoming), Effect::new(EffectSource::Item, item_hooks));
        }

        if let Some(status) = self.battlefield.mon(incoming).status {
            let _ = self.battlefield.mon_mut(incoming).effects.set(status_effect(status));
        }
    }

    /// Entry sequence: the side's `on_switch_in` handlers (hazards, healing
    /// wish) in priority order, then the pokemon's own, then the ability's
    /// one-time activation. Hazards here can chain-faint.
    pub fn post_switch_in(&mut self, mon: MonRef) {
        let mut handlers = self.collect_handlers(
            &[Holder::Side(mon.side)],
            |h| h.on_switch_in.is_some(),
            |h| h.on_switch_in_prio,
        );
        handlers.extend(self.collect_handlers(
            &[Holder::Mon(mon)],
            |h| h.on_switch_in.is_some(),
            |h| h.on_switch_in_prio,
        ));
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_switch_in) else {
                continue;
            };
            handler(self, er, mon);
        }
        if self.battlefield.mon(mon).is_fainted() {
            return;
        }
        self.ability_start(mon);
    }

    /// Dragon-tail style: drag in a random legal replacement.
    pub fn force_random_switch(&mut self, target: MonRef, forcer: MonRef) -> Result<(), Fail> {
        if self.battlefield.mon(target).is_fainted() || self.battlefield.mon(forcer).is_fainted() {
            return Err(Fail);
        }
        let choices = self.get_switch_choices(target.side, None, true);
        if choices.is_empty() {
            return Ok(());
        }
        let slot = choices[self.rng.choose_index(choices.len())];
        let incoming = MonRef { side: target.side, slot };
        self.run_switch(Some(target), incoming);
        self.post_switch_in(incoming);
        Ok(())
    }

    /// Forme-change into the construction-supplied mega forme; once per side
    /// per battle.
    pub fn mega_evolve(&mut self, mon: MonRef) {
        let Some(forme) = self.battlefield.mon(mon).mega_forme.clone() else {
            return;
        };
        if self.battlefield.sides[mon.side].has_mega_evolved {
            return;
        }
        self.battlefield.sides[mon.side].has_mega_evolved = true;
        {
            let m = self.battlefield.mon_mut(mon);
            m.is_mega = true;
            m.species = forme.species.clone();
            m.stats = crate::sim::stats::PokemonStats::calculate(
                forme.species.base_stats,
                m.level,
                m.evs,
                m.ivs,
            );
            m.hp = m.hp.min(m.stats.max_hp);
            m.types = forme.species.types;
            m.base_ability = forme.ability.clone();
        }
        self.log_mega(mon);
        if self.battlefield.mon(mon).ability.name != forme.ability.name {
            self.change_ability(mon, forme.ability.clone());
        }
    }

    // ------------------------------------------------------- stat modifiers

    pub fn effective_spe(&self, mon: MonRef) -> u32 {
        let mut spe = self.battlefield.mon(mon).calculate_stat(Stat::Spe, None);
        let handlers = self.collect_handlers(
            &[Holder::Mon(mon), Holder::Side(mon.side), Holder::Field],
            |h| h.on_modify_spe.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_spe) else {
                continue;
            };
            spe = handler(self, er, mon, spe);
        }
        spe
    }

    fn modify_attack_stat(&self, value: u32, user: MonRef, mv: &Move, special: bool) -> u32 {
        let mut value = value;
        let handlers = self.collect_handlers(
            &[Holder::Mon(user)],
            |h| if special { h.on_modify_spa.is_some() } else { h.on_modify_atk.is_some() },
            |_| 0,
        );
        for er in handlers {
            let hooks = match self.live_hooks(er) {
                Some(h) => h,
                None => continue,
            };
            let handler = if special { hooks.on_modify_spa } else { hooks.on_modify_atk };
            if let Some(handler) = handler {
                value = handler(self, er, user, mv, value);
            }
        }
        value
    }

    fn modify_defense_stat(&self, value: u32, target: MonRef, mv: &Move, special: bool) -> u32 {
        let mut value = value;
        let holders: &[Holder] = if special {
            &[Holder::Mon(target), Holder::Field]
        } else {
            &[Holder::Mon(target)]
        };
        let handlers = self.collect_handlers(
            holders,
            |h| if special { h.on_modify_spd.is_some() } else { h.on_modify_def.is_some() },
            |_| 0,
        );
        for er in handlers {
            let hooks = match self.live_hooks(er) {
                Some(h) => h,
                None => continue,
            };
            let handler = if special { hooks.on_modify_spd } else { hooks.on_modify_def };
            if let Some(handler) = handler {
                value = handler(self, er, target, mv, value);
            }
        }
        value
    }

    fn get_effectiveness(&self, user: MonRef, mv: &Move, target: MonRef) -> f32 {
        let mut eff = effectiveness(mv.typ, self.battlefield.mon(target).types);
        let handlers = self.collect_handlers(
            &[Holder::Mon(user), Holder::Field],
            |h| h.on_modify_effectiveness.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_effectiveness)
            else {
                continue;
            };
            eff = handler(self, er, user, mv.typ, target, eff);
        }
        eff
    }

    fn target_blocks_crit(&self, target: MonRef) -> bool {
        self.battlefield.mon(target).effects.iter().any(|e| e.hooks.blocks_crit)
    }

    /// Sum of priority offsets from the user's ability and item.
    pub fn modify_priority(&self, mon: MonRef, mv: &Move) -> i8 {
        let mut offset = 0i8;
        for source in [EffectSource::Ability, EffectSource::Item] {
            let er = EffectRef { holder: Holder::Mon(mon), source };
            if let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_priority) {
                offset = offset.saturating_add(handler(self, er, mon, mv));
            }
        }
        offset
    }

    // --------------------------------------------------- damage calculation

    /// The damage pipeline: `Err(Fail)` for immunity, `Ok(None)` when the
    /// move does not attempt damage, else a final integer >= 1.
    pub fn calculate_damage(
        &mut self,
        user: MonRef,
        mv: &Move,
        target: MonRef,
    ) -> Result<Option<u16>, Fail> {
        {
            let user_p = self.battlefield.mon(user);
            let target_p = self.battlefield.mon(target);
            if target_p.is_immune_to_move(user_p, mv) {
                return Err(Fail);
            }
        }

        if let Some(callback) = mv.damage_callback {
            return Ok(Some(callback(self, user, target)));
        }

        // base power: static or dynamic, then accumulated across the
        // attacker's and the field's effects
        let mut base_power_f = match mv.base_power_callback {
            Some(callback) => callback(self, user, target, mv) as f32,
            None => mv.base_power as f32,
        };
        if base_power_f > 0.0 {
            let handlers = self.collect_handlers(
                &[Holder::Mon(user), Holder::Field],
                |h| h.on_modify_base_power.is_some(),
                |_| 0,
            );
            for er in handlers {
                let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_base_power)
                else {
                    continue;
                };
                base_power_f = handler(self, er, user, mv, target, base_power_f);
            }
        }
        if base_power_f <= 0.0 {
            return Ok(None);
        }
        let base_power = gf_round(base_power_f as f64).max(1) as u16;

        debug_assert!(matches!(mv.category, MoveCategory::Physical | MoveCategory::Special));

        let mut crit = mv.always_crit || self.rng.critical_hit(mv.crit_ratio);
        if crit {
            crit = !mv.never_crit && !self.target_blocks_crit(target);
        }

        let special_attack = mv.category == MoveCategory::Special;
        let defensive_category = mv.defensive_category.unwrap_or(mv.category);
        let special_defense = defensive_category == MoveCategory::Special;
        let attacking_stat = if special_attack { Stat::Spa } else { Stat::Atk };
        let defending_stat = if special_defense { Stat::Spd } else { Stat::Def };
        let attack_source = if mv.use_opponent_attack { target } else { user };

        let mut attack_boosts = self.battlefield.mon(attack_source).boosts.get(attacking_stat);
        let mut defense_boosts = self.battlefield.mon(target).boosts.get(defending_stat);
        if mv.ignore_offensive_boosts || (crit && attack_boosts < 0) {
            attack_boosts = 0;
        }
        if mv.ignore_defensive_boosts || (crit && defense_boosts > 0) {
            defense_boosts = 0;
        }

        let attack = self
            .battlefield
            .mon(attack_source)
            .calculate_stat(attacking_stat, Some(attack_boosts));
        let defense =
            self.battlefield.mon(target).calculate_stat(defending_stat, Some(defense_boosts));
        let attack = self.modify_attack_stat(attack, user, mv, special_attack);
        let defense = self.modify_defense_stat(defense, target, mv, special_defense);

        let level = self.battlefield.mon(user).level;
        let mut damage = base_damage(level, base_power, attack, defense);

        if crit {
            self.battlefield.mon_mut(target).hit_by_crit = true;
            self.log_crit(target);
            damage = damage * 3 / 2;
        }

        damage = damage * self.rng.damage_randomizer() as i64 / 100;

        // typeless moves never get the same-type bonus; NoType also pads
        // mono-typed type arrays
        if mv.typ != crate::data::types::Type::NoType
            && self.battlefield.mon(user).types.contains(&mv.typ)
        {
            damage = (damage as f64 * mv.stab as f64) as i64;
        }

        let eff = self.get_effectiveness(user, mv, target);
        let mut final_damage = damage as f64 * eff as f64;

        let handlers = self.collect_handlers(
            &[Holder::Mon(user), Holder::Side(user.side), Holder::Field],
            |h| h.on_modify_damage.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_damage) else {
                continue;
            };
            final_damage = handler(self, er, user, mv, eff, final_damage);
        }
        let handlers = self.collect_handlers(
            &[Holder::Mon(target), Holder::Side(target.side)],
            |h| h.on_modify_foe_damage.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_foe_damage) else {
                continue;
            };
            final_damage = handler(self, er, user, mv, target, crit, eff, final_damage);
        }

        let result = (final_damage.floor() as i64).max(1);
        Ok(Some(result.min(u16::MAX as i64) as u16))
    }

    // ------------------------------------------------------- move execution

    /// Run one chosen move. `slot` indexes the moveset; `None` is struggle.
    pub fn run_move(&mut self, user: MonRef, slot: Option<usize>) {
        {
            let mon = self.battlefield.mon(user);
            assert!(!mon.is_fainted());
            assert!(mon.is_active);
            assert!(!mon.has_moved_this_turn);
            assert!(mon.will_move_this_turn);
            if let Some(i) = slot {
                debug_assert!(
                    mon.moveset[i].pp > 0
                        || mon.moveset[i].mv.max_pp == 0
                        || mon.has_volatile(VolatileKind::LockedMove)
                );
            }
        }
        {
            let mon = self.battlefield.mon_mut(user);
            mon.has_moved_this_turn = true;
            mon.will_move_this_turn = false;
        }

        let mut mv: Move = match slot {
            Some(i) => self.battlefield.mon(user).moveset[i].mv.clone(),
            None => STRUGGLE.clone(),
        };

        // locked-in override (outrage style)
        if slot.is_some() {
            let locked = self
                .battlefield
                .mon(user)
                .effects
                .get(EffectSource::Volatile(VolatileKind::LockedMove))
                .and_then(|e| match &e.state {
                    EffectState::LockedMove(name) => Some(name.clone()),
                    _ => None,
                });
            if let Some(name) = locked {
                if let Some(locked_slot) =
                    self.battlefield.mon(user).moveset.iter().find(|s| s.mv.name == name)
                {
                    mv = locked_slot.mv.clone();
                }
            }
        }

        // before-move gate: priority-ordered, first Fail vetoes the move
        let handlers = self.collect_handlers(
            &[Holder::Mon(user)],
            |h| h.on_before_move.is_some(),
            |h| h.on_before_move_prio,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_before_move) else {
                continue;
            };
            if handler(self, er, user, &mv).is_err() {
                // drop bounce-style invulnerability
                self.remove_effect(Holder::Mon(user), EffectSource::Volatile(VolatileKind::TwoTurnMove));
                return;
            }
        }

        // PP comes off once, never refunded; 0-max-PP and locked-in moves
        // are exempt
        if let Some(i) = slot {
            if mv.max_pp > 0 && !self.battlefield.mon(user).has_volatile(VolatileKind::LockedMove) {
                let pp = &mut self.battlefield.mon_mut(user).moveset[i].pp;
                *pp = pp.saturating_sub(1);
            }
        }

        let target = self.foe_of(user);
        self.log_move(user, &mv, target);
        let _ = self.use_move(user, &mv, target);

        self.battlefield.mon_mut(user).last_move_used = Some(mv.name.clone());
        self.battlefield.last_move_used = Some(mv.name);
    }

    /// Execute a (catalog) move against the current target. The move is
    /// cloned first so `on_modify_move` mutations stay per-use.
    pub fn use_move(
        &mut self,
        user: MonRef,
        mv: &Move,
        target: Option<MonRef>,
    ) -> Result<Option<u16>, Fail> {
        let mut mv = mv.clone();
        if let Some(callback) = mv.on_modify_move {
            callback(self, user, target, &mut mv);
        }
        let handlers = self.collect_handlers(
            &[Holder::Mon(user)],
            |h| h.on_modify_move.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_move) else {
                continue;
            };
            handler(self, er, &mut mv, user);
        }
        if let Some(t) = target {
            let handlers = self.collect_handlers(
                &[Holder::Mon(t)],
                |h| h.on_modify_foe_move.is_some(),
                |_| 0,
            );
            for er in handlers {
                let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_foe_move) else {
                    continue;
                };
                handler(self, er, &mut mv, user);
            }
        }

        if mv.targets_user {
            return self.fast_use_move(user, &mv);
        }

        let target = match target {
            Some(t) if !self.battlefield.mon(t).is_fainted() => t,
            _ => {
                // self-destruct moves still explode without a target
                if mv.selfdestruct {
                    self.faint(user, Cause::SelfDestruct, None);
                }
                return Err(Fail);
            }
        };

        let result = self.try_move_hit(user, &mv, target);

        if let Ok((damage, total_damage)) = result {
            if damage.is_some_and(|d| d > 0) {
                if mv.recoil > 0 {
                    let recoil = recoil_damage(total_damage, mv.recoil);
                    let _ =
                        self.damage(user, recoil, Cause::Recoil, DamageSource::Move(&mv), None, 0);
                }
                self.battlefield.mon_mut(target).was_attacked_this_turn =
                    Some(crate::sim::pokemon::AttackRecord {
                        move_name: mv.name.clone(),
                        damage: damage.unwrap_or(0),
                    });
            }
        }

        if (self.battlefield.mon(user).hp == 0 || mv.selfdestruct)
            && self.battlefield.mon(user).status != Some(Status::Fnt)
        {
            self.faint(user, Cause::SelfDestruct, None);
        }

        match result {
            Err(Fail) => {
                if let Some(callback) = mv.on_move_fail {
                    callback(self, user, &mv);
                }
                Err(Fail)
            }
            Ok((damage, _)) => {
                if !self.battlefield.mon(user).has_volatile(VolatileKind::SheerForce) {
                    let handlers = self.collect_handlers(
                        &[Holder::Mon(target)],
                        |h| h.on_after_foe_move_secondary.is_some(),
                        |_| 0,
                    );
                    for er in handlers {
                        let Some(handler) =
                            self.live_hooks(er).and_then(|h| h.on_after_foe_move_secondary)
                        else {
                            continue;
                        };
                        handler(self, er, user, &mv, target);
                    }
                    let handlers = self.collect_handlers(
                        &[Holder::Mon(user)],
                        |h| h.on_after_move_secondary.is_some(),
                        |_| 0,
                    );
                    for er in handlers {
                        let Some(handler) =
                            self.live_hooks(er).and_then(|h| h.on_after_move_secondary)
                        else {
                            continue;
                        };
                        handler(self, er, user, &mv, target);
                    }
                    if let Some(callback) = mv.on_after_move_secondary {
                        callback(self, user, Some(target), &mv);
                    }
                }
                Ok(damage)
            }
        }
    }

    /// Reduced fast path for self-targeting moves: check_success, user
    /// boosts (fail-fast), on_success. Skips target, immunity, accuracy,
    /// substitute, and secondary machinery.
    fn fast_use_move(&mut self, user: MonRef, mv: &Move) -> Result<Option<u16>, Fail> {
        if let Some(check) = mv.check_success {
            check(self, user, None, mv)?;
        }
        self.battlefield.mon_mut(user).damage_done_this_turn = 0;

        if let Some(boosts) = mv.user_boosts {
            self.apply_boosts(user, &boosts, true)?;
        }
        if let Some(on_success) = mv.on_success {
            on_success(self, user, None, mv)?;
        }
        self.battlefield.mon_mut(user).must_switch = mv.switch_user;

        if (self.battlefield.mon(user).hp == 0 || mv.selfdestruct)
            && self.battlefield.mon(user).status != Some(Status::Fnt)
        {
            self.faint(user, Cause::SelfDestruct, None);
        }
        Ok(None)
    }

    /// The try-hit gate and multihit loop. Returns the last hit's damage and
    /// the total over all hits.
    fn try_move_hit(
        &mut self,
        user: MonRef,
        mv: &Move,
        target: MonRef,
    ) -> Result<(Option<u16>, u16), Fail> {
        if let Some(check) = mv.check_success {
            check(self, user, Some(target), mv)?;
        }

        let handlers = self.collect_handlers(
            &[Holder::Mon(user), Holder::Field],
            |h| h.on_try_hit.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_try_hit) else {
                continue;
            };
            handler(self, er, user, mv, target)?;
        }

        // the target's own effects in priority order, then its side's
        let mut handlers = self.collect_handlers(
            &[Holder::Mon(target)],
            |h| h.on_foe_try_hit.is_some(),
            |h| h.on_foe_try_hit_prio,
        );
        handlers.extend(self.collect_handlers(
            &[Holder::Side(target.side)],
            |h| h.on_foe_try_hit.is_some(),
            |h| h.on_foe_try_hit_prio,
        ));
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_foe_try_hit) else {
                continue;
            };
            handler(self, er, user, mv, target)?;
        }

        {
            let user_p = self.battlefield.mon(user);
            let target_p = self.battlefield.mon(target);
            if target_p.is_immune_to_move(user_p, mv) {
                self.log_immune(target);
                return Err(Fail);
            }
        }

        if let Some(on_try_hit) = mv.on_try_hit {
            on_try_hit(self, target, mv);
        }

        self.check_accuracy(user, mv, target)?;

        if let Some(table) = &mv.multihit {
            let hits = self.rng.multihit(table);
            let mut total: u16 = 0;
            let mut last: Option<u16> = None;
            for _ in 0..hits {
                let damage = self.move_hit(user, mv, target)?;
                last = damage;
                total = total.saturating_add(damage.unwrap_or(0));
                // stop early on faint (either side) or sleep
                if self.battlefield.mon(target).hp == 0
                    || self.battlefield.mon(user).hp == 0
                    || self.battlefield.mon(user).status == Some(Status::Slp)
                {
                    break;
                }
            }
            Ok((last, total))
        } else {
            let damage = self.move_hit(user, mv, target)?;
            Ok((damage, damage.unwrap_or(0)))
        }
    }

    /// One hit: substitute interception, damage, drain, target status, user
    /// boosts, success hooks, secondaries.
    fn move_hit(&mut self, user: MonRef, mv: &Move, target: MonRef) -> Result<Option<u16>, Fail> {
        let handlers =
            self.collect_handlers(&[Holder::Mon(user)], |h| h.on_move_hit.is_some(), |_| 0);
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_move_hit) else {
                continue;
            };
            handler(self, er, user, mv);
        }

        let sub_er = EffectRef {
            holder: Holder::Mon(target),
            source: EffectSource::Volatile(VolatileKind::Substitute),
        };
        if let Some(handler) = self.live_hooks(sub_er).and_then(|h| h.on_hit_substitute) {
            match handler(self, sub_er, user, mv, target) {
                SubstituteHit::Bypassed => {}
                SubstituteHit::Absorbed => return Ok(Some(0)),
                SubstituteHit::Failed => return Err(Fail),
            }
        }

        let damage = self.calculate_damage(user, mv, target)?;

        let mut dealt: Option<u16> = None;
        if let Some(amount) = damage {
            let done =
                self.damage(target, amount, Cause::Move, DamageSource::Move(mv), Some(user), mv.drain)?;
            dealt = Some(done);
        }
        self.battlefield.mon_mut(user).damage_done_this_turn = dealt.unwrap_or(0);

        if let Some(status) = mv.target_status {
            // all target-status moves do nothing else, so fail fast
            self.set_status(target, status, Some(user), mv.infiltrates)?;
        }

        if let Some(boosts) = mv.user_boosts {
            if !self.battlefield.mon(user).is_fainted() {
                let _ = self.apply_boosts(user, &boosts, true);
            }
        }

        let handlers =
            self.collect_handlers(&[Holder::Mon(user)], |h| h.on_move_success.is_some(), |_| 0);
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_move_success) else {
                continue;
            };
            handler(self, er, user, mv, target);
        }

        if let Some(on_success) = mv.on_success {
            on_success(self, user, Some(target), mv)?;
        }

        // roar-style effects may have changed the active foe
        let target_now = self.foe_of(user);

        if let Some(t) = target_now {
            let handlers =
                self.collect_handlers(&[Holder::Mon(t)], |h| h.on_after_foe_hit.is_some(), |_| 0);
            for er in handlers {
                let Some(handler) = self.live_hooks(er).and_then(|h| h.on_after_foe_hit) else {
                    continue;
                };
                handler(self, er, user, mv, t);
            }
        }

        for s_effect in &mv.secondary_effects {
            let recipient = if s_effect.affects_user { Some(user) } else { target_now };
            if let Some(recipient) = recipient {
                self.apply_secondary_effect(recipient, s_effect, user);
            }
        }

        self.battlefield.mon_mut(user).must_switch = mv.switch_user;
        Ok(dealt)
    }

    fn check_accuracy(&mut self, user: MonRef, mv: &Move, target: MonRef) -> Result<(), Fail> {
        let mut accuracy = mv.accuracy;
        let handlers =
            self.collect_handlers(&[Holder::Mon(user)], |h| h.on_accuracy.is_some(), |_| 0);
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_accuracy) else {
                continue;
            };
            accuracy = handler(self, er, user, mv, target, accuracy);
        }
        let handlers =
            self.collect_handlers(&[Holder::Mon(target)], |h| h.on_foe_accuracy.is_some(), |_| 0);
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_foe_accuracy) else {
                continue;
            };
            accuracy = handler(self, er, user, mv, target, accuracy);
        }

        // None means the move cannot miss
        let Some(accuracy) = accuracy else {
            return Ok(());
        };
        let mut accuracy = accuracy as f32;

        if !mv.ignore_accuracy_boosts {
            let acc_boost = self.battlefield.mon(user).boosts.acc;
            if acc_boost > 0 {
                accuracy *= ACCURACY_BOOST_FACTOR[acc_boost as usize];
            } else if acc_boost < 0 {
                accuracy /= ACCURACY_BOOST_FACTOR[(-acc_boost) as usize];
            }
        }
        if !mv.ignore_evasion_boosts {
            let evn_boost = self.battlefield.mon(target).boosts.evn;
            if evn_boost > 0 {
                accuracy /= ACCURACY_BOOST_FACTOR[evn_boost as usize];
            } else if evn_boost < 0 {
                accuracy *= ACCURACY_BOOST_FACTOR[(-evn_boost) as usize];
            }
        }

        if self.rng.accuracy_check(accuracy) {
            Ok(())
        } else {
            self.log_miss(user);
            Err(Fail)
        }
    }

    /// Roll and apply one secondary effect. The chance itself runs through
    /// `on_modify_secondary_chance` on both the user (serene-grace style)
    /// and the target (shield-dust style).
    pub fn apply_secondary_effect(&mut self, target: MonRef, s_effect: &SecondaryEffect, user: MonRef) {
        let mut chance = s_effect.chance;
        let handlers = self.collect_handlers(
            &[Holder::Mon(user), Holder::Mon(target)],
            |h| h.on_modify_secondary_chance.is_some(),
            |_| 0,
        );
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_modify_secondary_chance)
            else {
                continue;
            };
            chance = handler(self, er, chance, s_effect.affects_user);
        }

        if !self.rng.secondary_check(chance) {
            return;
        }
        if self.battlefield.mon(target).is_fainted() {
            return;
        }

        match &s_effect.effect {
            SecondaryKind::Boosts(boosts) => {
                let _ = self.apply_boosts(target, boosts, s_effect.affects_user);
            }
            SecondaryKind::Status(status) => {
                let _ = self.set_status(target, *status, Some(user), false);
            }
            SecondaryKind::Volatile(VolatileKind::Flinch) => {
                let _ = self.set_effect(Holder::Mon(target), volatiles::flinch());
            }
            SecondaryKind::Volatile(VolatileKind::Confuse) => {
                let _ = self.confuse(target, false);
            }
            SecondaryKind::Volatile(kind) => {
                debug_assert!(false, "unsupported secondary volatile {:?}", kind);
            }
            SecondaryKind::Callback(callback) => callback(self, target, user),
        }
    }

    // ----------------------------------------------------------- turn loop

    /// Send in both leads (faster first), run their entry sequences, and do
    /// the initial update sweep.
    pub fn init_battle(&mut self) {
        if self.turn_state != TurnState::NotStarted || self.battlefield.turns > 0 {
            return;
        }
        let lead0 = MonRef { side: 0, slot: 0 };
        let lead1 = MonRef { side: 1, slot: 0 };
        let spe0 = self.battlefield.mon(lead0).stats.spe;
        let spe1 = self.battlefield.mon(lead1).stats.spe;
        let zero_first = if spe0 == spe1 { self.rng.speed_tie() == 0 } else { spe0 > spe1 };
        let leads = if zero_first { [lead0, lead1] } else { [lead1, lead0] };

        for lead in leads {
            self.switch_in(lead);
        }
        for lead in leads {
            self.post_switch_in(lead);
        }
        self.run_update();
        self.resolve_faint_queue();
        self.turn_state = TurnState::BetweenTurns;
    }

    /// Run one full turn to its quiescent point. Both queues are empty again
    /// when this returns.
    pub fn run_turn(
        &mut self,
        dm0: &mut dyn DecisionSource,
        dm1: &mut dyn DecisionSource,
    ) -> TurnOutcome {
        self.init_battle();
        if self.battlefield.win.is_some() {
            self.turn_state = TurnState::Terminal;
            return TurnOutcome::Finished { winner: self.battlefield.win.unwrap() };
        }

        let mut dms: [&mut dyn DecisionSource; 2] = [dm0, dm1];
        self.init_turn(&mut dms);

        while let Some(event) = self.event_queue.pop() {
            match event.kind {
                EventKind::Move { user, slot } => {
                    let mon = self.battlefield.mon(user);
                    if mon.is_fainted() || !mon.is_active {
                        // acted too late; skip
                    } else {
                        self.run_move(user, slot);
                    }
                }
                EventKind::Switch { outgoing, incoming } => {
                    if outgoing.is_some_and(|out| self.battlefield.mon(out).is_fainted()) {
                        // the chooser was knocked out before its switch
                    } else {
                        self.run_switch(outgoing, incoming);
                        let spe = self.effective_spe(incoming) as i32;
                        let tiebreak = self.rng.event_tiebreak();
                        insort(
                            &mut self.event_queue,
                            Event {
                                kind: EventKind::PostSwitchIn { mon: incoming },
                                order: OrderKey {
                                    category: POST_SWITCH_PRIORITY,
                                    speed: spe,
                                    tiebreak,
                                },
                            },
                        );
                    }
                }
                EventKind::PostSwitchIn { mon } => {
                    if self.battlefield.mon(mon).is_active && !self.battlefield.mon(mon).is_fainted()
                    {
                        self.post_switch_in(mon);
                    }
                }
                EventKind::MegaEvo { mon } => {
                    if self.battlefield.mon(mon).is_active && !self.battlefield.mon(mon).is_fainted()
                    {
                        self.mega_evolve(mon);
                    }
                }
                EventKind::Residual => {
                    self.run_residual();
                }
            }

            self.run_update();

            // pivot moves flag must-switch: solicit and insert the forced
            // switch immediately rather than waiting for turn init
            for side in 0..2 {
                let Some(active) = self.battlefield.active_ref(side) else { continue };
                if self.battlefield.mon(active).must_switch
                    && self.battlefield.sides[side].remaining_pokemon_on_bench() > 0
                {
                    let choices = self.get_switch_choices(side, None, true);
                    let slot = dms[side].select_forced_switch(&choices, &self.battlefield);
                    let tiebreak = self.rng.event_tiebreak();
                    insort(
                        &mut self.event_queue,
                        Event {
                            kind: EventKind::Switch {
                                outgoing: Some(active),
                                incoming: MonRef { side, slot },
                            },
                            order: OrderKey { category: SWITCH_PRIORITY, speed: 0, tiebreak },
                        },
                    );
                    self.battlefield.mon_mut(active).must_switch = false;
                }
            }

            self.resolve_faint_queue();
        }

        match self.battlefield.win {
            Some(winner) => {
                self.turn_state = TurnState::Terminal;
                TurnOutcome::Finished { winner }
            }
            None => TurnOutcome::Completed,
        }
    }

    /// Run until someone wins. Returns the winning side index.
    pub fn run_battle(
        &mut self,
        dm0: &mut dyn DecisionSource,
        dm1: &mut dyn DecisionSource,
    ) -> usize {
        loop {
            if let TurnOutcome::Finished { winner } = self.run_turn(dm0, dm1) {
                self.log_win(winner);
                return winner;
            }
        }
    }

    /// Turn init: fill empty active slots (looping, since hazards can
    /// chain-faint replacements), reset per-turn flags, bump the turn
    /// counter, fire `on_before_turn`, collect decisions, and build the
    /// event queue with its residual marker.
    fn init_turn(&mut self, dms: &mut [&mut dyn DecisionSource; 2]) {
        loop {
            let mut switch_queue: Vec<Event> = Vec::new();
            for side in 0..2 {
                if self.battlefield.sides[side].active.is_none() {
                    if self.battlefield.sides[side].remaining_pokemon_on_bench() == 0 {
                        assert!(self.battlefield.win.is_some());
                        return;
                    }
                    let choices = self.get_switch_choices(side, None, true);
                    let slot = dms[side].select_forced_switch(&choices, &self.battlefield);
                    debug_assert!(choices.contains(&slot), "illegal forced switch");
                    let tiebreak = self.rng.event_tiebreak();
                    insort(
                        &mut switch_queue,
                        Event {
                            kind: EventKind::Switch {
                                outgoing: None,
                                incoming: MonRef { side, slot },
                            },
                            order: OrderKey {
                                category: INSTA_SWITCH_PRIORITY,
                                speed: 0,
                                tiebreak,
                            },
                        },
                    );
                } else {
                    let active = self.battlefield.active_ref(side).unwrap();
                    let mon = self.battlefield.mon_mut(active);
                    debug_assert!(mon.is_active);
                    mon.has_moved_this_turn = false;
                    mon.damage_done_this_turn = 0;
                    mon.was_attacked_this_turn = None;
                    mon.hit_by_crit = false;
                }
            }

            while let Some(event) = switch_queue.pop() {
                match event.kind {
                    EventKind::Switch { outgoing, incoming } => {
                        self.run_switch(outgoing, incoming);
                        let spe = self.effective_spe(incoming) as i32;
                        let tiebreak = self.rng.event_tiebreak();
                        insort(
                            &mut switch_queue,
                            Event {
                                kind: EventKind::PostSwitchIn { mon: incoming },
                                order: OrderKey {
                                    category: POST_SWITCH_PRIORITY,
                                    speed: spe,
                                    tiebreak,
                                },
                            },
                        );
                        // the foe gets an update after seeing the new arrival
                        if let Some(foe) = self.foe_of(incoming) {
                            self.update_one(foe);
                        }
                    }
                    EventKind::PostSwitchIn { mon } => {
                        if self.battlefield.mon(mon).is_active
                            && !self.battlefield.mon(mon).is_fainted()
                        {
                            self.post_switch_in(mon);
                        }
                    }
                    _ => unreachable!("only switch events at turn init"),
                }
            }

            self.resolve_faint_queue();

            let filled = (0..2).all(|side| {
                self.battlefield
                    .active_ref(side)
                    .is_some_and(|m| !self.battlefield.mon(m).is_fainted())
            });
            if filled {
                break;
            }
        }

        let actives = [
            self.battlefield.active_ref(0).unwrap(),
            self.battlefield.active_ref(1).unwrap(),
        ];
        for mon in actives {
            let m = self.battlefield.mon_mut(mon);
            m.will_move_this_turn = true;
            m.turns_out += 1;
        }
        for (i, mon) in actives.into_iter().enumerate() {
            let foe = Some(actives[1 - i]);
            let handlers = self.collect_handlers(
                &[Holder::Mon(mon)],
                |h| h.on_before_turn.is_some(),
                |_| 0,
            );
            for er in handlers {
                let Some(handler) = self.live_hooks(er).and_then(|h| h.on_before_turn) else {
                    continue;
                };
                handler(self, er, mon, foe);
            }
        }

        self.battlefield.turns += 1;
        self.log_turn();

        let trick_room = self.battlefield.effects.has(EffectSource::PseudoWeather(
            crate::sim::effect::PseudoWeatherKind::TrickRoom,
        ));

        for side in 0..2 {
            let mon = actives[side];
            let spe = self.effective_spe(mon) as i32;
            let speed_key = if trick_room { -spe } else { spe };
            let moves = self.get_move_choices(mon);
            let switches = self.get_switch_choices(side, Some(mon), false);
            let can_mega = self
                .battlefield
                .mon(mon)
                .can_mega_evolve(self.battlefield.sides[side].has_mega_evolved);
            let (choice, mega) =
                dms[side].select_move_or_switch(&moves, &switches, can_mega, &self.battlefield);

            let tiebreak = self.rng.event_tiebreak();
            let event = match choice {
                Choice::Move(slot) => {
                    debug_assert!(moves.contains(&Choice::Move(slot)), "illegal move choice");
                    let mv = self.battlefield.mon(mon).moveset[slot].mv.clone();
                    let priority = mv.priority.saturating_add(self.modify_priority(mon, &mv));
                    Event {
                        kind: EventKind::Move { user: mon, slot: Some(slot) },
                        order: OrderKey {
                            category: MOVE_PRIORITY_BASE + priority as i32,
                            speed: speed_key,
                            tiebreak,
                        },
                    }
                }
                Choice::Struggle => Event {
                    kind: EventKind::Move { user: mon, slot: None },
                    order: OrderKey {
                        category: MOVE_PRIORITY_BASE,
                        speed: speed_key,
                        tiebreak,
                    },
                },
                Choice::Switch(slot) => {
                    debug_assert!(switches.contains(&slot), "illegal switch choice");
                    Event {
                        kind: EventKind::Switch {
                            outgoing: Some(mon),
                            incoming: MonRef { side, slot },
                        },
                        order: OrderKey {
                            category: SWITCH_PRIORITY,
                            speed: speed_key,
                            tiebreak,
                        },
                    }
                }
            };
            insort(&mut self.event_queue, event);

            if mega && can_mega {
                let tiebreak = self.rng.event_tiebreak();
                insort(
                    &mut self.event_queue,
                    Event {
                        kind: EventKind::MegaEvo { mon },
                        order: OrderKey {
                            category: MEGA_EVO_PRIORITY,
                            speed: speed_key,
                            tiebreak,
                        },
                    },
                );
            }
        }

        insort(&mut self.event_queue, Event::residual());
    }

    /// The between-turns sweep: decrement every countdown on actives, sides,
    /// and field (expiries fire `on_timeout`), then gather every
    /// `on_residual` across all holders into one list and run it in a single
    /// global descending-priority order.
    pub fn run_residual(&mut self) {
        let active0 = self.battlefield.active_ref(0);
        let active1 = self.battlefield.active_ref(1);

        let mut entries: Vec<(i8, usize, ResidualEntry)> = Vec::new();
        let mut seq = 0usize;

        let mut countdown_holders: Vec<Holder> = Vec::new();
        countdown_holders.extend(active0.map(Holder::Mon));
        countdown_holders.extend(active1.map(Holder::Mon));
        countdown_holders.push(Holder::Side(0));
        countdown_holders.push(Holder::Side(1));
        countdown_holders.push(Holder::Field);

        for holder in countdown_holders {
            for source in self.battlefield.registry(holder).sources() {
                let Some(effect) = self.battlefield.registry(holder).get(source) else {
                    continue;
                };
                let Some(duration) = effect.duration else { continue };
                assert!(duration > 0);
                let hooks = effect.hooks;
                let next = duration - 1;
                if next == 0 {
                    let er = EffectRef { holder, source };
                    self.remove_effect(holder, source);
                    if let Some(handler) = hooks.on_timeout {
                        entries.push((
                            hooks.on_timeout_prio,
                            seq,
                            ResidualEntry::Timeout { handler, er },
                        ));
                        seq += 1;
                    }
                } else if let Some(effect) =
                    self.battlefield.registry_mut(holder).get_mut(source)
                {
                    effect.duration = Some(next);
                }
            }
        }

        // one flat list across actives, sides, and the field; never a
        // per-entity merge
        for (side, mon, foe) in [(0usize, active0, active1), (1usize, active1, active0)] {
            if let Some(m) = mon {
                for source in self.battlefield.mon(m).effects.sources() {
                    let er = EffectRef { holder: Holder::Mon(m), source };
                    if let Some(effect) = self.effect(er) {
                        if let Some(handler) = effect.hooks.on_residual {
                            entries.push((
                                effect.hooks.on_residual_prio,
                                seq,
                                ResidualEntry::Residual { handler, er, mon, foe },
                            ));
                            seq += 1;
                        }
                    }
                }
            }
            for source in self.battlefield.sides[side].effects.sources() {
                let er = EffectRef { holder: Holder::Side(side), source };
                if let Some(effect) = self.effect(er) {
                    if let Some(handler) = effect.hooks.on_residual {
                        entries.push((
                            effect.hooks.on_residual_prio,
                            seq,
                            ResidualEntry::Residual { handler, er, mon, foe },
                        ));
                        seq += 1;
                    }
                }
            }
        }
        for source in self.battlefield.effects.sources() {
            let er = EffectRef { holder: Holder::Field, source };
            if let Some(effect) = self.effect(er) {
                if let Some(handler) = effect.hooks.on_residual {
                    entries.push((
                        effect.hooks.on_residual_prio,
                        seq,
                        ResidualEntry::Residual { handler, er, mon: active0, foe: active1 },
                    ));
                    seq += 1;
                }
            }
        }

        // global stable sort: descending priority, attachment order on ties
        entries.sort_by_key(|&(prio, seq, _)| (std::cmp::Reverse(prio), seq));

        for (_, _, entry) in entries {
            match entry {
                ResidualEntry::Timeout { handler, er } => handler(self, er),
                ResidualEntry::Residual { handler, er, mon, foe } => {
                    // another residual may have removed this effect already
                    if self.effect(er).is_none() {
                        continue;
                    }
                    handler(self, er, mon, foe);
                }
            }
        }
    }

    fn update_one(&mut self, mon: MonRef) {
        let handlers =
            self.collect_handlers(&[Holder::Mon(mon)], |h| h.on_update.is_some(), |_| 0);
        for er in handlers {
            let Some(handler) = self.live_hooks(er).and_then(|h| h.on_update) else {
                continue;
            };
            handler(self, er, mon);
        }
    }

    /// `on_update` over both actives, faster first.
    pub fn run_update(&mut self) {
        let mut actives: Vec<MonRef> =
            [self.battlefield.active_ref(0), self.battlefield.active_ref(1)]
                .into_iter()
                .flatten()
                .collect();
        actives.sort_by_key(|&m| std::cmp::Reverse(self.effective_spe(m)));
        for mon in actives {
            self.update_one(mon);
        }
    }

    /// Drain the faint queue (LIFO); a side with an empty bench loses, and
    /// the winner is recorded exactly once.
    pub fn resolve_faint_queue(&mut self) {
        while let Some(mon) = self.faint_queue.pop() {
            assert_eq!(self.battlefield.mon(mon).status, Some(Status::Fnt));
            if self.battlefield.sides[mon.side].remaining_pokemon_on_bench() == 0
                && self.battlefield.win.is_none()
            {
                self.battlefield.win = Some(1 - mon.side);
            }
            debug_assert!(
                self.battlefield.mon(mon).effects.is_empty(),
                "fainted pokemon still has effects"
            );
        }
    }

    // -------------------------------------------------------------- logging

    fn ident(&self, mon: MonRef) -> String {
        showdown_ident(mon.side, &self.battlefield.mon(mon).species.name)
    }

    fn log_turn(&mut self) {
        if self.logger.is_none() {
            return;
        }
        let turn = self.battlefield.turns;
        self.logger.as_mut().unwrap().log_turn(turn as usize);
    }

    fn log_move(&mut self, user: MonRef, mv: &Move, target: Option<MonRef>) {
        if self.logger.is_none() {
            return;
        }
        let user_ident = self.ident(user);
        let target_ident = target.map(|t| self.ident(t)).unwrap_or_default();
        self.logger.as_mut().unwrap().log_move(&user_ident, &mv.name, &target_ident);
    }

    fn log_damage(&mut self, mon: MonRef, hp: u16, max_hp: u16) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_damage(&ident, hp, max_hp);
    }

    fn log_heal(&mut self, mon: MonRef, hp: u16, max_hp: u16) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_heal(&ident, hp, max_hp);
    }

    fn log_status(&mut self, mon: MonRef, status: Status) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        let id = match status {
            Status::Brn => "brn",
            Status::Frz => "frz",
            Status::Par => "par",
            Status::Psn => "psn",
            Status::Slp => "slp",
            Status::Tox => "tox",
            Status::Fnt => "fnt",
        };
        self.logger.as_mut().unwrap().log_status(&ident, id);
    }

    fn log_cure(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_cure_status(&ident);
    }

    fn log_switch(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        let (species, hp, max_hp) = {
            let m = self.battlefield.mon(mon);
            (m.species.name.clone(), m.hp, m.stats.max_hp)
        };
        self.logger.as_mut().unwrap().log_switch(&ident, &species, hp, max_hp);
    }

    fn log_faint(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_faint(&ident);
    }

    pub(crate) fn log_cant(&mut self, mon: MonRef, reason: &str) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_cant(&ident, reason);
    }

    fn log_boosts(&mut self, mon: MonRef, delta: &Boosts) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        let logger = self.logger.as_mut().unwrap();
        for stat in Boosts::STATS {
            let amount = delta.get(stat);
            if amount != 0 {
                logger.log_boost(&ident, stat, amount);
            }
        }
    }

    fn log_crit(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_crit(&ident);
    }

    fn log_miss(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_miss(&ident);
    }

    fn log_immune(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_immune(&ident);
    }

    fn log_weather(&mut self, kind: crate::sim::effect::WeatherKind) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log_weather(&format!("{:?}", kind));
        }
    }

    fn log_mega(&mut self, mon: MonRef) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_mega(&ident);
    }

    pub(crate) fn log_end(&mut self, mon: MonRef, what: &str) {
        if self.logger.is_none() {
            return;
        }
        let ident = self.ident(mon);
        self.logger.as_mut().unwrap().log_end(&ident, what);
    }

    fn log_win(&mut self, winner: usize) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log_win(&format!("side-{}", winner));
        }
    }
}
