//! The effect framework: hook tables, effect instances, and per-entity
//! registries.
//!
//! Every rule modifier in the game (ability, item, status, volatile, side
//! condition, hazard, weather, pseudo-weather) is an [`Effect`]: a unique
//! [`EffectSource`] identity, a `&'static` [`Hooks`] table declaring which of
//! the ~45 interception points it implements, an optional countdown duration,
//! and a small piece of typed per-instance state.
//!
//! Handlers are plain function pointers, so effects stay cheap to clone for
//! search-tree branching, and the engine can call a handler while holding no
//! borrow of the effect that declared it. Dispatch collects the subscriber
//! list for a hook from the fixed holder set, stable-sorts it by descending
//! declared priority (ties keep attachment order), and re-checks that each
//! effect is still attached before calling it, since a handler may remove
//! other effects mid-dispatch.

use crate::data::moves::Move;
use crate::data::types::Type;
use crate::sim::engine::BattleEngine;
use crate::sim::pokemon::{Pokemon, Status};
use crate::sim::stats::Boosts;
use serde::{Deserialize, Serialize};

/// First-class "this action had no effect" sentinel. Not an error: checked
/// locally at each pipeline stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fail;

/// Signal-mode hook result: `Err(Fail)` short-circuits the dispatch.
pub type HookResult = Result<(), Fail>;

/// Why damage (or a faint) happened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cause {
    Confusion,
    Crash,
    Direct,
    Drain,
    Hazard,
    Move,
    Other,
    Recoil,
    Residual,
    SelfDestruct,
    Weather,
}

/// What dealt the damage, for immunity checks and logging.
#[derive(Clone, Copy, Debug)]
pub enum DamageSource<'a> {
    Move(&'a Move),
    Effect(EffectSource),
    Weather(WeatherKind),
    None,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VolatileKind {
    BatonPass,
    ChoiceLock,
    Confuse,
    DestinyBond,
    Flinch,
    LeechSeed,
    LockedMove,
    PerishSong,
    Protect,
    SheerForce,
    Substitute,
    Taunt,
    Trapped,
    TwoTurnMove,
    Yawn,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SideConditionKind {
    HealingWish,
    LightScreen,
    Reflect,
    Safeguard,
    Tailwind,
    Wish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HazardKind {
    ToxicSpikes,
    Spikes,
    StealthRock,
    StickyWeb,
}

pub const HAZARDS: [HazardKind; 4] = [
    HazardKind::ToxicSpikes,
    HazardKind::Spikes,
    HazardKind::StealthRock,
    HazardKind::StickyWeb,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeatherKind {
    DeltaStream,
    DesolateLand,
    Hail,
    PrimordialSea,
    RainDance,
    Sandstorm,
    SunnyDay,
}

impl WeatherKind {
    /// The three mutually exclusive "permanent" weathers. They have no
    /// duration and only end via another trio weather or an explicit clear.
    pub const TRIO: [WeatherKind; 3] = [
        WeatherKind::PrimordialSea,
        WeatherKind::DesolateLand,
        WeatherKind::DeltaStream,
    ];

    pub fn is_trio(self) -> bool {
        Self::TRIO.contains(&self)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PseudoWeatherKind {
    TrickRoom,
}

/// Unique identity of an effect on its holder. At most one effect per source
/// may be attached to an entity at any time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectSource {
    Ability,
    Item,
    Status(Status),
    Volatile(VolatileKind),
    SideCondition(SideConditionKind),
    Hazard(HazardKind),
    Weather(WeatherKind),
    PseudoWeather(PseudoWeatherKind),
}

/// A pokemon in a battle, addressed by side and team slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MonRef {
    pub side: usize,
    pub slot: usize,
}

/// The entity an effect is attached to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Holder {
    Mon(MonRef),
    Side(usize),
    Field,
}

/// Address of one attached effect; handlers receive their own `EffectRef`
/// and use it to read or mutate their instance state through the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EffectRef {
    pub holder: Holder,
    pub source: EffectSource,
}

/// The thing an `on_get_immunity` handler is asked about.
#[derive(Clone, Copy, Debug)]
pub enum Immunity<'a> {
    Type(Type),
    Status(Status),
    Weather(WeatherKind),
    Powder,
    Volatile(VolatileKind),
    Move(&'a Move),
}

/// Outcome of a substitute intercepting a hit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubstituteHit {
    /// The move goes through as if there were no substitute.
    Bypassed,
    /// The substitute absorbed the hit; the target took 0 damage.
    Absorbed,
    /// The move failed against the substitute.
    Failed,
}

/// A legal action for one pokemon in one turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Choice {
    /// Use the move in this moveset slot.
    Move(usize),
    /// No move has PP left.
    Struggle,
    /// Switch to this team slot.
    Switch(usize),
}

pub type StartFn = fn(&mut BattleEngine, EffectRef);
pub type EndFn = fn(&mut BattleEngine, EffectRef);
pub type TimeoutFn = fn(&mut BattleEngine, EffectRef);
pub type MoveChoicesFn = fn(&mut BattleEngine, EffectRef, MonRef, Vec<Choice>) -> Vec<Choice>;
pub type SwitchChoicesFn = fn(&mut BattleEngine, EffectRef, MonRef, Vec<usize>) -> Vec<usize>;
pub type TrapCheckFn = fn(&BattleEngine, EffectRef, MonRef) -> bool;
pub type BeforeTurnFn = fn(&mut BattleEngine, EffectRef, MonRef, Option<MonRef>);
pub type BeforeMoveFn = fn(&mut BattleEngine, EffectRef, MonRef, &Move) -> HookResult;
pub type UpdateFn = fn(&mut BattleEngine, EffectRef, MonRef);
pub type ResidualFn = fn(&mut BattleEngine, EffectRef, Option<MonRef>, Option<MonRef>);
pub type WeatherFn = fn(&mut BattleEngine, EffectRef, MonRef, WeatherKind);
pub type ModifyMoveFn = fn(&mut BattleEngine, EffectRef, &mut Move, MonRef);
pub type TryHitFn = fn(&mut BattleEngine, EffectRef, MonRef, &Move, MonRef) -> HookResult;
pub type MoveHitFn = fn(&mut BattleEngine, EffectRef, MonRef, &Move);
pub type MoveTargetFn = fn(&mut BattleEngine, EffectRef, MonRef, &Move, MonRef);
pub type HitSubstituteFn =
    fn(&mut BattleEngine, EffectRef, MonRef, &Move, MonRef) -> SubstituteHit;
pub type AccuracyFn =
    fn(&BattleEngine, EffectRef, MonRef, &Move, MonRef, Option<u8>) -> Option<u8>;
pub type ModifyBasePowerFn = fn(&BattleEngine, EffectRef, MonRef, &Move, MonRef, f32) -> f32;
pub type ModifyStatFn = fn(&BattleEngine, EffectRef, MonRef, &Move, u32) -> u32;
pub type ModifySpeFn = fn(&BattleEngine, EffectRef, MonRef, u32) -> u32;
pub type ModifyEffectivenessFn =
    fn(&BattleEngine, EffectRef, MonRef, Type, MonRef, f32) -> f32;
pub type ModifyDamageFn = fn(&BattleEngine, EffectRef, MonRef, &Move, f32, f64) -> f64;
pub type ModifyFoeDamageFn =
    fn(&BattleEngine, EffectRef, MonRef, &Move, MonRef, bool, f32, f64) -> f64;
pub type DamageFn = fn(&mut BattleEngine, EffectRef, MonRef, Cause, u16) -> Result<u16, Fail>;
pub type AfterDamageFn =
    fn(&mut BattleEngine, EffectRef, MonRef, u16, Cause, Option<MonRef>);
pub type FoeHealFn = fn(&mut BattleEngine, EffectRef, MonRef, u16, Cause) -> HookResult;
pub type SetStatusFn =
    fn(&mut BattleEngine, EffectRef, Status, MonRef, Option<MonRef>, bool) -> HookResult;
pub type AfterSetStatusFn =
    fn(&mut BattleEngine, EffectRef, Status, MonRef, Option<MonRef>);
pub type BoostFn = fn(&BattleEngine, EffectRef, MonRef, Boosts, bool) -> Boosts;
pub type ImmunityFn = fn(&Effect, &Pokemon, Immunity) -> Option<bool>;
pub type FaintFn = fn(&mut BattleEngine, EffectRef, MonRef, Cause);
pub type FoeFaintFn = fn(&mut BattleEngine, EffectRef, MonRef, Cause, MonRef);
pub type SwitchInFn = fn(&mut BattleEngine, EffectRef, MonRef);
pub type SwitchOutFn = fn(&mut BattleEngine, EffectRef, MonRef);
pub type ModifyPriorityFn = fn(&BattleEngine, EffectRef, MonRef, &Move) -> i8;
pub type SecondaryChanceFn = fn(&BattleEngine, EffectRef, u8, bool) -> u8;

/// Static handler table of one effect kind. Every field defaults to a no-op;
/// a concrete effect overrides the hooks it cares about and, for the
/// priority-ordered hooks, declares its priority next to the handler.
#[derive(Debug)]
pub struct Hooks {
    pub on_start: Option<StartFn>,
    pub on_end: Option<EndFn>,
    pub on_timeout: Option<TimeoutFn>,
    pub on_timeout_prio: i8,

    pub on_get_move_choices: Option<MoveChoicesFn>,
    pub on_get_switch_choices: Option<SwitchChoicesFn>,
    pub on_trap_check: Option<TrapCheckFn>,

    pub on_before_turn: Option<BeforeTurnFn>,
    pub on_before_move: Option<BeforeMoveFn>,
    pub on_before_move_prio: i8,
    pub on_update: Option<UpdateFn>,
    pub on_residual: Option<ResidualFn>,
    pub on_residual_prio: i8,
    pub on_weather: Option<WeatherFn>,

    pub on_modify_move: Option<ModifyMoveFn>,
    pub on_modify_foe_move: Option<ModifyMoveFn>,
    pub on_try_hit: Option<TryHitFn>,
    pub on_foe_try_hit: Option<TryHitFn>,
    pub on_foe_try_hit_prio: i8,
    pub on_move_hit: Option<MoveHitFn>,
    pub on_move_success: Option<MoveTargetFn>,
    pub on_after_foe_hit: Option<MoveTargetFn>,
    pub on_after_move_secondary: Option<MoveTargetFn>,
    pub on_after_foe_move_secondary: Option<MoveTargetFn>,
    pub on_hit_substitute: Option<HitSubstituteFn>,

    pub on_accuracy: Option<AccuracyFn>,
    pub on_foe_accuracy: Option<AccuracyFn>,
    pub on_modify_base_power: Option<ModifyBasePowerFn>,
    pub on_modify_atk: Option<ModifyStatFn>,
    pub on_modify_def: Option<ModifyStatFn>,
    pub on_modify_spa: Option<ModifyStatFn>,
    pub on_modify_spd: Option<ModifyStatFn>,
    pub on_modify_spe: Option<ModifySpeFn>,
    pub on_modify_effectiveness: Option<ModifyEffectivenessFn>,
    pub on_modify_damage: Option<ModifyDamageFn>,
    pub on_modify_foe_damage: Option<ModifyFoeDamageFn>,
    pub on_modify_secondary_chance: Option<SecondaryChanceFn>,
    /// Battle-armor-style: the holder cannot be crit.
    pub blocks_crit: bool,

    pub on_damage: Option<DamageFn>,
    pub on_damage_prio: i8,
    pub on_after_damage: Option<AfterDamageFn>,
    pub on_foe_heal: Option<FoeHealFn>,
    pub on_set_status: Option<SetStatusFn>,
    pub on_after_set_status: Option<AfterSetStatusFn>,
    pub on_boost: Option<BoostFn>,
    pub on_get_immunity: Option<ImmunityFn>,
    pub on_faint: Option<FaintFn>,
    pub on_foe_faint: Option<FoeFaintFn>,

    pub on_switch_in: Option<SwitchInFn>,
    pub on_switch_in_prio: i8,
    pub on_switch_out: Option<SwitchOutFn>,
    pub on_modify_priority: Option<ModifyPriorityFn>,
}

impl Hooks {
    /// The all-no-op table. Concrete effects build theirs with struct update
    /// syntax: `Hooks { on_residual: Some(burn_residual), ..Hooks::NONE }`.
    pub const NONE: Hooks = Hooks {
        on_start: None,
        on_end: None,
        on_timeout: None,
        on_timeout_prio: 0,
        on_get_move_choices: None,
        on_get_switch_choices: None,
        on_trap_check: None,
        on_before_turn: None,
        on_before_move: None,
        on_before_move_prio: 0,
        on_update: None,
        on_residual: None,
        on_residual_prio: 0,
        on_weather: None,
        on_modify_move: None,
        on_modify_foe_move: None,
        on_try_hit: None,
        on_foe_try_hit: None,
        on_foe_try_hit_prio: 0,
        on_move_hit: None,
        on_move_success: None,
        on_after_foe_hit: None,
        on_after_move_secondary: None,
        on_after_foe_move_secondary: None,
        on_hit_substitute: None,
        on_accuracy: None,
        on_foe_accuracy: None,
        on_modify_base_power: None,
        on_modify_atk: None,
        on_modify_def: None,
        on_modify_spa: None,
        on_modify_spd: None,
        on_modify_spe: None,
        on_modify_effectiveness: None,
        on_modify_damage: None,
        on_modify_foe_damage: None,
        on_modify_secondary_chance: None,
        blocks_crit: false,
        on_damage: None,
        on_damage_prio: 0,
        on_after_damage: None,
        on_foe_heal: None,
        on_set_status: None,
        on_after_set_status: None,
        on_boost: None,
        on_get_immunity: None,
        on_faint: None,
        on_foe_faint: None,
        on_switch_in: None,
        on_switch_in_prio: 0,
        on_switch_out: None,
        on_modify_priority: None,
    };
}

/// Small typed per-instance state an effect may carry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EffectState {
    None,
    /// Turn counters checked by the effect itself (confusion, sleep talk...).
    Turns(u8),
    /// Escalating stage (toxic).
    Stage(u8),
    /// Stacking layers (spikes, toxic spikes).
    Layers(u8),
    /// Remaining absorb HP (substitute).
    StoredHp(u16),
    /// A remembered move id (choice lock, locked-in moves).
    LockedMove(String),
    /// Heal scheduled for later (wish).
    PendingHeal(u16),
}

impl EffectState {
    pub fn layers(&self) -> u8 {
        match self {
            EffectState::Layers(n) => *n,
            _ => 0,
        }
    }

    pub fn stored_hp(&self) -> u16 {
        match self {
            EffectState::StoredHp(hp) => *hp,
            _ => 0,
        }
    }

    pub fn turns(&self) -> u8 {
        match self {
            EffectState::Turns(n) => *n,
            _ => 0,
        }
    }

    pub fn stage(&self) -> u8 {
        match self {
            EffectState::Stage(n) => *n,
            _ => 0,
        }
    }
}

/// One attached rule modifier.
#[derive(Clone)]
pub struct Effect {
    pub source: EffectSource,
    pub hooks: &'static Hooks,
    /// Countdown decremented once per residual sweep; reaching 0 removes the
    /// effect and fires `on_timeout`. `None` never expires.
    pub duration: Option<u8>,
    /// Guards ability/item `on_start` against re-activation.
    pub started: bool,
    pub state: EffectState,
}

impl Effect {
    pub fn new(source: EffectSource, hooks: &'static Hooks) -> Self {
        Self { source, hooks, duration: None, started: false, state: EffectState::None }
    }

    pub fn with_duration(mut self, duration: u8) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_state(mut self, state: EffectState) -> Self {
        self.state = state;
        self
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("Effect");
        d.field("source", &self.source);
        if let Some(duration) = self.duration {
            d.field("duration", &duration);
        }
        if self.state != EffectState::None {
            d.field("state", &self.state);
        }
        d.finish()
    }
}

/// Per-entity effect store: insertion-ordered, at most one effect per source.
#[derive(Clone, Debug, Default)]
pub struct EffectRegistry {
    effects: Vec<Effect>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an effect. Duplicate sources are rejected with `Fail`, never
    /// silently replaced.
    pub fn set(&mut self, effect: Effect) -> Result<(), Fail> {
        if self.has(effect.source) {
            return Err(Fail);
        }
        self.effects.push(effect);
        Ok(())
    }

    /// Detach and return the effect with this source, if attached.
    pub fn remove(&mut self, source: EffectSource) -> Option<Effect> {
        let idx = self.effects.iter().position(|e| e.source == source)?;
        Some(self.effects.remove(idx))
    }

    pub fn get(&self, source: EffectSource) -> Option<&Effect> {
        self.effects.iter().find(|e| e.source == source)
    }

    pub fn get_mut(&mut self, source: EffectSource) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.source == source)
    }

    pub fn has(&self, source: EffectSource) -> bool {
        self.effects.iter().any(|e| e.source == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Effect> {
        self.effects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Attachment-ordered source snapshot, for dispatch loops that must
    /// survive effects being added or removed mid-iteration.
    pub fn sources(&self) -> Vec<EffectSource> {
        self.effects.iter().map(|e| e.source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_source_is_rejected() {
        let mut registry = EffectRegistry::new();
        assert!(registry
            .set(Effect::new(EffectSource::Volatile(VolatileKind::Flinch), &Hooks::NONE))
            .is_ok());
        assert_eq!(
            registry.set(Effect::new(EffectSource::Volatile(VolatileKind::Flinch), &Hooks::NONE)),
            Err(Fail)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_none() {
        let mut registry = EffectRegistry::new();
        assert!(registry.remove(EffectSource::Ability).is_none());
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut registry = EffectRegistry::new();
        registry.set(Effect::new(EffectSource::Ability, &Hooks::NONE)).unwrap();
        registry
            .set(Effect::new(EffectSource::Volatile(VolatileKind::Substitute), &Hooks::NONE))
            .unwrap();
        registry.set(Effect::new(EffectSource::Item, &Hooks::NONE)).unwrap();
        let sources = registry.sources();
        assert_eq!(
            sources,
            vec![
                EffectSource::Ability,
                EffectSource::Volatile(VolatileKind::Substitute),
                EffectSource::Item,
            ]
        );
    }

    #[test]
    fn test_trio_weather_classification() {
        assert!(WeatherKind::DesolateLand.is_trio());
        assert!(!WeatherKind::RainDance.is_trio());
    }
}
