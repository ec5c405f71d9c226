//! A two-player turn-based battle engine with a priority-ordered effect
//! dispatch pipeline.
//!
//! The main entry point is [`sim::engine::BattleEngine`]: build two teams of
//! [`sim::Pokemon`], seed the engine, and drive it with a pair of
//! [`sim::engine::DecisionSource`]s. All state lives in
//! [`sim::side::BattleField`] and is introspectable between turns; cloning
//! the engine is the supported way to branch hypothetical futures for search.
//!
//! Rule modifiers (abilities, items, statuses, volatiles, hazards, weather)
//! implement the hook tables in [`sim::effect`]; the concrete move/ability/
//! item catalog lives outside this crate.

pub mod battle_logger;
pub mod data;
pub mod model;
pub mod sim;

/// Commonly used exports for external consumers.
pub mod prelude {
    pub use crate::battle_logger::BattleLogger;
    pub use crate::data::moves::{Move, MoveCategory, SecondaryEffect, SecondaryKind};
    pub use crate::data::types::Type;
    pub use crate::model::{build_team, load_teams, parse_teams, TeamsFile};
    pub use crate::sim::decisions::{
        AutoDecisionSource, RandomDecisionSource, RandomWithSwitches, ScriptedDecisionSource,
    };
    pub use crate::sim::effect::{
        Choice, Effect, EffectRegistry, EffectSource, Fail, HazardKind, Holder, Hooks, MonRef,
        SideConditionKind, VolatileKind, WeatherKind,
    };
    pub use crate::sim::engine::{BattleEngine, DecisionSource, TurnOutcome, TurnState};
    pub use crate::sim::pokemon::{Ability, Gender, Item, Pokemon, SpeciesData, Status};
    pub use crate::sim::side::{BattleField, Side};
    pub use crate::sim::stats::{BaseStats, Boosts, PokemonStats, Stat};
}
