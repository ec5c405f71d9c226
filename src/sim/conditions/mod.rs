//! Built-in battle conditions: the major status ailments, the volatiles with
//! engine-level semantics, entry hazards, screens and side conditions, and
//! the weathers. The large ability/item/move catalog lives outside this
//! crate; these are the conditions the engine itself attaches.

pub mod side_conditions;
pub mod statuses;
pub mod volatiles;
pub mod weather;
