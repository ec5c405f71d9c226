pub mod conditions;
pub mod damage;
pub mod decisions;
pub mod effect;
pub mod engine;
pub mod events;
pub mod pokemon;
pub mod rng;
pub mod side;
pub mod stats;

pub use pokemon::Pokemon;
