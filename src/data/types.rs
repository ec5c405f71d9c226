//! Pokemon type chart.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Normal,
    Fighting,
    Flying,
    Poison,
    Ground,
    Rock,
    Bug,
    Ghost,
    Steel,
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Ice,
    Dragon,
    Dark,
    Fairy,
    /// Typeless (struggle, confusion self-hit, mono-typed second slot).
    NoType,
}

pub const TYPE_COUNT: usize = 19;

#[rustfmt::skip]
const TYPE_MATRIX: [[f32; TYPE_COUNT]; TYPE_COUNT] = [                                    // v Attack
//   Nor  Fig  Fly  Poi  Gro  Roc  Bug  Gho  Ste  Fir  Wat  Gra  Ele  Psy  Ice  Dra  Dar  Fai  ---  // < Defend
    [1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], // Normal
    [2.0, 1.0, 0.5, 0.5, 1.0, 2.0, 0.5, 0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.5, 2.0, 1.0, 2.0, 0.5, 1.0], // Fighting
    [1.0, 2.0, 1.0, 1.0, 1.0, 0.5, 2.0, 1.0, 0.5, 1.0, 1.0, 2.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], // Flying
    [1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 1.0, 0.5, 0.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0], // Poison
    [1.0, 1.0, 0.0, 2.0, 1.0, 2.0, 0.5, 1.0, 2.0, 2.0, 1.0, 0.5, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], // Ground
    [1.0, 0.5, 2.0, 1.0, 0.5, 1.0, 2.0, 1.0, 0.5, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0], // Rock
    [1.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 1.0, 2.0, 1.0, 2.0, 1.0, 1.0, 2.0, 0.5, 1.0], // Bug
    [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 0.5, 1.0, 1.0], // Ghost
    [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 0.5, 0.5, 0.5, 1.0, 0.5, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0], // Steel
    [1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 2.0, 1.0, 2.0, 0.5, 0.5, 2.0, 1.0, 1.0, 2.0, 0.5, 1.0, 1.0, 1.0], // Fire
    [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 1.0, 2.0, 0.5, 0.5, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0], // Water
    [1.0, 1.0, 0.5, 0.5, 2.0, 2.0, 0.5, 1.0, 0.5, 0.5, 2.0, 0.5, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0], // Grass
    [1.0, 1.0, 2.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.5, 0.5, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0], // Electric
    [1.0, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 0.0, 1.0, 1.0], // Psychic
    [1.0, 1.0, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 2.0, 1.0, 1.0, 0.5, 2.0, 1.0, 1.0, 1.0], // Ice
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.0, 1.0], // Dragon
    [1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 0.5, 0.5, 1.0], // Dark
    [1.0, 2.0, 1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0], // Fairy
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], // NoType
];

/// Single-type matchup: attacking type vs one defending type.
pub fn effectiveness_against(attack: Type, defend: Type) -> f32 {
    TYPE_MATRIX[attack as usize][defend as usize]
}

/// Dual-type matchup: the product over both defending slots.
/// Mono-typed defenders carry `Type::NoType` in the second slot.
pub fn effectiveness(attack: Type, defender_types: [Type; 2]) -> f32 {
    effectiveness_against(attack, defender_types[0]) * effectiveness_against(attack, defender_types[1])
}

pub fn parse_type(name: &str) -> Option<Type> {
    match name.to_ascii_lowercase().as_str() {
        "normal" => Some(Type::Normal),
        "fighting" => Some(Type::Fighting),
        "flying" => Some(Type::Flying),
        "poison" => Some(Type::Poison),
        "ground" => Some(Type::Ground),
        "rock" => Some(Type::Rock),
        "bug" => Some(Type::Bug),
        "ghost" => Some(Type::Ghost),
        "steel" => Some(Type::Steel),
        "fire" => Some(Type::Fire),
        "water" => Some(Type::Water),
        "grass" => Some(Type::Grass),
        "electric" => Some(Type::Electric),
        "psychic" => Some(Type::Psychic),
        "ice" => Some(Type::Ice),
        "dragon" => Some(Type::Dragon),
        "dark" => Some(Type::Dark),
        "fairy" => Some(Type::Fairy),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_effectiveness() {
        assert_eq!(effectiveness_against(Type::Ice, Type::Dragon), 2.0);
        assert_eq!(effectiveness_against(Type::Electric, Type::Ground), 0.0);
        assert_eq!(effectiveness_against(Type::Fire, Type::Water), 0.5);
    }

    #[test]
    fn test_dual_effectiveness_product() {
        // Electric vs Water/Flying is 4x
        assert_eq!(effectiveness(Type::Electric, [Type::Water, Type::Flying]), 4.0);
        // Ground vs Flying is immune regardless of the other type
        assert_eq!(effectiveness(Type::Ground, [Type::Flying, Type::Rock]), 0.0);
    }

    #[test]
    fn test_mono_typed_uses_neutral_second_slot() {
        assert_eq!(effectiveness(Type::Water, [Type::Fire, Type::NoType]), 2.0);
        assert_eq!(effectiveness(Type::NoType, [Type::Ghost, Type::NoType]), 1.0);
    }

    #[test]
    fn test_parse_type_is_case_insensitive() {
        assert_eq!(parse_type("FIRE"), Some(Type::Fire));
        assert_eq!(parse_type("fairy"), Some(Type::Fairy));
        assert_eq!(parse_type("???"), None);
    }
}
