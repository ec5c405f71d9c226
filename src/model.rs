//! Serde input model: team files describing species, moves, and builds.
//! Only data crosses this boundary; abilities and items deserialize as names
//! with empty hook tables, and callers wire real hook tables up in code.

use crate::data::moves::{Move, MoveCategory};
use crate::data::types::{parse_type, Type};
use crate::sim::pokemon::{Ability, Gender, Item, Pokemon, SpeciesData};
use crate::sim::stats::BaseStats;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesSpec {
    pub name: String,
    /// hp, atk, def, spa, spd, spe
    pub base_stats: [u16; 6],
    pub types: Vec<String>,
    #[serde(default)]
    pub weight: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoveSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub category: String,
    #[serde(default)]
    pub power: u16,
    #[serde(default = "default_pp")]
    pub pp: u8,
    /// `null` means the move cannot miss.
    #[serde(default = "default_accuracy")]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub priority: i8,
}

fn default_pp() -> u8 {
    16
}

fn default_accuracy() -> Option<u8> {
    Some(100)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PokemonSpec {
    pub species: SpeciesSpec,
    #[serde(default = "default_level")]
    pub level: u8,
    pub moves: Vec<MoveSpec>,
    #[serde(default)]
    pub ability: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub evs: Option<[u8; 6]>,
    #[serde(default)]
    pub ivs: Option<[u8; 6]>,
}

fn default_level() -> u8 {
    100
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamsFile {
    pub team_a: Vec<PokemonSpec>,
    pub team_b: Vec<PokemonSpec>,
}

impl SpeciesSpec {
    pub fn build(&self) -> Result<SpeciesData> {
        let mut types = [Type::NoType; 2];
        if self.types.is_empty() || self.types.len() > 2 {
            return Err(anyhow!("species '{}' must have 1 or 2 types", self.name));
        }
        for (i, name) in self.types.iter().enumerate() {
            types[i] = parse_type(name)
                .ok_or_else(|| anyhow!("unknown type '{}' on species '{}'", name, self.name))?;
        }
        Ok(SpeciesData {
            name: self.name.clone(),
            base_stats: BaseStats {
                hp: self.base_stats[0],
                atk: self.base_stats[1],
                def: self.base_stats[2],
                spa: self.base_stats[3],
                spd: self.base_stats[4],
                spe: self.base_stats[5],
            },
            types,
            weight: self.weight,
        })
    }
}

impl MoveSpec {
    pub fn build(&self) -> Result<Move> {
        let typ = parse_type(&self.typ)
            .ok_or_else(|| anyhow!("unknown type '{}' on move '{}'", self.typ, self.name))?;
        let category = match self.category.to_ascii_lowercase().as_str() {
            "physical" => MoveCategory::Physical,
            "special" => MoveCategory::Special,
            "status" => MoveCategory::Status,
            other => return Err(anyhow!("unknown category '{}' on move '{}'", other, self.name)),
        };
        let mut mv = Move::new(&self.name, typ, category, self.power, self.pp);
        mv.accuracy = self.accuracy;
        mv.priority = self.priority;
        Ok(mv)
    }
}

impl PokemonSpec {
    pub fn build(&self) -> Result<Pokemon> {
        let species = self.species.build()?;
        let moves = self
            .moves
            .iter()
            .map(|m| m.build())
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("bad moveset on '{}'", self.species.name))?;
        let ability = self
            .ability
            .as_deref()
            .map(|name| Ability::new(name, &crate::sim::effect::Hooks::NONE))
            .unwrap_or_else(Ability::none);
        let item = self
            .item
            .as_deref()
            .map(|name| Item::new(name, &crate::sim::effect::Hooks::NONE));
        let gender = match self.gender.as_deref() {
            Some("M") | Some("m") => Some(Gender::Male),
            Some("F") | Some("f") => Some(Gender::Female),
            _ => None,
        };
        Pokemon::with_spread(species, self.level, moves, ability, item, gender, self.evs, self.ivs)
    }
}

pub fn build_team(specs: &[PokemonSpec]) -> Result<Vec<Pokemon>> {
    specs.iter().map(|spec| spec.build()).collect()
}

pub fn load_teams(path: &Path) -> Result<TeamsFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read teams file at {}", path.display()))?;
    parse_teams(&raw)
}

pub fn parse_teams(raw: &str) -> Result<TeamsFile> {
    serde_json::from_str(raw).context("failed to parse teams JSON")
}
