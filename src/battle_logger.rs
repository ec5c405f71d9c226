//! Showdown-protocol-style battle log.

use crate::sim::stats::Stat;
use serde_json::json;

#[derive(Clone, Debug, Default)]
pub struct BattleLogger {
    formatid: String,
    log: Vec<String>,
}

impl BattleLogger {
    pub fn new() -> Self {
        Self {
            formatid: "singlescustomgame".to_string(),
            log: Vec::new(),
        }
    }

    pub fn new_with_format(formatid: impl Into<String>) -> Self {
        Self {
            formatid: formatid.into(),
            log: Vec::new(),
        }
    }

    pub fn log_turn(&mut self, turn: usize) {
        self.log.push(format!("|turn|{turn}"));
    }

    pub fn log_move(&mut self, source: &str, move_id: &str, target: &str) {
        self.log.push(format!("|move|{source}|{move_id}|{target}"));
    }

    pub fn log_damage(&mut self, target: &str, hp: u16, max_hp: u16) {
        self.log.push(format!("|-damage|{target}|{hp}/{max_hp}"));
    }

    pub fn log_heal(&mut self, target: &str, hp: u16, max_hp: u16) {
        self.log.push(format!("|-heal|{target}|{hp}/{max_hp}"));
    }

    pub fn log_status(&mut self, target: &str, status: &str) {
        self.log.push(format!("|-status|{target}|{status}"));
    }

    pub fn log_cure_status(&mut self, target: &str) {
        self.log.push(format!("|-curestatus|{target}"));
    }

    pub fn log_switch(&mut self, pokemon: &str, species: &str, hp: u16, max_hp: u16) {
        self.log.push(format!("|switch|{pokemon}|{species}|{hp}/{max_hp}"));
    }

    pub fn log_faint(&mut self, pokemon: &str) {
        self.log.push(format!("|faint|{pokemon}"));
    }

    pub fn log_cant(&mut self, pokemon: &str, reason: &str) {
        self.log.push(format!("|cant|{pokemon}|{reason}"));
    }

    pub fn log_boost(&mut self, pokemon: &str, stat: Stat, amount: i8) {
        let stat_id = match stat {
            Stat::Atk => "atk",
            Stat::Def => "def",
            Stat::Spa => "spa",
            Stat::Spd => "spd",
            Stat::Spe => "spe",
            Stat::Acc => "accuracy",
            Stat::Evn => "evasion",
        };
        if amount > 0 {
            self.log.push(format!("|-boost|{pokemon}|{stat_id}|{amount}"));
        } else {
            self.log.push(format!("|-unboost|{pokemon}|{stat_id}|{}", -amount));
        }
    }

    pub fn log_crit(&mut self, target: &str) {
        self.log.push(format!("|-crit|{target}"));
    }

    pub fn log_miss(&mut self, source: &str) {
        self.log.push(format!("|-miss|{source}"));
    }

    pub fn log_immune(&mut self, target: &str) {
        self.log.push(format!("|-immune|{target}"));
    }

    pub fn log_weather(&mut self, weather: &str) {
        self.log.push(format!("|-weather|{weather}"));
    }

    pub fn log_end(&mut self, pokemon: &str, what: &str) {
        self.log.push(format!("|-end|{pokemon}|{what}"));
    }

    pub fn log_mega(&mut self, pokemon: &str) {
        self.log.push(format!("|-mega|{pokemon}"));
    }

    pub fn log_win(&mut self, winner: &str) {
        self.log.push(format!("|win|{winner}"));
    }

    pub fn log_tie(&mut self) {
        self.log.push("|tie|".to_string());
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "formatid": self.formatid,
            "log": self.log,
        })
    }
}

pub fn showdown_ident(side_idx: usize, species: &str) -> String {
    // singles only: p1a / p2a
    let side = if side_idx == 0 { "p1a" } else { "p2a" };
    format!("{side}: {species}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines_accumulate_in_order() {
        let mut logger = BattleLogger::new();
        logger.log_turn(1);
        logger.log_move("p1a: Crobat", "bravebird", "p2a: Hippowdon");
        logger.log_damage("p2a: Hippowdon", 150, 420);
        assert_eq!(logger.log_lines().len(), 3);
        assert_eq!(logger.log_lines()[0], "|turn|1");
        assert!(logger.log_lines()[2].starts_with("|-damage|"));
    }

    #[test]
    fn test_boost_and_unboost_lines() {
        let mut logger = BattleLogger::new();
        logger.log_boost("p1a: X", Stat::Atk, 2);
        logger.log_boost("p1a: X", Stat::Spe, -1);
        assert_eq!(logger.log_lines()[0], "|-boost|p1a: X|atk|2");
        assert_eq!(logger.log_lines()[1], "|-unboost|p1a: X|spe|1");
    }

    #[test]
    fn test_to_json_shape() {
        let mut logger = BattleLogger::new_with_format("test");
        logger.log_win("side-0");
        let value = logger.to_json();
        assert_eq!(value["formatid"], "test");
        assert_eq!(value["log"][0], "|win|side-0");
    }
}
