//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::numeric::{is_over_threshold, saturating_sum};

/// Stable identifier assigned to a player when it joins the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scoreboard participant and its per-round scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Identifier that survives renames.
    pub id: PlayerId,
    /// Display name (not required to be unique).
    pub name: String,
    /// Score entered for each round, in order.
    pub scores: Vec<i64>,
}

impl Player {
    /// Create a player with no recorded rounds.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scores: Vec::new(),
        }
    }

    /// Sum of all recorded rounds.
    pub fn total(&self) -> i64 {
        saturating_sum(self.scores.iter().copied())
    }

    /// Whether the player's total has reached the threshold.
    pub fn is_out(&self) -> bool {
        is_over_threshold(self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_and_threshold() {
        let mut player = Player::new(PlayerId(1), "Ada");
        assert_eq!(player.total(), 0);
        assert!(!player.is_out());

        player.scores = vec![100, 100];
        assert_eq!(player.total(), 200);
        assert!(!player.is_out());

        player.scores.push(1);
        assert!(player.is_out());
    }

    #[test]
    fn player_id_serializes_as_number() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&PlayerId(7))?, "7");
        let id: PlayerId = serde_json::from_str("12")?;
        assert_eq!(id, PlayerId(12));
        Ok(())
    }
}
