//! Players x rounds scoreboard state.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::SnapshotError,
    mirror::{Persisted, StoredValues},
    models::{Player, PlayerId},
};

/// Storage key for the ordered player list.
pub const PLAYERS_KEY: &str = "players";
/// Storage key for the per-player score sequences.
pub const SCORES_KEY: &str = "scores";

/// Result of trying to record a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// The score was stored.
    Recorded,
    /// The player already reached the threshold; nothing changed.
    Locked,
    /// No player has the given id.
    UnknownPlayer,
    /// The round index is past the blank entry row.
    NoSuchRound,
}

impl ScoreOutcome {
    /// Whether the scoreboard changed.
    pub fn is_recorded(self) -> bool {
        matches!(self, ScoreOutcome::Recorded)
    }
}

/// Ordered players and their scores.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    players: Vec<Player>,
    last_id: u64,
}

impl PartialEq for Scoreboard {
    fn eq(&self, other: &Self) -> bool {
        self.players == other.players
    }
}

impl Eq for Scoreboard {}

impl Scoreboard {
    /// Create an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Players in display order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players have been added.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Display position of a player.
    pub fn position(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    /// Append a player with an empty score history.
    ///
    /// Blank names are ignored. Duplicate names are allowed; each player gets
    /// its own id and scores. Returns `None` once the id space is exhausted.
    pub fn add_player(&mut self, name: &str) -> Option<PlayerId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let Some(next) = self.last_id.checked_add(1) else {
            warn!(last_id = self.last_id, "No player ids left");
            return None;
        };
        self.last_id = next;
        let id = PlayerId(next);
        self.players.push(Player::new(id, name));
        debug!(%id, name, "Player added");
        Some(id)
    }

    /// Record a score for the next round of `id`.
    pub fn add_score(&mut self, id: PlayerId, value: i64) -> ScoreOutcome {
        let Some(player) = self.player_mut(id) else {
            return ScoreOutcome::UnknownPlayer;
        };
        if player.is_out() {
            return ScoreOutcome::Locked;
        }
        player.scores.push(value);
        ScoreOutcome::Recorded
    }

    /// Rename a player. Blank or unchanged names are ignored.
    pub fn edit_player(&mut self, id: PlayerId, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return false;
        }
        match self.player_mut(id) {
            Some(player) if player.name != new_name => {
                player.name = new_name.to_string();
                true
            }
            _ => false,
        }
    }

    /// Overwrite the score of an existing round.
    ///
    /// Writing to the blank row just past the last round records a new score
    /// and is subject to the same threshold rule as [`Scoreboard::add_score`].
    pub fn edit_score(&mut self, id: PlayerId, round: usize, value: i64) -> ScoreOutcome {
        let Some(rounds) = self.player(id).map(|player| player.scores.len()) else {
            return ScoreOutcome::UnknownPlayer;
        };
        if round == rounds {
            return self.add_score(id, value);
        }
        match self.player_mut(id) {
            Some(player) if round < rounds => {
                player.scores[round] = value;
                ScoreOutcome::Recorded
            }
            _ => ScoreOutcome::NoSuchRound,
        }
    }

    /// Remove a player together with its scores.
    pub fn delete_player(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let removed = self.players.remove(index);
        debug!(%id, name = %removed.name, "Player deleted");
        true
    }

    /// Clear every player's scores, keeping names and order.
    pub fn new_game(&mut self) -> bool {
        let mut changed = false;
        for player in &mut self.players {
            if !player.scores.is_empty() {
                player.scores.clear();
                changed = true;
            }
        }
        changed
    }

    /// Sum of a player's scores, or zero for unknown ids.
    pub fn calculate_total(&self, id: PlayerId) -> i64 {
        self.player(id).map(Player::total).unwrap_or(0)
    }

    /// Whether the player has reached the threshold.
    pub fn is_out(&self, id: PlayerId) -> bool {
        self.player(id).map(Player::is_out).unwrap_or(false)
    }

    /// Score of `id` in `round`, if recorded.
    pub fn round_score(&self, id: PlayerId, round: usize) -> Option<i64> {
        self.player(id)
            .and_then(|player| player.scores.get(round).copied())
    }

    /// Rows to render: one more than the longest history, at least one.
    pub fn row_count(&self) -> usize {
        self.players
            .iter()
            .map(|player| player.scores.len() + 1)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    fn from_players(players: Vec<Player>) -> Self {
        let last_id = players.iter().map(|player| player.id.0).max().unwrap_or(0);
        Self { players, last_id }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerRecord {
    id: PlayerId,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlayersRecord {
    Current(Vec<PlayerRecord>),
    /// Name-keyed list written by the browser scoreboard.
    Legacy(Vec<String>),
}

impl Persisted for Scoreboard {
    const KEYS: &'static [&'static str] = &[PLAYERS_KEY, SCORES_KEY];

    fn encode(&self) -> Result<Vec<(&'static str, String)>, SnapshotError> {
        let players: Vec<PlayerRecord> = self
            .players
            .iter()
            .map(|player| PlayerRecord {
                id: player.id,
                name: player.name.clone(),
            })
            .collect();
        let scores: BTreeMap<String, &Vec<i64>> = self
            .players
            .iter()
            .map(|player| (player.id.to_string(), &player.scores))
            .collect();

        let players = serde_json::to_string(&players).map_err(|source| SnapshotError::Encode {
            key: PLAYERS_KEY,
            source,
        })?;
        let scores = serde_json::to_string(&scores).map_err(|source| SnapshotError::Encode {
            key: SCORES_KEY,
            source,
        })?;
        Ok(vec![(PLAYERS_KEY, players), (SCORES_KEY, scores)])
    }

    fn decode(values: &StoredValues) -> Result<Self, SnapshotError> {
        let players = values.parse::<PlayersRecord>(PLAYERS_KEY)?;
        let mut scores = values
            .parse::<HashMap<String, Vec<i64>>>(SCORES_KEY)?
            .unwrap_or_default();

        let players = match players {
            None => Vec::new(),
            Some(PlayersRecord::Current(records)) => {
                let mut seen = HashSet::new();
                let mut players = Vec::with_capacity(records.len());
                for record in records {
                    if !seen.insert(record.id) {
                        return Err(SnapshotError::Inconsistent(format!(
                            "player id {} appears more than once",
                            record.id
                        )));
                    }
                    let history = scores.remove(&record.id.to_string()).ok_or_else(|| {
                        SnapshotError::Inconsistent(format!(
                            "no scores stored for player {}",
                            record.id
                        ))
                    })?;
                    players.push(Player {
                        id: record.id,
                        name: record.name,
                        scores: history,
                    });
                }
                players
            }
            Some(PlayersRecord::Legacy(names)) => {
                let mut players = Vec::with_capacity(names.len());
                for (index, name) in names.into_iter().enumerate() {
                    let history = scores.get(&name).cloned().ok_or_else(|| {
                        SnapshotError::Inconsistent(format!("no scores stored for '{name}'"))
                    })?;
                    players.push(Player {
                        id: PlayerId(index as u64 + 1),
                        name,
                        scores: history,
                    });
                }
                for player in &players {
                    scores.remove(&player.name);
                }
                players
            }
        };

        if let Some(orphan) = scores.keys().next() {
            return Err(SnapshotError::Inconsistent(format!(
                "scores stored for unknown player '{orphan}'"
            )));
        }

        Ok(Self::from_players(players))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mirror::{Mirror, RestoreOutcome},
        numeric::THRESHOLD,
        store::{KeyValueStore, MemoryStore},
    };

    fn board_with(names: &[&str]) -> (Scoreboard, Vec<PlayerId>) {
        let mut board = Scoreboard::new();
        let ids = names
            .iter()
            .map(|name| board.add_player(name).expect("player added"))
            .collect();
        (board, ids)
    }

    #[test]
    fn add_player_appends_with_empty_scores() {
        let (board, ids) = board_with(&["Ada", "Brian", "Cleo"]);
        assert_eq!(board.len(), 3);
        for (player, id) in board.players().iter().zip(&ids) {
            assert_eq!(player.id, *id);
            assert!(player.scores.is_empty());
        }
        assert_eq!(board.players()[1].name, "Brian");
    }

    #[test]
    fn blank_names_are_ignored() {
        let mut board = Scoreboard::new();
        assert_eq!(board.add_player(""), None);
        assert_eq!(board.add_player("   "), None);
        assert!(board.is_empty());
        assert_eq!(board.row_count(), 1);
    }

    #[test]
    fn duplicate_names_get_distinct_ids() {
        let (mut board, ids) = board_with(&["Sam", "Sam"]);
        assert_ne!(ids[0], ids[1]);
        board.add_score(ids[0], 30);
        assert_eq!(board.calculate_total(ids[0]), 30);
        assert_eq!(board.calculate_total(ids[1]), 0);
    }

    #[test]
    fn add_score_is_blocked_at_threshold() {
        let (mut board, ids) = board_with(&["Ada"]);
        let id = ids[0];
        assert_eq!(board.add_score(id, THRESHOLD), ScoreOutcome::Recorded);
        assert!(board.is_out(id));

        assert_eq!(board.add_score(id, 5), ScoreOutcome::Locked);
        assert_eq!(board.calculate_total(id), THRESHOLD);
        assert_eq!(board.player(id).map(|p| p.scores.len()), Some(1));
    }

    #[test]
    fn negative_scores_can_bring_total_back_under() {
        let (mut board, ids) = board_with(&["Ada"]);
        let id = ids[0];
        board.add_score(id, 150);
        board.add_score(id, 60);
        assert!(board.is_out(id));
        assert_eq!(board.edit_score(id, 1, -20), ScoreOutcome::Recorded);
        assert_eq!(board.calculate_total(id), 130);
        assert_eq!(board.add_score(id, 10), ScoreOutcome::Recorded);
    }

    #[test]
    fn edit_score_updates_total() {
        let (mut board, ids) = board_with(&["Ada"]);
        let id = ids[0];
        board.add_score(id, 10);
        board.add_score(id, 20);
        assert_eq!(board.edit_score(id, 0, 15), ScoreOutcome::Recorded);
        assert_eq!(board.calculate_total(id), 35);
        assert_eq!(board.calculate_total(id), 35);
        assert_eq!(board.round_score(id, 0), Some(15));
    }

    #[test]
    fn edit_score_on_blank_row_appends() {
        let (mut board, ids) = board_with(&["Ada"]);
        let id = ids[0];
        assert_eq!(board.edit_score(id, 0, 40), ScoreOutcome::Recorded);
        assert_eq!(board.edit_score(id, 3, 40), ScoreOutcome::NoSuchRound);
        assert_eq!(board.player(id).map(|p| p.scores.clone()), Some(vec![40]));
    }

    #[test]
    fn edit_player_keeps_scores() {
        let (mut board, ids) = board_with(&["Ada", "Brian"]);
        board.add_score(ids[0], 42);

        assert!(board.edit_player(ids[0], "Adeline"));
        assert_eq!(board.len(), 2);
        let player = board.player(ids[0]).expect("player exists");
        assert_eq!(player.name, "Adeline");
        assert_eq!(player.scores, vec![42]);
        assert_eq!(board.position(ids[0]), Some(0));

        assert!(!board.edit_player(ids[0], "Adeline"));
        assert!(!board.edit_player(ids[0], "  "));
        assert!(board.edit_player(ids[1], "Adeline"));
        assert_eq!(board.calculate_total(ids[1]), 0);
    }

    #[test]
    fn delete_player_removes_scores() {
        let (mut board, ids) = board_with(&["Ada", "Brian"]);
        board.add_score(ids[0], 10);
        assert!(board.delete_player(ids[0]));
        assert!(!board.delete_player(ids[0]));
        assert_eq!(board.len(), 1);
        assert_eq!(board.player(ids[0]), None);
        assert_eq!(board.add_score(ids[0], 1), ScoreOutcome::UnknownPlayer);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (mut board, ids) = board_with(&["Ada", "Brian"]);
        board.delete_player(ids[1]);
        let fresh = board.add_player("Cleo").expect("player added");
        assert!(fresh > ids[1]);
    }

    #[test]
    fn new_game_clears_scores_and_keeps_players() {
        let (mut board, ids) = board_with(&["Ada", "Brian"]);
        board.add_score(ids[0], 10);
        board.add_score(ids[1], 300);
        assert!(board.new_game());
        assert_eq!(board.len(), 2);
        assert!(board.players().iter().all(|p| p.scores.is_empty()));
        assert!(!board.is_out(ids[1]));
        assert!(!board.new_game());
    }

    #[test]
    fn row_count_tracks_longest_history() {
        let (mut board, ids) = board_with(&["Ada", "Brian"]);
        assert_eq!(board.row_count(), 1);
        board.add_score(ids[1], 5);
        board.add_score(ids[1], 5);
        board.add_score(ids[0], 5);
        assert_eq!(board.row_count(), 3);
    }

    #[test]
    fn exhausted_ids_refuse_new_players() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.set(PLAYERS_KEY, r#"[{"id":18446744073709551615,"name":"A"}]"#)?;
        store.set(SCORES_KEY, r#"{"18446744073709551615":[]}"#)?;
        let mut mirror = Mirror::restore(store.clone(), Scoreboard::new())?;
        assert_eq!(mirror.outcome(), &RestoreOutcome::Restored);

        let applied = mirror.update_with(|board| board.add_player("B"), Option::is_some)?;
        assert_eq!(applied.value, None);
        assert!(!applied.written);
        assert_eq!(mirror.state().len(), 1);
        assert_eq!(
            store.get(SCORES_KEY)?.as_deref(),
            Some(r#"{"18446744073709551615":[]}"#)
        );
        Ok(())
    }

    #[test]
    fn end_to_end_totals() {
        let (mut board, ids) = board_with(&["A", "B"]);
        let (a, b) = (ids[0], ids[1]);
        board.add_score(a, 50);
        board.add_score(a, 60);
        board.add_score(b, 100);
        board.add_score(b, 110);

        assert_eq!(board.calculate_total(a), 110);
        assert_eq!(board.calculate_total(b), 210);
        assert!(!board.is_out(a));
        assert!(board.is_out(b));
        assert_eq!(board.add_score(b, 5), ScoreOutcome::Locked);
        assert_eq!(board.calculate_total(b), 210);
    }
}
