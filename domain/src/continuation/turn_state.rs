//! Per-task turn continuation state.

use crate::continuation::parsing::{last_turn_marker, parse_reported_turn};
use serde::{Deserialize, Serialize};

/// Blank line placed between the content of consecutive rounds.
pub const ROUND_SEPARATOR: &str = "\n\n";

/// Where a round's final turn number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSource {
    /// The generator reported a parseable final turn
    Reported,
    /// Recovered from the last turn marker in the round's text
    ContentScan,
    /// Nothing usable found; the previous turn number was kept
    Unchanged,
    /// A number was found but it was lower than the previous one, which was kept
    Regressed,
}

/// Resolve a round's final turn number.
///
/// Tries the reported value first, then falls back to scanning `content`
/// for `marker`. Returns `None` when both fail.
pub fn resolve_final_turn(
    reported: Option<&str>,
    content: &str,
    marker: &str,
) -> Option<(u32, TurnSource)> {
    if let Some(turn) = reported.and_then(parse_reported_turn) {
        return Some((turn, TurnSource::Reported));
    }
    last_turn_marker(content, marker).map(|turn| (turn, TurnSource::ContentScan))
}

/// Continuation state carried across the rounds of one task.
///
/// Content only grows by appending, and the turn number never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnState {
    accumulated_content: String,
    last_turn_number: u32,
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated_content(&self) -> &str {
        &self.accumulated_content
    }

    pub fn last_turn_number(&self) -> u32 {
        self.last_turn_number
    }

    /// Prior interaction to hand to the next round (`None` before round 1).
    pub fn prior_content(&self) -> Option<&str> {
        if self.accumulated_content.is_empty() {
            None
        } else {
            Some(&self.accumulated_content)
        }
    }

    /// Fold one round into the state.
    ///
    /// Returns the turn number after the round and where it came from.
    pub fn apply_round(
        &mut self,
        content: &str,
        reported: Option<&str>,
        marker: &str,
    ) -> (u32, TurnSource) {
        self.append(content);

        match resolve_final_turn(reported, content, marker) {
            Some((turn, _)) if turn < self.last_turn_number => {
                (self.last_turn_number, TurnSource::Regressed)
            }
            Some((turn, source)) => {
                self.last_turn_number = turn;
                (turn, source)
            }
            None => (self.last_turn_number, TurnSource::Unchanged),
        }
    }

    pub fn into_parts(self) -> (String, u32) {
        (self.accumulated_content, self.last_turn_number)
    }

    /// Append one round's content verbatim.
    ///
    /// Only the join is normalized: earlier content gets topped up to end in
    /// exactly one blank line. An empty round leaves the content unchanged.
    fn append(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let acc = &mut self.accumulated_content;
        if !acc.is_empty() && !acc.ends_with(ROUND_SEPARATOR) {
            if acc.ends_with('\n') {
                acc.push('\n');
            } else {
                acc.push_str(ROUND_SEPARATOR);
            }
        }
        acc.push_str(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::parsing::DEFAULT_TURN_MARKER;

    #[test]
    fn test_initial_state() {
        let state = TurnState::new();
        assert_eq!(state.last_turn_number(), 0);
        assert_eq!(state.prior_content(), None);
    }

    #[test]
    fn test_reported_turn_replaces_number() {
        let mut state = TurnState::new();
        let applied = state.apply_round("Turn 1: hi\nTurn 2: bye", Some("2"), DEFAULT_TURN_MARKER);
        assert_eq!(applied, (2, TurnSource::Reported));
        assert_eq!(state.prior_content(), Some("Turn 1: hi\nTurn 2: bye"));
    }

    #[test]
    fn test_falls_back_to_content_scan() {
        let mut state = TurnState::new();
        let applied = state.apply_round("Turn 4: a\nTurn 5: b", Some("five"), DEFAULT_TURN_MARKER);
        assert_eq!(applied, (5, TurnSource::ContentScan));

        let applied = state.apply_round("Turn 6: c", None, DEFAULT_TURN_MARKER);
        assert_eq!(applied, (6, TurnSource::ContentScan));
    }

    #[test]
    fn test_unresolvable_turn_keeps_previous() {
        let mut state = TurnState::new();
        state.apply_round("Turn 3: a", Some("3"), DEFAULT_TURN_MARKER);
        let applied = state.apply_round("no markers at all", None, DEFAULT_TURN_MARKER);
        assert_eq!(applied, (3, TurnSource::Unchanged));
        assert_eq!(state.last_turn_number(), 3);
    }

    #[test]
    fn test_lower_turn_does_not_regress() {
        let mut state = TurnState::new();
        state.apply_round("x", Some("8"), DEFAULT_TURN_MARKER);
        let applied = state.apply_round("y", Some("2"), DEFAULT_TURN_MARKER);
        assert_eq!(applied, (8, TurnSource::Regressed));
        assert_eq!(state.last_turn_number(), 8);
    }

    #[test]
    fn test_separator_normalization() {
        let mut state = TurnState::new();
        state.apply_round("first", None, DEFAULT_TURN_MARKER);
        state.apply_round("second", None, DEFAULT_TURN_MARKER);
        assert_eq!(state.accumulated_content(), "first\n\nsecond");

        let mut state = TurnState::new();
        state.apply_round("first\n", None, DEFAULT_TURN_MARKER);
        state.apply_round("second", None, DEFAULT_TURN_MARKER);
        assert_eq!(state.accumulated_content(), "first\n\nsecond");

        let mut state = TurnState::new();
        state.apply_round("first\n\n", None, DEFAULT_TURN_MARKER);
        state.apply_round("second", None, DEFAULT_TURN_MARKER);
        assert_eq!(state.accumulated_content(), "first\n\nsecond");
    }

    #[test]
    fn test_monotonic_over_rounds() {
        let rounds = [
            ("Turn 1: a\nTurn 2: b", Some("2")),
            ("Turn 3: c", None),
            ("nothing", Some("??")),
            ("Turn 1: restart?", Some("1")),
            ("Turn 9: d", Some("9")),
        ];

        let mut state = TurnState::new();
        for (content, reported) in rounds {
            let before_turn = state.last_turn_number();
            let before_content = state.accumulated_content().to_string();

            state.apply_round(content, reported, DEFAULT_TURN_MARKER);

            assert!(state.last_turn_number() >= before_turn);
            assert!(state.accumulated_content().starts_with(&before_content));
            assert!(state.accumulated_content().len() > before_content.len());
        }
        assert_eq!(state.into_parts().1, 9);
    }

    #[test]
    fn test_round_content_is_kept_verbatim() {
        let mut state = TurnState::new();
        state.apply_round("first", None, DEFAULT_TURN_MARKER);
        state.apply_round("\r\n\nsecond\n", None, DEFAULT_TURN_MARKER);
        assert_eq!(state.accumulated_content(), "first\n\n\r\n\nsecond\n");
    }

    #[test]
    fn test_empty_round_leaves_content_unchanged() {
        let mut state = TurnState::new();
        state.apply_round("", Some("2"), DEFAULT_TURN_MARKER);
        assert_eq!(state.prior_content(), None);
        assert_eq!(state.last_turn_number(), 2);

        state.apply_round("Turn 3: a\n\n", None, DEFAULT_TURN_MARKER);
        let applied = state.apply_round("", None, DEFAULT_TURN_MARKER);
        assert_eq!(applied, (3, TurnSource::Unchanged));
        assert_eq!(state.accumulated_content(), "Turn 3: a\n\n");

        state.apply_round("Turn 4: b", None, DEFAULT_TURN_MARKER);
        assert_eq!(state.accumulated_content(), "Turn 3: a\n\nTurn 4: b");
    }
}
