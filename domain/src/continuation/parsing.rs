//! Turn number extraction for generated content.
//!
//! The generator is asked to report the final turn number of each round.
//! When that value is missing or unusable, the round's text is scanned for
//! the last turn marker (`Turn 7`, `[Turn 7]`, `turn #7:`). If neither
//! yields a number, callers keep the previous turn number.
//!
//! | Input | Result |
//! |-------|--------|
//! | reported `"12"` | `12` |
//! | reported `"twelve"`, text `"... Turn 9: ..."` | `9` |
//! | reported none, text without marker | none |

/// Marker word used when none is configured.
pub const DEFAULT_TURN_MARKER: &str = "turn";

/// Parse a generator-reported final turn value.
///
/// Accepts plain integers with surrounding whitespace, and integral floats
/// such as `"12.0"` (some services serialize every number as a float).
pub fn parse_reported_turn(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => Some(f as u32),
        _ => None,
    }
}

/// Find the number following the last turn marker in `content`.
///
/// Matching is ASCII case-insensitive and respects word boundaries, so
/// `"turns 4"` or `"return 5"` do not count. Between the marker and the
/// number, spaces, `#`, `:` and `.` are skipped.
pub fn last_turn_marker(content: &str, marker: &str) -> Option<u32> {
    let marker = marker.trim().to_ascii_lowercase();
    if marker.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets aligned with the original text
    let haystack = content.to_ascii_lowercase();
    let bytes = haystack.as_bytes();

    let mut last = None;
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&marker) {
        let start = from + pos;
        let end = start + marker.len();
        from = end;

        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }
        if bytes.get(end).is_some_and(|b| b.is_ascii_alphabetic()) {
            continue;
        }
        if let Some(number) = number_after(&haystack[end..]) {
            last = Some(number);
        }
    }
    last
}

fn number_after(rest: &str) -> Option<u32> {
    let rest = rest.trim_start_matches([' ', '\t', '#', ':', '.']);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse_reported_turn Tests ====================

    #[test]
    fn test_reported_plain_integer() {
        assert_eq!(parse_reported_turn("12"), Some(12));
        assert_eq!(parse_reported_turn("  7\n"), Some(7));
    }

    #[test]
    fn test_reported_integral_float() {
        assert_eq!(parse_reported_turn("12.0"), Some(12));
        assert_eq!(parse_reported_turn("12.5"), None);
    }

    #[test]
    fn test_reported_garbage() {
        assert_eq!(parse_reported_turn(""), None);
        assert_eq!(parse_reported_turn("twelve"), None);
        assert_eq!(parse_reported_turn("-3"), None);
    }

    // ==================== last_turn_marker Tests ====================

    #[test]
    fn test_marker_takes_last_occurrence() {
        let text = "Turn 1: Alice waves.\nTurn 2: Bob nods.\nTurn 3: Alice leaves.";
        assert_eq!(last_turn_marker(text, DEFAULT_TURN_MARKER), Some(3));
    }

    #[test]
    fn test_marker_formats() {
        assert_eq!(last_turn_marker("[Turn 7] hi", "turn"), Some(7));
        assert_eq!(last_turn_marker("TURN #8: hi", "turn"), Some(8));
        assert_eq!(last_turn_marker("turn: 9", "turn"), Some(9));
    }

    #[test]
    fn test_marker_word_boundaries() {
        assert_eq!(last_turn_marker("She took turns 4 times", "turn"), None);
        assert_eq!(last_turn_marker("No return 5 here", "turn"), None);
        assert_eq!(last_turn_marker("Turn 2 ... then turns 9", "turn"), Some(2));
    }

    #[test]
    fn test_marker_without_number_is_ignored() {
        assert_eq!(last_turn_marker("Turn 4: x. Your turn now.", "turn"), Some(4));
        assert_eq!(last_turn_marker("It is your turn.", "turn"), None);
    }

    #[test]
    fn test_custom_marker() {
        assert_eq!(last_turn_marker("Round 3 / Step 11", "step"), Some(11));
        assert_eq!(last_turn_marker("Turn 3", ""), None);
    }

    #[test]
    fn test_non_ascii_content() {
        assert_eq!(last_turn_marker("Ünïcode Turn 5 — café", "turn"), Some(5));
    }
}
