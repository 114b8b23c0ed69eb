//! Turn continuation across the sequential rounds of one task.
//!
//! - [`turn_state::TurnState`]: accumulated content and last turn number
//! - [`parsing`]: reported-turn parsing and the turn marker fallback

pub mod parsing;
pub mod turn_state;
