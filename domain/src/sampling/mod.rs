//! Combination sampling for batch planning.

pub mod combination;
