//! Entity combination sampling.
//!
//! Picks `n` distinct `k`-combinations from a pool of entities.
//!
//! | Space `C(M,k)` | Strategy |
//! |----------------|----------|
//! | `≤ n` | every combination, in pool order (no randomness) |
//! | `≤ ENUMERATION_LIMIT` or `≤ 2n` | enumerate, partial shuffle, take `n` |
//! | larger | draw random `k`-subsets, reject duplicates |
//!
//! All strategies are uniform over the combination space and can never
//! return the same combination twice. Randomly drawn tuples keep the order
//! in which their members were selected.

use crate::batch::entities::BatchId;
use crate::batch::spec::BatchSpec;
use crate::batch::value_objects::TaskSpec;
use crate::core::entity::EntityId;
use crate::core::error::{DomainError, ValidationError};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Spaces up to this size are enumerated in full before sampling.
pub const ENUMERATION_LIMIT: u128 = 100_000;

/// Number of `k`-combinations of `m` items, saturating at `u128::MAX`.
pub fn combination_count(m: usize, k: usize) -> u128 {
    if k > m {
        return 0;
    }
    let k = k.min(m - k) as u128;
    let m = m as u128;
    let mut result: u128 = 1;
    for i in 0..k {
        // result * (m - i) is always divisible by (i + 1)
        result = match result.checked_mul(m - i) {
            Some(product) => product / (i + 1),
            None => return u128::MAX,
        };
    }
    result
}

/// Sample up to `n` distinct `k`-combinations from `pool`.
///
/// Returns `min(n, C(M,k))` tuples of length `k`. The pool is not modified.
///
/// # Errors
///
/// [`ValidationError::InvalidCombinationSize`] when `k` is zero or larger
/// than the pool.
pub fn sample_combinations<R: Rng + ?Sized>(
    pool: &[EntityId],
    k: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Vec<EntityId>>, DomainError> {
    let m = pool.len();
    if k == 0 || k > m {
        return Err(ValidationError::InvalidCombinationSize { size: k, pool: m }.into());
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let space = combination_count(m, k);
    let indices = if space <= n as u128 {
        all_index_combinations(m, k)
    } else if space <= ENUMERATION_LIMIT || space <= 2 * n as u128 {
        let mut all = all_index_combinations(m, k);
        let (chosen, _) = all.partial_shuffle(rng, n);
        chosen
            .iter_mut()
            .map(|combo| {
                combo.shuffle(rng);
                combo.clone()
            })
            .collect()
    } else {
        rejection_sample(m, k, n, rng)
    };

    Ok(indices
        .into_iter()
        .map(|combo| combo.into_iter().map(|i| pool[i].clone()).collect())
        .collect())
}

/// Sample combinations for a batch and number them as tasks `1..=n`.
pub fn plan_tasks<R: Rng + ?Sized>(
    batch_id: &BatchId,
    spec: &BatchSpec,
    rng: &mut R,
) -> Result<Vec<TaskSpec>, DomainError> {
    let combinations =
        sample_combinations(&spec.entities, spec.interaction_size, spec.task_count, rng)?;

    Ok(combinations
        .into_iter()
        .enumerate()
        .map(|(i, entities)| TaskSpec {
            batch_id: batch_id.clone(),
            sequence: i as u32 + 1,
            entities,
            context: spec.context.clone(),
            turns_per_round: spec.turns_per_round,
            rounds: spec.rounds_per_task,
        })
        .collect())
}

/// Every `k`-combination of `0..m` in lexicographic order.
fn all_index_combinations(m: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());

        // Rightmost position that can still be incremented
        let Some(i) = (0..k).rev().find(|&i| current[i] < m - k + i) else {
            return out;
        };
        current[i] += 1;
        for j in i + 1..k {
            current[j] = current[j - 1] + 1;
        }
    }
}

/// Draw random `k`-subsets until `n` distinct ones are collected.
///
/// Only used when the space is more than twice `n`, so each draw is a
/// duplicate with probability below one half.
fn rejection_sample<R: Rng + ?Sized>(m: usize, k: usize, n: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut seen: HashSet<Vec<usize>> = HashSet::with_capacity(n);
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let drawn = rand::seq::index::sample(rng, m, k).into_vec();
        let mut key = drawn.clone();
        key.sort_unstable();
        if seen.insert(key) {
            out.push(drawn);
        }
    }
    out
}
