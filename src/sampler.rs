//! Sparse, deterministic choice of slices to send to the classifier.
//!
//! Deeper studies are sub-sampled more aggressively. The two middle
//! quartiles are sampled at twice the density of the outer ones.

use std::collections::BTreeSet;

/// Ascending, deduplicated slice indices. Contains `depth - 1` for any
/// non-empty volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan(Vec<usize>);

impl SlicePlan {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

/// Sampling stride for a volume of `depth` slices.
pub fn select_step(depth: usize) -> usize {
    match depth {
        0..50 => 1,
        50..100 => 2,
        100..200 => 4,
        200..400 => 6,
        400..600 => 8,
        _ => 10,
    }
}

/// Slice indices to classify for a volume of `depth` slices.
pub fn plan_slices(depth: usize) -> SlicePlan {
    let step = select_step(depth);
    let half_step = (step / 2).max(1);
    let (q1, q2, q3) = (depth / 4, depth / 2, 3 * depth / 4);

    let mut indices: BTreeSet<usize> = (0..q1).step_by(step).collect();
    indices.extend((q1..q2).step_by(half_step));
    indices.extend((q2..q3).step_by(half_step));
    indices.extend((q3..depth).step_by(step));
    if depth > 0 {
        indices.insert(depth - 1);
    }

    SlicePlan(indices.into_iter().collect())
}
