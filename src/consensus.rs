//! Study-level decision from sparse per-slice votes.
//!
//! Two policies are available:
//!
//! - [`AggregationPolicy::SimpleThreshold`]: the share of anomaly votes
//!   among decisive (normal or anomaly) votes is compared against a
//!   threshold.
//! - [`AggregationPolicy::ConsensusRun`]: anomaly votes only count when
//!   they form a run of nearby sampled slices, which suppresses isolated
//!   false positives.
//!
//! Both produce a mask over every slice of the volume. Positive sampled
//! slices are widened by one slice on each side to make up for the gaps
//! between sampled indices.

use std::collections::BTreeMap;

use crate::enums::Label;

pub const DEFAULT_THRESHOLD: f32 = 0.1;
pub const DEFAULT_MIN_GROUP_SIZE: usize = 2;
pub const DEFAULT_MAX_GAP: usize = 2;

/// Labels of the sampled slices, keyed by slice index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteRecord(BTreeMap<usize, Label>);

impl VoteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, label: Label) {
        self.0.insert(index, label);
    }

    pub fn get(&self, index: usize) -> Option<Label> {
        self.0.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Votes in ascending slice order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Label)> + '_ {
        self.0.iter().map(|(&index, &label)| (index, label))
    }

    fn within(&self, depth: usize) -> impl Iterator<Item = (usize, Label)> + '_ {
        self.iter().filter(move |&(index, _)| index < depth)
    }
}

impl FromIterator<(usize, Label)> for VoteRecord {
    fn from_iter<I: IntoIterator<Item = (usize, Label)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregationPolicy {
    /// Positive when `anomaly / (anomaly + normal) >= threshold`.
    SimpleThreshold { threshold: f32 },

    /// Positive when at least `min_group_size` anomaly votes lie in one
    /// run, where consecutive anomaly indices at most `max_gap` apart
    /// belong to the same run.
    ConsensusRun { min_group_size: usize, max_gap: usize },
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy::SimpleThreshold {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl AggregationPolicy {
    /// Consensus-run policy with default group size and gap.
    pub fn consensus_run() -> Self {
        AggregationPolicy::ConsensusRun {
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
            max_gap: DEFAULT_MAX_GAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyVerdict {
    pub probability: f32,
    pub has_pathology: bool,
    /// One flag per slice of the volume, not only the sampled ones.
    pub positive_slice_mask: Vec<bool>,
}

impl StudyVerdict {
    fn negative(depth: usize, probability: f32) -> Self {
        Self {
            probability,
            has_pathology: false,
            positive_slice_mask: vec![false; depth],
        }
    }

    /// Indices flagged in the mask.
    pub fn positive_slices(&self) -> impl Iterator<Item = usize> + '_ {
        self.positive_slice_mask
            .iter()
            .enumerate()
            .filter_map(|(index, &positive)| positive.then_some(index))
    }
}

/// Turn sampled slice votes into a study verdict for a volume of `depth`
/// slices. Votes at indices outside the volume are ignored.
pub fn aggregate(votes: &VoteRecord, depth: usize, policy: &AggregationPolicy) -> StudyVerdict {
    match *policy {
        AggregationPolicy::SimpleThreshold { threshold } => {
            aggregate_with_threshold(votes, depth, threshold)
        }
        AggregationPolicy::ConsensusRun {
            min_group_size,
            max_gap,
        } => aggregate_runs(votes, depth, min_group_size, max_gap),
    }
}

/// Simple-threshold aggregation.
pub fn aggregate_with_threshold(votes: &VoteRecord, depth: usize, threshold: f32) -> StudyVerdict {
    let (anomaly, normal) = count_decisive(votes, depth);
    let probability = ratio(anomaly, anomaly + normal);

    if probability < threshold {
        return StudyVerdict::negative(depth, probability);
    }

    let mut mask = vec![false; depth];
    for (index, label) in votes.within(depth) {
        if label == Label::Anomaly {
            dilate(&mut mask, index);
        }
    }

    StudyVerdict {
        probability,
        has_pathology: true,
        positive_slice_mask: mask,
    }
}

fn aggregate_runs(
    votes: &VoteRecord,
    depth: usize,
    min_group_size: usize,
    max_gap: usize,
) -> StudyVerdict {
    let (anomaly, normal) = count_decisive(votes, depth);
    let positives: Vec<usize> = votes
        .within(depth)
        .filter(|&(_, label)| label == Label::Anomaly)
        .map(|(index, _)| index)
        .collect();

    let surviving: Vec<&[usize]> = positives
        .chunk_by(|a, b| b - a <= max_gap)
        .filter(|run| run.len() >= min_group_size)
        .collect();

    let confirmed: usize = surviving.iter().map(|run| run.len()).sum();
    let probability = ratio(confirmed, anomaly + normal);
    log::debug!(
        "{} of {} anomaly votes confirmed by runs of at least {min_group_size}",
        confirmed,
        positives.len()
    );

    if surviving.is_empty() {
        return StudyVerdict::negative(depth, probability);
    }

    let mut mask = vec![false; depth];
    for &index in surviving.iter().flat_map(|run| run.iter()) {
        dilate(&mut mask, index);
    }

    StudyVerdict {
        probability,
        has_pathology: true,
        positive_slice_mask: mask,
    }
}

fn count_decisive(votes: &VoteRecord, depth: usize) -> (usize, usize) {
    votes
        .within(depth)
        .fold((0, 0), |(anomaly, normal), (_, label)| match label {
            Label::Anomaly => (anomaly + 1, normal),
            Label::Normal => (anomaly, normal + 1),
            Label::Unknown => (anomaly, normal),
        })
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

/// Flag `index` and its two neighbours, clamped to the mask.
fn dilate(mask: &mut [bool], index: usize) {
    let Some(end) = mask.len().checked_sub(1) else {
        return;
    };
    let start = index.saturating_sub(1);
    let stop = (index + 1).min(end);
    for flag in mask.iter_mut().take(stop + 1).skip(start) {
        *flag = true;
    }
}
