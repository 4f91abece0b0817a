use ndarray::ArrayView2;
use std::time::Duration;
use thiserror::Error;
use web_time::Instant;

use crate::{
    consensus::{AggregationPolicy, StudyVerdict, VoteRecord, aggregate},
    enums::Label,
    sampler::{SlicePlan, plan_slices},
    volume::Volume,
};

#[derive(Debug, Error)]
#[error("Classifier failed: {0}")]
pub struct ClassifierError(pub String);

/// Per-slice classification capability supplied by the caller.
///
/// Slices are passed in calibrated units; any display windowing the model
/// expects is the implementor's concern. Implementations are shared
/// between archives processed in parallel, so they must tolerate
/// concurrent calls.
pub trait SliceClassifier: Sync {
    fn classify(&self, slice: ArrayView2<'_, f32>) -> Result<Label, ClassifierError>;

    /// Classify several slices; one result per input, in order.
    fn classify_batch(&self, slices: &[ArrayView2<'_, f32>]) -> Vec<Result<Label, ClassifierError>> {
        slices.iter().map(|slice| self.classify(slice.view())).collect()
    }
}

#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub plan: SlicePlan,
    pub votes: VoteRecord,
    pub verdict: StudyVerdict,
    pub processing_time: Duration,
}

/// Sample `volume`, classify the sampled slices and aggregate the votes.
///
/// A slice whose classification fails is logged and left out of the vote
/// record.
pub fn run_inference(
    volume: &Volume,
    classifier: &dyn SliceClassifier,
    policy: &AggregationPolicy,
) -> InferenceResult {
    let start = Instant::now();
    let depth = volume.depth();
    let plan = plan_slices(depth);
    log::info!(
        "Inference started for {depth} slices, {} sampled",
        plan.len()
    );

    let slices: Vec<_> = plan.iter().filter_map(|index| volume.slice(index)).collect();
    let labels = classifier.classify_batch(&slices);
    if labels.len() != slices.len() {
        log::warn!(
            "Classifier returned {} results for {} slices, unmatched slices get no vote",
            labels.len(),
            slices.len()
        );
    }

    let mut votes = VoteRecord::new();
    for (index, label) in plan.iter().zip(labels) {
        match label {
            Ok(label) => votes.insert(index, label),
            Err(err) => log::warn!("Slice {index}: {err}"),
        }
    }

    let verdict = aggregate(&votes, depth, policy);
    let processing_time = start.elapsed();
    log::info!(
        "Inference finished in {:.2}s, probability {:.4}",
        processing_time.as_secs_f32(),
        verdict.probability
    );

    InferenceResult {
        plan,
        votes,
        verdict,
        processing_time,
    }
}
