// Analysis module - DSP and inference stages of the cry classification pipeline
//
// Architecture:
// - fft: radix-2 transform engine
// - features: MfccExtractor (SampleStream → FeatureVector)
// - classifier: InferenceAdapter (FeatureVector → ClassificationResult)
//
// Both stages are pure CPU work and may run off the capture thread.

pub mod classifier;
pub mod features;
pub mod fft;

pub use classifier::{softmax, InferenceAdapter, InputPackingPolicy};
pub use features::{FeatureVector, MfccExtractor};
pub use fft::Fft;

/// Probability assigned to one label
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Decoded model output for one utterance
///
/// `scores` holds every class ranked by descending probability and sums to
/// one. `label` and `confidence` repeat the top entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f32,
    pub scores: Vec<LabelScore>,
}

impl ClassificationResult {
    /// Build a result from scores already sorted in descending order
    ///
    /// Returns `None` when `scores` is empty.
    pub fn from_ranked(scores: Vec<LabelScore>) -> Option<Self> {
        let top = scores.first()?;
        Some(Self {
            label: top.label.clone(),
            confidence: top.probability,
            scores,
        })
    }

    /// Probability for `label`, if the model emitted it
    pub fn probability_of(&self, label: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.probability)
    }
}
