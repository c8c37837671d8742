// Classifier - inference adapter between MFCC features and a frozen model
//
// The adapter owns one engine created by an EngineFactory. At load time it
// inspects the engine's declared input shape and picks an InputPackingPolicy;
// every classify call packs the feature vector with that policy, runs one
// forward pass and decodes the raw scores:
//
// 1. Numerically stable softmax (subtract max, exponentiate, normalize)
// 2. Zip with the label table ("Other" for classes past its end)
// 3. Sort descending by probability
//
// Engine failures are surfaced as InferenceError::InferenceFailed with the
// engine's message. No retries.

use crate::analysis::features::FeatureVector;
use crate::analysis::{ClassificationResult, LabelScore};
use crate::config::OTHER_LABEL;
use crate::engine::{EngineFactory, InferenceEngine};
use crate::error::{log_inference_error, InferenceError};

/// How a feature vector is laid out in the engine's input tensor
///
/// Shapes below are written with their leading batch dimension, which is
/// always treated as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPackingPolicy {
    /// `[batch, features]`: copy, zero-pad or truncate to `features`
    Flat { features: usize },
    /// `[batch, time, 1]`: feature `i` becomes time step `i`
    TimeMajorSingleChannel { time: usize },
    /// `[batch, time, features]`: `tensor[t·F + f] = feature[(t·F + f) mod len]`
    GenericFlatten { time: usize, features: usize },
    /// Any other rank: flatten, zero-pad or truncate to `len`
    PadTruncate { len: usize },
}

impl InputPackingPolicy {
    /// Select the policy matching a declared input shape
    pub fn from_shape(shape: &[usize]) -> Self {
        match shape {
            [_, features] => InputPackingPolicy::Flat {
                features: *features,
            },
            [_, time, 1] => InputPackingPolicy::TimeMajorSingleChannel { time: *time },
            [_, time, features] => InputPackingPolicy::GenericFlatten {
                time: *time,
                features: *features,
            },
            [len] => InputPackingPolicy::PadTruncate { len: *len },
            _ => InputPackingPolicy::PadTruncate {
                len: shape.iter().skip(1).product(),
            },
        }
    }

    /// Number of values in the packed tensor
    pub fn tensor_len(&self) -> usize {
        match *self {
            InputPackingPolicy::Flat { features } => features,
            InputPackingPolicy::TimeMajorSingleChannel { time } => time,
            InputPackingPolicy::GenericFlatten { time, features } => time * features,
            InputPackingPolicy::PadTruncate { len } => len,
        }
    }

    /// Pack `features` into a tensor of `tensor_len()` values
    pub fn pack(&self, features: &[f32]) -> Vec<f32> {
        let len = self.tensor_len();
        match *self {
            InputPackingPolicy::GenericFlatten { .. } => {
                if features.is_empty() {
                    return vec![0.0; len];
                }
                (0..len).map(|i| features[i % features.len()]).collect()
            }
            InputPackingPolicy::Flat { .. }
            | InputPackingPolicy::TimeMajorSingleChannel { .. }
            | InputPackingPolicy::PadTruncate { .. } => {
                let mut tensor = vec![0.0; len];
                let n = len.min(features.len());
                tensor[..n].copy_from_slice(&features[..n]);
                tensor
            }
        }
    }
}

/// Numerically stable softmax
///
/// Subtracts the maximum before exponentiating, so large scores cannot
/// overflow. Empty input gives empty output.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

struct LoadedEngine<E> {
    engine: E,
    policy: InputPackingPolicy,
}

/// InferenceAdapter bridges feature vectors to a loaded engine
///
/// Lifecycle: `load` before `classify`; `release` is idempotent and also runs
/// on drop. `classify` takes `&mut self`, so concurrent callers must share
/// the adapter behind a lock.
pub struct InferenceAdapter<F: EngineFactory> {
    factory: F,
    labels: Vec<String>,
    loaded: Option<LoadedEngine<F::Engine>>,
}

impl<F: EngineFactory> InferenceAdapter<F> {
    /// Create an unloaded adapter with an ordered label table
    pub fn new(factory: F, labels: Vec<String>) -> Self {
        Self {
            factory,
            labels,
            loaded: None,
        }
    }

    /// Load a model, replacing any engine already loaded
    ///
    /// # Errors
    /// `InferenceError::ModelLoadFailed` if the factory rejects the bytes.
    pub fn load(&mut self, model_bytes: &[u8]) -> Result<(), InferenceError> {
        self.release();

        let mut engine = self
            .factory
            .load(model_bytes)
            .map_err(|e| InferenceError::ModelLoadFailed { reason: e.message })?;

        // One feature vector per forward pass; rank-1 shapes carry no batch axis
        let input_shape = engine.input_shape();
        if input_shape.len() >= 2 && input_shape[0] != 1 {
            let err = InferenceError::ModelLoadFailed {
                reason: format!(
                    "input shape {:?} has batch dimension {}, expected 1",
                    input_shape, input_shape[0]
                ),
            };
            engine.release();
            log_inference_error(&err, "InferenceAdapter::load");
            return Err(err);
        }

        let policy = InputPackingPolicy::from_shape(engine.input_shape());
        let classes: usize = engine.output_shape().iter().product();

        log::info!(
            "[InferenceAdapter] Model loaded: input {:?} ({:?}), output {:?}",
            engine.input_shape(),
            policy,
            engine.output_shape()
        );
        if classes > self.labels.len() {
            log::warn!(
                "[InferenceAdapter] Model emits {} classes but only {} labels configured; extra classes decode as \"{}\"",
                classes,
                self.labels.len(),
                OTHER_LABEL
            );
        }

        self.loaded = Some(LoadedEngine { engine, policy });
        Ok(())
    }

    /// Tear down the loaded engine. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut loaded) = self.loaded.take() {
            loaded.engine.release();
            log::info!("[InferenceAdapter] Engine released");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Packing policy of the loaded engine
    pub fn policy(&self) -> Option<InputPackingPolicy> {
        self.loaded.as_ref().map(|l| l.policy)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run one forward pass and decode the ranked label distribution
    ///
    /// # Errors
    /// - `NotLoaded` if no engine is loaded
    /// - `InferenceFailed` if the engine reports an error
    /// - `InvalidOutput` if the engine returns no scores or non-finite scores
    pub fn classify(
        &mut self,
        features: &FeatureVector,
    ) -> Result<ClassificationResult, InferenceError> {
        let loaded = self.loaded.as_mut().ok_or(InferenceError::NotLoaded)?;

        let tensor = loaded.policy.pack(features.as_slice());
        let raw = loaded
            .engine
            .run(&tensor)
            .map_err(|e| InferenceError::InferenceFailed { message: e.message })?;

        tracing::debug!(
            tensor_len = tensor.len(),
            classes = raw.len(),
            "forward pass complete"
        );

        decode_scores(&raw, &self.labels)
    }
}

impl<F: EngineFactory> Drop for InferenceAdapter<F> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Softmax raw scores, attach labels and rank them
fn decode_scores(raw: &[f32], labels: &[String]) -> Result<ClassificationResult, InferenceError> {
    if raw.is_empty() {
        return Err(InferenceError::InvalidOutput {
            reason: "engine returned no scores".to_string(),
        });
    }
    if let Some(i) = raw.iter().position(|s| !s.is_finite()) {
        return Err(InferenceError::InvalidOutput {
            reason: format!("score {} is not finite ({})", i, raw[i]),
        });
    }

    let mut scores: Vec<LabelScore> = softmax(raw)
        .into_iter()
        .enumerate()
        .map(|(i, probability)| LabelScore {
            label: labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| OTHER_LABEL.to_string()),
            probability,
        })
        .collect();

    // Stable sort keeps model order among ties
    scores.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    ClassificationResult::from_ranked(scores).ok_or_else(|| InferenceError::InvalidOutput {
        reason: "engine returned no scores".to_string(),
    })
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
