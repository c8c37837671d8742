//! Inference engine boundary.
//!
//! The classifier core never executes a model itself. It consumes an engine
//! through the [`EngineFactory`] / [`InferenceEngine`] traits: a factory turns
//! frozen model bytes into an engine, and the engine reports its tensor
//! shapes and runs forward passes over flat `f32` tensors.
//!
//! [`DenseEngine`] is the bundled reference engine used by the CLI and tests.

mod dense;

pub use dense::{DenseEngine, DenseEngineFactory, DenseModel};

use std::fmt;

/// Failure reported by an engine implementation
///
/// Carries the engine's own message verbatim so the adapter can surface it
/// inside `InferenceError::InferenceFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// A loaded model ready to run forward passes.
///
/// Shapes include the leading batch dimension, e.g. `[1, 40]` or
/// `[1, 40, 1]`. The batch dimension must be 1; the adapter refuses to load
/// anything else. `run` receives exactly `product(input_shape)` values and
/// returns the raw (pre-softmax) scores.
pub trait InferenceEngine: Send {
    fn input_shape(&self) -> &[usize];
    fn output_shape(&self) -> &[usize];
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError>;

    /// Free engine resources. Called once by the adapter before dropping.
    fn release(&mut self) {}
}

/// Creates engines from frozen model bytes.
pub trait EngineFactory {
    type Engine: InferenceEngine;

    fn load(&self, model_bytes: &[u8]) -> Result<Self::Engine, EngineError>;
}

/// Number of elements a tensor of `shape` holds
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}
