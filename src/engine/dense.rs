// DenseEngine - single affine layer evaluated from a JSON model blob
//
// Blob layout:
//   { "input_shape": [1, 40], "output_shape": [1, 7],
//     "weights": [[...40 values...], ... 7 rows], "bias": [...7 values...] }
//
// scores[c] = bias[c] + Σ weights[c][i] · input[i]

use serde::{Deserialize, Serialize};

use super::{element_count, EngineError, EngineFactory, InferenceEngine};

/// Serialized form of a dense model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseModel {
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    /// `[classes][inputs]`
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl DenseModel {
    /// Check that weights and bias agree with the declared shapes
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.input_shape.is_empty() || self.output_shape.is_empty() {
            return Err(EngineError::new("model shapes must not be empty"));
        }

        let inputs = element_count(&self.input_shape);
        let classes = element_count(&self.output_shape);
        if inputs == 0 || classes == 0 {
            return Err(EngineError::new(format!(
                "model shapes {:?} -> {:?} have zero elements",
                self.input_shape, self.output_shape
            )));
        }

        if self.weights.len() != classes {
            return Err(EngineError::new(format!(
                "expected {} weight rows, found {}",
                classes,
                self.weights.len()
            )));
        }
        if let Some((row, w)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, w)| w.len() != inputs)
        {
            return Err(EngineError::new(format!(
                "weight row {} has {} values, expected {}",
                row,
                w.len(),
                inputs
            )));
        }
        if self.bias.len() != classes {
            return Err(EngineError::new(format!(
                "expected {} bias values, found {}",
                classes,
                self.bias.len()
            )));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(self).map_err(|e| EngineError::new(format!("serialize model: {}", e)))
    }
}

/// Engine evaluating one [`DenseModel`]
#[derive(Debug)]
pub struct DenseEngine {
    model: DenseModel,
    released: bool,
}

impl DenseEngine {
    pub fn new(model: DenseModel) -> Result<Self, EngineError> {
        model.validate()?;
        Ok(Self {
            model,
            released: false,
        })
    }
}

impl InferenceEngine for DenseEngine {
    fn input_shape(&self) -> &[usize] {
        &self.model.input_shape
    }

    fn output_shape(&self) -> &[usize] {
        &self.model.output_shape
    }

    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
        if self.released {
            return Err(EngineError::new("engine already released"));
        }

        let expected = element_count(&self.model.input_shape);
        if input.len() != expected {
            return Err(EngineError::new(format!(
                "input tensor has {} values, model expects {}",
                input.len(),
                expected
            )));
        }

        Ok(self
            .model
            .weights
            .iter()
            .zip(&self.model.bias)
            .map(|(row, b)| b + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>())
            .collect())
    }

    fn release(&mut self) {
        self.released = true;
        self.model.weights.clear();
        self.model.bias.clear();
    }
}

/// Parses JSON model blobs into [`DenseEngine`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct DenseEngineFactory;

impl EngineFactory for DenseEngineFactory {
    type Engine = DenseEngine;

    fn load(&self, model_bytes: &[u8]) -> Result<DenseEngine, EngineError> {
        if model_bytes.is_empty() {
            return Err(EngineError::new("empty model data"));
        }
        let model: DenseModel = serde_json::from_slice(model_bytes)
            .map_err(|e| EngineError::new(format!("invalid model JSON: {}", e)))?;
        DenseEngine::new(model)
    }
}
