use super::*;
use crate::config::DEFAULT_LABELS;
use crate::engine::EngineError;
use std::sync::{Arc, Mutex};

/// Engine returning fixed scores and recording the last input tensor
struct ScriptedEngine {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    scores: Result<Vec<f32>, String>,
    last_input: Arc<Mutex<Vec<f32>>>,
    released: Arc<Mutex<u32>>,
}

impl InferenceEngine for ScriptedEngine {
    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
        *self.last_input.lock().unwrap() = input.to_vec();
        self.scores.clone().map_err(EngineError::new)
    }

    fn release(&mut self) {
        *self.released.lock().unwrap() += 1;
    }
}

#[derive(Clone)]
struct ScriptedFactory {
    input_shape: Vec<usize>,
    scores: Result<Vec<f32>, String>,
    last_input: Arc<Mutex<Vec<f32>>>,
    released: Arc<Mutex<u32>>,
}

impl ScriptedFactory {
    fn new(input_shape: Vec<usize>, scores: Result<Vec<f32>, String>) -> Self {
        Self {
            input_shape,
            scores,
            last_input: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(Mutex::new(0)),
        }
    }
}

impl EngineFactory for ScriptedFactory {
    type Engine = ScriptedEngine;

    fn load(&self, model_bytes: &[u8]) -> Result<ScriptedEngine, EngineError> {
        if model_bytes == b"corrupt" {
            return Err(EngineError::new("flatbuffer header mismatch"));
        }
        let classes = self.scores.as_ref().map(|s| s.len()).unwrap_or(1);
        Ok(ScriptedEngine {
            input_shape: self.input_shape.clone(),
            output_shape: vec![1, classes],
            scores: self.scores.clone(),
            last_input: Arc::clone(&self.last_input),
            released: Arc::clone(&self.released),
        })
    }
}

fn labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}

fn loaded_adapter(factory: ScriptedFactory) -> InferenceAdapter<ScriptedFactory> {
    let mut adapter = InferenceAdapter::new(factory, labels());
    adapter.load(b"model").unwrap();
    adapter
}

fn features(n: usize) -> FeatureVector {
    FeatureVector::new((0..n).map(|i| i as f32).collect())
}

// ========================================================================
// Softmax
// ========================================================================

#[test]
fn test_softmax_sums_to_one() {
    for scores in [
        vec![0.0f32, 0.0, 0.0],
        vec![1.0, 2.0, 3.0, 4.0],
        vec![-50.0, 12.5, 3.25, 0.0, 7.0, -1.0, 2.0],
        vec![42.0],
    ] {
        let probs = softmax(&scores);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "sum {} for {:?}", sum, scores);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}

#[test]
fn test_softmax_is_shift_invariant() {
    let scores = vec![0.5f32, -1.25, 3.0, 2.0];
    let shifted: Vec<f32> = scores.iter().map(|s| s + 100.0).collect();
    for (a, b) in softmax(&scores).iter().zip(softmax(&shifted)) {
        assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
    }
}

#[test]
fn test_softmax_handles_large_scores() {
    let probs = softmax(&[1000.0, 999.0, -1000.0]);
    assert!(probs.iter().all(|p| p.is_finite()));
    assert!(probs[0] > probs[1]);
    assert!(probs[2] < 1e-6);
}

#[test]
fn test_softmax_empty() {
    assert!(softmax(&[]).is_empty());
}

// ========================================================================
// Input packing
// ========================================================================

#[test]
fn test_policy_selection_by_rank() {
    assert_eq!(
        InputPackingPolicy::from_shape(&[1, 40]),
        InputPackingPolicy::Flat { features: 40 }
    );
    assert_eq!(
        InputPackingPolicy::from_shape(&[1, 40, 1]),
        InputPackingPolicy::TimeMajorSingleChannel { time: 40 }
    );
    assert_eq!(
        InputPackingPolicy::from_shape(&[1, 8, 13]),
        InputPackingPolicy::GenericFlatten {
            time: 8,
            features: 13
        }
    );
    assert_eq!(
        InputPackingPolicy::from_shape(&[1, 2, 5, 3]),
        InputPackingPolicy::PadTruncate { len: 30 }
    );
    assert_eq!(
        InputPackingPolicy::from_shape(&[16]),
        InputPackingPolicy::PadTruncate { len: 16 }
    );
}

#[test]
fn test_flat_pads_and_truncates() {
    let policy = InputPackingPolicy::Flat { features: 4 };
    assert_eq!(policy.pack(&[1.0, 2.0]), vec![1.0, 2.0, 0.0, 0.0]);
    assert_eq!(policy.pack(&[1.0, 2.0, 3.0, 4.0, 5.0]), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_time_major_places_feature_per_step() {
    let policy = InputPackingPolicy::TimeMajorSingleChannel { time: 5 };
    assert_eq!(policy.pack(&[0.5, 1.5, 2.5]), vec![0.5, 1.5, 2.5, 0.0, 0.0]);
}

#[test]
fn test_generic_flatten_wraps_around() {
    let policy = InputPackingPolicy::GenericFlatten {
        time: 2,
        features: 3,
    };
    assert_eq!(policy.tensor_len(), 6);
    assert_eq!(
        policy.pack(&[1.0, 2.0, 3.0, 4.0]),
        vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0]
    );
    assert_eq!(policy.pack(&[]), vec![0.0; 6]);
}

#[test]
fn test_pad_truncate_fallback() {
    let policy = InputPackingPolicy::PadTruncate { len: 3 };
    assert_eq!(policy.pack(&[9.0]), vec![9.0, 0.0, 0.0]);
}

// ========================================================================
// Lifecycle
// ========================================================================

#[test]
fn test_classify_before_load_is_not_loaded() {
    let factory = ScriptedFactory::new(vec![1, 40], Ok(vec![0.0; 7]));
    let mut adapter = InferenceAdapter::new(factory, labels());
    assert!(!adapter.is_loaded());
    assert_eq!(
        adapter.classify(&features(40)),
        Err(InferenceError::NotLoaded)
    );
}

#[test]
fn test_release_is_idempotent() {
    let factory = ScriptedFactory::new(vec![1, 40], Ok(vec![0.0; 7]));
    let released = Arc::clone(&factory.released);
    let mut adapter = loaded_adapter(factory);

    adapter.release();
    adapter.release();
    assert!(!adapter.is_loaded());
    assert_eq!(*released.lock().unwrap(), 1);
    assert_eq!(
        adapter.classify(&features(40)),
        Err(InferenceError::NotLoaded)
    );

    drop(adapter);
    assert_eq!(*released.lock().unwrap(), 1);
}

#[test]
fn test_reload_releases_previous_engine() {
    let factory = ScriptedFactory::new(vec![1, 40], Ok(vec![0.0; 7]));
    let released = Arc::clone(&factory.released);
    let mut adapter = loaded_adapter(factory);

    adapter.load(b"model").unwrap();
    assert_eq!(*released.lock().unwrap(), 1);
    assert!(adapter.is_loaded());
}

#[test]
fn test_load_failure_is_reported() {
    let factory = ScriptedFactory::new(vec![1, 40], Ok(vec![0.0; 7]));
    let mut adapter = InferenceAdapter::new(factory, labels());
    let err = adapter.load(b"corrupt").unwrap_err();
    assert_eq!(
        err,
        InferenceError::ModelLoadFailed {
            reason: "flatbuffer header mismatch".to_string()
        }
    );
    assert!(!adapter.is_loaded());
}

#[test]
fn test_batched_input_shape_is_refused_at_load() {
    for shape in [vec![2, 40], vec![8, 40, 1], vec![0, 10, 4]] {
        let factory = ScriptedFactory::new(shape.clone(), Ok(vec![0.0; 7]));
        let released = Arc::clone(&factory.released);
        let mut adapter = InferenceAdapter::new(factory, labels());

        match adapter.load(b"model") {
            Err(InferenceError::ModelLoadFailed { reason }) => {
                assert!(reason.contains("batch"), "shape {:?}: {}", shape, reason)
            }
            other => panic!("shape {:?}: expected ModelLoadFailed, got {:?}", shape, other),
        }
        assert!(!adapter.is_loaded());
        assert_eq!(*released.lock().unwrap(), 1);
    }
}

#[test]
fn test_rank_one_shape_has_no_batch_axis() {
    let mut adapter = loaded_adapter(ScriptedFactory::new(vec![16], Ok(vec![0.0; 7])));
    assert_eq!(
        adapter.policy(),
        Some(InputPackingPolicy::PadTruncate { len: 16 })
    );
    assert!(adapter.classify(&features(40)).is_ok());
}

#[test]
fn test_engine_failure_wraps_message() {
    let factory = ScriptedFactory::new(vec![1, 40], Err("tensor arena exhausted".to_string()));
    let mut adapter = loaded_adapter(factory);
    match adapter.classify(&features(40)) {
        Err(InferenceError::InferenceFailed { message }) => {
            assert_eq!(message, "tensor arena exhausted");
        }
        other => panic!("expected InferenceFailed, got {:?}", other),
    }
}

// ========================================================================
// Decoding
// ========================================================================

#[test]
fn test_classify_ranks_labels_descending() {
    let scores = vec![0.1, 2.0, -1.0, 0.5, 3.0, 0.0, 1.0];
    let mut adapter = loaded_adapter(ScriptedFactory::new(vec![1, 40], Ok(scores)));

    let result = adapter.classify(&features(40)).unwrap();
    assert_eq!(result.label, "burping");
    assert_eq!(result.scores.len(), 7);
    assert_eq!(result.scores[0].label, "burping");
    assert_eq!(result.scores[1].label, "tired");
    assert_eq!(result.scores[6].label, "discomfort");
    assert!(result
        .scores
        .windows(2)
        .all(|w| w[0].probability >= w[1].probability));
    assert_eq!(result.confidence, result.scores[0].probability);

    let total: f32 = result.scores.iter().map(|s| s.probability).sum();
    assert!((total - 1.0).abs() < 1e-5);
}

#[test]
fn test_extra_classes_decode_as_other() {
    // Ten classes, seven labels, extra classes score lowest
    let scores = vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 0.0, -1.0, -2.0];
    let mut adapter = loaded_adapter(ScriptedFactory::new(vec![1, 40], Ok(scores)));

    let result = adapter.classify(&features(40)).unwrap();
    assert_eq!(result.scores.len(), 10);
    for (rank, score) in result.scores.iter().enumerate() {
        if rank < 7 {
            assert_eq!(score.label, DEFAULT_LABELS[rank]);
        } else {
            assert_eq!(score.label, OTHER_LABEL, "rank {} should be Other", rank + 1);
        }
    }
}

#[test]
fn test_adapter_packs_with_selected_policy() {
    let factory = ScriptedFactory::new(vec![1, 4, 3], Ok(vec![0.0; 7]));
    let last_input = Arc::clone(&factory.last_input);
    let mut adapter = loaded_adapter(factory);

    assert_eq!(
        adapter.policy(),
        Some(InputPackingPolicy::GenericFlatten {
            time: 4,
            features: 3
        })
    );
    adapter.classify(&features(5)).unwrap();
    assert_eq!(
        *last_input.lock().unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 1.0]
    );
}

#[test]
fn test_invalid_outputs_are_rejected() {
    let mut adapter = loaded_adapter(ScriptedFactory::new(vec![1, 40], Ok(vec![])));
    assert!(matches!(
        adapter.classify(&features(40)),
        Err(InferenceError::InvalidOutput { .. })
    ));

    let mut adapter = loaded_adapter(ScriptedFactory::new(
        vec![1, 40],
        Ok(vec![1.0, f32::NAN, 0.0]),
    ));
    assert!(matches!(
        adapter.classify(&features(40)),
        Err(InferenceError::InvalidOutput { .. })
    ));
}
