// End-to-end pipeline tests through the public API

use std::path::Path;

use cry_classifier::audio::{
    AudioSource, CancellationToken, CaptureOutcome, SampleStream, SyntheticSource, SyntheticSpec,
    WavSource,
};
use cry_classifier::config::{AppConfig, DEFAULT_LABELS, OTHER_LABEL};
use cry_classifier::context::{PipelineContext, PipelineOutcome};
use cry_classifier::engine::{DenseEngineFactory, DenseModel};
use cry_classifier::error::{ErrorCode, InferenceErrorCodes, PipelineError};
use tempfile::tempdir;

fn model(input_shape: Vec<usize>, classes: usize) -> DenseModel {
    let inputs: usize = input_shape.iter().product();
    let weights = (0..classes)
        .map(|c| {
            (0..inputs)
                .map(|i| ((c * 31 + i * 7) % 13) as f32 / 100.0 - 0.06)
                .collect()
        })
        .collect();
    DenseModel {
        input_shape,
        output_shape: vec![1, classes],
        weights,
        bias: (0..classes).map(|c| c as f32 * 0.01).collect(),
    }
}

fn write_sine_wav(path: &Path, sample_rate: u32, secs: f32) {
    let samples = SyntheticSpec::sine(523.0, 0.4, (secs * 1000.0) as u32).render(sample_rate);
    SampleStream::new(samples, sample_rate)
        .write_wav(path)
        .unwrap();
}

fn loaded_context(model: &DenseModel) -> PipelineContext<DenseEngineFactory> {
    let ctx = PipelineContext::new(AppConfig::default(), DenseEngineFactory).unwrap();
    ctx.load_model(&model.to_bytes().unwrap()).unwrap();
    ctx
}

fn assert_distribution(scores: &[cry_classifier::LabelScore]) {
    let total: f32 = scores.iter().map(|s| s.probability).sum();
    assert!((total - 1.0).abs() < 1e-5, "scores sum to {}", total);
    assert!(scores
        .windows(2)
        .all(|w| w[0].probability >= w[1].probability));
}

#[test]
fn classify_wav_file_through_capture() {
    let dir = tempdir().unwrap();
    let wav = dir.path().join("cry.wav");
    write_sine_wav(&wav, 44_100, 1.5);

    let ctx = loaded_context(&model(vec![1, 40], 7));
    let mut source = WavSource::new(&wav);
    let outcome = ctx
        .record_and_classify(&mut source, &CancellationToken::new())
        .unwrap();

    let PipelineOutcome::Classified(result) = outcome else {
        panic!("1.5 s recording should classify");
    };
    assert_eq!(result.scores.len(), 7);
    assert_eq!(result.label, result.scores[0].label);
    assert!(DEFAULT_LABELS.contains(&result.label.as_str()));
    assert_distribution(&result.scores);
}

#[test]
fn long_recording_is_capped_at_max_duration() {
    let dir = tempdir().unwrap();
    let wav = dir.path().join("long.wav");
    write_sine_wav(&wav, 22_050, 8.0);

    let ctx = loaded_context(&model(vec![1, 40], 7));
    let mut source = WavSource::new(&wav);
    let outcome = ctx.record(&mut source, &CancellationToken::new()).unwrap();

    match outcome {
        CaptureOutcome::Captured(stream) => assert_eq!(stream.len(), 7 * 22_050),
        other => panic!("expected capture, got {:?}", other),
    }
}

#[test]
fn every_input_layout_classifies() {
    let stream = SampleStream::new(SyntheticSpec::sine(350.0, 0.6, 1_000).render(22_050), 22_050);

    for shape in [vec![1, 40], vec![1, 40, 1], vec![1, 10, 8], vec![1, 2, 2, 10]] {
        let ctx = loaded_context(&model(shape.clone(), 7));
        let result = ctx
            .classify_samples(&stream)
            .unwrap_or_else(|e| panic!("shape {:?} failed: {}", shape, e));
        assert_eq!(result.scores.len(), 7);
        assert_distribution(&result.scores);
    }
}

#[test]
fn extra_model_classes_are_labeled_other() {
    let ctx = loaded_context(&model(vec![1, 40], 10));
    let stream = SampleStream::new(SyntheticSpec::white_noise(0.2, 1_000, 3).render(22_050), 22_050);

    let result = ctx.classify_samples(&stream).unwrap();
    assert_eq!(result.scores.len(), 10);
    let others = result
        .scores
        .iter()
        .filter(|s| s.label == OTHER_LABEL)
        .count();
    assert_eq!(others, 3);
    for label in DEFAULT_LABELS {
        assert!(result.probability_of(label).is_some(), "missing {}", label);
    }
}

#[test]
fn silence_features_are_reproducible() {
    let a = PipelineContext::new(AppConfig::default(), DenseEngineFactory).unwrap();
    let b = PipelineContext::new(AppConfig::default(), DenseEngineFactory).unwrap();
    let silence = SampleStream::new(vec![0; 3 * 22_050], 22_050);

    let fa = a.extract(&silence).unwrap();
    let fb = b.extract(&silence).unwrap();
    assert_eq!(fa, fb);
    assert_eq!(fa.len(), 40);

    let expected_c0 = (1e-10f64.ln() * 40f64.sqrt()) as f32;
    assert!((fa.as_slice()[0] - expected_c0).abs() < 1e-3);
}

#[test]
fn unloaded_model_reports_not_loaded_code() {
    let ctx = PipelineContext::new(AppConfig::default(), DenseEngineFactory).unwrap();
    let stream = SampleStream::new(vec![100; 22_050], 22_050);

    let err = ctx.classify_samples(&stream).unwrap_err();
    assert!(matches!(err, PipelineError::Inference(_)));
    assert_eq!(err.code(), InferenceErrorCodes::NOT_LOADED);
}

#[test]
fn cancelled_capture_stops_early() {
    let ctx = loaded_context(&model(vec![1, 40], 7));
    let token = CancellationToken::new();

    // Cancels itself after the third chunk
    struct CancellingSource {
        inner: SyntheticSource,
        token: CancellationToken,
        reads: usize,
    }

    impl AudioSource for CancellingSource {
        fn open(
            &mut self,
            format: &cry_classifier::audio::SourceFormat,
        ) -> Result<(), cry_classifier::CaptureError> {
            self.inner.open(format)
        }

        fn read_chunk(
            &mut self,
            buffer: &mut [i16],
        ) -> Result<cry_classifier::audio::ChunkRead, cry_classifier::CaptureError> {
            self.reads += 1;
            if self.reads == 3 {
                self.token.cancel();
            }
            self.inner.read_chunk(buffer)
        }

        fn close(&mut self) {
            self.inner.close()
        }
    }

    let mut source = CancellingSource {
        inner: SyntheticSource::new(SyntheticSpec::sine(440.0, 0.5, 5_000)),
        token: token.clone(),
        reads: 0,
    };

    let outcome = ctx.record_and_classify(&mut source, &token).unwrap();
    assert_eq!(
        outcome,
        PipelineOutcome::NoResult {
            samples: 3 * 1024,
            required: 11_025
        }
    );
}
