// PipelineContext: owns the configured pipeline stages
// capture -> MFCC extraction -> inference, run strictly in sequence

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::analysis::{ClassificationResult, FeatureVector, InferenceAdapter, MfccExtractor};
use crate::audio::{AudioSource, CancellationToken, CaptureBuffer, CaptureOutcome, SampleStream};
use crate::config::AppConfig;
use crate::engine::EngineFactory;
use crate::error::{log_inference_error, DspError, InferenceError, PipelineError};

/// Outcome of a full record-and-classify run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Classified(ClassificationResult),
    /// Recording was too short to classify ("try again")
    NoResult { samples: usize, required: usize },
}

/// PipelineContext: single container for the classification pipeline
///
/// - CaptureBuffer built from `config.capture`
/// - MfccExtractor shared read-only (`Arc`) with background workers
/// - InferenceAdapter behind `Arc<Mutex<_>>`, so concurrent `classify`
///   calls against the loaded model are serialized
pub struct PipelineContext<F: EngineFactory> {
    config: AppConfig,
    capture: CaptureBuffer,
    extractor: Arc<MfccExtractor>,
    adapter: Arc<Mutex<InferenceAdapter<F>>>,
}

impl<F: EngineFactory> PipelineContext<F> {
    /// Validate `config` and build every stage; no model is loaded yet
    pub fn new(config: AppConfig, factory: F) -> Result<Self, PipelineError> {
        config.validate()?;

        let capture = CaptureBuffer::new(config.capture.clone())?;
        let extractor = MfccExtractor::new(config.features.clone())?;
        let adapter = InferenceAdapter::new(factory, config.inference.labels.clone());

        Ok(Self {
            config,
            capture,
            extractor: Arc::new(extractor),
            adapter: Arc::new(Mutex::new(adapter)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn extractor(&self) -> &MfccExtractor {
        &self.extractor
    }

    // ========================================================================
    // MODEL LIFECYCLE
    // ========================================================================

    fn lock_adapter(&self) -> Result<MutexGuard<'_, InferenceAdapter<F>>, InferenceError> {
        self.adapter
            .lock()
            .map_err(|_| InferenceError::LockPoisoned)
    }

    pub fn load_model(&self, model_bytes: &[u8]) -> Result<(), PipelineError> {
        let mut adapter = self.lock_adapter()?;
        adapter.load(model_bytes).map_err(|err| {
            log_inference_error(&err, "load_model");
            err.into()
        })
    }

    /// Read a model blob from disk and load it
    pub fn load_model_file(&self, path: &Path) -> Result<(), PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| InferenceError::ModelLoadFailed {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        log::info!(
            "[PipelineContext] Loading model {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        self.load_model(&bytes)
    }

    /// Load `config.inference.model_path`, if set
    ///
    /// Returns `Ok(false)` when no path is configured.
    pub fn load_configured_model(&self) -> Result<bool, PipelineError> {
        match self.config.inference.model_path.clone() {
            Some(path) => self.load_model_file(&path).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn release_model(&self) -> Result<(), PipelineError> {
        self.lock_adapter()?.release();
        Ok(())
    }

    pub fn is_model_loaded(&self) -> bool {
        self.lock_adapter()
            .map(|adapter| adapter.is_loaded())
            .unwrap_or(false)
    }

    // ========================================================================
    // PIPELINE STAGES
    // ========================================================================

    /// Capture one utterance; `TooShort` is an outcome, not an error
    pub fn record<S: AudioSource + ?Sized>(
        &self,
        source: &mut S,
        token: &CancellationToken,
    ) -> Result<CaptureOutcome, PipelineError> {
        Ok(self.capture.record(source, token)?)
    }

    /// Extract the feature vector for a captured stream
    pub fn extract(&self, stream: &SampleStream) -> Result<FeatureVector, PipelineError> {
        self.check_rate(stream)?;
        Ok(self.extractor.extract(stream.samples()))
    }

    pub fn classify_features(
        &self,
        features: &FeatureVector,
    ) -> Result<ClassificationResult, PipelineError> {
        let mut adapter = self.lock_adapter()?;
        adapter.classify(features).map_err(|err| {
            log_inference_error(&err, "classify_features");
            err.into()
        })
    }

    /// Extract and classify a captured stream on the calling thread
    pub fn classify_samples(
        &self,
        stream: &SampleStream,
    ) -> Result<ClassificationResult, PipelineError> {
        let features = self.extract(stream)?;
        self.classify_features(&features)
    }

    /// Capture, then extract and classify, strictly in sequence
    pub fn record_and_classify<S: AudioSource + ?Sized>(
        &self,
        source: &mut S,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        match self.record(source, token)? {
            CaptureOutcome::Captured(stream) => {
                let result = self.classify_samples(&stream)?;
                log::info!(
                    "[PipelineContext] Classified {:.2}s as {} ({:.3})",
                    stream.duration_secs(),
                    result.label,
                    result.confidence
                );
                Ok(PipelineOutcome::Classified(result))
            }
            CaptureOutcome::TooShort { samples, required } => {
                Ok(PipelineOutcome::NoResult { samples, required })
            }
        }
    }

    fn check_rate(&self, stream: &SampleStream) -> Result<(), DspError> {
        let expected = self.config.features.sample_rate;
        if stream.sample_rate() != expected {
            return Err(DspError::InvalidArgument {
                reason: format!(
                    "stream sample rate {} Hz, extractor expects {} Hz",
                    stream.sample_rate(),
                    expected
                ),
            });
        }
        Ok(())
    }
}

impl<F> PipelineContext<F>
where
    F: EngineFactory + Send + 'static,
    F::Engine: 'static,
{
    /// Extract and classify on a tokio blocking worker
    ///
    /// Keeps the CPU-bound stages off the caller's (UI/async) thread. The
    /// adapter lock serializes this with any other `classify` call.
    pub async fn classify_in_background(
        &self,
        stream: SampleStream,
    ) -> Result<ClassificationResult, PipelineError> {
        self.check_rate(&stream)?;

        let extractor = Arc::clone(&self.extractor);
        let adapter = Arc::clone(&self.adapter);

        let handle = tokio::task::spawn_blocking(move || {
            let features = extractor.extract(stream.samples());
            let mut adapter = adapter.lock().map_err(|_| InferenceError::LockPoisoned)?;
            adapter.classify(&features)
        });

        match handle.await {
            Ok(result) => result.map_err(|err| {
                log_inference_error(&err, "classify_in_background");
                err.into()
            }),
            Err(join_err) => {
                let err = InferenceError::InferenceFailed {
                    message: format!("background worker failed: {}", join_err),
                };
                log_inference_error(&err, "classify_in_background");
                Err(err.into())
            }
        }
    }
}
