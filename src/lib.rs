// Cry Classifier Core - infant cry classification pipeline
// Bounded capture -> MFCC features -> frozen-model inference

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;

// Re-exports for convenience
pub use analysis::{ClassificationResult, FeatureVector, InferenceAdapter, LabelScore, MfccExtractor};
pub use audio::{CancellationToken, CaptureBuffer, CaptureOutcome, SampleStream};
pub use config::AppConfig;
pub use context::{PipelineContext, PipelineOutcome};
pub use engine::{DenseEngineFactory, EngineFactory, InferenceEngine};
pub use error::{CaptureError, DspError, ErrorCode, InferenceError, PipelineError};

use tracing::Level;

/// Install a fmt subscriber for `tracing` events and `log` records
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        log::debug!("Logging initialized at {}", level);
    }
}
