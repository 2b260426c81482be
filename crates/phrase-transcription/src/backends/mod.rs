//! Backend implementations, one per [`ModelType`].
//!
//! Each backend owns a [`ResourceCache`](crate::cache::ResourceCache) for its
//! heavyweight resources and delegates inference to an injected engine trait.

pub mod chunked;
pub mod pipeline;
pub mod streaming;
pub mod transducer;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::AudioStream;
use crate::dirs::DataDirs;
use crate::finalize::Finalizer;
use crate::model::{Model, ModelType};
use crate::types::{Result, TranscriptionError};

pub use chunked::{ChunkedBackend, ChunkedDecodeOptions, ChunkedEngine};
pub use pipeline::{ModelSource, PipelineBackend, PipelineEngine};
pub use streaming::{Recognizer, StreamingBackend, StreamingEngine};
pub use transducer::{TransducerBackend, TransducerEngine, TransducerResources};

/// Per-request collaborators shared by every backend.
#[derive(Clone)]
pub struct TranscribeContext {
    /// Model directory layout.
    pub dirs: Arc<dyn DataDirs>,
    /// Final text stage.
    pub finalizer: Finalizer,
    /// Sample rate of the incoming PCM.
    pub sample_rate: u32,
}

impl std::fmt::Debug for TranscribeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscribeContext")
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// A speech recognition backend for one model kind.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Model kind this backend serves.
    fn kind(&self) -> ModelType;

    /// Consume `audio` and return the finalized transcript (`""` if nothing was recognized).
    async fn transcribe(
        &self,
        model: &Model,
        ctx: &TranscribeContext,
        audio: AudioStream<'_>,
    ) -> Result<String>;

    /// Drop cached resources for `dir`. Returns whether anything was cached.
    fn invalidate(&self, dir: &Path) -> bool;

    /// Drop all cached resources.
    fn clear(&self);
}

/// Run inference on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TranscriptionError::DecodeFailure(format!("inference task failed: {e}")))?
}
