//! Request entry point: dispatch by model kind, record outcome.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use phrase_settings::PhraseSettings;
use tracing::{debug, warn};

use crate::audio::AudioStream;
use crate::backends::{Backend, TranscribeContext};
use crate::dirs::DataDirs;
use crate::finalize::{Finalizer, MetaDecoder};
use crate::model::{Model, ModelType};
use crate::telemetry::{
    TRANSCRIPTION_DURATION_SECONDS, TRANSCRIPTION_FAILURES_TOTAL, TRANSCRIPTION_REQUESTS_TOTAL,
};
use crate::types::{Result, TranscriptionError};

/// Owns the registered backends and their caches.
pub struct Transcriber {
    backends: HashMap<ModelType, Arc<dyn Backend>>,
    ctx: TranscribeContext,
}

impl std::fmt::Debug for Transcriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.backends.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("Transcriber")
            .field("backends", &kinds)
            .field("ctx", &self.ctx)
            .finish()
    }
}

/// Builder for [`Transcriber`].
pub struct TranscriberBuilder {
    backends: HashMap<ModelType, Arc<dyn Backend>>,
    dirs: Arc<dyn DataDirs>,
    meta: Option<Arc<dyn MetaDecoder>>,
    sample_rate: u32,
}

impl TranscriberBuilder {
    /// Register `backend` for the kind it reports, replacing any previous one.
    #[must_use]
    pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(backend);
        let _ = self.backends.insert(backend.kind(), backend);
        self
    }

    /// Meta marker decoder applied last. Defaults to the identity.
    #[must_use]
    pub fn meta_decoder(mut self, meta: Arc<dyn MetaDecoder>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sample rate of incoming PCM.
    #[must_use]
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Finish building.
    pub fn build(self) -> Transcriber {
        let finalizer = self.meta.map(Finalizer::new).unwrap_or_default();
        Transcriber {
            backends: self.backends,
            ctx: TranscribeContext {
                dirs: self.dirs,
                finalizer,
                sample_rate: self.sample_rate,
            },
        }
    }
}

impl Transcriber {
    /// Start a builder over `dirs` with the default sample rate.
    pub fn builder(dirs: Arc<dyn DataDirs>) -> TranscriberBuilder {
        TranscriberBuilder {
            backends: HashMap::new(),
            dirs,
            meta: None,
            sample_rate: phrase_settings::DEFAULT_SAMPLE_RATE,
        }
    }

    /// Start a builder from loaded settings.
    pub fn from_settings(settings: &PhraseSettings) -> TranscriberBuilder {
        Self::builder(Arc::new(settings.clone())).sample_rate(settings.sample_rate)
    }

    /// Transcribe `audio` with the backend registered for `model`'s kind.
    ///
    /// Returns `""` when nothing was recognized.
    pub async fn transcribe(&self, model: &Model, audio: AudioStream<'_>) -> Result<String> {
        let kind = model.model_type.as_str();
        let backend = self.backends.get(&model.model_type).ok_or_else(|| {
            TranscriptionError::MissingDependency(format!(
                "no backend registered for model type '{kind}' (model '{}')",
                model.id
            ))
        })?;

        metrics::counter!(TRANSCRIPTION_REQUESTS_TOTAL, "backend" => kind).increment(1);
        let start = Instant::now();
        let result = backend.transcribe(model, &self.ctx, audio).await;
        metrics::histogram!(TRANSCRIPTION_DURATION_SECONDS, "backend" => kind)
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(text) => debug!(model = %model.id, backend = kind, chars = text.len(), "transcribed"),
            Err(e) => {
                metrics::counter!(
                    TRANSCRIPTION_FAILURES_TOTAL,
                    "backend" => kind,
                    "error_kind" => e.kind()
                )
                .increment(1);
                warn!(model = %model.id, backend = kind, error = %e, "transcription failed");
            }
        }
        result
    }

    /// Whether a backend is registered for `kind`.
    pub fn supports(&self, kind: ModelType) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Directory the backend for `model` keys its resources by.
    pub fn resource_dir(&self, model: &Model) -> PathBuf {
        match model.model_type {
            ModelType::StreamingRecognizer => self.ctx.dirs.models_dir().join(&model.id),
            _ => self.ctx.dirs.model_data_dir(&model.id),
        }
    }

    /// Drop cached resources for `model`. Returns whether anything was cached.
    pub fn invalidate(&self, model: &Model) -> bool {
        let dir = self.resource_dir(model);
        self.backends
            .get(&model.model_type)
            .is_some_and(|b| b.invalidate(&dir))
    }

    /// Drop every backend's cached resources.
    pub fn clear_caches(&self) {
        for backend in self.backends.values() {
            backend.clear();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
