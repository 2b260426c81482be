//! Single-shot pipelines over a fully buffered waveform (Whisper style).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Backend, TranscribeContext, run_blocking};
use crate::audio::{self, AudioStream};
use crate::cache::ResourceCache;
use crate::dirs::create_model_data_dir;
use crate::finalize::apply_casing;
use crate::model::{Model, ModelType};
use crate::remote::RemoteLocator;
use crate::tokens::RawResult;
use crate::types::Result;

/// Where a pipeline's weights come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSource {
    /// Remote repository id, or the model id when none is known.
    pub repo_id: String,
    /// Local data directory for this model.
    pub data_dir: PathBuf,
}

/// Loads pipelines and runs them over whole utterances.
pub trait PipelineEngine: Send + Sync + 'static {
    /// Shared, read-only pipeline handle.
    type Pipeline: Send + Sync + 'static;

    /// Load (or fetch and load) the pipeline for `source`.
    fn load(&self, source: &ModelSource) -> Result<Self::Pipeline>;

    /// Transcribe normalized mono samples.
    fn transcribe(
        &self,
        pipeline: &Self::Pipeline,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<RawResult>;
}

/// [`Backend`] for [`ModelType::PipelineModel`].
pub struct PipelineBackend<E: PipelineEngine> {
    engine: Arc<E>,
    locator: Arc<dyn RemoteLocator>,
    cache: ResourceCache<E::Pipeline>,
}

impl<E: PipelineEngine> PipelineBackend<E> {
    /// Backend driving `engine`, resolving repositories through `locator`.
    pub fn new(engine: E, locator: Arc<dyn RemoteLocator>) -> Self {
        Self {
            engine: Arc::new(engine),
            locator,
            cache: ResourceCache::new("pipeline"),
        }
    }
}

#[async_trait]
impl<E: PipelineEngine> Backend for PipelineBackend<E> {
    fn kind(&self) -> ModelType {
        ModelType::PipelineModel
    }

    async fn transcribe(
        &self,
        model: &Model,
        ctx: &TranscribeContext,
        audio: AudioStream<'_>,
    ) -> Result<String> {
        let data_dir = create_model_data_dir(ctx.dirs.as_ref(), &model.id).await?;
        let source = ModelSource {
            repo_id: self
                .locator
                .repo_id(model)
                .unwrap_or_else(|| model.id.clone()),
            data_dir: data_dir.clone(),
        };

        let engine = Arc::clone(&self.engine);
        let pipeline = self
            .cache
            .get_or_load(&data_dir, move |_| engine.load(&source))
            .await?;

        let pcm = audio::collect_audio(audio).await;
        if pcm.is_empty() {
            return Ok(String::new());
        }
        let samples = audio::pcm16_to_f32(&pcm);

        let engine = Arc::clone(&self.engine);
        let sample_rate = ctx.sample_rate;
        let raw =
            run_blocking(move || engine.transcribe(&pipeline, &samples, sample_rate)).await?;

        let text = raw.into_text(None);
        debug!(model = %model.id, chars = text.len(), "pipeline transcription complete");
        if text.is_empty() {
            return Ok(String::new());
        }

        let cased = apply_casing(model, &text);
        Ok(ctx.finalizer.finalize(model, cased.trim_end_matches('.')))
    }

    fn invalidate(&self, dir: &Path) -> bool {
        self.cache.invalidate(dir)
    }

    fn clear(&self) {
        self.cache.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
