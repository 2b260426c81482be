//! Incremental recognizers fed chunk by chunk (Kaldi/Vosk style).
//!
//! The shared model is loaded once per directory under `models_dir/<id>`;
//! each request gets its own [`Recognizer`]. Text captured at utterance
//! boundaries and the final flush is joined in arrival order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::debug;

use super::{Backend, TranscribeContext, run_blocking};
use crate::audio::AudioStream;
use crate::cache::ResourceCache;
use crate::model::{Model, ModelType};
use crate::types::{Result, TranscriptionError};

/// Per-request recognition state.
pub trait Recognizer: Send {
    /// Feed PCM bytes. Returns `true` when an utterance boundary was reached.
    fn accept_waveform(&mut self, pcm: &[u8]) -> Result<bool>;

    /// Text recognized up to the last boundary.
    fn result(&mut self) -> Result<String>;

    /// Flush and return the remaining text.
    fn final_result(&mut self) -> Result<String>;
}

/// Loads shared streaming models and creates recognizers over them.
pub trait StreamingEngine: Send + Sync + 'static {
    /// Shared, read-only model handle.
    type Model: Send + Sync + 'static;

    /// Load the model stored in `model_dir`.
    fn load(&self, model_dir: &Path) -> Result<Self::Model>;

    /// Fresh recognizer for one request.
    fn recognizer(
        &self,
        model: Arc<Self::Model>,
        sample_rate: u32,
    ) -> Result<Box<dyn Recognizer>>;
}

/// [`Backend`] for [`ModelType::StreamingRecognizer`].
pub struct StreamingBackend<E: StreamingEngine> {
    engine: Arc<E>,
    cache: ResourceCache<E::Model>,
}

impl<E: StreamingEngine> StreamingBackend<E> {
    /// Backend driving `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            cache: ResourceCache::new("streaming"),
        }
    }
}

fn push_fragment(fragments: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        fragments.push(text.to_string());
    }
}

async fn accept_chunk(
    mut recognizer: Box<dyn Recognizer>,
    chunk: Bytes,
) -> Result<(Box<dyn Recognizer>, Option<String>)> {
    run_blocking(move || {
        let text = if recognizer.accept_waveform(&chunk)? {
            Some(recognizer.result()?)
        } else {
            None
        };
        Ok((recognizer, text))
    })
    .await
}

#[async_trait]
impl<E: StreamingEngine> Backend for StreamingBackend<E> {
    fn kind(&self) -> ModelType {
        ModelType::StreamingRecognizer
    }

    async fn transcribe(
        &self,
        model: &Model,
        ctx: &TranscribeContext,
        mut audio: AudioStream<'_>,
    ) -> Result<String> {
        let model_dir = ctx.dirs.models_dir().join(&model.id);
        let is_dir = tokio::fs::metadata(&model_dir)
            .await
            .is_ok_and(|m| m.is_dir());
        if !is_dir {
            return Err(TranscriptionError::MissingAsset(format!(
                "streaming model directory does not exist: {}",
                model_dir.display()
            )));
        }

        let engine = Arc::clone(&self.engine);
        let shared = self
            .cache
            .get_or_load(&model_dir, move |dir| engine.load(dir))
            .await?;

        let mut recognizer: Option<Box<dyn Recognizer>> = None;
        let mut fragments = Vec::new();
        while let Some(chunk) = audio.next().await {
            if chunk.is_empty() {
                continue;
            }
            let current = match recognizer.take() {
                Some(r) => r,
                None => self
                    .engine
                    .recognizer(Arc::clone(&shared), ctx.sample_rate)?,
            };
            let (current, text) = accept_chunk(current, chunk).await?;
            if let Some(text) = text {
                push_fragment(&mut fragments, &text);
            }
            recognizer = Some(current);
        }

        // Nothing was fed: no flush, no inference.
        let Some(mut recognizer) = recognizer else {
            return Ok(String::new());
        };
        let final_text = run_blocking(move || recognizer.final_result()).await?;
        push_fragment(&mut fragments, &final_text);

        debug!(model = %model.id, fragments = fragments.len(), "streaming recognition complete");
        if fragments.is_empty() {
            return Ok(String::new());
        }
        Ok(ctx.finalizer.finalize_cased(model, &fragments.join(" ")))
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
