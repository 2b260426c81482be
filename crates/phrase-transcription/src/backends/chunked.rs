//! Long-form models that decode a WAV file in context windows (ChunkFormer style).
//!
//! Model files are fetched from the resolved remote repository when absent.
//! Audio is written to a scratch WAV that is removed once decoding finishes,
//! whether or not it succeeded.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use phrase_settings::ChunkedDecodeSettings;
use tracing::debug;

use super::{Backend, TranscribeContext, run_blocking};
use crate::audio::{self, AudioStream};
use crate::cache::ResourceCache;
use crate::dirs::create_model_data_dir;
use crate::model::{Model, ModelType};
use crate::remote::{AssetFetcher, RemoteLocator, ensure_model_files};
use crate::tokens::RawResult;
use crate::types::Result;

/// Files a chunked model directory must contain.
pub const EXPECTED_FILES: [&str; 3] = ["config.yaml", "pytorch_model.pt", "vocab.txt"];

/// Windowing parameters passed to the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkedDecodeOptions {
    /// Frames per chunk.
    pub chunk_size: u32,
    /// Left context frames.
    pub left_context_size: u32,
    /// Right context frames.
    pub right_context_size: u32,
    /// Seconds of audio decoded per batch.
    pub total_batch_duration_secs: u32,
}

impl Default for ChunkedDecodeOptions {
    fn default() -> Self {
        Self::from(&ChunkedDecodeSettings::default())
    }
}

impl From<&ChunkedDecodeSettings> for ChunkedDecodeOptions {
    fn from(s: &ChunkedDecodeSettings) -> Self {
        Self {
            chunk_size: s.chunk_size,
            left_context_size: s.left_context_size,
            right_context_size: s.right_context_size,
            total_batch_duration_secs: s.total_batch_duration_secs,
        }
    }
}

/// Loads chunked models and decodes WAV files with them.
pub trait ChunkedEngine: Send + Sync + 'static {
    /// Shared, read-only model handle.
    type Model: Send + Sync + 'static;

    /// Load from a directory holding [`EXPECTED_FILES`].
    fn load(&self, model_dir: &Path) -> Result<Self::Model>;

    /// Decode the mono 16-bit WAV at `wav`.
    fn decode_file(
        &self,
        model: &Self::Model,
        wav: &Path,
        options: &ChunkedDecodeOptions,
    ) -> Result<RawResult>;
}

/// [`Backend`] for [`ModelType::ChunkedFile`].
pub struct ChunkedBackend<E: ChunkedEngine> {
    engine: Arc<E>,
    locator: Arc<dyn RemoteLocator>,
    fetcher: Arc<dyn AssetFetcher>,
    options: ChunkedDecodeOptions,
    cache: ResourceCache<E::Model>,
}

impl<E: ChunkedEngine> ChunkedBackend<E> {
    /// Backend driving `engine`, fetching missing files through `fetcher`.
    pub fn new(
        engine: E,
        locator: Arc<dyn RemoteLocator>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            locator,
            fetcher,
            options: ChunkedDecodeOptions::default(),
            cache: ResourceCache::new("chunked"),
        }
    }

    /// Override the decode window options.
    #[must_use]
    pub fn with_options(mut self, options: ChunkedDecodeOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<E: ChunkedEngine> Backend for ChunkedBackend<E> {
    fn kind(&self) -> ModelType {
        ModelType::ChunkedFile
    }

    async fn transcribe(
        &self,
        model: &Model,
        ctx: &TranscribeContext,
        audio: AudioStream<'_>,
    ) -> Result<String> {
        let model_dir = create_model_data_dir(ctx.dirs.as_ref(), &model.id).await?;

        let engine = Arc::clone(&self.engine);
        let locator = Arc::clone(&self.locator);
        let fetcher = Arc::clone(&self.fetcher);
        let owned_model = model.clone();
        let loaded = self
            .cache
            .get_or_load(&model_dir, move |dir| {
                ensure_model_files(
                    &owned_model,
                    dir,
                    &EXPECTED_FILES,
                    locator.as_ref(),
                    fetcher.as_ref(),
                )?;
                engine.load(dir)
            })
            .await?;

        let pcm = audio::collect_audio(audio).await;
        if pcm.is_empty() {
            return Ok(String::new());
        }

        let engine = Arc::clone(&self.engine);
        let options = self.options;
        let sample_rate = ctx.sample_rate;
        let raw = run_blocking(move || {
            let wav = audio::write_wav(&pcm, sample_rate)?;
            debug!(path = %wav.path().display(), bytes = pcm.len(), "wrote scratch wav");
            engine.decode_file(&loaded, wav.path(), &options)
        })
        .await?;

        let text = raw.into_text(None);
        if text.is_empty() {
            return Ok(String::new());
        }
        Ok(ctx.finalizer.finalize_cased(model, &text))
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
