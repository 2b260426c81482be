//! Transducer checkpoints decoded with greedy search (Zipformer style).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Backend, TranscribeContext, run_blocking};
use crate::audio::{self, AudioStream};
use crate::cache::ResourceCache;
use crate::decoder::{self, TransducerNetwork};
use crate::dirs::create_model_data_dir;
use crate::model::{Model, ModelType};
use crate::tokens::TokenTable;
use crate::types::{Result, TranscriptionError};

/// Default checkpoint file name.
pub const CHECKPOINT_FILE: &str = "cpu_jit.pt";
/// Default token table file name.
pub const TOKENS_FILE: &str = "tokens.txt";

/// Materializes a transducer network from a checkpoint file.
pub trait TransducerEngine: Send + Sync + 'static {
    /// Checkpoint file expected in the model data directory.
    fn checkpoint_file(&self) -> &str {
        CHECKPOINT_FILE
    }

    /// Token table file expected in the model data directory.
    fn tokens_file(&self) -> &str {
        TOKENS_FILE
    }

    /// Load the network stored at `checkpoint`.
    fn load(&self, checkpoint: &Path) -> Result<Box<dyn TransducerNetwork>>;
}

/// Cached network plus its token table.
pub struct TransducerResources {
    /// Loaded network.
    pub network: Box<dyn TransducerNetwork>,
    /// Id-to-symbol table.
    pub tokens: TokenTable,
}

impl std::fmt::Debug for TransducerResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransducerResources")
            .field("tokens", &self.tokens.len())
            .finish_non_exhaustive()
    }
}

fn load_resources(engine: &dyn TransducerEngine, dir: &Path) -> Result<TransducerResources> {
    let checkpoint = dir.join(engine.checkpoint_file());
    let tokens_path = dir.join(engine.tokens_file());

    let missing: Vec<String> = [&checkpoint, &tokens_path]
        .into_iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TranscriptionError::MissingAsset(format!(
            "place '{}' and '{}' under {}; missing: {}",
            engine.checkpoint_file(),
            engine.tokens_file(),
            dir.display(),
            missing.join(", ")
        )));
    }

    let network = engine.load(&checkpoint)?;
    let tokens = TokenTable::load(&tokens_path)?;
    if tokens.is_empty() {
        return Err(TranscriptionError::LoadFailure(format!(
            "no tokens loaded from {}",
            tokens_path.display()
        )));
    }
    Ok(TransducerResources { network, tokens })
}

/// [`Backend`] for [`ModelType::TransducerCheckpoint`].
pub struct TransducerBackend<E: TransducerEngine> {
    engine: Arc<E>,
    cache: ResourceCache<TransducerResources>,
}

impl<E: TransducerEngine> TransducerBackend<E> {
    /// Backend driving `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            cache: ResourceCache::new("transducer"),
        }
    }
}

#[async_trait]
impl<E: TransducerEngine> Backend for TransducerBackend<E> {
    fn kind(&self) -> ModelType {
        ModelType::TransducerCheckpoint
    }

    async fn transcribe(
        &self,
        model: &Model,
        ctx: &TranscribeContext,
        audio: AudioStream<'_>,
    ) -> Result<String> {
        let model_dir = create_model_data_dir(ctx.dirs.as_ref(), &model.id).await?;
        let engine = Arc::clone(&self.engine);
        let resources = self
            .cache
            .get_or_load(&model_dir, move |dir| load_resources(engine.as_ref(), dir))
            .await?;

        let pcm = audio::collect_audio(audio).await;
        let samples = audio::pcm16_to_f32(&pcm);
        if samples.is_empty() {
            return Ok(String::new());
        }

        let sample_rate = ctx.sample_rate;
        let text = run_blocking(move || {
            let network = resources.network.as_ref();
            let encoded = network.encode(&samples, sample_rate)?;
            let hyps = decoder::greedy_search(network, &encoded)?;
            Ok(hyps
                .first()
                .map(|ids| resources.tokens.to_text(ids))
                .unwrap_or_default())
        })
        .await?;

        debug!(model = %model.id, chars = text.len(), "transducer decode complete");
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
