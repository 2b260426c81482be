//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial JSON
//! files are accepted: missing fields take their compiled default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Built-in model id to repository aliases for `PhoWhisper` checkpoints.
const PHOWHISPER_SIZES: [&str; 5] = ["tiny", "base", "small", "medium", "large-v2"];

fn default_remote_models() -> BTreeMap<String, String> {
    PHOWHISPER_SIZES
        .iter()
        .map(|size| (format!("phowhisper-{size}"), format!("vinai/PhoWhisper-{size}")))
        .collect()
}

/// Sample rate of the PCM audio delivered to every backend.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Root settings type.
///
/// ```json
/// {
///   "modelsDir": "/var/lib/speech-to-phrase/models",
///   "remoteModels": { "phowhisper-base": "vinai/PhoWhisper-base" },
///   "chunked": { "chunkSize": 32 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhraseSettings {
    /// Base directory holding pre-installed model directories (one per model id).
    pub models_dir: PathBuf,
    /// Base directory for per-model downloaded or unpacked data.
    pub data_dir: PathBuf,
    /// Sample rate of incoming PCM audio in Hz.
    pub sample_rate: u32,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Model id → remote repository id (e.g. `org/name` on `HuggingFace`).
    pub remote_models: BTreeMap<String, String>,
    /// Decode window options for chunked file-based backends.
    pub chunked: ChunkedDecodeSettings,
}

impl Default for PhraseSettings {
    fn default() -> Self {
        let base = home_dir().join(".speech-to-phrase");
        Self {
            models_dir: base.join("models"),
            data_dir: base.join("data"),
            sample_rate: DEFAULT_SAMPLE_RATE,
            log_level: "warn".to_string(),
            remote_models: default_remote_models(),
            chunked: ChunkedDecodeSettings::default(),
        }
    }
}

impl PhraseSettings {
    /// Directory holding per-model data for `model_id`.
    pub fn model_data_dir(&self, model_id: &str) -> PathBuf {
        self.data_dir.join(model_id)
    }

    /// Base directory of pre-installed models.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Remote repository alias configured for `model_id`, if any.
    pub fn remote_model(&self, model_id: &str) -> Option<&str> {
        self.remote_models.get(model_id).map(String::as_str)
    }
}

/// Chunked decoding window, in encoder frames (and seconds for the batch cap).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkedDecodeSettings {
    /// Frames per decoding chunk.
    pub chunk_size: u32,
    /// Left attention context in frames.
    pub left_context_size: u32,
    /// Right attention context in frames.
    pub right_context_size: u32,
    /// Upper bound of audio seconds decoded per batch.
    pub total_batch_duration_secs: u32,
}

impl Default for ChunkedDecodeSettings {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            left_context_size: 128,
            right_context_size: 128,
            total_batch_duration_secs: 600,
        }
    }
}

pub(crate) fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
