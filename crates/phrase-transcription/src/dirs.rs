//! Model directory resolution.

use std::path::PathBuf;

use phrase_settings::PhraseSettings;

use crate::types::Result;

/// Where model files live on disk.
///
/// Implemented by [`PhraseSettings`]; tests inject their own.
pub trait DataDirs: Send + Sync {
    /// Base directory of pre-installed models (streaming recognizers).
    fn models_dir(&self) -> PathBuf;

    /// Per-model data directory (checkpoints, downloads).
    fn model_data_dir(&self, model_id: &str) -> PathBuf;
}

impl DataDirs for PhraseSettings {
    fn models_dir(&self) -> PathBuf {
        PhraseSettings::models_dir(self).to_path_buf()
    }

    fn model_data_dir(&self, model_id: &str) -> PathBuf {
        PhraseSettings::model_data_dir(self, model_id)
    }
}

/// Resolve the data directory for `model_id`, creating it if absent.
pub async fn create_model_data_dir(dirs: &dyn DataDirs, model_id: &str) -> Result<PathBuf> {
    let dir = dirs.model_data_dir(model_id);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}
