//! Remote asset resolution: model to repository id, plus on-demand fetch.

use std::collections::BTreeMap;
use std::path::Path;

use phrase_settings::PhraseSettings;
use tracing::{debug, info};

use crate::model::Model;
use crate::types::{Result, TranscriptionError};

/// Host that marks a model URL as a `HuggingFace` repository.
const HF_HOST: &str = "huggingface.co";

/// Maps a model descriptor to the remote repository its assets come from.
pub trait RemoteLocator: Send + Sync {
    /// Repository id (e.g. `org/name`), or `None` if the model has no remote source.
    fn repo_id(&self, model: &Model) -> Option<String>;
}

/// Resolves `https://huggingface.co/<org>/<name>[/...]` URLs, then falls back
/// to an explicit model-id → repo-id alias table.
#[derive(Clone, Debug, Default)]
pub struct HuggingFaceLocator {
    aliases: BTreeMap<String, String>,
}

impl HuggingFaceLocator {
    /// Locator with the given alias table.
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Locator using the `remoteModels` table from settings.
    pub fn from_settings(settings: &PhraseSettings) -> Self {
        Self::new(settings.remote_models.clone())
    }
}

impl RemoteLocator for HuggingFaceLocator {
    fn repo_id(&self, model: &Model) -> Option<String> {
        model
            .url
            .as_deref()
            .and_then(repo_id_from_url)
            .or_else(|| self.aliases.get(&model.id).cloned())
    }
}

/// Extract `org/name` from a `HuggingFace` URL.
pub fn repo_id_from_url(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let mut parts = rest.split('/').filter(|p| !p.is_empty());
    let host = parts.next()?;
    let host = host.split(':').next().unwrap_or_default();
    if host != HF_HOST && !host.ends_with(".huggingface.co") {
        return None;
    }
    let org = parts.next()?;
    let name = parts.next()?;
    Some(format!("{org}/{name}"))
}

/// Downloads named files of a remote repository into a local directory.
///
/// Called from blocking loader threads.
pub trait AssetFetcher: Send + Sync {
    /// Fetch `files` from `repo_id` into `target_dir`.
    fn fetch(&self, repo_id: &str, target_dir: &Path, files: &[&str]) -> Result<()>;
}

/// Fetcher for hosts without network access: every fetch fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineFetcher;

impl AssetFetcher for OfflineFetcher {
    fn fetch(&self, repo_id: &str, _target_dir: &Path, _files: &[&str]) -> Result<()> {
        Err(TranscriptionError::DownloadFailure {
            repo_id: repo_id.to_string(),
            reason: "remote fetching is disabled".into(),
        })
    }
}

/// Ensure every `expected` file exists under `model_dir`, fetching the
/// repository resolved for `model` only when at least one is absent.
pub fn ensure_model_files(
    model: &Model,
    model_dir: &Path,
    expected: &[&str],
    locator: &dyn RemoteLocator,
    fetcher: &dyn AssetFetcher,
) -> Result<()> {
    if expected.iter().all(|name| model_dir.join(name).exists()) {
        debug!(dir = %model_dir.display(), "model files already present");
        return Ok(());
    }

    let repo_id = locator.repo_id(model).ok_or_else(|| {
        TranscriptionError::MissingAsset(format!(
            "cannot determine remote repository for model '{}'; set its URL to the repository",
            model.id
        ))
    })?;

    info!(repo_id = %repo_id, dir = %model_dir.display(), "downloading model files");
    fetcher.fetch(&repo_id, model_dir, expected)?;

    let missing: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|name| !model_dir.join(name).exists())
        .collect();
    if !missing.is_empty() {
        return Err(TranscriptionError::MissingAsset(format!(
            "repository '{repo_id}' did not provide: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// `hf-hub` backed fetcher; files land in the hub cache and are copied into place.
#[cfg(feature = "hub")]
#[derive(Clone, Copy, Debug, Default)]
pub struct HfHubFetcher;

#[cfg(feature = "hub")]
impl AssetFetcher for HfHubFetcher {
    fn fetch(&self, repo_id: &str, target_dir: &Path, files: &[&str]) -> Result<()> {
        let download_err = |reason: String| TranscriptionError::DownloadFailure {
            repo_id: repo_id.to_string(),
            reason,
        };

        std::fs::create_dir_all(target_dir)?;
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| download_err(format!("HF API init: {e}")))?;
        let repo = api.model(repo_id.to_string());

        for &filename in files {
            let target = target_dir.join(filename);
            if target.exists() {
                debug!("skipping {filename} (already exists)");
                continue;
            }

            info!("downloading {filename}...");
            let cached_path = repo
                .get(filename)
                .map_err(|e| download_err(format!("{filename}: {e}")))?;
            if cached_path != target {
                let _ = std::fs::copy(&cached_path, &target)
                    .map_err(|e| download_err(format!("copy {filename}: {e}")))?;
            }
            debug!("downloaded {filename}");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
