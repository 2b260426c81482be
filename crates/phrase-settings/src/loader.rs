//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PhraseSettings::default()`]
//! 2. If `~/.speech-to-phrase/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `PHRASE_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{PhraseSettings, home_dir};

/// Resolve the path to the settings file (`~/.speech-to-phrase/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".speech-to-phrase").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PhraseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<PhraseSettings> {
    let defaults = serde_json::to_value(PhraseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PhraseSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (file/default value is kept).
pub fn apply_env_overrides(settings: &mut PhraseSettings) {
    if let Some(v) = read_env_string("PHRASE_MODELS_DIR") {
        settings.models_dir = PathBuf::from(v);
    }
    if let Some(v) = read_env_string("PHRASE_DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }
    if let Some(v) = read_env_string("PHRASE_LOG_LEVEL") {
        settings.log_level = v;
    }
    if let Some(v) = read_env_u32("PHRASE_SAMPLE_RATE", 8_000, 192_000) {
        settings.sample_rate = v;
    }
    if let Some(v) = read_env_u32("PHRASE_CHUNK_SIZE", 1, 4_096) {
        settings.chunked.chunk_size = v;
    }
}

fn validate(settings: &PhraseSettings) -> Result<()> {
    if settings.sample_rate == 0 {
        return Err(SettingsError::InvalidValue(
            "sampleRate must be positive".into(),
        ));
    }
    if settings.chunked.chunk_size == 0 {
        return Err(SettingsError::InvalidValue(
            "chunked.chunkSize must be positive".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
