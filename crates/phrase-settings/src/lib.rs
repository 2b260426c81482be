//! # phrase-settings
//!
//! Configuration for speech-to-phrase transcription, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`PhraseSettings::default()`]
//! 2. **User file**: `~/.speech-to-phrase/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PHRASE_*` overrides (highest priority)
//!
//! Settings are loaded once by the host process and passed by reference to
//! the transcription layer; there is no global singleton.
//!
//! ## Crate Position
//!
//! Standalone. Depended on by: phrase-transcription, phrase-cli.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
