//! Backend-agnostic post-processing of recognized text.

use std::sync::Arc;

use crate::model::Model;
use crate::vi_normalize;

/// Decodes grammar meta markers embedded in a transcript.
///
/// Must be pure and idempotent.
pub trait MetaDecoder: Send + Sync {
    /// Rewrite `text` with meta markers resolved.
    fn decode_meta(&self, text: &str) -> String;
}

/// Leaves text untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMetaDecoder;

impl MetaDecoder for IdentityMetaDecoder {
    fn decode_meta(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Apply the model's casing strategy and trim.
pub fn apply_casing(model: &Model, text: &str) -> String {
    model.casing.apply(text).trim().to_string()
}

/// Shared final stage: language normalization, then meta decoding.
#[derive(Clone)]
pub struct Finalizer {
    meta: Arc<dyn MetaDecoder>,
}

impl std::fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer").finish_non_exhaustive()
    }
}

impl Default for Finalizer {
    fn default() -> Self {
        Self::new(Arc::new(IdentityMetaDecoder))
    }
}

impl Finalizer {
    /// Finalizer using `meta` for marker decoding.
    pub fn new(meta: Arc<dyn MetaDecoder>) -> Self {
        Self { meta }
    }

    /// Trim; empty stays empty; Vietnamese normalization for `vi` models;
    /// then meta decoding.
    pub fn finalize(&self, model: &Model, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }
        if model.is_vietnamese() {
            let normalized = vi_normalize::normalize_transcript(text);
            self.meta.decode_meta(&normalized)
        } else {
            self.meta.decode_meta(text)
        }
    }

    /// Casing followed by [`Finalizer::finalize`].
    pub fn finalize_cased(&self, model: &Model, text: &str) -> String {
        let cased = apply_casing(model, text);
        if cased.is_empty() {
            return cased;
        }
        self.finalize(model, &cased)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
