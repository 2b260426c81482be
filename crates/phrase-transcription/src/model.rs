//! Model descriptors and word casing strategies.

use serde::{Deserialize, Serialize};

/// Language family tag that enables Vietnamese normalization.
pub const VIETNAMESE: &str = "vi";

/// Backend kind a model is served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    /// Kaldi-style recognizer fed chunk by chunk.
    StreamingRecognizer,
    /// Encoder/decoder/joiner checkpoint decoded with greedy search.
    TransducerCheckpoint,
    /// Single-shot pipeline over a fully buffered waveform.
    PipelineModel,
    /// Long-form model that decodes a WAV file in windows.
    ChunkedFile,
}

impl ModelType {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StreamingRecognizer => "streaming-recognizer",
            Self::TransducerCheckpoint => "transducer-checkpoint",
            Self::PipelineModel => "pipeline-model",
            Self::ChunkedFile => "chunked-file",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output letter-case convention applied to recognized text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordCasing {
    /// Leave text as the backend produced it.
    #[default]
    Keep,
    /// Lowercase everything.
    Lower,
    /// Uppercase everything.
    Upper,
    /// Uppercase the first letter of each word, lowercase the rest.
    Title,
}

impl WordCasing {
    /// The pure transform for this strategy.
    pub fn function(self) -> fn(&str) -> String {
        match self {
            Self::Keep => str::to_owned,
            Self::Lower => str::to_lowercase,
            Self::Upper => str::to_uppercase,
            Self::Title => title_case,
        }
    }

    /// Apply the strategy to `text`.
    pub fn apply(self, text: &str) -> String {
        (self.function())(text)
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Immutable description of a recognition model.
///
/// Owned by an external registry; the transcription layer only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique model identifier, also the name of its data directory.
    pub id: String,
    /// Language family tag (e.g. `vi`, `en`).
    pub language_family: String,
    /// Casing strategy applied to the recognized text.
    #[serde(default)]
    pub casing: WordCasing,
    /// Remote source location, used to resolve downloadable assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Backend kind.
    #[serde(rename = "type")]
    pub model_type: ModelType,
}

impl Model {
    /// Create a descriptor with [`WordCasing::Keep`] and no URL.
    pub fn new(
        id: impl Into<String>,
        language_family: impl Into<String>,
        model_type: ModelType,
    ) -> Self {
        Self {
            id: id.into(),
            language_family: language_family.into(),
            casing: WordCasing::Keep,
            url: None,
            model_type,
        }
    }

    /// Set the casing strategy.
    #[must_use]
    pub fn with_casing(mut self, casing: WordCasing) -> Self {
        self.casing = casing;
        self
    }

    /// Set the remote source URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether transcripts from this model get Vietnamese normalization.
    pub fn is_vietnamese(&self) -> bool {
        self.language_family == VIETNAMESE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
