//! Error types shared by every backend.

/// Errors that can occur during transcription.
///
/// Every failure is fatal for the request that raised it; nothing here is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    /// No backend implementation is registered for the model's kind.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// Expected model files are absent and could not be resolved.
    #[error("missing model assets: {0}")]
    MissingAsset(String),

    /// Fetching model files from the remote repository failed.
    #[error("failed to download model '{repo_id}': {reason}")]
    DownloadFailure {
        /// Remote repository identifier (e.g. `org/name`).
        repo_id: String,
        /// Underlying cause.
        reason: String,
    },

    /// The backend could not materialize resources from present files.
    #[error("failed to load model: {0}")]
    LoadFailure(String),

    /// The backend raised during inference.
    #[error("transcription failed: {0}")]
    DecodeFailure(String),

    /// Model output has an unexpected structure (incompatible model/checkpoint).
    #[error("unexpected model output shape: {0}")]
    ShapeError(String),

    /// I/O error (directory creation, scratch files, token files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transcription operations.
pub type Result<T> = std::result::Result<T, TranscriptionError>;

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors into `TranscriptionError`.
pub trait ResultExt<T> {
    /// Wrap the error as [`TranscriptionError::LoadFailure`] with `context` prefix.
    fn load_failure(self, context: &str) -> Result<T>;
    /// Wrap the error as [`TranscriptionError::DecodeFailure`] with `context` prefix.
    fn decode_failure(self, context: &str) -> Result<T>;
    /// Wrap the error as [`TranscriptionError::ShapeError`] with `context` prefix.
    fn shape(self, context: &str) -> Result<T>;
    /// Wrap the error as [`TranscriptionError::MissingAsset`] with `context` prefix.
    fn missing_asset(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn load_failure(self, context: &str) -> Result<T> {
        self.map_err(|e| TranscriptionError::LoadFailure(format!("{context}: {e}")))
    }
    fn decode_failure(self, context: &str) -> Result<T> {
        self.map_err(|e| TranscriptionError::DecodeFailure(format!("{context}: {e}")))
    }
    fn shape(self, context: &str) -> Result<T> {
        self.map_err(|e| TranscriptionError::ShapeError(format!("{context}: {e}")))
    }
    fn missing_asset(self, context: &str) -> Result<T> {
        self.map_err(|e| TranscriptionError::MissingAsset(format!("{context}: {e}")))
    }
}

impl TranscriptionError {
    /// Short stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingDependency(_) => "missing_dependency",
            Self::MissingAsset(_) => "missing_asset",
            Self::DownloadFailure { .. } => "download_failure",
            Self::LoadFailure(_) => "load_failure",
            Self::DecodeFailure(_) => "decode_failure",
            Self::ShapeError(_) => "shape_error",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn transcription_error_display() {
        let e = TranscriptionError::MissingAsset("tokens.txt".into());
        assert_eq!(e.to_string(), "missing model assets: tokens.txt");

        let e = TranscriptionError::DownloadFailure {
            repo_id: "vinai/PhoWhisper-base".into(),
            reason: "timeout".into(),
        };
        assert!(e.to_string().contains("vinai/PhoWhisper-base"));
        assert!(e.to_string().contains("timeout"));
    }

    #[test]
    fn result_ext_load_failure_context() {
        let err: std::result::Result<(), &str> = Err("corrupt checkpoint");
        let mapped = err.load_failure("torchscript load");
        assert_matches!(mapped, Err(TranscriptionError::LoadFailure(s)) if s == "torchscript load: corrupt checkpoint");
    }

    #[test]
    fn result_ext_decode_failure_context() {
        let err: std::result::Result<(), &str> = Err("oom");
        let mapped = err.decode_failure("joiner");
        assert_matches!(mapped, Err(TranscriptionError::DecodeFailure(s)) if s == "joiner: oom");
    }

    #[test]
    fn result_ext_shape_context() {
        let err: std::result::Result<(), &str> = Err("rank 2");
        let mapped = err.shape("encoder output");
        assert_matches!(mapped, Err(TranscriptionError::ShapeError(s)) if s == "encoder output: rank 2");
    }

    #[test]
    fn result_ext_ok_passthrough() {
        let ok: std::result::Result<i32, &str> = Ok(42);
        assert_eq!(ok.decode_failure("ctx").unwrap(), 42);
    }

    #[test]
    fn kind_labels_are_distinct() {
        let kinds = [
            TranscriptionError::MissingDependency(String::new()).kind(),
            TranscriptionError::MissingAsset(String::new()).kind(),
            TranscriptionError::LoadFailure(String::new()).kind(),
            TranscriptionError::DecodeFailure(String::new()).kind(),
            TranscriptionError::ShapeError(String::new()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
