//! Metric name constants. No recorder is installed here; the host process owns that.

/// Transcription requests total (counter, labels: backend).
pub const TRANSCRIPTION_REQUESTS_TOTAL: &str = "transcription_requests_total";
/// Transcription failures total (counter, labels: backend, `error_kind`).
pub const TRANSCRIPTION_FAILURES_TOTAL: &str = "transcription_failures_total";
/// Transcription duration seconds (histogram, labels: backend).
pub const TRANSCRIPTION_DURATION_SECONDS: &str = "transcription_duration_seconds";
/// Resource cache loads total (counter, labels: cache).
pub const CACHE_LOADS_TOTAL: &str = "transcription_cache_loads_total";
/// Resource cache hits total (counter, labels: cache).
pub const CACHE_HITS_TOTAL: &str = "transcription_cache_hits_total";
