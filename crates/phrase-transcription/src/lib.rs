//! Transcription orchestration for speech-to-phrase.
//!
//! Drives one of several interchangeable recognition backends over a stream
//! of raw PCM and applies shared post-processing to produce a final phrase.
//! Neural inference is delegated to injected engine traits.
//!
//! # Architecture
//!
//! ```text
//! PCM chunks (16-bit LE, mono)
//! → Transcriber (dispatch by ModelType)
//! → Backend (ResourceCache: load once per model directory)
//!     streaming:  recognizer per request, fragments joined
//!     transducer: encode → greedy search → token table → text
//!     pipeline:   f32 waveform → RawResult → text (trailing '.' dropped)
//!     chunked:    scratch WAV → windowed decode → RawResult → text
//! → casing → Vietnamese normalization (vi models) → meta decode
//! ```

#![deny(unsafe_code)]

pub mod audio;
pub mod backends;
pub mod cache;
pub mod decoder;
pub mod dirs;
pub mod finalize;
pub mod model;
pub mod remote;
pub mod telemetry;
pub mod tokens;
pub mod transcriber;
pub mod types;
pub mod vi_normalize;

pub use audio::AudioStream;
pub use backends::{Backend, TranscribeContext};
pub use cache::ResourceCache;
pub use decoder::{EncoderOutput, TransducerNetwork};
pub use dirs::DataDirs;
pub use finalize::{Finalizer, IdentityMetaDecoder, MetaDecoder};
pub use model::{Model, ModelType, WordCasing};
pub use remote::{AssetFetcher, HuggingFaceLocator, OfflineFetcher, RemoteLocator};
pub use tokens::{RawResult, TokenTable};
pub use transcriber::{Transcriber, TranscriberBuilder};
pub use types::{Result, ResultExt, TranscriptionError};

#[cfg(feature = "hub")]
pub use remote::HfHubFetcher;
