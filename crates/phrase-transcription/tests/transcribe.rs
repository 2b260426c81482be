#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use ndarray::{Array2, Array3, ArrayView2};
use parking_lot::Mutex;
use phrase_settings::PhraseSettings;
use phrase_transcription::backends::{
    ChunkedBackend, ChunkedDecodeOptions, ChunkedEngine, ModelSource, PipelineBackend,
    PipelineEngine, Recognizer, StreamingBackend, StreamingEngine, TransducerBackend,
    TransducerEngine,
};
use phrase_transcription::{
    AssetFetcher, AudioStream, EncoderOutput, HuggingFaceLocator, Model, ModelType,
    OfflineFetcher, RawResult, Result, Transcriber, TranscriptionError, TransducerNetwork,
    WordCasing,
};

// ─────────────────────────────────────────────────────────────────────────────
// Mock engines
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    inferences: AtomicUsize,
}

impl Counters {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn inferences(&self) -> usize {
        self.inferences.load(Ordering::SeqCst)
    }
}

/// Emits each chunk's UTF-8 text as one utterance.
struct UtteranceEngine(Arc<Counters>);

struct UtteranceRecognizer {
    counters: Arc<Counters>,
    last: String,
}

impl Recognizer for UtteranceRecognizer {
    fn accept_waveform(&mut self, pcm: &[u8]) -> Result<bool> {
        let _ = self.counters.inferences.fetch_add(1, Ordering::SeqCst);
        self.last = String::from_utf8_lossy(pcm).into_owned();
        Ok(true)
    }

    fn result(&mut self) -> Result<String> {
        Ok(std::mem::take(&mut self.last))
    }

    fn final_result(&mut self) -> Result<String> {
        let _ = self.counters.inferences.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

impl StreamingEngine for UtteranceEngine {
    type Model = ();

    fn load(&self, _model_dir: &Path) -> Result<()> {
        let _ = self.0.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn recognizer(&self, _model: Arc<()>, _sample_rate: u32) -> Result<Box<dyn Recognizer>> {
        Ok(Box::new(UtteranceRecognizer {
            counters: Arc::clone(&self.0),
            last: String::new(),
        }))
    }
}

/// Every frame emits token 1.
struct EveryFrameNetwork(Arc<Counters>);

impl TransducerNetwork for EveryFrameNetwork {
    fn blank_id(&self) -> i64 {
        0
    }

    fn context_size(&self) -> usize {
        2
    }

    fn encode(&self, samples: &[f32], _sample_rate: u32) -> Result<EncoderOutput> {
        let _ = self.0.inferences.fetch_add(1, Ordering::SeqCst);
        Ok(EncoderOutput {
            frames: Array3::<f32>::zeros((1, samples.len(), 1)).into_dyn(),
            lengths: vec![samples.len()],
        })
    }

    fn decode(&self, contexts: ArrayView2<'_, i64>) -> Result<Array2<f32>> {
        Ok(Array2::zeros((contexts.nrows(), 1)))
    }

    fn join(
        &self,
        encoder: ArrayView2<'_, f32>,
        _decoder: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>> {
        Ok(Array2::from_shape_fn((encoder.nrows(), 2), |(_, v)| {
            if v == 1 { 1.0 } else { 0.0 }
        }))
    }
}

struct SlowTransducerEngine(Arc<Counters>);

impl TransducerEngine for SlowTransducerEngine {
    fn load(&self, _checkpoint: &Path) -> Result<Box<dyn TransducerNetwork>> {
        std::thread::sleep(Duration::from_millis(50));
        let _ = self.0.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EveryFrameNetwork(Arc::clone(&self.0))))
    }
}

struct EchoPipeline(Arc<Counters>, &'static str);

impl PipelineEngine for EchoPipeline {
    type Pipeline = ();

    fn load(&self, _source: &ModelSource) -> Result<()> {
        let _ = self.0.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn transcribe(&self, _pipeline: &(), _samples: &[f32], _rate: u32) -> Result<RawResult> {
        let _ = self.0.inferences.fetch_add(1, Ordering::SeqCst);
        Ok(RawResult::Text(self.1.to_string()))
    }
}

/// Records the scratch path it was handed; fails when `fail` is set.
struct RecordingChunked {
    counters: Arc<Counters>,
    seen: Arc<Mutex<Vec<(PathBuf, bool, ChunkedDecodeOptions)>>>,
    fail: bool,
}

impl ChunkedEngine for RecordingChunked {
    type Model = ();

    fn load(&self, _model_dir: &Path) -> Result<()> {
        let _ = self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn decode_file(
        &self,
        _model: &(),
        wav: &Path,
        options: &ChunkedDecodeOptions,
    ) -> Result<RawResult> {
        let _ = self.counters.inferences.fetch_add(1, Ordering::SeqCst);
        let reader = hound::WavReader::open(wav)
            .map_err(|e| TranscriptionError::DecodeFailure(e.to_string()))?;
        assert_eq!(reader.spec().sample_rate, 16_000);
        self.seen
            .lock()
            .push((wav.to_path_buf(), wav.exists(), *options));
        if self.fail {
            return Err(TranscriptionError::DecodeFailure("model crashed".into()));
        }
        Ok(RawResult::Segments(vec![
            "mở cửa ga ra".into(),
            " ".into(),
            "lúc năm giờ".into(),
        ]))
    }
}

/// Writes empty placeholders for every requested file.
#[derive(Default)]
struct PlaceholderFetcher {
    repos: Mutex<Vec<String>>,
}

impl AssetFetcher for PlaceholderFetcher {
    fn fetch(&self, repo_id: &str, target_dir: &Path, files: &[&str]) -> Result<()> {
        self.repos.lock().push(repo_id.to_string());
        for f in files {
            std::fs::write(target_dir.join(f), b"")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Fixture {
    _tmp: tempfile::TempDir,
    settings: PhraseSettings,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let settings = PhraseSettings {
        models_dir: tmp.path().join("models"),
        data_dir: tmp.path().join("data"),
        ..PhraseSettings::default()
    };
    std::fs::create_dir_all(&settings.models_dir).unwrap();
    Fixture {
        _tmp: tmp,
        settings,
    }
}

impl Fixture {
    fn install_streaming(&self, id: &str) {
        std::fs::create_dir_all(self.settings.models_dir.join(id)).unwrap();
    }

    fn install_transducer(&self, id: &str) {
        let dir = self.settings.data_dir.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cpu_jit.pt"), b"").unwrap();
        std::fs::write(dir.join("tokens.txt"), "<blk> 0\n▁bật 1\n").unwrap();
    }
}

fn empty_audio() -> AudioStream<'static> {
    Box::pin(async_stream::stream! {
        yield Bytes::new();
        yield Bytes::new();
    })
}

fn pcm_audio(samples: usize) -> AudioStream<'static> {
    Box::pin(async_stream::stream! {
        for _ in 0..samples {
            yield Bytes::from_static(&[0x10, 0x00]);
        }
    })
}

fn text_chunks(chunks: Vec<&'static str>) -> AudioStream<'static> {
    Box::pin(async_stream::stream! {
        for c in chunks {
            tokio::task::yield_now().await;
            yield Bytes::from_static(c.as_bytes());
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_audio_yields_empty_text_without_inference() {
    let fx = fixture();
    fx.install_streaming("en_stream");
    fx.install_transducer("vi_transducer");

    let counters = Arc::new(Counters::default());
    let fetcher = Arc::new(PlaceholderFetcher::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(StreamingBackend::new(UtteranceEngine(Arc::clone(&counters))))
        .backend(TransducerBackend::new(SlowTransducerEngine(Arc::clone(&counters))))
        .backend(PipelineBackend::new(
            EchoPipeline(Arc::clone(&counters), "ignored"),
            Arc::new(HuggingFaceLocator::default()),
        ))
        .backend(ChunkedBackend::new(
            RecordingChunked {
                counters: Arc::clone(&counters),
                seen: Arc::default(),
                fail: false,
            },
            Arc::new(HuggingFaceLocator::default()),
            fetcher,
        ))
        .build();

    let models = [
        Model::new("en_stream", "en", ModelType::StreamingRecognizer),
        Model::new("vi_transducer", "vi", ModelType::TransducerCheckpoint),
        Model::new("vi_pipeline", "vi", ModelType::PipelineModel),
        Model::new("vi_chunked", "vi", ModelType::ChunkedFile)
            .with_url("https://huggingface.co/org/chunked"),
    ];
    for model in &models {
        let text = transcriber.transcribe(model, empty_audio()).await.unwrap();
        assert_eq!(text, "", "{}", model.model_type);
    }
    assert_eq!(counters.inferences(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_load() {
    let fx = fixture();
    fx.install_transducer("vi_transducer");
    let counters = Arc::new(Counters::default());
    let transcriber = Arc::new(
        Transcriber::from_settings(&fx.settings)
            .backend(TransducerBackend::new(SlowTransducerEngine(Arc::clone(&counters))))
            .build(),
    );
    let model =
        Model::new("vi_transducer", "vi", ModelType::TransducerCheckpoint).with_casing(WordCasing::Title);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let transcriber = Arc::clone(&transcriber);
        let model = model.clone();
        handles.push(tokio::spawn(async move {
            transcriber.transcribe(&model, pcm_audio(2)).await
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap(), "Bật Bật");
    }
    assert_eq!(counters.loads(), 1);
    assert_eq!(counters.inferences(), 8);
}

#[tokio::test]
async fn invalidate_forces_reload() {
    let fx = fixture();
    fx.install_transducer("vi_transducer");
    let counters = Arc::new(Counters::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(TransducerBackend::new(SlowTransducerEngine(Arc::clone(&counters))))
        .build();
    let model = Model::new("vi_transducer", "vi", ModelType::TransducerCheckpoint);

    let _ = transcriber.transcribe(&model, pcm_audio(1)).await.unwrap();
    assert!(transcriber.invalidate(&model));
    let _ = transcriber.transcribe(&model, pcm_audio(1)).await.unwrap();
    assert_eq!(counters.loads(), 2);

    transcriber.clear_caches();
    assert!(!transcriber.invalidate(&model));
}

#[tokio::test]
async fn streaming_fragments_are_joined_and_normalized() {
    let fx = fixture();
    fx.install_streaming("vi_stream");
    let counters = Arc::new(Counters::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(StreamingBackend::new(UtteranceEngine(Arc::clone(&counters))))
        .build();
    let model = Model::new("vi_stream", "vi", ModelType::StreamingRecognizer)
        .with_casing(WordCasing::Lower);

    let text = transcriber
        .transcribe(&model, text_chunks(vec!["Hủy", "", "hẹn giờ", "mười lăm phút"]))
        .await
        .unwrap();
    assert_eq!(text, "huỷ hẹn giờ 15 phút");
}

#[tokio::test]
async fn pipeline_output_is_cased_and_period_stripped() {
    let fx = fixture();
    let counters = Arc::new(Counters::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(PipelineBackend::new(
            EchoPipeline(Arc::clone(&counters), "Bật ti vi."),
            Arc::new(HuggingFaceLocator::default()),
        ))
        .build();
    let model = Model::new("phowhisper-base", "vi", ModelType::PipelineModel)
        .with_casing(WordCasing::Lower);

    let text = transcriber.transcribe(&model, pcm_audio(4)).await.unwrap();
    assert_eq!(text, "bật tv");
    assert!(fx.settings.data_dir.join("phowhisper-base").is_dir());
}

#[tokio::test]
async fn chunked_fetches_missing_files_and_removes_scratch_wav() {
    let fx = fixture();
    let counters = Arc::new(Counters::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let fetcher = Arc::new(PlaceholderFetcher::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(ChunkedBackend::new(
            RecordingChunked {
                counters: Arc::clone(&counters),
                seen: Arc::clone(&seen),
                fail: false,
            },
            Arc::new(HuggingFaceLocator::default()),
            Arc::clone(&fetcher) as Arc<dyn AssetFetcher>,
        ))
        .build();
    let model = Model::new("vi_chunkformer", "vi", ModelType::ChunkedFile)
        .with_url("https://huggingface.co/khanhld/chunkformer-large-vie");

    let text = transcriber.transcribe(&model, pcm_audio(160)).await.unwrap();
    assert_eq!(text, "mở cửa gara lúc 5 giờ");
    assert_eq!(*fetcher.repos.lock(), vec!["khanhld/chunkformer-large-vie"]);

    let seen = seen.lock();
    let (path, existed, options) = &seen[0];
    assert!(*existed);
    assert!(!path.exists());
    assert_eq!(*options, ChunkedDecodeOptions::default());
}

#[tokio::test]
async fn chunked_decode_failure_still_removes_scratch_wav() {
    let fx = fixture();
    let counters = Arc::new(Counters::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(ChunkedBackend::new(
            RecordingChunked {
                counters: Arc::clone(&counters),
                seen: Arc::clone(&seen),
                fail: true,
            },
            Arc::new(HuggingFaceLocator::default()),
            Arc::new(PlaceholderFetcher::default()),
        ))
        .build();
    let model = Model::new("vi_chunkformer", "vi", ModelType::ChunkedFile)
        .with_url("https://huggingface.co/khanhld/chunkformer-large-vie");

    let err = transcriber.transcribe(&model, pcm_audio(16)).await.unwrap_err();
    assert_matches!(err, TranscriptionError::DecodeFailure(msg) if msg.contains("model crashed"));
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].0.exists());
}

#[tokio::test]
async fn chunked_without_repository_is_missing_asset_and_not_cached() {
    let fx = fixture();
    let counters = Arc::new(Counters::default());
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(ChunkedBackend::new(
            RecordingChunked {
                counters: Arc::clone(&counters),
                seen: Arc::default(),
                fail: false,
            },
            Arc::new(HuggingFaceLocator::default()),
            Arc::new(OfflineFetcher),
        ))
        .build();
    let model = Model::new("vi_local", "vi", ModelType::ChunkedFile);

    let err = transcriber.transcribe(&model, pcm_audio(4)).await.unwrap_err();
    assert_matches!(err, TranscriptionError::MissingAsset(_));
    assert_eq!(counters.loads(), 0);

    // installing the files by hand makes the next request succeed
    let dir = fx.settings.data_dir.join("vi_local");
    for f in ["config.yaml", "pytorch_model.pt", "vocab.txt"] {
        std::fs::write(dir.join(f), b"").unwrap();
    }
    let text = transcriber.transcribe(&model, pcm_audio(4)).await.unwrap();
    assert_eq!(text, "mở cửa gara lúc 5 giờ");
    assert_eq!(counters.loads(), 1);
}

#[tokio::test]
async fn offline_fetch_is_download_failure() {
    let fx = fixture();
    let transcriber = Transcriber::from_settings(&fx.settings)
        .backend(ChunkedBackend::new(
            RecordingChunked {
                counters: Arc::default(),
                seen: Arc::default(),
                fail: false,
            },
            Arc::new(HuggingFaceLocator::default()),
            Arc::new(OfflineFetcher),
        ))
        .build();
    let model = Model::new("vi_remote", "vi", ModelType::ChunkedFile)
        .with_url("https://huggingface.co/org/remote");

    let err = transcriber.transcribe(&model, pcm_audio(4)).await.unwrap_err();
    assert_matches!(err, TranscriptionError::DownloadFailure { repo_id, .. } if repo_id == "org/remote");
}
