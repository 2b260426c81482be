//! Audio accumulation and PCM conversion.
//!
//! Incoming audio is mono 16-bit signed little-endian PCM delivered as an
//! ordered, finite stream of byte chunks. Zero-length chunks are ignored.

use std::io::BufWriter;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tempfile::NamedTempFile;

use crate::types::{Result, ResultExt};

/// Bytes per PCM sample.
pub const SAMPLE_WIDTH: usize = 2;
/// Channel count of incoming audio.
pub const CHANNELS: u16 = 1;

/// Boxed audio chunk stream consumed by every backend.
pub type AudioStream<'a> = Pin<Box<dyn Stream<Item = Bytes> + Send + 'a>>;

/// Drain `stream` into one contiguous buffer, skipping empty chunks.
///
/// A trailing partial sample is kept as-is; [`pcm16_to_f32`] drops it.
pub async fn collect_audio(mut stream: AudioStream<'_>) -> Bytes {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        if chunk.is_empty() {
            continue;
        }
        buffer.extend_from_slice(&chunk);
    }
    buffer.freeze()
}

/// Reinterpret PCM bytes as `i16` samples.
pub fn pcm16_samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(SAMPLE_WIDTH)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

/// Convert PCM bytes to `f32` samples in `[-1.0, 1.0)`.
pub fn pcm16_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm16_samples(pcm)
        .map(|s| f32::from(s) / 32_768.0)
        .collect()
}

/// Audio duration in seconds for a PCM buffer.
pub fn duration_seconds(pcm: &[u8], sample_rate: u32) -> f64 {
    (pcm.len() / SAMPLE_WIDTH) as f64 / f64::from(sample_rate)
}

/// Write PCM bytes as a mono 16-bit WAV scratch file.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_wav(pcm: &[u8], sample_rate: u32) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("speech-to-phrase-")
        .suffix(".wav")
        .tempfile()?;

    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::new(BufWriter::new(file.as_file()), spec).decode_failure("wav header")?;
    for sample in pcm16_samples(pcm) {
        writer.write_sample(sample).decode_failure("wav sample")?;
    }
    writer.finalize().decode_failure("wav finalize")?;
    Ok(file)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(chunks: Vec<&'static [u8]>) -> AudioStream<'static> {
        Box::pin(futures::stream::iter(
            chunks.into_iter().map(Bytes::from_static),
        ))
    }

    #[tokio::test]
    async fn collect_skips_empty_chunks_and_preserves_order() {
        let audio = collect_audio(stream_of(vec![b"\x01\x02", b"", b"\x03", b"\x04"])).await;
        assert_eq!(&audio[..], b"\x01\x02\x03\x04");
    }

    #[tokio::test]
    async fn collect_empty_stream() {
        assert!(collect_audio(stream_of(vec![])).await.is_empty());
        assert!(collect_audio(stream_of(vec![b"", b""])).await.is_empty());
    }

    #[test]
    fn pcm_conversion_is_little_endian_and_normalized() {
        let pcm = [0x00, 0x80, 0xff, 0x7f, 0x00, 0x00];
        let samples = pcm16_to_f32(&pcm);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] + 1.0).abs() < f32::EPSILON);
        assert!((samples[1] - 32_767.0 / 32_768.0).abs() < f32::EPSILON);
        assert!(samples[2].abs() < f32::EPSILON);
    }

    #[test]
    fn pcm_conversion_truncates_partial_sample() {
        assert_eq!(pcm16_to_f32(&[0x10, 0x00, 0x20]).len(), 1);
        assert!(pcm16_to_f32(&[0x10]).is_empty());
    }

    #[test]
    fn duration_from_bytes() {
        let pcm = vec![0u8; 32_000];
        assert!((duration_seconds(&pcm, 16_000) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn write_wav_round_trips_through_hound() {
        let pcm: Vec<u8> = [100i16, -200, 300]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let file = write_wav(&pcm, 16_000).unwrap();

        let reader = hound::WavReader::open(file.path()).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -200, 300]);
    }

    #[test]
    fn write_wav_file_removed_on_drop() {
        let file = write_wav(&[0, 0], 16_000).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
