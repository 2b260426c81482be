//! Greedy transducer search over encoder output.
//!
//! The network is an opaque [`TransducerNetwork`]: an encoder producing
//! `(batch, time, feature)` frames, a stateless decoder over the last
//! `context_size` tokens, and a joiner combining both into logits.
//! Elements are processed in packed order (longest first) so each time
//! step only touches elements that still have frames.

use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, ArrayView3, Ix3};
use tracing::debug;

use crate::types::{Result, ResultExt, TranscriptionError};

/// Encoder frames plus the number of valid frames per batch element.
#[derive(Clone, Debug)]
pub struct EncoderOutput {
    /// Expected shape `(batch, time, feature)`.
    pub frames: ArrayD<f32>,
    /// Valid frame count for each batch element.
    pub lengths: Vec<usize>,
}

/// Opaque transducer network.
///
/// Called from blocking threads; implementations may run heavy compute.
pub trait TransducerNetwork: Send + Sync {
    /// Token id of the blank symbol.
    fn blank_id(&self) -> i64;

    /// Number of previous tokens the decoder conditions on.
    fn context_size(&self) -> usize;

    /// Encode a normalized mono waveform. Feature extraction is the network's concern.
    fn encode(&self, samples: &[f32], sample_rate: u32) -> Result<EncoderOutput>;

    /// Decoder output `(n, dim)` for `n` contexts of `context_size` token ids.
    fn decode(&self, contexts: ArrayView2<'_, i64>) -> Result<Array2<f32>>;

    /// Joiner logits `(n, vocab)` for paired encoder and decoder rows.
    fn join(
        &self,
        encoder: ArrayView2<'_, f32>,
        decoder: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>>;
}

/// Batch layout after sorting elements by descending length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedSequence {
    /// Active element count at each time step (non-increasing).
    pub batch_sizes: Vec<usize>,
    /// `sorted_indices[i]` is the original index of the i-th longest element.
    pub sorted_indices: Vec<usize>,
    /// Inverse permutation: `unsorted_indices[orig]` is its sorted position.
    pub unsorted_indices: Vec<usize>,
}

impl PackedSequence {
    /// Pack per-element lengths. Ties keep their original order.
    pub fn new(lengths: &[usize]) -> Self {
        let mut sorted_indices: Vec<usize> = (0..lengths.len()).collect();
        sorted_indices.sort_by(|&a, &b| lengths[b].cmp(&lengths[a]));

        let mut unsorted_indices = vec![0; lengths.len()];
        for (pos, &orig) in sorted_indices.iter().enumerate() {
            unsorted_indices[orig] = pos;
        }

        let max_len = lengths.iter().copied().max().unwrap_or(0);
        let batch_sizes = (0..max_len)
            .map(|t| lengths.iter().filter(|&&len| len > t).count())
            .collect();

        Self {
            batch_sizes,
            sorted_indices,
            unsorted_indices,
        }
    }
}

/// Index of the first maximum value.
pub fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Greedy search: one token at most per frame, blanks dropped.
///
/// Returns one token-id sequence per batch element in original batch order,
/// or no sequences when no element has any frame.
pub fn greedy_search(
    network: &dyn TransducerNetwork,
    encoder_out: &EncoderOutput,
) -> Result<Vec<Vec<i64>>> {
    let frames: ArrayView3<'_, f32> = encoder_out
        .frames
        .view()
        .into_dimensionality::<Ix3>()
        .shape("encoder output must be (batch, time, feature)")?;
    let (batch, time, feature) = frames.dim();

    if encoder_out.lengths.len() != batch {
        return Err(TranscriptionError::ShapeError(format!(
            "{} lengths for batch of {batch}",
            encoder_out.lengths.len()
        )));
    }
    if let Some(&len) = encoder_out.lengths.iter().find(|&&len| len > time) {
        return Err(TranscriptionError::ShapeError(format!(
            "length {len} exceeds {time} encoder frames"
        )));
    }

    let packed = PackedSequence::new(&encoder_out.lengths);
    if packed.batch_sizes.is_empty() {
        return Ok(Vec::new());
    }

    let blank_id = network.blank_id();
    let context_size = network.context_size();

    let mut hyps: Vec<Vec<i64>> = vec![vec![blank_id; context_size]; batch];
    let mut decoder_out = run_decoder(network, &hyps, context_size)?;

    for (t, &active) in packed.batch_sizes.iter().enumerate() {
        let encoder_slice = Array2::from_shape_fn((active, feature), |(i, f)| {
            frames[[packed.sorted_indices[i], t, f]]
        });
        if decoder_out.nrows() < active {
            return Err(TranscriptionError::ShapeError(format!(
                "decoder produced {} rows for {active} active elements",
                decoder_out.nrows()
            )));
        }
        let decoder_slice = decoder_out.slice(ndarray::s![..active, ..]);

        let logits = network.join(encoder_slice.view(), decoder_slice)?;
        if logits.nrows() != active {
            return Err(TranscriptionError::ShapeError(format!(
                "joiner produced {} rows for {active} active elements",
                logits.nrows()
            )));
        }

        let mut emitted = false;
        for (hyp, row) in hyps.iter_mut().zip(logits.rows()) {
            let token = i64::try_from(argmax(row)).shape("token id")?;
            if token != blank_id {
                hyp.push(token);
                emitted = true;
            }
        }

        if emitted {
            decoder_out = run_decoder(network, &hyps[..active], context_size)?;
        }
    }

    let mut sorted: Vec<Option<Vec<i64>>> = hyps
        .into_iter()
        .map(|mut h| Some(h.split_off(context_size)))
        .collect();
    let results: Vec<Vec<i64>> = packed
        .unsorted_indices
        .iter()
        .map(|&pos| sorted[pos].take().unwrap_or_default())
        .collect();

    debug!(
        batch,
        steps = packed.batch_sizes.len(),
        tokens = results.iter().map(Vec::len).sum::<usize>(),
        "greedy search complete"
    );
    Ok(results)
}

fn run_decoder(
    network: &dyn TransducerNetwork,
    hyps: &[Vec<i64>],
    context_size: usize,
) -> Result<Array2<f32>> {
    let contexts = Array2::from_shape_fn((hyps.len(), context_size), |(i, j)| {
        let hyp = &hyps[i];
        hyp[hyp.len() - context_size + j]
    });
    let out = network.decode(contexts.view())?;
    if out.nrows() != hyps.len() {
        return Err(TranscriptionError::ShapeError(format!(
            "decoder produced {} rows for {} contexts",
            out.nrows(),
            hyps.len()
        )));
    }
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
