//! The autoregressive generation loop.
//!
//! Each step re-runs the full forward pipeline on the padded history and
//! appends one token. There is no incremental state reuse between steps:
//! every step pays a full pass over the window. That cost is accepted; the
//! window is short and bounded by `max_sequence_length`.

use std::time::Instant;

use rand::rngs::StdRng;

use crate::core::model::TidalModel;
use crate::decoding::sampler::{self, Policy};
use crate::error::Result;
use crate::vocab::{Vocabulary, END_ID, PAD_ID, START_ID};

/// Why decoding stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// The end sentinel was produced.
    EndToken,

    /// The step bound was reached. Truncation is a defined terminal
    /// condition, not an error.
    MaxSteps,
}

/// Decoding state machine: running until a terminal condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeState {
    Running,
    Done(FinishReason),
}

/// One finished generation.
#[derive(Clone, Debug)]
pub struct GenerationResult {
    /// The sequence (seed included) with all sentinels stripped.
    pub tokens: Vec<usize>,

    pub finish_reason: FinishReason,

    /// Number of forward passes taken.
    pub steps: usize,

    pub total_time_ms: f32,

    pub tokens_per_second: f32,
}

/// Autoregressive decoder over a frozen model.
pub struct Decoder<'a> {
    model: &'a TidalModel,
}

impl<'a> Decoder<'a> {
    pub fn new(model: &'a TidalModel) -> Self {
        Self { model }
    }

    /// Extend `seed` until the end sentinel appears or `max_steps` tokens
    /// have been generated.
    ///
    /// The generator handle is threaded through explicitly so runs are
    /// reproducible; the greedy policy never touches it.
    pub fn generate(
        &self,
        seed: &[usize],
        policy: Policy,
        max_steps: usize,
        rng: &mut StdRng,
    ) -> Result<GenerationResult> {
        let start = Instant::now();

        let mut history = seed.to_vec();
        let mut steps = 0usize;
        let mut state = if max_steps == 0 {
            DecodeState::Done(FinishReason::MaxSteps)
        } else {
            DecodeState::Running
        };

        while state == DecodeState::Running {
            let probs = self.model.forward(&history)?;
            let token = sampler::select(&probs, policy, PAD_ID, rng)?;
            history.push(token);
            steps += 1;

            state = if token == END_ID {
                DecodeState::Done(FinishReason::EndToken)
            } else if steps >= max_steps {
                DecodeState::Done(FinishReason::MaxSteps)
            } else {
                DecodeState::Running
            };
        }

        let finish_reason = match state {
            DecodeState::Done(reason) => reason,
            DecodeState::Running => unreachable!("loop exits only in a terminal state"),
        };

        let tokens: Vec<usize> = history
            .into_iter()
            .filter(|id| !Vocabulary::is_sentinel(*id))
            .collect();

        let elapsed = start.elapsed().as_secs_f32() * 1000.0;
        let result = GenerationResult {
            tokens,
            finish_reason,
            steps,
            total_time_ms: elapsed,
            tokens_per_second: if elapsed > 0.0 {
                steps as f32 / (elapsed / 1000.0)
            } else {
                0.0
            },
        };

        tracing::debug!(
            steps = result.steps,
            reason = ?result.finish_reason,
            "decode finished in {:.1} ms",
            result.total_time_ms,
        );

        Ok(result)
    }

    /// Text-level convenience: encode the seed behind a start sentinel,
    /// generate, decode.
    pub fn generate_text(
        &self,
        vocab: &Vocabulary,
        seed_text: &str,
        policy: Policy,
        max_steps: usize,
        rng: &mut StdRng,
    ) -> Result<String> {
        let mut seed = vec![START_ID];
        seed.extend(vocab.encode(seed_text)?);
        let result = self.generate(&seed, policy, max_steps, rng)?;
        Ok(vocab.decode(&result.tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use ndarray::array;
    use rand::SeedableRng;

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            context_width: 2,
            hidden_width: 2,
            slow_embedding_width: 2,
            fast_embedding_width: 2,
            max_sequence_length: 4,
            decay_alpha: 0.5,
            vocab_size: 5,
        }
    }

    /// Zero-weight model rigged so that greedy decoding emits token 3 while
    /// the context is weak and the end sentinel once it has accumulated:
    /// token 3's slow embedding is [1, 0], the end sentinel's vocabulary row
    /// reads that first coordinate, and a constant 0.6 favours token 3 until
    /// the context's first coordinate exceeds it (after two emissions of 3).
    fn rigged_model() -> TidalModel {
        let mut model = TidalModel::zeros(tiny_config()).unwrap();
        model.slow_embedding.weight.row_mut(3).assign(&array![1.0, 0.0]);
        model.slow_branch.w_vocab.row_mut(END_ID).assign(&array![1.0, 0.0]);
        model.slow_branch.b_vocab[3] = 0.6;
        model
    }

    #[test]
    fn test_rigged_greedy_emits_two_tokens_then_end() {
        let model = rigged_model();
        let mut rng = StdRng::seed_from_u64(0);
        let result = Decoder::new(&model)
            .generate(&[START_ID], Policy::Greedy, 10, &mut rng)
            .unwrap();

        assert_eq!(result.tokens, vec![3, 3]);
        assert_eq!(result.finish_reason, FinishReason::EndToken);
        assert_eq!(result.steps, 3); // two running steps, one terminal
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let mut rng_init = StdRng::seed_from_u64(21);
        let model = TidalModel::init(tiny_config(), &mut rng_init).unwrap();
        let decoder = Decoder::new(&model);

        let mut rng_a = StdRng::seed_from_u64(0);
        let mut rng_b = StdRng::seed_from_u64(999); // greedy ignores the rng
        let a = decoder.generate(&[START_ID], Policy::Greedy, 8, &mut rng_a).unwrap();
        let b = decoder.generate(&[START_ID], Policy::Greedy, 8, &mut rng_b).unwrap();
        assert_eq!(a.tokens, b.tokens);
        assert_eq!(a.finish_reason, b.finish_reason);
    }

    #[test]
    fn test_truncation_at_max_steps() {
        // A zero model is uniform and greedy then always picks the same
        // non-end token, so the step bound is the only terminal condition.
        let model = TidalModel::zeros(tiny_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = Decoder::new(&model)
            .generate(&[START_ID], Policy::Greedy, 5, &mut rng)
            .unwrap();

        assert_eq!(result.finish_reason, FinishReason::MaxSteps);
        assert_eq!(result.steps, 5);
        assert_eq!(result.tokens.len(), 5);
    }

    #[test]
    fn test_output_contains_no_sentinels() {
        let model = TidalModel::zeros(tiny_config()).unwrap();
        let decoder = Decoder::new(&model);
        for policy in [Policy::Greedy, Policy::Sample] {
            let mut rng = StdRng::seed_from_u64(4);
            let result = decoder.generate(&[START_ID], policy, 16, &mut rng).unwrap();
            assert!(result.steps <= 16);
            assert!(result.tokens.iter().all(|id| !Vocabulary::is_sentinel(*id)));
        }
    }

    #[test]
    fn test_sampling_is_reproducible_per_seed() {
        let mut rng_init = StdRng::seed_from_u64(8);
        let model = TidalModel::init(tiny_config(), &mut rng_init).unwrap();
        let decoder = Decoder::new(&model);

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            decoder
                .generate(&[START_ID], Policy::Sample, 12, &mut rng)
                .unwrap()
                .tokens
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn test_zero_max_steps_generates_nothing() {
        let model = TidalModel::zeros(tiny_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = Decoder::new(&model)
            .generate(&[START_ID], Policy::Greedy, 0, &mut rng)
            .unwrap();
        assert!(result.tokens.is_empty());
        assert_eq!(result.steps, 0);
        assert_eq!(result.finish_reason, FinishReason::MaxSteps);
    }

    #[test]
    fn test_generate_text_with_rigged_model() {
        // Corpus "ab" gives vocab size 5 with 'a' at id 3, matching the rig.
        let vocab = Vocabulary::from_corpus("ab");
        let model = rigged_model();
        let mut rng = StdRng::seed_from_u64(0);
        let text = Decoder::new(&model)
            .generate_text(&vocab, "", Policy::Greedy, 10, &mut rng)
            .unwrap();
        assert_eq!(text, "aa");
    }
}
