//! # TIDAL
//!
//! **Two-timescale Inference with Decay-Averaged Latents**: a character-level
//! language model that predicts the next token by fusing two recurrent
//! branches running at different speeds.
//!
//! ## Components
//!
//! 1. **ContextCell**: a per-element exponential moving average of the slow
//!    token embeddings with a fixed, non-learned decay constant. The slow
//!    summary of everything seen so far.
//! 2. **SlowBranch**: a shared-weight, time-distributed projection of the
//!    context sequence into a per-timestep bias, plus an independent
//!    projection of the final context into vocabulary logits.
//! 3. **FastBranch**: a conventional single-layer tanh recurrence reading
//!    the fast token embedding plus the slow bias at every step; its final
//!    hidden state yields a second logit vector.
//! 4. **FusionHead**: equal-weight sum of both logit vectors, then softmax.
//!    No learned fusion parameter.
//! 5. **Decoder**: the autoregressive loop over the fused distribution, with
//!    a greedy and a pad-masked sampling policy, terminating on the end
//!    sentinel or a step bound.
//!
//! The two structural constraints (fixed scalar decay, equal-weight fusion)
//! are what set this apart from a gated recurrence or a learned ensemble:
//! the timescale separation is architectural, not trained.
//!
//! Training is an external collaborator (see [`train`]); with frozen
//! parameters every forward pass is deterministic, and randomness exists
//! only in the decoder's sampling policy behind an explicit RNG handle.

pub mod config;
pub mod core;
pub mod decoding;
pub mod error;
pub mod train;
pub mod vocab;

pub use config::ModelConfig;
pub use core::model::TidalModel;
pub use decoding::decoder::{DecodeState, Decoder, FinishReason, GenerationResult};
pub use decoding::sampler::Policy;
pub use error::{Result, TidalError};
pub use vocab::{Vocabulary, END_ID, PAD_ID, START_ID};
