//! Autoregressive decoding.
//!
//! The decoder extends a seed one token at a time: each step re-runs the
//! full forward pipeline on the padded history and selects the next token
//! by a greedy or a sampling policy, until the end sentinel appears or a
//! step bound is reached.

pub mod decoder;
pub mod sampler;
