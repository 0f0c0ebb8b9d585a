//! Error types for model construction, forward computation and decoding.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TidalError>;

/// Everything that can go wrong inside the model core.
#[derive(Debug, Error)]
pub enum TidalError {
    /// The configuration was rejected before any forward pass could run.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A tensor width or token id is inconsistent with the configuration.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// After masking the pad symbol, no probability mass remains to sample from.
    #[error("degenerate distribution: non-pad probability mass is zero")]
    DegenerateDistribution,

    /// Weight (de)serialisation failure.
    #[error("weight persistence failed: {0}")]
    Persistence(#[from] bincode::Error),
}
