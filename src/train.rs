//! Seams for the external training collaborator.
//!
//! Parameter optimisation lives outside this crate. The core only requires
//! that, with frozen parameters, the forward pipeline is deterministic; the
//! traits here name the two places where the outside world plugs in: the
//! opaque optimisation step, and an observer invoked at epoch boundaries.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::model::TidalModel;
use crate::decoding::decoder::Decoder;
use crate::decoding::sampler::Policy;
use crate::vocab::Vocabulary;

/// A training example: a token history and the id that follows it.
pub type Example = (Vec<usize>, usize);

/// The opaque optimisation primitive. An implementation mutates the model's
/// parameters from a batch and reports the batch loss; the core never calls
/// this during inference.
pub trait TrainStep {
    fn train_step(&mut self, model: &mut TidalModel, batch: &[Example]) -> f32;
}

/// Hook invoked by the training collaborator after each epoch.
pub trait EpochObserver {
    fn on_epoch_end(&mut self, epoch: usize, model: &TidalModel, vocab: &Vocabulary);
}

/// An observer that generates a sample through the public decoder surface
/// and logs it, so training progress is visible as text.
pub struct SampleObserver {
    pub seed_text: String,
    pub policy: Policy,
    pub max_steps: usize,
    pub rng_seed: u64,
}

impl SampleObserver {
    pub fn new(seed_text: impl Into<String>, max_steps: usize) -> Self {
        Self {
            seed_text: seed_text.into(),
            policy: Policy::Sample,
            max_steps,
            rng_seed: 0,
        }
    }
}

impl EpochObserver for SampleObserver {
    fn on_epoch_end(&mut self, epoch: usize, model: &TidalModel, vocab: &Vocabulary) {
        // Distinct but reproducible stream per epoch.
        let mut rng = StdRng::seed_from_u64(self.rng_seed ^ epoch as u64);
        match Decoder::new(model).generate_text(
            vocab,
            &self.seed_text,
            self.policy,
            self.max_steps,
            &mut rng,
        ) {
            Ok(text) => tracing::info!(epoch, sample = %text, "epoch sample"),
            Err(err) => tracing::warn!(epoch, "epoch sample failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    struct NoopStep;

    impl TrainStep for NoopStep {
        fn train_step(&mut self, _model: &mut TidalModel, batch: &[Example]) -> f32 {
            batch.len() as f32
        }
    }

    fn fixture() -> (TidalModel, Vocabulary) {
        let vocab = Vocabulary::from_corpus("ab");
        let config = ModelConfig {
            context_width: 2,
            hidden_width: 2,
            slow_embedding_width: 2,
            fast_embedding_width: 2,
            max_sequence_length: 4,
            decay_alpha: 0.5,
            vocab_size: vocab.len(),
        };
        (TidalModel::zeros(config).unwrap(), vocab)
    }

    #[test]
    fn test_train_step_as_trait_object() {
        let (mut model, _vocab) = fixture();
        let mut step: Box<dyn TrainStep> = Box::new(NoopStep);
        let batch: Vec<Example> = vec![(vec![1, 3], 4), (vec![1, 4], 2)];
        assert_eq!(step.train_step(&mut model, &batch), 2.0);
    }

    #[test]
    fn test_sample_observer_runs() {
        let (model, vocab) = fixture();
        let mut observer = SampleObserver::new("", 4);
        observer.on_epoch_end(1, &model, &vocab);
        observer.on_epoch_end(2, &model, &vocab);
    }
}
