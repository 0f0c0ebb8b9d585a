//! tidal: two-timescale character-level language model.
//!
//! CLI binary entry point. Builds a character vocabulary from a corpus,
//! constructs or loads a model, and generates text from a seed.

use std::fs;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tidal::config::N_SENTINELS;
use tidal::{Decoder, ModelConfig, Policy, TidalModel, Vocabulary, START_ID};

/// tidal generation CLI.
#[derive(Parser, Debug)]
#[command(
    name = "tidal",
    about = "tidal: decay-averaged context fused with a fast recurrence",
    version
)]
struct Cli {
    /// Corpus file the character vocabulary is built from.
    #[arg(short, long)]
    corpus: String,

    /// Seed text to condition generation on.
    #[arg(short, long, default_value = "")]
    seed: String,

    /// Decoding policy: "sample" or "greedy".
    #[arg(short, long, default_value = "sample")]
    policy: String,

    /// Maximum number of tokens to generate.
    #[arg(short = 'n', long, default_value_t = 80)]
    max_tokens: usize,

    /// Decay constant of the context state, in [0, 1].
    #[arg(long, default_value_t = 0.97)]
    alpha: f32,

    /// Context state width (also the slow embedding width).
    #[arg(long, default_value_t = 64)]
    context_width: usize,

    /// Fast recurrence hidden width.
    #[arg(long, default_value_t = 128)]
    hidden_width: usize,

    /// Fast embedding width.
    #[arg(long, default_value_t = 64)]
    fast_width: usize,

    /// Window length histories are padded or truncated to.
    #[arg(long, default_value_t = 80)]
    window: usize,

    /// RNG seed for initialisation and sampling.
    #[arg(long, default_value_t = 42)]
    rng_seed: u64,

    /// Load weights from a previous run instead of random initialisation.
    #[arg(long)]
    load: Option<String>,

    /// Save the weights after the run.
    #[arg(long)]
    save: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let policy = match cli.policy.as_str() {
        "sample" => Policy::Sample,
        "greedy" => Policy::Greedy,
        other => bail!("unknown policy '{}', expected 'sample' or 'greedy'", other),
    };

    let text = fs::read_to_string(&cli.corpus)
        .with_context(|| format!("failed to read corpus '{}'", cli.corpus))?;
    let vocab = Vocabulary::from_corpus(&text);
    tracing::info!(
        "vocabulary: {} ids ({} characters + sentinels)",
        vocab.len(),
        vocab.len() - N_SENTINELS,
    );

    let model = match &cli.load {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read weights '{}'", path))?;
            let model = TidalModel::from_bytes(&bytes)?;
            tracing::info!("loaded {} parameters from {}", model.param_count(), path);
            model
        }
        None => {
            let config = ModelConfig {
                context_width: cli.context_width,
                hidden_width: cli.hidden_width,
                slow_embedding_width: cli.context_width,
                fast_embedding_width: cli.fast_width,
                max_sequence_length: cli.window,
                decay_alpha: cli.alpha,
                vocab_size: vocab.len(),
            };
            let mut rng = StdRng::seed_from_u64(cli.rng_seed);
            let model = TidalModel::init(config, &mut rng)?;
            tracing::info!(
                "initialised {} parameters (untrained weights generate noise)",
                model.param_count(),
            );
            model
        }
    };

    let mut seed_ids = vec![START_ID];
    seed_ids.extend(vocab.encode(&cli.seed)?);

    tracing::info!("seed: {:?}, policy: {}", cli.seed, cli.policy);

    let mut rng = StdRng::seed_from_u64(cli.rng_seed);
    let result = Decoder::new(&model).generate(&seed_ids, policy, cli.max_tokens, &mut rng)?;

    tracing::info!(
        "generated {} tokens in {:.1} ms ({:.1} tok/s), finish: {:?}",
        result.steps,
        result.total_time_ms,
        result.tokens_per_second,
        result.finish_reason,
    );

    println!("{}", vocab.decode(&result.tokens));

    if let Some(path) = &cli.save {
        fs::write(path, model.to_bytes()?)
            .with_context(|| format!("failed to write weights '{}'", path))?;
        tracing::info!("saved weights to {}", path);
    }

    Ok(())
}
