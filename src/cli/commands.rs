// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `generate`, and all
// their flags. Each Args struct converts into the matching
// application config, so Layer 2 never sees clap types.

use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a character-level LSTM on a text file
    Train(TrainArgs),

    /// Generate text from a trained checkpoint
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training corpus; any bytes are accepted
    #[arg(long)]
    pub corpus_file: String,

    /// Where configs, vocabulary and snapshots are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Semicolon-delimited loss log (append mode)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Write a training-loss row every N iterations (0 = never)
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Characters per training sequence
    #[arg(long, default_value_t = 50)]
    pub sequence_length: usize,

    /// Independent sequences per batch
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Stop after this many solver iterations
    #[arg(long, default_value_t = 10_000)]
    pub max_iter: usize,

    /// Validate every N iterations (0 = never)
    #[arg(long, default_value_t = 100)]
    pub display: usize,

    /// Extra solver snapshot every N iterations (0 = only at the end)
    #[arg(long, default_value_t = 0)]
    pub snapshot_interval: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.002)]
    pub lr: f64,

    #[arg(long, default_value_t = 64)]
    pub embed_dim: usize,

    /// LSTM hidden units per layer
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Gradient norm ceiling (0 = no clipping)
    #[arg(long, default_value_t = 5.0)]
    pub clip_gradients: f32,

    /// Resume from a .solverstate.json manifest, or "latest"
    #[arg(long)]
    pub resume: Option<String>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_file:       a.corpus_file,
            checkpoint_dir:    a.checkpoint_dir,
            log_file:          a.log_file,
            log_interval:      a.log_interval,
            sequence_length:   a.sequence_length,
            batch_size:        a.batch_size,
            max_iter:          a.max_iter,
            display:           a.display,
            snapshot_interval: a.snapshot_interval,
            lr:                a.lr,
            embed_dim:         a.embed_dim,
            hidden_size:       a.hidden_size,
            num_layers:        a.num_layers,
            dropout:           a.dropout,
            clip_gradients:    a.clip_gradients,
            resume:            a.resume,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Starting text; padded or cut to the sequence length
    #[arg(long, default_value = "")]
    pub seed: String,

    /// Number of characters to generate
    #[arg(long, short = 'n', default_value_t = 500)]
    pub length: usize,

    /// 0 = always the most likely character; up to 1 = more adventurous.
    /// Negative values are mirrored, values above 1 become 1.
    #[arg(long, default_value_t = 0.5, allow_hyphen_values = true)]
    pub temperature: f32,

    /// Training run to load from
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Model config JSON (default: <checkpoint_dir>/model_config.json)
    #[arg(long)]
    pub model_config: Option<String>,

    /// Snapshot manifest or weights file (default: latest snapshot)
    #[arg(long)]
    pub weights: Option<String>,

    /// Vocabulary file (default: <checkpoint_dir>/vocabulary_<V>.txt)
    #[arg(long)]
    pub vocabulary: Option<String>,

    /// Default: the training run's value
    #[arg(long)]
    pub sequence_length: Option<usize>,

    /// Default: the training run's value
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Also append the generated text to this file
    #[arg(long)]
    pub output_file: Option<String>,

    /// Do not echo characters as they are generated
    #[arg(long)]
    pub quiet: bool,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            checkpoint_dir:  a.checkpoint_dir,
            model_config:    a.model_config,
            weights:         a.weights,
            vocabulary:      a.vocabulary,
            sequence_length: a.sequence_length,
            batch_size:      a.batch_size,
            seed:            a.seed,
            length:          a.length,
            temperature:     a.temperature,
            output_file:     a.output_file,
            display:         !a.quiet,
        }
    }
}
