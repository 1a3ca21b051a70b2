// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `lemmatize` and
// `eval`, together with all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Boolean model options that default to ON are exposed as
// negative flags (--no-attention) so a bare flag always means
// "change the default".
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the lemmatizer on a labelled TSV corpus
    Train(TrainArgs),

    /// Lemmatize a TSV file using a trained checkpoint
    Lemmatize(LemmatizeArgs),

    /// Evaluate a trained checkpoint against a labelled corpus
    Eval(EvalArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labelled corpus file (form<TAB>lemma, blank line between sentences)
    #[arg(long, default_value = "data/corpus.tsv")]
    pub corpus: String,

    /// Directory to save model checkpoints and the dictionary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Optional word2vec text file with pretrained word vectors
    #[arg(long)]
    pub embeddings: Option<String>,

    /// Number of sentences processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// How fast the model learns — too high causes instability,
    /// too low causes slow convergence
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of sentences kept for training (rest validate)
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Character embedding size on both encoder and decoder side
    #[arg(long, default_value_t = 50)]
    pub rnn_input_size: usize,

    /// Hidden state size of the GRU stacks
    #[arg(long, default_value_t = 256)]
    pub rnn_hidden_size: usize,

    /// Number of stacked GRU layers
    #[arg(long, default_value_t = 2)]
    pub rnn_layers: usize,

    /// Beam width used for validation decoding (and as the
    /// default at inference time)
    #[arg(long, default_value_t = 5)]
    pub beam_size: usize,

    /// Disable the character encoder (requires --embeddings)
    #[arg(long)]
    pub no_char_encoding: bool,

    /// Disable attention over encoder character states
    #[arg(long)]
    pub no_attention: bool,

    /// Run a second character GRU right-to-left
    #[arg(long)]
    pub bidirectional: bool,

    /// Pad encoder input rows at the front instead of the back
    #[arg(long)]
    pub pad_front: bool,

    /// Do not put a start symbol before the encoder input
    #[arg(long)]
    pub no_start_symbol: bool,

    /// Put an end symbol after the encoder input
    #[arg(long)]
    pub end_symbol: bool,

    /// Decoding length cap when --fixed-length is set
    #[arg(long, default_value_t = 20)]
    pub max_sequence_length: usize,

    /// Use the fixed cap instead of longest-input + 1
    #[arg(long)]
    pub fixed_length: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_path:     a.corpus,
            checkpoint_dir:  a.checkpoint_dir,
            embeddings_path: a.embeddings,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            train_fraction:  a.train_fraction,
            rnn_input_size:  a.rnn_input_size,
            rnn_hidden_size: a.rnn_hidden_size,
            rnn_layers:      a.rnn_layers,
            beam_size:       a.beam_size,
            encode_characters: !a.no_char_encoding,
            use_attention:     !a.no_attention,
            bidirectional_encoding: a.bidirectional,
            padding_in_front_for_encoder: a.pad_front,
            start_symbol_for_encoding: !a.no_start_symbol,
            end_symbol_for_encoding:   a.end_symbol,
            max_sequence_length: a.max_sequence_length,
            max_length_dependent_on_input: !a.fixed_length,
            embedding_length: 0,
        }
    }
}

/// All arguments for the `lemmatize` command
#[derive(Args, Debug)]
pub struct LemmatizeArgs {
    /// TSV file with one form per line (lemma column ignored)
    #[arg(long)]
    pub input: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the trained beam width (1 = greedy)
    #[arg(long)]
    pub beam_size: Option<usize>,
}

/// All arguments for the `eval` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Labelled corpus file (form<TAB>lemma)
    #[arg(long)]
    pub corpus: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the trained beam width (1 = greedy)
    #[arg(long)]
    pub beam_size: Option<usize>,
}
