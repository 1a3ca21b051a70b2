// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`     — trains the lemmatizer on a TSV corpus
//   2. `lemmatize` — loads a checkpoint and annotates a file
//   3. `eval`      — loads a checkpoint and scores a corpus
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, LemmatizeArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "char-lemmatizer",
    version = "0.1.0",
    about = "Train a character-level seq2seq lemmatizer on TSV corpora, then lemmatize text."
)]
pub struct Cli {
    /// The subcommand to run (train, lemmatize or eval)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => Self::run_train(args),
            Commands::Lemmatize(args) => Self::run_lemmatize(args),
            Commands::Eval(args)      => Self::run_eval(args),
        }
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a TrainConfig and hands off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on corpus: {}", args.corpus);

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoint saved.");
        Ok(())
    }

    /// Handles the `lemmatize` subcommand.
    /// Loads the model from checkpoint and prints annotated TSV.
    fn run_lemmatize(args: LemmatizeArgs) -> Result<()> {
        use crate::application::lemmatize_use_case::{format_tsv, LemmatizeUseCase};

        let use_case  = LemmatizeUseCase::new(args.checkpoint_dir.clone(), args.beam_size)?;
        let sentences = use_case.lemmatize_file(&args.input)?;

        print!("{}", format_tsv(&sentences));
        Ok(())
    }

    /// Handles the `eval` subcommand.
    /// Scores a labelled corpus and prints the summary.
    fn run_eval(args: EvalArgs) -> Result<()> {
        use crate::application::lemmatize_use_case::LemmatizeUseCase;

        let use_case = LemmatizeUseCase::new(args.checkpoint_dir.clone(), args.beam_size)?;
        let report   = use_case.evaluate(&args.corpus)?;

        println!(
            "Evaluated {} words | avg_loss={:.4} | accuracy={:.1}%",
            report.tokens,
            report.avg_loss,
            report.accuracy * 100.0,
        );
        Ok(())
    }
}
