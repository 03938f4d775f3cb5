// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to Layer 2.
//
//   1. `train`    — learn a character model from a text file
//   2. `generate` — sample text from a trained checkpoint

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "char-rnn",
    version,
    about = "Train a character-level LSTM on a text file, then generate text from it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on '{}'", args.corpus_file);
    let snapshot = TrainUseCase::new(args.into()).execute()?;
    println!("Training complete. Snapshot saved to {}", snapshot.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let display = !args.quiet;
    let text = GenerateUseCase::new(args.into()).execute()?;
    if display {
        // characters were already streamed; end the line
        println!();
    }
    tracing::info!("Generated {} characters", text.len());
    Ok(())
}
