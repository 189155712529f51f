//! dealboard - drive a deal pipeline board from the command line
//!
//! Usage:
//!   dealboard classify <LABEL>... [--json]
//!   dealboard replay <SCRIPT> [--config <FILE>] [--json]

mod render;
mod replay;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use dealboard::stage::{classify_stage, Stage};

#[derive(Parser)]
#[command(name = "dealboard")]
#[command(about = "Deal pipeline board: stage classification and scripted board sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map raw stage labels to canonical stages
    Classify(ClassifyArgs),
    /// Replay a scripted session of drops, moves and feed events
    Replay(replay::ReplayArgs),
}

/// Arguments for the classify subcommand
#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Raw stage labels, e.g. "Teklif Gönderildi"
    #[arg(required = true)]
    labels: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Classified<'a> {
    label: &'a str,
    stage: Stage,
}

#[tokio::main]
async fn main() -> Result<()> {
    dealboard::logging::init_tracing("dealboard=warn");
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify(args) => classify(args),
        Commands::Replay(args) => replay::run(args).await,
    }
}

fn classify(args: ClassifyArgs) -> Result<()> {
    let classified: Vec<Classified<'_>> = args
        .labels
        .iter()
        .map(|label| Classified {
            label,
            stage: classify_stage(Some(label)),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
    } else {
        for entry in &classified {
            println!("{}\t{}", entry.label, entry.stage);
        }
    }
    Ok(())
}
