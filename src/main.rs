//! newtab CLI
//!
//! Rewrites links in built HTML so external sites and PDFs open in a new tab.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use newtab_links::annotate::{run_annotate, AnnotateArgs};
use newtab_links::init::{run_init, InitArgs};
use newtab_links::logging;
use newtab_links::scan::{run_scan, ScanArgs};

#[derive(Parser)]
#[command(name = "newtab")]
#[command(author = "RoyalBit Inc.")]
#[command(version)]
#[command(about = "Open external and PDF links in a new tab")]
#[command(long_about = "Post-build pass over static HTML.\n\nCommands:\n  annotate   Rewrite links in HTML files (or stdin)\n  scan       Preview link classification\n  init       Create newtab.yaml template")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite links in HTML files, directories or stdin
    Annotate(AnnotateArgs),
    /// List every link with the class the annotator would assign
    Scan(ScanArgs),
    /// Create newtab.yaml template
    Init(InitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Annotate(args) => run_annotate(args).await,
        Commands::Scan(args) => run_scan(args).await,
        Commands::Init(args) => run_init(args).await,
    }
}
