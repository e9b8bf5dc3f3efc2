//! init command: Create a newtab.yaml template
//!
//! Writes the default annotator configuration so it can be edited in place.

use crate::config::{AnnotatorConfig, DEFAULT_CONFIG_FILE};
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

const HEADER: &str = "# newtab link annotator configuration\n\
# Links to other hosts and same-site PDFs open in a new tab;\n\
# links to other hosts also get the marker appended.\n";

#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub created: String,
    pub file: String,
}

pub async fn run_init(args: InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        let error = serde_json::json!({
            "error": "file_exists",
            "message": format!("{} already exists. Use --force to overwrite.", args.output.display()),
            "file": args.output.display().to_string()
        });
        println!("{}", serde_json::to_string(&error)?);
        bail!("File exists");
    }

    let yaml = serde_yaml::to_string(&AnnotatorConfig::default())?;
    tokio::fs::write(&args.output, format!("{}{}", HEADER, yaml)).await?;
    tracing::debug!("wrote {}", args.output.display());

    let output = InitOutput {
        created: Utc::now().to_rfc3339(),
        file: args.output.display().to_string(),
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
