//! CLI entry point for stream_inspect
//!
//! Builds a file-multiplexed stream tree over a directory, loads it and prints the
//! resulting tree together with any load failures.
//!
//! # Usage
//!
//! ```bash
//! stream_inspect ./session --include '*.csv' --include 'logs/*.txt' --exclude 'tmp_*'
//! stream_inspect ./session --strict --outline
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rust_datastreams::config::Settings;
use rust_datastreams::io::mux::{file_mux, FileMuxParams};
use rust_datastreams::io::{extension_reader, FileParams};
use rust_datastreams::{logging, loader, tree, BranchOptions, Node, TreeOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stream_inspect")]
#[command(about = "Load a directory as a data stream tree and print it", long_about = None)]
struct Cli {
    /// Directory to inspect
    dir: PathBuf,

    /// Glob pattern relative to DIR (repeatable)
    #[arg(long = "include", default_value = "*")]
    include: Vec<String>,

    /// Glob pattern of files to leave out (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Stop at the first load failure
    #[arg(long)]
    strict: bool,

    /// Hide reader and writer parameters
    #[arg(long)]
    exclude_params: bool,

    /// Print the compact outline instead of the full tree
    #[arg(long)]
    outline: bool,

    /// Settings file (defaults to config/datastreams.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load().context("loading settings")?,
    };
    settings.validate()?;
    logging::init_from_settings(&settings)?;

    let name = cli
        .dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());

    let mut params = FileMuxParams::new(&cli.dir, extension_reader(), |p: &Path| FileParams::new(p));
    for pattern in &cli.include {
        params = params.include(pattern);
    }
    for pattern in &cli.exclude {
        params = params.exclude(pattern);
    }
    let mut root = Node::from(file_mux(&name, params)?);

    let mut options = BranchOptions::from(&settings.loader);
    options.strict |= cli.strict;
    let failures = loader::load_branch_with(&mut root, options)
        .with_context(|| format!("loading {}", cli.dir.display()))?;

    if cli.outline {
        println!("{}", tree::render_outline(&root));
    } else {
        let options = TreeOptions {
            exclude_params: cli.exclude_params,
            print_if_unset: false,
        };
        println!("{}", tree::render(&root, options));
    }

    if !failures.is_empty() {
        println!();
        println!("{} stream(s) failed to load:", failures.len());
        for failure in &failures {
            println!("  {failure}");
        }
    }
    Ok(())
}
