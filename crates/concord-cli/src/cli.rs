use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use concord_types::Window;

#[derive(Parser)]
#[command(
    name = "concord",
    about = "Concord: compare annotators' work and curate a merged result",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare every annotator's stores and report disputed positions
    Diff(DiffArgs),
    /// Auto-merge agreed positions and write curated stores
    Merge(MergeArgs),
    /// Validate a curation configuration and print its fingerprint
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    /// Project file holding every annotator's stores
    pub project: PathBuf,
    /// Curation configuration; without one, every annotation type is compared by position only
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Restrict the diff to span windows, given as BEGIN:END
    #[arg(short, long = "window", value_parser = parse_window)]
    pub windows: Vec<Window>,
}

#[derive(Args)]
pub struct MergeArgs {
    pub project: PathBuf,
    #[arg(short, long)]
    pub config: PathBuf,
    /// Where to write the curated stores (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(short, long = "window", value_parser = parse_window)]
    pub windows: Vec<Window>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

fn parse_window(input: &str) -> Result<Window, String> {
    let (begin, end) = input
        .split_once(':')
        .ok_or_else(|| format!("expected BEGIN:END, got '{input}'"))?;
    let begin: usize = begin.trim().parse().map_err(|e| format!("bad begin offset: {e}"))?;
    let end: usize = end.trim().parse().map_err(|e| format!("bad end offset: {e}"))?;
    Window::span(begin, end).map_err(|e| e.to_string())
}
