use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use concord_curation::{
    BatchReport, CancellationFlag, CurationConfig, CurationJob, Curator, DocumentReport,
    InMemoryAnnotationStore, InMemoryStoreProvider, LayerConfig, LayerKind, PositionStatus,
    ProjectFile, StoreProvider, WindowStatus,
};
use concord_store::Anchor;
use concord_types::DocumentRef;
use tracing::{debug, info, warn};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Diff(args) => cmd_diff(args, &cli.format),
        Command::Merge(args) => cmd_merge(args, &cli.format),
        Command::CheckConfig(args) => cmd_check_config(args, &cli.format),
    }
}

fn cmd_diff(args: DiffArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let config = match &args.config {
        Some(path) => CurationConfig::from_path(path)?,
        None => inferred_config(&project),
    };
    if config.layers.is_empty() {
        bail!("nothing to compare: no layers configured and the project has no annotations");
    }

    let curator = Curator::from_config(&config)?;
    let provider = InMemoryStoreProvider::from_project(project);
    let jobs: Vec<CurationJob> = provider
        .documents()
        .into_iter()
        .map(|document| CurationJob {
            document,
            windows: args.windows.clone(),
        })
        .collect();
    let batch = curator.curate_batch(&provider, &jobs, &CancellationFlag::new());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batch)?),
        OutputFormat::Text => print_batch(&batch),
    }
    Ok(())
}

fn cmd_merge(args: MergeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let config = CurationConfig::from_path(&args.config)?;
    let curator = Curator::from_config(&config)?;
    let provider = InMemoryStoreProvider::from_project(project);

    let mut curated_stores = Vec::new();
    let mut summaries = Vec::new();
    for document in provider.documents() {
        let Some(text) = document_text(&provider, &document) else {
            warn!(%document, "no annotator store could be loaded; skipping document");
            if let OutputFormat::Text = format {
                eprintln!("{} {}: no annotator store could be loaded",
                    "✗".red().bold(), document.to_string().bold());
            }
            continue;
        };
        let mut curated = InMemoryAnnotationStore::new(document.clone(), text);
        let (report, applied) =
            curator.merge_document(&provider, &document, &args.windows, &mut curated)?;
        info!(%document, applied = applied.applied, "document merged");
        summaries.push(serde_json::json!({
            "document": document,
            "status": report.status(),
            "attention": report.attention_count(),
            "applied": applied.applied,
            "unapplied": &applied.unapplied,
        }));
        if let OutputFormat::Text = format {
            print_merge_line(&report, applied.applied, applied.unapplied.len());
            for item in &applied.unapplied {
                eprintln!("    {} {}: {}", "not applied".yellow(), item.position, item.reason);
            }
        }
        curated_stores.push(curated);
    }

    let encoded = serde_json::to_string_pretty(&curated_stores)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, encoded)
                .with_context(|| format!("writing curated stores to {}", path.display()))?;
            if let OutputFormat::Text = format {
                eprintln!("{} Wrote {} curated store(s) to {}",
                    "✓".green().bold(), curated_stores.len(), path.display().to_string().bold());
            }
        }
        None => println!("{encoded}"),
    }
    if let OutputFormat::Json = format {
        eprintln!("{}", serde_json::to_string_pretty(&summaries)?);
    }
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = CurationConfig::from_path(&args.path)?;
    let fingerprint = config.fingerprint()?;
    let strategy = config.build_strategy()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "valid": true,
            "fingerprint": fingerprint,
            "config": config,
        }))?),
        OutputFormat::Text => {
            println!("{} Configuration is valid", "✓".green().bold());
            println!("  Strategy: {}", strategy.name().cyan());
            println!("  Auto-merge: {}", if config.auto_merge { "on".green() } else { "off".dimmed() });
            for layer in &config.layers {
                println!("  Layer {} ({:?}, {} label feature(s), {} link feature(s))",
                    layer.name.bold(), layer.kind, layer.label_features.len(), layer.links.len());
            }
            println!("  Fingerprint: {}", fingerprint.yellow());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_project(path: &Path) -> anyhow::Result<ProjectFile> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("reading project {}", path.display()))?;
    serde_json::from_str(&input).with_context(|| format!("parsing project {}", path.display()))
}

/// One position-only layer per annotation type found in the project.
fn inferred_config(project: &ProjectFile) -> CurationConfig {
    let mut kinds: BTreeMap<&str, LayerKind> = BTreeMap::new();
    for store in project.annotators.values().flatten() {
        for (_, annotation) in store.iter() {
            let kind = match annotation.anchor {
                Anchor::Span { .. } => LayerKind::Span,
                Anchor::Relation { .. } => LayerKind::Relation,
                Anchor::Document => LayerKind::Document,
            };
            kinds.entry(annotation.type_name.as_str()).or_insert(kind);
        }
    }
    debug!(layers = kinds.len(), "inferred layers from project");
    CurationConfig {
        layers: kinds
            .into_iter()
            .map(|(name, kind)| LayerConfig::new(name, kind))
            .collect(),
        ..Default::default()
    }
}

/// The document text, taken from the first annotator whose store loads.
fn document_text(provider: &InMemoryStoreProvider, document: &DocumentRef) -> Option<String> {
    provider
        .annotators(document)
        .into_iter()
        .find_map(|annotator| provider.load(&annotator, document).ok())
        .map(|store| store.text().to_string())
}

fn window_status(status: WindowStatus) -> colored::ColoredString {
    match status {
        WindowStatus::Agree => status.to_string().green().bold(),
        WindowStatus::Disagree => status.to_string().red().bold(),
    }
}

fn position_status(status: PositionStatus) -> colored::ColoredString {
    match status {
        PositionStatus::Agree => status.to_string().green(),
        PositionStatus::Incomplete => status.to_string().yellow(),
        PositionStatus::Disagree => status.to_string().red(),
    }
}

fn print_batch(batch: &BatchReport) {
    for document in &batch.documents {
        print_document(document);
    }
    for failed in &batch.failed {
        println!("{} {}: {}", "✗".red().bold(), failed.document.to_string().bold(), failed.error);
    }
    if batch.documents.is_empty() && batch.failed.is_empty() {
        println!("No documents.");
    }
}

fn print_document(report: &DocumentReport) {
    println!("{}  {}  ({} annotator(s), {} position(s) need attention)",
        report.document.to_string().bold(),
        window_status(report.status()),
        report.annotators.len(),
        report.attention_count());
    for skipped in &report.unavailable {
        println!("  {} {}: {}", "unavailable".yellow(), skipped.annotator, skipped.reason);
    }
    for window in &report.windows {
        println!("  window {}  {}  {} position(s)",
            window.window.to_string().cyan(), window_status(window.status), window.positions);
        for skipped in &window.skipped {
            println!("    {} {}: {}", "skipped".yellow(), skipped.annotator, skipped.reason);
        }
        for position in &window.attention {
            println!("    {}  {}", position_status(position.status), position.position);
            for cfg in &position.configurations {
                let names: Vec<String> = cfg.annotators.iter().map(|a| a.to_string()).collect();
                println!("      {}  {}", cfg.values, names.join(", ").dimmed());
            }
        }
        if let Some(plan) = &window.plan {
            println!("    auto-merge ({}): {} merged, {} unresolved",
                plan.strategy.cyan(), plan.merged().count(), plan.unresolved().count());
        }
    }
}

fn print_merge_line(report: &DocumentReport, applied: usize, unapplied: usize) {
    eprintln!("{}  {}  {} applied, {} not applied",
        report.document.to_string().bold(),
        window_status(report.status()),
        applied.to_string().green(),
        if unapplied == 0 { unapplied.to_string().normal() } else { unapplied.to_string().yellow() });
}
