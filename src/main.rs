use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pairlens::config::{Config, ProviderConfig};
use pairlens::csv;
use pairlens::embed::EmbeddingProvider;
use pairlens::embed::ollama::OllamaProvider;
use pairlens::matrix::{DistanceEntry, ModelId};
use pairlens::orchestrator::ComparisonOrchestrator;
use pairlens::session;

#[derive(Parser)]
#[command(name = "pairlens", version, about = "Compare text pairs across embedding models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config to .pairlens/config.toml
    Init,
    /// Import pairs and labels from a CSV file (Query Text, Stored Text, Related)
    Import {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Add one text pair
    Add {
        /// Query text
        query: String,
        /// Stored text
        stored: String,
    },
    /// Edit the texts of an existing pair
    Edit {
        /// Pair index
        index: usize,
        /// New query text
        #[arg(long)]
        query: Option<String>,
        /// New stored text
        #[arg(long)]
        stored: Option<String>,
    },
    /// Remove a pair
    Remove {
        /// Pair index
        index: usize,
    },
    /// Mark a pair related or unrelated ("yes"/"related" mean related)
    Label {
        /// Pair index
        index: usize,
        /// Label value
        value: String,
    },
    /// Recompute distances for all pairs and models, then print thresholds
    Compare {
        /// Also write the results as CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Export pairs, labels, and any computed distances as CSV
    Export {
        /// Output path
        file: PathBuf,
    },
    /// Show session status
    Status,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolving working directory")?;
    let config = Config::load(&root)?;
    let storage_dir = config.storage_dir(&root);

    let mut orch = ComparisonOrchestrator::new();
    session::load(&mut orch, &storage_dir)?;
    for (slot, name) in config.models.iter().enumerate() {
        orch.set_slot_model(slot, Some(ModelId::from(name.as_str())));
    }

    match cli.command {
        Commands::Init => {
            config.save(&root)?;
            println!("wrote {}", storage_dir.join("config.toml").display());
        }
        Commands::Import { file } => {
            let rows = csv::import_from_path(&file)?;
            let count = rows.len();
            orch.load_rows(rows);
            session::save(&orch, &storage_dir)?;
            println!("imported {count} pair(s)");
        }
        Commands::Add { query, stored } => {
            let index = orch.add_pair(query, stored);
            session::save(&orch, &storage_dir)?;
            println!("added pair {index}");
        }
        Commands::Edit { index, query, stored } => {
            if query.is_none() && stored.is_none() {
                bail!("nothing to edit: pass --query and/or --stored");
            }
            let mut found = true;
            if let Some(q) = query {
                found &= orch.edit_query(index, q);
            }
            if let Some(s) = stored {
                found &= orch.edit_stored(index, s);
            }
            if !found {
                bail!("no pair with index {index}");
            }
            session::save(&orch, &storage_dir)?;
            println!("edited pair {index}");
        }
        Commands::Remove { index } => {
            if !orch.remove_pair(index) {
                bail!("no pair with index {index}");
            }
            session::save(&orch, &storage_dir)?;
            println!("removed pair {index}");
        }
        Commands::Label { index, value } => {
            if orch.pair(index).is_none() {
                bail!("no pair with index {index}");
            }
            let related = pairlens::labels::parse_related(&value);
            orch.set_label(index, related);
            session::save(&orch, &storage_dir)?;
            println!(
                "pair {index} marked {}",
                if related { "related" } else { "unrelated" }
            );
        }
        Commands::Compare { export } => {
            let provider = build_provider(&config)?;
            let stats = orch.recompute_all(provider.as_ref());
            println!(
                "computed {} slot(s), {} failed, {} skipped",
                stats.computed, stats.failed, stats.skipped
            );
            print_table(&orch);
            print_summaries(&orch);
            if let Some(path) = export {
                csv::export_to_path(&orch, &path)?;
                println!("wrote {}", path.display());
            }
        }
        Commands::Export { file } => {
            csv::export_to_path(&orch, &file)?;
            println!("wrote {}", file.display());
        }
        Commands::Status => {
            let related = orch
                .pairs()
                .filter(|p| orch.labels().get(p.index))
                .count();
            println!("pairs: {} ({} related)", orch.pair_count(), related);
            println!(
                "models: {}",
                orch.active_models()
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(())
}

fn build_provider(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    match &config.provider {
        ProviderConfig::Ollama { url } => Ok(Box::new(OllamaProvider::new(url))),
        ProviderConfig::None => {
            bail!("no embedding provider configured; set one in .pairlens/config.toml")
        }
    }
}

fn print_table(orch: &ComparisonOrchestrator) {
    let models = orch.active_models();
    let header: Vec<String> = models.iter().map(|m| m.to_string()).collect();
    println!("{:>3}  {:<24} {:<24} {:<9} {}", "#", "query", "stored", "related", header.join("  "));
    for pair in orch.pairs() {
        let mut cells = Vec::new();
        for model in &models {
            cells.push(match orch.entry(pair.index, model) {
                DistanceEntry::Value(v) => format!("{v:.4}"),
                DistanceEntry::Pending => "pending".to_string(),
                DistanceEntry::Error(_) => "error".to_string(),
                DistanceEntry::Unset => "-".to_string(),
            });
        }
        println!(
            "{:>3}  {:<24} {:<24} {:<9} {}",
            pair.index,
            truncate(&pair.query_text, 24),
            truncate(&pair.stored_text, 24),
            if orch.labels().get(pair.index) { "yes" } else { "no" },
            cells.join("  ")
        );
    }
    // Surface slot errors below the table so reasons aren't lost.
    for pair in orch.pairs() {
        for model in &models {
            if let DistanceEntry::Error(reason) = orch.entry(pair.index, model) {
                eprintln!("  warning: pair {} on {model}: {reason}", pair.index);
            }
        }
    }
}

fn print_summaries(orch: &ComparisonOrchestrator) {
    for model in orch.active_models() {
        println!("\n{model}");
        for (label, related) in [("related", true), ("unrelated", false)] {
            match orch.box_plot(&model, related) {
                Some(s) => println!(
                    "  {label:<9} n={} min={:.4} q1={:.4} median={:.4} q3={:.4} max={:.4}",
                    s.count, s.min, s.q1, s.median, s.q3, s.max
                ),
                None => println!("  {label:<9} (no distances)"),
            }
        }
        match orch.threshold(&model) {
            Some(t) => println!("  threshold {t:.4}"),
            None => println!("  threshold (no related examples)"),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
