//! NeuroGraph CLI - Command-line interface
//!
//! Usage:
//!   neurograph process <files...>
//!   neurograph test-connection
//!   neurograph export <snapshot.json> --format csv

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use neurograph_core::{
    DocumentContext, LocalFileConfig, OutputFormat, PipelineConfig, StorageMode,
};
use neurograph_extractor::Pipeline;
use neurograph_graph::{
    surrealdb_store, GraphBuilder, GraphStore, LocalFileStore, PersistReport, SurrealDbStore,
};
use neurograph_text::RuleAnnotator;

#[derive(Parser)]
#[command(name = "neurograph")]
#[command(about = "Text-to-knowledge-graph extraction for neuroscience literature")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file; environment variables still win
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a knowledge graph from text files and persist it
    Process {
        /// Input text files, processed in order
        files: Vec<PathBuf>,

        /// Persistence backend: local_file or graph_database
        #[arg(long)]
        storage: Option<StorageMode>,

        /// Output format for the local file backend: json or csv
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Drop relations below this confidence before persisting
        #[arg(long)]
        min_confidence: Option<f32>,

        /// Merge into the existing graph file instead of starting fresh
        #[arg(long)]
        cumulative: bool,

        /// Let UNKNOWN-classified entities participate in relations
        #[arg(long)]
        include_unknown: bool,
    },
    /// Check graph database connectivity and report the result
    TestConnection {
        /// Database URL override
        #[arg(long)]
        url: Option<String>,

        /// Username override
        #[arg(long)]
        user: Option<String>,

        /// Password override
        #[arg(long)]
        pass: Option<String>,
    },
    /// Re-serialize a stored JSON snapshot
    Export {
        /// Graph snapshot written by a previous process run
        snapshot: PathBuf,

        /// Target format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Directory to write into (defaults to the snapshot's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    // Environment overrides apply on top of file values
    let env = PipelineConfig::from_env()?;
    if std::env::var("NEUROGRAPH_STORAGE").is_ok() {
        config.storage_mode = env.storage_mode;
    }
    if std::env::var("NEUROGRAPH_OUTPUT_DIR").is_ok() {
        config.local.output_dir = env.local.output_dir;
    }
    if std::env::var("NEUROGRAPH_FORMAT").is_ok() {
        config.local.format = env.local.format;
    }
    if std::env::var("NEUROGRAPH_MIN_CONFIDENCE").is_ok() {
        config.min_confidence_threshold = env.min_confidence_threshold;
    }
    if std::env::var("NEUROGRAPH_CUMULATIVE").is_ok() {
        config.cumulative = env.cumulative;
    }
    if std::env::var("SURREALDB_URL").is_ok() {
        config.database.url = env.database.url;
    }
    if std::env::var("SURREALDB_USER").is_ok() {
        config.database.user = env.database.user;
    }
    if std::env::var("SURREALDB_PASS").is_ok() {
        config.database.pass = env.database.pass;
    }
    Ok(config)
}

fn print_report(report: &PersistReport) {
    println!("Graph persisted to {}", report.destination);
    println!("  entities:  {}", report.entities_written);
    println!("  relations: {}", report.relations_written);
    if report.skipped_below_threshold > 0 {
        println!(
            "  dropped:   {} below confidence threshold",
            report.skipped_below_threshold
        );
    }
}

#[allow(clippy::too_many_arguments)]
async fn process(
    config: PipelineConfig,
    files: &[PathBuf],
    storage: Option<StorageMode>,
    format: Option<OutputFormat>,
    min_confidence: Option<f32>,
    cumulative: bool,
    include_unknown: bool,
) -> anyhow::Result<()> {
    let mut config = config;
    if let Some(storage) = storage {
        config.storage_mode = storage;
    }
    if let Some(format) = format {
        config.local.format = format;
    }
    if let Some(threshold) = min_confidence {
        config.min_confidence_threshold = threshold;
    }
    config.cumulative |= cumulative;
    config.include_unknown_entities |= include_unknown;
    config.validate()?;

    anyhow::ensure!(!files.is_empty(), "no input files given");

    let mut builder = GraphBuilder::new();

    // Cumulative mode resumes from the graph file of a previous run
    let json_path = LocalFileStore::new(
        &LocalFileConfig {
            output_dir: config.local.output_dir.clone(),
            format: OutputFormat::Json,
        },
        config.min_confidence_threshold,
    )
    .output_path();
    if config.cumulative && config.storage_mode == StorageMode::LocalFile && json_path.exists() {
        let prior = LocalFileStore::load_json(&json_path)?;
        info!(
            path = %json_path.display(),
            entities = prior.entities.len(),
            "resuming existing graph"
        );
        builder.add_document(prior.entities, prior.relations);
    }

    let pipeline = Pipeline::new(RuleAnnotator::new());
    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let ctx = DocumentContext::new(file.display().to_string(), text, config.clone());
        let extraction = pipeline.run(&ctx)?;
        println!(
            "{}: {} sentences, {} entities, {} candidate triples",
            file.display(),
            extraction.sentence_count,
            extraction.entities.len(),
            extraction.triples.len()
        );
        builder.add_document(extraction.entities, extraction.triples);
    }

    let snapshot = builder.snapshot();
    let report = match config.storage_mode {
        StorageMode::LocalFile => {
            let store = LocalFileStore::new(&config.local, config.min_confidence_threshold);
            store.persist(&snapshot).await?
        }
        StorageMode::GraphDatabase => {
            let store =
                SurrealDbStore::connect(&config.database, config.min_confidence_threshold).await?;
            store.init_schema().await?;
            store.persist(&snapshot).await?
        }
    };
    print_report(&report);
    Ok(())
}

async fn test_connection(
    config: PipelineConfig,
    url: Option<String>,
    user: Option<String>,
    pass: Option<String>,
) -> anyhow::Result<()> {
    let mut database = config.database;
    if let Some(url) = url {
        database.url = url;
    }
    if let Some(user) = user {
        database.user = user;
    }
    if let Some(pass) = pass {
        database.pass = pass;
    }

    let status = surrealdb_store::test_connection(&database).await;
    println!("{}: {}", database.url, status.diagnostic());
    if !status.is_reachable() {
        std::process::exit(1);
    }
    Ok(())
}

async fn export(
    snapshot_path: &Path,
    format: OutputFormat,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let snapshot = LocalFileStore::load_json(snapshot_path)?;
    let output_dir = match output_dir {
        Some(dir) => dir,
        None => snapshot_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let store = LocalFileStore::new(&LocalFileConfig { output_dir, format }, 0.0);
    let report = store.persist(&snapshot).await?;
    print_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.storage_mode, StorageMode::LocalFile);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neurograph.toml");
        std::fs::write(
            &path,
            r#"
storage_mode = "graph_database"
min_confidence_threshold = 0.3
cumulative = false
include_unknown_entities = true
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.storage_mode, StorageMode::GraphDatabase);
        assert_eq!(config.min_confidence_threshold, 0.3);
        assert!(config.include_unknown_entities);
    }

    #[test]
    fn test_load_config_honors_cumulative_env_var() {
        std::env::set_var("NEUROGRAPH_CUMULATIVE", "true");
        let config = load_config(None).unwrap();
        std::env::remove_var("NEUROGRAPH_CUMULATIVE");

        assert!(config.cumulative);
    }

    #[test]
    fn test_cli_parses_process_command() {
        let cli = Cli::try_parse_from([
            "neurograph",
            "process",
            "paper.txt",
            "--storage",
            "local_file",
            "--min-confidence",
            "0.5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Process { .. }));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Process {
            files,
            storage,
            format,
            min_confidence,
            cumulative,
            include_unknown,
        } => {
            process(
                config,
                &files,
                storage,
                format,
                min_confidence,
                cumulative,
                include_unknown,
            )
            .await
        }
        Commands::TestConnection { url, user, pass } => {
            test_connection(config, url, user, pass).await
        }
        Commands::Export {
            snapshot,
            format,
            output_dir,
        } => export(&snapshot, format, output_dir).await,
    }
}
