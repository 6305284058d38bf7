use clap::{Parser, Subcommand};
use nous_index::content::{ContentLibrary, ContentService};
use nous_index::{IndexConfig, Metadata, SemanticIndex};
use serde::Deserialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// A CLI tool to inspect and populate the NOUS semantic document index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the configuration)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Embedding model name (overrides the configuration)
    #[arg(long)]
    model: Option<String>,

    /// Directory for downloaded model weights
    #[arg(long)]
    model_cache_dir: Option<PathBuf>,

    /// Never load an embedding model; use keyword search
    #[arg(long)]
    no_embeddings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database file and schema
    Init,
    /// Insert or replace one document
    Upsert {
        #[arg(long)]
        id: String,
        #[arg(long)]
        text: String,
        /// Metadata as a JSON object
        #[arg(long, default_value = "{}")]
        meta: String,
    },
    /// Bulk upsert a JSON array of {"doc_id", "text", "meta"} objects
    Import { file: PathBuf },
    /// Load psychoeducation articles (built-in set unless a file is given)
    SeedContent {
        /// JSON array of {"id", "title", "body"} objects
        #[arg(long)]
        articles: Option<PathBuf>,
    },
    /// Rank documents against a query
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show database statistics
    Stats {
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Deserialize)]
struct ImportItem {
    doc_id: String,
    text: String,
    #[serde(default)]
    meta: Metadata,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> anyhow::Result<IndexConfig> {
    let mut config = match &args.config {
        Some(path) => IndexConfig::from_toml_file(path)?,
        None => IndexConfig::default(),
    };
    if let Some(db) = &args.db {
        config.storage_path = db.clone();
    }
    if let Some(model) = &args.model {
        config.model_name = model.clone();
    }
    if let Some(dir) = &args.model_cache_dir {
        config.model_cache_dir = Some(dir.clone());
    }
    if args.no_embeddings {
        config.embeddings_enabled = false;
    }
    Ok(config)
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Commands::Init => {
            // Schema only; no reason to load a model
            SemanticIndex::with_provider(&config.storage_path, None).await?;
            println!(
                "Initialized document index at {}",
                config.storage_path.display()
            );
            Ok(())
        }
        Commands::Upsert { id, text, meta } => {
            let meta: serde_json::Value = serde_json::from_str(&meta)
                .map_err(|e| anyhow::anyhow!("Invalid --meta JSON: {e}"))?;
            let index = SemanticIndex::open(&config).await?;
            index.upsert(&id, &text, &meta).await?;
            println!("Upserted {id} ({} mode)", index.mode());
            Ok(())
        }
        Commands::Import { file } => {
            let source = tokio::fs::read_to_string(&file).await?;
            let items: Vec<ImportItem> = serde_json::from_str(&source)?;
            let index = SemanticIndex::open(&config).await?;
            let count = index
                .bulk_upsert(
                    items
                        .into_iter()
                        .map(|item| (item.doc_id, item.text, item.meta)),
                )
                .await?;
            println!("Imported {count} documents from {}", file.display());
            Ok(())
        }
        Commands::SeedContent { articles } => {
            let library = match articles {
                Some(path) => ContentLibrary::from_json_file(path)?,
                None => ContentLibrary::builtin(),
            };
            let index = SemanticIndex::open(&config).await?;
            let service = ContentService::new(index, library).await;
            let stats = service.index().stats().await?;
            println!(
                "Loaded {} articles; index holds {} documents",
                service.library().len(),
                stats.storage.total_documents
            );
            Ok(())
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let index = SemanticIndex::open(&config).await?;
            let hits = index
                .search(&query, top_k.unwrap_or(config.default_top_k))
                .await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} documents ({} mode):", hits.len(), index.mode());
                    for hit in hits {
                        let preview: String = hit.text.chars().take(80).collect();
                        println!(
                            "  Score: {:.3} | ID: {} | {}",
                            hit.score,
                            hit.doc_id,
                            preview.replace('\n', " ")
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let index = SemanticIndex::with_provider(&config.storage_path, None).await?;
            let stats = index.stats().await?.storage;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Database Statistics:");
                    println!("  Location: {}", config.storage_path.display());
                    println!("  Total documents: {}", stats.total_documents);
                    println!(
                        "  Documents with embeddings: {}",
                        stats.documents_with_embeddings
                    );
                    for (model_id, count) in &stats.embeddings_by_model {
                        println!("    {model_id}: {count}");
                    }
                }
            }
            Ok(())
        }
    }
}
