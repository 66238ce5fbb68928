//! Collection initialization tool
//!
//! Offline force-recreate of a vector store collection: drops an existing
//! collection, recreates it from the declared schema and builds the vector
//! and scalar indexes.
//!
//! Usage:
//!   init-collection [--collection <NAME>] [--dimension <N>] [--metric <IP|L2|COSINE>] [--force]
//!
//! Connection settings come from the environment (PAGELENS_CONNECTION__*).
//! Exits 0 on success or no-op, non-zero on any store error.

use std::str::FromStr;

use anyhow::Context;
use pagelens::vector::{Connector, MetricType, VectorStore};
use pagelens::AppConfig;

/// Command line arguments
struct Args {
    /// Collection name; defaults to the configured collection
    collection: Option<String>,
    /// Vector dimension
    dimension: Option<usize>,
    /// Similarity metric
    metric: Option<MetricType>,
    /// Create the collection even if it does not exist yet
    force: bool,
    /// Enable verbose logging
    verbose: bool,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let mut collection = None;
        let mut dimension = None;
        let mut metric = None;
        let mut force = false;
        let mut verbose = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--collection" | "-c" => {
                    collection = args.next();
                }
                "--dimension" | "-d" => {
                    if let Some(val) = args.next() {
                        dimension = Some(val.parse().map_err(|_| "Invalid dimension value")?);
                    }
                }
                "--metric" | "-m" => {
                    if let Some(val) = args.next() {
                        metric = Some(MetricType::from_str(&val)?);
                    }
                }
                "--force" | "-f" => {
                    force = true;
                }
                "--verbose" | "-v" => {
                    verbose = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("Unknown argument: {arg}"));
                }
            }
        }

        Ok(Self {
            collection,
            dimension,
            metric,
            force,
            verbose,
        })
    }
}

fn print_help() {
    println!(
        r#"init-collection - Vector store collection initializer

USAGE:
    init-collection [OPTIONS]

OPTIONS:
    -c, --collection <NAME>   Collection name (default: configured collection)
    -d, --dimension <N>       Vector dimension (default: configured, 2048)
    -m, --metric <TYPE>       Similarity metric: IP, L2 or COSINE (default: IP)
    -f, --force               Create the collection even when it does not exist
    -v, --verbose             Enable verbose logging
    -h, --help                Print this help message

DESCRIPTION:
    Drops the collection if it exists, then recreates it with the page
    embedding schema (auto-id primary key, HNSW vector index, inverted
    scalar indexes) and loads it. Connection settings are read from the
    PAGELENS_CONNECTION__* environment variables.
"#
    );
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;

    let collection = args
        .collection
        .unwrap_or_else(|| config.collection.collection_name.clone());
    let dimension = args.dimension.unwrap_or(config.collection.dimension);
    let metric = args.metric.unwrap_or(config.collection.metric);

    tracing::info!(
        collection = %collection,
        dimension,
        metric = %metric,
        "recreating collection"
    );

    let connector = Connector::new(config.connection.clone());
    let backend = connector
        .connect()
        .await
        .context("connecting to the vector store")?;
    let store = VectorStore::new(backend, config.collection.clone());

    let created = store
        .recreate_collection(&collection, dimension, metric, args.force)
        .await
        .context("recreating collection")?;

    if created {
        println!("Collection {collection} recreated successfully");
    } else {
        println!("Collection {collection} does not exist and --force is off");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        tracing::error!("Collection recreation failed: {e}");
        std::process::exit(1);
    }
}
