use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use lexical_populate::config::{self, PopulateConfig};
use lexical_populate::db::Database;
use lexical_populate::document::read_document_field;
use lexical_populate::errors::{PopulateError, Result};
use lexical_populate::extraction::ReferenceExtractor;
use lexical_populate::populate::Populator;
use lexical_populate::server::{self, AppState};

/// Reference population for rich-text documents.
#[derive(Parser)]
#[command(
    name = "lexical-populate",
    version,
    about = "Resolve media and entry references inside rich-text documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the database
    Init {
        /// Project path (default: current directory)
        path: Option<String>,
    },
    /// Run the HTTP service
    Serve {
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
        /// Address to bind, overriding the config
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Print the references found in an entity or document tree
    Extract {
        /// JSON file to read (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Entity field holding the document
        #[arg(long, default_value = "content")]
        field: String,
    },
    /// Populate one stored entity and print it
    Populate {
        /// Content type uid, e.g. api::post.post
        content_type: String,
        /// Document id of the entity
        document_id: String,
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
        /// Entity field holding the document (default: from config)
        #[arg(long)]
        field: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    setup_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays machine readable.
fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let project_path = resolve_path(path);
            let config = config::load_config(&project_path)?;
            config::save_config(&project_path, &config)?;
            let db_path = config.database_path(&project_path);
            Database::initialize(&db_path)?;
            println!(
                "Initialized lexical-populate at {} (database: {})",
                project_path.display(),
                db_path.display()
            );
        }
        Commands::Serve { path, listen } => {
            let project_path = resolve_path(path);
            let config = config::load_config(&project_path)?;
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            let addr: SocketAddr = listen.parse().map_err(|e| PopulateError::Config {
                message: format!("invalid listen address '{}': {}", listen, e),
            })?;
            let db = open_database(&project_path, &config)?;
            let state = Arc::new(AppState::new(config, db));
            server::serve(state, addr).await?;
        }
        Commands::Extract { file, field } => {
            let input = read_input(file.as_deref())?;
            let value: serde_json::Value = serde_json::from_str(&input)?;
            let extractor = ReferenceExtractor::default();
            let references = if read_document_field(&value, &field).is_some() {
                extractor.extract_field(&value, &field)
            } else {
                extractor.extract(&value)
            };
            let output = serde_json::json!({
                "media": references.media(),
                "entries": references.entries(),
                "fingerprint": references.fingerprint(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Populate {
            content_type,
            document_id,
            path,
            field,
        } => {
            let project_path = resolve_path(path);
            let config = config::load_config(&project_path)?;
            let field = field.unwrap_or_else(|| config.lexical_field.clone());
            let db = open_database(&project_path, &config)?;
            let populator = Populator::from_config(db, &config);

            let entity = populator
                .find_entity(&content_type, &document_id)
                .await?
                .ok_or_else(|| PopulateError::Store {
                    message: format!("entity '{}' not found", document_id),
                    content_type: content_type.clone(),
                })?;
            let outcome = populator.populate(&entity, &field).await;
            eprintln!(
                "{} media, {} entries resolved ({} misses)",
                outcome.stats.media_resolved, outcome.stats.entries_resolved, outcome.stats.misses
            );
            println!("{}", serde_json::to_string_pretty(&outcome.entity)?);
        }
    }
    Ok(())
}

fn open_database(project_path: &Path, config: &PopulateConfig) -> Result<Arc<Database>> {
    let db_path = config.database_path(project_path);
    Ok(Arc::new(Database::open(&db_path)?))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| PopulateError::File {
            message: e.to_string(),
            path: path.display().to_string(),
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
