use anyhow::{Context, Result};
use blobstore::{mime, StorageBackend, StoreConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "blobstore")]
#[command(about = "Key-addressed blob storage on local disk or S3", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML store configuration
    #[arg(long, global = true, env = "BLOBSTORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the blob stored under a key to stdout
    Read {
        key: String,
    },

    /// Store a file (or stdin) under a key
    Write {
        key: String,

        /// File to upload; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Remove the blob stored under a key
    Delete {
        key: String,
    },

    /// Check whether a key holds a blob
    Exists {
        key: String,
    },

    /// List all keys in the store
    List {
        /// Print keys as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print the detected content type of a file (or stdin)
    Mime {
        file: Option<PathBuf>,
    },
}

async fn open_input(file: Option<&PathBuf>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match file {
        Some(path) => {
            let f = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Ok(Box::new(f))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

async fn open_store(config_path: Option<&Path>) -> Result<Arc<dyn StorageBackend>> {
    let config = StoreConfig::load(config_path)
        .await
        .context("Failed to load storage configuration")?;

    config.build().context("Failed to build storage backend")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so blob contents on stdout stay clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Read { key } => {
            let store = open_store(config_path).await?;
            let data = store
                .read(&key)
                .await
                .with_context(|| format!("Failed to read {}", key))?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
        Commands::Write { key, file } => {
            let store = open_store(config_path).await?;
            let mut input = open_input(file.as_ref()).await?;
            store
                .write(&key, &mut input)
                .await
                .with_context(|| format!("Failed to write {}", key))?;
        }
        Commands::Delete { key } => {
            let store = open_store(config_path).await?;
            store
                .delete(&key)
                .await
                .with_context(|| format!("Failed to delete {}", key))?;
        }
        Commands::Exists { key } => {
            let store = open_store(config_path).await?;
            let exists = store
                .exists(&key)
                .await
                .with_context(|| format!("Failed to check {}", key))?;
            println!("{}", exists);
        }
        Commands::List { json } => {
            let store = open_store(config_path).await?;
            let keys = store.list().await.context("Failed to list keys")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        Commands::Mime { file } => {
            let mut input = open_input(file.as_ref()).await?;
            let content_type = mime::detect_reader(&mut input).await?;
            println!("{}", content_type);
        }
    }

    Ok(())
}
