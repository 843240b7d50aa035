use anyhow::{anyhow, Context, Result};
use bucket_store::{
    config::Config, utils::init_logger, ObjectStorage, ObjectStore, RequestContext,
};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "bucket-store", version, about = "Download, upload and delete objects in an S3 bucket")]
struct Cli {
    /// Bucket name (overrides S3_BUCKET)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Credential profile (overrides AWS_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Give up on the whole operation after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file
    Upload {
        path: PathBuf,
        /// Object name; defaults to the local file name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Download an object to a file or stdout
    Download {
        name: String,
        #[arg(long, default_value = "")]
        folder: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete an object
    Delete {
        name: String,
        #[arg(long, default_value = "")]
        folder: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_lookup(|name| match name {
        "S3_BUCKET" if cli.bucket.is_some() => cli.bucket.clone(),
        "AWS_PROFILE" if cli.profile.is_some() => cli.profile.clone(),
        _ => env::var(name).ok(),
    })?;
    let _log_guard = init_logger(&config.logging);

    let store = ObjectStore::from_config(&config.storage);
    let ctx = request_context(cli.timeout);
    info!(
        "Using bucket {} with profile {}",
        config.storage.bucket, config.storage.profile
    );

    match cli.command {
        Command::Upload { path, name, folder } => {
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("cannot derive an object name from {:?}", path))?,
            };
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            store.upload(&ctx, &name, &folder, &bytes).await?;
        }
        Command::Download { name, folder, output } => {
            let bytes = store.download(&ctx, &name, &folder).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("Failed to write {:?}", path))?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&bytes).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Delete { name, folder } => {
            store.delete(&ctx, &name, &folder).await?;
        }
    }

    Ok(())
}

/// Context cancelled on Ctrl+C and bounded by the optional timeout
fn request_context(timeout_secs: Option<u64>) -> RequestContext {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling request");
            on_signal.cancel();
        }
    });

    let ctx = match timeout_secs {
        Some(secs) => RequestContext::with_timeout(Duration::from_secs(secs)),
        None => RequestContext::background(),
    };
    ctx.with_cancellation(token)
}
