use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use hashvault::crypto::fingerprint_async_reader;

/// Print the SHA-256 content fingerprint of each file
#[derive(Parser, Debug)]
#[command(name = "fingerprint", version, about)]
struct Args {
    /// Files to fingerprint
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only print digests
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    for path in &args.files {
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let digest = fingerprint_async_reader(&mut file)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        if args.quiet {
            println!("{}", digest);
        } else {
            println!("{}  {}", digest, path.display());
        }
    }

    Ok(())
}
