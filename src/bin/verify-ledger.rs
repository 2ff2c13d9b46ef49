use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{error, info};

use hashvault::config::AppConfig;
use hashvault::database::{Database, LedgerStore};
use hashvault::ledger::{find_tampered_anchors, verify_chain};
use hashvault::LedgerError;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("verify-ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify HashVault anchor chain integrity")
        .arg(
            Arg::new("database-url")
                .short('d')
                .long("database-url")
                .value_name("URL")
                .help("Ledger database URL (defaults to the configured one)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Suppress output except errors"),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    // Set log level based on flags
    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let database_url = match matches.get_one::<String>("database-url") {
        Some(url) => url.clone(),
        None => AppConfig::load()?.database_url,
    };

    if let Err(e) = verify_ledger(&database_url, verbose, quiet).await {
        error!("Ledger verification failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn verify_ledger(database_url: &str, verbose: bool, quiet: bool) -> Result<()> {
    info!("Verifying ledger: {}", database_url);

    let database = Database::new(database_url).await?;
    database.run_migrations().await?;

    let anchors = database.list_anchors().await?;
    if verbose {
        println!("Loaded {} anchors", anchors.len());
    }

    let outcome = verify_chain(&anchors);
    let tampered = find_tampered_anchors(&anchors);
    database.close().await;

    match outcome {
        Ok(report) => {
            if !quiet {
                println!("✓ Anchor chain verified ({} anchors)", report.length);
            }
            if verbose {
                println!("\nLedger Summary:");
                println!("  Length: {}", report.length);
                if let (Some(first), Some(last)) = (anchors.first(), anchors.last()) {
                    println!("  First anchor: {}", first.anchored_at);
                    println!("  Last anchor: {}", last.anchored_at);
                }
                println!(
                    "  Head digest: {}",
                    report.head_digest.as_deref().unwrap_or("(empty)")
                );
            }
            Ok(())
        }
        Err(LedgerError::Integrity {
            sequence_number,
            reason,
        }) => {
            if !tampered.is_empty() {
                eprintln!("Anchors failing digest recomputation: {:?}", tampered);
            }
            Err(anyhow!(
                "chain broken at sequence {}: {}",
                sequence_number,
                reason
            ))
        }
        Err(e) => Err(e.into()),
    }
}
