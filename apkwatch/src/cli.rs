//! Command-line interface for apkwatch: argument parsing and wiring of concrete
//! collaborators into the core pipeline.
//!
//! All pipeline logic lives in `apkwatch-core`; this module only builds the HTTP
//! fetcher, the sled ledger and the Telegram publisher, and hands them over.
//!
//! ## Commands
//! - `run`: full release run (diff, deliver, digest); exits non-zero when a published
//!   version could not be recorded
//! - `digest`: refresh the pinned digest only
//! - `known`: print what the ledger holds for one variant
use crate::load_config::{load_config, load_relay_config};
use crate::telegram::TelegramPublisher;
use anyhow::{Context, Result};
use apkwatch_core::apkmirror::ApkMirror;
use apkwatch_core::deliver::{DeliveryOutcome, Relay};
use apkwatch_core::fetch::HttpFetcher;
use apkwatch_core::ledger::SledLedger;
use apkwatch_core::synchronise::{refresh_digest, synchronise, RunReport, VariantRun};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watch APKMirror for new releases and republish them to a Telegram channel.
#[derive(Parser)]
#[clap(
    name = "apkwatch",
    version,
    about = "Watch APKMirror for new releases and republish them to a Telegram channel"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deliver every new release, then refresh the pinned digest
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Refresh the pinned digest without delivering anything
    Digest {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List the versions recorded in the ledger for one variant
    Known {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Variant key as written in the config (e.g. `android`)
        #[clap(long)]
        variant: String,
    },
}

fn print_report(report: &RunReport) {
    println!("Run complete.");
    for variant in &report.variants {
        match variant {
            VariantRun::Delivered(r) => {
                println!("{}:", r.variant_key);
                if r.outcomes.is_empty() {
                    println!("  nothing new");
                }
                for outcome in &r.outcomes {
                    match outcome {
                        DeliveryOutcome::Delivered {
                            version,
                            version_code,
                            ..
                        } => println!("  delivered {version} ({version_code})"),
                        DeliveryOutcome::Deferred { version, reason } => {
                            println!("  deferred {version}: {reason:?}")
                        }
                        DeliveryOutcome::PublishedUnrecorded { version, error } => {
                            println!("  published {version} but NOT recorded: {error}")
                        }
                    }
                }
            }
            VariantRun::Unavailable {
                variant_key,
                reason,
            } => println!("{variant_key}: listing unavailable ({reason})"),
        }
    }
    println!(
        "Digest: {}",
        if report.digest_updated {
            "updated"
        } else {
            "not updated"
        }
    );
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "run", "Starting release run");

            let fetcher = HttpFetcher::from_config(&config.relay.source)
                .context("Failed to build HTTP client")?;
            let source = ApkMirror::new(fetcher, config.relay.source.clone());
            let ledger = SledLedger::open(&config.relay.ledger_path).with_context(|| {
                format!(
                    "Failed to open ledger at {}",
                    config.relay.ledger_path.display()
                )
            })?;
            let publisher = TelegramPublisher::new(config.channel.clone());

            let relay = Relay {
                source: &source,
                fetcher: source.fetcher(),
                publisher: &publisher,
                ledger: &ledger,
                scratch_dir: &config.relay.scratch_dir,
            };
            match synchronise(relay, &config.relay).await {
                Ok(report) => {
                    tracing::info!(command = "run", ?report, "Release run complete");
                    print_report(&report);
                    let unrecorded = report.unrecorded();
                    if unrecorded.is_empty() {
                        Ok(())
                    } else {
                        anyhow::bail!(
                            "{} published version(s) could not be recorded and will be sent again: {:?}",
                            unrecorded.len(),
                            unrecorded
                        )
                    }
                }
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Release run failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Digest { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "digest", "Refreshing pinned digest");

            let fetcher = HttpFetcher::from_config(&config.relay.source)
                .context("Failed to build HTTP client")?;
            let source = ApkMirror::new(fetcher, config.relay.source.clone());
            let publisher = TelegramPublisher::new(config.channel.clone());

            if refresh_digest(&source, &publisher, &config.relay).await {
                println!("Digest updated.");
                Ok(())
            } else {
                anyhow::bail!("Pinned digest could not be updated")
            }
        }
        Commands::Known { config, variant } => {
            let config = load_relay_config(config)?;
            if config.variant(&variant).is_none() {
                anyhow::bail!("Unknown variant {variant:?}");
            }
            let ledger = SledLedger::open(&config.ledger_path).with_context(|| {
                format!("Failed to open ledger at {}", config.ledger_path.display())
            })?;
            let records = ledger.records(&variant)?;
            tracing::info!(command = "known", variant = %variant, count = records.len(), "Read ledger");
            for record in &records {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.version,
                    record.version_code,
                    record.published_at,
                    record.checksum,
                    record.recorded_at.to_rfc3339()
                );
            }
            if records.is_empty() {
                println!("No versions recorded for {variant}.");
            }
            Ok(())
        }
    }
}
