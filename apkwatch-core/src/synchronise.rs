//! High-level pipeline: orchestrates diff → deliver for every variant, then the digest.
//!
//! One run is a single linear sequence:
//!   - For each configured variant, list the upstream releases and diff them against the ledger
//!   - Deliver the variant's pending versions oldest first, recording each in the ledger
//!   - Compose the digest from this run's fresh listings and edit it into the pinned message
//!
//! Nothing runs concurrently. The channel is one ordered stream, and concurrent
//! publishes would break the oldest-first ordering of deliveries.
//!
//! # Error Handling
//! - A variant whose listing is unavailable is skipped; the other variants still run.
//! - A single version failing is deferred inside [`deliver`]; its siblings still run.
//! - A published version that could not be recorded is reported in
//!   [`RunReport::unrecorded`]; the run carries on and the digest is still edited.
//! - The run stops only when the ledger cannot be read at all.
//! - A failed digest edit is logged and reported, never fatal.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Digest-only refresh: [`refresh_digest`]
//! - Supporting types: [`RunReport`], [`VariantRun`].

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{RelayConfig, VariantSpec};
use crate::contract::{ChannelPublisher, ReleaseSource, VersionEntry};
use crate::deliver::{deliver, Relay, VariantReport};
use crate::diff::compute_diff;
use crate::digest::{compose_digest, update_digest};
use crate::error::{DiffError, RunError};

/// What happened to one variant during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantRun {
    Delivered(VariantReport),
    /// The listing could not be read; nothing was attempted for this variant.
    Unavailable { variant_key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub variants: Vec<VariantRun>,
    pub digest_updated: bool,
}

impl RunReport {
    /// `(variant_key, version)` pairs that reached the channel but not the ledger.
    pub fn unrecorded(&self) -> Vec<(&str, &str)> {
        self.variants
            .iter()
            .filter_map(|run| match run {
                VariantRun::Delivered(report) => Some(report),
                VariantRun::Unavailable { .. } => None,
            })
            .flat_map(|report| {
                report
                    .unrecorded()
                    .into_iter()
                    .map(move |version| (report.variant_key.as_str(), version))
            })
            .collect()
    }
}

fn digest_text(config: &RelayConfig, listings: &[(&VariantSpec, Vec<VersionEntry>)]) -> String {
    let sections: Vec<(&VariantSpec, &[VersionEntry])> = listings
        .iter()
        .map(|(variant, listing)| (*variant, listing.as_slice()))
        .collect();
    compose_digest(&config.digest_title, &sections, Utc::now())
}

pub async fn synchronise(relay: Relay<'_>, config: &RelayConfig) -> Result<RunReport, RunError> {
    info!(variants = config.variants.len(), "[RUN] Starting release run");

    let mut variants = Vec::with_capacity(config.variants.len());
    let mut listings: Vec<(&VariantSpec, Vec<VersionEntry>)> = Vec::new();

    for variant in &config.variants {
        info!(variant = %variant.key, "[RUN] Processing variant");
        let diff = match compute_diff(relay.source, relay.ledger, variant).await {
            Ok(diff) => diff,
            Err(DiffError::Source(e)) => {
                warn!(variant = %variant.key, error = %e, "[RUN] Listing unavailable, skipping variant");
                variants.push(VariantRun::Unavailable {
                    variant_key: variant.key.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            Err(DiffError::Ledger(e)) => {
                error!(variant = %variant.key, error = %e, "[RUN][ERROR] Ledger unreachable, aborting run");
                return Err(RunError::LedgerUnavailable {
                    variant: variant.key.clone(),
                    source: e,
                });
            }
        };

        let report = deliver(relay, variant, &diff.pending).await;
        let unrecorded = report.unrecorded();
        if !unrecorded.is_empty() {
            error!(variant = %variant.key, versions = ?unrecorded, "[RUN][ERROR] Published versions missing from the ledger");
        }
        info!(
            variant = %variant.key,
            delivered = report.delivered().len(),
            deferred = report.deferred().len(),
            unrecorded = unrecorded.len(),
            "[RUN] Variant done"
        );
        variants.push(VariantRun::Delivered(report));
        listings.push((variant, diff.listing));
    }

    let text = digest_text(config, &listings);
    let digest_updated = update_digest(relay.publisher, &text).await;

    info!(digest_updated, "[RUN] Release run complete");
    Ok(RunReport {
        variants,
        digest_updated,
    })
}

/// List every variant and rewrite the pinned digest, without delivering anything.
///
/// Variants whose listing is unavailable are left out of the digest. Returns whether
/// the edit went through.
pub async fn refresh_digest(
    source: &dyn ReleaseSource,
    publisher: &dyn ChannelPublisher,
    config: &RelayConfig,
) -> bool {
    let mut listings: Vec<(&VariantSpec, Vec<VersionEntry>)> = Vec::new();
    for variant in &config.variants {
        match source.list_versions(variant).await {
            Ok(listing) => listings.push((variant, listing)),
            Err(e) => {
                warn!(variant = %variant.key, error = %e, "[DIGEST] Listing unavailable, leaving variant out")
            }
        }
    }
    let text = digest_text(config, &listings);
    update_digest(publisher, &text).await
}
