//! Delivery Pipeline: resolve → download → publish → record, one version at a time.
//!
//! Every version gets its own scratch directory, removed when the attempt ends on any
//! path. A version is recorded only after its file reached the channel; every other
//! failure defers it to the next run without touching the ledger. A failed record after
//! a publish is reported as [`DeliveryOutcome::PublishedUnrecorded`] and the remaining
//! versions still go out.

use std::path::Path;

use tempfile::TempDir;
use tracing::{error, info, warn};

use crate::config::VariantSpec;
use crate::contract::{
    ChannelPublisher, LedgerRecord, PageFetcher, RecordOutcome, ReleaseInfo, ReleaseSource,
    VersionEntry, VersionLedger,
};
use crate::listing::is_prerelease;

/// The collaborators one run works against.
#[derive(Clone, Copy)]
pub struct Relay<'a> {
    pub source: &'a dyn ReleaseSource,
    pub fetcher: &'a dyn PageFetcher,
    pub publisher: &'a dyn ChannelPublisher,
    pub ledger: &'a dyn VersionLedger,
    pub scratch_dir: &'a Path,
}

/// Why a version was left for a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The release page has no confirm-download link yet.
    NotFound,
    ResolutionFailed,
    DownloadFailed,
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        version: String,
        version_code: u64,
        /// The ledger already had this pair (crash-recovery replay).
        already_recorded: bool,
    },
    Deferred {
        version: String,
        reason: DeferReason,
    },
    /// Reached the channel but the ledger write failed; the next run sends it again.
    PublishedUnrecorded { version: String, error: String },
}

impl DeliveryOutcome {
    pub fn version(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { version, .. }
            | DeliveryOutcome::Deferred { version, .. }
            | DeliveryOutcome::PublishedUnrecorded { version, .. } => version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantReport {
    pub variant_key: String,
    /// In delivery order.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl VariantReport {
    pub fn delivered(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DeliveryOutcome::Delivered { .. }))
            .map(DeliveryOutcome::version)
            .collect()
    }

    pub fn deferred(&self) -> Vec<(&str, DeferReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                DeliveryOutcome::Deferred { version, reason } => Some((version.as_str(), *reason)),
                _ => None,
            })
            .collect()
    }

    pub fn unrecorded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DeliveryOutcome::PublishedUnrecorded { .. }))
            .map(DeliveryOutcome::version)
            .collect()
    }
}

/// Caption sent along with the APK.
pub fn format_caption(variant: &VariantSpec, entry: &VersionEntry, release: &ReleaseInfo) -> String {
    let channel = if is_prerelease(&release.title) || is_prerelease(&entry.title) {
        " beta"
    } else {
        ""
    };
    format!(
        "{}{} — version {} ({}), published {}, checksum {}",
        variant.display_name,
        channel,
        release.version,
        release.version_code,
        release.published_at,
        release.checksum
    )
}

fn deferred(entry: &VersionEntry, reason: DeferReason) -> DeliveryOutcome {
    DeliveryOutcome::Deferred {
        version: entry.version.clone(),
        reason,
    }
}

fn scratch_dir_in(parent: &Path) -> std::io::Result<TempDir> {
    std::fs::create_dir_all(parent)?;
    tempfile::Builder::new()
        .prefix("apkwatch-")
        .tempdir_in(parent)
}

/// Deliver `pending` for `variant`, strictly in the given order.
///
/// No single version can stop the others; every attempt ends up as one outcome in the
/// returned report.
pub async fn deliver(
    relay: Relay<'_>,
    variant: &VariantSpec,
    pending: &[VersionEntry],
) -> VariantReport {
    info!(variant = %variant.key, count = pending.len(), "[DELIVER] Starting deliveries");
    let mut outcomes = Vec::with_capacity(pending.len());
    for entry in pending {
        outcomes.push(deliver_one(relay, variant, entry).await);
    }
    VariantReport {
        variant_key: variant.key.clone(),
        outcomes,
    }
}

async fn deliver_one(
    relay: Relay<'_>,
    variant: &VariantSpec,
    entry: &VersionEntry,
) -> DeliveryOutcome {
    let version = entry.version.as_str();

    let release = match relay.source.resolve(variant, version).await {
        Ok(Some(release)) => release,
        Ok(None) => {
            info!(variant = %variant.key, version = %version, "[DELIVER] Release not downloadable yet, deferring");
            return deferred(entry, DeferReason::NotFound);
        }
        Err(e) => {
            warn!(variant = %variant.key, version = %version, error = %e, "[DELIVER] Resolution failed, deferring");
            return deferred(entry, DeferReason::ResolutionFailed);
        }
    };

    // Dropping `scratch` removes the directory and whatever was written into it.
    let scratch = match scratch_dir_in(relay.scratch_dir) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(variant = %variant.key, version = %version, error = %e, "[DELIVER] Could not create scratch directory, deferring");
            return deferred(entry, DeferReason::DownloadFailed);
        }
    };
    let local_path = scratch.path().join(&release.filename);

    match relay.fetcher.download(&release.download_url, &local_path).await {
        Ok(bytes) => {
            info!(variant = %variant.key, version = %version, bytes, file = %release.filename, "[DELIVER] Downloaded");
        }
        Err(e) => {
            warn!(variant = %variant.key, version = %version, error = %e, "[DELIVER] Download failed, deferring");
            return deferred(entry, DeferReason::DownloadFailed);
        }
    }

    let caption = format_caption(variant, entry, &release);
    if let Err(e) = relay.publisher.publish_file(&local_path, &caption).await {
        warn!(variant = %variant.key, version = %version, error = %e, "[DELIVER] Publish failed, deferring");
        return deferred(entry, DeferReason::PublishFailed);
    }
    info!(variant = %variant.key, version = %version, "[DELIVER] Published to channel");
    drop(scratch);

    let record = LedgerRecord::from_release(variant, &release);
    match relay.ledger.record(&record).await {
        Ok(outcome) => {
            info!(variant = %variant.key, version = %version, ?outcome, "[DELIVER] Recorded in ledger");
            DeliveryOutcome::Delivered {
                version: release.version,
                version_code: release.version_code,
                already_recorded: outcome == RecordOutcome::AlreadyRecorded,
            }
        }
        Err(e) => {
            error!(
                variant = %variant.key,
                version = %version,
                error = %e,
                "[DELIVER][ERROR] Published but NOT recorded; this version will be delivered again on the next run"
            );
            DeliveryOutcome::PublishedUnrecorded {
                version: release.version,
                error: e.to_string(),
            }
        }
    }
}
