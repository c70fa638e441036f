//! Diff Engine: which listed versions still have to be delivered, oldest first.

use std::collections::HashSet;

use tracing::info;

use crate::config::VariantSpec;
use crate::contract::{ReleaseSource, VersionEntry, VersionLedger};
use crate::error::DiffError;

/// Outcome of diffing one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDiff {
    /// The fresh listing, newest first, exactly as the source returned it.
    pub listing: Vec<VersionEntry>,
    /// Undelivered versions, oldest first.
    pub pending: Vec<VersionEntry>,
}

/// Drop everything already in `known` and flip the newest-first listing around.
///
/// A version listed twice is kept once, at its first (newest) position.
pub fn pending_versions(listing: &[VersionEntry], known: &HashSet<String>) -> Vec<VersionEntry> {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for entry in listing {
        if known.contains(&entry.version) || !seen.insert(entry.version.as_str()) {
            continue;
        }
        pending.push(entry.clone());
    }
    pending.reverse();
    pending
}

pub async fn compute_diff(
    source: &dyn ReleaseSource,
    ledger: &dyn VersionLedger,
    variant: &VariantSpec,
) -> Result<VariantDiff, DiffError> {
    let listing = source.list_versions(variant).await?;
    let known = ledger.known_versions(&variant.key).await?;
    let pending = pending_versions(&listing, &known);

    info!(
        variant = %variant.key,
        listed = listing.len(),
        known = known.len(),
        pending = pending.len(),
        "[DIFF] Computed release diff"
    );
    Ok(VariantDiff { listing, pending })
}
