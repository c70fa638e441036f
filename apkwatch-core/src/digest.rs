//! Digest Composer: the pinned "latest versions" message.
//!
//! "Latest" means first in listing order, not highest version number; the listing is
//! already newest first.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::VariantSpec;
use crate::contract::{ChannelPublisher, VersionEntry};
use crate::listing::is_prerelease;
use crate::resolve::to_display_time;

pub const STAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S IST";

/// First stable and first prerelease entry of a newest-first listing.
pub fn latest_entries(listing: &[VersionEntry]) -> (Option<&VersionEntry>, Option<&VersionEntry>) {
    let stable = listing.iter().find(|e| !is_prerelease(&e.title));
    let beta = listing.iter().find(|e| is_prerelease(&e.title));
    (stable, beta)
}

pub fn compose_digest(
    title: &str,
    sections: &[(&VariantSpec, &[VersionEntry])],
    generated_at: DateTime<Utc>,
) -> String {
    let mut text = title.to_string();
    for (variant, listing) in sections {
        let (stable, beta) = latest_entries(listing);
        text.push_str("\n\n");
        text.push_str(&variant.display_name);
        if let Some(entry) = stable {
            text.push_str(&format!("\nStable: {}", entry.version));
        }
        if let Some(entry) = beta {
            text.push_str(&format!("\nBeta: {}", entry.version));
        }
    }
    text.push_str(&format!(
        "\n\nLast updated on: {}",
        to_display_time(generated_at).format(STAMP_FORMAT)
    ));
    text
}

/// Overwrite the pinned message. Failures are logged and reported as `false`.
pub async fn update_digest(publisher: &dyn ChannelPublisher, text: &str) -> bool {
    match publisher.edit_pinned(text).await {
        Ok(()) => {
            info!("[DIGEST] Pinned digest updated");
            true
        }
        Err(e) => {
            warn!(error = %e, "[DIGEST] Failed to edit pinned digest");
            false
        }
    }
}
