//! # contract: the seams between the pipeline and the outside world
//!
//! The pipeline never talks to the network, the channel or the database directly.
//! It goes through four traits defined here:
//!
//! - [`PageFetcher`]: plain HTTP, page text and streamed binary downloads.
//! - [`ReleaseSource`]: the upstream site, listing recent versions and resolving one
//!   version to a downloadable release.
//! - [`VersionLedger`]: the durable record of what has been delivered.
//! - [`ChannelPublisher`]: the output channel, sending files and editing the pinned digest.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; mocks are exported behind the default
//!   `test-export-mocks` feature so integration tests can drive the pipeline offline.
//!
//! ## Data types
//! - [`VersionEntry`] and [`ReleaseInfo`] only live for one run.
//! - [`LedgerRecord`] is the only state that survives across runs.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::VariantSpec;
use crate::error::{FetchError, LedgerError, PublishError, SourceError};

/// One row of the upstream listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Raw display title; may carry "beta" / "alpha" markers.
    pub title: String,
    /// Dotted 4-component identifier, e.g. `2.23.1.14`.
    pub version: String,
}

impl VersionEntry {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
        }
    }
}

/// A release resolved down to a direct download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub title: String,
    pub version: String,
    pub version_code: u64,
    pub download_url: String,
    pub source_page_url: String,
    /// Lowercase MD5 hex digest as published on the release page.
    pub checksum: String,
    pub filename: String,
    /// Publish time, already normalized to the display timezone.
    pub published_at: String,
}

/// A delivered (variant, version) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub variant_key: String,
    pub version: String,
    pub title: String,
    pub version_code: u64,
    pub checksum: String,
    pub published_at: String,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn from_release(variant: &VariantSpec, release: &ReleaseInfo) -> Self {
        Self {
            variant_key: variant.key.clone(),
            version: release.version.clone(),
            title: release.title.clone(),
            version_code: release.version_code,
            checksum: release.checksum.clone(),
            published_at: release.published_at.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Result of a ledger insert. Both outcomes are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    AlreadyRecorded,
}

/// Plain HTTP access to the upstream site.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its body as text.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;

    /// Stream `url` into the file at `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// The upstream release site.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Recently published versions of `variant`, newest first.
    ///
    /// An empty vector means nothing was published recently; it is not an error.
    async fn list_versions(&self, variant: &VariantSpec) -> Result<Vec<VersionEntry>, SourceError>;

    /// Resolve one version to a downloadable release.
    ///
    /// `Ok(None)` means the release exists but has no confirm-download link yet;
    /// callers must skip it without recording and try again on a later run.
    async fn resolve(
        &self,
        variant: &VariantSpec,
        version: &str,
    ) -> Result<Option<ReleaseInfo>, SourceError>;
}

/// Durable record of delivered versions.
///
/// Implementations enforce (variant_key, version) uniqueness themselves.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Every version ever recorded for `variant_key`.
    async fn known_versions(&self, variant_key: &str) -> Result<HashSet<String>, LedgerError>;

    /// Insert one record. Inserting an existing pair is a no-op success.
    async fn record(&self, record: &LedgerRecord) -> Result<RecordOutcome, LedgerError>;
}

/// The output channel.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Send the file at `path` as a document with `caption`.
    async fn publish_file(&self, path: &Path, caption: &str) -> Result<(), PublishError>;

    /// Overwrite the text of the pinned digest message.
    async fn edit_pinned(&self, text: &str) -> Result<(), PublishError>;
}
