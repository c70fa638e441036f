use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://www.apkmirror.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36";
pub const DEFAULT_LISTING_WINDOW: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// One distributable flavour of the tracked application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Stable key used in the ledger (e.g. `android`).
    pub key: String,
    /// Category slug on the listing page (e.g. `whatsapp`).
    pub slug: String,
    /// Slug prefix of release page paths when it differs from `slug`.
    #[serde(default)]
    pub release_slug: Option<String>,
    pub display_name: String,
}

impl VariantSpec {
    pub fn release_slug(&self) -> &str {
        self.release_slug.as_deref().unwrap_or(&self.slug)
    }
}

/// Where and how the upstream site is scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Publisher path segment on release pages (e.g. `whatsapp-inc`).
    pub org: String,
    #[serde(default = "default_listing_window")]
    pub listing_window: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_listing_window() -> usize {
    DEFAULT_LISTING_WINDOW
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_digest_title() -> String {
    "Latest versions".to_string()
}

/// Everything the core needs for one run, built once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub source: SourceConfig,
    pub variants: Vec<VariantSpec>,
    /// Parent directory for per-version scratch directories.
    pub scratch_dir: PathBuf,
    pub ledger_path: PathBuf,
    #[serde(default = "default_digest_title")]
    pub digest_title: String,
}

impl RelayConfig {
    pub fn variant(&self, key: &str) -> Option<&VariantSpec> {
        self.variants.iter().find(|v| v.key == key)
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.source.base_url,
            org = %self.source.org,
            variants_count = self.variants.len(),
            scratch_dir = %self.scratch_dir.display(),
            ledger_path = %self.ledger_path.display(),
            "Loaded RelayConfig"
        );
        for variant in &self.variants {
            info!(
                key = %variant.key,
                slug = %variant.slug,
                release_slug = variant.release_slug(),
                "Loaded variant"
            );
        }
        debug!(?self, "RelayConfig loaded (full debug)");
    }
}
