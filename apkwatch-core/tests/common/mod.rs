#![allow(dead_code)]

use std::path::Path;

use apkwatch_core::config::{RelayConfig, SourceConfig, VariantSpec};
use apkwatch_core::contract::{ReleaseInfo, VersionEntry};

pub fn source() -> SourceConfig {
    SourceConfig {
        base_url: "https://www.apkmirror.com".to_string(),
        org: "whatsapp-inc".to_string(),
        listing_window: 10,
        user_agent: "test".to_string(),
        request_timeout_secs: 5,
    }
}

pub fn android() -> VariantSpec {
    VariantSpec {
        key: "android".to_string(),
        slug: "whatsapp".to_string(),
        release_slug: Some("whatsapp-messenger".to_string()),
        display_name: "WhatsApp Messenger Android".to_string(),
    }
}

pub fn business() -> VariantSpec {
    VariantSpec {
        key: "business".to_string(),
        slug: "whatsapp-business".to_string(),
        release_slug: None,
        display_name: "WhatsApp Business Android".to_string(),
    }
}

pub fn relay_config(variants: Vec<VariantSpec>, root: &Path) -> RelayConfig {
    RelayConfig {
        source: source(),
        variants,
        scratch_dir: root.join("scratch"),
        ledger_path: root.join("ledger"),
        digest_title: "Latest versions".to_string(),
    }
}

pub fn entry(version: &str) -> VersionEntry {
    VersionEntry::new(format!("WhatsApp Messenger {version}"), version)
}

pub fn beta_entry(version: &str) -> VersionEntry {
    VersionEntry::new(format!("WhatsApp Messenger {version} beta"), version)
}

/// A resolved release whose version code is derived from the version digits.
pub fn release(version: &str) -> ReleaseInfo {
    let code: u64 = version.replace('.', "").parse().unwrap_or(1);
    ReleaseInfo {
        title: format!("WhatsApp Messenger {version}"),
        version: version.to_string(),
        version_code: code,
        download_url: format!("https://www.apkmirror.com/download.php?v={version}"),
        source_page_url: format!("https://www.apkmirror.com/apk/whatsapp-inc/whatsapp/{version}/"),
        checksum: "0f1e2d3c4b5a69788796a5b4c3d2e1f0".to_string(),
        filename: format!("com.whatsapp_{version}.apk"),
        published_at: "10-01-2023 22:34:00 IST".to_string(),
    }
}
