//! Version Lister: recent uploads of one variant from the listing page.
//!
//! The listing page shows a short, newest-first history of uploads. Position on the
//! page is the only ordering signal we have, so it is preserved as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::{SourceConfig, VariantSpec};
use crate::contract::{PageFetcher, VersionEntry};
use crate::error::SourceError;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d\.\d+\.\d+\.\d+").expect("version pattern is valid"));

static PRERELEASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)beta|alpha").expect("prerelease pattern is valid"));

static WIDGET: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.widget_appmanager_recentpostswidget").expect("widget selector is valid")
});

static ROW_TITLES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div.widget_appmanager_recentpostswidget div[class="appRow"] h5.appRowTitle"#)
        .expect("row title selector is valid")
});

/// First dotted 4-component version found in `title`.
pub fn extract_version(title: &str) -> Option<&str> {
    VERSION_PATTERN.find(title).map(|m| m.as_str())
}

/// True when a title marks a beta or alpha build.
pub fn is_prerelease(title: &str) -> bool {
    PRERELEASE_PATTERN.is_match(title)
}

pub fn listing_url(base_url: &str, slug: &str) -> String {
    format!(
        "{}/uploads/?appcategory={}",
        base_url.trim_end_matches('/'),
        slug
    )
}

/// Parse a listing page into at most `window` entries, newest first.
///
/// Returns `None` when the recent-uploads widget is missing altogether, which means
/// the page layout changed and the listing cannot be trusted. A widget without rows
/// yields an empty vector.
pub fn parse_listing(html: &str, window: usize) -> Option<Vec<VersionEntry>> {
    let document = Html::parse_document(html);
    document.select(&WIDGET).next()?;

    let mut entries = Vec::new();
    for row in document.select(&ROW_TITLES) {
        if entries.len() >= window {
            break;
        }
        let Some(title) = row.value().attr("title") else {
            debug!("Skipping listing row without title attribute");
            continue;
        };
        let Some(version) = extract_version(title) else {
            debug!(title = %title, "Skipping listing row without a version");
            continue;
        };
        entries.push(VersionEntry::new(title, version));
    }
    Some(entries)
}

pub async fn list_versions(
    fetcher: &dyn PageFetcher,
    source: &SourceConfig,
    variant: &VariantSpec,
) -> Result<Vec<VersionEntry>, SourceError> {
    let url = listing_url(&source.base_url, &variant.slug);
    info!(variant = %variant.key, url = %url, "Fetching listing");

    let html = fetcher.fetch_page(&url).await.map_err(|e| {
        warn!(variant = %variant.key, error = %e, "Listing fetch failed");
        SourceError::Unavailable {
            variant: variant.key.clone(),
            reason: e.to_string(),
        }
    })?;

    let entries =
        parse_listing(&html, source.listing_window).ok_or_else(|| SourceError::Unavailable {
            variant: variant.key.clone(),
            reason: "recent uploads widget not found on listing page".to_string(),
        })?;

    info!(variant = %variant.key, count = entries.len(), "Parsed listing");
    Ok(entries)
}
