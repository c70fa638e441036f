//! Release Resolver: version → release page → confirm-download page → binary URL.
//!
//! Page parsing is kept in plain synchronous functions that return owned values, so
//! no parsed document is ever held across an await point.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::{SourceConfig, VariantSpec};
use crate::contract::{PageFetcher, ReleaseInfo};
use crate::error::SourceError;

/// Format of the publish time shown on release pages, e.g. `March 14, 2023 at 5:04PM UTC`.
pub const PUBLISHED_FORMAT: &str = "%B %d, %Y at %I:%M%p UTC";
/// Format of normalized publish times.
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y %H:%M:%S IST";
/// UTC+05:30
const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

static FILENAME: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#safeDownload > div > div > div.modal-body > h5:nth-child(1) > span")
        .expect("filename selector is valid")
});
static CHECKSUM: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#safeDownload > div > div > div.modal-body > span:nth-child(13)")
        .expect("checksum selector is valid")
});
static PUBLISHED: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.apk-detail-table span.datetime_utc").expect("published selector is valid")
});
static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#masthead > header > div > div > div.f-grow > h1")
        .expect("title selector is valid")
});
static VERSION_CODE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "#variants > div > div > div:nth-child(2) > div:nth-child(1) > span:nth-child(6)",
    )
    .expect("version code selector is valid")
});
static CONFIRM_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[class^="accent_bg btn btn-flat downloadButton"]"#)
        .expect("confirm link selector is valid")
});
static NOFOLLOW_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[rel="nofollow"]"#).expect("nofollow selector is valid"));

static MD5_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9a-fA-F]{32}\b").expect("md5 pattern is valid"));

/// Raw fields scraped from a release detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasePage {
    pub title: String,
    pub filename: String,
    pub checksum_text: String,
    pub published_text: String,
    pub version_code_text: String,
    pub confirm_link: Option<String>,
}

pub fn dashed_version(version: &str) -> String {
    version.replace('.', "-")
}

pub fn release_page_url(source: &SourceConfig, variant: &VariantSpec, version: &str) -> String {
    format!(
        "{}/apk/{}/{}-release/{}-{}-android-apk-download/",
        source.base_url.trim_end_matches('/'),
        source.org,
        variant.slug,
        variant.release_slug(),
        dashed_version(version)
    )
}

fn select_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}

pub fn parse_release_page(html: &str) -> ReleasePage {
    let document = Html::parse_document(html);
    ReleasePage {
        title: select_text(&document, &TITLE).trim().to_string(),
        filename: select_text(&document, &FILENAME).trim().to_string(),
        checksum_text: select_text(&document, &CHECKSUM),
        published_text: select_text(&document, &PUBLISHED),
        version_code_text: select_text(&document, &VERSION_CODE),
        confirm_link: document
            .select(&CONFIRM_LINK)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string),
    }
}

/// The first `rel="nofollow"` anchor on the confirm-download page.
pub fn parse_confirm_page(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&NOFOLLOW_LINK)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}

/// Offset used for every human-facing timestamp.
pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn to_display_time(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc.with_timezone(&display_offset())
}

/// Parse a release page publish time and re-render it in the display timezone.
pub fn normalize_published_at(text: &str) -> Result<String, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), PUBLISHED_FORMAT)?;
    let utc = Utc.from_utc_datetime(&naive);
    Ok(to_display_time(utc).format(DISPLAY_FORMAT).to_string())
}

/// Lowercase MD5 digest contained in `text`, if any.
pub fn parse_checksum(text: &str) -> Option<String> {
    MD5_HEX.find(text).map(|m| m.as_str().to_ascii_lowercase())
}

pub fn parse_version_code(text: &str) -> Option<u64> {
    text.trim().parse::<u64>().ok()
}

/// Filename for the scratch copy of the APK.
///
/// Drops the site's `_apkmirror.com` suffix and any path separators; falls back to a
/// name derived from the variant and version when the page had none.
pub fn clean_filename(raw: &str, variant: &VariantSpec, version: &str) -> String {
    let name = raw
        .trim()
        .replace("_apkmirror.com", "")
        .replace(['/', '\\'], "_");
    let name = name.trim_start_matches('.');
    if name.is_empty() {
        format!("{}-{}.apk", variant.release_slug(), dashed_version(version))
    } else {
        name.to_string()
    }
}

fn join_url(base_url: &str, href: &str) -> Result<String, String> {
    let base = Url::parse(base_url).map_err(|e| format!("invalid base url {base_url}: {e}"))?;
    base.join(href)
        .map(|u| u.to_string())
        .map_err(|e| format!("invalid link {href}: {e}"))
}

/// Build a [`ReleaseInfo`] from a parsed release page and the final binary link.
pub fn release_from_page(
    source: &SourceConfig,
    variant: &VariantSpec,
    version: &str,
    page: &ReleasePage,
    binary_href: &str,
) -> Result<ReleaseInfo, String> {
    let version_code = parse_version_code(&page.version_code_text).ok_or_else(|| {
        format!(
            "version code {:?} is not a number",
            page.version_code_text.trim()
        )
    })?;
    let checksum = parse_checksum(&page.checksum_text)
        .ok_or_else(|| format!("no md5 checksum in {:?}", page.checksum_text.trim()))?;
    let published_at = normalize_published_at(&page.published_text).map_err(|e| {
        format!(
            "publish time {:?} not understood: {e}",
            page.published_text.trim()
        )
    })?;
    let download_url = join_url(&source.base_url, binary_href)?;

    Ok(ReleaseInfo {
        title: page.title.clone(),
        version: version.to_string(),
        version_code,
        download_url,
        source_page_url: release_page_url(source, variant, version),
        checksum,
        filename: clean_filename(&page.filename, variant, version),
        published_at,
    })
}

pub async fn resolve(
    fetcher: &dyn PageFetcher,
    source: &SourceConfig,
    variant: &VariantSpec,
    version: &str,
) -> Result<Option<ReleaseInfo>, SourceError> {
    let failed = |reason: String| {
        warn!(variant = %variant.key, version = %version, reason = %reason, "Resolution failed");
        SourceError::ResolutionFailed {
            variant: variant.key.clone(),
            version: version.to_string(),
            reason,
        }
    };

    let page_url = release_page_url(source, variant, version);
    info!(variant = %variant.key, version = %version, url = %page_url, "Fetching release page");
    let html = fetcher
        .fetch_page(&page_url)
        .await
        .map_err(|e| failed(e.to_string()))?;
    let page = parse_release_page(&html);

    let Some(confirm_link) = page.confirm_link.as_deref() else {
        info!(variant = %variant.key, version = %version, "No confirm-download link yet");
        return Ok(None);
    };

    let confirm_url = join_url(&source.base_url, confirm_link).map_err(&failed)?;
    debug!(url = %confirm_url, "Fetching confirm-download page");
    let confirm_html = fetcher
        .fetch_page(&confirm_url)
        .await
        .map_err(|e| failed(e.to_string()))?;
    let binary_href = parse_confirm_page(&confirm_html)
        .ok_or_else(|| failed("no download anchor on confirm page".to_string()))?;

    let release = release_from_page(source, variant, version, &page, &binary_href).map_err(failed)?;
    info!(
        variant = %variant.key,
        version = %release.version,
        version_code = release.version_code,
        filename = %release.filename,
        "Resolved release"
    );
    Ok(Some(release))
}
