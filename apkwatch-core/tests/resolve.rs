use apkwatch_core::contract::MockPageFetcher;
use apkwatch_core::error::{FetchError, SourceError};
use apkwatch_core::resolve::{
    clean_filename, dashed_version, normalize_published_at, parse_checksum, parse_confirm_page,
    parse_release_page, release_page_url, resolve,
};

mod common;
use common::{android, source};

const CHECKSUM: &str = "0F1E2D3C4B5A69788796A5B4C3D2E1F0";
const CONFIRM_HREF: &str =
    "/apk/whatsapp-inc/whatsapp/whatsapp-2-23-1-14-release/whatsapp-messenger-2-23-1-14-android-apk-download/download/?key=abc";
const BINARY_HREF: &str = "/wp-content/themes/APKMirror/download.php?id=4242&key=def";

/// Release detail page with the same nesting the live site uses.
fn release_page(confirm: bool, checksum_text: &str, version_code: &str) -> String {
    let filler: String = (0..11).map(|i| format!("<p>detail {i}</p>")).collect();
    let confirm_link = if confirm {
        format!(r#"<a class="accent_bg btn btn-flat downloadButton " href="{CONFIRM_HREF}">Download APK</a>"#)
    } else {
        String::new()
    };
    format!(
        r##"<html><body>
<div id="masthead"><header><div><div><div class="f-grow"><h1>WhatsApp Messenger 2.23.1.14</h1></div></div></div></header></div>
<div class="apk-detail-table"><div><span class="datetime_utc" data-utcdate="2023-01-10 17:04:00">January 10, 2023 at 5:04PM UTC</span></div></div>
<div id="variants"><div><div>
  <div class="table-row headerFont"><div>Variant</div></div>
  <div class="table-row"><div class="table-cell"><a href="#">2.23.1.14</a><span>BUNDLE</span><span>arm64</span><span>nodpi</span><span>x</span><span>{version_code}</span></div></div>
</div></div></div>
{confirm_link}
<div id="safeDownload"><div><div><div class="modal-body"><h5>File name: <span>com.whatsapp_2.23.1.14-231014_minAPI16(nodpi)_apkmirror.com.apk</span></h5>{filler}<span>MD5: {checksum_text}</span></div></div></div></div>
</body></html>"##
    )
}

fn confirm_page() -> String {
    format!(
        r#"<html><body><p>Your download will start shortly. If not, <a rel="nofollow" href="{BINARY_HREF}">click here</a>.</p></body></html>"#
    )
}

#[test]
fn release_url_uses_org_slug_and_dashed_version() {
    assert_eq!(dashed_version("2.23.1.14"), "2-23-1-14");
    assert_eq!(
        release_page_url(&source(), &android(), "2.23.1.14"),
        "https://www.apkmirror.com/apk/whatsapp-inc/whatsapp/whatsapp-2-23-1-14-release/whatsapp-messenger-2-23-1-14-android-apk-download/"
    );
}

#[test]
fn parse_release_page_reads_every_field() {
    let page = parse_release_page(&release_page(true, CHECKSUM, "231014"));
    assert_eq!(page.title, "WhatsApp Messenger 2.23.1.14");
    assert_eq!(
        page.filename,
        "com.whatsapp_2.23.1.14-231014_minAPI16(nodpi)_apkmirror.com.apk"
    );
    assert_eq!(page.version_code_text.trim(), "231014");
    assert_eq!(page.published_text, "January 10, 2023 at 5:04PM UTC");
    assert!(page.checksum_text.contains(CHECKSUM));
    assert_eq!(page.confirm_link.as_deref(), Some(CONFIRM_HREF));
}

#[test]
fn confirm_page_yields_first_nofollow_anchor() {
    assert_eq!(parse_confirm_page(&confirm_page()).as_deref(), Some(BINARY_HREF));
    assert_eq!(parse_confirm_page("<html><body></body></html>"), None);
}

#[test]
fn published_time_is_rendered_in_ist() {
    assert_eq!(
        normalize_published_at("January 10, 2023 at 5:04PM UTC").unwrap(),
        "10-01-2023 22:34:00 IST"
    );
    // Crosses midnight into the next day.
    assert_eq!(
        normalize_published_at("March 31, 2023 at 11:45PM UTC").unwrap(),
        "01-04-2023 05:15:00 IST"
    );
    assert!(normalize_published_at("yesterday").is_err());
}

#[test]
fn checksum_is_lowercased_and_must_be_md5_shaped() {
    assert_eq!(
        parse_checksum(&format!("MD5: {CHECKSUM}")).as_deref(),
        Some("0f1e2d3c4b5a69788796a5b4c3d2e1f0")
    );
    assert_eq!(parse_checksum("MD5: not-a-hash"), None);
}

#[test]
fn filename_drops_site_suffix_and_separators() {
    let variant = android();
    assert_eq!(
        clean_filename(
            "com.whatsapp_2.23.1.14-231014_minAPI16(nodpi)_apkmirror.com.apk",
            &variant,
            "2.23.1.14"
        ),
        "com.whatsapp_2.23.1.14-231014_minAPI16(nodpi).apk"
    );
    assert_eq!(
        clean_filename("../evil/name.apk", &variant, "2.23.1.14"),
        "_evil_name.apk"
    );
    assert_eq!(
        clean_filename("   ", &variant, "2.23.1.14"),
        "whatsapp-messenger-2-23-1-14.apk"
    );
}

#[tokio::test]
async fn resolve_follows_confirm_page_to_binary() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_page().times(2).returning(|url| {
        if url.contains("/download/") {
            Ok(confirm_page())
        } else {
            Ok(release_page(true, CHECKSUM, "231014"))
        }
    });

    let release = resolve(&fetcher, &source(), &android(), "2.23.1.14")
        .await
        .expect("resolution should succeed")
        .expect("release should be downloadable");

    assert_eq!(release.version, "2.23.1.14");
    assert_eq!(release.version_code, 231014);
    assert_eq!(release.checksum, "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
    assert_eq!(release.published_at, "10-01-2023 22:34:00 IST");
    assert_eq!(
        release.download_url,
        format!("https://www.apkmirror.com{BINARY_HREF}")
    );
    assert_eq!(
        release.source_page_url,
        release_page_url(&source(), &android(), "2.23.1.14")
    );
    assert_eq!(
        release.filename,
        "com.whatsapp_2.23.1.14-231014_minAPI16(nodpi).apk"
    );
}

#[tokio::test]
async fn resolve_without_confirm_link_is_not_found() {
    let mut fetcher = MockPageFetcher::new();
    fetcher
        .expect_fetch_page()
        .times(1)
        .returning(|_| Ok(release_page(false, CHECKSUM, "231014")));

    let release = resolve(&fetcher, &source(), &android(), "2.23.1.14")
        .await
        .expect("a missing link is not an error");
    assert!(release.is_none());
}

#[tokio::test]
async fn resolve_rejects_non_numeric_version_code() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_page().returning(|url| {
        if url.contains("/download/") {
            Ok(confirm_page())
        } else {
            Ok(release_page(true, CHECKSUM, "n/a"))
        }
    });

    let err = resolve(&fetcher, &source(), &android(), "2.23.1.14")
        .await
        .unwrap_err();
    match err {
        SourceError::ResolutionFailed {
            variant,
            version,
            reason,
        } => {
            assert_eq!(variant, "android");
            assert_eq!(version, "2.23.1.14");
            assert!(reason.contains("version code"), "reason: {reason}");
        }
        other => panic!("expected ResolutionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn resolve_rejects_missing_checksum() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_page().returning(|url| {
        if url.contains("/download/") {
            Ok(confirm_page())
        } else {
            Ok(release_page(true, "unavailable", "231014"))
        }
    });

    let err = resolve(&fetcher, &source(), &android(), "2.23.1.14")
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::ResolutionFailed { .. }));
}

#[tokio::test]
async fn resolve_reports_unreachable_release_page() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_page().returning(|url| {
        Err(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    });

    let err = resolve(&fetcher, &source(), &android(), "2.23.1.14")
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::ResolutionFailed { .. }));
}
