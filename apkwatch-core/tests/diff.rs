use std::collections::HashSet;

use apkwatch_core::contract::{MockReleaseSource, MockVersionLedger};
use apkwatch_core::diff::{compute_diff, pending_versions};
use apkwatch_core::error::{DiffError, LedgerError, SourceError};

mod common;
use common::{android, beta_entry, entry};

fn versions(entries: &[apkwatch_core::contract::VersionEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.version.as_str()).collect()
}

#[test]
fn pending_is_unknown_versions_oldest_first() {
    let listing = vec![entry("2.23.1.5"), entry("2.23.1.4"), entry("2.23.1.3")];
    let known: HashSet<String> = ["2.23.1.4".to_string()].into_iter().collect();

    let pending = pending_versions(&listing, &known);
    assert_eq!(versions(&pending), vec!["2.23.1.3", "2.23.1.5"]);
}

#[test]
fn everything_pending_on_empty_ledger() {
    let listing = vec![beta_entry("2.23.2.3"), entry("2.23.1.14")];
    let pending = pending_versions(&listing, &HashSet::new());
    assert_eq!(versions(&pending), vec!["2.23.1.14", "2.23.2.3"]);
    assert_eq!(pending[1].title, "WhatsApp Messenger 2.23.2.3 beta");
}

#[test]
fn nothing_pending_when_all_known() {
    let listing = vec![entry("2.23.1.5"), entry("2.23.1.4")];
    let known: HashSet<String> = ["2.23.1.5", "2.23.1.4", "2.23.1.1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert!(pending_versions(&listing, &known).is_empty());
}

#[test]
fn duplicate_listing_rows_are_delivered_once() {
    let listing = vec![beta_entry("2.23.2.3"), entry("2.23.2.3"), entry("2.23.2.2")];
    let pending = pending_versions(&listing, &HashSet::new());
    assert_eq!(versions(&pending), vec!["2.23.2.2", "2.23.2.3"]);
    assert_eq!(pending[1].title, "WhatsApp Messenger 2.23.2.3 beta");
}

#[tokio::test]
async fn compute_diff_combines_listing_and_ledger() {
    let mut source = MockReleaseSource::new();
    source
        .expect_list_versions()
        .times(1)
        .returning(|_| Ok(vec![entry("2.23.1.5"), entry("2.23.1.4"), entry("2.23.1.3")]));
    let mut ledger = MockVersionLedger::new();
    ledger
        .expect_known_versions()
        .withf(|key| key == "android")
        .times(1)
        .returning(|_| Ok(["2.23.1.4".to_string()].into_iter().collect()));

    let diff = compute_diff(&source, &ledger, &android()).await.unwrap();
    assert_eq!(versions(&diff.listing), vec!["2.23.1.5", "2.23.1.4", "2.23.1.3"]);
    assert_eq!(versions(&diff.pending), vec!["2.23.1.3", "2.23.1.5"]);
}

#[tokio::test]
async fn compute_diff_is_stable_without_records_in_between() {
    let mut source = MockReleaseSource::new();
    source
        .expect_list_versions()
        .times(2)
        .returning(|_| Ok(vec![beta_entry("2.23.2.3"), entry("2.23.1.14"), entry("2.23.1.13")]));
    let mut ledger = MockVersionLedger::new();
    ledger
        .expect_known_versions()
        .times(2)
        .returning(|_| Ok(["2.23.1.13".to_string()].into_iter().collect()));
    ledger.expect_record().never();

    let first = compute_diff(&source, &ledger, &android()).await.unwrap();
    let second = compute_diff(&source, &ledger, &android()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(versions(&second.pending), vec!["2.23.1.14", "2.23.2.3"]);
}

#[test]
fn pending_versions_is_stable_across_calls() {
    let listing = vec![entry("2.23.1.5"), entry("2.23.1.4"), entry("2.23.1.3")];
    let known: HashSet<String> = ["2.23.1.4".to_string()].into_iter().collect();
    assert_eq!(
        pending_versions(&listing, &known),
        pending_versions(&listing, &known)
    );
}

#[tokio::test]
async fn compute_diff_surfaces_unavailable_listing() {
    let mut source = MockReleaseSource::new();
    source.expect_list_versions().returning(|v| {
        Err(SourceError::Unavailable {
            variant: v.key.clone(),
            reason: "HTTP 503".to_string(),
        })
    });
    let ledger = MockVersionLedger::new();

    let err = compute_diff(&source, &ledger, &android()).await.unwrap_err();
    assert!(matches!(err, DiffError::Source(SourceError::Unavailable { .. })));
}

#[tokio::test]
async fn compute_diff_surfaces_ledger_failure() {
    let mut source = MockReleaseSource::new();
    source
        .expect_list_versions()
        .returning(|_| Ok(vec![entry("2.23.1.5")]));
    let mut ledger = MockVersionLedger::new();
    ledger.expect_known_versions().returning(|_| {
        let bad = serde_json::from_str::<u8>("not json").unwrap_err();
        Err(LedgerError::Encoding(bad))
    });

    let err = compute_diff(&source, &ledger, &android()).await.unwrap_err();
    assert!(matches!(err, DiffError::Ledger(_)));
}
