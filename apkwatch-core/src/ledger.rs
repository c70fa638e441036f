//! sled-backed [`VersionLedger`].
//!
//! Keys are `variant_key 0x00 version`, values are JSON-encoded [`LedgerRecord`]s.
//! Inserts are a compare-and-swap against an absent key, so uniqueness holds even if
//! two writers race, and each insert is flushed before `record` returns.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::contract::{LedgerRecord, RecordOutcome, VersionLedger};
use crate::error::LedgerError;

const KEY_SEPARATOR: u8 = 0;

pub struct SledLedger {
    db: sled::Db,
}

fn variant_prefix(variant_key: &str) -> Vec<u8> {
    let mut prefix = variant_key.as_bytes().to_vec();
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn record_key(variant_key: &str, version: &str) -> Vec<u8> {
    let mut key = variant_prefix(variant_key);
    key.extend_from_slice(version.as_bytes());
    key
}

impl SledLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!(path = %path.display(), entries = db.len(), "Opened version ledger");
        Ok(Self { db })
    }

    /// All records of one variant, in key order.
    pub fn records(&self, variant_key: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mut records = Vec::new();
        for entry in self.db.scan_prefix(variant_prefix(variant_key)) {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl VersionLedger for SledLedger {
    async fn known_versions(&self, variant_key: &str) -> Result<HashSet<String>, LedgerError> {
        let prefix = variant_prefix(variant_key);
        let mut versions = HashSet::new();
        for entry in self.db.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let version = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            versions.insert(version);
        }
        debug!(variant = %variant_key, count = versions.len(), "Read known versions");
        Ok(versions)
    }

    async fn record(&self, record: &LedgerRecord) -> Result<RecordOutcome, LedgerError> {
        let key = record_key(&record.variant_key, &record.version);
        let value = serde_json::to_vec(record)?;

        let outcome = match self
            .db
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?
        {
            Ok(()) => RecordOutcome::Inserted,
            Err(_) => {
                warn!(
                    variant = %record.variant_key,
                    version = %record.version,
                    "Version already in ledger, keeping the existing record"
                );
                RecordOutcome::AlreadyRecorded
            }
        };
        self.db.flush()?;
        Ok(outcome)
    }
}
