use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::ip::ClientIp;
use crate::report::AuditReport;
use crate::store::{KeyValueStore, StoreResult, HISTORY_KEY};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub score: u8,
    pub platform: String,
    #[serde(default)]
    pub client_ip: ClientIp,
}

impl HistoryEntry {
    fn matches(&self, needle_lower: &str, raw: &str) -> bool {
        self.url.to_lowercase().contains(needle_lower)
            || self.platform.to_lowercase().contains(needle_lower)
            || self.client_ip.as_str().contains(raw)
    }
}

/// Newest-first audit log, one entry per URL, at most `HISTORY_CAPACITY` long.
/// Every mutation rewrites the whole log.
pub struct HistoryStore<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> HistoryStore<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Distinguishes an empty log (`Ok(vec![])`) from an unreadable one.
    pub fn load(&self) -> StoreResult<Vec<HistoryEntry>> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: &[HistoryEntry]) -> StoreResult<()> {
        let encoded = serde_json::to_string(entries)?;
        self.store.set(HISTORY_KEY, &encoded)
    }

    pub fn list_entries(&self) -> Vec<HistoryEntry> {
        self.load().unwrap_or_else(|e| {
            warn!(action = "load", component = "history_store", error = %e, "Failed to load history");
            Vec::new()
        })
    }

    pub fn search(&self, term: &str) -> Vec<HistoryEntry> {
        let term = term.trim();
        let entries = self.list_entries();
        if term.is_empty() {
            return entries;
        }
        let lower = term.to_lowercase();
        entries
            .into_iter()
            .filter(|entry| entry.matches(&lower, term))
            .collect()
    }

    fn new_entry(&self, report: &AuditReport, ip: &ClientIp) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            url: report.url.clone(),
            timestamp: self.clock.now(),
            score: report.score(),
            platform: report.platform.clone(),
            client_ip: ip.clone(),
        }
    }

    /// Builds the entry and persists it. On error nothing was written.
    pub fn try_record_entry(
        &self,
        report: &AuditReport,
        ip: &ClientIp,
    ) -> StoreResult<HistoryEntry> {
        let entry = self.new_entry(report, ip);
        self.insert(entry.clone())?;
        Ok(entry)
    }

    fn insert(&self, entry: HistoryEntry) -> StoreResult<()> {
        let existing = self.list_entries();
        let before = existing.len();

        let mut entries = Vec::with_capacity(HISTORY_CAPACITY);
        let url = entry.url.clone();
        entries.push(entry);
        entries.extend(existing.into_iter().filter(|e| e.url != url));
        entries.truncate(HISTORY_CAPACITY);

        self.save(&entries)?;
        info!(action = "record", component = "history_store", url = %url, previous_len = before, len = entries.len(), "History entry recorded");
        Ok(())
    }

    /// Returns the new entry even if it could not be persisted.
    pub fn record_entry(&self, report: &AuditReport, ip: &ClientIp) -> HistoryEntry {
        let entry = self.new_entry(report, ip);
        if let Err(e) = self.insert(entry.clone()) {
            warn!(action = "record", component = "history_store", url = %entry.url, error = %e, "Failed to save history");
        }
        entry
    }

    /// `Ok(true)` if an entry was removed. An unreadable log is left as is.
    pub fn try_delete_entry(&self, id: &str) -> StoreResult<bool> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        info!(action = "delete", component = "history_store", id, len = entries.len(), "History entry deleted");
        Ok(true)
    }

    pub fn delete_entry(&self, id: &str) -> bool {
        self.try_delete_entry(id).unwrap_or_else(|e| {
            warn!(action = "delete", component = "history_store", id, error = %e, "Failed to delete history entry");
            false
        })
    }

    pub fn try_clear_all(&self) -> StoreResult<()> {
        self.store.delete(HISTORY_KEY)?;
        info!(action = "clear", component = "history_store", "History cleared");
        Ok(())
    }

    pub fn clear_all(&self) {
        if let Err(e) = self.try_clear_all() {
            warn!(action = "clear", component = "history_store", error = %e, "Failed to clear history");
        }
    }
}
