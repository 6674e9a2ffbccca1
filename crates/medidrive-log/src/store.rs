//! Canonical in-memory collection of service logs.
//!
//! This is the memory boundary for `medidrive-log`:
//! - own the ordered record collection
//! - stamp ids and timestamps
//! - expose insertion-ordered draft / confirmed views
//!
//! Persistence lives in [`crate::storage`]; the store never touches it.

use crate::record::{DraftFields, ServiceLogRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use tracing::debug;
use uuid::Uuid;

/// Timestamp source for `createdAt`/`updatedAt`.
pub type Clock = fn() -> DateTime<Utc>;

/// Result of a mutation addressed by id.
///
/// A missing id is not an error: the store is left unchanged and the caller
/// decides whether that matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied,
    Missing,
}

impl MutationOutcome {
    pub fn applied(self) -> bool {
        self == MutationOutcome::Applied
    }
}

/// Insertion-ordered service-log collection.
#[derive(Clone)]
pub struct LogStore {
    logs: Vec<ServiceLogRecord>,
    clock: Clock,
}

impl Debug for LogStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore").field("logs", &self.logs).finish()
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore {
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            clock: Utc::now,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Build a store from fully-materialized records.
    ///
    /// Duplicate ids are resolved last-write-wins; the surviving record keeps
    /// the position of the first occurrence.
    pub fn from_records(records: Vec<ServiceLogRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            match store.position(&record.id) {
                Some(index) => store.logs[index] = record,
                None => store.logs.push(record),
            }
        }
        store
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// All records in insertion order.
    pub fn logs(&self) -> &[ServiceLogRecord] {
        &self.logs
    }

    pub fn get(&self, id: &str) -> Option<&ServiceLogRecord> {
        self.logs.iter().find(|log| log.id == id)
    }

    /// Records with `draft == true`, insertion order.
    pub fn drafts(&self) -> Vec<&ServiceLogRecord> {
        self.logs.iter().filter(|log| log.draft).collect()
    }

    /// Records with `draft == false`, insertion order.
    pub fn confirmed_logs(&self) -> Vec<&ServiceLogRecord> {
        self.logs.iter().filter(|log| !log.draft).collect()
    }

    /// Append a new record with a fresh id. Never fails; callers validate.
    pub fn add_log(&mut self, data: DraftFields, draft: bool) -> ServiceLogRecord {
        let now = (self.clock)();
        let record = ServiceLogRecord {
            id: Uuid::new_v4().to_string(),
            fields: data,
            draft,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %record.id, draft, "service log added");
        self.logs.push(record.clone());
        record
    }

    /// Replace the record with `updated.id`, keeping its id and `createdAt`
    /// and restamping `updatedAt`.
    pub fn update_log(&mut self, updated: ServiceLogRecord) -> MutationOutcome {
        let Some(index) = self.position(&updated.id) else {
            debug!(id = %updated.id, "update ignored: service log not found");
            return MutationOutcome::Missing;
        };

        let now = (self.clock)();
        let existing = &mut self.logs[index];
        let created_at = existing.created_at;
        *existing = ServiceLogRecord {
            created_at,
            updated_at: now.max(created_at),
            ..updated
        };
        debug!(id = %existing.id, draft = existing.draft, "service log updated");
        MutationOutcome::Applied
    }

    /// Overwrite the editable fields of `id` and set its draft flag.
    pub fn save_edit(&mut self, id: &str, data: DraftFields, draft: bool) -> MutationOutcome {
        let Some(existing) = self.get(id) else {
            debug!(id, "edit ignored: service log not found");
            return MutationOutcome::Missing;
        };
        let updated = ServiceLogRecord {
            fields: data,
            draft,
            ..existing.clone()
        };
        self.update_log(updated)
    }

    /// Promote a draft to a confirmed log.
    pub fn confirm_draft(&mut self, id: &str) -> MutationOutcome {
        let Some(existing) = self.get(id) else {
            debug!(id, "confirm ignored: service log not found");
            return MutationOutcome::Missing;
        };
        let updated = ServiceLogRecord {
            draft: false,
            ..existing.clone()
        };
        self.update_log(updated)
    }

    /// Remove the record with `id`.
    pub fn delete_log(&mut self, id: &str) -> MutationOutcome {
        match self.position(id) {
            Some(index) => {
                self.logs.remove(index);
                debug!(id, "service log deleted");
                MutationOutcome::Applied
            }
            None => {
                debug!(id, "delete ignored: service log not found");
                MutationOutcome::Missing
            }
        }
    }

    /// Remove every draft. Returns how many were removed.
    pub fn remove_all_drafts(&mut self) -> usize {
        let before = self.logs.len();
        self.logs.retain(|log| !log.draft);
        let removed = before - self.logs.len();
        debug!(removed, "drafts removed");
        removed
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.logs.iter().position(|log| log.id == id)
    }
}
