use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where serialized progress records live, keyed by video id. The file
/// backend is the real one; tests substitute an in-memory map.
pub trait ProgressBackend {
    fn read(&self, video_id: &str) -> Option<String>;
    fn write(&self, video_id: &str, content: &str) -> Result<()>;
}

/// Per-video resume state. Unknown fields in stored records are ignored on
/// load so older binaries can read records written by newer ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub last_time_seconds: u32,
    #[serde(default)]
    pub completed_checkpoint_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct ProgressStore {
    backend: Box<dyn ProgressBackend>,
}

impl ProgressStore {
    pub fn new(backend: Box<dyn ProgressBackend>) -> Self {
        Self { backend }
    }

    /// Load a video's record. Missing and corrupt records both come back as
    /// the default; corruption is logged, never fatal.
    pub fn load(&self, video_id: &str) -> ProgressRecord {
        let Some(content) = self.backend.read(video_id) else {
            return ProgressRecord::default();
        };
        match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(err) => {
                warn!(video = video_id, "corrupt progress record ({err}); starting fresh");
                ProgressRecord::default()
            }
        }
    }

    /// Record the latest playback position. Write failures are logged and
    /// swallowed; persistence must never interrupt playback.
    pub fn save_time(&self, video_id: &str, seconds: u32) {
        let mut record = self.load(video_id);
        record.last_time_seconds = seconds;
        record.updated_at = Some(Utc::now());
        self.persist(video_id, &record);
    }

    /// Mark a checkpoint complete and return the updated record. Idempotent.
    pub fn mark_completed(&self, video_id: &str, checkpoint_id: &str) -> ProgressRecord {
        let mut record = self.load(video_id);
        record.completed_checkpoint_ids.insert(checkpoint_id.to_string());
        record.updated_at = Some(Utc::now());
        self.persist(video_id, &record);
        record
    }

    fn persist(&self, video_id: &str, record: &ProgressRecord) {
        let json = match serde_json::to_string_pretty(record) {
            Ok(json) => json,
            Err(err) => {
                warn!(video = video_id, "could not serialize progress: {err}");
                return;
            }
        };
        if let Err(err) = self.backend.write(video_id, &json) {
            warn!(video = video_id, "could not persist progress: {err}");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryBackend;
    use super::*;

    #[test]
    fn missing_record_loads_as_default() {
        let store = ProgressStore::new(Box::new(MemoryBackend::default()));
        let record = store.load("abc");
        assert_eq!(record, ProgressRecord::default());
    }

    #[test]
    fn corrupt_record_loads_as_default() {
        let backend = MemoryBackend::seeded("abc", "{not json");
        let store = ProgressStore::new(Box::new(backend));
        assert_eq!(store.load("abc"), ProgressRecord::default());
    }

    #[test]
    fn save_time_round_trips() {
        let store = ProgressStore::new(Box::new(MemoryBackend::default()));
        store.save_time("abc", 451);
        let record = store.load("abc");
        assert_eq!(record.last_time_seconds, 451);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let store = ProgressStore::new(Box::new(MemoryBackend::default()));
        store.mark_completed("abc", "cp1");
        let record = store.mark_completed("abc", "cp1");
        assert_eq!(record.completed_checkpoint_ids.len(), 1);
        assert!(record.completed_checkpoint_ids.contains("cp1"));
    }

    #[test]
    fn completion_does_not_clobber_saved_time() {
        let store = ProgressStore::new(Box::new(MemoryBackend::default()));
        store.save_time("abc", 120);
        let record = store.mark_completed("abc", "cp1");
        assert_eq!(record.last_time_seconds, 120);
    }

    #[test]
    fn unknown_fields_in_stored_record_are_ignored() {
        let backend = MemoryBackend::seeded(
            "abc",
            r#"{"last_time_seconds": 30, "completed_checkpoint_ids": ["cp1"], "future_field": 7}"#,
        );
        let store = ProgressStore::new(Box::new(backend));
        let record = store.load("abc");
        assert_eq!(record.last_time_seconds, 30);
        assert!(record.completed_checkpoint_ids.contains("cp1"));
    }
}
