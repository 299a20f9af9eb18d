use skiff_types::{SkiffError, UploadedFileRecord};
use std::sync::Arc;
use tracing::debug;

use crate::state::StateStore;

/// Storage key for the persisted upload list.
pub const UPLOADS_KEY: &str = "storacha_uploads";

/// The locally persisted, most-recent-first list of completed uploads.
///
/// Records are immutable once appended; the list only grows at the front,
/// shrinks by id, or is cleared wholesale.
#[derive(Clone)]
pub struct UploadHistory {
    store: Arc<dyn StateStore>,
}

impl UploadHistory {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// All records, newest first. Absent or malformed state is an empty list.
    pub fn list(&self) -> Vec<UploadedFileRecord> {
        let Some(raw) = self.store.read(UPLOADS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                debug!(error = %e, "malformed upload history treated as empty");
                Vec::new()
            }
        }
    }

    /// Prepend a record and persist the whole list.
    pub fn push(&self, record: UploadedFileRecord) -> Result<(), SkiffError> {
        let mut records = self.list();
        records.insert(0, record);
        self.persist(&records)
    }

    /// Remove a single record by id. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, SkiffError> {
        let mut records = self.list();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.persist(&records)?;
        Ok(true)
    }

    /// Bulk clear.
    pub fn clear(&self) {
        self.store.remove(UPLOADS_KEY);
    }

    fn persist(&self, records: &[UploadedFileRecord]) -> Result<(), SkiffError> {
        let json =
            serde_json::to_string(records).map_err(|e| SkiffError::Serialization(e.to_string()))?;
        self.store.write(UPLOADS_KEY, &json)
    }
}
