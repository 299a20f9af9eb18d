use skiff_cid::{thumbnail_url, to_gateway_url};
use skiff_store::UploadHistory;
use skiff_types::{SkiffError, UploadProgressEntry, UploadStatus, UploadedFileRecord};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::AgentClient;

/// How much the simulated percentage advances per tick.
const PROGRESS_STEP: u8 = 5;

/// Simulated progress stops here until the call actually finishes.
const PROGRESS_CEILING: u8 = 90;

struct TrackedUpload {
    entry: UploadProgressEntry,
    cancel: CancellationToken,
}

/// Orchestrates uploads: one progress entry per call, simulated percentage,
/// per-upload cancellation, and history persistence on success.
///
/// Uploads are independent; concurrent calls only share the progress map,
/// which is keyed by a per-call id so entries cannot collide. There is no
/// automatic retry — callers re-invoke on failure.
#[derive(Clone)]
pub struct UploadSupervisor {
    uploads: Arc<RwLock<HashMap<String, TrackedUpload>>>,
    /// Interval between simulated progress steps.
    tick: Duration,
    /// How long a terminal entry stays visible before removal.
    linger: Duration,
}

impl Default for UploadSupervisor {
    fn default() -> Self {
        Self::with_timings(Duration::from_millis(200), Duration::from_secs(3))
    }
}

impl UploadSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom timings, mainly for tests.
    pub fn with_timings(tick: Duration, linger: Duration) -> Self {
        Self {
            uploads: Arc::new(RwLock::new(HashMap::new())),
            tick,
            linger,
        }
    }

    /// Upload one file through the client and record it in the history.
    pub async fn upload_file(
        &self,
        client: &AgentClient,
        history: &UploadHistory,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFileRecord, SkiffError> {
        let size = bytes.len() as u64;
        let gateway = client.gateway().to_string();
        self.run(
            history,
            name,
            mime_type,
            size,
            &gateway,
            client.upload(name, mime_type, bytes),
        )
        .await
    }

    /// Progress for one upload, when it is still tracked.
    pub fn progress(&self, file_id: &str) -> Option<UploadProgressEntry> {
        self.uploads
            .read()
            .ok()?
            .get(file_id)
            .map(|t| t.entry.clone())
    }

    /// All tracked progress entries.
    pub fn entries(&self) -> Vec<UploadProgressEntry> {
        self.uploads
            .read()
            .map(|map| map.values().map(|t| t.entry.clone()).collect())
            .unwrap_or_default()
    }

    /// Cancel one upload: the local entry is marked errored and the progress
    /// simulation stops. The wire call is not guaranteed to be aborted.
    pub fn cancel(&self, file_id: &str) -> bool {
        let Ok(map) = self.uploads.read() else {
            return false;
        };
        match map.get(file_id) {
            Some(tracked) => {
                tracked.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Drive one upload future under progress tracking.
    pub(crate) async fn run<F>(
        &self,
        history: &UploadHistory,
        name: &str,
        mime_type: &str,
        size_bytes: u64,
        gateway: &str,
        upload: F,
    ) -> Result<UploadedFileRecord, SkiffError>
    where
        F: Future<Output = Result<String, SkiffError>>,
    {
        let file_id = new_file_id(name);
        let cancel = CancellationToken::new();
        self.insert_entry(&file_id, name, size_bytes, cancel.clone());

        let ticker = self.spawn_ticker(file_id.clone(), cancel.clone());

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(SkiffError::Cancelled),
            result = upload => result,
        };
        cancel.cancel();
        ticker.abort();

        let outcome = match result.and_then(|cid| {
            build_record(&cid, name, mime_type, size_bytes, gateway)
                .and_then(|record| history.push(record.clone()).map(|()| record))
        }) {
            Ok(record) => {
                self.finish(&file_id, UploadStatus::Completed);
                debug!(cid = %record.cid, name, "upload complete");
                Ok(record)
            }
            Err(e) => {
                warn!(name, error = %e, "upload failed");
                self.finish(&file_id, UploadStatus::Error);
                Err(e)
            }
        };

        self.schedule_removal(file_id);
        outcome
    }

    fn insert_entry(&self, file_id: &str, name: &str, total_bytes: u64, cancel: CancellationToken) {
        let entry = UploadProgressEntry {
            file_id: file_id.to_string(),
            file_name: name.to_string(),
            progress_percent: 0,
            status: UploadStatus::Pending,
            bytes_uploaded: 0,
            total_bytes,
        };
        if let Ok(mut map) = self.uploads.write() {
            map.insert(file_id.to_string(), TrackedUpload { entry, cancel });
        }
    }

    fn spawn_ticker(&self, file_id: String, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let uploads = Arc::clone(&self.uploads);
        let tick = self.tick;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Ok(mut map) = uploads.write() else { break };
                let Some(tracked) = map.get_mut(&file_id) else { break };
                let entry = &mut tracked.entry;
                entry.status = UploadStatus::Uploading;
                entry.progress_percent =
                    (entry.progress_percent + PROGRESS_STEP).min(PROGRESS_CEILING);
                entry.bytes_uploaded =
                    entry.total_bytes * u64::from(entry.progress_percent) / 100;
            }
        })
    }

    fn finish(&self, file_id: &str, status: UploadStatus) {
        let Ok(mut map) = self.uploads.write() else {
            return;
        };
        if let Some(tracked) = map.get_mut(file_id) {
            let entry = &mut tracked.entry;
            entry.status = status;
            match status {
                UploadStatus::Completed => {
                    entry.progress_percent = 100;
                    entry.bytes_uploaded = entry.total_bytes;
                }
                _ => {
                    entry.progress_percent = 0;
                    entry.bytes_uploaded = 0;
                }
            }
        }
    }

    fn schedule_removal(&self, file_id: String) {
        let uploads = Arc::clone(&self.uploads);
        let linger = self.linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            if let Ok(mut map) = uploads.write() {
                map.remove(&file_id);
            }
        });
    }
}

/// Per-call progress key. Timestamp plus randomness so concurrent uploads of
/// the same file never collide.
fn new_file_id(name: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let salt: u32 = rand::random();
    format!("{name}-{nanos}-{salt:08x}")
}

fn build_record(
    cid: &str,
    name: &str,
    mime_type: &str,
    size_bytes: u64,
    gateway: &str,
) -> Result<UploadedFileRecord, SkiffError> {
    let gateway_url = to_gateway_url(cid, Some(name), Some(gateway))?;
    let thumbnail = mime_type
        .starts_with("image/")
        .then(|| thumbnail_url(&gateway_url));
    let uploaded_at = chrono::Utc::now().timestamp();
    Ok(UploadedFileRecord {
        id: format!("{cid}-{uploaded_at}"),
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        size_bytes,
        cid: cid.to_string(),
        uploaded_at,
        gateway_url,
        thumbnail_url: thumbnail,
        description: None,
    })
}
