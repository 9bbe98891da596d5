use std::collections::HashMap;

/// Per-account last-notified post id. Owned by the watcher task alone,
/// so no locking; lives for the process lifetime and is lost on restart.
#[derive(Debug, Default)]
pub struct DedupTracker {
    last_notified: HashMap<String, String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no notification was recorded for this account yet, or
    /// the recorded id differs from `post_id`.
    pub fn is_new(&self, handle: &str, post_id: &str) -> bool {
        self.last_notified.get(handle).map_or(true, |id| id != post_id)
    }

    /// Idempotent overwrite of the per-account marker.
    pub fn mark_notified(&mut self, handle: &str, post_id: &str) {
        self.last_notified
            .insert(handle.to_string(), post_id.to_string());
    }
}
