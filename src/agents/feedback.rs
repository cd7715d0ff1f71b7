//! Shared feedback accumulator for one file's processing pass.
use tokio::sync::Mutex;

/// Ordered collection of feedback text blocks.
///
/// Reviewer tasks append concurrently, the summarizer atomically replaces
/// the whole collection with its single consolidated entry, and the
/// implementer reads without mutating. The coordinator resets the bus
/// before each file so feedback never leaks across files.
#[derive(Default)]
pub struct FeedbackBus {
    entries: Mutex<Vec<String>>,
}

impl FeedbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, entry: String) {
        self.entries.lock().await.push(entry);
    }

    /// Clear-then-set: after this call exactly one entry remains.
    pub async fn replace_all(&self, entry: String) {
        let mut entries = self.entries.lock().await;
        entries.clear();
        entries.push(entry);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }

    /// Full bus content as one prompt-ready block.
    pub async fn joined(&self) -> String {
        self.entries.lock().await.join("\n\n")
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
