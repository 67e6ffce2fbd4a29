//! Destinations for collected game-log entries.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use peril_protocol::GameLog;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::PerilError;

/// Where the server's log collector writes entries.
///
/// An `Err` makes the collector requeue the delivery, so an implementation
/// must tolerate seeing the same entry again after a failure.
pub trait LogSink: Send + Sync + 'static {
    fn append(&self, entry: &GameLog) -> impl Future<Output = Result<(), PerilError>> + Send;
}

/// Appends one line per entry to a text file, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    async fn append(&self, entry: &GameLog) -> Result<(), PerilError> {
        let line = format!("{entry}\n");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(PerilError::Sink)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(PerilError::Sink)?;
        file.flush().await.map_err(PerilError::Sink)?;
        tracing::debug!(path = %self.path.display(), username = %entry.username, "log entry written");
        Ok(())
    }
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    entries: Arc<Mutex<Vec<GameLog>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every entry appended so far, in arrival order.
    pub fn entries(&self) -> Vec<GameLog> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemoryLogSink {
    async fn append(&self, entry: &GameLog) -> Result<(), PerilError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        let shared = sink.clone();
        sink.append(&GameLog::new("alice", "first")).await.unwrap();
        sink.append(&GameLog::new("bob", "second")).await.unwrap();

        let messages: Vec<String> = shared.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_file_sink_appends_lines() {
        let path = std::env::temp_dir().join(format!("peril-sink-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let sink = FileLogSink::new(&path);

        sink.append(&GameLog::new("alice", "alice won a war against bob"))
            .await
            .unwrap();
        sink.append(&GameLog::new("bob", "hello")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("alice: alice won a war against bob"));
        assert!(lines[1].ends_with("bob: hello"));
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_sink_reports_io_error() {
        let dir = std::env::temp_dir();
        let sink = FileLogSink::new(&dir);
        let err = sink.append(&GameLog::new("alice", "x")).await.unwrap_err();
        assert!(matches!(err, PerilError::Sink(_)));
    }
}
