//! Event Logger - persists pot events to JSONL files
//!
//! The EventLogger drains a bus subscription and writes every event to
//! `{runs_dir}/{run_id}/events.jsonl` for later replay and auditing.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use eyre::Context;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::types::{EventLogEntry, PotEvent};

/// Name of the per-run log file
pub const EVENTS_FILE: &str = "events.jsonl";

/// Event logger that writes one run's events to a JSONL file
pub struct EventLogger {
    run_dir: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl EventLogger {
    /// Create a logger for `run_id` under `runs_dir`
    ///
    /// The directory and file are created on the first event.
    pub fn new(runs_dir: impl AsRef<Path>, run_id: &str) -> Self {
        let run_dir = runs_dir.as_ref().join(run_id);
        debug!(?run_dir, "EventLogger::new: creating logger");
        Self {
            run_dir,
            writer: None,
            written: 0,
        }
    }

    /// Path of the log file this logger writes
    pub fn log_path(&self) -> PathBuf {
        self.run_dir.join(EVENTS_FILE)
    }

    /// Number of events written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one event to the log file
    pub fn write_event(&mut self, event: &PotEvent) -> eyre::Result<()> {
        debug!(seq = event.seq, event_type = event.event_type(), "EventLogger::write_event");

        if self.writer.is_none() {
            fs::create_dir_all(&self.run_dir).context("Failed to create run directory")?;
            let log_path = self.log_path();
            debug!(?log_path, "EventLogger: creating new log file");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .context("Failed to open event log")?;
            self.writer = Some(BufWriter::new(file));
        }

        if let Some(writer) = self.writer.as_mut() {
            let entry = EventLogEntry::new(event.clone());
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
            self.written += 1;
        }

        Ok(())
    }

    /// Flush buffered lines to disk
    pub fn flush(&mut self) -> eyre::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Drain the subscription until every sender is gone
    ///
    /// Meant to be spawned as a background task. Returns the number of
    /// events written.
    pub async fn run(mut self, mut rx: broadcast::Receiver<PotEvent>) -> usize {
        debug!(run_dir = ?self.run_dir, "EventLogger::run: starting event logger");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(seq = event.seq, error = %e, "EventLogger: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        if let Err(e) = self.flush() {
            error!(error = %e, "EventLogger: failed to flush on shutdown");
        }
        self.written
    }
}

/// Spawn the event logger as a background task
pub fn spawn_event_logger(
    rx: broadcast::Receiver<PotEvent>,
    runs_dir: impl AsRef<Path>,
    run_id: &str,
) -> tokio::task::JoinHandle<usize> {
    let logger = EventLogger::new(runs_dir, run_id);
    tokio::spawn(logger.run(rx))
}

/// Read the events of one run, in file order
pub fn read_run_events(runs_dir: impl AsRef<Path>, run_id: &str) -> eyre::Result<Vec<EventLogEntry>> {
    let log_path = runs_dir.as_ref().join(run_id).join(EVENTS_FILE);
    debug!(?log_path, "read_run_events: reading log file");

    if !log_path.exists() {
        return Err(eyre::eyre!("No event log for run {} at {}", run_id, log_path.display()));
    }

    let content = fs::read_to_string(&log_path).context("Failed to read event log")?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_run_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_run_events: loaded entries");
    Ok(entries)
}

/// List run ids that have an event log, oldest first
///
/// Run ids are UUID v7, so lexical order is creation order.
pub fn list_runs(runs_dir: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let runs_dir = runs_dir.as_ref();
    debug!(?runs_dir, "list_runs: called");

    if !runs_dir.exists() {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(runs_dir).context("Failed to read runs directory")? {
        let entry = entry?;
        if entry.path().join(EVENTS_FILE).exists() {
            runs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    runs.sort();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventKind;
    use tempfile::tempdir;

    fn bite(seq: u64, savage: usize, servings: usize) -> PotEvent {
        PotEvent {
            seq,
            kind: EventKind::Bite,
            savage: Some(savage),
            servings,
            round: None,
            generation: 0,
        }
    }

    #[test]
    fn test_logger_creates_file_lazily() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path(), "run-1");
        assert!(!logger.log_path().exists());

        logger.write_event(&bite(0, 1, 4)).unwrap();
        logger.flush().unwrap();

        assert!(logger.log_path().exists());
        assert_eq!(logger.written(), 1);
    }

    #[test]
    fn test_write_and_read_back() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path(), "run-2");

        logger.write_event(&bite(0, 1, 4)).unwrap();
        logger.write_event(&bite(1, 2, 3)).unwrap();
        logger.write_event(&bite(2, 3, 2)).unwrap();
        logger.flush().unwrap();

        let entries = read_run_events(temp.path(), "run-2").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].event.savage, Some(3));
        assert_eq!(entries[2].event.servings, 2);
    }

    #[test]
    fn test_read_skips_garbage_lines() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path(), "run-3");
        logger.write_event(&bite(0, 1, 4)).unwrap();
        logger.flush().unwrap();

        let mut file = OpenOptions::new().append(true).open(logger.log_path()).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();

        let entries = read_run_events(temp.path(), "run-3").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_missing_run() {
        let temp = tempdir().unwrap();
        assert!(read_run_events(temp.path(), "nope").is_err());
    }

    #[test]
    fn test_list_runs() {
        let temp = tempdir().unwrap();
        assert!(list_runs(temp.path().join("missing")).unwrap().is_empty());

        for run_id in ["b-run", "a-run"] {
            let mut logger = EventLogger::new(temp.path(), run_id);
            logger.write_event(&bite(0, 1, 0)).unwrap();
            logger.flush().unwrap();
        }
        fs::create_dir_all(temp.path().join("empty-dir")).unwrap();

        assert_eq!(list_runs(temp.path()).unwrap(), vec!["a-run", "b-run"]);
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        let temp = tempdir().unwrap();
        let (tx, rx) = broadcast::channel(16);
        let handle = spawn_event_logger(rx, temp.path(), "run-4");

        tx.send(bite(0, 1, 4)).unwrap();
        tx.send(bite(1, 2, 3)).unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(read_run_events(temp.path(), "run-4").unwrap().len(), 2);
    }
}
