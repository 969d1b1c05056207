// src/event_log.rs
//
// Discovery and replay of tracking-event logs (JSON Lines, one event
// per line). A malformed line is logged and skipped; it never aborts
// the rest of the file.

use crate::types::TrackingEvent;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn find_event_files(dir: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let event_extensions = ["jsonl", "ndjson"];

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if event_extensions.contains(&ext.to_str().unwrap_or("")) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    info!("Found {} event log files", files.len());
    Ok(files)
}

pub struct EventLogReader<R: BufRead = BufReader<File>> {
    reader: R,
    source: String,
    line_no: u64,
}

impl EventLogReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?;
        Ok(Self {
            reader: BufReader::new(file),
            source: path.display().to_string(),
            line_no: 0,
        })
    }
}

impl<R: BufRead> EventLogReader<R> {
    pub fn from_reader(reader: R, source: &str) -> Self {
        Self {
            reader,
            source: source.to_string(),
            line_no: 0,
        }
    }

    /// Next well-formed event, or None at end of input. Blank lines are
    /// skipped silently, malformed ones with a warning.
    pub fn next_event(&mut self) -> Result<Option<TrackingEvent>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackingEvent>(trimmed) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!(
                    "{}:{}: skipping malformed event: {}",
                    self.source, self.line_no, e
                ),
            }
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &str) -> EventLogReader<Cursor<&str>> {
        EventLogReader::from_reader(Cursor::new(data), "test")
    }

    #[test]
    fn test_reads_events_in_order() {
        let data = concat!(
            "{\"event\":\"entry\",\"tracker_id\":1,\"vehicle_type\":\"car\",\"frame\":10,\"timestamp\":\"2026-08-07T08:00:00Z\"}\n",
            "{\"event\":\"exit\",\"tracker_id\":1,\"frame\":90,\"timestamp\":\"2026-08-07T08:05:00Z\"}\n",
        );
        let mut reader = reader(data);

        assert!(matches!(
            reader.next_event().unwrap(),
            Some(TrackingEvent::Entry { tracker_id: 1, .. })
        ));
        assert!(matches!(
            reader.next_event().unwrap(),
            Some(TrackingEvent::Exit { tracker_id: 1, .. })
        ));
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn test_malformed_line_does_not_abort_replay() {
        let data = concat!(
            "{\"event\":\"entry\",\"tracker_id\":1,\"vehicle_type\":\"car\",\"frame\":10,\"timestamp\":\"2026-08-07T08:00:00Z\"}\n",
            "this is not json\n",
            "{\"event\":\"unknown_kind\",\"tracker_id\":2}\n",
            "\n",
            "{\"event\":\"exit\",\"tracker_id\":1,\"frame\":90,\"timestamp\":\"2026-08-07T08:05:00Z\"}\n",
        );
        let mut reader = reader(data);

        assert!(matches!(
            reader.next_event().unwrap(),
            Some(TrackingEvent::Entry { .. })
        ));
        assert!(matches!(
            reader.next_event().unwrap(),
            Some(TrackingEvent::Exit { .. })
        ));
        assert!(reader.next_event().unwrap().is_none());
        assert_eq!(reader.lines_read(), 5);
    }
}
