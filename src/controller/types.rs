use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::data_capture::types::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionStatus {
    /// Every worker joined cleanly and every captured frame is accounted for
    Completed,
    /// A worker failed or the accounting does not balance
    Incomplete,
}

/// Final counts of one capture run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub run_id: Uuid,
    pub interface: String,
    pub started_at: DateTime<Utc>,
    pub captured: u64,
    pub replayed: u64,
    pub backed_up: u64,
    pub dropped: u64,
    pub read_errors: u64,
    pub replay_attempts: u64,
    /// Time from start until the capture loop returned
    pub capture_duration: Duration,
    /// Time from start until every worker was joined, drain included
    pub elapsed: Duration,
    pub status: CompletionStatus,
}

impl SummaryReport {
    /// `replayed + backed_up + dropped == captured`
    pub fn is_balanced(&self) -> bool {
        self.replayed + self.backed_up + self.dropped == self.captured
    }

    /// Captured frames that reached no terminal state, for instance after the router failed.
    pub fn unrouted(&self) -> u64 {
        self.captured
            .saturating_sub(self.replayed + self.backed_up + self.dropped)
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SYSTEM SUMMARY ===")?;
        writeln!(f, "Run: {} on {}", self.run_id, self.interface)?;
        writeln!(f, "Total Captured Frames: {}", self.captured)?;
        writeln!(f, "Replayed Frames: {}", self.replayed)?;
        writeln!(f, "Backup Frames: {}", self.backed_up)?;
        writeln!(f, "Dropped Frames: {}", self.dropped)?;
        writeln!(f, "Read Errors: {}", self.read_errors)?;
        writeln!(
            f,
            "Capture Duration: {:.2}s",
            self.capture_duration.as_secs_f64()
        )?;
        writeln!(f, "Elapsed: {:.2}s", self.elapsed.as_secs_f64())?;
        match self.status {
            CompletionStatus::Completed => write!(f, "All modules executed successfully."),
            CompletionStatus::Incomplete => write!(f, "Run incomplete, see log for details."),
        }
    }
}

/// A finished run: the report plus the frames held by the two terminal queues.
#[derive(Debug)]
pub struct PipelineRun {
    pub report: SummaryReport,
    pub replayed: Vec<Frame>,
    pub backed_up: Vec<Frame>,
}

impl PipelineRun {
    pub fn replayed_ids(&self) -> Vec<u64> {
        self.replayed.iter().map(Frame::id).collect()
    }

    pub fn backed_up_ids(&self) -> Vec<u64> {
        self.backed_up.iter().map(Frame::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report() -> SummaryReport {
        SummaryReport {
            run_id: Uuid::new_v4(),
            interface: "eth0".to_string(),
            started_at: Utc::now(),
            captured: 10,
            replayed: 6,
            backed_up: 3,
            dropped: 1,
            read_errors: 0,
            replay_attempts: 15,
            capture_duration: Duration::from_secs(60),
            elapsed: Duration::from_millis(60_250),
            status: CompletionStatus::Completed,
        }
    }

    #[test]
    fn test_balanced() {
        let mut report = report();
        assert!(report.is_balanced());

        report.dropped = 0;
        assert!(!report.is_balanced());
        assert_eq!(report.unrouted(), 1);
    }

    #[test]
    fn test_display_block() {
        let text = report().to_string();

        assert!(text.starts_with("=== SYSTEM SUMMARY ==="));
        assert!(text.contains("Total Captured Frames: 10"));
        assert!(text.contains("Replayed Frames: 6"));
        assert!(text.contains("Backup Frames: 3"));
        assert!(text.contains("Capture Duration: 60.00s"));
        assert!(text.ends_with("All modules executed successfully."));
    }

    #[test]
    fn test_write_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        report().write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["captured"], 10);
        assert_eq!(value["status"], "Completed");
        assert_eq!(value["interface"], "eth0");
    }
}
