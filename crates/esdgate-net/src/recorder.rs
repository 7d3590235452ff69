//! Test result reporting with local durable fallback.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use esdgate_core::types::TestRecord;
use tracing::{error, info, warn};

use crate::backend::StationBackend;

/// Reports each completed test exactly once.
///
/// The flow per record:
/// 1. an audit line goes to the `esdgate::audit` log target,
///    unconditionally, before any network attempt;
/// 2. the record is posted to the backend, bounded by the per-request
///    timeout;
/// 3. on any failure of step 2 the record is appended, comma-joined, to
///    the durable fallback file.
///
/// No retries are scheduled; the fallback file is the record of record
/// when the backend was unreachable. The recorder is the single writer of
/// that file.
pub struct ResultRecorder<B> {
    backend: Arc<B>,
    fallback_path: PathBuf,
}

impl<B: StationBackend> ResultRecorder<B> {
    pub fn new(backend: Arc<B>, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            fallback_path: fallback_path.into(),
        }
    }

    /// Record one completed test.
    pub async fn save(&self, record: &TestRecord) {
        info!(
            target: "esdgate::audit",
            username = %record.username,
            fullname = %record.fullname,
            test_type = %record.test_type,
            duration = record.duration,
            outcome = %record.outcome,
            station = %record.station_id,
            "esd test result"
        );

        if let Err(error) = self.backend.save_result(record).await {
            warn!(%error, "remote save failed; appending to fallback log");
            if let Err(error) = append_line(&self.fallback_path, &record.fallback_line()) {
                error!(
                    %error,
                    path = %self.fallback_path.display(),
                    "failed to append fallback record"
                );
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> esdgate_core::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use esdgate_core::types::{TestOutcome, TestType};

    fn record() -> TestRecord {
        TestRecord {
            username: "alice".to_string(),
            fullname: "Alice Nguyen".to_string(),
            test_type: TestType::Barcode,
            duration: 2.31,
            outcome: TestOutcome::Passed,
            station_id: "ESD-01".to_string(),
        }
    }

    #[tokio::test]
    async fn failing_backend_produces_exactly_one_fallback_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");

        let backend = Arc::new(MockBackend::new());
        backend.set_save_failing(true);
        let recorder = ResultRecorder::new(Arc::clone(&backend), &path);

        let record = record();
        recorder.save(&record).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{}\n", record.fallback_line()));
        assert_eq!(backend.save_calls(), 1);
    }

    #[tokio::test]
    async fn successful_save_writes_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");

        let backend = Arc::new(MockBackend::new());
        let recorder = ResultRecorder::new(Arc::clone(&backend), &path);

        recorder.save(&record()).await;

        assert!(!path.exists());
        assert_eq!(backend.saved_records().await, vec![record()]);
    }

    #[tokio::test]
    async fn fallback_lines_accumulate_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.txt");

        let backend = Arc::new(MockBackend::new());
        backend.set_save_failing(true);
        let recorder = ResultRecorder::new(Arc::clone(&backend), &path);

        let first = record();
        let mut second = record();
        second.username = "bob".to_string();
        second.outcome = TestOutcome::Failed;

        recorder.save(&first).await;
        recorder.save(&second).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], first.fallback_line());
        assert_eq!(lines[1], second.fallback_line());
    }
}
