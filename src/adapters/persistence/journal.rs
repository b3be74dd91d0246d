//! Run Journal - Append-only JSONL Run Records
//!
//! Persists one record per workflow run to daily JSONL files in the
//! format `runs/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON
//! record, so a crash mid-write loses at most the last line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::ports::journal::{RunJournal, RunRecord};

/// Append-only JSONL run journal with daily file rotation.
pub struct JsonlRunJournal {
    runs_dir: PathBuf,
}

impl JsonlRunJournal {
    /// Create the journal under `data_dir/runs`.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let runs_dir = Path::new(data_dir).join("runs");

        fs::create_dir_all(&runs_dir)
            .await
            .context("Failed to create runs directory")?;

        Ok(Self { runs_dir })
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }
}

#[async_trait]
impl RunJournal for JsonlRunJournal {
    #[instrument(skip(self, record), fields(run_id = %record.run_id, outcome = %record.outcome))]
    async fn append(&self, record: &RunRecord) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.runs_dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(record).context("Failed to serialize run record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open run journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write run record")?;
        file.flush().await.context("Failed to flush run journal")?;

        debug!(file = %path.display(), "Run record appended");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<RunRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.runs_dir)
            .await
            .context("Failed to list runs directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<RunRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping malformed run record");
                    }
                }
            }
        }

        // Stable sort keeps file order for equal timestamps
        records.sort_by_key(|r| r.timestamp_ms);
        Ok(records)
    }
}
