//! File-backed location store in JSONL format (one sample per line)
//!
//! Appends are written and fsynced before `append` returns, so a sample that
//! reported success survives a process crash. Reads are served from an
//! in-memory index rebuilt by replaying the log on open.

use crate::domain::types::{PositionSample, VehicleId};
use crate::io::store::{LocationStore, StorageError, VehicleLogs};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

pub struct JsonlStore {
    writer: Mutex<File>,
    index: RwLock<VehicleLogs>,
    path: String,
}

impl JsonlStore {
    /// Open the store, creating the file if needed and replaying any
    /// existing log into the read index. Corrupt lines (for example from a
    /// crash mid-write) are skipped with a warning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut index = VehicleLogs::default();
        let mut replayed = 0usize;
        let mut skipped = 0usize;

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PositionSample>(&line) {
                    Ok(sample) => {
                        index.insert(sample);
                        replayed += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "jsonl_store_skipped_line");
                        skipped += 1;
                    }
                }
            }
        }

        let writer = OpenOptions::new().create(true).append(true).open(path)?;

        info!(
            path = %path.display(),
            replayed = %replayed,
            skipped = %skipped,
            "jsonl_store_opened"
        );

        Ok(Self {
            writer: Mutex::new(writer),
            index: RwLock::new(index),
            path: path.display().to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl LocationStore for JsonlStore {
    async fn append(&self, sample: &PositionSample) -> Result<(), StorageError> {
        let line = serde_json::to_string(sample)?;

        {
            let mut file = self.writer.lock();
            writeln!(file, "{}", line)?;
            file.sync_data()?;
        }

        // Only index after the write is durable; a failed append must not
        // become visible to reads
        self.index.write().insert(sample.clone());
        Ok(())
    }

    async fn latest(&self, vehicle: &VehicleId) -> Result<Option<PositionSample>, StorageError> {
        Ok(self.index.read().latest(vehicle))
    }

    async fn range(
        &self,
        vehicle: &VehicleId,
        start: i64,
        end: i64,
    ) -> Result<Vec<PositionSample>, StorageError> {
        Ok(self.index.read().range(vehicle, start, end))
    }
}
