// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Local CSV sink

use crate::buffer::Reading;
use chrono::Local;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Append-only CSV record of a session, flushed after every row
pub struct LocalSink {
    path: PathBuf,
    file: Option<fs::File>,
    rows: usize,
    /// Length of the file up to the end of the last complete row
    committed: u64,
}

impl LocalSink {
    /// Create `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.csv` and write the header row.
    ///
    /// A numeric suffix is appended when a file with that name already exists.
    pub async fn create(dir: &Path, prefix: &str, value_field: &str) -> io::Result<Self> {
        if !fs::try_exists(dir).await? {
            info!("Creating output directory: {}", dir.display());
            fs::create_dir_all(dir).await?;
        }

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut attempt = 0u32;
        let (path, file) = loop {
            let name = if attempt == 0 {
                format!("{}_{}.csv", prefix, stamp)
            } else {
                format!("{}_{}_{}.csv", prefix, stamp, attempt)
            };
            let path = dir.join(name);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        };

        let mut sink = Self {
            path,
            file: Some(file),
            rows: 0,
            committed: 0,
        };
        sink.write_line(&format!("time_sec,{}\n", value_field)).await?;

        info!("Recording to {}", sink.path.display());
        Ok(sink)
    }

    /// Append one reading and flush it to the OS
    ///
    /// A failed write leaves no partial row behind: the file is cut back to
    /// the last complete row before the error is returned.
    pub async fn append(&mut self, reading: &Reading) -> io::Result<()> {
        let row = format!("{},{}\n", reading.elapsed_seconds, reading.value);
        self.write_line(&row).await?;
        self.rows += 1;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        let result = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.committed += line.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.discard_partial_row().await {
                    warn!(
                        "Failed to roll back partial row in {}: {}",
                        self.path.display(),
                        rollback
                    );
                }
                Err(e)
            }
        }
    }

    /// Truncate anything written past the last complete row
    async fn discard_partial_row(&mut self) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        file.set_len(self.committed).await?;
        file.seek(SeekFrom::Start(self.committed)).await?;
        Ok(())
    }

    /// Flush and release the file handle. Safe to call more than once.
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            debug!("Closed {} after {} rows", self.path.display(), self.rows);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "record file is closed")
}
