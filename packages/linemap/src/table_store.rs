// Copyright (c) 2026 MCU-Debug Authors.
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

//! On-disk line tables, one `<source>.dat` blob per source file.
//!
//! A blob is a small JSON document:
//!
//! ```text
//! { "version": 3, "data": { "118": 3221229612, "119": 3221229620 } }
//! ```
//!
//! Any blob whose version differs from [`FORMAT_VERSION`] is ignored as a
//! whole. Loading never fails; a table we cannot read is simply unknown.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::line_table::LineTable;

/// Bump whenever the blob layout changes.
pub const FORMAT_VERSION: u32 = 3;

pub const BLOB_SUFFIX: &str = ".dat";

#[derive(Serialize, Deserialize)]
struct TableBlob {
    version: u32,
    data: LineTable,
}

/// Only the version is decoded first so a foreign layout is reported as a
/// version mismatch rather than as garbage.
#[derive(Deserialize)]
struct BlobHeader {
    version: u32,
}

/// What `load_with_status` found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { entries: usize },
    NotFound,
    VersionMismatch { found: u32 },
    Invalid { reason: String },
}

pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Blobs are resolved against `root`. Absolute source paths ignore it
    /// and put the blob next to the source file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn blob_path(&self, file_name: &str) -> PathBuf {
        self.root.join(format!("{}{}", file_name, BLOB_SUFFIX))
    }

    pub fn load(&self, file_name: &str) -> LineTable {
        self.load_with_status(file_name).0
    }

    pub fn load_with_status(&self, file_name: &str) -> (LineTable, LoadStatus) {
        let path = self.blob_path(file_name);
        let (table, status) = read_blob(&path);
        match &status {
            LoadStatus::Loaded { entries } => {
                log::debug!("Loaded {} entries from {}", entries, path.display())
            }
            LoadStatus::NotFound => log::debug!("No table at {}", path.display()),
            LoadStatus::VersionMismatch { found } => log::warn!(
                "Ignoring {}: format version {} (expected {})",
                path.display(),
                found,
                FORMAT_VERSION
            ),
            LoadStatus::Invalid { reason } => {
                log::warn!("Ignoring unreadable table {}: {}", path.display(), reason)
            }
        }
        (table, status)
    }

    pub fn save(&self, file_name: &str, table: &LineTable) -> Result<()> {
        let path = self.blob_path(file_name);
        let blob = TableBlob {
            version: FORMAT_VERSION,
            data: table.clone(),
        };
        let body = serde_json::to_vec(&blob)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        log::debug!("Saved {} entries to {}", table.len(), path.display());
        Ok(())
    }
}

fn read_blob(path: &Path) -> (LineTable, LoadStatus) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return (LineTable::new(), LoadStatus::NotFound),
        Err(e) => {
            return (
                LineTable::new(),
                LoadStatus::Invalid {
                    reason: e.to_string(),
                },
            )
        }
    };

    match serde_json::from_slice::<BlobHeader>(&bytes) {
        Ok(header) if header.version != FORMAT_VERSION => {
            return (
                LineTable::new(),
                LoadStatus::VersionMismatch {
                    found: header.version,
                },
            )
        }
        Ok(_) => {}
        Err(e) => {
            return (
                LineTable::new(),
                LoadStatus::Invalid {
                    reason: e.to_string(),
                },
            )
        }
    }

    match serde_json::from_slice::<TableBlob>(&bytes) {
        Ok(blob) => {
            let entries = blob.data.len();
            (blob.data, LoadStatus::Loaded { entries })
        }
        Err(e) => (
            LineTable::new(),
            LoadStatus::Invalid {
                reason: e.to_string(),
            },
        ),
    }
}
