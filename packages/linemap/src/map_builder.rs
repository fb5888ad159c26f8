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

//! Batch driver: one disassembly pass in, one `.dat` blob per source file out.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;

use crate::disasm_stream::{ParseStats, StreamParser};
use crate::disassembler::DisassemblySource;
use crate::line_table::TableCollection;
use crate::table_store::TableStore;

#[derive(Debug)]
pub struct BuildSummary {
    /// Blob written for each source file, in the order they were saved.
    pub written: Vec<PathBuf>,
    pub stats: ParseStats,
}

pub struct MapBuilder {
    store: TableStore,
    tables: TableCollection,
    parser: StreamParser,
}

impl MapBuilder {
    pub fn new(store: TableStore) -> Self {
        Self {
            store,
            tables: TableCollection::new(),
            parser: StreamParser::new(),
        }
    }

    pub fn tables(&self) -> &TableCollection {
        &self.tables
    }

    /// Parse everything `source` produces, then save every table touched.
    /// A failing source aborts the run before anything is written.
    pub fn run(&mut self, source: &mut dyn DisassemblySource) -> Result<BuildSummary> {
        let now = Instant::now();
        {
            let Self {
                store,
                tables,
                parser,
            } = &mut *self;
            source.for_each_line(&mut |line: &str| {
                parser.feed(line, tables, store);
            })?;
        }
        let stats = self.parser.stats();
        log::info!(
            "Parsed {} lines: {} instructions, {} source locations, {} new entries in {} files ({:.2?})",
            stats.lines,
            stats.addresses,
            stats.locations,
            stats.recorded,
            self.tables.len(),
            now.elapsed()
        );
        if stats.bad_addresses > 0 {
            log::warn!("Skipped {} malformed address lines", stats.bad_addresses);
        }

        let written = self.persist()?;
        Ok(BuildSummary { written, stats })
    }

    fn persist(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.tables.len());
        for (file_name, table) in self.tables.iter() {
            log::info!("Saving {} ({} lines)", file_name, table.len());
            self.store
                .save(file_name, table)
                .with_context(|| format!("saving line table for {}", file_name))?;
            written.push(self.store.blob_path(file_name));
        }
        Ok(written)
    }
}
