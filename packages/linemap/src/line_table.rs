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

use std::collections::{btree_map, BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::table_store::TableStore;

/// Per-file map of source line number to the first address seen for it.
///
/// Entries are only ever added. A second observation of the same line is
/// dropped, so the recorded address is always the earliest one emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineTable {
    entries: BTreeMap<u32, u64>,
}

impl LineTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record `address` for `line` unless the line already has one.
    /// Returns true when a new entry was added.
    pub fn insert_first(&mut self, line: u32, address: u64) -> bool {
        match self.entries.entry(line) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(address);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, line: u32) -> Option<u64> {
        self.entries.get(&line).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending line order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.entries.iter().map(|(&line, &addr)| (line, addr))
    }
}

impl FromIterator<(u32, u64)> for LineTable {
    fn from_iter<I: IntoIterator<Item = (u32, u64)>>(iter: I) -> Self {
        let mut table = LineTable::new();
        for (line, addr) in iter {
            table.insert_first(line, addr);
        }
        table
    }
}

/// All line tables touched during one pass over a disassembly, keyed by the
/// source path exactly as the disassembler printed it.
#[derive(Debug, Default)]
pub struct TableCollection {
    tables: HashMap<String, LineTable>,
}

impl TableCollection {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Table for `file_name`, seeded from `store` the first time the file is
    /// seen so earlier runs keep precedence over this one.
    pub fn table_for(&mut self, file_name: &str, store: &TableStore) -> &mut LineTable {
        self.tables
            .entry(file_name.to_string())
            .or_insert_with(|| {
                log::info!("New source file: {}", file_name);
                store.load(file_name)
            })
    }

    pub fn get(&self, file_name: &str) -> Option<&LineTable> {
        self.tables.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LineTable)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut table = LineTable::new();
        assert!(table.insert_first(42, 0xc000_1000));
        assert!(!table.insert_first(42, 0xc000_0800));
        assert_eq!(table.get(42), Some(0xc000_1000));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn iterates_in_line_order() {
        let table: LineTable = [(30, 3), (10, 1), (20, 2), (10, 9)].into_iter().collect();
        let lines: Vec<_> = table.iter().collect();
        assert_eq!(lines, vec![(10, 1), (20, 2), (30, 3)]);
    }

    #[test]
    fn collection_seeds_from_store_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let seeded: LineTable = [(5, 0x100)].into_iter().collect();
        store.save("seeded.c", &seeded).unwrap();

        let mut tables = TableCollection::new();
        tables.table_for("seeded.c", &store).insert_first(6, 0x200);
        // A later save must not be picked up again mid-pass.
        store.save("seeded.c", &LineTable::new()).unwrap();
        let table = tables.table_for("seeded.c", &store);
        assert_eq!(table.get(5), Some(0x100));
        assert_eq!(table.get(6), Some(0x200));
        assert_eq!(tables.len(), 1);
    }
}
