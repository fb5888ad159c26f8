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

//! Single pass over `objdump -dl` output.
//!
//! With `-l`, objdump prints the source location that produced a block of
//! instructions right after the instructions' function header, e.g.
//!
//! ```text
//! c0001234 <start_kernel>:
//! start_kernel():
//! /home/build/linux/init/main.c:512
//! c0001234:	94 21 ff e0 	stwu    r1,-32(r1)
//! c0001238:	7c 08 02 a6 	mflr    r0
//! /home/build/linux/init/main.c:518
//! c000123c:	48 00 1f 25 	bl      c0003160 <lock_kernel>
//! ```
//!
//! We only need two kinds of lines: instruction lines, which move the
//! "current address", and source location lines, which attribute the current
//! address to a line of a file. Everything else is noise.

use crate::line_table::TableCollection;
use crate::table_store::TableStore;

/// Lines shorter than this are never interesting.
const MIN_LINE_LEN: usize = 10;
/// Width of the address column in front of the `:\t` marker.
const ADDR_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine<'a> {
    /// An instruction line. `None` when the address column is not hex.
    Address(Option<u64>),
    SourceLocation { file: &'a str, line: u32 },
    Other,
}

/// Classify one line of disassembly. The line terminator must already be
/// stripped.
pub fn classify_line(text: &str) -> StreamLine<'_> {
    let bytes = text.as_bytes();
    if bytes.len() < MIN_LINE_LEN {
        return StreamLine::Other;
    }

    if bytes[ADDR_WIDTH] == b':' && bytes[ADDR_WIDTH + 1] == b'\t' {
        let address = text
            .get(..ADDR_WIDTH)
            .and_then(|field| u64::from_str_radix(field.trim(), 16).ok());
        return StreamLine::Address(address);
    }

    if bytes[0] == b'/' {
        return parse_source_location(text);
    }

    StreamLine::Other
}

fn parse_source_location(text: &str) -> StreamLine<'_> {
    let mut fields = text.trim().split(':');
    let (Some(file), Some(number), None) = (fields.next(), fields.next(), fields.next()) else {
        return StreamLine::Other;
    };

    // Line 0 marks compiler generated code; nothing to attribute.
    match number.trim().parse::<i64>() {
        Ok(n) if n > 0 => match u32::try_from(n) {
            Ok(line) => StreamLine::SourceLocation { file, line },
            Err(_) => StreamLine::Other,
        },
        _ => StreamLine::Other,
    }
}

/// Counters for one pass, reported when the build finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: u64,
    pub addresses: u64,
    pub bad_addresses: u64,
    pub locations: u64,
    pub recorded: u64,
}

pub struct StreamParser {
    current_address: u64,
    stats: ParseStats,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            // Locations before the first instruction get address 0.
            current_address: 0,
            stats: ParseStats::default(),
        }
    }

    pub fn current_address(&self) -> u64 {
        self.current_address
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Feed one line. Source locations are recorded into `tables`, loading a
    /// file's existing table from `store` the first time it shows up.
    pub fn feed<'a>(
        &mut self,
        text: &'a str,
        tables: &mut TableCollection,
        store: &TableStore,
    ) -> StreamLine<'a> {
        self.stats.lines += 1;
        let parsed = classify_line(text);
        match &parsed {
            StreamLine::Address(Some(address)) => {
                self.stats.addresses += 1;
                self.current_address = *address;
            }
            StreamLine::Address(None) => {
                self.stats.bad_addresses += 1;
                log::debug!("Unparsable address line: {:?}", text);
            }
            StreamLine::SourceLocation { file, line } => {
                self.stats.locations += 1;
                if tables
                    .table_for(file, store)
                    .insert_first(*line, self.current_address)
                {
                    self.stats.recorded += 1;
                }
            }
            StreamLine::Other => {}
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_table::LineTable;

    const FILE: &str = "/usr/src/linux/kernel/fork.c";

    fn run(lines: &[&str], store: &TableStore) -> TableCollection {
        let mut tables = TableCollection::new();
        let mut parser = StreamParser::new();
        for line in lines {
            parser.feed(line, &mut tables, store);
        }
        tables
    }

    #[test]
    fn classifies_instruction_lines() {
        assert_eq!(
            classify_line("c0004f10:\t7c 08 02 a6 \tmflr    r0"),
            StreamLine::Address(Some(0xc000_4f10))
        );
        assert_eq!(
            classify_line("    1f10:\t7c 08 02 a6 \tmflr    r0"),
            StreamLine::Address(Some(0x1f10))
        );
        assert_eq!(
            classify_line("c00zz f10:\tjunk"),
            StreamLine::Other,
            "marker must sit at the fixed column"
        );
        assert_eq!(classify_line("c00zzf10:\tjunk"), StreamLine::Address(None));
    }

    #[test]
    fn classifies_source_lines() {
        assert_eq!(
            classify_line("/usr/src/linux/kernel/fork.c:1402"),
            StreamLine::SourceLocation {
                file: FILE,
                line: 1402
            }
        );
        assert_eq!(
            classify_line("/usr/src/linux/kernel/fork.c:1402  \r"),
            StreamLine::SourceLocation {
                file: FILE,
                line: 1402
            }
        );
        assert_eq!(classify_line("/a.c:12"), StreamLine::Other, "too short");
        assert_eq!(classify_line("c0004f10 <do_fork>:"), StreamLine::Other);
        assert_eq!(classify_line("do_fork():"), StreamLine::Other);
        assert_eq!(classify_line(""), StreamLine::Other);
    }

    #[test]
    fn rejects_malformed_locations() {
        for line in [
            "/usr/src/linux/kernel/fork.c",
            "/usr/src/linux/kernel/fork.c:12:7",
            "/usr/src/linux/kernel/fork.c:0",
            "/usr/src/linux/kernel/fork.c:-4",
            "/usr/src/linux/kernel/fork.c:twelve",
            "/usr/src/linux/kernel/fork.c:12 (discriminator 1)",
            "/usr/src/linux/kernel/fork.c:99999999999",
        ] {
            assert_eq!(classify_line(line), StreamLine::Other, "{}", line);
        }
    }

    #[test]
    fn malformed_locations_leave_tables_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let tables = run(
            &[
                "c0000100:\t60 00 00 00 \tnop",
                "/usr/src/linux/kernel/fork.c",
                "/usr/src/linux/kernel/fork.c:1:2",
                "/usr/src/linux/kernel/fork.c:0",
                "/usr/src/linux/kernel/fork.c:abc",
            ],
            &store,
        );
        assert!(tables.is_empty());
    }

    #[test]
    fn first_address_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let tables = run(
            &[
                "c0000100:\t60 00 00 00 \tnop",
                "/usr/src/linux/kernel/fork.c:20",
                "c0000200:\t60 00 00 00 \tnop",
                "/usr/src/linux/kernel/fork.c:20",
                "/usr/src/linux/kernel/fork.c:21",
            ],
            &store,
        );
        let table = tables.get(FILE).unwrap();
        assert_eq!(table.get(20), Some(0xc000_0100));
        assert_eq!(table.get(21), Some(0xc000_0200));
    }

    #[test]
    fn location_before_any_address_uses_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let tables = run(&["/usr/src/linux/kernel/fork.c:7"], &store);
        assert_eq!(tables.get(FILE).unwrap().get(7), Some(0));
    }

    #[test]
    fn bad_address_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let mut tables = TableCollection::new();
        let mut parser = StreamParser::new();
        parser.feed("c0000100:\t60 00 00 00 \tnop", &mut tables, &store);
        parser.feed("c00zz200:\t60 00 00 00 \tnop", &mut tables, &store);
        parser.feed("/usr/src/linux/kernel/fork.c:3", &mut tables, &store);

        assert_eq!(parser.current_address(), 0xc000_0100);
        assert_eq!(tables.get(FILE).unwrap().get(3), Some(0xc000_0100));
        let stats = parser.stats();
        assert_eq!(stats.addresses, 1);
        assert_eq!(stats.bad_addresses, 1);
        assert_eq!(stats.recorded, 1);
    }

    #[test]
    fn prior_table_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fork.c");
        let file = file.to_string_lossy().into_owned();
        let store = TableStore::new(dir.path());
        let prior: LineTable = [(20, 0xc000_0050)].into_iter().collect();
        store.save(&file, &prior).unwrap();

        let address = "c0000100:\t60 00 00 00 \tnop".to_string();
        let loc20 = format!("{}:20", file);
        let loc21 = format!("{}:21", file);
        let tables = run(&[address.as_str(), loc20.as_str(), loc21.as_str()], &store);

        let table = tables.get(&file).unwrap();
        assert_eq!(table.get(20), Some(0xc000_0050));
        assert_eq!(table.get(21), Some(0xc000_0100));
    }
}
