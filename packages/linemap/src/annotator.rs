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

//! Source viewer: prints a source file with the first address of every line
//! that has one.
//!
//! ```text
//! /* c0001234 */  asmlinkage void __init start_kernel(void)
//!                 {
//!                         char * command_line;
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::line_table::LineTable;
use crate::table_store::{TableStore, BLOB_SUFFIX};

/// Width of the address column, including padding.
pub const ANNOTATION_WIDTH: usize = 16;

pub const USAGE: &str = "Please provide a source file name.";

/// The requested source file cannot be used. Reported with the usage text.
#[derive(Debug)]
pub struct UsageError {
    pub path: PathBuf,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a file", self.path.display())
    }
}

impl std::error::Error for UsageError {}

/// Accept either the source path or its blob path.
pub fn resolve_target(arg: &str) -> &str {
    arg.strip_suffix(BLOB_SUFFIX).unwrap_or(arg)
}

pub fn format_annotation(address: Option<u64>) -> String {
    let tag = match address {
        Some(address) => format!("/* {:08x} */", address),
        None => String::new(),
    };
    format!("{:<width$}", tag, width = ANNOTATION_WIDTH)
}

/// Copy `source` to `out`, one output line per input line, each prefixed by
/// its annotation. Line endings are normalized to `\n`; every other byte of
/// the line is copied through untouched, whatever its encoding.
pub fn annotate<R: BufRead, W: Write>(mut reader: R, table: &LineTable, out: &mut W) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    let mut number: u32 = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        number += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        write!(out, "{}", format_annotation(table.get(number)))?;
        out.write_all(&buf)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Resolve `arg`, load its table and print the annotated source to `out`.
/// A missing table only means no annotations; a missing source file is a
/// [`UsageError`].
pub fn view<W: Write>(arg: &str, store: &TableStore, out: &mut W) -> Result<()> {
    let file_name = resolve_target(arg);
    let path = Path::new(file_name);
    if !path.is_file() {
        return Err(UsageError {
            path: path.to_path_buf(),
        }
        .into());
    }

    let (table, status) = store.load_with_status(file_name);
    log::debug!("Table for {}: {:?}", file_name, status);

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    annotate(BufReader::new(file), &table, out)
        .with_context(|| format!("annotating {}", path.display()))
}
