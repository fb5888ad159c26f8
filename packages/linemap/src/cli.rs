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

//! Command line surface. `create` builds the per-file tables from a kernel
//! image, `view` prints one source file against its table.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::annotator;
use crate::disassembler::{DisassemblySource, ListingFile, Objdump, DEFAULT_BINARY, DEFAULT_OBJDUMP};
use crate::map_builder::MapBuilder;
use crate::table_store::TableStore;

#[derive(Parser, Debug)]
#[command(name = "linemap", version, about = "Map kernel addresses to source lines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run objdump over the kernel image and write a .dat table per source file
    Create(CreateArgs),
    /// Print a source file with the first address of each line
    View(ViewArgs),
}

impl Command {
    pub fn debug(&self) -> bool {
        match self {
            Command::Create(args) => args.debug,
            Command::View(args) => args.debug,
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// objdump to run
    #[arg(long = "objdump", default_value = DEFAULT_OBJDUMP)]
    pub objdump: PathBuf,

    /// Kernel image to disassemble
    #[arg(short = 'b', long = "binary", default_value = DEFAULT_BINARY)]
    pub binary: PathBuf,

    /// Read a saved `objdump -dl` listing instead of running objdump
    #[arg(short = 'l', long = "listing", conflicts_with_all = ["objdump", "binary"])]
    pub listing: Option<PathBuf>,

    /// Directory relative source names are resolved against
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    pub debug: bool,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Source file, or its .dat table
    pub file: String,

    /// Directory relative table names are resolved against
    #[arg(short = 't', long = "table-dir", default_value = ".")]
    pub table_dir: PathBuf,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    pub debug: bool,
}

pub fn run_create(args: CreateArgs) -> Result<()> {
    let mut source: Box<dyn DisassemblySource> = match args.listing {
        Some(listing) => Box::new(ListingFile::new(listing)),
        None => Box::new(Objdump::new(args.objdump, args.binary)),
    };

    let mut builder = MapBuilder::new(TableStore::new(args.out_dir));
    let summary = builder.run(source.as_mut())?;
    log::info!("Wrote {} tables", summary.written.len());
    Ok(())
}

pub fn run_view(args: ViewArgs) -> Result<()> {
    let store = TableStore::new(args.table_dir);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    annotator::view(&args.file, &store, &mut out)
}
