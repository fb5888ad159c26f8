// Crate root: declare modules and control visibility
pub mod annotator;
pub mod cli;
pub mod disasm_stream;
pub mod disassembler;
pub mod line_table;
pub mod logging;
pub mod map_builder;
pub mod table_store;

// Re-export commonly used API from the library for binaries/tests
pub use disassembler::{DisassemblySource, ListingFile, Objdump};
pub use line_table::{LineTable, TableCollection};
pub use map_builder::MapBuilder;
pub use table_store::{LoadStatus, TableStore, FORMAT_VERSION};
