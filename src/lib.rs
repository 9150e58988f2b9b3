#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use dump_parser::{DumpParser, ParserSettings};
pub use err::{DumpError, DumpResult};
pub use model::{
    BugCheck, DecodedField, DumpEvent, DumpReport, DumpVariant, ExceptionSummary,
    PhysicalMemoryInfo, PhysicalMemoryRun, StringTableEntry, StringTableStop,
};
pub use sink::{DiagnosticsSink, LogSink, NullSink, Recorded, RecordingSink};
pub use utils::ReadSeek;
pub use walker::{StructWalker, walk};

pub mod codec;
pub mod dump_parser;
pub mod err;
mod exception;
mod header;
pub mod layout;
pub mod model;
mod physical_memory;
pub mod sink;
mod string_table;
mod utils;
pub mod walker;
