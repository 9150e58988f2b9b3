//! Decoded values and summary records produced while walking a dump header.

use std::fmt;

use jiff::Timestamp;
use log::Level;
use serde::Serialize;

use crate::codec::hex_to_u64;

/// A single field visit: where it was read from and how it renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedField {
    pub name: &'static str,
    pub offset: u64,
    pub size: usize,
    pub hex: String,
    pub ascii: String,
    pub contains_printable: bool,
    /// The bytes were consumed as opaque padding.
    pub skipped: bool,
}

impl DecodedField {
    /// The field as an unsigned integer, for fields of at most 8 bytes.
    ///
    /// `None` when the rendering was capped below the field width.
    pub fn value(&self) -> Option<u64> {
        if self.size > 8 || self.hex.len() < 2 * self.size {
            return None;
        }
        hex_to_u64(&self.hex)
    }
}

impl fmt::Display for DecodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "0x{:x}: Skip {} bytes", self.offset, self.size);
        }

        write!(f, "0x{:x}:{} = {}", self.offset, self.name, self.hex)?;
        if self.contains_printable {
            write!(f, " ({})", self.ascii)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DumpVariant {
    Header32,
    Header64,
}

impl DumpVariant {
    pub fn bitness(self) -> u32 {
        match self {
            DumpVariant::Header32 => 32,
            DumpVariant::Header64 => 64,
        }
    }

    pub fn pointer_size(self) -> usize {
        match self {
            DumpVariant::Header32 => 4,
            DumpVariant::Header64 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugCheck {
    pub code: u32,
    pub parameters: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExceptionSummary {
    pub code: u32,
    pub flags: u32,
    pub address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhysicalMemoryRun {
    pub base_page: u64,
    pub page_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhysicalMemoryInfo {
    pub present: bool,
    pub number_of_runs: Option<u64>,
    pub number_of_pages: Option<u64>,
    pub runs: Vec<PhysicalMemoryRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringTableEntry {
    pub offset: u64,
    /// Length in UTF-16 code units, excluding the terminator.
    pub length: u32,
    pub text: String,
    pub ascii: String,
}

/// Why the string table scan stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StringTableStop {
    /// A zero length, the regular end of the table.
    EndOfTable,
    LengthTooLarge { length: u64 },
    MissingTerminator { found: String },
}

impl StringTableStop {
    pub fn is_malformed(&self) -> bool {
        !matches!(self, StringTableStop::EndOfTable)
    }
}

/// Summary-level happenings during a parse, reported alongside the field trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DumpEvent {
    BadSignature { found: String },
    Variant(DumpVariant),
    BugCheck(BugCheck),
    PhysicalMemorySkipped { offset: u64, size: usize },
    PhysicalMemoryAbsent,
    PhysicalMemoryRunsTruncated { declared: u64, capacity: usize },
    Exception(ExceptionSummary),
    SystemTime(Timestamp),
    StringsOffset { offset: u64 },
    StringEntry(StringTableEntry),
    StringTableEnd { offset: u64, reason: StringTableStop },
}

impl DumpEvent {
    /// The level the reporting tool logs this event at.
    pub fn level(&self) -> Level {
        match self {
            DumpEvent::BadSignature { .. } => Level::Error,
            DumpEvent::PhysicalMemorySkipped { .. }
            | DumpEvent::PhysicalMemoryRunsTruncated { .. } => Level::Warn,
            DumpEvent::StringTableEnd { reason, .. } if reason.is_malformed() => Level::Warn,
            DumpEvent::StringEntry(_)
            | DumpEvent::StringsOffset { .. }
            | DumpEvent::StringTableEnd { .. } => Level::Debug,
            _ => Level::Info,
        }
    }
}

impl fmt::Display for DumpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpEvent::BadSignature { found } => write!(
                f,
                "Failed to parse header - no signature. {found} instead of expected PAGE"
            ),
            DumpEvent::Variant(variant) => write!(f, "{}bits dump", variant.bitness()),
            DumpEvent::BugCheck(bug_check) => {
                write!(f, "BugCheck: code=0x{:x}, parameters=[", bug_check.code)?;
                for (i, p) in bug_check.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "0x{p:x}")?;
                }
                f.write_str("]")
            }
            DumpEvent::PhysicalMemorySkipped { offset, size } => write!(
                f,
                "0x{offset:x}: Skip physical memory descriptors {size} bytes"
            ),
            DumpEvent::PhysicalMemoryAbsent => {
                f.write_str("No physical memory presents in the dump file")
            }
            DumpEvent::PhysicalMemoryRunsTruncated { declared, capacity } => write!(
                f,
                "NumberOfRuns is {declared}, only {capacity} runs fit in the descriptor"
            ),
            DumpEvent::Exception(e) => write!(
                f,
                "Exception: code=0x{:x}, address=0x{:x}, flags=0x{:x}",
                e.code, e.address, e.flags
            ),
            DumpEvent::SystemTime(ts) => write!(f, "SystemTime: {ts}"),
            DumpEvent::StringsOffset { offset } => {
                write!(f, "Loaded modules names at offset 0x{offset:x}")
            }
            DumpEvent::StringEntry(entry) => write!(
                f,
                "0x{:x}: length={},'{}'",
                entry.offset, entry.length, entry.text
            ),
            DumpEvent::StringTableEnd { offset, reason } => match reason {
                StringTableStop::EndOfTable => write!(f, "0x{offset:x}: Length is zero"),
                StringTableStop::LengthTooLarge { length } => {
                    write!(f, "0x{offset:x}: Length is {length}, string table is malformed")
                }
                StringTableStop::MissingTerminator { found } => write!(
                    f,
                    "0x{offset:x}: Missing zero termination - got {found} instead"
                ),
            },
        }
    }
}

/// Everything decoded from one dump, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpReport {
    pub variant: DumpVariant,
    pub fields: Vec<DecodedField>,
    pub bug_check: Option<BugCheck>,
    pub physical_memory: PhysicalMemoryInfo,
    pub exception: Option<ExceptionSummary>,
    pub system_time: Option<Timestamp>,
    pub strings_offset: Option<u64>,
    pub strings: Vec<StringTableEntry>,
    pub string_table_end: Option<StringTableStop>,
}

impl DumpReport {
    pub(crate) fn new(variant: DumpVariant) -> Self {
        DumpReport {
            variant,
            fields: Vec::new(),
            bug_check: None,
            physical_memory: PhysicalMemoryInfo::default(),
            exception: None,
            system_time: None,
            strings_offset: None,
            strings: Vec::new(),
            string_table_end: None,
        }
    }

    /// First decoded field with the given name.
    pub fn field(&self, name: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
