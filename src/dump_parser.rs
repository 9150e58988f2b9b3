use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use log::{debug, trace};

use crate::codec::{DEFAULT_MAX_RENDER_LEN, render_ascii};
use crate::err::{DumpError, DumpResult};
use crate::header::{parse_header32, parse_header64};
use crate::layout::{DUMP_SIGNATURE, HEADER32, VALID_DUMP_32, VALID_DUMP_64};
use crate::model::{DumpEvent, DumpReport, DumpVariant};
use crate::sink::DiagnosticsSink;
use crate::utils::{ReadExt, ReadSeek};
use crate::walker::StructWalker;

pub const DEFAULT_MAX_STRING_LENGTH: u64 = 256;
pub const DEFAULT_STRING_MAX_RENDER_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Bytes of each field rendered as hex / ASCII.
    pub(crate) max_render_len: usize,
    /// Bytes of each string table body rendered as ASCII.
    pub(crate) string_max_render_len: usize,
    /// Longest string table entry (UTF-16 units) accepted before the table is treated as garbage.
    pub(crate) max_string_length: u64,
    pub(crate) scan_string_table: bool,
    pub(crate) decode_physical_memory_runs: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            max_render_len: DEFAULT_MAX_RENDER_LEN,
            string_max_render_len: DEFAULT_STRING_MAX_RENDER_LEN,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            scan_string_table: true,
            decode_physical_memory_runs: true,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    pub fn max_render_len(mut self, max_render_len: usize) -> Self {
        self.max_render_len = max_render_len;
        self
    }

    pub fn string_max_render_len(mut self, string_max_render_len: usize) -> Self {
        self.string_max_render_len = string_max_render_len;
        self
    }

    pub fn max_string_length(mut self, max_string_length: u64) -> Self {
        self.max_string_length = max_string_length;
        self
    }

    pub fn scan_string_table(mut self, scan_string_table: bool) -> Self {
        self.scan_string_table = scan_string_table;
        self
    }

    pub fn decode_physical_memory_runs(mut self, decode_physical_memory_runs: bool) -> Self {
        self.decode_physical_memory_runs = decode_physical_memory_runs;
        self
    }
}

pub struct DumpParser {
    data: Box<dyn ReadSeek>,
    config: ParserSettings,
}

impl DumpParser {
    pub fn from_path(path: impl AsRef<Path>) -> DumpResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| DumpError::FailedToOpenFile {
            source,
            path: path.to_path_buf(),
        })?;

        Ok(Self::from_read_seek(BufReader::new(f)))
    }

    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        Self::from_read_seek(Cursor::new(buffer))
    }

    pub fn from_read_seek<T: ReadSeek + 'static>(read_seek: T) -> Self {
        DumpParser {
            data: Box::new(read_seek),
            config: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    /// Decodes the dump header from the start of the input.
    ///
    /// Every decoded field and summary event is reported to `sink` as it happens. Fields decoded
    /// before a fatal error have already been reported when the error is returned.
    pub fn parse(&mut self, sink: &mut dyn DiagnosticsSink) -> DumpResult<DumpReport> {
        self.data.try_seek_abs(0)?;

        let settings = &self.config;
        let mut walker = StructWalker::new(&mut self.data, sink, settings.max_render_len);

        let variant = identify(&mut walker)?;
        let mut report = DumpReport::new(variant);

        match variant {
            DumpVariant::Header64 => parse_header64(&mut walker, settings, &mut report)?,
            DumpVariant::Header32 => parse_header32(&mut walker, settings, &mut report)?,
        }

        if !report.physical_memory.present {
            walker.emit(DumpEvent::PhysicalMemoryAbsent);
        }

        debug!(
            "Finished parsing {}-bit dump header at 0x{:08x}",
            variant.bitness(),
            walker.position()?
        );

        report.fields = walker.into_trace();
        Ok(report)
    }
}

/// Reads `Signature` and `ValidDump` and picks the header variant.
///
/// A bad signature stops the parse right after `Signature`, before `ValidDump` is read.
fn identify<T: ReadSeek>(walker: &mut StructWalker<'_, T>) -> DumpResult<DumpVariant> {
    // Both tags are compared in full, whatever the configured render length.
    let (_, signature) = walker.decode_field_raw(&HEADER32[0], HEADER32[0].size)?;
    let (_, signature) = render_ascii(&signature, signature.len());

    if signature != DUMP_SIGNATURE {
        walker.emit(DumpEvent::BadSignature {
            found: signature.clone(),
        });
        return Err(DumpError::BadSignature { found: signature });
    }

    let (_, valid_dump) = walker.decode_field_raw(&HEADER32[1], HEADER32[1].size)?;
    let (_, valid_dump) = render_ascii(&valid_dump, valid_dump.len());

    if valid_dump == VALID_DUMP_64 {
        return Ok(DumpVariant::Header64);
    }

    if valid_dump != VALID_DUMP_32 {
        trace!("ValidDump is `{valid_dump}`, decoding as a 32-bit dump");
    }
    Ok(DumpVariant::Header32)
}
