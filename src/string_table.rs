//! The block at 0x2000 of a 64-bit dump and the wide-string table it points to.
//!
//! The table is a run of `{u32 length, length * u16 characters, u16 0}` records with no count
//! up front. It ends at a zero length; a length above the configured maximum or a non-zero
//! terminator means the table is not where we think it is, and the scan stops quietly.

use log::trace;

use crate::codec::{decode_unsigned_int, render_ascii, render_hex};
use crate::err::DumpResult;
use crate::layout::{Layout, STRINGS};
use crate::model::{DumpEvent, StringTableEntry, StringTableStop};
use crate::utils::{ReadExt, ReadSeek, decode_utf16le_lossy_z};
use crate::walker::StructWalker;

/// Walks the header extension block and returns the string table offset it holds.
pub(crate) fn decode_header_extension<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    extension: Layout,
) -> DumpResult<Option<u64>> {
    let mut strings_offset = None;

    for field in extension {
        let (_, raw) = walker.decode_field_raw(field, walker.max_render_len())?;
        if field.name == STRINGS {
            let offset = decode_unsigned_int(&raw)?;
            walker.emit(DumpEvent::StringsOffset { offset });
            strings_offset = Some(offset);
        }
    }

    Ok(strings_offset)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StringScanLimits {
    pub max_length: u64,
    pub max_render_len: usize,
}

/// Reads the string table at `offset`. The cursor is restored before returning, whatever
/// stopped the scan.
pub(crate) fn scan_strings<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    offset: u64,
    limits: StringScanLimits,
) -> DumpResult<(Vec<StringTableEntry>, StringTableStop)> {
    walker.with_restored_position(|w| {
        trace!("Seeking to string table at 0x{offset:08x}");
        w.source().try_seek_abs(offset)?;

        let mut entries = Vec::new();

        let (stop_offset, reason) = loop {
            let entry_offset = w.position()?;
            let raw_length = w.source().try_read_exact(4, "string length")?;
            let length = decode_unsigned_int(&raw_length)?;

            if length == 0 {
                break (entry_offset, StringTableStop::EndOfTable);
            }
            if length > limits.max_length {
                break (entry_offset, StringTableStop::LengthTooLarge { length });
            }

            let body = w
                .source()
                .try_read_exact(2 * length as usize, "string body")?;
            let (_, ascii) = render_ascii(&body, limits.max_render_len);

            let entry = StringTableEntry {
                offset: entry_offset,
                length: length as u32,
                text: decode_utf16le_lossy_z(&body),
                ascii,
            };
            w.emit(DumpEvent::StringEntry(entry.clone()));
            entries.push(entry);

            let terminator_offset = w.position()?;
            let terminator = w.source().try_read_exact(2, "string terminator")?;
            if terminator != [0, 0] {
                break (
                    terminator_offset,
                    StringTableStop::MissingTerminator {
                        found: render_hex(&terminator, 2),
                    },
                );
            }
        };

        w.emit(DumpEvent::StringTableEnd {
            offset: stop_offset,
            reason: reason.clone(),
        });

        Ok((entries, reason))
    })
}
