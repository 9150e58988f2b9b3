//! Variant parsers: walk a header from `MajorVersion` onward (the dispatcher has already read
//! `Signature` and `ValidDump`), handing the irregular regions to their dedicated decoders.

use crate::codec::decode_unsigned_int;
use crate::dump_parser::ParserSettings;
use crate::err::DumpResult;
use crate::exception::decode_exception;
use crate::layout::{
    BUG_CHECK_CODE, BUG_CHECK_PARAMETER, EXCEPTION, FieldDescriptor, FieldKind, HEADER_EXTENSION,
    HEADER32, HEADER64, MAJOR_VERSION, PHYSICAL_MEMORY_BLOCK, PHYSICAL_MEMORY_BLOCK_BUFFER,
    SYSTEM_TIME, fields_from,
};
use crate::model::{BugCheck, DumpEvent, DumpReport, DumpVariant};
use crate::physical_memory::decode_physical_memory;
use crate::string_table::{StringScanLimits, decode_header_extension, scan_strings};
use crate::utils::{ReadSeek, filetime_to_timestamp};
use crate::walker::StructWalker;

pub(crate) fn parse_header64<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    settings: &ParserSettings,
    report: &mut DumpReport,
) -> DumpResult<()> {
    walker.emit(DumpEvent::Variant(DumpVariant::Header64));

    for field in fields_from(HEADER64, MAJOR_VERSION) {
        let FieldKind::Nested(layout) = field.kind else {
            decode_scalar(walker, field, report)?;
            continue;
        };

        match field.name {
            PHYSICAL_MEMORY_BLOCK_BUFFER => {
                report.physical_memory = decode_physical_memory(
                    walker,
                    field,
                    layout,
                    true,
                    settings.decode_physical_memory_runs,
                )?;
            }
            EXCEPTION => {
                let exception = decode_exception(walker, field, layout)?;
                walker.emit(DumpEvent::Exception(exception));
                report.exception = Some(exception);
            }
            HEADER_EXTENSION => {
                report.strings_offset = decode_header_extension(walker, layout)?;

                if let (Some(offset), true) = (report.strings_offset, settings.scan_string_table)
                {
                    let limits = StringScanLimits {
                        max_length: settings.max_string_length,
                        max_render_len: settings.string_max_render_len,
                    };
                    let (strings, stop) = scan_strings(walker, offset, limits)?;
                    report.strings = strings;
                    report.string_table_end = Some(stop);
                }
            }
            _ => walker.walk(layout)?,
        }
    }

    Ok(())
}

/// The 32-bit header carries no exception record or string table we know how to find.
pub(crate) fn parse_header32<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    settings: &ParserSettings,
    report: &mut DumpReport,
) -> DumpResult<()> {
    walker.emit(DumpEvent::Variant(DumpVariant::Header32));

    for field in fields_from(HEADER32, MAJOR_VERSION) {
        match (field.kind, field.name) {
            (FieldKind::Scalar, _) => decode_scalar(walker, field, report)?,
            (FieldKind::Nested(layout), PHYSICAL_MEMORY_BLOCK) => {
                report.physical_memory = decode_physical_memory(
                    walker,
                    field,
                    layout,
                    false,
                    settings.decode_physical_memory_runs,
                )?;
            }
            (FieldKind::Nested(layout), _) => walker.walk(layout)?,
        }
    }

    Ok(())
}

/// Decodes a scalar header field, keeping the values the summary needs.
fn decode_scalar<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    field: &FieldDescriptor,
    report: &mut DumpReport,
) -> DumpResult<()> {
    let (_, raw) = walker.decode_field_raw(field, walker.max_render_len())?;

    match field.name {
        BUG_CHECK_CODE => {
            report.bug_check = Some(BugCheck {
                code: decode_unsigned_int(&raw)? as u32,
                parameters: Vec::new(),
            });
        }
        BUG_CHECK_PARAMETER => {
            let parameters = raw
                .chunks_exact(report.variant.pointer_size())
                .map(decode_unsigned_int)
                .collect::<DumpResult<Vec<u64>>>()?;

            let bug_check = report.bug_check.get_or_insert(BugCheck {
                code: 0,
                parameters: Vec::new(),
            });
            bug_check.parameters = parameters;
            walker.emit(DumpEvent::BugCheck(bug_check.clone()));
        }
        SYSTEM_TIME => {
            report.system_time = filetime_to_timestamp(decode_unsigned_int(&raw)?);
            if let Some(ts) = report.system_time {
                walker.emit(DumpEvent::SystemTime(ts));
            }
        }
        _ => {}
    }

    Ok(())
}
