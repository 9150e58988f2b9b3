use crate::codec::decode_unsigned_int;
use crate::err::DumpResult;
use crate::layout::{FieldDescriptor, Layout, layout_size};
use crate::model::ExceptionSummary;
use crate::utils::ReadSeek;
use crate::walker::StructWalker;

/// Walks an `EXCEPTION_RECORD` in field order, keeping code, flags and address.
///
/// The remaining fields only go to the trace. Any slack between the record and the region the
/// header reserves for it is skipped.
pub(crate) fn decode_exception<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    region: &FieldDescriptor,
    record: Layout,
) -> DumpResult<ExceptionSummary> {
    let mut summary = ExceptionSummary {
        code: 0,
        flags: 0,
        address: 0,
    };

    for field in record {
        let (_, raw) = walker.decode_field_raw(field, walker.max_render_len())?;

        match field.name {
            "ExceptionCode" => summary.code = decode_unsigned_int(&raw)? as u32,
            "ExceptionFlags" => summary.flags = decode_unsigned_int(&raw)? as u32,
            "ExceptionAddress" => summary.address = decode_unsigned_int(&raw)?,
            _ => {}
        }
    }

    walker.skip(region.size.saturating_sub(layout_size(record)), region.name)?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_MAX_RENDER_LEN;
    use crate::layout::{EXCEPTION, EXCEPTION_RECORD64, HEADER64, find_field};
    use crate::sink::RecordingSink;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_decodes_exception_record64() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xc000_0005_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        data.extend_from_slice(&0xfffff803_1d2e_3f40_u64.to_le_bytes());
        data.extend_from_slice(&2_u32.to_le_bytes());
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.resize(0x98, 0);

        let mut cursor = Cursor::new(data);
        let mut sink = RecordingSink::new();
        let mut walker = StructWalker::new(&mut cursor, &mut sink, DEFAULT_MAX_RENDER_LEN);
        let region = find_field(HEADER64, EXCEPTION).unwrap();

        let summary = decode_exception(&mut walker, region, EXCEPTION_RECORD64).unwrap();

        assert_eq!(
            summary,
            ExceptionSummary {
                code: 0xc000_0005,
                flags: 1,
                address: 0xfffff803_1d2e_3f40,
            }
        );
        assert_eq!(walker.position().unwrap(), 0x98);
        drop(walker);

        let names: Vec<_> = sink.fields().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "ExceptionCode",
                "ExceptionFlags",
                "ExceptionRecord",
                "ExceptionAddress",
                "NumberParameters",
                "__unusedAlignment",
                "ExceptionInformation",
            ]
        );
    }
}
