use crate::codec::{decode_unsigned_int, render_hex};
use crate::err::DumpResult;
use crate::layout::{FieldDescriptor, Layout, PHYSICAL_MEMORY_ABSENT_SENTINEL, layout_size};
use crate::model::{DumpEvent, PhysicalMemoryInfo, PhysicalMemoryRun};
use crate::utils::ReadSeek;
use crate::walker::StructWalker;

/// Decodes a `PHYSICAL_MEMORY_DESCRIPTOR` occupying the region reserved by `region`.
///
/// `descriptor` is `NumberOfRuns`, `NumberOfPages`, then the nested run record. When
/// `honor_absent_sentinel` is set, a `NumberOfRuns` reading `PAGEPAGE` marks the block as
/// absent and the whole region is skipped as padding.
///
/// On every path the cursor ends at the end of the region.
pub(crate) fn decode_physical_memory<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    region: &FieldDescriptor,
    descriptor: Layout,
    honor_absent_sentinel: bool,
    decode_runs: bool,
) -> DumpResult<PhysicalMemoryInfo> {
    let start = walker.position()?;

    let (_, raw_runs) = walker.decode_field_raw(&descriptor[0], walker.max_render_len())?;

    if honor_absent_sentinel
        && render_hex(&raw_runs, raw_runs.len()) == PHYSICAL_MEMORY_ABSENT_SENTINEL
    {
        walker.emit(DumpEvent::PhysicalMemorySkipped {
            offset: start,
            size: region.size,
        });
        walker.skip(region.size.saturating_sub(descriptor[0].size), region.name)?;
        return Ok(PhysicalMemoryInfo::default());
    }

    let (_, raw_pages) = walker.decode_field_raw(&descriptor[1], walker.max_render_len())?;

    let mut info = PhysicalMemoryInfo {
        present: true,
        number_of_runs: Some(decode_unsigned_int(&raw_runs)?),
        number_of_pages: Some(decode_unsigned_int(&raw_pages)?),
        runs: Vec::new(),
    };

    if decode_runs {
        if let Some(run_layout) = descriptor.get(2).and_then(|f| f.nested_layout()) {
            info.runs = decode_runs_array(
                walker,
                run_layout,
                info.number_of_runs.unwrap_or(0),
                region.size.saturating_sub(layout_size(&descriptor[..2])),
            )?;
        }
    }

    let consumed = (walker.position()? - start) as usize;
    walker.skip(region.size.saturating_sub(consumed), region.name)?;

    Ok(info)
}

fn decode_runs_array<T: ReadSeek>(
    walker: &mut StructWalker<'_, T>,
    run_layout: Layout,
    declared: u64,
    available: usize,
) -> DumpResult<Vec<PhysicalMemoryRun>> {
    let capacity = available / layout_size(run_layout).max(1);

    if declared > capacity as u64 {
        walker.emit(DumpEvent::PhysicalMemoryRunsTruncated { declared, capacity });
    }

    let count = declared.min(capacity as u64) as usize;
    let mut runs = Vec::with_capacity(count);

    for _ in 0..count {
        let (_, base_page) = walker.decode_field_raw(&run_layout[0], walker.max_render_len())?;
        let (_, page_count) = walker.decode_field_raw(&run_layout[1], walker.max_render_len())?;
        runs.push(PhysicalMemoryRun {
            base_page: decode_unsigned_int(&base_page)?,
            page_count: decode_unsigned_int(&page_count)?,
        });
    }

    Ok(runs)
}
