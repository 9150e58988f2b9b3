//! Static field layouts of the kernel crash dump headers.
//!
//! A [`Layout`] is an ordered list of fields; byte offsets are implied by the cumulative sizes.
//! For a nested field, `size` is the region the field *reserves* in its containing layout, which
//! may be larger than (or unrelated to) the sum of the nested layout's own fields.

pub type Layout = &'static [FieldDescriptor];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Nested(Layout),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub size: usize,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn scalar(name: &'static str, size: usize) -> Self {
        FieldDescriptor {
            name,
            size,
            kind: FieldKind::Scalar,
        }
    }

    pub const fn nested(name: &'static str, size: usize, layout: Layout) -> Self {
        FieldDescriptor {
            name,
            size,
            kind: FieldKind::Nested(layout),
        }
    }

    /// Opaque bytes that are consumed but reported as a skip rather than a value.
    pub const fn skip(size: usize) -> Self {
        FieldDescriptor::scalar(SKIP_FIELD_NAME, size)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, FieldKind::Nested(_))
    }

    pub fn is_skip(&self) -> bool {
        self.name == SKIP_FIELD_NAME
    }

    pub fn nested_layout(&self) -> Option<Layout> {
        match self.kind {
            FieldKind::Nested(layout) => Some(layout),
            FieldKind::Scalar => None,
        }
    }
}

/// Sum of the reserved sizes of the layout's top-level fields.
pub fn layout_size(layout: Layout) -> usize {
    layout.iter().map(|f| f.size).sum()
}

/// Looks up a field by name. Returns the first match, names are not unique in every layout.
pub fn find_field(layout: Layout, name: &str) -> Option<&'static FieldDescriptor> {
    layout.iter().find(|f| f.name == name)
}

/// Offset of a named field relative to the start of its layout.
pub fn field_offset(layout: Layout, name: &str) -> Option<usize> {
    let index = layout.iter().position(|f| f.name == name)?;
    Some(layout_size(&layout[..index]))
}

/// The fields of `layout` starting at (and including) `name`.
pub fn fields_from(layout: Layout, name: &str) -> Layout {
    match layout.iter().position(|f| f.name == name) {
        Some(index) => &layout[index..],
        None => &[],
    }
}

pub const SKIP_FIELD_NAME: &str = "Skip";

pub const DUMP_SIGNATURE: &str = "PAGE";
pub const VALID_DUMP_64: &str = "DU64";
pub const VALID_DUMP_32: &str = "DUMP";

/// Hex rendering of a `NumberOfRuns` that reads `PAGEPAGE`: no physical memory block was written.
pub const PHYSICAL_MEMORY_ABSENT_SENTINEL: &str = "4547415045474150";

pub const SIGNATURE: &str = "Signature";
pub const VALID_DUMP: &str = "ValidDump";
pub const MAJOR_VERSION: &str = "MajorVersion";
pub const BUG_CHECK_CODE: &str = "BugCheckCode";
pub const BUG_CHECK_PARAMETER: &str = "BugCheckParameter";
pub const SYSTEM_TIME: &str = "SystemTime";
pub const PHYSICAL_MEMORY_BLOCK: &str = "PhysicalMemoryBlock";
pub const PHYSICAL_MEMORY_BLOCK_BUFFER: &str = "PhysicalMemoryBlockBuffer";
pub const EXCEPTION: &str = "Exception";
pub const HEADER_EXTENSION: &str = "HeaderExtension";
pub const STRINGS: &str = "Strings";

// from file wdm.h
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

pub const PHYSICAL_MEMORY_RUN32: Layout = &[
    FieldDescriptor::scalar("BasePage", 4),
    FieldDescriptor::scalar("PageCount", 4),
];

pub const PHYSICAL_MEMORY_DESCRIPTOR32: Layout = &[
    FieldDescriptor::scalar("NumberOfRuns", 4),
    FieldDescriptor::scalar("NumberOfPages", 4),
    FieldDescriptor::nested("Run", 256, PHYSICAL_MEMORY_RUN32),
];

pub const HEADER32: Layout = &[
    FieldDescriptor::scalar(SIGNATURE, 4),
    FieldDescriptor::scalar(VALID_DUMP, 4),
    FieldDescriptor::scalar(MAJOR_VERSION, 4),
    FieldDescriptor::scalar("MinorVersion", 4),
    FieldDescriptor::scalar("DirectoryTableBase", 4),
    FieldDescriptor::scalar("PfnDataBase", 4),
    FieldDescriptor::scalar("PsLoadedModuleList", 4),
    FieldDescriptor::scalar("PsActiveProcessHead", 4),
    FieldDescriptor::scalar("MachineImageType", 4),
    FieldDescriptor::scalar("NumberProcessors", 4),
    FieldDescriptor::scalar(BUG_CHECK_CODE, 4),
    FieldDescriptor::scalar(BUG_CHECK_PARAMETER, 16),
    FieldDescriptor::scalar("VersionUser", 32),
    FieldDescriptor::scalar("PaeEnabled", 1),
    FieldDescriptor::scalar("KdSecondaryVersion", 1),
    FieldDescriptor::scalar("Spare", 32),
    FieldDescriptor::scalar("KdDebuggerDataBlock", 32),
    FieldDescriptor::nested(PHYSICAL_MEMORY_BLOCK, 256, PHYSICAL_MEMORY_DESCRIPTOR32),
];

pub const PHYSICAL_MEMORY_RUN64: Layout = &[
    FieldDescriptor::scalar("BasePage", 8),
    FieldDescriptor::scalar("PageCount", 8),
];

pub const PHYSICAL_MEMORY_DESCRIPTOR64: Layout = &[
    FieldDescriptor::scalar("NumberOfRuns", 8),
    FieldDescriptor::scalar("NumberOfPages", 8),
    FieldDescriptor::nested("Run", 256, PHYSICAL_MEMORY_RUN64),
];

pub const EXCEPTION_RECORD64: Layout = &[
    FieldDescriptor::scalar("ExceptionCode", 4),
    FieldDescriptor::scalar("ExceptionFlags", 4),
    FieldDescriptor::scalar("ExceptionRecord", 8),
    FieldDescriptor::scalar("ExceptionAddress", 8),
    FieldDescriptor::scalar("NumberParameters", 4),
    FieldDescriptor::scalar("__unusedAlignment", 4),
    FieldDescriptor::scalar("ExceptionInformation", 8 * EXCEPTION_MAXIMUM_PARAMETERS),
];

/// The block following the 64-bit header at offset 0x2000.
pub const HEADER_EXTENSION64: Layout = &[
    // 0x2000
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 8),
    // 0x2010
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    // 0x2020
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    // 0x2030
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar(STRINGS, 4),
    FieldDescriptor::scalar("Unknown", 4),
];

pub const HEADER64: Layout = &[
    FieldDescriptor::scalar(SIGNATURE, 4),
    FieldDescriptor::scalar(VALID_DUMP, 4),
    FieldDescriptor::scalar(MAJOR_VERSION, 4),
    FieldDescriptor::scalar("MinorVersion", 4),
    FieldDescriptor::scalar("DirectoryTableBase", 8),
    FieldDescriptor::scalar("PfnDataBase", 8),
    FieldDescriptor::scalar("PsLoadedModuleList", 8),
    FieldDescriptor::scalar("PsActiveProcessHead", 8),
    FieldDescriptor::scalar("MachineImageType", 4),
    FieldDescriptor::scalar("NumberProcessors", 4),
    FieldDescriptor::scalar(BUG_CHECK_CODE, 4),
    FieldDescriptor::scalar("Unknown", 4),
    FieldDescriptor::scalar(BUG_CHECK_PARAMETER, 4 * 8),
    FieldDescriptor::skip(0x20),
    FieldDescriptor::scalar("KdDebuggerDataBlock", 8),
    FieldDescriptor::nested(
        PHYSICAL_MEMORY_BLOCK_BUFFER,
        0x2C0,
        PHYSICAL_MEMORY_DESCRIPTOR64,
    ),
    FieldDescriptor::scalar("ContextRecord", 3000),
    FieldDescriptor::nested(EXCEPTION, 0x98, EXCEPTION_RECORD64),
    FieldDescriptor::scalar("DumpType", 8),
    FieldDescriptor::scalar("RequiredDumpSpace", 8),
    FieldDescriptor::scalar(SYSTEM_TIME, 8),
    FieldDescriptor::scalar("Comment", 128),
    FieldDescriptor::scalar("SystemUpTime", 8),
    FieldDescriptor::scalar("MiniDumpFields", 4),
    FieldDescriptor::scalar("SecondaryDataState", 4),
    FieldDescriptor::scalar("ProductType", 4),
    FieldDescriptor::scalar("WriterStatus", 4),
    FieldDescriptor::scalar("Unused1", 1),
    FieldDescriptor::scalar("KdSecondaryVersion", 1),
    FieldDescriptor::scalar("Unused2", 2),
    FieldDescriptor::scalar("Reserved", 0xfb4),
    // Offset 0x2000
    FieldDescriptor::nested(HEADER_EXTENSION, 4, HEADER_EXTENSION64),
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header64_extension_starts_at_0x2000() {
        assert_eq!(field_offset(HEADER64, HEADER_EXTENSION), Some(0x2000));
    }

    #[test]
    fn test_header64_known_offsets() {
        assert_eq!(field_offset(HEADER64, MAJOR_VERSION), Some(0x08));
        assert_eq!(field_offset(HEADER64, BUG_CHECK_CODE), Some(0x38));
        assert_eq!(field_offset(HEADER64, PHYSICAL_MEMORY_BLOCK_BUFFER), Some(0x88));
        assert_eq!(field_offset(HEADER64, EXCEPTION), Some(0xF00));
        assert_eq!(field_offset(HEADER64, SYSTEM_TIME), Some(0xFA8));
    }

    #[test]
    fn test_exception_record_fills_its_region() {
        let exception = find_field(HEADER64, EXCEPTION).unwrap();
        assert_eq!(layout_size(EXCEPTION_RECORD64), exception.size);
    }

    #[test]
    fn test_strings_offset_field_position() {
        assert_eq!(layout_size(HEADER_EXTENSION64), 0x40);
        assert_eq!(field_offset(HEADER_EXTENSION64, STRINGS), Some(0x38));
    }

    #[test]
    fn test_header32_physical_memory_block_offset() {
        assert_eq!(field_offset(HEADER32, PHYSICAL_MEMORY_BLOCK), Some(0x9E));
    }

    #[test]
    fn test_fields_from_skips_common_prefix() {
        let rest = fields_from(HEADER64, MAJOR_VERSION);
        assert_eq!(rest.len(), HEADER64.len() - 2);
        assert_eq!(rest[0].name, MAJOR_VERSION);
        assert!(fields_from(HEADER64, "NoSuchField").is_empty());
    }

    #[test]
    fn test_scalar_and_nested_are_exclusive() {
        for field in HEADER64.iter().chain(HEADER32) {
            assert_eq!(field.is_struct(), field.nested_layout().is_some());
        }
        assert!(find_field(HEADER64, "Skip").unwrap().is_skip());
    }
}
