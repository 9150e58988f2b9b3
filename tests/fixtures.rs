#![allow(dead_code)]
use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

pub const BUG_CHECK_CODE: u32 = 0xd1;
pub const BUG_CHECK_PARAMETERS: [u64; 4] = [0x28, 0x2, 0x0, 0xfffff806_4a1b_2c3d];
pub const EXCEPTION_CODE: u32 = 0xc000_0005;
pub const EXCEPTION_ADDRESS: u64 = 0xfffff806_4a1b_2c3d;
/// 2016-09-10T08:30:00Z
pub const SYSTEM_TIME: u64 = 131_179_698_000_000_000;
pub const STRINGS_OFFSET: usize = 0x2040;

/// Size of a 64-bit header including the extension block.
pub const HEADER64_SIZE: usize = 0x2040;
pub const HEADER32_SIZE: usize = 0x19E;

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub fn push_wide_string(data: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    data.extend_from_slice(&(units.len() as u32).to_le_bytes());
    for u in units {
        data.extend_from_slice(&u.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0]);
}

/// Builds a synthetic `PAGEDU64` dump.
///
/// The physical memory block is either the `PAGEPAGE` sentinel or a descriptor with the given
/// runs. The string table follows the header extension and holds `strings` then a zero length.
pub struct Dump64Builder {
    physical_memory_runs: Option<Vec<(u64, u64)>>,
    strings: Vec<String>,
    raw_table: Option<Vec<u8>>,
}

impl Default for Dump64Builder {
    fn default() -> Self {
        Dump64Builder {
            physical_memory_runs: None,
            strings: vec!["ntoskrnl.exe".to_owned()],
            raw_table: None,
        }
    }
}

impl Dump64Builder {
    pub fn with_physical_memory(mut self, runs: Vec<(u64, u64)>) -> Self {
        self.physical_memory_runs = Some(runs);
        self
    }

    pub fn with_strings(mut self, strings: &[&str]) -> Self {
        self.strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replaces the well-formed string table with arbitrary bytes.
    pub fn with_raw_string_table(mut self, raw: Vec<u8>) -> Self {
        self.raw_table = Some(raw);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0_u8; HEADER64_SIZE];

        data[0..8].copy_from_slice(b"PAGEDU64");
        put_u32(&mut data, 0x08, 0xf);
        put_u32(&mut data, 0x0c, 19041);
        put_u32(&mut data, 0x30, 0x8664);
        put_u32(&mut data, 0x34, 4);
        put_u32(&mut data, 0x38, BUG_CHECK_CODE);
        for (i, p) in BUG_CHECK_PARAMETERS.iter().enumerate() {
            put_u64(&mut data, 0x40 + i * 8, *p);
        }

        match &self.physical_memory_runs {
            None => data[0x88..0x90].copy_from_slice(b"PAGEPAGE"),
            Some(runs) => {
                put_u64(&mut data, 0x88, runs.len() as u64);
                put_u64(&mut data, 0x90, runs.iter().map(|(_, count)| count).sum());
                for (i, (base, count)) in runs.iter().enumerate() {
                    put_u64(&mut data, 0x98 + i * 16, *base);
                    put_u64(&mut data, 0xa0 + i * 16, *count);
                }
            }
        }

        put_u32(&mut data, 0xf00, EXCEPTION_CODE);
        put_u64(&mut data, 0xf10, EXCEPTION_ADDRESS);
        put_u32(&mut data, 0xf18, 2);

        put_u64(&mut data, 0xfa8, SYSTEM_TIME);
        data[0xfb0..0xfb8].copy_from_slice(b"Synthet!");

        put_u32(&mut data, 0x2038, STRINGS_OFFSET as u32);

        match self.raw_table {
            Some(raw) => data.extend_from_slice(&raw),
            None => {
                for s in &self.strings {
                    push_wide_string(&mut data, s);
                }
                data.extend_from_slice(&0_u32.to_le_bytes());
            }
        }

        data
    }
}

/// Builds a synthetic `PAGEDUMP` dump with a single physical memory run.
pub fn dump32() -> Vec<u8> {
    let mut data = vec![0_u8; HEADER32_SIZE];

    data[0..8].copy_from_slice(b"PAGEDUMP");
    put_u32(&mut data, 0x08, 0xf);
    put_u32(&mut data, 0x0c, 2600);
    put_u32(&mut data, 0x20, 0x14c);
    put_u32(&mut data, 0x24, 1);
    put_u32(&mut data, 0x28, 0x7f);
    for (i, p) in [0x8_u32, 0x80042000, 0, 0].iter().enumerate() {
        put_u32(&mut data, 0x2c + i * 4, *p);
    }

    put_u32(&mut data, 0x9e, 1);
    put_u32(&mut data, 0xa2, 0xff);
    put_u32(&mut data, 0xa6, 0x1);
    put_u32(&mut data, 0xaa, 0xff);

    data
}
