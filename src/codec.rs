//! Rendering of raw field bytes.
//!
//! Dump fields are little-endian, so [`render_hex`] prints the bytes in reverse order: an
//! integer field reads most-significant-byte first, the way a debugger would show it.

use byteorder::{ByteOrder, LittleEndian};

use crate::err::{DumpError, DumpResult};

pub const DEFAULT_MAX_RENDER_LEN: usize = 32;

/// Renders at most `max_len` bytes as hex, last byte first.
pub fn render_hex(data: &[u8], max_len: usize) -> String {
    let consumed = &data[..data.len().min(max_len)];

    let mut s = String::with_capacity(consumed.len() * 2);
    for b in consumed.iter().rev() {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Renders at most `max_len` bytes as ASCII, replacing non-printable bytes with `.`.
///
/// The flag is `true` if at least one byte was printable.
pub fn render_ascii(data: &[u8], max_len: usize) -> (bool, String) {
    let mut contains_printable = false;

    let text = data
        .iter()
        .take(max_len)
        .map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                contains_printable = true;
                b as char
            } else {
                '.'
            }
        })
        .collect();

    (contains_printable, text)
}

/// Interprets exactly 4 or 8 bytes as a little-endian unsigned integer.
pub fn decode_unsigned_int(data: &[u8]) -> DumpResult<u64> {
    match data.len() {
        4 => Ok(u64::from(LittleEndian::read_u32(data))),
        8 => Ok(LittleEndian::read_u64(data)),
        width => Err(DumpError::UnsupportedIntegerWidth { width }),
    }
}

/// Parses a value back out of its [`render_hex`] rendering.
///
/// An empty rendering (zero-sized field) is `0`. Renderings wider than 64 bits yield `None`.
pub fn hex_to_u64(hex: &str) -> Option<u64> {
    if hex.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hex_reads_little_endian_values_msb_first() {
        assert_eq!(render_hex(&[0x50, 0x41, 0x47, 0x45], 32), "45474150");
        assert_eq!(render_hex(&0x1e_u32.to_le_bytes(), 32), "0000001e");
    }

    #[test]
    fn test_hex_differs_from_reversed_input() {
        let data = [0x01_u8, 0x02, 0x03, 0x04];
        let mut reversed = data;
        reversed.reverse();
        assert_ne!(render_hex(&data, 32), render_hex(&reversed, 32));
        assert_eq!(render_hex(&data, 32), "04030201");
    }

    #[test]
    fn test_hex_is_capped() {
        let data: Vec<u8> = (0..40).collect();
        let hex = render_hex(&data, 32);
        assert_eq!(hex.len(), 64);
        // The 32nd byte (0x1f) is rendered first.
        assert!(hex.starts_with("1f1e"));
        assert!(hex.ends_with("0100"));
    }

    #[test]
    fn test_ascii_keeps_printable_input() {
        let (printable, text) = render_ascii(b"PAGEDU64", 32);
        assert!(printable);
        assert_eq!(text, "PAGEDU64");
    }

    #[test]
    fn test_ascii_substitutes_non_printable() {
        let (printable, text) = render_ascii(&[0x41, 0x00, 0x7f, 0x20, 0x7e, 0x1f, 0xff], 32);
        assert!(printable);
        assert_eq!(text, "A.. ~..");
    }

    #[test]
    fn test_ascii_all_non_printable() {
        let (printable, text) = render_ascii(&[0x00, 0x01, 0x80], 32);
        assert!(!printable);
        assert_eq!(text, "...");
    }

    #[test]
    fn test_ascii_is_capped() {
        let (_, text) = render_ascii(&[b'a'; 300], 256);
        assert_eq!(text.len(), 256);
    }

    #[test]
    fn test_decode_unsigned_int_widths() {
        assert_eq!(decode_unsigned_int(&[0x2c, 0x01, 0, 0]).unwrap(), 300);
        assert_eq!(
            decode_unsigned_int(&0xfffff800_0001_2345_u64.to_le_bytes()).unwrap(),
            0xfffff800_0001_2345
        );
        assert!(matches!(
            decode_unsigned_int(&[0, 0]),
            Err(DumpError::UnsupportedIntegerWidth { width: 2 })
        ));
    }

    #[test]
    fn test_hex_to_u64_round_trips_rendering() {
        let address = 0xfffff803_1b2c_3d4e_u64;
        assert_eq!(hex_to_u64(&render_hex(&address.to_le_bytes(), 32)), Some(address));
        assert_eq!(hex_to_u64(""), Some(0));
        assert_eq!(hex_to_u64(&render_hex(&[1_u8; 16], 32)), None);
    }
}
