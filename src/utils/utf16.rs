/// Decode a UTF-16LE byte slice until the first NUL (0x0000), if present.
///
/// Unpaired surrogates are replaced with U+FFFD and a trailing odd byte is ignored.
pub(crate) fn decode_utf16le_lossy_z(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    let slice = &units[..end];

    // Fast path: pure ASCII converts without surrogate handling.
    if slice.iter().all(|&c| c <= 0x7F) {
        return slice.iter().map(|&c| c as u8 as char).collect();
    }

    String::from_utf16_lossy(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_decodes_ascii_names() {
        assert_eq!(decode_utf16le_lossy_z(&utf16le("hal.dll")), "hal.dll");
    }

    #[test]
    fn test_stops_at_nul() {
        let mut bytes = utf16le("ci.dll");
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&utf16le("junk"));
        assert_eq!(decode_utf16le_lossy_z(&bytes), "ci.dll");
    }

    #[test]
    fn test_replaces_unpaired_surrogates() {
        let bytes = [0x41, 0x00, 0x00, 0xD8, 0x42, 0x00];
        assert_eq!(decode_utf16le_lossy_z(&bytes), "A\u{FFFD}B");
    }
}
