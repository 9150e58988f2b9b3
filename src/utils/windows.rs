use jiff::Timestamp;

const WINDOWS_TO_UNIX_SECS: i64 = 11_644_473_600;

/// Converts a FILETIME (100ns ticks since 1601-01-01) into a timestamp.
///
/// Returns `None` when the value is outside of the range `jiff` can represent.
#[inline]
pub(crate) fn filetime_to_timestamp(filetime: u64) -> Option<Timestamp> {
    let secs = (filetime / 10_000_000) as i64 - WINDOWS_TO_UNIX_SECS;
    let nanos = ((filetime % 10_000_000) * 100) as i32;
    Timestamp::new(secs, nanos).ok()
}
