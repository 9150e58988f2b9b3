mod read_ext;
mod utf16;
mod windows;

pub use self::read_ext::ReadSeek;
pub(crate) use self::read_ext::ReadExt;
pub(crate) use self::utf16::decode_utf16le_lossy_z;
pub(crate) use self::windows::filetime_to_timestamp;
