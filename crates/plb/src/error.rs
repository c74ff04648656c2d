use std::io;

use thiserror::Error;

/// Failures that can occur while opening a database.
///
/// Matches the open-time taxonomy: any of these is fatal, `Database::open`
/// returns before a partial database is ever exposed to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open or map database file: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic bytes, expected \"PLB\"")]
    BadMagic,

    #[error("unsupported database version {0}, expected 0")]
    UnsupportedVersion(u8),

    #[error("precision {0} out of range, expected 1..=63")]
    UnsupportedPrecision(u8),

    #[error("header truncated before all fields could be parsed")]
    TruncatedHeader,

    #[error("variable-length integer truncated or malformed")]
    TruncatedVarint,

    #[error("string table entry truncated or malformed")]
    TruncatedString,

    #[error("file size mismatch: header implies {expected} bytes, file is {actual} bytes")]
    SizeMismatch { expected: u64, actual: u64 },
}
