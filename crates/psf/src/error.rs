use std::io;

use codec::CodecError;
use room::RoomError;
use thiserror::Error;

/// Fatal errors from opening, decoding or closing a document.
///
/// Typed accessor failures are reported separately as
/// [`room::AccessError`]; missing and overwritten keys are not errors at all
/// but [`SoftError`](crate::SoftError)s.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error("the file does not correspond to the PSF format (identifier `{0}`)")]
    FormatMismatch(String),
    #[error("file version {file} is newer than the supported version {supported}")]
    FutureVersion {
        file: String,
        supported: &'static str,
    },
    #[error("list of {len} values does not fit an i32 size record")]
    ListTooLong { len: usize },
    #[error("malformed version `{0}`")]
    MalformedVersion(String),
    #[error("expected a header line starting with `{expected}`, found `{found}`")]
    MalformedHeader {
        expected: &'static str,
        found: String,
    },
}
