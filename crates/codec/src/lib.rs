//! # Codec
//!
//! Stream encoding for PSF documents: the length-prefixed text primitive
//! ([`TextWriter`] / [`TextReader`]) and, built on it, data object records
//! and recursive room bodies.
//!
//! This crate knows nothing about file headers or versions; the `psf` crate
//! frames a room body with the identifier and metadata lines and picks the
//! [`Dialect`].

use std::io;

use thiserror::Error;

mod body;
mod text;

pub use body::{open_marker, parse_open_marker, Dialect, MARKER_CLOSE};
pub use text::{TextReader, TextWriter, MAX_SHORT_LEN};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("stream ended in the middle of a record")]
    TruncatedStream,
    #[error("stream is not valid utf-8")]
    InvalidUtf8,
    #[error("text of {len} characters does not fit a short-form length")]
    TextTooLong { len: usize },
    #[error("unknown type tag `{0}`")]
    UnknownTypeTag(String),
    #[error("expected a decimal count, found `{0}`")]
    MalformedCount(String),
    #[error("expected a decimal length, found `{0}`")]
    MalformedLength(String),
    #[error("malformed structural marker `{0}`")]
    MalformedMarker(String),
}
