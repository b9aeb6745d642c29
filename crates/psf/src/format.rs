//! File framing: identifier, version and metadata lines around the root room.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ "PSFFileIO V3"                               │  identifier
//! │ "Version: 3.1.3"                             │
//! │ "Updated: 22w18"                             │
//! │ "Creator: Sunnix"                            │  api creator
//! │ "File Creator: <file_creator>"               │
//! ├──────────────────────────────────────────────┤
//! │ "[topRoom]:{"                                │
//! │ room body (counts, objects, child rooms)     │
//! │ "}"                                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every line is short-form text. The metadata lines are positional; their
//! order never changes.

use std::io::{Read, Write};

use codec::{open_marker, parse_open_marker, Dialect, TextReader, TextWriter, MARKER_CLOSE};
use log::debug;
use room::RoomTree;

use crate::error::DocumentError;

/// Identifier written by this implementation.
pub const IDENTIFIER: &str = "PSFFileIO V3";
/// Identifier of the predecessor library, still accepted on read.
pub const LEGACY_IDENTIFIER: &str = "SNXFileIO V3";
/// Format version written by this implementation.
pub const VERSION: &str = "3.1.3";
pub const UPDATED: &str = "22w18";
pub const CREATOR: &str = "Sunnix";
pub const DEFAULT_FILE_CREATOR: &str = "n/a";
/// Files of exactly this version store string values in short form.
pub const SHORT_STRINGS_VERSION: &str = "3.0";

const VERSION_PREFIX: &str = "Version: ";
const UPDATED_PREFIX: &str = "Updated: ";
const CREATOR_PREFIX: &str = "Creator: ";
const FILE_CREATOR_PREFIX: &str = "File Creator: ";

/// Number of leading version components compared by [`check_version`].
const GUARDED_COMPONENTS: usize = 2;

/// The metadata lines of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub identifier: String,
    pub version: String,
    pub updated: String,
    pub api_creator: String,
    pub file_creator: String,
}

impl Header {
    /// Header this implementation writes, carrying the given file creator.
    pub fn current(file_creator: impl Into<String>) -> Self {
        Self {
            identifier: IDENTIFIER.to_string(),
            version: VERSION.to_string(),
            updated: UPDATED.to_string(),
            api_creator: CREATOR.to_string(),
            file_creator: file_creator.into(),
        }
    }

    /// Object layout used by files carrying this header.
    pub fn dialect(&self) -> Dialect {
        if self.version == SHORT_STRINGS_VERSION {
            Dialect::ShortStrings
        } else {
            Dialect::Current
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::current(DEFAULT_FILE_CREATOR)
    }
}

/// Rejects files whose leading version components are newer than
/// `supported`.
///
/// Only the first two components take part and they are compared in order,
/// so `3.0.9` and `2.9` are accepted by a `3.1.x` reader while `3.2` and
/// `4.0` are not. Missing components count as equal.
///
/// # Errors
///
/// [`DocumentError::MalformedVersion`] if a compared component is not a
/// decimal number, [`DocumentError::FutureVersion`] if the file is newer.
pub fn check_version(file: &str, supported: &'static str) -> Result<(), DocumentError> {
    let parse = |v: &str| -> Result<Vec<u32>, DocumentError> {
        v.split('.')
            .take(GUARDED_COMPONENTS)
            .map(|c| {
                c.trim()
                    .parse::<u32>()
                    .map_err(|_| DocumentError::MalformedVersion(v.to_string()))
            })
            .collect()
    };
    let ours = parse(supported)?;
    let theirs = parse(file)?;
    for (mine, other) in ours.iter().zip(theirs.iter()) {
        if other > mine {
            return Err(DocumentError::FutureVersion {
                file: file.to_string(),
                supported,
            });
        }
        if other < mine {
            break;
        }
    }
    Ok(())
}

pub fn write_header<W: Write>(w: &mut TextWriter<W>, header: &Header) -> Result<(), DocumentError> {
    w.write_short(&header.identifier)?;
    w.write_short(&format!("{VERSION_PREFIX}{}", header.version))?;
    w.write_short(&format!("{UPDATED_PREFIX}{}", header.updated))?;
    w.write_short(&format!("{CREATOR_PREFIX}{}", header.api_creator))?;
    w.write_short(&format!("{FILE_CREATOR_PREFIX}{}", header.file_creator))?;
    Ok(())
}

/// Reads and validates the identifier, version and metadata lines.
pub fn read_header<R: Read>(r: &mut TextReader<R>) -> Result<Header, DocumentError> {
    let identifier = r.read_short()?;
    if identifier != IDENTIFIER && identifier != LEGACY_IDENTIFIER {
        return Err(DocumentError::FormatMismatch(identifier));
    }
    let version = read_prefixed(r, VERSION_PREFIX)?;
    check_version(&version, VERSION)?;
    let updated = read_prefixed(r, UPDATED_PREFIX)?;
    let api_creator = read_prefixed(r, CREATOR_PREFIX)?;
    let file_creator = read_prefixed(r, FILE_CREATOR_PREFIX)?;
    Ok(Header {
        identifier,
        version,
        updated,
        api_creator,
        file_creator,
    })
}

fn read_prefixed<R: Read>(r: &mut TextReader<R>, prefix: &'static str) -> Result<String, DocumentError> {
    let line = r.read_short()?;
    match line.strip_prefix(prefix) {
        Some(rest) => Ok(rest.to_string()),
        None => Err(DocumentError::MalformedHeader {
            expected: prefix,
            found: line,
        }),
    }
}

/// Writes header, framed root room and flushes.
pub fn write_document<W: Write>(
    w: &mut TextWriter<W>,
    header: &Header,
    tree: &RoomTree,
) -> Result<(), DocumentError> {
    write_header(w, header)?;
    let root = tree.root();
    w.write_short(&open_marker(tree.name(root)))?;
    w.write_room_body(tree, root)?;
    w.write_short(MARKER_CLOSE)?;
    w.flush()?;
    debug!("wrote psf document with {} rooms", tree.len());
    Ok(())
}

/// Reads a whole document. Nothing is returned unless every record and marker
/// decoded cleanly.
pub fn read_document<R: Read>(r: &mut TextReader<R>) -> Result<(Header, RoomTree), DocumentError> {
    let header = read_header(r)?;
    debug!(
        "reading psf document version {} by {}",
        header.version, header.file_creator
    );
    let marker = r.read_short()?;
    parse_open_marker(&marker)?;

    let mut tree = RoomTree::new();
    let root = tree.root();
    r.read_room_body(&mut tree, root, header.dialect())?;
    r.read_close_marker()?;
    Ok((header, tree))
}
