//! # PSF: Pair Sorted Format
//!
//! File-based key/value persistence with typed primitive values and a
//! hierarchical room namespace.
//!
//! A [`Document`] owns a [`room::RoomTree`] and a cursor into it. Values are
//! written to and read from the room under the cursor; rooms act like
//! profiles, so the same key can live in many rooms without clashing.
//!
//! ## File layout
//!
//! See [`format`] for the header lines; the room body encoding lives in the
//! `codec` crate. In short, every piece of text is a length unit followed by
//! that many characters, and rooms are bracketed by `"[name]:{"` / `"}"`
//! markers.
//!
//! ## Example
//! ```rust
//! use psf::{Document, Options};
//!
//! let mut doc = Document::create(std::io::sink(), Options::default());
//! doc.enter_room("profile0").unwrap();
//! doc.write("name", "alice");
//! doc.write("level", 7i32);
//! assert_eq!(doc.read::<i32>("level").unwrap(), Some(7));
//! doc.exit_room();
//! doc.close().unwrap();
//! ```

mod document;
mod error;
pub mod format;
mod options;

pub use document::{Document, Entry, EntryKind};
pub use error::DocumentError;
pub use format::Header;
pub use options::{LogSink, Options, SoftError, SoftErrorSink};
pub use room::{AccessError, DataObject, FromValue, RoomError, RoomId, RoomTree, ToValue, TypeTag};
