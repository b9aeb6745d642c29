//! # Room
//!
//! The in-memory model of a PSF document: a tree of named rooms, each holding
//! an ordered list of typed key/value records ([`DataObject`]s) and an ordered
//! list of child rooms.
//!
//! ## Key properties
//! - **Insertion order**: objects and children keep the order they were
//!   written in; encoders rely on it.
//! - **Overwrite in place**: writing an existing key replaces its tag and
//!   value without moving it.
//! - **Sibling-scoped names**: a room named `B` under `A` is unrelated to a
//!   room named `B` under the root.
//! - **Text values**: values are stored as text; typed accessors parse on
//!   read.
//!
//! ## Example
//! ```rust
//! use room::{DataObject, RoomTree};
//!
//! let mut tree = RoomTree::new();
//! let profile = tree.enter_or_create_child(tree.root(), "profile0").unwrap();
//! tree.write(profile, DataObject::from_value("age", &31i32));
//! assert_eq!(tree.get(profile, "age").unwrap().as_i32().unwrap(), 31);
//! assert_eq!(tree.path(profile), "profile0/");
//! ```

mod object;
mod tag;
mod tree;

pub use object::{AccessError, DataObject, FromValue, ToValue};
pub use tag::{TypeTag, UnknownTag};
pub use tree::{RoomError, RoomId, RoomTree, WriteOutcome, ROOT_NAME};
