//! Data object records and recursive room bodies.
//!
//! ```text
//! object:     key(short) | tag name(short) | value(long if STRING else short)
//! room body:  count(short) | object * count
//!             count(short) | ( "[" name "]:{"(short) | room body | "}"(short) ) * count
//! ```
//!
//! Traversal uses an explicit stack, so nesting depth is bounded by memory
//! rather than by the call stack.

use std::io::{Read, Write};

use log::debug;
use room::{DataObject, RoomId, RoomTree, TypeTag};

use crate::text::{TextReader, TextWriter};
use crate::CodecError;

const MARKER_OPEN_PREFIX: &str = "[";
const MARKER_OPEN_SUFFIX: &str = "]:{";
/// Structural marker closing a room body.
pub const MARKER_CLOSE: &str = "}";

/// Which generation of the object layout a stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Files of version `3.0` stored string values in short form.
    ShortStrings,
    /// String values in long form; everything else in short form.
    #[default]
    Current,
}

/// `"[" + name + "]:{"`
pub fn open_marker(name: &str) -> String {
    format!("{MARKER_OPEN_PREFIX}{name}{MARKER_OPEN_SUFFIX}")
}

/// Extracts the room name from an open marker.
pub fn parse_open_marker(text: &str) -> Result<&str, CodecError> {
    text.strip_prefix(MARKER_OPEN_PREFIX)
        .and_then(|rest| rest.strip_suffix(MARKER_OPEN_SUFFIX))
        .ok_or_else(|| CodecError::MalformedMarker(text.to_string()))
}

impl<W: Write> TextWriter<W> {
    /// Writes one record; STRING values use the long form.
    pub fn write_object(&mut self, object: &DataObject) -> Result<(), CodecError> {
        self.write_short(object.key())?;
        self.write_short(object.tag().name())?;
        if object.tag() == TypeTag::String {
            self.write_long(object.value())
        } else {
            self.write_short(object.value())
        }
    }

    /// Writes the body of `room` and, recursively, of every room below it.
    /// The caller frames `room` itself with markers if needed.
    pub fn write_room_body(&mut self, tree: &RoomTree, room: RoomId) -> Result<(), CodecError> {
        self.write_room_head(tree, room)?;
        let mut stack = vec![(room, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (id, next) = *top;
            match tree.children(id).get(next) {
                Some(&child) => {
                    top.1 += 1;
                    self.write_short(&open_marker(tree.name(child)))?;
                    self.write_room_head(tree, child)?;
                    stack.push((child, 0));
                }
                None => {
                    stack.pop();
                    if !stack.is_empty() {
                        self.write_short(MARKER_CLOSE)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Object count, objects, child count.
    fn write_room_head(&mut self, tree: &RoomTree, room: RoomId) -> Result<(), CodecError> {
        let objects = tree.objects(room);
        self.write_short(&objects.len().to_string())?;
        for object in objects {
            self.write_object(object)?;
        }
        self.write_short(&tree.children(room).len().to_string())
    }
}

impl<R: Read> TextReader<R> {
    /// Reads one record.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownTypeTag`] if the tag name is not recognised.
    pub fn read_object(&mut self, dialect: Dialect) -> Result<DataObject, CodecError> {
        let key = self.read_short()?;
        let tag_name = self.read_short()?;
        let tag: TypeTag = tag_name
            .parse()
            .map_err(|_| CodecError::UnknownTypeTag(tag_name))?;
        let value = match (tag, dialect) {
            (TypeTag::String, Dialect::Current) => self.read_long()?,
            _ => self.read_short()?,
        };
        Ok(DataObject::new(key, tag, value))
    }

    /// Reads a room body into `room`, appending children in stored order.
    ///
    /// Any framing error aborts the read; the partially filled tree should be
    /// discarded by the caller.
    pub fn read_room_body(
        &mut self,
        tree: &mut RoomTree,
        room: RoomId,
        dialect: Dialect,
    ) -> Result<(), CodecError> {
        let pending = self.read_room_head(tree, room, dialect)?;
        let mut stack = vec![(room, pending)];
        while let Some(top) = stack.last_mut() {
            if top.1 > 0 {
                top.1 -= 1;
                let parent = top.0;
                let marker = self.read_short()?;
                let name = parse_open_marker(&marker)?;
                let child = tree.push_child(parent, name);
                debug!("decoding room {}", tree.path(child));
                let pending = self.read_room_head(tree, child, dialect)?;
                stack.push((child, pending));
            } else {
                stack.pop();
                if !stack.is_empty() {
                    self.read_close_marker()?;
                }
            }
        }
        Ok(())
    }

    /// Consumes a `"}"` marker.
    pub fn read_close_marker(&mut self) -> Result<(), CodecError> {
        let marker = self.read_short()?;
        if marker != MARKER_CLOSE {
            return Err(CodecError::MalformedMarker(marker));
        }
        Ok(())
    }

    /// Reads objects into `room` and returns the number of children that
    /// follow.
    fn read_room_head(
        &mut self,
        tree: &mut RoomTree,
        room: RoomId,
        dialect: Dialect,
    ) -> Result<usize, CodecError> {
        let count = self.read_count()?;
        for _ in 0..count {
            let object = self.read_object(dialect)?;
            tree.write(room, object);
        }
        self.read_count()
    }
}
