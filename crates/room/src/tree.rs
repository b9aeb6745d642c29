//! The room tree.
//!
//! Rooms live in an arena owned by [`RoomTree`] and are addressed by
//! [`RoomId`]. Slot 0 is always the root. A room's parent is `None` only for
//! the root; every other room is reachable from exactly one parent's
//! `children` list.
//!
//! Names are unique among siblings only: `A/B` and `B` are different rooms.
//!
//! The tree performs no I/O and has no interior mutability. It is not safe
//! for concurrent mutation; wrap the owner in a mutex if it must be shared.

use thiserror::Error;

use crate::object::DataObject;

/// Name given to the root room. Reserved: no child may use it.
pub const ROOT_NAME: &str = "topRoom";

/// Index of a room inside its [`RoomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("`{0}` is reserved for the root room")]
    ReservedName(String),
}

#[derive(Debug, Clone)]
struct RoomNode {
    name: String,
    parent: Option<RoomId>,
    objects: Vec<DataObject>,
    children: Vec<RoomId>,
}

impl RoomNode {
    fn new(name: String, parent: Option<RoomId>) -> Self {
        Self {
            name,
            parent,
            objects: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// What [`RoomTree::write`] did with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key was new and the object was appended.
    Inserted,
    /// The key existed; its tag and value were replaced in place.
    Overwritten,
}

/// Arena-backed room hierarchy.
#[derive(Debug, Clone)]
pub struct RoomTree {
    rooms: Vec<RoomNode>,
}

impl RoomTree {
    /// Creates a tree holding only an empty root.
    pub fn new() -> Self {
        Self {
            rooms: vec![RoomNode::new(ROOT_NAME.to_string(), None)],
        }
    }

    pub fn root(&self) -> RoomId {
        RoomId(0)
    }

    pub fn is_root(&self, room: RoomId) -> bool {
        self.node(room).parent.is_none()
    }

    pub fn name(&self, room: RoomId) -> &str {
        &self.node(room).name
    }

    /// Parent of `room`; `None` for the root.
    pub fn parent(&self, room: RoomId) -> Option<RoomId> {
        self.node(room).parent
    }

    pub fn children(&self, room: RoomId) -> &[RoomId] {
        &self.node(room).children
    }

    pub fn objects(&self, room: RoomId) -> &[DataObject] {
        &self.node(room).objects
    }

    /// Total number of rooms, root included.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// `true` when the tree is only an empty root.
    pub fn is_empty(&self) -> bool {
        self.rooms.len() == 1 && self.rooms[0].objects.is_empty()
    }

    /// Linear scan of `room`'s objects for `key`.
    pub fn get(&self, room: RoomId, key: &str) -> Option<&DataObject> {
        self.node(room).objects.iter().find(|o| o.key() == key)
    }

    /// Writes a record into `room`.
    ///
    /// An existing key keeps its position and gets the new tag and value;
    /// otherwise the record is appended.
    pub fn write(&mut self, room: RoomId, object: DataObject) -> WriteOutcome {
        let objects = &mut self.node_mut(room).objects;
        match objects.iter_mut().find(|o| o.key() == object.key()) {
            Some(existing) => {
                *existing = object;
                WriteOutcome::Overwritten
            }
            None => {
                objects.push(object);
                WriteOutcome::Inserted
            }
        }
    }

    /// Direct child of `room` called `name`, if any.
    pub fn child(&self, room: RoomId, name: &str) -> Option<RoomId> {
        self.node(room)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).name == name)
    }

    /// Returns the direct child called `name`, creating and appending it when
    /// absent.
    ///
    /// # Errors
    ///
    /// [`RoomError::ReservedName`] if `name` is the root's name.
    pub fn enter_or_create_child(&mut self, room: RoomId, name: &str) -> Result<RoomId, RoomError> {
        if name == ROOT_NAME {
            return Err(RoomError::ReservedName(name.to_string()));
        }
        if let Some(existing) = self.child(room, name) {
            return Ok(existing);
        }
        Ok(self.push_child(room, name))
    }

    /// Appends a new child without looking for an existing sibling of the same
    /// name. Decoders use this to rebuild a tree exactly as stored.
    pub fn push_child(&mut self, room: RoomId, name: &str) -> RoomId {
        let id = RoomId(self.rooms.len());
        self.rooms.push(RoomNode::new(name.to_string(), Some(room)));
        self.node_mut(room).children.push(id);
        id
    }

    /// Parent of `room`, or `room` itself when it is the root.
    pub fn exit(&self, room: RoomId) -> RoomId {
        self.parent(room).unwrap_or(room)
    }

    /// `/`-joined names from just below the root down to `room`, with a
    /// trailing `/`. The root's path is empty.
    pub fn path(&self, room: RoomId) -> String {
        let mut names = Vec::new();
        let mut cursor = room;
        while let Some(parent) = self.parent(cursor) {
            names.push(self.name(cursor));
            cursor = parent;
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push_str(name);
            path.push('/');
        }
        path
    }

    /// Follows a chain of child names from `room`, without creating anything.
    pub fn resolve<'a, I>(&self, room: RoomId, names: I) -> Option<RoomId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .try_fold(room, |current, name| self.child(current, name))
    }

    /// Every room below `room` (excluding `room` itself) in preorder.
    pub fn descendants(&self, room: RoomId) -> Vec<RoomId> {
        let mut out = Vec::new();
        let mut stack: Vec<RoomId> = self.children(room).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    fn node(&self, room: RoomId) -> &RoomNode {
        &self.rooms[room.0]
    }

    fn node_mut(&mut self, room: RoomId) -> &mut RoomNode {
        &mut self.rooms[room.0]
    }
}

impl Default for RoomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same names, objects and child order, ignoring arena
/// slot numbering.
impl PartialEq for RoomTree {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.root(), other.root())];
        while let Some((a, b)) = pending.pop() {
            let (na, nb) = (self.node(a), other.node(b));
            if na.name != nb.name
                || na.objects != nb.objects
                || na.children.len() != nb.children.len()
            {
                return false;
            }
            pending.extend(na.children.iter().copied().zip(nb.children.iter().copied()));
        }
        true
    }
}

impl Eq for RoomTree {}
