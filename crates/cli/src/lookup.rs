//! Resolving `room/…/key` paths against a decoded document.

use anyhow::{anyhow, bail, Result};
use psf::{DataObject, Document};

/// Splits `a/b/key` into `(["a", "b"], "key")`. A trailing `/` is rejected
/// because it names a room, not a record.
pub fn split_path(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = path.split('/').collect();
    let key = parts.pop().unwrap_or_default();
    if key.is_empty() {
        bail!("`{path}` does not name a key");
    }
    Ok((parts, key))
}

/// Finds the record at `path` without creating any rooms.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Result<&'a DataObject> {
    let (rooms, key) = split_path(path)?;
    let tree = doc.tree();
    let room = tree
        .resolve(tree.root(), rooms.iter().copied())
        .ok_or_else(|| anyhow!("no room at `{}`", rooms.join("/")))?;
    tree.get(room, key)
        .ok_or_else(|| anyhow!("no key `{key}` in room `{}`", tree.path(room)))
}

/// Room paths below the root in preorder, without trailing `/`.
pub fn room_paths(doc: &Document) -> Vec<String> {
    let tree = doc.tree();
    tree.descendants(tree.root())
        .into_iter()
        .map(|room| tree.path(room).trim_end_matches('/').to_string())
        .collect()
}
