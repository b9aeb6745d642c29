use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use codec::{TextReader, TextWriter};
use log::{debug, error};
use room::{AccessError, DataObject, FromValue, RoomError, RoomId, RoomTree, ToValue, WriteOutcome};

use crate::error::DocumentError;
use crate::format::{read_document, write_document, Header};
use crate::options::{Options, SoftError};

const LIST_SUFFIX: &str = "_array";
const LIST_SIZE_KEY: &str = "array_size";
const LIST_ELEMENT_PREFIX: &str = "element_";

type Source = Box<dyn Read + Send>;
type Sink = Box<dyn Write + Send>;

/// Whether an entry of [`Document::list_current_room`] is a record or a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Data,
    Room,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

/// A PSF document: the room tree, a cursor into it, and the streams it was
/// opened with.
///
/// # Lifecycle
///
/// - [`open`](Document::open) decodes a whole source up front.
/// - [`create`](Document::create) starts from an empty root and encodes
///   everything into the sink on [`close`](Document::close).
/// - [`edit`](Document::edit) does both: decode from one stream, re-encode to
///   another on close.
///
/// The cursor starts at the root and only moves through the navigation
/// methods. Reads and writes act on the room under the cursor.
///
/// A `Document` is not synchronised. Guard it with a mutex to share it between
/// threads.
pub struct Document {
    header: Header,
    tree: RoomTree,
    cursor: RoomId,
    options: Options,
    source: Option<Source>,
    sink: Option<Sink>,
    closed: bool,
}

impl Document {
    /// Decodes a document from `source`.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentError::FormatMismatch`] for a foreign identifier,
    /// [`DocumentError::FutureVersion`] for a newer file, and with a codec
    /// error for any framing problem. No partial tree is ever returned.
    pub fn open<R: Read + Send + 'static>(source: R, options: Options) -> Result<Self, DocumentError> {
        let mut reader = TextReader::new(source);
        let (header, tree) = read_document(&mut reader)?;
        let mut doc = Self::with_parts(header, tree, options);
        doc.source = Some(Box::new(reader.into_inner()));
        Ok(doc)
    }

    /// Starts an empty document that is written to `sink` on close.
    pub fn create<W: Write + Send + 'static>(sink: W, options: Options) -> Self {
        let header = Header::current(options.file_creator.clone());
        let mut doc = Self::with_parts(header, RoomTree::new(), options);
        doc.sink = Some(Box::new(sink));
        doc
    }

    /// Decodes `source`, then writes the (possibly modified) tree to `sink`
    /// on close.
    pub fn edit<R, W>(source: R, sink: W, options: Options) -> Result<Self, DocumentError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let mut doc = Self::open(source, options)?;
        doc.sink = Some(Box::new(sink));
        Ok(doc)
    }

    pub fn open_path<P: AsRef<Path>>(path: P, options: Options) -> Result<Self, DocumentError> {
        let file = File::open(path)?;
        Self::open(file, options)
    }

    /// Creates (or truncates) `path`. Parent directories must already exist.
    pub fn create_path<P: AsRef<Path>>(path: P, options: Options) -> Result<Self, DocumentError> {
        let file = File::create(path)?;
        Ok(Self::create(BufWriter::new(file), options))
    }

    /// Reads `input` now and writes `output` on close. `output` is only
    /// created once `input` decoded successfully.
    pub fn edit_path<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
        options: Options,
    ) -> Result<Self, DocumentError> {
        let mut doc = Self::open_path(input, options)?;
        let file = File::create(output)?;
        doc.sink = Some(Box::new(BufWriter::new(file)));
        Ok(doc)
    }

    fn with_parts(header: Header, tree: RoomTree, options: Options) -> Self {
        let cursor = tree.root();
        Self {
            header,
            tree,
            cursor,
            options,
            source: None,
            sink: None,
            closed: false,
        }
    }

    // ---------------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------------

    /// Header as read from the source, or as it will be written.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn file_creator(&self) -> &str {
        &self.header.file_creator
    }

    pub fn set_file_creator(&mut self, creator: impl Into<String>) -> &mut Self {
        self.header.file_creator = creator.into();
        self
    }

    pub fn set_show_soft_errors(&mut self, show: bool) {
        self.options.show_soft_errors = show;
    }

    pub fn tree(&self) -> &RoomTree {
        &self.tree
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn current_room(&self) -> RoomId {
        self.cursor
    }

    /// Path of the room under the cursor, `""` at the root.
    pub fn current_path(&self) -> String {
        self.tree.path(self.cursor)
    }

    /// Moves into the child `name` of the current room, creating it if needed.
    pub fn enter_room(&mut self, name: &str) -> Result<RoomId, RoomError> {
        self.cursor = self.tree.enter_or_create_child(self.cursor, name)?;
        Ok(self.cursor)
    }

    /// Moves to the parent room. No-op at the root.
    pub fn exit_room(&mut self) -> RoomId {
        self.cursor = self.tree.exit(self.cursor);
        self.cursor
    }

    pub fn exit_all_rooms(&mut self) {
        self.cursor = self.tree.root();
    }

    /// Runs `f` inside the child room `name`, then steps back out. The cursor
    /// is restored even if `f` panics.
    pub fn in_room<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> Result<T, RoomError> {
        let room = self.enter_room(name)?;
        let out = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *self)));
        self.cursor = self.tree.exit(room);
        match out {
            Ok(out) => Ok(out),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    // ---------------------------------------------------------------------
    // Records
    // ---------------------------------------------------------------------

    /// Writes `value` under `key` in the current room. Overwriting an existing
    /// key reports [`SoftError::DuplicateKeyOverwrite`].
    pub fn write<V: ToValue>(&mut self, key: &str, value: V) {
        self.write_object(DataObject::from_value(key, &value));
    }

    /// Writes a prepared record, reporting overwrites like [`write`](Self::write).
    pub fn write_object(&mut self, object: DataObject) {
        let path = format!("{}{}", self.current_path(), object.key());
        if self.tree.write(self.cursor, object) == WriteOutcome::Overwritten {
            self.options
                .sink
                .report(&SoftError::DuplicateKeyOverwrite { path });
        }
    }

    /// Inserts or replaces a record without any report.
    pub fn add_data_object(&mut self, object: DataObject) {
        self.tree.write(self.cursor, object);
    }

    /// Looks `key` up in the current room. A miss reports
    /// [`SoftError::MissingKey`] when soft errors are shown.
    pub fn get(&mut self, key: &str) -> Option<&DataObject> {
        if self.tree.get(self.cursor, key).is_none() {
            self.report_missing(key);
            return None;
        }
        self.tree.get(self.cursor, key)
    }

    /// Looks `key` up without reporting a miss.
    pub fn get_data_object(&self, key: &str) -> Option<&DataObject> {
        self.tree.get(self.cursor, key)
    }

    /// Reads `key` as `T`. `Ok(None)` when the key is absent.
    pub fn read<T: FromValue>(&mut self, key: &str) -> Result<Option<T>, AccessError> {
        self.get(key).map(T::from_object).transpose()
    }

    /// Stores `values` in a child room `<key>_array` holding `array_size` and
    /// `element_<i>` records.
    ///
    /// # Errors
    /// [`DocumentError::ListTooLong`] when `values` holds more than
    /// `i32::MAX` entries; nothing is written in that case.
    pub fn write_list<V: ToValue>(&mut self, key: &str, values: &[V]) -> Result<(), DocumentError> {
        let size = i32::try_from(values.len())
            .map_err(|_| DocumentError::ListTooLong { len: values.len() })?;
        self.in_room(&format!("{key}{LIST_SUFFIX}"), |doc| {
            doc.write(LIST_SIZE_KEY, size);
            for (i, value) in values.iter().enumerate() {
                doc.write(&format!("{LIST_ELEMENT_PREFIX}{i}"), value);
            }
        })?;
        Ok(())
    }

    /// Reads a list written by [`write_list`](Self::write_list). `Ok(None)`
    /// when the list room or one of its records is missing.
    pub fn read_list<T: FromValue>(&mut self, key: &str) -> Result<Option<Vec<T>>, AccessError> {
        let name = format!("{key}{LIST_SUFFIX}");
        let Some(room) = self.tree.child(self.cursor, &name) else {
            self.report_missing(&name);
            return Ok(None);
        };
        let saved = std::mem::replace(&mut self.cursor, room);
        let out = self.read_list_here();
        self.cursor = saved;
        out
    }

    fn read_list_here<T: FromValue>(&mut self) -> Result<Option<Vec<T>>, AccessError> {
        let Some(size_obj) = self.get(LIST_SIZE_KEY) else {
            return Ok(None);
        };
        let size = size_obj.as_i32()?;
        let size = usize::try_from(size).map_err(|_| AccessError::MalformedNumber {
            key: LIST_SIZE_KEY.to_string(),
            value: size.to_string(),
            requested: "list size",
        })?;
        // `size` is file data; only the records present can be collected.
        let mut values = Vec::with_capacity(size.min(self.tree.objects(self.cursor).len()));
        for i in 0..size {
            match self.read(&format!("{LIST_ELEMENT_PREFIX}{i}"))? {
                Some(v) => values.push(v),
                None => return Ok(None),
            }
        }
        Ok(Some(values))
    }

    /// Records first, then child rooms, both in stored order.
    pub fn list_current_room(&self) -> Vec<Entry> {
        let data = self.tree.objects(self.cursor).iter().map(|o| Entry {
            name: o.key().to_string(),
            kind: EntryKind::Data,
        });
        let rooms = self.tree.children(self.cursor).iter().map(|&c| Entry {
            name: self.tree.name(c).to_string(),
            kind: EntryKind::Room,
        });
        data.chain(rooms).collect()
    }

    fn report_missing(&mut self, key: &str) {
        if self.options.show_soft_errors {
            let path = format!("{}{}", self.current_path(), key);
            self.options.sink.report(&SoftError::MissingKey { path });
        }
    }

    // ---------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------

    /// Writes file info, every room path and every record with its tag.
    pub fn print_data<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let h = &self.header;
        writeln!(out, "File info:")?;
        writeln!(out, "{}", h.version)?;
        writeln!(out, "{}", h.updated)?;
        writeln!(out, "{}", h.api_creator)?;
        writeln!(out, "{}", h.file_creator)?;
        writeln!(out)?;

        let root = self.tree.root();
        let below = self.tree.descendants(root);
        writeln!(out, "Rooms:")?;
        for &room in &below {
            let path = self.tree.path(room);
            writeln!(out, "{}", path.trim_end_matches('/'))?;
        }
        writeln!(out)?;

        writeln!(out, "Data:")?;
        for room in std::iter::once(root).chain(below) {
            let path = self.tree.path(room);
            for o in self.tree.objects(room) {
                writeln!(out, "{}{} [{}]", path, o.key(), o.tag())?;
            }
        }
        Ok(())
    }

    /// Encodes the document into the sink (if opened for writing) and
    /// releases both streams.
    ///
    /// Streams are released even when encoding fails. Calling `close` again
    /// is a no-op.
    pub fn close(&mut self) -> Result<(), DocumentError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.source.take();
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };
        let header = Header::current(self.header.file_creator.clone());
        let mut writer = TextWriter::new(sink);
        write_document(&mut writer, &header, &self.tree)?;
        debug!("closed psf document ({} rooms)", self.tree.len());
        Ok(())
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("failed to write psf document on drop: {e}");
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("header", &self.header)
            .field("rooms", &self.tree.len())
            .field("cursor", &self.cursor)
            .field("writable", &self.sink.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{IDENTIFIER, VERSION};
    use anyhow::Result;
    use room::TypeTag;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn collecting() -> (Options, Arc<Mutex<Vec<SoftError>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = Arc::clone(&seen);
        let options = Options::default().with_sink(move |e: &SoftError| {
            handle.lock().unwrap().push(e.clone());
        });
        (options, seen)
    }

    // ---------------------- Write / read through files ----------------------

    #[test]
    fn create_close_open_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("save.psf");

        {
            let mut doc = Document::create_path(&path, Options::default().file_creator("tests"))?;
            doc.write("name", "alice");
            doc.write("age", 31i32);
            doc.enter_room("profile0")?;
            doc.write("score", 99.5f64);
            doc.write("active", true);
            doc.close()?;
        }

        let mut doc = Document::open_path(&path, Options::default())?;
        assert_eq!(doc.header().identifier, IDENTIFIER);
        assert_eq!(doc.header().version, VERSION);
        assert_eq!(doc.file_creator(), "tests");
        assert_eq!(doc.read::<String>("name")?, Some("alice".to_string()));
        assert_eq!(doc.read::<i32>("age")?, Some(31));
        doc.enter_room("profile0")?;
        assert_eq!(doc.read::<f64>("score")?, Some(99.5));
        assert_eq!(doc.read::<bool>("active")?, Some(true));
        Ok(())
    }

    #[test]
    fn drop_without_close_still_writes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("dropped.psf");
        {
            let mut doc = Document::create_path(&path, Options::default())?;
            doc.write("k", 'x');
        }
        let mut doc = Document::open_path(&path, Options::default())?;
        assert_eq!(doc.read::<char>("k")?, Some('x'));
        Ok(())
    }

    #[test]
    fn close_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("twice.psf");
        let mut doc = Document::create_path(&path, Options::default())?;
        doc.write("k", 1i8);
        doc.close()?;
        let len = fs::metadata(&path)?.len();
        doc.write("later", 2i8);
        doc.close()?;
        assert_eq!(fs::metadata(&path)?.len(), len);
        Ok(())
    }

    #[test]
    fn edit_preserves_file_creator_and_rewrites() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.psf");
        let output = dir.path().join("out.psf");
        {
            let mut doc = Document::create_path(&input, Options::default().file_creator("origin"))?;
            doc.write("a", 1i64);
            doc.close()?;
        }
        {
            let mut doc = Document::edit_path(&input, &output, Options::default())?;
            doc.write("b", 2i64);
            doc.close()?;
        }
        let mut doc = Document::open_path(&output, Options::default())?;
        assert_eq!(doc.file_creator(), "origin");
        assert_eq!(doc.read::<i64>("a")?, Some(1));
        assert_eq!(doc.read::<i64>("b")?, Some(2));
        Ok(())
    }

    #[test]
    fn set_file_creator_is_written_on_close() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("creator.psf");
        {
            let mut doc = Document::create_path(&path, Options::default())?;
            doc.set_file_creator("renamed");
            assert_eq!(doc.file_creator(), "renamed");
            doc.close()?;
        }
        let doc = Document::open_path(&path, Options::default())?;
        assert_eq!(doc.file_creator(), "renamed");
        Ok(())
    }

    #[test]
    fn open_rejects_foreign_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("foreign.psf");
        fs::write(&path, b"\x05hello")?;
        assert!(matches!(
            Document::open_path(&path, Options::default()),
            Err(DocumentError::FormatMismatch(id)) if id == "hello"
        ));
        Ok(())
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Document::open_path(dir.path().join("none.psf"), Options::default()),
            Err(DocumentError::Io(_))
        ));
    }

    // ---------------------- Soft errors ----------------------

    #[test]
    fn overwrite_reports_and_keeps_position() {
        let (options, seen) = collecting();
        let mut doc = Document::create(io::sink(), options);
        doc.enter_room("r").unwrap();
        doc.write("a", 1i32);
        doc.write("b", 2i32);
        doc.write("a", "one");

        let objects = doc.tree().objects(doc.current_room());
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key(), "a");
        assert_eq!(objects[0].tag(), TypeTag::String);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SoftError::DuplicateKeyOverwrite {
                path: "r/a".to_string()
            }]
        );
    }

    #[test]
    fn missing_key_reports_only_when_enabled() -> Result<()> {
        let (options, seen) = collecting();
        let mut doc = Document::create(io::sink(), options);
        assert_eq!(doc.read::<i32>("nope")?, None);
        doc.set_show_soft_errors(false);
        assert_eq!(doc.read::<i32>("quiet")?, None);
        assert!(doc.get_data_object("silent").is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SoftError::MissingKey {
                path: "nope".to_string()
            }]
        );
        Ok(())
    }

    #[test]
    fn add_data_object_is_silent() {
        let (options, seen) = collecting();
        let mut doc = Document::create(io::sink(), options);
        doc.add_data_object(DataObject::from_value("k", &1i32));
        doc.add_data_object(DataObject::from_value("k", &2i32));
        assert_eq!(doc.get_data_object("k").unwrap().value(), "2");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn type_guard_does_not_touch_tree() {
        let mut doc = Document::create(io::sink(), Options::default());
        doc.write("flag", true);
        doc.write("f", 1.5f32);
        assert!(matches!(
            doc.read::<i32>("flag"),
            Err(AccessError::TypeMismatch { .. })
        ));
        assert!(matches!(
            doc.read::<i32>("f"),
            Err(AccessError::DecimalNotIntegral { .. })
        ));
        assert_eq!(doc.get_data_object("flag").unwrap().value(), "true");
    }

    // ---------------------- Navigation ----------------------

    #[test]
    fn cursor_moves_only_on_request() -> Result<()> {
        let mut doc = Document::create(io::sink(), Options::default());
        let root = doc.current_room();
        doc.exit_room();
        assert_eq!(doc.current_room(), root);

        doc.enter_room("A")?;
        doc.enter_room("B")?;
        assert_eq!(doc.current_path(), "A/B/");
        doc.exit_all_rooms();
        assert_eq!(doc.current_room(), root);

        let inner = doc.in_room("C", |d| d.current_path())?;
        assert_eq!(inner, "C/");
        assert_eq!(doc.current_room(), root);
        Ok(())
    }

    #[test]
    fn in_room_restores_cursor_when_closure_panics() -> Result<()> {
        let mut doc = Document::create(io::sink(), Options::default());
        doc.enter_room("outer")?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            doc.in_room::<()>("inner", |_| panic!("closure failed"))
        }));
        assert!(outcome.is_err());
        assert_eq!(doc.current_path(), "outer/");
        Ok(())
    }

    #[test]
    fn entering_root_name_fails() {
        let mut doc = Document::create(io::sink(), Options::default());
        assert!(matches!(
            doc.enter_room(room::ROOT_NAME),
            Err(RoomError::ReservedName(_))
        ));
        assert!(doc.tree().is_root(doc.current_room()));
    }

    #[test]
    fn list_current_room_lists_data_then_rooms() -> Result<()> {
        let mut doc = Document::create(io::sink(), Options::default());
        doc.in_room("child", |_| ())?;
        doc.write("k", 1i16);
        assert_eq!(
            doc.list_current_room(),
            vec![
                Entry {
                    name: "k".to_string(),
                    kind: EntryKind::Data
                },
                Entry {
                    name: "child".to_string(),
                    kind: EntryKind::Room
                },
            ]
        );
        Ok(())
    }

    // ---------------------- Lists ----------------------

    #[test]
    fn list_round_trip() -> Result<()> {
        let mut doc = Document::create(io::sink(), Options::default());
        doc.write_list("scores", &[3i32, 1, 4])?;
        doc.write_list("names", &["a", "b"])?;
        doc.write_list::<f64>("none", &[])?;

        assert_eq!(doc.read_list::<i32>("scores")?, Some(vec![3, 1, 4]));
        assert_eq!(
            doc.read_list::<String>("names")?,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(doc.read_list::<f64>("none")?, Some(vec![]));
        assert!(doc.tree().is_root(doc.current_room()));
        Ok(())
    }

    #[test]
    fn missing_list_is_none() -> Result<()> {
        let (options, seen) = collecting();
        let mut doc = Document::create(io::sink(), options);
        assert_eq!(doc.read_list::<i32>("ghost")?, None);
        assert_eq!(doc.tree().len(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SoftError::MissingKey {
                path: "ghost_array".to_string()
            }]
        );
        Ok(())
    }

    #[test]
    fn oversized_list_size_reports_first_missing_element() -> Result<()> {
        let (options, seen) = collecting();
        let mut doc = Document::create(io::sink(), options);
        doc.in_room("big_array", |d| d.write("array_size", i32::MAX))?;

        assert_eq!(doc.read_list::<String>("big")?, None);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SoftError::MissingKey {
                path: "big_array/element_0".to_string()
            }]
        );
        Ok(())
    }

    #[derive(Clone)]
    struct Blank;

    impl ToValue for Blank {
        fn tag(&self) -> TypeTag {
            TypeTag::String
        }

        fn to_text(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn list_longer_than_i32_is_refused() {
        let mut doc = Document::create(io::sink(), Options::default());
        let values = vec![Blank; i32::MAX as usize + 1];
        assert!(matches!(
            doc.write_list("wide", &values),
            Err(DocumentError::ListTooLong { len }) if len == values.len()
        ));
        assert_eq!(doc.tree().len(), 1);
    }

    // ---------------------- Printing ----------------------

    #[test]
    fn print_data_lists_rooms_and_objects() -> Result<()> {
        let mut doc = Document::create(io::sink(), Options::default().file_creator("me"));
        doc.write("top", 1i32);
        doc.enter_room("A")?;
        doc.write("inner", "x");
        doc.enter_room("B")?;

        let mut out = Vec::new();
        doc.print_data(&mut out)?;
        let text = String::from_utf8(out)?;
        assert_eq!(
            text,
            "File info:\n3.1.3\n22w18\nSunnix\nme\n\n\
             Rooms:\nA\nA/B\n\n\
             Data:\ntop [INTEGER]\nA/inner [STRING]\n"
        );
        Ok(())
    }
}
