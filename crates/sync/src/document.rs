use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use lexsync_primitives::{ChangeInfo, DocumentVersion, Snapshot, TextBuffer};

use crate::Result;

/// Identity of a document open against the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "doc#{}", self.0)
	}
}

/// A document whose content lives in a file on disk.
#[derive(Debug, Clone)]
pub struct FileBackedDocument {
	path: PathBuf,
	buffer: TextBuffer,
}

impl FileBackedDocument {
	/// Reads `path` into a fresh buffer.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let text = std::fs::read_to_string(&path)?;
		Ok(Self {
			buffer: TextBuffer::new(&text),
			path,
		})
	}

	/// Path of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The buffer holding the file's content.
	pub fn buffer(&self) -> &TextBuffer {
		&self.buffer
	}

	/// Re-reads the file, starting a new lineage.
	pub fn reload(&self) -> Result<Snapshot> {
		let text = std::fs::read_to_string(&self.path)?;
		tracing::debug!(path = %self.path.display(), "reloaded document from disk");
		Ok(self.buffer.reload(&text))
	}
}

/// A document backed by a buffer the editor owns and edits.
#[derive(Debug, Clone)]
pub struct BufferBackedDocument {
	moniker: String,
	buffer: TextBuffer,
}

impl BufferBackedDocument {
	/// Wraps an editor buffer. Clones of `buffer` keep editing the same content.
	pub fn new(moniker: impl Into<String>, buffer: TextBuffer) -> Self {
		Self {
			moniker: moniker.into(),
			buffer,
		}
	}

	/// The shared editor buffer.
	pub fn buffer(&self) -> &TextBuffer {
		&self.buffer
	}
}

/// A document that exists only in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
	moniker: String,
	buffer: TextBuffer,
}

impl InMemoryDocument {
	/// Creates a document holding `text` at version 0.
	pub fn new(moniker: impl Into<String>, text: &str) -> Self {
		Self {
			moniker: moniker.into(),
			buffer: TextBuffer::new(text),
		}
	}

	/// Applies edits as one version transition.
	pub fn edit(&self, changes: Vec<ChangeInfo>) -> Result<Snapshot> {
		Ok(self.buffer.apply(changes)?)
	}

	/// Replaces the content wholesale, starting a new lineage.
	pub fn replace(&self, text: &str) -> Snapshot {
		self.buffer.reload(text)
	}
}

/// The kinds of document the sync pipeline can be bound to.
#[derive(Debug, Clone)]
pub enum Document {
	/// Content read from a file.
	File(FileBackedDocument),
	/// Content owned by an editor buffer.
	Buffer(BufferBackedDocument),
	/// Content with no backing store.
	InMemory(InMemoryDocument),
}

impl Document {
	/// Human-readable name: the file path or the caller-supplied moniker.
	pub fn moniker(&self) -> Cow<'_, str> {
		match self {
			Self::File(doc) => doc.path.to_string_lossy(),
			Self::Buffer(doc) => Cow::Borrowed(&doc.moniker),
			Self::InMemory(doc) => Cow::Borrowed(&doc.moniker),
		}
	}

	/// The buffer providing snapshots.
	pub fn buffer(&self) -> &TextBuffer {
		match self {
			Self::File(doc) => &doc.buffer,
			Self::Buffer(doc) => &doc.buffer,
			Self::InMemory(doc) => &doc.buffer,
		}
	}

	/// Snapshot of the current content.
	pub fn current_snapshot(&self) -> Snapshot {
		self.buffer().current_snapshot()
	}

	/// Current version number. Never decreases.
	pub fn version(&self) -> DocumentVersion {
		self.buffer().version()
	}
}

impl From<FileBackedDocument> for Document {
	fn from(doc: FileBackedDocument) -> Self {
		Self::File(doc)
	}
}

impl From<BufferBackedDocument> for Document {
	fn from(doc: BufferBackedDocument) -> Self {
		Self::Buffer(doc)
	}
}

impl From<InMemoryDocument> for Document {
	fn from(doc: InMemoryDocument) -> Self {
		Self::InMemory(doc)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use crate::Error;

	#[test]
	fn test_file_document_reload_starts_new_lineage() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "a=1").unwrap();

		let doc = FileBackedDocument::open(file.path()).unwrap();
		let before = doc.buffer().current_snapshot();
		assert_eq!(before.text().to_string(), "a=1\n");

		std::fs::write(file.path(), "a=2\n").unwrap();
		let after = doc.reload().unwrap();
		assert_eq!(after.text().to_string(), "a=2\n");
		assert_ne!(after.lineage(), before.lineage());
		assert!(after.version() > before.version());

		let doc = Document::from(doc);
		assert_eq!(doc.moniker(), file.path().to_string_lossy());
		assert_eq!(doc.version(), after.version());
	}

	#[test]
	fn test_missing_file_is_io_error() {
		let err = FileBackedDocument::open("/nonexistent/lexsync/missing.py").unwrap_err();
		assert!(matches!(err, Error::Io(_)), "{err:?}");
	}

	#[test]
	fn test_buffer_document_sees_editor_edits() {
		let editor = TextBuffer::new("x = 1\n");
		let doc = Document::from(BufferBackedDocument::new("untitled-1", editor.clone()));
		assert_eq!(doc.moniker(), "untitled-1");

		editor.apply(vec![ChangeInfo::insert(0, "# hi\n")]).unwrap();
		assert_eq!(doc.version(), DocumentVersion::new(1));
		assert_eq!(doc.current_snapshot().text().to_string(), "# hi\nx = 1\n");
	}

	#[test]
	fn test_in_memory_document_edit_and_replace() {
		let doc = InMemoryDocument::new("scratch", "abc");
		let v1 = doc.edit(vec![ChangeInfo::insert(3, "d")]).unwrap();
		assert_eq!(v1.text().to_string(), "abcd");

		let err = doc.edit(vec![ChangeInfo::delete(10, 1)]).unwrap_err();
		assert!(matches!(err, Error::Edit(_)), "{err:?}");

		let v2 = doc.replace("xyz");
		assert_ne!(v2.lineage(), v1.lineage());
		assert_eq!(Document::from(doc).current_snapshot().text().to_string(), "xyz");
	}
}
