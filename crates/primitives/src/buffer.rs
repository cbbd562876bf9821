use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use ropey::{Rope, RopeSlice};

use crate::change::{ChangeInfo, VersionChanges};
use crate::version::{DocumentVersion, LineageId, TextVersion};
use crate::{CharIdx, CharLen};

/// Errors from applying edits to a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
	/// The edit range extends past the end of the text.
	#[error("edit {start}+{length} exceeds text length {len}")]
	OutOfBounds {
		/// Start of the rejected edit.
		start: CharIdx,
		/// Length of the rejected edit.
		length: CharLen,
		/// Text length at the time of the edit.
		len: CharLen,
	},
}

/// Immutable view of a document's content at one version.
///
/// Cloning is cheap: the text is a rope and the version node is shared.
#[derive(Clone)]
pub struct Snapshot {
	version: Arc<TextVersion>,
	text: Rope,
}

impl Snapshot {
	/// Version number of this snapshot.
	pub fn version(&self) -> DocumentVersion {
		self.version.number()
	}

	/// Lineage this snapshot belongs to.
	pub fn lineage(&self) -> LineageId {
		self.version.lineage()
	}

	/// The version-chain node backing this snapshot.
	pub fn text_version(&self) -> &Arc<TextVersion> {
		&self.version
	}

	/// Full text.
	pub fn text(&self) -> &Rope {
		&self.text
	}

	/// Number of lines, including the empty line after a trailing newline.
	pub fn line_count(&self) -> usize {
		self.text.len_lines()
	}

	/// Line `line` including its line break, if it exists.
	pub fn line(&self, line: usize) -> Option<RopeSlice<'_>> {
		(line < self.text.len_lines()).then(|| self.text.line(line))
	}

	/// Line containing char offset `offset`, clamped to the last line.
	pub fn char_to_line(&self, offset: CharIdx) -> usize {
		self.text.char_to_line(offset.min(self.text.len_chars()))
	}

	/// Returns true if `other` is the same version of the same lineage.
	pub fn same_version(&self, other: &Snapshot) -> bool {
		Arc::ptr_eq(&self.version, &other.version)
	}

	/// Recorded changes walking from this snapshot forward to `target`.
	///
	/// Reads only the version chain. Returns `None` when `target` is on
	/// another lineage or precedes this snapshot.
	pub fn changes_to(&self, target: &Snapshot) -> Option<Vec<VersionChanges>> {
		if self.lineage() != target.lineage() || target.version() < self.version() {
			return None;
		}

		let mut out = Vec::with_capacity((target.version().get() - self.version().get()) as usize);
		let mut current = &self.version;
		while current.number() < target.version() {
			out.push(current.changes()?.clone());
			current = current.next()?;
		}
		Arc::ptr_eq(current, &target.version).then_some(out)
	}

	/// Maps a char offset in this snapshot to the same logical position in `target`.
	///
	/// Returns `None` when the two snapshots are not connected by recorded edits.
	pub fn translate_offset(&self, offset: CharIdx, target: &Snapshot) -> Option<CharIdx> {
		let versions = self.changes_to(target)?;
		let mapped = versions
			.iter()
			.flat_map(|v| v.changes.iter())
			.fold(offset, |offset, change| change.map_offset(offset));
		Some(mapped.min(target.text.len_chars()))
	}
}

impl fmt::Debug for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Snapshot")
			.field("lineage", &self.lineage())
			.field("version", &self.version())
			.field("len_chars", &self.text.len_chars())
			.finish()
	}
}

struct BufferState {
	text: Rope,
	head: Arc<TextVersion>,
}

/// Editable text with a recorded version history.
///
/// Clones share the same underlying buffer.
#[derive(Clone)]
pub struct TextBuffer {
	state: Arc<Mutex<BufferState>>,
}

impl TextBuffer {
	/// Creates a buffer at version 0 of a fresh lineage.
	pub fn new(text: &str) -> Self {
		Self {
			state: Arc::new(Mutex::new(BufferState {
				text: Rope::from(text),
				head: TextVersion::root(LineageId::next(), DocumentVersion::INITIAL),
			})),
		}
	}

	/// Snapshot of the current content.
	pub fn current_snapshot(&self) -> Snapshot {
		let state = self.state.lock();
		Snapshot {
			version: state.head.clone(),
			text: state.text.clone(),
		}
	}

	/// Current version number.
	pub fn version(&self) -> DocumentVersion {
		self.state.lock().head.number()
	}

	/// Current lineage.
	pub fn lineage(&self) -> LineageId {
		self.state.lock().head.lineage()
	}

	/// Applies `changes` in order as one version transition.
	///
	/// Either every change applies or the buffer is left untouched. An empty
	/// batch still advances the version.
	pub fn apply(&self, changes: Vec<ChangeInfo>) -> Result<Snapshot, EditError> {
		let mut state = self.state.lock();
		let mut text = state.text.clone();
		let changes = VersionChanges::new(changes);
		changes.apply(&mut text)?;

		let head = state.head.link_next(changes);
		state.head = head.clone();
		state.text = text.clone();
		Ok(Snapshot { version: head, text })
	}

	/// Replaces the content wholesale, starting a new lineage.
	///
	/// The version number continues from the current head.
	pub fn reload(&self, text: &str) -> Snapshot {
		let mut state = self.state.lock();
		let head = TextVersion::root(LineageId::next(), state.head.number().next());
		state.head = head.clone();
		state.text = Rope::from(text);
		Snapshot {
			version: head,
			text: state.text.clone(),
		}
	}

	/// Returns true if both handles refer to the same buffer.
	pub fn ptr_eq(&self, other: &TextBuffer) -> bool {
		Arc::ptr_eq(&self.state, &other.state)
	}
}

impl fmt::Debug for TextBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("TextBuffer")
			.field("lineage", &state.head.lineage())
			.field("version", &state.head.number())
			.finish()
	}
}
