use std::sync::Arc;

use parking_lot::RwLock;

use crate::token::LineTokenization;

/// A token cache shared between its single writer and highlighting readers.
pub type SharedTokenCache = Arc<RwLock<LineTokenCache>>;

/// Line-indexed cache of tokenization results.
///
/// Absent entries have not been tokenized (or were invalidated by an edit).
/// Indexing past [`capacity`](Self::capacity) is a caller bug and panics;
/// call [`ensure_capacity`](Self::ensure_capacity) with the document's line
/// count first.
#[derive(Debug, Default)]
pub struct LineTokenCache {
	map: Vec<Option<Arc<LineTokenization>>>,
}

impl LineTokenCache {
	/// Creates an empty cache with zero capacity.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty cache wrapped for sharing.
	pub fn shared() -> SharedTokenCache {
		Arc::new(RwLock::new(Self::new()))
	}

	/// Number of addressable lines.
	pub fn capacity(&self) -> usize {
		self.map.len()
	}

	/// Grows the cache to address at least `lines` lines. Never shrinks.
	pub fn ensure_capacity(&mut self, lines: usize) {
		let len = self.map.len();
		if len == 0 {
			self.map.resize(lines, None);
		} else if len < lines {
			self.map.resize(lines.max((len + 1) * 2), None);
		}
	}

	/// Cached tokenization of `line`.
	pub fn get(&self, line: usize) -> Option<&Arc<LineTokenization>> {
		self.check_line(line);
		self.map[line].as_ref()
	}

	/// Nearest cached line strictly before `line` and at or after `min_line`.
	///
	/// This is the restart point for incremental re-lexing: tokenizing can
	/// resume from the returned entry's continuation state instead of line 0.
	pub fn index_of_previous_tokenization(&self, line: usize, min_line: usize) -> Option<(usize, &Arc<LineTokenization>)> {
		assert!(line <= self.map.len(), "line {line} out of range for token cache of {} lines", self.map.len());
		(min_line..line)
			.rev()
			.find_map(|index| self.map[index].as_ref().map(|tokenization| (index, tokenization)))
	}

	/// Stores the tokenization of `line`.
	pub fn set(&mut self, line: usize, tokenization: Arc<LineTokenization>) {
		self.check_line(line);
		self.map[line] = Some(tokenization);
	}

	/// Marks `line` as not tokenized.
	pub fn invalidate(&mut self, line: usize) {
		self.check_line(line);
		self.map[line] = None;
	}

	/// Removes `count` lines at `start`, shifting later entries down.
	///
	/// The last `count` slots become absent.
	pub fn delete_lines(&mut self, start: usize, count: usize) {
		let len = self.map.len();
		assert!(
			start.checked_add(count).is_some_and(|end| end <= len),
			"cannot delete {count} lines at {start} from token cache of {len} lines"
		);
		self.map.drain(start..start + count);
		self.map.resize(len, None);
	}

	/// Inserts `count` absent lines at `start`, shifting later entries up.
	///
	/// Capacity is unchanged: the last `count` entries fall off the end.
	pub fn insert_lines(&mut self, start: usize, count: usize) {
		let len = self.map.len();
		assert!(
			start.checked_add(count).is_some_and(|end| end <= len),
			"cannot insert {count} lines at {start} into token cache of {len} lines"
		);
		self.map.truncate(len - count);
		self.map.splice(start..start, std::iter::repeat_n(None, count));
	}

	/// Drops every entry and the backing storage.
	pub fn clear(&mut self) {
		self.map = Vec::new();
	}

	/// Number of populated entries.
	pub fn populated(&self) -> usize {
		self.map.iter().filter(|entry| entry.is_some()).count()
	}

	#[inline]
	fn check_line(&self, line: usize) {
		assert!(line < self.map.len(), "line {line} out of range for token cache of {} lines", self.map.len());
	}
}
