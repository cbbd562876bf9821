use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::buffer::EditError;
use crate::version::DocumentVersion;
use crate::{CharIdx, CharLen};

/// A single minimal edit: replace `length` chars at `start` with `new_text`.
///
/// Offsets are char indices into the text as it stands when the change is
/// applied, so later changes in the same [`VersionChanges`] see the effect of
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
	/// Char offset where the replaced range begins.
	pub start: CharIdx,
	/// Number of chars removed.
	pub length: CharLen,
	/// Text inserted in place of the removed range.
	pub new_text: String,
}

impl ChangeInfo {
	/// Creates a replacement of `length` chars at `start`.
	pub fn new(start: CharIdx, length: CharLen, new_text: impl Into<String>) -> Self {
		Self {
			start,
			length,
			new_text: new_text.into(),
		}
	}

	/// Creates a pure insertion at `start`.
	pub fn insert(start: CharIdx, text: impl Into<String>) -> Self {
		Self::new(start, 0, text)
	}

	/// Creates a pure deletion of `length` chars at `start`.
	pub fn delete(start: CharIdx, length: CharLen) -> Self {
		Self::new(start, length, String::new())
	}

	/// Exclusive end of the replaced range in pre-change coordinates.
	///
	/// `None` if the range overflows `usize`.
	#[inline]
	pub fn end(&self) -> Option<CharIdx> {
		self.start.checked_add(self.length)
	}

	/// Length of the inserted text in chars.
	#[inline]
	pub fn new_len(&self) -> CharLen {
		self.new_text.chars().count()
	}

	/// Applies the change to `text` in place.
	///
	/// The rope is left untouched when the range does not fit.
	pub fn apply(&self, text: &mut Rope) -> Result<(), EditError> {
		let len = text.len_chars();
		let end = self.end().filter(|&end| end <= len).ok_or(EditError::OutOfBounds {
			start: self.start,
			length: self.length,
			len,
		})?;
		if self.length > 0 {
			text.remove(self.start..end);
		}
		if !self.new_text.is_empty() {
			text.insert(self.start, &self.new_text);
		}
		Ok(())
	}

	/// Maps a char offset from before this change to after it.
	///
	/// Offsets inside the replaced range snap to its start; an offset sitting
	/// exactly at the change start stays in front of the inserted text.
	pub fn map_offset(&self, offset: CharIdx) -> CharIdx {
		if offset <= self.start {
			offset
		} else if self.end().is_some_and(|end| offset >= end) {
			(offset - self.length).saturating_add(self.new_len())
		} else {
			self.start
		}
	}
}

/// The ordered edits recorded while advancing one version to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChanges {
	/// Edits in application order.
	pub changes: Vec<ChangeInfo>,
}

impl VersionChanges {
	/// Wraps an ordered list of edits.
	pub fn new(changes: Vec<ChangeInfo>) -> Self {
		Self { changes }
	}

	/// Returns true if the transition carried no content change.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Applies every edit in order.
	pub fn apply(&self, text: &mut Rope) -> Result<(), EditError> {
		self.changes.iter().try_for_each(|change| change.apply(text))
	}
}

impl From<Vec<ChangeInfo>> for VersionChanges {
	fn from(changes: Vec<ChangeInfo>) -> Self {
		Self::new(changes)
	}
}

/// Update message handed to the analyzer transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileUpdate {
	/// Full content replacement.
	Reset {
		/// Version the content belongs to.
		version: DocumentVersion,
		/// Complete document text.
		content: String,
	},
	/// Delta chain from the previously sent version.
	Changes {
		/// Version reached after applying every entry of `versions`.
		version: DocumentVersion,
		/// One entry per version transition, oldest first.
		versions: Vec<VersionChanges>,
	},
}

impl FileUpdate {
	/// Version the analyzer holds after processing this update.
	pub fn version(&self) -> DocumentVersion {
		match self {
			Self::Reset { version, .. } | Self::Changes { version, .. } => *version,
		}
	}

	/// Returns true for a full-content reset.
	pub fn is_reset(&self) -> bool {
		matches!(self, Self::Reset { .. })
	}
}
