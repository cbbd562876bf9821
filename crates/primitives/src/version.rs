use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::change::VersionChanges;

/// Monotonically increasing version number of a document.
///
/// Never decreases for the lifetime of a document identity, including across
/// reloads that start a new lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentVersion(u64);

impl DocumentVersion {
	/// Version 0, the first observation of a lineage.
	pub const INITIAL: Self = Self(0);

	/// Wraps a raw version number.
	pub const fn new(number: u64) -> Self {
		Self(number)
	}

	/// Raw version number.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// The version after this one.
	pub const fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl fmt::Display for DocumentVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v{}", self.0)
	}
}

/// Identity of one chain of versions.
///
/// Snapshots from different lineages cannot be connected by recorded edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineageId(u64);

impl LineageId {
	/// Allocates a process-unique lineage id.
	pub fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	/// Raw id.
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for LineageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "L{}", self.0)
	}
}

/// Link from a version to its successor.
#[derive(Debug)]
pub(crate) struct VersionLink {
	pub(crate) changes: VersionChanges,
	pub(crate) version: Arc<TextVersion>,
}

/// One node of a lineage's version chain.
///
/// A node is linked to its successor exactly once, when the next edit is
/// recorded. Holding an old node keeps every later node reachable, which is
/// what lets a snapshot be diffed forward without touching text.
#[derive(Debug)]
pub struct TextVersion {
	lineage: LineageId,
	number: DocumentVersion,
	next: OnceLock<VersionLink>,
}

impl TextVersion {
	pub(crate) fn root(lineage: LineageId, number: DocumentVersion) -> Arc<Self> {
		Arc::new(Self {
			lineage,
			number,
			next: OnceLock::new(),
		})
	}

	/// Records `changes` as the transition to a freshly created successor.
	///
	/// Panics if this version already has a successor.
	pub(crate) fn link_next(&self, changes: VersionChanges) -> Arc<Self> {
		let next = Self::root(self.lineage, self.number.next());
		let linked = self.next.set(VersionLink {
			changes,
			version: next.clone(),
		});
		assert!(linked.is_ok(), "version {} of lineage {} already has a successor", self.number, self.lineage);
		next
	}

	/// Lineage this version belongs to.
	pub fn lineage(&self) -> LineageId {
		self.lineage
	}

	/// Version number.
	pub fn number(&self) -> DocumentVersion {
		self.number
	}

	/// Changes leading to the next version, if one has been recorded.
	pub fn changes(&self) -> Option<&VersionChanges> {
		self.next.get().map(|link| &link.changes)
	}

	/// The next version, if one has been recorded.
	pub fn next(&self) -> Option<&Arc<TextVersion>> {
		self.next.get().map(|link| &link.version)
	}
}

impl Drop for TextVersion {
	fn drop(&mut self) {
		// Unlink iteratively so long histories don't recurse on drop.
		let mut next = self.next.take();
		while let Some(link) = next {
			match Arc::try_unwrap(link.version) {
				Ok(mut version) => next = version.next.take(),
				Err(_) => break,
			}
		}
	}
}
