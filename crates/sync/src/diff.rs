use lexsync_primitives::{Snapshot, VersionChanges};

/// Outcome of comparing the last dispatched snapshot with the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
	/// Nothing was dispatched yet; a full reset is required.
	NoPriorSnapshot,
	/// Both sides are the same version; nothing to send.
	Unchanged,
	/// Version transitions connecting the two snapshots, oldest first.
	///
	/// Transitions that carried no edits are omitted, so an empty list means
	/// the version advanced without any content change.
	Delta(Vec<VersionChanges>),
	/// The snapshots are not connected by recorded history; a full reset is
	/// required and cached tokenization must be discarded.
	Incompatible,
}

impl DiffResult {
	/// Returns true when the caller must send the full content.
	pub fn needs_reset(&self) -> bool {
		matches!(self, Self::NoPriorSnapshot | Self::Incompatible)
	}
}

/// Computes deltas between snapshots from version-chain metadata only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffer;

impl SnapshotDiffer {
	/// Compares `from` (the last snapshot sent, if any) with `to`.
	pub fn diff(from: Option<&Snapshot>, to: &Snapshot) -> DiffResult {
		let Some(from) = from else {
			return DiffResult::NoPriorSnapshot;
		};
		if from.same_version(to) {
			return DiffResult::Unchanged;
		}
		match from.changes_to(to) {
			Some(mut versions) => {
				versions.retain(|v| !v.is_empty());
				DiffResult::Delta(versions)
			}
			None => DiffResult::Incompatible,
		}
	}
}
