//! Core types for incremental document synchronization: versions, snapshots and change records.

/// Versioned text buffer and immutable snapshots.
pub mod buffer;
/// Wire-level change records and update messages.
pub mod change;
/// Version identities and the per-lineage version chain.
pub mod version;

pub use buffer::{EditError, Snapshot, TextBuffer};
pub use change::{ChangeInfo, FileUpdate, VersionChanges};
pub use ropey::{Rope, RopeSlice};
pub use version::{DocumentVersion, LineageId, TextVersion};

/// A position in the text, measured in characters (not bytes).
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
pub type CharLen = usize;
