//! Incremental synchronization of edited documents with a background analyzer.
//!
//! A [`DocumentSyncState`] tracks the last snapshot handed to the analyzer and
//! turns each content change into either a full reset or a delta chain
//! computed by [`SnapshotDiffer`] from recorded version history. At most one
//! update per document is in flight at a time, and analyzer callbacks are
//! published as [`DocumentEvent`]s on a broadcast channel.
//!
//! Documents open against one analyzer are tracked by a [`DocumentRegistry`];
//! a document that supersedes another can re-sync whenever its predecessor
//! finishes analysis via [`chain`].

use std::io;

use lexsync_primitives::EditError;

/// Forwarding of a predecessor's events into a successor re-sync.
pub mod chain;
/// Configuration loaded from TOML.
pub mod config;
/// Delta computation between snapshots.
pub mod diff;
/// The closed set of document kinds.
pub mod document;
/// Document lifecycle events.
pub mod events;
/// Open documents keyed by id.
pub mod registry;
/// Per-document sync state machine.
pub mod state;
/// Analyzer transport abstraction.
pub mod transport;

#[cfg(test)]
mod testing;

pub use chain::{ChainLink, chain};
pub use config::SyncConfig;
pub use diff::{DiffResult, SnapshotDiffer};
pub use document::{BufferBackedDocument, Document, DocumentId, FileBackedDocument, InMemoryDocument};
pub use events::{DocumentEvent, DocumentEventKind};
pub use registry::DocumentRegistry;
pub use state::DocumentSyncState;
pub use transport::{AnalyzerTransport, SharedTransport};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The transport call was cancelled. Never escapes a content-change dispatch.
	#[error("operation cancelled")]
	Cancelled,
	/// The analyzer transport failed to accept an update.
	#[error("transport error: {0}")]
	Transport(String),
	/// No document is bound to the sync state.
	#[error("no document bound")]
	Unbound,
	/// The sync state has been disposed.
	#[error("document sync state disposed")]
	Disposed,
	/// Reading a file-backed document or config file failed.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// A config file did not parse.
	#[error("invalid config: {0}")]
	Config(#[from] toml::de::Error),
	/// An edit did not apply to the document.
	#[error("{0}")]
	Edit(#[from] EditError),
}
