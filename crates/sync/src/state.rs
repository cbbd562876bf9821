use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use arc_swap::ArcSwapOption;
use lexsync_primitives::{DocumentVersion, FileUpdate, Snapshot};
use lexsync_tokens::{LineTokenCache, SharedTokenCache};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::SyncConfig;
use crate::diff::{DiffResult, SnapshotDiffer};
use crate::document::{Document, DocumentId};
use crate::events::{DocumentEvent, DocumentEventKind};
use crate::transport::SharedTransport;
use crate::{Error, Result};

/// `last_analyzed` before any analysis completed.
const NEVER_ANALYZED: i64 = -1;

/// Synchronization state of one document with the analyzer.
///
/// Content-change dispatch is serialized per document: a dispatch holds the
/// dispatch gate from reading the current snapshot until the transport has
/// accepted the update, so updates reach the transport one at a time and in
/// version order. The last-sent snapshot is swapped atomically before the
/// transport call is awaited, so a cancelled or failed send leaves it
/// describing what was intended; the next diff repairs any gap.
pub struct DocumentSyncState {
	id: DocumentId,
	config: SyncConfig,
	transport: SharedTransport,
	/// Bound document, replaced wholesale on rebind.
	document: ArcSwapOption<Document>,
	/// Snapshot most recently handed to the transport.
	last_sent: ArcSwapOption<Snapshot>,
	/// Last analyzed version, or [`NEVER_ANALYZED`].
	last_analyzed: AtomicI64,
	/// Snapshot of the last analyzed version, for position mapping.
	analysis_cookie: ArcSwapOption<Snapshot>,
	tokens: SharedTokenCache,
	dispatch: Mutex<()>,
	events: broadcast::Sender<DocumentEvent>,
	cancel: CancellationToken,
	disposed: AtomicBool,
}

impl DocumentSyncState {
	/// Creates an unbound sync state.
	pub fn new(id: DocumentId, transport: SharedTransport, config: SyncConfig) -> Self {
		let (events, _) = broadcast::channel(config.event_capacity.max(1));
		Self {
			id,
			config,
			transport,
			document: ArcSwapOption::empty(),
			last_sent: ArcSwapOption::empty(),
			last_analyzed: AtomicI64::new(NEVER_ANALYZED),
			analysis_cookie: ArcSwapOption::empty(),
			tokens: LineTokenCache::shared(),
			dispatch: Mutex::new(()),
			events,
			cancel: CancellationToken::new(),
			disposed: AtomicBool::new(false),
		}
	}

	/// Document identity.
	pub fn id(&self) -> DocumentId {
		self.id
	}

	/// Currently bound document.
	pub fn document(&self) -> Option<Arc<Document>> {
		self.document.load_full()
	}

	/// Snapshot most recently handed to the transport.
	pub fn last_sent(&self) -> Option<Arc<Snapshot>> {
		self.last_sent.load_full()
	}

	/// Last version the analyzer reported as analyzed.
	pub fn last_analyzed_version(&self) -> Option<DocumentVersion> {
		let raw = self.last_analyzed.load(Ordering::Acquire);
		u64::try_from(raw).ok().map(DocumentVersion::new)
	}

	/// Returns true once any version has been analyzed since the last bind.
	pub fn is_analyzed(&self) -> bool {
		self.last_analyzed.load(Ordering::Acquire) >= 0
	}

	/// Snapshot of the last analyzed version.
	///
	/// Positions reported by the analyzer refer to this snapshot; map them to
	/// the live buffer with [`Snapshot::translate_offset`].
	pub fn analysis_cookie(&self) -> Option<Arc<Snapshot>> {
		self.analysis_cookie.load_full()
	}

	/// Token cache for this document, shared with highlighting consumers.
	///
	/// Cleared whenever the document is rebound or its lineage changes.
	pub fn token_cache(&self) -> &SharedTokenCache {
		&self.tokens
	}

	/// Subscribes to this document's events.
	pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
		self.events.subscribe()
	}

	/// Token cancelled when this state is disposed.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Returns true after [`dispose`](Self::dispose).
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// Binds `document`, forcing the next dispatch to be a full reset.
	///
	/// Waits for any in-flight dispatch to finish first.
	pub async fn bind(&self, document: Document) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		let _gate = self.dispatch.lock().await;
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		debug!(document = %self.id, moniker = %document.moniker(), version = %document.version(), "binding document");
		self.document.store(Some(Arc::new(document)));
		self.last_sent.store(None);
		self.last_analyzed.store(NEVER_ANALYZED, Ordering::Release);
		self.analysis_cookie.store(None);
		self.tokens.write().clear();
		Ok(())
	}

	/// Sends the analyzer whatever changed since the last dispatch.
	///
	/// Returns the version dispatched, or `None` when there was nothing to
	/// send or the send was cancelled. Concurrent calls queue behind the one
	/// in flight. Transport failures other than cancellation are returned;
	/// nothing is retried here.
	pub async fn on_content_changed(&self) -> Result<Option<DocumentVersion>> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		let _gate = self.dispatch.lock().await;
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		let document = self.document.load_full().ok_or(Error::Unbound)?;
		let current = document.current_snapshot();
		let version = current.version();

		let previous = self.last_sent.load_full();
		let update = match SnapshotDiffer::diff(previous.as_deref(), &current) {
			DiffResult::Unchanged => return Ok(None),
			DiffResult::Delta(versions) if versions.is_empty() && !self.config.announce_empty_deltas => {
				trace!(document = %self.id, %version, "version advanced without content change, skipping");
				return Ok(None);
			}
			DiffResult::Delta(versions) => FileUpdate::Changes { version, versions },
			DiffResult::NoPriorSnapshot => FileUpdate::Reset {
				version,
				content: current.text().to_string(),
			},
			DiffResult::Incompatible => {
				debug!(document = %self.id, %version, "snapshot lineage changed, resetting");
				self.tokens.write().clear();
				FileUpdate::Reset {
					version,
					content: current.text().to_string(),
				}
			}
		};

		let released = self.last_sent.swap(Some(Arc::new(current)));
		drop(released);
		debug!(
			document = %self.id,
			%version,
			kind = if update.is_reset() { "reset" } else { "changes" },
			"dispatching update"
		);

		let result = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			result = self.transport.send_update(self.id, update) => result,
		};
		if self.is_disposed() {
			self.last_sent.store(None);
		}

		match result {
			Ok(()) => Ok(Some(version)),
			Err(Error::Cancelled) => {
				debug!(document = %self.id, %version, "dispatch cancelled");
				Ok(None)
			}
			Err(error) => {
				warn!(document = %self.id, %version, %error, "dispatch failed");
				Err(error)
			}
		}
	}

	/// Records that a parse tree for `snapshot` is ready.
	///
	/// Returns false without changing anything when `snapshot` is older than
	/// the last snapshot sent.
	pub fn on_parse_complete(&self, snapshot: &Snapshot) -> bool {
		if self.is_disposed() {
			return false;
		}
		if let Some(sent) = self.last_sent.load().as_deref()
			&& snapshot.version() < sent.version()
		{
			trace!(document = %self.id, stale = %snapshot.version(), current = %sent.version(), "ignoring stale parse");
			return false;
		}
		self.emit(DocumentEventKind::ParseComplete);
		true
	}

	/// Records that `snapshot` has been analyzed. The last call wins.
	///
	/// Ignored once disposed.
	pub fn on_analysis_complete(&self, snapshot: &Snapshot) {
		if self.is_disposed() {
			return;
		}
		let version = snapshot.version();
		self.last_analyzed.store(i64::try_from(version.get()).unwrap_or(i64::MAX), Ordering::Release);
		self.analysis_cookie.store(Some(Arc::new(snapshot.clone())));
		if self.is_disposed() {
			self.analysis_cookie.store(None);
			return;
		}
		trace!(document = %self.id, %version, "analysis complete");
		self.emit(DocumentEventKind::AnalysisComplete);
	}

	/// Releases the document and last-sent snapshot, cancels any in-flight
	/// dispatch and publishes [`DocumentEventKind::Disposed`]. Idempotent.
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.cancel.cancel();
		self.document.store(None);
		self.last_sent.store(None);
		self.analysis_cookie.store(None);
		debug!(document = %self.id, "disposed");
		self.emit(DocumentEventKind::Disposed);
	}

	fn emit(&self, kind: DocumentEventKind) {
		let event = DocumentEvent { document: self.id, kind };
		if self.events.send(event).is_err() {
			trace!(document = %self.id, ?kind, "no event subscribers");
		}
	}
}

impl fmt::Debug for DocumentSyncState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentSyncState")
			.field("id", &self.id)
			.field("bound", &self.document.load().is_some())
			.field("last_sent", &self.last_sent.load().as_deref().map(Snapshot::version))
			.field("last_analyzed", &self.last_analyzed_version())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}
