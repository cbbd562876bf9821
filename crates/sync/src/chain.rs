use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::events::DocumentEventKind;
use crate::state::DocumentSyncState;

/// A running forward from a predecessor document's events to a successor.
///
/// The link ends on its own when the predecessor is disposed or dropped, or
/// when the successor is disposed or dropped. Dropping the `ChainLink` does
/// not end it; call [`unlink`](Self::unlink).
#[derive(Debug)]
pub struct ChainLink {
	cancel: CancellationToken,
	task: JoinHandle<()>,
}

impl ChainLink {
	/// Stops forwarding. Idempotent.
	pub fn unlink(&self) {
		self.cancel.cancel();
	}

	/// Returns true while the forwarding task is running.
	pub fn is_linked(&self) -> bool {
		!self.task.is_finished()
	}

	/// Waits for the forwarding task to end.
	pub async fn finished(self) {
		if let Err(error) = self.task.await {
			warn!(%error, "chain task failed");
		}
	}
}

/// Re-syncs `successor` whenever `predecessor` completes analysis, and once
/// more when `predecessor` is disposed.
///
/// Only a weak reference to `successor` is held. Must be called from within
/// a tokio runtime.
pub fn chain(predecessor: &DocumentSyncState, successor: &Arc<DocumentSyncState>) -> ChainLink {
	let mut events = predecessor.subscribe();
	let from = predecessor.id();
	let to = successor.id();
	let weak = Arc::downgrade(successor);
	let cancel = successor.cancellation().child_token();
	let token = cancel.clone();

	debug!(%from, %to, "chaining documents");
	let task = tokio::spawn(async move {
		loop {
			let received = tokio::select! {
				biased;
				_ = token.cancelled() => break,
				received = events.recv() => received,
			};
			let kind = match received {
				Ok(event) => event.kind,
				Err(RecvError::Lagged(skipped)) => {
					debug!(%from, %to, skipped, "chain lagged, re-syncing");
					DocumentEventKind::AnalysisComplete
				}
				Err(RecvError::Closed) => break,
			};
			if kind == DocumentEventKind::ParseComplete {
				continue;
			}

			let Some(successor) = weak.upgrade() else {
				break;
			};
			trace!(%from, %to, ?kind, "predecessor event, re-syncing successor");
			if let Err(error) = successor.on_content_changed().await {
				warn!(%from, %to, %error, "chained re-sync failed");
			}
			if kind == DocumentEventKind::Disposed {
				break;
			}
		}
		debug!(%from, %to, "chain unlinked");
	});

	ChainLink { cancel, task }
}
