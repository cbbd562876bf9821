//! Documents open against one analyzer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::Result;
use crate::config::SyncConfig;
use crate::document::{Document, DocumentId};
use crate::state::DocumentSyncState;
use crate::transport::SharedTransport;

/// Open documents keyed by [`DocumentId`], all sharing one transport.
pub struct DocumentRegistry {
	transport: SharedTransport,
	config: SyncConfig,
	next_id: AtomicU64,
	documents: RwLock<HashMap<DocumentId, Arc<DocumentSyncState>>>,
}

impl DocumentRegistry {
	/// Creates an empty registry.
	pub fn new(transport: SharedTransport, config: SyncConfig) -> Self {
		Self {
			transport,
			config,
			next_id: AtomicU64::new(1),
			documents: RwLock::new(HashMap::new()),
		}
	}

	/// Opens `document` under a fresh id and binds it.
	///
	/// Nothing is sent until the caller reports a content change.
	pub async fn open(&self, document: Document) -> Result<Arc<DocumentSyncState>> {
		let id = DocumentId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let state = Arc::new(DocumentSyncState::new(id, self.transport.clone(), self.config.clone()));
		state.bind(document).await?;
		self.documents.write().insert(id, state.clone());
		debug!(document = %id, "opened");
		Ok(state)
	}

	/// Sync state of an open document.
	pub fn get(&self, id: DocumentId) -> Option<Arc<DocumentSyncState>> {
		self.documents.read().get(&id).cloned()
	}

	/// Closes and disposes a document. Returns false if it was not open.
	pub fn close(&self, id: DocumentId) -> bool {
		let Some(state) = self.documents.write().remove(&id) else {
			return false;
		};
		state.dispose();
		true
	}

	/// Ids of every open document, in opening order.
	pub fn ids(&self) -> Vec<DocumentId> {
		let mut ids: Vec<_> = self.documents.read().keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// Number of open documents.
	pub fn len(&self) -> usize {
		self.documents.read().len()
	}

	/// Returns true if no documents are open.
	pub fn is_empty(&self) -> bool {
		self.documents.read().is_empty()
	}
}

impl Drop for DocumentRegistry {
	fn drop(&mut self) {
		for (_, state) in self.documents.get_mut().drain() {
			state.dispose();
		}
	}
}
