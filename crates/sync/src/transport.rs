use std::sync::Arc;

use async_trait::async_trait;
use lexsync_primitives::FileUpdate;

use crate::Result;
use crate::document::DocumentId;

/// Channel to the background analyzer.
///
/// Implementations accept an update and return once the analyzer has taken
/// it, not once analysis finishes; results arrive later through the sync
/// state's parse and analysis callbacks. Returning [`Error::Cancelled`]
/// signals that the update was abandoned, which is not treated as a failure.
///
/// [`Error::Cancelled`]: crate::Error::Cancelled
#[async_trait]
pub trait AnalyzerTransport: Send + Sync {
	/// Hands `update` for `document` to the analyzer.
	async fn send_update(&self, document: DocumentId, update: FileUpdate) -> Result<()>;
}

/// Shared handle to a transport.
pub type SharedTransport = Arc<dyn AnalyzerTransport>;
