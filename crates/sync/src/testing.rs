use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lexsync_primitives::{FileUpdate, Rope};
use parking_lot::Mutex;

use crate::document::DocumentId;
use crate::transport::AnalyzerTransport;
use crate::{Error, Result};

/// How [`RecordingTransport`] answers the next updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
	Accept,
	Fail,
	Cancel,
	Hang,
}

/// Transport that records accepted updates and tracks send concurrency.
pub(crate) struct RecordingTransport {
	updates: Mutex<Vec<(DocumentId, FileUpdate)>>,
	mode: Mutex<Mode>,
	delay: Option<Duration>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

impl RecordingTransport {
	pub(crate) fn new() -> Arc<Self> {
		Self::build(None)
	}

	pub(crate) fn with_delay(delay: Duration) -> Arc<Self> {
		Self::build(Some(delay))
	}

	fn build(delay: Option<Duration>) -> Arc<Self> {
		Arc::new(Self {
			updates: Mutex::new(Vec::new()),
			mode: Mutex::new(Mode::Accept),
			delay,
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		})
	}

	pub(crate) fn set_mode(&self, mode: Mode) {
		*self.mode.lock() = mode;
	}

	pub(crate) fn updates(&self) -> Vec<(DocumentId, FileUpdate)> {
		self.updates.lock().clone()
	}

	pub(crate) fn versions(&self) -> Vec<u64> {
		self.updates.lock().iter().map(|(_, update)| update.version().get()).collect()
	}

	pub(crate) fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	pub(crate) fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	/// Text the analyzer would hold after applying every accepted update in order.
	pub(crate) fn replay(&self) -> Rope {
		let mut text = Rope::new();
		for (_, update) in self.updates.lock().iter() {
			match update {
				FileUpdate::Reset { content, .. } => text = Rope::from(content.as_str()),
				FileUpdate::Changes { versions, .. } => {
					for version in versions {
						version.apply(&mut text).unwrap();
					}
				}
			}
		}
		text
	}
}

#[async_trait]
impl AnalyzerTransport for RecordingTransport {
	async fn send_update(&self, document: DocumentId, update: FileUpdate) -> Result<()> {
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(now, Ordering::SeqCst);
		let mode = *self.mode.lock();
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		let result = match mode {
			Mode::Accept => {
				self.updates.lock().push((document, update));
				Ok(())
			}
			Mode::Fail => Err(Error::Transport("analyzer unavailable".into())),
			Mode::Cancel => Err(Error::Cancelled),
			Mode::Hang => std::future::pending().await,
		};
		self.in_flight.fetch_sub(1, Ordering::SeqCst);
		result
	}
}
