//! Reference-counted async mutual exclusion per `(resource key, caller tag)`.
//!
//! Each pair gets a lazily created binary mutex and a count of callers that
//! hold it or are waiting for it. The count is raised before waiting, so
//! [`ResourceLock::is_locked`] reports contended resources even while every
//! caller is still blocked.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

mod config;

pub use config::LockConfig;

/// Timeouts longer than this wait indefinitely.
pub const INDEFINITE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from acquiring a lock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
	/// The lock was not obtained in time.
	#[error("lock not acquired within {after:?}")]
	Timeout {
		/// The timeout that elapsed.
		after: Duration,
	},
	/// The [`ResourceLock`] was closed.
	#[error("resource lock closed")]
	Closed,
}

/// Per-pair state: holders plus waiters, and the mutex they contend on.
#[derive(Debug, Default)]
struct LockInfo {
	count: AtomicUsize,
	mutex: Arc<AsyncMutex<()>>,
}

impl LockInfo {
	/// Drops one holder or waiter. Returns true if none remain.
	fn decrement(&self) -> bool {
		let prev = self.count.fetch_sub(1, Ordering::SeqCst);
		debug_assert!(prev > 0, "lock count underflow");
		prev == 1
	}
}

/// Undoes a count increment unless disarmed.
struct Rollback<'a> {
	info: Option<&'a LockInfo>,
}

impl Rollback<'_> {
	fn disarm(mut self) {
		self.info = None;
	}
}

impl Drop for Rollback<'_> {
	fn drop(&mut self) {
		if let Some(info) = self.info {
			info.decrement();
		}
	}
}

/// Async locks keyed by `(K, T)`: a resource key and a caller-supplied tag.
///
/// Lock entries are created on first use and live as long as the
/// `ResourceLock`.
pub struct ResourceLock<K, T = ()> {
	id: u64,
	config: LockConfig,
	locks: Mutex<HashMap<(K, T), Arc<LockInfo>>>,
	closed: CancellationToken,
}

impl<K, T> ResourceLock<K, T>
where
	K: Eq + Hash + Clone + fmt::Debug,
	T: Eq + Hash + Clone + fmt::Debug,
{
	/// Creates a lock table with default config.
	pub fn new() -> Self {
		Self::with_config(LockConfig::default())
	}

	/// Creates a lock table with `config`.
	pub fn with_config(config: LockConfig) -> Self {
		static NEXT_ID: AtomicU64 = AtomicU64::new(1);
		Self {
			id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
			config,
			locks: Mutex::new(HashMap::new()),
			closed: CancellationToken::new(),
		}
	}

	/// Config in use.
	pub fn config(&self) -> &LockConfig {
		&self.config
	}

	/// Waits up to `timeout` for exclusive access to `(key, tag)`.
	///
	/// A timeout above [`INDEFINITE_AFTER`] waits indefinitely. On timeout or
	/// close, or if the returned future is dropped, the waiter is no longer
	/// counted.
	pub async fn acquire(&self, key: K, tag: T, timeout: Duration) -> Result<LockToken, LockError> {
		if self.closed.is_cancelled() {
			return Err(LockError::Closed);
		}
		let info = self.locks.lock().entry((key.clone(), tag.clone())).or_default().clone();

		info.count.fetch_add(1, Ordering::SeqCst);
		let rollback = Rollback { info: Some(&info) };

		let lock = info.mutex.clone().lock_owned();
		let guard = if timeout > INDEFINITE_AFTER {
			tokio::select! {
				_ = self.closed.cancelled() => Err(LockError::Closed),
				guard = lock => Ok(guard),
			}
		} else {
			tokio::select! {
				_ = self.closed.cancelled() => Err(LockError::Closed),
				guard = tokio::time::timeout(timeout, lock) => guard.map_err(|_| LockError::Timeout { after: timeout }),
			}
		};
		let guard = match guard {
			Ok(guard) => guard,
			Err(error) => {
				debug!(?key, ?tag, %error, "lock not acquired");
				return Err(error);
			}
		};
		rollback.disarm();

		trace!(?key, ?tag, "lock acquired");
		Ok(LockToken {
			owner: self.id,
			guard: Some(guard),
			info,
		})
	}

	/// [`acquire`](Self::acquire) with the configured default timeout.
	pub async fn acquire_default(&self, key: K, tag: T) -> Result<LockToken, LockError> {
		self.acquire(key, tag, self.config.default_timeout()).await
	}

	/// Releases `token`'s lock.
	///
	/// Returns true if no other caller holds or waits for the same pair, so
	/// state tied to the resource may be evicted. Releasing an already
	/// released token does nothing and returns false.
	///
	/// Panics if `token` was issued by a different `ResourceLock`.
	pub fn release(&self, token: &mut LockToken) -> bool {
		assert_eq!(token.owner, self.id, "lock token released on a ResourceLock that did not issue it");
		token.release_inner().unwrap_or(false)
	}

	/// Returns true if some caller holds or waits for `(key, tag)`.
	///
	/// A point-in-time hint only; never a substitute for acquiring.
	pub fn is_locked(&self, key: &K, tag: &T) -> bool {
		self.locks
			.lock()
			.get(&(key.clone(), tag.clone()))
			.is_some_and(|info| info.count.load(Ordering::SeqCst) > 0)
	}

	/// Fails every pending and future acquire with [`LockError::Closed`].
	///
	/// Tokens already held stay valid until released.
	pub fn close(&self) {
		self.closed.cancel();
	}
}

impl<K, T> Default for ResourceLock<K, T>
where
	K: Eq + Hash + Clone + fmt::Debug,
	T: Eq + Hash + Clone + fmt::Debug,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, T> fmt::Debug for ResourceLock<K, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResourceLock")
			.field("id", &self.id)
			.field("entries", &self.locks.lock().len())
			.field("closed", &self.closed.is_cancelled())
			.finish()
	}
}

/// Exclusive hold on one `(key, tag)` pair.
///
/// Released by [`ResourceLock::release`] or on drop, whichever comes first.
pub struct LockToken {
	owner: u64,
	guard: Option<OwnedMutexGuard<()>>,
	info: Arc<LockInfo>,
}

impl LockToken {
	/// Returns true until the token is released.
	pub fn is_held(&self) -> bool {
		self.guard.is_some()
	}

	/// Decrements the count, then unlocks. `None` if already released.
	fn release_inner(&mut self) -> Option<bool> {
		let guard = self.guard.take()?;
		let last = self.info.decrement();
		drop(guard);
		Some(last)
	}
}

impl Drop for LockToken {
	fn drop(&mut self) {
		self.release_inner();
	}
}

impl fmt::Debug for LockToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LockToken").field("held", &self.is_held()).finish()
	}
}

#[cfg(test)]
mod tests;
