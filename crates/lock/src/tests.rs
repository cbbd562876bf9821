use std::sync::atomic::AtomicUsize;

use super::*;

const SECOND: Duration = Duration::from_secs(1);

fn shared() -> Arc<ResourceLock<&'static str>> {
	Arc::new(ResourceLock::new())
}

#[tokio::test]
async fn test_acquire_and_release() {
	let locks = shared();
	assert!(!locks.is_locked(&"db", &()));

	let mut token = locks.acquire("db", (), SECOND).await.unwrap();
	assert!(token.is_held());
	assert!(locks.is_locked(&"db", &()));

	assert!(locks.release(&mut token));
	assert!(!token.is_held());
	assert!(!locks.is_locked(&"db", &()));
}

#[tokio::test]
async fn test_release_is_idempotent() {
	let locks = shared();
	let mut token = locks.acquire("db", (), SECOND).await.unwrap();
	assert!(locks.release(&mut token));
	assert!(!locks.release(&mut token));
	drop(token);

	let mut again = locks.acquire("db", (), SECOND).await.unwrap();
	assert!(locks.is_locked(&"db", &()));
	assert!(locks.release(&mut again));
}

#[tokio::test]
async fn test_drop_releases() {
	let locks = shared();
	let token = locks.acquire("db", (), SECOND).await.unwrap();
	drop(token);
	assert!(!locks.is_locked(&"db", &()));
	locks.acquire("db", (), Duration::from_millis(10)).await.unwrap();
}

#[tokio::test]
async fn test_tags_are_independent() {
	let locks: ResourceLock<&str, u32> = ResourceLock::new();
	let _a = locks.acquire("db", 1, SECOND).await.unwrap();
	let _b = locks.acquire("db", 2, Duration::from_millis(10)).await.unwrap();
	assert!(locks.is_locked(&"db", &1));
	assert!(locks.is_locked(&"db", &2));
	assert!(!locks.is_locked(&"db", &3));
}

#[tokio::test]
async fn test_waiter_is_counted_while_blocked() {
	let locks = shared();
	let mut first = locks.acquire("db", (), SECOND).await.unwrap();

	let waiter = tokio::spawn({
		let locks = locks.clone();
		async move { locks.acquire("db", (), Duration::from_secs(10)).await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(!waiter.is_finished());

	assert!(!locks.release(&mut first));
	let mut second = tokio::time::timeout(SECOND, waiter).await.unwrap().unwrap().unwrap();
	assert!(locks.is_locked(&"db", &()));
	assert!(locks.release(&mut second));
	assert!(!locks.is_locked(&"db", &()));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_rolls_back_count() {
	let locks = shared();
	let mut held = locks.acquire("db", (), SECOND).await.unwrap();

	let after = Duration::from_millis(20);
	assert_eq!(locks.acquire("db", (), after).await.unwrap_err(), LockError::Timeout { after });
	assert!(locks.is_locked(&"db", &()));

	assert!(locks.release(&mut held));
	assert!(!locks.is_locked(&"db", &()));
}

#[tokio::test]
async fn test_abandoned_acquire_rolls_back_count() {
	let locks = shared();
	let mut held = locks.acquire("db", (), SECOND).await.unwrap();

	let waiter = tokio::spawn({
		let locks = locks.clone();
		async move { locks.acquire("db", (), Duration::from_secs(10)).await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	waiter.abort();
	assert!(waiter.await.unwrap_err().is_cancelled());

	assert!(locks.release(&mut held));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_over_a_day_waits_indefinitely() {
	let locks = shared();
	let mut held = locks.acquire("db", (), SECOND).await.unwrap();

	let waiter = tokio::spawn({
		let locks = locks.clone();
		async move { locks.acquire("db", (), INDEFINITE_AFTER + SECOND).await }
	});
	tokio::time::sleep(INDEFINITE_AFTER * 3).await;
	assert!(!waiter.is_finished());

	assert!(!locks.release(&mut held));
	let mut token = waiter.await.unwrap().unwrap();
	assert!(locks.release(&mut token));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_of_exactly_a_day_is_honored() {
	let locks = shared();
	let _held = locks.acquire("db", (), SECOND).await.unwrap();
	assert_eq!(
		locks.acquire("db", (), INDEFINITE_AFTER).await.unwrap_err(),
		LockError::Timeout { after: INDEFINITE_AFTER }
	);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_default_uses_config() {
	let config = LockConfig::from_toml("default_timeout_ms = 5").unwrap();
	let locks: ResourceLock<&str> = ResourceLock::with_config(config);
	let _held = locks.acquire_default("db", ()).await.unwrap();
	assert_eq!(
		locks.acquire_default("db", ()).await.unwrap_err(),
		LockError::Timeout {
			after: Duration::from_millis(5)
		}
	);
}

#[test]
fn test_config_defaults() {
	let config = LockConfig::from_toml("").unwrap();
	assert_eq!(config, LockConfig::default());
	assert_eq!(config.default_timeout(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_close_fails_waiters_but_keeps_holders() {
	let locks = shared();
	let mut held = locks.acquire("db", (), SECOND).await.unwrap();

	let waiter = tokio::spawn({
		let locks = locks.clone();
		async move { locks.acquire("db", (), Duration::from_secs(10)).await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	locks.close();

	assert_eq!(waiter.await.unwrap().unwrap_err(), LockError::Closed);
	assert_eq!(locks.acquire("other", (), SECOND).await.unwrap_err(), LockError::Closed);
	assert!(held.is_held());
	assert!(locks.release(&mut held));
}

#[tokio::test]
#[should_panic(expected = "did not issue")]
async fn test_foreign_token_panics() {
	let issuer = shared();
	let other = shared();
	let mut token = issuer.acquire("db", (), SECOND).await.unwrap();
	other.release(&mut token);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_locked_until_last_release() {
	const N: usize = 32;
	let locks: Arc<ResourceLock<String, u32>> = Arc::new(ResourceLock::new());
	let inside = Arc::new(AtomicUsize::new(0));
	let key = "interpreter".to_string();

	let tasks: Vec<_> = (0..N)
		.map(|_| {
			let locks = locks.clone();
			let inside = inside.clone();
			let key = key.clone();
			tokio::spawn(async move {
				let mut token = locks.acquire(key.clone(), 7, Duration::from_secs(10)).await.unwrap();
				assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "two holders at once");
				tokio::task::yield_now().await;
				assert!(locks.is_locked(&key, &7));
				inside.fetch_sub(1, Ordering::SeqCst);
				locks.release(&mut token)
			})
		})
		.collect();

	let mut emptied = 0;
	for task in tasks {
		if task.await.unwrap() {
			emptied += 1;
		}
	}
	assert!(emptied >= 1);
	assert!(!locks.is_locked(&key, &7));
}
