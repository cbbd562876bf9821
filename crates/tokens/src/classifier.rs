use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use lexsync_primitives::{ChangeInfo, Rope, Snapshot};
use tracing::trace;

use crate::cache::{LineTokenCache, SharedTokenCache};
use crate::token::{LexState, LineTokenization, Tokenizer};

/// Keeps a [`LineTokenCache`] in step with successive snapshots of a document.
///
/// Moving to a new snapshot replays the recorded edits as line deletions and
/// insertions on the cache, re-lexes the edited lines, and keeps re-lexing
/// the following cached lines until a result matches what was cached. Lines
/// that were never tokenized are filled on demand from the nearest cached
/// restart point.
pub struct Classifier<T> {
	tokenizer: T,
	cache: SharedTokenCache,
	synced: Option<Snapshot>,
}

impl<T: Tokenizer> Classifier<T> {
	/// Creates a classifier with a private cache.
	pub fn new(tokenizer: T) -> Self {
		Self::with_cache(tokenizer, LineTokenCache::shared())
	}

	/// Creates a classifier writing into `cache`.
	pub fn with_cache(tokenizer: T, cache: SharedTokenCache) -> Self {
		Self {
			tokenizer,
			cache,
			synced: None,
		}
	}

	/// The cache this classifier maintains.
	pub fn cache(&self) -> &SharedTokenCache {
		&self.cache
	}

	/// The snapshot the cache currently describes.
	pub fn synced(&self) -> Option<&Snapshot> {
		self.synced.as_ref()
	}

	/// Drops every cached tokenization.
	pub fn reset(&mut self) {
		self.cache.write().clear();
		self.synced = None;
	}

	/// Brings the cache up to date with `snapshot`.
	pub fn update(&mut self, snapshot: &Snapshot) {
		let Some(synced) = self.synced.take() else {
			self.cache.write().clear();
			self.synced = Some(snapshot.clone());
			return;
		};
		if synced.same_version(snapshot) {
			self.synced = Some(synced);
			return;
		}

		match synced.changes_to(snapshot) {
			Some(versions) => {
				let mut text = synced.text().clone();
				let mut cache = self.cache.write();
				for change in versions.iter().flat_map(|v| v.changes.iter()) {
					self.apply_change(&mut cache, &mut text, change);
				}
				debug_assert_eq!(text, *snapshot.text());
			}
			None => {
				trace!(from = %synced.version(), to = %snapshot.version(), "token cache lineage changed, clearing");
				self.cache.write().clear();
			}
		}
		self.synced = Some(snapshot.clone());
	}

	/// Tokenization of `line` in `snapshot`, computing and caching it on a miss.
	///
	/// Panics if `line` is not a line of `snapshot`.
	pub fn tokenize_line(&mut self, snapshot: &Snapshot, line: usize) -> Arc<LineTokenization> {
		assert!(line < snapshot.line_count(), "line {line} out of range for snapshot of {} lines", snapshot.line_count());
		self.update(snapshot);

		let mut cache = self.cache.write();
		cache.ensure_capacity(snapshot.line_count());
		if let Some(hit) = cache.get(line) {
			return hit.clone();
		}

		let (first, mut state) = match cache.index_of_previous_tokenization(line, 0) {
			Some((restart, prior)) => (restart + 1, prior.state),
			None => (0, LexState::default()),
		};
		trace!(line, restart = first, "token cache miss");

		let mut result = None;
		for index in first..=line {
			let tokenization = Arc::new(self.lex(snapshot.text(), index, state));
			state = tokenization.state;
			cache.set(index, tokenization.clone());
			result = Some(tokenization);
		}
		result.unwrap_or_default()
	}

	/// Tokenizations of every line in `lines`, clamped to the snapshot.
	pub fn lines(&mut self, snapshot: &Snapshot, lines: Range<usize>) -> Vec<Arc<LineTokenization>> {
		let end = lines.end.min(snapshot.line_count());
		(lines.start..end).map(|line| self.tokenize_line(snapshot, line)).collect()
	}

	fn apply_change(&self, cache: &mut LineTokenCache, text: &mut Rope, change: &ChangeInfo) {
		let old_lines = text.len_lines();
		let Some(end) = change.end().filter(|&end| end <= text.len_chars()) else {
			// Recorded history always applies; bail out rather than trust a shifted cache.
			cache.clear();
			return;
		};
		let first = text.char_to_line(change.start);
		let removed = text.char_to_line(end) - first;
		if change.apply(text).is_err() {
			cache.clear();
			return;
		}
		let added = text.char_to_line(change.start + change.new_len()) - first;

		cache.ensure_capacity(old_lines.max(text.len_lines()));
		if removed > added {
			cache.delete_lines(first + 1, removed - added);
		} else if added > removed {
			cache.insert_lines(first + 1, added - removed);
		}
		for line in first..=first + added {
			cache.invalidate(line);
		}

		self.relex_after_edit(cache, text, first, first + added);
	}

	/// Re-lexes the edited lines and any cached followers whose result changes.
	fn relex_after_edit(&self, cache: &mut LineTokenCache, text: &Rope, first: usize, last: usize) {
		let mut state = match first.checked_sub(1) {
			None => LexState::default(),
			Some(prev) => match cache.get(prev) {
				Some(prior) => prior.state,
				// Nothing cached up to the edit; later lines fill on demand.
				None => return,
			},
		};

		let line_count = text.len_lines();
		for line in first..=last {
			let tokenization = self.lex(text, line, state);
			state = tokenization.state;
			cache.set(line, Arc::new(tokenization));
		}

		let mut relexed = 0usize;
		for line in last + 1..line_count {
			let Some(cached) = cache.get(line).cloned() else {
				break;
			};
			let tokenization = self.lex(text, line, state);
			if tokenization == *cached {
				break;
			}
			state = tokenization.state;
			cache.set(line, Arc::new(tokenization));
			relexed += 1;
		}
		if relexed > 0 {
			trace!(first, last, relexed, "lexer state change propagated past edit");
		}
	}

	fn lex(&self, text: &Rope, line: usize, state: LexState) -> LineTokenization {
		let slice = text.line(line);
		let line: Cow<'_, str> = match slice.as_str() {
			Some(contiguous) => Cow::Borrowed(contiguous),
			None => Cow::Owned(slice.to_string()),
		};
		self.tokenizer.tokenize_line(line.trim_end_matches(['\n', '\r']), state)
	}
}

#[cfg(test)]
mod tests;
