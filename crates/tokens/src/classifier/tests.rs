use lexsync_primitives::{ChangeInfo, TextBuffer};
use proptest::prelude::*;

use super::*;
use crate::python::PythonTokenizer;
use crate::token::{OpenString, TokenCategory};

const SOURCE: &str = "import os\n\ndef f(x):\n    return x + 1\n\nprint(f(2))\n";

/// Tokenizes every line of `snapshot` from scratch.
fn full_relex(snapshot: &Snapshot) -> Vec<LineTokenization> {
	let mut state = LexState::default();
	(0..snapshot.line_count())
		.map(|line| {
			let text = snapshot.line(line).unwrap().to_string();
			let tokenization = PythonTokenizer.tokenize_line(text.trim_end_matches(['\n', '\r']), state);
			state = tokenization.state;
			tokenization
		})
		.collect()
}

#[test]
fn test_tokenize_line_caches_result() {
	let buffer = TextBuffer::new(SOURCE);
	let snap = buffer.current_snapshot();
	let mut classifier = Classifier::new(PythonTokenizer);

	let first = classifier.tokenize_line(&snap, 2);
	let again = classifier.tokenize_line(&snap, 2);
	assert!(Arc::ptr_eq(&first, &again));
	assert_eq!(first.tokens[0].category, TokenCategory::Keyword);
	assert_eq!(classifier.cache().read().populated(), 3);
}

#[test]
fn test_miss_restarts_from_nearest_cached_line() {
	let buffer = TextBuffer::new(SOURCE);
	let snap = buffer.current_snapshot();
	let mut classifier = Classifier::new(PythonTokenizer);

	let line1 = classifier.tokenize_line(&snap, 1);
	classifier.tokenize_line(&snap, 4);

	let cache = classifier.cache().read();
	assert_eq!(cache.populated(), 5);
	assert!(Arc::ptr_eq(cache.get(1).unwrap(), &line1));
	assert!(cache.get(5).is_none());
}

#[test]
fn test_inserted_line_shifts_cached_followers() {
	let buffer = TextBuffer::new(SOURCE);
	let mut classifier = Classifier::new(PythonTokenizer);
	let v0 = buffer.current_snapshot();
	let before = classifier.lines(&v0, 0..v0.line_count());

	let v1 = buffer.apply(vec![ChangeInfo::insert(10, "import sys\n")]).unwrap();
	classifier.update(&v1);

	let cache = classifier.cache().read();
	assert!(Arc::ptr_eq(cache.get(0).unwrap(), &before[0]));
	assert!(!Arc::ptr_eq(cache.get(1).unwrap(), &before[1]));
	// The old blank line was re-lexed as part of the edited range.
	assert_eq!(**cache.get(2).unwrap(), *before[1]);
	for line in 3..v1.line_count() {
		assert!(Arc::ptr_eq(cache.get(line).unwrap(), &before[line - 1]), "line {line} should be renumbered");
	}
}

#[test]
fn test_deleted_lines_shift_cached_followers() {
	let buffer = TextBuffer::new(SOURCE);
	let mut classifier = Classifier::new(PythonTokenizer);
	let v0 = buffer.current_snapshot();
	let before = classifier.lines(&v0, 0..v0.line_count());

	// Remove the blank line and the `def` line.
	let v1 = buffer.apply(vec![ChangeInfo::delete(10, 11)]).unwrap();
	assert_eq!(v1.text().to_string(), "import os\n    return x + 1\n\nprint(f(2))\n");
	classifier.update(&v1);

	let cache = classifier.cache().read();
	assert!(Arc::ptr_eq(cache.get(0).unwrap(), &before[0]));
	assert!(Arc::ptr_eq(cache.get(2).unwrap(), &before[4]));
	assert!(Arc::ptr_eq(cache.get(3).unwrap(), &before[5]));
}

#[test]
fn test_opening_string_propagates_to_cached_lines() {
	let buffer = TextBuffer::new(SOURCE);
	let mut classifier = Classifier::new(PythonTokenizer);
	let v0 = buffer.current_snapshot();
	classifier.lines(&v0, 0..v0.line_count());

	let v1 = buffer.apply(vec![ChangeInfo::insert(11, "\"\"\"")]).unwrap();
	classifier.update(&v1);
	{
		let cache = classifier.cache().read();
		assert_eq!(cache.get(2).unwrap().state.open_string, Some(OpenString::TripleDouble));
		assert_eq!(cache.get(3).unwrap().tokens[0].category, TokenCategory::String);
	}

	let v2 = buffer.apply(vec![ChangeInfo::delete(11, 3)]).unwrap();
	classifier.update(&v2);
	let expected = full_relex(&v2);
	let cache = classifier.cache().read();
	for (line, tokenization) in expected.iter().enumerate() {
		assert_eq!(cache.get(line).map(|t| &**t), Some(tokenization), "line {line}");
	}
}

#[test]
fn test_lineage_change_clears_cache() {
	let buffer = TextBuffer::new(SOURCE);
	let mut classifier = Classifier::new(PythonTokenizer);
	let v0 = buffer.current_snapshot();
	classifier.lines(&v0, 0..3);

	let reloaded = buffer.reload("x = 1\n");
	classifier.update(&reloaded);
	assert_eq!(classifier.cache().read().populated(), 0);
	assert!(classifier.synced().unwrap().same_version(&reloaded));
}

#[test]
fn test_edit_beyond_cached_prefix_leaves_prefix() {
	let buffer = TextBuffer::new(SOURCE);
	let mut classifier = Classifier::new(PythonTokenizer);
	let v0 = buffer.current_snapshot();
	let line0 = classifier.tokenize_line(&v0, 0);

	let v1 = buffer.apply(vec![ChangeInfo::insert(v0.text().len_chars(), "y = 2\n")]).unwrap();
	classifier.update(&v1);

	let cache = classifier.cache().read();
	assert_eq!(cache.populated(), 1);
	assert!(Arc::ptr_eq(cache.get(0).unwrap(), &line0));
}

#[test]
fn test_line_spanning_rope_chunks_matches_full_relex() {
	let long = format!("x = '{}' + \"\"\"\nend\"\"\"\ny = 1\n", "a".repeat(8 * 1024));
	let buffer = TextBuffer::new(&long);
	let snap = buffer.current_snapshot();
	assert!(snap.line(0).unwrap().as_str().is_none());

	let mut classifier = Classifier::new(PythonTokenizer);
	let lexed: Vec<_> = classifier.lines(&snap, 0..snap.line_count()).into_iter().map(|t| (*t).clone()).collect();
	assert_eq!(lexed, full_relex(&snap));
	assert_eq!(lexed[0].tokens[2].end(), 8 * 1024 + 6);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_tokenize_line_past_end_panics() {
	let buffer = TextBuffer::new("x\n");
	let mut classifier = Classifier::new(PythonTokenizer);
	classifier.tokenize_line(&buffer.current_snapshot(), 2);
}

fn arb_edit() -> impl Strategy<Value = (usize, usize, String)> {
	(any::<usize>(), 0..8usize, prop::sample::select(vec!["\n", "\"\"\"", "x", "# c", "(", ")", "'''\n", "a = 1\n", ""]).prop_map(String::from))
}

proptest! {
	/// Incremental results always match a from-scratch tokenization.
	#[test]
	fn prop_incremental_matches_full_relex(
		edits in prop::collection::vec(arb_edit(), 1..12),
		pick in any::<prop::sample::Index>(),
	) {
		let buffer = TextBuffer::new(SOURCE);
		let mut classifier = Classifier::new(PythonTokenizer);
		let snap = buffer.current_snapshot();
		classifier.tokenize_line(&snap, pick.index(snap.line_count()));

		for (seed, len, text) in edits {
			let current = buffer.current_snapshot();
			let chars = current.text().len_chars();
			let start = seed % (chars + 1);
			let length = len.min(chars - start);
			let next = buffer.apply(vec![ChangeInfo::new(start, length, text)]).unwrap();
			classifier.update(&next);
			classifier.tokenize_line(&next, pick.index(next.line_count()));
		}

		let last = buffer.current_snapshot();
		let incremental: Vec<_> = classifier.lines(&last, 0..last.line_count()).iter().map(|t| (**t).clone()).collect();
		prop_assert_eq!(incremental, full_relex(&last));
	}
}
