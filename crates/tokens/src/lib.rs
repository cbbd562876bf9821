//! Line-indexed tokenization cache for syntax highlighting consumers.
//!
//! The [`LineTokenCache`] stores one [`LineTokenization`] per physical line and
//! shifts entries on line insertion/deletion so unaffected lines survive edits.
//! The [`Classifier`] keeps a cache in step with a document's versions and
//! re-lexes only what an edit can have changed, restarting from the nearest
//! cached line's continuation state on a miss.

mod cache;
mod classifier;
pub mod python;
mod token;

pub use cache::{LineTokenCache, SharedTokenCache};
pub use classifier::Classifier;
pub use python::PythonTokenizer;
pub use token::{LexState, LineTokenization, OpenString, Token, TokenCategory, Tokenizer};
