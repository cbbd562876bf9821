use std::fmt;

use smallvec::SmallVec;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
	/// Reserved word.
	Keyword,
	/// Name that is not a keyword.
	Identifier,
	/// Numeric literal.
	Number,
	/// String literal, or the part of one that falls on this line.
	String,
	/// Comment running to end of line.
	Comment,
	/// Operator such as `+=` or `->`.
	Operator,
	/// Bracket or separator.
	Delimiter,
	/// Anything the lexer does not recognise.
	Unknown,
}

/// A token within one line. Offsets are chars relative to the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
	/// Lexical category.
	pub category: TokenCategory,
	/// Char offset of the first char.
	pub start: usize,
	/// Length in chars.
	pub length: usize,
}

impl Token {
	/// Creates a token covering `start..end`.
	pub fn span(category: TokenCategory, start: usize, end: usize) -> Self {
		debug_assert!(start <= end, "token range must be ordered");
		Self {
			category,
			start,
			length: end - start,
		}
	}

	/// Exclusive end offset.
	#[inline]
	pub fn end(&self) -> usize {
		self.start + self.length
	}
}

/// Kind of string left open at the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenString {
	/// `'''`
	TripleSingle,
	/// `"""`
	TripleDouble,
}

impl OpenString {
	pub(crate) fn quote(self) -> char {
		match self {
			Self::TripleSingle => '\'',
			Self::TripleDouble => '"',
		}
	}

	pub(crate) fn from_quote(quote: char) -> Self {
		if quote == '\'' { Self::TripleSingle } else { Self::TripleDouble }
	}
}

/// Lexer continuation carried from the end of one line into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexState {
	/// Unterminated multi-line string, if any.
	pub open_string: Option<OpenString>,
	/// Depth of unclosed `(`, `[` and `{`.
	pub bracket_depth: u16,
}

/// Tokens of one physical line plus the state the next line starts in.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct LineTokenization {
	/// Tokens in line order.
	pub tokens: SmallVec<[Token; 8]>,
	/// Continuation state at the end of the line.
	pub state: LexState,
}

impl LineTokenization {
	/// Creates a tokenization from its parts.
	pub fn new(tokens: impl IntoIterator<Item = Token>, state: LexState) -> Self {
		Self {
			tokens: tokens.into_iter().collect(),
			state,
		}
	}
}

impl fmt::Debug for LineTokenization {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.state != LexState::default() {
			f.write_str("S ")?;
		}
		for token in &self.tokens {
			write!(f, "[{:?}]", token.category)?;
		}
		Ok(())
	}
}

/// A line lexer.
///
/// Implementors tokenize a single line given the state left by the previous
/// line. `line` excludes the line break.
pub trait Tokenizer {
	/// Tokenizes `line` starting in `state`.
	fn tokenize_line(&self, line: &str, state: LexState) -> LineTokenization;
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
	fn tokenize_line(&self, line: &str, state: LexState) -> LineTokenization {
		(**self).tokenize_line(line, state)
	}
}
