//! Line tokenizer for Python-like source.

use crate::token::{LexState, LineTokenization, OpenString, Token, TokenCategory, Tokenizer};

const KEYWORDS: &[&str] = &[
	"False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif", "else", "except",
	"finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
	"while", "with", "yield",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

const OPERATORS_3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];

const OPERATORS_2: &[&str] = &[
	"**", "//", "==", "!=", "<=", ">=", "->", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", ":=", "@=",
];

/// Tokenizer for Python-like source.
///
/// Triple-quoted strings may span lines; the open quote kind and the bracket
/// depth are carried in [`LexState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonTokenizer;

impl Tokenizer for PythonTokenizer {
	fn tokenize_line(&self, line: &str, state: LexState) -> LineTokenization {
		let chars: Vec<char> = line.chars().collect();
		Lexer {
			chars: &chars,
			pos: 0,
			state,
			tokens: LineTokenization::default(),
		}
		.run()
	}
}

struct Lexer<'a> {
	chars: &'a [char],
	pos: usize,
	state: LexState,
	tokens: LineTokenization,
}

impl Lexer<'_> {
	fn run(mut self) -> LineTokenization {
		if let Some(open) = self.state.open_string {
			let quote = open.quote();
			match find_triple_close(self.chars, 0, quote) {
				Some(end) => {
					self.push(TokenCategory::String, 0, end);
					self.pos = end;
					self.state.open_string = None;
				}
				None => {
					if !self.chars.is_empty() {
						self.push(TokenCategory::String, 0, self.chars.len());
					}
					return self.finish();
				}
			}
		}

		while let Some(&c) = self.chars.get(self.pos) {
			let start = self.pos;
			match c {
				c if c.is_whitespace() => self.pos += 1,
				'#' => {
					self.push(TokenCategory::Comment, start, self.chars.len());
					self.pos = self.chars.len();
				}
				'"' | '\'' => {
					if self.string(start, start) {
						break;
					}
				}
				c if c.is_ascii_digit() => self.number(start),
				'.' if self.chars.get(start + 1).is_some_and(char::is_ascii_digit) => self.number(start),
				c if c.is_alphabetic() || c == '_' => {
					if self.word(start) {
						break;
					}
				}
				'(' | '[' | '{' => {
					self.state.bracket_depth = self.state.bracket_depth.saturating_add(1);
					self.single(TokenCategory::Delimiter);
				}
				')' | ']' | '}' => {
					self.state.bracket_depth = self.state.bracket_depth.saturating_sub(1);
					self.single(TokenCategory::Delimiter);
				}
				_ => self.operator(start),
			}
		}
		self.finish()
	}

	fn finish(self) -> LineTokenization {
		let mut tokens = self.tokens;
		tokens.state = self.state;
		tokens
	}

	fn push(&mut self, category: TokenCategory, start: usize, end: usize) {
		self.tokens.tokens.push(Token::span(category, start, end));
	}

	fn single(&mut self, category: TokenCategory) {
		self.push(category, self.pos, self.pos + 1);
		self.pos += 1;
	}

	fn starts_with(&self, at: usize, pattern: &str) -> bool {
		let mut chars = self.chars[at..].iter();
		pattern.chars().all(|p| chars.next() == Some(&p))
	}

	/// Lexes a string whose quote sits at `quote_at` and whose token starts at
	/// `start` (earlier when a prefix such as `rb` precedes the quote).
	///
	/// Returns true when the string stays open past the end of the line.
	fn string(&mut self, start: usize, quote_at: usize) -> bool {
		let quote = self.chars[quote_at];
		let triple: String = [quote; 3].iter().collect();
		if self.starts_with(quote_at, &triple) {
			return match find_triple_close(self.chars, quote_at + 3, quote) {
				Some(end) => {
					self.push(TokenCategory::String, start, end);
					self.pos = end;
					false
				}
				None => {
					self.push(TokenCategory::String, start, self.chars.len());
					self.pos = self.chars.len();
					self.state.open_string = Some(OpenString::from_quote(quote));
					true
				}
			};
		}

		let mut end = quote_at + 1;
		while let Some(&c) = self.chars.get(end) {
			end += 1;
			match c {
				'\\' => end += 1,
				c if c == quote => break,
				_ => {}
			}
		}
		let end = end.min(self.chars.len());
		self.push(TokenCategory::String, start, end);
		self.pos = end;
		false
	}

	fn number(&mut self, start: usize) {
		let mut end = start;
		while let Some(&c) = self.chars.get(end) {
			let exponent_sign = (c == '+' || c == '-') && end > start && matches!(self.chars[end - 1], 'e' | 'E');
			if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
				end += 1;
			} else {
				break;
			}
		}
		self.push(TokenCategory::Number, start, end);
		self.pos = end;
	}

	/// Returns true when the word was a string prefix opening a multi-line string.
	fn word(&mut self, start: usize) -> bool {
		let mut end = start;
		while self.chars.get(end).is_some_and(|c| c.is_alphanumeric() || *c == '_') {
			end += 1;
		}
		let word: String = self.chars[start..end].iter().collect();

		if matches!(self.chars.get(end).copied(), Some('"' | '\'')) && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str()) {
			return self.string(start, end);
		}

		let category = if KEYWORDS.contains(&word.as_str()) {
			TokenCategory::Keyword
		} else {
			TokenCategory::Identifier
		};
		self.push(category, start, end);
		self.pos = end;
		false
	}

	fn operator(&mut self, start: usize) {
		let len = if OPERATORS_3.iter().any(|op| self.starts_with(start, op)) {
			3
		} else if OPERATORS_2.iter().any(|op| self.starts_with(start, op)) {
			2
		} else {
			1
		};
		let category = match self.chars[start] {
			',' | ':' | ';' | '.' if len == 1 => TokenCategory::Delimiter,
			'+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '&' | '|' | '^' | '~' | '@' | '.' | ':' => TokenCategory::Operator,
			_ => TokenCategory::Unknown,
		};
		self.push(category, start, start + len);
		self.pos = start + len;
	}
}

/// Finds the exclusive end of the closing triple quote at or after `from`.
fn find_triple_close(chars: &[char], from: usize, quote: char) -> Option<usize> {
	let mut i = from;
	while i < chars.len() {
		match chars[i] {
			'\\' => i += 2,
			c if c == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) => return Some(i + 3),
			_ => i += 1,
		}
	}
	None
}
