use std::ops::Range;
use std::path::Path;
use std::path::PathBuf;

use logos::Logos;
use snailquote::unescape;

/// `{*` starts an opening directive marker.
const OPEN_START: &str = "{*";
/// `{/*` starts a closing directive marker.
const CLOSE_START: &str = "{/*";
/// `*}` ends either directive marker.
const DIRECTIVE_END: &str = "*}";
/// `{{` starts a variable marker.
const VARIABLE_START: &str = "{{";
/// `}}` ends a variable marker.
const VARIABLE_END: &str = "}}";

/// Raw tokens produced by logos for the text inside an opening marker.
#[derive(Logos, Debug, PartialEq)]
enum HeadToken {
	#[regex(r"[ \t\r\n]+")]
	Whitespace,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*", priority = 3)]
	Ident,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r#"[^ \t\r\n"']+"#, priority = 1)]
	Bare,
}

/// A marker found in template text. Everything between markers is literal
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
	pub kind: MarkerKind,
	/// Byte range of the whole marker, delimiters included.
	pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
	/// `{* name ... *}`
	Open(DirectiveHead),
	/// `{/* name *}`
	Close(String),
	/// `{{ path }}`
	Variable(String),
}

/// The parsed inside of an opening marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveHead {
	/// The directive name, e.g. `items`.
	pub name: String,
	/// The first word after the name, which may reference a body file.
	pub target: Option<HeadTarget>,
	/// Everything after the name, trimmed.
	pub arguments: String,
}

/// The first word following a directive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTarget {
	/// The word, unquoted and unescaped.
	pub word: String,
	/// Whether the word was written in quotes.
	pub quoted: bool,
	/// Everything after the word, trimmed.
	pub rest: String,
}

/// An opening marker with its file reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening<'a> {
	pub name: &'a str,
	/// The file providing the body, when the directive is self-contained.
	pub include: Option<PathBuf>,
	/// The argument string, when one was given.
	pub argument: Option<&'a str>,
}

impl DirectiveHead {
	/// Decide whether the first word references a body file and split off the
	/// argument string accordingly.
	///
	/// Quoted words always reference a file. Bare words do when they contain
	/// a `/` or name an existing file inside `base_dir`.
	pub fn opening(&self, base_dir: &Path) -> Opening<'_> {
		let include = self.target.as_ref().and_then(|target| {
			let path = base_dir.join(&target.word);
			let is_file = target.quoted || target.word.contains('/') || path.is_file();
			is_file.then_some((path, target.rest.as_str()))
		});

		let (include, argument) = match include {
			Some((path, rest)) => (Some(path), rest),
			None => (None, self.arguments.as_str()),
		};

		Opening {
			name: &self.name,
			include,
			argument: (!argument.is_empty()).then_some(argument),
		}
	}

	/// Whether this opener needs a matching `{/* name *}`.
	pub fn is_block(&self, base_dir: &Path) -> bool {
		self.opening(base_dir).include.is_none()
	}
}

/// Find every directive and variable marker in `source`, left to right.
///
/// Text that merely looks like the start of a marker (an unterminated `{*`,
/// an opener without a valid name, a `{{` around something that isn't a
/// variable path) is left as literal text.
pub fn scan(source: &str) -> Vec<Marker> {
	let mut markers = vec![];
	let mut cursor = 0;

	while let Some(offset) = source[cursor..].find('{') {
		let start = cursor + offset;
		let rest = &source[start..];

		let found = if rest.starts_with(CLOSE_START) {
			directive_inner(rest, CLOSE_START.len())
				.and_then(|(inner, len)| close_name(inner).map(|name| (MarkerKind::Close(name), len)))
		} else if rest.starts_with(OPEN_START) {
			directive_inner(rest, OPEN_START.len())
				.and_then(|(inner, len)| parse_head(inner).map(|head| (MarkerKind::Open(head), len)))
		} else if rest.starts_with(VARIABLE_START) {
			variable_reference(rest).map(|(reference, len)| (MarkerKind::Variable(reference), len))
		} else {
			None
		};

		match found {
			Some((kind, len)) => {
				markers.push(Marker {
					kind,
					span: start..start + len,
				});
				cursor = start + len;
			}
			None => cursor = start + 1,
		}
	}

	markers
}

/// Return the text between a directive's start delimiter and the first `*`
/// after it, provided that `*` begins the `*}` terminator. Also returns the
/// full marker length.
fn directive_inner(rest: &str, start_len: usize) -> Option<(&str, usize)> {
	let after = &rest[start_len..];
	let star = after.find('*')?;

	if !after[star..].starts_with(DIRECTIVE_END) || star == 0 {
		return None;
	}

	Some((&after[..star], start_len + star + DIRECTIVE_END.len()))
}

fn close_name(inner: &str) -> Option<String> {
	let name = inner.trim();
	is_directive_name(name).then(|| name.to_string())
}

fn is_directive_name(name: &str) -> bool {
	let mut chars = name.chars();
	chars
		.next()
		.is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
		&& chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Tokenize the inside of an opening marker into its name, optional target
/// word, and argument strings. Returns `None` when there is no valid name.
fn parse_head(inner: &str) -> Option<DirectiveHead> {
	let mut tokens = HeadToken::lexer(inner)
		.spanned()
		.filter(|(token, _)| !matches!(token, Ok(HeadToken::Whitespace)));

	let (Ok(HeadToken::Ident), name_span) = tokens.next()? else {
		return None;
	};
	let name = inner[name_span.clone()].to_string();
	let arguments = inner[name_span.end..].trim().to_string();

	let target = tokens.next().and_then(|(token, span)| {
		let slice = &inner[span.clone()];
		let (word, quoted) = match token {
			Ok(HeadToken::DoubleQuotedString | HeadToken::SingleQuotedString) => {
				(unquote(slice)?, true)
			}
			Ok(HeadToken::Ident | HeadToken::Bare) => (slice.to_string(), false),
			Ok(HeadToken::Whitespace) | Err(()) => return None,
		};

		Some(HeadTarget {
			word,
			quoted,
			rest: inner[span.end..].trim().to_string(),
		})
	});

	Some(DirectiveHead {
		name,
		target,
		arguments,
	})
}

/// Strip the surrounding quotes and unescape if needed.
fn unquote(slice: &str) -> Option<String> {
	let inner = &slice[1..slice.len() - 1];

	if inner.contains('\\') {
		unescape(inner).ok()
	} else {
		Some(inner.to_string())
	}
}

/// Parse `{{ path }}` at the start of `rest`, returning the trimmed path and
/// the full marker length.
fn variable_reference(rest: &str) -> Option<(String, usize)> {
	let after = &rest[VARIABLE_START.len()..];
	let end = after.find(VARIABLE_END)?;
	let reference = after[..end].trim();

	let valid = !reference.is_empty()
		&& reference
			.chars()
			.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'));

	valid.then(|| {
		(
			reference.to_string(),
			VARIABLE_START.len() + end + VARIABLE_END.len(),
		)
	})
}
