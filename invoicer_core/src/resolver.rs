use crate::aggregator::Record;
use crate::namespace::META_SECTION;
use crate::namespace::Namespace;

/// A lexically nested overlay exposing "the current record" under a scope
/// name such as `ITEM`.
///
/// Scopes borrow their parent, so every nested render gets its own read-only
/// snapshot and no state is shared between sibling renders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
	entry: Option<(&'a str, &'a Record)>,
	parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
	/// The empty scope used at the top level of a template.
	pub fn root() -> Self {
		Self::default()
	}

	/// A child scope exposing `record` as `name`. It shadows any outer entry
	/// with the same name.
	pub fn with<'b>(&'b self, name: &'b str, record: &'b Record) -> Scope<'b>
	where
		'a: 'b,
	{
		Scope {
			entry: Some((name, record)),
			parent: Some(self),
		}
	}

	/// The innermost record installed under `name`.
	pub fn record(&self, name: &str) -> Option<&'a Record> {
		let mut current = Some(self);

		while let Some(scope) = current {
			if let Some((entry_name, record)) = scope.entry {
				if entry_name == name {
					return Some(record);
				}
			}
			current = scope.parent;
		}

		None
	}
}

/// Split a variable reference into `(section, key)`. A bare key refers to
/// `META`; anything after the first `.` is the key.
pub fn split_reference(reference: &str) -> (&str, &str) {
	let reference = reference.trim();
	reference
		.split_once('.')
		.unwrap_or((META_SECTION, reference))
}

/// Resolve a variable reference. The innermost scope entry with a matching
/// name is consulted first, then the namespace. Unknown references resolve to
/// an empty string.
pub fn resolve_variable(namespace: &Namespace, scope: &Scope<'_>, reference: &str) -> String {
	let (section, key) = split_reference(reference);

	scope
		.record(section)
		.and_then(|record| record.field(key))
		.or_else(|| namespace.value(section, key))
		.unwrap_or_default()
		.to_string()
}
