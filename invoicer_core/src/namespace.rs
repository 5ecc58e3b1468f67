use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Serialize;

/// The section holding document-level scalars. Unqualified variable names
/// resolve against it.
pub const META_SECTION: &str = "META";

/// The `META` key listing further configuration sources to import.
pub const IMPORT_KEY: &str = "import";

/// The key/value pairs of a single section. Keys are stored lowercased.
pub type Section = BTreeMap<String, String>;

/// The merged section/key store used for variable lookups.
///
/// Sections are kept in name order so iteration (and therefore record
/// ordering) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct Namespace(
	#[deref]
	#[deref_mut]
	BTreeMap<String, Section>,
);

impl Namespace {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look up `section.key`. The key is matched case-insensitively.
	pub fn value(&self, section: &str, key: &str) -> Option<&str> {
		self.0
			.get(section)
			.and_then(|entries| entries.get(&key.to_ascii_lowercase()))
			.map(String::as_str)
	}

	/// Set `section.key`, creating the section when needed.
	pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
		self.0
			.entry(section.to_string())
			.or_default()
			.insert(key.to_ascii_lowercase(), value.into());
	}

	/// Remove `section.key` and return its previous value.
	pub fn take(&mut self, section: &str, key: &str) -> Option<String> {
		self.0
			.get_mut(section)
			.and_then(|entries| entries.remove(&key.to_ascii_lowercase()))
	}

	/// Whether `section.key` is defined.
	pub fn contains(&self, section: &str, key: &str) -> bool {
		self.value(section, key).is_some()
	}
}

impl<S, K, V, I> FromIterator<(S, I)> for Namespace
where
	S: Into<String>,
	K: AsRef<str>,
	V: Into<String>,
	I: IntoIterator<Item = (K, V)>,
{
	fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
		let mut namespace = Namespace::new();
		for (section, entries) in iter {
			let section = section.into();
			let target = namespace.0.entry(section).or_default();
			for (key, value) in entries {
				target.insert(key.as_ref().to_ascii_lowercase(), value.into());
			}
		}
		namespace
	}
}

/// Merge two namespaces section by section. On a key collision the value
/// from `upper` wins. Sections present in only one side are kept as they are.
pub fn merge(lower: Namespace, upper: Namespace) -> Namespace {
	let mut merged = lower.0;

	for (name, entries) in upper.0 {
		merged.entry(name).or_default().extend(entries);
	}

	Namespace(merged)
}
