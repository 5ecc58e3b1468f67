use std::path::Path;
use std::path::PathBuf;

use crate::Document;
use crate::Namespace;
use crate::RecordKind;

/// Build a namespace from literal sections.
pub fn namespace(sections: &[(&str, &[(&str, &str)])]) -> Namespace {
	sections
		.iter()
		.map(|(name, entries)| (*name, entries.iter().copied()))
		.collect()
}

/// Build a document with the standard record kinds from literal sections.
pub fn document(sections: &[(&str, &[(&str, &str)])]) -> Document {
	Document::build(namespace(sections), &RecordKind::STANDARD)
}

/// A small invoice with two items, one expense, and client details.
pub fn invoice_document() -> Document {
	document(&[
		(
			"META",
			&[
				("invoice_number", "2024-017"),
				("client", "Acme Corp"),
				("vat_id", ""),
			],
		),
		(
			"ITEM_B",
			&[("description", "Code review"), ("hrs", "2"), ("rate", "50.5")],
		),
		(
			"ITEM_A",
			&[
				("description", "Consulting"),
				("qty", "1"),
				("rate", "10"),
			],
		),
		(
			"EXPENSE_TRAVEL",
			&[("description", "Train ticket"), ("subtotal", "24.90")],
		),
	])
}

/// Write `content` to `dir/name`, creating parent directories, and return the
/// path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create dir: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {name}: {e}"));
	path
}
