use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::InvoiceResult;
use crate::aggregator::ItemAggregator;
use crate::aggregator::RecordCollection;
use crate::aggregator::RecordKind;
use crate::importer::load_namespace;
use crate::namespace::Namespace;

/// A fully merged namespace together with its resolved record collections.
///
/// All aggregation happens in [`Document::build`]; afterwards the document is
/// read-only and can be shared by any number of renders.
#[derive(Debug, Clone)]
pub struct Document {
	namespace: Namespace,
	collections: BTreeMap<&'static str, RecordCollection>,
	sources: Vec<PathBuf>,
}

impl Document {
	/// Load the configuration source at `path` with its imports and resolve
	/// the standard record kinds (items and expenses).
	pub fn load(path: impl AsRef<Path>) -> InvoiceResult<Self> {
		let imported = load_namespace(path)?;
		let mut document = Self::build(imported.namespace, &RecordKind::STANDARD);
		document.sources = imported.sources;

		Ok(document)
	}

	/// Resolve every kind in `kinds` against `namespace`, in order. Each
	/// kind's totals feed the document-level totals exactly once.
	pub fn build(mut namespace: Namespace, kinds: &[RecordKind]) -> Self {
		let mut aggregator = ItemAggregator::new();
		for kind in kinds {
			aggregator.resolve(&mut namespace, kind);
		}

		Self {
			namespace,
			collections: aggregator.into_collections(),
			sources: vec![],
		}
	}

	pub fn namespace(&self) -> &Namespace {
		&self.namespace
	}

	/// The collection resolved for `kind`, if it was part of the build.
	pub fn records(&self, kind: &RecordKind) -> Option<&RecordCollection> {
		self.collections.get(kind.prefix)
	}

	/// Configuration sources merged into this document, root last. Empty for
	/// documents built directly from a namespace.
	pub fn sources(&self) -> &[PathBuf] {
		&self.sources
	}
}
