use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::ImportFailure;
use crate::InvoiceError;
use crate::InvoiceResult;
use crate::namespace::IMPORT_KEY;
use crate::namespace::META_SECTION;
use crate::namespace::Namespace;
use crate::namespace::merge;
use crate::source::SourceFormat;
use crate::source::load_source;

/// Separator between entries of a `META.import` list.
pub const IMPORT_SEPARATOR: char = '\n';

/// The result of walking a root configuration source and everything it
/// imports.
#[derive(Debug, Clone)]
pub struct ImportedConfig {
	/// The merged namespace. Values from the root source take precedence over
	/// anything it imports.
	pub namespace: Namespace,
	/// Every source that was merged, in merge order. The root is last.
	pub sources: Vec<PathBuf>,
}

/// Load the configuration source at `root` and transitively merge every
/// source it imports.
///
/// Imports are traversed depth-first in the order they are listed, each
/// distinct file at most once. Imported sources are merged in traversal
/// order (later ones win) and the root is merged last so it always has the
/// final say. Sources that fail to load don't stop the traversal; they are
/// reported together once it completes.
pub fn load_namespace(root: impl AsRef<Path>) -> InvoiceResult<ImportedConfig> {
	let root_path = resolve_path(&std::path::absolute(root.as_ref())?);
	let mut stack = vec![root_path.clone()];
	let mut seen: HashSet<PathBuf> = HashSet::from([root_path]);
	let mut failures: Vec<ImportFailure> = vec![];
	let mut base: Option<(PathBuf, Namespace)> = None;
	let mut merged = Namespace::new();
	let mut sources = vec![];

	while let Some(path) = stack.pop() {
		let mut namespace = match load_source(&path) {
			Ok(namespace) => namespace,
			Err(e) => {
				tracing::warn!(path = %path.display(), error = %e, "failed to load config source");
				failures.push(ImportFailure {
					path,
					reason: e.to_string(),
				});
				continue;
			}
		};
		tracing::debug!(path = %path.display(), "loaded config source");

		let imports = namespace
			.take(META_SECTION, IMPORT_KEY)
			.map(|list| parse_import_list(&list, &path))
			.unwrap_or_default();

		for import in imports.into_iter().rev() {
			if seen.insert(import.clone()) {
				stack.push(import);
			}
		}

		if base.is_none() {
			base = Some((path, namespace));
		} else {
			merged = merge(merged, namespace);
			sources.push(path);
		}
	}

	if !failures.is_empty() {
		return Err(InvoiceError::Import { failures });
	}

	if let Some((path, namespace)) = base {
		merged = merge(merged, namespace);
		sources.push(path);
	}

	Ok(ImportedConfig {
		namespace: merged,
		sources,
	})
}

/// Split an import list and resolve each entry relative to the source that
/// declared it.
fn parse_import_list(list: &str, importing: &Path) -> Vec<PathBuf> {
	let directory = importing.parent().unwrap_or_else(|| Path::new(""));

	list.split(IMPORT_SEPARATOR)
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(|entry| resolve_import(entry, directory))
		.collect()
}

/// Resolve a single import reference. References starting with `.` are
/// relative to `directory`; anything else is taken as an absolute path. The
/// default extension is appended when the reference has none.
pub fn resolve_import(reference: &str, directory: &Path) -> PathBuf {
	let reference = if SourceFormat::has_known_extension(reference) {
		reference.to_string()
	} else {
		format!("{reference}.{}", SourceFormat::DEFAULT_EXTENSION)
	};

	let path = if reference.starts_with('.') {
		directory.join(&reference)
	} else {
		std::path::absolute(&reference).unwrap_or_else(|_| PathBuf::from(&reference))
	};

	resolve_path(&path)
}

/// Canonicalize when the file exists so that different spellings of the same
/// source share one identity. Missing files keep their absolute path and
/// fail later when loaded.
fn resolve_path(path: &Path) -> PathBuf {
	std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
