use std::path::Path;

use crate::InvoiceError;
use crate::InvoiceResult;
use crate::namespace::Namespace;
use crate::namespace::Section;

/// Section name ignored by the `.cfg` dialect. It would otherwise leak
/// defaults into every lookup.
const DEFAULT_SECTION: &str = "DEFAULT";

/// The on-disk format of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceFormat {
	/// INI dialect with `[SECTION]` headers, `key = value` / `key: value`
	/// pairs, and indented continuation lines.
	Cfg,
	/// TOML with one top-level table per section.
	Toml,
}

impl SourceFormat {
	/// The extension appended to import references that don't carry one.
	pub const DEFAULT_EXTENSION: &'static str = "cfg";

	/// Determine the format from a path's extension.
	pub fn from_path(path: &Path) -> InvoiceResult<Self> {
		let extension = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		match extension.as_str() {
			"cfg" | "ini" => Ok(Self::Cfg),
			"toml" => Ok(Self::Toml),
			other => Err(InvoiceError::UnsupportedSourceFormat(other.to_string())),
		}
	}

	/// Whether `reference` already names a supported extension.
	pub fn has_known_extension(reference: &str) -> bool {
		let lower = reference.to_ascii_lowercase();
		[".cfg", ".ini", ".toml"]
			.iter()
			.any(|extension| lower.ends_with(extension))
	}
}

/// Read and parse the configuration source at `path`.
pub fn load_source(path: &Path) -> InvoiceResult<Namespace> {
	let format = SourceFormat::from_path(path)?;
	let content = std::fs::read_to_string(path)?;
	parse_source(&content, format, &path.display().to_string())
}

/// Parse configuration source text into a namespace.
pub fn parse_source(
	content: &str,
	format: SourceFormat,
	path_display: &str,
) -> InvoiceResult<Namespace> {
	match format {
		SourceFormat::Cfg => parse_cfg(content, path_display),
		SourceFormat::Toml => parse_toml(content, path_display),
	}
}

/// Where the line-oriented parser is relative to the last key it saw.
enum CfgState {
	/// No section header has been seen yet.
	Preamble,
	/// Inside a section, with no key that can take continuation lines.
	Section(String),
	/// Inside a section, directly after `key`. Indented lines extend its
	/// value.
	Value { section: String, key: String },
}

fn parse_cfg(content: &str, path_display: &str) -> InvoiceResult<Namespace> {
	let mut namespace = Namespace::new();
	let mut state = CfgState::Preamble;
	let error = |line: usize, reason: &str| {
		InvoiceError::SourceParse {
			path: path_display.to_string(),
			line,
			reason: reason.to_string(),
		}
	};

	for (index, raw) in content.lines().enumerate() {
		let line_number = index + 1;
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			state = match state {
				CfgState::Value { section, .. } => CfgState::Section(section),
				other => other,
			};
			continue;
		}

		if trimmed.starts_with('#') || trimmed.starts_with(';') {
			continue;
		}

		let indented = raw.starts_with([' ', '\t']);
		if indented {
			if let CfgState::Value { section, key } = &state {
				if section != DEFAULT_SECTION {
					let entries = namespace.entry(section.clone()).or_default();
					if let Some(value) = entries.get_mut(key) {
						if !value.is_empty() {
							value.push('\n');
						}
						value.push_str(trimmed);
					}
				}
				continue;
			}
		}

		if let Some(header) = trimmed.strip_prefix('[') {
			let Some(name) = header.strip_suffix(']') else {
				return Err(error(line_number, "section header is missing `]`"));
			};
			let name = name.trim().to_string();
			if name.is_empty() {
				return Err(error(line_number, "section name is empty"));
			}
			if name != DEFAULT_SECTION {
				namespace.entry(name.clone()).or_default();
			}
			state = CfgState::Section(name);
			continue;
		}

		let section = match state {
			CfgState::Preamble => {
				return Err(error(line_number, "key found before any `[SECTION]` header"));
			}
			CfgState::Section(section) | CfgState::Value { section, .. } => section,
		};

		let Some(split_at) = trimmed.find(['=', ':']) else {
			return Err(error(line_number, "expected `key = value`"));
		};
		let key = trimmed[..split_at].trim().to_ascii_lowercase();
		if key.is_empty() {
			return Err(error(line_number, "key is empty"));
		}
		let value = trimmed[split_at + 1..].trim().to_string();

		if section != DEFAULT_SECTION {
			namespace
				.entry(section.clone())
				.or_default()
				.insert(key.clone(), value);
		}
		state = CfgState::Value { section, key };
	}

	Ok(namespace)
}

fn parse_toml(content: &str, path_display: &str) -> InvoiceResult<Namespace> {
	let table: toml::Table = toml::from_str(content).map_err(|e| {
		InvoiceError::SourceParse {
			path: path_display.to_string(),
			line: toml_error_line(content, e.span()),
			reason: e.message().to_string(),
		}
	})?;
	let mut namespace = Namespace::new();

	for (name, value) in table {
		let toml::Value::Table(entries) = value else {
			return Err(InvoiceError::SourceParse {
				path: path_display.to_string(),
				line: 0,
				reason: format!("top-level key `{name}` must be a table"),
			});
		};

		let mut section = Section::new();
		for (key, value) in entries {
			let text = toml_scalar_to_string(&value).ok_or_else(|| {
				InvoiceError::SourceParse {
					path: path_display.to_string(),
					line: 0,
					reason: format!("`{name}.{key}` must be a scalar or an array of scalars"),
				}
			})?;
			section.insert(key.to_ascii_lowercase(), text);
		}
		namespace.insert(name, section);
	}

	Ok(namespace)
}

/// Stringify a TOML value. Arrays of scalars are joined with newlines so they
/// read like a `.cfg` continuation list.
fn toml_scalar_to_string(value: &toml::Value) -> Option<String> {
	match value {
		toml::Value::String(s) => Some(s.clone()),
		toml::Value::Integer(i) => Some(i.to_string()),
		toml::Value::Float(f) => Some(f.to_string()),
		toml::Value::Boolean(b) => Some(b.to_string()),
		toml::Value::Datetime(dt) => Some(dt.to_string()),
		toml::Value::Array(items) => {
			let parts: Option<Vec<String>> = items
				.iter()
				.map(|item| {
					match item {
						toml::Value::Array(_) | toml::Value::Table(_) => None,
						scalar => toml_scalar_to_string(scalar),
					}
				})
				.collect();
			parts.map(|parts| parts.join("\n"))
		}
		toml::Value::Table(_) => None,
	}
}

fn toml_error_line(content: &str, span: Option<std::ops::Range<usize>>) -> usize {
	span.map_or(0, |span| {
		content[..span.start.min(content.len())]
			.bytes()
			.filter(|b| *b == b'\n')
			.count() + 1
	})
}
