use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum InvoiceError {
	#[error(transparent)]
	#[diagnostic(code(invoicer::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config source `{path}` at line {line}: {reason}")]
	#[diagnostic(
		code(invoicer::source_parse),
		help("config sources are `[SECTION]` headers followed by `key = value` lines")
	)]
	SourceParse {
		path: String,
		line: usize,
		reason: String,
	},

	#[error("unsupported config source format: `{0}`")]
	#[diagnostic(
		code(invoicer::unsupported_format),
		help("supported formats: cfg, toml")
	)]
	UnsupportedSourceFormat(String),

	#[error("could not import the following config files:\n{}", ImportFailure::list(.failures))]
	#[diagnostic(
		code(invoicer::import),
		help("fix or remove the listed entries in the `import` key of the importing files")
	)]
	Import { failures: Vec<ImportFailure> },

	#[error("unknown directive: `{0}`")]
	#[diagnostic(
		code(invoicer::unknown_directive),
		help("available directives: items, expenses, optional, optional-not, include")
	)]
	UnknownDirective(String),

	#[error("missing closing tag for directive: `{0}`")]
	#[diagnostic(
		code(invoicer::missing_closing_tag),
		help("add `{{/* {0} *}}` to close this directive")
	)]
	MissingClosingTag(String),

	#[error("directive `{directive}` does not take an argument, got `{argument}`")]
	#[diagnostic(code(invoicer::unexpected_argument))]
	UnexpectedArgument { directive: String, argument: String },

	#[error("directive `{0}` requires an argument")]
	#[diagnostic(
		code(invoicer::missing_argument),
		help("pass a variable reference, e.g. `{{* {0} META.vat_id *}}`")
	)]
	MissingArgument(String),

	#[error("failed to read include file `{path}`: {reason}")]
	#[diagnostic(code(invoicer::include_file))]
	IncludeFile { path: String, reason: String },

	#[error("include file `{path}` includes itself")]
	#[diagnostic(
		code(invoicer::recursive_include),
		help("remove the directive that leads back to `{path}` from its include chain")
	)]
	RecursiveInclude { path: String },

	#[error("document compiler exited with {status}")]
	#[diagnostic(
		code(invoicer::compiler),
		help("inspect the compiler log next to the generated output, or rerun with `--no-compile`")
	)]
	Compiler { status: String },
}

/// A single configuration source that could not be loaded during import
/// traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
	/// Resolved absolute path of the failing source.
	pub path: PathBuf,
	/// Why the source failed to load.
	pub reason: String,
}

impl ImportFailure {
	fn list(failures: &[ImportFailure]) -> String {
		failures
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join("\n")
	}
}

impl fmt::Display for ImportFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.path.display(), self.reason)
	}
}

pub type InvoiceResult<T> = Result<T, InvoiceError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
