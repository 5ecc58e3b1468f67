use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

/// Default template path, relative to the working directory.
pub const DEFAULT_TEMPLATE: &str = "invoice_template.tex";
/// Default output path, relative to the working directory.
pub const DEFAULT_OUT_PATH: &str = "out/invoice.tex";
/// The LaTeX driver invoked after rendering.
pub const COMPILER: &str = "latexmk";

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render invoices and quotes from chained config files and LaTeX templates.",
	long_about = "invoicer merges a chain of `.cfg` (or `.toml`) sources into one namespace, \
	              computes line-item subtotals and totals, and expands a small directive \
	              language over a LaTeX template.\n\nQuick start:\n  invoicer render --cfg \
	              clients/acme.cfg   Render and compile an invoice\n  invoicer vars --cfg \
	              clients/acme.cfg     Inspect the merged variables"
)]
pub struct InvoicerCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template against a config source and compile it.
	///
	/// Loads the config source with everything it imports, expands the
	/// template's directives and variables, and writes the result to
	/// `--out-path`. The output is then compiled to PDF with `latexmk`, using
	/// the output directory for auxiliary files.
	Render {
		/// The root config source. Its `META.import` list is followed
		/// recursively.
		#[arg(long, short)]
		cfg: PathBuf,

		/// The template to render. Included files resolve relative to its
		/// directory.
		#[arg(long, short, default_value = DEFAULT_TEMPLATE)]
		template: PathBuf,

		/// Where to write the rendered text. Parent directories are created.
		#[arg(long, short, default_value = DEFAULT_OUT_PATH)]
		out_path: PathBuf,

		/// Write the rendered text without running the compiler.
		#[arg(long, default_value_t = false)]
		no_compile: bool,

		/// Print the rendered text to stdout instead of writing it. Implies
		/// `--no-compile`.
		#[arg(long, default_value_t = false)]
		stdout: bool,
	},
	/// Print every variable available to templates.
	///
	/// Shows the merged namespace after aggregation, including the
	/// `ALL_ITEMS` / `ALL_EXPENSES` sections and the computed totals.
	Vars {
		/// The root config source.
		#[arg(long, short)]
		cfg: PathBuf,

		/// Output format. Use `text` for an INI-like listing or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = VarsOutputFormat::Text)]
		format: VarsOutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VarsOutputFormat {
	/// `[SECTION]` headers followed by `key = value` lines.
	Text,
	/// A JSON object of sections, each an object of string values.
	Json,
}
