use std::path::Path;
use std::process;

use clap::Parser;
use invoicer_core::AnyEmptyResult;
use invoicer_core::Document;
use invoicer_core::InvoiceError;
use invoicer_core::Namespace;
use invoicer_core::Renderer;
use invoicer_cli::COMPILER;
use invoicer_cli::Commands;
use invoicer_cli::InvoicerCli;
use invoicer_cli::VarsOutputFormat;
use owo_colors::OwoColorize;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = InvoicerCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// RUST_LOG is read first; --verbose adds a debug directive on top.
	let level = if args.verbose { Level::DEBUG } else { Level::WARN };
	let _ = tracing_subscriber::registry()
		.with(
			fmt::layer()
				.with_writer(std::io::stderr)
				.with_ansi(use_color),
		)
		.with(EnvFilter::from_default_env().add_directive(level.into()))
		.try_init();

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match args.command {
		Some(Commands::Render {
			cfg,
			template,
			out_path,
			no_compile,
			stdout,
		}) => run_render(&cfg, &template, &out_path, no_compile, stdout),
		Some(Commands::Vars { cfg, format }) => run_vars(&cfg, format),
		None => {
			eprintln!("No subcommand specified. Run `invoicer --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<InvoiceError>() {
			Ok(invoice_err) => {
				let report: miette::Report = (*invoice_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn run_render(
	cfg: &Path,
	template: &Path,
	out_path: &Path,
	no_compile: bool,
	stdout: bool,
) -> AnyEmptyResult {
	let document = Document::load(cfg)?;
	let source = std::fs::read_to_string(template).map_err(|e| {
		InvoiceError::IncludeFile {
			path: template.display().to_string(),
			reason: e.to_string(),
		}
	})?;
	let base_dir = template.parent().unwrap_or_else(|| Path::new(""));
	let rendered = Renderer::new(&document).render(&source, base_dir)?;

	if stdout {
		print!("{rendered}");
		return Ok(());
	}

	if let Some(parent) = out_path.parent() {
		if !parent.as_os_str().is_empty() {
			std::fs::create_dir_all(parent)?;
		}
	}
	std::fs::write(out_path, &rendered)?;
	println!(
		"{} {}",
		colored!("Rendered", green),
		out_path.display()
	);

	if no_compile {
		return Ok(());
	}

	compile(out_path)?;
	println!(
		"{} {}",
		colored!("Compiled", green),
		out_path.with_extension("pdf").display()
	);

	Ok(())
}

/// Run the LaTeX driver on `out_path`, keeping every generated file next to
/// it.
fn compile(out_path: &Path) -> AnyEmptyResult {
	let out_dir = out_path
		.parent()
		.filter(|parent| !parent.as_os_str().is_empty())
		.unwrap_or_else(|| Path::new("."));

	tracing::debug!(compiler = COMPILER, path = %out_path.display(), "compiling");
	let status = process::Command::new(COMPILER)
		.arg("-synctex=1")
		.arg("-interaction=nonstopmode")
		.arg("-file-line-error")
		.arg("-pdf")
		.arg(format!("-aux-directory={}", out_dir.display()))
		.arg(format!("-output-directory={}", out_dir.display()))
		.arg(out_path)
		.status()?;

	if !status.success() {
		return Err(InvoiceError::Compiler {
			status: status.to_string(),
		}
		.into());
	}

	Ok(())
}

fn run_vars(cfg: &Path, format: VarsOutputFormat) -> AnyEmptyResult {
	let document = Document::load(cfg)?;
	for source in document.sources() {
		tracing::debug!(source = %source.display(), "merged config source");
	}

	match format {
		VarsOutputFormat::Text => print_namespace(document.namespace()),
		VarsOutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(document.namespace())?);
		}
	}

	Ok(())
}

/// Print `namespace` in the `.cfg` dialect. Multi-line values are written as
/// indented continuation lines.
fn print_namespace(namespace: &Namespace) {
	for (index, (section, entries)) in namespace.iter().enumerate() {
		if index > 0 {
			println!();
		}
		println!("{}", colored!(format!("[{section}]"), bold));
		for (key, value) in entries {
			println!("{key} = {}", value.replace('\n', "\n    "));
		}
	}
}
