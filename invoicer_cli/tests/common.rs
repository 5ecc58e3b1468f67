use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn invoicer_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("invoicer"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Lay out a small client directory: a company source imported by the client
/// source, a template, and a row partial. Returns `(config, template)`.
pub fn write_invoice_project(root: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
	std::fs::create_dir_all(root.join("config"))?;
	std::fs::create_dir_all(root.join("templates"))?;

	std::fs::write(
		root.join("config/company.cfg"),
		"[META]\ncompany = Widgets Ltd\ncurrency = EUR\n",
	)?;
	let config = root.join("config/acme.cfg");
	std::fs::write(
		&config,
		"[META]\nimport = ./company\nclient = Acme\n\n[ITEM_1]\ndescription = Setup\nhrs = 1.5\nrate = \
		 40\n\n[ITEM_2]\ndescription = Support\nqty = 2\nrate = 10\n",
	)?;

	std::fs::write(
		root.join("templates/row.tex"),
		"{{ ITEM.description }} & {{ ITEM.subtotal }} \\\\\n",
	)?;
	let template = root.join("templates/invoice.tex");
	std::fs::write(
		&template,
		"{{ company }} bills {{ client }}\n{* items \"row.tex\" *}Total: {{ total_due }} {{ currency \
		 }}\n",
	)?;

	Ok((config, template))
}
