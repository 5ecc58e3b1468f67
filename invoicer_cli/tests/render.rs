mod common;

use invoicer_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use similar_asserts::assert_eq;

const EXPECTED: &str = "Widgets Ltd bills Acme\nSetup & 60.00 \\\\\nSupport & 20.00 \\\\\nTotal: \
                        80.00 EUR\n";

#[test]
fn render_prints_to_stdout() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let (config, template) = common::write_invoice_project(tmp.path())?;

	let output = common::invoicer_cmd()
		.arg("render")
		.arg("--cfg")
		.arg(&config)
		.arg("--template")
		.arg(&template)
		.arg("--stdout")
		.output()?;

	assert!(output.status.success());
	assert_eq!(String::from_utf8(output.stdout)?, EXPECTED);

	Ok(())
}

#[test]
fn render_writes_output_without_compiling() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let (config, template) = common::write_invoice_project(tmp.path())?;
	let out_path = tmp.path().join("build/nested/invoice.tex");

	common::invoicer_cmd()
		.arg("render")
		.arg("--cfg")
		.arg(&config)
		.arg("--template")
		.arg(&template)
		.arg("--out-path")
		.arg(&out_path)
		.arg("--no-compile")
		.assert()
		.success()
		.stdout(predicates::str::contains("Rendered"));

	assert_eq!(std::fs::read_to_string(&out_path)?, EXPECTED);
	assert!(!out_path.with_extension("pdf").exists());

	Ok(())
}

#[test]
fn render_accepts_short_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let (config, template) = common::write_invoice_project(tmp.path())?;
	let out_path = tmp.path().join("out/invoice.tex");

	common::invoicer_cmd()
		.arg("render")
		.arg("-c")
		.arg(&config)
		.arg("-t")
		.arg(&template)
		.arg("-o")
		.arg(&out_path)
		.arg("--no-compile")
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(&out_path)?, EXPECTED);

	Ok(())
}

#[test]
fn render_uses_default_paths() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let (config, template) = common::write_invoice_project(tmp.path())?;
	std::fs::copy(tmp.path().join("templates/row.tex"), tmp.path().join("row.tex"))?;
	std::fs::copy(&template, tmp.path().join("invoice_template.tex"))?;

	common::invoicer_cmd()
		.current_dir(tmp.path())
		.arg("render")
		.arg("--cfg")
		.arg(&config)
		.arg("--no-compile")
		.assert()
		.success();

	assert_eq!(
		std::fs::read_to_string(tmp.path().join("out/invoice.tex"))?,
		EXPECTED
	);

	Ok(())
}

#[test]
fn unknown_directive_fails_without_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let (config, template) = common::write_invoice_project(tmp.path())?;
	std::fs::write(&template, "before {* bogus *} after\n")?;
	let out_path = tmp.path().join("out/invoice.tex");

	common::invoicer_cmd()
		.arg("render")
		.arg("--cfg")
		.arg(&config)
		.arg("--template")
		.arg(&template)
		.arg("--out-path")
		.arg(&out_path)
		.arg("--no-compile")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("invoicer::unknown_directive").and(
			predicates::str::contains("bogus"),
		));

	assert!(!out_path.exists());

	Ok(())
}

#[test]
fn missing_imports_are_listed_together() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = tmp.path().join("root.cfg");
	std::fs::write(&config, "[META]\nimport =\n  ./first\n  ./second\n")?;

	common::invoicer_cmd()
		.arg("vars")
		.arg("--cfg")
		.arg(&config)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("first.cfg").and(predicates::str::contains("second.cfg")));

	Ok(())
}

#[test]
fn no_subcommand_exits_with_one() {
	common::invoicer_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));
}
