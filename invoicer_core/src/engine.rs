use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

use crate::InvoiceError;
use crate::InvoiceResult;
use crate::directives::Directive;
use crate::directives::DirectiveRegistry;
use crate::directives::Invocation;
use crate::document::Document;
use crate::resolver::Scope;
use crate::resolver::resolve_variable;
use crate::scanner::Marker;
use crate::scanner::MarkerKind;
use crate::scanner::scan;

/// Expands templates against a [`Document`].
///
/// Rendering runs in two stages: directives are expanded left to right until
/// none remain, then one variable pass substitutes what is left. Directive
/// bodies are rendered recursively in their own scope, which performs both
/// stages on the body alone.
#[derive(Debug)]
pub struct Renderer<'a> {
	document: &'a Document,
	registry: DirectiveRegistry,
	/// Canonical paths of the file bodies currently being expanded, outermost
	/// first.
	include_chain: RefCell<Vec<PathBuf>>,
}

impl<'a> Renderer<'a> {
	/// A renderer with the standard directives.
	pub fn new(document: &'a Document) -> Self {
		Self::with_registry(document, DirectiveRegistry::standard())
	}

	pub fn with_registry(document: &'a Document, registry: DirectiveRegistry) -> Self {
		Self {
			document,
			registry,
			include_chain: RefCell::new(vec![]),
		}
	}

	pub fn document(&self) -> &'a Document {
		self.document
	}

	/// Render a whole template. File references are resolved relative to
	/// `base_dir`.
	pub fn render(&self, template: &str, base_dir: &Path) -> InvoiceResult<String> {
		self.render_in_scope(template, base_dir, &Scope::root())
	}

	/// Expand every directive in `text`, then substitute its variables using
	/// `scope`.
	pub fn render_in_scope(
		&self,
		text: &str,
		base_dir: &Path,
		scope: &Scope<'_>,
	) -> InvoiceResult<String> {
		let expanded = self.expand_directives(text, base_dir, scope)?;
		Ok(self.substitute_variables(&expanded, scope))
	}

	/// Resolve the directives in `text` left to right. Each directive's
	/// replacement is final at this level: scanning continues after it.
	/// Variables are left untouched.
	pub fn expand_directives(
		&self,
		text: &str,
		base_dir: &Path,
		scope: &Scope<'_>,
	) -> InvoiceResult<String> {
		let markers = scan(text);
		let mut output = String::with_capacity(text.len());
		let mut cursor = 0;
		let mut index = 0;

		while index < markers.len() {
			let marker = &markers[index];
			let MarkerKind::Open(head) = &marker.kind else {
				index += 1;
				continue;
			};

			let opening = head.opening(base_dir);
			let handler = self
				.registry
				.get(opening.name)
				.ok_or_else(|| InvoiceError::UnknownDirective(opening.name.to_string()))?;
			output.push_str(&text[cursor..marker.span.start]);

			let replacement = if let Some(path) = &opening.include {
				let body = std::fs::read_to_string(path).map_err(|e| {
					InvoiceError::IncludeFile {
						path: path.display().to_string(),
						reason: e.to_string(),
					}
				})?;
				cursor = marker.span.end;
				index += 1;

				let invocation = Invocation {
					name: opening.name,
					argument: opening.argument,
					body: &body,
					base_dir: path.parent().unwrap_or(base_dir),
				};
				self.dispatch_file_body(path, handler, &invocation, scope)?
			} else {
				let closing = find_closing(&markers, index, opening.name, base_dir)?;
				let body = &text[marker.span.end..markers[closing].span.start];
				cursor = markers[closing].span.end;
				index = closing + 1;

				let invocation = Invocation {
					name: opening.name,
					argument: opening.argument,
					body,
					base_dir,
				};
				self.dispatch(handler, &invocation, scope)?
			};

			output.push_str(&replacement);
		}

		output.push_str(&text[cursor..]);
		Ok(output)
	}

	/// Replace every `{{ path }}` in `text` with its resolved value.
	pub fn substitute_variables(&self, text: &str, scope: &Scope<'_>) -> String {
		let mut output = String::with_capacity(text.len());
		let mut cursor = 0;

		for marker in scan(text) {
			let MarkerKind::Variable(reference) = &marker.kind else {
				continue;
			};

			output.push_str(&text[cursor..marker.span.start]);
			output.push_str(&resolve_variable(
				self.document.namespace(),
				scope,
				reference,
			));
			cursor = marker.span.end;
		}

		output.push_str(&text[cursor..]);
		output
	}

	/// Dispatch a directive whose body was read from `path`. The file stays on
	/// the include chain while its body is expanded, so a file that leads
	/// back to itself fails instead of recursing forever.
	fn dispatch_file_body(
		&self,
		path: &Path,
		handler: &dyn Directive,
		invocation: &Invocation<'_>,
		scope: &Scope<'_>,
	) -> InvoiceResult<String> {
		let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
		if self.include_chain.borrow().contains(&canonical) {
			return Err(InvoiceError::RecursiveInclude {
				path: path.display().to_string(),
			});
		}

		self.include_chain.borrow_mut().push(canonical);
		let result = self.dispatch(handler, invocation, scope);
		self.include_chain.borrow_mut().pop();

		result
	}

	fn dispatch(
		&self,
		handler: &dyn Directive,
		invocation: &Invocation<'_>,
		scope: &Scope<'_>,
	) -> InvoiceResult<String> {
		tracing::trace!(
			directive = invocation.name,
			argument = invocation.argument,
			"expanding directive"
		);
		handler.expand(self, scope, invocation)
	}
}

/// Find the index of the closer matching the block opener at `open`.
///
/// Only markers carrying the same name take part: every nested block opener
/// with that name needs its own closer before the outer one is reached.
/// Openers that take their body from a file have no closer and are skipped.
fn find_closing(
	markers: &[Marker],
	open: usize,
	name: &str,
	base_dir: &Path,
) -> InvoiceResult<usize> {
	let mut depth = 1_usize;

	for (index, marker) in markers.iter().enumerate().skip(open + 1) {
		match &marker.kind {
			MarkerKind::Open(head) if head.name == name && head.is_block(base_dir) => depth += 1,
			MarkerKind::Close(close) if close == name => {
				depth -= 1;
				if depth == 0 {
					return Ok(index);
				}
			}
			_ => {}
		}
	}

	Err(InvoiceError::MissingClosingTag(name.to_string()))
}

/// Load the configuration source at `config_path` (with its imports) and
/// render `template` against it. File references in the template resolve
/// relative to `base_dir`.
pub fn render_template(
	config_path: impl AsRef<Path>,
	template: &str,
	base_dir: &Path,
) -> InvoiceResult<String> {
	let document = Document::load(config_path)?;
	Renderer::new(&document).render(template, base_dir)
}

/// Like [`render_template`], reading the template from `template_path` and
/// resolving file references relative to its directory.
pub fn render_file(
	config_path: impl AsRef<Path>,
	template_path: impl AsRef<Path>,
) -> InvoiceResult<String> {
	let template_path = template_path.as_ref();
	let template = std::fs::read_to_string(template_path)?;
	let base_dir = template_path.parent().unwrap_or_else(|| Path::new(""));

	render_template(config_path, &template, base_dir)
}
