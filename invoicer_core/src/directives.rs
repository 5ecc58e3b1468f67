use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::InvoiceError;
use crate::InvoiceResult;
use crate::aggregator::RecordKind;
use crate::engine::Renderer;
use crate::resolver::Scope;
use crate::resolver::resolve_variable;

/// One resolved directive occurrence, handed to its handler.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
	/// The directive name as written.
	pub name: &'a str,
	/// The argument string, if any.
	pub argument: Option<&'a str>,
	/// The body: the text between the opener and its matching closer, or the
	/// contents of the referenced file.
	pub body: &'a str,
	/// Directory used to resolve file references inside the body.
	pub base_dir: &'a Path,
}

impl Invocation<'_> {
	/// Fail when an argument was given to a directive that takes none.
	pub fn reject_argument(&self) -> InvoiceResult<()> {
		match self.argument {
			Some(argument) => {
				Err(InvoiceError::UnexpectedArgument {
					directive: self.name.to_string(),
					argument: argument.to_string(),
				})
			}
			None => Ok(()),
		}
	}

	/// The argument, or an error when it is missing.
	pub fn require_argument(&self) -> InvoiceResult<&str> {
		self.argument
			.ok_or_else(|| InvoiceError::MissingArgument(self.name.to_string()))
	}
}

/// A named templating instruction.
///
/// Handlers produce the replacement text for their directive. Their output is
/// not scanned again by the enclosing pass; a handler that wants its body
/// expanded renders it through the [`Renderer`].
pub trait Directive {
	fn expand(
		&self,
		renderer: &Renderer<'_>,
		scope: &Scope<'_>,
		invocation: &Invocation<'_>,
	) -> InvoiceResult<String>;
}

/// Maps directive names to their handlers.
#[derive(Default)]
pub struct DirectiveRegistry {
	handlers: BTreeMap<String, Box<dyn Directive>>,
}

impl fmt::Debug for DirectiveRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.handlers.keys()).finish()
	}
}

impl DirectiveRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// The built-in directives: one iteration directive per standard record
	/// kind, `optional`, `optional-not`, and `include`.
	pub fn standard() -> Self {
		let mut registry = Self::new();

		for kind in RecordKind::STANDARD {
			registry.register(kind.directive, Iterate { kind });
		}

		registry
			.register("optional", Optional { negate: false })
			.register("optional-not", Optional { negate: true })
			.register("include", Include);

		registry
	}

	/// Register `handler` under `name`, replacing any previous handler.
	pub fn register(
		&mut self,
		name: impl Into<String>,
		handler: impl Directive + 'static,
	) -> &mut Self {
		self.handlers.insert(name.into(), Box::new(handler));
		self
	}

	pub fn get(&self, name: &str) -> Option<&dyn Directive> {
		self.handlers.get(name).map(|handler| &**handler)
	}

	/// Registered names in ascending order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.handlers.keys().map(String::as_str)
	}
}

/// Renders the body once per record of `kind`, with the record installed
/// under the kind's scope name.
#[derive(Debug, Clone, Copy)]
pub struct Iterate {
	pub kind: RecordKind,
}

impl Directive for Iterate {
	fn expand(
		&self,
		renderer: &Renderer<'_>,
		scope: &Scope<'_>,
		invocation: &Invocation<'_>,
	) -> InvoiceResult<String> {
		invocation.reject_argument()?;

		let Some(collection) = renderer.document().records(&self.kind) else {
			return Ok(String::new());
		};

		let mut output = String::new();
		for record in collection.records() {
			let scope = scope.with(self.kind.scope, record);
			output.push_str(&renderer.render_in_scope(
				invocation.body,
				invocation.base_dir,
				&scope,
			)?);
		}

		Ok(output)
	}
}

/// Renders the body only when the argument's variable is non-empty, or only
/// when it is empty if `negate` is set.
#[derive(Debug, Clone, Copy)]
pub struct Optional {
	pub negate: bool,
}

impl Directive for Optional {
	fn expand(
		&self,
		renderer: &Renderer<'_>,
		scope: &Scope<'_>,
		invocation: &Invocation<'_>,
	) -> InvoiceResult<String> {
		let reference = invocation.require_argument()?;
		let value = resolve_variable(renderer.document().namespace(), scope, reference);
		let present = !value.is_empty();

		if present == self.negate {
			return Ok(String::new());
		}

		renderer.render_in_scope(invocation.body, invocation.base_dir, scope)
	}
}

/// Renders its body in the current scope. Usually the body comes from a
/// file: `{* include "terms.tex" *}`.
#[derive(Debug, Clone, Copy)]
pub struct Include;

impl Directive for Include {
	fn expand(
		&self,
		renderer: &Renderer<'_>,
		scope: &Scope<'_>,
		invocation: &Invocation<'_>,
	) -> InvoiceResult<String> {
		invocation.reject_argument()?;
		renderer.render_in_scope(invocation.body, invocation.base_dir, scope)
	}
}
