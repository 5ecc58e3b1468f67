//! `invoicer_core` is the core library for the invoicer document generator.
//! It merges a chain of configuration sources into one namespace, turns
//! line-item sections into ordered records with computed totals, and expands
//! a small directive language over a text template (usually LaTeX).
//!
//! ## Processing Pipeline
//!
//! ```text
//! Root config source
//!   → Importer (walks `META.import`, merges imports first and the root last)
//!   → Aggregator (builds ITEM_* / EXPENSE_* records, aggregate sections, totals)
//!   → Document (frozen namespace + record collections)
//!   → Renderer (expands directives left to right, then substitutes variables)
//! ```
//!
//! ## Template Syntax
//!
//! - `{{ key }}` / `{{ SECTION.key }}`: variable interpolation. A bare key
//!   reads from `META`. Unknown variables render as an empty string.
//! - `{* items *}...{/* items *}`: repeat the body for each `ITEM_*` record,
//!   exposing it as `{{ ITEM.field }}`. `expenses` does the same for
//!   `EXPENSE_*` records.
//! - `{* optional META.vat_id *}...{/* optional *}`: render the body only when
//!   the variable is non-empty. `optional-not` is the inverse.
//! - `{* include "terms.tex" *}`: render another file in place. Any
//!   directive accepts a quoted (or bare, existing) file in place of a
//!   `{/* name *}`-terminated body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoicer_core::render_file;
//!
//! let tex = render_file("clients/acme.cfg", "invoice_template.tex")?;
//! println!("{tex}");
//! # Ok::<(), invoicer_core::InvoiceError>(())
//! ```

pub use aggregator::*;
pub use directives::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use importer::*;
pub use namespace::*;
pub use resolver::*;
pub use source::*;

mod aggregator;
mod directives;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
mod importer;
mod namespace;
mod resolver;
pub(crate) mod scanner;
mod source;

#[cfg(test)]
mod __fixtures;
