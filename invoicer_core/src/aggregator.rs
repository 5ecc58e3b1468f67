use std::collections::BTreeMap;
use std::str::FromStr;

use derive_more::Deref;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::namespace::META_SECTION;
use crate::namespace::Namespace;
use crate::namespace::Section;

/// Fields rewritten to two-decimal text when they hold a fractional number.
const NUMERIC_FIELDS: [&str; 4] = ["hrs", "qty", "rate", "recurring"];

/// Key under which totals are written to the aggregate section and `META`.
pub const TOTAL_DUE_KEY: &str = "total_due";
/// Key under which recurring totals are written to the aggregate section and
/// `META`.
pub const TOTAL_RECURRING_DUE_KEY: &str = "total_recurring_due";

/// Static description of a family of record sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKind {
	/// Section prefix without the trailing underscore, e.g. `ITEM` for
	/// `[ITEM_001]`.
	pub prefix: &'static str,
	/// Scope name under which the current record is exposed while iterating,
	/// e.g. `{{ ITEM.rate }}`.
	pub scope: &'static str,
	/// Name of the iteration directive, e.g. `{* items *}`.
	pub directive: &'static str,
	/// Section that receives the comma-joined fields and totals.
	pub aggregate: &'static str,
}

impl RecordKind {
	/// The billable line items of a document.
	pub const ITEMS: RecordKind = RecordKind {
		prefix: "ITEM",
		scope: "ITEM",
		directive: "items",
		aggregate: "ALL_ITEMS",
	};
	/// Out-of-pocket expenses passed on to the client.
	pub const EXPENSES: RecordKind = RecordKind {
		prefix: "EXPENSE",
		scope: "EXPENSE",
		directive: "expenses",
		aggregate: "ALL_EXPENSES",
	};
	/// Every kind a standard document resolves.
	pub const STANDARD: [RecordKind; 2] = [Self::ITEMS, Self::EXPENSES];

	/// The section-name prefix including its separator, e.g. `ITEM_`.
	pub fn section_prefix(&self) -> String {
		format!("{}_", self.prefix)
	}
}

/// One record section, flattened, with its derived fields filled in.
///
/// Dereferences to the display fields. The numeric amounts used for totals
/// are kept separately so that annotated display text (e.g. `30.00 / month`)
/// never leaks into arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct Record {
	/// Name of the section this record was built from.
	pub section: String,
	#[deref]
	fields: Section,
	subtotal: Option<Decimal>,
	recurring: Option<Decimal>,
}

impl Record {
	/// Build a record from its section, deriving `id`, normalized numbers, and
	/// the `subtotal` when it can be computed.
	pub fn from_section(kind: &RecordKind, section: &str, entries: &Section) -> Self {
		let mut fields = entries.clone();

		if !fields.contains_key("id") {
			let id = section
				.strip_prefix(&kind.section_prefix())
				.unwrap_or(section);
			fields.insert("id".to_string(), id.to_string());
		}

		for key in NUMERIC_FIELDS {
			if let Some(value) = fields.get_mut(key) {
				if value.contains('.') {
					if let Some(amount) = parse_amount(value) {
						*value = format_amount(amount);
					}
				}
			}
		}

		let subtotal = if let Some(explicit) = fields.get("subtotal") {
			leading_amount(explicit)
		} else {
			let derived = derive_subtotal(&fields);
			match derived {
				Some(amount) => {
					fields.insert("subtotal".to_string(), format_amount(amount));
				}
				None => {
					tracing::debug!(
						section,
						"subtotal not derived: `hrs`/`qty` or `rate` missing or not numeric"
					);
				}
			}
			derived
		};
		let recurring = fields.get("recurring").and_then(|value| leading_amount(value));

		Self {
			section: section.to_string(),
			fields,
			subtotal,
			recurring,
		}
	}

	/// Look up a field. The key is matched case-insensitively.
	pub fn field(&self, key: &str) -> Option<&str> {
		self.fields
			.get(&key.to_ascii_lowercase())
			.map(String::as_str)
	}

	/// The display fields of this record.
	pub fn fields(&self) -> &Section {
		&self.fields
	}

	/// The numeric subtotal counted towards `total_due`.
	pub fn subtotal(&self) -> Option<Decimal> {
		self.subtotal
	}

	/// The numeric recurring amount counted towards `total_recurring_due`.
	pub fn recurring(&self) -> Option<Decimal> {
		self.recurring
	}
}

/// `(hrs or qty) × rate`, or `None` when an input is missing or not a number.
fn derive_subtotal(fields: &Section) -> Option<Decimal> {
	let quantity = fields.get("hrs").or_else(|| fields.get("qty"))?;
	let rate = fields.get("rate")?;

	parse_amount(quantity)?.checked_mul(parse_amount(rate)?)
}

/// The records sharing a prefix, in section-name order, with their totals.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct RecordCollection {
	pub kind: RecordKind,
	#[deref]
	records: Vec<Record>,
	total_due: Decimal,
	total_recurring_due: Decimal,
}

impl RecordCollection {
	pub fn records(&self) -> &[Record] {
		&self.records
	}

	/// Sum of every record's numeric subtotal.
	pub fn total_due(&self) -> Decimal {
		self.total_due
	}

	/// Sum of every record's numeric recurring amount.
	pub fn total_recurring_due(&self) -> Decimal {
		self.total_recurring_due
	}
}

/// Document-level totals that are still ours to write. A `None` field means
/// the namespace supplied that total explicitly.
#[derive(Debug)]
struct DocumentTotals {
	due: Option<Decimal>,
	recurring: Option<Decimal>,
}

/// Builds [`RecordCollection`]s from a namespace, once per prefix.
///
/// The memo table is owned by the aggregator, so independent namespaces never
/// share results. Resolving a prefix writes its aggregate section and adds
/// its totals to the document-level totals in `META`, unless those were given
/// explicitly.
#[derive(Debug, Default)]
pub struct ItemAggregator {
	collections: BTreeMap<&'static str, RecordCollection>,
	document_totals: Option<DocumentTotals>,
}

impl ItemAggregator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolve the records of `kind`, computing them on the first call and
	/// returning the memoized collection afterwards.
	pub fn resolve(&mut self, namespace: &mut Namespace, kind: &RecordKind) -> &RecordCollection {
		if !self.collections.contains_key(kind.prefix) {
			let collection = self.build(namespace, kind);
			self.collections.insert(kind.prefix, collection);
		}

		&self.collections[kind.prefix]
	}

	/// Take ownership of every resolved collection, keyed by prefix.
	pub fn into_collections(self) -> BTreeMap<&'static str, RecordCollection> {
		self.collections
	}

	fn build(&mut self, namespace: &mut Namespace, kind: &RecordKind) -> RecordCollection {
		let totals = self.document_totals.get_or_insert_with(|| {
			DocumentTotals {
				due: (!namespace.contains(META_SECTION, TOTAL_DUE_KEY)).then_some(Decimal::ZERO),
				recurring: (!namespace.contains(META_SECTION, TOTAL_RECURRING_DUE_KEY))
					.then_some(Decimal::ZERO),
			}
		});

		let prefix = kind.section_prefix();
		let records: Vec<Record> = namespace
			.iter()
			.filter(|(name, _)| name.starts_with(&prefix))
			.map(|(name, entries)| Record::from_section(kind, name, entries))
			.collect();

		let total_due = sum_amounts(&records, Record::subtotal, TOTAL_DUE_KEY);
		let total_recurring_due = sum_amounts(&records, Record::recurring, TOTAL_RECURRING_DUE_KEY);

		if !namespace.contains_key(kind.aggregate) {
			let mut aggregate = Section::new();
			for record in &records {
				for (key, value) in record.fields() {
					aggregate
						.entry(key.clone())
						.and_modify(|joined: &mut String| {
							joined.push_str(", ");
							joined.push_str(value);
						})
						.or_insert_with(|| value.clone());
				}
			}
			namespace.insert(kind.aggregate.to_string(), aggregate);
		}

		if !namespace.contains(kind.aggregate, TOTAL_DUE_KEY) {
			namespace.set(kind.aggregate, TOTAL_DUE_KEY, format_amount(total_due));
		}
		if !namespace.contains(kind.aggregate, TOTAL_RECURRING_DUE_KEY) {
			namespace.set(
				kind.aggregate,
				TOTAL_RECURRING_DUE_KEY,
				format_optional_amount(total_recurring_due),
			);
		}

		if let Some(due) = totals.due.as_mut() {
			*due = accumulate(*due, total_due, kind.aggregate, TOTAL_DUE_KEY);
			namespace.set(META_SECTION, TOTAL_DUE_KEY, format_amount(*due));
		}
		if let Some(recurring) = totals.recurring.as_mut() {
			*recurring = accumulate(
				*recurring,
				total_recurring_due,
				kind.aggregate,
				TOTAL_RECURRING_DUE_KEY,
			);
			namespace.set(
				META_SECTION,
				TOTAL_RECURRING_DUE_KEY,
				format_optional_amount(*recurring),
			);
		}

		tracing::debug!(
			prefix = kind.prefix,
			records = records.len(),
			%total_due,
			%total_recurring_due,
			"resolved record collection"
		);

		RecordCollection {
			kind: *kind,
			records,
			total_due,
			total_recurring_due,
		}
	}
}

/// Sum the amounts `amount` extracts from `records`. An amount that would
/// overflow the running total is left out, like an amount that can't be
/// derived at all.
fn sum_amounts(
	records: &[Record],
	amount: fn(&Record) -> Option<Decimal>,
	field: &str,
) -> Decimal {
	records.iter().fold(Decimal::ZERO, |total, record| {
		match amount(record) {
			Some(value) => accumulate(total, value, &record.section, field),
			None => total,
		}
	})
}

/// `total + amount`, or `total` unchanged when the sum overflows.
fn accumulate(total: Decimal, amount: Decimal, source: &str, field: &str) -> Decimal {
	total.checked_add(amount).unwrap_or_else(|| {
		tracing::debug!(source, field, "amount left out of total: sum overflows");
		total
	})
}

/// Parse a decimal amount, ignoring surrounding whitespace.
pub fn parse_amount(text: &str) -> Option<Decimal> {
	Decimal::from_str(text.trim()).ok()
}

/// Parse the number at the start of `text`, ignoring any annotation after it
/// (e.g. `30.00 / month`).
pub fn leading_amount(text: &str) -> Option<Decimal> {
	let text = text.trim_start();
	let end = text
		.char_indices()
		.find(|&(index, ch)| {
			let sign = index == 0 && matches!(ch, '-' | '+');
			!(ch.is_ascii_digit() || ch == '.' || sign)
		})
		.map_or(text.len(), |(index, _)| index);

	parse_amount(&text[..end])
}

/// Two-decimal fixed-point text, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
	format!(
		"{:.2}",
		amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
	)
}

/// Like [`format_amount`], but zero becomes an empty string.
fn format_optional_amount(amount: Decimal) -> String {
	if amount.is_zero() {
		String::new()
	} else {
		format_amount(amount)
	}
}
