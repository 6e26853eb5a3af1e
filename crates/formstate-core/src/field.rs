//! Per-field state and declared properties

use crate::value::FieldValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Field name to state, for one form
pub type FieldMap = BTreeMap<String, FieldState>;

/// Field name to declared properties, for one form
pub type PropertyMap = BTreeMap<String, FieldProperties>;

/// Stored state of one field
///
/// Equality compares the data only, not the write stamp.
#[derive(Debug, Clone, Serialize)]
pub struct FieldState {
	pub value: Option<FieldValue>,
	pub valid: bool,
	/// Only meaningful while `valid` is `false`
	#[serde(skip_serializing_if = "Option::is_none")]
	pub invalid_reason: Option<String>,
	/// Store revision of the last published value write, `0` if never
	#[serde(skip)]
	pub(crate) stamp: u64,
}

impl FieldState {
	/// Valid field holding `value`
	pub fn new(value: Option<FieldValue>) -> Self {
		Self {
			value,
			valid: true,
			invalid_reason: None,
			stamp: 0,
		}
	}

	/// Revision of the publish that last wrote the value
	///
	/// Every published value write moves the stamp, even when the written
	/// value equals the old one. Validity updates and in-place writes leave
	/// it alone.
	pub fn stamp(&self) -> u64 {
		self.stamp
	}

	pub(crate) fn stamped(mut self, stamp: u64) -> Self {
		self.stamp = stamp;
		self
	}

	/// Field with no value yet
	pub fn empty() -> Self {
		Self::new(None)
	}

	pub(crate) fn set_valid(&mut self, valid: bool) {
		self.valid = valid;
		if valid {
			self.invalid_reason = None;
		}
	}
}

impl PartialEq for FieldState {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
			&& self.valid == other.valid
			&& self.invalid_reason == other.invalid_reason
	}
}

impl Default for FieldState {
	fn default() -> Self {
		Self::empty()
	}
}

/// Result of a field validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
	Valid,
	Invalid,
	/// Invalid, with a message to show next to the field
	InvalidBecause(String),
}

impl Verdict {
	/// `true` only for [`Verdict::Valid`]
	pub fn is_valid(&self) -> bool {
		matches!(self, Verdict::Valid)
	}

	/// Message of an [`Verdict::InvalidBecause`]
	pub fn reason(&self) -> Option<&str> {
		match self {
			Verdict::InvalidBecause(reason) => Some(reason),
			_ => None,
		}
	}
}

impl From<bool> for Verdict {
	fn from(valid: bool) -> Self {
		if valid { Verdict::Valid } else { Verdict::Invalid }
	}
}

impl From<String> for Verdict {
	fn from(reason: String) -> Self {
		Verdict::InvalidBecause(reason)
	}
}

impl From<&str> for Verdict {
	fn from(reason: &str) -> Self {
		Verdict::InvalidBecause(reason.to_string())
	}
}

impl<E: Into<String>> From<Result<(), E>> for Verdict {
	fn from(result: Result<(), E>) -> Self {
		match result {
			Ok(()) => Verdict::Valid,
			Err(reason) => Verdict::InvalidBecause(reason.into()),
		}
	}
}

/// Decides whether a value satisfies a required constraint
pub type RequiredFn = Rc<dyn Fn(Option<&FieldValue>) -> bool>;
/// Field validator over the stored value
pub type ValidatorFn = Rc<dyn Fn(Option<&FieldValue>) -> Verdict>;

/// Required-ness of a field
#[derive(Clone)]
pub enum Required {
	/// `Flag(true)` fails on an absent value
	Flag(bool),
	/// Fails when the predicate returns `false` for the current value
	Predicate(RequiredFn),
}

impl Required {
	/// Required when `f` says so for the current value
	pub fn predicate(f: impl Fn(Option<&FieldValue>) -> bool + 'static) -> Self {
		Required::Predicate(Rc::new(f))
	}

	/// Whether `value` satisfies this requirement
	pub fn is_satisfied_by(&self, value: Option<&FieldValue>) -> bool {
		match self {
			Required::Flag(true) => value.is_some(),
			Required::Flag(false) => true,
			Required::Predicate(check) => check(value),
		}
	}
}

impl From<bool> for Required {
	fn from(flag: bool) -> Self {
		Required::Flag(flag)
	}
}

impl fmt::Debug for Required {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Required::Flag(flag) => write!(f, "Flag({flag})"),
			Required::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

/// Declared constraints of a field
#[derive(Clone, Default)]
pub struct FieldProperties {
	pub default_value: Option<FieldValue>,
	pub required: Option<Required>,
	pub validator: Option<ValidatorFn>,
}

impl FieldProperties {
	/// No default, not required, no validator
	pub fn new() -> Self {
		Self::default()
	}

	/// Value restored by [`crate::store::FormStore::reset_form`]
	pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
		self.default_value = Some(value.into());
		self
	}

	/// `true`, `false` or a [`Required::predicate`]
	pub fn with_required(mut self, required: impl Into<Required>) -> Self {
		self.required = Some(required.into());
		self
	}

	/// Validator returning a `bool`, a reason or a `Result`
	///
	/// # Examples
	///
	/// ```
	/// use formstate_core::field::FieldProperties;
	/// use formstate_core::store::{FieldUpdate, FormStore};
	/// use formstate_core::value::FieldValue;
	///
	/// let store = FormStore::new();
	/// let adult = FieldProperties::new().with_validator(|value: Option<&FieldValue>| {
	/// 	match value.and_then(FieldValue::as_i64) {
	/// 		Some(age) if age < 18 => Err("must be an adult"),
	/// 		_ => Ok(()),
	/// 	}
	/// });
	/// store.set_field_properties("f", "age", adult);
	/// store.update_field("f", "age", FieldUpdate::value(12));
	///
	/// assert!(!store.validate_form("f"));
	/// let state = store.field("f", "age").unwrap();
	/// assert_eq!(state.invalid_reason.as_deref(), Some("must be an adult"));
	/// ```
	pub fn with_validator<V, F>(mut self, validator: F) -> Self
	where
		V: Into<Verdict>,
		F: Fn(Option<&FieldValue>) -> V + 'static,
	{
		self.validator = Some(Rc::new(move |value: Option<&FieldValue>| -> Verdict {
			validator(value).into()
		}));
		self
	}

	/// Overlay the entries present in `patch`, keeping the others
	pub fn merge(&mut self, patch: FieldProperties) {
		if patch.default_value.is_some() {
			self.default_value = patch.default_value;
		}
		if patch.required.is_some() {
			self.required = patch.required;
		}
		if patch.validator.is_some() {
			self.validator = patch.validator;
		}
	}
}

impl fmt::Debug for FieldProperties {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldProperties")
			.field("default_value", &self.default_value)
			.field("required", &self.required)
			.field("validator", &self.validator.as_ref().map(|_| ".."))
			.finish()
	}
}
