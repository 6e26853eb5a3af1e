//! Field value model
//!
//! Every value held by the store is a [`FieldValue`]. The variants mirror the
//! shapes an input element can produce: primitives, dates, ordered lists,
//! unordered sets and keyed maps, plain records and file lists.
//!
//! An absent value ("nothing entered yet") is represented by `Option::None`
//! at every API boundary, never by a variant.
//!
//! ## Example
//!
//! ```
//! use formstate_core::value::{FieldValue, FormValue};
//! use serde_json::json;
//!
//! let value = FieldValue::from_json(json!({ "id": 2, "tags": ["a", "b"] })).unwrap();
//! assert_eq!(value.get("id"), Some(&FieldValue::Int(2)));
//!
//! let text = String::from("hello").to_field_value();
//! assert_eq!(String::from_field_value(&text).as_deref(), Some("hello"));
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Metadata of one selected file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
	pub name: String,
	pub size: u64,
	pub mime_type: String,
	/// Milliseconds since the Unix epoch
	pub last_modified: i64,
}

impl FileEntry {
	/// File with an unknown modification time
	pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			size,
			mime_type: mime_type.into(),
			last_modified: 0,
		}
	}
}

/// A structurally comparable field value
#[derive(Clone)]
pub enum FieldValue {
	/// Explicit null inside structured data
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Date(NaiveDateTime),
	/// Ordered list
	Array(Vec<FieldValue>),
	/// Unordered collection of distinct values
	Set(Vec<FieldValue>),
	/// Unordered keyed collection with arbitrary keys
	Map(Vec<(FieldValue, FieldValue)>),
	/// Plain object
	Record(BTreeMap<String, FieldValue>),
	Files(Vec<FileEntry>),
	/// Aliased node. Several parents may point at the same cell, which is
	/// also the only way to build a cyclic value.
	Shared(Rc<RefCell<FieldValue>>),
}

impl FieldValue {
	/// Wrap a value into a shareable cell
	pub fn shared(value: FieldValue) -> Self {
		FieldValue::Shared(Rc::new(RefCell::new(value)))
	}

	/// Build a record from `(key, value)` pairs
	pub fn record<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, FieldValue)>,
	{
		FieldValue::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	/// Convert from JSON. `null` at the top level means "no value".
	pub fn from_json(value: serde_json::Value) -> Option<Self> {
		match value {
			serde_json::Value::Null => None,
			other => Some(Self::from_json_inner(other)),
		}
	}

	fn from_json_inner(value: serde_json::Value) -> Self {
		use serde_json::Value;
		match value {
			Value::Null => FieldValue::Null,
			Value::Bool(b) => FieldValue::Bool(b),
			Value::Number(n) => match n.as_i64() {
				Some(i) => FieldValue::Int(i),
				None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			Value::String(s) => FieldValue::Text(s),
			Value::Array(items) => {
				FieldValue::Array(items.into_iter().map(Self::from_json_inner).collect())
			}
			Value::Object(map) => FieldValue::Record(
				map.into_iter()
					.map(|(k, v)| (k, Self::from_json_inner(v)))
					.collect(),
			),
		}
	}

	/// Convert to JSON. Dates become `YYYY-MM-DDTHH:MM:SS` strings, a
	/// cyclic back-reference becomes `null`.
	pub fn to_json(&self) -> serde_json::Value {
		self.to_json_inner(&mut HashSet::new())
	}

	fn to_json_inner(&self, visiting: &mut HashSet<*const RefCell<FieldValue>>) -> serde_json::Value {
		use serde_json::Value;
		match self {
			FieldValue::Null => Value::Null,
			FieldValue::Bool(b) => Value::Bool(*b),
			FieldValue::Int(i) => Value::from(*i),
			FieldValue::Float(f) => serde_json::Number::from_f64(*f)
				.map(Value::Number)
				.unwrap_or(Value::Null),
			FieldValue::Text(s) => Value::String(s.clone()),
			FieldValue::Date(d) => Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
			FieldValue::Array(items) | FieldValue::Set(items) => Value::Array(
				items.iter().map(|v| v.to_json_inner(visiting)).collect(),
			),
			FieldValue::Map(entries) => Value::Array(
				entries
					.iter()
					.map(|(k, v)| {
						Value::Array(vec![k.to_json_inner(visiting), v.to_json_inner(visiting)])
					})
					.collect(),
			),
			FieldValue::Record(map) => Value::Object(
				map.iter()
					.map(|(k, v)| (k.clone(), v.to_json_inner(visiting)))
					.collect(),
			),
			FieldValue::Files(files) => {
				serde_json::to_value(files).unwrap_or(Value::Null)
			}
			FieldValue::Shared(cell) => {
				let ptr = Rc::as_ptr(cell);
				if !visiting.insert(ptr) {
					return Value::Null;
				}
				let json = cell.borrow().to_json_inner(visiting);
				visiting.remove(&ptr);
				json
			}
		}
	}

	/// Look up a key of a record
	pub fn get(&self, key: &str) -> Option<&FieldValue> {
		match self {
			FieldValue::Record(map) => map.get(key),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldValue::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Integer, or a float without fractional part
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			FieldValue::Int(i) => Some(*i),
			FieldValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
			_ => None,
		}
	}

	/// Any number, widened to `f64`
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FieldValue::Int(i) => Some(*i as f64),
			FieldValue::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FieldValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[FieldValue]> {
		match self {
			FieldValue::Array(items) => Some(items),
			_ => None,
		}
	}
}

impl fmt::Debug for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Null => f.write_str("Null"),
			FieldValue::Bool(b) => write!(f, "Bool({b})"),
			FieldValue::Int(i) => write!(f, "Int({i})"),
			FieldValue::Float(v) => write!(f, "Float({v})"),
			FieldValue::Text(s) => write!(f, "Text({s:?})"),
			FieldValue::Date(d) => write!(f, "Date({d})"),
			FieldValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
			FieldValue::Set(items) => f.debug_tuple("Set").field(items).finish(),
			FieldValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
			FieldValue::Record(map) => f.debug_tuple("Record").field(map).finish(),
			FieldValue::Files(files) => f.debug_tuple("Files").field(files).finish(),
			// Cells may be cyclic, only print the address
			FieldValue::Shared(cell) => write!(f, "Shared({:p})", Rc::as_ptr(cell)),
		}
	}
}

impl PartialEq for FieldValue {
	fn eq(&self, other: &Self) -> bool {
		crate::equality::is_equal(self, other)
	}
}

impl Serialize for FieldValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		FieldValue::Text(value.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		FieldValue::Text(value)
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		FieldValue::Int(value)
	}
}

impl From<i32> for FieldValue {
	fn from(value: i32) -> Self {
		FieldValue::Int(value.into())
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		FieldValue::Float(value)
	}
}

impl From<bool> for FieldValue {
	fn from(value: bool) -> Self {
		FieldValue::Bool(value)
	}
}

impl From<NaiveDateTime> for FieldValue {
	fn from(value: NaiveDateTime) -> Self {
		FieldValue::Date(value)
	}
}

impl From<NaiveDate> for FieldValue {
	fn from(value: NaiveDate) -> Self {
		FieldValue::Date(value.and_time(NaiveTime::MIN))
	}
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
	fn from(value: Vec<T>) -> Self {
		FieldValue::Array(value.into_iter().map(Into::into).collect())
	}
}

/// Typed view over a [`FieldValue`], used by the binding layer
///
/// `from_field_value` returns `None` when the stored value has a different
/// shape than the binding expects.
pub trait FormValue: Clone + 'static {
	fn to_field_value(&self) -> FieldValue;
	fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FormValue for FieldValue {
	fn to_field_value(&self) -> FieldValue {
		self.clone()
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		Some(value.clone())
	}
}

impl FormValue for String {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Text(self.clone())
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		value.as_str().map(str::to_string)
	}
}

impl FormValue for i64 {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Int(*self)
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		value.as_i64()
	}
}

impl FormValue for f64 {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Float(*self)
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		value.as_f64()
	}
}

impl FormValue for bool {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Bool(*self)
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		value.as_bool()
	}
}

impl FormValue for NaiveDateTime {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Date(*self)
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		match value {
			FieldValue::Date(d) => Some(*d),
			_ => None,
		}
	}
}

impl FormValue for NaiveDate {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::from(*self)
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		match value {
			FieldValue::Date(d) => Some(d.date()),
			_ => None,
		}
	}
}

impl<T: FormValue> FormValue for Vec<T> {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::Array(self.iter().map(FormValue::to_field_value).collect())
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		value
			.as_array()?
			.iter()
			.map(T::from_field_value)
			.collect::<Option<Vec<_>>>()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_from_json_top_level_null_is_absent() {
		assert!(FieldValue::from_json(json!(null)).is_none());
	}

	#[rstest]
	fn test_from_json_nested_null_is_kept() {
		let value = FieldValue::from_json(json!({ "a": null })).unwrap();
		assert!(matches!(value.get("a"), Some(FieldValue::Null)));
	}

	#[rstest]
	#[case(json!(1), FieldValue::Int(1))]
	#[case(json!(1.5), FieldValue::Float(1.5))]
	#[case(json!("x"), FieldValue::Text("x".into()))]
	#[case(json!(true), FieldValue::Bool(true))]
	fn test_from_json_primitives(#[case] input: serde_json::Value, #[case] expected: FieldValue) {
		assert_eq!(FieldValue::from_json(input), Some(expected));
	}

	#[rstest]
	fn test_cyclic_value_serializes_back_reference_as_null() {
		let cell = Rc::new(RefCell::new(FieldValue::Null));
		let node = FieldValue::Shared(cell.clone());
		*cell.borrow_mut() = FieldValue::record([("self", node.clone())]);

		assert_eq!(node.to_json(), json!({ "self": null }));
	}

	#[rstest]
	fn test_date_serializes_as_iso_string() {
		let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
		assert_eq!(FieldValue::from(date).to_json(), json!("2025-03-09T00:00:00"));
	}

	#[rstest]
	fn test_vec_form_value_rejects_mixed_shapes() {
		let mixed = FieldValue::Array(vec![FieldValue::Int(1), FieldValue::Text("a".into())]);
		assert!(Vec::<i64>::from_field_value(&mixed).is_none());
		assert_eq!(
			Vec::<i64>::from_field_value(&FieldValue::from(vec![1i64, 2])),
			Some(vec![1, 2])
		);
	}
}
