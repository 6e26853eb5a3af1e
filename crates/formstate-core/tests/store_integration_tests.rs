//! Form Store Integration Tests
//!
//! Exercises the public store API end to end: initialisation, reset/clear/
//! empty/delete lifecycle, subform grouping, validation and render
//! coalescing.
//!
//! Test Categories:
//! - Category 1: Form Lifecycle
//! - Category 2: Subform Grouping
//! - Category 3: Validation
//! - Category 4: Rendering

use formstate_core::{
	FieldProperties, FieldUpdate, FieldValue, FormEntry, FormHandle, FormStore, Required, Verdict,
};
use rstest::{fixture, rstest};
use serde_json::json;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[fixture]
fn store() -> FormStore {
	FormStore::new()
}

fn text(value: &str) -> FormEntry {
	FormEntry::Field(Some(FieldValue::from(value)))
}

// ============================================================================
// Category 1: Form Lifecycle
// ============================================================================

/// Initialised data reads back unchanged, every field valid
#[rstest]
fn test_initialise_round_trip(store: FormStore) {
	store.initialise_form(
		"profile",
		[
			("name", FieldValue::from("Ana")),
			("age", FieldValue::from(31)),
			("tags", FieldValue::from(vec!["a", "b"])),
		],
	);

	let data = store.get_form_data("profile");
	assert_eq!(data.len(), 3);
	assert_eq!(data["name"], text("Ana"));
	assert_eq!(data["age"], FormEntry::Field(Some(FieldValue::Int(31))));
	assert!(store.get_form_valid("profile").values().all(|v| *v));
}

/// Initialising replaces previous fields entirely
#[rstest]
fn test_initialise_replaces_fields(store: FormStore) {
	store.update_field("f", "old", FieldUpdate::value(1));
	store.initialise_form("f", [("new", FieldValue::from(2))]);
	assert!(store.field("f", "old").is_none());
	assert!(store.field("f", "new").is_some());
}

/// Reset keeps only fields with a default value
#[rstest]
fn test_reset_applies_defaults_only(store: FormStore) {
	store.set_field_properties("f", "country", FieldProperties::new().with_default("NZ"));
	store.set_field_properties("f", "city", FieldProperties::new().with_required(true));
	store.update_field("f", "country", FieldUpdate::value("AU"));
	store.update_field("f", "city", FieldUpdate::value("Sydney"));
	store.update_field("f", "stray", FieldUpdate::value(true));

	store.reset_form("f");

	let data = store.get_form_data("f");
	assert_eq!(data.len(), 1);
	assert_eq!(data["country"], text("NZ"));
}

/// Clear empties the form but keeps it; delete removes it
#[rstest]
fn test_clear_versus_delete(store: FormStore) {
	store.update_field("f", "a", FieldUpdate::value(1));

	store.clear_form("f");
	assert!(store.has_form("f"));
	assert!(store.get_form_data("f").is_empty());

	store.delete_form("f");
	assert!(!store.has_form("f"));
	assert!(store.get_all_form_data().is_empty());
}

/// Emptying keeps field names and marks them valid
#[rstest]
fn test_empty_form_keeps_keys(store: FormStore) {
	store.update_field("f", "a", FieldUpdate::value(1).with_valid(false));
	store.update_field("f", "b", FieldUpdate::value("x"));

	store.empty_form("f", None);

	let data = store.get_form_data("f");
	assert_eq!(data["a"], FormEntry::Field(None));
	assert_eq!(data["b"], FormEntry::Field(None));
	assert_eq!(store.get_form_valid("f")["a"], true);
}

/// Emptying with data behaves like initialising
#[rstest]
fn test_empty_form_with_data(store: FormStore) {
	store.update_field("f", "a", FieldUpdate::value(1));
	let data = BTreeMap::from([("b".to_string(), Some(FieldValue::from(2)))]);

	store.empty_form("f", Some(data));

	assert!(store.field("f", "a").is_none());
	assert_eq!(store.value("f", "b"), Some(FieldValue::Int(2)));
}

/// Deleting a field twice is harmless
#[rstest]
fn test_delete_field_is_idempotent(store: FormStore) {
	store.set_field_properties("f", "a", FieldProperties::new().with_default(1));
	store.update_field("f", "a", FieldUpdate::value(2));

	store.delete_field("f", "a");
	let revision = store.revision();
	store.delete_field("f", "a");

	assert!(store.field("f", "a").is_none());
	assert!(store.field_properties("f", "a").is_none());
	assert_eq!(store.revision(), revision);
}

// ============================================================================
// Category 2: Subform Grouping
// ============================================================================

/// Prefixed fields nest under their subform
#[rstest]
fn test_subform_round_trip(store: FormStore) {
	store.set_sub_form("order", "addr");
	store.update_field("order", "addr__city", FieldUpdate::value("X"));
	store.update_field("order", "note", FieldUpdate::value("leave at door"));

	let data = store.get_form_data("order");
	let addr = data["addr"].as_sub_form().unwrap();
	assert_eq!(addr["city"], Some(FieldValue::from("X")));
	assert_eq!(data["note"], text("leave at door"));
	assert!(data.get("addr__city").is_none());
}

/// Validity stays flat even with subforms registered
#[rstest]
fn test_form_valid_is_flat(store: FormStore) {
	store.set_sub_form("order", "addr");
	store.update_field("order", "addr__city", FieldUpdate::valid(false));

	let valid = store.get_form_valid("order");
	assert_eq!(valid.get("addr__city"), Some(&false));
}

/// Every form nests by its own subforms in the all-forms projection
#[rstest]
fn test_all_form_data_nests_per_form(store: FormStore) {
	store.set_sub_form("a", "billing");
	store.update_field("a", "billing__zip", FieldUpdate::value("1010"));
	store.update_field("b", "billing__zip", FieldUpdate::value("2020"));

	let all = store.get_all_form_data();
	assert!(all["a"]["billing"].as_sub_form().is_some());
	assert!(all["a"].get("a").is_none());
	assert_eq!(all["b"]["billing__zip"], text("2020"));
}

/// Removing one of two identical registrations keeps the grouping
#[rstest]
fn test_duplicate_subform_registration(store: FormStore) {
	store.set_sub_form("f", "addr");
	store.set_sub_form("f", "addr");
	store.delete_sub_form("f", "addr");
	store.update_field("f", "addr__city", FieldUpdate::value("X"));

	assert!(store.get_form_data("f")["addr"].as_sub_form().is_some());

	store.delete_sub_form("f", "addr");
	assert!(store.get_form_data("f").contains_key("addr__city"));
}

/// Projection serializes to plain nested JSON
#[rstest]
fn test_form_data_serializes(store: FormStore) {
	store.set_sub_form("f", "addr");
	store.update_field("f", "addr__city", FieldUpdate::value("X"));
	store.update_field("f", "age", FieldUpdate::value(3));
	store.update_field("f", "note", FieldUpdate::clear());

	let json = serde_json::to_value(store.get_form_data("f")).unwrap();
	assert_eq!(json, json!({ "addr": { "city": "X" }, "age": 3, "note": null }));
}

// ============================================================================
// Category 3: Validation
// ============================================================================

/// A form without fields is invalid
#[rstest]
fn test_validate_empty_form(store: FormStore) {
	store.initialise_form("f", Vec::<(String, FieldValue)>::new());
	assert!(!store.validate_form("f"));
}

/// Fields without properties never fail
#[rstest]
fn test_validate_without_properties(store: FormStore) {
	store.update_field("f", "a", FieldUpdate::clear());
	assert!(store.validate_form("f"));
}

/// A required field without value fails and is flagged
#[rstest]
fn test_validate_required(store: FormStore) {
	store.set_field_properties("f", "name", FieldProperties::new().with_required(true));
	assert!(!store.validate_form("f"));
	assert_eq!(store.get_form_valid("f")["name"], false);
}

/// Validator message becomes the invalid reason
#[rstest]
fn test_validator_reason(store: FormStore) {
	store.set_field_properties(
		"f",
		"age",
		FieldProperties::new()
			.with_required(true)
			.with_validator(|v: Option<&FieldValue>| {
				match v.and_then(FieldValue::as_f64) {
					Some(age) if age > 0.0 => Verdict::Valid,
					_ => Verdict::from("must be positive"),
				}
			}),
	);
	store.update_field("f", "age", FieldUpdate::value(-1));

	assert!(!store.validate_form("f"));
	assert_eq!(store.get_form_valid("f")["age"], false);
	assert_eq!(
		store.field("f", "age").unwrap().invalid_reason.as_deref(),
		Some("must be positive")
	);

	store.update_field("f", "age", FieldUpdate::value(4));
	assert!(store.validate_form("f"));
	assert!(store.field("f", "age").unwrap().invalid_reason.is_none());
}

/// Predicate requirements run against the current value
#[rstest]
#[case(vec![], false)]
#[case(vec!["rust"], true)]
fn test_required_predicate(store: FormStore, #[case] tags: Vec<&str>, #[case] expected: bool) {
	store.set_field_properties(
		"f",
		"tags",
		FieldProperties::new().with_required(Required::predicate(|v| {
			v.and_then(FieldValue::as_array).is_some_and(|a| !a.is_empty())
		})),
	);
	store.update_field("f", "tags", FieldUpdate::value(tags));
	assert_eq!(store.validate_form("f"), expected);
}

/// Validation publishes once for the whole form
#[rstest]
fn test_validate_publishes_once(store: FormStore) {
	for name in ["a", "b", "c"] {
		store.set_field_properties("f", name, FieldProperties::new().with_required(true));
	}
	let before = store.revision();
	store.validate_form("f");
	assert_eq!(store.revision(), before + 1);
}

// ============================================================================
// Category 4: Rendering
// ============================================================================

/// An in-place update followed by a normal one is a single transition
#[rstest]
fn test_skip_render_then_render_is_one_transition(store: FormStore) {
	store.update_field("f", "q", FieldUpdate::value("a"));
	let renders = Rc::new(Cell::new(0));
	let sink = renders.clone();
	let _sub = store.subscribe(move |_| sink.set(sink.get() + 1));

	store.update_field("f", "q", FieldUpdate::value("ab").skip_render());
	store.update_field("f", "q", FieldUpdate::value("abc"));

	assert_eq!(renders.get(), 1);
	assert_eq!(store.value("f", "q"), Some(FieldValue::from("abc")));
}

/// Form handle operations are scoped to its form
#[rstest]
fn test_form_handle_scoping(store: FormStore) {
	let a = FormHandle::new(store.clone(), "a");
	let b = FormHandle::new(store.clone(), "b");
	a.update_field("x", FieldUpdate::value(1));
	b.update_field("x", FieldUpdate::value(2));

	a.clear();
	assert!(a.data().is_empty());
	assert_eq!(b.data()["x"], FormEntry::Field(Some(FieldValue::Int(2))));
}
