//! Handles pre-bound to one form or one field
//!
//! [`FormHandle`] is what application code holds for a single form.
//! [`FieldHandle`] is what a leaf widget holds for its own field: it can
//! only touch that field and read its [`FieldSnapshot`].

use crate::field::{FieldProperties, FieldState};
use crate::store::{FieldUpdate, FormStore, FormValues, Subscription};
use crate::value::FieldValue;
use std::collections::BTreeMap;

/// Store operations scoped to one form id
#[derive(Debug, Clone)]
pub struct FormHandle {
	store: FormStore,
	form_id: String,
}

impl FormHandle {
	/// Handle of `form_id` in `store`
	///
	/// # Examples
	///
	/// ```
	/// use formstate_core::handle::FormHandle;
	/// use formstate_core::store::{FieldUpdate, FormStore};
	///
	/// let form = FormHandle::new(FormStore::new(), "signup");
	/// form.update_field("email", FieldUpdate::value("a@b.c"));
	/// let mut sent = None;
	/// assert!(form.submit(|data| sent = Some(data)));
	/// assert!(sent.is_some_and(|data| data.contains_key("email")));
	/// ```
	pub fn new(store: FormStore, form_id: impl Into<String>) -> Self {
		Self {
			store,
			form_id: form_id.into(),
		}
	}

	/// Form id this handle addresses
	pub fn form_id(&self) -> &str {
		&self.form_id
	}

	/// Store behind this handle
	pub fn store(&self) -> &FormStore {
		&self.store
	}

	/// Handle of one top-level field of this form
	pub fn field(&self, name: impl Into<String>) -> FieldHandle {
		FieldHandle {
			form: self.clone(),
			name: name.into(),
		}
	}

	/// See [`FormStore::initialise_form`]
	pub fn initialise<K, V, I>(&self, data: I)
	where
		K: Into<String>,
		V: Into<Option<FieldValue>>,
		I: IntoIterator<Item = (K, V)>,
	{
		self.store.initialise_form(&self.form_id, data);
	}

	/// See [`FormStore::update_field`]
	pub fn update_field(&self, name: &str, update: FieldUpdate) {
		self.store.update_field(&self.form_id, name, update);
	}

	/// See [`FormStore::delete_field`]
	pub fn delete_field(&self, name: &str) {
		self.store.delete_field(&self.form_id, name);
	}

	/// Set only the validity flag of `name`
	pub fn validate_field(&self, name: &str, valid: bool) {
		self.store.validate_field(&self.form_id, name, valid);
	}

	/// Record why `name` is invalid
	pub fn set_invalid_reason(&self, name: &str, reason: impl Into<String>) {
		self.store.set_invalid_reason(&self.form_id, name, reason);
	}

	/// See [`FormStore::set_field_properties`]
	pub fn set_field_properties(&self, name: &str, properties: FieldProperties) {
		self.store.set_field_properties(&self.form_id, name, properties);
	}

	/// Rebuild the form from declared default values
	pub fn reset(&self) {
		self.store.reset_form(&self.form_id);
	}

	/// Remove every field, keeping the form
	pub fn clear(&self) {
		self.store.clear_form(&self.form_id);
	}

	/// See [`FormStore::empty_form`]
	pub fn empty(&self, data: Option<BTreeMap<String, Option<FieldValue>>>) {
		self.store.empty_form(&self.form_id, data);
	}

	/// Remove the form from the store
	pub fn delete(&self) {
		self.store.delete_form(&self.form_id);
	}

	/// Values with subform fields nested under their prefix
	pub fn data(&self) -> FormValues {
		self.store.get_form_data(&self.form_id)
	}

	/// Flat validity flags
	pub fn valid(&self) -> BTreeMap<String, bool> {
		self.store.get_form_valid(&self.form_id)
	}

	/// See [`FormStore::validate_form`]
	pub fn validate(&self) -> bool {
		self.store.validate_form(&self.form_id)
	}

	/// Register a subform prefix
	pub fn set_sub_form(&self, prefix: &str) {
		self.store.set_sub_form(&self.form_id, prefix);
	}

	/// Drop one registration of a subform prefix
	pub fn delete_sub_form(&self, prefix: &str) {
		self.store.delete_sub_form(&self.form_id, prefix);
	}

	/// Validate, then hand the form data to `on_submit` if valid
	///
	/// Returns whether `on_submit` ran.
	pub fn submit(&self, on_submit: impl FnOnce(FormValues)) -> bool {
		if !self.validate() {
			tracing::debug!(form_id = %self.form_id, "submit rejected, form is invalid");
			return false;
		}
		on_submit(self.data());
		true
	}
}

/// Read-only view of one field
///
/// # Examples
///
/// ```
/// use formstate_core::handle::FormHandle;
/// use formstate_core::store::{FieldUpdate, FormStore};
///
/// let field = FormHandle::new(FormStore::new(), "f").field("age");
/// assert!(field.snapshot().valid);
/// field.update(FieldUpdate::value(3).with_valid(false).with_invalid_reason("too young"));
/// let snapshot = field.snapshot();
/// assert!(!snapshot.valid);
/// assert_eq!(snapshot.invalid_reason.as_deref(), Some("too young"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot {
	pub value: Option<FieldValue>,
	pub valid: bool,
	pub invalid_reason: Option<String>,
	/// See [`FieldState::stamp`]
	pub stamp: u64,
	pub properties: Option<FieldProperties>,
}

/// Store operations scoped to one field
#[derive(Debug, Clone)]
pub struct FieldHandle {
	form: FormHandle,
	name: String,
}

impl FieldHandle {
	/// Form the field belongs to
	pub fn form(&self) -> &FormHandle {
		&self.form
	}

	/// Storage key of the field
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Apply a partial update to this field
	pub fn update(&self, update: FieldUpdate) {
		self.form.update_field(&self.name, update);
	}

	/// Store `value`, `None` clears it
	pub fn set_value(&self, value: Option<FieldValue>) {
		self.update(FieldUpdate::default().with_value(value));
	}

	/// Remove the field with its properties
	pub fn delete(&self) {
		self.form.delete_field(&self.name);
	}

	pub fn validate(&self, valid: bool) {
		self.form.validate_field(&self.name, valid);
	}

	pub fn set_invalid_reason(&self, reason: impl Into<String>) {
		self.form.set_invalid_reason(&self.name, reason);
	}

	/// Merge declared properties into this field
	pub fn set_properties(&self, properties: FieldProperties) {
		self.form.set_field_properties(&self.name, properties);
	}

	/// Current state of the field; an absent field reads as empty and valid
	pub fn snapshot(&self) -> FieldSnapshot {
		let store = self.form.store();
		let state = store
			.field(self.form.form_id(), &self.name)
			.unwrap_or_else(FieldState::empty);
		let stamp = state.stamp();
		FieldSnapshot {
			value: state.value,
			valid: state.valid,
			invalid_reason: state.invalid_reason,
			stamp,
			properties: store.field_properties(self.form.form_id(), &self.name),
		}
	}

	/// Subscribe to store changes
	pub fn subscribe(&self, listener: impl Fn(&FormStore) + 'static) -> Subscription {
		self.form.store().subscribe(listener)
	}
}
