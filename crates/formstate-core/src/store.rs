//! Form store
//!
//! [`FormStore`] owns the field data of every form, the declared field
//! properties and the subform registry. It is a cheap `Clone` handle over
//! shared single-threaded state; every clone addresses the same store.
//!
//! Mutations follow one of two paths:
//!
//! - the publish path builds the next state from a copy of the current one,
//!   swaps in a new [`Snapshot`], bumps the revision and notifies
//!   subscribers before returning;
//! - the `skip_render` path of [`FormStore::update_field`] edits the current
//!   snapshot in place and notifies nobody, so bursts of keystrokes coalesce
//!   until the next publish.
//!
//! Usage errors (an empty form id or field name) are logged and the call is
//! a no-op.
//!
//! ## Example
//!
//! ```
//! use formstate_core::field::FieldProperties;
//! use formstate_core::store::{FieldUpdate, FormStore};
//!
//! let store = FormStore::new();
//! store.set_field_properties("f", "age", FieldProperties::new().with_required(true));
//! assert!(!store.validate_form("f"));
//!
//! store.update_field("f", "age", FieldUpdate::value(30));
//! assert!(store.validate_form("f"));
//! ```

use crate::error::{FormError, require_field, require_form_id};
use crate::field::{FieldMap, FieldProperties, FieldState, PropertyMap};
use crate::subform::SubFormRegistry;
use crate::validation::validate_fields;
use crate::value::FieldValue;
use serde::Serialize;
use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Field data of every form, keyed by form id
pub type FormsData = BTreeMap<String, FieldMap>;

/// One entry of a [`FormValues`] projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormEntry {
	Field(Option<FieldValue>),
	/// Fields claimed by a registered subform prefix
	SubForm(BTreeMap<String, Option<FieldValue>>),
}

impl FormEntry {
	/// Value of a top-level field
	pub fn as_value(&self) -> Option<&FieldValue> {
		match self {
			FormEntry::Field(value) => value.as_ref(),
			FormEntry::SubForm(_) => None,
		}
	}

	/// Nested fields of a subform entry
	pub fn as_sub_form(&self) -> Option<&BTreeMap<String, Option<FieldValue>>> {
		match self {
			FormEntry::SubForm(fields) => Some(fields),
			FormEntry::Field(_) => None,
		}
	}
}

/// Plain `{name: value}` projection of one form
pub type FormValues = BTreeMap<String, FormEntry>;

/// Value part of a [`FieldUpdate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValueUpdate {
	/// Leave the stored value untouched
	#[default]
	Keep,
	/// Reset the stored value to "no value"
	Clear,
	/// Store this value
	Set(FieldValue),
}

impl From<Option<FieldValue>> for ValueUpdate {
	fn from(value: Option<FieldValue>) -> Self {
		match value {
			Some(value) => ValueUpdate::Set(value),
			None => ValueUpdate::Clear,
		}
	}
}

/// Partial update of one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
	pub value: ValueUpdate,
	pub valid: Option<bool>,
	/// Recorded after `valid`, so it survives only an invalid update
	pub invalid_reason: Option<String>,
	/// Mutate in place without notifying subscribers
	pub skip_render: bool,
}

impl FieldUpdate {
	/// Store `value`, leaving validity untouched
	///
	/// # Examples
	///
	/// ```
	/// use formstate_core::store::{FieldUpdate, FormStore};
	/// use formstate_core::value::FieldValue;
	///
	/// let store = FormStore::new();
	/// store.update_field("f", "name", FieldUpdate::value("Ana").with_valid(true));
	/// assert_eq!(store.value("f", "name"), Some(FieldValue::from("Ana")));
	/// ```
	pub fn value(value: impl Into<FieldValue>) -> Self {
		Self {
			value: ValueUpdate::Set(value.into()),
			..Default::default()
		}
	}

	/// Remove the stored value but keep the field
	pub fn clear() -> Self {
		Self {
			value: ValueUpdate::Clear,
			..Default::default()
		}
	}

	/// Update only the validity flag
	pub fn valid(valid: bool) -> Self {
		Self {
			valid: Some(valid),
			..Default::default()
		}
	}

	/// Replace the value part; `None` clears
	pub fn with_value(mut self, value: impl Into<ValueUpdate>) -> Self {
		self.value = value.into();
		self
	}

	/// Also set the validity flag; `true` drops any invalid reason
	pub fn with_valid(mut self, valid: bool) -> Self {
		self.valid = Some(valid);
		self
	}

	/// Also record why the field is invalid
	pub fn with_invalid_reason(mut self, reason: impl Into<String>) -> Self {
		self.invalid_reason = Some(reason.into());
		self
	}

	/// Write into the current snapshot without notifying subscribers
	///
	/// # Examples
	///
	/// ```
	/// use formstate_core::store::{FieldUpdate, FormStore};
	///
	/// let store = FormStore::new();
	/// let before = store.snapshot();
	/// store.update_field("f", "draft", FieldUpdate::value("ab").skip_render());
	/// assert!(before.ptr_eq(&store.snapshot()));
	/// assert_eq!(store.revision(), 0);
	/// ```
	pub fn skip_render(mut self) -> Self {
		self.skip_render = true;
		self
	}

	/// Apply to `state`; a published value write records `stamp`
	fn apply(self, state: &mut FieldState, stamp: Option<u64>) {
		let writes_value = !matches!(self.value, ValueUpdate::Keep);
		match self.value {
			ValueUpdate::Keep => {}
			ValueUpdate::Clear => state.value = None,
			ValueUpdate::Set(value) => state.value = Some(value),
		}
		if writes_value && let Some(stamp) = stamp {
			state.stamp = stamp;
		}
		if let Some(valid) = self.valid {
			state.set_valid(valid);
		}
		if let Some(reason) = self.invalid_reason
			&& !state.valid
		{
			state.invalid_reason = Some(reason);
		}
	}
}

/// Published state reference
///
/// Two snapshots are the same state when [`Snapshot::ptr_eq`] holds. A
/// `skip_render` update edits the current snapshot in place, so readers
/// holding it observe the change without a new reference being published.
#[derive(Clone)]
pub struct Snapshot(Rc<RefCell<FormsData>>);

impl Snapshot {
	fn new(data: FormsData) -> Self {
		Self(Rc::new(RefCell::new(data)))
	}

	/// Whether both snapshots are the same published state
	pub fn ptr_eq(&self, other: &Snapshot) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Borrow the data of every form
	pub fn forms(&self) -> Ref<'_, FormsData> {
		self.0.borrow()
	}

	/// Copy of one field's state
	pub fn field(&self, form_id: &str, name: &str) -> Option<FieldState> {
		self.0.borrow().get(form_id)?.get(name).cloned()
	}
}

impl fmt::Debug for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Snapshot").field(&*self.0.borrow()).finish()
	}
}

type Listener = Rc<dyn Fn(&FormStore)>;

struct StoreInner {
	state: RefCell<Snapshot>,
	properties: RefCell<BTreeMap<String, PropertyMap>>,
	sub_forms: RefCell<SubFormRegistry>,
	revision: Cell<u64>,
	listeners: RefCell<Vec<(u64, Listener)>>,
	next_listener: Cell<u64>,
	notifying: Cell<bool>,
	renotify: Cell<bool>,
}

/// Shared store of every form's fields
#[derive(Clone)]
pub struct FormStore {
	inner: Rc<StoreInner>,
}

impl Default for FormStore {
	fn default() -> Self {
		Self::new()
	}
}

impl FormStore {
	/// Empty store with no forms and no subscribers
	pub fn new() -> Self {
		Self {
			inner: Rc::new(StoreInner {
				state: RefCell::new(Snapshot::new(FormsData::new())),
				properties: RefCell::new(BTreeMap::new()),
				sub_forms: RefCell::new(SubFormRegistry::new()),
				revision: Cell::new(0),
				listeners: RefCell::new(Vec::new()),
				next_listener: Cell::new(0),
				notifying: Cell::new(false),
				renotify: Cell::new(false),
			}),
		}
	}

	/// Whether both handles address the same store
	pub fn same_store(&self, other: &FormStore) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	// ----- publishing -----

	/// Replace the state with a modified copy, then notify
	///
	/// `mutate` receives the revision being published, the stamp for every
	/// value it writes.
	fn publish<R>(&self, mutate: impl FnOnce(&mut FormsData, u64) -> R) -> R {
		let stamp = self.inner.revision.get() + 1;
		let result = {
			let mut state = self.inner.state.borrow_mut();
			let mut next = state.forms().clone();
			let result = mutate(&mut next, stamp);
			*state = Snapshot::new(next);
			result
		};
		self.inner.revision.set(self.inner.revision.get() + 1);
		self.notify();
		result
	}

	/// Edit the current state without publishing a new reference
	fn mutate_in_place(&self, mutate: impl FnOnce(&mut FormsData)) {
		let state = self.inner.state.borrow();
		mutate(&mut state.0.borrow_mut());
	}

	fn notify(&self) {
		if self.inner.notifying.get() {
			self.inner.renotify.set(true);
			return;
		}
		let _guard = NotifyGuard::enter(&self.inner);
		loop {
			self.inner.renotify.set(false);
			let listeners: Vec<Listener> = self
				.inner
				.listeners
				.borrow()
				.iter()
				.map(|(_, listener)| Rc::clone(listener))
				.collect();
			for listener in listeners {
				listener(self);
			}
			if !self.inner.renotify.get() {
				break;
			}
		}
	}

	/// Call `listener` after every published state change
	///
	/// Listeners run synchronously, in subscription order. A publish made by
	/// a listener is delivered in one extra pass once the current pass ends.
	/// Dropping the returned [`Subscription`] unsubscribes.
	pub fn subscribe(&self, listener: impl Fn(&FormStore) + 'static) -> Subscription {
		let id = self.inner.next_listener.get();
		self.inner.next_listener.set(id + 1);
		self.inner
			.listeners
			.borrow_mut()
			.push((id, Rc::new(listener)));
		Subscription {
			id,
			store: Rc::downgrade(&self.inner),
		}
	}

	/// Number of published state changes so far
	pub fn revision(&self) -> u64 {
		self.inner.revision.get()
	}

	/// Currently published state
	pub fn snapshot(&self) -> Snapshot {
		self.inner.state.borrow().clone()
	}

	// ----- queries -----

	/// Whether `form_id` holds any field data, even an empty form
	pub fn has_form(&self, form_id: &str) -> bool {
		self.inner.state.borrow().forms().contains_key(form_id)
	}

	/// State of one field, `None` when the field does not exist
	pub fn field(&self, form_id: &str, name: &str) -> Option<FieldState> {
		self.inner.state.borrow().field(form_id, name)
	}

	/// Current value of a field, `None` when absent or empty
	pub fn value(&self, form_id: &str, name: &str) -> Option<FieldValue> {
		self.field(form_id, name).and_then(|state| state.value)
	}

	/// Declared properties of one field
	pub fn field_properties(&self, form_id: &str, name: &str) -> Option<FieldProperties> {
		self.inner
			.properties
			.borrow()
			.get(form_id)
			.and_then(|props| props.get(name))
			.cloned()
	}

	/// Values of one form, with subform fields nested under their prefix
	///
	/// An unknown form projects to an empty map.
	pub fn get_form_data(&self, form_id: &str) -> FormValues {
		let state = self.snapshot();
		let forms = state.forms();
		match forms.get(form_id) {
			Some(fields) => self.project(form_id, fields),
			None => FormValues::new(),
		}
	}

	/// [`FormStore::get_form_data`] for every known form
	pub fn get_all_form_data(&self) -> BTreeMap<String, FormValues> {
		let state = self.snapshot();
		let forms = state.forms();
		forms
			.iter()
			.map(|(form_id, fields)| (form_id.clone(), self.project(form_id, fields)))
			.collect()
	}

	fn project(&self, form_id: &str, fields: &FieldMap) -> FormValues {
		let values: BTreeMap<String, Option<FieldValue>> = fields
			.iter()
			.map(|(name, state)| (name.clone(), state.value.clone()))
			.collect();
		let grouped = self.inner.sub_forms.borrow().group(form_id, &values);

		let mut projection: FormValues = grouped
			.groups
			.into_iter()
			.map(|(prefix, fields)| (prefix, FormEntry::SubForm(fields)))
			.collect();
		// Top-level fields win over a subform of the same name
		projection.extend(
			grouped
				.fields
				.into_iter()
				.map(|(name, value)| (name, FormEntry::Field(value))),
		);
		projection
	}

	/// Flat validity flags of one form
	pub fn get_form_valid(&self, form_id: &str) -> BTreeMap<String, bool> {
		self.inner
			.state
			.borrow()
			.forms()
			.get(form_id)
			.map(validity)
			.unwrap_or_default()
	}

	/// [`FormStore::get_form_valid`] for every known form
	pub fn get_all_form_valid(&self) -> BTreeMap<String, BTreeMap<String, bool>> {
		self.inner
			.state
			.borrow()
			.forms()
			.iter()
			.map(|(form_id, fields)| (form_id.clone(), validity(fields)))
			.collect()
	}

	// ----- mutations -----

	/// Replace the form's fields with `data`, every field valid
	pub fn initialise_form<K, V, I>(&self, form_id: &str, data: I)
	where
		K: Into<String>,
		V: Into<Option<FieldValue>>,
		I: IntoIterator<Item = (K, V)>,
	{
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		let fields = to_field_map(data);
		self.publish(|forms, stamp| {
			forms.insert(form_id.to_string(), stamp_all(fields, stamp));
		});
		tracing::debug!(form_id, "form initialised");
	}

	/// [`FormStore::initialise_form`] from a JSON object
	///
	/// A top-level `null` member becomes a field without value.
	pub fn initialise_form_json(&self, form_id: &str, data: serde_json::Value) {
		match json_entries(data) {
			Some(entries) => self.initialise_form(form_id, entries),
			None => tracing::error!(form_id, "Form data must be a JSON object"),
		}
	}

	/// Apply a partial update to one field
	///
	/// The field (and its form) is created when missing. With
	/// `skip_render` the current snapshot is edited in place and no
	/// subscriber runs.
	pub fn update_field(&self, form_id: &str, name: &str, update: FieldUpdate) {
		if let Err(err) = require_field(form_id, name) {
			usage_error(&err, form_id, name);
			return;
		}
		let skip_render = update.skip_render;
		let edit = |forms: &mut FormsData, stamp: Option<u64>| {
			let state = forms
				.entry(form_id.to_string())
				.or_default()
				.entry(name.to_string())
				.or_default();
			update.apply(state, stamp);
		};
		if skip_render {
			self.mutate_in_place(|forms| edit(forms, None));
		} else {
			self.publish(|forms, stamp| edit(forms, Some(stamp)));
		}
	}

	/// Remove a field's value and properties
	///
	/// Deleting an absent field is a no-op.
	pub fn delete_field(&self, form_id: &str, name: &str) {
		if let Err(err) = require_field(form_id, name) {
			usage_error(&err, form_id, name);
			return;
		}
		if let Some(props) = self.inner.properties.borrow_mut().get_mut(form_id) {
			props.remove(name);
		}
		if self.field(form_id, name).is_none() {
			return;
		}
		self.publish(|forms, _| {
			if let Some(fields) = forms.get_mut(form_id) {
				fields.remove(name);
			}
		});
	}

	/// Set only the validity flag of a field
	pub fn validate_field(&self, form_id: &str, name: &str, valid: bool) {
		self.update_field(form_id, name, FieldUpdate::valid(valid));
	}

	/// Record why a field is invalid
	pub fn set_invalid_reason(&self, form_id: &str, name: &str, reason: impl Into<String>) {
		if let Err(err) = require_field(form_id, name) {
			usage_error(&err, form_id, name);
			return;
		}
		let reason = reason.into();
		self.publish(|forms, _| {
			let state = forms
				.entry(form_id.to_string())
				.or_default()
				.entry(name.to_string())
				.or_default();
			state.invalid_reason = Some(reason);
		});
	}

	/// Rebuild the form from declared default values only
	///
	/// Fields without a default value are dropped.
	pub fn reset_form(&self, form_id: &str) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		let defaults: FieldMap = self
			.inner
			.properties
			.borrow()
			.get(form_id)
			.map(|props| {
				props
					.iter()
					.filter_map(|(name, props)| {
						let value = props.default_value.clone()?;
						Some((name.clone(), FieldState::new(Some(value))))
					})
					.collect()
			})
			.unwrap_or_default();
		self.publish(|forms, stamp| {
			forms.insert(form_id.to_string(), stamp_all(defaults, stamp));
		});
	}

	/// Remove every field of an existing form, keeping the form
	pub fn clear_form(&self, form_id: &str) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		if !self.has_form(form_id) {
			return;
		}
		self.publish(|forms, _| {
			forms.insert(form_id.to_string(), FieldMap::new());
		});
	}

	/// Empty every field's value, keeping the field names
	///
	/// With `data`, behaves like [`FormStore::initialise_form`].
	pub fn empty_form(&self, form_id: &str, data: Option<BTreeMap<String, Option<FieldValue>>>) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		if let Some(data) = data {
			self.initialise_form(form_id, data);
			return;
		}
		self.publish(|forms, stamp| {
			let fields = forms.entry(form_id.to_string()).or_default();
			for state in fields.values_mut() {
				*state = FieldState::empty().stamped(stamp);
			}
		});
	}

	/// Remove the form entirely
	pub fn delete_form(&self, form_id: &str) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		if !self.has_form(form_id) {
			return;
		}
		self.publish(|forms, _| {
			forms.remove(form_id);
		});
		tracing::debug!(form_id, "form deleted");
	}

	/// Merge declared properties into a field
	///
	/// A field not yet present in the form is added without value, so that
	/// validation sees it.
	pub fn set_field_properties(&self, form_id: &str, name: &str, properties: FieldProperties) {
		if let Err(err) = require_field(form_id, name) {
			usage_error(&err, form_id, name);
			return;
		}
		self.inner
			.properties
			.borrow_mut()
			.entry(form_id.to_string())
			.or_default()
			.entry(name.to_string())
			.or_default()
			.merge(properties);

		if self.field(form_id, name).is_some() {
			return;
		}
		self.publish(|forms, stamp| {
			forms
				.entry(form_id.to_string())
				.or_default()
				.insert(name.to_string(), FieldState::empty().stamped(stamp));
		});
	}

	/// Register a subform prefix
	pub fn set_sub_form(&self, form_id: &str, prefix: &str) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		self.inner.sub_forms.borrow_mut().register(form_id, prefix);
		tracing::debug!(form_id, prefix, "subform registered");
	}

	/// Drop one registration of a subform prefix
	pub fn delete_sub_form(&self, form_id: &str, prefix: &str) {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return;
		}
		if !self.inner.sub_forms.borrow_mut().deregister(form_id, prefix) {
			tracing::debug!(form_id, prefix, "subform was not registered");
		}
	}

	/// Registered subform prefixes of a form, in registration order
	pub fn sub_forms(&self, form_id: &str) -> Vec<String> {
		self.inner.sub_forms.borrow().prefixes(form_id).to_vec()
	}

	/// Validate every constrained field and write the verdicts back
	///
	/// Returns `false` for an empty or unknown form.
	pub fn validate_form(&self, form_id: &str) -> bool {
		if let Err(err) = require_form_id(form_id) {
			usage_error(&err, form_id, "");
			return false;
		}
		let report = {
			let state = self.snapshot();
			let forms = state.forms();
			let Some(fields) = forms.get(form_id) else {
				tracing::warn!(form_id, "{}", FormError::UnknownForm(form_id.to_string()));
				return false;
			};
			let properties = self.inner.properties.borrow();
			validate_fields(fields, properties.get(form_id))
		};

		if report.empty {
			tracing::warn!(form_id, "Form is empty");
			return false;
		}
		if !report.outcomes.is_empty() {
			self.publish(|forms, _| {
				if let Some(fields) = forms.get_mut(form_id) {
					report.apply(fields);
				}
			});
		}
		tracing::debug!(form_id, valid = report.valid, "form validated");
		report.valid
	}
}

impl fmt::Debug for FormStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormStore")
			.field("revision", &self.revision())
			.field("forms", &self.snapshot())
			.finish()
	}
}

/// Resets the notifying flag even if a listener panics
struct NotifyGuard<'a> {
	inner: &'a StoreInner,
}

impl<'a> NotifyGuard<'a> {
	fn enter(inner: &'a StoreInner) -> Self {
		inner.notifying.set(true);
		Self { inner }
	}
}

impl Drop for NotifyGuard<'_> {
	fn drop(&mut self) {
		self.inner.notifying.set(false);
	}
}

/// Live store subscription, unsubscribes on drop
pub struct Subscription {
	id: u64,
	store: Weak<StoreInner>,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(inner) = self.store.upgrade() {
			inner.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("id", &self.id).finish()
	}
}

fn usage_error(err: &FormError, form_id: &str, name: &str) {
	tracing::error!(form_id, name, "{err}! Unable to update form data");
}

fn validity(fields: &FieldMap) -> BTreeMap<String, bool> {
	fields
		.iter()
		.map(|(name, state)| (name.clone(), state.valid))
		.collect()
}

fn to_field_map<K, V, I>(data: I) -> FieldMap
where
	K: Into<String>,
	V: Into<Option<FieldValue>>,
	I: IntoIterator<Item = (K, V)>,
{
	data.into_iter()
		.map(|(name, value)| (name.into(), FieldState::new(value.into())))
		.collect()
}

fn stamp_all(mut fields: FieldMap, stamp: u64) -> FieldMap {
	for state in fields.values_mut() {
		state.stamp = stamp;
	}
	fields
}

fn json_entries(data: serde_json::Value) -> Option<Vec<(String, Option<FieldValue>)>> {
	match data {
		serde_json::Value::Object(map) => Some(
			map.into_iter()
				.map(|(name, value)| (name, FieldValue::from_json(value)))
				.collect(),
		),
		_ => None,
	}
}
