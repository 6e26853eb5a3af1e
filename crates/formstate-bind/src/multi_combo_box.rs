//! Multi-select combo box
//!
//! The field holds an array of option values. Choosing an option toggles its
//! membership and clears the typed text; the dropdown closes after every
//! change.

use crate::combo_box::{
	ComboOption, ComboOptions, ComboView, Dropdown, build_view, check_duplicates, find_by_label,
	find_by_value,
};
use crate::context::FormScope;
use crate::element::ElementRef;
use formstate_core::equality::{is_equal, is_equal_opt};
use formstate_core::field::{FieldProperties, Required};
use formstate_core::handle::FieldHandle;
use formstate_core::store::{FieldUpdate, FormStore, Subscription};
use formstate_core::value::{FieldValue, FormValue};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Options of a [`MultiComboBox`], whose default is a list of values
pub type MultiComboOptions<T> = ComboOptions<T, Vec<T>>;

struct MultiInner<T: FormValue> {
	field: FieldHandle,
	element: ElementRef,
	config: RefCell<MultiComboOptions<T>>,
	mirror: RefCell<Vec<T>>,
	last_seen: RefCell<Option<FieldValue>>,
	dropdown: Dropdown,
	muted: Cell<bool>,
}

/// Multi-select combo box binding
pub struct MultiComboBox<T: FormValue> {
	inner: Rc<MultiInner<T>>,
	_subscription: Subscription,
}

impl<T: FormValue> MultiComboBox<T> {
	/// Bind `element`, the typed filter text, to the array field `name`
	///
	/// # Examples
	///
	/// ```
	/// use formstate_bind::{ComboOption, FormProvider, MultiComboBox, MultiComboOptions, TextInput};
	/// use formstate_core::EventLoop;
	/// use std::rc::Rc;
	///
	/// let provider = FormProvider::new(Rc::new(EventLoop::new()));
	/// let options = vec![ComboOption::new("Rust", "rs".to_string()), ComboOption::new("Go", "go".to_string())];
	/// let tags = MultiComboBox::mount(
	/// 	&provider.form("f"),
	/// 	"tags",
	/// 	TextInput::new().element_ref(),
	/// 	MultiComboOptions::new(options),
	/// );
	/// tags.select("Go");
	/// tags.select("Rust");
	/// assert_eq!(tags.selected(), vec!["go".to_string(), "rs".to_string()]);
	/// ```
	pub fn mount(
		scope: &FormScope,
		name: &str,
		element: ElementRef,
		options: MultiComboOptions<T>,
	) -> Self {
		let field = scope.field(name);
		check_duplicates(&options.options, field.name());
		let dropdown = Dropdown::new(scope, &options);

		let inner = Rc::new(MultiInner {
			field,
			element,
			config: RefCell::new(options),
			mirror: RefCell::new(Vec::new()),
			last_seen: RefCell::new(None),
			dropdown,
			muted: Cell::new(false),
		});

		let weak: Weak<MultiInner<T>> = Rc::downgrade(&inner);
		let subscription = scope.store().subscribe(move |_: &FormStore| {
			if let Some(inner) = weak.upgrade()
				&& !inner.muted.get()
			{
				inner.reconcile(false);
			}
		});

		inner.reconcile(true);
		inner.push_properties();
		inner.seed_default();

		Self {
			inner,
			_subscription: subscription,
		}
	}

	/// Field this combo box writes
	pub fn field(&self) -> &FieldHandle {
		&self.inner.field
	}

	/// Open the dropdown and cancel a pending hide
	pub fn focus(&self) {
		self.inner.dropdown.focus();
	}

	/// Hide the dropdown after the hide delay
	pub fn blur(&self) {
		self.inner.dropdown.blur();
	}

	/// Keep the dropdown open
	pub fn cancel_hide(&self) {
		self.inner.dropdown.cancel_hide();
	}

	/// Open or close the dropdown now
	pub fn toggle_dropdown(&self) {
		self.inner.dropdown.toggle();
	}

	/// Whether the dropdown is open
	pub fn show_options(&self) -> bool {
		self.inner.dropdown.is_shown()
	}

	/// Number of renders served so far
	pub fn renders(&self) -> u64 {
		self.inner.dropdown.renders()
	}

	/// Selected values in selection order
	pub fn selected(&self) -> Vec<T> {
		self.inner.mirror.borrow().clone()
	}

	/// Typed text only filters, it never selects
	pub fn on_type(&self, raw: &str) {
		let on_type = {
			let config = self.inner.config.borrow();
			if config.disabled {
				return;
			}
			config.on_type.clone()
		};
		self.inner.dropdown.cancel_hide();
		self.inner.dropdown.request_rerender();
		if let Some(on_type) = on_type {
			on_type(raw);
		}
	}

	/// Toggle the option labelled `label`
	pub fn select(&self, label: &str) -> bool {
		let inner = &self.inner;
		let found = {
			let config = inner.config.borrow();
			if config.disabled {
				return false;
			}
			find_by_label(&config.options, label).map(|o| o.value.clone())
		};
		let Some(value) = found else {
			tracing::debug!(field = inner.field.name(), label, "no option with this label");
			return false;
		};

		inner.dropdown.hide_now();
		{
			let wanted = value.to_field_value();
			let mut mirror = inner.mirror.borrow_mut();
			match mirror
				.iter()
				.position(|item| is_equal(&item.to_field_value(), &wanted))
			{
				Some(index) => {
					mirror.remove(index);
				}
				None => mirror.push(value),
			}
		}
		inner.element.set_value("");
		inner.dropdown.skip_next_scroll();
		inner.commit();
		true
	}

	/// Remove the selected value at `index`, e.g. from its chip
	pub fn remove(&self, index: usize) -> bool {
		let inner = &self.inner;
		if inner.config.borrow().disabled {
			return false;
		}
		{
			let mut mirror = inner.mirror.borrow_mut();
			if index >= mirror.len() {
				return false;
			}
			mirror.remove(index);
		}
		inner.dropdown.hide_now();
		inner.dropdown.skip_next_scroll();
		inner.commit();
		true
	}

	/// Clear the text and every selection
	pub fn clear(&self) {
		let inner = &self.inner;
		let on_clear = {
			let config = inner.config.borrow();
			if config.disabled {
				return;
			}
			config.on_clear.clone()
		};
		inner.element.set_value("");
		inner.mirror.borrow_mut().clear();
		inner.commit();
		if let Some(on_clear) = on_clear {
			on_clear();
		}
	}

	/// Replace the option list, then seed the default if nothing is selected
	pub fn set_options(&self, options: Vec<ComboOption<T>>) {
		check_duplicates(&options, self.inner.field.name());
		self.inner.config.borrow_mut().options = options;
		self.inner.seed_default();
	}

	/// Change the default, then seed it if nothing is selected
	pub fn set_default_value(&self, value: Option<Vec<T>>) {
		self.inner.config.borrow_mut().default_value = value;
		self.inner.push_properties();
		self.inner.seed_default();
	}

	/// Change the declared required constraint
	pub fn set_required(&self, required: impl Into<Required>) {
		self.inner.config.borrow_mut().required = Some(required.into());
		self.inner.push_properties();
	}

	/// Ignore selections, removals and clearing
	pub fn set_disabled(&self, disabled: bool) {
		self.inner.config.borrow_mut().disabled = disabled;
	}

	/// Render snapshot; selected options are flagged
	pub fn view(&self) -> ComboView<T> {
		let inner = &self.inner;
		let no_scroll = inner.dropdown.take_no_scroll();
		let selected: Vec<FieldValue> = inner
			.mirror
			.borrow()
			.iter()
			.map(FormValue::to_field_value)
			.collect();
		let config = inner.config.borrow();
		build_view(
			&config.options,
			inner.element.value(),
			inner.dropdown.is_shown(),
			config.filter_on_type,
			no_scroll,
			|value| {
				let wanted = value.to_field_value();
				selected.iter().any(|item| is_equal(item, &wanted))
			},
		)
	}
}

impl<T: FormValue> Drop for MultiComboBox<T> {
	fn drop(&mut self) {
		self.inner.dropdown.cancel_all();
		self.inner.muted.set(true);
		if !self.inner.config.borrow().persist_on_unmount {
			self.inner.field.delete();
		}
	}
}

impl<T: FormValue> fmt::Debug for MultiComboBox<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MultiComboBox")
			.field("field", &self.inner.field.name())
			.field("selected", &self.inner.mirror.borrow().len())
			.finish()
	}
}

impl<T: FormValue> MultiInner<T> {
	fn commit(&self) {
		let value = self.mirror.borrow().to_field_value();
		self.field.update(FieldUpdate::value(value));
	}

	fn reconcile(&self, force: bool) {
		let current = self.field.snapshot().value;
		{
			let mut last_seen = self.last_seen.borrow_mut();
			if !force && is_equal_opt(current.as_ref(), last_seen.as_ref()) {
				return;
			}
			last_seen.clone_from(&current);
		}

		let mut recommit = false;
		match &current {
			None => self.mirror.borrow_mut().clear(),
			Some(value) => {
				let same = is_equal(&self.mirror.borrow().to_field_value(), value);
				if !same {
					let config = self.config.borrow();
					let items = value.as_array().unwrap_or_default();
					let mut next = Vec::with_capacity(items.len());
					let mut unknown = value.as_array().is_none();
					for item in items {
						match find_by_value(&config.options, item) {
							Some(option) => next.push(option.value.clone()),
							None if config.drop_unknown_values => unknown = true,
							None => match T::from_field_value(item) {
								Some(raw) => next.push(raw),
								None => unknown = true,
							},
						}
					}
					recommit = unknown && config.drop_unknown_values;
					drop(config);
					*self.mirror.borrow_mut() = next;
				}
			}
		}
		self.dropdown.rendered();

		if recommit {
			let value = self.mirror.borrow().to_field_value();
			self.field.update(FieldUpdate::value(value).with_valid(true));
		}
	}

	fn push_properties(&self) {
		let properties = {
			let config = self.config.borrow();
			let mut properties = FieldProperties::new();
			properties.default_value = config.default_value.as_ref().map(FormValue::to_field_value);
			properties.required = config.required.clone();
			properties
		};
		self.field.set_properties(properties);
	}

	/// Select the default options that exist while nothing is selected
	fn seed_default(&self) {
		if !self.mirror.borrow().is_empty() {
			return;
		}
		let found: Vec<T> = {
			let config = self.config.borrow();
			let Some(defaults) = &config.default_value else {
				return;
			};
			defaults
				.iter()
				.filter_map(|d| find_by_value(&config.options, &d.to_field_value()))
				.map(|o| o.value.clone())
				.collect()
		};
		if found.is_empty() {
			return;
		}
		*self.mirror.borrow_mut() = found;
		let value = self.mirror.borrow().to_field_value();
		self.field.update(FieldUpdate::value(value).with_valid(true));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::FormProvider;
	use crate::element::TextInput;
	use formstate_core::debounce::EventLoop;
	use rstest::rstest;

	fn options() -> Vec<ComboOption<i64>> {
		vec![
			ComboOption::new("One", 1),
			ComboOption::new("Two", 2),
			ComboOption::new("Three", 3),
		]
	}

	#[rstest]
	fn test_select_toggles_membership() {
		let provider = FormProvider::new(Rc::new(EventLoop::new()));
		let scope = provider.form("f");
		let combo = MultiComboBox::mount(
			&scope,
			"tags",
			TextInput::new().element_ref(),
			MultiComboOptions::new(options()),
		);

		assert!(combo.select("Two"));
		assert!(combo.select("One"));
		assert_eq!(combo.selected(), vec![2, 1]);
		assert!(combo.select("Two"));
		assert_eq!(combo.selected(), vec![1]);
		assert_eq!(
			provider.store().value("f", "tags"),
			Some(FieldValue::Array(vec![FieldValue::Int(1)]))
		);
	}

	#[rstest]
	fn test_shrinking_store_array_is_reflected() {
		let provider = FormProvider::new(Rc::new(EventLoop::new()));
		let scope = provider.form("f");
		let combo = MultiComboBox::mount(
			&scope,
			"tags",
			TextInput::new().element_ref(),
			MultiComboOptions::new(options()),
		);
		combo.select("One");
		combo.select("Two");

		scope.field("tags").update(FieldUpdate::value(vec![FieldValue::Int(1)]));
		assert_eq!(combo.selected(), vec![1]);
	}

	#[rstest]
	fn test_unknown_items_are_dropped_when_asked() {
		let provider = FormProvider::new(Rc::new(EventLoop::new()));
		let scope = provider.form("f");
		let _combo = MultiComboBox::mount(
			&scope,
			"tags",
			TextInput::new().element_ref(),
			MultiComboOptions::new(options()).drop_unknown_values(true),
		);

		scope
			.field("tags")
			.update(FieldUpdate::value(vec![FieldValue::Int(3), FieldValue::Int(9)]));
		assert_eq!(
			provider.store().value("f", "tags"),
			Some(FieldValue::Array(vec![FieldValue::Int(3)]))
		);
	}
}
