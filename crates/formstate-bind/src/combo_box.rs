//! Combo-box bindings
//!
//! A combo box binds three pieces of state to one field: the typed text in
//! its element, the selected option(s) and the visibility of its dropdown.
//! Options are identified by their label.
//!
//! The dropdown opens on focus and closes shortly after blur. Clicking a
//! dropdown row blurs the text element before the click lands, so the close
//! is debounced and every interaction that keeps focus inside the combo box
//! cancels it. Selecting an option closes the dropdown at once.
//!
//! [`ComboBox`] selects one option; the multi-select variant lives in
//! [`crate::multi_combo_box`].

use crate::context::FormScope;
use crate::element::ElementRef;
use formstate_core::debounce::Debounce;
use formstate_core::equality::{is_equal, is_equal_opt};
use formstate_core::field::{FieldProperties, Required};
use formstate_core::handle::FieldHandle;
use formstate_core::store::{FieldUpdate, FormStore, Subscription};
use formstate_core::value::{FieldValue, FormValue};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

/// One selectable option
#[derive(Debug, Clone, PartialEq)]
pub struct ComboOption<T> {
	/// Display text, also the option's identity
	pub label: String,
	pub value: T,
}

impl<T> ComboOption<T> {
	/// Option shown as `label`, storing `value`
	pub fn new(label: impl Into<String>, value: T) -> Self {
		Self {
			label: label.into(),
			value,
		}
	}
}

/// Focus, blur, clear and rerender notification
pub type Callback = Rc<dyn Fn()>;
/// Receives the typed text
pub type TypeCallback = Rc<dyn Fn(&str)>;

/// Construction options of a combo box
///
/// `D` is the type of the default value: `T` for [`ComboBox`], `Vec<T>` for
/// the multi-select box.
pub struct ComboOptions<T, D = T> {
	pub options: Vec<ComboOption<T>>,
	pub default_value: Option<D>,
	pub required: Option<Required>,
	pub disabled: bool,
	pub persist_on_unmount: bool,
	/// Show only the options matching the typed text
	pub filter_on_type: bool,
	/// Drop a store value that matches no option and recommit the result
	pub drop_unknown_values: bool,
	pub on_focus: Option<Callback>,
	pub on_blur: Option<Callback>,
	pub on_clear: Option<Callback>,
	pub on_type: Option<TypeCallback>,
	/// Called after every re-render request is served
	pub on_rerender: Option<Callback>,
}

impl<T, D> ComboOptions<T, D> {
	/// Options over `options`, everything else off
	///
	/// # Examples
	///
	/// ```
	/// use formstate_bind::{ComboBox, ComboOption, ComboOptions, FormProvider, InputElement, TextInput};
	/// use formstate_core::EventLoop;
	/// use std::rc::Rc;
	///
	/// let provider = FormProvider::new(Rc::new(EventLoop::new()));
	/// let element = TextInput::new();
	/// let options = ComboOptions::new(vec![ComboOption::new("Red", 1_i64), ComboOption::new("Blue", 2)])
	/// 	.default_value(2);
	/// let combo = ComboBox::mount(&provider.form("f"), "colour", element.element_ref(), options);
	/// assert_eq!(element.value(), "Blue");
	/// assert!(combo.select("Red"));
	/// assert_eq!(combo.selected(), Some(1));
	/// ```
	pub fn new(options: Vec<ComboOption<T>>) -> Self {
		Self {
			options,
			default_value: None,
			required: None,
			disabled: false,
			persist_on_unmount: false,
			filter_on_type: false,
			drop_unknown_values: false,
			on_focus: None,
			on_blur: None,
			on_clear: None,
			on_type: None,
			on_rerender: None,
		}
	}

	/// Selected on mount while nothing else is
	pub fn default_value(mut self, value: D) -> Self {
		self.default_value = Some(value);
		self
	}

	/// See [`Required`]
	pub fn required(mut self, required: impl Into<Required>) -> Self {
		self.required = Some(required.into());
		self
	}

	/// Ignore selections, typing and clearing
	pub fn disabled(mut self, disabled: bool) -> Self {
		self.disabled = disabled;
		self
	}

	/// Keep the field in the store after the combo box is dropped
	pub fn persist_on_unmount(mut self, persist: bool) -> Self {
		self.persist_on_unmount = persist;
		self
	}

	/// Only list options whose label contains the typed text
	pub fn filter_on_type(mut self, filter: bool) -> Self {
		self.filter_on_type = filter;
		self
	}

	/// Drop store values that match no option: a single select clears the
	/// field, a multi select removes the unknown items
	pub fn drop_unknown_values(mut self, drop: bool) -> Self {
		self.drop_unknown_values = drop;
		self
	}

	/// Called when the dropdown opens on focus
	pub fn on_focus(mut self, f: impl Fn() + 'static) -> Self {
		self.on_focus = Some(Rc::new(f));
		self
	}

	/// Called once the delayed hide after a blur ran
	pub fn on_blur(mut self, f: impl Fn() + 'static) -> Self {
		self.on_blur = Some(Rc::new(f));
		self
	}

	/// Called after [`ComboBox::clear`]
	pub fn on_clear(mut self, f: impl Fn() + 'static) -> Self {
		self.on_clear = Some(Rc::new(f));
		self
	}

	/// Called with every typed text
	pub fn on_type(mut self, f: impl Fn(&str) + 'static) -> Self {
		self.on_type = Some(Rc::new(f));
		self
	}

	/// Called after every served re-render request
	pub fn on_rerender(mut self, f: impl Fn() + 'static) -> Self {
		self.on_rerender = Some(Rc::new(f));
		self
	}
}

impl<T, D> fmt::Debug for ComboOptions<T, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComboOptions")
			.field("options", &self.options.len())
			.field("filter_on_type", &self.filter_on_type)
			.field("drop_unknown_values", &self.drop_unknown_values)
			.field("disabled", &self.disabled)
			.finish_non_exhaustive()
	}
}

/// One row of a rendered dropdown
#[derive(Debug, Clone, PartialEq)]
pub struct OptionView<T> {
	/// Position in the full option list
	pub index: usize,
	pub label: String,
	pub value: T,
	pub selected: bool,
}

/// Render snapshot of a combo box
#[derive(Debug, Clone, PartialEq)]
pub struct ComboView<T> {
	pub text: String,
	pub show_options: bool,
	pub options: Vec<OptionView<T>>,
	/// Row to scroll into view when the list is not filtered
	pub scroll_to: Option<usize>,
}

/// Dropdown visibility and render scheduling shared by both combo boxes
pub(crate) struct Dropdown {
	show: Rc<Cell<bool>>,
	hide: Debounce<()>,
	rerender: Debounce<()>,
	renders: Rc<Cell<u64>>,
	/// Skip scrolling on the next render, set after a selection
	no_scroll: Cell<bool>,
	on_focus: Option<Callback>,
}

impl Dropdown {
	pub(crate) fn new<T, D>(scope: &FormScope, options: &ComboOptions<T, D>) -> Self {
		let settings = scope.settings();
		let show = Rc::new(Cell::new(false));
		let renders = Rc::new(Cell::new(0));

		let hide = {
			let show = Rc::clone(&show);
			let on_blur = options.on_blur.clone();
			Debounce::new(scope.provider().scheduler(), settings.combo_hide_delay(), move |()| {
				show.set(false);
				if let Some(on_blur) = &on_blur {
					on_blur();
				}
			})
		};
		let rerender = {
			let renders = Rc::clone(&renders);
			let on_rerender = options.on_rerender.clone();
			Debounce::new(
				scope.provider().scheduler(),
				settings.combo_rerender_delay(),
				move |()| {
					renders.set(renders.get() + 1);
					if let Some(on_rerender) = &on_rerender {
						on_rerender();
					}
				},
			)
		};

		Self {
			show,
			hide,
			rerender,
			renders,
			no_scroll: Cell::new(false),
			on_focus: options.on_focus.clone(),
		}
	}

	pub(crate) fn focus(&self) {
		self.hide.cancel();
		self.show.set(true);
		if let Some(on_focus) = &self.on_focus {
			on_focus();
		}
	}

	pub(crate) fn blur(&self) {
		self.hide.schedule(());
	}

	pub(crate) fn hide_now(&self) {
		self.hide.flush_now(());
	}

	pub(crate) fn cancel_hide(&self) {
		self.hide.cancel();
	}

	pub(crate) fn toggle(&self) {
		self.show.set(!self.show.get());
	}

	pub(crate) fn is_shown(&self) -> bool {
		self.show.get()
	}

	pub(crate) fn request_rerender(&self) {
		self.rerender.schedule(());
	}

	pub(crate) fn rendered(&self) {
		self.renders.set(self.renders.get() + 1);
	}

	pub(crate) fn renders(&self) -> u64 {
		self.renders.get()
	}

	pub(crate) fn skip_next_scroll(&self) {
		self.no_scroll.set(true);
	}

	pub(crate) fn take_no_scroll(&self) -> bool {
		self.no_scroll.replace(false)
	}

	pub(crate) fn cancel_all(&self) {
		self.hide.cancel();
		self.rerender.cancel();
	}
}

/// Case-insensitive substring match, an empty text matches everything
pub(crate) fn label_matches(label: &str, text: &str) -> bool {
	text.is_empty() || label.to_lowercase().contains(&text.to_lowercase())
}

/// Warn about labels used by more than one option
pub(crate) fn check_duplicates<T>(options: &[ComboOption<T>], field: &str) {
	let mut seen = HashSet::new();
	for option in options {
		if !seen.insert(option.label.as_str()) {
			tracing::warn!(
				field,
				label = %option.label,
				"Duplicated key for ComboBox! The first option with this key wins"
			);
			break;
		}
	}
}

pub(crate) fn find_by_value<'a, T: FormValue>(
	options: &'a [ComboOption<T>],
	value: &FieldValue,
) -> Option<&'a ComboOption<T>> {
	options
		.iter()
		.find(|option| is_equal(&option.value.to_field_value(), value))
}

pub(crate) fn find_by_label<'a, T>(options: &'a [ComboOption<T>], label: &str) -> Option<&'a ComboOption<T>> {
	options.iter().find(|option| option.label == label)
}

/// Build the render snapshot
pub(crate) fn build_view<T: Clone>(
	options: &[ComboOption<T>],
	text: String,
	show_options: bool,
	filter_on_type: bool,
	no_scroll: bool,
	is_selected: impl Fn(&T) -> bool,
) -> ComboView<T> {
	let row = |(index, option): (usize, &ComboOption<T>)| OptionView {
		index,
		label: option.label.clone(),
		value: option.value.clone(),
		selected: is_selected(&option.value),
	};

	let (rows, scroll_to) = if no_scroll || !filter_on_type {
		let rows = options.iter().enumerate().map(row).collect();
		let scroll_to = if no_scroll || text.is_empty() {
			None
		} else {
			options.iter().position(|o| label_matches(&o.label, &text))
		};
		(rows, scroll_to)
	} else {
		let rows = options
			.iter()
			.enumerate()
			.filter(|(_, o)| label_matches(&o.label, &text))
			.map(row)
			.collect();
		(rows, None)
	};

	ComboView {
		text,
		show_options,
		options: rows,
		scroll_to,
	}
}

struct ComboInner<T: FormValue> {
	field: FieldHandle,
	element: ElementRef,
	config: RefCell<ComboOptions<T>>,
	mirror: RefCell<Option<T>>,
	last_seen: RefCell<Option<FieldValue>>,
	dropdown: Dropdown,
	muted: Cell<bool>,
}

/// Single-select combo box binding
pub struct ComboBox<T: FormValue> {
	inner: Rc<ComboInner<T>>,
	_subscription: Subscription,
}

impl<T: FormValue> ComboBox<T> {
	/// Bind a combo box to the field `name` of `scope`
	pub fn mount(scope: &FormScope, name: &str, element: ElementRef, options: ComboOptions<T>) -> Self {
		let field = scope.field(name);
		check_duplicates(&options.options, field.name());
		let dropdown = Dropdown::new(scope, &options);

		let inner = Rc::new(ComboInner {
			field,
			element,
			config: RefCell::new(options),
			mirror: RefCell::new(None),
			last_seen: RefCell::new(None),
			dropdown,
			muted: Cell::new(false),
		});

		let weak: Weak<ComboInner<T>> = Rc::downgrade(&inner);
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

	/// Keep the dropdown open, e.g. while its list is scrolled
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

	/// Value of the selected option
	pub fn selected(&self) -> Option<T> {
		self.inner.mirror.borrow().clone()
	}

	/// Handle typed text
	///
	/// Text equal to an option's label selects that option without closing
	/// the dropdown. Any other text only schedules a re-render.
	pub fn on_type(&self, raw: &str) {
		let inner = &self.inner;
		let (found, on_type) = {
			let config = inner.config.borrow();
			if config.disabled {
				return;
			}
			(
				find_by_label(&config.options, raw).map(|o| o.value.clone()),
				config.on_type.clone(),
			)
		};

		inner.dropdown.cancel_hide();
		match found {
			Some(value) => {
				*inner.mirror.borrow_mut() = Some(value.clone());
				inner
					.field
					.update(FieldUpdate::value(value.to_field_value()).with_valid(true));
			}
			None => inner.dropdown.request_rerender(),
		}
		if let Some(on_type) = on_type {
			on_type(raw);
		}
	}

	/// Select the option labelled `label`
	///
	/// Returns `false` when disabled or when no option has that label.
	pub fn select(&self, label: &str) -> bool {
		let inner = &self.inner;
		let found = {
			let config = inner.config.borrow();
			if config.disabled {
				return false;
			}
			find_by_label(&config.options, label).cloned()
		};
		let Some(option) = found else {
			tracing::debug!(field = inner.field.name(), label, "no option with this label");
			return false;
		};

		inner.dropdown.hide_now();
		*inner.mirror.borrow_mut() = Some(option.value.clone());
		inner.element.set_value(&option.label);
		inner.dropdown.skip_next_scroll();
		inner
			.field
			.update(FieldUpdate::value(option.value.to_field_value()));
		true
	}

	/// Clear the text and the selection
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
		*inner.mirror.borrow_mut() = None;
		inner.field.update(FieldUpdate::clear());
		if let Some(on_clear) = on_clear {
			on_clear();
		}
	}

	/// Replace the option list
	pub fn set_options(&self, options: Vec<ComboOption<T>>) {
		check_duplicates(&options, self.inner.field.name());
		self.inner.config.borrow_mut().options = options;
		self.inner.seed_default();
	}

	/// Change the default, then select it if nothing is selected
	pub fn set_default_value(&self, value: Option<T>) {
		self.inner.config.borrow_mut().default_value = value;
		self.inner.push_properties();
		self.inner.seed_default();
	}

	/// Change the declared required constraint
	pub fn set_required(&self, required: impl Into<Required>) {
		self.inner.config.borrow_mut().required = Some(required.into());
		self.inner.push_properties();
	}

	/// Ignore selections, typing and clearing
	pub fn set_disabled(&self, disabled: bool) {
		self.inner.config.borrow_mut().disabled = disabled;
	}

	/// Render snapshot; consumes a pending skip-scroll request
	pub fn view(&self) -> ComboView<T> {
		let inner = &self.inner;
		let no_scroll = inner.dropdown.take_no_scroll();
		let mirror = inner.mirror.borrow();
		let config = inner.config.borrow();
		let selected = mirror.as_ref().map(FormValue::to_field_value);
		build_view(
			&config.options,
			inner.element.value(),
			inner.dropdown.is_shown(),
			config.filter_on_type,
			no_scroll,
			|value| is_equal_opt(Some(&value.to_field_value()), selected.as_ref()),
		)
	}
}

impl<T: FormValue> Drop for ComboBox<T> {
	fn drop(&mut self) {
		self.inner.dropdown.cancel_all();
		self.inner.muted.set(true);
		if !self.inner.config.borrow().persist_on_unmount {
			self.inner.field.delete();
		}
	}
}

impl<T: FormValue> fmt::Debug for ComboBox<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComboBox")
			.field("field", &self.inner.field.name())
			.field("show_options", &self.show_options())
			.finish()
	}
}

impl<T: FormValue> ComboInner<T> {
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
			None => {
				if !self.element.value().is_empty() || self.mirror.borrow().is_some() {
					self.element.set_value("");
					*self.mirror.borrow_mut() = None;
				}
			}
			Some(value) => {
				let same = self
					.mirror
					.borrow()
					.as_ref()
					.is_some_and(|mirror| is_equal(&mirror.to_field_value(), value));
				if !same {
					let (found, drop_unknown) = {
						let config = self.config.borrow();
						(
							find_by_value(&config.options, value).cloned(),
							config.drop_unknown_values,
						)
					};
					match found {
						Some(option) => {
							self.element.set_value(&option.label);
							*self.mirror.borrow_mut() = Some(option.value);
						}
						None => {
							self.element.set_value("");
							if drop_unknown {
								*self.mirror.borrow_mut() = None;
								recommit = true;
							} else {
								*self.mirror.borrow_mut() = T::from_field_value(value);
							}
						}
					}
				}
			}
		}
		self.dropdown.rendered();

		if recommit {
			self.field.update(FieldUpdate::clear().with_valid(true));
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

	/// Select the default option while nothing is selected
	fn seed_default(&self) {
		if self.mirror.borrow().is_some() {
			return;
		}
		let found = {
			let config = self.config.borrow();
			let Some(default_value) = &config.default_value else {
				return;
			};
			find_by_value(&config.options, &default_value.to_field_value()).cloned()
		};
		let Some(option) = found else {
			return;
		};

		self.element.set_value(&option.label);
		*self.mirror.borrow_mut() = Some(option.value.clone());
		self.field
			.update(FieldUpdate::value(option.value.to_field_value()).with_valid(true));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn options() -> Vec<ComboOption<String>> {
		["Apple", "Banana", "Cherry"]
			.into_iter()
			.map(|label| ComboOption::new(label, label.to_lowercase()))
			.collect()
	}

	#[rstest]
	#[case("", true)]
	#[case("an", true)]
	#[case("AN", true)]
	#[case("x", false)]
	fn test_label_matches(#[case] text: &str, #[case] expected: bool) {
		assert_eq!(label_matches("Banana", text), expected);
	}

	#[rstest]
	fn test_view_filters_when_asked() {
		let view = build_view(&options(), "an".into(), true, true, false, |_| false);
		let labels: Vec<_> = view.options.iter().map(|o| o.label.as_str()).collect();
		assert_eq!(labels, vec!["Banana"]);
		assert_eq!(view.options[0].index, 1);
		assert_eq!(view.scroll_to, None);
	}

	#[rstest]
	fn test_view_scrolls_without_filter() {
		let view = build_view(&options(), "ch".into(), true, false, false, |_| false);
		assert_eq!(view.options.len(), 3);
		assert_eq!(view.scroll_to, Some(2));

		let after_select = build_view(&options(), "ch".into(), true, false, true, |_| false);
		assert_eq!(after_select.scroll_to, None);
	}

	#[rstest]
	fn test_no_scroll_shows_full_list_even_when_filtering() {
		let view = build_view(&options(), "an".into(), true, true, true, |v| v == "banana");
		assert_eq!(view.options.len(), 3);
		assert!(view.options[1].selected);
	}

	#[rstest]
	fn test_find_by_value_uses_deep_equality() {
		let options = vec![ComboOption::new(
			"Two",
			FieldValue::record([("id", FieldValue::Int(2))]),
		)];
		let wanted = FieldValue::record([("id", FieldValue::Float(2.0))]);
		assert_eq!(find_by_value(&options, &wanted).map(|o| o.label.as_str()), Some("Two"));
	}
}
