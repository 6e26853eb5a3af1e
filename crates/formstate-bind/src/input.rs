//! Generalized field binding
//!
//! [`GeneralInput`] keeps one uncontrolled element and one store field in
//! agreement. Three actors change them independently:
//!
//! - the user edits the element, reported through [`GeneralInput::on_change`];
//! - other code changes the store, observed through a store subscription;
//! - the binding's own debounced commits land later.
//!
//! The binding keeps a typed mirror of the last value it applied. An edit
//! updates the mirror and schedules a commit. A store change is applied to
//! the element only when the field's write stamp moved since the last look
//! and the normalised value differs from the mirror; applying it cancels the
//! pending commit so that a stale keystroke cannot overwrite it. The stamp
//! moves on every published write, so an external write of the value the
//! store already held still wins over a pending keystroke.
//!
//! Caller-supplied parsers, validators and comparators are not guarded. A
//! panic in one of them unwinds into the host.

use crate::context::FormScope;
use crate::element::{EMPTY_TEXT, ElementRef};
use formstate_core::debounce::Debounce;
use formstate_core::equality::is_equal_opt;
use formstate_core::field::{FieldProperties, Required, Verdict};
use formstate_core::handle::FieldHandle;
use formstate_core::store::{FieldUpdate, FormStore, Subscription};
use formstate_core::value::{FieldValue, FormValue};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Element text to typed value, `None` for no value
pub type Parser<T> = Rc<dyn Fn(&str) -> Option<T>>;
/// Typed value to element text
pub type Formatter<T> = Rc<dyn Fn(Option<&T>) -> String>;
/// Store value to typed value
pub type ToInternal<T> = Rc<dyn Fn(Option<&FieldValue>) -> Option<T>>;
/// Whether two typed values display the same
pub type Comparator<T> = Rc<dyn Fn(Option<&T>, Option<&T>) -> bool>;
/// Receives every parsed edit
pub type ChangeCallback<T> = Rc<dyn Fn(Option<&T>)>;
/// Validator over the typed value
pub type TypedValidator<T> = Rc<dyn Fn(Option<&T>) -> Verdict>;
/// Receives the raw text and its parsed value
pub type PartialCheck<T> = Rc<dyn Fn(&str, Option<&T>) -> bool>;

/// Construction options of a [`GeneralInput`]
pub struct InputOptions<T: FormValue> {
	pub default_value: Option<T>,
	pub required: Option<Required>,
	pub persist_on_unmount: bool,
	pub parser: Parser<T>,
	pub to_string: Formatter<T>,
	pub to_internal: ToInternal<T>,
	pub comparator: Comparator<T>,
	pub on_change: Option<ChangeCallback<T>>,
	pub validator: Option<TypedValidator<T>>,
	pub is_partial: Option<PartialCheck<T>>,
	/// Also clear the stored value (in place) while the input is partial
	pub clear_on_partial: bool,
	pub validate_immediately: bool,
	/// `None` uses the provider's default input delay
	pub input_delay: Option<Duration>,
	pub disabled: bool,
	/// Text the element shows before it has a value
	pub empty_text: String,
}

impl<T: FormValue> InputOptions<T> {
	/// Options with a parser and formatter; everything else defaults
	///
	/// Store values are read with [`FormValue::from_field_value`] and
	/// compared by deep equality.
	pub fn new(
		parser: impl Fn(&str) -> Option<T> + 'static,
		to_string: impl Fn(Option<&T>) -> String + 'static,
	) -> Self {
		Self {
			default_value: None,
			required: None,
			persist_on_unmount: false,
			parser: Rc::new(parser),
			to_string: Rc::new(to_string),
			to_internal: Rc::new(|value: Option<&FieldValue>| value.and_then(T::from_field_value)),
			comparator: Rc::new(|a: Option<&T>, b: Option<&T>| {
				let a = a.map(FormValue::to_field_value);
				let b = b.map(FormValue::to_field_value);
				is_equal_opt(a.as_ref(), b.as_ref())
			}),
			on_change: None,
			validator: None,
			is_partial: None,
			clear_on_partial: false,
			validate_immediately: false,
			input_delay: None,
			disabled: false,
			empty_text: EMPTY_TEXT.to_string(),
		}
	}

	/// Seeded into an element still showing its empty text
	pub fn default_value(mut self, value: T) -> Self {
		self.default_value = Some(value);
		self
	}

	/// See [`Required`]
	pub fn required(mut self, required: impl Into<Required>) -> Self {
		self.required = Some(required.into());
		self
	}

	/// Keep the field in the store after the input is dropped
	pub fn persist_on_unmount(mut self, persist: bool) -> Self {
		self.persist_on_unmount = persist;
		self
	}

	/// Replace how store values are read
	pub fn to_internal(mut self, f: impl Fn(Option<&FieldValue>) -> Option<T> + 'static) -> Self {
		self.to_internal = Rc::new(f);
		self
	}

	/// Replace the equality that decides whether the element is rewritten
	pub fn comparator(mut self, f: impl Fn(Option<&T>, Option<&T>) -> bool + 'static) -> Self {
		self.comparator = Rc::new(f);
		self
	}

	/// Called with every parsed, non-partial edit
	pub fn on_change(mut self, f: impl Fn(Option<&T>) + 'static) -> Self {
		self.on_change = Some(Rc::new(f));
		self
	}

	/// Validator returning a `bool`, a reason or a `Result`
	pub fn validator<V, F>(mut self, f: F) -> Self
	where
		V: Into<Verdict>,
		F: Fn(Option<&T>) -> V + 'static,
	{
		self.validator = Some(Rc::new(move |value: Option<&T>| -> Verdict { f(value).into() }));
		self
	}

	/// Decide whether an edit is still being typed
	pub fn is_partial(mut self, f: impl Fn(&str, Option<&T>) -> bool + 'static) -> Self {
		self.is_partial = Some(Rc::new(f));
		self
	}

	/// Also clear the stored value, in place, while the input is partial
	pub fn clear_on_partial(mut self, clear: bool) -> Self {
		self.clear_on_partial = clear;
		self
	}

	/// Run the validator on every commit instead of on submit
	pub fn validate_immediately(mut self, immediate: bool) -> Self {
		self.validate_immediately = immediate;
		self
	}

	/// Debounce commits by `delay`
	pub fn input_delay(mut self, delay: Duration) -> Self {
		self.input_delay = Some(delay);
		self
	}

	/// Delay in milliseconds; a negative delay is treated as zero
	pub fn input_delay_ms(mut self, delay: i64) -> Self {
		let delay = u64::try_from(delay).unwrap_or_else(|_| {
			tracing::warn!(delay, "Invalid inputDelay! Switched to 0ms");
			0
		});
		self.input_delay = Some(Duration::from_millis(delay));
		self
	}

	/// Ignore edits
	pub fn disabled(mut self, disabled: bool) -> Self {
		self.disabled = disabled;
		self
	}

	/// Text the element shows before it has a value
	pub fn empty_text(mut self, text: impl Into<String>) -> Self {
		self.empty_text = text.into();
		self
	}

	/// Declared properties pushed to the store
	fn properties(&self) -> FieldProperties {
		let mut properties = FieldProperties::new();
		properties.default_value = self.default_value.as_ref().map(FormValue::to_field_value);
		properties.required = self.required.clone();
		if let Some(validator) = self.validator.clone() {
			properties = properties.with_validator(move |value: Option<&FieldValue>| {
				let typed = value.and_then(T::from_field_value);
				validator(typed.as_ref())
			});
		}
		properties
	}
}

impl<T: FormValue> fmt::Debug for InputOptions<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InputOptions")
			.field("required", &self.required)
			.field("persist_on_unmount", &self.persist_on_unmount)
			.field("validate_immediately", &self.validate_immediately)
			.field("input_delay", &self.input_delay)
			.field("disabled", &self.disabled)
			.finish_non_exhaustive()
	}
}

struct InputInner<T: FormValue> {
	field: FieldHandle,
	element: ElementRef,
	options: RefCell<InputOptions<T>>,
	mirror: RefCell<Option<T>>,
	/// Field stamp observed by the last reconciliation
	last_stamp: Cell<u64>,
	commit: Debounce<FieldUpdate>,
	/// Set while store notifications must be ignored
	muted: Cell<bool>,
}

/// Binding between one element and one field
pub struct GeneralInput<T: FormValue> {
	inner: Rc<InputInner<T>>,
	_subscription: Subscription,
}

impl<T: FormValue> GeneralInput<T> {
	/// Bind `element` to the field `name` of `scope`
	///
	/// On mount the element first takes the store's current value, then the
	/// declared properties are pushed, then a default value seeds an element
	/// that still shows its empty text.
	pub fn mount(scope: &FormScope, name: &str, element: ElementRef, options: InputOptions<T>) -> Self {
		let field = scope.field(name);
		let delay = options.input_delay.unwrap_or_else(|| scope.settings().input_delay());
		let commit = {
			let field = field.clone();
			Debounce::new(
				scope.provider().scheduler(),
				delay,
				move |update: FieldUpdate| field.update(update),
			)
		};

		let inner = Rc::new(InputInner {
			field,
			element,
			options: RefCell::new(options),
			mirror: RefCell::new(None),
			last_stamp: Cell::new(0),
			commit,
			muted: Cell::new(false),
		});

		let weak: Weak<InputInner<T>> = Rc::downgrade(&inner);
		let subscription = scope.store().subscribe(move |_: &FormStore| {
			if let Some(inner) = weak.upgrade() {
				inner.on_store_change();
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

	/// Handle an edit of the element's text
	pub fn on_change(&self, raw: &str) {
		self.inner.on_change(raw);
	}

	/// Field this input writes
	pub fn field(&self) -> &FieldHandle {
		&self.inner.field
	}

	/// Bound element
	pub fn element(&self) -> &ElementRef {
		&self.inner.element
	}

	/// Value the binding last applied
	pub fn mirror(&self) -> Option<T> {
		self.inner.mirror.borrow().clone()
	}

	/// Whether a debounced commit is waiting
	pub fn is_pending(&self) -> bool {
		self.inner.commit.is_pending()
	}

	/// Ignore edits while `disabled`
	pub fn set_disabled(&self, disabled: bool) {
		self.inner.options.borrow_mut().disabled = disabled;
	}

	/// Change the default value, then seed it if the element is still empty
	pub fn set_default_value(&self, value: Option<T>) {
		self.inner.options.borrow_mut().default_value = value;
		self.inner.push_properties();
		self.inner.seed_default();
	}

	/// Change the declared required constraint
	pub fn set_required(&self, required: impl Into<Required>) {
		self.inner.options.borrow_mut().required = Some(required.into());
		self.inner.push_properties();
	}

	/// Replace the validator and push it to the store
	pub fn set_validator<V, F>(&self, f: F)
	where
		V: Into<Verdict>,
		F: Fn(Option<&T>) -> V + 'static,
	{
		self.inner.options.borrow_mut().validator =
			Some(Rc::new(move |value: Option<&T>| -> Verdict { f(value).into() }));
		self.inner.push_properties();
	}
}

impl<T: FormValue> Drop for GeneralInput<T> {
	fn drop(&mut self) {
		self.inner.commit.cancel();
		self.inner.muted.set(true);
		if !self.inner.options.borrow().persist_on_unmount {
			self.inner.field.delete();
		}
	}
}

impl<T: FormValue> fmt::Debug for GeneralInput<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GeneralInput")
			.field("field", &self.inner.field.name())
			.field("pending", &self.is_pending())
			.finish()
	}
}

impl<T: FormValue> InputInner<T> {
	fn on_change(&self, raw: &str) {
		let (parser, is_partial, clear_on_partial, on_change) = {
			let options = self.options.borrow();
			if options.disabled {
				return;
			}
			(
				Rc::clone(&options.parser),
				options.is_partial.clone(),
				options.clear_on_partial,
				options.on_change.clone(),
			)
		};

		let parsed = parser(raw);
		if is_partial.is_some_and(|check| check(raw, parsed.as_ref())) {
			// Neither the pending commit nor the partial text reaches the store
			self.commit.cancel();
			if clear_on_partial {
				self.field.update(FieldUpdate::clear().skip_render());
			}
			return;
		}

		*self.mirror.borrow_mut() = parsed.clone();
		let update = FieldUpdate::default().with_value(parsed.as_ref().map(FormValue::to_field_value));
		self.commit.schedule(self.with_validity(update, parsed.as_ref()));
		if let Some(callback) = on_change {
			callback(parsed.as_ref());
		}
	}

	/// Add the validity part of a commit
	///
	/// Without immediate validation an edit only clears a previous error.
	fn with_validity(&self, update: FieldUpdate, value: Option<&T>) -> FieldUpdate {
		let (validate_immediately, validator) = {
			let options = self.options.borrow();
			(options.validate_immediately, options.validator.clone())
		};
		if !validate_immediately {
			if self.field.snapshot().valid {
				return update;
			}
			return update.with_valid(true);
		}
		match validator.map(|validator| validator(value)) {
			None | Some(Verdict::Valid) => update.with_valid(true),
			Some(Verdict::Invalid) => update.with_valid(false),
			Some(Verdict::InvalidBecause(reason)) => update.with_valid(false).with_invalid_reason(reason),
		}
	}

	fn on_store_change(&self) {
		if self.muted.get() {
			return;
		}
		self.reconcile(false);
	}

	/// Apply an external store change to the element
	fn reconcile(&self, force: bool) {
		let snapshot = self.field.snapshot();
		if !force && snapshot.stamp == self.last_stamp.get() {
			return;
		}
		self.last_stamp.set(snapshot.stamp);
		let current = snapshot.value;

		let (to_internal, comparator, to_string) = {
			let options = self.options.borrow();
			(
				Rc::clone(&options.to_internal),
				Rc::clone(&options.comparator),
				Rc::clone(&options.to_string),
			)
		};
		let internal = to_internal(current.as_ref());
		let unchanged = comparator(internal.as_ref(), self.mirror.borrow().as_ref());
		if unchanged {
			return;
		}

		self.commit.cancel();
		self.element.set_value(&to_string(internal.as_ref()));
		*self.mirror.borrow_mut() = internal.clone();

		// Revalidate against the new value, bypassing the debounce. Only the
		// validity is written, the store already holds the value.
		let update = self.with_validity(FieldUpdate::default(), internal.as_ref());
		if update.valid.is_some() {
			self.muted.set(true);
			self.commit.flush_now(update);
			self.muted.set(false);
		}
	}

	fn push_properties(&self) {
		let properties = self.options.borrow().properties();
		self.field.set_properties(properties);
	}

	/// Seed the default value into an element still showing its empty text
	fn seed_default(&self) {
		let (default_value, empty_text, to_string) = {
			let options = self.options.borrow();
			(
				options.default_value.clone(),
				options.empty_text.clone(),
				Rc::clone(&options.to_string),
			)
		};
		let Some(default_value) = default_value else {
			return;
		};
		if self.element.value() != empty_text {
			return;
		}

		self.element.set_value(&to_string(Some(&default_value)));
		*self.mirror.borrow_mut() = Some(default_value.clone());
		self.commit.flush_now(FieldUpdate::value(default_value.to_field_value()));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn options() -> InputOptions<String> {
		InputOptions::new(|raw| Some(raw.to_string()), |v| v.cloned().unwrap_or_default())
	}

	#[rstest]
	#[case(-5, Duration::ZERO)]
	#[case(0, Duration::ZERO)]
	#[case(150, Duration::from_millis(150))]
	fn test_input_delay_ms(#[case] delay: i64, #[case] expected: Duration) {
		assert_eq!(options().input_delay_ms(delay).input_delay, Some(expected));
	}

	#[rstest]
	fn test_typed_validator_reaches_properties() {
		let properties = options()
			.validator(|v: Option<&String>| v.is_some_and(|s| s.len() > 2))
			.properties();
		let validator = properties.validator.as_ref().map(Rc::clone);
		assert_eq!(
			validator.map(|f| f(Some(&FieldValue::from("ab")))),
			Some(Verdict::Invalid)
		);
	}

	#[rstest]
	fn test_default_comparator_is_deep() {
		let options = options();
		let a = "x".to_string();
		let b = "x".to_string();
		assert!((options.comparator)(Some(&a), Some(&b)));
		assert!(!(options.comparator)(Some(&a), None));
	}
}
