//! Provider and form scopes
//!
//! There is no ambient context. The application creates one
//! [`FormProvider`] at start-up and passes [`FormScope`]s down the component
//! tree explicitly; a scope tells a binding which form it belongs to and
//! which subform prefix, if any, applies to its field names.

use formstate_core::debounce::Scheduler;
use formstate_core::handle::{FieldHandle, FormHandle};
use formstate_core::key::FieldKey;
use formstate_core::settings::FormSettings;
use formstate_core::store::FormStore;
use std::fmt;
use std::rc::Rc;

/// Application-root holder of the store, timers and settings
#[derive(Clone)]
pub struct FormProvider {
	store: FormStore,
	scheduler: Rc<dyn Scheduler>,
	settings: Rc<FormSettings>,
}

impl FormProvider {
	/// Create a provider with default settings
	///
	/// # Examples
	///
	/// ```
	/// use formstate_bind::FormProvider;
	/// use formstate_core::EventLoop;
	/// use std::rc::Rc;
	///
	/// let provider = FormProvider::new(Rc::new(EventLoop::new()));
	/// let scope = provider.form("login");
	/// assert_eq!(scope.form_id(), "login");
	/// ```
	pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
		Self::with_settings(scheduler, FormSettings::default())
	}

	/// Create a provider with explicit delays
	pub fn with_settings(scheduler: Rc<dyn Scheduler>, settings: FormSettings) -> Self {
		Self {
			store: FormStore::new(),
			scheduler,
			settings: Rc::new(settings),
		}
	}

	/// Store shared by every form
	pub fn store(&self) -> &FormStore {
		&self.store
	}

	/// Timer seam shared by every binding
	pub fn scheduler(&self) -> Rc<dyn Scheduler> {
		Rc::clone(&self.scheduler)
	}

	/// Default delays
	pub fn settings(&self) -> &FormSettings {
		&self.settings
	}

	/// Top-level scope of a form
	pub fn form(&self, form_id: impl Into<String>) -> FormScope {
		FormScope {
			provider: self.clone(),
			form_id: form_id.into(),
			sub_form: None,
		}
	}
}

impl fmt::Debug for FormProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormProvider")
			.field("store", &self.store)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

/// Position of a component inside a form
#[derive(Clone)]
pub struct FormScope {
	provider: FormProvider,
	form_id: String,
	sub_form: Option<String>,
}

impl FormScope {
	/// Provider the scope was created from
	pub fn provider(&self) -> &FormProvider {
		&self.provider
	}

	pub fn store(&self) -> &FormStore {
		self.provider.store()
	}

	pub fn settings(&self) -> &FormSettings {
		self.provider.settings()
	}

	/// Id of the enclosing form
	pub fn form_id(&self) -> &str {
		&self.form_id
	}

	/// Prefix of the enclosing subform
	pub fn sub_form(&self) -> Option<&str> {
		self.sub_form.as_deref()
	}

	/// Handle of the whole form, ignoring the subform prefix
	pub fn form(&self) -> FormHandle {
		FormHandle::new(self.store().clone(), self.form_id.clone())
	}

	/// Key of `name` as seen from this scope
	pub fn key(&self, name: &str) -> FieldKey {
		FieldKey::within(self.sub_form(), name)
	}

	/// Handle of `name`, prefixed by the enclosing subform
	pub fn field(&self, name: &str) -> FieldHandle {
		self.form().field(self.key(name).store_key())
	}

	pub(crate) fn with_sub_form(&self, prefix: &str) -> FormScope {
		FormScope {
			provider: self.provider.clone(),
			form_id: self.form_id.clone(),
			sub_form: Some(prefix.to_string()),
		}
	}
}

impl fmt::Debug for FormScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormScope")
			.field("form_id", &self.form_id)
			.field("sub_form", &self.sub_form)
			.finish()
	}
}
