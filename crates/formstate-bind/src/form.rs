//! Mounted form

use crate::context::{FormProvider, FormScope};
use formstate_core::handle::FormHandle;
use formstate_core::store::FormValues;
use std::fmt;

/// Mounted form, deletes its data on drop unless persisted
pub struct Form {
	scope: FormScope,
	persist_on_unmount: bool,
	submit_buttons: Option<Vec<String>>,
}

impl Form {
	/// Mount the form `form_id` of `provider`
	pub fn mount(provider: &FormProvider, form_id: impl Into<String>) -> Self {
		Self {
			scope: provider.form(form_id),
			persist_on_unmount: false,
			submit_buttons: None,
		}
	}

	/// Keep the form's data in the store after drop
	pub fn persist_on_unmount(mut self, persist: bool) -> Self {
		self.persist_on_unmount = persist;
		self
	}

	/// Only accept submissions triggered by one of these button ids
	pub fn submit_buttons<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.submit_buttons = Some(ids.into_iter().map(Into::into).collect());
		self
	}

	/// Scope to mount the form's bindings in
	pub fn scope(&self) -> &FormScope {
		&self.scope
	}

	/// Store operations of this form
	pub fn handle(&self) -> FormHandle {
		self.scope.form()
	}

	/// Handle a submit event raised by `submitter`
	///
	/// Returns whether `on_submit` ran: the submitter must be accepted and
	/// the form must validate.
	pub fn submit(&self, submitter: Option<&str>, on_submit: impl FnOnce(FormValues)) -> bool {
		if let Some(accepted) = &self.submit_buttons {
			let is_submitter = submitter.is_some_and(|id| accepted.iter().any(|a| a == id));
			if !is_submitter {
				tracing::debug!(
					form_id = self.scope.form_id(),
					submitter,
					"submit ignored, not a submit button"
				);
				return false;
			}
		}
		self.handle().submit(on_submit)
	}
}

impl Drop for Form {
	fn drop(&mut self) {
		if !self.persist_on_unmount {
			self.scope.store().delete_form(self.scope.form_id());
		}
	}
}

impl fmt::Debug for Form {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Form")
			.field("form_id", &self.scope.form_id())
			.field("persist_on_unmount", &self.persist_on_unmount)
			.finish()
	}
}
