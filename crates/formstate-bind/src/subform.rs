//! Subform grouping
//!
//! A mounted [`SubForm`] registers its prefix with the store and hands out a
//! scope whose field names carry that prefix. Subforms do not nest: mounting
//! one inside another logs a warning and the inner prefix replaces the outer
//! one for everything below it.

use crate::context::FormScope;
use std::fmt;

/// Mounted subform, deregisters its prefix on drop
pub struct SubForm {
	scope: FormScope,
	prefix: String,
}

impl SubForm {
	/// Mount a subform below `parent`
	///
	/// # Examples
	///
	/// ```
	/// use formstate_bind::{FormProvider, SubForm};
	/// use formstate_core::{EventLoop, FieldUpdate};
	/// use std::rc::Rc;
	///
	/// let provider = FormProvider::new(Rc::new(EventLoop::new()));
	/// let address = SubForm::mount(&provider.form("order"), "addr");
	/// address.scope().field("city").update(FieldUpdate::value("X"));
	///
	/// let data = provider.store().get_form_data("order");
	/// assert!(data["addr"].as_sub_form().is_some());
	/// ```
	pub fn mount(parent: &FormScope, prefix: impl Into<String>) -> Self {
		let prefix = prefix.into();
		if let Some(outer) = parent.sub_form()
			&& parent.settings().warn_nested_subform
		{
			tracing::warn!(
				form_id = parent.form_id(),
				outer,
				prefix = %prefix,
				"SubForm within SubForm is not supported! Only the innermost SubForm will be used"
			);
		}
		parent.store().set_sub_form(parent.form_id(), &prefix);
		Self {
			scope: parent.with_sub_form(&prefix),
			prefix,
		}
	}

	/// Scope for the fields of this subform
	pub fn scope(&self) -> &FormScope {
		&self.scope
	}

	/// Prefix prepended to the field names of nested bindings
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Move the subform to a new prefix
	///
	/// Bindings mounted under the old scope keep their old names and have to
	/// be remounted under [`SubForm::scope`].
	pub fn set_prefix(&mut self, prefix: impl Into<String>) {
		let prefix = prefix.into();
		if prefix == self.prefix {
			return;
		}
		let store = self.scope.store();
		store.delete_sub_form(self.scope.form_id(), &self.prefix);
		store.set_sub_form(self.scope.form_id(), &prefix);
		self.scope = self.scope.with_sub_form(&prefix);
		self.prefix = prefix;
	}
}

impl Drop for SubForm {
	fn drop(&mut self) {
		self.scope
			.store()
			.delete_sub_form(self.scope.form_id(), &self.prefix);
	}
}

impl fmt::Debug for SubForm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubForm")
			.field("form_id", &self.scope.form_id())
			.field("prefix", &self.prefix)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::FormProvider;
	use formstate_core::debounce::EventLoop;
	use rstest::rstest;
	use std::rc::Rc;

	fn provider() -> FormProvider {
		FormProvider::new(Rc::new(EventLoop::new()))
	}

	#[rstest]
	fn test_mount_and_drop_register_prefix() {
		let provider = provider();
		let sub = SubForm::mount(&provider.form("f"), "addr");
		assert_eq!(provider.store().sub_forms("f"), vec!["addr".to_string()]);
		drop(sub);
		assert!(provider.store().sub_forms("f").is_empty());
	}

	#[rstest]
	fn test_set_prefix_moves_registration() {
		let provider = provider();
		let mut sub = SubForm::mount(&provider.form("f"), "billing");
		sub.set_prefix("shipping");
		assert_eq!(provider.store().sub_forms("f"), vec!["shipping".to_string()]);
		assert_eq!(sub.scope().field("zip").name(), "shipping__zip");
	}

	#[rstest]
	fn test_innermost_prefix_wins() {
		let provider = provider();
		let outer = SubForm::mount(&provider.form("f"), "outer");
		let inner = SubForm::mount(outer.scope(), "inner");
		assert_eq!(inner.scope().field("x").name(), "inner__x");
	}
}
