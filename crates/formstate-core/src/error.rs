//! Error types
//!
//! Store operations never return these to the caller. A usage error is
//! logged and the operation becomes a no-op, so the enum mostly exists to
//! give every diagnostic a stable message. Settings loading is the one place
//! a [`FormResult`] reaches the caller.

/// Usage and configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
	#[error("Form ID is not provided")]
	MissingFormId,
	#[error("Field name is not provided for form {form_id}")]
	MissingFieldName { form_id: String },
	#[error("Form {0} does not exist")]
	UnknownForm(String),
	#[error("Invalid settings: {0}")]
	InvalidSettings(String),
}

pub type FormResult<T> = Result<T, FormError>;

/// Reject an empty form id
pub(crate) fn require_form_id(form_id: &str) -> FormResult<()> {
	if form_id.is_empty() {
		return Err(FormError::MissingFormId);
	}
	Ok(())
}

/// Reject an empty form id or field name
pub(crate) fn require_field(form_id: &str, name: &str) -> FormResult<()> {
	require_form_id(form_id)?;
	if name.is_empty() {
		return Err(FormError::MissingFieldName {
			form_id: form_id.to_string(),
		});
	}
	Ok(())
}
