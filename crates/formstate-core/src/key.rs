//! Field keys and subform name composition
//!
//! A field rendered inside a subform `S` lives under the store key
//! `S__name`. Composition happens only here; the store treats keys as opaque
//! strings and the subform registry splits them again at read time.

use std::fmt;

/// Separator between a subform prefix and a field name
pub const SUBFORM_SEPARATOR: &str = "__";

/// Two-level field address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
	pub prefix: Option<String>,
	pub name: String,
}

impl FieldKey {
	/// Top-level field
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			prefix: None,
			name: name.into(),
		}
	}

	/// Field owned by the subform `prefix`
	pub fn scoped(prefix: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			prefix: Some(prefix.into()),
			name: name.into(),
		}
	}

	/// Field under an optional subform, an empty prefix counts as none
	pub fn within(prefix: Option<&str>, name: impl Into<String>) -> Self {
		match prefix {
			Some(p) if !p.is_empty() => Self::scoped(p, name),
			_ => Self::new(name),
		}
	}

	/// Storage key, `prefix__name` or `name`
	pub fn store_key(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("{prefix}{SUBFORM_SEPARATOR}{}", self.name),
			None => self.name.clone(),
		}
	}

	/// Split a storage key against a known prefix
	///
	/// Returns `None` when `key` does not belong to `prefix`.
	pub fn strip(prefix: &str, key: &str) -> Option<FieldKey> {
		key.strip_prefix(prefix)
			.and_then(|rest| rest.strip_prefix(SUBFORM_SEPARATOR))
			.map(|name| FieldKey::scoped(prefix, name))
	}
}

impl fmt::Display for FieldKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.store_key())
	}
}

impl From<&str> for FieldKey {
	fn from(name: &str) -> Self {
		FieldKey::new(name)
	}
}

impl From<String> for FieldKey {
	fn from(name: String) -> Self {
		FieldKey::new(name)
	}
}
