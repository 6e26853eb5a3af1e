//! Subform registry and read-time grouping
//!
//! Each form keeps an ordered list of prefixes. Registering a prefix twice
//! keeps both entries and removal drops only the first match, so mount and
//! unmount of two components sharing a prefix stay balanced.
//!
//! Grouping walks the prefixes in registration order. Each prefix claims
//! every still-unclaimed key that starts with `prefix__`; whatever is left
//! stays at the top level.

use crate::key::FieldKey;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Ordered prefix lists, per form
#[derive(Debug, Clone, Default)]
pub struct SubFormRegistry {
	prefixes: HashMap<String, Vec<String>>,
}

impl SubFormRegistry {
	/// Registry without prefixes
	pub fn new() -> Self {
		Self::default()
	}

	/// Append `prefix` to the form's list
	pub fn register(&mut self, form_id: &str, prefix: &str) {
		self.prefixes
			.entry(form_id.to_string())
			.or_default()
			.push(prefix.to_string());
	}

	/// Remove the first registration of `prefix`, returning whether one existed
	pub fn deregister(&mut self, form_id: &str, prefix: &str) -> bool {
		let Some(list) = self.prefixes.get_mut(form_id) else {
			return false;
		};
		match list.iter().position(|p| p == prefix) {
			Some(index) => {
				list.remove(index);
				true
			}
			None => false,
		}
	}

	/// Registered prefixes of a form, in registration order
	pub fn prefixes(&self, form_id: &str) -> &[String] {
		self.prefixes.get(form_id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Split `entries` into subform groups and top-level entries
	pub fn group<'a, V, I>(&self, form_id: &str, entries: I) -> Grouped<V>
	where
		V: Clone + 'a,
		I: IntoIterator<Item = (&'a String, &'a V)>,
	{
		let mut remaining: Vec<(&String, &V)> = entries.into_iter().collect();
		let mut grouped = Grouped::default();

		for prefix in self.prefixes(form_id) {
			let mut claimed = BTreeMap::new();
			remaining.retain(|(key, value)| match FieldKey::strip(prefix, key) {
				Some(field) => {
					claimed.insert(field.name, (*value).clone());
					false
				}
				None => true,
			});
			// A repeated prefix finds nothing left to claim and must not
			// overwrite the first group
			grouped.groups.entry(prefix.clone()).or_insert(claimed);
		}

		grouped.fields = remaining
			.into_iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();
		grouped
	}
}

/// Output of [`SubFormRegistry::group`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grouped<V> {
	pub groups: BTreeMap<String, BTreeMap<String, V>>,
	pub fields: BTreeMap<String, V>,
}

impl<V> Default for Grouped<V> {
	fn default() -> Self {
		Self {
			groups: BTreeMap::new(),
			fields: BTreeMap::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn entries(keys: &[&str]) -> BTreeMap<String, u32> {
		keys.iter()
			.enumerate()
			.map(|(i, k)| (k.to_string(), i as u32))
			.collect()
	}

	#[rstest]
	fn test_duplicate_registration_is_kept() {
		let mut registry = SubFormRegistry::new();
		registry.register("f", "addr");
		registry.register("f", "addr");
		assert_eq!(registry.prefixes("f").len(), 2);

		assert!(registry.deregister("f", "addr"));
		assert_eq!(registry.prefixes("f"), ["addr".to_string()]);
	}

	#[rstest]
	fn test_deregister_unknown_is_noop() {
		let mut registry = SubFormRegistry::new();
		assert!(!registry.deregister("f", "addr"));
		registry.register("f", "addr");
		assert!(!registry.deregister("f", "other"));
	}

	#[rstest]
	fn test_group_splits_prefixed_keys() {
		let mut registry = SubFormRegistry::new();
		registry.register("f", "addr");
		let data = entries(&["addr__city", "addr__zip", "name"]);

		let grouped = registry.group("f", &data);
		assert_eq!(grouped.groups["addr"].len(), 2);
		assert!(grouped.groups["addr"].contains_key("city"));
		assert_eq!(grouped.fields.keys().collect::<Vec<_>>(), vec!["name"]);
	}

	#[rstest]
	fn test_first_registered_prefix_claims_first() {
		let mut registry = SubFormRegistry::new();
		registry.register("f", "a");
		registry.register("f", "a__b");
		let data = entries(&["a__b__c"]);

		let grouped = registry.group("f", &data);
		assert!(grouped.groups["a"].contains_key("b__c"));
		assert!(grouped.groups["a__b"].is_empty());
	}

	#[rstest]
	fn test_group_without_registrations_is_flat() {
		let registry = SubFormRegistry::new();
		let data = entries(&["addr__city"]);
		let grouped = registry.group("f", &data);
		assert!(grouped.groups.is_empty());
		assert!(grouped.fields.contains_key("addr__city"));
	}
}
