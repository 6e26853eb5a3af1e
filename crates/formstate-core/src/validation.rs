//! Form validation engine
//!
//! [`validate_fields`] is a pure function over one form's fields and
//! declared properties. The store applies the resulting [`ValidationReport`]
//! in a single publish.
//!
//! Rules, in order:
//!
//! 1. A form without fields is invalid.
//! 2. A form whose fields declare no properties is valid.
//! 3. For each field with properties, a failed `required` check makes the
//!    field invalid and skips its validator. Otherwise the validator decides,
//!    and a field without a validator is valid.
//!
//! Fields without properties are not evaluated and do not affect the result.

use crate::field::{FieldMap, PropertyMap, Verdict};

/// Verdict for one evaluated field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
	pub name: String,
	pub verdict: Verdict,
}

/// Result of validating one form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
	pub valid: bool,
	/// `true` when the form had no fields at all
	pub empty: bool,
	pub outcomes: Vec<FieldOutcome>,
}

impl ValidationReport {
	pub fn outcome(&self, name: &str) -> Option<&Verdict> {
		self.outcomes
			.iter()
			.find(|o| o.name == name)
			.map(|o| &o.verdict)
	}

	/// Write verdicts back into `fields`
	pub fn apply(&self, fields: &mut FieldMap) {
		for outcome in &self.outcomes {
			let Some(state) = fields.get_mut(&outcome.name) else {
				continue;
			};
			state.set_valid(outcome.verdict.is_valid());
			if !outcome.verdict.is_valid() {
				state.invalid_reason = outcome.verdict.reason().map(str::to_string);
			}
		}
	}
}

/// Evaluate every field that declares properties
pub fn validate_fields(fields: &FieldMap, properties: Option<&PropertyMap>) -> ValidationReport {
	if fields.is_empty() {
		return ValidationReport {
			valid: false,
			empty: true,
			outcomes: Vec::new(),
		};
	}

	let Some(properties) = properties.filter(|p| !p.is_empty()) else {
		return ValidationReport {
			valid: true,
			..Default::default()
		};
	};

	let mut report = ValidationReport {
		valid: true,
		..Default::default()
	};
	for (name, state) in fields {
		let Some(props) = properties.get(name) else {
			continue;
		};
		let value = state.value.as_ref();

		let required_ok = props
			.required
			.as_ref()
			.is_none_or(|required| required.is_satisfied_by(value));

		let verdict = if !required_ok {
			Verdict::Invalid
		} else if let Some(validator) = &props.validator {
			validator(value)
		} else {
			Verdict::Valid
		};

		report.valid &= verdict.is_valid();
		report.outcomes.push(FieldOutcome {
			name: name.clone(),
			verdict,
		});
	}
	report
}
