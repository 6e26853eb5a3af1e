//! Provider settings
//!
//! Settings are loaded once and injected into the provider. Every field is
//! optional in the TOML source and falls back to [`FormSettings::default`].
//!
//! ```toml
//! default_input_delay_ms = 150
//! combo_hide_delay_ms = 100
//! combo_rerender_delay_ms = 250
//! warn_nested_subform = true
//! ```

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and diagnostics settings shared by every binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormSettings {
	/// Debounce delay of input commits; 0 commits immediately
	pub default_input_delay_ms: u64,
	/// Delay between a combo box losing focus and its dropdown closing
	pub combo_hide_delay_ms: u64,
	/// Delay before re-evaluating the dropdown after unmatched typing
	pub combo_rerender_delay_ms: u64,
	/// Log a warning when a subform is mounted inside another subform
	pub warn_nested_subform: bool,
}

impl Default for FormSettings {
	fn default() -> Self {
		Self {
			default_input_delay_ms: 0,
			combo_hide_delay_ms: 100,
			combo_rerender_delay_ms: 250,
			warn_nested_subform: true,
		}
	}
}

impl FormSettings {
	/// Parse settings from a TOML string.
	///
	/// # Errors
	///
	/// Returns [`FormError::InvalidSettings`] on malformed TOML or unknown keys.
	pub fn from_toml_str(content: &str) -> FormResult<Self> {
		toml::from_str(content).map_err(|e| FormError::InvalidSettings(e.to_string()))
	}

	/// Commit delay of inputs that set none themselves
	pub fn with_input_delay(mut self, delay: Duration) -> Self {
		self.default_input_delay_ms = millis(delay);
		self
	}

	/// Time a blurred combo box keeps its dropdown open
	pub fn with_combo_hide_delay(mut self, delay: Duration) -> Self {
		self.combo_hide_delay_ms = millis(delay);
		self
	}

	/// Debounce of dropdown re-renders while typing
	pub fn with_combo_rerender_delay(mut self, delay: Duration) -> Self {
		self.combo_rerender_delay_ms = millis(delay);
		self
	}

	pub fn input_delay(&self) -> Duration {
		Duration::from_millis(self.default_input_delay_ms)
	}

	pub fn combo_hide_delay(&self) -> Duration {
		Duration::from_millis(self.combo_hide_delay_ms)
	}

	pub fn combo_rerender_delay(&self) -> Duration {
		Duration::from_millis(self.combo_rerender_delay_ms)
	}
}

fn millis(delay: Duration) -> u64 {
	u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
