//! # Formstate
//!
//! A form-state store plus a field sync engine.
//!
//! The store keeps the canonical value, validity and declared properties of
//! every field of every form. Bindings keep uncontrolled input elements and
//! store fields in agreement while the user types, other code writes to the
//! store and debounced commits land.
//!
//! ## Feature Flags
//!
//! - `core` - store, validation engine, handles and settings
//! - `bind` - element bindings: inputs, combo boxes, subforms, presets
//! - `full` (default) - everything
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "bind")]
//! # {
//! use formstate::prelude::*;
//! use std::rc::Rc;
//!
//! let provider = FormProvider::new(Rc::new(EventLoop::new()));
//! let form = Form::mount(&provider, "signup");
//! let element = TextInput::new();
//! let email = GeneralInput::mount(form.scope(), "email", element.element_ref(), presets::text());
//!
//! email.on_change("ana@example.com");
//! assert!(form.submit(None, |data| assert!(data.contains_key("email"))));
//! # }
//! ```

#[cfg(feature = "bind")]
pub mod bind;
#[cfg(feature = "core")]
pub mod core;

/// Common imports
pub mod prelude {
	#[cfg(feature = "core")]
	pub use crate::core::{
		EventLoop, FieldProperties, FieldUpdate, FieldValue, FormEntry, FormHandle, FormSettings,
		FormStore, FormValue, Required, Verdict,
	};

	#[cfg(feature = "bind")]
	pub use crate::bind::{
		ComboBox, ComboOption, ComboOptions, Form, FormProvider, FormScope, GeneralInput,
		InputElement, InputOptions, MultiComboBox, MultiComboOptions, SubForm, TextInput, presets,
	};
}
