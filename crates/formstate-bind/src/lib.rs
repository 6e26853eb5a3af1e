//! Formstate Bind - element bindings for the form store
//!
//! This crate connects input elements to a [`formstate_core::FormStore`]:
//! - [`FormProvider`] and [`FormScope`] carry the store, timers and settings
//!   down to the bindings
//! - [`Form`] and [`SubForm`] mount forms and prefixed field groups
//! - [`GeneralInput`] keeps one text element and one field in agreement
//! - [`ComboBox`] and [`MultiComboBox`] bind option lists
//! - [`presets`] holds ready-made options for common input kinds

pub mod combo_box;
pub mod context;
pub mod element;
pub mod form;
pub mod input;
pub mod multi_combo_box;
pub mod presets;
pub mod subform;

pub use combo_box::{ComboBox, ComboOption, ComboOptions, ComboView, OptionView};
pub use context::{FormProvider, FormScope};
pub use element::{ElementRef, InputElement, TextInput};
pub use form::Form;
pub use input::{GeneralInput, InputOptions};
pub use multi_combo_box::{MultiComboBox, MultiComboOptions};
pub use subform::SubForm;
