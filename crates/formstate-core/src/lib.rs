//! Formstate Core - form state store and validation
//!
//! The store half of formstate. It owns the canonical state of every form and
//! knows nothing about input elements; the binding layer in
//! `formstate-bind` talks to it through the operations exposed here.
//!
//! ## Modules
//!
//! - [`value`]: field value model and typed conversions
//! - [`equality`]: cycle-safe deep equality
//! - [`debounce`]: scheduler seam, virtual-time event loop, debounced calls
//! - [`key`]: subform-scoped field keys
//! - [`field`]: field state and declared properties
//! - [`validation`]: validation engine
//! - [`subform`]: subform registry
//! - [`store`]: the form store
//! - [`handle`]: form- and field-scoped handles
//! - [`settings`]: provider settings

pub mod debounce;
pub mod equality;
pub mod error;
pub mod field;
pub mod handle;
pub mod key;
pub mod settings;
pub mod store;
pub mod subform;
pub mod validation;
pub mod value;

pub use debounce::{Debounce, EventLoop, Scheduler, TimerId};
pub use equality::{is_equal, is_equal_opt};
pub use error::{FormError, FormResult};
pub use field::{FieldMap, FieldProperties, FieldState, PropertyMap, Required, Verdict};
pub use handle::{FieldHandle, FieldSnapshot, FormHandle};
pub use key::{FieldKey, SUBFORM_SEPARATOR};
pub use settings::FormSettings;
pub use store::{
	FieldUpdate, FormEntry, FormStore, FormValues, FormsData, Snapshot, Subscription, ValueUpdate,
};
pub use subform::SubFormRegistry;
pub use validation::{ValidationReport, validate_fields};
pub use value::{FieldValue, FileEntry, FormValue};
