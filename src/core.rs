//! Form store, validation and handles
//!
//! # Examples
//!
//! ```rust
//! # #[cfg(feature = "core")]
//! # {
//! use formstate::core::{FieldUpdate, FormStore};
//!
//! let store = FormStore::new();
//! store.update_field("login", "user", FieldUpdate::value("ana"));
//! assert!(store.has_form("login"));
//! # }
//! ```

#[cfg(feature = "core")]
pub use formstate_core::*;
