//! Element bindings
//!
//! Inputs, combo boxes, subforms and the presets for common input kinds.

#[cfg(feature = "bind")]
pub use formstate_bind::*;
