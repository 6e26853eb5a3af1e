//! Input element seam
//!
//! Bindings only need to read and write the text an element displays. A
//! host wraps its native input (a DOM node, a terminal text field) in an
//! [`InputElement`]; [`TextInput`] is the in-memory element used by
//! headless hosts and tests.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Text shown by an element that has never received a value
pub const EMPTY_TEXT: &str = "";

/// Uncontrolled text-bearing input
pub trait InputElement {
	/// Text currently displayed
	fn value(&self) -> String;

	/// Replace the displayed text without raising a change event
	fn set_value(&self, value: &str);
}

/// Shared handle to an element
pub type ElementRef = Rc<dyn InputElement>;

/// In-memory input element
///
/// Clones share the same text.
#[derive(Clone, Default)]
pub struct TextInput {
	value: Rc<RefCell<String>>,
}

impl TextInput {
	/// Element showing the empty text
	pub fn new() -> Self {
		Self::default()
	}

	/// Element already showing `value`
	pub fn with_value(value: impl Into<String>) -> Self {
		Self {
			value: Rc::new(RefCell::new(value.into())),
		}
	}

	/// Shared handle for a binding
	pub fn element_ref(&self) -> ElementRef {
		Rc::new(self.clone())
	}
}

impl InputElement for TextInput {
	fn value(&self) -> String {
		self.value.borrow().clone()
	}

	fn set_value(&self, value: &str) {
		value.clone_into(&mut self.value.borrow_mut());
	}
}

impl fmt::Debug for TextInput {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TextInput").field(&*self.value.borrow()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_clones_share_text() {
		let input = TextInput::new();
		let element = input.element_ref();
		element.set_value("abc");
		assert_eq!(input.value(), "abc");
	}
}
