//! Deep structural equality for field values
//!
//! Comparison rules:
//!
//! - `NaN` equals `NaN` and `+0.0` does not equal `-0.0`. An integer
//!   equals a float only when the float is integral and converts back to
//!   exactly that integer.
//! - Dates compare by instant.
//! - Arrays compare element-wise in order. Sets and maps ignore order.
//! - Records compare key sets and then values.
//! - [`FieldValue::Shared`] cells are followed. Every pair of cells entered
//!   is recorded, so comparing two cyclic graphs terminates.

use crate::value::FieldValue;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

type CellPtr = *const RefCell<FieldValue>;

/// Compare two values structurally
pub fn is_equal(a: &FieldValue, b: &FieldValue) -> bool {
	equal_inner(a, b, &mut HashSet::new())
}

/// Compare two optional values, `None` only equals `None`
pub fn is_equal_opt(a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
	match (a, b) {
		(None, None) => true,
		(Some(a), Some(b)) => is_equal(a, b),
		_ => false,
	}
}

fn same_number(a: f64, b: f64) -> bool {
	if a.is_nan() && b.is_nan() {
		return true;
	}
	a == b && a.is_sign_negative() == b.is_sign_negative()
}

/// Exact: the float must be integral, in range and convert back to `int`
fn int_equals_float(int: i64, float: f64) -> bool {
	// 2^63, the first float above i64::MAX; -2^63 is exact
	const LIMIT: f64 = 9_223_372_036_854_775_808.0;
	if float.fract() != 0.0 || float < -LIMIT || float >= LIMIT {
		return false;
	}
	if float == 0.0 && float.is_sign_negative() {
		return false;
	}
	float as i64 == int
}

fn equal_inner(a: &FieldValue, b: &FieldValue, seen: &mut HashSet<(CellPtr, CellPtr)>) -> bool {
	use FieldValue::*;

	match (a, b) {
		(Shared(x), Shared(y)) => {
			if Rc::ptr_eq(x, y) {
				return true;
			}
			let pair = (Rc::as_ptr(x), Rc::as_ptr(y));
			if !seen.insert(pair) {
				// Already comparing this pair further up the stack
				return true;
			}
			equal_inner(&x.borrow(), &y.borrow(), seen)
		}
		(Shared(x), other) => equal_inner(&x.borrow(), other, seen),
		(other, Shared(y)) => equal_inner(other, &y.borrow(), seen),

		(Null, Null) => true,
		(Bool(x), Bool(y)) => x == y,
		(Int(x), Int(y)) => x == y,
		(Float(x), Float(y)) => same_number(*x, *y),
		(Int(x), Float(y)) | (Float(y), Int(x)) => int_equals_float(*x, *y),
		(Text(x), Text(y)) => x == y,
		(Date(x), Date(y)) => x == y,
		(Files(x), Files(y)) => x == y,

		(Array(x), Array(y)) => {
			x.len() == y.len() && x.iter().zip(y).all(|(l, r)| equal_inner(l, r, seen))
		}
		(Set(x), Set(y)) => {
			x.len() == y.len()
				&& x.iter()
					.all(|l| y.iter().any(|r| equal_inner(l, r, seen)))
		}
		(Map(x), Map(y)) => {
			x.len() == y.len()
				&& x.iter().all(|(lk, lv)| {
					y.iter()
						.find(|(rk, _)| equal_inner(lk, rk, seen))
						.is_some_and(|(_, rv)| equal_inner(lv, rv, seen))
				})
		}
		(Record(x), Record(y)) => {
			x.len() == y.len()
				&& x.iter().all(|(key, lv)| {
					y.get(key)
						.is_some_and(|rv| equal_inner(lv, rv, seen))
				})
		}

		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::FileEntry;
	use chrono::NaiveDate;
	use proptest::prelude::*;
	use rstest::rstest;

	fn cyclic(label: &str) -> FieldValue {
		let cell = Rc::new(RefCell::new(FieldValue::Null));
		let node = FieldValue::Shared(cell.clone());
		*cell.borrow_mut() = FieldValue::record([
			("label", FieldValue::from(label)),
			("next", node.clone()),
		]);
		node
	}

	#[rstest]
	#[case(FieldValue::Float(f64::NAN), FieldValue::Float(f64::NAN), true)]
	#[case(FieldValue::Float(0.0), FieldValue::Float(-0.0), false)]
	#[case(FieldValue::Int(3), FieldValue::Float(3.0), true)]
	#[case(FieldValue::Int(3), FieldValue::Float(3.5), false)]
	#[case(FieldValue::Int(0), FieldValue::Float(-0.0), false)]
	#[case(FieldValue::Int((1 << 53) + 1), FieldValue::Float(((1_i64 << 53) + 1) as f64), false)]
	#[case(FieldValue::Int(1 << 53), FieldValue::Float((1_i64 << 53) as f64), true)]
	#[case(FieldValue::Int(i64::MAX), FieldValue::Float(i64::MAX as f64), false)]
	#[case(FieldValue::Int(i64::MIN), FieldValue::Float(i64::MIN as f64), true)]
	#[case(FieldValue::Int(0), FieldValue::Float(f64::NAN), false)]
	#[case(FieldValue::Int(3), FieldValue::Text("3".into()), false)]
	#[case(FieldValue::Null, FieldValue::Null, true)]
	fn test_primitive_equality(#[case] a: FieldValue, #[case] b: FieldValue, #[case] expected: bool) {
		assert_eq!(is_equal(&a, &b), expected);
	}

	#[rstest]
	fn test_dates_compare_by_instant() {
		let a = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
		let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
		let c = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
		assert!(is_equal(&a.into(), &b.into()));
		assert!(!is_equal(&a.into(), &c.into()));
	}

	#[rstest]
	fn test_array_order_matters_but_set_order_does_not() {
		let a = vec![FieldValue::Int(1), FieldValue::Int(2)];
		let b = vec![FieldValue::Int(2), FieldValue::Int(1)];
		assert!(!is_equal(&FieldValue::Array(a.clone()), &FieldValue::Array(b.clone())));
		assert!(is_equal(&FieldValue::Set(a), &FieldValue::Set(b)));
	}

	#[rstest]
	fn test_map_is_keyed_and_unordered() {
		let a = FieldValue::Map(vec![
			(FieldValue::Int(1), "one".into()),
			(FieldValue::Int(2), "two".into()),
		]);
		let b = FieldValue::Map(vec![
			(FieldValue::Int(2), "two".into()),
			(FieldValue::Int(1), "one".into()),
		]);
		let c = FieldValue::Map(vec![
			(FieldValue::Int(2), "two".into()),
			(FieldValue::Int(1), "uno".into()),
		]);
		assert!(is_equal(&a, &b));
		assert!(!is_equal(&a, &c));
	}

	#[rstest]
	fn test_records_need_identical_key_sets() {
		let a = FieldValue::record([("id", FieldValue::Int(2))]);
		let b = FieldValue::record([("id", FieldValue::Int(2)), ("x", FieldValue::Null)]);
		assert!(!is_equal(&a, &b));
		assert!(is_equal(&a, &FieldValue::record([("id", FieldValue::Int(2))])));
	}

	#[rstest]
	fn test_variant_mismatch_is_unequal() {
		let arr = FieldValue::Array(vec![]);
		let set = FieldValue::Set(vec![]);
		assert!(!is_equal(&arr, &set));
	}

	#[rstest]
	fn test_files_compare_entries() {
		let a = FieldValue::Files(vec![FileEntry::new("a.txt", 3, "text/plain")]);
		let b = FieldValue::Files(vec![FileEntry::new("a.txt", 3, "text/plain")]);
		let c = FieldValue::Files(vec![FileEntry::new("b.txt", 3, "text/plain")]);
		assert!(is_equal(&a, &b));
		assert!(!is_equal(&a, &c));
	}

	#[rstest]
	fn test_cyclic_graphs_terminate() {
		assert!(is_equal(&cyclic("a"), &cyclic("a")));
		assert!(!is_equal(&cyclic("a"), &cyclic("b")));
	}

	#[rstest]
	fn test_shared_cell_equals_its_content() {
		let plain = FieldValue::record([("id", FieldValue::Int(1))]);
		let shared = FieldValue::shared(plain.clone());
		assert!(is_equal(&shared, &plain));
		assert!(is_equal(&plain, &shared));
	}

	#[rstest]
	fn test_optional_comparison() {
		assert!(is_equal_opt(None, None));
		assert!(!is_equal_opt(Some(&FieldValue::Null), None));
	}

	fn leaf() -> impl Strategy<Value = FieldValue> {
		prop_oneof![
			any::<bool>().prop_map(FieldValue::Bool),
			any::<i64>().prop_map(FieldValue::Int),
			"[a-z]{0,6}".prop_map(FieldValue::Text),
		]
	}

	fn tree() -> impl Strategy<Value = FieldValue> {
		leaf().prop_recursive(3, 24, 4, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..4).prop_map(FieldValue::Array),
				prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
					.prop_map(FieldValue::Record),
			]
		})
	}

	proptest! {
		#[test]
		fn prop_equality_is_reflexive(value in tree()) {
			prop_assert!(is_equal(&value, &value.clone()));
		}

		#[test]
		fn prop_equality_is_symmetric(a in tree(), b in tree()) {
			prop_assert_eq!(is_equal(&a, &b), is_equal(&b, &a));
		}

		#[test]
		fn prop_sharing_is_transparent(value in tree()) {
			prop_assert!(is_equal(&FieldValue::shared(value.clone()), &value));
		}
	}
}
