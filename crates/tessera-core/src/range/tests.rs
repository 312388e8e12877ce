use super::*;
use crate::error::{ErrorClass, ErrorOrigin};

#[test]
fn typed_range_exposes_bounds() {
    let range = Range::new(3_i32, 9).expect("range should build");

    assert_eq!(range.bounds::<i32>(), (3, 9));
    assert_eq!(range.data().len(), 8);
    assert!(!range.unary());
    assert!(!range.is_var());
}

#[test]
fn inverted_and_nan_bounds_are_rejected() {
    let err = Range::new(9_u16, 3).expect_err("inverted bounds should fail");
    assert_eq!(err.class, ErrorClass::Validation);
    assert!(err.message.contains("inverted"));

    let err = Range::new(f64::NAN, 1.0).expect_err("NaN should fail");
    assert!(err.message.contains("NaN"));

    let err = Range::new_var("b", "a").expect_err("inverted strings should fail");
    assert!(err.is_validation());
    assert_eq!(err.origin, ErrorOrigin::Range);
}

#[test]
fn unary_ranges_compare_bytes() {
    assert!(Range::new(5_i64, 5).expect("range").unary());
    assert!(Range::new_var("cat", "cat").expect("range").unary());
    assert!(!Range::new_var("cat", "cats").expect("range").unary());
}

#[test]
fn var_ranges_keep_independent_lengths() {
    let range = Range::new_var("a", "zzz").expect("range should build");

    assert!(range.is_var());
    assert_eq!(range.start_bytes(), b"a");
    assert_eq!(range.end_bytes(), b"zzz");
}

#[test]
fn validate_checks_encoded_width_and_order() {
    let range = Range::new(1_i32, 2).expect("range");
    assert!(range.validate(Datatype::Int32).is_ok());

    let err = range.validate(Datatype::Int64).expect_err("width mismatch");
    assert!(err.message.contains("wrong length"));

    let mut raw = Vec::new();
    5_i32.write_le(&mut raw);
    1_i32.write_le(&mut raw);
    let inverted = Range::from_fixed_bytes(&raw).expect("length is even");
    assert!(inverted.validate(Datatype::Int32).is_err());

    assert!(Range::default().validate(Datatype::Int32).is_err());
    assert!(Range::from_fixed_bytes(&[1, 2, 3]).is_err());
    assert!(Range::from_fixed_bytes(&[]).is_err());

    let var = Range::new_var("a", "b").expect("range");
    assert!(var.validate(Datatype::StringAscii).is_ok());
}

#[test]
fn crop_clamps_into_bounds() {
    let bounds = Range::new(0_u8, 100).expect("bounds");

    let mut range = Range::new(50_u8, 200).expect("range");
    range.crop::<u8>(&bounds);
    assert_eq!(range.bounds::<u8>(), (50, 100));

    let bounds = Range::new_var("b", "m").expect("bounds");
    let mut range = Range::new_var("a", "c").expect("range");
    range.crop_var(&bounds);
    assert_eq!(range.start_bytes(), b"b");
    assert_eq!(range.end_bytes(), b"c");
}

#[test]
fn subset_checks_have_no_side_effects() {
    let outer = Range::new(-5.0_f32, 5.0).expect("outer");
    let inner = Range::new(-1.0_f32, 1.0).expect("inner");
    let before = inner.clone();

    assert!(inner.is_subset::<f32>(&outer));
    assert!(!outer.is_subset::<f32>(&inner));
    assert_eq!(inner, before);

    let outer = Range::new_var("a", "z").expect("outer");
    let inner = Range::new_var("cat", "dog").expect("inner");
    assert!(inner.is_subset_var(&outer));
}

#[test]
fn ndrange_collects_ranges_in_order() {
    let ndrange: NDRange = [Range::new(1_i32, 2).expect("r"), Range::new(3_i32, 4).expect("r")]
        .into_iter()
        .collect();

    assert_eq!(ndrange.len(), 2);
    assert_eq!(ndrange[1].bounds::<i32>(), (3, 4));
}
