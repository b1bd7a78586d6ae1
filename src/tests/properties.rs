use crate::language::{span::Span, token::BinaryOp};
use crate::runtime::{
    operators::apply_binary,
    slice::{read_indexed, write_indexed, SliceIndex},
    value::Value,
};
use proptest::prelude::*;

fn numeric() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000i64..1_000).prop_map(Value::Int),
        (-1_000.0f64..1_000.0).prop_map(Value::Float),
    ]
}

proptest! {
    #[test]
    fn arithmetic_promotes_only_with_a_float(a in numeric(), b in numeric()) {
        let has_float = matches!(a, Value::Float(_)) || matches!(b, Value::Float(_));
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul] {
            let result = apply_binary(op, a.clone(), b.clone(), &Span::unknown()).unwrap();
            if has_float {
                prop_assert!(matches!(result, Value::Float(_)), "{:?} gave {:?}", op, result);
            } else {
                prop_assert!(matches!(result, Value::Int(_)), "{:?} gave {:?}", op, result);
            }
        }
    }

    #[test]
    fn division_by_zero_always_fails(a in numeric(), zero_is_float in any::<bool>()) {
        let zero = if zero_is_float { Value::Float(0.0) } else { Value::Int(0) };
        for op in [BinaryOp::Div, BinaryOp::Rem] {
            let err = apply_binary(op, a.clone(), zero.clone(), &Span::unknown()).unwrap_err();
            prop_assert_eq!(err.kind(), "DivideByZeroError");
        }
    }

    #[test]
    fn slice_reads_do_not_disturb_the_list(
        items in prop::collection::vec(-50i64..50, 0..12),
        start in -15i64..15,
        stop in -15i64..15,
        step in prop_oneof![
            -4i64..=-1,
            1i64..=4,
            Just(i64::MAX),
            Just(i64::MIN + 1),
        ],
    ) {
        let list = Value::list(items.iter().copied().map(Value::Int).collect());
        let before = list.to_string();
        let slice = SliceIndex::range(Some(start), Some(stop), Some(step));
        let first = read_indexed(&list, &slice, &Span::unknown()).unwrap();
        let second = read_indexed(&list, &slice, &Span::unknown()).unwrap();
        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert_eq!(list.to_string(), before);
        if let Value::List(selected) = first {
            prop_assert!(selected.len() <= items.len());
        }
    }

    #[test]
    fn full_forward_slice_copies_every_element(items in prop::collection::vec(-50i64..50, 0..12)) {
        let list = Value::list(items.iter().copied().map(Value::Int).collect());
        let copy = read_indexed(&list, &SliceIndex::range(None, None, None), &Span::unknown()).unwrap();
        prop_assert!(copy.same_as(&list));
        if let (Value::List(copy), Value::List(list)) = (&copy, &list) {
            prop_assert!(!copy.ptr_eq(list));
        }
    }

    #[test]
    fn strided_writes_fill_a_prefix_of_the_stride(
        items in prop::collection::vec(-50i64..50, 0..12),
        stride in 2i64..=4,
        reverse in any::<bool>(),
        rhs in prop::collection::vec(100i64..200, 0..8),
    ) {
        let step = if reverse { -stride } else { stride };
        let list = Value::list(items.iter().copied().map(Value::Int).collect());
        let values = Value::list(rhs.iter().copied().map(Value::Int).collect());
        let slice = SliceIndex::range(None, None, Some(step));
        write_indexed(&list, &slice, values, false, &Span::unknown()).unwrap();

        let len = items.len() as i64;
        let positions: Vec<usize> = if reverse {
            (0..len).rev().step_by(stride as usize).map(|i| i as usize).collect()
        } else {
            (0..len).step_by(stride as usize).map(|i| i as usize).collect()
        };
        let mut expected = items.clone();
        for (position, value) in positions.iter().zip(&rhs) {
            expected[*position] = *value;
        }
        let expected = Value::list(expected.into_iter().map(Value::Int).collect());
        prop_assert_eq!(list.to_string(), expected.to_string());
    }

    #[test]
    fn splice_writes_replace_the_selected_range(
        items in prop::collection::vec(-50i64..50, 0..12),
        start in -15i64..15,
        stop in -15i64..15,
        rhs in prop::collection::vec(100i64..200, 0..6),
    ) {
        let list = Value::list(items.iter().copied().map(Value::Int).collect());
        let values = Value::list(rhs.iter().copied().map(Value::Int).collect());
        let slice = SliceIndex::range(Some(start), Some(stop), None);
        write_indexed(&list, &slice, values, false, &Span::unknown()).unwrap();

        let len = items.len() as i64;
        let from = if start < 0 { (start + len).max(0) } else { start.min(len) };
        let to = if stop < 0 { stop + len } else { stop.min(len) }.clamp(0, len);
        let (from, to) = (from as usize, to as usize);
        let mut expected = items[..from].to_vec();
        expected.extend(&rhs);
        if from < to {
            expected.extend(&items[to..]);
        } else {
            expected.extend(&items[from..]);
        }
        let expected = Value::list(expected.into_iter().map(Value::Int).collect());
        prop_assert_eq!(list.to_string(), expected.to_string());
    }
}
