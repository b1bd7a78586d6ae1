use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{ListValue, Value},
};

/// A subscript as evaluated by the statement interpreter: `[i]` when
/// `is_slice` is false, `[start:stop:step]` otherwise. Omitted components are
/// `None` (a `Null` component is treated the same way).
#[derive(Clone, Debug, Default)]
pub struct SliceIndex {
    pub start: Option<Value>,
    pub stop: Option<Value>,
    pub step: Option<Value>,
    pub is_slice: bool,
}

impl SliceIndex {
    pub fn index(key: Value) -> Self {
        Self {
            start: Some(key),
            ..Self::default()
        }
    }

    pub fn slice(start: Option<Value>, stop: Option<Value>, step: Option<Value>) -> Self {
        Self {
            start,
            stop,
            step,
            is_slice: true,
        }
    }

    /// Integer-only shorthand for `[start:stop:step]`.
    pub fn range(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self::slice(
            start.map(Value::Int),
            stop.map(Value::Int),
            step.map(Value::Int),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bounds {
    start: i64,
    stop: i64,
    step: i64,
}

fn component(
    value: &Option<Value>,
    default: i64,
    what: &str,
    span: &Span,
) -> RuntimeResult<i64> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Int(v)) => Ok(*v),
        Some(other) => Err(RuntimeError::index(
            span,
            format!("slice {what} must be an Integer, found {}", other.type_name()),
        )),
    }
}

fn normalize(len: usize, slice: &SliceIndex, span: &Span) -> RuntimeResult<Bounds> {
    let len = len as i64;
    let mut start = component(&slice.start, 0, "start", span)?;
    let mut stop = component(&slice.stop, len, "stop", span)?;
    let step = component(&slice.step, 1, "step", span)?;
    if step == 0 {
        return Err(RuntimeError::invalid_operation(span, "slice step cannot be zero"));
    }
    if start < 0 {
        start = start.saturating_add(len).max(0);
    }
    if stop < 0 {
        stop = stop.saturating_add(len);
    } else if stop > len {
        stop = len;
    }
    if step < 0 && stop == len {
        stop = -1;
    }
    Ok(Bounds { start, stop, step })
}

/// Positions visited by a slice, in visiting order. Stops at the first
/// position that falls outside the sequence.
fn progression(bounds: Bounds, len: usize) -> Vec<usize> {
    let len = len as i64;
    let mut positions = Vec::new();
    if bounds.step > 0 {
        let mut i = bounds.start;
        while i < bounds.stop && i < len {
            positions.push(i as usize);
            match i.checked_add(bounds.step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let mut i = if bounds.start == 0 { len - 1 } else { bounds.start };
        while i > bounds.stop && (0..len).contains(&i) {
            positions.push(i as usize);
            match i.checked_add(bounds.step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    positions
}

fn single_position(len: usize, key: &Option<Value>, span: &Span) -> RuntimeResult<usize> {
    let raw = match key {
        Some(Value::Int(v)) => *v,
        Some(other) => {
            return Err(RuntimeError::index(
                span,
                format!("index must be an Integer, found {}", other.type_name()),
            ));
        }
        None => return Err(RuntimeError::index(span, "missing index")),
    };
    let idx = if raw < 0 { raw.saturating_add(len as i64) } else { raw };
    if idx < 0 || idx >= len as i64 {
        return Err(RuntimeError::range(
            span,
            format!("index {raw} is out of range for length {len}"),
        ));
    }
    Ok(idx as usize)
}

fn select<T: Clone>(items: &[T], slice: &SliceIndex, span: &Span) -> RuntimeResult<Vec<T>> {
    let bounds = normalize(items.len(), slice, span)?;
    Ok(progression(bounds, items.len())
        .into_iter()
        .map(|i| items[i].clone())
        .collect())
}

pub fn read_slice(list: &ListValue, slice: &SliceIndex, span: &Span) -> RuntimeResult<Value> {
    let items = list.items.borrow();
    if !slice.is_slice {
        let idx = single_position(items.len(), &slice.start, span)?;
        return Ok(items[idx].clone());
    }
    Ok(Value::list(select(&items, slice, span)?))
}

/// Assigns through a subscript. A single index overwrites one element, or
/// inserts before it when `insert_mode` is set. Slices with step 1 splice;
/// strided slices overwrite pairwise until either side runs out.
pub fn write_slice(
    list: &ListValue,
    slice: &SliceIndex,
    rhs: &Value,
    insert_mode: bool,
    span: &Span,
) -> RuntimeResult<()> {
    if !slice.is_slice {
        return write_single(list, slice, rhs.clone(), insert_mode, span);
    }
    let values = match rhs {
        Value::List(other) => other.snapshot(),
        other => vec![other.clone()],
    };
    let mut items = list.items.borrow_mut();
    let len = items.len();
    let bounds = normalize(len, slice, span)?;
    if bounds.step == 1 {
        let start = bounds.start.min(len as i64) as usize;
        let stop = bounds.stop.clamp(0, len as i64) as usize;
        // a non-empty range is replaced, not overwritten element by element:
        // `[0, 1, 2, 3, 4][1:3] = [9]` leaves `[0, 9, 3, 4]`
        if start >= stop {
            items.splice(start..start, values);
        } else {
            items.splice(start..stop, values);
        }
        return Ok(());
    }
    for (position, value) in progression(bounds, len).into_iter().zip(values) {
        items[position] = value;
    }
    Ok(())
}

/// One-element write. The right-hand Value is stored as a single element even
/// when it is a List, so inserting `[7]` at 1 gives `[9, [7], 1, ...]`; slice
/// writes are the form that spreads a List's elements.
fn write_single(
    list: &ListValue,
    slice: &SliceIndex,
    value: Value,
    insert_mode: bool,
    span: &Span,
) -> RuntimeResult<()> {
    let mut items = list.items.borrow_mut();
    let len = items.len();
    if insert_mode {
        // inserting at `len` appends
        let raw = component(&slice.start, 0, "index", span)?;
        let idx = if raw < 0 { raw.saturating_add(len as i64) } else { raw };
        if idx < 0 || idx > len as i64 {
            return Err(RuntimeError::range(
                span,
                format!("insert position {raw} is out of range for length {len}"),
            ));
        }
        items.insert(idx as usize, value);
    } else {
        let idx = single_position(len, &slice.start, span)?;
        items[idx] = value;
    }
    Ok(())
}

/// Subscript read for any indexable Value: lists, maps (missing keys read as
/// `Null`) and strings (by character).
pub fn read_indexed(container: &Value, slice: &SliceIndex, span: &Span) -> RuntimeResult<Value> {
    match container {
        Value::List(list) => read_slice(list, slice, span),
        Value::Map(map) if !slice.is_slice => {
            let key = slice.start.clone().unwrap_or(Value::Null);
            Ok(map.get(&key).unwrap_or(Value::Null))
        }
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            if slice.is_slice {
                Ok(Value::String(select(&chars, slice, span)?.into_iter().collect()))
            } else {
                let idx = single_position(chars.len(), &slice.start, span)?;
                Ok(Value::String(chars[idx].to_string()))
            }
        }
        other => Err(RuntimeError::invalid_operation(
            span,
            format!(
                "cannot {} a value of type {}",
                if slice.is_slice { "slice" } else { "index" },
                other.type_name()
            ),
        )),
    }
}

pub fn write_indexed(
    container: &Value,
    slice: &SliceIndex,
    rhs: Value,
    insert_mode: bool,
    span: &Span,
) -> RuntimeResult<()> {
    match container {
        Value::List(list) => write_slice(list, slice, &rhs, insert_mode, span),
        Value::Map(map) if !slice.is_slice => {
            let key = slice.start.clone().unwrap_or(Value::Null);
            map.insert(key, rhs);
            Ok(())
        }
        other => Err(RuntimeError::invalid_operation(
            span,
            format!("cannot assign into a value of type {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::MapValue;

    fn span() -> Span {
        Span::new("slice.kiwi", 1, 1)
    }

    fn sample() -> ListValue {
        ListValue::from_vec((0..5).map(Value::Int).collect())
    }

    fn read(list: &ListValue, slice: SliceIndex) -> String {
        read_slice(list, &slice, &span()).expect("read").to_string()
    }

    fn write(list: &ListValue, slice: SliceIndex, rhs: Value, insert: bool) {
        write_slice(list, &slice, &rhs, insert, &span()).expect("write");
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn forward_reads() {
        let list = sample();
        assert_eq!(read(&list, SliceIndex::range(Some(1), Some(4), None)), "[1, 2, 3]");
        assert_eq!(read(&list, SliceIndex::range(Some(-2), None, None)), "[3, 4]");
        assert_eq!(read(&list, SliceIndex::range(None, None, Some(2))), "[0, 2, 4]");
        assert_eq!(read(&list, SliceIndex::range(Some(-9), Some(2), None)), "[0, 1]");
        assert_eq!(read(&list, SliceIndex::range(Some(2), Some(99), None)), "[2, 3, 4]");
        assert_eq!(read(&list, SliceIndex::range(Some(4), Some(1), None)), "[]");
    }

    #[test]
    fn reverse_reads() {
        let list = sample();
        assert_eq!(
            read(&list, SliceIndex::range(None, None, Some(-1))),
            "[4, 3, 2, 1, 0]"
        );
        assert_eq!(read(&list, SliceIndex::range(Some(3), Some(0), Some(-1))), "[3, 2, 1]");
        assert_eq!(read(&list, SliceIndex::range(None, None, Some(-2))), "[4, 2, 0]");
        // a start of zero begins from the last element when stepping backwards
        assert_eq!(
            read(&list, SliceIndex::range(Some(0), None, Some(-1))),
            "[4, 3, 2, 1, 0]"
        );
        assert_eq!(read(&list, SliceIndex::range(Some(9), None, Some(-1))), "[]");
    }

    #[test]
    fn extreme_steps_and_bounds_stay_in_range() {
        let list = sample();
        assert_eq!(read(&list, SliceIndex::range(Some(1), None, Some(i64::MAX))), "[1]");
        assert_eq!(read(&list, SliceIndex::range(None, None, Some(i64::MIN + 1))), "[4]");
        assert_eq!(
            read(&list, SliceIndex::range(Some(i64::MIN), Some(i64::MAX), None)),
            "[0, 1, 2, 3, 4]"
        );
        assert_eq!(read(&list, SliceIndex::range(None, Some(i64::MIN), None)), "[]");
        let err = read_slice(&list, &SliceIndex::index(Value::Int(i64::MIN)), &span())
            .expect_err("far negative index");
        assert!(matches!(err, RuntimeError::Range { .. }));

        write(&list, SliceIndex::range(Some(3), None, Some(i64::MAX)), ints(&[7, 8]), false);
        assert_eq!(Value::List(list).to_string(), "[0, 1, 2, 7, 4]");
    }

    #[test]
    fn single_index_reads() {
        let list = sample();
        assert!(matches!(
            read_slice(&list, &SliceIndex::index(Value::Int(-1)), &span()),
            Ok(Value::Int(4))
        ));
        let err = read_slice(&list, &SliceIndex::index(Value::Int(5)), &span())
            .expect_err("past the end");
        assert!(matches!(err, RuntimeError::Range { .. }));
        let err = read_slice(&list, &SliceIndex::index(Value::string("0")), &span())
            .expect_err("string index");
        assert!(matches!(err, RuntimeError::Index { .. }));
    }

    #[test]
    fn non_integer_components_are_index_errors() {
        let list = sample();
        let slice = SliceIndex::slice(Some(Value::Float(1.0)), None, None);
        let err = read_slice(&list, &slice, &span()).expect_err("float start");
        assert!(matches!(err, RuntimeError::Index { .. }));
        let err = write_slice(&list, &slice, &ints(&[1]), false, &span()).expect_err("write");
        assert!(matches!(err, RuntimeError::Index { .. }));
        let zero = SliceIndex::range(None, None, Some(0));
        let err = read_slice(&list, &zero, &span()).expect_err("zero step");
        assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
    }

    #[test]
    fn splice_writes() {
        let list = sample();
        write(&list, SliceIndex::range(Some(1), Some(3), None), ints(&[9]), false);
        assert_eq!(Value::List(list.clone()).to_string(), "[0, 9, 3, 4]");

        let list = sample();
        write(&list, SliceIndex::range(Some(1), Some(3), None), ints(&[7, 8]), false);
        assert_eq!(Value::List(list.clone()).to_string(), "[0, 7, 8, 3, 4]");

        let list = sample();
        write(&list, SliceIndex::range(Some(2), Some(2), None), ints(&[5, 6]), false);
        assert_eq!(Value::List(list.clone()).to_string(), "[0, 1, 5, 6, 2, 3, 4]");

        let list = sample();
        write(&list, SliceIndex::range(None, None, None), Value::Int(1), false);
        assert_eq!(Value::List(list).to_string(), "[1]");
    }

    #[test]
    fn single_index_writes_and_inserts() {
        let list = sample();
        write(&list, SliceIndex::index(Value::Int(0)), Value::Int(9), false);
        assert_eq!(Value::List(list.clone()).to_string(), "[9, 1, 2, 3, 4]");

        write(&list, SliceIndex::index(Value::Int(1)), ints(&[7]), true);
        assert_eq!(Value::List(list.clone()).to_string(), "[9, [7], 1, 2, 3, 4]");

        write(&list, SliceIndex::index(Value::Int(6)), Value::Int(5), true);
        assert_eq!(list.len(), 7);

        let err = write_slice(&list, &SliceIndex::index(Value::Int(7)), &Value::Null, false, &span())
            .expect_err("out of range");
        assert!(matches!(err, RuntimeError::Range { .. }));
    }

    #[test]
    fn strided_writes_stop_when_either_side_runs_out() {
        let list = sample();
        write(&list, SliceIndex::range(None, None, Some(2)), ints(&[7, 8, 9, 10]), false);
        assert_eq!(Value::List(list).to_string(), "[7, 1, 8, 3, 9]");

        let list = sample();
        write(&list, SliceIndex::range(None, None, Some(2)), ints(&[7]), false);
        assert_eq!(Value::List(list).to_string(), "[7, 1, 2, 3, 4]");

        let list = sample();
        write(&list, SliceIndex::range(None, None, Some(-1)), ints(&[0, 1]), false);
        assert_eq!(Value::List(list).to_string(), "[0, 1, 2, 1, 0]");
    }

    #[test]
    fn writing_a_list_into_itself_uses_a_snapshot() {
        let list = sample();
        let rhs = Value::List(list.clone());
        write(&list, SliceIndex::range(Some(0), Some(1), None), rhs, false);
        assert_eq!(
            Value::List(list).to_string(),
            "[0, 1, 2, 3, 4, 1, 2, 3, 4]"
        );
    }

    #[test]
    fn maps_and_strings_index() {
        let map = MapValue::new();
        let container = Value::Map(map.clone());
        write_indexed(&container, &SliceIndex::index(Value::string("a")), Value::Int(1), false, &span())
            .expect("insert");
        assert!(matches!(
            read_indexed(&container, &SliceIndex::index(Value::string("a")), &span()),
            Ok(Value::Int(1))
        ));
        assert!(matches!(
            read_indexed(&container, &SliceIndex::index(Value::string("b")), &span()),
            Ok(Value::Null)
        ));

        let text = Value::string("kiwi!");
        assert_eq!(
            read_indexed(&text, &SliceIndex::index(Value::Int(-1)), &span())
                .expect("char")
                .to_string(),
            "!"
        );
        assert_eq!(
            read_indexed(&text, &SliceIndex::range(None, None, Some(-1)), &span())
                .expect("reverse")
                .to_string(),
            "!iwik"
        );
        let err = write_indexed(&text, &SliceIndex::index(Value::Int(0)), Value::Null, false, &span())
            .expect_err("strings are immutable");
        assert!(matches!(err, RuntimeError::InvalidOperation { .. }));
    }
}
