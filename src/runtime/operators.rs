use crate::language::{
    span::Span,
    token::{AssignOp, BinaryOp, UnaryOp},
};
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{ListValue, Value},
};
use std::cmp::Ordering;

enum NumericPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numeric_pair(left: &Value, right: &Value) -> Option<NumericPair> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(NumericPair::Ints(*a, *b)),
        (Value::Float(a), Value::Float(b)) => Some(NumericPair::Floats(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some(NumericPair::Floats(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some(NumericPair::Floats(*a, *b as f64)),
        _ => None,
    }
}

pub fn apply_binary(op: BinaryOp, left: Value, right: Value, span: &Span) -> RuntimeResult<Value> {
    use BinaryOp::*;
    match op {
        Add => eval_add(left, right, span),
        Sub => eval_sub(left, right, span),
        Mul => eval_mul(left, right, span),
        Div | Rem | Pow => eval_numeric(op, &left, &right, span),
        And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BitAnd | BitOr | BitXor | Shl | Shr => eval_bitwise(op, &left, &right, span),
        Eq => Ok(Value::Bool(left.same_as(&right))),
        NotEq => Ok(Value::Bool(!left.same_as(&right))),
        Lt => eval_compare(op, &left, &right, span, |ord| ord == Ordering::Less),
        LtEq => eval_compare(op, &left, &right, span, |ord| ord != Ordering::Greater),
        Gt => eval_compare(op, &left, &right, span, |ord| ord == Ordering::Greater),
        GtEq => eval_compare(op, &left, &right, span, |ord| ord != Ordering::Less),
    }
}

pub fn apply_unary(op: UnaryOp, operand: Value, span: &Span) -> RuntimeResult<Value> {
    match op {
        UnaryOp::Neg => match operand {
            Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(RuntimeError::conversion(
                span,
                format!("cannot negate a value of type {}", other.type_name()),
            )),
        },
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::BitNot => match operand {
            Value::Int(v) => Ok(Value::Int(!v)),
            Value::Bool(b) => Ok(Value::Int(!(b as i64))),
            Value::Float(f) => Ok(Value::Int(!(f as i64))),
            other => Err(RuntimeError::conversion(
                span,
                format!("`~` expects an Integer, found {}", other.type_name()),
            )),
        },
    }
}

/// Computes the new binding for `name op= rhs`. List-mutating operators act on
/// the shared storage of `current`, so the returned handle is the same list.
pub fn apply_assign(op: AssignOp, current: Value, rhs: Value, span: &Span) -> RuntimeResult<Value> {
    match op {
        AssignOp::Binary(op) => apply_binary(op, current, rhs, span),
        AssignOp::BitNot => apply_unary(UnaryOp::BitNot, rhs, span),
    }
}

/// Text used when a scalar is concatenated onto a String.
fn concat_text(value: &Value) -> Option<String> {
    match value {
        Value::Int(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Bool(v) => Some(v.to_string()),
        Value::String(v) => Some(v.clone()),
        _ => None,
    }
}

fn eval_add(left: Value, right: Value, span: &Span) -> RuntimeResult<Value> {
    if let Value::List(list) = &left {
        match &right {
            Value::List(other) => {
                let appended = other.snapshot();
                list.items.borrow_mut().extend(appended);
            }
            other => list.push(other.clone()),
        }
        return Ok(left);
    }
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return match (concat_text(&left), concat_text(&right)) {
            (Some(mut text), Some(tail)) => {
                text.push_str(&tail);
                Ok(Value::String(text))
            }
            _ => Err(RuntimeError::conversion(
                span,
                format!(
                    "cannot concatenate {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
            )),
        };
    }
    eval_numeric(BinaryOp::Add, &left, &right, span)
}

fn eval_sub(left: Value, right: Value, span: &Span) -> RuntimeResult<Value> {
    match (&left, &right) {
        (Value::List(list), Value::List(other)) => {
            let removed = other.snapshot();
            let kept = list
                .snapshot()
                .into_iter()
                .filter(|item| !removed.iter().any(|r| r.same_as(item)))
                .collect();
            Ok(Value::list(kept))
        }
        (Value::List(list), target) => {
            let mut items = list.snapshot();
            if let Some(pos) = items.iter().position(|item| item.same_as(target)) {
                items.remove(pos);
            }
            Ok(Value::list(items))
        }
        _ => eval_numeric(BinaryOp::Sub, &left, &right, span),
    }
}

fn eval_mul(left: Value, right: Value, span: &Span) -> RuntimeResult<Value> {
    match (&left, &right) {
        (Value::String(text), Value::Int(count)) => repeat_string(text, *count, span),
        (Value::List(list), Value::Int(count)) => repeat_list(list, *count, span),
        _ => eval_numeric(BinaryOp::Mul, &left, &right, span),
    }
}

fn repeat_string(text: &str, count: i64, span: &Span) -> RuntimeResult<Value> {
    let count = usize::try_from(count).unwrap_or(0);
    if text.is_empty() {
        return Ok(Value::string(""));
    }
    let mut repeated = String::new();
    text.len()
        .checked_mul(count)
        .and_then(|total| repeated.try_reserve_exact(total).ok())
        .ok_or_else(|| {
            RuntimeError::invalid_operation(
                span,
                format!("repeating a string of {} bytes {count} times is too large", text.len()),
            )
        })?;
    for _ in 0..count {
        repeated.push_str(text);
    }
    Ok(Value::String(repeated))
}

fn repeat_list(list: &ListValue, count: i64, span: &Span) -> RuntimeResult<Value> {
    if list.is_empty() {
        return Err(RuntimeError::empty_list(span, "cannot multiply an empty list"));
    }
    if count < 1 {
        return Err(RuntimeError::invalid_operation(
            span,
            format!("list multiplier must be at least 1, found {count}"),
        ));
    }
    let source = list.snapshot();
    let too_large = || {
        RuntimeError::invalid_operation(
            span,
            format!("repeating a list of {} elements {count} times is too large", source.len()),
        )
    };
    let total = usize::try_from(count)
        .ok()
        .and_then(|times| source.len().checked_mul(times))
        .ok_or_else(too_large)?;
    let mut items = Vec::new();
    items.try_reserve_exact(total).map_err(|_| too_large())?;
    for _ in 0..count {
        items.extend(source.iter().map(Value::deep_clone));
    }
    Ok(Value::list(items))
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Int(v) => *v == 0,
        Value::Float(v) => *v == 0.0,
        _ => false,
    }
}

fn eval_numeric(op: BinaryOp, left: &Value, right: &Value, span: &Span) -> RuntimeResult<Value> {
    let Some(pair) = numeric_pair(left, right) else {
        return Err(RuntimeError::conversion(
            span,
            format!(
                "`{}` expects numeric operands, found {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        ));
    };
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && is_zero(right) {
        return Err(RuntimeError::DivideByZero { span: span.clone() });
    }
    let result = match pair {
        NumericPair::Ints(a, b) => Value::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Rem => a.wrapping_rem(b),
            BinaryOp::Pow => (a as f64).powf(b as f64) as i64,
            _ => return Err(unsupported(op, left, right, span)),
        }),
        NumericPair::Floats(a, b) => Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            BinaryOp::Pow => a.powf(b),
            _ => return Err(unsupported(op, left, right, span)),
        }),
    };
    Ok(result)
}

fn bitwise_operand(value: &Value) -> Option<i64> {
    match value {
        Value::Int(v) => Some(*v),
        Value::Float(v) => Some(*v as i64),
        Value::Bool(v) => Some(*v as i64),
        _ => None,
    }
}

fn eval_bitwise(op: BinaryOp, left: &Value, right: &Value, span: &Span) -> RuntimeResult<Value> {
    let (lhs, rhs) = match (left, bitwise_operand(right)) {
        (Value::Int(a), Some(b)) => (*a, b),
        _ => {
            return Err(RuntimeError::conversion(
                span,
                format!(
                    "`{}` expects Integer operands, found {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
            ));
        }
    };
    let result = match op {
        BinaryOp::BitAnd => lhs & rhs,
        BinaryOp::BitOr => lhs | rhs,
        BinaryOp::BitXor => lhs ^ rhs,
        BinaryOp::Shl | BinaryOp::Shr => {
            let amount = u32::try_from(rhs)
                .ok()
                .filter(|amount| *amount < i64::BITS)
                .ok_or_else(|| {
                    RuntimeError::invalid_operation(
                        span,
                        format!("shift amount {rhs} is outside 0..64"),
                    )
                })?;
            if op == BinaryOp::Shl {
                lhs << amount
            } else {
                lhs >> amount
            }
        }
        _ => return Err(unsupported(op, left, right, span)),
    };
    Ok(Value::Int(result))
}

fn eval_compare<F>(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: &Span,
    accept: F,
) -> RuntimeResult<Value>
where
    F: Fn(Ordering) -> bool,
{
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match numeric_pair(left, right) {
            Some(NumericPair::Ints(a, b)) => Some(a.cmp(&b)),
            Some(NumericPair::Floats(a, b)) => a.partial_cmp(&b),
            None => return Err(unsupported(op, left, right, span)),
        },
    };
    // NaN is unordered: every ordering comparison is false
    Ok(Value::Bool(ordering.is_some_and(accept)))
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value, span: &Span) -> RuntimeError {
    RuntimeError::invalid_operation(
        span,
        format!(
            "`{}` is not defined for {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}
