//! Argument extraction for builtin handlers. Failures name the builtin that
//! rejected the argument.

use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{ListValue, MapValue, Value},
};

pub fn get_double(name: &str, value: &Value, span: &Span) -> RuntimeResult<f64> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(expected(name, "a number", other, span)),
    }
}

pub fn get_integer(name: &str, value: &Value, span: &Span) -> RuntimeResult<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i64),
        other => Err(expected(name, "an Integer", other, span)),
    }
}

pub fn get_bool(name: &str, value: &Value, span: &Span) -> RuntimeResult<bool> {
    match value {
        Value::Bool(v) => Ok(*v),
        other => Err(expected(name, "a Boolean", other, span)),
    }
}

pub fn get_string<'a>(name: &str, value: &'a Value, span: &Span) -> RuntimeResult<&'a str> {
    match value {
        Value::String(v) => Ok(v),
        other => Err(expected(name, "a String", other, span)),
    }
}

pub fn get_list(name: &str, value: &Value, span: &Span) -> RuntimeResult<ListValue> {
    match value {
        Value::List(list) => Ok(list.clone()),
        other => Err(expected(name, "a List", other, span)),
    }
}

pub fn get_map(name: &str, value: &Value, span: &Span) -> RuntimeResult<MapValue> {
    match value {
        Value::Map(map) => Ok(map.clone()),
        other => Err(expected(name, "a Hash", other, span)),
    }
}

/// Reads every element of a List as a Float.
pub fn get_doubles(name: &str, value: &Value, span: &Span) -> RuntimeResult<Vec<f64>> {
    let list = get_list(name, value, span)?;
    let items = list.items.borrow();
    items.iter().map(|item| get_double(name, item, span)).collect()
}

/// Optional trailing numeric argument with a default.
pub fn double_or(
    name: &str,
    args: &[Value],
    index: usize,
    default: f64,
    span: &Span,
) -> RuntimeResult<f64> {
    match args.get(index) {
        Some(value) => get_double(name, value, span),
        None => Ok(default),
    }
}

fn expected(name: &str, what: &str, found: &Value, span: &Span) -> RuntimeError {
    RuntimeError::builtin_argument(
        span,
        name,
        format!("expected {what}, found {}", found.type_name()),
    )
}
