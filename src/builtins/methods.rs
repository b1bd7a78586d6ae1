//! Receiver-bound builtins (`value.name(args)`). These never take part in
//! free-standing dispatch.

use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::get_string,
    value::Value,
};

pub const NAMES: &[(&str, Arity)] = &[
    ("chars", Arity::Exact(0)),
    ("is_a", Arity::Exact(1)),
    ("join", Arity::Range(0, 1)),
    ("split", Arity::Range(0, 1)),
    ("ltrim", Arity::Exact(0)),
    ("rtrim", Arity::Exact(0)),
    ("trim", Arity::Exact(0)),
    ("size", Arity::Exact(0)),
    ("to_d", Arity::Exact(0)),
    ("to_i", Arity::Exact(0)),
    ("to_s", Arity::Exact(0)),
    ("type", Arity::Exact(0)),
    ("replace", Arity::Exact(2)),
    ("contains", Arity::Exact(1)),
    ("begins_with", Arity::Exact(1)),
    ("ends_with", Arity::Exact(1)),
    ("index_of", Arity::Exact(1)),
    ("upcase", Arity::Exact(0)),
    ("downcase", Arity::Exact(0)),
    ("keys", Arity::Exact(0)),
];

pub fn execute(
    entry: &BuiltinEntry,
    receiver: &Value,
    args: &[Value],
    span: &Span,
) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    let value = match name {
        "to_s" => Value::String(receiver.to_string()),
        "type" => Value::string(receiver.type_name()),
        "is_a" => {
            let wanted = get_string(name, &args[0], span)?;
            let matches_class = match receiver {
                Value::Object(object) => object.class.name == wanted,
                _ => false,
            };
            Value::Bool(matches_class || receiver.type_name() == wanted)
        }
        "size" => match receiver {
            Value::String(text) => Value::Int(text.chars().count() as i64),
            Value::List(list) => Value::Int(list.len() as i64),
            Value::Map(map) => Value::Int(map.len() as i64),
            other => return Err(unsupported(name, other, span)),
        },
        "to_i" => Value::Int(to_integer(receiver, span)?),
        "to_d" => Value::Float(to_double(receiver, span)?),
        "keys" => match receiver {
            Value::Map(map) => Value::list(map.keys()),
            Value::Object(object) => Value::list(
                object.fields.borrow().keys().map(Value::string).collect(),
            ),
            other => return Err(unsupported(name, other, span)),
        },
        "join" => {
            let Value::List(list) = receiver else {
                return Err(unsupported(name, receiver, span));
            };
            let separator = match args.first() {
                Some(sep) => get_string(name, sep, span)?,
                None => "",
            };
            let parts: Vec<String> = list.items.borrow().iter().map(Value::to_string).collect();
            Value::String(parts.join(separator))
        }
        "contains" => match receiver {
            Value::String(text) => {
                Value::Bool(text.contains(get_string(name, &args[0], span)?))
            }
            Value::List(list) => {
                Value::Bool(list.items.borrow().iter().any(|item| item.same_as(&args[0])))
            }
            Value::Map(map) => Value::Bool(map.contains_key(&args[0])),
            other => return Err(unsupported(name, other, span)),
        },
        "index_of" => match receiver {
            Value::String(text) => {
                let needle = get_string(name, &args[0], span)?;
                // position in characters, not bytes
                let found = text
                    .find(needle)
                    .map(|byte| text[..byte].chars().count() as i64);
                Value::Int(found.unwrap_or(-1))
            }
            Value::List(list) => {
                let found = list.items.borrow().iter().position(|item| item.same_as(&args[0]));
                Value::Int(found.map(|idx| idx as i64).unwrap_or(-1))
            }
            other => return Err(unsupported(name, other, span)),
        },
        _ => {
            let Value::String(text) = receiver else {
                return Err(unsupported(name, receiver, span));
            };
            string_method(name, text, args, span)?
        }
    };
    Ok(value)
}

fn string_method(name: &str, text: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let value = match name {
        "chars" => Value::list(text.chars().map(|c| Value::String(c.to_string())).collect()),
        "ltrim" => Value::string(text.trim_start()),
        "rtrim" => Value::string(text.trim_end()),
        "trim" => Value::string(text.trim()),
        "upcase" => Value::String(text.to_uppercase()),
        "downcase" => Value::String(text.to_lowercase()),
        "begins_with" => Value::Bool(text.starts_with(get_string(name, &args[0], span)?)),
        "ends_with" => Value::Bool(text.ends_with(get_string(name, &args[0], span)?)),
        "replace" => {
            let from = get_string(name, &args[0], span)?;
            let to = get_string(name, &args[1], span)?;
            if from.is_empty() {
                Value::string(text)
            } else {
                Value::String(text.replace(from, to))
            }
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None => text.split_whitespace().map(Value::string).collect(),
                Some(delimiter) => match get_string(name, delimiter, span)? {
                    "" => text.chars().map(|c| Value::String(c.to_string())).collect(),
                    delimiter => text.split(delimiter).map(Value::string).collect(),
                },
            };
            Value::list(parts)
        }
        _ => {
            return Err(RuntimeError::UnknownBuiltin {
                span: span.clone(),
                name: name.to_string(),
            })
        }
    };
    Ok(value)
}

fn to_integer(receiver: &Value, span: &Span) -> RuntimeResult<i64> {
    match receiver {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i64),
        Value::Bool(v) => Ok(i64::from(*v)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| {
                    RuntimeError::conversion(span, format!("cannot convert \"{text}\" to Integer"))
                })
        }
        other => Err(RuntimeError::conversion(
            span,
            format!("cannot convert {} to Integer", other.type_name()),
        )),
    }
}

fn to_double(receiver: &Value, span: &Span) -> RuntimeResult<f64> {
    match receiver {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
            RuntimeError::conversion(span, format!("cannot convert \"{text}\" to Double"))
        }),
        other => Err(RuntimeError::conversion(
            span,
            format!("cannot convert {} to Double", other.type_name()),
        )),
    }
}

fn unsupported(name: &str, receiver: &Value, span: &Span) -> RuntimeError {
    RuntimeError::builtin_argument(
        span,
        name,
        format!("`{name}` is not defined for {}", receiver.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use crate::builtins::dispatch_method;
    use crate::language::span::Span;
    use crate::runtime::error::RuntimeError;
    use crate::runtime::value::{ClassInfo, MapValue, ObjectValue, Value};
    use std::rc::Rc;

    fn call(receiver: &Value, name: &str, args: &[Value]) -> Value {
        dispatch_method(name, receiver, args, &Span::unknown()).expect(name)
    }

    #[test]
    fn string_methods() {
        let text = Value::string("  Kiwi,Lang  ");
        assert_eq!(call(&text, "trim", &[]).to_string(), "Kiwi,Lang");
        assert_eq!(call(&text, "ltrim", &[]).to_string(), "Kiwi,Lang  ");
        assert_eq!(call(&text, "upcase", &[]).to_string(), "  KIWI,LANG  ");
        let parts = call(&Value::string("a,b,,c"), "split", &[Value::string(",")]);
        assert_eq!(parts.to_string(), "[\"a\", \"b\", \"\", \"c\"]");
        let words = call(&Value::string(" one  two "), "split", &[]);
        assert_eq!(words.to_string(), "[\"one\", \"two\"]");
        assert_eq!(
            call(&Value::string("héllo"), "index_of", &[Value::string("l")]).to_string(),
            "2"
        );
        assert_eq!(
            call(&Value::string("aXbX"), "replace", &[Value::string("X"), Value::string("-")])
                .to_string(),
            "a-b-"
        );
        assert!(matches!(
            call(&Value::string("kiwi"), "begins_with", &[Value::string("ki")]),
            Value::Bool(true)
        ));
        assert!(matches!(call(&Value::string("héllo"), "size", &[]), Value::Int(5)));
    }

    #[test]
    fn conversions() {
        assert!(matches!(call(&Value::string(" 42 "), "to_i", &[]), Value::Int(42)));
        assert!(matches!(call(&Value::string("3.9"), "to_i", &[]), Value::Int(3)));
        assert!(matches!(call(&Value::Int(2), "to_d", &[]), Value::Float(f) if f == 2.0));
        assert_eq!(call(&Value::list(vec![Value::Int(1)]), "to_s", &[]).to_string(), "[1]");
        let err = dispatch_method("to_i", &Value::string("kiwi"), &[], &Span::unknown())
            .expect_err("not a number");
        assert!(matches!(err, RuntimeError::Conversion { .. }));
    }

    #[test]
    fn containers() {
        let list = Value::list(vec![Value::Int(1), Value::string("b"), Value::Float(3.0)]);
        assert_eq!(call(&list, "join", &[Value::string("-")]).to_string(), "1-b-3");
        assert!(matches!(call(&list, "contains", &[Value::Int(3)]), Value::Bool(true)));
        assert!(matches!(call(&list, "index_of", &[Value::string("b")]), Value::Int(1)));
        assert!(matches!(call(&list, "index_of", &[Value::Null]), Value::Int(-1)));

        let map = MapValue::new();
        map.insert(Value::string("x"), Value::Int(1));
        map.insert(Value::string("y"), Value::Int(2));
        let map = Value::Map(map);
        assert_eq!(call(&map, "keys", &[]).to_string(), "[\"x\", \"y\"]");
        assert!(matches!(call(&map, "size", &[]), Value::Int(2)));

        let err = dispatch_method("trim", &list, &[], &Span::unknown()).expect_err("not a string");
        assert!(matches!(err, RuntimeError::BuiltinArgument { .. }));
    }

    #[test]
    fn type_queries() {
        let object = Value::Object(ObjectValue::new(Rc::new(ClassInfo {
            name: "Point".to_string(),
        })));
        assert_eq!(call(&object, "type", &[]).to_string(), "Object");
        assert!(matches!(call(&object, "is_a", &[Value::string("Point")]), Value::Bool(true)));
        assert!(matches!(call(&object, "is_a", &[Value::string("Object")]), Value::Bool(true)));
        assert!(matches!(
            call(&Value::Float(1.0), "is_a", &[Value::string("Integer")]),
            Value::Bool(false)
        ));
        assert_eq!(call(&Value::Null, "type", &[]).to_string(), "None");
    }
}
