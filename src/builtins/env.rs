use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::get_string,
    platform::platform,
    value::Value,
};

pub const NAMES: &[(&str, Arity)] = &[
    ("__getenv__", Arity::Exact(1)),
    ("__setenv__", Arity::Exact(2)),
];

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    match name {
        // unset variables read as null
        "__getenv__" => {
            let var = get_string(name, &args[0], span)?;
            Ok(platform().env_var(var).map(Value::String).unwrap_or(Value::Null))
        }
        "__setenv__" => {
            let var = get_string(name, &args[0], span)?;
            let value = args[1].to_string();
            platform()
                .set_env_var(var, &value)
                .map_err(|message| RuntimeError::builtin_argument(span, name, message))?;
            Ok(Value::Bool(true))
        }
        _ => Err(RuntimeError::UnknownBuiltin {
            span: span.clone(),
            name: name.to_string(),
        }),
    }
}
