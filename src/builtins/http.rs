use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::{get_map, get_string},
    value::{MapValue, Value},
};
use std::sync::OnceLock;
use ureq::Agent;

pub const NAMES: &[(&str, Arity)] = &[
    ("__http_get__", Arity::Range(1, 2)),
    ("__http_delete__", Arity::Range(1, 2)),
    ("__http_head__", Arity::Range(1, 2)),
    ("__http_options__", Arity::Range(1, 2)),
    ("__http_post__", Arity::Range(2, 3)),
    ("__http_put__", Arity::Range(2, 3)),
    ("__http_patch__", Arity::Range(2, 3)),
];

static AGENT: OnceLock<Agent> = OnceLock::new();

fn agent() -> &'static Agent {
    AGENT.get_or_init(Agent::new)
}

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    let (method, has_body) = match name {
        "__http_get__" => ("GET", false),
        "__http_delete__" => ("DELETE", false),
        "__http_head__" => ("HEAD", false),
        "__http_options__" => ("OPTIONS", false),
        "__http_post__" => ("POST", true),
        "__http_put__" => ("PUT", true),
        "__http_patch__" => ("PATCH", true),
        _ => {
            return Err(RuntimeError::UnknownBuiltin {
                span: span.clone(),
                name: name.to_string(),
            })
        }
    };

    let url = get_string(name, &args[0], span)?;
    let header_index = if has_body { 2 } else { 1 };
    let mut request = agent().request(method, url);
    if let Some(headers) = args.get(header_index) {
        for (key, value) in get_map(name, headers, span)?.entries.borrow().iter() {
            request = request.set(&key.to_string(), &value.to_string());
        }
    }

    tracing::debug!(method, url, "http request");
    let outcome = if has_body {
        request.send_string(&args[1].to_string())
    } else {
        request.call()
    };
    let response = match outcome {
        Ok(response) => response,
        // error statuses still carry a response the program can inspect
        Err(ureq::Error::Status(_, response)) => response,
        Err(err) => return Err(RuntimeError::io(span, format!("{url}: {err}"))),
    };
    into_value(response, url, span)
}

fn into_value(response: ureq::Response, url: &str, span: &Span) -> RuntimeResult<Value> {
    let status = i64::from(response.status());
    let headers = MapValue::new();
    for header in response.headers_names() {
        if let Some(value) = response.header(&header) {
            headers.insert(Value::String(header), Value::string(value));
        }
    }
    let body = response
        .into_string()
        .map_err(|err| RuntimeError::io(span, format!("{url}: {err}")))?;

    let result = MapValue::new();
    result.insert(Value::string("status"), Value::Int(status));
    result.insert(Value::string("body"), Value::String(body));
    result.insert(Value::string("headers"), Value::Map(headers));
    Ok(Value::Map(result))
}
