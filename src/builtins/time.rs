use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::{get_double, get_integer},
    platform::platform,
    value::Value,
};
use chrono::{DateTime, Datelike, Local, Offset, TimeZone, Timelike};
use std::sync::OnceLock;
use std::time::Instant;

pub const NAMES: &[(&str, Arity)] = &[
    ("__hour__", Arity::Exact(0)),
    ("__min__", Arity::Exact(0)),
    ("__sec__", Arity::Exact(0)),
    ("__mday__", Arity::Exact(0)),
    ("__wday__", Arity::Exact(0)),
    ("__yday__", Arity::Exact(0)),
    ("__mon__", Arity::Exact(0)),
    ("__year__", Arity::Exact(0)),
    ("__epochms__", Arity::Exact(0)),
    ("__delay__", Arity::Exact(1)),
    ("__isdst__", Arity::Exact(0)),
    ("__ticks__", Arity::Exact(0)),
    ("__ticksms__", Arity::Exact(1)),
    ("__ampm__", Arity::Exact(0)),
];

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

fn process_start() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    let now = Local::now();
    let value = match name {
        "__hour__" => Value::Int(now.hour() as i64),
        "__min__" => Value::Int(now.minute() as i64),
        "__sec__" => Value::Int(now.second() as i64),
        "__mday__" => Value::Int(now.day() as i64),
        "__wday__" => Value::Int(now.weekday().num_days_from_sunday() as i64),
        "__yday__" => Value::Int(now.ordinal0() as i64),
        "__mon__" => Value::Int(now.month() as i64),
        "__year__" => Value::Int(now.year() as i64),
        "__ampm__" => Value::string(if now.hour() < 12 { "AM" } else { "PM" }),
        "__isdst__" => Value::Bool(is_dst(&now)),
        "__epochms__" => Value::Int(platform().now_ms()),
        "__ticks__" => Value::Float(process_start().elapsed().as_nanos() as f64),
        "__ticksms__" => Value::Float(get_double(name, &args[0], span)? / 1_000_000.0),
        "__delay__" => {
            let millis = get_integer(name, &args[0], span)?;
            platform().sleep_ms(millis);
            Value::Int(millis)
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

/// Daylight saving is in effect when the current UTC offset exceeds the
/// smaller of the January and July offsets for this year.
fn is_dst(now: &DateTime<Local>) -> bool {
    let offset_at = |month: u32| {
        Local
            .with_ymd_and_hms(now.year(), month, 1, 12, 0, 0)
            .single()
            .map(|moment| moment.offset().fix().local_minus_utc())
    };
    match (offset_at(1), offset_at(7)) {
        (Some(january), Some(july)) if january != july => {
            now.offset().fix().local_minus_utc() > january.min(july)
        }
        _ => false,
    }
}
