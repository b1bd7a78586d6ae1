use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::{get_double, get_integer},
    random,
    value::Value,
};
use std::f64::consts::PI;

pub const NAMES: &[(&str, Arity)] = &[
    ("__sin__", Arity::Exact(1)),
    ("__tan__", Arity::Exact(1)),
    ("__asin__", Arity::Exact(1)),
    ("__acos__", Arity::Exact(1)),
    ("__atan__", Arity::Exact(1)),
    ("__atan2__", Arity::Exact(2)),
    ("__sinh__", Arity::Exact(1)),
    ("__cosh__", Arity::Exact(1)),
    ("__tanh__", Arity::Exact(1)),
    ("__cos__", Arity::Exact(1)),
    ("__log__", Arity::Exact(1)),
    ("__log2__", Arity::Exact(1)),
    ("__log10__", Arity::Exact(1)),
    ("__log1p__", Arity::Exact(1)),
    ("__fmod__", Arity::Exact(2)),
    ("__hypot__", Arity::Exact(2)),
    ("__isfinite__", Arity::Exact(1)),
    ("__isinf__", Arity::Exact(1)),
    ("__isnan__", Arity::Exact(1)),
    ("__isnormal__", Arity::Exact(1)),
    ("__sqrt__", Arity::Exact(1)),
    ("__cbrt__", Arity::Exact(1)),
    ("__abs__", Arity::Exact(1)),
    ("__floor__", Arity::Exact(1)),
    ("__ceil__", Arity::Exact(1)),
    ("__round__", Arity::Exact(1)),
    ("__trunc__", Arity::Exact(1)),
    ("__remainder__", Arity::Exact(2)),
    ("__exp__", Arity::Exact(1)),
    ("__expm1__", Arity::Exact(1)),
    ("__erf__", Arity::Exact(1)),
    ("__erfc__", Arity::Exact(1)),
    ("__lgamma__", Arity::Exact(1)),
    ("__tgamma__", Arity::Exact(1)),
    ("__fmax__", Arity::Exact(2)),
    ("__fmin__", Arity::Exact(2)),
    ("__fdim__", Arity::Exact(2)),
    ("__copysign__", Arity::Exact(2)),
    ("__nextafter__", Arity::Exact(2)),
    ("__pow__", Arity::Exact(2)),
    ("__eps__", Arity::Exact(0)),
    ("__random__", Arity::Exact(2)),
];

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    match name {
        "__eps__" => return Ok(Value::Float(f64::EPSILON)),
        "__abs__" => {
            return match &args[0] {
                Value::Int(v) => Ok(Value::Int(v.wrapping_abs())),
                other => Ok(Value::Float(get_double(name, other, span)?.abs())),
            }
        }
        "__random__" => return random_value(name, &args[0], &args[1], span),
        _ => {}
    }

    let x = get_double(name, &args[0], span)?;
    if args.len() == 2 {
        let y = get_double(name, &args[1], span)?;
        let value = match name {
            "__atan2__" => x.atan2(y),
            "__fmod__" => x % y,
            "__hypot__" => x.hypot(y),
            "__remainder__" => ieee_remainder(x, y),
            "__fmax__" => x.max(y),
            "__fmin__" => x.min(y),
            "__fdim__" => {
                if x > y {
                    x - y
                } else {
                    0.0
                }
            }
            "__copysign__" => x.copysign(y),
            "__nextafter__" => next_after(x, y),
            "__pow__" => x.powf(y),
            _ => return Err(unknown(name, span)),
        };
        return Ok(Value::Float(value));
    }

    let value = match name {
        "__isfinite__" => return Ok(Value::Bool(x.is_finite())),
        "__isinf__" => return Ok(Value::Bool(x.is_infinite())),
        "__isnan__" => return Ok(Value::Bool(x.is_nan())),
        "__isnormal__" => return Ok(Value::Bool(x.is_normal())),
        "__sin__" => x.sin(),
        "__tan__" => x.tan(),
        "__asin__" => x.asin(),
        "__acos__" => x.acos(),
        "__atan__" => x.atan(),
        "__sinh__" => x.sinh(),
        "__cosh__" => x.cosh(),
        "__tanh__" => x.tanh(),
        "__cos__" => x.cos(),
        "__log__" => x.ln(),
        "__log2__" => x.log2(),
        "__log10__" => x.log10(),
        "__log1p__" => x.ln_1p(),
        "__sqrt__" => x.sqrt(),
        "__cbrt__" => x.cbrt(),
        "__floor__" => x.floor(),
        "__ceil__" => x.ceil(),
        "__round__" => x.round(),
        "__trunc__" => x.trunc(),
        "__exp__" => x.exp(),
        "__expm1__" => x.exp_m1(),
        "__erf__" => erf(x),
        "__erfc__" => erfc(x),
        "__lgamma__" => ln_gamma(x),
        "__tgamma__" => gamma(x),
        _ => return Err(unknown(name, span)),
    };
    Ok(Value::Float(value))
}

fn unknown(name: &str, span: &Span) -> RuntimeError {
    RuntimeError::UnknownBuiltin {
        span: span.clone(),
        name: name.to_string(),
    }
}

/// `__random__(x, y)`: a String or List first argument draws `y` items from
/// it; otherwise a uniform number between the bounds, Float if either bound
/// is a Float and inclusive Integer otherwise.
fn random_value(name: &str, from: &Value, to: &Value, span: &Span) -> RuntimeResult<Value> {
    let length = || -> RuntimeResult<usize> {
        let length = get_integer(name, to, span)?;
        usize::try_from(length).map_err(|_| {
            RuntimeError::builtin_argument(span, name, format!("negative length {length}"))
        })
    };
    match (from, to) {
        (Value::String(pool), _) => Ok(Value::String(random::random_string(pool, length()?))),
        (Value::List(pool), _) => Ok(random::random_list(pool, length()?)),
        (Value::Int(low), Value::Int(high)) => Ok(Value::Int(random::random_int(*low, *high))),
        _ => {
            let low = get_double(name, from, span)?;
            let high = get_double(name, to, span)?;
            if !low.is_finite() || !high.is_finite() {
                return Err(RuntimeError::builtin_argument(
                    span,
                    name,
                    "bounds must be finite numbers",
                ));
            }
            Ok(Value::Float(random::random_float(low, high)))
        }
    }
}

fn ieee_remainder(x: f64, y: f64) -> f64 {
    if y == 0.0 || x.is_infinite() || x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    if y.is_infinite() {
        return x;
    }
    let quotient = x / y;
    let mut n = quotient.round();
    // ties go to the even quotient
    if (quotient - quotient.trunc()).abs() == 0.5 && n % 2.0 != 0.0 {
        n -= quotient.signum();
    }
    x - n * y
}

fn next_after(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    if x == y {
        return y;
    }
    if x == 0.0 {
        return f64::from_bits(1).copysign(y);
    }
    let bits = x.to_bits();
    let toward_larger_magnitude = (y > x) == (x > 0.0);
    f64::from_bits(if toward_larger_magnitude { bits + 1 } else { bits - 1 })
}

fn erfc(x: f64) -> f64 {
    // Chebyshev fit, fractional error below 1.2e-7
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

fn lanczos_sum(x: f64) -> f64 {
    LANCZOS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0))
}

fn gamma(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if x == x.floor() && x <= 0.0 {
        return f64::NAN;
    }
    if x < 0.5 {
        return PI / ((PI * x).sin() * gamma(1.0 - x));
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * lanczos_sum(x)
}

fn ln_gamma(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == x.floor() && x <= 0.0 {
        return f64::INFINITY;
    }
    if x < 0.5 {
        return (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + lanczos_sum(x).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::dispatch;

    fn call(name: &str, args: &[Value]) -> Value {
        dispatch(name, args, &Span::unknown()).expect(name)
    }

    fn float(value: Value) -> f64 {
        match value {
            Value::Float(v) => v,
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn scalar_functions_accept_integers() {
        assert_eq!(float(call("__sqrt__", &[Value::Int(16)])), 4.0);
        assert_eq!(float(call("__pow__", &[Value::Int(2), Value::Float(0.5)])), 2f64.sqrt());
        assert_eq!(float(call("__fdim__", &[Value::Int(2), Value::Int(5)])), 0.0);
        assert!(matches!(call("__abs__", &[Value::Int(-3)]), Value::Int(3)));
        assert_eq!(float(call("__abs__", &[Value::Float(-2.5)])), 2.5);
        assert!(matches!(call("__isnan__", &[Value::Float(f64::NAN)]), Value::Bool(true)));
        assert_eq!(float(call("__eps__", &[])), f64::EPSILON);
    }

    #[test]
    fn special_functions_match_known_values() {
        assert!((gamma(5.0) - 24.0).abs() < 1e-9);
        assert!((gamma(0.5) - PI.sqrt()).abs() < 1e-9);
        assert!((ln_gamma(10.0) - 362_880f64.ln()).abs() < 1e-9);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erfc(-1.0) - 1.157_299_21).abs() < 1e-6);
        assert!(gamma(-2.0).is_nan());
    }

    #[test]
    fn remainder_and_nextafter() {
        assert_eq!(ieee_remainder(5.0, 2.0), 1.0);
        assert_eq!(ieee_remainder(7.0, 2.0), -1.0);
        assert_eq!(ieee_remainder(5.5, 2.0), -0.5);
        assert!(next_after(1.0, 2.0) > 1.0);
        assert!(next_after(1.0, 0.0) < 1.0);
        assert!(next_after(0.0, -1.0) < 0.0);
    }

    #[test]
    fn random_dispatches_on_argument_kinds() {
        assert!(matches!(
            call("__random__", &[Value::Int(1), Value::Int(1)]),
            Value::Int(1)
        ));
        let f = float(call("__random__", &[Value::Int(0), Value::Float(1.0)]));
        assert!((0.0..1.0).contains(&f));
        let text = call("__random__", &[Value::string("xyz"), Value::Int(5)]).to_string();
        assert_eq!(text.len(), 5);
        let list = call(
            "__random__",
            &[Value::list(vec![Value::Int(7)]), Value::Int(3)],
        );
        assert_eq!(list.to_string(), "[7, 7, 7]");
        let err = dispatch(
            "__random__",
            &[Value::string("ab"), Value::Int(-1)],
            &Span::unknown(),
        )
        .expect_err("negative length");
        assert!(matches!(err, RuntimeError::BuiltinArgument { .. }));
    }
}
