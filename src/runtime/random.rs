//! Process-wide random generator. Seeded once, on first use or by the first
//! interpreter's configuration, and shared by every builtin afterwards.

use crate::runtime::value::{ListValue, Value};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

const ALPHANUMERIC: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

static GENERATOR: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Seeds the generator if nothing has yet. Returns false when it was already
/// seeded, in which case `seed` is ignored.
pub fn seed_once(seed: Option<u64>) -> bool {
    let mut seeded = false;
    GENERATOR.get_or_init(|| {
        seeded = true;
        seeded_generator(seed)
    });
    seeded
}

fn seeded_generator(seed: Option<u64>) -> Mutex<StdRng> {
    let seed = seed.unwrap_or_else(clock_seed);
    tracing::debug!(seed, "random generator seeded");
    Mutex::new(StdRng::seed_from_u64(seed))
}

fn generator() -> MutexGuard<'static, StdRng> {
    GENERATOR
        .get_or_init(|| seeded_generator(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Uniform Float in `[low, high)`; bounds may be given in either order.
/// Non-finite or equal bounds yield `from`.
pub fn random_float(from: f64, to: f64) -> f64 {
    let (low, high) = if from <= to { (from, to) } else { (to, from) };
    if low == high || !low.is_finite() || !high.is_finite() {
        return from;
    }
    generator().gen_range(low..high)
}

/// Uniform Integer in `[low, high]`; bounds may be given in either order.
pub fn random_int(from: i64, to: i64) -> i64 {
    let (low, high) = if from <= to { (from, to) } else { (to, from) };
    generator().gen_range(low..=high)
}

/// `length` characters drawn from `chars`. Empty input yields an empty string.
pub fn random_string(chars: &str, length: usize) -> String {
    let pool: Vec<char> = chars.chars().collect();
    if pool.is_empty() {
        return String::new();
    }
    let mut rng = generator();
    (0..length)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect()
}

/// `length` elements drawn from `list`. The elements are shared, not copied.
pub fn random_list(list: &ListValue, length: usize) -> Value {
    let pool = list.snapshot();
    if pool.is_empty() {
        return Value::list(Vec::new());
    }
    let mut rng = generator();
    let items = (0..length)
        .map(|_| pool[rng.gen_range(0..pool.len())].clone())
        .collect();
    Value::list(items)
}

pub fn random16() -> String {
    random_string(ALPHANUMERIC, 16)
}

/// Unique-enough name for scratch bindings the interpreter introduces.
pub fn temporary_id() -> String {
    format!("temporary_{}", random16())
}
