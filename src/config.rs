//! Runtime limits and seeding, with environment overrides.

use std::env;

pub const MAX_CALL_DEPTH_VAR: &str = "KIWI_MAX_CALL_DEPTH";
pub const RNG_SEED_VAR: &str = "KIWI_RNG_SEED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Routine frames allowed above the global frame before a call fails
    /// with a stack overflow.
    pub max_call_depth: usize,

    /// Seed for the process-wide random generator; `None` seeds from the
    /// clock.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_call_depth: 10_000,
            rng_seed: None,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `KIWI_MAX_CALL_DEPTH` and `KIWI_RNG_SEED`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(depth) = parse_var(&lookup, MAX_CALL_DEPTH_VAR) {
            self.max_call_depth = depth;
        }
        if let Some(seed) = parse_var(&lookup, RNG_SEED_VAR) {
            self.rng_seed = Some(seed);
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(var = name, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let config = RuntimeConfig::default().with_overrides(|name| match name {
            MAX_CALL_DEPTH_VAR => Some(" 64 ".into()),
            RNG_SEED_VAR => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.rng_seed, None);

        let config = RuntimeConfig::new().with_overrides(|name| {
            (name == RNG_SEED_VAR).then(|| "42".to_string())
        });
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.max_call_depth, 10_000);
    }
}
