pub mod builtins;
pub mod config;
pub mod diagnostics;
pub mod language;
pub mod runtime;

pub use config::RuntimeConfig;
pub use runtime::{error::RuntimeError, value::Value, Interpreter};

#[cfg(test)]
mod tests;
