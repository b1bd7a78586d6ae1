//! Builtin registry and router. Every builtin name belongs to exactly one
//! family; the router finds the family and hands the call to its handler,
//! which validates arity and argument types before computing.

pub mod env;
pub mod fileio;
#[cfg(feature = "http")]
pub mod http;
pub mod math;
pub mod methods;
pub mod ml;
pub mod time;

use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    FileIo,
    Time,
    Math,
    Env,
    Ml,
    Http,
    Core,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::FileIo => "fileio",
            Family::Time => "time",
            Family::Math => "math",
            Family::Env => "env",
            Family::Ml => "ml",
            Family::Http => "http",
            Family::Core => "core",
        }
    }

    /// Names claimed by this family, with their arity. Families compiled out
    /// claim nothing.
    pub fn names(self) -> &'static [(&'static str, Arity)] {
        match self {
            Family::FileIo => fileio::NAMES,
            Family::Time => time::NAMES,
            Family::Math => math::NAMES,
            Family::Env => env::NAMES,
            Family::Ml => ml::NAMES,
            #[cfg(feature = "http")]
            Family::Http => http::NAMES,
            #[cfg(not(feature = "http"))]
            Family::Http => &[],
            Family::Core => methods::NAMES,
        }
    }
}

/// Router priority for free-standing builtin calls.
pub const ROUTED_FAMILIES: &[Family] = &[
    Family::FileIo,
    Family::Time,
    Family::Math,
    Family::Env,
    Family::Ml,
    Family::Http,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinEntry {
    pub name: &'static str,
    pub family: Family,
    pub arity: Arity,
}

impl BuiltinEntry {
    pub fn check_arity(&self, args: &[Value], span: &Span) -> RuntimeResult<()> {
        if self.arity.accepts(args.len()) {
            Ok(())
        } else {
            Err(RuntimeError::builtin_argument(
                span,
                self.name,
                format!(
                    "{} builtin expects {} arguments but received {}",
                    self.family.name(),
                    self.arity,
                    args.len()
                ),
            ))
        }
    }
}

pub struct Registry {
    entries: HashMap<&'static str, BuiltinEntry>,
}

impl Registry {
    fn build() -> Self {
        let mut entries = HashMap::new();
        for family in ROUTED_FAMILIES.iter().copied().chain([Family::Core]) {
            for (name, arity) in family.names() {
                // first family to claim a name keeps it
                entries.entry(*name).or_insert(BuiltinEntry {
                    name: *name,
                    family,
                    arity: *arity,
                });
            }
        }
        Registry { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&BuiltinEntry> {
        self.entries.get(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|entry| entry.family != Family::Core)
    }

    pub fn is_method(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|entry| entry.family == Family::Core)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::build)
}

fn unknown(name: &str, span: &Span) -> RuntimeError {
    RuntimeError::UnknownBuiltin {
        span: span.clone(),
        name: name.to_string(),
    }
}

/// Free-standing builtin call: `__sqrt__(2)`.
pub fn dispatch(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let entry = match registry().lookup(name) {
        Some(entry) if entry.family != Family::Core => *entry,
        _ => return Err(unknown(name, span)),
    };
    tracing::debug!(family = entry.family.name(), builtin = name, "dispatching builtin");
    match entry.family {
        Family::FileIo => fileio::execute(&entry, args, span),
        Family::Time => time::execute(&entry, args, span),
        Family::Math => math::execute(&entry, args, span),
        Family::Env => env::execute(&entry, args, span),
        Family::Ml => ml::execute(&entry, args, span),
        #[cfg(feature = "http")]
        Family::Http => http::execute(&entry, args, span),
        _ => Err(unknown(name, span)),
    }
}

/// Receiver-bound builtin call: `"a,b".split(",")`.
pub fn dispatch_method(
    name: &str,
    receiver: &Value,
    args: &[Value],
    span: &Span,
) -> RuntimeResult<Value> {
    let entry = match registry().lookup(name) {
        Some(entry) if entry.family == Family::Core => *entry,
        _ => return Err(unknown(name, span)),
    };
    tracing::debug!(family = entry.family.name(), builtin = name, "dispatching method");
    methods::execute(&entry, receiver, args, span)
}
