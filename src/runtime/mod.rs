pub mod environment;
pub mod error;
pub mod interpreter;
pub mod numeric;
pub mod operators;
pub mod platform;
pub mod random;
pub mod slice;
pub mod value;

pub use interpreter::Interpreter;
