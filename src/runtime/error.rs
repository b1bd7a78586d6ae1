use crate::language::span::Span;
use crate::runtime::value::Value;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Conversion error: {message}")]
    Conversion { span: Span, message: String },
    #[error("Attempted to divide by zero")]
    DivideByZero { span: Span },
    #[error("Index error: {message}")]
    Index { span: Span, message: String },
    #[error("Range error: {message}")]
    Range { span: Span, message: String },
    #[error("Invalid operation: {message}")]
    InvalidOperation { span: Span, message: String },
    #[error("Unknown builtin `{name}`")]
    UnknownBuiltin { span: Span, name: String },
    #[error("Invalid arguments to builtin `{name}`: {message}")]
    BuiltinArgument {
        span: Span,
        name: String,
        message: String,
    },
    #[error("Empty list: {message}")]
    EmptyList { span: Span, message: String },
    #[error("Stack overflow: call depth exceeded {limit}")]
    StackOverflow { span: Span, limit: usize },
    #[error("Unknown symbol `{name}`")]
    UnknownSymbol { span: Span, name: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        span: Span,
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("I/O failure: {message}")]
    Io { span: Span, message: String },
    #[error("{value}")]
    Raised { span: Span, value: Value },
}

impl RuntimeError {
    pub fn conversion(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::Conversion {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn invalid_operation(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::InvalidOperation {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn index(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::Index {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn range(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::Range {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn builtin_argument(span: &Span, name: &str, message: impl Into<String>) -> Self {
        RuntimeError::BuiltinArgument {
            span: span.clone(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn empty_list(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::EmptyList {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn io(span: &Span, message: impl Into<String>) -> Self {
        RuntimeError::Io {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            RuntimeError::Conversion { span, .. }
            | RuntimeError::DivideByZero { span }
            | RuntimeError::Index { span, .. }
            | RuntimeError::Range { span, .. }
            | RuntimeError::InvalidOperation { span, .. }
            | RuntimeError::UnknownBuiltin { span, .. }
            | RuntimeError::BuiltinArgument { span, .. }
            | RuntimeError::EmptyList { span, .. }
            | RuntimeError::StackOverflow { span, .. }
            | RuntimeError::UnknownSymbol { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::Io { span, .. }
            | RuntimeError::Raised { span, .. } => span,
        }
    }

    /// Stable kind name, as seen by user programs that inspect caught errors.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::Conversion { .. } => "ConversionError",
            RuntimeError::DivideByZero { .. } => "DivideByZeroError",
            RuntimeError::Index { .. } => "IndexError",
            RuntimeError::Range { .. } => "RangeError",
            RuntimeError::InvalidOperation { .. } => "InvalidOperationError",
            RuntimeError::UnknownBuiltin { .. } => "UnknownBuiltinError",
            RuntimeError::BuiltinArgument { .. } => "BuiltinArgumentError",
            RuntimeError::EmptyList { .. } => "EmptyListError",
            RuntimeError::StackOverflow { .. } => "StackOverflowError",
            RuntimeError::UnknownSymbol { .. } => "UnknownSymbolError",
            RuntimeError::ArityMismatch { .. } => "ArityMismatchError",
            RuntimeError::Io { .. } => "IOError",
            RuntimeError::Raised { .. } => "Error",
        }
    }

    /// The Value a parameterized catch binds: the raised Value itself, or the
    /// error message for internally detected failures.
    pub fn to_value(&self) -> Value {
        match self {
            RuntimeError::Raised { value, .. } => value.clone(),
            other => Value::String(other.to_string()),
        }
    }
}
