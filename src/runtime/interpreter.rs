use crate::builtins;
use crate::config::RuntimeConfig;
use crate::language::{
    span::Span,
    token::{AssignOp, BinaryOp, UnaryOp},
};
use crate::runtime::{
    environment::{CallStack, FrameRef},
    error::{RuntimeError, RuntimeResult},
    operators, random,
    slice::{self, SliceIndex},
    value::{CallableValue, Value},
};

/// Entry point for the statement-level interpreter. Owns the call stack and
/// exposes expression evaluation, indexed access, frame management and
/// builtin dispatch.
pub struct Interpreter {
    stack: CallStack,
    config: RuntimeConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        random::seed_once(config.rng_seed);
        Self {
            stack: CallStack::new(config.max_call_depth),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn global(&self) -> FrameRef {
        self.stack.global()
    }

    pub fn current(&self) -> FrameRef {
        self.stack.current()
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn evaluate_binary(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> RuntimeResult<Value> {
        operators::apply_binary(op, left, right, span)
    }

    pub fn evaluate_unary(&self, op: UnaryOp, operand: Value, span: &Span) -> RuntimeResult<Value> {
        operators::apply_unary(op, operand, span)
    }

    pub fn read_indexed(
        &self,
        container: &Value,
        index: &SliceIndex,
        span: &Span,
    ) -> RuntimeResult<Value> {
        slice::read_indexed(container, index, span)
    }

    pub fn write_indexed(
        &self,
        container: &Value,
        index: &SliceIndex,
        rhs: Value,
        insert_mode: bool,
        span: &Span,
    ) -> RuntimeResult<()> {
        slice::write_indexed(container, index, rhs, insert_mode, span)
    }

    /// Reads `name` from the current frame or its enclosing frames.
    pub fn lookup(&self, name: &str, span: &Span) -> RuntimeResult<Value> {
        self.current()
            .borrow()
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownSymbol {
                span: span.clone(),
                name: name.to_string(),
            })
    }

    pub fn assign(&self, name: &str, value: Value) {
        self.current().borrow_mut().set(name, value);
    }

    /// Binds `value` under a fresh `temporary_*` name in the current frame
    /// and returns the name, for scratch bindings the statement interpreter
    /// introduces (loop iterators, desugared lambdas).
    pub fn bind_temporary(&self, value: Value) -> String {
        let frame = self.current();
        let mut name = random::temporary_id();
        while frame.borrow().get(&name).is_some() {
            name = random::temporary_id();
        }
        frame.borrow_mut().set(&name, value);
        name
    }

    /// `name op= rhs`: reads the visible binding, applies the operator and
    /// rebinds the result in the current frame.
    pub fn assign_op(
        &self,
        name: &str,
        op: AssignOp,
        rhs: Value,
        span: &Span,
    ) -> RuntimeResult<Value> {
        let current = self.lookup(name, span)?;
        let result = operators::apply_assign(op, current, rhs, span)?;
        self.assign(name, result.clone());
        Ok(result)
    }

    pub fn push_frame(
        &mut self,
        params: impl IntoIterator<Item = (String, Value)>,
        parent: Option<FrameRef>,
        span: &Span,
    ) -> RuntimeResult<FrameRef> {
        self.stack.push_frame(params, parent, span)
    }

    pub fn pop_frame(&mut self, callee: &FrameRef, caller: &FrameRef) {
        self.stack.pop_frame(callee, caller);
    }

    pub fn discard_frame(&mut self, callee: &FrameRef) {
        self.stack.discard_frame(callee);
    }

    /// Invokes a routine: binds `args` to its parameters in a fresh frame,
    /// runs `body` against that frame and returns the frame's return value
    /// (null when the body never returned). Same-named caller bindings are
    /// updated only when the body completes without error.
    pub fn call_routine<F>(
        &mut self,
        callable: &CallableValue,
        args: Vec<Value>,
        span: &Span,
        body: F,
    ) -> RuntimeResult<Value>
    where
        F: FnOnce(&mut Interpreter, &FrameRef) -> RuntimeResult<()>,
    {
        let routine = callable.routine.clone();
        if routine.params.len() != args.len() {
            return Err(RuntimeError::ArityMismatch {
                span: span.clone(),
                name: callable.name().to_string(),
                expected: routine.params.len(),
                received: args.len(),
            });
        }

        let caller = self.current();
        let parent = routine.captured.clone().unwrap_or_else(|| self.global());
        let params = routine.params.iter().cloned().zip(args);
        let frame = self.push_frame(params, Some(parent), span)?;

        match body(self, &frame) {
            Ok(()) => {
                let result = frame.borrow_mut().take_return().unwrap_or(Value::Null);
                self.pop_frame(&frame, &caller);
                Ok(result)
            }
            Err(err) => {
                // a pending raised value follows the error out to the caller
                if let Some(pending) = frame.borrow_mut().take_error() {
                    caller.borrow_mut().set_error(pending);
                }
                self.discard_frame(&frame);
                Err(err)
            }
        }
    }

    /// User-level `throw`: records `value` as the current frame's pending
    /// error and returns the error to unwind with.
    pub fn raise(&self, value: Value, span: &Span) -> RuntimeError {
        self.current().borrow_mut().set_error(value.clone());
        RuntimeError::Raised {
            span: span.clone(),
            value,
        }
    }

    /// Enters a parameterized handler for `error` in a new frame, binding the
    /// caught Value under `binding`. A raised error binds the pending value
    /// taken from the current frame, which clears it; internal errors bind
    /// their message. Leave the handler with [`Interpreter::pop_frame`].
    pub fn catch_error(
        &mut self,
        error: &RuntimeError,
        binding: Option<&str>,
        span: &Span,
    ) -> RuntimeResult<FrameRef> {
        let scope = self.current();
        let pending = scope.borrow_mut().take_error();
        let caught = match (error, pending) {
            (RuntimeError::Raised { .. }, Some(value)) => value,
            _ => error.to_value(),
        };
        let params = binding
            .map(|name| vec![(name.to_string(), caught)])
            .unwrap_or_default();
        tracing::debug!(kind = error.kind(), at = %error.span(), "entering error handler");
        self.push_frame(params, Some(scope), span)
    }

    pub fn dispatch_builtin(&self, name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
        builtins::dispatch(name, args, span)
    }

    pub fn dispatch_method(
        &self,
        name: &str,
        receiver: &Value,
        args: &[Value],
        span: &Span,
    ) -> RuntimeResult<Value> {
        builtins::dispatch_method(name, receiver, args, span)
    }
}
