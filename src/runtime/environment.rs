use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type FrameRef = Rc<RefCell<Frame>>;

/// One routine activation: its variables, the enclosing frame used for
/// lexical lookup, and the pending error/return slots.
#[derive(Debug, Default)]
pub struct Frame {
    variables: HashMap<String, Value>,
    parent: Option<FrameRef>,
    error: Option<Value>,
    return_value: Option<Value>,
}

impl Frame {
    pub fn new(parent: Option<FrameRef>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    pub fn into_ref(self) -> FrameRef {
        Rc::new(RefCell::new(self))
    }

    pub fn parent(&self) -> Option<FrameRef> {
        self.parent.clone()
    }

    /// Binds `name` in this frame, replacing any previous local binding.
    pub fn set(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn local(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    /// Looks `name` up here, then through the enclosing frames.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        let mut next = self.parent.clone();
        while let Some(frame) = next {
            let frame = frame.borrow();
            if let Some(value) = frame.variables.get(name) {
                return Some(value.clone());
            }
            next = frame.parent.clone();
        }
        None
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.variables.keys()
    }

    pub fn set_error(&mut self, error: Value) {
        self.error = Some(error);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(&mut self) -> Option<Value> {
        self.error.take()
    }

    pub fn set_return(&mut self, value: Value) {
        self.return_value = Some(value);
    }

    pub fn has_return(&self) -> bool {
        self.return_value.is_some()
    }

    pub fn take_return(&mut self) -> Option<Value> {
        self.return_value.take()
    }
}

/// Overwrites every caller binding whose name also exists in the callee with
/// the callee's final value. Names the caller lacks are not introduced.
pub fn propagate_to_caller(callee: &FrameRef, caller: &FrameRef) {
    if Rc::ptr_eq(callee, caller) {
        return;
    }
    let callee = callee.borrow();
    let mut caller = caller.borrow_mut();
    for (name, value) in callee.variables.iter() {
        if let Some(slot) = caller.variables.get_mut(name) {
            tracing::trace!(name = %name, "copy-back into caller frame");
            *slot = value.clone();
        }
    }
}

/// Strict stack of activations. The bottom frame is the program's global
/// scope and is never popped.
pub struct CallStack {
    frames: Vec<FrameRef>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: vec![Frame::new(None).into_ref()],
            max_depth,
        }
    }

    pub fn global(&self) -> FrameRef {
        self.frames[0].clone()
    }

    pub fn current(&self) -> FrameRef {
        match self.frames.last() {
            Some(frame) => frame.clone(),
            None => self.global(),
        }
    }

    /// Number of routine frames above the global frame.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn push_frame(
        &mut self,
        params: impl IntoIterator<Item = (String, Value)>,
        parent: Option<FrameRef>,
        span: &Span,
    ) -> RuntimeResult<FrameRef> {
        if self.depth() >= self.max_depth {
            tracing::warn!(limit = self.max_depth, at = %span, "call depth limit reached");
            return Err(RuntimeError::StackOverflow {
                span: span.clone(),
                limit: self.max_depth,
            });
        }
        let mut frame = Frame::new(parent);
        for (name, value) in params {
            frame.set(&name, value);
        }
        let frame = frame.into_ref();
        self.frames.push(frame.clone());
        tracing::trace!(depth = self.depth(), "frame pushed");
        Ok(frame)
    }

    /// Normal exit: copies same-named bindings back into `caller`, then
    /// removes `callee` from the stack.
    pub fn pop_frame(&mut self, callee: &FrameRef, caller: &FrameRef) {
        propagate_to_caller(callee, caller);
        self.discard_frame(callee);
    }

    /// Error-unwind exit: removes `callee` without copy-back.
    pub fn discard_frame(&mut self, callee: &FrameRef) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(pos) = self.frames.iter().rposition(|frame| Rc::ptr_eq(frame, callee)) {
            if pos > 0 {
                self.frames.truncate(pos);
            }
        }
        tracing::trace!(depth = self.depth(), "frame popped");
    }
}
