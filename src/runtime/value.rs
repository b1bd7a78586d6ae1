use crate::runtime::environment::FrameRef;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Runtime value. Scalar arms are owned; container arms hold a shared handle,
/// so cloning a `Value` never copies list, map, object or routine storage.
/// Use [`Value::deep_clone`] when fresh storage is required.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(ListValue),
    Map(MapValue),
    Object(ObjectValue),
    Callable(CallableValue),
    Null,
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(ListValue::from_vec(items))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::List(list) => !list.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(_) | Value::Callable(_) => true,
            Value::Null => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Integer",
            Value::Float(_) => "Double",
            Value::Bool(_) => "Boolean",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Hash",
            Value::Object(_) => "Object",
            Value::Callable(_) => "Lambda",
            Value::Null => "None",
        }
    }

    /// Copy with fresh container storage all the way down. Routines are
    /// immutable once captured, so callables keep their handle. Shared and
    /// self-referencing containers keep their shape in the copy.
    pub fn deep_clone(&self) -> Value {
        self.deep_clone_with(&mut HashMap::new())
    }

    fn deep_clone_with(&self, copies: &mut HashMap<*const (), Value>) -> Value {
        let Some(handle) = self.handle() else {
            return self.clone();
        };
        if let Some(copy) = copies.get(&handle) {
            return copy.clone();
        }
        match self {
            Value::List(list) => {
                let copy = ListValue::new();
                copies.insert(handle, Value::List(copy.clone()));
                let items: Vec<Value> = list
                    .snapshot()
                    .iter()
                    .map(|item| item.deep_clone_with(copies))
                    .collect();
                *copy.items.borrow_mut() = items;
                Value::List(copy)
            }
            Value::Map(map) => {
                let copy = MapValue::new();
                copies.insert(handle, Value::Map(copy.clone()));
                let entries: Vec<(Value, Value)> = map
                    .entries
                    .borrow()
                    .clone()
                    .iter()
                    .map(|(key, value)| (key.deep_clone_with(copies), value.deep_clone_with(copies)))
                    .collect();
                *copy.entries.borrow_mut() = entries;
                Value::Map(copy)
            }
            Value::Object(object) => {
                let copy = ObjectValue::new(object.class.clone());
                copies.insert(handle, Value::Object(copy.clone()));
                let fields: Vec<(String, Value)> = object
                    .fields
                    .borrow()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                for (name, value) in fields {
                    let value = value.deep_clone_with(copies);
                    copy.set_field(&name, value);
                }
                Value::Object(copy)
            }
            other => other.clone(),
        }
    }

    /// Identity of the shared storage behind a container Value.
    fn handle(&self) -> Option<*const ()> {
        match self {
            Value::List(list) => Some(Rc::as_ptr(&list.items) as *const ()),
            Value::Map(map) => Some(Rc::as_ptr(&map.entries) as *const ()),
            Value::Object(object) => Some(Rc::as_ptr(&object.fields) as *const ()),
            _ => None,
        }
    }

    /// Structural equality: numbers compare by value across Int/Float,
    /// containers compare element-wise, callables by identity. A pair of
    /// containers already under comparison counts as equal, so cyclic
    /// structures terminate.
    pub fn same_as(&self, other: &Value) -> bool {
        self.same_as_tracked(other, &mut Vec::new())
    }

    fn same_as_tracked(&self, other: &Value, open: &mut Vec<(*const (), *const ())>) -> bool {
        let pair = match (self.handle(), other.handle()) {
            (Some(a), Some(b)) if a == b => return true,
            (Some(a), Some(b)) => {
                if open.contains(&(a, b)) {
                    return true;
                }
                open.push((a, b));
                Some((a, b))
            }
            _ => None,
        };
        let equal = match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => {
                let left = a.items.borrow();
                let right = b.items.borrow();
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(l, r)| l.same_as_tracked(r, open))
            }
            (Value::Map(a), Value::Map(b)) => {
                let left = a.entries.borrow();
                let right = b.entries.borrow();
                left.len() == right.len()
                    && left.iter().all(|(key, value)| {
                        let found = right
                            .iter()
                            .find(|(candidate, _)| candidate.same_as_tracked(key, open));
                        match found {
                            Some((_, other)) => value.same_as_tracked(other, open),
                            None => false,
                        }
                    })
            }
            (Value::Object(a), Value::Object(b)) => {
                let left = a.fields.borrow();
                let right = b.fields.borrow();
                a.class.name == b.class.name
                    && left.len() == right.len()
                    && left.iter().all(|(name, value)| {
                        right
                            .get(name)
                            .is_some_and(|other| value.same_as_tracked(other, open))
                    })
            }
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(&a.routine, &b.routine),
            _ => false,
        };
        if pair.is_some() {
            open.pop();
        }
        equal
    }

    /// Canonical text. Strings are quoted inside containers, and a container
    /// reached again while it is being printed shows as `[...]` or `{...}`.
    fn write_to(
        &self,
        f: &mut fmt::Formatter<'_>,
        nested: bool,
        open: &mut Vec<*const ()>,
    ) -> fmt::Result {
        if let Some(handle) = self.handle() {
            if open.contains(&handle) {
                return match self {
                    Value::Map(_) => write!(f, "{{...}}"),
                    _ => write!(f, "[...]"),
                };
            }
        }
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) if nested => write!(f, "\"{v}\""),
            Value::String(v) => write!(f, "{v}"),
            Value::Null => write!(f, "null"),
            Value::List(list) => {
                open.push(Rc::as_ptr(&list.items) as *const ());
                write!(f, "[")?;
                for (idx, value) in list.items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    value.write_to(f, true, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Map(map) => {
                open.push(Rc::as_ptr(&map.entries) as *const ());
                write!(f, "{{")?;
                for (idx, (key, value)) in map.entries.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    key.write_to(f, true, open)?;
                    write!(f, ": ")?;
                    value.write_to(f, true, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "<{}>", object.class.name),
            Value::Callable(callable) => match &callable.routine.kind {
                RoutineKind::Function { name } => write!(f, "<fn {name}>"),
                RoutineKind::Lambda => write!(f, "<lambda>"),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false, &mut Vec::new())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ListValue {
    pub items: Rc<RefCell<Vec<Value>>>,
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Shallow copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ListValue) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

/// Insertion-ordered map keyed by structural equality.
#[derive(Clone, Debug, Default)]
pub struct MapValue {
    pub entries: Rc<RefCell<Vec<(Value, Value)>>>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: Value, value: Value) {
        // the key may hold this map, so compare before borrowing mutably
        let position = self
            .entries
            .borrow()
            .iter()
            .position(|(existing, _)| existing.same_as(&key));
        let mut entries = self.entries.borrow_mut();
        match position {
            Some(idx) => entries[idx].1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| existing.same_as(key))
            .map(|(_, value)| value.clone())
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(existing, _)| existing.same_as(key))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Field layout is owned by the class model; the runtime only needs the name.
#[derive(Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct ObjectValue {
    pub class: Rc<ClassInfo>,
    pub fields: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl ObjectValue {
    pub fn new(class: Rc<ClassInfo>) -> Self {
        Self {
            class,
            fields: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    pub fn get_field(&self, field: &str) -> Option<Value> {
        self.fields.borrow().get(field).cloned()
    }

    pub fn set_field(&self, field: &str, value: Value) {
        self.fields.borrow_mut().insert(field.to_string(), value);
    }
}

/// Opaque handle to a routine body held by the statement interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyRef(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutineKind {
    Function { name: String },
    Lambda,
}

pub struct Routine {
    pub kind: RoutineKind,
    pub params: Vec<String>,
    pub body: BodyRef,
    pub captured: Option<FrameRef>,
}

#[derive(Clone)]
pub struct CallableValue {
    pub routine: Rc<Routine>,
}

impl CallableValue {
    pub fn function(name: impl Into<String>, params: Vec<String>, body: BodyRef) -> Self {
        Self {
            routine: Rc::new(Routine {
                kind: RoutineKind::Function { name: name.into() },
                params,
                body,
                captured: None,
            }),
        }
    }

    pub fn lambda(params: Vec<String>, body: BodyRef, captured: FrameRef) -> Self {
        Self {
            routine: Rc::new(Routine {
                kind: RoutineKind::Lambda,
                params,
                body,
                captured: Some(captured),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match &self.routine.kind {
            RoutineKind::Function { name } => name,
            RoutineKind::Lambda => "<lambda>",
        }
    }
}

// The captured frame may hold this callable; printing it would recurse.
impl fmt::Debug for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableValue")
            .field("kind", &self.routine.kind)
            .field("params", &self.routine.params)
            .field("body", &self.routine.body)
            .finish()
    }
}
