//! Execution-side types: the context seam, host libraries, and compiled functions.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;

use super::error::ExecError;
use super::value::Value;

/// One segment of a context path such as `ctx.V[3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(Arc<str>),
    Index(i64),
}

impl Key {
    pub(crate) fn from_value(value: Value) -> Result<Self, ExecError> {
        match value {
            Value::Int(index) => Ok(Key::Index(index)),
            Value::Str(name) => Ok(Key::Name(name)),
            other => Err(ExecError::InvalidKey(other.type_name())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, ".{name}"),
            Key::Index(index) => write!(f, "[{index}]"),
        }
    }
}

pub fn render_path(path: &[Key]) -> String {
    let mut rendered = String::from("ctx");
    for key in path {
        rendered.push_str(&key.to_string());
    }
    rendered
}

/// Machine state visible to compiled semantics under the `ctx` root.
pub trait Context {
    fn load(&mut self, path: &[Key]) -> Result<Value, ExecError>;
    fn store(&mut self, path: &[Key], value: Value) -> Result<(), ExecError>;
}

#[derive(Debug, Clone)]
enum Slot {
    Scalar(Value),
    Array(Vec<Value>),
}

/// Flat context of named scalars and fixed-length arrays.
///
/// Paths are either `ctx.name` or `ctx.name[index]`. Scalars may be created by a store;
/// arrays are sized up front and never grow.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    slots: AHashMap<String, Slot>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_array(mut self, name: impl Into<String>, len: usize) -> Self {
        self.slots
            .insert(name.into(), Slot::Array(vec![Value::Int(0); len]));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(name.into(), Slot::Scalar(value.into()));
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.slots.get(name)? {
            Slot::Scalar(value) => Some(value),
            Slot::Array(_) => None,
        }
    }

    pub fn array(&self, name: &str) -> Option<&[Value]> {
        match self.slots.get(name)? {
            Slot::Array(values) => Some(values),
            Slot::Scalar(_) => None,
        }
    }

    pub fn array_mut(&mut self, name: &str) -> Option<&mut [Value]> {
        match self.slots.get_mut(name)? {
            Slot::Array(values) => Some(values),
            Slot::Scalar(_) => None,
        }
    }

    pub fn element(&self, name: &str, index: usize) -> Option<&Value> {
        self.array(name)?.get(index)
    }

    /// Integer view of a scalar, for callers inspecting machine state.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.scalar(name)?.as_int().ok()
    }

    fn element_mut(&mut self, path: &[Key]) -> Result<&mut Value, ExecError> {
        let unknown = || ExecError::UnknownPath(render_path(path));
        let [Key::Name(name), Key::Index(index)] = path else {
            return Err(unknown());
        };
        let Some(Slot::Array(values)) = self.slots.get_mut(name.as_ref()) else {
            return Err(unknown());
        };
        usize::try_from(*index)
            .ok()
            .and_then(|index| values.get_mut(index))
            .ok_or_else(unknown)
    }
}

impl Context for MapContext {
    fn load(&mut self, path: &[Key]) -> Result<Value, ExecError> {
        if let [Key::Name(name)] = path {
            return match self.slots.get(name.as_ref()) {
                Some(Slot::Scalar(value)) => Ok(value.clone()),
                Some(Slot::Array(_)) => Err(ExecError::Type {
                    expected: "scalar",
                    found: "array",
                }),
                None => Err(ExecError::UnknownPath(render_path(path))),
            };
        }
        self.element_mut(path).map(|value| value.clone())
    }

    fn store(&mut self, path: &[Key], value: Value) -> Result<(), ExecError> {
        if let [Key::Name(name)] = path {
            return match self.slots.get_mut(name.as_ref()) {
                Some(Slot::Array(_)) => Err(ExecError::Type {
                    expected: "scalar",
                    found: "array",
                }),
                Some(Slot::Scalar(slot)) => {
                    *slot = value;
                    Ok(())
                }
                None => {
                    self.slots.insert(name.to_string(), Slot::Scalar(value));
                    Ok(())
                }
            };
        }
        *self.element_mut(path)? = value;
        Ok(())
    }
}

pub type HostFn =
    Arc<dyn Fn(&mut dyn Context, &[Value]) -> Result<Value, ExecError> + Send + Sync>;

#[derive(Clone)]
pub enum LibEntry {
    Function(HostFn),
    Constructor(HostFn),
}

impl fmt::Debug for LibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibEntry::Function(_) => f.write_str("Function(..)"),
            LibEntry::Constructor(_) => f.write_str("Constructor(..)"),
        }
    }
}

/// Named host entries a program may reach through `$name`.
#[derive(Clone, Default)]
pub struct Library {
    entries: AHashMap<String, LibEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn Context, &[Value]) -> Result<Value, ExecError> + Send + Sync + 'static,
    {
        self.insert(name, LibEntry::Function(Arc::new(body)));
        self
    }

    pub fn constructor<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn Context, &[Value]) -> Result<Value, ExecError> + Send + Sync + 'static,
    {
        self.insert(name, LibEntry::Constructor(Arc::new(body)));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: LibEntry) -> Option<LibEntry> {
        self.entries.insert(name.into(), entry)
    }

    /// Merges `other` into `self`; entries in `other` win on name clashes.
    pub fn extend(mut self, other: Library) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, name: &str) -> Option<&LibEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LibEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Library").field("entries", &names).finish()
    }
}

type Body = dyn Fn(&mut dyn Context, &mut [Value]) -> Result<(), ExecError> + Send + Sync;

/// A program lowered to a native closure over `(ctx, ops)`.
#[derive(Clone)]
pub struct CompiledFn {
    name: Arc<str>,
    body: Arc<Body>,
}

impl CompiledFn {
    pub(crate) fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut dyn Context, &mut [Value]) -> Result<(), ExecError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the function. `ops` is mutable: assignments to `ops[i]` land in the caller's slice.
    pub fn call(&self, ctx: &mut dyn Context, ops: &mut [Value]) -> Result<(), ExecError> {
        (self.body)(ctx, ops)
    }

    pub fn ptr_eq(&self, other: &CompiledFn) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for CompiledFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFn").field("name", &self.name).finish()
    }
}

/// Per-invocation state threaded through compiled thunks.
pub(crate) struct Frame<'run, 'ctx> {
    pub ctx: &'run mut (dyn Context + 'ctx),
    pub ops: &'run mut [Value],
    pub locals: SmallVec<[Value; 8]>,
}
