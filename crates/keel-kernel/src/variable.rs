//! Typed, named data slots attached to objects or nested in other
//! variables.
//!
//! A variable is a name plus a typed payload, an attribute sub-list
//! (metadata keyed the same way), and — for [`VariableValue::Nested`]
//! payloads — an ordered list of child variables that may repeat names
//! (a vessel's cross-section list is many variables called `"section"`).
//!
//! Structural mutation (adding nested variables or attributes) follows
//! the owning object's lifecycle and thread-affinity rules and therefore
//! goes through [`System`] methods; value mutation is allowed at any
//! time through the accessors here.
//!
//! [`System`]: crate::System

use keel_core::{KernelError, ObjectId};
use keel_math::{FrameQuat, FrameVector};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Longest accepted variable name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Who a variable belongs to, for affinity and lifecycle checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableOwner {
    /// Attached (directly or through nesting) to a simulation object.
    Object(ObjectId),
    /// Part of a system database; structurally mutable at any time.
    Database,
}

/// Type tag of a variable payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    /// A scalar `f64`.
    Real,
    /// A UTF-8 string.
    String,
    /// A frame-tagged vector.
    Vector,
    /// A frame-tagged quaternion.
    Quaternion,
    /// An ordered group of child variables.
    Nested,
    /// Raw interpolation-table payload, evaluated externally.
    Table,
    /// Opaque shared data.
    Data,
    /// Opaque callback payload.
    Callback,
}

/// Raw payload of an interpolation-table variable.
///
/// The kernel stores the samples verbatim; the multi-dimensional
/// function evaluator that interprets them is an external collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableData {
    /// Number of interpolation dimensions.
    pub dimensions: u8,
    /// Flattened sample data in the evaluator's layout.
    pub samples: Vec<f64>,
}

/// Opaque callback payload carried by [`VariableValue::Callback`].
pub type CallbackPayload = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Opaque data payload carried by [`VariableValue::Data`].
pub type DataPayload = Arc<dyn Any + Send + Sync>;

/// A variable's typed payload.
pub enum VariableValue {
    /// A scalar.
    Real(f64),
    /// A string.
    String(String),
    /// A frame-tagged vector.
    Vector(FrameVector),
    /// A frame-tagged quaternion.
    Quaternion(FrameQuat),
    /// Ordered child variables; names may repeat.
    Nested(Vec<Arc<Variable>>),
    /// Interpolation-table payload.
    Table(TableData),
    /// Opaque data pointer.
    Data(Option<DataPayload>),
    /// Opaque callback pointer.
    Callback(Option<CallbackPayload>),
}

impl VariableValue {
    /// Default payload for a freshly created variable of `kind`.
    #[must_use]
    pub fn empty(kind: VariableKind, frame: ObjectId) -> Self {
        match kind {
            VariableKind::Real => Self::Real(0.0),
            VariableKind::String => Self::String(String::new()),
            VariableKind::Vector => Self::Vector(FrameVector::zero(frame)),
            VariableKind::Quaternion => Self::Quaternion(FrameQuat::identity(frame)),
            VariableKind::Nested => Self::Nested(Vec::new()),
            VariableKind::Table => Self::Table(TableData::default()),
            VariableKind::Data => Self::Data(None),
            VariableKind::Callback => Self::Callback(None),
        }
    }

    /// The payload's type tag.
    #[must_use]
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Real(_) => VariableKind::Real,
            Self::String(_) => VariableKind::String,
            Self::Vector(_) => VariableKind::Vector,
            Self::Quaternion(_) => VariableKind::Quaternion,
            Self::Nested(_) => VariableKind::Nested,
            Self::Table(_) => VariableKind::Table,
            Self::Data(_) => VariableKind::Data,
            Self::Callback(_) => VariableKind::Callback,
        }
    }
}

impl fmt::Debug for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(v) => write!(f, "Real({v})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Vector(v) => write!(f, "Vector({:?})", v.v),
            Self::Quaternion(q) => write!(f, "Quaternion({:?})", q.q),
            Self::Nested(n) => write!(f, "Nested(len={})", n.len()),
            Self::Table(t) => write!(f, "Table(dims={}, len={})", t.dimensions, t.samples.len()),
            Self::Data(d) => write!(f, "Data(present={})", d.is_some()),
            Self::Callback(c) => write!(f, "Callback(present={})", c.is_some()),
        }
    }
}

/// A typed, named data slot.
///
/// Handed out as `Arc<Variable>`; values are behind an internal lock so
/// concurrently reading threads never observe a torn write.
pub struct Variable {
    name: String,
    owner: VariableOwner,
    value: RwLock<VariableValue>,
    attributes: RwLock<Vec<Arc<Variable>>>,
}

impl Variable {
    /// Crate-internal constructor; external creation goes through
    /// [`System`](crate::System) so affinity and lifecycle are checked.
    pub(crate) fn new(
        name: &str,
        owner: VariableOwner,
        value: VariableValue,
    ) -> Result<Arc<Self>, KernelError> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(KernelError::BadParameter);
        }
        Ok(Arc::new(Self {
            name: name.to_owned(),
            owner,
            value: RwLock::new(value),
            attributes: RwLock::new(Vec::new()),
        }))
    }

    /// The variable's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's owner, for affinity checks.
    #[must_use]
    pub fn owner(&self) -> VariableOwner {
        self.owner
    }

    /// The payload's current type tag.
    #[must_use]
    pub fn kind(&self) -> VariableKind {
        self.value.read().unwrap().kind()
    }

    /// Read the scalar payload.
    pub fn as_real(&self) -> Result<f64, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Real(v) => Ok(*v),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the scalar payload.
    pub fn set_real(&self, v: f64) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Real, VariableValue::Real(v))
    }

    /// Read the string payload.
    pub fn as_string(&self) -> Result<String, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::String(s) => Ok(s.clone()),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the string payload.
    pub fn set_string(&self, s: impl Into<String>) -> Result<(), KernelError> {
        self.set_checked(VariableKind::String, VariableValue::String(s.into()))
    }

    /// Read the vector payload.
    pub fn as_vector(&self) -> Result<FrameVector, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Vector(v) => Ok(*v),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the vector payload.
    pub fn set_vector(&self, v: FrameVector) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Vector, VariableValue::Vector(v))
    }

    /// Read the quaternion payload.
    pub fn as_quaternion(&self) -> Result<FrameQuat, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Quaternion(q) => Ok(*q),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the quaternion payload.
    pub fn set_quaternion(&self, q: FrameQuat) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Quaternion, VariableValue::Quaternion(q))
    }

    /// Read the table payload.
    pub fn as_table(&self) -> Result<TableData, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Table(t) => Ok(t.clone()),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the table payload.
    pub fn set_table(&self, t: TableData) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Table, VariableValue::Table(t))
    }

    /// Read the opaque data payload.
    pub fn as_data(&self) -> Result<Option<DataPayload>, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Data(d) => Ok(d.clone()),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the opaque data payload.
    pub fn set_data(&self, d: Option<DataPayload>) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Data, VariableValue::Data(d))
    }

    /// Read the callback payload.
    pub fn as_callback(&self) -> Result<Option<CallbackPayload>, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Callback(c) => Ok(c.clone()),
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Replace the callback payload.
    pub fn set_callback(&self, c: Option<CallbackPayload>) -> Result<(), KernelError> {
        self.set_checked(VariableKind::Callback, VariableValue::Callback(c))
    }

    /// First nested variable with the given name.
    pub fn nested(&self, name: &str) -> Result<Arc<Variable>, KernelError> {
        self.nested_all(name)
            .into_iter()
            .next()
            .ok_or(KernelError::NotFound)
    }

    /// All nested variables with the given name, in insertion order.
    #[must_use]
    pub fn nested_all(&self, name: &str) -> Vec<Arc<Variable>> {
        match &*self.value.read().unwrap() {
            VariableValue::Nested(list) => list
                .iter()
                .filter(|v| v.name == name)
                .map(Arc::clone)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested variable at `index` in insertion order.
    pub fn nested_at(&self, index: usize) -> Result<Arc<Variable>, KernelError> {
        match &*self.value.read().unwrap() {
            VariableValue::Nested(list) => {
                list.get(index).map(Arc::clone).ok_or(KernelError::NotFound)
            }
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Snapshot of all nested variables in insertion order.
    #[must_use]
    pub fn nested_list(&self) -> Vec<Arc<Variable>> {
        match &*self.value.read().unwrap() {
            VariableValue::Nested(list) => list.iter().map(Arc::clone).collect(),
            _ => Vec::new(),
        }
    }

    /// Attribute with the given name.
    pub fn attribute(&self, name: &str) -> Result<Arc<Variable>, KernelError> {
        self.attributes
            .read()
            .unwrap()
            .iter()
            .find(|a| a.name == name)
            .map(Arc::clone)
            .ok_or(KernelError::NotFound)
    }

    /// Snapshot of all attributes in insertion order.
    #[must_use]
    pub fn attribute_list(&self) -> Vec<Arc<Variable>> {
        self.attributes.read().unwrap().iter().map(Arc::clone).collect()
    }

    /// Append a nested variable. Affinity is checked by the caller
    /// ([`System`](crate::System)).
    pub(crate) fn push_nested(&self, child: Arc<Variable>) -> Result<(), KernelError> {
        match &mut *self.value.write().unwrap() {
            VariableValue::Nested(list) => {
                list.push(child);
                Ok(())
            }
            _ => Err(KernelError::InvalidType),
        }
    }

    /// Append or replace an attribute by name. Affinity is checked by
    /// the caller.
    pub(crate) fn push_attribute(&self, attr: Arc<Variable>) {
        let mut attrs = self.attributes.write().unwrap();
        if let Some(existing) = attrs.iter_mut().find(|a| a.name == attr.name) {
            *existing = attr;
        } else {
            attrs.push(attr);
        }
    }

    /// Replace the payload, requiring the existing tag to match.
    fn set_checked(&self, kind: VariableKind, value: VariableValue) -> Result<(), KernelError> {
        let mut guard = self.value.write().unwrap();
        if guard.kind() != kind {
            return Err(KernelError::InvalidType);
        }
        *guard = value;
        Ok(())
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("value", &*self.value.read().unwrap())
            .finish_non_exhaustive()
    }
}
