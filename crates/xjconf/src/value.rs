//! Converted values and the contract bound objects implement

use std::any::{type_name, Any};
use std::fmt;

use thiserror::Error;

/// A converted attribute value, text content or bound object
#[derive(Debug)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    /// Object built by a registered constructor or by binding an element
    Object(Instance),
}

impl Value {
    /// Returns the string value if this is a string, None otherwise
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object if this is an object, None otherwise
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Short name of the variant, used in mismatch reports
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::Object(o) => o.type_name(),
        }
    }

    /// Move the wrapped object out as a concrete type
    pub fn downcast<T: Any>(self) -> Result<T, AccessorError> {
        match self {
            Self::Object(instance) => instance.downcast(),
            other => Err(AccessorError::mismatch(type_name::<T>(), &other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Object(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::Object(value)
    }
}

macro_rules! primitive_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = AccessorError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(AccessorError::mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

primitive_conversions! {
    Bool => bool,
    Byte => i8,
    Short => i16,
    Int => i32,
    Long => i64,
    Float => f32,
    Double => f64,
    Char => char,
}

impl TryFrom<Value> for String {
    type Error = AccessorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(AccessorError::mismatch("String", &other)),
        }
    }
}

/// Type-erased object together with the schema type name it was built for
pub struct Instance {
    type_name: String,
    inner: Box<dyn Any>,
}

impl Instance {
    pub fn new(type_name: impl Into<String>, inner: Box<dyn Any>) -> Self {
        Self {
            type_name: type_name.into(),
            inner,
        }
    }

    /// Schema type name the object was constructed for
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Move the object out as a concrete type
    pub fn downcast<T: Any>(self) -> Result<T, AccessorError> {
        match self.inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(_) => Err(AccessorError::TypeMismatch {
                expected: type_name::<T>().to_string(),
                found: self.type_name,
            }),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Failure reported by a [`Bindable`] accessor
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AccessorError {
    #[error("no accessor named '{0}'")]
    NotFound(String),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("{0}")]
    Rejected(String),
}

impl AccessorError {
    pub fn mismatch(expected: &str, found: &Value) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind_name().to_string(),
        }
    }
}

/// Upcast helper so bound objects can travel as [`Instance`]s
pub trait IntoAny: Any {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> IntoAny for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Populate contract of objects the binder instantiates.
///
/// The binder constructs an object through its registered factory, then
/// hands it converted attribute values through [`Bindable::set`] and bound
/// children through [`Bindable::add_child`] or
/// [`Bindable::add_keyed_child`], depending on whether the element's
/// definition keeps children indexed.
pub trait Bindable: IntoAny {
    /// Invoke the accessor named `accessor` (e.g. `setPort`) with `value`
    fn set(&mut self, accessor: &str, value: Value) -> Result<(), AccessorError>;

    /// Append a child in document order
    fn add_child(&mut self, _child: Value) -> Result<(), AccessorError> {
        Err(AccessorError::NotFound("addChild".to_string()))
    }

    /// Store a child under its key
    fn add_keyed_child(&mut self, key: &str, _child: Value) -> Result<(), AccessorError> {
        Err(AccessorError::NotFound(format!("addChild({key})")))
    }
}
