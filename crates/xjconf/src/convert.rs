//! Text-to-value converters owned by attribute and value-tag definitions

use std::any::TypeId;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::registry::LoadingContext;
use crate::value::{Instance, Value};

/// Primitive kinds with built-in text parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
}

impl Primitive {
    /// Keyword used for this kind in schema type names
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    /// Look up a primitive by schema keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "boolean" | "bool" => Some(Self::Bool),
            "byte" => Some(Self::Byte),
            "short" => Some(Self::Short),
            "int" | "integer" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "char" | "character" => Some(Self::Char),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Parse `text` per this kind's standard rule
    pub fn parse(self, text: &str) -> std::result::Result<Value, String> {
        fn number<T>(text: &str) -> std::result::Result<T, String>
        where
            T: FromStr,
            T::Err: fmt::Display,
        {
            text.parse::<T>().map_err(|err| err.to_string())
        }

        match self {
            Self::Bool => parse_bool(text).map(Value::Bool),
            Self::Byte => number(text).map(Value::Byte),
            Self::Short => number(text).map(Value::Short),
            Self::Int => number(text).map(Value::Int),
            Self::Long => number(text).map(Value::Long),
            Self::Float => number(text).map(Value::Float),
            Self::Double => number(text).map(Value::Double),
            Self::Char => parse_char(text).map(Value::Char),
            Self::String => Ok(Value::String(text.to_string())),
        }
    }

    fn type_id(self) -> TypeId {
        match self {
            Self::Bool => TypeId::of::<bool>(),
            Self::Byte => TypeId::of::<i8>(),
            Self::Short => TypeId::of::<i16>(),
            Self::Int => TypeId::of::<i32>(),
            Self::Long => TypeId::of::<i64>(),
            Self::Float => TypeId::of::<f32>(),
            Self::Double => TypeId::of::<f64>(),
            Self::Char => TypeId::of::<char>(),
            Self::String => TypeId::of::<String>(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

fn parse_bool(text: &str) -> std::result::Result<bool, String> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err("expected 'true' or 'false'".to_string())
    }
}

fn parse_char(text: &str) -> std::result::Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err("expected exactly one character".to_string()),
    }
}

/// Resolved target of a converter, used to match accessor signatures
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueType {
    pub name: String,
    pub type_id: TypeId,
}

/// Converter selected from a schema type name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Converter {
    Primitive(Primitive),
    /// Named type built from a single string through the loading context
    Object(String),
}

impl Converter {
    /// Primitive keywords select a primitive converter, any other name
    /// refers to a registered type.
    pub fn for_type(type_name: &str) -> Self {
        match Primitive::from_keyword(type_name) {
            Some(primitive) => Self::Primitive(primitive),
            None => Self::Object(type_name.to_string()),
        }
    }

    /// Type name this converter produces
    pub fn target(&self) -> &str {
        match self {
            Self::Primitive(p) => p.keyword(),
            Self::Object(name) => name,
        }
    }

    /// Convert `text`; the error carries a reason for the caller to wrap
    pub fn convert(
        &self,
        text: &str,
        ctx: &dyn LoadingContext,
    ) -> std::result::Result<Value, String> {
        match self {
            Self::Primitive(p) => p.parse(text),
            Self::Object(name) => {
                let handle = ctx
                    .resolve(name)
                    .ok_or_else(|| format!("type '{name}' is not registered"))?;
                let object = handle
                    .parse(text)
                    .ok_or_else(|| format!("type '{name}' has no string constructor"))??;
                Ok(Value::Object(Instance::new(name.clone(), object)))
            }
        }
    }

    /// Resolve the produced type; an unknown name is a schema error
    pub fn value_type(&self, ctx: &dyn LoadingContext) -> Result<ValueType> {
        match self {
            Self::Primitive(p) => Ok(ValueType {
                name: p.keyword().to_string(),
                type_id: p.type_id(),
            }),
            Self::Object(name) => ctx
                .resolve(name)
                .map(|handle| ValueType {
                    name: name.clone(),
                    type_id: handle.type_id(),
                })
                .ok_or_else(|| Error::configuration(format!("type '{name}' is not registered"))),
        }
    }
}
