//! Name-to-type registry consulted while converting and binding

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::value::Bindable;

type ConstructFn = dyn Fn() -> Box<dyn Bindable> + Send + Sync;
type ParseFn = dyn Fn(&str) -> Result<Box<dyn Any>, String> + Send + Sync;

/// Resolves schema type names to constructible types
pub trait LoadingContext {
    fn resolve(&self, name: &str) -> Option<&TypeHandle>;
}

/// Everything the binder can do with one registered type
pub struct TypeHandle {
    name: String,
    rust_name: &'static str,
    type_id: TypeId,
    construct: Option<Box<ConstructFn>>,
    parse: Option<Box<ParseFn>>,
}

impl TypeHandle {
    /// Schema name the type was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type path, for diagnostics
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// True when elements can instantiate this type
    pub fn is_bindable(&self) -> bool {
        self.construct.is_some()
    }

    /// True when attribute text can be turned into this type
    pub fn is_parsable(&self) -> bool {
        self.parse.is_some()
    }

    /// Parameterless construction for the populate phase
    pub fn construct(&self) -> Option<Box<dyn Bindable>> {
        self.construct.as_ref().map(|f| f())
    }

    /// Single-string construction used by attribute conversion
    pub fn parse(&self, text: &str) -> Option<Result<Box<dyn Any>, String>> {
        self.parse.as_ref().map(|f| f(text))
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.name)
            .field("rust_name", &self.rust_name)
            .field("bindable", &self.is_bindable())
            .field("parsable", &self.is_parsable())
            .finish()
    }
}

/// Registry populated while the schema is assembled and only read afterwards
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeHandle>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type elements can instantiate with `T::default()`
    pub fn register_bindable<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: Bindable + Default,
    {
        let handle = self.entry::<T>(name.into());
        handle.construct = Some(Box::new(|| Box::new(T::default()) as Box<dyn Bindable>));
        self
    }

    /// Register a type attribute text converts to through [`FromStr`]
    pub fn register_parse<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: FromStr + Any,
        T::Err: fmt::Display,
    {
        self.register_constructor::<T, _>(name, |text| {
            text.parse::<T>().map_err(|err| err.to_string())
        })
    }

    /// Register an explicit single-string constructor
    pub fn register_constructor<T, F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        T: Any,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let handle = self.entry::<T>(name.into());
        handle.parse = Some(Box::new(move |text: &str| {
            constructor(text).map(|value| Box::new(value) as Box<dyn Any>)
        }));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // Re-registering under the same name with another Rust type replaces
    // the handle; the same type accumulates capabilities.
    fn entry<T: Any>(&mut self, name: String) -> &mut TypeHandle {
        let type_id = TypeId::of::<T>();
        let handle = self
            .types
            .entry(name.clone())
            .or_insert_with(|| TypeHandle {
                name: name.clone(),
                rust_name: type_name::<T>(),
                type_id,
                construct: None,
                parse: None,
            });
        if handle.type_id != type_id {
            *handle = TypeHandle {
                name,
                rust_name: type_name::<T>(),
                type_id,
                construct: None,
                parse: None,
            };
        }
        handle
    }
}

impl LoadingContext for TypeRegistry {
    fn resolve(&self, name: &str) -> Option<&TypeHandle> {
        self.types.get(name)
    }
}
