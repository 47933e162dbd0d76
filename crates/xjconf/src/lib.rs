//! xjconf - schema-driven binding of XML documents to typed objects
//!
//! A [`Schema`] of tag definitions says which element becomes which type
//! and how its attributes convert. A [`TypeRegistry`] says how those types
//! are built. The [`Binder`] reads a document and populates the objects
//! bottom-up through the [`Bindable`] contract.
//!
//! # Quick Start
//!
//! ```
//! use xjconf::{AccessorError, AttributeDefinition, Bindable, Binder, Schema, TagDefinition,
//!     TypeRegistry, Value};
//!
//! #[derive(Debug, Default)]
//! struct Server {
//!     host: String,
//!     port: i32,
//! }
//!
//! impl Bindable for Server {
//!     fn set(&mut self, accessor: &str, value: Value) -> Result<(), AccessorError> {
//!         match accessor {
//!             "setHost" => self.host = value.try_into()?,
//!             "setPort" => self.port = value.try_into()?,
//!             other => return Err(AccessorError::NotFound(other.to_string())),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), xjconf::Error> {
//! let schema = Schema::new().with(
//!     TagDefinition::new("server", "app.Server")?
//!         .with_attribute(AttributeDefinition::typed("port", "int")?.required(true))?
//!         .with_attribute(AttributeDefinition::new("host")?.with_default("localhost"))?,
//! );
//! let mut registry = TypeRegistry::new();
//! registry.register_bindable::<Server>("app.Server");
//!
//! let value = Binder::new(&schema, &registry).bind_str(r#"<server port="8080"/>"#)?;
//! let server = value.downcast::<Server>().ok();
//! assert_eq!(server.map(|s| (s.host, s.port)), Some(("localhost".to_string(), 8080)));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod value;
pub use value::{AccessorError, Bindable, Instance, Value};

pub mod registry;
pub use registry::{LoadingContext, TypeHandle, TypeRegistry};

pub mod convert;
pub use convert::{Converter, Primitive, ValueType};

pub mod definition;
pub use definition::{accessor_name_for, AttributeDefinition, Definition, Schema, TagDefinition};

pub mod tag;
pub use tag::{Content, ParsedTag};

pub mod xml;
pub use xml::{Config, Event, EventSink, Reader, DEPTH_CEILING};

pub mod tree;
pub use tree::TreeBuilder;

pub mod include;
pub use include::{DocumentSource, FileSource, IncludeResolver, MemorySource};

pub mod defines;
pub use defines::{load_schema, load_schema_with_config};

pub mod binder;
pub use binder::{BindOptions, Binder, DuplicateKeys};

/// Bind `document` against `schema`, constructing types from `ctx`
pub fn bind_str(schema: &Schema, ctx: &dyn LoadingContext, document: &str) -> Result<Value> {
    Binder::new(schema, ctx).bind_str(document)
}

/// Bind `document` with custom options
pub fn bind_str_with_options(
    schema: &Schema,
    ctx: &dyn LoadingContext,
    document: &str,
    options: BindOptions,
) -> Result<Value> {
    Binder::new(schema, ctx)
        .with_options(options)
        .bind_str(document)
}
