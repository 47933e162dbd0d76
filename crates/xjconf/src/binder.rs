//! Recursive binding of a parsed tag tree into objects

use std::collections::HashSet;

use tracing::{debug, instrument, trace, warn};

use crate::definition::{Schema, TagDefinition};
use crate::error::{Error, ErrorKind, Result};
use crate::include::{DocumentSource, IncludeResolver};
use crate::registry::LoadingContext;
use crate::tag::ParsedTag;
use crate::tree::TreeBuilder;
use crate::value::{AccessorError, Bindable, Instance, Value};
use crate::xml::reader::effective_depth;
use crate::xml::{Config, Reader};

/// What to do when keyed children share a key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateKeys {
    /// Hand every child over; the target keeps the last one
    #[default]
    LastWins,
    /// Fail the bind on the second child with the same key
    Reject,
}

/// Binding options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindOptions {
    pub duplicate_keys: DuplicateKeys,
    /// Maximum element depth bound (0 means [`DEPTH_CEILING`](crate::DEPTH_CEILING))
    pub max_depth: u16,
    /// Limits for reading documents
    pub reader: Config,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicateKeys::default(),
            max_depth: 128,
            reader: Config::default(),
        }
    }
}

/// Binds documents against a schema, constructing types from a loading
/// context.
///
/// Schema and context are only read, so one binder can serve any number of
/// documents.
pub struct Binder<'a> {
    schema: &'a Schema,
    ctx: &'a dyn LoadingContext,
    options: BindOptions,
}

impl<'a> Binder<'a> {
    pub fn new(schema: &'a Schema, ctx: &'a dyn LoadingContext) -> Self {
        Self {
            schema,
            ctx,
            options: BindOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Read `document` and build its tag tree
    pub fn parse(&self, document: &str) -> Result<ParsedTag<'a>> {
        let mut builder = TreeBuilder::new(self.schema);
        Reader::with_config(document.as_bytes(), self.options.reader).read(&mut builder)?;
        builder.finish()
    }

    /// Read `document`, resolving inclusions through `source`, and build
    /// its tag tree
    pub fn parse_with_includes(
        &self,
        document: &str,
        source: &dyn DocumentSource,
    ) -> Result<ParsedTag<'a>> {
        self.resolve_and_parse(document, source, None)
    }

    /// Like [`Self::parse_with_includes`] for a document stored in `source`
    /// at `base`, so relative hrefs and cycles are resolved against it
    pub fn parse_with_includes_at(
        &self,
        document: &str,
        source: &dyn DocumentSource,
        base: &str,
    ) -> Result<ParsedTag<'a>> {
        self.resolve_and_parse(document, source, Some(base))
    }

    fn resolve_and_parse(
        &self,
        document: &str,
        source: &dyn DocumentSource,
        base: Option<&str>,
    ) -> Result<ParsedTag<'a>> {
        let mut resolver = IncludeResolver::new(TreeBuilder::new(self.schema), source)
            .with_reader_config(self.options.reader);
        if let Some(base) = base {
            resolver = resolver.with_base(base);
        }
        Reader::with_config(document.as_bytes(), self.options.reader).read(&mut resolver)?;
        resolver.into_inner().finish()
    }

    /// Read and bind `document`, returning the root object
    #[instrument(skip_all, fields(len = document.len()))]
    pub fn bind_str(&self, document: &str) -> Result<Value> {
        let mut root = self.parse(document)?;
        self.bind(&mut root)
    }

    /// Like [`Self::bind_str`], with inclusions resolved through `source`
    #[instrument(skip_all, fields(len = document.len()))]
    pub fn bind_str_with_includes(
        &self,
        document: &str,
        source: &dyn DocumentSource,
    ) -> Result<Value> {
        let mut root = self.parse_with_includes(document, source)?;
        self.bind(&mut root)
    }

    /// Bind `root` and move its object out
    pub fn bind(&self, root: &mut ParsedTag<'_>) -> Result<Value> {
        self.bind_tag(root, 1)?;
        root.take_content().ok_or_else(|| {
            Error::with_message(
                ErrorKind::Accessor {
                    tag: root.name().to_string(),
                    accessor: "content".to_string(),
                },
                root.span(),
                format!("<{}> produced no object", root.name()),
            )
        })
    }

    /// Bind one element, leaving its object in the element's content
    fn bind_tag(&self, tag: &mut ParsedTag<'_>, depth: u16) -> Result<()> {
        let max = effective_depth(self.options.max_depth);
        if depth > max {
            return Err(Error::new(ErrorKind::MaxDepthExceeded { max }, tag.span()));
        }

        tag.validate()?;
        let definition = tag.definition();

        if let Some(primitive) = definition.content_type() {
            if let Some(child) = tag.children().first() {
                return Err(Error::with_message(
                    ErrorKind::Accessor {
                        tag: tag.name().to_string(),
                        accessor: "addChild".to_string(),
                    },
                    child.span(),
                    format!(
                        "value tag <{}> cannot hold the element <{}>",
                        tag.name(),
                        child.name()
                    ),
                ));
            }
            let value = primitive.parse(tag.data()).map_err(|reason| {
                Error::new(
                    ErrorKind::ValueConversion {
                        tag: tag.name().to_string(),
                        attribute: "content".to_string(),
                        value: tag.data().to_string(),
                        target: primitive.keyword().to_string(),
                    },
                    tag.span(),
                )
                .context(reason)
            })?;
            debug!(tag = tag.name(), kind = %primitive, "bound value tag");
            tag.set_content(value);
            return Ok(());
        }

        let mut object = self.instantiate(definition)?;

        for attribute in definition.attribute_definitions() {
            let Some(value) = attribute.convert_value(tag, self.ctx)? else {
                continue;
            };
            let accessor = attribute.accessor_name();
            trace!(tag = tag.name(), accessor = %accessor, value = %value, "set");
            object
                .set(&accessor, value)
                .map_err(|err| accessor_error(tag, &accessor, &err))?;
        }

        let indexed = definition.supports_indexed_children();
        let mut seen = HashSet::new();
        let name = tag.name().to_string();
        let span = tag.span();
        for child in tag.children_mut() {
            self.bind_tag(child, depth.saturating_add(1))?;
            let Some(value) = child.take_content() else {
                continue;
            };

            if indexed {
                object.add_child(value).map_err(|err| {
                    accessor_error(child, "addChild", &err).context(format!("in <{name}>"))
                })?;
                continue;
            }

            let key = child.key();
            if !seen.insert(key.clone()) {
                match self.options.duplicate_keys {
                    DuplicateKeys::LastWins => {
                        warn!(tag = %name, key = %key, "keyed child replaces an earlier one");
                    }
                    DuplicateKeys::Reject => {
                        return Err(Error::new(
                            ErrorKind::DuplicateKey {
                                tag: name.clone(),
                                key,
                            },
                            child.span(),
                        ));
                    }
                }
            }
            object.add_keyed_child(&key, value).map_err(|err| {
                accessor_error(child, "addChild", &err).context(format!("in <{name}>"))
            })?;
        }

        debug!(tag = %name, target = definition.target_type(), ?span, "bound element");
        tag.set_content(Value::Object(Instance::new(
            definition.target_type(),
            object.into_any(),
        )));
        Ok(())
    }

    fn instantiate(&self, definition: &TagDefinition) -> Result<Box<dyn Bindable>> {
        let target = definition.target_type();
        let handle = self.ctx.resolve(target).ok_or_else(|| {
            Error::configuration(format!(
                "type '{target}' of the tag '{}' is not registered",
                definition.tag_name()
            ))
        })?;
        handle.construct().ok_or_else(|| {
            Error::configuration(format!(
                "type '{target}' of the tag '{}' cannot be instantiated",
                definition.tag_name()
            ))
        })
    }

    /// Dry run: validate every element and check required and primitive
    /// attribute values without constructing objects
    pub fn check(&self, tag: &ParsedTag<'_>) -> Result<()> {
        self.check_tag(tag, 1)
    }

    fn check_tag(&self, tag: &ParsedTag<'_>, depth: u16) -> Result<()> {
        let max = effective_depth(self.options.max_depth);
        if depth > max {
            return Err(Error::new(ErrorKind::MaxDepthExceeded { max }, tag.span()));
        }

        tag.validate()?;
        let definition = tag.definition();
        for attribute in definition.attribute_definitions() {
            attribute.check_value(tag)?;
        }
        if let Some(primitive) = definition.content_type() {
            primitive.parse(tag.data()).map_err(|reason| {
                Error::new(
                    ErrorKind::ValueConversion {
                        tag: tag.name().to_string(),
                        attribute: "content".to_string(),
                        value: tag.data().to_string(),
                        target: primitive.keyword().to_string(),
                    },
                    tag.span(),
                )
                .context(reason)
            })?;
        }

        let mut seen = HashSet::new();
        for child in tag.children() {
            self.check_tag(child, depth.saturating_add(1))?;
            if definition.supports_indexed_children()
                || self.options.duplicate_keys == DuplicateKeys::LastWins
            {
                continue;
            }
            let key = child.key();
            if !seen.insert(key.clone()) {
                return Err(Error::new(
                    ErrorKind::DuplicateKey {
                        tag: tag.name().to_string(),
                        key,
                    },
                    child.span(),
                ));
            }
        }
        Ok(())
    }
}

fn accessor_error(tag: &ParsedTag<'_>, accessor: &str, err: &AccessorError) -> Error {
    Error::new(
        ErrorKind::Accessor {
            tag: tag.name().to_string(),
            accessor: accessor.to_string(),
        },
        tag.span(),
    )
    .context(err)
}
