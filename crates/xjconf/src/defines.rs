//! Schemas described as markup.
//!
//! ```xml
//! <defines>
//!   <tag name="server" type="app.Server" keyAttribute="id">
//!     <attribute name="port" type="int" required="true"/>
//!     <attribute name="host" default="localhost"/>
//!   </tag>
//!   <tag name="list" type="app.List" indexed="true">
//!     <tag name="item" type="string"/>
//!   </tag>
//! </defines>
//! ```
//!
//! Top-level `tag` elements become schema definitions, nested ones become
//! child definitions of their parent tag.

use indexmap::IndexMap;
use tracing::debug;

use crate::definition::{AttributeDefinition, Definition, Schema, TagDefinition};
use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::xml::{Config, Event, EventSink, Reader};

/// Read a definitions document into a schema
pub fn load_schema(input: &str) -> Result<Schema> {
    load_schema_with_config(input, Config::default())
}

pub fn load_schema_with_config(input: &str, config: Config) -> Result<Schema> {
    let mut builder = DefinesBuilder::default();
    Reader::with_config(input.as_bytes(), config).read(&mut builder)?;
    debug!(tags = builder.schema.len(), "loaded definitions");
    Ok(builder.schema)
}

#[derive(Debug)]
enum Frame {
    Defines,
    Definition(Definition),
}

#[derive(Debug, Default)]
struct DefinesBuilder {
    schema: Schema,
    stack: Vec<Frame>,
}

impl DefinesBuilder {
    fn open(&mut self, name: &str, attributes: Attributes, pos: Pos) -> Result<Frame> {
        let at = |err: Error| err.or_at(pos);
        match (name, self.stack.last()) {
            ("defines", None) => {
                attributes.finish(name, pos)?;
                Ok(Frame::Defines)
            }
            ("tag", Some(Frame::Defines | Frame::Definition(Definition::Tag(_)))) => {
                let mut attributes = attributes;
                let tag_name = attributes.required("name", name, pos)?;
                let target = attributes.required("type", name, pos)?;
                let mut tag = TagDefinition::new(tag_name, target).map_err(at)?;
                if let Some(key) = attributes.take("keyAttribute") {
                    tag = tag.with_name_attribute(key);
                }
                if let Some(indexed) = attributes.flag("indexed", name, pos)? {
                    tag = tag.indexed(indexed);
                }
                attributes.finish(name, pos)?;
                Ok(Frame::Definition(tag.into()))
            }
            ("attribute", Some(Frame::Definition(Definition::Tag(_)))) => {
                let mut attributes = attributes;
                let attribute_name = attributes.required("name", name, pos)?;
                let mut attribute = match attributes.take("type") {
                    Some(type_name) => AttributeDefinition::typed(attribute_name, type_name),
                    None => AttributeDefinition::new(attribute_name),
                }
                .map_err(at)?;
                if let Some(default) = attributes.take("default") {
                    attribute = attribute.with_default(default);
                }
                if let Some(required) = attributes.flag("required", name, pos)? {
                    attribute = attribute.required(required);
                }
                if let Some(setter) = attributes.take("setter") {
                    attribute = attribute.with_accessor(setter);
                }
                attributes.finish(name, pos)?;
                Ok(Frame::Definition(attribute.into()))
            }
            (_, parent) => {
                let within = match parent {
                    None => "at the top level".to_string(),
                    Some(Frame::Defines) => "inside <defines>".to_string(),
                    Some(Frame::Definition(definition)) => {
                        format!("inside the definition of '{}'", definition.name())
                    }
                };
                Err(configuration_at(pos, format!("unexpected element <{name}> {within}")))
            }
        }
    }

    fn close(&mut self, frame: Frame) -> Result<()> {
        let Frame::Definition(definition) = frame else {
            return Ok(());
        };
        match self.stack.last_mut() {
            Some(Frame::Definition(parent)) => parent.add_child_definition(definition),
            Some(Frame::Defines) => match definition {
                Definition::Tag(tag) => {
                    self.schema.add(tag);
                    Ok(())
                }
                Definition::Attribute(attribute) => Err(Error::configuration(format!(
                    "the attribute '{}' must be defined inside a tag",
                    attribute.name()
                ))),
            },
            None => Err(Error::configuration("definitions must be wrapped in <defines>")),
        }
    }
}

impl EventSink for DefinesBuilder {
    fn event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Start {
                name,
                attributes,
                pos,
            } => {
                let frame = self.open(&name, Attributes(attributes), pos)?;
                self.stack.push(frame);
                Ok(())
            }
            Event::Text(text) if text.trim().is_empty() => Ok(()),
            Event::Text(text) => Err(Error::configuration(format!(
                "unexpected text '{}' in definitions",
                text.trim()
            ))),
            Event::End { .. } => match self.stack.pop() {
                Some(frame) => self.close(frame),
                None => Ok(()),
            },
        }
    }
}

/// Attributes of one definitions element, consumed as they are recognized
struct Attributes(IndexMap<String, String>);

impl Attributes {
    fn take(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    fn required(&mut self, key: &str, element: &str, pos: Pos) -> Result<String> {
        self.take(key).ok_or_else(|| {
            configuration_at(pos, format!("<{element}> needs the attribute '{key}'"))
        })
    }

    fn flag(&mut self, key: &str, element: &str, pos: Pos) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(value) => Err(configuration_at(
                pos,
                format!("'{key}' of <{element}> must be true or false, not '{value}'"),
            )),
        }
    }

    /// Fail on anything left over; namespace declarations are ignored
    fn finish(self, element: &str, pos: Pos) -> Result<()> {
        match self
            .0
            .keys()
            .find(|key| *key != "xmlns" && !key.starts_with("xmlns:"))
        {
            Some(key) => Err(configuration_at(
                pos,
                format!("<{element}> does not support the attribute '{key}'"),
            )),
            None => Ok(()),
        }
    }
}

fn configuration_at(pos: Pos, message: String) -> Error {
    Error::with_message(ErrorKind::Configuration, Span::new(pos, pos), message)
}
