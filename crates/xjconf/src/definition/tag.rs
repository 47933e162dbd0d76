//! Tag definitions

use indexmap::IndexMap;

use crate::convert::{Converter, Primitive};
use crate::definition::{AttributeDefinition, Definition};
use crate::error::{Error, Result};
use crate::registry::LoadingContext;
use crate::tag::ParsedTag;

/// Which elements a tag accepts and what an element of it binds to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDefinition {
    tag_name: String,
    target_type: String,
    content: Option<Primitive>,
    name_attribute: Option<String>,
    attributes: IndexMap<String, AttributeDefinition>,
    children: IndexMap<String, TagDefinition>,
    indexed_children: bool,
}

impl TagDefinition {
    /// Definition for `<tag_name>` elements binding to `target_type`.
    ///
    /// A primitive keyword as target makes a value tag: its object is the
    /// element's text converted to that primitive.
    pub fn new(tag_name: impl Into<String>, target_type: impl Into<String>) -> Result<Self> {
        let tag_name = tag_name.into();
        let target_type = target_type.into();
        if tag_name.is_empty() {
            return Err(Error::configuration("tag definition needs a name"));
        }
        if target_type.is_empty() {
            return Err(Error::configuration(format!(
                "tag definition '{tag_name}' needs a type"
            )));
        }

        let content = Primitive::from_keyword(&target_type);
        Ok(Self {
            tag_name,
            target_type,
            content,
            name_attribute: None,
            attributes: IndexMap::new(),
            children: IndexMap::new(),
            indexed_children: false,
        })
    }

    /// Attribute used as the element's key, exempt from validation
    pub fn with_name_attribute(mut self, name: impl Into<String>) -> Self {
        self.name_attribute = Some(name.into());
        self
    }

    /// Attach children as an ordered sequence instead of by key
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed_children = indexed;
        self
    }

    /// Builder form of [`Self::add_attribute`]
    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Result<Self> {
        self.add_attribute(attribute)?;
        Ok(self)
    }

    /// Builder form of [`Self::add_child_definition`] for tags
    pub fn with_child(mut self, child: Self) -> Result<Self> {
        self.add_child_definition(Definition::Tag(child))?;
        Ok(self)
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn name_attribute(&self) -> Option<&str> {
        self.name_attribute.as_deref()
    }

    pub fn supports_indexed_children(&self) -> bool {
        self.indexed_children
    }

    /// Primitive the element text converts to, for value tags
    pub fn content_type(&self) -> Option<Primitive> {
        self.content
    }

    pub fn is_value_tag(&self) -> bool {
        self.content.is_some()
    }

    /// Register an attribute definition; attribute names are unique and a
    /// later registration replaces the earlier one in place.
    pub fn add_attribute(&mut self, attribute: AttributeDefinition) -> Result<()> {
        if self.is_value_tag() {
            return Err(Error::configuration(format!(
                "value tag '{}' cannot define the attribute '{}'",
                self.tag_name,
                attribute.name()
            )));
        }
        self.attributes.insert(attribute.name().to_string(), attribute);
        Ok(())
    }

    /// Register a nested definition.
    ///
    /// Child tags are keyed by tag name and the last registration wins, so
    /// a schema can redefine a child it inherited from a shared fragment.
    pub fn add_child_definition(&mut self, definition: Definition) -> Result<()> {
        match definition {
            Definition::Attribute(attribute) => self.add_attribute(attribute),
            Definition::Tag(child) => {
                if self.is_value_tag() {
                    return Err(Error::configuration(format!(
                        "value tag '{}' cannot hold the child '{}'",
                        self.tag_name, child.tag_name
                    )));
                }
                self.children.insert(child.tag_name.clone(), child);
                Ok(())
            }
        }
    }

    pub fn has_attribute_definition(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    /// Attribute definitions in registration order
    pub fn attribute_definitions(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    pub fn child_definition(&self, tag_name: &str) -> Option<&Self> {
        self.children.get(tag_name)
    }

    pub fn child_definitions(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    /// Key a parent stores an element of this definition under: the value
    /// of the name attribute when declared and present, else the tag name.
    pub fn key_for(&self, tag: &ParsedTag<'_>) -> String {
        self.name_attribute
            .as_deref()
            .and_then(|attr| tag.attribute(attr))
            .unwrap_or_else(|| tag.name())
            .to_string()
    }

    /// Check every type this definition and its descendants refer to
    pub fn verify(&self, ctx: &dyn LoadingContext) -> Result<()> {
        if !self.is_value_tag() {
            let handle = ctx.resolve(&self.target_type).ok_or_else(|| {
                Error::configuration(format!(
                    "type '{}' of the tag '{}' is not registered",
                    self.target_type, self.tag_name
                ))
            })?;
            if !handle.is_bindable() {
                return Err(Error::configuration(format!(
                    "type '{}' of the tag '{}' cannot be instantiated",
                    self.target_type, self.tag_name
                )));
            }
        }

        for attribute in self.attributes.values() {
            attribute
                .value_type(ctx)
                .map_err(|err| err.context(format!("tag '{}'", self.tag_name)))?;
            if let Converter::Object(name) = attribute.converter() {
                let parsable = ctx.resolve(name).is_some_and(|h| h.is_parsable());
                if !parsable {
                    return Err(Error::configuration(format!(
                        "type '{name}' of the attribute '{}' has no string constructor",
                        attribute.name()
                    )));
                }
            }
        }

        self.children.values().try_for_each(|child| child.verify(ctx))
    }
}
