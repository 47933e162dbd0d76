//! Attribute definitions

use std::borrow::Cow;

use crate::convert::{Converter, Primitive, ValueType};
use crate::definition::Definition;
use crate::error::{Error, ErrorKind, Result};
use crate::registry::LoadingContext;
use crate::tag::ParsedTag;
use crate::value::Value;

/// How one attribute of a tag is converted and handed to its object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDefinition {
    name: String,
    type_name: String,
    accessor: Option<String>,
    default_value: Option<String>,
    required: bool,
    converter: Converter,
}

impl AttributeDefinition {
    /// Definition for a string attribute
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::typed(name, Primitive::String.keyword())
    }

    /// Definition converting to `type_name`, either a primitive keyword or
    /// a registered type name
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let type_name = type_name.into();
        if name.is_empty() {
            return Err(Error::configuration("attribute definition needs a name"));
        }
        if type_name.is_empty() {
            return Err(Error::configuration(format!(
                "attribute definition '{name}' needs a type"
            )));
        }

        let converter = Converter::for_type(&type_name);
        Ok(Self {
            name,
            type_name,
            accessor: None,
            default_value: None,
            required: false,
            converter,
        })
    }

    /// Value used when a tag does not provide the attribute
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Override the conventional `set<Name>` accessor
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Accessor receiving the converted value
    pub fn accessor_name(&self) -> Cow<'_, str> {
        match &self.accessor {
            Some(accessor) => Cow::Borrowed(accessor),
            None => Cow::Owned(accessor_name_for(&self.name)),
        }
    }

    /// Resolve the converted type; unresolvable names are schema errors
    pub fn value_type(&self, ctx: &dyn LoadingContext) -> Result<ValueType> {
        self.converter
            .value_type(ctx)
            .map_err(|err| err.context(format!("attribute '{}'", self.name)))
    }

    /// Raw text for this attribute on `tag`, falling back to the default.
    ///
    /// `Ok(None)` means the attribute is optional and absent, so its
    /// accessor is skipped.
    pub fn resolve_text<'t>(&'t self, tag: &'t ParsedTag<'_>) -> Result<Option<&'t str>> {
        match tag.attribute(&self.name).or(self.default_value.as_deref()) {
            Some(text) => Ok(Some(text)),
            None if self.required => Err(Error::new(
                ErrorKind::MissingAttribute {
                    tag: tag.name().to_string(),
                    attribute: self.name.clone(),
                },
                tag.span(),
            )),
            None => Ok(None),
        }
    }

    /// Convert this attribute's value on `tag`
    pub fn convert_value(
        &self,
        tag: &ParsedTag<'_>,
        ctx: &dyn LoadingContext,
    ) -> Result<Option<Value>> {
        let Some(text) = self.resolve_text(tag)? else {
            return Ok(None);
        };
        self.converter
            .convert(text, ctx)
            .map(Some)
            .map_err(|reason| self.conversion_error(tag, text, &reason))
    }

    /// Required and primitive checks that need no loading context
    pub fn check_value(&self, tag: &ParsedTag<'_>) -> Result<()> {
        let Some(text) = self.resolve_text(tag)? else {
            return Ok(());
        };
        if let Converter::Primitive(primitive) = self.converter {
            primitive
                .parse(text)
                .map_err(|reason| self.conversion_error(tag, text, &reason))?;
        }
        Ok(())
    }

    /// Attributes are leaves
    pub fn add_child_definition(&mut self, definition: Definition) -> Result<()> {
        Err(Error::configuration(format!(
            "attribute '{}' cannot hold the definition '{}'",
            self.name,
            definition.name()
        )))
    }

    fn conversion_error(&self, tag: &ParsedTag<'_>, text: &str, reason: &str) -> Error {
        Error::new(
            ErrorKind::ValueConversion {
                tag: tag.name().to_string(),
                attribute: self.name.clone(),
                value: text.to_string(),
                target: self.type_name.clone(),
            },
            tag.span(),
        )
        .context(reason)
    }
}

/// Conventional accessor for an attribute: `port` becomes `setPort`
pub fn accessor_name_for(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}
