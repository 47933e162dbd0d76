//! Parsed tag tree produced from a document

use indexmap::IndexMap;

use crate::definition::TagDefinition;
use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::value::Value;

/// One element of a parsed document, matched to its definition
#[derive(Debug)]
pub struct ParsedTag<'s> {
    name: String,
    attributes: IndexMap<String, String>,
    data: String,
    content: Option<Value>,
    children: Vec<ParsedTag<'s>>,
    definition: &'s TagDefinition,
    pos: Pos,
}

/// What [`ParsedTag::content`] exposes
#[derive(Debug)]
pub enum Content<'a> {
    /// Object bound from this element
    Bound(&'a Value),
    /// Trimmed character data
    Text(&'a str),
}

impl<'s> ParsedTag<'s> {
    pub fn new(
        name: impl Into<String>,
        attributes: IndexMap<String, String>,
        definition: &'s TagDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            attributes,
            data: String::new(),
            content: None,
            children: Vec::new(),
            definition,
            pos: Pos::default(),
        }
    }

    /// Record where the element starts in its source
    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &'s TagDefinition {
        self.definition
    }

    pub fn position(&self) -> Pos {
        self.pos
    }

    pub(crate) fn span(&self) -> Span {
        Span::new(self.pos, self.pos)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Child elements in document order
    pub fn children(&self) -> &[ParsedTag<'s>] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [ParsedTag<'s>] {
        &mut self.children
    }

    /// First child named `name`
    pub fn child_named(&self, name: &str) -> Option<&ParsedTag<'s>> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Accumulated character data, trimmed
    pub fn data(&self) -> &str {
        self.data.trim()
    }

    /// The bound object once set, else the trimmed text
    pub fn content(&self) -> Content<'_> {
        match &self.content {
            Some(value) => Content::Bound(value),
            None => Content::Text(self.data()),
        }
    }

    /// Key the parent stores this element under
    pub fn key(&self) -> String {
        self.definition.key_for(self)
    }

    pub fn add_child(&mut self, child: Self) -> usize {
        self.children.push(child);
        self.children.len()
    }

    pub fn push_text(&mut self, text: &str) -> usize {
        self.data.push_str(text);
        self.data.len()
    }

    /// Set once, by the binder, when this element's object is complete
    pub(crate) fn set_content(&mut self, value: Value) {
        debug_assert!(self.content.is_none(), "content of <{}> bound twice", self.name);
        self.content = Some(value);
    }

    /// Move the bound object out, leaving the text visible again
    pub fn take_content(&mut self) -> Option<Value> {
        self.content.take()
    }

    /// Every attribute is the name attribute or has a definition
    pub fn validate(&self) -> Result<()> {
        for attribute in self.attributes.keys() {
            if self.definition.name_attribute() == Some(attribute.as_str()) {
                continue;
            }
            if !self.definition.has_attribute_definition(attribute) {
                return Err(Error::new(
                    ErrorKind::UnknownAttribute {
                        tag: self.name.clone(),
                        attribute: attribute.clone(),
                    },
                    self.span(),
                ));
            }
        }
        Ok(())
    }
}
