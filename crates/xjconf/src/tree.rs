//! Builds the parsed tag tree from reader events

use tracing::trace;

use crate::definition::Schema;
use crate::error::{Error, ErrorKind, Result, Span};
use crate::tag::ParsedTag;
use crate::xml::{Event, EventSink};

/// Event sink matching every element to its definition
#[derive(Debug)]
pub struct TreeBuilder<'s> {
    schema: &'s Schema,
    stack: Vec<ParsedTag<'s>>,
    root: Option<ParsedTag<'s>>,
}

impl<'s> TreeBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            stack: Vec::new(),
            root: None,
        }
    }

    /// The completed root element
    pub fn finish(self) -> Result<ParsedTag<'s>> {
        if let Some(open) = self.stack.last() {
            return Err(Error::with_message(
                ErrorKind::Syntax,
                Span::empty(),
                format!("element <{}> was never closed", open.name()),
            ));
        }
        self.root.ok_or_else(|| {
            Error::with_message(ErrorKind::Syntax, Span::empty(), "document is empty")
        })
    }
}

impl EventSink for TreeBuilder<'_> {
    fn event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Start {
                name,
                mut attributes,
                pos,
            } => {
                if self.root.is_some() {
                    return Err(Error::with_message(
                        ErrorKind::Syntax,
                        Span::new(pos, pos),
                        format!("element <{name}> after the root element"),
                    ));
                }
                let parent = self.stack.last().map(ParsedTag::definition);
                let definition = self.schema.lookup(parent, &name).ok_or_else(|| {
                    Error::new(ErrorKind::UnknownTag { tag: name.clone() }, Span::new(pos, pos))
                })?;
                attributes.retain(|key, _| !is_namespace_declaration(key));
                trace!(tag = %name, "open");
                self.stack
                    .push(ParsedTag::new(name, attributes, definition).at(pos));
            }
            Event::Text(text) => {
                if let Some(open) = self.stack.last_mut() {
                    open.push_text(&text);
                }
            }
            Event::End { name } => {
                let Some(tag) = self.stack.pop() else {
                    return Err(Error::with_message(
                        ErrorKind::Syntax,
                        Span::empty(),
                        format!("unexpected closing tag </{name}>"),
                    ));
                };
                if tag.name() != name {
                    return Err(Error::with_message(
                        ErrorKind::Syntax,
                        tag.span(),
                        format!("</{name}> closes <{}>", tag.name()),
                    ));
                }
                match self.stack.last_mut() {
                    Some(parent) => {
                        parent.add_child(tag);
                    }
                    None => self.root = Some(tag),
                }
            }
        }
        Ok(())
    }
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}
