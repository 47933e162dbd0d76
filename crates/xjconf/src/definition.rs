//! Schema-side definitions of tags and attributes

pub mod attribute;
pub mod schema;
pub mod tag;

pub use attribute::{accessor_name_for, AttributeDefinition};
pub use schema::Schema;
pub use tag::TagDefinition;

/// Either kind of definition, as nested in a schema
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Definition {
    Attribute(AttributeDefinition),
    Tag(TagDefinition),
}

impl Definition {
    /// Attribute or tag name
    pub fn name(&self) -> &str {
        match self {
            Self::Attribute(a) => a.name(),
            Self::Tag(t) => t.tag_name(),
        }
    }

    /// Nest `definition` below this one; attributes accept nothing
    pub fn add_child_definition(&mut self, definition: Self) -> crate::Result<()> {
        match self {
            Self::Attribute(a) => a.add_child_definition(definition),
            Self::Tag(t) => t.add_child_definition(definition),
        }
    }
}

impl From<AttributeDefinition> for Definition {
    fn from(value: AttributeDefinition) -> Self {
        Self::Attribute(value)
    }
}

impl From<TagDefinition> for Definition {
    fn from(value: TagDefinition) -> Self {
        Self::Tag(value)
    }
}
