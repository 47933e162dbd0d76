//! Top-level collection of tag definitions

use indexmap::IndexMap;

use crate::definition::TagDefinition;
use crate::error::Result;
use crate::registry::LoadingContext;

/// Immutable-after-construction set of tag definitions.
///
/// Elements resolve against their parent's child definitions first and
/// against the schema's top-level definitions second.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    tags: IndexMap<String, TagDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level definition; the last one for a tag name wins
    pub fn add(&mut self, definition: TagDefinition) -> &mut Self {
        self.tags.insert(definition.tag_name().to_string(), definition);
        self
    }

    pub fn with(mut self, definition: TagDefinition) -> Self {
        self.add(definition);
        self
    }

    /// Extend with every definition of `other`, overriding shared names
    pub fn merge(&mut self, other: Self) -> &mut Self {
        self.tags.extend(other.tags);
        self
    }

    pub fn get(&self, tag_name: &str) -> Option<&TagDefinition> {
        self.tags.get(tag_name)
    }

    /// Definition for `tag_name` nested in `parent`, falling back to the
    /// top level
    pub fn lookup<'s>(
        &'s self,
        parent: Option<&'s TagDefinition>,
        tag_name: &str,
    ) -> Option<&'s TagDefinition> {
        parent
            .and_then(|p| p.child_definition(tag_name))
            .or_else(|| self.get(tag_name))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TagDefinition> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Resolve every target and attribute type against `ctx` before any
    /// document is bound
    pub fn verify(&self, ctx: &dyn LoadingContext) -> Result<()> {
        self.tags.values().try_for_each(|tag| tag.verify(ctx))
    }
}
