//! Structural events emitted while reading a document

use indexmap::IndexMap;

use crate::error::{Pos, Result};

/// Events in document order
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Element start with its attributes
    Start {
        name: String,
        attributes: IndexMap<String, String>,
        pos: Pos,
    },
    /// Character data, entities already decoded
    Text(String),
    /// Element end
    End { name: String },
}

/// Receiver of events; an error aborts the read
pub trait EventSink {
    fn event(&mut self, event: Event) -> Result<()>;
}

impl EventSink for Vec<Event> {
    fn event(&mut self, event: Event) -> Result<()> {
        self.push(event);
        Ok(())
    }
}
