//! Streaming XML reader and the event contract it feeds

pub mod cursor;
pub mod event;
pub mod reader;

pub use cursor::Cursor;
pub use event::{Event, EventSink};
pub use reader::{Config, Reader, DEPTH_CEILING};
