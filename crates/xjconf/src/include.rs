//! XInclude-style document inclusion in front of the tree builder

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::xml::{Config, Event, EventSink, Reader};

/// Namespace marking inclusion directives
pub const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

/// A document fetched for inclusion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loaded {
    /// Normalized location, used as base for nested inclusions
    pub id: String,
    pub text: String,
}

/// Where included documents come from
pub trait DocumentSource {
    /// Load `href`, relative to the including document `base` when given
    fn load(&self, href: &str, base: Option<&str>) -> std::result::Result<Loaded, String>;
}

/// Documents below a root directory
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for FileSource {
    fn load(&self, href: &str, base: Option<&str>) -> std::result::Result<Loaded, String> {
        let id = resolve_href(href, base)?;
        let path = self.root.join(&id);
        let text = fs::read_to_string(&path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
        Ok(Loaded { id, text })
    }
}

/// In-memory documents keyed by normalized path
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.documents.insert(path.into(), text.into());
        self
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl DocumentSource for MemorySource {
    fn load(&self, href: &str, base: Option<&str>) -> std::result::Result<Loaded, String> {
        let id = resolve_href(href, base)?;
        match self.documents.get(&id) {
            Some(text) => Ok(Loaded {
                id,
                text: text.clone(),
            }),
            None => Err(format!("no document at '{id}'")),
        }
    }
}

/// Join `href` onto the directory of `base` and fold `.`/`..` segments
pub fn resolve_href(href: &str, base: Option<&str>) -> std::result::Result<String, String> {
    let dir = if href.starts_with('/') {
        None
    } else {
        base.and_then(|b| b.rsplit_once('/')).map(|(dir, _)| dir)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.into_iter().flat_map(|d| d.split('/')).chain(href.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(format!("'{href}' escapes the document root"));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(format!("'{href}' does not name a document"));
    }
    Ok(segments.join("/"))
}

#[derive(Debug)]
enum State {
    Pass,
    /// Collecting the subtree of an include directive
    Capture {
        depth: usize,
        prefix: Option<String>,
        attributes: IndexMap<String, String>,
        events: Vec<Event>,
    },
}

/// Event sink replacing inclusion directives with the documents they name
/// before forwarding to `inner`
pub struct IncludeResolver<'src, S> {
    inner: S,
    source: &'src dyn DocumentSource,
    config: Config,
    max_nesting: usize,
    // prefixes bound to XINCLUDE_NS per open element; None is the default namespace
    scopes: Vec<Vec<Option<String>>>,
    bases: Vec<String>,
    nested: usize,
    // elements open in including documents
    outer_depth: usize,
    state: State,
}

impl<'src, S: EventSink> IncludeResolver<'src, S> {
    pub fn new(inner: S, source: &'src dyn DocumentSource) -> Self {
        Self {
            inner,
            source,
            config: Config::default(),
            max_nesting: 16,
            scopes: Vec::new(),
            bases: Vec::new(),
            nested: 0,
            outer_depth: 0,
            state: State::Pass,
        }
    }

    /// Location of the top-level document, for relative hrefs
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.bases = vec![base.into()];
        self
    }

    pub fn with_reader_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Maximum depth of documents including documents
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn include_prefix(&self, name: &str) -> Option<Option<String>> {
        let (prefix, local) = match name.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local),
            None => (None, name),
        };
        if local != "include" {
            return None;
        }
        self.scopes
            .iter()
            .rev()
            .flatten()
            .any(|bound| *bound == prefix)
            .then_some(prefix)
    }

    fn start(
        &mut self,
        name: String,
        attributes: IndexMap<String, String>,
        pos: Pos,
    ) -> Result<()> {
        let bound = attributes
            .iter()
            .filter(|(_, uri)| uri.as_str() == XINCLUDE_NS)
            .filter_map(|(key, _)| match key.as_str() {
                "xmlns" => Some(None),
                other => other.strip_prefix("xmlns:").map(|p| Some(p.to_string())),
            })
            .collect();
        self.scopes.push(bound);

        match self.include_prefix(&name) {
            Some(prefix) => {
                self.state = State::Capture {
                    depth: 1,
                    prefix,
                    attributes,
                    events: Vec::new(),
                };
                Ok(())
            }
            None => self.inner.event(Event::Start {
                name,
                attributes,
                pos,
            }),
        }
    }

    fn finish_include(
        &mut self,
        prefix: Option<String>,
        attributes: &IndexMap<String, String>,
        events: Vec<Event>,
    ) -> Result<()> {
        let href = attributes.get("href").cloned().unwrap_or_default();
        if href.is_empty() {
            return Err(inclusion_error(&href, "include needs an href"));
        }
        if attributes.contains_key("xpointer") {
            return Err(inclusion_error(&href, "xpointer is not supported"));
        }
        let parse_text = match attributes.get("parse").map(String::as_str) {
            None | Some("xml") => false,
            Some("text") => true,
            Some(other) => {
                return Err(inclusion_error(&href, format!("unknown parse mode '{other}'")));
            }
        };

        let base = self.bases.last().map(String::as_str);
        match self.source.load(&href, base) {
            Ok(loaded) if parse_text => {
                debug!(href = %href, id = %loaded.id, "included text");
                self.inner.event(Event::Text(loaded.text))
            }
            Ok(loaded) => self.include_document(&href, loaded),
            Err(reason) => {
                let fallback = fallback_content(prefix.as_deref(), events);
                match fallback {
                    Some(events) => {
                        warn!(href = %href, reason = %reason, "include failed, using fallback");
                        events.into_iter().try_for_each(|event| self.event(event))
                    }
                    None => Err(inclusion_error(&href, reason)),
                }
            }
        }
    }

    fn include_document(&mut self, href: &str, loaded: Loaded) -> Result<()> {
        if self.bases.contains(&loaded.id) {
            return Err(inclusion_error(href, "inclusion cycle"));
        }
        if self.nested >= self.max_nesting {
            return Err(inclusion_error(
                href,
                format!("more than {} nested inclusions", self.max_nesting),
            ));
        }

        debug!(href = %href, id = %loaded.id, "included document");
        let scopes = std::mem::take(&mut self.scopes);
        let outer_depth = self.outer_depth;
        // the directive itself is replaced by the included root
        self.outer_depth += scopes.len().saturating_sub(1);
        self.bases.push(loaded.id);
        self.nested += 1;
        let config = self.config;
        let result = Reader::with_config(loaded.text.as_bytes(), config)
            .nested_at(u16::try_from(self.outer_depth).unwrap_or(u16::MAX))
            .read(self)
            .map_err(|err| err.context(format!("in document included as '{href}'")));
        self.nested -= 1;
        self.bases.pop();
        self.outer_depth = outer_depth;
        self.scopes = scopes;
        result
    }
}

impl<S: EventSink> EventSink for IncludeResolver<'_, S> {
    fn event(&mut self, event: Event) -> Result<()> {
        let State::Capture { depth, events, .. } = &mut self.state else {
            return match event {
                Event::Start {
                    name,
                    attributes,
                    pos,
                } => self.start(name, attributes, pos),
                Event::End { .. } => {
                    self.scopes.pop();
                    self.inner.event(event)
                }
                Event::Text(_) => self.inner.event(event),
            };
        };

        match &event {
            Event::Start { .. } => *depth += 1,
            Event::End { .. } => *depth -= 1,
            Event::Text(_) => {}
        }
        if *depth > 0 {
            events.push(event);
            return Ok(());
        }

        let State::Capture {
            prefix,
            attributes,
            events,
            ..
        } = std::mem::replace(&mut self.state, State::Pass)
        else {
            return Ok(());
        };
        let result = self.finish_include(prefix, &attributes, events);
        self.scopes.pop();
        result
    }
}

/// Children of the directive's direct `fallback` element, if any
fn fallback_content(prefix: Option<&str>, events: Vec<Event>) -> Option<Vec<Event>> {
    let wanted = match prefix {
        Some(prefix) => format!("{prefix}:fallback"),
        None => "fallback".to_string(),
    };

    let mut depth = 0usize;
    let mut collected: Option<Vec<Event>> = None;
    for event in events {
        match &event {
            Event::Start { name, .. } => {
                depth += 1;
                if depth == 1 {
                    if collected.is_none() && *name == wanted {
                        collected = Some(Vec::new());
                    }
                    continue;
                }
            }
            Event::End { .. } => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if collected.is_some() {
                        return collected;
                    }
                    continue;
                }
            }
            Event::Text(_) if depth == 0 => continue,
            Event::Text(_) => {}
        }
        if let Some(buf) = collected.as_mut() {
            buf.push(event);
        }
    }
    collected
}

fn inclusion_error(href: &str, reason: impl std::fmt::Display) -> Error {
    Error::new(
        ErrorKind::Inclusion {
            href: href.to_string(),
        },
        Span::empty(),
    )
    .context(reason)
}
