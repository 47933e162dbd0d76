//! Event-producing XML reader

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result, Span};
use crate::xml::cursor::Cursor;
use crate::xml::event::{Event, EventSink};

/// UTF-8 encoding of U+FEFF
const BYTE_ORDER_MARK: &[u8] = b"\xEF\xBB\xBF";

/// Nesting bound applied when a limit is 0 or above it
pub const DEPTH_CEILING: u16 = 512;

/// Reader limits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means [`DEPTH_CEILING`])
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Create a new config with unlimited size, nesting only bounded by
    /// [`DEPTH_CEILING`]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }

    /// Depth bound actually enforced
    pub const fn effective_max_depth(&self) -> u16 {
        effective_depth(self.max_depth)
    }
}

/// Clamp a configured depth limit to [`DEPTH_CEILING`]
pub(crate) const fn effective_depth(max: u16) -> u16 {
    if max == 0 || max > DEPTH_CEILING {
        DEPTH_CEILING
    } else {
        max
    }
}

/// XML reader feeding an [`EventSink`]
#[derive(Debug)]
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    config: Config,
    depth: u16,
    len: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a reader with explicit limits; a leading byte order mark is
    /// skipped
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input)),
            config,
            depth: 0,
            len: input.len(),
        }
    }

    /// Count `depth` enclosing elements against the depth limit, for
    /// documents read inside another
    pub const fn nested_at(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    /// Read one document, reporting its root element to `sink`
    pub fn read<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let max = self.config.max_size;
        if max > 0 && self.len > max {
            return Err(Error::new(ErrorKind::MaxSizeExceeded { max }, Span::empty()));
        }

        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(self.error_here("document has no root element"));
        }
        self.read_element(sink)?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(self.error_here("content after the root element"));
        }
        Ok(())
    }

    fn read_element<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let pos = self.cursor.position();
        self.expect_byte(b'<')?;

        if self.cursor.current() == Some(b'/') {
            return Err(self.error_here("unexpected closing tag"));
        }

        self.depth = self.depth.saturating_add(1);
        let max = self.config.effective_max_depth();
        if self.depth > max {
            return Err(Error::new(
                ErrorKind::MaxDepthExceeded { max },
                Span::new(pos, pos),
            ));
        }

        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;
        sink.event(Event::Start {
            name: name.clone(),
            attributes,
            pos,
        })?;

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            self.depth -= 1;
            return sink.event(Event::End { name });
        }
        self.expect_byte(b'>')?;

        loop {
            if self.cursor.starts_with(b"</") {
                self.cursor.advance_by(2);
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(self.error_here("mismatched closing tag"));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
                continue;
            }

            if self.cursor.starts_with(b"<![CDATA[") {
                self.cursor.advance_by(9);
                let text = self.read_until(b"]]>")?;
                if !text.is_empty() {
                    sink.event(Event::Text(text))?;
                }
                continue;
            }

            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
                continue;
            }

            if self.cursor.current() == Some(b'<') {
                self.read_element(sink)?;
                continue;
            }

            if self.cursor.is_eof() {
                return Err(self.error_here("unterminated element"));
            }

            let text = self.parse_text()?;
            if !text.is_empty() {
                sink.event(Event::Text(text))?;
            }
        }

        self.depth -= 1;
        sink.event(Event::End { name })
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(self.error_here("duplicate attribute"));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let raw = self.cursor.take_while(|b| b != quote && b != b'<');
        match self.cursor.current() {
            Some(b'<') => Err(self.error_here("'<' in attribute value")),
            Some(_) => {
                self.cursor.advance();
                let text = self.bytes_to_string(raw)?;
                self.decode_entities(&text)
            }
            None => Err(self.error_here("unterminated attribute value")),
        }
    }

    fn parse_text(&mut self) -> Result<String> {
        let raw = self.cursor.take_while(|b| b != b'<');
        let text = self.bytes_to_string(raw)?;
        self.decode_entities(&text)
    }

    fn parse_name(&mut self) -> Result<String> {
        if !self.cursor.current().is_some_and(is_name_start) {
            return Err(self.error_here("expected name"));
        }
        let raw = self.cursor.take_while(is_name_char);
        self.bytes_to_string(raw)
    }

    /// Skip whitespace, comments, processing instructions and doctype
    /// around the root element
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<!") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        // internal subsets nest one level of brackets
        let mut in_subset = false;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => in_subset = true,
                b']' => in_subset = false,
                b'>' if !in_subset => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here("unterminated doctype"))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        self.read_raw_until(pattern).map(|_| ())
    }

    fn read_until(&mut self, pattern: &[u8]) -> Result<String> {
        let raw = self.read_raw_until(pattern)?;
        self.bytes_to_string(raw)
    }

    fn read_raw_until(&mut self, pattern: &[u8]) -> Result<&'a [u8]> {
        match self.cursor.take_until(pattern) {
            Some(raw) => Ok(raw),
            None => Err(self.error_here("unterminated markup")),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.error_here("unexpected token"))
        }
    }

    fn error_here(&self, message: &str) -> Error {
        let pos = self.cursor.position();
        Error::with_message(ErrorKind::Syntax, Span::new(pos, pos), message)
    }

    fn bytes_to_string(&self, bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(ToString::to_string)
            .map_err(|_| self.error_here("invalid utf-8"))
    }

    fn decode_entities(&self, input: &str) -> Result<String> {
        if !input.contains('&') {
            return Ok(input.to_string());
        }

        let mut result = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(amp) = rest.find('&') {
            result.push_str(rest.get(..amp).unwrap_or_default());
            let after = rest.get(amp + 1..).unwrap_or_default();
            let Some(semi) = after.find(';') else {
                return Err(self.error_here("unterminated xml entity"));
            };
            let entity = after.get(..semi).unwrap_or_default();
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => decode_numeric_entity(entity),
            };
            match decoded {
                Some(ch) => result.push(ch),
                None => return Err(self.error_here("invalid xml entity")),
            }
            rest = after.get(semi + 1..).unwrap_or_default();
        }
        result.push_str(rest);

        Ok(result)
    }
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
