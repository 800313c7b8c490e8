//! Field framing.
//!
//! Turns the lines of a text block (or of a bare field stream) into
//! `:tag:content` fields. Lines that do not start a field continue the
//! open one, so a field is only complete once the following line has been
//! seen. A line consisting of a single `-` ends the page.

use crate::error::{Error, Result};
use std::io::BufRead;

/// The page terminator line.
pub const PAGE_SEPARATOR: &str = "-";

/// A tag with its raw content; continuation lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub tag: String,
    pub content: String,
    /// Line the field starts on, 1-based.
    pub line: usize,
}

impl RawField {
    pub fn new(tag: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content: content.into(),
            line: 0,
        }
    }

    /// The field as it appears in a text block, continuation lines included.
    pub fn render(&self) -> String {
        format!(":{}:{}", self.tag, self.content)
    }
}

/// One unit produced by the field framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldItem {
    Field(RawField),
    /// The `-` line that ends a page, with its line number.
    Separator(usize),
}

impl FieldItem {
    pub fn line(&self) -> usize {
        match self {
            FieldItem::Field(field) => field.line,
            FieldItem::Separator(line) => *line,
        }
    }
}

/// Split `:tag:content` into its parts when `line` starts a field.
///
/// Tags are two digits optionally followed by one upper case letter.
fn split_field_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let (tag, content) = rest.split_once(':')?;
    let bytes = tag.as_bytes();
    let valid = match bytes.len() {
        2 => bytes.iter().all(u8::is_ascii_digit),
        3 => bytes[..2].iter().all(u8::is_ascii_digit) && bytes[2].is_ascii_uppercase(),
        _ => false,
    };
    valid.then_some((tag, content))
}

/// Pull-based field framer over any line source.
pub struct FieldReader<R> {
    reader: R,
    line: usize,
    /// Line read ahead to decide where the open field ends.
    lookahead: Option<(usize, String)>,
    halted: bool,
}

impl<R: BufRead> FieldReader<R> {
    pub fn new(reader: R) -> Self {
        Self::starting_at_line(reader, 1)
    }

    /// Number lines from `first_line`, e.g. for a text block inside an envelope.
    pub fn starting_at_line(reader: R, first_line: usize) -> Self {
        Self {
            reader,
            line: first_line.saturating_sub(1),
            lookahead: None,
            halted: false,
        }
    }

    /// Line number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        if let Some(pending) = self.lookahead.take() {
            return Ok(Some(pending));
        }
        let mut buffer = String::new();
        if self.reader.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        let trimmed = buffer.trim_end_matches(['\n', '\r']).len();
        buffer.truncate(trimmed);
        Ok(Some((self.line, buffer)))
    }

    /// Read the next field or page separator, or `None` at end of stream.
    pub fn next_item(&mut self) -> Result<Option<FieldItem>> {
        let mut open: Option<RawField> = None;

        loop {
            let (number, text) = match self.next_line()? {
                Some(line) => line,
                None => return Ok(open.map(FieldItem::Field)),
            };

            if text == PAGE_SEPARATOR {
                return Ok(Some(match open {
                    Some(field) => {
                        self.lookahead = Some((number, text));
                        FieldItem::Field(field)
                    }
                    None => FieldItem::Separator(number),
                }));
            }

            if text.starts_with(':') {
                let (tag, content) = split_field_line(&text).ok_or_else(|| Error::FieldFraming {
                    line: number,
                    message: format!("malformed field line {text:?}"),
                })?;
                match open {
                    Some(field) => {
                        self.lookahead = Some((number, text));
                        return Ok(Some(FieldItem::Field(field)));
                    }
                    None => {
                        tracing::trace!(tag, line = number, "field opened");
                        open = Some(RawField {
                            tag: tag.to_string(),
                            content: content.to_string(),
                            line: number,
                        });
                    }
                }
                continue;
            }

            match open.as_mut() {
                Some(field) => {
                    field.content.push('\n');
                    field.content.push_str(&text);
                }
                // blank lines between pages
                None if text.trim().is_empty() => {}
                None => {
                    return Err(Error::FieldFraming {
                        line: number,
                        message: format!("continuation line {text:?} without an open field"),
                    })
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for FieldReader<R> {
    type Item = Result<FieldItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let result = self.next_item().transpose();
        if matches!(result, Some(Err(_)) | None) {
            self.halted = true;
        }
        result
    }
}

/// Render fields as text-block lines followed by the page separator.
pub fn render_fields<'a>(fields: impl IntoIterator<Item = &'a RawField>) -> String {
    let mut out = String::new();
    for field in fields {
        out.push_str(&field.render());
        out.push('\n');
    }
    out.push_str(PAGE_SEPARATOR);
    out
}
