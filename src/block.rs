//! Block framing of SWIFT FIN envelopes.
//!
//! A message is a run of brace-delimited blocks, `{1:...}{2:...}{3:...}{4:...-}{5:...}`
//! optionally followed by `{S:...}`. Blocks 3, 5 and S embed nested
//! `{tag:value}` pairs, so closing braces are matched by depth.

use crate::error::{Error, Result};
use crate::MessageType;
use std::io::BufRead;

/// Block ids in canonical order.
const BLOCK_ORDER: [&str; 6] = ["1", "2", "3", "4", "5", "S"];

/// One top-level block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub id: String,
    pub content: String,
    /// Line of the opening brace, 1-based.
    pub line: usize,
}

/// Pulls characters from a `BufRead` one line at a time, counting lines.
struct CharSource<R> {
    reader: R,
    buffer: String,
    pos: usize,
    line: usize,
}

impl<R: BufRead> CharSource<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            pos: 0,
            line: 1,
        }
    }

    fn next_char(&mut self) -> Result<Option<char>> {
        loop {
            if let Some(c) = self.buffer[self.pos..].chars().next() {
                self.pos += c.len_utf8();
                if c == '\n' {
                    self.line += 1;
                }
                return Ok(Some(c));
            }
            self.buffer.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
        }
    }
}

/// Splits a character stream into top-level blocks.
pub struct BlockReader<R> {
    source: CharSource<R>,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            source: CharSource::new(reader),
        }
    }

    /// Read the next block, or `None` at end of stream.
    ///
    /// Blocks of one envelope must follow each other directly; line breaks
    /// are only tolerated in front of a block `1`.
    pub fn next_block(&mut self) -> Result<Option<RawBlock>> {
        let mut after_break = false;
        loop {
            match self.source.next_char()? {
                None => return Ok(None),
                Some('\r') | Some('\n') => after_break = true,
                Some('{') => break,
                Some(other) => {
                    return Err(self.error(format!("unexpected {other:?} outside of a block")))
                }
            }
        }
        let line = self.source.line;

        let mut id = String::new();
        loop {
            match self.source.next_char()? {
                None => return Err(unterminated(line)),
                Some(':') => break,
                Some(c) if c.is_ascii_alphanumeric() && id.len() < 2 => id.push(c),
                Some(c) => {
                    return Err(self.error(format!("malformed block id {:?}", format!("{id}{c}"))))
                }
            }
        }
        if !BLOCK_ORDER.contains(&id.as_str()) {
            return Err(Error::BlockFraming {
                line,
                message: format!("unknown block id {id:?}"),
            });
        }
        if after_break && id != "1" {
            return Err(Error::BlockFraming {
                line,
                message: format!("line break before block {id} inside a message"),
            });
        }

        let mut content = String::new();
        let mut depth = 0usize;
        loop {
            match self.source.next_char()? {
                None => return Err(unterminated(line)),
                Some('}') if depth == 0 => break,
                Some(c) => {
                    match c {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    content.push(c);
                }
            }
        }

        if id == "4" && content.lines().last() != Some("-") {
            return Err(Error::BlockFraming {
                line,
                message: "text block must end with a '-' line".to_string(),
            });
        }

        tracing::trace!(id = %id, line, len = content.len(), "block framed");
        Ok(Some(RawBlock { id, content, line }))
    }

    fn error(&self, message: String) -> Error {
        Error::BlockFraming {
            line: self.source.line,
            message,
        }
    }
}

fn unterminated(line: usize) -> Error {
    Error::BlockFraming {
        line,
        message: "unterminated block".to_string(),
    }
}

/// Message direction from the application header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `I`: sent to the network.
    Input,
    /// `O`: delivered by the network.
    Output,
}

/// The blocks of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Block 1.
    pub basic_header: String,
    /// Block 2.
    pub application_header: String,
    /// Block 3.
    pub user_header: Option<String>,
    /// Block 4, the field stream including its trailing `-` line.
    pub text: String,
    /// Block 5.
    pub trailer: Option<String>,
    /// Block S.
    pub system_trailer: Option<String>,
    /// Line of block 1.
    pub line: usize,
    /// Line on which block 4 starts.
    pub text_line: usize,
}

impl Envelope {
    /// Direction and message type encoded at the start of block 2.
    pub fn message_type(&self) -> Result<(Direction, MessageType)> {
        let header = self.application_header.as_str();
        let direction = match header.chars().next() {
            Some('I') => Direction::Input,
            Some('O') => Direction::Output,
            _ => {
                return Err(Error::BlockFraming {
                    line: self.line,
                    message: format!("application header {header:?} must start with I or O"),
                })
            }
        };
        let code = header.get(1..4).ok_or_else(|| Error::BlockFraming {
            line: self.line,
            message: format!("application header {header:?} has no message type"),
        })?;
        Ok((direction, code.parse()?))
    }

    /// Block 3 as ordered `{tag:value}` pairs.
    pub fn user_header_fields(&self) -> Result<Vec<(String, String)>> {
        parse_tag_blocks(self.user_header.as_deref().unwrap_or(""), self.line)
    }

    /// Block 5 as ordered `{tag:value}` pairs.
    pub fn trailer_fields(&self) -> Result<Vec<(String, String)>> {
        parse_tag_blocks(self.trailer.as_deref().unwrap_or(""), self.line)
    }

    /// Write the envelope back out as adjacent blocks.
    pub fn render(&self) -> String {
        let mut out = format!("{{1:{}}}{{2:{}}}", self.basic_header, self.application_header);
        if let Some(ref user_header) = self.user_header {
            out.push_str(&format!("{{3:{user_header}}}"));
        }
        out.push_str(&format!("{{4:{}}}", self.text));
        if let Some(ref trailer) = self.trailer {
            out.push_str(&format!("{{5:{trailer}}}"));
        }
        if let Some(ref system_trailer) = self.system_trailer {
            out.push_str(&format!("{{S:{system_trailer}}}"));
        }
        out
    }
}

/// Groups blocks into envelopes; every block `1` starts a new envelope.
pub struct EnvelopeReader<R> {
    blocks: BlockReader<R>,
    pending: Option<RawBlock>,
    halted: bool,
}

impl<R: BufRead> EnvelopeReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            blocks: BlockReader::new(reader),
            pending: None,
            halted: false,
        }
    }

    /// Read the next envelope, or `None` at end of stream.
    pub fn next_envelope(&mut self) -> Result<Option<Envelope>> {
        let first = match self.pending.take() {
            Some(block) => block,
            None => match self.blocks.next_block()? {
                Some(block) => block,
                None => return Ok(None),
            },
        };
        if first.id != "1" {
            return Err(Error::BlockFraming {
                line: first.line,
                message: format!("message must start with block 1, found block {}", first.id),
            });
        }

        let line = first.line;
        let mut slots: [Option<RawBlock>; 6] = Default::default();
        let mut last_rank = 0;
        slots[0] = Some(first);

        while let Some(block) = self.blocks.next_block()? {
            let rank = rank(&block.id);
            if rank == 0 {
                self.pending = Some(block);
                break;
            }
            if slots[rank].is_some() {
                return Err(Error::BlockFraming {
                    line: block.line,
                    message: format!("duplicate block {}", block.id),
                });
            }
            if rank < last_rank {
                return Err(Error::BlockFraming {
                    line: block.line,
                    message: format!("block {} out of order", block.id),
                });
            }
            last_rank = rank;
            slots[rank] = Some(block);
        }

        let [basic, application, user, text, trailer, system] = slots;
        let missing = |id: &str| Error::BlockFraming {
            line,
            message: format!("message is missing block {id}"),
        };
        let basic = basic.ok_or_else(|| missing("1"))?;
        let application = application.ok_or_else(|| missing("2"))?;
        let text = text.ok_or_else(|| missing("4"))?;

        tracing::debug!(line, header = %application.content, "envelope framed");
        Ok(Some(Envelope {
            basic_header: basic.content,
            application_header: application.content,
            user_header: user.map(|b| b.content),
            text_line: text.line,
            text: text.content,
            trailer: trailer.map(|b| b.content),
            system_trailer: system.map(|b| b.content),
            line,
        }))
    }
}

impl<R: BufRead> Iterator for EnvelopeReader<R> {
    type Item = Result<Envelope>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let result = self.next_envelope().transpose();
        if matches!(result, Some(Err(_)) | None) {
            self.halted = true;
        }
        result
    }
}

fn rank(id: &str) -> usize {
    BLOCK_ORDER.iter().position(|known| *known == id).unwrap_or(0)
}

/// Parse `{tag:value}{tag:value}` as found in blocks 3, 5 and S.
pub fn parse_tag_blocks(content: &str, line: usize) -> Result<Vec<(String, String)>> {
    let malformed = |rest: &str| Error::BlockFraming {
        line,
        message: format!("malformed tag block {rest:?}"),
    };

    let mut pairs = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let inner = rest.strip_prefix('{').ok_or_else(|| malformed(rest))?;
        let end = inner.find('}').ok_or_else(|| malformed(rest))?;
        let (tag, value) = inner[..end].split_once(':').ok_or_else(|| malformed(rest))?;
        if tag.is_empty() || tag.contains('{') {
            return Err(malformed(rest));
        }
        pairs.push((tag.to_string(), value.to_string()));
        rest = &inner[end + 1..];
    }
    Ok(pairs)
}
