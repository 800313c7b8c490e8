//! Complete FIN messages: an envelope plus the page held in its text block.

use crate::assembler::{PageLayout, PageReader};
use crate::block::{Direction, Envelope, EnvelopeReader};
use crate::error::{Error, Result};
use crate::mt103_format::{Mt103, Mt103Page};
use crate::mt940_format::{Mt940, Mt940Page};
use crate::mt942_format::{Mt942, Mt942Page};
use crate::options::ReadOptions;
use crate::MessageType;
use serde::Serialize;
use std::io::{BufRead, Cursor, Read};

/// The decoded text block of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AnyPage {
    Mt940(Mt940Page),
    Mt942(Mt942Page),
    Mt103(Mt103Page),
}

impl AnyPage {
    pub fn message_type(&self) -> MessageType {
        match self {
            AnyPage::Mt940(_) => MessageType::Mt940,
            AnyPage::Mt942(_) => MessageType::Mt942,
            AnyPage::Mt103(_) => MessageType::Mt103,
        }
    }

    /// The `:20:` reference of the page.
    pub fn reference(&self) -> &str {
        match self {
            AnyPage::Mt940(page) => &page.reference,
            AnyPage::Mt942(page) => &page.reference,
            AnyPage::Mt103(page) => &page.reference,
        }
    }

    pub fn render(&self) -> Result<String> {
        match self {
            AnyPage::Mt940(page) => page.render(),
            AnyPage::Mt942(page) => page.render(),
            AnyPage::Mt103(page) => page.render(),
        }
    }
}

/// One message read from a FIN stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinMessage {
    pub envelope: Envelope,
    pub direction: Direction,
    pub message_type: MessageType,
    pub page: AnyPage,
}

impl FinMessage {
    /// The envelope with its text block regenerated from the page.
    pub fn render(&self) -> Result<String> {
        let mut envelope = self.envelope.clone();
        envelope.text = format!("\n{}", self.page.render()?);
        Ok(envelope.render())
    }
}

/// Reads envelopes and decodes each text block by the type in its application header.
pub struct FinReader<R> {
    envelopes: EnvelopeReader<R>,
    options: ReadOptions,
    halted: bool,
}

impl<R: BufRead> FinReader<R> {
    pub fn new(reader: R, options: ReadOptions) -> Self {
        Self {
            envelopes: EnvelopeReader::new(reader),
            options,
            halted: false,
        }
    }

    pub fn read_next(&mut self) -> Result<Option<FinMessage>> {
        let envelope = match self.envelopes.next_envelope()? {
            Some(envelope) => envelope,
            None => return Ok(None),
        };
        let (direction, message_type) = envelope.message_type()?;
        let page = match message_type {
            MessageType::Mt940 => AnyPage::Mt940(single_page::<Mt940>(&envelope, self.options)?),
            MessageType::Mt942 => AnyPage::Mt942(single_page::<Mt942>(&envelope, self.options)?),
            MessageType::Mt103 => AnyPage::Mt103(single_page::<Mt103>(&envelope, self.options)?),
        };
        tracing::debug!(line = envelope.line, %message_type, reference = page.reference(), "message decoded");
        Ok(Some(FinMessage {
            envelope,
            direction,
            message_type,
            page,
        }))
    }

    pub fn read_all(&mut self) -> Result<Vec<FinMessage>> {
        let mut messages = Vec::new();
        while let Some(message) = self.read_next()? {
            messages.push(message);
        }
        Ok(messages)
    }
}

impl<R: BufRead> Iterator for FinReader<R> {
    type Item = Result<FinMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let result = self.read_next().transpose();
        if matches!(result, Some(Err(_)) | None) {
            self.halted = true;
        }
        result
    }
}

/// Read every page of a bare field stream of one message type.
pub fn read_pages<R: Read>(
    reader: &mut R,
    message_type: MessageType,
    options: ReadOptions,
) -> Result<Vec<AnyPage>> {
    let pages = match message_type {
        MessageType::Mt940 => Mt940Page::from_read(reader, options)?
            .into_iter()
            .map(AnyPage::Mt940)
            .collect(),
        MessageType::Mt942 => Mt942Page::from_read(reader, options)?
            .into_iter()
            .map(AnyPage::Mt942)
            .collect(),
        MessageType::Mt103 => Mt103Page::from_read(reader, options)?
            .into_iter()
            .map(AnyPage::Mt103)
            .collect(),
    };
    Ok(pages)
}

/// Decode a text block that must hold exactly one page.
fn single_page<L: PageLayout>(envelope: &Envelope, options: ReadOptions) -> Result<L::Page> {
    let text = Cursor::new(envelope.text.as_bytes());
    let mut pages = PageReader::<_, L>::starting_at_line(text, envelope.text_line, options);
    let page = pages.read_next()?.ok_or_else(|| Error::BlockFraming {
        line: envelope.text_line,
        message: "text block holds no page".to_string(),
    })?;
    if pages.read_next()?.is_some() {
        return Err(Error::BlockFraming {
            line: envelope.text_line,
            message: "text block holds more than one page".to_string(),
        });
    }
    Ok(page)
}
