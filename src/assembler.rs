//! Page assembly.
//!
//! A page is the run of fields between two `-` lines. Each message type
//! describes its page as a [`PageLayout`]: a table of legal transitions
//! between states plus a builder that collects the decoded fields. The
//! assembler walks that table one field at a time and hands out a finished
//! page whenever the separator is reached.

use crate::error::{Error, Result};
use crate::field::{render_fields, FieldItem, FieldReader, RawField, PAGE_SEPARATOR};
use crate::options::ReadOptions;
use crate::registry::{self, FieldRegistry};
use crate::types::{Field, StatementLine};
use crate::MessageType;
use std::fmt::Debug;
use std::io::{BufRead, Write};

/// The field grammar and page builder of one message type.
pub trait PageLayout {
    /// Position within a page.
    type State: Copy + Eq + Debug + 'static;
    /// Collects decoded fields until the page is complete.
    type Builder: Default;
    /// The finished page.
    type Page;

    const MESSAGE_TYPE: MessageType;
    /// State before the first field of a page.
    const START: Self::State;
    /// `(from, tag, to)` triples. The page separator is written as `"-"`.
    const TRANSITIONS: &'static [(Self::State, &'static str, Self::State)];

    /// Add a decoded field. `state` is the state the field moved the page into.
    fn accumulate(
        builder: &mut Self::Builder,
        state: Self::State,
        field: Field,
        line: usize,
    ) -> Result<()>;

    /// Build the page once its separator has been reached.
    fn finish(builder: Self::Builder, line: usize) -> Result<Self::Page>;

    /// The page's fields in canonical order, for rendering.
    fn fields(page: &Self::Page) -> Vec<Field>;
}

fn target<L: PageLayout>(state: L::State, tag: &str) -> Option<L::State> {
    L::TRANSITIONS
        .iter()
        .find(|(from, t, _)| *from == state && *t == tag)
        .map(|(_, _, to)| *to)
}

fn expected<L: PageLayout>(state: L::State) -> String {
    let tags: Vec<&str> = L::TRANSITIONS
        .iter()
        .filter(|(from, _, _)| *from == state)
        .map(|(_, tag, _)| *tag)
        .collect();
    tags.join(", ")
}

/// Immutable position within a page, threaded through [`Progress::step`].
pub struct Progress<L: PageLayout> {
    state: L::State,
    builder: L::Builder,
    previous: Option<String>,
}

/// Outcome of feeding one item to a [`Progress`].
pub enum Step<L: PageLayout> {
    Continue(Progress<L>),
    Complete(L::Page),
}

impl<L: PageLayout> Default for Progress<L> {
    fn default() -> Self {
        Self {
            state: L::START,
            builder: L::Builder::default(),
            previous: None,
        }
    }
}

impl<L: PageLayout> Progress<L> {
    pub fn state(&self) -> L::State {
        self.state
    }

    /// Tag of the last field accepted on this page.
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// True before the first field of a page.
    pub fn is_idle(&self) -> bool {
        self.previous.is_none()
    }

    /// Consume one framed item.
    pub fn step(self, item: FieldItem, registry: &FieldRegistry) -> Result<Step<L>> {
        let (tag, line) = match &item {
            FieldItem::Field(raw) => (raw.tag.as_str(), raw.line),
            FieldItem::Separator(line) => (PAGE_SEPARATOR, *line),
        };

        let next = target::<L>(self.state, tag).ok_or_else(|| Error::UnexpectedField {
            line,
            tag: tag.to_string(),
            previous: self.previous.clone(),
            expected: expected::<L>(self.state),
        })?;

        match item {
            FieldItem::Separator(line) => Ok(Step::Complete(L::finish(self.builder, line)?)),
            FieldItem::Field(raw) => {
                let field = registry.decode(&raw)?;
                let mut builder = self.builder;
                L::accumulate(&mut builder, next, field, raw.line)?;
                Ok(Step::Continue(Progress {
                    state: next,
                    builder,
                    previous: Some(raw.tag),
                }))
            }
        }
    }
}

/// Push-based assembler; resets after every page and after every error.
pub struct PageAssembler<L: PageLayout> {
    registry: FieldRegistry,
    progress: Progress<L>,
}

impl<L: PageLayout> PageAssembler<L> {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            registry: FieldRegistry::new(L::MESSAGE_TYPE, options.entry_dates),
            progress: Progress::default(),
        }
    }

    /// Feed one item; returns the page it completed, if any.
    pub fn push(&mut self, item: FieldItem) -> Result<Option<L::Page>> {
        let progress = std::mem::take(&mut self.progress);
        match progress.step(item, &self.registry)? {
            Step::Continue(next) => {
                self.progress = next;
                Ok(None)
            }
            Step::Complete(page) => Ok(Some(page)),
        }
    }

    /// Signal end of input; fails when a page was left open.
    pub fn finish(&self, line: usize) -> Result<()> {
        if self.progress.is_idle() {
            Ok(())
        } else {
            Err(Error::UnfinishedPage {
                line,
                previous: self.progress.previous.clone(),
            })
        }
    }
}

/// Reads pages of one message type from a bare field stream.
pub struct PageReader<R, L: PageLayout> {
    fields: FieldReader<R>,
    assembler: PageAssembler<L>,
    halted: bool,
}

impl<R: BufRead, L: PageLayout> PageReader<R, L> {
    pub fn new(reader: R, options: ReadOptions) -> Self {
        Self::starting_at_line(reader, 1, options)
    }

    pub fn starting_at_line(reader: R, first_line: usize, options: ReadOptions) -> Self {
        Self {
            fields: FieldReader::starting_at_line(reader, first_line),
            assembler: PageAssembler::new(options),
            halted: false,
        }
    }

    /// Read the next page, or `None` once the stream is exhausted.
    pub fn read_next(&mut self) -> Result<Option<L::Page>> {
        while let Some(item) = self.fields.next_item()? {
            let line = item.line();
            if let Some(page) = self.assembler.push(item)? {
                let message_type = L::MESSAGE_TYPE;
                tracing::debug!(%message_type, line, "page complete");
                return Ok(Some(page));
            }
        }
        self.assembler.finish(self.fields.line())?;
        Ok(None)
    }

    pub fn read_all(&mut self) -> Result<Vec<L::Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.read_next()? {
            pages.push(page);
        }
        Ok(pages)
    }
}

/// Yields pages until the first error, which ends the iteration.
impl<R: BufRead, L: PageLayout> Iterator for PageReader<R, L> {
    type Item = Result<L::Page>;

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

/// Encode every field of a page.
pub fn encode_page<L: PageLayout>(page: &L::Page) -> Result<Vec<RawField>> {
    L::fields(page)
        .iter()
        .map(|field| registry::encode(L::MESSAGE_TYPE, field))
        .collect()
}

/// Render a page as text-block lines ending with the `-` separator.
pub fn render_page<L: PageLayout>(page: &L::Page) -> Result<String> {
    Ok(render_fields(&encode_page::<L>(page)?))
}

/// Write a rendered page followed by a line break.
pub fn write_page<L: PageLayout, W: Write>(page: &L::Page, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", render_page::<L>(page)?)?;
    Ok(())
}

/// Fails unless `currency` matches the page's reference currency.
pub(crate) fn check_currency(reference: &str, currency: &str, tag: &str, line: usize) -> Result<()> {
    if currency == reference {
        Ok(())
    } else {
        Err(Error::semantic(
            line,
            tag,
            format!("currency {currency} differs from {reference}"),
        ))
    }
}

/// The funds code of a statement line, when present, is the third letter of the currency.
pub(crate) fn check_funds_code(entry: &StatementLine, reference: &str, line: usize) -> Result<()> {
    match entry.funds_code {
        Some(code) if reference.chars().nth(2) != Some(code) => Err(Error::semantic(
            line,
            "61",
            format!("funds code {code} does not match currency {reference}"),
        )),
        _ => Ok(()),
    }
}

/// Missing mandatory value at page end.
pub(crate) fn required<T>(value: Option<T>, tag: &str, line: usize) -> Result<T> {
    value.ok_or_else(|| Error::semantic(line, tag, "mandatory field missing from page"))
}
