//! MT103 payment pages.
//!
//! Only the header fields of a customer credit transfer are carried:
//! `:20:` sender's reference, an optional `:13C:` time indication and the
//! `:23B:` bank operation code.

use crate::assembler::{self, required, PageLayout, PageReader};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::types::{Field, TimeIndication};
use crate::MessageType;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read, Write};

/// Bank operation codes accepted in `:23B:`.
pub const BANK_OPERATION_CODES: [&str; 5] = ["CRED", "CRTS", "SPAY", "SPRI", "SSTD"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mt103Page {
    pub reference: String,
    pub time_indication: Option<TimeIndication>,
    pub bank_operation_code: String,
}

impl Mt103Page {
    pub fn from_read<R: Read>(reader: &mut R, options: ReadOptions) -> Result<Vec<Self>> {
        PageReader::<_, Mt103>::new(BufReader::new(reader), options).read_all()
    }

    /// The page's fields in canonical order.
    pub fn fields(&self) -> Vec<Field> {
        Mt103::fields(self)
    }

    pub fn render(&self) -> Result<String> {
        assembler::render_page::<Mt103>(self)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        assembler::write_page::<Mt103, W>(self, writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mt103State {
    Start,
    Reference,
    Timed,
    OperationCode,
}

/// The MT103 page layout.
pub struct Mt103;

#[derive(Default)]
pub struct Mt103Builder {
    reference: Option<String>,
    time_indication: Option<TimeIndication>,
    bank_operation_code: Option<String>,
}

impl PageLayout for Mt103 {
    type State = Mt103State;
    type Builder = Mt103Builder;
    type Page = Mt103Page;

    const MESSAGE_TYPE: MessageType = MessageType::Mt103;
    const START: Mt103State = Mt103State::Start;
    const TRANSITIONS: &'static [(Mt103State, &'static str, Mt103State)] = &[
        (Mt103State::Start, "20", Mt103State::Reference),
        (Mt103State::Reference, "13C", Mt103State::Timed),
        (Mt103State::Reference, "23B", Mt103State::OperationCode),
        (Mt103State::Timed, "23B", Mt103State::OperationCode),
        (Mt103State::OperationCode, "-", Mt103State::Start),
    ];

    fn accumulate(builder: &mut Mt103Builder, _: Mt103State, field: Field, line: usize) -> Result<()> {
        match field {
            Field::TransactionReference(reference) => builder.reference = Some(reference),
            Field::TimeIndication(indication) => builder.time_indication = Some(indication),
            Field::BankOperationCode(code) => {
                if !BANK_OPERATION_CODES.contains(&code.as_str()) {
                    return Err(Error::semantic(
                        line,
                        "23B",
                        format!("unknown bank operation code {code}"),
                    ));
                }
                builder.bank_operation_code = Some(code);
            }
            other => {
                return Err(Error::semantic(line, other.tag(), "not part of an MT103 page"));
            }
        }
        Ok(())
    }

    fn finish(builder: Mt103Builder, line: usize) -> Result<Mt103Page> {
        Ok(Mt103Page {
            reference: required(builder.reference, "20", line)?,
            time_indication: builder.time_indication,
            bank_operation_code: required(builder.bank_operation_code, "23B", line)?,
        })
    }

    fn fields(page: &Mt103Page) -> Vec<Field> {
        let mut fields = vec![Field::TransactionReference(page.reference.clone())];
        fields.extend(page.time_indication.clone().map(Field::TimeIndication));
        fields.push(Field::BankOperationCode(page.bank_operation_code.clone()));
        fields
    }
}
