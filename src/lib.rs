//! SWIFT FIN Reader Library
//!
//! A library for reading and writing SWIFT FIN statement and payment messages.
//!
//! # Supported Messages
//!
//! - **MT940**: customer statement
//! - **MT942**: interim transaction report
//! - **MT103**: single customer credit transfer (reference, time indication and operation code)
//!
//! # Pipeline
//!
//! - [`block`] splits a FIN envelope into `{id:content}` blocks
//! - [`field`] splits a text block into `:tag:content` fields
//! - [`registry`] decodes each field through its compiled [`notation`]
//! - [`assembler`] sequences typed fields into pages, one per `-` line
//!
//! Rendering runs the same steps backwards through [`subfield::render`].
//!
//! # Examples
//!
//! ## Reading MT940 pages from a bare field stream
//!
//! ```no_run
//! use std::fs::File;
//! use swift_fin::{EntryDatePolicy, Mt940Page, ReadOptions};
//!
//! let mut file = File::open("statement.sta")?;
//! let options = ReadOptions::new(EntryDatePolicy::NearestToValueDate);
//! for page in Mt940Page::from_read(&mut file, options)? {
//!     println!("{}: {} entries", page.reference, page.transactions.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Reading FIN envelopes
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use swift_fin::{EntryDatePolicy, FinReader, ReadOptions};
//!
//! let file = File::open("messages.fin")?;
//! let options = ReadOptions::new(EntryDatePolicy::RolloverOnEarlierMonth);
//! let mut reader = FinReader::new(BufReader::new(file), options);
//! while let Some(message) = reader.read_next()? {
//!     println!("{} {}", message.message_type, message.page.reference());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assembler;
pub mod block;
pub mod error;
pub mod field;
pub mod message;
pub mod mt103_format;
pub mod mt940_format;
pub mod mt942_format;
pub mod notation;
pub mod options;
pub mod registry;
pub mod subfield;
pub mod types;

use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use assembler::{PageAssembler, PageLayout, PageReader};
pub use error::{Error, Result, SubfieldError};
pub use message::{read_pages, AnyPage, FinMessage, FinReader};
pub use mt103_format::{Mt103, Mt103Page};
pub use mt940_format::{Mt940, Mt940Page};
pub use mt942_format::{Mt942, Mt942Page};
pub use notation::Notation;
pub use options::{EntryDatePolicy, ReadOptions};
pub use registry::FieldRegistry;
pub use types::{Balance, BalanceStatus, DebitCredit, Field, StatementLine, TransactionGroup};

/// Supported message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// MT940 customer statement
    Mt940,
    /// MT942 interim transaction report
    Mt942,
    /// MT103 customer credit transfer
    Mt103,
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        let code = lower
            .trim_start_matches("mt")
            .trim_start_matches('-');
        match code {
            "940" => Ok(MessageType::Mt940),
            "942" => Ok(MessageType::Mt942),
            "103" => Ok(MessageType::Mt103),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl MessageType {
    /// The three digit type code used in the application header.
    pub fn code(&self) -> &'static str {
        match self {
            MessageType::Mt940 => "940",
            MessageType::Mt942 => "942",
            MessageType::Mt103 => "103",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MT{}", self.code())
    }
}
