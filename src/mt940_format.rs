//! MT940 customer statement pages.
//!
//! A statement page runs from `:20:` to the `-` separator:
//!
//! ```text
//! :20:  reference             :21: related reference (optional)
//! :25:  account               :28C: statement / sequence number
//! :60F: or :60M: opening balance
//! :61:  statement line, each optionally followed by one :86:
//! :62F: or :62M: closing balance
//! :64:  closing available balance (optional)
//! :65:  forward available balances (any number)
//! :86:  information for the whole page (optional)
//! ```
//!
//! The opening balance fixes the page currency. Every later balance must use
//! it, and a statement line's funds code must be its third letter.

use crate::assembler::{self, check_currency, check_funds_code, required, PageLayout, PageReader};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::types::{Balance, BalanceStatus, Field, StatementNumber, TransactionGroup};
use crate::MessageType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read, Write};

/// One MT940 statement page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mt940Page {
    /// `:20:` transaction reference number.
    pub reference: String,
    /// `:21:` related reference.
    pub related_reference: Option<String>,
    /// `:25:` account identification.
    pub account: String,
    /// `:28C:`
    pub statement_number: StatementNumber,
    pub opening_status: BalanceStatus,
    pub opening_balance: Balance,
    /// `:61:` lines, each with its optional `:86:`.
    pub transactions: Vec<TransactionGroup>,
    pub closing_status: BalanceStatus,
    pub closing_balance: Balance,
    /// `:64:`
    pub closing_available_balance: Option<Balance>,
    /// `:65:`
    pub forward_available_balances: Vec<Balance>,
    /// Trailing `:86:` that belongs to the page rather than a statement line.
    pub information: Option<String>,
}

impl Mt940Page {
    /// Currency of the page, taken from the opening balance.
    pub fn currency(&self) -> &str {
        &self.opening_balance.currency
    }

    /// Net movement of all statement lines.
    pub fn turnover(&self) -> Decimal {
        self.transactions
            .iter()
            .map(|group| group.statement_line.signed_amount())
            .sum()
    }

    /// True when opening balance plus turnover equals the closing balance.
    pub fn is_balanced(&self) -> bool {
        self.opening_balance.signed_amount() + self.turnover() == self.closing_balance.signed_amount()
    }

    /// Parse every MT940 page of a bare field stream.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use swift_fin::{EntryDatePolicy, Mt940Page, ReadOptions};
    ///
    /// let mut file = File::open("statement.sta")?;
    /// let pages = Mt940Page::from_read(&mut file, ReadOptions::new(EntryDatePolicy::NearestToValueDate))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R, options: ReadOptions) -> Result<Vec<Self>> {
        PageReader::<_, Mt940>::new(BufReader::new(reader), options).read_all()
    }

    /// The page's fields in canonical order.
    pub fn fields(&self) -> Vec<Field> {
        Mt940::fields(self)
    }

    /// Canonical text of the page, ending with the `-` separator.
    pub fn render(&self) -> Result<String> {
        assembler::render_page::<Mt940>(self)
    }

    /// Write the page to any destination implementing `Write`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        assembler::write_page::<Mt940, W>(self, writer)
    }
}

/// Positions within an MT940 page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mt940State {
    Start,
    Reference,
    RelatedReference,
    Account,
    Numbered,
    OpeningBalance,
    Entry,
    EntryInformation,
    ClosingBalance,
    ClosingAvailable,
    ForwardAvailable,
    PageInformation,
}

/// The MT940 page layout.
pub struct Mt940;

#[derive(Default)]
pub struct Mt940Builder {
    reference: Option<String>,
    related_reference: Option<String>,
    account: Option<String>,
    statement_number: Option<StatementNumber>,
    opening: Option<(BalanceStatus, Balance)>,
    transactions: Vec<TransactionGroup>,
    closing: Option<(BalanceStatus, Balance)>,
    closing_available: Option<Balance>,
    forward_available: Vec<Balance>,
    information: Option<String>,
}

impl Mt940Builder {
    fn currency(&self, tag: &str, line: usize) -> Result<&str> {
        self.opening
            .as_ref()
            .map(|(_, balance)| balance.currency.as_str())
            .ok_or_else(|| Error::semantic(line, tag, "no opening balance before this field"))
    }
}

impl PageLayout for Mt940 {
    type State = Mt940State;
    type Builder = Mt940Builder;
    type Page = Mt940Page;

    const MESSAGE_TYPE: MessageType = MessageType::Mt940;
    const START: Mt940State = Mt940State::Start;
    const TRANSITIONS: &'static [(Mt940State, &'static str, Mt940State)] = {
        use Mt940State::*;
        &[
            (Start, "20", Reference),
            (Reference, "21", RelatedReference),
            (Reference, "25", Account),
            (RelatedReference, "25", Account),
            (Account, "28C", Numbered),
            (Numbered, "60F", OpeningBalance),
            (Numbered, "60M", OpeningBalance),
            (OpeningBalance, "61", Entry),
            (OpeningBalance, "62F", ClosingBalance),
            (OpeningBalance, "62M", ClosingBalance),
            (Entry, "61", Entry),
            (Entry, "86", EntryInformation),
            (Entry, "62F", ClosingBalance),
            (Entry, "62M", ClosingBalance),
            (EntryInformation, "61", Entry),
            (EntryInformation, "62F", ClosingBalance),
            (EntryInformation, "62M", ClosingBalance),
            (ClosingBalance, "64", ClosingAvailable),
            (ClosingBalance, "65", ForwardAvailable),
            (ClosingBalance, "86", PageInformation),
            (ClosingBalance, "-", Start),
            (ClosingAvailable, "65", ForwardAvailable),
            (ClosingAvailable, "86", PageInformation),
            (ClosingAvailable, "-", Start),
            (ForwardAvailable, "65", ForwardAvailable),
            (ForwardAvailable, "86", PageInformation),
            (ForwardAvailable, "-", Start),
            (PageInformation, "-", Start),
        ]
    };

    fn accumulate(
        builder: &mut Mt940Builder,
        state: Mt940State,
        field: Field,
        line: usize,
    ) -> Result<()> {
        let tag = field.tag();
        match field {
            Field::TransactionReference(reference) => builder.reference = Some(reference),
            Field::RelatedReference(reference) => builder.related_reference = Some(reference),
            Field::AccountIdentification(account) => builder.account = Some(account),
            Field::StatementNumber(number) => builder.statement_number = Some(number),
            Field::OpeningBalance(status, balance) => builder.opening = Some((status, balance)),
            Field::StatementLine(entry) => {
                check_funds_code(&entry, builder.currency(tag, line)?, line)?;
                builder.transactions.push(TransactionGroup::new(entry));
            }
            Field::InformationToAccountOwner(text) => match (state, builder.transactions.last_mut()) {
                (Mt940State::EntryInformation, Some(group)) => group.info = Some(text),
                _ => builder.information = Some(text),
            },
            Field::ClosingBalance(status, balance) => {
                check_currency(builder.currency(tag, line)?, &balance.currency, tag, line)?;
                builder.closing = Some((status, balance));
            }
            Field::ClosingAvailableBalance(balance) => {
                check_currency(builder.currency(tag, line)?, &balance.currency, tag, line)?;
                builder.closing_available = Some(balance);
            }
            Field::ForwardAvailableBalance(balance) => {
                check_currency(builder.currency(tag, line)?, &balance.currency, tag, line)?;
                builder.forward_available.push(balance);
            }
            other => {
                return Err(Error::semantic(line, other.tag(), "not part of an MT940 page"));
            }
        }
        Ok(())
    }

    fn finish(builder: Mt940Builder, line: usize) -> Result<Mt940Page> {
        let (opening_status, opening_balance) = required(builder.opening, "60F", line)?;
        let (closing_status, closing_balance) = required(builder.closing, "62F", line)?;
        Ok(Mt940Page {
            reference: required(builder.reference, "20", line)?,
            related_reference: builder.related_reference,
            account: required(builder.account, "25", line)?,
            statement_number: required(builder.statement_number, "28C", line)?,
            opening_status,
            opening_balance,
            transactions: builder.transactions,
            closing_status,
            closing_balance,
            closing_available_balance: builder.closing_available,
            forward_available_balances: builder.forward_available,
            information: builder.information,
        })
    }

    fn fields(page: &Mt940Page) -> Vec<Field> {
        let mut fields = vec![Field::TransactionReference(page.reference.clone())];
        fields.extend(page.related_reference.clone().map(Field::RelatedReference));
        fields.push(Field::AccountIdentification(page.account.clone()));
        fields.push(Field::StatementNumber(page.statement_number));
        fields.push(Field::OpeningBalance(page.opening_status, page.opening_balance.clone()));
        for group in &page.transactions {
            fields.push(Field::StatementLine(group.statement_line.clone()));
            fields.extend(group.info.clone().map(Field::InformationToAccountOwner));
        }
        fields.push(Field::ClosingBalance(page.closing_status, page.closing_balance.clone()));
        fields.extend(page.closing_available_balance.clone().map(Field::ClosingAvailableBalance));
        fields.extend(
            page.forward_available_balances
                .iter()
                .cloned()
                .map(Field::ForwardAvailableBalance),
        );
        fields.extend(page.information.clone().map(Field::InformationToAccountOwner));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EntryDatePolicy;
    use crate::types::DebitCredit;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const SAMPLE: &str = "\
:20:STARTUMS
:25:12345678/0001234567
:28C:1/1
:60F:C160101EUR100,00
:61:1601020102C25,50NTRFINVOICE-17//B1601020001
:86:PAYMENT INVOICE 17
ACME GMBH
:61:160103D5,25NCHGNONREF
:62F:C160103EUR120,25
:64:C160103EUR120,25
:65:C160104EUR120,25
:65:C160105EUR120,25
:86:END OF STATEMENT
-";

    fn options() -> ReadOptions {
        ReadOptions::new(EntryDatePolicy::NearestToValueDate)
    }

    fn parse(input: &str) -> Result<Vec<Mt940Page>> {
        Mt940Page::from_read(&mut Cursor::new(input), options())
    }

    #[test]
    fn test_parse_full_page() {
        let pages = parse(SAMPLE).unwrap();
        assert_eq!(pages.len(), 1);
        let page = &pages[0];

        assert_eq!(page.reference, "STARTUMS");
        assert_eq!(page.account, "12345678/0001234567");
        assert_eq!(page.statement_number, StatementNumber { statement: 1, sequence: Some(1) });
        assert_eq!(page.currency(), "EUR");
        assert_eq!(page.opening_status, BalanceStatus::Final);
        assert_eq!(page.opening_balance.amount, Decimal::new(10000, 2));
        assert_eq!(page.transactions.len(), 2);

        let first = &page.transactions[0];
        assert_eq!(first.statement_line.mark, DebitCredit::Credit);
        assert_eq!(
            first.statement_line.entry_date,
            NaiveDate::from_ymd_opt(2016, 1, 2)
        );
        assert_eq!(first.info.as_deref(), Some("PAYMENT INVOICE 17\nACME GMBH"));
        assert_eq!(page.transactions[1].info, None);

        assert_eq!(page.closing_balance.amount, Decimal::new(12025, 2));
        assert!(page.closing_available_balance.is_some());
        assert_eq!(page.forward_available_balances.len(), 2);
        assert_eq!(page.information.as_deref(), Some("END OF STATEMENT"));
        assert!(page.is_balanced());
    }

    #[test]
    fn test_render_is_canonical() {
        let pages = parse(SAMPLE).unwrap();
        assert_eq!(pages[0].render().unwrap(), SAMPLE);
    }

    #[test]
    fn test_write_to() {
        let pages = parse(SAMPLE).unwrap();
        let mut out = Vec::new();
        pages[0].write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{SAMPLE}\n"));
    }

    #[test]
    fn test_minimal_page_with_related_reference() {
        let input = ":20:REF\n:21:RELATED\n:25:ACC\n:28C:7\n:60M:D160101USD1,\n:62M:D160101USD1,\n-\n";
        let pages = parse(input).unwrap();
        assert_eq!(pages[0].related_reference.as_deref(), Some("RELATED"));
        assert_eq!(pages[0].statement_number.sequence, None);
        assert_eq!(pages[0].opening_status, BalanceStatus::Intermediate);
        assert!(pages[0].transactions.is_empty());
    }

    #[test]
    fn test_info_before_statement_line_is_rejected() {
        let input = ":20:REF\n:25:ACC\n:28C:1\n:60F:C160101EUR1,\n:86:EARLY\n:61:160101C1,NTRFNONREF\n:62F:C160101EUR2,\n-";
        let err = parse(input).unwrap_err();
        match err {
            Error::UnexpectedField { line, tag, previous, .. } => {
                assert_eq!(line, 5);
                assert_eq!(tag, "86");
                assert_eq!(previous.as_deref(), Some("60F"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_currency_mismatch() {
        let input = ":20:REF\n:25:ACC\n:28C:1\n:60F:C160101EUR1,\n:62F:C160101USD1,\n-";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { line: 5, .. }));
    }

    #[test]
    fn test_funds_code_mismatch() {
        let input = ":20:REF\n:25:ACC\n:28C:1\n:60F:C160101EUR1,\n:61:160101CD1,NTRFNONREF\n:62F:C160101EUR2,\n-";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { line: 5, .. }));
    }

    #[test]
    fn test_two_pages() {
        let input = format!("{SAMPLE}\n{}", SAMPLE.replace("STARTUMS", "SECOND"));
        let pages = parse(&input).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].reference, "SECOND");
    }
}
