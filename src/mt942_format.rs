//! MT942 interim transaction report pages.
//!
//! ```text
//! :20:  reference             :21: related reference (optional)
//! :25:  account               :28C: statement / sequence number
//! :34F: debit floor limit, optionally a second :34F: credit floor limit
//! :13D: date and time of the report
//! :61:  statement line, each optionally followed by one :86:
//! :90D: debit summary (optional)
//! :90C: credit summary (optional)
//! :86:  information for the whole page (optional)
//! ```
//!
//! The first floor limit fixes the page currency. When both limits are
//! present the first carries mark `D` and the second mark `C`; a single
//! limit applies to both directions.

use crate::assembler::{self, check_currency, check_funds_code, required, PageLayout, PageReader};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::types::{
    DebitCredit, Field, FloorLimit, StatementNumber, TransactionGroup, TransactionSummary,
};
use crate::MessageType;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read, Write};

/// One MT942 report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mt942Page {
    pub reference: String,
    pub related_reference: Option<String>,
    pub account: String,
    pub statement_number: StatementNumber,
    /// First `:34F:`.
    pub debit_floor_limit: FloorLimit,
    /// Second `:34F:`, when the limits differ by direction.
    pub credit_floor_limit: Option<FloorLimit>,
    /// `:13D:`
    pub date_time: DateTime<FixedOffset>,
    pub transactions: Vec<TransactionGroup>,
    /// `:90D:`
    pub debit_summary: Option<TransactionSummary>,
    /// `:90C:`
    pub credit_summary: Option<TransactionSummary>,
    pub information: Option<String>,
}

impl Mt942Page {
    pub fn currency(&self) -> &str {
        &self.debit_floor_limit.currency
    }

    /// The limit for credit entries: the second `:34F:` or else the only one.
    pub fn effective_credit_floor_limit(&self) -> &FloorLimit {
        self.credit_floor_limit
            .as_ref()
            .unwrap_or(&self.debit_floor_limit)
    }

    /// Parse every MT942 page of a bare field stream.
    pub fn from_read<R: Read>(reader: &mut R, options: ReadOptions) -> Result<Vec<Self>> {
        PageReader::<_, Mt942>::new(BufReader::new(reader), options).read_all()
    }

    /// The page's fields in canonical order.
    pub fn fields(&self) -> Vec<Field> {
        Mt942::fields(self)
    }

    pub fn render(&self) -> Result<String> {
        assembler::render_page::<Mt942>(self)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        assembler::write_page::<Mt942, W>(self, writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mt942State {
    Start,
    Reference,
    RelatedReference,
    Account,
    Numbered,
    DebitLimit,
    CreditLimit,
    Reported,
    Entry,
    EntryInformation,
    DebitTotal,
    CreditTotal,
    PageInformation,
}

/// The MT942 page layout.
pub struct Mt942;

#[derive(Default)]
pub struct Mt942Builder {
    reference: Option<String>,
    related_reference: Option<String>,
    account: Option<String>,
    statement_number: Option<StatementNumber>,
    debit_floor_limit: Option<FloorLimit>,
    credit_floor_limit: Option<FloorLimit>,
    date_time: Option<DateTime<FixedOffset>>,
    transactions: Vec<TransactionGroup>,
    debit_summary: Option<TransactionSummary>,
    credit_summary: Option<TransactionSummary>,
    information: Option<String>,
}

impl Mt942Builder {
    fn currency(&self, tag: &str, line: usize) -> Result<&str> {
        self.debit_floor_limit
            .as_ref()
            .map(|limit| limit.currency.as_str())
            .ok_or_else(|| Error::semantic(line, tag, "no floor limit before this field"))
    }
}

impl PageLayout for Mt942 {
    type State = Mt942State;
    type Builder = Mt942Builder;
    type Page = Mt942Page;

    const MESSAGE_TYPE: MessageType = MessageType::Mt942;
    const START: Mt942State = Mt942State::Start;
    const TRANSITIONS: &'static [(Mt942State, &'static str, Mt942State)] = {
        use Mt942State::*;
        &[
            (Start, "20", Reference),
            (Reference, "21", RelatedReference),
            (Reference, "25", Account),
            (RelatedReference, "25", Account),
            (Account, "28C", Numbered),
            (Numbered, "34F", DebitLimit),
            (DebitLimit, "34F", CreditLimit),
            (DebitLimit, "13D", Reported),
            (CreditLimit, "13D", Reported),
            (Reported, "61", Entry),
            (Reported, "90D", DebitTotal),
            (Reported, "90C", CreditTotal),
            (Reported, "86", PageInformation),
            (Reported, "-", Start),
            (Entry, "61", Entry),
            (Entry, "86", EntryInformation),
            (Entry, "90D", DebitTotal),
            (Entry, "90C", CreditTotal),
            (Entry, "-", Start),
            (EntryInformation, "61", Entry),
            (EntryInformation, "90D", DebitTotal),
            (EntryInformation, "90C", CreditTotal),
            (EntryInformation, "-", Start),
            (DebitTotal, "90C", CreditTotal),
            (DebitTotal, "86", PageInformation),
            (DebitTotal, "-", Start),
            (CreditTotal, "86", PageInformation),
            (CreditTotal, "-", Start),
            (PageInformation, "-", Start),
        ]
    };

    fn accumulate(
        builder: &mut Mt942Builder,
        state: Mt942State,
        field: Field,
        line: usize,
    ) -> Result<()> {
        let tag = field.tag();
        match field {
            Field::TransactionReference(reference) => builder.reference = Some(reference),
            Field::RelatedReference(reference) => builder.related_reference = Some(reference),
            Field::AccountIdentification(account) => builder.account = Some(account),
            Field::StatementNumber(number) => builder.statement_number = Some(number),
            Field::FloorLimit(limit) if state == Mt942State::DebitLimit => {
                builder.debit_floor_limit = Some(limit);
            }
            Field::FloorLimit(limit) => {
                check_currency(builder.currency(tag, line)?, &limit.currency, tag, line)?;
                let debit_mark = builder.debit_floor_limit.as_ref().and_then(|l| l.mark);
                if debit_mark != Some(DebitCredit::Debit) || limit.mark != Some(DebitCredit::Credit) {
                    return Err(Error::semantic(
                        line,
                        tag,
                        "two floor limits must be marked D then C",
                    ));
                }
                builder.credit_floor_limit = Some(limit);
            }
            Field::DateTimeIndication(date_time) => builder.date_time = Some(date_time),
            Field::StatementLine(entry) => {
                check_funds_code(&entry, builder.currency(tag, line)?, line)?;
                builder.transactions.push(TransactionGroup::new(entry));
            }
            Field::InformationToAccountOwner(text) => match (state, builder.transactions.last_mut()) {
                (Mt942State::EntryInformation, Some(group)) => group.info = Some(text),
                _ => builder.information = Some(text),
            },
            Field::DebitSummary(summary) => {
                check_currency(builder.currency(tag, line)?, &summary.currency, tag, line)?;
                builder.debit_summary = Some(summary);
            }
            Field::CreditSummary(summary) => {
                check_currency(builder.currency(tag, line)?, &summary.currency, tag, line)?;
                builder.credit_summary = Some(summary);
            }
            other => {
                return Err(Error::semantic(line, other.tag(), "not part of an MT942 page"));
            }
        }
        Ok(())
    }

    fn finish(builder: Mt942Builder, line: usize) -> Result<Mt942Page> {
        Ok(Mt942Page {
            reference: required(builder.reference, "20", line)?,
            related_reference: builder.related_reference,
            account: required(builder.account, "25", line)?,
            statement_number: required(builder.statement_number, "28C", line)?,
            debit_floor_limit: required(builder.debit_floor_limit, "34F", line)?,
            credit_floor_limit: builder.credit_floor_limit,
            date_time: required(builder.date_time, "13D", line)?,
            transactions: builder.transactions,
            debit_summary: builder.debit_summary,
            credit_summary: builder.credit_summary,
            information: builder.information,
        })
    }

    fn fields(page: &Mt942Page) -> Vec<Field> {
        let mut fields = vec![Field::TransactionReference(page.reference.clone())];
        fields.extend(page.related_reference.clone().map(Field::RelatedReference));
        fields.push(Field::AccountIdentification(page.account.clone()));
        fields.push(Field::StatementNumber(page.statement_number));
        fields.push(Field::FloorLimit(page.debit_floor_limit.clone()));
        fields.extend(page.credit_floor_limit.clone().map(Field::FloorLimit));
        fields.push(Field::DateTimeIndication(page.date_time));
        for group in &page.transactions {
            fields.push(Field::StatementLine(group.statement_line.clone()));
            fields.extend(group.info.clone().map(Field::InformationToAccountOwner));
        }
        fields.extend(page.debit_summary.clone().map(Field::DebitSummary));
        fields.extend(page.credit_summary.clone().map(Field::CreditSummary));
        fields.extend(page.information.clone().map(Field::InformationToAccountOwner));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EntryDatePolicy;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::io::Cursor;

    const SAMPLE: &str = "\
:20:INTRADAY-0815
:25:DE89370400440532013000
:28C:42/3
:34F:EURD1000,
:34F:EURC2500,
:13D:1601021530+0100
:61:160102C2600,NTRFPAYROLL//X99
:86:LARGE CREDIT
:61:160102D1200,50NDDTNONREF
:90D:1EUR1200,50
:90C:1EUR2600,
-";

    fn parse(input: &str) -> Result<Vec<Mt942Page>> {
        let options = ReadOptions::new(EntryDatePolicy::NearestToValueDate);
        Mt942Page::from_read(&mut Cursor::new(input), options)
    }

    #[test]
    fn test_parse_report() {
        let pages = parse(SAMPLE).unwrap();
        assert_eq!(pages.len(), 1);
        let page = &pages[0];

        assert_eq!(page.reference, "INTRADAY-0815");
        assert_eq!(page.currency(), "EUR");
        assert_eq!(page.debit_floor_limit.mark, Some(DebitCredit::Debit));
        assert_eq!(
            page.effective_credit_floor_limit().amount,
            Decimal::new(2500, 0)
        );
        assert_eq!(page.date_time.to_rfc3339(), "2016-01-02T15:30:00+01:00");
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.transactions[0].info.as_deref(), Some("LARGE CREDIT"));
        assert_eq!(page.debit_summary.as_ref().map(|s| s.entries), Some(1));
        assert_eq!(page.credit_summary.as_ref().map(|s| s.amount), Some(Decimal::new(2600, 0)));
        assert_eq!(page.information, None);
    }

    #[test]
    fn test_render_is_canonical() {
        let pages = parse(SAMPLE).unwrap();
        assert_eq!(pages[0].render().unwrap(), SAMPLE);
    }

    #[test]
    fn test_single_floor_limit_applies_to_both() {
        let input = ":20:R\n:25:A\n:28C:1\n:34F:USD0,\n:13D:1601020000-0500\n:86:NOTHING TODAY\n-";
        let pages = parse(input).unwrap();
        let page = &pages[0];
        assert_eq!(page.credit_floor_limit, None);
        assert_eq!(page.effective_credit_floor_limit(), &page.debit_floor_limit);
        assert_eq!(page.information.as_deref(), Some("NOTHING TODAY"));
        assert_eq!(page.render().unwrap(), input);
    }

    #[test]
    fn test_floor_limit_marks_must_be_ordered() {
        let input = ":20:R\n:25:A\n:28C:1\n:34F:EURC1,\n:34F:EURD1,\n:13D:1601020000+0000\n-";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { line: 5, .. }));
    }

    #[test]
    fn test_summary_currency_mismatch() {
        let input = ":20:R\n:25:A\n:28C:1\n:34F:EUR0,\n:13D:1601020000+0000\n:90D:0USD0,\n-";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { line: 6, .. }));
    }

    #[test]
    fn test_third_floor_limit_is_a_sequence_error() {
        let input = ":20:R\n:25:A\n:28C:1\n:34F:EURD1,\n:34F:EURC1,\n:34F:EUR1,\n:13D:1601020000+0000\n-";
        let err = parse(input).unwrap_err();
        assert!(err.is_sequence_error());
    }

    #[test]
    fn test_credit_summary_before_debit_is_rejected() {
        let input = ":20:R\n:25:A\n:28C:1\n:34F:EUR0,\n:13D:1601020000+0000\n:90C:0EUR0,\n:90D:0EUR0,\n-";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, Error::UnexpectedField { line: 7, .. }));
    }
}
