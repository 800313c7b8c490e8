//! Field registry.
//!
//! Maps each tag to its compiled notation and turns the resulting subfield
//! values into typed [`Field`]s and back. Notations are compiled once per
//! process and shared read-only by every reader.

use crate::error::{Error, Result};
use crate::field::RawField;
use crate::notation::Notation;
use crate::options::EntryDatePolicy;
use crate::subfield::SubfieldValues;
use crate::types::{
    Balance, BalanceStatus, DebitCredit, Field, FloorLimit, StatementLine, StatementNumber,
    TimeIndication, TransactionSummary,
};
use crate::MessageType;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Tag to notation source, one entry per recognised tag.
const NOTATIONS: &[(&str, &str)] = &[
    ("20", "16x"),
    ("21", "16x"),
    ("25", "35x"),
    ("28C", "5n[/5n]"),
    ("60F", "1!a6!n3!a15d"),
    ("60M", "1!a6!n3!a15d"),
    ("62F", "1!a6!n3!a15d"),
    ("62M", "1!a6!n3!a15d"),
    ("64", "1!a6!n3!a15d"),
    ("65", "1!a6!n3!a15d"),
    ("61", "6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][BR34x]"),
    ("86", "6*65x"),
    ("34F", "3!a[1!a]15d"),
    ("13D", "6!n4!n1!s4!n"),
    ("90D", "5n3!a15d"),
    ("90C", "5n3!a15d"),
    ("13C", "/8c/4!n1!s4!n"),
    ("23B", "4!c"),
];

static NOTATION_TABLE: Lazy<HashMap<&'static str, Notation>> = Lazy::new(|| {
    NOTATIONS
        .iter()
        .filter_map(|(tag, source)| Notation::compile(source).ok().map(|n| (*tag, n)))
        .collect()
});

/// The compiled notation for `tag`, if the tag is known to any message type.
pub fn notation(tag: &str) -> Option<&'static Notation> {
    NOTATION_TABLE.get(tag)
}

/// Tags each message type may carry.
fn tags_for(message_type: MessageType) -> &'static [&'static str] {
    match message_type {
        MessageType::Mt940 => &[
            "20", "21", "25", "28C", "60F", "60M", "61", "86", "62F", "62M", "64", "65",
        ],
        MessageType::Mt942 => &["20", "21", "25", "28C", "34F", "13D", "61", "86", "90D", "90C"],
        MessageType::Mt103 => &["20", "13C", "23B"],
    }
}

/// Decodes and encodes the fields of one message type.
#[derive(Debug, Clone, Copy)]
pub struct FieldRegistry {
    message_type: MessageType,
    entry_dates: EntryDatePolicy,
}

impl FieldRegistry {
    pub fn new(message_type: MessageType, entry_dates: EntryDatePolicy) -> Self {
        Self {
            message_type,
            entry_dates,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn knows(&self, tag: &str) -> bool {
        tags_for(self.message_type).contains(&tag)
    }

    /// Notation for a tag of this message type.
    pub fn notation(&self, tag: &str) -> Option<&'static Notation> {
        if self.knows(tag) {
            notation(tag)
        } else {
            None
        }
    }

    /// Decode a framed field into its typed form.
    pub fn decode(&self, raw: &RawField) -> Result<Field> {
        let notation = self.notation(&raw.tag).ok_or_else(|| {
            Error::semantic(
                raw.line,
                &raw.tag,
                format!("tag is not part of {}", self.message_type),
            )
        })?;
        let values = notation.parse(&raw.content).map_err(|source| Error::Field {
            line: raw.line,
            tag: raw.tag.clone(),
            source,
        })?;
        let mut slots = Slots::new(raw, values);

        let field = match raw.tag.as_str() {
            "20" => Field::TransactionReference(slots.text()?),
            "21" => Field::RelatedReference(slots.text()?),
            "25" => Field::AccountIdentification(slots.text()?),
            "86" => Field::InformationToAccountOwner(slots.text()?),
            "23B" => Field::BankOperationCode(slots.text()?),
            "28C" => Field::StatementNumber(StatementNumber {
                statement: slots.number()?,
                sequence: slots.optional_number()?,
            }),
            "60F" => Field::OpeningBalance(BalanceStatus::Final, slots.balance()?),
            "60M" => Field::OpeningBalance(BalanceStatus::Intermediate, slots.balance()?),
            "62F" => Field::ClosingBalance(BalanceStatus::Final, slots.balance()?),
            "62M" => Field::ClosingBalance(BalanceStatus::Intermediate, slots.balance()?),
            "64" => Field::ClosingAvailableBalance(slots.balance()?),
            "65" => Field::ForwardAvailableBalance(slots.balance()?),
            "61" => Field::StatementLine(slots.statement_line(&self.entry_dates)?),
            "34F" => Field::FloorLimit(FloorLimit {
                currency: slots.text()?,
                mark: slots.optional_simple_mark()?,
                amount: slots.amount()?,
            }),
            "13D" => Field::DateTimeIndication(slots.date_time()?),
            "90D" => Field::DebitSummary(slots.summary()?),
            "90C" => Field::CreditSummary(slots.summary()?),
            "13C" => Field::TimeIndication(slots.time_indication()?),
            other => {
                return Err(Error::semantic(
                    raw.line,
                    other,
                    "no decoder for this tag",
                ))
            }
        };
        Ok(field)
    }

    /// Encode a typed field back into its raw `:tag:content` form.
    pub fn encode(&self, field: &Field) -> Result<RawField> {
        encode(self.message_type, field)
    }
}

/// Encode a typed field of `message_type`.
///
/// Needs no entry date policy, so renderers call it without a registry.
pub fn encode(message_type: MessageType, field: &Field) -> Result<RawField> {
    let tag = field.tag();
    let compiled = tags_for(message_type)
        .contains(&tag)
        .then(|| notation(tag))
        .flatten()
        .ok_or_else(|| Error::semantic(0, tag, format!("tag is not part of {message_type}")))?;

    let values: Vec<Option<String>> = match field {
        Field::TransactionReference(text)
        | Field::RelatedReference(text)
        | Field::AccountIdentification(text)
        | Field::InformationToAccountOwner(text)
        | Field::BankOperationCode(text) => vec![Some(text.clone())],
        Field::StatementNumber(number) => vec![
            Some(number.statement.to_string()),
            number.sequence.map(|s| s.to_string()),
        ],
        Field::OpeningBalance(_, balance)
        | Field::ClosingBalance(_, balance)
        | Field::ClosingAvailableBalance(balance)
        | Field::ForwardAvailableBalance(balance) => {
            if !balance.mark.is_simple() {
                return Err(Error::semantic(0, tag, "balance mark must be D or C"));
            }
            vec![
                Some(balance.mark.to_string()),
                Some(format_date(tag, &balance.date)?),
                Some(balance.currency.clone()),
                Some(format_amount(tag, &balance.amount)?),
            ]
        }
        Field::StatementLine(line) => encode_statement_line(line)?,
        Field::FloorLimit(limit) => {
            if limit.mark.is_some_and(|mark| !mark.is_simple()) {
                return Err(Error::semantic(0, tag, "floor limit mark must be D or C"));
            }
            vec![
                Some(limit.currency.clone()),
                limit.mark.map(|mark| mark.to_string()),
                Some(format_amount(tag, &limit.amount)?),
            ]
        }
        Field::DateTimeIndication(date_time) => {
            let (sign, offset) = format_offset(date_time.offset().local_minus_utc() / 60);
            vec![
                Some(format_date(tag, &date_time.date_naive())?),
                Some(date_time.format("%H%M").to_string()),
                Some(sign),
                Some(offset),
            ]
        }
        Field::DebitSummary(summary) | Field::CreditSummary(summary) => vec![
            Some(summary.entries.to_string()),
            Some(summary.currency.clone()),
            Some(format_amount(tag, &summary.amount)?),
        ],
        Field::TimeIndication(indication) => {
            let (sign, offset) = format_offset(indication.utc_offset_minutes);
            vec![
                Some(indication.code.clone()),
                Some(format!(
                    "{:02}{:02}",
                    indication.time.hour(),
                    indication.time.minute()
                )),
                Some(sign),
                Some(offset),
            ]
        }
    };

    let content = compiled.render(&values).map_err(|source| Error::Field {
        line: 0,
        tag: tag.to_string(),
        source,
    })?;
    Ok(RawField::new(tag, content))
}

fn encode_statement_line(line: &StatementLine) -> Result<Vec<Option<String>>> {
    let tag = "61";
    if line.transaction_type.chars().count() != 4 {
        return Err(Error::semantic(
            0,
            tag,
            format!(
                "transaction type {:?} must have four characters",
                line.transaction_type
            ),
        ));
    }
    let mut chars = line.transaction_type.chars();
    let id_code = chars.next().map(String::from);
    let code = chars.as_str().to_string();
    Ok(vec![
        Some(format_date(tag, &line.value_date)?),
        line.entry_date.map(|date| date.format("%m%d").to_string()),
        Some(line.mark.to_string()),
        line.funds_code.map(String::from),
        Some(format_amount(tag, &line.amount)?),
        id_code,
        Some(code),
        Some(line.customer_reference.clone()),
        line.bank_reference.clone(),
        line.supplementary_details.clone(),
    ])
}

/// Cursor over the subfield values of one field.
struct Slots<'a> {
    raw: &'a RawField,
    values: std::vec::IntoIter<Option<String>>,
}

impl<'a> Slots<'a> {
    fn new(raw: &'a RawField, values: SubfieldValues) -> Self {
        Self {
            raw,
            values: values.into_iter(),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::semantic(self.raw.line, &self.raw.tag, message)
    }

    fn optional(&mut self) -> Option<String> {
        self.values.next().flatten()
    }

    fn text(&mut self) -> Result<String> {
        self.optional()
            .ok_or_else(|| self.invalid("missing mandatory subfield"))
    }

    fn number(&mut self) -> Result<u32> {
        let text = self.text()?;
        text.parse()
            .map_err(|_| self.invalid(format!("{text:?} is not a number")))
    }

    fn optional_number(&mut self) -> Result<Option<u32>> {
        match self.optional() {
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("{text:?} is not a number"))),
            None => Ok(None),
        }
    }

    fn mark(&mut self) -> Result<DebitCredit> {
        let text = self.text()?;
        text.parse().map_err(|e: String| self.invalid(e))
    }

    fn simple_mark(&mut self) -> Result<DebitCredit> {
        let mark = self.mark()?;
        if !mark.is_simple() {
            return Err(self.invalid(format!("mark {mark} is not allowed here")));
        }
        Ok(mark)
    }

    fn optional_simple_mark(&mut self) -> Result<Option<DebitCredit>> {
        match self.optional() {
            Some(text) => match text.parse::<DebitCredit>() {
                Ok(mark) if mark.is_simple() => Ok(Some(mark)),
                _ => Err(self.invalid(format!("mark {text:?} is not allowed here"))),
            },
            None => Ok(None),
        }
    }

    fn date(&mut self) -> Result<NaiveDate> {
        let text = self.text()?;
        parse_date(&text).map_err(|e| self.invalid(e.to_string()))
    }

    fn amount(&mut self) -> Result<Decimal> {
        let text = self.text()?;
        parse_amount(&text).map_err(|e| self.invalid(e.to_string()))
    }

    fn balance(&mut self) -> Result<Balance> {
        Ok(Balance {
            mark: self.simple_mark()?,
            date: self.date()?,
            currency: self.text()?,
            amount: self.amount()?,
        })
    }

    fn summary(&mut self) -> Result<TransactionSummary> {
        Ok(TransactionSummary {
            entries: self.number()?,
            currency: self.text()?,
            amount: self.amount()?,
        })
    }

    fn statement_line(&mut self, entry_dates: &EntryDatePolicy) -> Result<StatementLine> {
        let value_date = self.date()?;
        let entry = self.optional();
        let mark_text = self.text()?;
        let mut funds_code = self.optional();

        // `2a` is greedy: a one-letter mark followed by a funds code arrives as one capture.
        let mark = match mark_text.parse::<DebitCredit>() {
            Ok(mark) => mark,
            Err(_) if funds_code.is_none() && mark_text.len() == 2 => {
                let (mark, code) = mark_text.split_at(1);
                funds_code = Some(code.to_string());
                mark.parse().map_err(|e: String| self.invalid(e))?
            }
            Err(e) => return Err(self.invalid(e)),
        };

        let entry_date = match entry {
            Some(mmdd) => {
                let month: u32 = mmdd[..2].parse().unwrap_or(0);
                let day: u32 = mmdd[2..].parse().unwrap_or(0);
                Some(entry_dates.resolve(value_date, month, day).ok_or_else(|| {
                    self.invalid(format!(
                        "entry date {mmdd} cannot be placed near value date {value_date}"
                    ))
                })?)
            }
            None => None,
        };

        let amount = self.amount()?;
        let transaction_type = format!("{}{}", self.text()?, self.text()?);

        Ok(StatementLine {
            value_date,
            entry_date,
            mark,
            funds_code: funds_code.and_then(|code| code.chars().next()),
            amount,
            transaction_type,
            customer_reference: self.text()?,
            bank_reference: self.optional(),
            supplementary_details: self.optional(),
        })
    }

    fn date_time(&mut self) -> Result<DateTime<FixedOffset>> {
        let date = self.date()?;
        let time = self.time()?;
        let offset = self.offset()?;
        let offset = FixedOffset::east_opt(offset * 60)
            .ok_or_else(|| self.invalid("UTC offset out of range"))?;
        offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(|| self.invalid("ambiguous local time"))
    }

    fn time_indication(&mut self) -> Result<TimeIndication> {
        Ok(TimeIndication {
            code: self.text()?,
            time: self.time()?,
            utc_offset_minutes: self.offset()?,
        })
    }

    fn time(&mut self) -> Result<NaiveTime> {
        let text = self.text()?;
        NaiveTime::parse_from_str(&text, "%H%M")
            .map_err(|_| self.invalid(format!("{text:?} is not a valid HHMM time")))
    }

    /// Sign and `HHMM` subfields as minutes east of UTC.
    fn offset(&mut self) -> Result<i32> {
        let sign = self.text()?;
        let text = self.text()?;
        let hours: i32 = text[..2].parse().unwrap_or(0);
        let minutes: i32 = text[2..].parse().unwrap_or(0);
        if hours > 14 || minutes > 59 {
            return Err(self.invalid(format!("{sign}{text} is not a valid UTC offset")));
        }
        let total = hours * 60 + minutes;
        Ok(if sign == "-" { -total } else { total })
    }
}

/// Parse a `YYMMDD` date; years below 50 fall into the 2000s.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    if text.len() != 6 || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidDate(format!("Invalid SWIFT date: {}", text)));
    }

    let year = text[0..2]
        .parse::<i32>()
        .map_err(|_| Error::InvalidDate(text.to_string()))?;
    let month = text[2..4]
        .parse::<u32>()
        .map_err(|_| Error::InvalidDate(text.to_string()))?;
    let day = text[4..6]
        .parse::<u32>()
        .map_err(|_| Error::InvalidDate(text.to_string()))?;

    let full_year = if year < 50 { 2000 + year } else { 1900 + year };

    NaiveDate::from_ymd_opt(full_year, month, day)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{}-{}", full_year, month, day)))
}

/// Format a date as `YYMMDD`.
///
/// Only years that [`parse_date`] reads back unchanged, 1950 through 2049, are accepted.
pub fn format_date(tag: &str, date: &NaiveDate) -> Result<String> {
    if !(1950..=2049).contains(&date.year()) {
        return Err(Error::semantic(
            0,
            tag,
            format!("date {date} is outside the two-digit year window"),
        ));
    }
    Ok(format!(
        "{:02}{:02}{:02}",
        date.year() % 100,
        date.month(),
        date.day()
    ))
}

/// Parse a comma-decimal amount such as `123,45` or `100,`, keeping its scale.
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let (whole, fraction) = text
        .split_once(',')
        .ok_or_else(|| Error::InvalidAmount(text.to_string()))?;
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };
    Decimal::from_str(&normalized).map_err(|_| Error::InvalidAmount(text.to_string()))
}

/// Format an amount with a decimal comma; whole amounts keep the trailing comma.
pub fn format_amount(tag: &str, amount: &Decimal) -> Result<String> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::semantic(
            0,
            tag,
            format!("amount {amount} must not be negative"),
        ));
    }
    let text = amount.abs().to_string();
    Ok(match text.split_once('.') {
        Some((whole, fraction)) => format!("{whole},{fraction}"),
        None => format!("{text},"),
    })
}

fn format_offset(minutes: i32) -> (String, String) {
    let sign = if minutes < 0 { "-" } else { "+" };
    let minutes = minutes.abs();
    (sign.to_string(), format!("{:02}{:02}", minutes / 60, minutes % 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(message_type: MessageType) -> FieldRegistry {
        FieldRegistry::new(message_type, EntryDatePolicy::NearestToValueDate)
    }

    fn raw(tag: &str, content: &str) -> RawField {
        RawField {
            tag: tag.into(),
            content: content.into(),
            line: 7,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn round_trip(registry: &FieldRegistry, tag: &str, content: &str) -> Field {
        let field = registry.decode(&raw(tag, content)).unwrap();
        let encoded = registry.encode(&field).unwrap();
        assert_eq!(encoded.render(), format!(":{tag}:{content}"));
        assert_eq!(registry.decode(&encoded).unwrap(), field);
        field
    }

    #[test]
    fn test_all_notations_compile() {
        for (tag, source) in NOTATIONS {
            assert!(Notation::compile(source).is_ok(), "{tag}: {source}");
            assert!(notation(tag).is_some());
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("250218").unwrap(), date(2025, 2, 18));
        assert_eq!(parse_date("991231").unwrap(), date(1999, 12, 31));
        assert!(parse_date("160230").is_err());
        assert!(parse_date("16023").is_err());
    }

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("100,").unwrap(), Decimal::new(100, 0));
        assert_eq!(parse_amount("123,45").unwrap(), Decimal::new(12345, 2));
        assert_eq!(format_amount("61", &Decimal::new(100, 0)).unwrap(), "100,");
        assert_eq!(format_amount("61", &Decimal::new(10000, 2)).unwrap(), "100,00");
        assert!(format_amount("61", &Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_balance() {
        let registry = registry(MessageType::Mt940);
        let field = round_trip(&registry, "60F", "D160717EUR123,");
        assert_eq!(
            field,
            Field::OpeningBalance(
                BalanceStatus::Final,
                Balance {
                    mark: DebitCredit::Debit,
                    date: date(2016, 7, 17),
                    currency: "EUR".into(),
                    amount: Decimal::new(123, 0),
                }
            )
        );
        assert!(registry.decode(&raw("62F", "X160717EUR123,")).is_err());
        assert!(registry.decode(&raw("62F", "C160717EUR123")).is_err());
    }

    #[test]
    fn test_statement_line() {
        let registry = registry(MessageType::Mt940);
        let field = round_trip(
            &registry,
            "61",
            "1612311231D1234,56NTRFINV-2016-12//B16123100042\nSALARY DECEMBER",
        );
        let Field::StatementLine(line) = field else {
            panic!("expected a statement line");
        };
        assert_eq!(line.value_date, date(2016, 12, 31));
        assert_eq!(line.entry_date, Some(date(2016, 12, 31)));
        assert_eq!(line.mark, DebitCredit::Debit);
        assert_eq!(line.amount, Decimal::new(123456, 2));
        assert_eq!(line.transaction_type, "NTRF");
        assert_eq!(line.customer_reference, "INV-2016-12");
        assert_eq!(line.bank_reference.as_deref(), Some("B16123100042"));
        assert_eq!(line.supplementary_details.as_deref(), Some("SALARY DECEMBER"));
    }

    #[test]
    fn test_statement_line_funds_code_resplit() {
        let registry = registry(MessageType::Mt940);
        let field = round_trip(&registry, "61", "160102CR10,NMSCNONREF");
        let Field::StatementLine(line) = field else {
            panic!("expected a statement line");
        };
        assert_eq!(line.mark, DebitCredit::Credit);
        assert_eq!(line.funds_code, Some('R'));

        let field = round_trip(&registry, "61", "160102RCR10,NMSCNONREF");
        let Field::StatementLine(line) = field else {
            panic!("expected a statement line");
        };
        assert_eq!(line.mark, DebitCredit::ReversalCredit);
        assert_eq!(line.funds_code, Some('R'));

        assert!(registry.decode(&raw("61", "160102XY10,NMSCNONREF")).is_err());
    }

    #[test]
    fn test_entry_date_policy_applies() {
        let nearest = registry(MessageType::Mt940);
        let rollover = FieldRegistry::new(MessageType::Mt940, EntryDatePolicy::RolloverOnEarlierMonth);
        let content = "1701021230C10,NTRFNONREF";
        let Field::StatementLine(line) = nearest.decode(&raw("61", content)).unwrap() else {
            panic!("expected a statement line");
        };
        assert_eq!(line.entry_date, Some(date(2016, 12, 30)));
        let Field::StatementLine(line) = rollover.decode(&raw("61", content)).unwrap() else {
            panic!("expected a statement line");
        };
        assert_eq!(line.entry_date, Some(date(2017, 12, 30)));
    }

    #[test]
    fn test_interim_fields() {
        let registry = registry(MessageType::Mt942);
        let field = round_trip(&registry, "34F", "EURD100,");
        assert_eq!(
            field,
            Field::FloorLimit(FloorLimit {
                currency: "EUR".into(),
                mark: Some(DebitCredit::Debit),
                amount: Decimal::new(100, 0),
            })
        );
        round_trip(&registry, "34F", "EUR0,");
        assert!(registry.decode(&raw("34F", "EURX100,")).is_err());

        let Field::DateTimeIndication(stamp) = round_trip(&registry, "13D", "1601021530+0100") else {
            panic!("expected a date time indication");
        };
        assert_eq!(stamp.offset().local_minus_utc(), 3600);
        round_trip(&registry, "13D", "1601021530-0330");

        let field = round_trip(&registry, "90D", "3EUR300,25");
        assert_eq!(
            field,
            Field::DebitSummary(TransactionSummary {
                entries: 3,
                currency: "EUR".into(),
                amount: Decimal::new(30025, 2),
            })
        );
    }

    #[test]
    fn test_payment_fields() {
        let registry = registry(MessageType::Mt103);
        let field = round_trip(&registry, "13C", "/SNDTIME/1249+0100");
        assert_eq!(
            field,
            Field::TimeIndication(TimeIndication {
                code: "SNDTIME".into(),
                time: NaiveTime::from_hms_opt(12, 49, 0).unwrap(),
                utc_offset_minutes: 60,
            })
        );
        round_trip(&registry, "23B", "CRED");
        assert!(registry.decode(&raw("13C", "/SNDTIME/2561+0100")).is_err());
    }

    #[test]
    fn test_statement_number() {
        let registry = registry(MessageType::Mt940);
        let field = round_trip(&registry, "28C", "12/3");
        assert_eq!(
            field,
            Field::StatementNumber(StatementNumber {
                statement: 12,
                sequence: Some(3),
            })
        );
        round_trip(&registry, "28C", "1");
    }

    #[test]
    fn test_zero_padded_numbers_render_canonically() {
        let registry = registry(MessageType::Mt940);
        let field = registry.decode(&raw("28C", "00001/001")).unwrap();
        assert_eq!(
            field,
            Field::StatementNumber(StatementNumber {
                statement: 1,
                sequence: Some(1),
            })
        );
        assert_eq!(registry.encode(&field).unwrap().render(), ":28C:1/1");
    }

    #[test]
    fn test_dates_at_year_window_edges() {
        let interim = registry(MessageType::Mt942);
        let registry = registry(MessageType::Mt940);
        for (content, expected) in [
            ("C500101EUR1,", date(1950, 1, 1)),
            ("C491231EUR1,", date(2049, 12, 31)),
        ] {
            let Field::OpeningBalance(_, balance) = round_trip(&registry, "60F", content) else {
                panic!("expected an opening balance");
            };
            assert_eq!(balance.date, expected);
        }

        for outside in [date(2050, 1, 1), date(1949, 12, 31)] {
            let balance = Balance {
                mark: DebitCredit::Credit,
                date: outside,
                currency: "EUR".into(),
                amount: Decimal::new(1, 0),
            };
            let err = registry
                .encode(&Field::OpeningBalance(BalanceStatus::Final, balance))
                .unwrap_err();
            assert!(matches!(err, Error::SemanticValidation { .. }), "{outside}");
        }

        let stamp = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2050, 1, 1, 9, 30, 0)
            .unwrap();
        let err = interim.encode(&Field::DateTimeIndication(stamp)).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { .. }));
    }

    #[test]
    fn test_statement_line_rejects_multibyte_type() {
        let registry = registry(MessageType::Mt940);
        let line = StatementLine {
            value_date: date(2016, 1, 2),
            entry_date: None,
            mark: DebitCredit::Credit,
            funds_code: None,
            amount: Decimal::new(1, 0),
            transaction_type: "ÄTRF".into(),
            customer_reference: "NONREF".into(),
            bank_reference: None,
            supplementary_details: None,
        };
        let err = registry.encode(&Field::StatementLine(line)).unwrap_err();
        assert!(matches!(err, Error::Field { .. }));
    }

    #[test]
    fn test_tag_outside_message_type() {
        let registry = registry(MessageType::Mt103);
        let err = registry.decode(&raw("61", "160102C1,NMSCNONREF")).unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { line: 7, .. }));
    }

    #[test]
    fn test_subfield_error_carries_position() {
        let registry = registry(MessageType::Mt940);
        match registry.decode(&raw("60F", "C16010EUR1,")).unwrap_err() {
            Error::Field { line, tag, source } => {
                assert_eq!(line, 7);
                assert_eq!(tag, "60F");
                assert_eq!(source.index, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_encode_rejects_invalid_values() {
        let registry = registry(MessageType::Mt940);
        let balance = Balance {
            mark: DebitCredit::Credit,
            date: date(2016, 1, 1),
            currency: "EUR".into(),
            amount: Decimal::new(-5, 0),
        };
        let err = registry
            .encode(&Field::ClosingBalance(BalanceStatus::Final, balance.clone()))
            .unwrap_err();
        assert!(matches!(err, Error::SemanticValidation { .. }));

        let balance = Balance {
            currency: "euro".into(),
            amount: Decimal::new(5, 0),
            ..balance
        };
        let err = registry
            .encode(&Field::ClosingBalance(BalanceStatus::Final, balance))
            .unwrap_err();
        assert!(matches!(err, Error::Field { .. }));
    }
}
