//! Typed field values shared by all message types.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Debit/Credit mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebitCredit {
    /// `D`
    Debit,
    /// `C`
    Credit,
    /// `RD`, reversal of a debit entry.
    ReversalDebit,
    /// `RC`, reversal of a credit entry.
    ReversalCredit,
}

impl FromStr for DebitCredit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D" => Ok(DebitCredit::Debit),
            "C" => Ok(DebitCredit::Credit),
            "RD" => Ok(DebitCredit::ReversalDebit),
            "RC" => Ok(DebitCredit::ReversalCredit),
            _ => Err(format!("Invalid debit/credit mark: {}", s)),
        }
    }
}

impl DebitCredit {
    /// SWIFT spelling of the mark.
    pub fn as_str(&self) -> &'static str {
        match self {
            DebitCredit::Debit => "D",
            DebitCredit::Credit => "C",
            DebitCredit::ReversalDebit => "RD",
            DebitCredit::ReversalCredit => "RC",
        }
    }

    /// True for the plain `D`/`C` marks allowed on balances and floor limits.
    pub fn is_simple(&self) -> bool {
        matches!(self, DebitCredit::Debit | DebitCredit::Credit)
    }

    /// Whether the entry reduces the account balance.
    pub fn is_debit(&self) -> bool {
        matches!(self, DebitCredit::Debit | DebitCredit::ReversalCredit)
    }
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `F` or `M` suffix of balance tags 60 and 62.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStatus {
    /// `F`: first opening / final closing balance.
    Final,
    /// `M`: intermediate balance of a statement split over several pages.
    Intermediate,
}

impl BalanceStatus {
    pub fn suffix(&self) -> char {
        match self {
            BalanceStatus::Final => 'F',
            BalanceStatus::Intermediate => 'M',
        }
    }
}

/// Balance as carried by fields 60a, 62a, 64 and 65.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Debit/Credit mark, `D` or `C`.
    pub mark: DebitCredit,

    /// Date of the balance.
    pub date: NaiveDate,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Unsigned amount; the mark carries the sign.
    pub amount: Decimal,
}

impl Balance {
    /// Amount with the sign applied: debit balances are negative.
    pub fn signed_amount(&self) -> Decimal {
        if self.mark.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }
}

/// Field 28C.
///
/// Numbers are kept as values, so zero-padded input such as `00001/001` renders back as `1/1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementNumber {
    pub statement: u32,
    pub sequence: Option<u32>,
}

/// Field 61, one booked or pending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub value_date: NaiveDate,

    /// Booking date; the year is inferred from the value date by the configured policy.
    pub entry_date: Option<NaiveDate>,

    pub mark: DebitCredit,

    /// Third letter of the currency code, when given.
    pub funds_code: Option<char>,

    /// Unsigned amount.
    pub amount: Decimal,

    /// Four characters: type identification code plus the three-character transaction code, e.g. `NTRF`.
    pub transaction_type: String,

    /// Reference for the account owner, `NONREF` when there is none.
    pub customer_reference: String,

    pub bank_reference: Option<String>,

    pub supplementary_details: Option<String>,
}

impl StatementLine {
    pub fn signed_amount(&self) -> Decimal {
        if self.mark.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }
}

/// Field 34F.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorLimit {
    pub currency: String,
    pub mark: Option<DebitCredit>,
    pub amount: Decimal,
}

/// Fields 90D and 90C. The entry count drops leading zeros like [`StatementNumber`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub entries: u32,
    pub currency: String,
    pub amount: Decimal,
}

/// Field 13C.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeIndication {
    /// Code such as `SNDTIME` or `CLSTIME`.
    pub code: String,
    pub time: NaiveTime,
    /// Offset from UTC in minutes.
    pub utc_offset_minutes: i32,
}

/// A statement line with the information field that directly follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionGroup {
    pub statement_line: StatementLine,
    pub info: Option<String>,
}

impl TransactionGroup {
    pub fn new(statement_line: StatementLine) -> Self {
        Self {
            statement_line,
            info: None,
        }
    }
}

/// A decoded field: one variant per recognised tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// `:20:`
    TransactionReference(String),
    /// `:21:`
    RelatedReference(String),
    /// `:25:`
    AccountIdentification(String),
    /// `:28C:`
    StatementNumber(StatementNumber),
    /// `:60F:` / `:60M:`
    OpeningBalance(BalanceStatus, Balance),
    /// `:62F:` / `:62M:`
    ClosingBalance(BalanceStatus, Balance),
    /// `:64:`
    ClosingAvailableBalance(Balance),
    /// `:65:`
    ForwardAvailableBalance(Balance),
    /// `:61:`
    StatementLine(StatementLine),
    /// `:86:`
    InformationToAccountOwner(String),
    /// `:34F:`
    FloorLimit(FloorLimit),
    /// `:13D:`
    DateTimeIndication(DateTime<FixedOffset>),
    /// `:90D:`
    DebitSummary(TransactionSummary),
    /// `:90C:`
    CreditSummary(TransactionSummary),
    /// `:13C:`
    TimeIndication(TimeIndication),
    /// `:23B:`
    BankOperationCode(String),
}

impl Field {
    /// The tag this field is written under.
    pub fn tag(&self) -> &'static str {
        match self {
            Field::TransactionReference(_) => "20",
            Field::RelatedReference(_) => "21",
            Field::AccountIdentification(_) => "25",
            Field::StatementNumber(_) => "28C",
            Field::OpeningBalance(BalanceStatus::Final, _) => "60F",
            Field::OpeningBalance(BalanceStatus::Intermediate, _) => "60M",
            Field::ClosingBalance(BalanceStatus::Final, _) => "62F",
            Field::ClosingBalance(BalanceStatus::Intermediate, _) => "62M",
            Field::ClosingAvailableBalance(_) => "64",
            Field::ForwardAvailableBalance(_) => "65",
            Field::StatementLine(_) => "61",
            Field::InformationToAccountOwner(_) => "86",
            Field::FloorLimit(_) => "34F",
            Field::DateTimeIndication(_) => "13D",
            Field::DebitSummary(_) => "90D",
            Field::CreditSummary(_) => "90C",
            Field::TimeIndication(_) => "13C",
            Field::BankOperationCode(_) => "23B",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_credit() {
        assert_eq!("D".parse::<DebitCredit>().ok(), Some(DebitCredit::Debit));
        assert_eq!("C".parse::<DebitCredit>().ok(), Some(DebitCredit::Credit));
        assert_eq!("RC".parse::<DebitCredit>().ok(), Some(DebitCredit::ReversalCredit));
        assert!("X".parse::<DebitCredit>().is_err());
        assert!("DEBIT".parse::<DebitCredit>().is_err());
        assert!("d".parse::<DebitCredit>().is_err());
    }

    #[test]
    fn test_signed_amount() {
        let balance = Balance {
            mark: DebitCredit::Debit,
            date: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            currency: "EUR".into(),
            amount: Decimal::new(12550, 2),
        };
        assert_eq!(balance.signed_amount(), Decimal::new(-12550, 2));
        assert!(DebitCredit::ReversalCredit.is_debit());
        assert!(!DebitCredit::ReversalDebit.is_debit());
    }

    #[test]
    fn test_field_tags() {
        let balance = Balance {
            mark: DebitCredit::Credit,
            date: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            currency: "EUR".into(),
            amount: Decimal::ONE,
        };
        assert_eq!(Field::OpeningBalance(BalanceStatus::Intermediate, balance.clone()).tag(), "60M");
        assert_eq!(Field::ClosingBalance(BalanceStatus::Final, balance).tag(), "62F");
        assert_eq!(Field::BankOperationCode("CRED".into()).tag(), "23B");
    }
}
