//! Notation compiler.
//!
//! SWIFT describes the layout of every field with a compact positional
//! grammar such as `6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][BR34x]`. Each token
//! names an optional wrapper, a literal prefix, a length and a character set.
//! [`Notation::compile`] turns such a string into an ordered list of
//! [`SubfieldSpec`]s which the codec in [`crate::subfield`] uses to parse and
//! render field text.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// One token: `[` optional, prefix, count, length suffix, charset letter, `]`.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\[)?(//|/|BR|ISIN)?([0-9]+)(!|-[0-9]+|\*[0-9]+)?([ancdeshxyzAB])(\])?")
        .expect("token pattern is valid")
});

/// Alphabet a subfield is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `n`: digits.
    Numeric,
    /// `a`: upper case letters.
    Alpha,
    /// `c`: upper case letters and digits.
    Alnum,
    /// `d`: digits with exactly one decimal comma.
    Decimal,
    /// `e`: space.
    Space,
    /// `s`: sign, `+` or `-`.
    Sign,
    /// `h`: upper case hexadecimal digits.
    Hex,
    /// `x`: SWIFT X character set.
    SwiftX,
    /// `y`: EDIFACT level A character set.
    EdifactY,
    /// `z`: SWIFT X plus the extended information set.
    SwiftZ,
    /// `A`: letters of either case.
    AnyAlpha,
    /// `B`: letters of either case and digits.
    AnyAlnum,
}

impl Charset {
    fn from_letter(letter: char) -> Option<Self> {
        Some(match letter {
            'n' => Charset::Numeric,
            'a' => Charset::Alpha,
            'c' => Charset::Alnum,
            'd' => Charset::Decimal,
            'e' => Charset::Space,
            's' => Charset::Sign,
            'h' => Charset::Hex,
            'x' => Charset::SwiftX,
            'y' => Charset::EdifactY,
            'z' => Charset::SwiftZ,
            'A' => Charset::AnyAlpha,
            'B' => Charset::AnyAlnum,
            _ => return None,
        })
    }

    /// The notation letter for this charset.
    pub fn letter(self) -> char {
        match self {
            Charset::Numeric => 'n',
            Charset::Alpha => 'a',
            Charset::Alnum => 'c',
            Charset::Decimal => 'd',
            Charset::Space => 'e',
            Charset::Sign => 's',
            Charset::Hex => 'h',
            Charset::SwiftX => 'x',
            Charset::EdifactY => 'y',
            Charset::SwiftZ => 'z',
            Charset::AnyAlpha => 'A',
            Charset::AnyAlnum => 'B',
        }
    }

    /// Whether `c` belongs to this alphabet. Line breaks never do.
    pub fn contains(self, c: char) -> bool {
        match self {
            Charset::Numeric => c.is_ascii_digit(),
            Charset::Alpha => c.is_ascii_uppercase(),
            Charset::Alnum => c.is_ascii_uppercase() || c.is_ascii_digit(),
            Charset::Decimal => c.is_ascii_digit() || c == ',',
            Charset::Space => c == ' ',
            Charset::Sign => c == '+' || c == '-',
            Charset::Hex => c.is_ascii_digit() || ('A'..='F').contains(&c),
            Charset::SwiftX => is_swift_x(c),
            Charset::EdifactY => {
                c.is_ascii_uppercase() || c.is_ascii_digit() || ".,-()/='+:?!\"%&*<>; ".contains(c)
            }
            Charset::SwiftZ => is_swift_x(c) || "=!\"%&*<>;{@#_".contains(c),
            Charset::AnyAlpha => c.is_ascii_alphabetic(),
            Charset::AnyAlnum => c.is_ascii_alphanumeric(),
        }
    }
}

fn is_swift_x(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/-?:().,'+ ".contains(c)
}

/// How many characters (or lines) a subfield may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthSpec {
    /// `N!`: exactly N characters.
    Fixed(usize),
    /// `N`: one to N characters.
    Max(usize),
    /// `N-M`: N to M characters.
    Range(usize, usize),
    /// `N*M`: up to N lines of at most M characters each.
    Multiline { lines: usize, line_len: usize },
}

impl LengthSpec {
    /// Whether a capture of `count` characters satisfies the length.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            LengthSpec::Fixed(n) => count == n,
            LengthSpec::Max(n) => (1..=n).contains(&count),
            LengthSpec::Range(min, max) => (min..=max).contains(&count),
            LengthSpec::Multiline { .. } => count > 0,
        }
    }

    /// Most characters a single-line capture may take.
    pub fn max_chars(self) -> usize {
        match self {
            LengthSpec::Fixed(n) | LengthSpec::Max(n) | LengthSpec::Range(_, n) => n,
            LengthSpec::Multiline { line_len, .. } => line_len,
        }
    }
}

impl fmt::Display for LengthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthSpec::Fixed(n) => write!(f, "{n}!"),
            LengthSpec::Max(n) => write!(f, "{n}"),
            LengthSpec::Range(min, max) => write!(f, "{min}-{max}"),
            LengthSpec::Multiline { lines, line_len } => write!(f, "{lines}*{line_len}"),
        }
    }
}

/// Literal delimiter that precedes a subfield value when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    Slash,
    DoubleSlash,
    /// `BR`, a line break.
    LineBreak,
    Isin,
}

impl Separator {
    fn from_notation(token: &str) -> Option<Self> {
        Some(match token {
            "/" => Separator::Slash,
            "//" => Separator::DoubleSlash,
            "BR" => Separator::LineBreak,
            "ISIN" => Separator::Isin,
            _ => return None,
        })
    }

    /// How the separator is spelled inside a notation string.
    pub fn notation(self) -> &'static str {
        match self {
            Separator::Slash => "/",
            Separator::DoubleSlash => "//",
            Separator::LineBreak => "BR",
            Separator::Isin => "ISIN",
        }
    }

    /// The text the separator stands for inside field content.
    pub fn literal(self) -> &'static str {
        match self {
            Separator::Slash => "/",
            Separator::DoubleSlash => "//",
            Separator::LineBreak => "\n",
            Separator::Isin => "ISIN",
        }
    }
}

/// One compiled notation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubfieldSpec {
    pub optional: bool,
    pub prefix: Option<Separator>,
    pub charset: Charset,
    pub length: LengthSpec,
    /// Prefixes of the following subfields a greedy capture must not run into.
    stops: Vec<Separator>,
}

impl SubfieldSpec {
    /// Literal prefixes that end this subfield's capture early.
    pub fn stop_prefixes(&self) -> &[Separator] {
        &self.stops
    }

    pub(crate) fn stops_at(&self, rest: &str) -> bool {
        self.stops.iter().any(|stop| rest.starts_with(stop.literal()))
    }
}

impl fmt::Display for SubfieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            f.write_str("[")?;
        }
        if let Some(prefix) = self.prefix {
            f.write_str(prefix.notation())?;
        }
        write!(f, "{}{}", self.length, self.charset.letter())?;
        if self.optional {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// A compiled notation: the ordered subfields of one field layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Notation {
    source: String,
    subfields: Vec<SubfieldSpec>,
}

impl Notation {
    /// Compile a notation string.
    ///
    /// Tokens are matched left to right with no gaps; any residue is
    /// reported with its byte offset.
    pub fn compile(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(grammar_error(source, 0, "empty notation"));
        }

        let mut subfields: Vec<SubfieldSpec> = Vec::new();
        let mut offset = 0;

        while offset < source.len() {
            let rest = &source[offset..];
            let caps = TOKEN_REGEX
                .captures(rest)
                .ok_or_else(|| grammar_error(source, offset, format!("unexpected {rest:?}")))?;

            let optional = caps.get(1).is_some();
            if optional != caps.get(6).is_some() {
                return Err(grammar_error(source, offset, "unbalanced optional brackets"));
            }
            if let Some(last) = subfields.last() {
                if matches!(last.length, LengthSpec::Multiline { .. }) {
                    return Err(grammar_error(
                        source,
                        offset,
                        "a multiline subfield must be the last one",
                    ));
                }
            }

            let prefix = match caps.get(2) {
                Some(m) => Some(Separator::from_notation(m.as_str()).ok_or_else(|| {
                    grammar_error(source, offset, format!("unknown prefix {:?}", m.as_str()))
                })?),
                None => None,
            };
            let count = parse_count(source, offset, &caps[3])?;
            let length = match caps.get(4).map(|m| m.as_str()) {
                None => LengthSpec::Max(count),
                Some("!") => LengthSpec::Fixed(count),
                Some(suffix) if suffix.starts_with('-') => {
                    let max = parse_count(source, offset, &suffix[1..])?;
                    if count > max {
                        return Err(grammar_error(
                            source,
                            offset,
                            format!("range {count}-{max} has min above max"),
                        ));
                    }
                    LengthSpec::Range(count, max)
                }
                Some(suffix) => LengthSpec::Multiline {
                    lines: count,
                    line_len: parse_count(source, offset, &suffix[1..])?,
                },
            };
            let letter = caps[5].chars().next().unwrap_or_default();
            let charset = Charset::from_letter(letter).ok_or_else(|| {
                grammar_error(source, offset, format!("unknown charset {letter:?}"))
            })?;

            subfields.push(SubfieldSpec {
                optional,
                prefix,
                charset,
                length,
                stops: Vec::new(),
            });
            offset += caps[0].len();
        }

        for index in 0..subfields.len() {
            let mut stops = Vec::new();
            for next in &subfields[index + 1..] {
                if let Some(prefix) = next.prefix {
                    if !stops.contains(&prefix) {
                        stops.push(prefix);
                    }
                }
                if !next.optional {
                    break;
                }
            }
            subfields[index].stops = stops;
        }

        Ok(Notation {
            source: source.to_string(),
            subfields,
        })
    }

    /// The notation string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn subfields(&self) -> &[SubfieldSpec] {
        &self.subfields
    }

    /// Number of subfields, which is also the length of every parse result.
    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }
}

impl FromStr for Notation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Notation::compile(s)
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_count(source: &str, offset: usize, digits: &str) -> Result<usize> {
    match digits.parse::<usize>() {
        Ok(0) => Err(grammar_error(source, offset, "length must be positive")),
        Ok(n) => Ok(n),
        Err(_) => Err(grammar_error(
            source,
            offset,
            format!("length {digits} is out of range"),
        )),
    }
}

fn grammar_error(source: &str, offset: usize, message: impl Into<String>) -> Error {
    Error::NotationGrammar {
        notation: source.to_string(),
        offset,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(err: Error) -> usize {
        match err {
            Error::NotationGrammar { offset, .. } => offset,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_compile_balance_notation() {
        let notation = Notation::compile("1!a6!n3!a15d").unwrap();
        let lengths: Vec<_> = notation.subfields().iter().map(|s| s.length).collect();
        assert_eq!(
            lengths,
            vec![
                LengthSpec::Fixed(1),
                LengthSpec::Fixed(6),
                LengthSpec::Fixed(3),
                LengthSpec::Max(15)
            ]
        );
        assert_eq!(notation.subfields()[3].charset, Charset::Decimal);
        assert!(notation.subfields().iter().all(|s| !s.optional));
    }

    #[test]
    fn test_compile_statement_line_notation() {
        let notation = Notation::compile("6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][34x]").unwrap();
        assert_eq!(notation.len(), 10);
        let optional: Vec<_> = notation.subfields().iter().map(|s| s.optional).collect();
        assert_eq!(
            optional,
            vec![false, true, false, true, false, false, false, false, true, true]
        );
        assert_eq!(notation.subfields()[8].prefix, Some(Separator::DoubleSlash));
        assert_eq!(notation.subfields()[7].stop_prefixes(), &[Separator::DoubleSlash]);
        assert!(notation.subfields()[8].stop_prefixes().is_empty());
    }

    #[test]
    fn test_stop_set_runs_through_optional_tokens() {
        let notation = Notation::compile("16x[//16x][BR34x]").unwrap();
        assert_eq!(
            notation.subfields()[0].stop_prefixes(),
            &[Separator::DoubleSlash, Separator::LineBreak]
        );
        assert_eq!(notation.subfields()[1].stop_prefixes(), &[Separator::LineBreak]);

        let notation = Notation::compile("16x/4!n[//4!n]").unwrap();
        assert_eq!(notation.subfields()[0].stop_prefixes(), &[Separator::Slash]);
    }

    #[test]
    fn test_compile_lengths() {
        let notation = Notation::compile("2-8c6*65x").unwrap();
        assert_eq!(notation.subfields()[0].length, LengthSpec::Range(2, 8));
        assert_eq!(
            notation.subfields()[1].length,
            LengthSpec::Multiline {
                lines: 6,
                line_len: 65
            }
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][BR34x]";
        assert_eq!(Notation::compile(source).unwrap(), Notation::compile(source).unwrap());
        assert_eq!(Notation::compile(source).unwrap().to_string(), source);
    }

    #[test]
    fn test_display_reproduces_tokens() {
        let notation = Notation::compile("ISIN1!e12!c[/5n]").unwrap();
        let tokens: Vec<_> = notation.subfields().iter().map(|s| s.to_string()).collect();
        assert_eq!(tokens, vec!["ISIN1!e", "12!c", "[/5n]"]);
    }

    #[test]
    fn test_residue_reports_offset() {
        assert_eq!(offset_of(Notation::compile("6!n?4!n").unwrap_err()), 3);
        assert_eq!(offset_of(Notation::compile("6!n4!").unwrap_err()), 3);
        assert_eq!(offset_of(Notation::compile("").unwrap_err()), 0);
    }

    #[test]
    fn test_rejects_bad_tokens() {
        assert_eq!(offset_of(Notation::compile("6!n[4!n").unwrap_err()), 3);
        assert_eq!(offset_of(Notation::compile("1!a4!n]").unwrap_err()), 3);
        assert_eq!(offset_of(Notation::compile("5-2n").unwrap_err()), 0);
        assert_eq!(offset_of(Notation::compile("0x").unwrap_err()), 0);
        assert_eq!(offset_of(Notation::compile("4*35x16x").unwrap_err()), 5);
        assert_eq!(offset_of(Notation::compile("3!q").unwrap_err()), 0);
    }

    #[test]
    fn test_charsets() {
        assert!(Charset::SwiftX.contains('/'));
        assert!(Charset::SwiftX.contains('a'));
        assert!(!Charset::SwiftX.contains('\n'));
        assert!(!Charset::SwiftX.contains('{'));
        assert!(Charset::SwiftZ.contains('{'));
        assert!(!Charset::Alpha.contains('a'));
        assert!(Charset::AnyAlpha.contains('a'));
        assert!(Charset::Hex.contains('F'));
        assert!(!Charset::Hex.contains('G'));
        assert!(Charset::Sign.contains('-'));
    }
}
