//! Subfield codec.
//!
//! Applies a compiled [`Notation`] to field text in both directions:
//! [`parse`] splits text into ordered subfield values and [`render`]
//! concatenates values back into text. For every text accepted by `parse`,
//! `render(n, &parse(n, t)?)? == t`.

use crate::error::SubfieldError;
use crate::notation::{Charset, LengthSpec, Notation, SubfieldSpec};

/// Ordered subfield values, one slot per notation token. `None` only for optional tokens.
pub type SubfieldValues = Vec<Option<String>>;

/// Parse field text into subfield values.
pub fn parse(notation: &Notation, text: &str) -> Result<SubfieldValues, SubfieldError> {
    let mut values = Vec::with_capacity(notation.len());
    let mut cursor = 0;

    for (index, spec) in notation.subfields().iter().enumerate() {
        match capture(spec, &text[cursor..]) {
            Some((consumed, body)) => {
                check_decimal(spec, body, index, cursor)?;
                values.push(Some(body.to_string()));
                cursor += consumed;
            }
            None if spec.optional => values.push(None),
            None => {
                return Err(SubfieldError::new(
                    index,
                    cursor,
                    format!("expected {spec}, found {:?}", excerpt(&text[cursor..])),
                ))
            }
        }
    }

    if cursor < text.len() {
        return Err(SubfieldError::new(
            notation.len(),
            cursor,
            format!("unexpected trailing text {:?}", excerpt(&text[cursor..])),
        ));
    }

    Ok(values)
}

/// Render subfield values back into field text.
///
/// Every value is checked against its own token, so values built by hand
/// cannot produce text that would parse differently.
pub fn render(notation: &Notation, values: &[Option<String>]) -> Result<String, SubfieldError> {
    if values.len() != notation.len() {
        return Err(SubfieldError::new(
            values.len().min(notation.len()),
            0,
            format!(
                "notation {notation} has {} subfields, got {} values",
                notation.len(),
                values.len()
            ),
        ));
    }

    let mut out = String::new();
    for (index, (spec, value)) in notation.subfields().iter().zip(values).enumerate() {
        let value = match value {
            Some(value) => value,
            None if spec.optional => continue,
            None => {
                return Err(SubfieldError::new(
                    index,
                    out.len(),
                    format!("missing mandatory subfield {spec}"),
                ))
            }
        };

        let literal = spec.prefix.map(|p| p.literal()).unwrap_or("");
        let candidate = format!("{literal}{value}");
        match capture(spec, &candidate) {
            Some((consumed, body)) if consumed == candidate.len() => {
                check_decimal(spec, body, index, out.len())?;
            }
            _ => {
                return Err(SubfieldError::new(
                    index,
                    out.len(),
                    format!("value {value:?} does not match {spec}"),
                ))
            }
        }
        out.push_str(&candidate);
    }

    Ok(out)
}

impl Notation {
    /// Shorthand for [`parse`].
    pub fn parse(&self, text: &str) -> Result<SubfieldValues, SubfieldError> {
        parse(self, text)
    }

    /// Shorthand for [`render`].
    pub fn render(&self, values: &[Option<String>]) -> Result<String, SubfieldError> {
        render(self, values)
    }
}

/// Longest capture of `spec` at the start of `rest`: (bytes consumed including the prefix, body).
fn capture<'t>(spec: &SubfieldSpec, rest: &'t str) -> Option<(usize, &'t str)> {
    let literal = spec.prefix.map(|p| p.literal()).unwrap_or("");
    let body_text = rest.strip_prefix(literal)?;

    let (end, count) = match spec.length {
        LengthSpec::Multiline { lines, line_len } => scan_lines(spec, body_text, lines, line_len),
        length => scan_line(spec, body_text, length.max_chars()),
    };

    if !spec.length.accepts(count) {
        return None;
    }
    Some((literal.len() + end, &body_text[..end]))
}

fn scan_line(spec: &SubfieldSpec, text: &str, max: usize) -> (usize, usize) {
    let mut end = 0;
    let mut count = 0;
    for (pos, c) in text.char_indices() {
        if count == max || spec.stops_at(&text[pos..]) || !spec.charset.contains(c) {
            break;
        }
        end = pos + c.len_utf8();
        count += 1;
    }
    (end, count)
}

fn scan_lines(spec: &SubfieldSpec, text: &str, lines: usize, line_len: usize) -> (usize, usize) {
    let mut end = 0;
    let mut count = 0;
    let mut line = 1;
    let mut column = 0;
    for (pos, c) in text.char_indices() {
        if spec.stops_at(&text[pos..]) {
            break;
        }
        if c == '\n' {
            if line == lines {
                break;
            }
            line += 1;
            column = 0;
        } else {
            if column == line_len || !spec.charset.contains(c) {
                break;
            }
            column += 1;
        }
        end = pos + c.len_utf8();
        count += 1;
    }
    (end, count)
}

fn check_decimal(
    spec: &SubfieldSpec,
    body: &str,
    index: usize,
    offset: usize,
) -> Result<(), SubfieldError> {
    if spec.charset != Charset::Decimal || is_decimal(body) {
        return Ok(());
    }
    Err(SubfieldError::new(
        index,
        offset,
        format!("{body:?} must be digits with exactly one decimal comma"),
    ))
}

/// `^[0-9]+,[0-9]*$`
pub(crate) fn is_decimal(text: &str) -> bool {
    match text.split_once(',') {
        Some((whole, fraction)) => {
            !whole.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(20) {
        Some((pos, _)) => &text[..pos],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Notation {
        Notation::compile(source).unwrap()
    }

    fn values(items: &[Option<&str>]) -> SubfieldValues {
        items.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_parse_balance() {
        let notation = compile("1!a6!n3!a15d");
        let parsed = parse(&notation, "D160717EUR123,").unwrap();
        assert_eq!(
            parsed,
            values(&[Some("D"), Some("160717"), Some("EUR"), Some("123,")])
        );
        assert_eq!(render(&notation, &parsed).unwrap(), "D160717EUR123,");
    }

    #[test]
    fn test_parse_multiline() {
        let notation = compile("6*65x");
        let text = "FIRST LINE\nSECOND LINE 2016-01-02\nTHIRD/LINE";
        let parsed = parse(&notation, text).unwrap();
        assert_eq!(parsed, values(&[Some(text)]));
        assert_eq!(render(&notation, &parsed).unwrap(), text);
    }

    #[test]
    fn test_multiline_limits() {
        let notation = compile("2*5x");
        assert!(parse(&notation, "ABCDE\nFGHIJ").is_ok());
        let err = parse(&notation, "ABCDE\nFGHIJ\nK").unwrap_err();
        assert_eq!(err.offset, 11);
        let err = parse(&notation, "ABCDEF").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn test_statement_line_with_all_subfields() {
        let notation = compile("6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][BR34x]");
        let text = "1601020102RCR1234,56NTRFREF-1//BANKREF\nDETAILS HERE";
        let parsed = parse(&notation, text).unwrap();
        assert_eq!(
            parsed,
            values(&[
                Some("160102"),
                Some("0102"),
                Some("RC"),
                Some("R"),
                Some("1234,56"),
                Some("N"),
                Some("TRF"),
                Some("REF-1"),
                Some("BANKREF"),
                Some("DETAILS HERE"),
            ])
        );
        assert_eq!(render(&notation, &parsed).unwrap(), text);
    }

    #[test]
    fn test_lookahead_keeps_prefix_for_next_subfield() {
        let notation = compile("16x[//16x]");
        let parsed = parse(&notation, "NONREF//8327000090031789").unwrap();
        assert_eq!(parsed, values(&[Some("NONREF"), Some("8327000090031789")]));
    }

    #[test]
    fn test_optional_subfields_absent() {
        let notation = compile("6!n[4!n]2a[1!a]15d1!a3!c16x[//16x][BR34x]");
        let parsed = parse(&notation, "160102C0,NMSCNONREF").unwrap();
        assert_eq!(parsed.len(), notation.len());
        assert_eq!(parsed[1], None);
        assert_eq!(parsed[2].as_deref(), Some("C"));
        assert_eq!(parsed[3], None);
        assert_eq!(parsed[8], None);
        assert_eq!(parsed[9], None);
    }

    #[test]
    fn test_decimal_separator_cardinality() {
        let notation = compile("15d");
        assert!(parse(&notation, "100,").is_ok());
        assert!(parse(&notation, "0,25").is_ok());
        let err = parse(&notation, "100").unwrap_err();
        assert_eq!(err.index, 0);
        assert!(parse(&notation, "1,0,0").is_err());
        assert!(parse(&notation, ",5").is_err());
    }

    #[test]
    fn test_missing_mandatory_subfield() {
        let notation = compile("1!a6!n3!a15d");
        let err = parse(&notation, "C16010EUR1,").unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_trailing_text() {
        let notation = compile("5n[/5n]");
        assert_eq!(parse(&notation, "7/2").unwrap(), values(&[Some("7"), Some("2")]));
        let err = parse(&notation, "7/A").unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_render_rejects_invalid_values() {
        let notation = compile("1!a6!n3!a15d");
        assert!(render(&notation, &values(&[Some("C"), None, Some("EUR"), Some("1,")])).is_err());
        assert!(render(&notation, &values(&[Some("CR"), Some("160101"), Some("EUR"), Some("1,")])).is_err());
        assert!(render(&notation, &values(&[Some("C"), Some("160101"), Some("EUR"), Some("1")])).is_err());
        assert!(render(&notation, &values(&[Some("C"), Some("160101")])).is_err());

        let notation = compile("16x[//16x]");
        let err = render(&notation, &values(&[Some("A//B"), None])).unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_render_skips_absent_optionals() {
        let notation = compile("5n[/5n]");
        assert_eq!(render(&notation, &values(&[Some("12"), None])).unwrap(), "12");
        assert_eq!(render(&notation, &values(&[Some("12"), Some("3")])).unwrap(), "12/3");
    }

    #[test]
    fn test_is_decimal() {
        assert!(is_decimal("1,"));
        assert!(is_decimal("12,34"));
        assert!(!is_decimal("12"));
        assert!(!is_decimal("1,2,3"));
        assert!(!is_decimal(",1"));
    }

    #[test]
    fn test_question_mark_converts_to_crate_error() {
        fn amount(text: &str) -> crate::Result<SubfieldValues> {
            Ok(compile("3!a15d").parse(text)?)
        }
        assert!(amount("EUR1,").is_ok());
        assert!(matches!(amount("EUR1"), Err(crate::Error::SubfieldMatch(_))));
    }
}
