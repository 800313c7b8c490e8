//! SWIFT FIN Verify - CLI tool checking that messages survive a read/render round trip.

use clap::Parser;
use std::fs;
use swift_fin::{read_pages, EntryDatePolicy, FinReader, MessageType, ReadOptions, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swift_fin_verify")]
#[command(about = "Check that rendering parsed messages reproduces the input", long_about = None)]
struct Cli {
    /// File to verify
    #[arg(short, long)]
    input: String,

    /// Message type of a bare field stream (940, 942, 103); omit for FIN envelopes
    #[arg(long = "message-type")]
    message_type: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let input = fs::read_to_string(&cli.input)?;

    // Entry dates are re-rendered as MMDD, so the year policy cannot change the text.
    let options = ReadOptions::new(EntryDatePolicy::NearestToValueDate);

    let rendered = match cli.message_type {
        Some(ref name) => {
            let message_type = name.parse::<MessageType>()?;
            read_pages(&mut input.as_bytes(), message_type, options)?
                .iter()
                .map(|page| page.render())
                .collect::<Result<Vec<_>>>()?
        }
        None => FinReader::new(input.as_bytes(), options)
            .read_all()?
            .iter()
            .map(|message| message.render())
            .collect::<Result<Vec<_>>>()?,
    };

    match first_difference(&input, &rendered.join("\n")) {
        None => {
            println!("'{}' renders back identically ({} messages).", cli.input, rendered.len());
            Ok(true)
        }
        Some((line, expected, actual)) => {
            println!("Differences found in '{}':", cli.input);
            println!("  - line {}", line);
            println!("    input:    {}", expected.unwrap_or("<end of input>"));
            println!("    rendered: {}", actual.unwrap_or("<end of output>"));
            Ok(false)
        }
    }
}

/// Line number and both sides of the first mismatch, ignoring blank lines and CR.
fn first_difference<'a>(
    input: &'a str,
    rendered: &'a str,
) -> Option<(usize, Option<&'a str>, Option<&'a str>)> {
    let mut expected = normalized_lines(input);
    let mut actual = normalized_lines(rendered);
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return None,
            (Some((_, a)), Some((_, b))) if a == b => continue,
            (Some((line, a)), b) => return Some((line, Some(a), b.map(|(_, text)| text))),
            (None, Some((_, b))) => return Some((input.lines().count() + 1, None, Some(b))),
        }
    }
}

fn normalized_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text() {
        assert_eq!(first_difference(":20:A\r\n\r\n-\n", ":20:A\n-"), None);
    }

    #[test]
    fn test_reports_first_mismatch() {
        let diff = first_difference(":20:A\n:21:B\n-", ":20:A\n:21:C\n-");
        assert_eq!(diff, Some((2, Some(":21:B"), Some(":21:C"))));
    }

    #[test]
    fn test_rendered_longer_than_input() {
        let diff = first_difference(":20:A", ":20:A\n-");
        assert_eq!(diff, Some((2, None, Some("-"))));
    }
}
