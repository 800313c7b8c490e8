//! SWIFT FIN Reader - CLI tool for reading MT940, MT942 and MT103 messages.

use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use swift_fin::{
    read_pages, AnyPage, EntryDatePolicy, Error, FinReader, MessageType, ReadOptions, Result,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swift_fin_reader")]
#[command(about = "Read SWIFT FIN statements and payments (MT940, MT942, MT103)", long_about = None)]
struct Cli {
    /// Input file path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Message type of a bare field stream (940, 942, 103)
    #[arg(long = "message-type", required_unless_present = "envelope")]
    message_type: Option<String>,

    /// Input holds complete FIN envelopes instead of a bare field stream
    #[arg(long)]
    envelope: bool,

    /// How to complete the year of MMDD entry dates
    #[arg(long = "entry-year", value_enum)]
    entry_year: EntryYear,

    /// What to print for each page
    #[arg(long, value_enum, default_value_t = Output::Summary)]
    output: Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum EntryYear {
    /// Closest date to the value date
    Nearest,
    /// Next year when the entry month is earlier than the value month
    Rollover,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Summary,
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let options = ReadOptions::new(match cli.entry_year {
        EntryYear::Nearest => EntryDatePolicy::NearestToValueDate,
        EntryYear::Rollover => EntryDatePolicy::RolloverOnEarlierMonth,
    });

    let mut input: Box<dyn Read> = match cli.input {
        Some(ref path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    let mut stdout = io::stdout().lock();

    if cli.envelope {
        let messages = FinReader::new(BufReader::new(input), options).read_all()?;
        match cli.output {
            Output::Text => {
                for message in &messages {
                    writeln!(stdout, "{}", message.render()?)?;
                }
            }
            output => {
                let pages: Vec<AnyPage> = messages.into_iter().map(|m| m.page).collect();
                write_pages(&mut stdout, &pages, output)?;
            }
        }
    } else {
        let message_type = cli
            .message_type
            .as_deref()
            .ok_or_else(|| Error::InvalidFormat("--message-type is required".to_string()))?
            .parse::<MessageType>()?;
        let pages = read_pages(&mut input, message_type, options)?;
        write_pages(&mut stdout, &pages, cli.output)?;
    }

    Ok(())
}

fn write_pages<W: Write>(writer: &mut W, pages: &[AnyPage], output: Output) -> Result<()> {
    match output {
        Output::Summary => {
            for page in pages {
                writeln!(writer, "{}", summarize(page))?;
            }
        }
        Output::Text => {
            for page in pages {
                writeln!(writer, "{}", page.render()?)?;
            }
        }
        Output::Json => {
            serde_json::to_writer_pretty(&mut *writer, pages).map_err(io::Error::from)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn summarize(page: &AnyPage) -> String {
    match page {
        AnyPage::Mt940(page) => format!(
            "MT940 {} account {}: opening {} {}, closing {} {}, {} entries{}",
            page.reference,
            page.account,
            page.opening_balance.signed_amount(),
            page.currency(),
            page.closing_balance.signed_amount(),
            page.currency(),
            page.transactions.len(),
            if page.is_balanced() { "" } else { " (unbalanced)" }
        ),
        AnyPage::Mt942(page) => format!(
            "MT942 {} account {} at {}: {} entries, floor limit {} {}",
            page.reference,
            page.account,
            page.date_time.to_rfc3339(),
            page.transactions.len(),
            page.debit_floor_limit.amount,
            page.currency()
        ),
        AnyPage::Mt103(page) => format!(
            "MT103 {} operation {}",
            page.reference, page.bank_operation_code
        ),
    }
}
