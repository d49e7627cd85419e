use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txnlog::TxnLog;

#[derive(Debug, Parser)]
#[command(version, about = "MPS7 transaction log reader and reporter")]
struct Args {
    /// Input log file (.dat)
    #[arg(long, short = 'i', env = "TXNLOG_FILE", default_value = "txnlog.dat")]
    input: PathBuf,

    /// User ID whose balance the report answers for
    #[arg(long, env = "TXNLOG_USER", default_value_t = 2456938384156277127)]
    user: u64,

    /// Print each decoded record before the summary
    #[arg(long, default_value_t = false)]
    records: bool,

    /// Emit the summary as JSON instead of the answer lines
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let file = File::open(&args.input).with_context(|| format!("open {:?}", args.input))?;
    let log = TxnLog::load(BufReader::new(file)).with_context(|| format!("decode {:?}", args.input))?;

    if args.records {
        for record in &log.records {
            println!("{record}");
        }
    }

    let summary = log.summary(args.user);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("total debit amount: {:.2}", summary.total_debits);
        println!("total credit amount: {:.2}", summary.total_credits);
        println!("autopays started: {}", summary.autopay_starts);
        println!("autopays ended: {}", summary.autopay_ends);
        println!("balance for user {}: {:.2}", summary.user_id, summary.balance);
    }
    eprintln!("Read {} records from {:?}.", log.records.len(), args.input);
    Ok(())
}
