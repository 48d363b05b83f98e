//! Zigbee factory production config generator.
//!
//! Writes one production config binary per device, either from a CSV table or
//! from a single device described on the command line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use zb_factory_config::batch::{BatchDriver, BatchOptions, BatchSummary, SingleDevice};
use zb_factory_config::config::defaults;
use zb_factory_config::{console, Error};

#[derive(Parser)]
#[command(name = "zb-factory-config")]
#[command(about = "Zigbee factory production config generator")]
struct Args {
    /// CSV file with a header row and one device per line
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Install code with its CRC-16 trailer, as hex
    #[arg(short, long, default_value = defaults::NULL)]
    installcode: String,

    /// EUI64 as 16 hex characters
    #[arg(short, long, default_value = defaults::NULL)]
    mac_address: String,

    /// Channel mask for page 0 (default: channels 11-26)
    #[arg(short, long, default_value = "0x07FFF800", value_parser = parse_any_base)]
    channel_mask: u32,

    /// Manufacturer name, at most 16 characters
    #[arg(short = 'n', long, default_value = defaults::MANUFACTURER_NAME)]
    manufacturer_name: String,

    /// Manufacturer code
    #[arg(short = 'k', long, default_value = "0x131B", value_parser = parse_any_base)]
    manufacturer_code: u32,

    /// Output directory (default: current directory)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Also write a C array of each binary
    #[arg(long)]
    header: bool,

    /// Read each binary back and check its CRC
    #[arg(long)]
    verify: bool,

    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Reject a table combined with a directly described device.
    fn validate(&self) -> Result<(), Error> {
        if self.csv.is_some()
            && self.installcode != defaults::NULL
            && self.mac_address != defaults::NULL
        {
            return Err(Error::configuration(
                "csv",
                "a CSV table and installcode/mac_address must not both be given",
            ));
        }
        Ok(())
    }

    fn single_device(&self) -> SingleDevice {
        SingleDevice {
            installcode: self.installcode.clone(),
            mac_address: self.mac_address.clone(),
            channel_mask: self.channel_mask,
            manufacturer_name: self.manufacturer_name.clone(),
            manufacturer_code: self.manufacturer_code,
        }
    }
}

/// Parse an integer with an optional `0x`, `0o` or `0b` prefix.
fn parse_any_base(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let (digits, radix) = match s.get(..2) {
        Some("0x") | Some("0X") => (&s[2..], 16),
        Some("0o") | Some("0O") => (&s[2..], 8),
        Some("0b") | Some("0B") => (&s[2..], 2),
        _ => (s, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("`{}`: {}", s, e))
}

fn run(args: Args) -> anyhow::Result<BatchSummary> {
    args.validate()?;

    let out_dir = match &args.outdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Could not resolve current directory")?,
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Could not create {}", out_dir.display()))?;

    let mut options = BatchOptions::new(&out_dir);
    options.emit_header = args.header;
    options.verify = args.verify;
    let driver = BatchDriver::new(options);

    let summary = match &args.csv {
        Some(csv) => driver.run_file(csv)?,
        None => {
            // Removed when `table` drops, on success or failure
            let table = args.single_device().write_table(&out_dir)?;
            driver.run_file(table.path())?
        }
    };
    Ok(summary)
}

fn main() {
    let args = Args::parse();
    console::init(console::level_for(args.verbose));

    match run(args) {
        Ok(summary) => {
            for artifact in &summary.artifacts {
                println!(
                    "{} {} ({} bytes)",
                    "[OK]".green().bold(),
                    artifact.binary.display(),
                    artifact.size
                );
                if !artifact.skipped.is_empty() {
                    println!(
                        "     {} {}",
                        "ignored keys:".yellow(),
                        artifact.skipped.join(", ")
                    );
                }
            }
            println!("{} device(s) written", summary.artifacts.len());
        }
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
