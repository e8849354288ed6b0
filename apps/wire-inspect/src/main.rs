mod cli;
mod logging;
mod sample;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use test_event_wire::{default_registry, Record, Registry, WireConfig};
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.log_level).map_err(|err| anyhow!(err))?;
    run(cli)
}

fn run(cli: cli::Cli) -> Result<()> {
    match cli.command {
        cli::Commands::Decode {
            file,
            json,
            max_string_bytes,
            max_nesting,
        } => {
            let config = decode_config(max_string_bytes, max_nesting)?;
            let bytes = read_input(file.as_deref())?;
            let registry = Registry::with_config(config);
            let stdout = io::stdout();
            decode_stream(&registry, &bytes, json, &mut stdout.lock())
        }
        cli::Commands::Sample { file } => {
            let records = sample::worker_stream();
            let bytes = sample::encode_stream(default_registry(), &records)
                .context("encoding sample stream")?;
            fs::write(&file, &bytes).with_context(|| format!("writing {}", file.display()))?;
            info!(
                records = records.len(),
                bytes = bytes.len(),
                path = %file.display(),
                "wrote sample stream"
            );
            Ok(())
        }
    }
}

/// Environment limits first (bad values warn and keep the default), then
/// explicit flags on top.
fn decode_config(
    max_string_bytes: Option<usize>,
    max_nesting: Option<usize>,
) -> Result<WireConfig> {
    let mut config = WireConfig::from_env();
    if let Some(limit) = max_string_bytes {
        if limit == 0 {
            bail!("--max-string-bytes must be greater than zero");
        }
        config.max_string_bytes = limit;
    }
    if let Some(limit) = max_nesting {
        if limit == 0 {
            bail!("--max-nesting must be greater than zero");
        }
        config.max_nesting_depth = limit;
    }
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("reading stdin")?;
            Ok(bytes)
        }
    }
}

/// Prints one line per record; stops at the first malformed frame.
fn decode_stream(
    registry: &Registry,
    bytes: &[u8],
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut cursor = registry.cursor(bytes);
    let mut count = 0usize;
    while cursor.remaining() > 0 {
        let offset = cursor.position();
        let record = registry
            .decode(&mut cursor)
            .with_context(|| format!("malformed frame at offset {offset}"))?;
        print_record(out, offset, &record, json)?;
        count += 1;
    }
    debug!(records = count, bytes = bytes.len(), "decoded stream");
    Ok(())
}

fn print_record(out: &mut impl Write, offset: usize, record: &Record, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    } else {
        writeln!(out, "{offset:>8} {:?} {record:?}", record.kind())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_to_string(bytes: &[u8], json: bool) -> Result<String> {
        let mut out = Vec::new();
        decode_stream(default_registry(), bytes, json, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test_timeout::timeout]
    fn prints_one_line_per_record() {
        let records = sample::worker_stream();
        let bytes = sample::encode_stream(default_registry(), &records).unwrap();

        let text = decode_to_string(&bytes, false).unwrap();
        assert_eq!(text.lines().count(), records.len());
        assert!(text.lines().next().unwrap().trim_start().starts_with("0 SuiteDescriptor"));

        let json = decode_to_string(&bytes, true).unwrap();
        let first: Record = serde_json::from_str(json.lines().next().unwrap()).unwrap();
        assert_eq!(first, records[0]);
    }

    #[test_timeout::timeout]
    fn reports_offset_of_malformed_frame() {
        let records = sample::worker_stream();
        let mut bytes = sample::encode_stream(default_registry(), &records[..2]).unwrap();
        let offset = bytes.len();
        bytes.push(0x7F);

        let err = decode_to_string(&bytes, false).unwrap_err();
        assert_eq!(err.to_string(), format!("malformed frame at offset {offset}"));
    }

    #[test_timeout::timeout]
    fn unparsable_env_limit_falls_back_to_default() {
        std::env::set_var("TEST_WIRE_MAX_STRING_BYTES", "lots");
        let config = decode_config(None, None);
        std::env::remove_var("TEST_WIRE_MAX_STRING_BYTES");
        assert_eq!(
            config.unwrap().max_string_bytes,
            WireConfig::default().max_string_bytes
        );
    }

    #[test_timeout::timeout]
    fn zero_limits_are_rejected() {
        assert!(decode_config(Some(0), None).is_err());
        assert!(decode_config(None, Some(0)).is_err());
        let config = decode_config(Some(128), Some(4)).unwrap();
        assert_eq!(config.max_string_bytes, 128);
        assert_eq!(config.max_nesting_depth, 4);
    }
}
