use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "wire-inspect",
    about = "Decode and generate test-event wire streams",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Log verbosity; TEST_WIRE_LOG takes precedence when set.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode concatenated frames and print one line per record.
    Decode {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// Print records as JSON (for scripting).
        #[arg(long)]
        json: bool,
        /// Override the decoder's string length limit (default from
        /// TEST_WIRE_MAX_STRING_BYTES).
        #[arg(long)]
        max_string_bytes: Option<usize>,
        /// Override the decoder's cause nesting limit (default from
        /// TEST_WIRE_MAX_NESTING).
        #[arg(long)]
        max_nesting: Option<usize>,
    },
    /// Write a representative worker stream to FILE.
    Sample {
        file: PathBuf,
    },
}
