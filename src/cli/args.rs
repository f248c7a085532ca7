//! Command-line arguments and subcommands for the bitpeg CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "bitpeg",
    version,
    about = "Bit-level PEG parsing: decode binary messages with bitpeg grammars."
)]
pub struct BitpegArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a DNS message and print its contents.
    Dns {
        /// File holding the message, or `-` for standard input.
        #[arg(required = true)]
        file: PathBuf,
        /// Treat the input as hex text instead of raw bytes.
        #[arg(long)]
        hex: bool,
        /// Print the decoded message as JSON.
        #[arg(long)]
        json: bool,
        /// Engine configuration file (JSON).
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}
