//! The bitpeg command-line interface.
//!
//! Entry point for all CLI commands; each handler loads its input, runs one of
//! the library grammars and hands the outcome to [`output`].

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use miette::Diagnostic;
use termcolor::{ColorChoice, StandardStream};
use thiserror::Error;

use crate::cli::args::{BitpegArgs, Command};
use crate::config::EngineConfig;
use crate::dns::{DnsError, DnsParser};
use crate::errors::{ConfigError, GrammarError};

pub mod args;
pub mod output;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("cannot read {}", path.display())]
    #[diagnostic(code(bitpeg::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid hex input: {reason}")]
    #[diagnostic(
        code(bitpeg::cli::hex),
        help("hex input is pairs of hex digits; whitespace, `:` and `.` are ignored")
    )]
    Hex { reason: String },

    #[error("cannot write output")]
    #[diagnostic(code(bitpeg::cli::output))]
    Output(#[source] io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dns(#[from] DnsError),
}

/// The main entry point for the CLI.
pub fn run() {
    let args = BitpegArgs::parse();

    let result = match args.command {
        Command::Dns {
            file,
            hex,
            json,
            config,
        } => handle_dns(&file, hex, json, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        process::exit(1);
    }
}

/// Handles the `dns` subcommand.
fn handle_dns(file: &Path, hex: bool, json: bool, config: Option<&Path>) -> Result<(), CliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json_str(&read_text(path)?)?,
        None => EngineConfig::default(),
    };
    let raw = read_input(file)?;
    let packet = if hex {
        decode_hex(&String::from_utf8_lossy(&raw))?
    } else {
        raw
    };

    let parser = DnsParser::new()?;
    let message = parser.parse_with(&packet, config)?;

    let written = if json {
        output::print_json(&mut io::stdout().lock(), &message)
    } else {
        output::print_message(&mut StandardStream::stdout(ColorChoice::Auto), &message)
    };
    written.map_err(CliError::Output)
}

fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map_err(io_error)?;
        Ok(buf)
    } else {
        fs::read(path).map_err(io_error)
    }
}

fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes hex text, skipping whitespace and the `:`/`.` byte separators.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let digits = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '.')
        .map(|c| {
            c.to_digit(16).ok_or_else(|| CliError::Hex {
                reason: format!("unexpected character {:?}", c),
            })
        })
        .collect::<Result<Vec<u32>, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(CliError::Hex {
            reason: format!("odd number of digits ({})", digits.len()),
        });
    }
    Ok(digits
        .chunks(2)
        .map(|pair| ((pair[0] << 4) | pair[1]) as u8)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_ignores_separators() {
        assert_eq!(decode_hex("12 34\n.ab:CD").unwrap(), vec![0x12, 0x34, 0xab, 0xcd]);
    }

    #[test]
    fn decode_hex_rejects_bad_input() {
        assert!(matches!(decode_hex("123"), Err(CliError::Hex { .. })));
        assert!(matches!(decode_hex("zz"), Err(CliError::Hex { .. })));
    }
}
