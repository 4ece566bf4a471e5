//! Command-line argument parsing shared by both adapters.

use crate::error::{BridgeError, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Path value meaning "read from stdin".
pub const STDIN_PATH: &str = "-";

/// Arguments accepted by `impyla-query` and `impyla-render`.
///
/// The request itself always arrives as a JSON document; these flags only
/// choose where it is read from and how the response is printed.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Read the request from a file instead of stdin ("-")
    #[arg(short = 'i', long, value_name = "PATH", default_value = STDIN_PATH)]
    pub input: PathBuf,

    /// Pretty-print the response JSON
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Parses command-line arguments.
    ///
    /// Help and version requests print and exit. Any other problem is a
    /// usage error, reported like every other failure.
    pub fn parse_args() -> Result<Self> {
        Self::parse_args_from(std::env::args_os())
    }

    /// Parses arguments from `args`, the first being the binary name.
    pub fn parse_args_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).or_else(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => Err(usage_error(&e)),
        })
    }

    /// Returns true if the request is read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input == Path::new(STDIN_PATH)
    }

    /// Reads the raw request document.
    pub fn read_input(&self) -> Result<String> {
        if self.reads_stdin() {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| read_error(e, "stdin"))?;
            Ok(buffer)
        } else {
            std::fs::read_to_string(&self.input)
                .map_err(|e| read_error(e, &format!("input file {}", self.input.display())))
        }
    }
}

/// Keeps the first line of clap's message, without its `error:` prefix.
fn usage_error(e: &clap::Error) -> BridgeError {
    let rendered = e.to_string();
    let message = rendered.lines().next().unwrap_or_default();
    BridgeError::usage(message.trim_start_matches("error:").trim())
}

/// Text that is not UTF-8 is a malformed request; anything else is an I/O failure.
fn read_error(e: std::io::Error, source: &str) -> BridgeError {
    if e.kind() == std::io::ErrorKind::InvalidData {
        BridgeError::malformed_input(format!("{source} is not valid UTF-8"))
    } else {
        BridgeError::internal(format!("Failed to read {source}: {e}"))
    }
}
