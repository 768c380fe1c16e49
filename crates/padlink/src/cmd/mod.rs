use clap::{Args, Subcommand};
use std::path::PathBuf;

use padlink_frame::command::COMMANDS;
use padlink_sync::PadlinkConfig;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print it as hex.
    Encode(EncodeArgs),
    /// Decode a hex frame and print its fields.
    Decode(DecodeArgs),
    /// Print frames read from a file, device or stdin.
    Monitor(MonitorArgs),
    /// Drive the scheduler with a synthetic burst and report statistics.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: &PadlinkConfig) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format, config),
        Command::Decode(args) => decode::run(args, format, config),
        Command::Monitor(args) => monitor::run(args, format, config),
        Command::Simulate(args) => simulate::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command name (e.g. MIXER_VOLUME) or id (0x21, 33).
    pub command: String,
    /// Payload bytes, hex with 0x prefix or decimal.
    #[arg(value_name = "BYTE")]
    pub payload: Vec<String>,
    /// Sequence number (masked to 7 bits).
    #[arg(long, short = 's', default_value = "0")]
    pub sequence: u8,
    /// Append an RGB color as six 7-bit bytes.
    #[arg(long, value_name = "R,G,B", value_delimiter = ',')]
    pub rgb: Option<Vec<u8>>,
    /// Append ASCII text.
    #[arg(long)]
    pub text: Option<String>,
    /// Also write the frame to this file or device.
    #[arg(long, value_name = "PATH")]
    pub write: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; spaces, colons and commas are ignored.
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// File or device to read. Reads stdin when omitted or `-`.
    pub path: Option<PathBuf>,
    /// Exit after printing N valid frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Also print frames that fail validation.
    #[arg(long)]
    pub show_malformed: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of value changes to submit.
    #[arg(long, default_value = "100")]
    pub changes: u32,
    /// Distinct mixer tracks the changes rotate over.
    #[arg(long, default_value = "1")]
    pub slots: u16,
    /// Simulated time between changes, in microseconds.
    #[arg(long, default_value = "100")]
    pub spacing_us: u64,
    /// Override the configured frame rate.
    #[arg(long)]
    pub frame_rate: Option<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse one byte written as `0x..` hex or decimal.
pub fn parse_byte(text: &str) -> CliResult<u8> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid byte: {text}")))
}

/// Resolve a command name from the table, or fall back to a numeric id.
pub fn parse_command(text: &str) -> CliResult<u8> {
    if let Some(spec) = COMMANDS
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(text))
    {
        return Ok(spec.id);
    }
    parse_byte(text).map_err(|_| CliError::usage(format!("unknown command: {text}")))
}
