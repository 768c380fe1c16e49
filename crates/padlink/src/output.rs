use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use padlink_frame::{command_name, hex_dump, range_of, Frame, FrameError, HEADER_SIZE};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame as shown to the operator, valid or not.
#[derive(Serialize)]
pub struct FrameRecord {
    pub command: Option<u8>,
    pub command_name: &'static str,
    pub range: Option<&'static str>,
    pub sequence: Option<u8>,
    pub payload_size: usize,
    pub payload: String,
    pub frame: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    wire: Vec<u8>,
}

impl FrameRecord {
    pub fn valid(frame: &Frame, wire: &[u8]) -> Self {
        Self {
            command: Some(frame.command),
            command_name: command_name(frame.command),
            range: range_of(frame.command).map(|range| range.name()),
            sequence: Some(frame.sequence),
            payload_size: frame.payload.len(),
            payload: hex_dump(&frame.payload),
            frame: hex_dump(wire),
            valid: true,
            error: None,
            wire: wire.to_vec(),
        }
    }

    /// Best-effort view of bytes that failed validation.
    pub fn malformed(wire: &[u8], err: &FrameError) -> Self {
        let command = wire.get(4).copied();
        let payload = wire
            .get(HEADER_SIZE..wire.len().saturating_sub(2))
            .unwrap_or_default();
        Self {
            command,
            command_name: command.map_or("UNKNOWN", command_name),
            range: command.and_then(range_of).map(|range| range.name()),
            sequence: wire.get(5).copied(),
            payload_size: payload.len(),
            payload: hex_dump(payload),
            frame: hex_dump(wire),
            valid: false,
            error: Some(err.to_string()),
            wire: wire.to_vec(),
        }
    }
}

pub fn print_frame(record: &FrameRecord, format: OutputFormat) {
    let command = record
        .command
        .map_or_else(|| "--".to_string(), |c| format!("0x{c:02X}"));
    let sequence = record
        .sequence
        .map_or_else(|| "--".to_string(), |s| s.to_string());
    let status = match &record.error {
        Some(err) => format!("invalid: {err}"),
        None => "ok".to_string(),
    };

    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CMD", "NAME", "SEQ", "SIZE", "PAYLOAD", "STATUS"])
                .add_row(vec![
                    command,
                    record.command_name.to_string(),
                    sequence,
                    record.payload_size.to_string(),
                    record.payload.clone(),
                    status,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "cmd={} ({}) seq={} size={} payload=[{}] {}",
                command, record.command_name, sequence, record.payload_size, record.payload, status
            );
        }
        OutputFormat::Raw => print_raw(&record.wire),
    }
}

/// Key/value report for table and pretty output; JSON uses `value`.
pub fn print_report<T: Serialize>(value: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, val) in rows {
                table.add_row(vec![key.to_string(), val.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, val) in rows {
                println!("{key}: {val}");
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
