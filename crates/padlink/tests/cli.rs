#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

const VOLUME_FRAME: &str = "F0 7F 00 7F 21 05 00 02 03 64 43 F7";

fn padlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_padlink"))
        .args(args)
        .output()
        .expect("padlink should run")
}

fn padlink_with_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_padlink"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("padlink should spawn");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input)
        .expect("stdin should accept input");
    child.wait_with_output().expect("padlink should finish")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("padlink-{tag}-{}", std::process::id()))
}

fn frame_bytes(hex: &str) -> Vec<u8> {
    hex.split_whitespace()
        .map(|pair| u8::from_str_radix(pair, 16).expect("valid hex"))
        .collect()
}

#[test]
fn encode_prints_wire_frame() {
    let output = padlink(&[
        "encode",
        "MIXER_VOLUME",
        "3",
        "0x64",
        "--sequence",
        "5",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["command"], 0x21);
    assert_eq!(lines[0]["command_name"], "MIXER_VOLUME");
    assert_eq!(lines[0]["sequence"], 5);
    assert_eq!(lines[0]["frame"], VOLUME_FRAME);
}

#[test]
fn encode_rejects_high_payload_byte() {
    let output = padlink(&["encode", "MIXER_VOLUME", "0x80", "--format", "json"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(output.stdout.is_empty());
}

#[test]
fn encode_rejects_unknown_command_name() {
    let output = padlink(&["encode", "NO_SUCH_COMMAND"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn encode_writes_to_path() {
    let path = temp_path("encode-write");
    let _ = std::fs::remove_file(&path);

    let output = padlink(&[
        "encode",
        "MIXER_VOLUME",
        "3",
        "0x64",
        "-s",
        "5",
        "--write",
        path.to_str().expect("utf-8 temp path"),
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        std::fs::read(&path).expect("frame file"),
        frame_bytes(VOLUME_FRAME)
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn decode_reads_hex_frame() {
    let output = padlink(&["decode", VOLUME_FRAME, "--format", "json"]);
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines[0]["command_name"], "MIXER_VOLUME");
    assert_eq!(lines[0]["range"], "MIXER");
    assert_eq!(lines[0]["payload"], "03 64");
    assert_eq!(lines[0]["valid"], true);
}

#[test]
fn decode_bad_checksum_is_data_error() {
    let output = padlink(&["decode", "F0 7F 00 7F 21 05 00 02 03 64 00 F7"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("checksum mismatch"), "{stderr}");
}

#[test]
fn decode_bad_hex_is_usage_error() {
    let output = padlink(&["decode", "F0 7G"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn simulate_coalesces_burst() {
    let output = padlink(&["simulate", "--changes", "100", "--format", "json"]);
    assert!(output.status.success(), "{output:?}");

    let report = &json_lines(&output)[0];
    assert_eq!(report["frame_rate"], 60);
    assert_eq!(report["frames_on_wire"], 2);
    assert_eq!(report["stats"]["submitted"], 100);
    assert_eq!(report["stats"]["coalesced"], 98);
    assert_eq!(report["stats"]["messages_sent"], 2);
}

#[test]
fn simulate_spreads_over_slots() {
    let output = padlink(&[
        "simulate",
        "--changes",
        "8",
        "--slots",
        "4",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");

    let report = &json_lines(&output)[0];
    // First change flushes alone; the other seven collapse to one per track.
    assert_eq!(report["stats"]["messages_sent"], 5);
    assert_eq!(report["frames_on_wire"], 5);
}

#[test]
fn simulate_rejects_zero_slots() {
    let output = padlink(&["simulate", "--slots", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn monitor_reads_simulated_stream() {
    let raw = padlink(&["simulate", "--changes", "100", "--format", "raw"]);
    assert!(raw.status.success(), "{raw:?}");

    let output = padlink_with_stdin(&["monitor", "--format", "json"], &raw.stdout);
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["payload"], "00 00");
    assert_eq!(lines[1]["payload"], "00 63");
    assert_eq!(lines[1]["sequence"], 1);
}

#[test]
fn monitor_reports_malformed_when_asked() {
    let path = temp_path("monitor-malformed");
    let mut bytes = vec![0x01, 0x02];
    bytes.extend(frame_bytes("F0 7F 00 7F 21 05 00 02 03 64 00 F7"));
    bytes.extend(frame_bytes(VOLUME_FRAME));
    std::fs::write(&path, &bytes).expect("write stream");

    let output = padlink(&[
        "monitor",
        path.to_str().expect("utf-8 temp path"),
        "--show-malformed",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["valid"], false);
    assert_eq!(lines[1]["valid"], true);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn monitor_stops_after_count() {
    let stream = [frame_bytes(VOLUME_FRAME), frame_bytes(VOLUME_FRAME)].concat();
    let output = padlink_with_stdin(&["monitor", "-", "--count", "1", "--format", "json"], &stream);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(json_lines(&output).len(), 1);
}

#[test]
fn invalid_config_is_usage_error() {
    let path = temp_path("config");
    std::fs::write(&path, r#"{"scheduler": {"frame_rate": 0}}"#).expect("write config");

    let output = padlink(&[
        "simulate",
        "--config",
        path.to_str().expect("utf-8 temp path"),
    ]);
    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn config_sets_frame_rate() {
    let path = temp_path("config-rate");
    std::fs::write(&path, r#"{"scheduler": {"frame_rate": 30}}"#).expect("write config");

    let output = padlink(&[
        "simulate",
        "--changes",
        "10",
        "--config",
        path.to_str().expect("utf-8 temp path"),
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(json_lines(&output)[0]["frame_rate"], 30);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn version_prints_name() {
    let output = padlink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("padlink "), "{stdout}");

    let extended = padlink(&["version", "--extended"]);
    let stdout = String::from_utf8_lossy(&extended.stdout);
    assert!(stdout.contains("features: async="), "{stdout}");
}
