use std::fs::OpenOptions;

use bytes::BytesMut;
use padlink_frame::value::{pack_ascii, pack_rgb24};
use padlink_frame::{command_name, encode_frame, Frame};
use padlink_sync::property::MAX_TEXT_LEN;
use padlink_sync::PadlinkConfig;
use padlink_transport::{TransmitSink, WriteSink};
use tracing::info;

use crate::cmd::{parse_byte, parse_command, EncodeArgs};
use crate::exit::{encode_error, io_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, FrameRecord, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat, config: &PadlinkConfig) -> CliResult<i32> {
    let command = parse_command(&args.command)?;
    let mut payload = args
        .payload
        .iter()
        .map(|text| parse_byte(text))
        .collect::<CliResult<Vec<u8>>>()?;

    if let Some(rgb) = &args.rgb {
        let [r, g, b] = rgb.as_slice() else {
            return Err(CliError::usage("--rgb takes exactly three components"));
        };
        payload.extend_from_slice(&pack_rgb24(*r, *g, *b));
    }
    if let Some(text) = &args.text {
        payload.extend(pack_ascii(text, MAX_TEXT_LEN));
    }

    let mut wire = BytesMut::new();
    encode_frame(command, args.sequence, &payload, &config.frame, &mut wire)
        .map_err(|err| encode_error("encode rejected", err))?;

    if let Some(path) = &args.write {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| io_error(&format!("failed to open {}", path.display()), err))?;
        WriteSink::new(file)
            .transmit(&wire)
            .map_err(|err| transport_error("write failed", err))?;
        info!(
            command = command_name(command),
            size = wire.len(),
            path = %path.display(),
            "frame written"
        );
    }

    let frame = Frame::new(command, args.sequence & 0x7F, payload);
    print_frame(&FrameRecord::valid(&frame, &wire), format);
    Ok(SUCCESS)
}
