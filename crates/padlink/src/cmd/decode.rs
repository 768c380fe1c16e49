use padlink_frame::decode;
use padlink_sync::PadlinkConfig;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, FrameRecord, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, config: &PadlinkConfig) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex.join(" "))?;
    let frame = decode(&bytes, &config.frame).map_err(|err| frame_error("decode failed", err))?;
    print_frame(&FrameRecord::valid(&frame, &bytes), format);
    Ok(SUCCESS)
}

/// Parse hex digits, ignoring whitespace, `:` and `,` separators.
fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex input has an odd number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    CliError::usage(format!("invalid hex: {}", String::from_utf8_lossy(pair)))
                })
        })
        .collect()
}
