use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use padlink_frame::{decode, FrameError, FrameReader};
use padlink_sync::PadlinkConfig;
use tracing::{info, warn};

use crate::cmd::MonitorArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, FrameRecord, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat, config: &PadlinkConfig) -> CliResult<i32> {
    let input = open_input(args.path.as_deref())?;
    let mut reader = FrameReader::with_config(input, config.frame.clone());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut malformed = 0usize;

    while running.load(Ordering::SeqCst) {
        let raw = match reader.read_raw() {
            Ok(raw) => raw,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        match decode(&raw, reader.config()) {
            Ok(frame) => {
                print_frame(&FrameRecord::valid(&frame, &raw), format);
                printed = printed.saturating_add(1);
            }
            Err(err) => {
                malformed = malformed.saturating_add(1);
                warn!(len = raw.len(), error = %err, "malformed frame");
                if args.show_malformed {
                    print_frame(&FrameRecord::malformed(&raw, &err), format);
                }
            }
        }

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    info!(frames = printed, malformed, "monitor finished");
    Ok(SUCCESS)
}

fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(std::io::stdin())),
        Some(path) if path.as_os_str() == "-" => Ok(Box::new(std::io::stdin())),
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed to open {}", path.display()), err))?;
            Ok(Box::new(file))
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
