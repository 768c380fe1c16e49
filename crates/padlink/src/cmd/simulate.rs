use std::time::Duration;

use padlink_frame::command::MIXER_VOLUME;
use padlink_frame::priority_for;
use padlink_sync::config::clamp_frame_rate;
use padlink_sync::{Clock, CoalescingScheduler, ManualClock, PadlinkConfig, SchedulerStats};
use padlink_transport::MemorySink;
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::SimulateArgs;
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_raw, print_report, OutputFormat};

#[derive(Debug, Serialize)]
struct SimulationReport {
    changes: u32,
    slots: u16,
    frame_rate: u32,
    simulated_us: u64,
    frames_on_wire: usize,
    bytes_on_wire: usize,
    coalescing_ratio: f64,
    stats: SchedulerStats,
}

pub fn run(args: SimulateArgs, format: OutputFormat, config: &PadlinkConfig) -> CliResult<i32> {
    if args.slots == 0 || args.slots > 128 {
        return Err(CliError::usage("--slots must be within 1..=128"));
    }

    let mut scheduler_config = config.scheduler.clone();
    if let Some(rate) = args.frame_rate {
        scheduler_config.frame_rate = clamp_frame_rate(rate);
    }

    let sink = MemorySink::new();
    let clock = ManualClock::new();
    let start = clock.now();
    let mut scheduler = CoalescingScheduler::with_clock(
        sink.clone(),
        clock.clone(),
        &scheduler_config,
        config.frame.clone(),
    );
    let spacing = Duration::from_micros(args.spacing_us);
    let slots = u32::from(args.slots);
    let priority = priority_for(MIXER_VOLUME);

    for change in 0..args.changes {
        let track = (change % slots) as u8;
        let level = ((change / slots) % 128) as u8;
        scheduler.submit_slot(MIXER_VOLUME, u16::from(track), &[track, level], priority);

        clock.advance(spacing);
        if scheduler.next_deadline().is_some_and(|deadline| clock.now() >= deadline) {
            scheduler.on_timer();
        }
    }

    // Let the last armed deadline fire.
    while let Some(deadline) = scheduler.next_deadline() {
        let now = clock.now();
        if deadline > now {
            clock.advance(deadline - now);
        }
        scheduler.on_timer();
    }
    debug!(pending = scheduler.pending_len(), "burst drained");

    let frames = sink.take();
    let stats = scheduler.stats();
    let report = SimulationReport {
        changes: args.changes,
        slots: args.slots,
        frame_rate: scheduler_config.frame_rate,
        simulated_us: u64::try_from(clock.now().duration_since(start).as_micros())
            .unwrap_or(u64::MAX),
        frames_on_wire: frames.len(),
        bytes_on_wire: frames.iter().map(|frame| frame.len()).sum(),
        coalescing_ratio: stats.coalescing_ratio(),
        stats,
    };
    info!(
        changes = report.changes,
        frames = report.frames_on_wire,
        "simulation complete"
    );

    if let OutputFormat::Raw = format {
        for frame in &frames {
            print_raw(frame);
        }
        return Ok(SUCCESS);
    }

    let rows = [
        ("changes", report.changes.to_string()),
        ("slots", report.slots.to_string()),
        ("frame_rate", report.frame_rate.to_string()),
        ("simulated_us", report.simulated_us.to_string()),
        ("frames_on_wire", report.frames_on_wire.to_string()),
        ("bytes_on_wire", report.bytes_on_wire.to_string()),
        ("coalesced", report.stats.coalesced.to_string()),
        ("suppressed", report.stats.suppressed.to_string()),
        ("flushes", report.stats.frames_flushed.to_string()),
        ("coalescing_ratio", format!("{:.3}", report.coalescing_ratio)),
    ];
    print_report(&report, &rows, format);
    Ok(SUCCESS)
}
