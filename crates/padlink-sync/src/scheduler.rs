//! Rate-bounded, deduplicating, priority-ordered outbound queue.
//!
//! The host may report state changes at any rate; the hardware link gets at
//! most one batch per frame interval. Within a batch, lower priority
//! ordinals are sent first.
//!
//! The scheduler never sleeps. When a submission arrives too early it arms a
//! deadline, and the owner calls [`CoalescingScheduler::on_timer`] once
//! [`CoalescingScheduler::next_deadline`] has passed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use padlink_frame::{command_name, command_spec, Coalesce, FrameConfig, FrameEncoder, Priority};
use padlink_transport::TransmitSink;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{clamp_frame_rate, frame_interval_for, SchedulerConfig};

/// Sub-key under a command, e.g. a track index.
///
/// Latest-only coalescing and duplicate suppression key on
/// `(command, slot)`. Plain [`CoalescingScheduler::submit`] uses slot 0.
pub type Slot = u16;

/// A submission waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub command: u8,
    pub slot: Slot,
    pub payload: Bytes,
    pub priority: Priority,
    pub enqueued_at: Instant,
    pub coalesce: Coalesce,
    ticket: u64,
}

/// What happened to one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlushReport {
    /// Messages handed to the sink.
    pub sent: usize,
    /// Messages the encoder refused.
    pub rejected: usize,
    /// Messages the sink failed to take.
    pub failed: usize,
}

/// Result of [`CoalescingScheduler::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The rate gate was open and the pending set was drained.
    Completed(FlushReport),
    /// Called inside the frame interval; nothing was sent.
    RateLimited,
}

/// Result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Payload equals what was last transmitted for this key.
    Suppressed,
    /// The interval had elapsed, so the pending set was flushed right away.
    Flushed(FlushReport),
    /// A deadline was armed `delay` from now.
    Armed { delay: Duration },
    /// A deadline was already armed; the message rides along with it.
    AlreadyArmed,
}

/// Running counters, cumulative over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub suppressed: u64,
    pub coalesced: u64,
    pub frames_flushed: u64,
    pub messages_sent: u64,
    pub dropped_frames: u64,
    pub encode_rejected: u64,
    pub transmit_failed: u64,
}

impl SchedulerStats {
    /// Share of submissions that never reached the wire as their own frame.
    pub fn coalescing_ratio(&self) -> f64 {
        if self.submitted == 0 {
            return 0.0;
        }
        (self.coalesced + self.suppressed) as f64 / self.submitted as f64
    }
}

type Key = (u8, Slot);

/// Batches outbound state changes into at most one flush per frame interval.
pub struct CoalescingScheduler<S, C = SystemClock> {
    sink: S,
    clock: C,
    encoder: FrameEncoder,
    interval: Duration,
    stats_log_every: u64,
    latest: HashMap<Key, PendingMessage>,
    accumulated: Vec<PendingMessage>,
    last_sent: HashMap<Key, Bytes>,
    last_flush: Option<Instant>,
    deadline: Option<Instant>,
    next_ticket: u64,
    stats: SchedulerStats,
}

impl<S: TransmitSink> CoalescingScheduler<S, SystemClock> {
    /// Create a scheduler driven by wall-clock time.
    pub fn new(sink: S, config: &SchedulerConfig, frame: FrameConfig) -> Self {
        Self::with_clock(sink, SystemClock, config, frame)
    }
}

impl<S: TransmitSink, C: Clock> CoalescingScheduler<S, C> {
    /// Create a scheduler with an explicit time source.
    pub fn with_clock(sink: S, clock: C, config: &SchedulerConfig, frame: FrameConfig) -> Self {
        Self {
            sink,
            clock,
            encoder: FrameEncoder::new(frame),
            interval: config.frame_interval(),
            stats_log_every: config.stats_log_every,
            latest: HashMap::new(),
            accumulated: Vec::new(),
            last_sent: HashMap::new(),
            last_flush: None,
            deadline: None,
            next_ticket: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Submit a state change for `command`.
    pub fn submit(&mut self, command: u8, payload: &[u8], priority: Priority) -> SubmitOutcome {
        self.submit_slot(command, 0, payload, priority)
    }

    /// Submit with the priority declared in the command table.
    pub fn queue(&mut self, command: u8, payload: &[u8]) -> SubmitOutcome {
        self.queue_slot(command, 0, payload)
    }

    /// [`queue`](Self::queue) for one slot of a command.
    pub fn queue_slot(&mut self, command: u8, slot: Slot, payload: &[u8]) -> SubmitOutcome {
        let priority = command_spec(command).map_or(Priority::LOW, |spec| spec.priority);
        self.submit_slot(command, slot, payload, priority)
    }

    /// Submit a state change for one slot of `command`.
    pub fn submit_slot(
        &mut self,
        command: u8,
        slot: Slot,
        payload: &[u8],
        priority: Priority,
    ) -> SubmitOutcome {
        self.stats.submitted += 1;
        let key = (command, slot);
        let coalesce = command_spec(command).map_or(Coalesce::LatestOnly, |spec| spec.coalesce);

        if self
            .last_sent
            .get(&key)
            .is_some_and(|last| last.as_ref() == payload)
        {
            self.stats.suppressed += 1;
            // A pending change back to the already-sent value is moot.
            if coalesce == Coalesce::LatestOnly && self.latest.remove(&key).is_some() {
                trace!(command = command_name(command), slot, "pending change reverted");
            }
            return SubmitOutcome::Suppressed;
        }

        let message = PendingMessage {
            command,
            slot,
            payload: Bytes::copy_from_slice(payload),
            priority,
            enqueued_at: self.clock.now(),
            coalesce,
            ticket: self.next_ticket,
        };
        self.next_ticket += 1;

        match coalesce {
            Coalesce::LatestOnly => {
                if self.latest.insert(key, message).is_some() {
                    self.stats.coalesced += 1;
                }
            }
            Coalesce::Accumulate => self.accumulated.push(message),
        }

        self.schedule()
    }

    fn schedule(&mut self) -> SubmitOutcome {
        let now = self.clock.now();
        match self.last_flush {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                if self.deadline.is_some() {
                    return SubmitOutcome::AlreadyArmed;
                }
                let deadline = last + self.interval;
                self.deadline = Some(deadline);
                SubmitOutcome::Armed {
                    delay: deadline.saturating_duration_since(now),
                }
            }
            _ => SubmitOutcome::Flushed(self.run_flush(now)),
        }
    }

    /// Send every pending message, unless the last flush was less than one
    /// frame interval ago.
    ///
    /// A rate-limited call counts a dropped frame and re-arms the deadline
    /// when messages are still pending.
    pub fn flush(&mut self) -> FlushOutcome {
        let now = self.clock.now();
        if let Some(last) = self.last_flush {
            if now.saturating_duration_since(last) < self.interval {
                self.stats.dropped_frames += 1;
                debug!(
                    pending = self.pending_len(),
                    dropped = self.stats.dropped_frames,
                    "flush inside frame interval; frame dropped"
                );
                if self.has_pending() && self.deadline.is_none() {
                    self.deadline = Some(last + self.interval);
                }
                return FlushOutcome::RateLimited;
            }
        }
        FlushOutcome::Completed(self.run_flush(now))
    }

    /// Flush regardless of the rate ceiling, cancelling any armed deadline.
    pub fn force_flush(&mut self) -> FlushReport {
        let now = self.clock.now();
        self.run_flush(now)
    }

    /// The armed deadline fired.
    pub fn on_timer(&mut self) -> FlushOutcome {
        self.deadline = None;
        self.flush()
    }

    /// When the owner should call [`on_timer`](Self::on_timer), if armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn run_flush(&mut self, now: Instant) -> FlushReport {
        self.deadline = None;
        self.last_flush = Some(now);

        let mut batch: Vec<PendingMessage> = self
            .latest
            .drain()
            .map(|(_, message)| message)
            .chain(self.accumulated.drain(..))
            .collect();
        if batch.is_empty() {
            return FlushReport::default();
        }
        batch.sort_by_key(|message| (message.priority, message.ticket));
        self.stats.frames_flushed += 1;

        let mut report = FlushReport::default();
        for message in batch {
            let frame = match self.encoder.encode(message.command, &message.payload) {
                Ok(frame) => frame,
                Err(err) => {
                    self.stats.encode_rejected += 1;
                    report.rejected += 1;
                    warn!(
                        command = command_name(message.command),
                        slot = message.slot,
                        error = %err,
                        "encode rejected; message dropped"
                    );
                    continue;
                }
            };

            if let Err(err) = self.sink.transmit(&frame) {
                self.stats.transmit_failed += 1;
                report.failed += 1;
                warn!(
                    command = command_name(message.command),
                    slot = message.slot,
                    error = %err,
                    "transmit failed; message dropped"
                );
                continue;
            }

            trace!(
                command = command_name(message.command),
                slot = message.slot,
                len = message.payload.len(),
                age_us = now.saturating_duration_since(message.enqueued_at).as_micros() as u64,
                "message sent"
            );
            self.last_sent
                .insert((message.command, message.slot), message.payload);
            report.sent += 1;
            self.stats.messages_sent += 1;
            if self.stats_log_every > 0 && self.stats.messages_sent % self.stats_log_every == 0 {
                self.log_summary();
            }
        }
        report
    }

    fn log_summary(&self) {
        debug!(
            submitted = self.stats.submitted,
            sent = self.stats.messages_sent,
            coalesced = self.stats.coalesced,
            suppressed = self.stats.suppressed,
            ratio = format_args!("{:.1}%", self.stats.coalescing_ratio() * 100.0),
            dropped = self.stats.dropped_frames,
            "scheduler summary"
        );
    }

    /// Change the frame rate (clamped to 1..=120 fps).
    pub fn set_frame_rate(&mut self, rate: u32) {
        self.interval = frame_interval_for(rate);
        info!(
            fps = clamp_frame_rate(rate),
            interval_us = self.interval.as_micros() as u64,
            "frame rate set"
        );
    }

    pub fn frame_interval(&self) -> Duration {
        self.interval
    }

    /// Forget what was last transmitted so a full-state replay is not
    /// suppressed, e.g. after the link reconnects.
    pub fn forget_sent_state(&mut self) {
        self.last_sent.clear();
        debug!("last-sent state cleared");
    }

    /// Cancel the deadline, push out everything pending and reset.
    pub fn shutdown(&mut self) -> FlushReport {
        let report = self.force_flush();
        self.last_sent.clear();
        info!(
            sent = report.sent,
            total_sent = self.stats.messages_sent,
            dropped_frames = self.stats.dropped_frames,
            "scheduler shut down"
        );
        report
    }

    /// Payload last transmitted for `(command, slot)`.
    pub fn last_sent(&self, command: u8, slot: Slot) -> Option<&Bytes> {
        self.last_sent.get(&(command, slot))
    }

    pub fn pending_len(&self) -> usize {
        self.latest.len() + self.accumulated.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.latest.is_empty() || !self.accumulated.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Borrow the transmit sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the transmit sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S, C> std::fmt::Debug for CoalescingScheduler<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingScheduler")
            .field("interval", &self.interval)
            .field("pending", &(self.latest.len() + self.accumulated.len()))
            .field("deadline", &self.deadline)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
