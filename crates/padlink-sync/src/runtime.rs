//! Tokio actor that owns a scheduler.
//!
//! Submissions from any task are serialized through one mailbox, and the
//! scheduler's deadline becomes a `sleep_until` in the actor loop.

use std::time::Instant;

use bytes::Bytes;
use padlink_frame::{priority_for, Priority};
use padlink_transport::TransmitSink;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant as TokioInstant};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, SyncError};
use crate::scheduler::{CoalescingScheduler, FlushReport, SchedulerStats, Slot};

/// Clock backed by tokio's time source, so paused test time applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        TokioInstant::now().into_std()
    }
}

enum Request {
    Submit {
        command: u8,
        slot: Slot,
        payload: Bytes,
        priority: Priority,
    },
    Flush,
    ForceFlush(oneshot::Sender<FlushReport>),
    Stats(oneshot::Sender<SchedulerStats>),
    SetFrameRate(u32),
    ForgetSentState,
    Shutdown(oneshot::Sender<FlushReport>),
}

/// Cloneable handle to a running scheduler task.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl SchedulerHandle {
    fn send(&self, request: Request) -> Result<()> {
        self.tx.send(request).map_err(|_| SyncError::ActorGone)
    }

    pub fn submit(&self, command: u8, payload: impl Into<Bytes>, priority: Priority) -> Result<()> {
        self.submit_slot(command, 0, payload, priority)
    }

    pub fn submit_slot(
        &self,
        command: u8,
        slot: Slot,
        payload: impl Into<Bytes>,
        priority: Priority,
    ) -> Result<()> {
        self.send(Request::Submit {
            command,
            slot,
            payload: payload.into(),
            priority,
        })
    }

    /// Submit with the priority from the command table.
    pub fn queue(&self, command: u8, payload: impl Into<Bytes>) -> Result<()> {
        self.submit(command, payload, priority_for(command))
    }

    /// Request a rate-limited flush.
    pub fn flush(&self) -> Result<()> {
        self.send(Request::Flush)
    }

    pub async fn force_flush(&self) -> Result<FlushReport> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::ForceFlush(reply))?;
        rx.await.map_err(|_| SyncError::ActorGone)
    }

    pub async fn stats(&self) -> Result<SchedulerStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Stats(reply))?;
        rx.await.map_err(|_| SyncError::ActorGone)
    }

    pub fn set_frame_rate(&self, rate: u32) -> Result<()> {
        self.send(Request::SetFrameRate(rate))
    }

    pub fn forget_sent_state(&self) -> Result<()> {
        self.send(Request::ForgetSentState)
    }

    /// Flush everything outstanding and stop the task.
    pub async fn shutdown(&self) -> Result<FlushReport> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Shutdown(reply))?;
        rx.await.map_err(|_| SyncError::ActorGone)
    }
}

/// Move `scheduler` onto a tokio task.
///
/// The task exits on [`SchedulerHandle::shutdown`] or when every handle is
/// dropped, force-flushing in both cases. It yields the final statistics.
pub fn spawn_scheduler<S, C>(
    scheduler: CoalescingScheduler<S, C>,
) -> (SchedulerHandle, JoinHandle<SchedulerStats>)
where
    S: TransmitSink + Send + 'static,
    C: Clock + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(scheduler, rx));
    (SchedulerHandle { tx }, task)
}

async fn run<S, C>(
    mut scheduler: CoalescingScheduler<S, C>,
    mut rx: mpsc::UnboundedReceiver<Request>,
) -> SchedulerStats
where
    S: TransmitSink,
    C: Clock,
{
    debug!("scheduler task started");
    loop {
        let deadline = scheduler.next_deadline();
        let wake = deadline.map_or_else(TokioInstant::now, TokioInstant::from_std);

        tokio::select! {
            request = rx.recv() => match request {
                Some(Request::Submit { command, slot, payload, priority }) => {
                    scheduler.submit_slot(command, slot, &payload, priority);
                }
                Some(Request::Flush) => {
                    scheduler.flush();
                }
                Some(Request::ForceFlush(reply)) => {
                    let _ = reply.send(scheduler.force_flush());
                }
                Some(Request::Stats(reply)) => {
                    let _ = reply.send(scheduler.stats());
                }
                Some(Request::SetFrameRate(rate)) => scheduler.set_frame_rate(rate),
                Some(Request::ForgetSentState) => scheduler.forget_sent_state(),
                Some(Request::Shutdown(reply)) => {
                    let _ = reply.send(scheduler.shutdown());
                    break;
                }
                None => {
                    info!("all scheduler handles dropped");
                    scheduler.shutdown();
                    break;
                }
            },
            _ = sleep_until(wake), if deadline.is_some() => {
                scheduler.on_timer();
            }
        }
    }
    scheduler.stats()
}
