//! Inbound routing of decoded frames to domain handlers by command range.

use std::ops::RangeInclusive;

use padlink_frame::{command_name, decode, is_handshake, Frame, FrameConfig, FrameError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Handler for one range of commands.
pub type Handler<H> = fn(&mut H, &Frame);

/// One row of the routing table.
pub struct Route<H> {
    pub name: &'static str,
    pub range: RangeInclusive<u8>,
    pub handler: Handler<H>,
}

impl<H> std::fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Delivered to the named route.
    Routed(&'static str),
    /// Handshake-class frame, handled ahead of routing.
    Handshake,
    /// No route covers the command; the frame was dropped.
    Unknown(u8),
    /// The bytes did not decode; nothing was applied.
    Malformed(FrameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    pub received: u64,
    pub routed: u64,
    pub handshakes: u64,
    pub unknown: u64,
    pub malformed: u64,
}

/// Demultiplexes inbound frames over a static route table.
///
/// Any well-formed frame proves the link is alive and marks it connected.
pub struct Dispatcher<'a, H> {
    routes: &'a [Route<H>],
    handshake: Option<Handler<H>>,
    config: FrameConfig,
    connected: bool,
    stats: DispatchStats,
}

impl<'a, H> Dispatcher<'a, H> {
    pub fn new(routes: &'a [Route<H>]) -> Self {
        Self::with_config(routes, FrameConfig::default())
    }

    pub fn with_config(routes: &'a [Route<H>], config: FrameConfig) -> Self {
        Self {
            routes,
            handshake: None,
            config,
            connected: false,
            stats: DispatchStats::default(),
        }
    }

    /// Install the handler for handshake-class commands.
    pub fn with_handshake(mut self, handler: Handler<H>) -> Self {
        self.handshake = Some(handler);
        self
    }

    /// Decode raw bytes and route the result.
    pub fn dispatch_bytes(&mut self, host: &mut H, bytes: &[u8]) -> DispatchOutcome {
        match decode(bytes, &self.config) {
            Ok(frame) => self.dispatch(host, &frame),
            Err(err) => {
                self.stats.received += 1;
                self.stats.malformed += 1;
                warn!(len = bytes.len(), error = %err, "dropping malformed frame");
                DispatchOutcome::Malformed(err)
            }
        }
    }

    /// Route a decoded frame.
    pub fn dispatch(&mut self, host: &mut H, frame: &Frame) -> DispatchOutcome {
        self.stats.received += 1;

        if is_handshake(frame.command) {
            self.stats.handshakes += 1;
            debug!(command = command_name(frame.command), "handshake received");
            if let Some(handler) = self.handshake {
                handler(host, frame);
            }
            self.mark_connected();
            return DispatchOutcome::Handshake;
        }

        self.mark_connected();

        match self
            .routes
            .iter()
            .find(|route| route.range.contains(&frame.command))
        {
            Some(route) => {
                self.stats.routed += 1;
                (route.handler)(host, frame);
                DispatchOutcome::Routed(route.name)
            }
            None => {
                self.stats.unknown += 1;
                warn!(
                    command = format_args!("0x{:02X}", frame.command),
                    sequence = frame.sequence,
                    "unknown command dropped"
                );
                DispatchOutcome::Unknown(frame.command)
            }
        }
    }

    fn mark_connected(&mut self) {
        if !self.connected {
            self.connected = true;
            info!("link connected");
        }
    }

    /// Forget liveness, e.g. when the transport reports the port closed.
    pub fn mark_disconnected(&mut self) {
        if self.connected {
            self.connected = false;
            info!("link disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

impl<H> std::fmt::Debug for Dispatcher<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("connected", &self.connected)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
