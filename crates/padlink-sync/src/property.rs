//! Binding table from host property ids to outbound commands.
//!
//! The host reports every change through one entry point,
//! [`on_property_changed`], with an id and an already-extracted value. The
//! table decides which command, slot and priority carry it.

use std::collections::HashMap;

use padlink_frame::value::{pack14_array, pack_ascii, pack_bool, pack_level, pack_rgb24, Rgb};
use padlink_frame::{command_name, priority_for, Priority};
use padlink_transport::TransmitSink;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::scheduler::{CoalescingScheduler, Slot, SubmitOutcome};

/// Longest text value sent to the hardware display.
pub const MAX_TEXT_LEN: usize = 32;

/// Opaque host property tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u16);

/// A scalar, string or color extracted from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    /// 0..=16383, sent as a 14-bit pair. Larger values clamp.
    Int(u16),
    /// Normalized 0.0..=1.0, sent as one byte 0..=127.
    Level(f32),
    /// Sent as ASCII, truncated to [`MAX_TEXT_LEN`].
    Text(String),
    /// Sent as RGB24 (six bytes).
    Color(Rgb),
}

impl PropertyValue {
    /// Append the 7-bit-clean encoding of this value.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            PropertyValue::Bool(value) => out.push(pack_bool(*value)),
            PropertyValue::Int(value) => out.extend_from_slice(&pack14_array(*value)),
            PropertyValue::Level(level) => out.push(pack_level(*level)),
            PropertyValue::Text(text) => out.extend(pack_ascii(text, MAX_TEXT_LEN)),
            PropertyValue::Color(color) => {
                out.extend_from_slice(&pack_rgb24(color.r, color.g, color.b))
            }
        }
    }
}

/// Where a property's changes are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBinding {
    pub command: u8,
    pub slot: Slot,
    pub priority: Priority,
    /// Bytes placed before the encoded value, e.g. a track index.
    pub prefix: Vec<u8>,
}

impl PropertyBinding {
    /// Bind to `command` at slot 0 with the command table's priority.
    pub fn new(command: u8) -> Self {
        Self {
            command,
            slot: 0,
            priority: priority_for(command),
            prefix: Vec::new(),
        }
    }

    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Full payload for `value`: prefix followed by the encoded value.
    pub fn payload(&self, value: &PropertyValue) -> Vec<u8> {
        let mut payload = self.prefix.clone();
        value.encode_into(&mut payload);
        payload
    }
}

/// Lookup from property id to binding.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    bindings: HashMap<PropertyId, PropertyBinding>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id`, returning the binding it replaced.
    pub fn bind(&mut self, id: PropertyId, binding: PropertyBinding) -> Option<PropertyBinding> {
        self.bindings.insert(id, binding)
    }

    pub fn unbind(&mut self, id: PropertyId) -> Option<PropertyBinding> {
        self.bindings.remove(&id)
    }

    pub fn get(&self, id: PropertyId) -> Option<&PropertyBinding> {
        self.bindings.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Forward one host change to the scheduler.
///
/// Returns `None` when `id` is not bound.
pub fn on_property_changed<S, C>(
    table: &PropertyTable,
    scheduler: &mut CoalescingScheduler<S, C>,
    id: PropertyId,
    value: &PropertyValue,
) -> Option<SubmitOutcome>
where
    S: TransmitSink,
    C: Clock,
{
    let Some(binding) = table.get(id) else {
        debug!(property = id.0, "change for unbound property ignored");
        return None;
    };
    let payload = binding.payload(value);
    debug!(
        property = id.0,
        command = command_name(binding.command),
        slot = binding.slot,
        len = payload.len(),
        "property changed"
    );
    Some(scheduler.submit_slot(binding.command, binding.slot, &payload, binding.priority))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use padlink_frame::command::{MIXER_MUTE, MIXER_VOLUME, TRACK_COLOR, TRACK_NAME, TRANSPORT_TEMPO};
    use padlink_frame::{decode, FrameConfig};
    use padlink_transport::MemorySink;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SchedulerConfig;

    const VOLUME_TRACK_0: PropertyId = PropertyId(1);
    const VOLUME_TRACK_1: PropertyId = PropertyId(2);
    const TEMPO: PropertyId = PropertyId(3);

    fn table() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.bind(
            VOLUME_TRACK_0,
            PropertyBinding::new(MIXER_VOLUME).with_slot(0).with_prefix([0u8]),
        );
        table.bind(
            VOLUME_TRACK_1,
            PropertyBinding::new(MIXER_VOLUME).with_slot(1).with_prefix([1u8]),
        );
        table.bind(TEMPO, PropertyBinding::new(TRANSPORT_TEMPO));
        table
    }

    #[test]
    fn values_encode_seven_bit_clean() {
        let cases = [
            (PropertyValue::Bool(true), vec![1]),
            (PropertyValue::Int(300), vec![2, 44]),
            (PropertyValue::Level(1.0), vec![127]),
            (PropertyValue::Text("Bass".into()), b"Bass".to_vec()),
            (
                PropertyValue::Color(Rgb::new(255, 0, 128)),
                vec![1, 127, 0, 0, 1, 0],
            ),
        ];
        for (value, expected) in cases {
            let mut out = Vec::new();
            value.encode_into(&mut out);
            assert_eq!(out, expected, "{value:?}");
        }
    }

    #[test]
    fn long_text_is_truncated() {
        let binding = PropertyBinding::new(TRACK_NAME).with_prefix([4u8]);
        let payload = binding.payload(&PropertyValue::Text("x".repeat(100)));
        assert_eq!(payload.len(), 1 + MAX_TEXT_LEN);
        assert_eq!(payload[0], 4);
    }

    #[test]
    fn binding_defaults_to_table_priority() {
        assert_eq!(PropertyBinding::new(MIXER_MUTE).priority, Priority::HIGH);
        assert_eq!(PropertyBinding::new(TRACK_COLOR).priority, Priority::NORMAL);
        assert_eq!(
            PropertyBinding::new(TRACK_COLOR)
                .with_priority(Priority::LOW)
                .priority,
            Priority::LOW
        );
    }

    #[test]
    fn changes_route_through_scheduler() {
        let sink = MemorySink::new();
        let clock = ManualClock::new();
        let mut scheduler = CoalescingScheduler::with_clock(
            sink.clone(),
            clock.clone(),
            &SchedulerConfig::default(),
            FrameConfig::default(),
        );
        let table = table();

        scheduler.force_flush();
        on_property_changed(&table, &mut scheduler, VOLUME_TRACK_0, &PropertyValue::Int(100));
        on_property_changed(&table, &mut scheduler, VOLUME_TRACK_1, &PropertyValue::Int(5));
        on_property_changed(&table, &mut scheduler, VOLUME_TRACK_0, &PropertyValue::Int(101));
        clock.advance(Duration::from_secs(1));
        scheduler.on_timer();

        let payloads: Vec<Vec<u8>> = sink
            .frames()
            .iter()
            .map(|bytes| decode(bytes, &FrameConfig::default()).unwrap().payload.to_vec())
            .collect();
        assert_eq!(payloads, vec![vec![1, 0, 5], vec![0, 0, 101]]);
    }

    #[test]
    fn unbound_property_is_ignored() {
        let mut scheduler = CoalescingScheduler::with_clock(
            MemorySink::new(),
            ManualClock::new(),
            &SchedulerConfig::default(),
            FrameConfig::default(),
        );
        let outcome = on_property_changed(
            &table(),
            &mut scheduler,
            PropertyId(99),
            &PropertyValue::Bool(true),
        );
        assert_eq!(outcome, None);
        assert_eq!(scheduler.stats().submitted, 0);
    }

    #[test]
    fn rebinding_replaces() {
        let mut table = table();
        assert_eq!(table.len(), 3);
        let old = table.bind(TEMPO, PropertyBinding::new(MIXER_MUTE)).unwrap();
        assert_eq!(old.command, TRANSPORT_TEMPO);
        assert!(table.unbind(TEMPO).is_some());
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }
}
