//! Command ids and their static metadata.
//!
//! The command space is partitioned into contiguous ranges, one per domain
//! area. Every id is 7-bit so it can travel in a frame unescaped.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Send order inside one flush. Lower ordinals go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    /// Transport-critical (play/stop, record, handshake).
    pub const CRITICAL: Priority = Priority(1);
    /// Primary visual state (clip LEDs, parameters, ring position).
    pub const HIGH: Priority = Priority(2);
    /// Bulk redraws (grid content).
    pub const NORMAL: Priority = Priority(3);
    /// Everything without an explicit priority.
    pub const LOW: Priority = Priority(4);
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOW
    }
}

/// How pending submissions for the same command combine before a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coalesce {
    /// Only the most recent pending value is kept; older ones are discarded.
    LatestOnly,
    /// Every submission is queued as its own message.
    Accumulate,
}

/// Static metadata for one command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub id: u8,
    pub name: &'static str,
    pub coalesce: Coalesce,
    pub priority: Priority,
}

/// Domain area owning a contiguous block of command ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandRange {
    System,
    Grid,
    Mixer,
    Device,
    Note,
    Transport,
    Connection,
    Navigation,
    Automation,
}

impl CommandRange {
    pub const ALL: [CommandRange; 9] = [
        CommandRange::System,
        CommandRange::Grid,
        CommandRange::Mixer,
        CommandRange::Device,
        CommandRange::Note,
        CommandRange::Transport,
        CommandRange::Connection,
        CommandRange::Navigation,
        CommandRange::Automation,
    ];

    /// Inclusive id bounds of this range.
    pub fn bounds(self) -> RangeInclusive<u8> {
        match self {
            CommandRange::System => 0x00..=0x0F,
            CommandRange::Grid => 0x10..=0x1F,
            CommandRange::Mixer => 0x20..=0x2F,
            CommandRange::Device => 0x30..=0x3F,
            CommandRange::Note => 0x40..=0x4F,
            CommandRange::Transport => 0x50..=0x5F,
            CommandRange::Connection => 0x60..=0x6F,
            CommandRange::Navigation => 0x70..=0x77,
            CommandRange::Automation => 0x78..=0x7F,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandRange::System => "SYSTEM",
            CommandRange::Grid => "GRID",
            CommandRange::Mixer => "MIXER",
            CommandRange::Device => "DEVICE",
            CommandRange::Note => "NOTE",
            CommandRange::Transport => "TRANSPORT",
            CommandRange::Connection => "CONNECTION",
            CommandRange::Navigation => "NAVIGATION",
            CommandRange::Automation => "AUTOMATION",
        }
    }
}

// System
pub const SWITCH_VIEW: u8 = 0x01;

// Grid / clip
pub const CLIP_STATE: u8 = 0x10;
pub const CLIP_TRIGGER: u8 = 0x11;
pub const SCENE_FIRE: u8 = 0x12;
pub const CLIP_STOP: u8 = 0x13;
pub const CLIP_NAME: u8 = 0x14;
pub const SCENE_STATE: u8 = 0x1A;
pub const SCENE_NAME: u8 = 0x1B;
pub const SCENE_COLOR: u8 = 0x1C;
pub const GRID_CONTENT: u8 = 0x1E;

// Mixer
pub const MIXER_STATE: u8 = 0x20;
pub const MIXER_VOLUME: u8 = 0x21;
pub const MIXER_PAN: u8 = 0x22;
pub const MIXER_MUTE: u8 = 0x23;
pub const MIXER_SOLO: u8 = 0x24;
pub const MIXER_ARM: u8 = 0x25;
pub const MIXER_SEND: u8 = 0x26;
pub const TRACK_NAME: u8 = 0x27;
pub const TRACK_PLAYING_SLOT: u8 = 0x28;
pub const TRACK_COLOR: u8 = 0x2B;

// Device
pub const DEVICE_LIST: u8 = 0x30;
pub const DEVICE_SELECT: u8 = 0x31;
pub const DEVICE_PARAMS: u8 = 0x32;
pub const PARAM_CHANGE: u8 = 0x33;
pub const PARAM_VALUE: u8 = 0x34;
pub const DEVICE_ENABLE: u8 = 0x35;

// Note
pub const NOTE_ON: u8 = 0x40;
pub const NOTE_OFF: u8 = 0x41;
pub const SCALE_INFO: u8 = 0x43;
pub const OCTAVE_INFO: u8 = 0x45;
pub const DRUM_GRID: u8 = 0x4B;

// Transport
pub const TRANSPORT: u8 = 0x50;
pub const TRANSPORT_PLAY: u8 = 0x51;
pub const TRANSPORT_RECORD: u8 = 0x52;
pub const TRANSPORT_LOOP: u8 = 0x53;
pub const TRANSPORT_TEMPO: u8 = 0x54;
pub const TRANSPORT_POSITION: u8 = 0x56;
pub const TRANSPORT_METRONOME: u8 = 0x57;

// Connection
pub const HANDSHAKE: u8 = 0x60;
pub const HANDSHAKE_REPLY: u8 = 0x61;
pub const VIEW_STATE: u8 = 0x62;
pub const PING: u8 = 0x63;

// Navigation
pub const RING_POSITION: u8 = 0x70;
pub const RING_NAVIGATE: u8 = 0x71;
pub const RING_SELECT: u8 = 0x72;
pub const TRACK_SELECT: u8 = 0x73;
pub const SCENE_SELECT: u8 = 0x74;
pub const SELECTED_TRACK: u8 = 0x75;
pub const SELECTED_SCENE: u8 = 0x76;

// Automation
pub const AUTOMATION_RECORD: u8 = 0x78;
pub const UNDO: u8 = 0x7B;
pub const REDO: u8 = 0x7C;

const fn spec(id: u8, name: &'static str, coalesce: Coalesce, priority: Priority) -> CommandSpec {
    CommandSpec {
        id,
        name,
        coalesce,
        priority,
    }
}

use Coalesce::{Accumulate, LatestOnly};

/// Metadata for every known command, sorted by id.
pub static COMMANDS: &[CommandSpec] = &[
    spec(SWITCH_VIEW, "SWITCH_VIEW", LatestOnly, Priority::HIGH),
    spec(CLIP_STATE, "CLIP_STATE", LatestOnly, Priority::HIGH),
    spec(CLIP_TRIGGER, "CLIP_TRIGGER", Accumulate, Priority::CRITICAL),
    spec(SCENE_FIRE, "SCENE_FIRE", Accumulate, Priority::CRITICAL),
    spec(CLIP_STOP, "CLIP_STOP", Accumulate, Priority::CRITICAL),
    spec(CLIP_NAME, "CLIP_NAME", LatestOnly, Priority::LOW),
    spec(SCENE_STATE, "SCENE_STATE", LatestOnly, Priority::HIGH),
    spec(SCENE_NAME, "SCENE_NAME", LatestOnly, Priority::LOW),
    spec(SCENE_COLOR, "SCENE_COLOR", LatestOnly, Priority::NORMAL),
    spec(GRID_CONTENT, "GRID_CONTENT", LatestOnly, Priority::NORMAL),
    spec(MIXER_STATE, "MIXER_STATE", LatestOnly, Priority::HIGH),
    spec(MIXER_VOLUME, "MIXER_VOLUME", LatestOnly, Priority::HIGH),
    spec(MIXER_PAN, "MIXER_PAN", LatestOnly, Priority::HIGH),
    spec(MIXER_MUTE, "MIXER_MUTE", LatestOnly, Priority::HIGH),
    spec(MIXER_SOLO, "MIXER_SOLO", LatestOnly, Priority::HIGH),
    spec(MIXER_ARM, "MIXER_ARM", LatestOnly, Priority::HIGH),
    spec(MIXER_SEND, "MIXER_SEND", LatestOnly, Priority::HIGH),
    spec(TRACK_NAME, "TRACK_NAME", LatestOnly, Priority::LOW),
    spec(TRACK_PLAYING_SLOT, "TRACK_PLAYING_SLOT", LatestOnly, Priority::HIGH),
    spec(TRACK_COLOR, "TRACK_COLOR", LatestOnly, Priority::NORMAL),
    spec(DEVICE_LIST, "DEVICE_LIST", LatestOnly, Priority::LOW),
    spec(DEVICE_SELECT, "DEVICE_SELECT", LatestOnly, Priority::HIGH),
    spec(DEVICE_PARAMS, "DEVICE_PARAMS", LatestOnly, Priority::HIGH),
    spec(PARAM_CHANGE, "PARAM_CHANGE", LatestOnly, Priority::HIGH),
    spec(PARAM_VALUE, "PARAM_VALUE", LatestOnly, Priority::HIGH),
    spec(DEVICE_ENABLE, "DEVICE_ENABLE", LatestOnly, Priority::HIGH),
    spec(NOTE_ON, "NOTE_ON", Accumulate, Priority::CRITICAL),
    spec(NOTE_OFF, "NOTE_OFF", Accumulate, Priority::CRITICAL),
    spec(SCALE_INFO, "SCALE_INFO", LatestOnly, Priority::LOW),
    spec(OCTAVE_INFO, "OCTAVE_INFO", LatestOnly, Priority::LOW),
    spec(DRUM_GRID, "DRUM_GRID", LatestOnly, Priority::NORMAL),
    spec(TRANSPORT, "TRANSPORT", LatestOnly, Priority::CRITICAL),
    spec(TRANSPORT_PLAY, "TRANSPORT_PLAY", LatestOnly, Priority::CRITICAL),
    spec(TRANSPORT_RECORD, "TRANSPORT_RECORD", LatestOnly, Priority::CRITICAL),
    spec(TRANSPORT_LOOP, "TRANSPORT_LOOP", LatestOnly, Priority::HIGH),
    spec(TRANSPORT_TEMPO, "TRANSPORT_TEMPO", LatestOnly, Priority::HIGH),
    spec(TRANSPORT_POSITION, "TRANSPORT_POSITION", LatestOnly, Priority::NORMAL),
    spec(TRANSPORT_METRONOME, "TRANSPORT_METRONOME", LatestOnly, Priority::HIGH),
    spec(HANDSHAKE, "HANDSHAKE", Accumulate, Priority::CRITICAL),
    spec(HANDSHAKE_REPLY, "HANDSHAKE_REPLY", Accumulate, Priority::CRITICAL),
    spec(VIEW_STATE, "VIEW_STATE", LatestOnly, Priority::LOW),
    spec(PING, "PING", Accumulate, Priority::CRITICAL),
    spec(RING_POSITION, "RING_POSITION", LatestOnly, Priority::HIGH),
    spec(RING_NAVIGATE, "RING_NAVIGATE", Accumulate, Priority::HIGH),
    spec(RING_SELECT, "RING_SELECT", LatestOnly, Priority::HIGH),
    spec(TRACK_SELECT, "TRACK_SELECT", LatestOnly, Priority::HIGH),
    spec(SCENE_SELECT, "SCENE_SELECT", LatestOnly, Priority::HIGH),
    spec(SELECTED_TRACK, "SELECTED_TRACK", LatestOnly, Priority::HIGH),
    spec(SELECTED_SCENE, "SELECTED_SCENE", LatestOnly, Priority::HIGH),
    spec(AUTOMATION_RECORD, "AUTOMATION_RECORD", LatestOnly, Priority::HIGH),
    spec(UNDO, "UNDO", Accumulate, Priority::HIGH),
    spec(REDO, "REDO", Accumulate, Priority::HIGH),
];

/// Metadata for a known command.
pub fn command_spec(id: u8) -> Option<&'static CommandSpec> {
    COMMANDS
        .binary_search_by_key(&id, |spec| spec.id)
        .ok()
        .map(|index| &COMMANDS[index])
}

/// Human-readable command name, `"UNKNOWN"` for unlisted ids.
pub fn command_name(id: u8) -> &'static str {
    command_spec(id).map_or("UNKNOWN", |spec| spec.name)
}

/// Coalescing behavior; unlisted commands are treated as visual state.
pub fn coalesce_for(id: u8) -> Coalesce {
    command_spec(id).map_or(Coalesce::LatestOnly, |spec| spec.coalesce)
}

/// Default priority; unlisted commands get [`Priority::LOW`].
pub fn priority_for(id: u8) -> Priority {
    command_spec(id).map_or(Priority::LOW, |spec| spec.priority)
}

/// The range an id belongs to, or `None` for ids above 0x7F.
pub fn range_of(id: u8) -> Option<CommandRange> {
    CommandRange::ALL
        .into_iter()
        .find(|range| range.bounds().contains(&id))
}

/// Handshake-class commands are accepted before the link is marked connected.
pub fn is_handshake(id: u8) -> bool {
    matches!(id, HANDSHAKE | HANDSHAKE_REPLY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(COMMANDS.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn every_command_is_seven_bit_and_in_a_range() {
        for spec in COMMANDS {
            assert!(spec.id <= 0x7F, "{} is not 7-bit", spec.name);
            assert!(range_of(spec.id).is_some(), "{} has no range", spec.name);
        }
    }

    #[test]
    fn ranges_are_contiguous_and_cover_seven_bit_space() {
        let mut next = 0u16;
        for range in CommandRange::ALL {
            let bounds = range.bounds();
            assert_eq!(*bounds.start() as u16, next, "{} starts late", range.name());
            next = *bounds.end() as u16 + 1;
        }
        assert_eq!(next, 0x80);
        assert_eq!(range_of(0x80), None);
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(command_name(MIXER_VOLUME), "MIXER_VOLUME");
        assert_eq!(command_name(0x0F), "UNKNOWN");
        assert_eq!(priority_for(TRANSPORT), Priority::CRITICAL);
        assert_eq!(priority_for(0x0F), Priority::LOW);
        assert_eq!(coalesce_for(NOTE_ON), Coalesce::Accumulate);
        assert_eq!(coalesce_for(0x0F), Coalesce::LatestOnly);
    }

    #[test]
    fn range_lookup() {
        assert_eq!(range_of(CLIP_TRIGGER), Some(CommandRange::Grid));
        assert_eq!(range_of(RING_SELECT), Some(CommandRange::Navigation));
        assert_eq!(range_of(UNDO), Some(CommandRange::Automation));
        assert_eq!(range_of(SWITCH_VIEW), Some(CommandRange::System));
    }

    #[test]
    fn priorities_order_low_ordinal_first() {
        assert!(Priority::CRITICAL < Priority::HIGH);
        assert!(Priority::NORMAL < Priority::LOW);
        assert_eq!(Priority::default(), Priority::LOW);
    }

    #[test]
    fn handshake_class() {
        assert!(is_handshake(HANDSHAKE));
        assert!(is_handshake(HANDSHAKE_REPLY));
        assert!(!is_handshake(PING));
    }
}
