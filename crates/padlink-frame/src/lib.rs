//! 7-bit-clean SysEx framing for the padlink controller protocol.
//!
//! Every message travels as one frame:
//! - A 4-byte start marker (`F0 7F 00 7F`) for stream synchronization
//! - A command id and a wrapping sequence number, both 7-bit
//! - A 14-bit payload length split into two 7-bit bytes
//! - A 7-bit XOR checksum and the `F7` end marker
//!
//! [`value`] packs wide values into payload bytes and [`command`] carries
//! the static command table.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod value;

pub use codec::{
    checksum, decode, encode_frame, hex_dump, split_frame, Frame, FrameConfig, FrameEncoder,
    DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE, MIN_FRAME_SIZE,
};
pub use command::{
    coalesce_for, command_name, command_spec, is_handshake, priority_for, range_of, Coalesce,
    CommandRange, CommandSpec, Priority,
};
pub use error::{EncodeRejected, FrameConfigError, FrameError, Result};
pub use reader::FrameReader;
pub use value::Rgb;
