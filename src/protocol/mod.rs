//! Protocol module - record header, command ids, and tail layout.
//!
//! This module defines the byte contract shared by both command families:
//! - 8-byte record header (id + total length)
//! - Dense frame and reliable command identifiers
//! - Offset+count spans for variable-length tails

mod tail;
mod wire_format;

pub(crate) use tail::put_tail;
pub use tail::{Element, Span, TailArray, SPAN_SIZE};
pub use wire_format::{
    align_up, get_fixed_str, put_fixed_str, FrameCmdId, RecordHeader, ReliableCmdId, HEADER_SIZE,
    NUM_FRAME_CMDS, NUM_RELIABLE_CMDS, RECORD_ALIGN, TAIL_ALIGN,
};
