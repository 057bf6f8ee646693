//! Record header and command identifiers.
//!
//! Every record, in both command families, starts with the same 8-byte header:
//! ```text
//! ┌──────────┬──────────┬───────────────────────────────┐
//! │ Cmd ID   │ Length   │ Fixed fields, then tails ...  │
//! │ 4 bytes  │ 4 bytes  │                               │
//! │ uint32 LE│ uint32 LE│                               │
//! └──────────┴──────────┴───────────────────────────────┘
//! ```
//!
//! `Length` is the byte span from the start of this record to the start of the
//! next one, padding included. It is never 0 in a well-formed stream.
//!
//! All multi-byte values are Little Endian.

use bytes::{Buf, BufMut};

use crate::error::{CmdQueueError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Every frame record starts on a multiple of the host word size.
pub const RECORD_ALIGN: usize = std::mem::size_of::<usize>();

/// Variable tails are padded to this alignment.
pub const TAIL_ALIGN: usize = 4;

/// Number of frame command ids (dense, starting at 0).
pub const NUM_FRAME_CMDS: u32 = 14;

/// Number of reliable command ids (dense, starting at 0).
pub const NUM_RELIABLE_CMDS: u32 = 13;

/// Round `len` up to the next multiple of `align` (a power of two).
#[inline]
pub const fn align_up(len: usize, align: usize) -> usize {
    (len + align - 1) & !(align - 1)
}

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Command identifier, scoped to its family.
    pub id: u32,
    /// Total record length in bytes, including header and padding.
    pub length: u32,
}

impl RecordHeader {
    /// Create a new header.
    pub fn new(id: u32, length: u32) -> Self {
        Self { id, length }
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use refcmd::protocol::RecordHeader;
    ///
    /// let header = RecordHeader::new(2, 72);
    /// assert_eq!(header.encode(), [2, 0, 0, 0, 72, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into the first 8 bytes of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        let mut dst = &mut buf[..HEADER_SIZE];
        dst.put_u32_le(self.id);
        dst.put_u32_le(self.length);
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let mut src = &buf[..HEADER_SIZE];
        Some(Self {
            id: src.get_u32_le(),
            length: src.get_u32_le(),
        })
    }
}

/// Frame command identifiers. Values index the dispatch table directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FrameCmdId {
    BeginFrame = 0,
    EndFrame = 1,
    DrawStretchPic = 2,
    DrawStretchPoly = 3,
    ClearScene = 4,
    AddEntityToScene = 5,
    AddLightToScene = 6,
    AddPolyToScene = 7,
    AddLightStyleToScene = 8,
    RenderScene = 9,
    SetScissor = 10,
    ResetScissor = 11,
    DrawStretchRaw = 12,
    DrawStretchRawYuv = 13,
}

impl FrameCmdId {
    /// All ids in dispatch order.
    pub const ALL: [FrameCmdId; NUM_FRAME_CMDS as usize] = [
        FrameCmdId::BeginFrame,
        FrameCmdId::EndFrame,
        FrameCmdId::DrawStretchPic,
        FrameCmdId::DrawStretchPoly,
        FrameCmdId::ClearScene,
        FrameCmdId::AddEntityToScene,
        FrameCmdId::AddLightToScene,
        FrameCmdId::AddPolyToScene,
        FrameCmdId::AddLightStyleToScene,
        FrameCmdId::RenderScene,
        FrameCmdId::SetScissor,
        FrameCmdId::ResetScissor,
        FrameCmdId::DrawStretchRaw,
        FrameCmdId::DrawStretchRawYuv,
    ];

    /// Map a raw id onto the dense range, `None` if out of range.
    #[inline]
    pub fn from_u32(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Whether records of this kind carry a variable tail.
    #[inline]
    pub fn has_tail(self) -> bool {
        matches!(
            self,
            FrameCmdId::DrawStretchPoly
                | FrameCmdId::AddEntityToScene
                | FrameCmdId::AddPolyToScene
                | FrameCmdId::RenderScene
        )
    }
}

/// Reliable command identifiers. Disjoint from [`FrameCmdId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ReliableCmdId {
    Init = 0,
    Shutdown = 1,
    SurfaceChange = 2,
    ScreenShot = 3,
    EnvShot = 4,
    BeginRegistration = 5,
    EndRegistration = 6,
    SetCustomColor = 7,
    SetWallFloorColors = 8,
    SetDrawBuffer = 9,
    SetTextureMode = 10,
    SetTextureFilter = 11,
    SetGamma = 12,
}

impl ReliableCmdId {
    /// All ids in dispatch order.
    pub const ALL: [ReliableCmdId; NUM_RELIABLE_CMDS as usize] = [
        ReliableCmdId::Init,
        ReliableCmdId::Shutdown,
        ReliableCmdId::SurfaceChange,
        ReliableCmdId::ScreenShot,
        ReliableCmdId::EnvShot,
        ReliableCmdId::BeginRegistration,
        ReliableCmdId::EndRegistration,
        ReliableCmdId::SetCustomColor,
        ReliableCmdId::SetWallFloorColors,
        ReliableCmdId::SetDrawBuffer,
        ReliableCmdId::SetTextureMode,
        ReliableCmdId::SetTextureFilter,
        ReliableCmdId::SetGamma,
    ];

    /// Map a raw id onto the dense range, `None` if out of range.
    #[inline]
    pub fn from_u32(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }
}

/// Write `s` into a fixed-width, NUL-padded field of `width` bytes.
///
/// At most `width - 1` bytes are kept, cut back to a UTF-8 character
/// boundary, so the field always ends in at least one NUL.
pub fn put_fixed_str(dst: &mut impl BufMut, s: &str, width: usize) {
    let mut end = s.len().min(width.saturating_sub(1));
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    dst.put_slice(&s.as_bytes()[..end]);
    dst.put_bytes(0, width - end);
}

/// Read a fixed-width, NUL-padded string field of `width` bytes.
///
/// Advances `src` by `width` bytes.
pub fn get_fixed_str<'a>(src: &mut &'a [u8], width: usize) -> Result<&'a str> {
    if src.len() < width {
        return Err(CmdQueueError::Protocol(format!(
            "string field needs {} bytes, {} left",
            width,
            src.len()
        )));
    }
    let (field, rest) = src.split_at(width);
    *src = rest;
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    std::str::from_utf8(&field[..end])
        .map_err(|e| CmdQueueError::Protocol(format!("string field is not UTF-8: {}", e)))
}
