//! Reliable command records.
//!
//! Every reliable record has a fixed size per command kind: the common
//! [`RecordHeader`] followed by the kind's fields. Strings live in
//! fixed-width NUL-padded fields and are truncated to fit on encode.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CmdQueueError, Result};
use crate::protocol::{get_fixed_str, put_fixed_str, RecordHeader, ReliableCmdId, HEADER_SIZE};
use crate::scene::Rect;

/// Width of the screenshot directory field.
pub const PATH_WIDTH: usize = 512;
/// Width of the screenshot file name field.
pub const NAME_WIDTH: usize = 512;
/// Width of the screenshot name format field.
pub const FMT_WIDTH: usize = 64;
/// Width of the draw buffer name field.
pub const DRAW_BUFFER_WIDTH: usize = 32;
/// Width of the texture mode name field.
pub const TEXTURE_MODE_WIDTH: usize = 32;

const SCREEN_SHOT_SIZE: usize =
    HEADER_SIZE + 4 + 1 + 1 + 2 + Rect::ENCODED_SIZE + FMT_WIDTH + PATH_WIDTH + NAME_WIDTH;

/// Screen or environment capture parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenShot<'a> {
    /// Directory the capture is written to.
    pub path: &'a str,
    pub name: &'a str,
    /// Format string for generated file names, empty for none.
    pub fmt: &'a str,
    pub rect: Rect,
    /// Cube face size for environment captures, 0 otherwise.
    pub pixels: u32,
    /// Suppress the console notification.
    pub silent: bool,
    /// Capture in the media (video recording) image format.
    pub media: bool,
}

/// One reliable command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReliableCommand<'a> {
    Init,
    Shutdown,
    SurfaceChange,
    ScreenShot(ScreenShot<'a>),
    EnvShot(ScreenShot<'a>),
    BeginRegistration,
    EndRegistration,
    SetCustomColor { num: i32, r: i32, g: i32, b: i32 },
    SetWallFloorColors { wall: [f32; 3], floor: [f32; 3] },
    SetDrawBuffer(&'a str),
    SetTextureMode(&'a str),
    SetTextureFilter(i32),
    SetGamma(f32),
}

impl<'a> ReliableCommand<'a> {
    pub fn id(&self) -> ReliableCmdId {
        match self {
            ReliableCommand::Init => ReliableCmdId::Init,
            ReliableCommand::Shutdown => ReliableCmdId::Shutdown,
            ReliableCommand::SurfaceChange => ReliableCmdId::SurfaceChange,
            ReliableCommand::ScreenShot(_) => ReliableCmdId::ScreenShot,
            ReliableCommand::EnvShot(_) => ReliableCmdId::EnvShot,
            ReliableCommand::BeginRegistration => ReliableCmdId::BeginRegistration,
            ReliableCommand::EndRegistration => ReliableCmdId::EndRegistration,
            ReliableCommand::SetCustomColor { .. } => ReliableCmdId::SetCustomColor,
            ReliableCommand::SetWallFloorColors { .. } => ReliableCmdId::SetWallFloorColors,
            ReliableCommand::SetDrawBuffer(_) => ReliableCmdId::SetDrawBuffer,
            ReliableCommand::SetTextureMode(_) => ReliableCmdId::SetTextureMode,
            ReliableCommand::SetTextureFilter(_) => ReliableCmdId::SetTextureFilter,
            ReliableCommand::SetGamma(_) => ReliableCmdId::SetGamma,
        }
    }

    /// Encoded size of a record of kind `id`.
    pub fn record_size(id: ReliableCmdId) -> usize {
        HEADER_SIZE
            + match id {
                ReliableCmdId::Init
                | ReliableCmdId::Shutdown
                | ReliableCmdId::SurfaceChange
                | ReliableCmdId::BeginRegistration
                | ReliableCmdId::EndRegistration => 0,
                ReliableCmdId::ScreenShot | ReliableCmdId::EnvShot => {
                    SCREEN_SHOT_SIZE - HEADER_SIZE
                }
                ReliableCmdId::SetCustomColor => 16,
                ReliableCmdId::SetWallFloorColors => 24,
                ReliableCmdId::SetDrawBuffer => DRAW_BUFFER_WIDTH,
                ReliableCmdId::SetTextureMode => TEXTURE_MODE_WIDTH,
                ReliableCmdId::SetTextureFilter | ReliableCmdId::SetGamma => 4,
            }
    }

    /// Build the complete record.
    pub fn encode(&self) -> Bytes {
        let id = self.id();
        let size = Self::record_size(id);
        let mut buf = BytesMut::with_capacity(size);
        buf.put_slice(&RecordHeader::new(id as u32, size as u32).encode());

        match self {
            ReliableCommand::Init
            | ReliableCommand::Shutdown
            | ReliableCommand::SurfaceChange
            | ReliableCommand::BeginRegistration
            | ReliableCommand::EndRegistration => {}
            ReliableCommand::ScreenShot(shot) | ReliableCommand::EnvShot(shot) => {
                buf.put_u32_le(shot.pixels);
                buf.put_u8(shot.silent as u8);
                buf.put_u8(shot.media as u8);
                buf.put_bytes(0, 2);
                shot.rect.put(&mut buf);
                put_fixed_str(&mut buf, shot.fmt, FMT_WIDTH);
                put_fixed_str(&mut buf, shot.path, PATH_WIDTH);
                put_fixed_str(&mut buf, shot.name, NAME_WIDTH);
            }
            ReliableCommand::SetCustomColor { num, r, g, b } => {
                buf.put_i32_le(*num);
                buf.put_i32_le(*r);
                buf.put_i32_le(*g);
                buf.put_i32_le(*b);
            }
            ReliableCommand::SetWallFloorColors { wall, floor } => {
                for c in wall.iter().chain(floor) {
                    buf.put_f32_le(*c);
                }
            }
            ReliableCommand::SetDrawBuffer(name) => {
                put_fixed_str(&mut buf, name, DRAW_BUFFER_WIDTH)
            }
            ReliableCommand::SetTextureMode(mode) => {
                put_fixed_str(&mut buf, mode, TEXTURE_MODE_WIDTH)
            }
            ReliableCommand::SetTextureFilter(filter) => buf.put_i32_le(*filter),
            ReliableCommand::SetGamma(gamma) => buf.put_f32_le(*gamma),
        }

        debug_assert_eq!(buf.len(), size, "{:?} record size mismatch", id);
        buf.freeze()
    }

    /// Decode one complete record.
    pub fn decode(record: &'a [u8]) -> Result<Self> {
        let header = RecordHeader::decode(record).ok_or_else(|| {
            CmdQueueError::Protocol(format!("reliable record truncated: {} bytes", record.len()))
        })?;
        let id = ReliableCmdId::from_u32(header.id)
            .ok_or(CmdQueueError::UnknownCommand(header.id))?;
        let size = Self::record_size(id);
        if header.length as usize != size || record.len() != size {
            return Err(CmdQueueError::Protocol(format!(
                "{:?} record is {} bytes (header says {}), expected {}",
                id,
                record.len(),
                header.length,
                size
            )));
        }

        let mut src = &record[HEADER_SIZE..];
        let cmd = match id {
            ReliableCmdId::Init => ReliableCommand::Init,
            ReliableCmdId::Shutdown => ReliableCommand::Shutdown,
            ReliableCmdId::SurfaceChange => ReliableCommand::SurfaceChange,
            ReliableCmdId::ScreenShot => ReliableCommand::ScreenShot(get_screen_shot(&mut src)?),
            ReliableCmdId::EnvShot => ReliableCommand::EnvShot(get_screen_shot(&mut src)?),
            ReliableCmdId::BeginRegistration => ReliableCommand::BeginRegistration,
            ReliableCmdId::EndRegistration => ReliableCommand::EndRegistration,
            ReliableCmdId::SetCustomColor => ReliableCommand::SetCustomColor {
                num: src.get_i32_le(),
                r: src.get_i32_le(),
                g: src.get_i32_le(),
                b: src.get_i32_le(),
            },
            ReliableCmdId::SetWallFloorColors => ReliableCommand::SetWallFloorColors {
                wall: [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()],
                floor: [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()],
            },
            ReliableCmdId::SetDrawBuffer => {
                ReliableCommand::SetDrawBuffer(get_fixed_str(&mut src, DRAW_BUFFER_WIDTH)?)
            }
            ReliableCmdId::SetTextureMode => {
                ReliableCommand::SetTextureMode(get_fixed_str(&mut src, TEXTURE_MODE_WIDTH)?)
            }
            ReliableCmdId::SetTextureFilter => ReliableCommand::SetTextureFilter(src.get_i32_le()),
            ReliableCmdId::SetGamma => ReliableCommand::SetGamma(src.get_f32_le()),
        };
        Ok(cmd)
    }
}

fn get_screen_shot<'a>(src: &mut &'a [u8]) -> Result<ScreenShot<'a>> {
    let pixels = src.get_u32_le();
    let silent = src.get_u8() != 0;
    let media = src.get_u8() != 0;
    src.advance(2);
    let rect = Rect::get(src);
    let fmt = get_fixed_str(src, FMT_WIDTH)?;
    let path = get_fixed_str(src, PATH_WIDTH)?;
    let name = get_fixed_str(src, NAME_WIDTH)?;
    Ok(ScreenShot {
        path,
        name,
        fmt,
        rect,
        pixels,
        silent,
        media,
    })
}
