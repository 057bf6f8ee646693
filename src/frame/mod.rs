//! Per-frame command buffer.
//!
//! The producer thread appends records through the [`FrameCommands`]
//! capability table; once it is done with a frame the buffer is handed to the
//! consumer thread, which replays it into a [`FrameBackend`] with
//! [`FrameCommands::run_cmds`]. The owner clears it before the next frame.
//!
//! ```text
//! game thread                         render thread
//! ───────────                         ─────────────
//! cmdbuf.clear()
//! cmdbuf.begin_frame(..)
//! cmdbuf.add_entity_to_scene(..)
//! cmdbuf.render_scene(..)
//! cmdbuf.end_frame()
//!          ── hand over ownership ──►
//!                                     cmdbuf.run_cmds(&mut backend)
//!          ◄── hand back ownership ──
//! ```
//!
//! Encoding never blocks and never fails loudly: a command that does not fit
//! in the remaining capacity, or one that would draw nothing, is dropped and
//! counted in [`DropCounters`].

mod dispatch;
mod encode;
mod record;
mod stats;

use std::sync::Arc;

use bytes::BytesMut;

pub use dispatch::{FrameBackend, RunReport};
pub use record::{
    fixed_len, BeginFrame, DynamicLight, EntityRecord, FrameCommand, LightStyle, PolyRecord,
    RecordIter, RefDefRecord, RenderSceneRecord, StreamFault,
};
pub use stats::DropCounters;

use crate::config::CmdQueueConfig;
use crate::error::Result;
use crate::scene::{Entity, Poly, Rect, RefDef, ShaderHandle, StretchPic, TexSpan};
use crate::state::RendererState;

/// Operations exposed by a frame command buffer.
///
/// Callers only ever go through this table and never see buffer offsets.
pub trait FrameCommands {
    /// Start a new render frame.
    fn begin_frame(&mut self, camera_separation: f32, force_clear: bool, force_vsync: bool);

    /// Finish the current render frame.
    fn end_frame(&mut self);

    /// Draw a 2D picture, rotated by `pic.angle` degrees.
    fn draw_rotated_stretch_pic(&mut self, pic: &StretchPic);

    /// Draw an unrotated 2D picture.
    fn draw_stretch_pic(
        &mut self,
        rect: Rect,
        st: TexSpan,
        color: [f32; 4],
        shader: Option<ShaderHandle>,
    ) {
        self.draw_rotated_stretch_pic(&StretchPic::new(rect, st, color, shader));
    }

    /// Draw a 2D polygon translated by `(x_offset, y_offset)`.
    fn draw_stretch_poly(&mut self, poly: &Poly<'_>, x_offset: f32, y_offset: f32);

    /// Reset the scene being built.
    fn clear_scene(&mut self);

    fn add_entity_to_scene(&mut self, entity: &Entity<'_>);

    fn add_light_to_scene(&mut self, origin: [f32; 3], intensity: f32, color: [f32; 3]);

    fn add_poly_to_scene(&mut self, poly: &Poly<'_>);

    fn add_light_style_to_scene(&mut self, style: i32, color: [f32; 3]);

    /// Render the scene built so far from the view in `refdef`.
    ///
    /// The current registration generations are captured; a record whose
    /// generations are stale by dispatch time is skipped.
    fn render_scene(&mut self, refdef: &RefDef<'_>);

    fn set_scissor(&mut self, rect: Rect);

    fn reset_scissor(&mut self);

    /// Blit the current raw (cinematic) image in RGB form.
    fn draw_stretch_raw(&mut self, rect: Rect, st: TexSpan);

    /// Blit the current raw (cinematic) image in YUV form.
    fn draw_stretch_raw_yuv(&mut self, rect: Rect, st: TexSpan);

    /// Drop all pending records.
    fn clear(&mut self);

    fn set_frame_id(&mut self, frame_id: u32);

    fn frame_id(&self) -> u32;

    /// Replay every pending record into `backend`, in order.
    ///
    /// Pending records are left in place; clearing is a separate step.
    fn run_cmds(&self, backend: &mut dyn FrameBackend) -> RunReport;
}

/// Fixed-capacity buffer of frame command records.
pub struct FrameCmdBuf {
    buf: BytesMut,
    capacity: usize,
    frame_id: u32,
    state: Arc<dyn RendererState>,
    drops: DropCounters,
}

impl FrameCmdBuf {
    /// Create an empty buffer holding at most `capacity` bytes.
    ///
    /// Capacity is capped at `u32::MAX` since record lengths are 32-bit.
    pub fn new(capacity: usize, state: Arc<dyn RendererState>) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            frame_id: 0,
            state,
            drops: DropCounters::new(),
        }
    }

    /// Create a buffer sized by `config`, after validating it.
    pub fn from_config(config: &CmdQueueConfig, state: Arc<dyn RendererState>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.frame_buffer_capacity, state))
    }

    /// Bytes of pending records.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available for new records.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// The encoded records.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Decode pending records without dispatching them.
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter::new(&self.buf)
    }

    /// Counters of commands dropped by this buffer.
    pub fn drop_counters(&self) -> &DropCounters {
        &self.drops
    }
}

impl std::fmt::Debug for FrameCmdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCmdBuf")
            .field("len", &self.buf.len())
            .field("capacity", &self.capacity)
            .field("frame_id", &self.frame_id)
            .field("drops", &self.drops)
            .finish()
    }
}
