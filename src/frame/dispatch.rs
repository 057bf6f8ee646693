//! Frame command replay.

use crate::scene::{Rect, StretchPic, StretchRaw};
use crate::state::RendererState;

use super::record::{
    DynamicLight, EntityRecord, FrameCommand, LightStyle, PolyRecord, RecordIter, RefDefRecord,
    StreamFault,
};

/// Rendering backend receiving replayed frame commands.
///
/// Array arguments borrow the command buffer and are only valid for the
/// duration of the call.
pub trait FrameBackend {
    fn begin_frame(&mut self, camera_separation: f32, force_clear: bool, force_vsync: bool);

    fn end_frame(&mut self);

    fn draw_rotated_stretch_pic(&mut self, pic: &StretchPic);

    fn draw_stretch_poly(&mut self, poly: &PolyRecord<'_>, x_offset: f32, y_offset: f32);

    fn clear_scene(&mut self);

    fn add_entity_to_scene(&mut self, entity: &EntityRecord<'_>);

    fn add_light_to_scene(&mut self, light: &DynamicLight);

    fn add_poly_to_scene(&mut self, poly: &PolyRecord<'_>);

    fn add_light_style_to_scene(&mut self, style: &LightStyle);

    fn render_scene(&mut self, refdef: &RefDefRecord<'_>);

    fn set_scissor(&mut self, rect: Rect);

    fn reset_scissor(&mut self);

    fn draw_stretch_raw(&mut self, raw: &StretchRaw);

    fn draw_stretch_raw_yuv(&mut self, raw: &StretchRaw);
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records consumed, stale ones included.
    pub commands: usize,
    /// Bytes consumed; equals the buffer length unless the pass aborted.
    pub consumed: usize,
    /// Render-scene records skipped because registration moved on.
    pub stale_skipped: usize,
    /// Why the pass stopped early, if it did.
    pub aborted: Option<StreamFault>,
}

impl RunReport {
    /// Whether every byte of the buffer was replayed.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Replay every record in `bytes` into `backend`.
///
/// Stops at the first corrupt record; everything dispatched before it stays
/// applied.
pub(crate) fn run_cmds(
    bytes: &[u8],
    backend: &mut dyn FrameBackend,
    state: &dyn RendererState,
) -> RunReport {
    let mut report = RunReport::default();
    let mut records = RecordIter::new(bytes);

    for (cmd, len) in records.by_ref() {
        report.commands += 1;
        report.consumed += len;

        match cmd {
            FrameCommand::BeginFrame(frame) => backend.begin_frame(
                frame.camera_separation,
                frame.force_clear,
                frame.force_vsync,
            ),
            FrameCommand::EndFrame => backend.end_frame(),
            FrameCommand::DrawStretchPic(pic) => backend.draw_rotated_stretch_pic(&pic),
            FrameCommand::DrawStretchPoly {
                poly,
                x_offset,
                y_offset,
            } => backend.draw_stretch_poly(&poly, x_offset, y_offset),
            FrameCommand::ClearScene => backend.clear_scene(),
            FrameCommand::AddEntityToScene(entity) => backend.add_entity_to_scene(&entity),
            FrameCommand::AddLightToScene(light) => backend.add_light_to_scene(&light),
            FrameCommand::AddPolyToScene(poly) => backend.add_poly_to_scene(&poly),
            FrameCommand::AddLightStyleToScene(style) => backend.add_light_style_to_scene(&style),
            FrameCommand::RenderScene(scene) => {
                let current = state.generations();
                if scene.is_stale(current) {
                    report.stale_skipped += 1;
                    tracing::debug!(
                        "Skipping stale render scene (encoded {:?}, current {:?})",
                        scene.generations,
                        current
                    );
                } else {
                    backend.render_scene(&scene.refdef);
                }
            }
            FrameCommand::SetScissor(rect) => backend.set_scissor(rect),
            FrameCommand::ResetScissor => backend.reset_scissor(),
            FrameCommand::DrawStretchRaw(raw) => backend.draw_stretch_raw(&raw),
            FrameCommand::DrawStretchRawYuv(raw) => backend.draw_stretch_raw_yuv(&raw),
        }
    }

    if let Some(fault) = records.fault() {
        tracing::debug!(
            "Aborting frame replay after {} commands: {:?}",
            report.commands,
            fault
        );
        report.aborted = Some(fault);
    }
    report
}
