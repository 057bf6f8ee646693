//! Frame command encoders.
//!
//! Every encoder sizes its whole record first and either appends all of it
//! or nothing. Records with tails are laid out as: zeroed fixed region, then
//! the tails, then padding; the header and fixed fields are written last,
//! once the tail spans are known.

use bytes::BufMut;

use super::dispatch::{self, FrameBackend, RunReport};
use super::record::{
    BEGIN_FRAME_FIXED, EMPTY_FIXED, ENTITY_FIXED, LIGHT_FIXED, LIGHT_STYLE_FIXED, POLY_FIXED,
    RENDER_SCENE_FIXED, SCISSOR_FIXED, STRETCH_PIC_FIXED, STRETCH_RAW_FIXED,
};
use super::{FrameCmdBuf, FrameCommands};
use crate::protocol::{align_up, put_tail, FrameCmdId, RecordHeader, Span, RECORD_ALIGN};
use crate::scene::{
    BonePose, Entity, ModelHandle, Poly, Rect, RefDef, ShaderHandle, SkinHandle, StretchPic,
    TexSpan,
};

/// Copy sizes for the optional arrays of a poly record.
struct PolyLayout {
    verts: usize,
    elems: usize,
}

impl FrameCmdBuf {
    /// Check that a record of `total` bytes fits, counting a drop if not.
    fn fits(&self, id: FrameCmdId, total: usize) -> bool {
        if total <= self.remaining() {
            return true;
        }
        self.drops.record_overflow();
        tracing::trace!(
            "Dropping {:?}: needs {} bytes, {} left",
            id,
            total,
            self.remaining()
        );
        false
    }

    fn reject(&self, id: FrameCmdId, reason: &str) {
        self.drops.record_degenerate();
        tracing::trace!("Rejecting {:?}: {}", id, reason);
    }

    /// Append a record without tails: header, fixed fields, padding.
    fn put_fixed(&mut self, id: FrameCmdId, fixed: usize, fields: impl FnOnce(&mut &mut [u8])) {
        let total = align_up(fixed, RECORD_ALIGN);
        if !self.fits(id, total) {
            return;
        }
        let start = self.reserve(fixed);
        self.finish(id, start, fixed, total, fields);
    }

    /// Append a zeroed fixed region, returning the record start.
    fn reserve(&mut self, fixed: usize) -> usize {
        let start = self.buf.len();
        self.buf.put_bytes(0, fixed);
        start
    }

    /// Pad the record to `total` bytes and fill in its header and fixed fields.
    fn finish(
        &mut self,
        id: FrameCmdId,
        start: usize,
        fixed: usize,
        total: usize,
        fields: impl FnOnce(&mut &mut [u8]),
    ) {
        let end = start + total;
        debug_assert!(self.buf.len() <= end, "{:?} tails overran the record", id);
        self.buf.put_bytes(0, end - self.buf.len());

        let mut dst: &mut [u8] = &mut self.buf[start..start + fixed];
        dst.put_slice(&RecordHeader::new(id as u32, total as u32).encode());
        fields(&mut dst);
        debug_assert!(dst.is_empty(), "{:?} fixed fields not fully written", id);
    }

    /// Validate a poly and work out how much of each array to copy.
    fn poly_layout(&self, id: FrameCmdId, poly: &Poly<'_>) -> Option<PolyLayout> {
        if poly.num_verts == 0 {
            self.reject(id, "no vertices");
            return None;
        }
        if poly.shader.is_none() {
            self.reject(id, "no shader");
            return None;
        }
        let verts = poly.num_verts as usize;
        let lens = [
            poly.verts.map(<[_]>::len),
            poly.st_coords.map(<[_]>::len),
            poly.normals.map(<[_]>::len),
            poly.colors.map(<[_]>::len),
        ];
        if lens.iter().flatten().any(|&len| len < verts) {
            self.reject(id, "vertex array shorter than vertex count");
            return None;
        }
        Some(PolyLayout {
            verts,
            elems: poly.elems.map_or(0, <[_]>::len),
        })
    }

    fn put_poly(&mut self, id: FrameCmdId, poly: &Poly<'_>, x_offset: f32, y_offset: f32) {
        let Some(layout) = self.poly_layout(id, poly) else {
            return;
        };
        let n = layout.verts;
        let tails = poly.verts.map_or(0, |_| Span::padded_len::<[f32; 4]>(n))
            + poly.st_coords.map_or(0, |_| Span::padded_len::<[f32; 2]>(n))
            + poly.normals.map_or(0, |_| Span::padded_len::<[f32; 4]>(n))
            + poly.colors.map_or(0, |_| Span::padded_len::<[u8; 4]>(n))
            + Span::padded_len::<u16>(layout.elems);
        let total = align_up(POLY_FIXED + tails, RECORD_ALIGN);
        if !self.fits(id, total) {
            return;
        }

        let start = self.reserve(POLY_FIXED);
        let spans = [
            put_tail(&mut self.buf, start, poly.verts.map(|v| &v[..n])),
            put_tail(&mut self.buf, start, poly.st_coords.map(|v| &v[..n])),
            put_tail(&mut self.buf, start, poly.normals.map(|v| &v[..n])),
            put_tail(&mut self.buf, start, poly.colors.map(|v| &v[..n])),
            put_tail(&mut self.buf, start, poly.elems),
        ];
        self.finish(id, start, POLY_FIXED, total, |dst| {
            dst.put_f32_le(x_offset);
            dst.put_f32_le(y_offset);
            dst.put_u32_le(poly.num_verts);
            dst.put_u64_le(ShaderHandle::to_bits(poly.shader));
            dst.put_i32_le(poly.fog_num);
            for span in &spans {
                span.put(dst);
            }
        });
    }

    fn put_stretch_raw(&mut self, id: FrameCmdId, rect: Rect, st: TexSpan) {
        self.put_fixed(id, STRETCH_RAW_FIXED, |dst| {
            rect.put(dst);
            st.put(dst);
        });
    }
}

fn put_vec3(dst: &mut impl BufMut, v: &[f32; 3]) {
    for c in v {
        dst.put_f32_le(*c);
    }
}

impl FrameCommands for FrameCmdBuf {
    fn begin_frame(&mut self, camera_separation: f32, force_clear: bool, force_vsync: bool) {
        self.put_fixed(FrameCmdId::BeginFrame, BEGIN_FRAME_FIXED, |dst| {
            dst.put_f32_le(camera_separation);
            dst.put_u8(force_clear as u8);
            dst.put_u8(force_vsync as u8);
        });
    }

    fn end_frame(&mut self) {
        self.put_fixed(FrameCmdId::EndFrame, EMPTY_FIXED, |_| {});
    }

    fn draw_rotated_stretch_pic(&mut self, pic: &StretchPic) {
        self.put_fixed(FrameCmdId::DrawStretchPic, STRETCH_PIC_FIXED, |dst| {
            pic.rect.put(dst);
            pic.st.put(dst);
            dst.put_f32_le(pic.angle);
            for c in &pic.color {
                dst.put_f32_le(*c);
            }
            dst.put_u64_le(ShaderHandle::to_bits(pic.shader));
        });
    }

    fn draw_stretch_poly(&mut self, poly: &Poly<'_>, x_offset: f32, y_offset: f32) {
        self.put_poly(FrameCmdId::DrawStretchPoly, poly, x_offset, y_offset);
    }

    fn clear_scene(&mut self) {
        self.put_fixed(FrameCmdId::ClearScene, EMPTY_FIXED, |_| {});
    }

    fn add_entity_to_scene(&mut self, entity: &Entity<'_>) {
        let id = FrameCmdId::AddEntityToScene;
        let bones = match entity.model {
            Some(model) if entity.bone_poses.is_some() || entity.old_bone_poses.is_some() => {
                self.state.bone_count(model) as usize
            }
            _ => 0,
        };
        let short = [entity.bone_poses, entity.old_bone_poses]
            .iter()
            .flatten()
            .any(|poses| poses.len() < bones);
        if short {
            self.reject(id, "bone pose array shorter than bone count");
            return;
        }

        let bone_poses = entity.bone_poses.filter(|_| bones > 0).map(|p| &p[..bones]);
        let old_bone_poses = entity.old_bone_poses.filter(|_| bones > 0).map(|p| &p[..bones]);
        let tails = bone_poses.map_or(0, |_| Span::padded_len::<BonePose>(bones))
            + old_bone_poses.map_or(0, |_| Span::padded_len::<BonePose>(bones));
        let total = align_up(ENTITY_FIXED + tails, RECORD_ALIGN);
        if !self.fits(id, total) {
            return;
        }

        let start = self.reserve(ENTITY_FIXED);
        let bone_span = put_tail(&mut self.buf, start, bone_poses);
        let old_bone_span = put_tail(&mut self.buf, start, old_bone_poses);
        self.finish(id, start, ENTITY_FIXED, total, |dst| {
            dst.put_u32_le(entity.kind as u32);
            dst.put_u32_le(entity.render_fx);
            dst.put_u64_le(ModelHandle::to_bits(entity.model));
            dst.put_u64_le(ShaderHandle::to_bits(entity.custom_shader));
            dst.put_u64_le(SkinHandle::to_bits(entity.custom_skin));
            put_vec3(dst, &entity.origin);
            put_vec3(dst, &entity.light_origin);
            for row in &entity.axis {
                put_vec3(dst, row);
            }
            dst.put_f32_le(entity.scale);
            dst.put_f32_le(entity.radius);
            dst.put_f32_le(entity.rotation);
            dst.put_i32_le(entity.frame);
            dst.put_i32_le(entity.old_frame);
            dst.put_f32_le(entity.back_lerp);
            dst.put_slice(&entity.shader_rgba);
            dst.put_i64_le(entity.shader_time);
            dst.put_u32_le(bones as u32);
            bone_span.put(dst);
            old_bone_span.put(dst);
        });
    }

    fn add_light_to_scene(&mut self, origin: [f32; 3], intensity: f32, color: [f32; 3]) {
        self.put_fixed(FrameCmdId::AddLightToScene, LIGHT_FIXED, |dst| {
            put_vec3(dst, &origin);
            dst.put_f32_le(intensity);
            put_vec3(dst, &color);
        });
    }

    fn add_poly_to_scene(&mut self, poly: &Poly<'_>) {
        self.put_poly(FrameCmdId::AddPolyToScene, poly, 0.0, 0.0);
    }

    fn add_light_style_to_scene(&mut self, style: i32, color: [f32; 3]) {
        self.put_fixed(FrameCmdId::AddLightStyleToScene, LIGHT_STYLE_FIXED, |dst| {
            dst.put_i32_le(style);
            put_vec3(dst, &color);
        });
    }

    fn render_scene(&mut self, refdef: &RefDef<'_>) {
        let id = FrameCmdId::RenderScene;
        let area_bytes = match (refdef.area_bits, self.state.world_area_count()) {
            (Some(bits), Some(areas)) => {
                let needed = (areas as usize + 7) / 8;
                if bits.len() < needed {
                    self.reject(id, "area bitset shorter than world area count");
                    return;
                }
                Some(&bits[..needed])
            }
            _ => None,
        };
        let tails = Span::padded_len::<u8>(area_bytes.map_or(0, <[u8]>::len));
        let total = align_up(RENDER_SCENE_FIXED + tails, RECORD_ALIGN);
        if !self.fits(id, total) {
            return;
        }

        let generations = self.state.generations();
        let start = self.reserve(RENDER_SCENE_FIXED);
        let area_span = put_tail(&mut self.buf, start, area_bytes);
        self.finish(id, start, RENDER_SCENE_FIXED, total, |dst| {
            dst.put_u32_le(generations.registration);
            dst.put_u32_le(generations.world_model);
            refdef.viewport.put(dst);
            dst.put_f32_le(refdef.fov_x);
            dst.put_f32_le(refdef.fov_y);
            put_vec3(dst, &refdef.view_origin);
            for row in &refdef.view_axis {
                put_vec3(dst, row);
            }
            for c in &refdef.blend {
                dst.put_f32_le(*c);
            }
            dst.put_u32_le(refdef.time);
            dst.put_u32_le(refdef.flags);
            refdef.scissor.put(dst);
            dst.put_u64_le(ShaderHandle::to_bits(refdef.color_correction));
            area_span.put(dst);
        });
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.put_fixed(FrameCmdId::SetScissor, SCISSOR_FIXED, |dst| rect.put(dst));
    }

    fn reset_scissor(&mut self) {
        self.put_fixed(FrameCmdId::ResetScissor, EMPTY_FIXED, |_| {});
    }

    fn draw_stretch_raw(&mut self, rect: Rect, st: TexSpan) {
        self.put_stretch_raw(FrameCmdId::DrawStretchRaw, rect, st);
    }

    fn draw_stretch_raw_yuv(&mut self, rect: Rect, st: TexSpan) {
        self.put_stretch_raw(FrameCmdId::DrawStretchRawYuv, rect, st);
    }

    fn clear(&mut self) {
        self.buf.clear();
    }

    fn set_frame_id(&mut self, frame_id: u32) {
        self.frame_id = frame_id;
    }

    fn frame_id(&self) -> u32 {
        self.frame_id
    }

    fn run_cmds(&self, backend: &mut dyn FrameBackend) -> RunReport {
        dispatch::run_cmds(&self.buf, backend, self.state.as_ref())
    }
}
