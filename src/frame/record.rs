//! Frame command record layouts and decoding.
//!
//! Each record is a [`RecordHeader`] followed by the command's fixed fields
//! and, for poly/entity/render-scene records, variable tails addressed by
//! [`Span`]s. Fixed-only records are exactly `align_up(FIXED, RECORD_ALIGN)`
//! bytes long; variable records report their full length in the header.
//!
//! Decoding borrows from the buffer and never allocates.

use bytes::Buf;

use crate::protocol::{
    align_up, FrameCmdId, RecordHeader, Span, TailArray, HEADER_SIZE, RECORD_ALIGN, SPAN_SIZE,
};
use crate::scene::{
    rdflags, BonePose, EntityType, ModelHandle, Rect, ShaderHandle, SkinHandle, StretchPic,
    StretchRaw, TexSpan,
};
use crate::state::Generations;

pub(crate) const BEGIN_FRAME_FIXED: usize = HEADER_SIZE + 4 + 1 + 1;
pub(crate) const EMPTY_FIXED: usize = HEADER_SIZE;
pub(crate) const STRETCH_PIC_FIXED: usize =
    HEADER_SIZE + Rect::ENCODED_SIZE + TexSpan::ENCODED_SIZE + 4 + 16 + 8;
pub(crate) const POLY_FIXED: usize = HEADER_SIZE + 4 + 4 + 4 + 8 + 4 + 5 * SPAN_SIZE;
pub(crate) const ENTITY_FIXED: usize = HEADER_SIZE
    + 4 // kind
    + 4 // render_fx
    + 3 * 8 // model, custom shader, custom skin
    + 2 * 12 // origin, light origin
    + 36 // axis
    + 6 * 4 // scale, radius, rotation, frame, old frame, back lerp
    + 4 // shader rgba
    + 8 // shader time
    + 4 // bone count
    + 2 * SPAN_SIZE;
pub(crate) const LIGHT_FIXED: usize = HEADER_SIZE + 12 + 4 + 12;
pub(crate) const LIGHT_STYLE_FIXED: usize = HEADER_SIZE + 4 + 12;
pub(crate) const RENDER_SCENE_FIXED: usize = HEADER_SIZE
    + 4 // registration generation
    + 4 // world model generation
    + Rect::ENCODED_SIZE // viewport
    + 8 // fov
    + 12 // view origin
    + 36 // view axis
    + 16 // blend
    + 4 // time
    + 4 // flags
    + Rect::ENCODED_SIZE // scissor
    + 8 // color correction
    + SPAN_SIZE;
pub(crate) const SCISSOR_FIXED: usize = HEADER_SIZE + Rect::ENCODED_SIZE;
pub(crate) const STRETCH_RAW_FIXED: usize =
    HEADER_SIZE + Rect::ENCODED_SIZE + TexSpan::ENCODED_SIZE;

/// Size of the fixed part (header included) of a record kind.
pub fn fixed_len(id: FrameCmdId) -> usize {
    match id {
        FrameCmdId::BeginFrame => BEGIN_FRAME_FIXED,
        FrameCmdId::EndFrame | FrameCmdId::ClearScene | FrameCmdId::ResetScissor => EMPTY_FIXED,
        FrameCmdId::DrawStretchPic => STRETCH_PIC_FIXED,
        FrameCmdId::DrawStretchPoly | FrameCmdId::AddPolyToScene => POLY_FIXED,
        FrameCmdId::AddEntityToScene => ENTITY_FIXED,
        FrameCmdId::AddLightToScene => LIGHT_FIXED,
        FrameCmdId::AddLightStyleToScene => LIGHT_STYLE_FIXED,
        FrameCmdId::RenderScene => RENDER_SCENE_FIXED,
        FrameCmdId::SetScissor => SCISSOR_FIXED,
        FrameCmdId::DrawStretchRaw | FrameCmdId::DrawStretchRawYuv => STRETCH_RAW_FIXED,
    }
}

/// Why a dispatch pass stopped before the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    /// Fewer bytes left than a record header.
    Truncated { offset: usize },
    /// Identifier outside the dense frame command range.
    UnknownId { offset: usize, id: u32 },
    /// Record reports a length of 0.
    ZeroLength { offset: usize, id: FrameCmdId },
    /// Length or tail spans inconsistent with the record kind.
    Malformed { offset: usize, id: FrameCmdId },
}

/// Begin-frame parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeginFrame {
    pub camera_separation: f32,
    pub force_clear: bool,
    pub force_vsync: bool,
}

/// A dynamic light added to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLight {
    pub origin: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
}

/// A light style (animated lightmap intensity) update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightStyle {
    pub style: i32,
    pub color: [f32; 3],
}

/// Decoded polygon whose arrays live in the command buffer.
#[derive(Debug, Clone, Copy)]
pub struct PolyRecord<'a> {
    pub num_verts: u32,
    pub verts: Option<TailArray<'a, [f32; 4]>>,
    pub st_coords: Option<TailArray<'a, [f32; 2]>>,
    pub normals: Option<TailArray<'a, [f32; 4]>>,
    pub colors: Option<TailArray<'a, [u8; 4]>>,
    pub elems: Option<TailArray<'a, u16>>,
    pub shader: Option<ShaderHandle>,
    pub fog_num: i32,
}

/// Decoded scene entity whose bone poses live in the command buffer.
#[derive(Debug, Clone, Copy)]
pub struct EntityRecord<'a> {
    pub kind: EntityType,
    pub render_fx: u32,
    pub model: Option<ModelHandle>,
    pub custom_shader: Option<ShaderHandle>,
    pub custom_skin: Option<SkinHandle>,
    pub origin: [f32; 3],
    pub light_origin: [f32; 3],
    pub axis: [[f32; 3]; 3],
    pub scale: f32,
    pub radius: f32,
    pub rotation: f32,
    pub frame: i32,
    pub old_frame: i32,
    pub back_lerp: f32,
    pub shader_rgba: [u8; 4],
    pub shader_time: i64,
    /// Model bone count at encode time.
    pub num_bone_poses: u32,
    pub bone_poses: Option<TailArray<'a, BonePose>>,
    pub old_bone_poses: Option<TailArray<'a, BonePose>>,
}

/// Decoded scene view definition.
#[derive(Debug, Clone, Copy)]
pub struct RefDefRecord<'a> {
    pub viewport: Rect,
    pub fov_x: f32,
    pub fov_y: f32,
    pub view_origin: [f32; 3],
    pub view_axis: [[f32; 3]; 3],
    pub blend: [f32; 4],
    pub time: u32,
    pub flags: u32,
    pub scissor: Rect,
    pub color_correction: Option<ShaderHandle>,
    pub area_bits: Option<TailArray<'a, u8>>,
}

/// Decoded render-scene request plus the generations it was issued under.
#[derive(Debug, Clone, Copy)]
pub struct RenderSceneRecord<'a> {
    pub generations: Generations,
    pub refdef: RefDefRecord<'a>,
}

impl RenderSceneRecord<'_> {
    /// Whether assets were re-registered (or the world replaced) since encode.
    ///
    /// The world-model generation only matters for scenes that draw the world.
    pub fn is_stale(&self, current: Generations) -> bool {
        if self.generations.registration != current.registration {
            return true;
        }
        !rdflags::has_flag(self.refdef.flags, rdflags::NO_WORLD_MODEL)
            && self.generations.world_model != current.world_model
    }
}

/// One decoded frame command.
#[derive(Debug, Clone, Copy)]
pub enum FrameCommand<'a> {
    BeginFrame(BeginFrame),
    EndFrame,
    DrawStretchPic(StretchPic),
    DrawStretchPoly {
        poly: PolyRecord<'a>,
        x_offset: f32,
        y_offset: f32,
    },
    ClearScene,
    AddEntityToScene(EntityRecord<'a>),
    AddLightToScene(DynamicLight),
    AddPolyToScene(PolyRecord<'a>),
    AddLightStyleToScene(LightStyle),
    RenderScene(RenderSceneRecord<'a>),
    SetScissor(Rect),
    ResetScissor,
    DrawStretchRaw(StretchRaw),
    DrawStretchRawYuv(StretchRaw),
}

impl<'a> FrameCommand<'a> {
    /// The command's identifier.
    pub fn id(&self) -> FrameCmdId {
        match self {
            FrameCommand::BeginFrame(_) => FrameCmdId::BeginFrame,
            FrameCommand::EndFrame => FrameCmdId::EndFrame,
            FrameCommand::DrawStretchPic(_) => FrameCmdId::DrawStretchPic,
            FrameCommand::DrawStretchPoly { .. } => FrameCmdId::DrawStretchPoly,
            FrameCommand::ClearScene => FrameCmdId::ClearScene,
            FrameCommand::AddEntityToScene(_) => FrameCmdId::AddEntityToScene,
            FrameCommand::AddLightToScene(_) => FrameCmdId::AddLightToScene,
            FrameCommand::AddPolyToScene(_) => FrameCmdId::AddPolyToScene,
            FrameCommand::AddLightStyleToScene(_) => FrameCmdId::AddLightStyleToScene,
            FrameCommand::RenderScene(_) => FrameCmdId::RenderScene,
            FrameCommand::SetScissor(_) => FrameCmdId::SetScissor,
            FrameCommand::ResetScissor => FrameCmdId::ResetScissor,
            FrameCommand::DrawStretchRaw(_) => FrameCmdId::DrawStretchRaw,
            FrameCommand::DrawStretchRawYuv(_) => FrameCmdId::DrawStretchRawYuv,
        }
    }

    /// Decode the record at `offset` in `buf`.
    ///
    /// Returns the command and the number of bytes it occupies.
    pub fn decode(buf: &'a [u8], offset: usize) -> Result<(Self, usize), StreamFault> {
        let bytes = buf.get(offset..).unwrap_or_default();
        let header = RecordHeader::decode(bytes).ok_or(StreamFault::Truncated { offset })?;
        let id = FrameCmdId::from_u32(header.id).ok_or(StreamFault::UnknownId {
            offset,
            id: header.id,
        })?;
        let len = header.length as usize;
        if len == 0 {
            return Err(StreamFault::ZeroLength { offset, id });
        }

        let malformed = StreamFault::Malformed { offset, id };
        let fixed = fixed_len(id);
        let valid_len = if id.has_tail() {
            len >= fixed && len % RECORD_ALIGN == 0
        } else {
            len == align_up(fixed, RECORD_ALIGN)
        };
        if !valid_len || len > bytes.len() {
            return Err(malformed);
        }

        let record = &bytes[..len];
        let mut src = &record[HEADER_SIZE..fixed];
        let cmd = match id {
            FrameCmdId::BeginFrame => FrameCommand::BeginFrame(BeginFrame {
                camera_separation: src.get_f32_le(),
                force_clear: src.get_u8() != 0,
                force_vsync: src.get_u8() != 0,
            }),
            FrameCmdId::EndFrame => FrameCommand::EndFrame,
            FrameCmdId::DrawStretchPic => FrameCommand::DrawStretchPic(StretchPic {
                rect: Rect::get(&mut src),
                st: TexSpan::get(&mut src),
                angle: src.get_f32_le(),
                color: get_vec4(&mut src),
                shader: ShaderHandle::new(src.get_u64_le()),
            }),
            FrameCmdId::DrawStretchPoly => {
                let x_offset = src.get_f32_le();
                let y_offset = src.get_f32_le();
                let poly = decode_poly(&mut src, record).ok_or(malformed)?;
                FrameCommand::DrawStretchPoly {
                    poly,
                    x_offset,
                    y_offset,
                }
            }
            FrameCmdId::ClearScene => FrameCommand::ClearScene,
            FrameCmdId::AddEntityToScene => {
                FrameCommand::AddEntityToScene(decode_entity(&mut src, record).ok_or(malformed)?)
            }
            FrameCmdId::AddLightToScene => FrameCommand::AddLightToScene(DynamicLight {
                origin: get_vec3(&mut src),
                intensity: src.get_f32_le(),
                color: get_vec3(&mut src),
            }),
            FrameCmdId::AddPolyToScene => {
                // Scene polys share the 2D poly layout; offsets are unused.
                src.advance(8);
                FrameCommand::AddPolyToScene(decode_poly(&mut src, record).ok_or(malformed)?)
            }
            FrameCmdId::AddLightStyleToScene => FrameCommand::AddLightStyleToScene(LightStyle {
                style: src.get_i32_le(),
                color: get_vec3(&mut src),
            }),
            FrameCmdId::RenderScene => {
                FrameCommand::RenderScene(decode_render_scene(&mut src, record).ok_or(malformed)?)
            }
            FrameCmdId::SetScissor => FrameCommand::SetScissor(Rect::get(&mut src)),
            FrameCmdId::ResetScissor => FrameCommand::ResetScissor,
            FrameCmdId::DrawStretchRaw => FrameCommand::DrawStretchRaw(StretchRaw {
                rect: Rect::get(&mut src),
                st: TexSpan::get(&mut src),
            }),
            FrameCmdId::DrawStretchRawYuv => FrameCommand::DrawStretchRawYuv(StretchRaw {
                rect: Rect::get(&mut src),
                st: TexSpan::get(&mut src),
            }),
        };
        debug_assert!(src.is_empty(), "{:?} fixed fields not fully read", id);

        Ok((cmd, len))
    }
}

fn decode_poly<'a>(src: &mut &[u8], record: &'a [u8]) -> Option<PolyRecord<'a>> {
    let num_verts = src.get_u32_le();
    let shader = ShaderHandle::new(src.get_u64_le());
    let fog_num = src.get_i32_le();
    let spans = [
        Span::get(src),
        Span::get(src),
        Span::get(src),
        Span::get(src),
        Span::get(src),
    ];
    let per_vertex = spans[..4]
        .iter()
        .all(|span| span.count == 0 || span.count == num_verts);
    if !per_vertex {
        return None;
    }

    Some(PolyRecord {
        num_verts,
        verts: spans[0].resolve(record, POLY_FIXED).ok()?,
        st_coords: spans[1].resolve(record, POLY_FIXED).ok()?,
        normals: spans[2].resolve(record, POLY_FIXED).ok()?,
        colors: spans[3].resolve(record, POLY_FIXED).ok()?,
        elems: spans[4].resolve(record, POLY_FIXED).ok()?,
        shader,
        fog_num,
    })
}

fn decode_entity<'a>(src: &mut &[u8], record: &'a [u8]) -> Option<EntityRecord<'a>> {
    let kind = EntityType::from_u32(src.get_u32_le())?;
    let render_fx = src.get_u32_le();
    let model = ModelHandle::new(src.get_u64_le());
    let custom_shader = ShaderHandle::new(src.get_u64_le());
    let custom_skin = SkinHandle::new(src.get_u64_le());
    let origin = get_vec3(src);
    let light_origin = get_vec3(src);
    let axis = [get_vec3(src), get_vec3(src), get_vec3(src)];
    let scale = src.get_f32_le();
    let radius = src.get_f32_le();
    let rotation = src.get_f32_le();
    let frame = src.get_i32_le();
    let old_frame = src.get_i32_le();
    let back_lerp = src.get_f32_le();
    let shader_rgba = [src.get_u8(), src.get_u8(), src.get_u8(), src.get_u8()];
    let shader_time = src.get_i64_le();
    let num_bone_poses = src.get_u32_le();
    let bones = Span::get(src);
    let old_bones = Span::get(src);
    if [bones, old_bones]
        .iter()
        .any(|span| span.count != 0 && span.count != num_bone_poses)
    {
        return None;
    }

    Some(EntityRecord {
        kind,
        render_fx,
        model,
        custom_shader,
        custom_skin,
        origin,
        light_origin,
        axis,
        scale,
        radius,
        rotation,
        frame,
        old_frame,
        back_lerp,
        shader_rgba,
        shader_time,
        num_bone_poses,
        bone_poses: bones.resolve(record, ENTITY_FIXED).ok()?,
        old_bone_poses: old_bones.resolve(record, ENTITY_FIXED).ok()?,
    })
}

fn decode_render_scene<'a>(src: &mut &[u8], record: &'a [u8]) -> Option<RenderSceneRecord<'a>> {
    let generations = Generations {
        registration: src.get_u32_le(),
        world_model: src.get_u32_le(),
    };
    let viewport = Rect::get(src);
    let fov_x = src.get_f32_le();
    let fov_y = src.get_f32_le();
    let view_origin = get_vec3(src);
    let view_axis = [get_vec3(src), get_vec3(src), get_vec3(src)];
    let blend = get_vec4(src);
    let time = src.get_u32_le();
    let flags = src.get_u32_le();
    let scissor = Rect::get(src);
    let color_correction = ShaderHandle::new(src.get_u64_le());
    let area_bits = Span::get(src).resolve(record, RENDER_SCENE_FIXED).ok()?;

    Some(RenderSceneRecord {
        generations,
        refdef: RefDefRecord {
            viewport,
            fov_x,
            fov_y,
            view_origin,
            view_axis,
            blend,
            time,
            flags,
            scissor,
            color_correction,
            area_bits,
        },
    })
}

pub(crate) fn get_vec3(src: &mut &[u8]) -> [f32; 3] {
    [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()]
}

pub(crate) fn get_vec4(src: &mut &[u8]) -> [f32; 4] {
    [
        src.get_f32_le(),
        src.get_f32_le(),
        src.get_f32_le(),
        src.get_f32_le(),
    ]
}

/// Iterator over the decoded records of a buffer, in order.
///
/// Stops at the end of the data or at the first fault; [`fault`](Self::fault)
/// tells which.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    bytes: &'a [u8],
    offset: usize,
    fault: Option<StreamFault>,
}

impl<'a> RecordIter<'a> {
    /// Iterate over the records in `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            fault: None,
        }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The fault that stopped iteration, if any.
    #[inline]
    pub fn fault(&self) -> Option<StreamFault> {
        self.fault
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = (FrameCommand<'a>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.fault.is_some() || self.offset >= self.bytes.len() {
            return None;
        }
        match FrameCommand::decode(self.bytes, self.offset) {
            Ok((cmd, len)) => {
                self.offset += len;
                Some((cmd, len))
            }
            Err(fault) => {
                self.fault = Some(fault);
                None
            }
        }
    }
}
