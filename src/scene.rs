//! Producer-side drawing and scene types.
//!
//! Resource handles are opaque non-zero ids owned by the rendering backend;
//! this crate only copies them. Inputs that carry arrays ([`Poly`],
//! [`Entity`], [`RefDef`]) borrow the caller's data, which the encoder copies
//! into the command buffer.

use std::num::NonZeroU64;

use bytes::{Buf, BufMut};

use crate::protocol::Element;

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Wrap a raw backend id, `None` for 0.
            #[inline]
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            /// The raw backend id.
            #[inline]
            pub fn get(self) -> u64 {
                self.0.get()
            }

            #[inline]
            pub(crate) fn to_bits(handle: Option<Self>) -> u64 {
                handle.map_or(0, Self::get)
            }
        }
    };
}

resource_handle!(
    /// Opaque reference to a backend shader/material.
    ShaderHandle
);
resource_handle!(
    /// Opaque reference to a registered model.
    ModelHandle
);
resource_handle!(
    /// Opaque reference to a registered skin.
    SkinHandle
);

/// Integer screen rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const ENCODED_SIZE: usize = 16;

    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub(crate) fn put(&self, dst: &mut impl BufMut) {
        dst.put_i32_le(self.x);
        dst.put_i32_le(self.y);
        dst.put_i32_le(self.w);
        dst.put_i32_le(self.h);
    }

    pub(crate) fn get(src: &mut &[u8]) -> Self {
        Self {
            x: src.get_i32_le(),
            y: src.get_i32_le(),
            w: src.get_i32_le(),
            h: src.get_i32_le(),
        }
    }
}

/// Texture-coordinate span `(s1, t1)` to `(s2, t2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexSpan {
    pub s1: f32,
    pub t1: f32,
    pub s2: f32,
    pub t2: f32,
}

impl TexSpan {
    pub const ENCODED_SIZE: usize = 16;

    /// The full `[0, 1]` span.
    pub const FULL: TexSpan = TexSpan {
        s1: 0.0,
        t1: 0.0,
        s2: 1.0,
        t2: 1.0,
    };

    pub fn new(s1: f32, t1: f32, s2: f32, t2: f32) -> Self {
        Self { s1, t1, s2, t2 }
    }

    pub(crate) fn put(&self, dst: &mut impl BufMut) {
        dst.put_f32_le(self.s1);
        dst.put_f32_le(self.t1);
        dst.put_f32_le(self.s2);
        dst.put_f32_le(self.t2);
    }

    pub(crate) fn get(src: &mut &[u8]) -> Self {
        Self {
            s1: src.get_f32_le(),
            t1: src.get_f32_le(),
            s2: src.get_f32_le(),
            t2: src.get_f32_le(),
        }
    }
}

/// A 2D picture draw, optionally rotated around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchPic {
    pub rect: Rect,
    pub st: TexSpan,
    /// Rotation in degrees.
    pub angle: f32,
    pub color: [f32; 4],
    /// `None` lets the backend pick its default white shader.
    pub shader: Option<ShaderHandle>,
}

impl StretchPic {
    /// Unrotated picture.
    pub fn new(rect: Rect, st: TexSpan, color: [f32; 4], shader: Option<ShaderHandle>) -> Self {
        Self {
            rect,
            st,
            angle: 0.0,
            color,
            shader,
        }
    }
}

/// A raw-image blit (cinematic frames), RGB or YUV depending on the call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchRaw {
    pub rect: Rect,
    pub st: TexSpan,
}

/// One skeletal bone pose as a dual quaternion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BonePose {
    pub dual_quat: [f32; 8],
}

impl Element for BonePose {
    const SIZE: usize = 32;

    fn put(&self, dst: &mut impl BufMut) {
        self.dual_quat.put(dst);
    }

    fn get(src: &[u8]) -> Self {
        Self {
            dual_quat: <[f32; 8] as Element>::get(src),
        }
    }
}

/// A polygon submitted either as 2D overlay geometry or into the 3D scene.
///
/// Every per-vertex array that is present must hold at least `num_verts`
/// elements; only the first `num_verts` are copied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poly<'a> {
    pub num_verts: u32,
    pub verts: Option<&'a [[f32; 4]]>,
    pub st_coords: Option<&'a [[f32; 2]]>,
    pub normals: Option<&'a [[f32; 4]]>,
    pub colors: Option<&'a [[u8; 4]]>,
    /// Triangle indices, copied in full.
    pub elems: Option<&'a [u16]>,
    pub shader: Option<ShaderHandle>,
    pub fog_num: i32,
}

/// How the backend should interpret an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum EntityType {
    #[default]
    Model = 0,
    Sprite = 1,
    PortalSurface = 2,
}

impl EntityType {
    pub(crate) fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(EntityType::Model),
            1 => Some(EntityType::Sprite),
            2 => Some(EntityType::PortalSurface),
            _ => None,
        }
    }
}

/// A renderable scene entity.
///
/// Bone pose arrays are sized by the model's bone count as reported by
/// [`RendererState::bone_count`](crate::state::RendererState::bone_count).
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
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
    pub bone_poses: Option<&'a [BonePose]>,
    pub old_bone_poses: Option<&'a [BonePose]>,
}

impl Default for Entity<'_> {
    fn default() -> Self {
        Self {
            kind: EntityType::Model,
            render_fx: 0,
            model: None,
            custom_shader: None,
            custom_skin: None,
            origin: [0.0; 3],
            light_origin: [0.0; 3],
            axis: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            scale: 1.0,
            radius: 0.0,
            rotation: 0.0,
            frame: 0,
            old_frame: 0,
            back_lerp: 0.0,
            shader_rgba: [255; 4],
            shader_time: 0,
            bone_poses: None,
            old_bone_poses: None,
        }
    }
}

/// Flag bits for [`RefDef::flags`].
pub mod rdflags {
    /// View is under water.
    pub const UNDERWATER: u32 = 0x1;
    /// Scene has no world model (menu/HUD model views).
    pub const NO_WORLD_MODEL: u32 = 0x2;
    /// Reuse the previous frame's area bits.
    pub const OLD_AREABITS: u32 = 0x4;
    /// A portal surface is visible.
    pub const PORTAL_IN_VIEW: u32 = 0x8;
    /// A sky portal is visible.
    pub const SKY_PORTAL_IN_VIEW: u32 = 0x10;
    /// Mirror the view horizontally.
    pub const FLIPPED: u32 = 0x20;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u32, flag: u32) -> bool {
        flags & flag != 0
    }
}

/// Scene view definition for a render-scene request.
#[derive(Debug, Clone, Copy)]
pub struct RefDef<'a> {
    pub viewport: Rect,
    pub fov_x: f32,
    pub fov_y: f32,
    pub view_origin: [f32; 3],
    pub view_axis: [[f32; 3]; 3],
    pub blend: [f32; 4],
    /// Scene time in milliseconds.
    pub time: u32,
    /// See [`rdflags`].
    pub flags: u32,
    pub scissor: Rect,
    pub color_correction: Option<ShaderHandle>,
    /// Area visibility bitset; only the bytes covering the loaded world's
    /// areas are copied.
    pub area_bits: Option<&'a [u8]>,
}

impl Default for RefDef<'_> {
    fn default() -> Self {
        Self {
            viewport: Rect::default(),
            fov_x: 90.0,
            fov_y: 90.0,
            view_origin: [0.0; 3],
            view_axis: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            blend: [0.0; 4],
            time: 0,
            flags: 0,
            scissor: Rect::default(),
            color_correction: None,
            area_bits: None,
        }
    }
}
