//! Integration tests for refcmd.
//!
//! These tests drive the public API end to end: encode on one side,
//! dispatch on the other.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use refcmd::frame::{
    DynamicLight, EntityRecord, FrameBackend, FrameCmdBuf, FrameCommand, FrameCommands,
    LightStyle, PolyRecord, RefDefRecord,
};
use refcmd::reliable::{dispatch_reliable, ReliableBackend, ReliableIssuer, ScreenShot};
use refcmd::scene::{
    rdflags, BonePose, Entity, EntityType, ModelHandle, Poly, Rect, RefDef, ShaderHandle,
    SkinHandle, StretchPic, StretchRaw, TexSpan,
};
use refcmd::state::{RendererState, SharedRendererState};
use refcmd::transport::buf_pipe;
use refcmd::{spawn_reliable_worker, ShutdownPolicy};

/// A frame backend call with owned copies of its arguments.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    BeginFrame(f32, bool, bool),
    EndFrame,
    Pic(StretchPic),
    StretchPoly {
        verts: Vec<[f32; 4]>,
        elems: Vec<u16>,
        offset: (f32, f32),
    },
    ClearScene,
    Entity {
        frame: i32,
        poses: Vec<BonePose>,
        /// Address range of the pose bytes handed to the backend.
        poses_at: Range<usize>,
    },
    Light(DynamicLight),
    ScenePoly {
        verts: Vec<[f32; 4]>,
        colors: Vec<[u8; 4]>,
    },
    LightStyle(LightStyle),
    RenderScene {
        time: u32,
        area_bits: Vec<u8>,
    },
    Scissor(Rect),
    ResetScissor,
    Raw(StretchRaw),
    RawYuv(StretchRaw),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

impl FrameBackend for Recorder {
    fn begin_frame(&mut self, camera_separation: f32, force_clear: bool, force_vsync: bool) {
        self.calls
            .push(Call::BeginFrame(camera_separation, force_clear, force_vsync));
    }

    fn end_frame(&mut self) {
        self.calls.push(Call::EndFrame);
    }

    fn draw_rotated_stretch_pic(&mut self, pic: &StretchPic) {
        self.calls.push(Call::Pic(*pic));
    }

    fn draw_stretch_poly(&mut self, poly: &PolyRecord<'_>, x_offset: f32, y_offset: f32) {
        self.calls.push(Call::StretchPoly {
            verts: poly.verts.map(|v| v.to_vec()).unwrap_or_default(),
            elems: poly.elems.map(|e| e.to_vec()).unwrap_or_default(),
            offset: (x_offset, y_offset),
        });
    }

    fn clear_scene(&mut self) {
        self.calls.push(Call::ClearScene);
    }

    fn add_entity_to_scene(&mut self, entity: &EntityRecord<'_>) {
        let poses = entity.bone_poses.expect("entity without poses");
        let start = poses.as_bytes().as_ptr() as usize;
        self.calls.push(Call::Entity {
            frame: entity.frame,
            poses: poses.to_vec(),
            poses_at: start..start + poses.as_bytes().len(),
        });
    }

    fn add_light_to_scene(&mut self, light: &DynamicLight) {
        self.calls.push(Call::Light(*light));
    }

    fn add_poly_to_scene(&mut self, poly: &PolyRecord<'_>) {
        self.calls.push(Call::ScenePoly {
            verts: poly.verts.map(|v| v.to_vec()).unwrap_or_default(),
            colors: poly.colors.map(|c| c.to_vec()).unwrap_or_default(),
        });
    }

    fn add_light_style_to_scene(&mut self, style: &LightStyle) {
        self.calls.push(Call::LightStyle(*style));
    }

    fn render_scene(&mut self, refdef: &RefDefRecord<'_>) {
        self.calls.push(Call::RenderScene {
            time: refdef.time,
            area_bits: refdef.area_bits.map(|a| a.to_vec()).unwrap_or_default(),
        });
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.calls.push(Call::Scissor(rect));
    }

    fn reset_scissor(&mut self) {
        self.calls.push(Call::ResetScissor);
    }

    fn draw_stretch_raw(&mut self, raw: &StretchRaw) {
        self.calls.push(Call::Raw(*raw));
    }

    fn draw_stretch_raw_yuv(&mut self, raw: &StretchRaw) {
        self.calls.push(Call::RawYuv(*raw));
    }
}

fn new_state() -> Arc<SharedRendererState> {
    Arc::new(SharedRendererState::new())
}

fn shader(raw: u64) -> Option<ShaderHandle> {
    ShaderHandle::new(raw)
}

/// Begin, one picture, end: three calls in order, buffer left intact.
#[test]
fn test_frame_scenario_begin_pic_end() {
    let mut cmdbuf = FrameCmdBuf::new(64 * 1024, new_state());
    let pic = StretchPic::new(
        Rect::new(10, 10, 100, 50),
        TexSpan::new(0.0, 0.0, 1.0, 1.0),
        [1.0, 1.0, 1.0, 0.5],
        shader(7),
    );

    cmdbuf.begin_frame(0.0, true, false);
    cmdbuf.draw_rotated_stretch_pic(&pic);
    cmdbuf.end_frame();
    let len = cmdbuf.len();

    let mut recorder = Recorder::default();
    let report = cmdbuf.run_cmds(&mut recorder);

    assert_eq!(
        recorder.calls,
        [
            Call::BeginFrame(0.0, true, false),
            Call::Pic(pic),
            Call::EndFrame
        ]
    );
    assert_eq!(report.commands, 3);
    assert_eq!(report.consumed, len);
    assert!(report.is_complete());
    assert_eq!(cmdbuf.len(), len);
}

/// Bone poses are copied into the buffer and handed out from there.
#[test]
fn test_entities_with_bone_poses_reference_buffer() {
    let state = new_state();
    let model = ModelHandle::new(11).unwrap();
    state.set_bone_count(model, 32);
    let mut cmdbuf = FrameCmdBuf::new(64 * 1024, state);

    let poses: Vec<Vec<BonePose>> = (0..5)
        .map(|e| {
            (0..32)
                .map(|b| BonePose {
                    dual_quat: [e as f32, b as f32, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5],
                })
                .collect()
        })
        .collect();
    for (i, entity_poses) in poses.iter().enumerate() {
        cmdbuf.add_entity_to_scene(&Entity {
            model: Some(model),
            frame: i as i32,
            bone_poses: Some(entity_poses.as_slice()),
            ..Entity::default()
        });
    }

    let mut recorder = Recorder::default();
    cmdbuf.run_cmds(&mut recorder);

    let base = cmdbuf.as_bytes().as_ptr() as usize;
    let buffer = base..base + cmdbuf.len();
    assert_eq!(recorder.calls.len(), 5);
    for (i, call) in recorder.calls.iter().enumerate() {
        let Call::Entity {
            frame,
            poses: got,
            poses_at,
        } = call
        else {
            panic!("unexpected {:?}", call);
        };
        assert_eq!(*frame, i as i32);
        assert_eq!(got, &poses[i]);
        assert!(buffer.contains(&poses_at.start));
        assert!(poses_at.end <= buffer.end);

        let caller = poses[i].as_ptr() as usize;
        assert!(!poses_at.contains(&caller));
    }
}

/// Reliable records arrive in order regardless of frame traffic.
#[test]
fn test_reliable_order_with_frame_traffic() {
    let state = new_state();
    state.set_display_size(1024, 768);
    let (writer, mut reader) = buf_pipe();
    let issuer = ReliableIssuer::new(writer, state.clone());
    let mut cmdbuf = FrameCmdBuf::new(1024, state);

    cmdbuf.begin_frame(0.0, false, false);
    issuer.issue_set_gamma(1.2).unwrap();
    for _ in 0..200 {
        cmdbuf.clear_scene();
    }
    issuer
        .issue_screen_shot("/tmp", "shot", "%04d", false)
        .unwrap();
    cmdbuf.clear();
    cmdbuf.end_frame();

    let mut backend = ReliableLog::default();
    let n = reader
        .read_cmds(|record| dispatch_reliable(record, &mut backend))
        .unwrap();

    assert_eq!(n, 2);
    assert_eq!(
        backend.calls(),
        [
            "set_gamma 1.2".to_string(),
            "screen_shot /tmp shot %04d 1024x768 silent=false".to_string()
        ]
    );
    assert!(cmdbuf.drop_counters().overflow_count() > 0);
}

/// The same ordering holds through the async worker.
#[tokio::test]
async fn test_reliable_worker_scenario() {
    let (writer, reader) = buf_pipe();
    let issuer = ReliableIssuer::new(writer, new_state());
    let worker = spawn_reliable_worker(reader, ReliableLog::default(), ShutdownPolicy::Leak);

    issuer.issue_set_gamma(1.2).unwrap();
    issuer
        .issue_screen_shot("/tmp", "shot", "%04d", false)
        .unwrap();
    drop(issuer);

    let backend = worker.join().await.unwrap();
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(backend.calls()[0], "set_gamma 1.2");
    assert!(backend.calls()[1].starts_with("screen_shot /tmp shot %04d"));
}

/// Length never exceeds capacity and a rejected encode changes nothing.
#[test]
fn test_capacity_invariant() {
    let state = new_state();
    let mut cmdbuf = FrameCmdBuf::new(1000, state);
    let verts = [[0.0f32, 0.0, 0.0, 1.0]; 16];
    let poly = Poly {
        num_verts: 16,
        verts: Some(&verts),
        shader: shader(2),
        ..Poly::default()
    };

    for i in 0..200 {
        let before = cmdbuf.as_bytes().to_vec();
        let dropped = cmdbuf.drop_counters().total();
        match i % 4 {
            0 => cmdbuf.add_poly_to_scene(&poly),
            1 => cmdbuf.add_light_to_scene([0.0; 3], 100.0, [1.0; 3]),
            2 => cmdbuf.render_scene(&RefDef::default()),
            _ => cmdbuf.end_frame(),
        }
        assert!(cmdbuf.len() <= cmdbuf.capacity());
        if cmdbuf.drop_counters().total() > dropped {
            assert_eq!(cmdbuf.as_bytes(), &before[..]);
        }
    }
    assert!(cmdbuf.drop_counters().overflow_count() > 0);

    let mut recorder = Recorder::default();
    let report = cmdbuf.run_cmds(&mut recorder);
    assert_eq!(report.consumed, cmdbuf.len());
}

/// Every kind of record, with and without tails, is consumed exactly.
#[test]
fn test_exact_consumption_all_kinds() {
    let state = new_state();
    state.advance_world_model(Some(20));
    let model = ModelHandle::new(4).unwrap();
    state.set_bone_count(model, 3);
    let mut cmdbuf = FrameCmdBuf::new(64 * 1024, state);

    let verts = [[1.0f32, 2.0, 3.0, 1.0], [4.0, 5.0, 6.0, 1.0], [7.0, 8.0, 9.0, 1.0]];
    let colors = [[1u8, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]];
    let elems = [0u16, 1, 2];
    let poses = [BonePose::default(); 3];
    let area_bits = [0b1010_1010u8, 0xFF, 0x0F, 0xAA];

    cmdbuf.begin_frame(0.25, false, true);
    cmdbuf.draw_stretch_pic(Rect::new(0, 0, 16, 16), TexSpan::FULL, [1.0; 4], shader(1));
    cmdbuf.draw_stretch_poly(
        &Poly {
            num_verts: 3,
            verts: Some(&verts),
            elems: Some(&elems),
            shader: shader(1),
            ..Poly::default()
        },
        5.0,
        -5.0,
    );
    cmdbuf.clear_scene();
    cmdbuf.add_entity_to_scene(&Entity {
        model: Some(model),
        frame: 9,
        bone_poses: Some(&poses),
        old_bone_poses: Some(&poses),
        ..Entity::default()
    });
    cmdbuf.add_light_to_scene([1.0, 2.0, 3.0], 300.0, [1.0, 0.0, 0.0]);
    cmdbuf.add_poly_to_scene(&Poly {
        num_verts: 3,
        verts: Some(&verts),
        colors: Some(&colors),
        shader: shader(5),
        ..Poly::default()
    });
    cmdbuf.add_light_style_to_scene(2, [0.5, 0.5, 0.5]);
    cmdbuf.render_scene(&RefDef {
        time: 1234,
        area_bits: Some(&area_bits),
        ..RefDef::default()
    });
    cmdbuf.set_scissor(Rect::new(1, 2, 3, 4));
    cmdbuf.reset_scissor();
    cmdbuf.draw_stretch_raw(Rect::new(0, 0, 320, 200), TexSpan::FULL);
    cmdbuf.draw_stretch_raw_yuv(Rect::new(0, 0, 640, 400), TexSpan::FULL);
    cmdbuf.end_frame();

    let lengths: usize = cmdbuf.records().map(|(_, len)| len).sum();
    assert_eq!(lengths, cmdbuf.len());

    let mut recorder = Recorder::default();
    let report = cmdbuf.run_cmds(&mut recorder);
    assert_eq!(report.commands, 14);
    assert_eq!(report.consumed, cmdbuf.len());
    assert_eq!(report.stale_skipped, 0);
    assert_eq!(recorder.calls.len(), 14);

    assert_eq!(recorder.calls[0], Call::BeginFrame(0.25, false, true));
    assert_eq!(
        recorder.calls[2],
        Call::StretchPoly {
            verts: verts.to_vec(),
            elems: elems.to_vec(),
            offset: (5.0, -5.0),
        }
    );
    assert_eq!(
        recorder.calls[6],
        Call::ScenePoly {
            verts: verts.to_vec(),
            colors: colors.to_vec(),
        }
    );
    assert_eq!(
        recorder.calls[5],
        Call::Light(DynamicLight {
            origin: [1.0, 2.0, 3.0],
            intensity: 300.0,
            color: [1.0, 0.0, 0.0],
        })
    );
    assert_eq!(
        recorder.calls[7],
        Call::LightStyle(LightStyle {
            style: 2,
            color: [0.5, 0.5, 0.5],
        })
    );
    // 20 areas need 3 bytes of the caller's 4.
    assert_eq!(
        recorder.calls[8],
        Call::RenderScene {
            time: 1234,
            area_bits: area_bits[..3].to_vec(),
        }
    );
    assert_eq!(
        recorder.calls[11],
        Call::Raw(StretchRaw {
            rect: Rect::new(0, 0, 320, 200),
            st: TexSpan::FULL,
        })
    );
    assert_eq!(
        recorder.calls[12],
        Call::RawYuv(StretchRaw {
            rect: Rect::new(0, 0, 640, 400),
            st: TexSpan::FULL,
        })
    );
    assert_eq!(recorder.calls[13], Call::EndFrame);
}

fn pose(seed: f32) -> BonePose {
    let mut dual_quat = [0.0; 8];
    for (i, v) in dual_quat.iter_mut().enumerate() {
        *v = seed + i as f32 * 0.125;
    }
    BonePose { dual_quat }
}

/// Every entity field and both pose arrays come back unchanged.
#[test]
fn test_entity_round_trip_all_fields() {
    let state = new_state();
    let model = ModelHandle::new(0x1234_5678_9abc).unwrap();
    state.set_bone_count(model, 2);
    let mut cmdbuf = FrameCmdBuf::new(4096, state);

    let poses = [pose(1.0), pose(2.0), pose(3.0)];
    let old_poses = [pose(-1.0), pose(-2.0)];
    let entity = Entity {
        kind: EntityType::Sprite,
        render_fx: 0x8001,
        model: Some(model),
        custom_shader: ShaderHandle::new(21),
        custom_skin: SkinHandle::new(22),
        origin: [1.5, -2.5, 3.5],
        light_origin: [4.0, 5.0, -6.0],
        axis: [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        scale: 1.25,
        radius: 48.0,
        rotation: 90.5,
        frame: 7,
        old_frame: 6,
        back_lerp: 0.375,
        shader_rgba: [10, 20, 30, 40],
        shader_time: -123_456_789_012,
        bone_poses: Some(&poses),
        old_bone_poses: Some(&old_poses),
    };
    cmdbuf.add_entity_to_scene(&entity);

    let mut records = cmdbuf.records();
    let Some((FrameCommand::AddEntityToScene(got), len)) = records.next() else {
        panic!("expected an entity record");
    };
    assert!(records.next().is_none());
    assert_eq!(len, cmdbuf.len());

    assert_eq!(got.kind, entity.kind);
    assert_eq!(got.render_fx, entity.render_fx);
    assert_eq!(got.model, entity.model);
    assert_eq!(got.custom_shader, entity.custom_shader);
    assert_eq!(got.custom_skin, entity.custom_skin);
    assert_eq!(got.origin, entity.origin);
    assert_eq!(got.light_origin, entity.light_origin);
    assert_eq!(got.axis, entity.axis);
    assert_eq!(got.scale, entity.scale);
    assert_eq!(got.radius, entity.radius);
    assert_eq!(got.rotation, entity.rotation);
    assert_eq!(got.frame, entity.frame);
    assert_eq!(got.old_frame, entity.old_frame);
    assert_eq!(got.back_lerp, entity.back_lerp);
    assert_eq!(got.shader_rgba, entity.shader_rgba);
    assert_eq!(got.shader_time, entity.shader_time);
    assert_eq!(got.num_bone_poses, 2);
    // Only the model's bone count is copied.
    assert_eq!(got.bone_poses.unwrap().to_vec(), poses[..2].to_vec());
    assert_eq!(got.old_bone_poses.unwrap().to_vec(), old_poses.to_vec());
}

/// Every refdef field, the area bits and the encode-time generations survive.
#[test]
fn test_render_scene_round_trip_all_fields() {
    let state = new_state();
    state.advance_registration();
    state.advance_world_model(Some(12));
    let mut cmdbuf = FrameCmdBuf::new(4096, state.clone());

    let area_bits = [0xABu8, 0x0C, 0xFF];
    let refdef = RefDef {
        viewport: Rect::new(8, 16, 800, 600),
        fov_x: 100.0,
        fov_y: 75.5,
        view_origin: [-10.0, 20.0, 30.25],
        view_axis: [[0.5, 0.5, 0.0], [-0.5, 0.5, 0.0], [0.0, 0.0, 1.0]],
        blend: [0.1, 0.2, 0.3, 0.4],
        time: 98_765,
        flags: rdflags::UNDERWATER | rdflags::FLIPPED,
        scissor: Rect::new(1, 2, 640, 480),
        color_correction: ShaderHandle::new(99),
        area_bits: Some(&area_bits),
    };
    cmdbuf.render_scene(&refdef);

    let Some((FrameCommand::RenderScene(got), len)) = cmdbuf.records().next() else {
        panic!("expected a render-scene record");
    };
    assert_eq!(len, cmdbuf.len());
    assert_eq!(got.generations, state.generations());
    assert!(!got.is_stale(state.generations()));

    let r = got.refdef;
    assert_eq!(r.viewport, refdef.viewport);
    assert_eq!(r.fov_x, refdef.fov_x);
    assert_eq!(r.fov_y, refdef.fov_y);
    assert_eq!(r.view_origin, refdef.view_origin);
    assert_eq!(r.view_axis, refdef.view_axis);
    assert_eq!(r.blend, refdef.blend);
    assert_eq!(r.time, refdef.time);
    assert_eq!(r.flags, refdef.flags);
    assert_eq!(r.scissor, refdef.scissor);
    assert_eq!(r.color_correction, refdef.color_correction);
    // 12 areas need 2 bytes.
    assert_eq!(r.area_bits.unwrap().to_vec(), area_bits[..2].to_vec());
}

/// All five poly tails plus shader, fog and offsets survive, in 2D and 3D.
#[test]
fn test_poly_round_trip_all_fields() {
    let mut cmdbuf = FrameCmdBuf::new(4096, new_state());

    let verts = [[1.0f32, 2.0, 3.0, 1.0], [4.0, 5.0, 6.0, 1.0], [7.0, 8.0, 9.0, 1.0]];
    let st_coords = [[0.0f32, 0.25], [0.5, 0.75], [1.0, -1.0]];
    let normals = [[0.0f32, 0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]];
    let colors = [[1u8, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]];
    let elems = [0u16, 1, 2, 2, 1, 0, 65_535];
    let poly = Poly {
        num_verts: 3,
        verts: Some(&verts),
        st_coords: Some(&st_coords),
        normals: Some(&normals),
        colors: Some(&colors),
        elems: Some(&elems),
        shader: shader(0xDEAD_BEEF),
        fog_num: -3,
    };
    cmdbuf.draw_stretch_poly(&poly, 12.5, -7.25);
    cmdbuf.add_poly_to_scene(&Poly { fog_num: 4, ..poly });

    let check = |got: &PolyRecord<'_>, fog_num: i32| {
        assert_eq!(got.num_verts, 3);
        assert_eq!(got.verts.unwrap().to_vec(), verts.to_vec());
        assert_eq!(got.st_coords.unwrap().to_vec(), st_coords.to_vec());
        assert_eq!(got.normals.unwrap().to_vec(), normals.to_vec());
        assert_eq!(got.colors.unwrap().to_vec(), colors.to_vec());
        assert_eq!(got.elems.unwrap().to_vec(), elems.to_vec());
        assert_eq!(got.shader, poly.shader);
        assert_eq!(got.fog_num, fog_num);
    };

    let records: Vec<_> = cmdbuf.records().map(|(cmd, _)| cmd).collect();
    assert_eq!(records.len(), 2);
    match &records[0] {
        FrameCommand::DrawStretchPoly {
            poly: got,
            x_offset,
            y_offset,
        } => {
            check(got, -3);
            assert_eq!((*x_offset, *y_offset), (12.5, -7.25));
        }
        other => panic!("unexpected {:?}", other),
    }
    match &records[1] {
        FrameCommand::AddPolyToScene(got) => check(got, 4),
        other => panic!("unexpected {:?}", other),
    }
}

/// Clearing behaves like starting over with a fresh buffer.
#[test]
fn test_idempotent_clear() {
    let state = new_state();
    let mut reused = FrameCmdBuf::new(512, state.clone());
    let mut fresh = FrameCmdBuf::new(512, state);

    for _ in 0..20 {
        reused.add_light_style_to_scene(1, [1.0; 3]);
    }
    reused.clear();
    reused.clear();
    assert_eq!(reused.len(), 0);

    for cmdbuf in [&mut reused, &mut fresh] {
        cmdbuf.begin_frame(0.0, false, false);
        cmdbuf.set_scissor(Rect::new(0, 0, 10, 10));
        cmdbuf.end_frame();
    }
    assert_eq!(reused.as_bytes(), fresh.as_bytes());
    assert_eq!(reused.remaining(), fresh.remaining());
}

/// Render requests from before a registration reload are skipped.
#[test]
fn test_freshness_skip() {
    let state = new_state();
    let mut cmdbuf = FrameCmdBuf::new(4096, state.clone());
    cmdbuf.render_scene(&RefDef::default());
    let len = cmdbuf.len();

    state.advance_registration();
    state.advance_world_model(Some(1));

    let mut recorder = Recorder::default();
    let report = cmdbuf.run_cmds(&mut recorder);
    assert!(recorder.calls.is_empty());
    assert_eq!(report.consumed, len);
    assert_eq!(report.stale_skipped, 1);

    // Encoded after the reload: runs.
    cmdbuf.clear();
    cmdbuf.render_scene(&RefDef::default());
    let report = cmdbuf.run_cmds(&mut recorder);
    assert_eq!(report.stale_skipped, 0);
    assert_eq!(recorder.calls.len(), 1);
}

/// Zero-vertex and shaderless polygons write nothing.
#[test]
fn test_degenerate_rejection() {
    let mut cmdbuf = FrameCmdBuf::new(4096, new_state());
    let verts = [[0.0f32; 4]; 3];
    cmdbuf.end_frame();
    let len = cmdbuf.len();

    cmdbuf.add_poly_to_scene(&Poly {
        num_verts: 0,
        verts: Some(&verts),
        shader: shader(1),
        ..Poly::default()
    });
    cmdbuf.draw_stretch_poly(
        &Poly {
            num_verts: 3,
            verts: Some(&verts),
            shader: None,
            ..Poly::default()
        },
        0.0,
        0.0,
    );

    assert_eq!(cmdbuf.len(), len);
    assert_eq!(cmdbuf.drop_counters().degenerate_count(), 2);
}

/// Game thread fills, render thread replays, ownership alternates per frame.
#[test]
fn test_buffer_handoff_between_threads() {
    let state = new_state();
    let (to_render, from_game) = std::sync::mpsc::channel::<FrameCmdBuf>();
    let (to_game, from_render) = std::sync::mpsc::channel::<FrameCmdBuf>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let render = {
        let seen = seen.clone();
        std::thread::spawn(move || {
            for cmdbuf in from_game {
                let mut recorder = Recorder::default();
                let report = cmdbuf.run_cmds(&mut recorder);
                seen.lock().unwrap().push((cmdbuf.frame_id(), report.commands));
                if to_game.send(cmdbuf).is_err() {
                    break;
                }
            }
        })
    };

    let mut cmdbuf = FrameCmdBuf::new(4096, state);
    for frame in 1..=3u32 {
        cmdbuf.clear();
        cmdbuf.set_frame_id(frame);
        cmdbuf.begin_frame(0.0, false, false);
        for _ in 0..frame {
            cmdbuf.clear_scene();
        }
        cmdbuf.end_frame();
        to_render.send(cmdbuf).unwrap();
        cmdbuf = from_render.recv().unwrap();
    }
    drop(to_render);
    render.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), [(1, 3), (2, 4), (3, 5)]);
}

/// Reliable backend that logs a line per call.
#[derive(Default)]
struct ReliableLog {
    calls: Vec<String>,
}

impl ReliableLog {
    fn calls(&self) -> Vec<String> {
        self.calls.clone()
    }
}

impl ReliableBackend for ReliableLog {
    fn init(&mut self) {
        self.calls.push("init".into());
    }
    fn shutdown(&mut self) {
        self.calls.push("shutdown".into());
    }
    fn surface_change(&mut self) {
        self.calls.push("surface_change".into());
    }
    fn screen_shot(&mut self, shot: &ScreenShot<'_>) {
        self.calls.push(format!(
            "screen_shot {} {} {} {}x{} silent={}",
            shot.path, shot.name, shot.fmt, shot.rect.w, shot.rect.h, shot.silent
        ));
    }
    fn env_shot(&mut self, path: &str, name: &str, pixels: u32) {
        self.calls.push(format!("env_shot {} {} {}", path, name, pixels));
    }
    fn begin_registration(&mut self) {
        self.calls.push("begin_registration".into());
    }
    fn end_registration(&mut self) {
        self.calls.push("end_registration".into());
    }
    fn set_custom_color(&mut self, num: i32, r: i32, g: i32, b: i32) {
        self.calls
            .push(format!("set_custom_color {} {} {} {}", num, r, g, b));
    }
    fn set_wall_floor_colors(&mut self, _: [f32; 3], _: [f32; 3]) {
        self.calls.push("set_wall_floor_colors".into());
    }
    fn set_draw_buffer(&mut self, draw_buffer: &str) {
        self.calls.push(format!("set_draw_buffer {}", draw_buffer));
    }
    fn set_texture_mode(&mut self, texture_mode: &str) {
        self.calls.push(format!("set_texture_mode {}", texture_mode));
    }
    fn set_texture_filter(&mut self, filter: i32) {
        self.calls.push(format!("set_texture_filter {}", filter));
    }
    fn set_gamma(&mut self, gamma: f32) {
        self.calls.push(format!("set_gamma {}", gamma));
    }
}
