//! Reliable command replay.

use crate::error::Result;

use super::record::{ReliableCommand, ScreenShot};

/// Rendering backend receiving reliable commands.
pub trait ReliableBackend {
    fn init(&mut self);

    fn shutdown(&mut self);

    fn surface_change(&mut self);

    fn screen_shot(&mut self, shot: &ScreenShot<'_>);

    fn env_shot(&mut self, path: &str, name: &str, pixels: u32);

    fn begin_registration(&mut self);

    fn end_registration(&mut self);

    fn set_custom_color(&mut self, num: i32, r: i32, g: i32, b: i32);

    fn set_wall_floor_colors(&mut self, wall: [f32; 3], floor: [f32; 3]);

    fn set_draw_buffer(&mut self, draw_buffer: &str);

    fn set_texture_mode(&mut self, texture_mode: &str);

    fn set_texture_filter(&mut self, filter: i32);

    fn set_gamma(&mut self, gamma: f32);
}

/// Decode one record popped off the pipe and run it.
pub fn dispatch_reliable(record: &[u8], backend: &mut dyn ReliableBackend) -> Result<()> {
    match ReliableCommand::decode(record)? {
        ReliableCommand::Init => backend.init(),
        ReliableCommand::Shutdown => backend.shutdown(),
        ReliableCommand::SurfaceChange => backend.surface_change(),
        ReliableCommand::ScreenShot(shot) => backend.screen_shot(&shot),
        ReliableCommand::EnvShot(shot) => backend.env_shot(shot.path, shot.name, shot.pixels),
        ReliableCommand::BeginRegistration => backend.begin_registration(),
        ReliableCommand::EndRegistration => backend.end_registration(),
        ReliableCommand::SetCustomColor { num, r, g, b } => backend.set_custom_color(num, r, g, b),
        ReliableCommand::SetWallFloorColors { wall, floor } => {
            backend.set_wall_floor_colors(wall, floor)
        }
        ReliableCommand::SetDrawBuffer(name) => backend.set_draw_buffer(name),
        ReliableCommand::SetTextureMode(mode) => backend.set_texture_mode(mode),
        ReliableCommand::SetTextureFilter(filter) => backend.set_texture_filter(filter),
        ReliableCommand::SetGamma(gamma) => backend.set_gamma(gamma),
    }
    Ok(())
}
