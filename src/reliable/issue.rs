//! Reliable command encoders.

use std::sync::Arc;

use crate::error::Result;
use crate::scene::Rect;
use crate::state::RendererState;
use crate::transport::CommandPipe;

use super::record::{ReliableCommand, ScreenShot};

/// Issues reliable commands onto a [`CommandPipe`].
///
/// Each call builds one complete record and pushes it in a single write.
/// Nothing is validated beyond truncating strings to their field widths.
pub struct ReliableIssuer<P> {
    pipe: P,
    state: Arc<dyn RendererState>,
}

impl<P: CommandPipe> ReliableIssuer<P> {
    /// `state` supplies the display size for full-screen captures.
    pub fn new(pipe: P, state: Arc<dyn RendererState>) -> Self {
        Self { pipe, state }
    }

    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    /// Push an already built command.
    pub fn issue(&self, cmd: &ReliableCommand<'_>) -> Result<()> {
        self.pipe.write_cmd(cmd.encode())
    }

    pub fn issue_init(&self) -> Result<()> {
        self.issue(&ReliableCommand::Init)
    }

    pub fn issue_shutdown(&self) -> Result<()> {
        self.issue(&ReliableCommand::Shutdown)
    }

    /// The window surface changed; the backend must pick up the new one.
    pub fn issue_surface_change(&self) -> Result<()> {
        self.issue(&ReliableCommand::SurfaceChange)
    }

    /// Capture the whole display.
    pub fn issue_screen_shot(&self, path: &str, name: &str, fmt: &str, silent: bool) -> Result<()> {
        self.issue(&ReliableCommand::ScreenShot(ScreenShot {
            path,
            name,
            fmt,
            rect: self.display_rect(),
            pixels: 0,
            silent,
            media: true,
        }))
    }

    /// Capture an environment cube map with `pixels`-sized faces.
    pub fn issue_env_shot(&self, path: &str, name: &str, pixels: u32) -> Result<()> {
        self.issue(&ReliableCommand::EnvShot(ScreenShot {
            path,
            name,
            fmt: "",
            rect: self.display_rect(),
            pixels,
            silent: false,
            media: false,
        }))
    }

    /// Capture one video frame from `rect`, silently.
    pub fn issue_avi_shot(&self, path: &str, name: &str, rect: Rect) -> Result<()> {
        self.issue(&ReliableCommand::ScreenShot(ScreenShot {
            path,
            name,
            fmt: "",
            rect,
            pixels: 0,
            silent: true,
            media: false,
        }))
    }

    pub fn issue_begin_registration(&self) -> Result<()> {
        self.issue(&ReliableCommand::BeginRegistration)
    }

    pub fn issue_end_registration(&self) -> Result<()> {
        self.issue(&ReliableCommand::EndRegistration)
    }

    /// Set palette entry `num`.
    pub fn issue_set_custom_color(&self, num: i32, r: i32, g: i32, b: i32) -> Result<()> {
        self.issue(&ReliableCommand::SetCustomColor { num, r, g, b })
    }

    pub fn issue_set_wall_floor_colors(&self, wall: [f32; 3], floor: [f32; 3]) -> Result<()> {
        self.issue(&ReliableCommand::SetWallFloorColors { wall, floor })
    }

    pub fn issue_set_draw_buffer(&self, draw_buffer: &str) -> Result<()> {
        self.issue(&ReliableCommand::SetDrawBuffer(draw_buffer))
    }

    pub fn issue_set_texture_mode(&self, texture_mode: &str) -> Result<()> {
        self.issue(&ReliableCommand::SetTextureMode(texture_mode))
    }

    /// Set the anisotropic filtering level.
    pub fn issue_set_texture_filter(&self, filter: i32) -> Result<()> {
        self.issue(&ReliableCommand::SetTextureFilter(filter))
    }

    pub fn issue_set_gamma(&self, gamma: f32) -> Result<()> {
        self.issue(&ReliableCommand::SetGamma(gamma))
    }

    fn display_rect(&self) -> Rect {
        let (w, h) = self.state.display_size();
        Rect::new(0, 0, w, h)
    }
}
