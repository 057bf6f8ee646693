//! Reliable command family.
//!
//! Administrative commands (backend lifecycle, surface changes, captures,
//! registration, global render settings) that must never be dropped. Each
//! one is a fixed-size record pushed onto a [`CommandPipe`] as a single
//! write; ordering comes from the pipe, not from this module.
//!
//! [`CommandPipe`]: crate::transport::CommandPipe

mod dispatch;
mod issue;
mod record;

pub use dispatch::{dispatch_reliable, ReliableBackend};
pub use issue::ReliableIssuer;
pub use record::{
    ReliableCommand, ScreenShot, DRAW_BUFFER_WIDTH, FMT_WIDTH, NAME_WIDTH, PATH_WIDTH,
    TEXTURE_MODE_WIDTH,
};
