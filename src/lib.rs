//! # refcmd
//!
//! Command transport between a game thread and a render thread.
//!
//! ## Architecture
//!
//! - **Frame commands**: drawing and scene requests packed into a
//!   [`FrameCmdBuf`] by the game thread, replayed in order into a
//!   [`FrameBackend`] by the render thread, then cleared. Best effort: a
//!   command that does not fit is dropped.
//! - **Reliable commands**: lifecycle and settings requests pushed through an
//!   ordered [`CommandPipe`] and never dropped.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use refcmd::frame::{FrameCmdBuf, FrameCommands};
//! use refcmd::scene::Rect;
//! use refcmd::state::SharedRendererState;
//!
//! let state = Arc::new(SharedRendererState::new());
//! let mut cmdbuf = FrameCmdBuf::new(64 * 1024, state);
//!
//! cmdbuf.begin_frame(0.0, true, false);
//! cmdbuf.set_scissor(Rect::new(0, 0, 640, 480));
//! cmdbuf.end_frame();
//!
//! assert_eq!(cmdbuf.records().count(), 3);
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod reliable;
pub mod scene;
pub mod state;
pub mod transport;
pub mod worker;

pub use config::{CmdQueueConfig, ShutdownPolicy};
pub use error::{CmdQueueError, Result};
pub use frame::{DropCounters, FrameBackend, FrameCmdBuf, FrameCommands, RunReport};
pub use reliable::{dispatch_reliable, ReliableBackend, ReliableIssuer};
pub use state::{RendererState, SharedRendererState};
pub use transport::{buf_pipe, CommandPipe, PipeReader, PipeWriter};
pub use worker::{spawn_reliable_worker, ReliableWorker};
