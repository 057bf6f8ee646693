//! Transport module - the ordered pipe carrying reliable commands.
//!
//! [`CommandPipe`] is the boundary the reliable encoders write to; `BufPipe`
//! ([`buf_pipe`]) is the in-process implementation over a tokio channel.

mod pipe;

pub use pipe::{buf_pipe, CommandPipe, PipeReader, PipeWriter};
