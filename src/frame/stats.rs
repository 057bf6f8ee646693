//! Drop accounting for frame command buffers.
//!
//! Encoders never report a dropped command to their caller. Instead each
//! buffer counts its drops here, so whoever owns the buffer can notice
//! missing visuals from another thread without touching the buffer itself.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use refcmd::frame::{FrameCmdBuf, FrameCommands};
//! use refcmd::state::SharedRendererState;
//!
//! let mut cmdbuf = FrameCmdBuf::new(8, Arc::new(SharedRendererState::new()));
//! let drops = cmdbuf.drop_counters().clone();
//!
//! cmdbuf.end_frame(); // fits
//! cmdbuf.end_frame(); // buffer full, dropped
//! assert_eq!(drops.overflow_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counters of silently dropped frame commands.
///
/// Clones share the same counters and can be moved to a monitoring thread.
#[derive(Debug, Clone, Default)]
pub struct DropCounters {
    /// Commands dropped because the buffer was full.
    overflow: Arc<AtomicUsize>,
    /// Commands rejected as degenerate (no vertices, no shader, short arrays).
    degenerate: Arc<AtomicUsize>,
}

impl DropCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one overflow drop.
    #[inline]
    pub fn record_overflow(&self) {
        self.overflow.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one degenerate-input reject.
    #[inline]
    pub fn record_degenerate(&self) {
        self.degenerate.fetch_add(1, Ordering::Relaxed);
    }

    /// Commands dropped because the buffer was full.
    #[inline]
    pub fn overflow_count(&self) -> usize {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Commands rejected as degenerate.
    #[inline]
    pub fn degenerate_count(&self) -> usize {
        self.degenerate.load(Ordering::Relaxed)
    }

    /// Total dropped commands of either kind.
    #[inline]
    pub fn total(&self) -> usize {
        self.overflow_count() + self.degenerate_count()
    }

    /// Reset both counters to 0.
    pub fn reset(&self) {
        self.overflow.store(0, Ordering::Relaxed);
        self.degenerate.store(0, Ordering::Relaxed);
    }
}
