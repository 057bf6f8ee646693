//! Command queue configuration.
//!
//! Loaded from JSON or built in code:
//!
//! ```
//! use refcmd::config::{CmdQueueConfig, ShutdownPolicy};
//!
//! let config = CmdQueueConfig::from_json_str(
//!     r#"{ "frame_buffer_capacity": 65536, "shutdown_policy": "cancel" }"#,
//! )
//! .unwrap();
//! assert_eq!(config.frame_buffer_capacity, 65536);
//! assert_eq!(config.shutdown_policy, ShutdownPolicy::Cancel);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CmdQueueError, Result};
use crate::protocol::{align_up, HEADER_SIZE, RECORD_ALIGN};

/// Default frame buffer capacity (256 KiB).
pub const DEFAULT_FRAME_BUFFER_CAPACITY: usize = 256 * 1024;

/// What happens to the reliable worker task when its owner shuts it down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Detach the task and let it drain until the pipe closes.
    #[default]
    Leak,
    /// Abort the task at its next await point, between two records.
    Cancel,
}

/// Settings for a frame command buffer and its reliable worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmdQueueConfig {
    /// Frame buffer size in bytes.
    pub frame_buffer_capacity: usize,
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for CmdQueueConfig {
    fn default() -> Self {
        Self {
            frame_buffer_capacity: DEFAULT_FRAME_BUFFER_CAPACITY,
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl CmdQueueConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Set the frame buffer capacity.
    pub fn with_frame_buffer_capacity(mut self, capacity: usize) -> Self {
        self.frame_buffer_capacity = capacity;
        self
    }

    /// Set the reliable worker shutdown policy.
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Check that the capacity can hold at least one record and that record
    /// lengths fit in 32 bits.
    pub fn validate(&self) -> Result<()> {
        let min = align_up(HEADER_SIZE, RECORD_ALIGN);
        if self.frame_buffer_capacity < min {
            return Err(CmdQueueError::Config(format!(
                "frame_buffer_capacity {} is below the minimum record size {}",
                self.frame_buffer_capacity, min
            )));
        }
        if self.frame_buffer_capacity > u32::MAX as usize {
            return Err(CmdQueueError::Config(format!(
                "frame_buffer_capacity {} exceeds {}",
                self.frame_buffer_capacity,
                u32::MAX
            )));
        }
        Ok(())
    }
}
