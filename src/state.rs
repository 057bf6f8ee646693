//! Renderer state read by both threads.
//!
//! The producer samples it while encoding (generation counters, area and
//! bone counts, display size). The consumer compares the captured generation
//! counters against the current ones before replaying a render-scene record.
//!
//! [`SharedRendererState`] is the stock implementation: atomics for the hot
//! counters so neither side ever waits on the other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::scene::ModelHandle;

/// Snapshot of the two registration generation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations {
    /// Bumped every time asset registration begins.
    pub registration: u32,
    /// Bumped every time a new world model is loaded.
    pub world_model: u32,
}

/// Read access to backend state needed by the encoders and the dispatcher.
pub trait RendererState: Send + Sync {
    /// Current registration generation.
    fn registration_sequence(&self) -> u32;

    /// Current world-model generation.
    fn world_model_sequence(&self) -> u32;

    /// Number of areas in the loaded world, `None` if no world is loaded.
    fn world_area_count(&self) -> Option<u32>;

    /// Number of skeletal bones of `model`, 0 for non-skeletal models.
    fn bone_count(&self, model: ModelHandle) -> u32;

    /// Current display surface size in pixels.
    fn display_size(&self) -> (i32, i32);

    /// Both generation counters at once.
    fn generations(&self) -> Generations {
        Generations {
            registration: self.registration_sequence(),
            world_model: self.world_model_sequence(),
        }
    }
}

/// Thread-safe [`RendererState`] shared through an `Arc`.
#[derive(Debug, Default)]
pub struct SharedRendererState {
    registration_sequence: AtomicU32,
    world_model_sequence: AtomicU32,
    /// 0 = no world loaded, otherwise area count + 1.
    world_areas: AtomicU32,
    display_width: AtomicI32,
    display_height: AtomicI32,
    bone_counts: RwLock<HashMap<ModelHandle, u32>>,
}

impl SharedRendererState {
    /// Create state with both generations at 1 and no world loaded.
    pub fn new() -> Self {
        Self {
            registration_sequence: AtomicU32::new(1),
            world_model_sequence: AtomicU32::new(1),
            ..Self::default()
        }
    }

    /// Start a new registration generation. Returns the new value.
    pub fn advance_registration(&self) -> u32 {
        self.registration_sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Install a new world model with `area_count` areas (`None` unloads).
    ///
    /// Returns the new world-model generation.
    pub fn advance_world_model(&self, area_count: Option<u32>) -> u32 {
        let encoded = area_count.map_or(0, |n| n.saturating_add(1));
        self.world_areas.store(encoded, Ordering::Release);
        self.world_model_sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record the skeleton size of a registered model.
    pub fn set_bone_count(&self, model: ModelHandle, bones: u32) {
        let mut counts = self
            .bone_counts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if bones == 0 {
            counts.remove(&model);
        } else {
            counts.insert(model, bones);
        }
    }

    /// Update the display surface size.
    pub fn set_display_size(&self, width: i32, height: i32) {
        self.display_width.store(width, Ordering::Release);
        self.display_height.store(height, Ordering::Release);
    }
}

impl RendererState for SharedRendererState {
    fn registration_sequence(&self) -> u32 {
        self.registration_sequence.load(Ordering::Acquire)
    }

    fn world_model_sequence(&self) -> u32 {
        self.world_model_sequence.load(Ordering::Acquire)
    }

    fn world_area_count(&self) -> Option<u32> {
        match self.world_areas.load(Ordering::Acquire) {
            0 => None,
            n => Some(n - 1),
        }
    }

    fn bone_count(&self, model: ModelHandle) -> u32 {
        self.bone_counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&model)
            .copied()
            .unwrap_or(0)
    }

    fn display_size(&self) -> (i32, i32) {
        (
            self.display_width.load(Ordering::Acquire),
            self.display_height.load(Ordering::Acquire),
        )
    }
}
