mod integrator;
mod machinery;
pub(crate) mod sampling;
pub mod work_queue;
mod worker;

pub use machinery::{Progress, RenderError, RenderProgress, render};

use std::num::{NonZeroU32, NonZeroUsize};

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    pub tile_size: NonZeroU32,
    pub sample_count: NonZeroU32,

    /// Path depth cutoff of the integrator.
    pub max_depth: usize,

    /// Base seed. Every tile derives its own random stream from this, so the
    /// rendered image does not depend on the worker count.
    pub seed: u64,

    /// Fixed worker count; `None` uses one worker per logical CPU.
    pub thread_count: Option<NonZeroUsize>,

    pub direct_lighting: bool,
    pub indirect_lighting: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            tile_size: const { NonZeroU32::new(64).unwrap() },
            sample_count: const { NonZeroU32::new(16).unwrap() },
            max_depth: 3,
            seed: 0,
            thread_count: None,
            direct_lighting: true,
            indirect_lighting: true,
        }
    }
}
