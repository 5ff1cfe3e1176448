use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::camera::Camera;
use crate::framebuffer::FrameBuffer;
use crate::scene::Scene;
use crate::screen_block::ScreenBlock;

use super::RenderSettings;
use super::work_queue::WorkQueue;
use super::worker;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to spawn render worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("a render worker panicked")]
    WorkerPanicked,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub finished: usize,
    pub total: usize,
}

/// Starts rendering the whole frame on a fixed worker pool and returns
/// immediately; track or block on the result through [`RenderProgress`].
///
/// The image is split into tiles which are submitted to a shared queue up
/// front; each worker thread, pinned to a CPU core where the platform
/// reports them, claims and renders tiles until the queue drains or the
/// render is aborted between tiles.
pub fn render<F1, F2>(
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,
    started_tile_callback: F1,
    finished_tile_callback: F2,
) -> Result<RenderProgress, RenderError>
where
    F1: Fn(ScreenBlock) + Send + Sync + 'static,
    F2: Fn(ScreenBlock) + Send + Sync + 'static,
{
    let tiles = ScreenBlock::from_size(camera.resolution()).tiles(settings.tile_size);
    let total_tiles = tiles.len();

    let state = Arc::new(RenderState {
        scene,
        camera,
        settings,
        frame: Mutex::new(FrameBuffer::new(camera.resolution())),
        queue: WorkQueue::new(),
        cancelled: AtomicBool::new(false),
        finished_tiles: AtomicUsize::new(0),
        total_tiles,
    });
    for tile in tiles {
        state.queue.submit(tile);
    }

    let worker_count = settings
        .thread_count
        .map(|count| count.get())
        .unwrap_or_else(num_cpus::get)
        .max(1);
    let cores = core_affinity::get_core_ids().unwrap_or_default();
    log::debug!("rendering {total_tiles} tiles on {worker_count} workers");

    let started_tile_callback = Arc::new(started_tile_callback);
    let finished_tile_callback = Arc::new(finished_tile_callback);

    let tile_size = settings.tile_size.get() as usize;
    let threads = (0..worker_count)
        .map(|worker_id| {
            let state = Arc::clone(&state);
            let started_tile_callback = Arc::clone(&started_tile_callback);
            let finished_tile_callback = Arc::clone(&finished_tile_callback);
            let core = cores.get(worker_id % cores.len().max(1)).copied();

            thread::Builder::new()
                .name(format!("worker{worker_id}"))
                .spawn(move || {
                    if let Some(core) = core {
                        core_affinity::set_for_current(core);
                    }

                    let mut tile_buffer = Vec::with_capacity(tile_size * tile_size);
                    while !state.cancelled.load(Ordering::Acquire) {
                        let Some(work) = state.queue.try_claim() else {
                            break;
                        };
                        let tile = *work.payload();
                        (started_tile_callback)(tile);

                        worker::render_tile(
                            &state.scene,
                            &state.camera,
                            &state.settings,
                            &tile,
                            &mut tile_buffer,
                        );
                        state
                            .frame
                            .lock()
                            .expect("Poisoned lock!")
                            .write_tile(&tile, &tile_buffer);

                        state.finished_tiles.fetch_add(1, Ordering::AcqRel);
                        work.complete();
                        (finished_tile_callback)(tile);
                    }
                })
                .map_err(RenderError::Spawn)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RenderProgress {
        render_state: state,
        threads,
    })
}

pub struct RenderProgress {
    render_state: Arc<RenderState>,
    threads: Vec<JoinHandle<()>>,
}

impl RenderProgress {
    pub fn progress(&self) -> Progress {
        Progress {
            finished: self
                .render_state
                .finished_tiles
                .load(Ordering::Acquire)
                .min(self.render_state.total_tiles),
            total: self.render_state.total_tiles,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|handle| handle.is_finished())
    }

    /// Signals the workers to abort. Tiles already being rendered still
    /// finish, queued ones are discarded.
    pub fn abort(&self) {
        self.render_state.cancelled.store(true, Ordering::Release);
        while let Some(_discarded) = self.render_state.queue.try_claim() {}
    }

    /// Access to the partially rendered frame, for progress previews.
    pub fn frame(&self) -> &Mutex<FrameBuffer> {
        &self.render_state.frame
    }

    /// Blocks until every submitted tile is accounted for, joins the
    /// workers and hands back the finished frame.
    pub fn wait(mut self) -> Result<FrameBuffer, RenderError> {
        self.render_state.queue.wait_idle();
        for handle in self.threads.drain(..) {
            handle.join().map_err(|_| RenderError::WorkerPanicked)?;
        }

        let state = Arc::into_inner(self.render_state)
            .unwrap_or_else(|| unreachable!("all worker threads were joined"));
        Ok(state.frame.into_inner().expect("Poisoned lock!"))
    }
}

struct RenderState {
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,

    frame: Mutex<FrameBuffer>,

    queue: WorkQueue<ScreenBlock>,
    cancelled: AtomicBool,
    finished_tiles: AtomicUsize,
    total_tiles: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ScreenPoint, ScreenSize, WorldPoint, WorldVector};
    use assert2::assert;
    use std::num::NonZeroUsize;

    fn test_camera(resolution: ScreenSize) -> Camera {
        Camera::builder()
            .center(WorldPoint::new(0.0, 3.0, -2.9))
            .forward(WorldVector::new(0.0, -0.2, 1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .resolution(resolution)
            .vertical_fov(70f32.to_radians())
            .build()
    }

    fn fast_settings(threads: Option<usize>) -> RenderSettings {
        RenderSettings {
            tile_size: 8.try_into().unwrap(),
            sample_count: 2.try_into().unwrap(),
            max_depth: 2,
            seed: 1234,
            thread_count: threads.map(|t| NonZeroUsize::new(t).unwrap()),
            ..RenderSettings::default()
        }
    }

    fn render_to_frame(threads: Option<usize>) -> FrameBuffer {
        let scene = Scene::reference().unwrap();
        let camera = test_camera(ScreenSize::new(16, 16));
        let progress = render(scene, camera, fast_settings(threads), |_| {}, |_| {}).unwrap();
        progress.wait().unwrap()
    }

    /// A 4-worker pool over the 4 tiles of a 16x16 frame must produce the
    /// same pixels as a single worker, and as direct sequential
    /// `render_tile` calls over the same rectangles.
    #[test]
    fn pool_matches_sequential_rendering() {
        let pooled = render_to_frame(Some(4));
        let single = render_to_frame(Some(1));
        assert!(pooled == single);

        let scene = Scene::reference().unwrap();
        let camera = test_camera(ScreenSize::new(16, 16));
        let settings = fast_settings(None);
        let mut manual = FrameBuffer::new(ScreenSize::new(16, 16));
        let mut tile_buffer = Vec::new();
        for (x, y) in [(0u32, 0u32), (8, 0), (0, 8), (8, 8)] {
            let tile = ScreenBlock::new(ScreenPoint::new(x, y), ScreenPoint::new(x + 8, y + 8));
            worker::render_tile(&scene, &camera, &settings, &tile, &mut tile_buffer);
            manual.write_tile(&tile, &tile_buffer);
        }
        assert!(pooled == manual);
    }

    #[test]
    fn every_pixel_is_written() {
        let frame = render_to_frame(Some(3));
        // The camera is inside a closed, lit room; most of the center row
        // must have picked up some radiance (shadowed spots may stay black
        // at this sample count).
        let mut lit = 0;
        for x in 0..16 {
            let pixel = frame.pixel(x, 8);
            if pixel.r + pixel.g + pixel.b > 0.0 {
                lit += 1;
            }
        }
        assert!(lit > 4);
    }

    #[test]
    fn callbacks_fire_once_per_tile() {
        let scene = Scene::reference().unwrap();
        let camera = test_camera(ScreenSize::new(16, 16));

        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let progress = render(
            scene,
            camera,
            fast_settings(Some(2)),
            {
                let started = Arc::clone(&started);
                move |_| {
                    started.fetch_add(1, Ordering::AcqRel);
                }
            },
            {
                let finished = Arc::clone(&finished);
                move |_| {
                    finished.fetch_add(1, Ordering::AcqRel);
                }
            },
        )
        .unwrap();

        let total = progress.progress().total;
        progress.wait().unwrap();
        assert!(total == 4);
        assert!(started.load(Ordering::Acquire) == 4);
        assert!(finished.load(Ordering::Acquire) == 4);
    }

    #[test]
    fn abort_discards_queued_tiles() {
        let scene = Scene::reference().unwrap();
        // Plenty of tiles so some are still queued when we abort
        let camera = test_camera(ScreenSize::new(64, 64));
        let progress = render(scene, camera, fast_settings(Some(1)), |_| {}, |_| {}).unwrap();

        progress.abort();
        let frame = progress.wait().unwrap();
        assert!(frame.size() == ScreenSize::new(64, 64));
    }
}
