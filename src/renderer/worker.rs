use rand::SeedableRng as _;
use rand::rngs::SmallRng;

use crate::camera::Camera;
use crate::scene::Scene;
use crate::screen_block::ScreenBlock;
use crate::util::{BLACK, Rgb};

use super::RenderSettings;
use super::integrator;

/// Renders one tile into `out` (row-major, one entry per pixel).
///
/// The random stream is derived from the settings seed and the tile origin,
/// never from the calling thread, so a tile renders identically no matter
/// which worker picks it up.
pub(super) fn render_tile(
    scene: &Scene,
    camera: &Camera,
    settings: &RenderSettings,
    tile: &ScreenBlock,
    out: &mut Vec<Rgb>,
) {
    let mut rng = SmallRng::seed_from_u64(tile_seed(settings.seed, tile));
    let sample_count = settings.sample_count.get();

    out.clear();
    for point in tile.internal_points() {
        let mut sum = BLACK;
        for _ in 0..sample_count {
            let ray = camera.sample_ray(&point, &mut rng);
            sum += integrator::trace(scene, settings, &ray, 0, &mut rng);
        }
        out.push(sum * (1.0 / sample_count as f32));
    }
}

/// splitmix64 over the seed and the tile origin, so neighboring tiles get
/// uncorrelated streams.
fn tile_seed(seed: u64, tile: &ScreenBlock) -> u64 {
    let mut x = seed ^ (((tile.min.x as u64) << 32) | tile.min.y as u64);
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ScreenPoint, ScreenSize, WorldPoint, WorldVector};
    use assert2::assert;

    fn test_camera() -> Camera {
        Camera::builder()
            .center(WorldPoint::new(0.0, 3.0, -2.9))
            .forward(WorldVector::new(0.0, -0.2, 1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .resolution(ScreenSize::new(16, 16))
            .vertical_fov(70f32.to_radians())
            .build()
    }

    fn fast_settings(seed: u64) -> RenderSettings {
        RenderSettings {
            tile_size: 8.try_into().unwrap(),
            sample_count: 2.try_into().unwrap(),
            max_depth: 2,
            seed,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn tiles_render_deterministically() {
        let scene = Scene::reference().unwrap();
        let camera = test_camera();
        let tile = ScreenBlock::new(ScreenPoint::new(0, 8), ScreenPoint::new(8, 16));

        let mut first = Vec::new();
        let mut second = Vec::new();
        render_tile(&scene, &camera, &fast_settings(42), &tile, &mut first);
        render_tile(&scene, &camera, &fast_settings(42), &tile, &mut second);

        assert!(first.len() == tile.area() as usize);
        assert!(first == second);
    }

    #[test]
    fn seed_changes_the_image() {
        let scene = Scene::reference().unwrap();
        let camera = test_camera();
        let tile = ScreenBlock::new(ScreenPoint::new(0, 0), ScreenPoint::new(8, 8));

        let mut a = Vec::new();
        let mut b = Vec::new();
        render_tile(&scene, &camera, &fast_settings(1), &tile, &mut a);
        render_tile(&scene, &camera, &fast_settings(2), &tile, &mut b);

        assert!(a != b);
    }

    #[test]
    fn tile_seeds_differ_between_tiles() {
        let a = ScreenBlock::new(ScreenPoint::new(0, 0), ScreenPoint::new(8, 8));
        let b = ScreenBlock::new(ScreenPoint::new(8, 0), ScreenPoint::new(16, 8));
        let c = ScreenBlock::new(ScreenPoint::new(0, 8), ScreenPoint::new(8, 16));

        assert!(tile_seed(7, &a) != tile_seed(7, &b));
        assert!(tile_seed(7, &a) != tile_seed(7, &c));
        assert!(tile_seed(7, &b) != tile_seed(7, &c));
    }
}
