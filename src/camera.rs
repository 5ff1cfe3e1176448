use assert2::assert;
use bon::bon;
use rand_distr::Distribution as _;

use crate::geometry::{EPSILON, FloatType, Ray, ScreenPoint, ScreenSize, WorldPoint, WorldVector};

/// Pinhole camera with an optional thin lens for depth of field.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    center: WorldPoint,
    resolution: ScreenSize,

    forward: WorldVector,
    up: WorldVector,
    right: WorldVector,

    tan_half_fov: FloatType,
    aspect: FloatType,

    /// Lens radius in world units; zero means a pure pinhole.
    aperture: FloatType,
    focus_distance: FloatType,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        center: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        resolution: ScreenSize,
        /// Vertical field of view in radians.
        vertical_fov: FloatType,
        #[builder(default = 0.0)] aperture: FloatType,
        #[builder(default = 1.0)] focus_distance: FloatType,
    ) -> Self {
        assert!(resolution.x > 0);
        assert!(resolution.y > 0);
        assert!(vertical_fov > 0.0 && vertical_fov < std::f32::consts::PI);
        assert!(aperture >= 0.0);
        assert!(focus_distance > 0.0);

        let forward = forward.normalize();
        let right = forward.cross(&up);
        assert!(
            right.norm() > EPSILON,
            "`up` and `forward` must be linearly independent"
        );
        let right = right.normalize();
        let up = right.cross(&forward);

        Camera {
            center,
            resolution,
            forward,
            up,
            right,
            tan_half_fov: (vertical_fov / 2.0).tan(),
            aspect: resolution.x as FloatType / resolution.y as FloatType,
            aperture,
            focus_distance,
        }
    }
}

impl Camera {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    /// Samples a ray through the given pixel, jittered within the pixel
    /// footprint; with a nonzero aperture the origin is additionally spread
    /// over the lens disc.
    pub fn sample_ray(&self, pixel: &ScreenPoint, rng: &mut impl rand::Rng) -> Ray {
        let film_u = pixel.x as FloatType + 0.5 + rng.random_range(-0.5..=0.5);
        let film_v = pixel.y as FloatType + 0.5 + rng.random_range(-0.5..=0.5);

        let u = 2.0 * film_u / self.resolution.x as FloatType - 1.0;
        let v = 1.0 - 2.0 * film_v / self.resolution.y as FloatType;

        // Forward component is exactly 1, so scaling by `focus_distance`
        // lands on the focal plane.
        let direction = self.forward
            + self.right * (u * self.tan_half_fov * self.aspect)
            + self.up * (v * self.tan_half_fov);

        if self.aperture == 0.0 {
            return Ray::new(self.center, direction);
        }

        let focal_point = self.center + direction * self.focus_distance;
        let lens_uv: [FloatType; 2] = rand_distr::UnitDisc.sample(rng);
        let origin = self.center
            + self.right * (lens_uv[0] * self.aperture)
            + self.up * (lens_uv[1] * self.aperture);

        Ray::new(origin, focal_point - origin)
    }
}
