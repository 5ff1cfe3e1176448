use super::{Axis, FloatType, Ray, WorldPoint, WorldVector};

/// Axis aligned bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Aabb {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Aabb {
        Aabb { min, max }
    }

    /// Inverted infinite box, the neutral element for `include_range`.
    pub fn empty() -> Aabb {
        Aabb {
            min: WorldPoint::new(
                FloatType::INFINITY,
                FloatType::INFINITY,
                FloatType::INFINITY,
            ),
            max: WorldPoint::new(
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
            ),
        }
    }

    /// Grows the box so that it covers `[lo, hi]` on the given axis.
    pub fn include_range(&mut self, axis: Axis, lo: FloatType, hi: FloatType) {
        let i = axis.index();
        self.min[i] = self.min[i].min(lo);
        self.max[i] = self.max[i].max(hi);
    }

    pub fn size(&self) -> WorldVector {
        self.max - self.min
    }

    pub fn surface_area(&self) -> FloatType {
        let s = self.size();
        2.0 * (s.x * s.y + s.x * s.z + s.y * s.z)
    }

    /// Axis of greatest extent. Ties are resolved in favor of X, then Y.
    pub fn longest_axis(&self) -> Axis {
        let s = self.size();
        if s.x >= s.y && s.x >= s.z {
            Axis::X
        } else if s.y >= s.x && s.y >= s.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Clips a ray against the box using the slab test.
    ///
    /// Returns the entry and exit distances along the ray, with the entry
    /// clamped to zero when the origin lies inside the box. `None` when the
    /// ray misses the box or the box lies entirely behind the origin.
    pub fn clip_ray(&self, ray: &Ray) -> Option<(FloatType, FloatType)> {
        let mut t_near = FloatType::NEG_INFINITY;
        let mut t_far = FloatType::INFINITY;

        for i in 0..3 {
            // The multiplication is NaN if the ray starts on a slab boundary
            // and runs parallel to it; such a ray stays inside the slab, so
            // the slab must not constrain the range.
            let mut t1 = (self.min[i] - ray.origin[i]) * ray.inv_direction[i];
            let mut t2 = (self.max[i] - ray.origin[i]) * ray.inv_direction[i];
            if t1.is_nan() {
                t1 = FloatType::NEG_INFINITY;
            }
            if t2.is_nan() {
                t2 = FloatType::INFINITY;
            }

            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_near > t_far || t_far < 0.0 {
            return None;
        }

        Some((t_near.max(0.0), t_far))
    }
}
