use index_vec::IndexVec;

use crate::geometry::{EPSILON, FloatType, Ray, WorldPoint};
use crate::scene::{Hit, PrimId, Primitive};

use super::{KdTree, Node, NodeId};

/// Padding added past the root box exit so that hits lying exactly on the
/// outer boundary are not dropped to rounding.
const ROOT_EXIT_PAD: FloatType = 1e-4;

impl KdTree {
    /// Nearest primitive along the ray, or `None` for a miss.
    ///
    /// Visits children front to back with the ray segment clipped at every
    /// split plane, so the first accepted hit is the globally nearest one and
    /// the traversal can stop there.
    pub fn nearest_hit(
        &self,
        primitives: &IndexVec<PrimId, Primitive>,
        ray: &Ray,
    ) -> Option<(PrimId, Hit)> {
        let (t_near, t_far) = self.bounds.clip_ray(ray)?;
        let entry = ray.point_at(t_near);
        let exit = ray.point_at(t_far + ROOT_EXIT_PAD);
        self.traverse(primitives, ray, self.root, entry, exit)
    }

    /// Whether anything blocks the ray within `max_distance`.
    pub fn occluded(
        &self,
        primitives: &IndexVec<PrimId, Primitive>,
        ray: &Ray,
        max_distance: FloatType,
    ) -> bool {
        self.nearest_hit(primitives, ray)
            .is_some_and(|(_, hit)| hit.t <= max_distance)
    }

    fn traverse(
        &self,
        primitives: &IndexVec<PrimId, Primitive>,
        ray: &Ray,
        node: NodeId,
        entry: WorldPoint,
        exit: WorldPoint,
    ) -> Option<(PrimId, Hit)> {
        match *self.arena.node(node) {
            Node::Leaf { head } => {
                // A hit past the segment's exit lies in some farther cell.
                // The primitive straddles the plane, so that cell holds it
                // too; deferring keeps the front-to-back early exit sound.
                let t_exit = (exit - ray.origin).dot(&ray.direction);
                let mut best: Option<(PrimId, Hit)> = None;
                let mut cursor = head;
                while let Some(link_id) = cursor {
                    let link = self.arena.link(link_id);
                    if let Some(hit) = primitives[link.prim].intersect(ray) {
                        if hit.t <= t_exit + EPSILON
                            && best.is_none_or(|(_, b)| hit.t < b.t)
                        {
                            best = Some((link.prim, hit));
                        }
                    }
                    cursor = link.next;
                }
                best
            }
            Node::Interior { axis, split, left } => {
                let a = axis.index();
                let right = left + 1;

                if entry[a] <= split {
                    if exit[a] <= split {
                        return self.traverse(primitives, ray, left, entry, exit);
                    }
                    let crossing = plane_crossing(&entry, &exit, split, a);
                    self.traverse(primitives, ray, left, entry, crossing)
                        .or_else(|| self.traverse(primitives, ray, right, crossing, exit))
                } else {
                    if exit[a] > split {
                        return self.traverse(primitives, ray, right, entry, exit);
                    }
                    let crossing = plane_crossing(&entry, &exit, split, a);
                    self.traverse(primitives, ray, right, entry, crossing)
                        .or_else(|| self.traverse(primitives, ray, left, crossing, exit))
                }
            }
        }
    }
}

/// Point where the entry-exit segment pierces the split plane. Only called
/// when the segment provably crosses the plane, so the interpolation
/// denominator is nonzero.
fn plane_crossing(
    entry: &WorldPoint,
    exit: &WorldPoint,
    split: FloatType,
    axis: usize,
) -> WorldPoint {
    let delta = exit - entry;
    let t = (split - entry[axis]) / delta[axis];
    let mut out = entry + delta * t;
    out[axis] = split;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Aabb, Vertex, WorldVector};
    use crate::scene::{MaterialId, bounds_of};
    use assert2::{assert, let_assert};
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn brute_force_nearest(
        primitives: &IndexVec<PrimId, Primitive>,
        ray: &Ray,
    ) -> Option<(PrimId, Hit)> {
        let mut best: Option<(PrimId, Hit)> = None;
        for (id, prim) in primitives.iter_enumerated() {
            if let Some(hit) = prim.intersect(ray) {
                if best.is_none_or(|(_, b)| hit.t < b.t) {
                    best = Some((id, hit));
                }
            }
        }
        best
    }

    fn grid_coord(v: i8) -> f32 {
        v as f32 * 0.5
    }

    fn arb_primitive() -> impl Strategy<Value = Primitive> {
        let coord = -20i8..20;
        let sphere = (coord.clone(), coord.clone(), coord.clone(), 1i8..8).prop_map(
            |(x, y, z, r)| {
                Primitive::sphere(
                    WorldPoint::new(grid_coord(x), grid_coord(y), grid_coord(z)),
                    grid_coord(r),
                    MaterialId::from_usize(0),
                )
            },
        );
        let triangle = proptest::array::uniform3((coord.clone(), coord.clone(), coord)).prop_map(
            |corners| {
                let positions = corners.map(|(x, y, z)| {
                    WorldPoint::new(grid_coord(x), grid_coord(y), grid_coord(z))
                });
                Primitive::triangle(
                    positions.map(|position| Vertex {
                        position,
                        normal: WorldVector::new(0.0, 0.0, 1.0),
                    }),
                    MaterialId::from_usize(0),
                )
            },
        );
        prop_oneof![sphere, triangle]
    }

    fn arb_ray() -> impl Strategy<Value = Ray> {
        let coord = -25i8..25;
        let dir = -10i8..=10;
        (
            coord.clone(),
            coord.clone(),
            coord,
            dir.clone(),
            dir.clone(),
            dir,
        )
            .prop_filter_map("zero direction", |(x, y, z, dx, dy, dz)| {
                if dx == 0 && dy == 0 && dz == 0 {
                    return None;
                }
                Some(Ray::new(
                    WorldPoint::new(grid_coord(x), grid_coord(y), grid_coord(z)),
                    WorldVector::new(dx as f32, dy as f32, dz as f32),
                ))
            })
    }

    /// The tree must agree with an exhaustive scan over all primitives.
    #[proptest]
    fn matches_brute_force_oracle(
        #[strategy(proptest::collection::vec(arb_primitive(), 1..24))] prims: Vec<Primitive>,
        #[strategy(proptest::collection::vec(arb_ray(), 8))] rays: Vec<Ray>,
    ) {
        let primitives: IndexVec<PrimId, Primitive> = prims.into_iter().collect();
        let bounds = bounds_of(&primitives);
        // Extremely overlappy scenes may legitimately exhaust the link pool;
        // that failure mode has its own test.
        let tree = match KdTree::build(&primitives, bounds, 6) {
            Ok(tree) => tree,
            Err(crate::scene::BuildError::LinkPoolExhausted { .. }) => return Ok(()),
            Err(other) => panic!("unexpected build failure: {other}"),
        };
        tree.validate(primitives.len());

        for ray in &rays {
            let expected = brute_force_nearest(&primitives, ray);
            let actual = tree.nearest_hit(&primitives, ray);

            match (expected, actual) {
                (None, None) => {}
                (Some((_, eh)), Some((_, ah))) => {
                    // Different primitives are acceptable only at exact ties.
                    assert!((eh.t - ah.t).abs() <= 1e-3_f32.max(eh.t * 1e-4));
                }
                (expected, actual) => {
                    panic!("oracle mismatch: expected {expected:?}, got {actual:?}");
                }
            }
        }
    }

    /// No primitive may be lost during subdivision: a ray aimed at a known
    /// surface point of each primitive must find that primitive (or an exact
    /// tie in front of it).
    #[proptest]
    fn no_primitive_is_lost(
        #[strategy(proptest::collection::vec(arb_primitive(), 1..24))] prims: Vec<Primitive>,
    ) {
        let primitives: IndexVec<PrimId, Primitive> = prims.into_iter().collect();
        let bounds = bounds_of(&primitives);
        let tree = match KdTree::build(&primitives, bounds, 6) {
            Ok(tree) => tree,
            Err(crate::scene::BuildError::LinkPoolExhausted { .. }) => return Ok(()),
            Err(other) => panic!("unexpected build failure: {other}"),
        };

        for (id, _) in primitives.iter_enumerated() {
            let origin = WorldPoint::new(-40.0, -31.0, -47.0);
            // Aim at a point known to be on or in the primitive
            let target = match &primitives[id].shape {
                crate::scene::Shape::Sphere(s) => s.center,
                crate::scene::Shape::Triangle(t) => {
                    WorldPoint::from(
                        (t.vertices[0].position.coords
                            + t.vertices[1].position.coords
                            + t.vertices[2].position.coords)
                            / 3.0,
                    )
                }
            };
            let ray = Ray::new(origin, target - origin);

            let expected = brute_force_nearest(&primitives, &ray);
            let actual = tree.nearest_hit(&primitives, &ray);
            match (expected, actual) {
                (None, None) => {}
                (Some((_, eh)), Some((_, ah))) => {
                    assert!((eh.t - ah.t).abs() <= 1e-3_f32.max(eh.t * 1e-4));
                }
                (expected, actual) => {
                    panic!("coverage mismatch: expected {expected:?}, got {actual:?}");
                }
            }
        }
    }

    #[test]
    fn empty_tree_always_misses() {
        let primitives = IndexVec::new();
        let tree = KdTree::build(&primitives, Aabb::empty(), 3).unwrap();
        let ray = Ray::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        assert!(tree.nearest_hit(&primitives, &ray) == None);
        assert!(!tree.occluded(&primitives, &ray, FloatType::INFINITY));
    }

    #[test]
    fn nearest_of_aligned_spheres_is_first_along_ray() {
        let primitives: IndexVec<PrimId, Primitive> = (0..4)
            .map(|i| {
                Primitive::sphere(
                    WorldPoint::new(i as f32 * 4.0, 0.0, 0.0),
                    1.0,
                    MaterialId::from_usize(0),
                )
            })
            .collect();
        let bounds = bounds_of(&primitives);
        let tree = KdTree::build(&primitives, bounds, 5).unwrap();

        let ray = Ray::new(
            WorldPoint::new(-5.0, 0.0, 0.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        let_assert!(Some((prim, hit)) = tree.nearest_hit(&primitives, &ray));
        assert!(prim == PrimId::from_usize(0));
        assert!((hit.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn occlusion_respects_max_distance() {
        let primitives: IndexVec<PrimId, Primitive> = std::iter::once(Primitive::sphere(
            WorldPoint::new(10.0, 0.0, 0.0),
            1.0,
            MaterialId::from_usize(0),
        ))
        .collect();
        let bounds = bounds_of(&primitives);
        let tree = KdTree::build(&primitives, bounds, 3).unwrap();

        let ray = Ray::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        assert!(tree.occluded(&primitives, &ray, 20.0));
        assert!(!tree.occluded(&primitives, &ray, 5.0));
    }

    #[test]
    fn rebuild_traverses_identically() {
        let primitives: IndexVec<PrimId, Primitive> = (0..10)
            .map(|i| {
                Primitive::sphere(
                    WorldPoint::new((i % 5) as f32 * 2.0, (i / 5) as f32 * 3.0, 0.0),
                    0.8,
                    MaterialId::from_usize(0),
                )
            })
            .collect();
        let bounds = bounds_of(&primitives);
        let first = KdTree::build(&primitives, bounds.clone(), 5).unwrap();
        let second = KdTree::build(&primitives, bounds, 5).unwrap();

        for ix in -10..10 {
            for iy in -10..10 {
                let ray = Ray::new(
                    WorldPoint::new(ix as f32, iy as f32, -10.0),
                    WorldVector::new(0.1, 0.05, 1.0),
                );
                assert!(
                    first.nearest_hit(&primitives, &ray) == second.nearest_hit(&primitives, &ray)
                );
            }
        }
    }
}
