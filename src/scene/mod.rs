pub mod kd_tree;
mod light;
mod primitive;
mod reference;

pub use kd_tree::{BuildError, KdTree, TreeStatistics};
pub use light::Light;
pub use primitive::{Hit, Primitive, Shape, Sphere, Triangle};

use index_vec::IndexVec;
use thiserror::Error;

use crate::geometry::{Aabb, Axis, FloatType, Ray};
use crate::util::Rgb;

index_vec::define_index_type! {
    pub struct PrimId = u32;
}

index_vec::define_index_type! {
    pub struct MaterialId = u32;
}

/// Surface description: Lambert diffuse and Phong specular lobes plus
/// emission. `kd`/`ks` are the channel selection probabilities of the
/// indirect estimator; their sum must not exceed 1, the remainder is the
/// absorption probability.
#[derive(Copy, Clone, Debug)]
pub struct Material {
    pub diffuse: Rgb,
    pub specular: Rgb,
    pub emittance: Rgb,
    pub kd: FloatType,
    pub ks: FloatType,
    pub shine: FloatType,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("primitive {prim:?} references unknown material {material:?}")]
    UnknownMaterial { prim: PrimId, material: MaterialId },

    #[error("material {material:?} has kd + ks = {sum}, which would gain energy")]
    ReflectanceBudgetExceeded { material: MaterialId, sum: FloatType },

    #[error(transparent)]
    Index(#[from] BuildError),
}

/// A fully prepared scene: primitives with materials and lights, plus the
/// kd-tree index built over them. Read-only once constructed, so it can be
/// shared freely between render workers.
pub struct Scene {
    primitives: IndexVec<PrimId, Primitive>,
    materials: IndexVec<MaterialId, Material>,
    lights: Vec<Light>,
    background: Rgb,
    bounds: Aabb,
    index: KdTree,
}

impl Scene {
    pub fn new(
        primitives: Vec<Primitive>,
        materials: Vec<Material>,
        lights: Vec<Light>,
        background: Rgb,
        max_tree_depth: usize,
    ) -> Result<Scene, SceneError> {
        let primitives: IndexVec<PrimId, Primitive> = primitives.into_iter().collect();
        let materials: IndexVec<MaterialId, Material> = materials.into_iter().collect();

        for (id, prim) in primitives.iter_enumerated() {
            if prim.material.index() >= materials.len() {
                return Err(SceneError::UnknownMaterial {
                    prim: id,
                    material: prim.material,
                });
            }
        }
        for (id, material) in materials.iter_enumerated() {
            let sum = material.kd + material.ks;
            if sum > 1.0 + 1e-6 {
                return Err(SceneError::ReflectanceBudgetExceeded { material: id, sum });
            }
        }

        let bounds = bounds_of(&primitives);
        let index = KdTree::build(&primitives, bounds.clone(), max_tree_depth)?;

        Ok(Scene {
            primitives,
            materials,
            lights,
            background,
            bounds,
            index,
        })
    }

    pub fn nearest_hit(&self, ray: &Ray) -> Option<(PrimId, Hit)> {
        self.index.nearest_hit(&self.primitives, ray)
    }

    pub fn occluded(&self, ray: &Ray, max_distance: FloatType) -> bool {
        self.index.occluded(&self.primitives, ray, max_distance)
    }

    pub fn primitive(&self, id: PrimId) -> &Primitive {
        &self.primitives[id]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn index_statistics(&self) -> TreeStatistics {
        self.index.statistics()
    }
}

/// Scene bounds from per-axis primitive extents.
fn bounds_of(primitives: &IndexVec<PrimId, Primitive>) -> Aabb {
    let mut bounds = Aabb::empty();
    for prim in primitives.iter() {
        for axis in Axis::ALL {
            let (min, max) = prim.axis_range(axis);
            bounds.include_range(axis, min, max);
        }
    }
    bounds
}
