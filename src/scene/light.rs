use std::f32::consts::PI;

use crate::geometry::{EPSILON, Ray, Vertex, WorldPoint, WorldVector};
use crate::renderer::sampling::reflect;
use crate::util::{BLACK, Rgb, modulate};

use super::Material;

#[derive(Copy, Clone, Debug)]
pub enum Light {
    Point {
        position: WorldPoint,
        intensity: Rgb,
    },
    Directional {
        /// Direction the light shines towards, unit length.
        direction: WorldVector,
        intensity: Rgb,
    },
}

impl Light {
    /// Unit vector from the surface point towards the light, together with
    /// the distance to the light. `None` for degenerate zero-length vectors.
    pub fn towards(&self, from: &WorldPoint) -> Option<(WorldVector, f32)> {
        match self {
            Light::Point { position, .. } => {
                let to_light = position - from;
                let distance = to_light.norm();
                if distance < EPSILON {
                    return None;
                }
                Some((to_light / distance, distance))
            }
            Light::Directional { direction, .. } => Some((-direction, f32::INFINITY)),
        }
    }

    /// Radiance reflected towards the viewer from an unoccluded light:
    /// Lambert diffuse plus a Phong specular lobe, with inverse square
    /// falloff for point lights.
    pub fn lighting(&self, ray: &Ray, vertex: &Vertex, material: &Material) -> Rgb {
        let (to_light, attenuation) = match self {
            Light::Point { position, .. } => {
                let to_light = position - vertex.position;
                let len_sq = to_light.norm_squared();
                if len_sq < EPSILON {
                    return BLACK;
                }
                (to_light / len_sq.sqrt(), 1.0 / len_sq)
            }
            Light::Directional { direction, .. } => (-direction, 1.0),
        };
        let intensity = match self {
            Light::Point { intensity, .. } | Light::Directional { intensity, .. } => *intensity,
        };

        // diffuse
        let cos = vertex.normal.dot(&to_light);
        if cos <= 0.0 {
            return BLACK;
        }
        let mut out = modulate(material.diffuse * (1.0 / PI), intensity * (cos * attenuation));

        // specular
        let mirror = reflect(&-ray.direction, &vertex.normal);
        let cos_spec = mirror.dot(&to_light);
        if cos_spec <= 0.0 {
            return out;
        }
        let brdf =
            material.specular * ((material.shine + 2.0) / (2.0 * PI) * cos_spec.powf(material.shine));
        out += modulate(brdf, intensity) * attenuation;

        out
    }
}
