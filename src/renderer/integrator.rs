use rand::Rng;

use crate::geometry::{FloatType, Ray, Vertex};
use crate::scene::{Material, Scene};
use crate::util::{BLACK, Rgb, modulate};

use super::RenderSettings;
use super::sampling;

/// Offset along the surface normal for secondary rays, so a surface does not
/// occlude or re-intersect itself.
const SHADOW_EPSILON: FloatType = 1e-3;

/// Estimates the radiance arriving along `ray`: emission at the hit point,
/// plus shadow-tested direct lighting, plus one Russian roulette bounce of
/// indirect lighting. Path depth and the two lighting terms are bounded and
/// toggled by the settings.
pub(super) fn trace(
    scene: &Scene,
    settings: &RenderSettings,
    ray: &Ray,
    depth: usize,
    rng: &mut impl Rng,
) -> Rgb {
    if depth >= settings.max_depth {
        return scene.background();
    }
    let Some((prim_id, hit)) = scene.nearest_hit(ray) else {
        return scene.background();
    };

    let prim = scene.primitive(prim_id);
    let vertex = prim.shading_vertex(&hit, ray);
    let material = scene.material(prim.material);

    let mut out = material.emittance;
    if settings.direct_lighting {
        out += direct_lighting(scene, ray, &vertex, material);
    }
    if settings.indirect_lighting {
        out += indirect_lighting(scene, settings, ray, &vertex, material, depth, rng);
    }
    out
}

/// Sum of the BRDF weighted contributions of every light that is visible
/// from the hit point.
fn direct_lighting(scene: &Scene, ray: &Ray, vertex: &Vertex, material: &Material) -> Rgb {
    let mut out = BLACK;
    let origin = vertex.position + vertex.normal * SHADOW_EPSILON;

    for light in scene.lights() {
        let Some((direction, distance)) = light.towards(&vertex.position) else {
            continue;
        };
        let shadow_ray = Ray::new(origin, direction);
        // Directional lights report an infinite distance, which tests the
        // whole unbounded ray.
        if scene.occluded(&shadow_ray, distance + SHADOW_EPSILON) {
            continue;
        }
        out += light.lighting(ray, vertex, material);
    }
    out
}

/// One bounce chosen by Russian roulette between the diffuse and specular
/// channels; the remaining probability mass absorbs the path. Dividing by
/// the channel probability keeps the estimator unbiased.
fn indirect_lighting(
    scene: &Scene,
    settings: &RenderSettings,
    ray: &Ray,
    vertex: &Vertex,
    material: &Material,
    depth: usize,
    rng: &mut impl Rng,
) -> Rgb {
    let origin = vertex.position + vertex.normal * SHADOW_EPSILON;
    let e: FloatType = rng.random();

    if e < material.kd {
        let direction = sampling::cosine_hemisphere(rng, &vertex.normal);
        let bounce = Ray::new(origin, direction);
        let radiance = trace(scene, settings, &bounce, depth + 1, rng);
        // The cosine weighted pdf cancels the BRDF's cosine term; only the
        // channel probability is left to divide out.
        modulate(material.diffuse, radiance) * (1.0 / material.kd)
    } else if e < material.kd + material.ks {
        let mirror = sampling::reflect(&-ray.direction, &vertex.normal);
        let direction = sampling::phong_lobe(rng, &mirror, material.shine);
        let cos = direction.dot(&vertex.normal);
        if cos <= 0.0 {
            // Sample fell below the surface
            return BLACK;
        }
        let bounce = Ray::new(origin, direction);
        let radiance = trace(scene, settings, &bounce, depth + 1, rng);
        let weight = (material.shine + 2.0) / (material.shine + 1.0) * cos / material.ks;
        modulate(material.specular, radiance) * weight
    } else {
        BLACK
    }
}
