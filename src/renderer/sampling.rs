use std::f32::consts::TAU;

use rand::Rng;

use crate::geometry::{FloatType, WorldVector};

/// Mirror reflection of `v` about the normal. `v` must point away from the
/// surface.
pub fn reflect(v: &WorldVector, normal: &WorldVector) -> WorldVector {
    normal * (2.0 * v.dot(normal)) - v
}

/// Orthonormal tangent and binormal completing a unit normal to a frame.
/// The tangent is built from the normal's smallest component, which keeps
/// the construction away from the degenerate parallel case.
pub fn tangent_basis(normal: &WorldVector) -> (WorldVector, WorldVector) {
    let abs = normal.abs();
    let tangent = if abs.x <= abs.y && abs.x <= abs.z {
        WorldVector::new(0.0, -normal.z, normal.y)
    } else if abs.y <= abs.z {
        WorldVector::new(-normal.z, 0.0, normal.x)
    } else {
        WorldVector::new(-normal.y, normal.x, 0.0)
    }
    .normalize();
    let binormal = normal.cross(&tangent);
    (tangent, binormal)
}

/// Cosine weighted direction on the hemisphere around a unit normal.
pub fn cosine_hemisphere(rng: &mut impl Rng, normal: &WorldVector) -> WorldVector {
    let r1: FloatType = rng.random();
    let r2: FloatType = rng.random();

    let cos_theta = r1.sqrt();
    let sin_theta = (1.0 - r1).sqrt();
    let phi = TAU * r2;

    let (tangent, binormal) = tangent_basis(normal);
    tangent * (sin_theta * phi.cos()) + binormal * (sin_theta * phi.sin()) + normal * cos_theta
}

/// Direction from the Phong lobe `cos^shine` around a unit axis, typically
/// the mirror reflection direction. May fall below the shaded surface; the
/// caller rejects those samples.
pub fn phong_lobe(rng: &mut impl Rng, axis: &WorldVector, shine: FloatType) -> WorldVector {
    let r1: FloatType = rng.random();
    let r2: FloatType = rng.random();

    let cos_theta = r1.powf(1.0 / (shine + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = TAU * r2;

    let (tangent, binormal) = tangent_basis(axis);
    tangent * (sin_theta * phi.cos()) + binormal * (sin_theta * phi.sin()) + axis * cos_theta
}
