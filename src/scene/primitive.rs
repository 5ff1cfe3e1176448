use arrayvec::ArrayVec;

use crate::geometry::{Aabb, Axis, EPSILON, FloatType, Ray, Vertex, WorldPoint, WorldVector};

use super::MaterialId;

/// Ray hit parameters. `u`/`v` are barycentric weights of the second and
/// third triangle vertex; spheres leave them at zero.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Hit {
    pub t: FloatType,
    pub u: FloatType,
    pub v: FloatType,
}

#[derive(Copy, Clone, Debug)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
}

#[derive(Copy, Clone, Debug)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    /// Face normal, unit length. Winding is counterclockwise seen from the
    /// front side; back faces are culled by the ray test.
    pub normal: WorldVector,
}

impl Triangle {
    /// Builds a triangle, deriving the face normal from the winding.
    pub fn new(vertices: [Vertex; 3]) -> Triangle {
        let e0 = vertices[1].position - vertices[0].position;
        let e1 = vertices[2].position - vertices[0].position;
        let normal = e0.cross(&e1).normalize();
        Triangle { vertices, normal }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
}

/// A renderable shape with its material reference. Immutable once the scene
/// is constructed; the kd-tree and hits refer to primitives by index.
#[derive(Copy, Clone, Debug)]
pub struct Primitive {
    pub shape: Shape,
    pub material: MaterialId,
}

impl Primitive {
    pub fn sphere(center: WorldPoint, radius: FloatType, material: MaterialId) -> Primitive {
        Primitive {
            shape: Shape::Sphere(Sphere { center, radius }),
            material,
        }
    }

    pub fn triangle(vertices: [Vertex; 3], material: MaterialId) -> Primitive {
        Primitive {
            shape: Shape::Triangle(Triangle::new(vertices)),
            material,
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        match &self.shape {
            Shape::Sphere(sphere) => intersect_sphere(sphere, ray),
            Shape::Triangle(triangle) => intersect_triangle(triangle, ray),
        }
    }

    /// True geometric overlap test against a box, used by the kd-tree
    /// builder to decide which side(s) of a split plane a primitive needs.
    pub fn overlaps_box(&self, aabb: &Aabb) -> bool {
        match &self.shape {
            Shape::Sphere(sphere) => sphere_overlaps_box(sphere, aabb),
            Shape::Triangle(triangle) => triangle_overlaps_box(triangle, aabb),
        }
    }

    /// Extent of the primitive along one axis.
    pub fn axis_range(&self, axis: Axis) -> (FloatType, FloatType) {
        let i = axis.index();
        match &self.shape {
            Shape::Sphere(sphere) => (
                sphere.center[i] - sphere.radius,
                sphere.center[i] + sphere.radius,
            ),
            Shape::Triangle(triangle) => {
                let mut min = triangle.vertices[0].position[i];
                let mut max = min;
                for v in &triangle.vertices[1..] {
                    min = min.min(v.position[i]);
                    max = max.max(v.position[i]);
                }
                (min, max)
            }
        }
    }

    /// Extremal coordinates along one axis, enumerated by the kd-tree
    /// builder as candidate split planes.
    pub fn split_candidates(&self, axis: Axis) -> ArrayVec<FloatType, 3> {
        let i = axis.index();
        let mut out = ArrayVec::new();
        match &self.shape {
            Shape::Sphere(sphere) => {
                out.push(sphere.center[i] - sphere.radius);
                out.push(sphere.center[i] + sphere.radius);
            }
            Shape::Triangle(triangle) => {
                for v in &triangle.vertices {
                    out.push(v.position[i]);
                }
            }
        }
        out
    }

    /// Reconstructs the shaded surface point from hit parameters.
    pub fn shading_vertex(&self, hit: &Hit, ray: &Ray) -> Vertex {
        let position = ray.point_at(hit.t);
        let normal = match &self.shape {
            Shape::Sphere(sphere) => (position - sphere.center).normalize(),
            Shape::Triangle(triangle) => {
                let [n0, n1, n2] = triangle.vertices.map(|v| v.normal);
                let w = 1.0 - hit.u - hit.v;
                (n0 * w + n1 * hit.u + n2 * hit.v).normalize()
            }
        };
        Vertex { position, normal }
    }
}

fn intersect_sphere(sphere: &Sphere, ray: &Ray) -> Option<Hit> {
    let oc = ray.origin - sphere.center;
    let b = oc.dot(&ray.direction);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = -b - sqrt_disc;
    let t2 = -b + sqrt_disc;
    let t = if t1 > 0.0 {
        t1
    } else if t2 > 0.0 {
        t2
    } else {
        return None;
    };

    Some(Hit { t, u: 0.0, v: 0.0 })
}

/// Möller-Trumbore with back face culling.
fn intersect_triangle(triangle: &Triangle, ray: &Ray) -> Option<Hit> {
    let p0 = triangle.vertices[0].position;
    let e0 = triangle.vertices[1].position - p0;
    let e1 = triangle.vertices[2].position - p0;

    let pvec = ray.direction.cross(&e1);
    let det = e0.dot(&pvec);
    // Back facing or parallel
    if det <= EPSILON {
        return None;
    }

    let tvec = ray.origin - p0;
    let u = tvec.dot(&pvec);
    if u < 0.0 || u > det {
        return None;
    }

    let qvec = tvec.cross(&e0);
    let v = ray.direction.dot(&qvec);
    if v < 0.0 || u + v > det {
        return None;
    }

    let inv_det = 1.0 / det;
    let t = e1.dot(&qvec) * inv_det;
    if t < 0.0 {
        return None;
    }

    Some(Hit {
        t,
        u: u * inv_det,
        v: v * inv_det,
    })
}

fn sphere_overlaps_box(sphere: &Sphere, aabb: &Aabb) -> bool {
    // Squared distance from the center to the box
    let mut dist = 0.0;
    for i in 0..3 {
        let c = sphere.center[i];
        if c < aabb.min[i] {
            dist += (c - aabb.min[i]) * (c - aabb.min[i]);
        } else if c > aabb.max[i] {
            dist += (c - aabb.max[i]) * (c - aabb.max[i]);
        }
    }
    dist <= sphere.radius * sphere.radius
}

/// Separating axis test between a triangle and a box
/// ("Fast 3D Triangle-Box Overlap Testing", Akenine-Moller).
fn triangle_overlaps_box(triangle: &Triangle, aabb: &Aabb) -> bool {
    let h = (aabb.max - aabb.min) * 0.5;
    let center = aabb.min + h;

    let v = triangle.vertices.map(|vert| vert.position - center);
    let f = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    // Box face normals
    for i in 0..3 {
        let min = v[0][i].min(v[1][i]).min(v[2][i]);
        let max = v[0][i].max(v[1][i]).max(v[2][i]);
        if min > h[i] || max < -h[i] {
            return false;
        }
    }

    // Cross products of box edges and triangle edges
    for edge in &f {
        let axes = [
            WorldVector::new(0.0, -edge.z, edge.y),
            WorldVector::new(edge.z, 0.0, -edge.x),
            WorldVector::new(-edge.y, edge.x, 0.0),
        ];
        for axis in &axes {
            let p = [axis.dot(&v[0]), axis.dot(&v[1]), axis.dot(&v[2])];
            let min = p[0].min(p[1]).min(p[2]);
            let max = p[0].max(p[1]).max(p[2]);
            let rad = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
            if min > rad || max < -rad {
                return false;
            }
        }
    }

    // Triangle plane
    let n = f[0].cross(&f[1]);
    let d = n.dot(&v[0]);
    let rad = h.x * n.x.abs() + h.y * n.y.abs() + h.z * n.z.abs();
    d.abs() <= rad
}
