use crate::geometry::{Vertex, WorldPoint};
use crate::util::{BLACK, Rgb};

use super::{Light, Material, MaterialId, Primitive, Scene, SceneError};

const ROOM_TREE_DEPTH: usize = 5;

/// Two triangles covering a quad. Corners must be given counterclockwise as
/// seen from the front side; vertex normals are set to the face normal.
fn quad(corners: [WorldPoint; 4], material: MaterialId) -> [Primitive; 2] {
    let [a, b, c, d] = corners;
    let normal = (b - a).cross(&(c - a)).normalize();
    let vertex = |position| Vertex { position, normal };
    [
        Primitive::triangle([vertex(a), vertex(b), vertex(c)], material),
        Primitive::triangle([vertex(a), vertex(c), vertex(d)], material),
    ]
}

impl Scene {
    /// The canonical test scene: three shiny spheres on the floor of a
    /// closed box room, lit by an emissive ceiling panel and a point light
    /// just below it.
    pub fn reference() -> Result<Scene, SceneError> {
        let shiny = |diffuse| Material {
            diffuse,
            specular: Rgb::new(0.5, 0.5, 0.5),
            emittance: BLACK,
            kd: 0.8,
            ks: 0.2,
            shine: 25.0,
        };
        let materials = vec![
            shiny(Rgb::new(1.0, 0.5, 0.5)),
            shiny(Rgb::new(0.5, 1.0, 0.5)),
            shiny(Rgb::new(0.5, 0.5, 1.0)),
            // Matte room walls
            Material {
                diffuse: Rgb::new(0.3, 0.3, 0.3),
                specular: BLACK,
                emittance: BLACK,
                kd: 1.0,
                ks: 0.0,
                shine: 0.0,
            },
            // Ceiling panel: pure emitter
            Material {
                diffuse: BLACK,
                specular: BLACK,
                emittance: Rgb::new(100.0, 100.0, 100.0),
                kd: 0.0,
                ks: 0.0,
                shine: 0.0,
            },
        ];
        let walls = MaterialId::from_usize(3);
        let panel = MaterialId::from_usize(4);

        let mut primitives = vec![
            Primitive::sphere(WorldPoint::new(-2.0, 1.0, 0.0), 1.0, MaterialId::from_usize(0)),
            Primitive::sphere(WorldPoint::new(0.0, 1.0, 1.0), 1.0, MaterialId::from_usize(1)),
            Primitive::sphere(WorldPoint::new(2.0, 1.0, 0.0), 1.0, MaterialId::from_usize(2)),
        ];

        let p = WorldPoint::new;
        // floor, ceiling, then the four walls, all facing inward
        primitives.extend(quad([p(-3.0, 0.0, -3.0), p(-3.0, 0.0, 3.0), p(3.0, 0.0, 3.0), p(3.0, 0.0, -3.0)], walls));
        primitives.extend(quad([p(-3.0, 6.0, -3.0), p(3.0, 6.0, -3.0), p(3.0, 6.0, 3.0), p(-3.0, 6.0, 3.0)], walls));
        primitives.extend(quad([p(-3.0, 0.0, -3.0), p(-3.0, 6.0, -3.0), p(-3.0, 6.0, 3.0), p(-3.0, 0.0, 3.0)], walls));
        primitives.extend(quad([p(3.0, 0.0, -3.0), p(3.0, 0.0, 3.0), p(3.0, 6.0, 3.0), p(3.0, 6.0, -3.0)], walls));
        primitives.extend(quad([p(-3.0, 0.0, 3.0), p(-3.0, 6.0, 3.0), p(3.0, 6.0, 3.0), p(3.0, 0.0, 3.0)], walls));
        primitives.extend(quad([p(-3.0, 0.0, -3.0), p(3.0, 0.0, -3.0), p(3.0, 6.0, -3.0), p(-3.0, 6.0, -3.0)], walls));
        // emissive panel just below the ceiling
        primitives.extend(quad([p(-1.0, 5.9, -1.0), p(1.0, 5.9, -1.0), p(1.0, 5.9, 1.0), p(-1.0, 5.9, 1.0)], panel));

        let lights = vec![Light::Point {
            position: WorldPoint::new(0.0, 5.8, 0.0),
            intensity: Rgb::new(100.0, 100.0, 100.0),
        }];

        Scene::new(primitives, materials, lights, BLACK, ROOM_TREE_DEPTH)
    }
}
