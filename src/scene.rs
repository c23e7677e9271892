use bytemuck::{Pod, Zeroable};
use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

/// Surface appearance referenced by index from [`Parallelogram::material`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Material {
    Diffuse { color: Vector3<f32> },
    Emissive { emission: Vector3<f32> },
}

/// A quad spanned by two edge vectors from an anchor corner.
#[derive(Copy, Clone, Debug)]
pub struct Parallelogram {
    pub anchor: Point3<f32>,
    pub offset1: Vector3<f32>,
    pub offset2: Vector3<f32>,
    pub material: u32,
}

impl Parallelogram {
    pub fn corners(&self) -> [Point3<f32>; 4] {
        [
            self.anchor,
            self.anchor + self.offset1,
            self.anchor + self.offset2,
            self.anchor + self.offset1 + self.offset2,
        ]
    }

    /// Packs the quad for intersection on the GPU. The plane holds the unit
    /// normal and its offset; the edges are pre-divided by their squared
    /// length so the hit test reads parametric coordinates with two dots.
    pub fn to_gpu(&self) -> GpuParallelogram {
        let normal = self.offset1.cross(self.offset2).normalize();
        let d = normal.dot(self.anchor.to_vec());
        let v1 = self.offset1 / self.offset1.magnitude2();
        let v2 = self.offset2 / self.offset2.magnitude2();
        GpuParallelogram {
            plane: [normal.x, normal.y, normal.z, d],
            anchor: self.anchor.into(),
            material: self.material,
            v1: v1.into(),
            _pad0: 0.0,
            v2: v2.into(),
            _pad1: 0.0,
        }
    }
}

/// The area light sampled for direct illumination. Its emission is what
/// shading integrates; the lamp quad itself carries a separate, dimmer
/// material so the visible fixture does not blow out.
#[derive(Copy, Clone, Debug)]
pub struct AreaLight {
    pub corner: Point3<f32>,
    pub v1: Vector3<f32>,
    pub v2: Vector3<f32>,
    pub emission: Vector3<f32>,
}

impl AreaLight {
    pub fn normal(&self) -> Vector3<f32> {
        self.v1.cross(self.v2).normalize()
    }

    pub fn area(&self) -> f32 {
        self.v1.cross(self.v2).magnitude()
    }

    /// Gaussian radius of the emitter used by the penumbra width estimate.
    pub fn sigma(&self) -> f32 {
        (self.area() / 4.0).sqrt()
    }

    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            corner: self.corner.into(),
            _pad0: 0.0,
            v1: self.v1.into(),
            _pad1: 0.0,
            v2: self.v2.into(),
            _pad2: 0.0,
            normal: self.normal().into(),
            sigma: self.sigma(),
            emission: self.emission.into(),
            area: self.area(),
        }
    }
}

/// Everything the renderer needs to know about the world, as plain data.
/// Swapping in a different room is an edit here, not a shader change.
pub struct SceneDescription {
    pub materials: Vec<Material>,
    pub quads: Vec<Parallelogram>,
    pub light: AreaLight,
}

impl SceneDescription {
    /// The Cornell box: white floor, ceiling and back wall, red left wall,
    /// two boxes, and a lamp quad just under the ceiling.
    pub fn cornell_box() -> SceneDescription {
        const WHITE: u32 = 0;
        const RED: u32 = 1;
        const LAMP: u32 = 2;

        let materials = vec![
            Material::Diffuse {
                color: Vector3::new(0.8, 0.8, 0.8),
            },
            Material::Diffuse {
                color: Vector3::new(0.8, 0.05, 0.05),
            },
            Material::Emissive {
                emission: Vector3::new(15.0, 15.0, 5.0),
            },
        ];

        let quad = |anchor: [f32; 3], offset1: [f32; 3], offset2: [f32; 3], material: u32| {
            Parallelogram {
                anchor: Point3::from(anchor),
                offset1: Vector3::from(offset1),
                offset2: Vector3::from(offset2),
                material,
            }
        };

        let quads = vec![
            // Floor
            quad([0.0, 0.0, 0.0], [0.0, 0.0, 559.2], [556.0, 0.0, 0.0], WHITE),
            // Ceiling
            quad([0.0, 548.8, 0.0], [556.0, 0.0, 0.0], [0.0, 0.0, 559.2], WHITE),
            // Back wall
            quad([0.0, 0.0, 559.2], [0.0, 548.8, 0.0], [556.0, 0.0, 0.0], WHITE),
            // Left wall
            quad([556.0, 0.0, 0.0], [0.0, 0.0, 559.2], [0.0, 548.8, 0.0], RED),
            // Short block
            quad(
                [130.0, 165.0, 65.0],
                [-48.0, 0.0, 160.0],
                [160.0, 0.0, 49.0],
                WHITE,
            ),
            quad(
                [290.0, 0.0, 114.0],
                [0.0, 165.0, 0.0],
                [-50.0, 0.0, 158.0],
                WHITE,
            ),
            quad(
                [130.0, 0.0, 65.0],
                [0.0, 165.0, 0.0],
                [160.0, 0.0, 49.0],
                WHITE,
            ),
            quad(
                [82.0, 0.0, 225.0],
                [0.0, 165.0, 0.0],
                [48.0, 0.0, -160.0],
                WHITE,
            ),
            quad(
                [240.0, 0.0, 272.0],
                [0.0, 165.0, 0.0],
                [-158.0, 0.0, -47.0],
                WHITE,
            ),
            // Tall block
            quad(
                [423.0, 330.0, 247.0],
                [-158.0, 0.0, 49.0],
                [49.0, 0.0, 159.0],
                WHITE,
            ),
            quad(
                [423.0, 0.0, 247.0],
                [0.0, 330.0, 0.0],
                [49.0, 0.0, 159.0],
                WHITE,
            ),
            quad(
                [472.0, 0.0, 406.0],
                [0.0, 330.0, 0.0],
                [-158.0, 0.0, 50.0],
                WHITE,
            ),
            quad(
                [314.0, 0.0, 456.0],
                [0.0, 330.0, 0.0],
                [-49.0, 0.0, -160.0],
                WHITE,
            ),
            quad(
                [265.0, 0.0, 296.0],
                [0.0, 330.0, 0.0],
                [158.0, 0.0, -49.0],
                WHITE,
            ),
            // Lamp
            quad(
                [343.0, 548.6, 227.0],
                [-130.0, 0.0, 0.0],
                [0.0, 0.0, 105.0],
                LAMP,
            ),
        ];

        let light = AreaLight {
            corner: Point3::new(343.0, 548.6, 227.0),
            v1: Vector3::new(-130.0, 0.0, 0.0),
            v2: Vector3::new(0.0, 0.0, 105.0),
            emission: Vector3::new(20.0, 20.0, 20.0),
        };

        SceneDescription {
            materials,
            quads,
            light,
        }
    }

    pub fn quad_records(&self) -> Vec<GpuParallelogram> {
        self.quads.iter().map(Parallelogram::to_gpu).collect()
    }

    pub fn material_records(&self) -> Vec<GpuMaterial> {
        self.materials
            .iter()
            .map(|material| match *material {
                Material::Diffuse { color } => GpuMaterial {
                    color: color.into(),
                    emissive: 0,
                    emission: [0.0; 3],
                    _pad: 0,
                },
                Material::Emissive { emission } => GpuMaterial {
                    color: [0.0; 3],
                    emissive: 1,
                    emission: emission.into(),
                    _pad: 0,
                },
            })
            .collect()
    }

    pub fn light_records(&self) -> Vec<GpuLight> {
        vec![self.light.to_gpu()]
    }
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuParallelogram {
    pub plane: [f32; 4],
    pub anchor: [f32; 3],
    pub material: u32,
    pub v1: [f32; 3],
    pub _pad0: f32,
    pub v2: [f32; 3],
    pub _pad1: f32,
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuMaterial {
    pub color: [f32; 3],
    pub emissive: u32,
    pub emission: [f32; 3],
    pub _pad: u32,
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuLight {
    pub corner: [f32; 3],
    pub _pad0: f32,
    pub v1: [f32; 3],
    pub _pad1: f32,
    pub v2: [f32; 3],
    pub _pad2: f32,
    pub normal: [f32; 3],
    pub sigma: f32,
    pub emission: [f32; 3],
    pub area: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, what: &str) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "{what}: expected {expected}, got {actual}"
        );
    }

    #[test]
    fn cornell_box_lists_every_surface() {
        let scene = SceneDescription::cornell_box();
        assert_eq!(scene.quads.len(), 15, "four walls, two blocks, one lamp");
        assert_eq!(scene.materials.len(), 3);
        let lamp = scene.quads.last().unwrap();
        assert_eq!(
            scene.materials[lamp.material as usize],
            Material::Emissive {
                emission: Vector3::new(15.0, 15.0, 5.0),
            }
        );
    }

    #[test]
    fn floor_record_has_unit_plane_and_predivided_edges() {
        let scene = SceneDescription::cornell_box();
        let floor = scene.quads[0].to_gpu();
        assert_eq!(floor.plane, [0.0, 1.0, 0.0, 0.0]);
        assert_close(floor.v1[2], 1.0 / 559.2, "v1.z");
        assert_close(floor.v2[0], 1.0 / 556.0, "v2.x");
    }

    #[test]
    fn predivided_edges_recover_parametric_coordinates() {
        let quad = Parallelogram {
            anchor: Point3::new(1.0, 2.0, 3.0),
            offset1: Vector3::new(4.0, 0.0, 0.0),
            offset2: Vector3::new(0.0, 0.0, -8.0),
            material: 0,
        };
        let record = quad.to_gpu();
        let point = quad.anchor + quad.offset1 * 0.25 + quad.offset2 * 0.75;
        let vi = point - quad.anchor;
        let a1 = Vector3::from(record.v1).dot(vi);
        let a2 = Vector3::from(record.v2).dot(vi);
        assert_close(a1, 0.25, "a1");
        assert_close(a2, 0.75, "a2");
    }

    #[test]
    fn light_faces_up_with_expected_spread() {
        let scene = SceneDescription::cornell_box();
        let light = scene.light.to_gpu();
        assert_eq!(light.normal, [0.0, 1.0, 0.0]);
        assert_close(light.area, 130.0 * 105.0, "area");
        assert_close(light.sigma, (130.0_f32 * 105.0 / 4.0).sqrt(), "sigma");
        assert_eq!(light.emission, [20.0, 20.0, 20.0]);
    }

    #[test]
    fn material_records_separate_reflectors_from_emitters() {
        let scene = SceneDescription::cornell_box();
        let records = scene.material_records();
        assert_eq!(records[0].emissive, 0);
        assert_eq!(records[0].color, [0.8, 0.8, 0.8]);
        assert_eq!(records[1].color, [0.8, 0.05, 0.05]);
        assert_eq!(records[2].emissive, 1);
        assert_eq!(records[2].emission, [15.0, 15.0, 5.0]);
    }

    #[test]
    fn gpu_records_match_shader_struct_sizes() {
        assert_eq!(std::mem::size_of::<GpuParallelogram>(), 64);
        assert_eq!(std::mem::size_of::<GpuMaterial>(), 32);
        assert_eq!(std::mem::size_of::<GpuLight>(), 80);
    }

    #[test]
    fn corners_span_the_full_quad() {
        let quad = Parallelogram {
            anchor: Point3::new(0.0, 0.0, 0.0),
            offset1: Vector3::new(2.0, 0.0, 0.0),
            offset2: Vector3::new(0.0, 3.0, 0.0),
            material: 0,
        };
        let corners = quad.corners();
        assert_eq!(corners[3], Point3::new(2.0, 3.0, 0.0));
    }
}
