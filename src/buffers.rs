use wgpu::util::DeviceExt;

use crate::accel::Bvh;
use crate::scene::SceneDescription;

pub fn vec4_bytes(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * 4 * std::mem::size_of::<f32>() as u64
}

pub fn scalar_bytes(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * std::mem::size_of::<f32>() as u64
}

fn create_pixel_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    value: &T,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Per-pixel working set. Recreated wholesale on resize, after which every
/// bind group holding one of these must be refreshed.
pub struct FrameBuffers {
    pub width: u32,
    pub height: u32,
    /// Linear radiance, vec4 per pixel.
    pub radiance: wgpu::Buffer,
    /// Primary hit position in xyz, ray distance in w (negative on miss).
    pub hit_points: wgpu::Buffer,
    /// Front-facing normal in xyz, primitive index in w (negative on miss).
    pub normals: wgpu::Buffer,
    /// Camera-to-hit distance fed to the penumbra projection.
    pub hit_distance: wgpu::Buffer,
    /// Nearest occluder distance seen by the shadow probes.
    pub occluder_min: wgpu::Buffer,
    /// Farthest occluder distance seen by the shadow probes.
    pub occluder_max: wgpu::Buffer,
    /// Penumbra width in pixels after projection to the screen.
    pub projected_width: wgpu::Buffer,
    /// Samples per pixel the next trace pass should spend.
    pub samples: wgpu::Buffer,
    /// What the present pass shows when not reading radiance directly.
    pub display: wgpu::Buffer,
}

impl FrameBuffers {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> FrameBuffers {
        let vec4 = vec4_bytes(width, height);
        let scalar = scalar_bytes(width, height);
        let storage = wgpu::BufferUsages::STORAGE;
        FrameBuffers {
            width,
            height,
            radiance: create_pixel_buffer(
                device,
                "Radiance Buffer",
                vec4,
                storage | wgpu::BufferUsages::COPY_SRC,
            ),
            hit_points: create_pixel_buffer(device, "Hit Point Buffer", vec4, storage),
            normals: create_pixel_buffer(device, "Normal Buffer", vec4, storage),
            hit_distance: create_pixel_buffer(device, "Hit Distance Buffer", scalar, storage),
            occluder_min: create_pixel_buffer(device, "Occluder Min Buffer", scalar, storage),
            occluder_max: create_pixel_buffer(device, "Occluder Max Buffer", scalar, storage),
            projected_width: create_pixel_buffer(device, "Projected Width Buffer", scalar, storage),
            samples: create_pixel_buffer(device, "Sample Count Buffer", scalar, storage),
            display: create_pixel_buffer(
                device,
                "Display Buffer",
                vec4,
                storage | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            ),
        }
    }

    pub fn color_bytes(&self) -> u64 {
        vec4_bytes(self.width, self.height)
    }
}

/// Immutable scene data uploaded once at startup.
pub struct SceneBuffers {
    pub quads: wgpu::Buffer,
    pub materials: wgpu::Buffer,
    pub lights: wgpu::Buffer,
    pub bvh_nodes: wgpu::Buffer,
    pub bvh_indices: wgpu::Buffer,
}

impl SceneBuffers {
    pub fn new(device: &wgpu::Device, scene: &SceneDescription, bvh: &Bvh) -> SceneBuffers {
        let storage = wgpu::BufferUsages::STORAGE;
        SceneBuffers {
            quads: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Parallelogram Buffer"),
                contents: bytemuck::cast_slice(&scene.quad_records()),
                usage: storage,
            }),
            materials: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&scene.material_records()),
                usage: storage,
            }),
            lights: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Buffer"),
                contents: bytemuck::cast_slice(&scene.light_records()),
                usage: storage,
            }),
            bvh_nodes: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bvh Node Buffer"),
                contents: bytemuck::cast_slice(&bvh.nodes),
                usage: storage,
            }),
            bvh_indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bvh Index Buffer"),
                contents: bytemuck::cast_slice(&bvh.indices),
                usage: storage,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes_scale_with_the_pixel_count() {
        assert_eq!(vec4_bytes(1000, 1000), 16_000_000);
        assert_eq!(scalar_bytes(1000, 1000), 4_000_000);
        assert_eq!(vec4_bytes(3, 2), 96);
    }
}
