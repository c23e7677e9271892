use std::path::Path;
use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};

use crate::buffers::vec4_bytes;

/// Matches the encode the present shader applies on non-sRGB surfaces, so
/// saved frames look like the window contents.
const DISPLAY_GAMMA: f32 = 2.2;

/// Copies a vec4-per-pixel color buffer back to the CPU as raw f32 data.
pub fn read_color_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    width: u32,
    height: u32,
) -> Result<Vec<f32>> {
    let size = vec4_bytes(width, height);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .context("map callback never ran")?
        .map_err(|e| anyhow!("failed to map readback buffer: {e:?}"))?;

    let data = slice.get_mapped_range();
    let pixels = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();
    Ok(pixels)
}

/// Gamma-encodes linear radiance into 8-bit RGBA. Input is a flat stream of
/// vec4 lanes; alpha is forced opaque.
pub fn radiance_to_rgba8(pixels: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len());
    for lane in pixels.chunks_exact(4) {
        for &channel in &lane[..3] {
            let encoded = channel.clamp(0.0, 1.0).powf(1.0 / DISPLAY_GAMMA);
            out.push((encoded * 255.0 + 0.5) as u8);
        }
        out.push(255);
    }
    out
}

pub fn save_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    width: u32,
    height: u32,
    path: &Path,
) -> Result<()> {
    let pixels = read_color_buffer(device, queue, source, width, height)?;
    let rgba = radiance_to_rgba8(&pixels);
    image::save_buffer(path, &rgba, width, height, image::ExtendedColorType::Rgba8)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
