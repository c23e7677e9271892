use bytemuck::{Pod, Zeroable};

use crate::buffers::FrameBuffers;

const WORKGROUP_DIM: u32 = 8;

pub const HEATMAP_GROUP_ID: u32 = 0;
pub const HIT_DISTANCE_BINDING_ID: u32 = 0;
pub const OCCLUDER_MIN_BINDING_ID: u32 = 1;
pub const OCCLUDER_MAX_BINDING_ID: u32 = 2;
pub const PROJECTED_WIDTH_BINDING_ID: u32 = 3;
pub const SAMPLE_COUNT_BINDING_ID: u32 = 4;
pub const DISPLAY_BINDING_ID: u32 = 5;
pub const PARAMS_BINDING_ID: u32 = 6;

/// Which per-pixel statistic the heatmap draws. The numeric value is the
/// channel selector the shader switches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeatmapChannel {
    HitDistance = 0,
    OccluderMin = 1,
    OccluderMax = 2,
    ProjectedWidth = 3,
    SampleCount = 4,
}

impl HeatmapChannel {
    /// Advances the overlay through every channel and back to off.
    pub fn cycle(current: Option<HeatmapChannel>) -> Option<HeatmapChannel> {
        match current {
            None => Some(HeatmapChannel::HitDistance),
            Some(HeatmapChannel::HitDistance) => Some(HeatmapChannel::OccluderMin),
            Some(HeatmapChannel::OccluderMin) => Some(HeatmapChannel::OccluderMax),
            Some(HeatmapChannel::OccluderMax) => Some(HeatmapChannel::ProjectedWidth),
            Some(HeatmapChannel::ProjectedWidth) => Some(HeatmapChannel::SampleCount),
            Some(HeatmapChannel::SampleCount) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeatmapChannel::HitDistance => "hit distance",
            HeatmapChannel::OccluderMin => "occluder min",
            HeatmapChannel::OccluderMax => "occluder max",
            HeatmapChannel::ProjectedWidth => "projected penumbra width",
            HeatmapChannel::SampleCount => "samples per pixel",
        }
    }
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct HeatmapParams {
    pub width: u32,
    pub height: u32,
    pub channel: u32,
    pub _pad: u32,
}

impl HeatmapParams {
    pub fn new(width: u32, height: u32, channel: HeatmapChannel) -> Self {
        HeatmapParams {
            width,
            height,
            channel: channel as u32,
            _pad: 0,
        }
    }
}

pub struct HeatmapPipelines {
    pub shade_pipeline: wgpu::ComputePipeline,
}

impl HeatmapPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("heatmap.wgsl"));
        let shade_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Heatmap Pipeline"),
            layout: None,
            module: &shader,
            entry_point: Some("shade_heatmap"),
            compilation_options: Default::default(),
            cache: None,
        });
        Self { shade_pipeline }
    }

    pub fn record<'a, 'pass>(
        &'a self,
        cpass: &mut wgpu::ComputePass<'pass>,
        bindings: &'a HeatmapBindings,
        width: u32,
        height: u32,
    ) where
        'a: 'pass,
    {
        cpass.set_pipeline(&self.shade_pipeline);
        cpass.set_bind_group(HEATMAP_GROUP_ID, &bindings.bind_group, &[]);
        cpass.dispatch_workgroups(
            (width + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            (height + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            1,
        );
    }
}

pub struct HeatmapBindings {
    bind_group: wgpu::BindGroup,
}

impl HeatmapBindings {
    pub fn new(
        device: &wgpu::Device,
        pipelines: &HeatmapPipelines,
        frame: &FrameBuffers,
        params_buffer: &wgpu::Buffer,
    ) -> Self {
        Self {
            bind_group: heatmap_group(device, pipelines, frame, params_buffer),
        }
    }

    pub fn update_frame_buffers(
        &mut self,
        device: &wgpu::Device,
        pipelines: &HeatmapPipelines,
        frame: &FrameBuffers,
        params_buffer: &wgpu::Buffer,
    ) {
        self.bind_group = heatmap_group(device, pipelines, frame, params_buffer);
    }
}

fn heatmap_group(
    device: &wgpu::Device,
    pipelines: &HeatmapPipelines,
    frame: &FrameBuffers,
    params_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipelines
            .shade_pipeline
            .get_bind_group_layout(HEATMAP_GROUP_ID),
        entries: &[
            wgpu::BindGroupEntry {
                binding: HIT_DISTANCE_BINDING_ID,
                resource: frame.hit_distance.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: OCCLUDER_MIN_BINDING_ID,
                resource: frame.occluder_min.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: OCCLUDER_MAX_BINDING_ID,
                resource: frame.occluder_max.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: PROJECTED_WIDTH_BINDING_ID,
                resource: frame.projected_width.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLE_COUNT_BINDING_ID,
                resource: frame.samples.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: DISPLAY_BINDING_ID,
                resource: frame.display.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: PARAMS_BINDING_ID,
                resource: params_buffer.as_entire_binding(),
            },
        ],
        label: Some("Heatmap Bind Group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_every_channel_then_turns_off() {
        let mut mode = None;
        let mut labels = Vec::new();
        for _ in 0..5 {
            mode = HeatmapChannel::cycle(mode);
            labels.push(mode.map(HeatmapChannel::label));
        }
        assert_eq!(
            labels,
            vec![
                Some("hit distance"),
                Some("occluder min"),
                Some("occluder max"),
                Some("projected penumbra width"),
                Some("samples per pixel"),
            ]
        );
        assert_eq!(HeatmapChannel::cycle(mode), None);
    }

    #[test]
    fn channel_selectors_match_the_shader_switch() {
        assert_eq!(HeatmapChannel::HitDistance as u32, 0);
        assert_eq!(HeatmapChannel::SampleCount as u32, 4);
        let params = HeatmapParams::new(640, 480, HeatmapChannel::ProjectedWidth);
        assert_eq!(params.channel, 3);
        assert_eq!((params.width, params.height), (640, 480));
    }
}
