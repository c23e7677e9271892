use crate::buffers::{FrameBuffers, SceneBuffers};

/// Threads per workgroup side; dispatches are 2D over the image.
const WORKGROUP_DIM: u32 = 8;

pub const FRAME_GROUP_ID: u32 = 0;
pub const RADIANCE_BINDING_ID: u32 = 0;
pub const HIT_POINT_BINDING_ID: u32 = 1;
pub const NORMAL_BINDING_ID: u32 = 2;
pub const HIT_DISTANCE_BINDING_ID: u32 = 3;
pub const OCCLUDER_MIN_BINDING_ID: u32 = 4;
pub const OCCLUDER_MAX_BINDING_ID: u32 = 5;
pub const PROJECTED_WIDTH_BINDING_ID: u32 = 6;
pub const SAMPLE_COUNT_BINDING_ID: u32 = 7;

pub const SCENE_GROUP_ID: u32 = 1;
pub const PARALLELOGRAM_BINDING_ID: u32 = 0;
pub const MATERIAL_BINDING_ID: u32 = 1;
pub const LIGHT_BINDING_ID: u32 = 2;
pub const BVH_NODE_BINDING_ID: u32 = 3;
pub const BVH_INDEX_BINDING_ID: u32 = 4;

pub const CAMERA_GROUP_ID: u32 = 2;
pub const CAMERA_BINDING_ID: u32 = 0;

pub struct TracePipelines {
    pub firstpass_pipeline: wgpu::ComputePipeline,
    pub distance_pipeline: wgpu::ComputePipeline,
    pub reference_pipeline: wgpu::ComputePipeline,
}

impl TracePipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("trace.wgsl"));

        let firstpass_pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Firstpass Pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("render_firstpass"),
                compilation_options: Default::default(),
                cache: None,
            });
        let distance_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Distance Estimation Pipeline"),
            layout: None,
            module: &shader,
            entry_point: Some("estimate_distance"),
            compilation_options: Default::default(),
            cache: None,
        });
        let reference_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Reference Pipeline"),
            layout: None,
            module: &shader,
            entry_point: Some("render_reference"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            firstpass_pipeline,
            distance_pipeline,
            reference_pipeline,
        }
    }

    pub fn record_firstpass<'a, 'pass>(
        &'a self,
        cpass: &mut wgpu::ComputePass<'pass>,
        bindings: &'a TraceBindings,
        width: u32,
        height: u32,
    ) where
        'a: 'pass,
    {
        cpass.set_pipeline(&self.firstpass_pipeline);
        cpass.set_bind_group(FRAME_GROUP_ID, &bindings.firstpass_frame, &[]);
        cpass.set_bind_group(SCENE_GROUP_ID, &bindings.firstpass_scene, &[]);
        cpass.set_bind_group(CAMERA_GROUP_ID, &bindings.firstpass_camera, &[]);
        cpass.dispatch_workgroups(
            (width + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            (height + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            1,
        );
    }

    pub fn record_distance<'a, 'pass>(
        &'a self,
        cpass: &mut wgpu::ComputePass<'pass>,
        bindings: &'a TraceBindings,
        width: u32,
        height: u32,
    ) where
        'a: 'pass,
    {
        cpass.set_pipeline(&self.distance_pipeline);
        cpass.set_bind_group(FRAME_GROUP_ID, &bindings.distance_frame, &[]);
        cpass.set_bind_group(SCENE_GROUP_ID, &bindings.distance_scene, &[]);
        cpass.set_bind_group(CAMERA_GROUP_ID, &bindings.distance_camera, &[]);
        cpass.dispatch_workgroups(
            (width + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            (height + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            1,
        );
    }

    pub fn record_reference<'a, 'pass>(
        &'a self,
        cpass: &mut wgpu::ComputePass<'pass>,
        bindings: &'a TraceBindings,
        width: u32,
        height: u32,
    ) where
        'a: 'pass,
    {
        cpass.set_pipeline(&self.reference_pipeline);
        cpass.set_bind_group(FRAME_GROUP_ID, &bindings.reference_frame, &[]);
        cpass.set_bind_group(SCENE_GROUP_ID, &bindings.reference_scene, &[]);
        cpass.set_bind_group(CAMERA_GROUP_ID, &bindings.reference_camera, &[]);
        cpass.dispatch_workgroups(
            (width + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            (height + WORKGROUP_DIM - 1) / WORKGROUP_DIM,
            1,
        );
    }
}

/// Bind groups come from each pipeline's derived layout, so every entry
/// point gets its own set covering exactly the bindings it declares.
pub struct TraceBindings {
    firstpass_frame: wgpu::BindGroup,
    distance_frame: wgpu::BindGroup,
    reference_frame: wgpu::BindGroup,
    firstpass_scene: wgpu::BindGroup,
    distance_scene: wgpu::BindGroup,
    reference_scene: wgpu::BindGroup,
    firstpass_camera: wgpu::BindGroup,
    distance_camera: wgpu::BindGroup,
    reference_camera: wgpu::BindGroup,
}

impl TraceBindings {
    pub fn new(
        device: &wgpu::Device,
        pipelines: &TracePipelines,
        frame: &FrameBuffers,
        scene: &SceneBuffers,
        camera_buffer: &wgpu::Buffer,
    ) -> Self {
        Self {
            firstpass_frame: firstpass_frame_group(device, pipelines, frame),
            distance_frame: distance_frame_group(device, pipelines, frame),
            reference_frame: reference_frame_group(device, pipelines, frame),
            firstpass_scene: scene_group(
                device,
                &pipelines.firstpass_pipeline,
                scene,
                "Firstpass Scene Bind Group",
            ),
            distance_scene: scene_group(
                device,
                &pipelines.distance_pipeline,
                scene,
                "Distance Scene Bind Group",
            ),
            reference_scene: scene_group(
                device,
                &pipelines.reference_pipeline,
                scene,
                "Reference Scene Bind Group",
            ),
            firstpass_camera: camera_group(
                device,
                &pipelines.firstpass_pipeline,
                camera_buffer,
                "Firstpass Camera Bind Group",
            ),
            distance_camera: camera_group(
                device,
                &pipelines.distance_pipeline,
                camera_buffer,
                "Distance Camera Bind Group",
            ),
            reference_camera: camera_group(
                device,
                &pipelines.reference_pipeline,
                camera_buffer,
                "Reference Camera Bind Group",
            ),
        }
    }

    /// Frame buffers are recreated on resize; the scene and camera groups
    /// keep their original buffer objects and stay valid.
    pub fn update_frame_buffers(
        &mut self,
        device: &wgpu::Device,
        pipelines: &TracePipelines,
        frame: &FrameBuffers,
    ) {
        self.firstpass_frame = firstpass_frame_group(device, pipelines, frame);
        self.distance_frame = distance_frame_group(device, pipelines, frame);
        self.reference_frame = reference_frame_group(device, pipelines, frame);
    }
}

fn firstpass_frame_group(
    device: &wgpu::Device,
    pipelines: &TracePipelines,
    frame: &FrameBuffers,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipelines
            .firstpass_pipeline
            .get_bind_group_layout(FRAME_GROUP_ID),
        entries: &[
            wgpu::BindGroupEntry {
                binding: RADIANCE_BINDING_ID,
                resource: frame.radiance.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: HIT_POINT_BINDING_ID,
                resource: frame.hit_points.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: NORMAL_BINDING_ID,
                resource: frame.normals.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: HIT_DISTANCE_BINDING_ID,
                resource: frame.hit_distance.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLE_COUNT_BINDING_ID,
                resource: frame.samples.as_entire_binding(),
            },
        ],
        label: Some("Firstpass Frame Bind Group"),
    })
}

fn distance_frame_group(
    device: &wgpu::Device,
    pipelines: &TracePipelines,
    frame: &FrameBuffers,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipelines
            .distance_pipeline
            .get_bind_group_layout(FRAME_GROUP_ID),
        entries: &[
            wgpu::BindGroupEntry {
                binding: HIT_POINT_BINDING_ID,
                resource: frame.hit_points.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: NORMAL_BINDING_ID,
                resource: frame.normals.as_entire_binding(),
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
        ],
        label: Some("Distance Frame Bind Group"),
    })
}

fn reference_frame_group(
    device: &wgpu::Device,
    pipelines: &TracePipelines,
    frame: &FrameBuffers,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipelines
            .reference_pipeline
            .get_bind_group_layout(FRAME_GROUP_ID),
        entries: &[wgpu::BindGroupEntry {
            binding: RADIANCE_BINDING_ID,
            resource: frame.radiance.as_entire_binding(),
        }],
        label: Some("Reference Frame Bind Group"),
    })
}

fn scene_group(
    device: &wgpu::Device,
    pipeline: &wgpu::ComputePipeline,
    scene: &SceneBuffers,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipeline.get_bind_group_layout(SCENE_GROUP_ID),
        entries: &[
            wgpu::BindGroupEntry {
                binding: PARALLELOGRAM_BINDING_ID,
                resource: scene.quads.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: MATERIAL_BINDING_ID,
                resource: scene.materials.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: LIGHT_BINDING_ID,
                resource: scene.lights.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BVH_NODE_BINDING_ID,
                resource: scene.bvh_nodes.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: BVH_INDEX_BINDING_ID,
                resource: scene.bvh_indices.as_entire_binding(),
            },
        ],
        label: Some(label),
    })
}

fn camera_group(
    device: &wgpu::Device,
    pipeline: &wgpu::ComputePipeline,
    camera_buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipeline.get_bind_group_layout(CAMERA_GROUP_ID),
        entries: &[wgpu::BindGroupEntry {
            binding: CAMERA_BINDING_ID,
            resource: camera_buffer.as_entire_binding(),
        }],
        label: Some(label),
    })
}
