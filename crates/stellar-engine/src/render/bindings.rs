use stellar_core::{BufferIndex, FrameData, FrameUniforms, InstanceRecord, ViewportUniform};

use super::common::binding_size;
use super::ctx::RenderCtx;

/// Per-frame GPU buffers shared by every pass: frame uniforms, viewport and
/// the instance storage buffer, all in bind group 0.
#[derive(Default)]
pub struct FrameBindings {
    layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,

    uniforms_ubo: Option<wgpu::Buffer>,
    viewport_ubo: Option<wgpu::Buffer>,

    instance_ssbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
    instance_count: u32,
}

impl FrameBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind group layout for group 0. Created on first use.
    pub fn layout(&mut self, ctx: &RenderCtx<'_>) -> &wgpu::BindGroupLayout {
        self.layout.get_or_insert_with(|| {
            let vs_fs = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("stellar frame bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: BufferIndex::Uniforms.slot(),
                        visibility: vs_fs,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: binding_size::<FrameUniforms>(),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: BufferIndex::Viewport.slot(),
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: binding_size::<ViewportUniform>(),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: BufferIndex::Instances.slot(),
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: binding_size::<InstanceRecord>(),
                        },
                        count: None,
                    },
                ],
            })
        })
    }

    /// Bind group for the last uploaded frame.
    #[inline]
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    /// Instances uploaded by the last [`upload`](Self::upload).
    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Uploads a complete published frame.
    pub fn upload(&mut self, ctx: &RenderCtx<'_>, frame: &FrameData) {
        self.layout(ctx);
        self.ensure_uniform_buffers(ctx);
        let grew = self.ensure_instance_capacity(ctx, frame.instances.len());
        if grew || self.bind_group.is_none() {
            self.rebuild_bind_group(ctx);
        }

        let (Some(ubo), Some(vubo), Some(ssbo)) = (
            self.uniforms_ubo.as_ref(),
            self.viewport_ubo.as_ref(),
            self.instance_ssbo.as_ref(),
        ) else {
            return;
        };

        ctx.queue
            .write_buffer(ubo, 0, bytemuck::bytes_of(&frame.uniforms));
        ctx.queue.write_buffer(
            vubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                size: [ctx.viewport.width.max(1.0), ctx.viewport.height.max(1.0)],
                _pad: [0.0; 2],
            }),
        );
        if !frame.instances.is_empty() {
            ctx.queue.write_buffer(ssbo, 0, frame.instances.as_bytes());
        }
        self.instance_count = frame.instances.len() as u32;
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_uniform_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.uniforms_ubo.is_some() && self.viewport_ubo.is_some() {
            return;
        }

        self.uniforms_ubo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stellar frame uniforms ubo"),
            size: FrameUniforms::SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.viewport_ubo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stellar viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.bind_group = None;
    }

    /// Returns `true` if the buffer was (re)created.
    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) -> bool {
        if required <= self.instance_capacity && self.instance_ssbo.is_some() {
            return false;
        }
        let new_cap = required.next_power_of_two().max(64);
        log::debug!("instance buffer: {} -> {new_cap} records", self.instance_capacity);

        self.instance_ssbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stellar instance ssbo"),
            size: (new_cap * InstanceRecord::SIZE) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
        true
    }

    fn rebuild_bind_group(&mut self, ctx: &RenderCtx<'_>) {
        let (Some(layout), Some(ubo), Some(vubo), Some(ssbo)) = (
            self.layout.as_ref(),
            self.uniforms_ubo.as_ref(),
            self.viewport_ubo.as_ref(),
            self.instance_ssbo.as_ref(),
        ) else {
            return;
        };

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stellar frame bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: BufferIndex::Uniforms.slot(),
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BufferIndex::Viewport.slot(),
                    resource: vubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BufferIndex::Instances.slot(),
                    resource: ssbo.as_entire_binding(),
                },
            ],
        }));
    }
}
