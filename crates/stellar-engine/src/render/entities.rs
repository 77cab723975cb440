use wgpu::util::DeviceExt;

use super::bindings::FrameBindings;
use super::common::{premul_alpha_blend, triangle_list, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::ctx::{RenderCtx, RenderTarget};

/// Draws every instance of the uploaded frame as a procedurally shaded quad.
///
/// Instances come from the storage buffer in [`FrameBindings`]; the only
/// vertex input is the shared unit quad.
#[derive(Default)]
pub struct EntityRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl EntityRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        bindings: &mut FrameBindings,
    ) {
        let count = bindings.instance_count();
        if count == 0 {
            return;
        }

        self.ensure_pipeline(ctx, bindings);
        self.ensure_static_buffers(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = bindings.bind_group() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        let mut rpass = target.load_pass("stellar entity pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..count);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, bindings: &mut FrameBindings) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stellar entity shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/entities.wgsl").into()),
        });

        let bgl = bindings.layout(ctx);
        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stellar entity pipeline layout"),
            bind_group_layouts: &[bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stellar entity pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("entity pipeline built for {:?}", ctx.surface_format);
        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stellar entity quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stellar entity quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }
}
