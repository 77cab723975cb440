use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stellar_core::{BufferIndex, Vertex};
use wgpu::util::DeviceExt;

use super::bindings::FrameBindings;
use super::common::{additive_blend, triangle_list};
use super::ctx::{RenderCtx, RenderTarget};

/// Parameters for [`generate_starfield`].
#[derive(Debug, Clone)]
pub struct StarfieldConfig {
    pub count: usize,
    /// Stars are placed in `[-half_extent, half_extent]²`.
    pub half_extent: f32,
    pub seed: u64,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            half_extent: 4000.0,
            seed: 0x5EED_57A2,
        }
    }
}

/// Deterministic starfield: the same config always yields the same stars.
///
/// Size stands in for depth (near stars are big, bright and opaque).
pub fn generate_starfield(config: &StarfieldConfig) -> Vec<Vertex> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let e = config.half_extent.max(1.0);

    (0..config.count)
        .map(|_| {
            let position = [rng.random_range(-e..=e), rng.random_range(-e..=e)];
            let depth: f32 = rng.random_range(0.1..0.9);
            let size = ((1.0 - depth) * 5.0).max(2.0);
            let brightness: f32 = rng.random_range(0.5..1.0);
            // Blue/white/purple tint.
            let tint: f32 = rng.random_range(0.0..TAU);
            Vertex {
                position,
                color: [
                    brightness * (0.8 + 0.1 * tint.sin()),
                    brightness * (0.9 + 0.1 * tint.cos()),
                    brightness,
                    brightness * (1.0 - depth * 0.5),
                ],
                size,
            }
        })
        .collect()
}

/// Draws the background starfield behind the entity pass.
#[derive(Default)]
pub struct StarfieldRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    stars: Vec<Vertex>,
    star_vbo: Option<wgpu::Buffer>,
}

impl StarfieldRenderer {
    pub fn new(stars: Vec<Vertex>) -> Self {
        Self {
            stars,
            ..Self::default()
        }
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        bindings: &mut FrameBindings,
    ) {
        if self.stars.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx, bindings);
        self.ensure_star_buffer(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = bindings.bind_group() else { return };
        let Some(star_vbo) = self.star_vbo.as_ref() else { return };

        let mut rpass = target.load_pass("stellar starfield pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(BufferIndex::Vertices.slot(), star_vbo.slice(..));
        rpass.draw(0..6, 0..self.stars.len() as u32);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, bindings: &mut FrameBindings) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stellar starfield shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/starfield.wgsl").into()),
        });

        let bgl = bindings.layout(ctx);
        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stellar starfield pipeline layout"),
            bind_group_layouts: &[bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stellar starfield pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[star_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(additive_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }

    fn ensure_star_buffer(&mut self, ctx: &RenderCtx<'_>) {
        if self.star_vbo.is_some() {
            return;
        }
        self.star_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stellar starfield vbo"),
            contents: bytemuck::cast_slice(&self.stars),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        log::debug!("starfield uploaded: {} stars", self.stars.len());
    }
}

const STAR_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x4, // color
    2 => Float32    // size
];

/// One `Vertex` per star, advanced per instance; the quad corner comes from `vertex_index`.
fn star_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &STAR_ATTRS,
    }
}
