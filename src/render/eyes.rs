use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use tracing::warn;
use wgpu::util::DeviceExt;

use crate::events::SurfaceId;
use crate::source::ImageHandle;
use crate::stereo::mapping::{EyeSampling, EyeViews};
use crate::stereo::placement::{EyePlacement, FlatPlacement, PlacementPair};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         quad coord
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

/// Matches `EyeParams` in eye.wgsl, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct EyeUniform {
    ndc_scale: [f32; 2],
    ndc_offset: [f32; 2],
    uv_origin: [f32; 2],
    uv_extent: [f32; 2],
}

/// Perspective parameters for the split presentation. Surfaces sit at
/// `viewing_distance`, so the frustum reduces to one half-height term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub viewing_distance: f32,
    pub fov_y_radians: f32,
    /// |x| of either eye center at the configured default separation. Each
    /// half-view is recentered on its slot, so moving separation away from
    /// the default reads as convergence rather than sliding both halves
    /// off-screen.
    pub eye_center_x: f32,
}

/// What to draw this frame. `None` slots (no source) clear to black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPlan {
    /// Both layers drawn overlapped and contain-fit to the window.
    Flat {
        placement: FlatPlacement,
        eye_aspect: f32,
    },
    /// One half of the window per eye, each with its own viewport.
    Split {
        placements: PlacementPair,
        projection: Projection,
    },
}

const LEFT_SURFACE: SurfaceId = SurfaceId(0);
const RIGHT_SURFACE: SurfaceId = SurfaceId(1);

/// Bottom-to-top order of the overlapped flat layers; the last one drawn
/// is the one the preview shows. Eye swap relabels the sampled content,
/// so unswapped the right eye is on top and swapped the left.
const FLAT_LAYERS_BOTTOM_TO_TOP: [SurfaceId; 2] = [LEFT_SURFACE, RIGHT_SURFACE];

struct EyeTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct EyeSlot {
    surface_id: SurfaceId,
    uniform: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    image: Option<ImageHandle>,
    window: EyeSampling,
}

impl EyeSlot {
    fn new(device: &wgpu::Device, surface_id: SurfaceId, label: &str) -> Self {
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<EyeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            surface_id,
            uniform,
            bind_group: None,
            image: None,
            window: EyeSampling {
                origin_u: 0.0,
                origin_v: 0.0,
                extent_u: 1.0,
                extent_v: 1.0,
            },
        }
    }
}

/// Owns the GPU resources for both eye surfaces: one texture per decoded
/// image, one uniform/bind-group slot per eye, and the shared quad pipeline.
pub struct EyeRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vbuf: wgpu::Buffer,
    textures: HashMap<ImageHandle, EyeTexture>,
    left: EyeSlot,
    right: EyeSlot,
}

impl EyeRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("eye-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/eye.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("eye-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("eye-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("eye-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("eye-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("eye-quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            bind_layout,
            sampler,
            vbuf,
            textures: HashMap::new(),
            left: EyeSlot::new(device, LEFT_SURFACE, "eye-uniform-left"),
            right: EyeSlot::new(device, RIGHT_SURFACE, "eye-uniform-right"),
        }
    }

    pub fn surface_ids(&self) -> (SurfaceId, SurfaceId) {
        (self.left.surface_id, self.right.surface_id)
    }

    fn slot(&self, id: SurfaceId) -> &EyeSlot {
        if id == self.right.surface_id {
            &self.right
        } else {
            &self.left
        }
    }

    pub fn upload_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        handle: ImageHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        debug_assert_eq!(pixels.len() as u64, 4 * width as u64 * height as u64);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("eye-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(
            handle,
            EyeTexture {
                _texture: texture,
                view,
            },
        );
    }

    /// Releases the texture behind `handle`. Any slot still pointing at it
    /// is unbound so the pass never samples a released resource.
    pub fn release_image(&mut self, handle: ImageHandle) {
        self.textures.remove(&handle);
        for slot in [&mut self.left, &mut self.right] {
            if slot.image == Some(handle) {
                slot.bind_group = None;
                slot.image = None;
            }
        }
    }

    /// Drops both per-eye bind groups; the next frame clears to black until
    /// `set_views` binds new ones.
    pub fn release_eye_bindings(&mut self) {
        self.left.bind_group = None;
        self.left.image = None;
        self.right.bind_group = None;
        self.right.image = None;
    }

    /// Points each eye slot at its image and sampling window. Windows are
    /// normalized for clamp-to-edge addressing before upload.
    pub fn set_views(&mut self, device: &wgpu::Device, views: &EyeViews) {
        let Self {
            bind_layout,
            sampler,
            textures,
            left,
            right,
            ..
        } = self;
        for (slot, view) in [(left, &views.left), (right, &views.right)] {
            slot.window = view.sampling.sampler_window();
            slot.image = Some(view.image.handle);
            slot.bind_group = match textures.get(&view.image.handle) {
                Some(texture) => Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("eye-bind-group"),
                    layout: bind_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: slot.uniform.as_entire_binding(),
                        },
                    ],
                })),
                None => {
                    warn!(handle = view.image.handle.0, "eye view references an unknown texture");
                    None
                }
            };
        }
    }

    /// Records one pass onto `target` and submits it. With `plan` absent or
    /// slots unbound the frame is a plain clear.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
        plan: Option<RenderPlan>,
    ) {
        let bound = self.left.bind_group.is_some() && self.right.bind_group.is_some();
        if let (Some(plan), true) = (plan, bound) {
            self.write_uniforms(queue, plan, width, height);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("eye-encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("eye-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(plan), true) = (plan, bound) {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_vertex_buffer(0, self.vbuf.slice(..));
                match plan {
                    RenderPlan::Flat { .. } => {
                        // Layers overlap exactly; the right slot draws last
                        // and is the one the flat preview shows.
                        for id in FLAT_LAYERS_BOTTOM_TO_TOP {
                            let slot = self.slot(id);
                            if let Some(bind_group) = &slot.bind_group {
                                rpass.set_bind_group(0, bind_group, &[]);
                                rpass.draw(0..4, 0..1);
                            }
                        }
                    }
                    RenderPlan::Split { .. } => {
                        let half = width as f32 * 0.5;
                        for (slot, x) in [(&self.left, 0.0), (&self.right, half)] {
                            if let Some(bind_group) = &slot.bind_group {
                                rpass.set_viewport(x, 0.0, half, height as f32, 0.0, 1.0);
                                rpass.set_bind_group(0, bind_group, &[]);
                                rpass.draw(0..4, 0..1);
                            }
                        }
                    }
                }
            }
        }
        queue.submit([encoder.finish()]);
    }

    fn write_uniforms(&self, queue: &wgpu::Queue, plan: RenderPlan, width: u32, height: u32) {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        match plan {
            RenderPlan::Flat {
                placement,
                eye_aspect,
            } => {
                let (ndc_scale, ndc_offset) = flat_ndc(&placement, eye_aspect, width, height);
                for slot in [&self.left, &self.right] {
                    write_eye(queue, slot, ndc_scale, ndc_offset);
                }
            }
            RenderPlan::Split {
                placements,
                projection,
            } => {
                let half_aspect = (width * 0.5) / height;
                for (slot, eye, center_x) in [
                    (&self.left, &placements.left, -projection.eye_center_x),
                    (&self.right, &placements.right, projection.eye_center_x),
                ] {
                    let (ndc_scale, ndc_offset) =
                        spatial_ndc(eye, center_x, &projection, half_aspect);
                    write_eye(queue, slot, ndc_scale, ndc_offset);
                }
            }
        }
    }
}

fn write_eye(queue: &wgpu::Queue, slot: &EyeSlot, ndc_scale: [f32; 2], ndc_offset: [f32; 2]) {
    queue.write_buffer(
        &slot.uniform,
        0,
        bytemuck::bytes_of(&EyeUniform {
            ndc_scale,
            ndc_offset,
            uv_origin: [slot.window.origin_u, slot.window.origin_v],
            uv_extent: [slot.window.extent_u, slot.window.extent_v],
        }),
    );
}

// Contain-fit times zoom; pan converts window pixels to NDC, y flipped.
fn flat_ndc(
    placement: &FlatPlacement,
    eye_aspect: f32,
    width: f32,
    height: f32,
) -> ([f32; 2], [f32; 2]) {
    let window_aspect = width / height;
    let (half_w, half_h) = if eye_aspect >= window_aspect {
        (1.0, window_aspect / eye_aspect)
    } else {
        (eye_aspect / window_aspect, 1.0)
    };
    (
        [half_w * placement.zoom, half_h * placement.zoom],
        [
            2.0 * placement.pan_x / width,
            -2.0 * placement.pan_y / height,
        ],
    )
}

// Exact perspective for surfaces at the viewing distance: the frustum's
// half-height there is d * tan(fov/2), so NDC is a division by it.
fn spatial_ndc(
    eye: &EyePlacement,
    center_x: f32,
    projection: &Projection,
    viewport_aspect: f32,
) -> ([f32; 2], [f32; 2]) {
    let half_height = projection.viewing_distance * (projection.fov_y_radians * 0.5).tan();
    let half_width = half_height * viewport_aspect;
    (
        [
            (eye.scale_x * 0.5) / half_width,
            (eye.scale_y * 0.5) / half_height,
        ],
        [(eye.x - center_x) / half_width, eye.y / half_height],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ImageInfo, StereoSource};
    use crate::stereo::mapping::{DEFAULT_GUARD_MARGIN, ViewAdjustment, map_eyes};

    #[test]
    fn flat_top_layer_follows_the_eye_swap() {
        let source = StereoSource::Composite {
            image: ImageInfo {
                handle: ImageHandle(1),
                width: 2000,
                height: 1000,
            },
        };
        // The right slot wins the overdraw.
        assert_eq!(FLAT_LAYERS_BOTTOM_TO_TOP[1], RIGHT_SURFACE);
        // Unswapped it samples the right half of the composite.
        let plain = map_eyes(&source, ViewAdjustment::default(), DEFAULT_GUARD_MARGIN);
        assert!(plain.right.sampling.origin_u > 0.5);
        // Swap relabels the views, so the left half moves on top.
        let swapped = map_eyes(
            &source,
            ViewAdjustment {
                swap_eyes: true,
                ..ViewAdjustment::default()
            },
            DEFAULT_GUARD_MARGIN,
        );
        assert!(swapped.right.sampling.origin_u < 0.5);
    }

    #[test]
    fn flat_fit_limits_on_the_narrow_axis() {
        let placement = FlatPlacement {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        };
        // Wide image in a square window fills the width.
        let (scale, _) = flat_ndc(&placement, 2.0, 800.0, 800.0);
        assert_eq!(scale, [1.0, 0.5]);
        // Tall image in a wide window fills the height.
        let (scale, _) = flat_ndc(&placement, 0.5, 1600.0, 800.0);
        assert_eq!(scale, [0.25, 1.0]);
    }

    #[test]
    fn flat_pan_moves_in_window_pixels() {
        let placement = FlatPlacement {
            pan_x: 200.0,
            pan_y: 100.0,
            zoom: 1.0,
        };
        let (_, offset) = flat_ndc(&placement, 1.0, 800.0, 400.0);
        assert_eq!(offset, [0.5, -0.5]);
    }

    #[test]
    fn surface_matching_the_frustum_fills_the_viewport() {
        let projection = Projection {
            viewing_distance: 0.95,
            fov_y_radians: std::f32::consts::FRAC_PI_2,
            eye_center_x: 0.0,
        };
        let half_height = 0.95 * (projection.fov_y_radians * 0.5).tan();
        let eye = EyePlacement {
            x: 0.0,
            y: 0.0,
            z: -0.95,
            scale_x: 2.0 * half_height,
            scale_y: 2.0 * half_height,
        };
        let (scale, offset) = spatial_ndc(&eye, 0.0, &projection, 1.0);
        assert!((scale[0] - 1.0).abs() < 1e-6);
        assert!((scale[1] - 1.0).abs() < 1e-6);
        assert_eq!(offset, [0.0, 0.0]);
    }

    #[test]
    fn slot_centering_cancels_the_default_separation() {
        let projection = Projection {
            viewing_distance: 1.0,
            fov_y_radians: std::f32::consts::FRAC_PI_2,
            eye_center_x: 0.51,
        };
        let eye = EyePlacement {
            x: -0.51,
            y: 0.0,
            z: -1.0,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        let (_, offset) = spatial_ndc(&eye, -projection.eye_center_x, &projection, 1.0);
        assert_eq!(offset[0], 0.0);
    }
}
