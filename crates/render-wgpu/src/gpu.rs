use std::collections::BTreeMap;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use nebula_scene::{Camera, Environment, LightKind, Mesh, Scene};
use wgpu::util::DeviceExt;

use crate::mesh::{MeshAtlas, Vertex};
use crate::shaders;

const MAX_POINT_LIGHTS: usize = 4;
const MAX_TRAIL_POINTS: usize = 1024;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    sun_direction: [f32; 4],
    sun_color: [f32; 4],
    point_position: [[f32; 4]; MAX_POINT_LIGHTS],
    point_color: [[f32; 4]; MAX_POINT_LIGHTS],
    point_count: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
    emissive: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct StarVertex {
    position: [f32; 3],
    color: [f32; 4],
}

/// Per-frame instance list, grouped so each mesh is one contiguous range.
#[derive(Debug, Default)]
struct Batch {
    instances: Vec<InstanceData>,
    ranges: Vec<(Mesh, Range<u32>)>,
}

fn scaled(color: [f32; 4], k: f32) -> [f32; 4] {
    [color[0] * k, color[1] * k, color[2] * k, color[3]]
}

fn add(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], 1.0]
}

/// Fold the environment's lights and the camera into shader uniforms.
///
/// Ambient lights are summed, the first directional light becomes the sun,
/// and point lights past [`MAX_POINT_LIGHTS`] are dropped.
fn frame_uniforms(env: &Environment, camera: &Camera) -> Uniforms {
    let mut u = Uniforms {
        view_proj: camera.view_projection().to_cols_array_2d(),
        ambient: [0.0, 0.0, 0.0, 1.0],
        sun_direction: [0.0; 4],
        sun_color: [0.0, 0.0, 0.0, 1.0],
        point_position: [[0.0; 4]; MAX_POINT_LIGHTS],
        point_color: [[0.0; 4]; MAX_POINT_LIGHTS],
        point_count: [0; 4],
    };
    let mut sun = false;
    let mut points = 0usize;
    for light in &env.lights {
        let c = scaled(light.color, light.intensity);
        match light.kind {
            LightKind::Ambient => u.ambient = add(u.ambient, c),
            LightKind::Directional { position } if !sun => {
                sun = true;
                u.sun_direction = position.normalize_or_zero().extend(0.0).to_array();
                u.sun_color = c;
            }
            LightKind::Directional { .. } => {}
            LightKind::Point { position, range } if points < MAX_POINT_LIGHTS => {
                u.point_position[points] = position.extend(range.max(f32::EPSILON)).to_array();
                u.point_color[points] = c;
                points += 1;
            }
            LightKind::Point { .. } => {}
        }
    }
    u.point_count[0] = points as u32;
    u
}

/// One instance per part of every visible node, at most `limit` in total.
fn batch(scene: &Scene, limit: usize) -> Batch {
    let mut by_mesh: BTreeMap<Mesh, Vec<InstanceData>> = BTreeMap::new();
    let mut count = 0usize;
    'nodes: for node in scene.visible_nodes() {
        let t = &node.transform;
        let base = Mat4::from_scale_rotation_translation(t.scale, t.rotation, t.position);
        for part in &node.parts {
            if count == limit {
                break 'nodes;
            }
            let l = &part.local;
            let model = base * Mat4::from_scale_rotation_translation(l.scale, l.rotation, l.position);
            let cols = model.to_cols_array_2d();
            by_mesh.entry(part.mesh).or_default().push(InstanceData {
                model_0: cols[0],
                model_1: cols[1],
                model_2: cols[2],
                model_3: cols[3],
                color: node.part_color(part),
                emissive: part.emissive,
            });
            count += 1;
        }
    }

    let mut batch = Batch::default();
    for (mesh, list) in by_mesh {
        let start = batch.instances.len() as u32;
        batch.instances.extend(list);
        batch.ranges.push((mesh, start..batch.instances.len() as u32));
    }
    batch
}

/// Every visible node's trail as colored points, at most `limit` in total.
fn trail_vertices(scene: &Scene, limit: usize) -> Vec<StarVertex> {
    scene
        .visible_nodes()
        .filter_map(|node| node.trail.as_ref())
        .flat_map(|trail| {
            trail.points().enumerate().map(move |(i, p)| StarVertex {
                position: p.to_array(),
                color: trail.point_color(i),
            })
        })
        .take(limit)
        .collect()
}

type StarKey = (usize, Option<[u32; 3]>, [u32; 4]);

/// Identifies a star field and its color so it is only re-uploaded when
/// either changes.
fn star_key(env: &Environment) -> StarKey {
    (
        env.stars.len(),
        env.stars.first().map(|s| s.to_array().map(f32::to_bits)),
        env.star_color.map(f32::to_bits),
    )
}

/// wgpu-based scene painter. Owns pipelines and buffers, not the surface.
pub struct WgpuRenderer {
    mesh_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    atlas: MeshAtlas,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
    stars: Option<(wgpu::Buffer, u32)>,
    stars_key: StarKey,
    trail_buffer: wgpu::Buffer,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    dropped_warned: bool,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&frame_uniforms(
                &Environment::default(),
                &Camera::default(),
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MESH_SHADER.into()),
        });

        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                            7 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let star_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("star_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::STAR_SHADER.into()),
        });

        let star_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("star_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &star_shader,
                entry_point: Some("vs_star"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<StarVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &star_shader,
                entry_point: Some("fs_star"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            // Stars sit behind everything and never occlude.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let atlas = MeshAtlas::build();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertex_buffer"),
            contents: bytemuck::cast_slice(&atlas.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_index_buffer"),
            contents: bytemuck::cast_slice(&atlas.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let max_instances = 10_000u32;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (max_instances as u64) * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let trail_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trail_vertex_buffer"),
            size: (MAX_TRAIL_POINTS * std::mem::size_of::<StarVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            mesh_pipeline,
            star_pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            max_instances,
            stars: None,
            stars_key: (0, None, [0; 4]),
            trail_buffer,
            depth_texture,
            surface_format,
            dropped_warned: false,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    fn upload_stars(&mut self, device: &wgpu::Device, env: &Environment) {
        let key = star_key(env);
        if key == self.stars_key {
            return;
        }
        self.stars_key = key;
        self.stars = if env.stars.is_empty() {
            None
        } else {
            let verts: Vec<StarVertex> = env
                .stars
                .iter()
                .map(|p: &Vec3| StarVertex {
                    position: p.to_array(),
                    color: env.star_color,
                })
                .collect();
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("star_vertex_buffer"),
                contents: bytemuck::cast_slice(&verts),
                usage: wgpu::BufferUsages::VERTEX,
            });
            Some((buffer, verts.len() as u32))
        };
        tracing::debug!(stars = env.stars.len(), "star field uploaded");
    }

    /// Render one frame: star field, every visible node's parts, then
    /// engine trails.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &Camera,
    ) {
        let env = &scene.environment;
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&frame_uniforms(env, camera)),
        );
        self.upload_stars(device, env);

        let batch = batch(scene, self.max_instances as usize);
        let wanted: usize = scene.visible_nodes().map(|n| n.parts.len()).sum();
        if wanted > batch.instances.len() && !self.dropped_warned {
            self.dropped_warned = true;
            tracing::warn!(
                wanted,
                max = self.max_instances,
                "instance buffer full, parts dropped"
            );
        }
        if !batch.instances.is_empty() {
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&batch.instances),
            );
        }

        let trail = trail_vertices(scene, MAX_TRAIL_POINTS);
        if !trail.is_empty() {
            queue.write_buffer(&self.trail_buffer, 0, bytemuck::cast_slice(&trail));
        }

        let [r, g, b, a] = env.background.map(f64::from);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if let Some((buffer, count)) = &self.stars {
                pass.set_pipeline(&self.star_pipeline);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..*count, 0..1);
            }

            if !batch.instances.is_empty() {
                pass.set_pipeline(&self.mesh_pipeline);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                for (mesh, instances) in &batch.ranges {
                    let Some(range) = self.atlas.range(*mesh) else {
                        continue;
                    };
                    pass.draw_indexed(
                        range.first_index..range.first_index + range.index_count,
                        range.base_vertex,
                        instances.clone(),
                    );
                }
            }

            // After the meshes, so the hull hides the points behind it.
            if !trail.is_empty() {
                pass.set_pipeline(&self.star_pipeline);
                pass.set_vertex_buffer(0, self.trail_buffer.slice(..));
                pass.draw(0..trail.len() as u32, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
