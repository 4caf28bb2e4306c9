//! Scene lights and the uniform they are packed into.
//!
//! All lights share one uniform buffer: the ambient term, up to
//! [`MAX_LIGHTS`] directional or point lights and one shadow matrix per shadow
//! casting directional light. The shadow maps themselves live in a depth array
//! bound next to the uniform.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::{camera::OPENGL_TO_WGPU_MATRIX, color::Color, data_structures::texture::Texture};

pub const MAX_LIGHTS: usize = 4;
pub const MAX_SHADOWS: usize = 2;

/// Half the extent of the orthographic box a directional light renders
/// shadows in.
const SHADOW_EXTENT: f32 = 5.0;
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;

#[derive(Clone, Debug, PartialEq)]
pub enum LightKind {
    /// Lights everything evenly from all directions.
    Ambient,
    /// Parallel rays shining from `position` towards `target`.
    Directional {
        position: Point3<f32>,
        target: Point3<f32>,
        cast_shadow: bool,
    },
    /// Shines in all directions from `position`, falling off with the square
    /// of the distance.
    Point { position: Point3<f32> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub name: String,
    pub color: Color,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn ambient(name: &str, hex: u32, intensity: f32) -> Self {
        Self {
            name: name.to_string(),
            color: Color::from_hex(hex),
            intensity,
            kind: LightKind::Ambient,
        }
    }

    pub fn directional<P: Into<Point3<f32>>>(name: &str, hex: u32, intensity: f32, position: P, target: P) -> Self {
        Self {
            name: name.to_string(),
            color: Color::from_hex(hex),
            intensity,
            kind: LightKind::Directional {
                position: position.into(),
                target: target.into(),
                cast_shadow: false,
            },
        }
    }

    pub fn point<P: Into<Point3<f32>>>(name: &str, hex: u32, intensity: f32, position: P) -> Self {
        Self {
            name: name.to_string(),
            color: Color::from_hex(hex),
            intensity,
            kind: LightKind::Point {
                position: position.into(),
            },
        }
    }

    /// Only directional lights can cast shadows; other kinds are unchanged.
    pub fn with_shadow(mut self) -> Self {
        if let LightKind::Directional { cast_shadow, .. } = &mut self.kind {
            *cast_shadow = true;
        }
        self
    }

    pub fn casts_shadow(&self) -> bool {
        matches!(self.kind, LightKind::Directional { cast_shadow: true, .. })
    }

    /// View projection of the light's orthographic shadow camera.
    pub fn shadow_view_proj(&self) -> Option<Matrix4<f32>> {
        let LightKind::Directional { position, target, .. } = self.kind else {
            return None;
        };
        let direction = (target - position).normalize();
        // look_at breaks down when looking along the up vector
        let up = if direction.y.abs() > 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(position, target, up);
        let proj = cgmath::ortho(
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );
        Some(OPENGL_TO_WGPU_MATRIX * proj * view)
    }
}

/// Every light in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct LightRig {
    pub lights: Vec<Light>,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            lights: vec![
                Light::ambient("ambient", 0x404040, 0.4),
                Light::directional("key", 0xffffff, 0.6, (5.0, 10.0, 7.5), (0.0, 0.0, 0.0)).with_shadow(),
                Light::point("back", 0xffffff, 1.0, (-10.0, 10.0, 10.0)),
                Light::directional("top", 0xffffff, 0.8, (0.0, 10.0, 0.0), (0.0, 1.05, -1.0)).with_shadow(),
                Light::point("fill", 0xffffff, 0.3, (2.0, 5.0, 3.0)),
            ],
        }
    }
}

impl LightRig {
    /// Shadow casting lights in the order of their shadow map layers.
    pub fn shadow_casters(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(|light| light.casts_shadow()).take(MAX_SHADOWS)
    }

    pub fn to_uniform(&self) -> LightsUniform {
        let mut uniform = <LightsUniform as bytemuck::Zeroable>::zeroed();
        let mut ambient = [0.0; 3];
        let mut count = 0;
        let mut shadows = 0;

        for light in &self.lights {
            if light.kind != LightKind::Ambient && count == MAX_LIGHTS {
                log::warn!("Light {} exceeds the limit of {MAX_LIGHTS} lights and is ignored", light.name);
                continue;
            }
            let color = light.color.scaled(light.intensity);
            let raw = match light.kind {
                LightKind::Ambient => {
                    for (sum, c) in ambient.iter_mut().zip(color) {
                        *sum += c;
                    }
                    continue;
                }
                LightKind::Directional { position, target, .. } => {
                    let shadow_layer = match light.shadow_view_proj() {
                        Some(view_proj) if light.casts_shadow() && shadows < MAX_SHADOWS => {
                            uniform.shadow_view_proj[shadows] = view_proj.into();
                            shadows += 1;
                            (shadows - 1) as f32
                        }
                        _ => -1.0,
                    };
                    let to_light = (position - target).normalize();
                    LightRaw {
                        position: [0.0; 4],
                        direction: to_light.extend(0.0).into(),
                        color: [color[0], color[1], color[2], shadow_layer],
                    }
                }
                LightKind::Point { position } => LightRaw {
                    position: position.to_vec().extend(1.0).into(),
                    direction: [0.0; 4],
                    color: [color[0], color[1], color[2], -1.0],
                },
            };
            uniform.lights[count] = raw;
            count += 1;
        }

        uniform.ambient = [ambient[0], ambient[1], ambient[2], 1.0];
        uniform.counts = [count as u32, shadows as u32, 0, 0];
        uniform
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    /// `w` is 1 for point lights.
    position: [f32; 4],
    /// Towards the light, for directional lights.
    direction: [f32; 4],
    /// Color premultiplied by intensity; `w` is the shadow map layer or -1.
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    ambient: [f32; 4],
    shadow_view_proj: [[[f32; 4]; 4]; MAX_SHADOWS],
    lights: [LightRaw; MAX_LIGHTS],
    /// Number of lights, number of shadow maps.
    counts: [u32; 4],
}

impl LightsUniform {
    pub fn shadow_view_proj(&self, layer: usize) -> Option<[[f32; 4]; 4]> {
        (layer < self.counts[1] as usize).then(|| self.shadow_view_proj[layer])
    }

    /// Shadow map layers in use, with the view projection rendered into each.
    pub fn shadow_layers(&self) -> impl Iterator<Item = (usize, [[f32; 4]; 4])> + '_ {
        (0..MAX_SHADOWS).filter_map(|layer| Some((layer, self.shadow_view_proj(layer)?)))
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

/// The light uniform, the shadow maps and the bind group exposing both.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub shadow_maps: Texture,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, rig: &LightRig, shadow_map_size: u32) -> Self {
        let uniform = rig.to_uniform();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow_maps = Texture::create_shadow_maps(device, shadow_map_size, MAX_SHADOWS as u32);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &shadow_maps);

        Self {
            uniform,
            buffer,
            shadow_maps,
            bind_group,
            bind_group_layout,
        }
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_maps: &Texture,
) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &shadow_maps.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = device.create_sampler(&wgpu::SamplerDescriptor {
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            });
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_maps.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::Transform;

    use super::*;

    #[test]
    fn default_rig_has_two_shadow_casters() {
        let rig = LightRig::default();
        let casters: Vec<_> = rig.shadow_casters().map(|l| l.name.as_str()).collect();
        assert_eq!(casters, vec!["key", "top"]);
        assert_eq!(rig.lights.len(), 5);
    }

    #[test]
    fn uniform_packs_ambient_separately() {
        let uniform = LightRig::default().to_uniform();
        assert_eq!(uniform.counts, [4, 2, 0, 0]);
        let ambient = Color::from_hex(0x404040).scaled(0.4);
        assert_eq!(&uniform.ambient[..3], &ambient[..]);
        // the back light is a point light
        assert_eq!(uniform.lights[1].position[3], 1.0);
        assert_eq!(uniform.lights[0].color[3], 0.0);
        assert_eq!(uniform.lights[2].color[3], 1.0);
        assert_eq!(uniform.lights[3].color[3], -1.0);
    }

    #[test]
    fn shadow_camera_sees_its_target() {
        let rig = LightRig::default();
        for light in rig.shadow_casters() {
            let LightKind::Directional { target, .. } = light.kind else {
                unreachable!()
            };
            let clip = light.shadow_view_proj().unwrap().transform_point(target);
            assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4, "{}: {clip:?}", light.name);
            assert!(clip.z > 0.0 && clip.z < 1.0);
        }
    }

    #[test]
    fn one_shadow_layer_per_caster() {
        let uniform = LightRig::default().to_uniform();
        let layers: Vec<usize> = uniform.shadow_layers().map(|(layer, _)| layer).collect();
        assert_eq!(layers, vec![0, 1]);

        let mut rig = LightRig::default();
        rig.lights.retain(|light| !light.casts_shadow());
        assert_eq!(rig.to_uniform().shadow_layers().count(), 0);
    }

    #[test]
    fn lights_beyond_the_limit_are_dropped() {
        let mut rig = LightRig::default();
        for i in 0..3 {
            rig.lights.push(Light::point(&format!("extra {i}"), 0xffffff, 1.0, (0.0, 0.0, 0.0)));
        }
        assert_eq!(rig.to_uniform().counts[0], MAX_LIGHTS as u32);
    }

    #[test]
    fn shadows_are_only_cast_by_directional_lights() {
        let light = Light::point("bulb", 0xffffff, 1.0, (0.0, 0.0, 0.0)).with_shadow();
        assert!(!light.casts_shadow());
        assert!(light.shadow_view_proj().is_none());
    }
}
