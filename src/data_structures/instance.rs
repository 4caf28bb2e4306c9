//! Transform data for GPU rendering.
//!
//! Every mesh primitive owns a one-element instance buffer holding its world
//! transform. The layout stays instanced so a primitive could be drawn many
//! times with a single call.

use cgmath::{Matrix, Matrix3, Matrix4, One, SquareMatrix};

use crate::data_structures::model;

/// Translation, rotation (as quaternion) and scale, applied in TRS order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// The identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
    receive_shadow: f32,
}

impl InstanceRaw {
    /// Normals are transformed by the inverse transpose of the upper 3x3 so
    /// they stay perpendicular under non-uniform scale.
    pub fn new(world: Matrix4<f32>, receive_shadow: bool) -> Self {
        let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
        let normal = linear
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix3::identity);
        Self {
            model: world.into(),
            normal: normal.into(),
            handedness: world.determinant().signum(),
            receive_shadow: if receive_shadow { 1.0 } else { 0.0 },
        }
    }
}

/**
 * Stride layout: the model matrix as four vec4 slots, the normal matrix as
 * three vec3 slots, then two scalars.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only advance to the next instance when a new instance starts
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 26]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Rotation3, Vector3};

    use super::*;

    #[test]
    fn local_matrix_applies_scale_then_rotation_then_translation() {
        let instance = Instance {
            position: Vector3::new(0.0, 1.0, 0.0),
            rotation: cgmath::Quaternion::from_angle_z(Deg(90.0)),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        let moved = instance.to_matrix() * cgmath::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((moved.truncate() - Vector3::new(0.0, 3.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn normals_stay_perpendicular_under_non_uniform_scale() {
        let world = Matrix4::from_nonuniform_scale(1.0, 3.0, 1.0) * Matrix4::from_angle_z(Deg(45.0));
        let raw = InstanceRaw::new(world, false);
        let normal_matrix = Matrix3::from(raw.normal);

        // surface spanned by the z axis and the diagonal, normal (1, -1, 0)
        let tangent = (world * cgmath::Vector4::new(1.0, 1.0, 0.0, 0.0)).truncate();
        let normal = normal_matrix * Vector3::new(1.0, -1.0, 0.0);
        assert!(tangent.dot(normal).abs() < 1e-5);
        assert_eq!(raw.handedness, 1.0);
    }

    #[test]
    fn mirrored_transforms_flip_handedness() {
        let raw = InstanceRaw::new(Matrix4::from_nonuniform_scale(-1.0, 1.0, 1.0), true);
        assert_eq!(raw.handedness, -1.0);
        assert_eq!(raw.receive_shadow, 1.0);
        assert_eq!(InstanceRaw::new(Matrix4::identity(), false).receive_shadow, 0.0);
    }

    #[test]
    fn degenerate_scale_keeps_a_usable_normal_matrix() {
        let raw = InstanceRaw::new(Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0), false);
        assert_eq!(Matrix3::from(raw.normal), Matrix3::identity());
    }
}
