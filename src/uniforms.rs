// src/uniforms.rs
//! The projection uniform set read by the patched shader every frame, plus
//! its GPU upload plumbing.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;

/// The authoritative uniform record consumed by the shader.
///
/// The camera-derived fields (`view_matrix_camera`, `projection_matrix_camera`,
/// `proj_position`, `proj_direction`) and `saved_model_matrix` are snapshots:
/// they change only when a projection operation runs, never while the host
/// application moves its camera between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionUniforms {
    /// World-to-camera matrix at snapshot time.
    pub view_matrix_camera: Mat4,
    /// Camera projection matrix at snapshot time (also refreshed by
    /// `update_from_camera`).
    pub projection_matrix_camera: Mat4,
    /// World matrix of the projection target at snapshot time; the anchor
    /// the projection is relative to.
    pub saved_model_matrix: Mat4,
    /// Projector world position at snapshot time.
    pub proj_position: Vec3,
    /// Projector direction at snapshot time (camera local +Z in world space).
    pub proj_direction: Vec3,
    /// Fitment-derived UV scale, always positive.
    pub width_scaled: f32,
    pub height_scaled: f32,
    /// User-supplied UV shift, applied unconditionally.
    pub texture_offset: Vec2,
    pub is_texture_loaded: bool,
    /// Starts false, latches true permanently on the first projection.
    pub is_texture_projected: bool,
    /// 1 normally; 0 when this material is not the first slot of a
    /// multi-material mesh.
    pub background_opacity: f32,
    /// Exclude fragments facing away from the projector.
    pub front_faces_only: bool,
}

impl Default for ProjectionUniforms {
    fn default() -> Self {
        Self {
            view_matrix_camera: Mat4::IDENTITY,
            projection_matrix_camera: Mat4::IDENTITY,
            saved_model_matrix: Mat4::IDENTITY,
            proj_position: Vec3::ZERO,
            proj_direction: Vec3::new(0.0, 0.0, -1.0),
            width_scaled: 1.0,
            height_scaled: 1.0,
            texture_offset: Vec2::ZERO,
            is_texture_loaded: false,
            is_texture_projected: false,
            background_opacity: 1.0,
            front_faces_only: true,
        }
    }
}

/// GPU-side mirror of [`ProjectionUniforms`] (matches shader layout,
/// std140-compatible: vec3s packed against a trailing scalar).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct ProjectionUniformsRaw {
    pub view_matrix_camera: [[f32; 4]; 4],
    pub projection_matrix_camera: [[f32; 4]; 4],
    pub saved_model_matrix: [[f32; 4]; 4],
    pub proj_position: [f32; 3],
    pub width_scaled: f32,
    pub proj_direction: [f32; 3],
    pub height_scaled: f32,
    pub texture_offset: [f32; 2],
    pub is_texture_loaded: u32,
    pub is_texture_projected: u32,
    pub background_opacity: f32,
    pub front_faces_only: u32,
    pub _padding: [f32; 2],
}

impl From<&ProjectionUniforms> for ProjectionUniformsRaw {
    fn from(uniforms: &ProjectionUniforms) -> Self {
        Self {
            view_matrix_camera: uniforms.view_matrix_camera.to_cols_array_2d(),
            projection_matrix_camera: uniforms.projection_matrix_camera.to_cols_array_2d(),
            saved_model_matrix: uniforms.saved_model_matrix.to_cols_array_2d(),
            proj_position: uniforms.proj_position.to_array(),
            width_scaled: uniforms.width_scaled,
            proj_direction: uniforms.proj_direction.to_array(),
            height_scaled: uniforms.height_scaled,
            texture_offset: uniforms.texture_offset.to_array(),
            is_texture_loaded: uniforms.is_texture_loaded as u32,
            is_texture_projected: uniforms.is_texture_projected as u32,
            background_opacity: uniforms.background_opacity,
            front_faces_only: uniforms.front_faces_only as u32,
            _padding: [0.0; 2],
        }
    }
}

/// Create the projection uniform GPU resources: buffer, bind group layout,
/// bind group.
pub fn create_projection_gpu_resources(
    device: &wgpu::Device,
    uniforms: &ProjectionUniforms,
) -> (wgpu::Buffer, wgpu::BindGroup, wgpu::BindGroupLayout) {
    let raw = ProjectionUniformsRaw::from(uniforms);
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("projection_uniform_buffer"),
        contents: bytemuck::cast_slice(&[raw]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("projection_bind_group_layout"),
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

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("projection_bind_group"),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });

    (buffer, bind_group, layout)
}

/// Update the GPU uniform buffer from the current projection state.
pub fn write_projection_buffer(
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    uniforms: &ProjectionUniforms,
) {
    let raw = ProjectionUniformsRaw::from(uniforms);
    queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[raw]));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<ProjectionUniformsRaw>(), 256);
        assert_eq!(std::mem::size_of::<ProjectionUniformsRaw>() % 16, 0);
    }

    #[test]
    fn test_default_state() {
        let uniforms = ProjectionUniforms::default();
        assert!(!uniforms.is_texture_projected);
        assert_eq!(uniforms.background_opacity, 1.0);
        assert_eq!(uniforms.width_scaled, 1.0);
        assert_eq!(uniforms.height_scaled, 1.0);
        assert_eq!(uniforms.proj_direction, Vec3::new(0.0, 0.0, -1.0));
        assert!(uniforms.front_faces_only);
    }

    #[test]
    fn test_raw_conversion_maps_flags() {
        let mut uniforms = ProjectionUniforms::default();
        uniforms.is_texture_loaded = true;
        uniforms.is_texture_projected = true;
        uniforms.front_faces_only = false;

        let raw = ProjectionUniformsRaw::from(&uniforms);
        assert_eq!(raw.is_texture_loaded, 1);
        assert_eq!(raw.is_texture_projected, 1);
        assert_eq!(raw.front_faces_only, 0);
        assert_eq!(raw.background_opacity, 1.0);
    }
}
