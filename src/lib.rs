// src/lib.rs
//! Texture projection for physically based materials, wgpu edition.
//!
//! A [`ProjectedMaterial`] behaves like a regular PBR material until
//! [`project`](ProjectedMaterial::project) is called; from then on it samples
//! its texture as if a slide projector sat at the camera's position at that
//! moment. Highlights:
//!
//! - `Contain`/`Cover` fitment with an extra `texture_scale` knob
//! - perspective and orthographic projector cameras
//! - instanced meshes via per-instance saved-transform attributes
//! - late-loading sources (video frames, decoding images) picked up
//!   automatically by a polling watcher
//!
//! The crate deliberately owns no render loop. Hosts hand it a
//! [`ShaderBuild`] to patch, upload [`ProjectionUniforms`] with the provided
//! helpers, and draw with their own pipelines.

pub mod camera;
pub mod error;
pub mod fitment;
pub mod load_listener;
pub mod material;
pub mod mesh;
pub mod program;
pub mod shader_patch;
pub mod texture;
pub mod uniforms;

pub use camera::{is_orthographic_camera, is_perspective_camera, Camera, CameraProjection};
pub use error::{Error, Result};
pub use fitment::{compute_scaled_dimensions, Fitment};
pub use load_listener::{watch_texture_load, LoadWatcher};
pub use material::{
    MaterialParams, ProgramVariant, ProjectInstanceOptions, ProjectedMaterial,
    ProjectedMaterialOptions,
};
pub use mesh::{
    all_projected_materials, allocate_projection_data, is_projected_material, Geometry,
    InstancedAttribute, InstancedMesh, MaterialId, MaterialSlot, Mesh,
};
pub use program::{create_shader_modules, ShaderBuild};
pub use shader_patch::ShaderPatch;
pub use texture::{ProjectionTexture, TextureSource};
pub use uniforms::{
    create_projection_gpu_resources, write_projection_buffer, ProjectionUniforms,
    ProjectionUniformsRaw,
};
