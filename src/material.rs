// src/material.rs
//! The projected material: a physically based material extended with
//! slide-projector texture projection.
//!
//! `project()` freezes the camera-to-object mapping at the moment it is
//! called; later camera movement does not move the projected texture until
//! `project()` runs again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use parking_lot::RwLock;

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::fitment::{compute_scaled_dimensions, Fitment};
use crate::load_listener::{watch_texture_load, LoadWatcher};
use crate::mesh::{
    all_projected_materials, InstancedMesh, MaterialId, MaterialSlot, Mesh,
    SAVED_MODEL_MATRIX_ATTRIBUTES,
};
use crate::program::{ShaderBuild, DIFFUSE_COLOR_FRAGMENT};
use crate::shader_patch::ShaderPatch;
use crate::texture::ProjectionTexture;
use crate::uniforms::ProjectionUniforms;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

// ----------------------------------------------------------------------------
// Shader blocks injected by the patch hook
// ----------------------------------------------------------------------------

const VERTEX_HEADER: &str = r#"
uniform mat4 viewMatrixCamera;
uniform mat4 projectionMatrixCamera;

#ifdef USE_INSTANCING
attribute vec4 savedModelMatrix0;
attribute vec4 savedModelMatrix1;
attribute vec4 savedModelMatrix2;
attribute vec4 savedModelMatrix3;
#else
uniform mat4 savedModelMatrix;
#endif

varying vec3 vSavedNormal;
varying vec4 vTexCoords;
#ifndef ORTHOGRAPHIC
varying vec4 vWorldPosition;
#endif
"#;

const VERTEX_MAIN: &str = r#"
#ifdef USE_INSTANCING
mat4 savedModelMatrix = mat4(
	savedModelMatrix0,
	savedModelMatrix1,
	savedModelMatrix2,
	savedModelMatrix3
);
#endif

vSavedNormal = mat3(savedModelMatrix) * normal;
vTexCoords = projectionMatrixCamera * viewMatrixCamera * savedModelMatrix * vec4(position, 1.0);
#ifndef ORTHOGRAPHIC
vWorldPosition = savedModelMatrix * vec4(position, 1.0);
#endif
"#;

const FRAGMENT_HEADER: &str = r#"
uniform sampler2D projectedTexture;
uniform bool isTextureLoaded;
uniform bool isTextureProjected;
uniform float backgroundOpacity;
uniform vec3 projPosition;
uniform vec3 projDirection;
uniform float widthScaled;
uniform float heightScaled;
uniform vec2 textureOffset;
uniform bool frontFacesOnly;

varying vec3 vSavedNormal;
varying vec4 vTexCoords;
#ifndef ORTHOGRAPHIC
varying vec4 vWorldPosition;
#endif

float mapRange(float value, float min1, float max1, float min2, float max2) {
	return min2 + (value - min1) * (max2 - min2) / (max1 - min1);
}
"#;

const FRAGMENT_PROJECTION: &str = r#"
// clamp the w to make sure we don't project behind
float w = max(vTexCoords.w, 0.0);

vec2 uv = (vTexCoords.xy / w) * 0.5 + 0.5;

uv += textureOffset;

// remap into the fitment-scaled sub-rectangle centered at (0.5, 0.5)
uv.x = mapRange(uv.x, 0.0, 1.0, 0.5 - widthScaled / 2.0, 0.5 + widthScaled / 2.0);
uv.y = mapRange(uv.y, 0.0, 1.0, 0.5 - heightScaled / 2.0, 0.5 + heightScaled / 2.0);

// never sample outside the texture
bool isInTexture = (max(uv.x, uv.y) <= 1.0 && min(uv.x, uv.y) >= 0.0);

// NOTE the perspective projector direction is computed from world position,
// which is wrong when the camera and the target are both nested transforms
// away from the scene root. Known limitation.
#ifdef ORTHOGRAPHIC
vec3 projectorDirection = projDirection;
#else
vec3 projectorDirection = normalize(projPosition - vWorldPosition.xyz);
#endif
float dotProduct = dot(vSavedNormal, projectorDirection);
bool isFacingProjector = frontFacesOnly ? dotProduct > 0.0000001 : true;

vec4 diffuseColor = vec4(diffuse, opacity * backgroundOpacity);

if (isFacingProjector && isInTexture && isTextureLoaded && isTextureProjected) {
	vec4 textureColor = texture2D(projectedTexture, uv);

	// apply the material opacity
	textureColor.a *= opacity;

	diffuseColor = textureColor * textureColor.a + diffuseColor * (1.0 - textureColor.a);
}
"#;

// ----------------------------------------------------------------------------
// Options and supporting types
// ----------------------------------------------------------------------------

/// Base physical-material parameters, passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    pub color: Vec3,
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            transparent: false,
        }
    }
}

/// Which shader-program flavor the material currently requires. Switching
/// the camera kind switches the variant, which forces the host to build a
/// new program (a define changes, so the old one cannot be reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramVariant {
    Perspective,
    Orthographic,
}

/// Construction options. Everything has a sensible default: a default
/// perspective camera, an empty texture, unit scale, zero offset, `Contain`
/// fitment, and front-faces-only texturing.
#[derive(Debug, Clone, Default)]
pub struct ProjectedMaterialOptions {
    pub camera: Option<Arc<RwLock<Camera>>>,
    pub texture: Option<Arc<RwLock<ProjectionTexture>>>,
    /// Defaults to 1 when `None`; must be strictly positive.
    pub texture_scale: Option<f32>,
    pub texture_offset: Vec2,
    pub fitment: Fitment,
    /// Defaults to true when `None`.
    pub front_faces_only: Option<bool>,
    pub params: MaterialParams,
}

/// Options for [`ProjectedMaterial::project_instance_at`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectInstanceOptions {
    /// Snapshot the camera even when `index != 0`. The default assumes all
    /// instances of one batch share a single camera snapshot.
    pub force_camera_save: bool,
}

/// State shared with the texture load poller.
#[derive(Debug)]
struct SharedState {
    uniforms: ProjectionUniforms,
    texture_scale: f32,
    fitment: Fitment,
}

impl SharedState {
    /// Recompute the fitment-scaled dimensions. A camera whose ratio became
    /// unresolvable after validation keeps the previous dimensions.
    fn recompute_dimensions(&mut self, camera: &Camera, texture: &ProjectionTexture) {
        match compute_scaled_dimensions(texture, camera, self.texture_scale, self.fitment) {
            Ok(size) => {
                self.uniforms.width_scaled = size.x;
                self.uniforms.height_scaled = size.y;
            }
            Err(err) => log::warn!("keeping previous scaled dimensions: {err}"),
        }
    }
}

// ----------------------------------------------------------------------------
// ProjectedMaterial
// ----------------------------------------------------------------------------

/// A physically based material that samples a texture as if projected from
/// a camera's viewpoint at the moment [`project`](Self::project) was called.
#[derive(Debug)]
pub struct ProjectedMaterial {
    id: MaterialId,
    params: MaterialParams,
    camera: Arc<RwLock<Camera>>,
    texture: Arc<RwLock<ProjectionTexture>>,
    shared: Arc<RwLock<SharedState>>,
    program_variant: ProgramVariant,
    needs_update: bool,
    load_watcher: Option<LoadWatcher>,
}

impl ProjectedMaterial {
    pub fn new(options: ProjectedMaterialOptions) -> Result<Self> {
        let texture_scale = options.texture_scale.unwrap_or(1.0);
        if !(texture_scale > 0.0 && texture_scale.is_finite()) {
            return Err(Error::InvalidTextureScale(texture_scale));
        }

        let camera = options
            .camera
            .unwrap_or_else(|| Arc::new(RwLock::new(Camera::default())));
        // reject cameras the fitment calculator cannot resolve
        camera.read().ratio()?;

        let texture = options
            .texture
            .unwrap_or_else(|| Arc::new(RwLock::new(ProjectionTexture::new())));

        let uniforms = ProjectionUniforms {
            texture_offset: options.texture_offset,
            front_faces_only: options.front_faces_only.unwrap_or(true),
            is_texture_loaded: texture.read().is_loaded(),
            ..Default::default()
        };

        let program_variant = if camera.read().is_orthographic() {
            ProgramVariant::Orthographic
        } else {
            ProgramVariant::Perspective
        };

        let shared = Arc::new(RwLock::new(SharedState {
            uniforms,
            texture_scale,
            fitment: options.fitment,
        }));

        let mut material = Self {
            id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)),
            params: options.params,
            camera,
            texture,
            shared,
            program_variant,
            needs_update: true,
            load_watcher: None,
        };
        material.save_dimensions();
        material.install_load_watcher();
        Ok(material)
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn params(&self) -> &MaterialParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut MaterialParams {
        &mut self.params
    }

    /// The slot descriptor meshes use to reference this instance.
    pub fn slot(&self) -> MaterialSlot {
        MaterialSlot {
            id: self.id,
            projected: true,
            transparent: self.params.transparent,
        }
    }

    /// A copy of the current uniform record, for upload or inspection.
    pub fn uniforms(&self) -> ProjectionUniforms {
        self.shared.read().uniforms.clone()
    }

    pub fn program_variant(&self) -> ProgramVariant {
        self.program_variant
    }

    /// Whether the host must rebuild this material's shader program.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn clear_needs_update(&mut self) {
        self.needs_update = false;
    }

    // === accessors that re-derive dependent state on mutation ===

    pub fn camera(&self) -> Arc<RwLock<Camera>> {
        Arc::clone(&self.camera)
    }

    /// Swap the projection camera. Fails when the camera's ratio cannot be
    /// resolved. Switching between perspective and orthographic flips the
    /// program variant so the host builds a fresh program.
    pub fn set_camera(&mut self, camera: Arc<RwLock<Camera>>) -> Result<()> {
        camera.read().ratio()?;
        self.program_variant = if camera.read().is_orthographic() {
            ProgramVariant::Orthographic
        } else {
            ProgramVariant::Perspective
        };
        self.camera = camera;
        self.save_dimensions();
        self.needs_update = true;
        Ok(())
    }

    pub fn texture(&self) -> Arc<RwLock<ProjectionTexture>> {
        Arc::clone(&self.texture)
    }

    /// Swap the projected texture. The watcher on the previous texture is
    /// cancelled; a new one is installed if the replacement hasn't loaded.
    pub fn set_texture(&mut self, texture: Arc<RwLock<ProjectionTexture>>) {
        if let Some(watcher) = self.load_watcher.take() {
            watcher.cancel();
        }
        let loaded = texture.read().is_loaded();
        self.texture = texture;
        self.shared.write().uniforms.is_texture_loaded = loaded;
        if loaded {
            self.save_dimensions();
        } else {
            self.install_load_watcher();
        }
    }

    pub fn texture_scale(&self) -> f32 {
        self.shared.read().texture_scale
    }

    pub fn set_texture_scale(&mut self, texture_scale: f32) -> Result<()> {
        if !(texture_scale > 0.0 && texture_scale.is_finite()) {
            return Err(Error::InvalidTextureScale(texture_scale));
        }
        self.shared.write().texture_scale = texture_scale;
        self.save_dimensions();
        Ok(())
    }

    pub fn texture_offset(&self) -> Vec2 {
        self.shared.read().uniforms.texture_offset
    }

    pub fn set_texture_offset(&mut self, texture_offset: Vec2) {
        self.shared.write().uniforms.texture_offset = texture_offset;
    }

    pub fn fitment(&self) -> Fitment {
        self.shared.read().fitment
    }

    pub fn set_fitment(&mut self, fitment: Fitment) {
        self.shared.write().fitment = fitment;
        self.save_dimensions();
    }

    pub fn front_faces_only(&self) -> bool {
        self.shared.read().uniforms.front_faces_only
    }

    pub fn set_front_faces_only(&mut self, front_faces_only: bool) {
        self.shared.write().uniforms.front_faces_only = front_faces_only;
    }

    // === projection operations ===

    /// Snapshot the camera and the mesh's world transform so the texture
    /// stays glued where the camera sees it right now.
    ///
    /// Every precondition is checked before any state changes: all mesh
    /// materials must be projection-capable, this instance must be among
    /// them, and multi-material meshes require the projecting slot to be
    /// transparent.
    pub fn project(&mut self, mesh: &mut Mesh) -> Result<()> {
        if !all_projected_materials(&mesh.materials) {
            return Err(Error::NotProjectedMaterial);
        }
        let slot_index = mesh
            .materials
            .iter()
            .position(|slot| slot.id == self.id)
            .ok_or(Error::MaterialNotBound)?;
        let multi_material = mesh.materials.len() > 1;
        if multi_material && !mesh.materials[slot_index].transparent {
            return Err(Error::TransparencyRequired);
        }

        mesh.update_world_matrix();

        {
            let mut shared = self.shared.write();
            // the saved model matrix anchors the projection, like a snapshot
            shared.uniforms.saved_model_matrix = mesh.world_matrix();
            // only the first slot of a multi-material mesh keeps its background
            if multi_material && slot_index > 0 {
                shared.uniforms.background_opacity = 0.0;
            }
        }

        self.save_camera_matrices();
        Ok(())
    }

    /// Write one instance's saved model matrix into the pre-allocated
    /// per-instance attributes and (for index 0, or on request) snapshot the
    /// camera.
    ///
    /// The camera snapshot is skipped for non-zero indices on the assumption
    /// that all instances of a batch share one snapshot;
    /// `force_camera_save` is the escape hatch when the camera moved
    /// mid-batch.
    pub fn project_instance_at(
        &mut self,
        index: usize,
        instanced_mesh: &mut InstancedMesh,
        world_matrix: &Mat4,
        options: ProjectInstanceOptions,
    ) -> Result<()> {
        if !all_projected_materials(&instanced_mesh.materials) {
            return Err(Error::NotProjectedMaterial);
        }
        let slot_index = instanced_mesh
            .materials
            .iter()
            .position(|slot| slot.id == self.id)
            .ok_or(Error::MaterialNotBound)?;
        let multi_material = instanced_mesh.materials.len() > 1;
        if multi_material && !instanced_mesh.materials[slot_index].transparent {
            return Err(Error::TransparencyRequired);
        }

        for name in SAVED_MODEL_MATRIX_ATTRIBUTES {
            if !instanced_mesh.geometry.has_attribute(name) {
                return Err(Error::MissingProjectionData);
            }
        }
        // all four attributes are allocated together with the same count
        let count = instanced_mesh
            .geometry
            .attribute(SAVED_MODEL_MATRIX_ATTRIBUTES[0])
            .map(|attribute| attribute.count())
            .unwrap_or(0);
        if index >= count {
            return Err(Error::InstanceIndexOutOfBounds { index, count });
        }

        let columns = world_matrix.to_cols_array_2d();
        for (name, column) in SAVED_MODEL_MATRIX_ATTRIBUTES.iter().zip(columns) {
            let attribute = instanced_mesh
                .geometry
                .attribute_mut(name)
                .ok_or(Error::MissingProjectionData)?;
            attribute.set_xyzw(index, column[0], column[1], column[2], column[3])?;
        }

        if multi_material && slot_index > 0 {
            self.shared.write().uniforms.background_opacity = 0.0;
        }

        if index == 0 || options.force_camera_save {
            self.save_camera_matrices();
        }
        Ok(())
    }

    /// Re-read only the camera's projection matrix and recompute fit
    /// dimensions. The view/position/direction snapshots stay put, so a
    /// field-of-view change doesn't re-anchor the projection's spatial
    /// origin.
    pub fn update_from_camera(&mut self) {
        {
            let mut camera = self.camera.write();
            camera.update_projection_matrix();
            self.shared.write().uniforms.projection_matrix_camera = camera.projection_matrix();
        }
        self.save_dimensions();
    }

    /// Copy configuration from another projected material. Identity and any
    /// existing projection snapshot of `self` are kept.
    pub fn copy_from(&mut self, source: &ProjectedMaterial) -> Result<()> {
        self.params = source.params.clone();
        self.set_camera(source.camera())?;
        self.set_texture(source.texture());
        self.set_texture_scale(source.texture_scale())?;
        self.set_texture_offset(source.texture_offset());
        self.set_fitment(source.fitment());
        self.set_front_faces_only(source.front_faces_only());
        Ok(())
    }

    /// The shader-compilation hook: transform the host's program build so
    /// the compiled program carries the projection math. Pure text
    /// transformation; compile errors surface at module creation.
    pub fn patch_program(&self, build: &mut ShaderBuild) {
        match self.program_variant {
            ProgramVariant::Orthographic => build.define("ORTHOGRAPHIC", ""),
            ProgramVariant::Perspective => build.remove_define("ORTHOGRAPHIC"),
        }

        build.vertex_source = ShaderPatch::new()
            .with_header(VERTEX_HEADER)
            .with_main(VERTEX_MAIN)
            .apply(&build.vertex_source);

        build.fragment_source = ShaderPatch::new()
            .with_header(FRAGMENT_HEADER)
            .replace(DIFFUSE_COLOR_FRAGMENT, FRAGMENT_PROJECTION)
            .apply(&build.fragment_source);
    }

    // === internals ===

    fn save_dimensions(&self) {
        let camera = self.camera.read();
        let texture = self.texture.read();
        self.shared.write().recompute_dimensions(&camera, &texture);
    }

    fn install_load_watcher(&mut self) {
        if let Some(watcher) = self.load_watcher.take() {
            watcher.cancel();
        }
        let shared = Arc::clone(&self.shared);
        let camera = Arc::clone(&self.camera);
        let texture = Arc::clone(&self.texture);
        self.load_watcher = Some(watch_texture_load(Arc::clone(&self.texture), move || {
            let camera = camera.read();
            let texture = texture.read();
            let mut shared = shared.write();
            shared.uniforms.is_texture_loaded = true;
            shared.recompute_dimensions(&camera, &texture);
        }));
    }

    /// Freeze the camera's matrices, position and direction into the
    /// uniform record and latch the projected flag.
    fn save_camera_matrices(&mut self) {
        let mut camera = self.camera.write();
        camera.update_projection_matrix();
        camera.update_world_matrix();

        let mut shared = self.shared.write();
        let uniforms = &mut shared.uniforms;
        uniforms.view_matrix_camera = camera.world_inverse();
        uniforms.projection_matrix_camera = camera.projection_matrix();
        uniforms.proj_position = camera.world_position();
        uniforms.proj_direction = camera.world_direction();
        // tell the shader we've projected; never reset afterwards
        uniforms.is_texture_projected = true;
    }
}
