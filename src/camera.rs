// src/camera.rs
use glam::{Mat4, Quat, Vec3};

use crate::error::{Error, Result};

/// Projection variant of a camera.
///
/// `Custom` carries a raw, caller-built projection matrix. It projects fine
/// but has no derivable aspect ratio, so fitment computation rejects it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraProjection {
    Perspective {
        /// Vertical field of view (radians).
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    },
    Custom(Mat4),
}

impl Default for CameraProjection {
    fn default() -> Self {
        CameraProjection::Perspective {
            fovy: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// A projector camera: a projection variant plus a world transform.
///
/// The projection system holds a non-owning reference to a camera and reads
/// it only at snapshot time, so external code is free to mutate it between
/// frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection: CameraProjection,
    pub position: Vec3,
    pub rotation: Quat,

    // cached matrices, refreshed by the update_* methods
    projection_matrix: Mat4,
    world_matrix: Mat4,
    world_inverse: Mat4,
}

impl Camera {
    pub fn new(projection: CameraProjection) -> Self {
        let mut camera = Self {
            projection,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            world_inverse: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera.update_world_matrix();
        camera
    }

    /// Perspective camera (right-handed). `fovy` in radians.
    pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(CameraProjection::Perspective {
            fovy,
            aspect,
            near,
            far,
        })
    }

    /// Orthographic camera from frustum extents (right-handed).
    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        Self::new(CameraProjection::Orthographic {
            left,
            right,
            top,
            bottom,
            near,
            far,
        })
    }

    /// Rebuild the cached projection matrix from the projection variant.
    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection {
            CameraProjection::Perspective {
                fovy,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fovy, aspect, near, far),
            CameraProjection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
            CameraProjection::Custom(matrix) => matrix,
        };
    }

    /// Recompose the world matrix from position/rotation and refresh its
    /// inverse (the view matrix).
    pub fn update_world_matrix(&mut self) {
        self.world_matrix = Mat4::from_rotation_translation(self.rotation, self.position);
        self.world_inverse = self.world_matrix.inverse();
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// World-to-camera (view) matrix.
    pub fn world_inverse(&self) -> Mat4 {
        self.world_inverse
    }

    pub fn world_position(&self) -> Vec3 {
        self.position
    }

    /// The camera's local +Z axis rotated into world space.
    ///
    /// Note this is not the look-at forward axis unless the orientation
    /// conventions of the caller align with it.
    pub fn world_direction(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize_or_zero()
    }

    /// Width/height ratio of the camera frustum.
    ///
    /// Perspective cameras report their aspect attribute directly,
    /// orthographic cameras derive it from their extents. A custom
    /// projection matrix fails with [`Error::UnsupportedCameraKind`], and so
    /// does any camera whose ratio degenerates (zero-width or zero-height
    /// extents, a non-positive or non-finite aspect): fitment computation
    /// requires a positive, finite ratio.
    pub fn ratio(&self) -> Result<f32> {
        let ratio = match self.projection {
            CameraProjection::Perspective { aspect, .. } => aspect,
            CameraProjection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => {
                let width = (right - left).abs();
                let height = (top - bottom).abs();
                width / height
            }
            CameraProjection::Custom(_) => return Err(Error::UnsupportedCameraKind),
        };
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(Error::UnsupportedCameraKind);
        }
        Ok(ratio)
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, CameraProjection::Perspective { .. })
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, CameraProjection::Orthographic { .. })
    }

    /// Update aspect ratio (call on resize). Only meaningful for
    /// perspective projections; others are left untouched.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let CameraProjection::Perspective { ref mut aspect, .. } = self.projection {
            *aspect = new_aspect;
            self.update_projection_matrix();
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraProjection::default())
    }
}

/// Classify a camera as perspective.
pub fn is_perspective_camera(camera: &Camera) -> bool {
    camera.is_perspective()
}

/// Classify a camera as orthographic.
pub fn is_orthographic_camera(camera: &Camera) -> bool {
    camera.is_orthographic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_ratio_is_aspect() {
        let camera = Camera::perspective(std::f32::consts::FRAC_PI_4, 1.78, 0.1, 100.0);
        assert_eq!(camera.ratio().unwrap(), 1.78);
    }

    #[test]
    fn test_orthographic_ratio_from_extents() {
        let camera = Camera::orthographic(-2.0, 2.0, 1.0, -1.0, 0.1, 100.0);
        assert_eq!(camera.ratio().unwrap(), 2.0);

        // swapped extents still give a positive ratio
        let camera = Camera::orthographic(2.0, -2.0, -1.0, 1.0, 0.1, 100.0);
        assert_eq!(camera.ratio().unwrap(), 2.0);
    }

    #[test]
    fn test_custom_projection_has_no_ratio() {
        let camera = Camera::new(CameraProjection::Custom(Mat4::IDENTITY));
        assert_eq!(camera.ratio(), Err(Error::UnsupportedCameraKind));
    }

    #[test]
    fn test_degenerate_ratios_are_rejected() {
        // zero-height extents would yield an infinite ratio
        let flat = Camera::orthographic(-1.0, 1.0, 1.0, 1.0, 0.1, 10.0);
        assert_eq!(flat.ratio(), Err(Error::UnsupportedCameraKind));

        // zero-width extents would yield a zero ratio
        let thin = Camera::orthographic(1.0, 1.0, 1.0, -1.0, 0.1, 10.0);
        assert_eq!(thin.ratio(), Err(Error::UnsupportedCameraKind));

        let squashed = Camera::perspective(std::f32::consts::FRAC_PI_4, 0.0, 0.1, 100.0);
        assert_eq!(squashed.ratio(), Err(Error::UnsupportedCameraKind));
    }

    #[test]
    fn test_world_direction_follows_rotation() {
        let mut camera = Camera::default();
        assert!(camera.world_direction().abs_diff_eq(Vec3::Z, 1e-6));

        camera.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        camera.update_world_matrix();
        assert!(camera.world_direction().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn test_world_inverse_tracks_position() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.update_world_matrix();

        let origin_in_view = camera.world_inverse().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }

    #[test]
    fn test_predicates() {
        let perspective = Camera::default();
        let ortho = Camera::orthographic(-1.0, 1.0, 1.0, -1.0, 0.1, 10.0);
        assert!(is_perspective_camera(&perspective));
        assert!(!is_orthographic_camera(&perspective));
        assert!(is_orthographic_camera(&ortho));
    }
}
