// src/error.rs
//! Error handling for the crate.
//!
//! Every failure here is a synchronous, user-input-validation failure: an
//! operation either fully succeeds or aborts before mutating any state.
//! Nothing is retried or recovered internally.

use thiserror::Error;

/// Main error type — lightweight, Send + Sync + 'static.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Ratio resolution was attempted on a camera with no usable aspect
    /// ratio: a raw custom projection matrix, degenerate orthographic
    /// extents, or a non-positive perspective aspect.
    #[error("the camera's projection does not define a usable aspect ratio")]
    UnsupportedCameraKind,

    /// `texture_scale` must be a strictly positive, finite number.
    #[error("texture scale must be a positive number, got {0}")]
    InvalidTextureScale(f32),

    /// A mesh carries a material that is not projection-capable.
    #[error("every material on the mesh must be a projection-capable material")]
    NotProjectedMaterial,

    /// The mesh does not carry the exact material instance the projection
    /// operation was called from.
    #[error("the provided mesh doesn't carry the material project() has been called from")]
    MaterialNotBound,

    /// Multi-material use requires the projecting slot to blend, not overwrite.
    #[error("enable `transparent` on the projecting material when working with multiple materials")]
    TransparencyRequired,

    /// Per-instance transform attributes have not been allocated yet.
    #[error("no allocated projection data found on the geometry, call `allocate_projection_data(geometry, instances_count)` first")]
    MissingProjectionData,

    /// A per-instance write landed beyond the fixed allocation.
    #[error("instance index {index} is out of bounds for {count} allocated instances")]
    InstanceIndexOutOfBounds { index: usize, count: usize },

    /// Decoding an image source to read its intrinsic dimensions failed.
    #[error("failed to decode texture image: {0}")]
    ImageDecode(String),
}

impl Error {
    // === Kind checks (branch prediction friendly) ===
    #[inline]
    pub fn is_camera(&self) -> bool {
        matches!(self, Error::UnsupportedCameraKind)
    }

    #[inline]
    pub fn is_material(&self) -> bool {
        matches!(
            self,
            Error::NotProjectedMaterial | Error::MaterialNotBound | Error::TransparencyRequired
        )
    }

    #[inline]
    pub fn is_instancing(&self) -> bool {
        matches!(
            self,
            Error::MissingProjectionData | Error::InstanceIndexOutOfBounds { .. }
        )
    }
}

/// Convenient `Result` alias — use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_checks() {
        assert!(Error::UnsupportedCameraKind.is_camera());
        assert!(Error::TransparencyRequired.is_material());
        assert!(Error::MissingProjectionData.is_instancing());
        assert!(!Error::InvalidTextureScale(0.0).is_material());
    }

    #[test]
    fn test_display_names_the_allocation_call() {
        let msg = Error::MissingProjectionData.to_string();
        assert!(msg.contains("allocate_projection_data"));
    }
}
