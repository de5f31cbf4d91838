// src/fitment.rs
//! Dimension fitment: mapping a source image's aspect ratio onto a camera
//! frustum's aspect ratio.

use glam::Vec2;

use crate::camera::Camera;
use crate::error::Result;
use crate::texture::ProjectionTexture;

/// Fitment policy.
///
/// `Contain` keeps the entire source visible inside the frustum, possibly
/// leaving empty margin. `Cover` fills the frustum entirely, cropping the
/// source as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fitment {
    #[default]
    Contain,
    Cover,
}

/// Compute the (scale_x, scale_y) pair that remaps projection UVs so the
/// texture keeps its proportions under the given fitment, with
/// `texture_scale` applied on top.
///
/// The outputs are reciprocals of a relative width/height: the shader uses
/// them as the size of the sub-rectangle UVs are remapped into, so a larger
/// factor means a smaller on-screen texture footprint.
///
/// Returns (1, 1) while the texture has no usable dimensions, which keeps
/// the projection distortion-free until real data arrives. Fails only when
/// the camera's ratio is unresolvable; callers validate that up front.
pub fn compute_scaled_dimensions(
    texture: &ProjectionTexture,
    camera: &Camera,
    texture_scale: f32,
    fitment: Fitment,
) -> Result<Vec2> {
    if !texture.is_loaded() {
        return Ok(Vec2::ONE);
    }

    // is_loaded() guarantees a source with non-zero dimensions
    let (source_width, source_height) = texture.source_dimensions().unwrap_or((1.0, 1.0));

    let camera_width = 1.0_f32;
    let ratio_camera = camera.ratio()?;
    let camera_height = camera_width * (1.0 / ratio_camera);
    let ratio = source_width / source_height;

    // Cover and Contain intentionally use inverted comparisons: Cover must
    // crop the image to fill the frame, Contain must shrink it to fit.
    let wide = match fitment {
        Fitment::Cover => ratio > ratio_camera,
        Fitment::Contain => ratio < ratio_camera,
    };

    let size = if wide {
        let width = camera_height * ratio;
        Vec2::new(
            1.0 / ((width / camera_width) * texture_scale),
            1.0 / texture_scale,
        )
    } else {
        let height = camera_width * (1.0 / ratio);
        Vec2::new(
            1.0 / texture_scale,
            1.0 / ((height / camera_height) * texture_scale),
        )
    };

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_camera() -> Camera {
        // frustum twice as wide as tall
        Camera::perspective(std::f32::consts::FRAC_PI_4, 2.0, 0.1, 100.0)
    }

    #[test]
    fn test_unloaded_texture_returns_unit_scale() {
        let camera = wide_camera();
        for fitment in [Fitment::Contain, Fitment::Cover] {
            let empty = ProjectionTexture::new();
            assert_eq!(
                compute_scaled_dimensions(&empty, &camera, 1.0, fitment).unwrap(),
                Vec2::ONE
            );

            let pending_video = ProjectionTexture::video(0, 0);
            assert_eq!(
                compute_scaled_dimensions(&pending_video, &camera, 1.0, fitment).unwrap(),
                Vec2::ONE
            );
        }
    }

    #[test]
    fn test_square_texture_in_wide_camera_contain() {
        let texture = ProjectionTexture::image(512, 512);
        let size = compute_scaled_dimensions(&texture, &wide_camera(), 1.0, Fitment::Contain)
            .unwrap();
        // letterboxed: full height, horizontally shrunk
        assert!((size.x - 2.0).abs() < 1e-6);
        assert!((size.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_square_texture_in_wide_camera_cover() {
        let texture = ProjectionTexture::image(512, 512);
        let size =
            compute_scaled_dimensions(&texture, &wide_camera(), 1.0, Fitment::Cover).unwrap();
        // cropped vertically: full width, vertically stretched rectangle
        assert!((size.x - 1.0).abs() < 1e-6);
        assert!((size.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_outputs_are_strictly_positive() {
        let cameras = [
            wide_camera(),
            Camera::perspective(std::f32::consts::FRAC_PI_3, 0.5, 0.1, 100.0),
            Camera::orthographic(-3.0, 3.0, 1.0, -1.0, 0.1, 100.0),
        ];
        let textures = [
            ProjectionTexture::image(1920, 1080),
            ProjectionTexture::image(600, 1200),
            ProjectionTexture::video(640, 480),
            ProjectionTexture::canvas(300, 300),
        ];
        for camera in &cameras {
            for texture in &textures {
                for fitment in [Fitment::Contain, Fitment::Cover] {
                    for scale in [0.5, 1.0, 3.0] {
                        let size =
                            compute_scaled_dimensions(texture, camera, scale, fitment).unwrap();
                        assert!(size.x > 0.0 && size.y > 0.0, "{size:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_texture_scale_divides_output() {
        let texture = ProjectionTexture::image(512, 512);
        let size = compute_scaled_dimensions(&texture, &wide_camera(), 2.0, Fitment::Contain)
            .unwrap();
        assert!((size.x - 1.0).abs() < 1e-6);
        assert!((size.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_matching_ratios_are_fitment_independent() {
        // texture ratio == camera ratio: both modes give the same scale
        let texture = ProjectionTexture::image(1000, 500);
        let camera = wide_camera();
        let contain =
            compute_scaled_dimensions(&texture, &camera, 1.0, Fitment::Contain).unwrap();
        let cover = compute_scaled_dimensions(&texture, &camera, 1.0, Fitment::Cover).unwrap();
        assert!(contain.abs_diff_eq(cover, 1e-6));
        assert!(contain.abs_diff_eq(Vec2::ONE, 1e-6));
    }
}
