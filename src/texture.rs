// src/texture.rs
//! Projection texture sources and their intrinsic dimensions.
//!
//! The projection system never mutates a texture beyond attaching a
//! load-completion watcher; the texture itself is owned externally and
//! shared as `Arc<RwLock<ProjectionTexture>>`.

use image::GenericImageView;

use crate::error::{Error, Result};

/// Where the texture pixels come from, with the intrinsic dimensions each
/// source kind reports. Dimension preference when computing fitment is
/// natural (image), then video, then rendered-element size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    Image {
        natural_width: u32,
        natural_height: u32,
    },
    Video {
        video_width: u32,
        video_height: u32,
    },
    Canvas {
        client_width: u32,
        client_height: u32,
    },
}

impl TextureSource {
    fn dimensions(&self) -> (u32, u32) {
        match *self {
            TextureSource::Image {
                natural_width,
                natural_height,
            } => (natural_width, natural_height),
            TextureSource::Video {
                video_width,
                video_height,
            } => (video_width, video_height),
            TextureSource::Canvas {
                client_width,
                client_height,
            } => (client_width, client_height),
        }
    }
}

/// GPU handle for a texture that has been uploaded.
#[derive(Debug)]
pub struct TextureGpu {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// An image or video source plus its intrinsic dimensions.
///
/// A texture may be in a "not yet loaded" state: either no source at all,
/// or a source whose dimensions haven't become non-zero yet (a streaming
/// video element, an image still decoding). Fitment computation falls back
/// to a safe default until real dimensions arrive.
#[derive(Debug, Default)]
pub struct ProjectionTexture {
    source: Option<TextureSource>,
    gpu: Option<TextureGpu>,
}

impl ProjectionTexture {
    /// An empty texture with no source. Never loaded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: TextureSource) -> Self {
        Self {
            source: Some(source),
            gpu: None,
        }
    }

    /// Image-backed texture with known natural dimensions.
    pub fn image(natural_width: u32, natural_height: u32) -> Self {
        Self::from_source(TextureSource::Image {
            natural_width,
            natural_height,
        })
    }

    /// Video-backed texture. Zero dimensions mean the video hasn't
    /// delivered a frame yet.
    pub fn video(video_width: u32, video_height: u32) -> Self {
        Self::from_source(TextureSource::Video {
            video_width,
            video_height,
        })
    }

    pub fn canvas(client_width: u32, client_height: u32) -> Self {
        Self::from_source(TextureSource::Canvas {
            client_width,
            client_height,
        })
    }

    /// Decode an encoded image (png/jpeg) just far enough to read its
    /// natural dimensions.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
        let (width, height) = decoded.dimensions();
        Ok(Self::image(width, height))
    }

    pub fn source(&self) -> Option<TextureSource> {
        self.source
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// A texture is loaded once it has a source with usable (non-zero)
    /// dimensions.
    pub fn is_loaded(&self) -> bool {
        match self.source {
            Some(source) => {
                let (width, height) = source.dimensions();
                width > 0 && height > 0
            }
            None => false,
        }
    }

    /// Intrinsic dimensions of the source, if any.
    pub fn source_dimensions(&self) -> Option<(f32, f32)> {
        self.source
            .map(|source| source.dimensions())
            .map(|(w, h)| (w as f32, h as f32))
    }

    /// Record that the source's intrinsic dimensions became known. This is
    /// what an asset loader calls on completion and what the load poller
    /// watches for.
    pub fn mark_loaded(&mut self, width: u32, height: u32) {
        self.source = Some(match self.source {
            Some(TextureSource::Video { .. }) => TextureSource::Video {
                video_width: width,
                video_height: height,
            },
            Some(TextureSource::Canvas { .. }) => TextureSource::Canvas {
                client_width: width,
                client_height: height,
            },
            // no source yet defaults to an image source
            _ => TextureSource::Image {
                natural_width: width,
                natural_height: height,
            },
        });
    }

    /// Attach the uploaded GPU view/sampler pair.
    pub fn attach_gpu(&mut self, view: wgpu::TextureView, sampler: wgpu::Sampler) {
        self.gpu = Some(TextureGpu { view, sampler });
    }

    pub fn gpu(&self) -> Option<&TextureGpu> {
        self.gpu.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_texture_is_not_loaded() {
        let texture = ProjectionTexture::new();
        assert!(!texture.has_source());
        assert!(!texture.is_loaded());
        assert_eq!(texture.source_dimensions(), None);
    }

    #[test]
    fn test_zero_dimension_video_is_not_loaded() {
        let texture = ProjectionTexture::video(0, 0);
        assert!(texture.has_source());
        assert!(!texture.is_loaded());
    }

    #[test]
    fn test_image_with_dimensions_is_loaded() {
        let texture = ProjectionTexture::image(1024, 512);
        assert!(texture.is_loaded());
        assert_eq!(texture.source_dimensions(), Some((1024.0, 512.0)));
    }

    #[test]
    fn test_mark_loaded_keeps_source_kind() {
        let mut texture = ProjectionTexture::video(0, 0);
        texture.mark_loaded(1920, 1080);
        assert!(texture.is_loaded());
        assert_eq!(
            texture.source(),
            Some(TextureSource::Video {
                video_width: 1920,
                video_height: 1080,
            })
        );
    }

    #[test]
    fn test_from_image_bytes_rejects_garbage() {
        let err = ProjectionTexture::from_image_bytes(&[0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }
}
