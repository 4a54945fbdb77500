//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! and helper methods for creating depth textures, normal maps, solid colour
//! fallbacks and loading textures from image data. Samplers can be swapped at
//! runtime through [`SamplingMode`].

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// How a texture is filtered when it is magnified, minified and between mip levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Linear magnification and minification, nearest mip level.
    Bilinear,
    /// Linear everywhere.
    #[default]
    Trilinear,
    /// Nearest everywhere, no interpolation between texels or mip levels.
    /// Keeps pixel art crisp.
    NearestNearest,
}

impl SamplingMode {
    /// Filters as `(mag, min, mipmap)`.
    pub fn filters(&self) -> (wgpu::FilterMode, wgpu::FilterMode, wgpu::FilterMode) {
        use wgpu::FilterMode;
        match self {
            SamplingMode::Bilinear => (FilterMode::Linear, FilterMode::Linear, FilterMode::Nearest),
            SamplingMode::Trilinear => (FilterMode::Linear, FilterMode::Linear, FilterMode::Linear),
            SamplingMode::NearestNearest => {
                (FilterMode::Nearest, FilterMode::Nearest, FilterMode::Nearest)
            }
        }
    }

    pub fn create_sampler(&self, device: &wgpu::Device) -> wgpu::Sampler {
        let (mag_filter, min_filter, mipmap_filter) = self.filters();
        device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter,
            min_filter,
            mipmap_filter,
            ..Default::default()
        })
    }
}

/// A GPU texture with a view and optional sampler.
///
/// Wraps WGPU texture objects along with associated views and samplers.
/// Textures are used for color maps, normal maps, depth, and other data
/// bound to shaders. Typically created via [`from_bytes`](Self::from_bytes) or
/// via [`create_depth_texture`](Self::create_depth_texture).
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub sampling_mode: SamplingMode,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `sample_count` has to match the colour attachments of the pass it is used in
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
            sampling_mode: SamplingMode::Bilinear,
        }
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    ///
    /// Returns a solid blue texture suitable as a default when no normal map is provided.
    /// This avoids the need to change shaders when normal maps are optional.
    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        // The blue/purple-ish colour that represents the default for normal maps
        Self::create_solid(device, queue, [127, 127, 255, 255], wgpu::TextureFormat::Rgba8Unorm, "default normal map")
    }

    /// A 1x1 texture of a single sRGB colour, used for untextured materials.
    pub fn create_solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Texture {
        Self::create_solid(device, queue, rgba, wgpu::TextureFormat::Rgba8UnormSrgb, label)
    }

    fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampling_mode = SamplingMode::default();
        let sampler = Some(sampling_mode.create_sampler(device));
        Texture {
            texture,
            view,
            sampler,
            sampling_mode,
        }
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format`  is an optional file format hint (e.g., "png"). If None, auto-detect.
    /// * `is_normal_map` toggles between sRGB (false) and linear (true) color space
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes),
            Some(fmt) => load_from_memory_with_format(bytes, fmt),
        }
        .with_context(|| format!("failed to decode image '{label}'"))?;
        Self::from_image(device, queue, &img, Some(label), is_normal_map)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            bail!("image {:?} has no pixels", label);
        }
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampling_mode = SamplingMode::default();
        let sampler = Some(sampling_mode.create_sampler(device));

        Ok(Self {
            texture,
            view,
            sampler,
            sampling_mode,
        })
    }

    /// Replace the sampler. Bind groups that captured the old sampler have to be rebuilt.
    pub fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode) {
        self.sampler = Some(mode.create_sampler(device));
        self.sampling_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_nearest_disables_filtering() {
        let (mag, min, mip) = SamplingMode::NearestNearest.filters();
        assert_eq!(mag, wgpu::FilterMode::Nearest);
        assert_eq!(min, wgpu::FilterMode::Nearest);
        assert_eq!(mip, wgpu::FilterMode::Nearest);
    }

    #[test]
    fn default_sampling_is_trilinear() {
        assert_eq!(SamplingMode::default(), SamplingMode::Trilinear);
        let (mag, min, mip) = SamplingMode::Trilinear.filters();
        assert_eq!(mag, wgpu::FilterMode::Linear);
        assert_eq!(min, wgpu::FilterMode::Linear);
        assert_eq!(mip, wgpu::FilterMode::Linear);
        let (_, _, mip) = SamplingMode::Bilinear.filters();
        assert_eq!(mip, wgpu::FilterMode::Nearest);
    }
}
