use anyhow::Context;

use crate::data_structures::texture;

/// Layout of a material bind group: diffuse texture + sampler, normal map +
/// sampler and the base colour factor.
pub fn diffuse_normal_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Model texture_bind_group_layout"),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(asset_root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{origin}/{asset_root}/"))?;
    Ok(base.join(file_name)?)
}

/// Resolve `uri` (as referenced from inside `file_name`) relative to the asset root.
pub fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri.to_string(),
    }
}

/// Read an asset. Native builds read `<asset_root>/<file_name>` from disk, the
/// browser build fetches it from `<origin>/<asset_root>/<file_name>`.
pub async fn load_binary(asset_root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(asset_root, file_name)?;
        reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("failed to fetch {url}"))?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = native_path(asset_root, file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    Ok(data)
}

/// `<asset_root>/<file_name>` relative to the working directory, falling back
/// to the copy bundled by the build script.
#[cfg(not(target_arch = "wasm32"))]
fn native_path(asset_root: &str, file_name: &str) -> std::path::PathBuf {
    let root = std::path::Path::new(asset_root);
    let local = root.join(file_name);
    if local.exists() || root.is_absolute() {
        return local;
    }
    let bundled = std::path::Path::new(env!("OUT_DIR"))
        .join(asset_root)
        .join(file_name);
    if bundled.exists() { bundled } else { local }
}

pub async fn load_texture(
    asset_root: &str,
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(asset_root, file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}
