//! Loading of meshes and textures from external files.

use anyhow::{Context, bail};

use crate::{
    data_structures::{
        model,
        scene_graph::{ContainerNode, SceneNode, to_scene_node},
        texture::Texture,
    },
    resources::texture::{load_binary, load_texture, sibling_path},
};

pub mod texture;

/// Name of the material appended after a document's own materials.
pub const DEFAULT_MATERIAL: &str = "default";

/// Load a binary (`.glb`) or JSON (`.gltf`) model and build its node tree.
///
/// The returned root is a container named after `file_name` holding every
/// node of the document's scenes.
pub async fn load_model_gltf(
    asset_root: &str,
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    material_layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let bytes = load_binary(asset_root, file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("{file_name} is not a valid glTF document"))?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{file_name} references a binary chunk it does not contain"),
            },
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(asset_root, &sibling_path(file_name, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{file_name} material {}", materials.len()));
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => {
                let image = info.texture().source().source();
                load_image(asset_root, file_name, &buffer_data, image, false, device, queue)
                    .await
                    .with_context(|| format!("diffuse texture of material {name}"))?
            }
            None => Texture::create_solid_color(device, queue, [255; 4], &name),
        };
        let normal_texture = match material.normal_texture() {
            Some(normal) => {
                let image = normal.texture().source().source();
                load_image(asset_root, file_name, &buffer_data, image, true, device, queue)
                    .await
                    .with_context(|| format!("normal map of material {name}"))?
            }
            None => Texture::create_default_normal_map(device, queue),
        };
        materials.push(model::Material::new(
            device,
            &name,
            diffuse_texture,
            normal_texture,
            pbr.base_color_factor(),
            material_layout,
        ));
    }
    // slot for primitives that reference no material, see `material_slot`
    materials.push(model::Material::plain(
        device,
        queue,
        DEFAULT_MATERIAL,
        material_layout,
    ));

    let mut root = ContainerNode::new(1, file_name);
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            root.add_child(to_scene_node(node, &buffer_data, device, &materials));
        }
    }
    log::info!(
        "loaded {file_name}: {} buffers, {} materials, {} root nodes",
        buffer_data.len(),
        materials.len(),
        root.children.len()
    );

    Ok(Box::new(root))
}

async fn load_image(
    asset_root: &str,
    file_name: &str,
    buffer_data: &[Vec<u8>],
    source: gltf::image::Source<'_>,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    match source {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            let bytes = buffer_data
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(start..end))
                .with_context(|| format!("image view {start}..{end} is out of bounds"))?;
            Texture::from_bytes(
                device,
                queue,
                bytes,
                file_name,
                mime_type.split('/').next_back(),
                is_normal_map,
            )
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            load_texture(
                asset_root,
                &sibling_path(file_name, uri),
                is_normal_map,
                device,
                queue,
                mime_type.and_then(|mt| mt.split('/').next_back()),
            )
            .await
        }
    }
}
