use std::path::{Path, PathBuf};

#[cfg(feature = "integration-tests")]
use pixel_room::{
    config::{RunMode, SceneConfig},
    context::{InitContext, mk_camera, request_device},
    resources::texture::diffuse_normal_layout,
};

/// Base colour factor of the fixture's one material. The triangle itself has no material.
pub const TINT: [f32; 4] = [0.5, 0.25, 1.0, 1.0];

/// A single upward facing triangle as a binary glTF, one node named `floor`.
pub fn triangle_glb() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 0.0, -1.0]];
    let normals: [[f32; 3]; 3] = [[0.0, 1.0, 0.0]; 3];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin = Vec::new();
    positions
        .iter()
        .chain(&normals)
        .flatten()
        .for_each(|f| bin.extend_from_slice(&f.to_le_bytes()));
    indices
        .iter()
        .for_each(|i| bin.extend_from_slice(&i.to_le_bytes()));
    let bin_len = bin.len();
    pad(&mut bin, 0);

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "floor", "mesh": 0 }],
        "materials": [{ "name": "tinted", "pbrMetallicRoughness": { "baseColorFactor": TINT } }],
        "meshes": [{
            "name": "floor",
            "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }]
        }],
        "buffers": [{ "byteLength": bin_len }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [-1.0, 0.0, -1.0], "max": [1.0, 0.0, 1.0]
            },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });
    let mut json = serde_json::to_vec(&json).unwrap();
    pad(&mut json, b' ');

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: (12 + 8 + json.len() + 8 + bin.len()) as u32,
        },
        json: json.into(),
        bin: Some(bin.into()),
    };
    glb.to_vec().unwrap()
}

fn pad(bytes: &mut Vec<u8>, with: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(with);
    }
}

/// Write the triangle room to `<tmp>/<name>/glb/pixel_room.glb` and return the asset root.
pub fn write_room_assets(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("pixel-room-{name}-{}", std::process::id()));
    let glb_dir = root.join("glb");
    std::fs::create_dir_all(&glb_dir).unwrap();
    std::fs::write(glb_dir.join("pixel_room.glb"), triangle_glb()).unwrap();
    root
}

pub fn asset_root_str(root: &Path) -> String {
    root.to_string_lossy().into_owned()
}

#[cfg(feature = "integration-tests")]
pub struct Headless {
    pub adapter: wgpu::Adapter,
    pub ctx: InitContext,
}

/// Device without a window, or `None` when the machine has no usable adapter.
#[cfg(feature = "integration-tests")]
pub async fn headless(asset_root: &Path, mode: RunMode) -> Option<Headless> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let (adapter, device, queue) = match request_device(&instance, None).await {
        Ok(gpu) => gpu,
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            return None;
        }
    };
    let material_layout = diffuse_normal_layout(&device);
    let camera_layout = mk_camera(&device).bind_group_layout;
    let ctx = InitContext {
        device,
        queue,
        surface_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        material_layout,
        camera_layout,
        scene: SceneConfig {
            asset_root: asset_root_str(asset_root),
            mode,
            ..Default::default()
        },
    };
    Some(Headless { adapter, ctx })
}
