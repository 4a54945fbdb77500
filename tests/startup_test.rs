use pixel_room::{physics::Physics, resources::texture::load_binary, startup};

use crate::common::test_utils::{TINT, asset_root_str, triangle_glb, write_room_assets};

mod common;

#[test]
fn triangle_fixture_is_a_valid_glb() {
    let gltf = gltf::Gltf::from_slice(&triangle_glb()).unwrap();
    assert_eq!(gltf.meshes().count(), 1);
    assert!(gltf.blob.is_some());
    let node = gltf.nodes().next().unwrap();
    assert_eq!(node.name(), Some("floor"));
    let primitive = node.mesh().unwrap().primitives().next().unwrap();
    assert_eq!(primitive.material().index(), None);
    let material = gltf.materials().next().unwrap();
    assert_eq!(material.pbr_metallic_roughness().base_color_factor(), TINT);
}

#[tokio::test]
async fn room_bytes_and_physics_arrive_together() {
    let root = write_room_assets("startup-ok");
    let root = asset_root_str(&root);
    let out = startup::join(
        load_binary(&root, "glb/pixel_room.glb"),
        Physics::init(),
        None::<std::future::Ready<anyhow::Result<()>>>,
    )
    .await
    .unwrap();
    assert_eq!(out.asset, triangle_glb());
    assert_eq!(out.physics.body_count(), 0);
    assert!(out.debug.is_none());
}

#[tokio::test]
async fn missing_room_fails_startup() {
    let root = write_room_assets("startup-missing");
    let root = asset_root_str(&root);
    let err = startup::join(
        load_binary(&root, "glb/missing_room.glb"),
        Physics::init(),
        Some(async { anyhow::Ok(()) }),
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("missing_room.glb"), "{err:#}");
}
