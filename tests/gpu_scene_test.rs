#![cfg(feature = "integration-tests")]

use instant::Duration;
use pixel_room::{
    config::RunMode,
    context::{mk_camera, mk_lights, supported_samples},
    data_structures::scene_graph::SceneNode,
    flow::GraphicsFlow,
    pipelines::basic::mk_basic_pipeline,
    post_process::{PostProcess, PostProcessSettings},
    render::draw_instanced,
    resources::{DEFAULT_MATERIAL, load_model_gltf},
    scene::{GROUND_Y, RoomScene, SPHERE_Y},
};

use crate::common::test_utils::{TINT, headless, write_room_assets};

mod common;

#[test]
fn development_scene_shows_the_debug_layer_and_drops_the_sphere() {
    let root = write_room_assets("gpu-dev");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let Some(gpu) = headless(&root, RunMode::Development).await else {
            return;
        };
        let queue = gpu.ctx.queue.clone();
        let mut scene = RoomScene::new(gpu.ctx).await.unwrap();

        assert_eq!(scene.debug_visible(), Some(true));
        assert!(scene.room().find("floor").is_some());
        let ground = scene.ground_transform().unwrap();
        assert!((ground.position.y - GROUND_Y).abs() < 1e-6);
        assert_eq!(scene.physics().body_count(), 2);

        for _ in 0..60 {
            scene.step(&queue, Duration::from_secs_f32(1.0 / 60.0));
        }
        let sphere = scene.sphere_transform().unwrap();
        assert!(sphere.position.y < SPHERE_Y - 1.0, "{:?}", sphere.position);
    });
}

#[test]
fn production_scene_has_no_debug_layer() {
    let root = write_room_assets("gpu-prod");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let Some(gpu) = headless(&root, RunMode::Production).await else {
            return;
        };
        let scene = RoomScene::new(gpu.ctx).await.unwrap();
        assert_eq!(scene.debug_visible(), None);
    });
}

#[test]
fn material_factors_survive_loading() {
    let root = write_room_assets("gpu-materials");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let Some(gpu) = headless(&root, RunMode::Production).await else {
            return;
        };
        let ctx = gpu.ctx;
        let room = load_model_gltf(
            &ctx.scene.asset_root,
            &ctx.scene.room_model,
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        )
        .await
        .unwrap();

        let floor = room.find("floor").unwrap().get_render();
        let model = floor[0].model;
        assert_eq!(model.materials.len(), 2);
        assert_eq!(model.materials[0].name, "tinted");
        assert_eq!(model.materials[0].base_color_factor, TINT);

        // the triangle references no material and must not pick up "tinted"
        let material = &model.materials[model.meshes[0].material];
        assert_eq!(material.name, DEFAULT_MATERIAL);
        assert_eq!(material.base_color_factor, [1.0; 4]);
    });
}

#[test]
fn a_frame_runs_through_the_post_process_chain() {
    let root = write_room_assets("gpu-frame");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let Some(gpu) = headless(&root, RunMode::Production).await else {
            return;
        };
        let ctx = gpu.ctx.clone();
        let device = &ctx.device;
        let queue = &ctx.queue;
        let size = [96, 64];

        let mut settings = PostProcessSettings::standard();
        settings.samples = supported_samples(&gpu.adapter, &settings);
        let post = PostProcess::new(device, settings, ctx.surface_format, size);
        let mut camera = mk_camera(device);
        let projection =
            pixel_room::camera::Projection::new(size[0], size[1], cgmath::Rad(0.8), 0.1, 1000.0);
        camera.write(queue, &projection);
        let light = mk_lights(device);
        let pipeline = mk_basic_pipeline(
            device,
            &ctx.material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &post.scene_targets(),
            post.sample_count(),
        );
        let scene = RoomScene::new(gpu.ctx).await.unwrap();

        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test output"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.surface_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = output.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test encoder"),
        });
        {
            let mut pass = post.begin_scene_pass(&mut encoder, wgpu::Color::BLACK);
            pass.set_pipeline(&pipeline);
            let mut basics = Vec::new();
            scene.on_render().collect(&mut basics);
            assert_eq!(basics.len(), 3);
            draw_instanced(&mut pass, &basics, &camera.bind_group, &light.bind_group);
        }
        post.run(&mut encoder, &view);
        queue.submit(std::iter::once(encoder.finish()));
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(std::time::Duration::from_secs(3)),
            })
            .unwrap();
    });
}
