//! The pixel room.
//!
//! Loads the room model, the physics world and (in development) the debug
//! layer concurrently, then drops a sphere onto a static ground plane inside
//! the room.

use anyhow::Context as _;
use cgmath::Vector3;
use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    context::{Context, InitContext, to_room_space},
    data_structures::{
        instance::Instance,
        primitives::{self, MeshData},
        scene_graph::{ModelNode, SceneNode},
        texture::SamplingMode,
    },
    debug_layer::{DebugLayer, LineCollector},
    flow::{FlowConstructor, GraphicsFlow},
    physics::{Impostor, ImpostorHandle, ImpostorKind, Physics},
    render::Render,
    resources::load_model_gltf,
    startup::{self, StartupOutput},
};

pub const GROUND_SIZE: f32 = 3.8;
pub const GROUND_SUBDIVISIONS: u32 = 1;
/// Just below the room floor so the two don't z-fight.
pub const GROUND_Y: f32 = -0.01;
pub const SPHERE_SEGMENTS: u32 = 32;
pub const SPHERE_DIAMETER: f32 = 1.0;
pub const SPHERE_Y: f32 = 5.0;

/// A mesh whose placement is owned by the physics world.
struct PhysicsBody {
    node: ModelNode,
    handle: ImpostorHandle,
}

impl PhysicsBody {
    fn spawn(
        ctx: &InitContext,
        physics: &mut Physics,
        mesh: MeshData,
        pose: Instance,
        kind: ImpostorKind,
        impostor: Impostor,
    ) -> Self {
        let handle = physics.add_impostor(kind, &pose, &mesh.bounds, impostor);
        let model = mesh.upload(&ctx.device, &ctx.queue, &ctx.material_layout);
        let mut node = ModelNode::from_model(1, &mesh.name, &ctx.device, model);
        node.set_local_transform(0, pose);
        node.update_world_transform_all();
        node.write_to_buffers(&ctx.queue);
        Self { node, handle }
    }

    fn sync(&mut self, physics: &Physics) {
        let (Some(body), Some(local)) = (
            physics.transform(self.handle),
            self.node.get_local_transform(0),
        ) else {
            return;
        };
        self.node.set_local_transform(0, follow_body(&local, &body));
        self.node.update_world_transform_all();
    }
}

/// Move a mesh to a body pose while keeping the mesh's own scale.
pub fn follow_body(local: &Instance, body: &Instance) -> Instance {
    Instance {
        position: body.position,
        rotation: body.rotation,
        scale: local.scale,
    }
}

pub struct RoomScene {
    room: Box<dyn SceneNode>,
    ground: PhysicsBody,
    sphere: PhysicsBody,
    physics: Physics,
    debug: Option<DebugLayer>,
    lines: LineCollector,
}

impl std::fmt::Debug for RoomScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomScene")
            .field("room", &self.room.name())
            .field("physics", &self.physics)
            .field("debug", &self.debug)
            .finish()
    }
}

impl RoomScene {
    pub async fn new(ctx: InitContext) -> anyhow::Result<Self> {
        let scene = &ctx.scene;
        let asset = async {
            load_model_gltf(
                &scene.asset_root,
                &scene.room_model,
                &ctx.device,
                &ctx.queue,
                &ctx.material_layout,
            )
            .await
            .with_context(|| format!("could not load the room model {}", scene.room_model))
        };
        let physics = async { Physics::init().await.context("could not start physics") };
        let init = &ctx;
        let debug = scene.mode.is_development().then(|| async move {
            DebugLayer::load(init)
                .await
                .context("could not load the debug layer")
        });

        let StartupOutput {
            asset: mut room,
            mut physics,
            mut debug,
        } = startup::join(asset, physics, debug).await?;

        if let Some(debug) = &mut debug {
            debug.show();
        }

        room.set_sampling_mode(&ctx.device, SamplingMode::NearestNearest);
        room.update_world_transform_all();
        room.write_to_buffers(&ctx.queue);

        let ground = PhysicsBody::spawn(
            &ctx,
            &mut physics,
            primitives::ground("ground", GROUND_SIZE, GROUND_SIZE, GROUND_SUBDIVISIONS),
            to_room_space(Vector3::new(0.0, GROUND_Y, 0.0)).into(),
            ImpostorKind::Box,
            Impostor::with_mass(0.0),
        );
        let sphere = PhysicsBody::spawn(
            &ctx,
            &mut physics,
            primitives::sphere("sphere", SPHERE_SEGMENTS, SPHERE_DIAMETER),
            to_room_space(Vector3::new(0.0, SPHERE_Y, 0.0)).into(),
            ImpostorKind::Sphere,
            Impostor::default(),
        );

        Ok(Self {
            room,
            ground,
            sphere,
            physics,
            debug,
            lines: LineCollector::default(),
        })
    }

    /// Boxed constructor for [`crate::flow::run`].
    pub fn constructor() -> FlowConstructor {
        Box::new(|ctx| {
            Box::pin(async move {
                let scene = RoomScene::new(ctx).await?;
                anyhow::Ok(Box::new(scene) as Box<dyn GraphicsFlow>)
            })
        })
    }

    pub fn room(&self) -> &dyn SceneNode {
        self.room.as_ref()
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn sphere_transform(&self) -> Option<Instance> {
        self.sphere.node.get_world_transforms().into_iter().next()
    }

    pub fn ground_transform(&self) -> Option<Instance> {
        self.ground.node.get_world_transforms().into_iter().next()
    }

    /// `None` when the debug layer was not loaded (production).
    pub fn debug_visible(&self) -> Option<bool> {
        self.debug.as_ref().map(DebugLayer::is_visible)
    }

    /// Advance physics and move the meshes along. Instance buffers are written
    /// through `queue` and take effect with the next submission.
    pub fn step(&mut self, queue: &wgpu::Queue, dt: Duration) {
        self.physics.step(dt.as_secs_f32());
        for body in [&mut self.ground, &mut self.sphere] {
            body.sync(&self.physics);
            body.node.write_to_buffers(queue);
        }
    }
}

impl GraphicsFlow for RoomScene {
    fn on_init(&mut self, _ctx: &mut Context) {
        log::info!(
            "room '{}' ready, {} rigid bodies, debug layer {}",
            self.room.name(),
            self.physics.body_count(),
            if self.debug.is_some() { "loaded" } else { "off" },
        );
    }

    fn on_update(&mut self, ctx: &Context, dt: Duration) {
        self.step(&ctx.queue, dt);
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) {
        if let (WindowEvent::KeyboardInput { event, .. }, Some(debug)) = (event, &mut self.debug) {
            if !event.repeat {
                debug.handle_key(&event.logical_key, event.state);
            }
        }
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Defaults(self.room.get_render()),
            Render::Defaults(self.ground.node.get_render()),
            Render::Defaults(self.sphere.node.get_render()),
        ])
    }

    fn on_overlay(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let Some(debug) = &mut self.debug else {
            return;
        };
        if !debug.is_visible() {
            return;
        }
        let spot = &ctx.light.spot;
        self.lines.clear();
        self.lines.axes();
        self.lines.spot_cone(spot, spot.position.y.max(1.0));
        self.physics.debug_lines(&mut self.lines);
        debug.draw(
            &ctx.device,
            &ctx.queue,
            encoder,
            view,
            &ctx.camera.bind_group,
            &self.lines.vertices,
        );
    }
}
