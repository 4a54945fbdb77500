//! Rigid-body simulation.
//!
//! [`Physics`] wraps a rapier world. Meshes get an impostor (a simple collision
//! shape derived from their bounding box) through [`Physics::add_impostor`], the
//! world advances with a fixed timestep and poses are read back as [`Instance`]s.

use rapier3d::{na, prelude::*};

use crate::data_structures::{instance::Instance, primitives::Bounds};

/// Simulation timestep in seconds.
pub const FIXED_DT: f32 = 1.0 / 60.0;
/// Upper bound on simulation steps per rendered frame.
pub const MAX_SUBSTEPS: u32 = 5;
/// Thinnest box a flat mesh is allowed to collide as.
pub const MIN_BOX_THICKNESS: f32 = 0.1;

pub const GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpostorKind {
    Box,
    Sphere,
}

/// Physical parameters of an impostor. A mass of `0` makes the body static.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impostor {
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl Impostor {
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            ..Default::default()
        }
    }
}

impl Default for Impostor {
    fn default() -> Self {
        Self {
            mass: 1.0,
            restitution: 0.9,
            friction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpostorHandle {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

pub struct Physics {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    debug_pipeline: DebugRenderPipeline,
    accumulator: f32,
}

impl std::fmt::Debug for Physics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Physics")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl Physics {
    /// Create an empty world with earth gravity.
    pub async fn init() -> anyhow::Result<Self> {
        let physics = Self::new();
        log::info!("physics world ready, gravity {:?}", GRAVITY);
        Ok(physics)
    }

    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: FIXED_DT,
            ..Default::default()
        };
        Self {
            gravity: vector![GRAVITY[0], GRAVITY[1], GRAVITY[2]],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            debug_pipeline: DebugRenderPipeline::new(
                DebugRenderStyle::default(),
                DebugRenderMode::COLLIDER_SHAPES,
            ),
            accumulator: 0.0,
        }
    }

    /// Attach a collision shape to a mesh placed at `transform`.
    ///
    /// `bounds` is the mesh's local bounding box; it is scaled by the transform.
    /// Boxes thinner than [`MIN_BOX_THICKNESS`] grow downwards so their top face
    /// stays where the mesh is.
    pub fn add_impostor(
        &mut self,
        kind: ImpostorKind,
        transform: &Instance,
        bounds: &Bounds,
        impostor: Impostor,
    ) -> ImpostorHandle {
        let body = if impostor.mass <= 0.0 {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().ccd_enabled(true)
        }
        .position(to_isometry(transform))
        .build();

        let scale = transform.scale.map(f32::abs);
        let mut half = bounds.half_extents().zip(scale, |h, s| h * s);
        let mut center = bounds.center().zip(transform.scale, |c, s| c * s);

        let shape = match kind {
            ImpostorKind::Box => {
                let min_half = MIN_BOX_THICKNESS * 0.5;
                for axis in 0..3 {
                    if half[axis] < min_half {
                        center[axis] -= min_half - half[axis];
                        half[axis] = min_half;
                    }
                }
                ColliderBuilder::cuboid(half.x, half.y, half.z)
            }
            ImpostorKind::Sphere => {
                let radius = half.x.max(half.y).max(half.z);
                ColliderBuilder::ball(radius.max(f32::EPSILON))
            }
        };
        let mut collider = shape
            .translation(vector![center.x, center.y, center.z])
            .restitution(impostor.restitution)
            .friction(impostor.friction);
        if impostor.mass > 0.0 {
            collider = collider.mass(impostor.mass);
        }

        let body = self.bodies.insert(body);
        let collider =
            self.colliders
                .insert_with_parent(collider.build(), body, &mut self.bodies);
        log::debug!("added {kind:?} impostor {body:?} with {impostor:?}");
        ImpostorHandle { body, collider }
    }

    /// Advance the simulation by `dt` seconds of wall time in fixed steps.
    ///
    /// Returns the number of steps taken. Time beyond [`MAX_SUBSTEPS`] steps is dropped.
    pub fn step(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= FIXED_DT && steps < MAX_SUBSTEPS {
            self.step_once();
            self.accumulator -= FIXED_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS && self.accumulator >= FIXED_DT {
            log::debug!("physics is behind, dropping {:.3}s", self.accumulator);
            self.accumulator %= FIXED_DT;
        }
        steps
    }

    fn step_once(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Current pose of an impostor's body. Scale is always `1`.
    pub fn transform(&self, handle: ImpostorHandle) -> Option<Instance> {
        self.bodies.get(handle.body).map(|body| {
            let pose = body.position();
            let t = pose.translation.vector;
            let q = pose.rotation;
            Instance {
                position: cgmath::Vector3::new(t.x, t.y, t.z),
                rotation: cgmath::Quaternion::new(q.w, q.i, q.j, q.k),
                scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
            }
        })
    }

    pub fn linear_velocity(&self, handle: ImpostorHandle) -> Option<cgmath::Vector3<f32>> {
        self.bodies.get(handle.body).map(|body| {
            let v = body.linvel();
            cgmath::Vector3::new(v.x, v.y, v.z)
        })
    }

    /// Feed collider wireframes to `backend`.
    pub fn debug_lines(&mut self, backend: &mut impl DebugRenderBackend) {
        self.debug_pipeline.render(
            backend,
            &self.bodies,
            &self.colliders,
            &self.impulse_joints,
            &self.multibody_joints,
            &self.narrow_phase,
        );
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_isometry(instance: &Instance) -> Isometry<Real> {
    let p = instance.position;
    let q = instance.rotation;
    let rotation = na::UnitQuaternion::from_quaternion(na::Quaternion::new(q.s, q.v.x, q.v.y, q.v.z));
    Isometry::from_parts(na::Translation3::new(p.x, p.y, p.z), rotation)
}

#[cfg(test)]
mod tests {
    use cgmath::Rotation3;

    use super::*;
    use crate::data_structures::primitives::{ground, sphere};

    fn room() -> (Physics, ImpostorHandle, ImpostorHandle) {
        let mut physics = Physics::new();
        let ground_mesh = ground("ground", 3.8, 3.8, 1);
        let ground = physics.add_impostor(
            ImpostorKind::Box,
            &Instance::at(0.0, -0.01, 0.0),
            &ground_mesh.bounds,
            Impostor::with_mass(0.0),
        );
        let sphere_mesh = sphere("sphere", 32, 1.0);
        let sphere = physics.add_impostor(
            ImpostorKind::Sphere,
            &Instance::at(0.0, 5.0, 0.0),
            &sphere_mesh.bounds,
            Impostor::default(),
        );
        (physics, ground, sphere)
    }

    #[test]
    fn default_impostor_is_dynamic_and_bouncy() {
        let impostor = Impostor::default();
        assert_eq!(impostor.mass, 1.0);
        assert_eq!(impostor.restitution, 0.9);
        assert_eq!(impostor.friction, 0.5);
    }

    #[test]
    fn sphere_falls_bounces_and_never_sinks_into_the_ground() {
        let (mut physics, ground, sphere) = room();
        let start = physics.transform(sphere).unwrap().position.y;
        let mut lowest = start;
        let mut lowest_step = 0;
        let mut highest_after_contact = f32::MIN;
        for step in 0..600 {
            physics.step(FIXED_DT);
            let y = physics.transform(sphere).unwrap().position.y;
            if y < lowest {
                lowest = y;
                lowest_step = step;
            } else if step > lowest_step {
                highest_after_contact = highest_after_contact.max(y);
            }
        }
        assert!(lowest < 1.0, "sphere never fell: lowest {lowest}");
        // ground top is at -0.01, sphere radius is 0.5
        assert!(lowest > 0.49 - 0.05, "sphere sank to {lowest}");
        assert!(highest_after_contact > lowest + 1.0, "no bounce: {highest_after_contact}");

        let ground_pose = physics.transform(ground).unwrap();
        assert_eq!(ground_pose.position, cgmath::Vector3::new(0.0, -0.01, 0.0));
    }

    #[test]
    fn step_runs_fixed_substeps() {
        let mut physics = Physics::new();
        assert_eq!(physics.step(FIXED_DT * 0.5), 0);
        assert_eq!(physics.step(FIXED_DT * 0.5), 1);
        assert_eq!(physics.step(FIXED_DT * 2.5), 2);
        // a long stall is capped and the backlog dropped
        assert_eq!(physics.step(1.0), MAX_SUBSTEPS);
        assert!(physics.step(0.0) <= 1);
    }

    #[test]
    fn flat_boxes_get_a_minimum_thickness_below_their_surface() {
        let mut physics = Physics::new();
        let bounds = ground("g", 2.0, 2.0, 1).bounds;
        let handle = physics.add_impostor(
            ImpostorKind::Box,
            &Instance::new(),
            &bounds,
            Impostor::with_mass(0.0),
        );
        let collider = &physics.colliders[handle.collider];
        let aabb = collider.compute_aabb();
        assert!((aabb.maxs.y - 0.0).abs() < 1e-5);
        assert!((aabb.mins.y + MIN_BOX_THICKNESS).abs() < 1e-5);
        assert!((aabb.maxs.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn poses_round_trip_rotation() {
        let mut physics = Physics::new();
        let mut transform = Instance::at(1.0, 2.0, 3.0);
        transform.rotation = cgmath::Quaternion::from_angle_y(cgmath::Deg(30.0));
        let bounds = sphere("s", 4, 1.0).bounds;
        let handle = physics.add_impostor(
            ImpostorKind::Sphere,
            &transform,
            &bounds,
            Impostor::with_mass(0.0),
        );
        let pose = physics.transform(handle).unwrap();
        assert!((pose.position - transform.position).x.abs() < 1e-5);
        let diff = pose.rotation - transform.rotation;
        assert!(diff.s.abs() < 1e-5 && diff.v.x.abs() < 1e-5 && diff.v.y.abs() < 1e-5);
    }
}
