use pixel_room::{
    data_structures::{instance::Instance, primitives},
    physics::{FIXED_DT, Impostor, ImpostorKind, Physics},
    scene::{
        GROUND_SIZE, GROUND_SUBDIVISIONS, GROUND_Y, SPHERE_DIAMETER, SPHERE_SEGMENTS, SPHERE_Y,
    },
};

fn room_world() -> (Physics, pixel_room::physics::ImpostorHandle, pixel_room::physics::ImpostorHandle) {
    let mut physics = Physics::new();
    let ground_mesh = primitives::ground("ground", GROUND_SIZE, GROUND_SIZE, GROUND_SUBDIVISIONS);
    let ground = physics.add_impostor(
        ImpostorKind::Box,
        &Instance::at(0.0, GROUND_Y, 0.0),
        &ground_mesh.bounds,
        Impostor::with_mass(0.0),
    );
    let sphere_mesh = primitives::sphere("sphere", SPHERE_SEGMENTS, SPHERE_DIAMETER);
    let sphere = physics.add_impostor(
        ImpostorKind::Sphere,
        &Instance::at(0.0, SPHERE_Y, 0.0),
        &sphere_mesh.bounds,
        Impostor::default(),
    );
    (physics, ground, sphere)
}

#[test]
fn sphere_bounces_on_the_ground_without_passing_through() {
    let (mut physics, ground, sphere) = room_world();
    let radius = SPHERE_DIAMETER / 2.0;

    let mut lowest = f32::MAX;
    let mut bounces = 0;
    let mut falling = true;
    for _ in 0..(60 * 6) {
        physics.step(FIXED_DT);
        let position = physics.transform(sphere).unwrap().position;
        let velocity = physics.linear_velocity(sphere).unwrap();
        lowest = lowest.min(position.y);
        if falling && velocity.y > 0.1 {
            bounces += 1;
        }
        falling = velocity.y <= 0.1;
        assert!(position.x.abs() < 1e-3 && position.z.abs() < 1e-3);
    }

    assert!(bounces >= 2, "sphere bounced {bounces} times");
    assert!(
        lowest > GROUND_Y + radius - 0.05,
        "sphere sank to {lowest}"
    );
    assert!(physics.transform(sphere).unwrap().position.y < SPHERE_Y);

    let ground_pose = physics.transform(ground).unwrap();
    assert_eq!(ground_pose.position, Instance::at(0.0, GROUND_Y, 0.0).position);
    assert_eq!(physics.linear_velocity(ground).unwrap().y, 0.0);
}

#[test]
fn first_impact_happens_after_free_fall() {
    let (mut physics, _, sphere) = room_world();
    let radius = SPHERE_DIAMETER / 2.0;
    let drop = SPHERE_Y - (GROUND_Y + radius);
    let expected = (2.0 * drop / 9.81_f32).sqrt();

    let mut elapsed = 0.0;
    while physics.linear_velocity(sphere).unwrap().y <= 0.0 && elapsed < 3.0 {
        physics.step(FIXED_DT);
        elapsed += FIXED_DT;
    }
    assert!(
        (elapsed - expected).abs() < 0.1,
        "impact after {elapsed}s, expected about {expected}s"
    );
}
