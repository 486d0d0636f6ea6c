use hymn_physics::*;

fn main() {
    env_logger::init();

    let mut world = World::new();
    let mut manager = PhysicsManager::new();

    let ground = world.create_entity("ground");
    manager.create_shape(ground, Shape::plane(Vec3::Y, 0.0));
    manager.create_rigid_body_with_mass(&world, ground, 0.0);

    let ball = world.create_entity_at("ball", Transform::from_position(Vec3::new(0.0, 10.0, 0.0)));
    manager.create_shape(ball, Shape::sphere(0.5));
    manager.create_rigid_body(&world, ball);
    manager.set_restitution(ball, 0.5);

    for frame in 0..180 {
        manager.update(&world, 1.0 / 60.0);
        manager.update_entity_transforms(&mut world);
        if frame % 30 == 0 {
            if let Some(entity) = world.get(ball) {
                println!("t = {:.2}s  y = {:.3}", frame as f32 / 60.0, entity.transform.position.y);
            }
        }
    }

    if let Some(view) = manager.rigid_body(ball) {
        println!("Ball at rest: {}", !view.is_awake());
    }
    let profile = manager.profile();
    println!(
        "Last update: {:?} for {} bodies over {} sub-steps",
        profile.total(),
        profile.body_count,
        profile.sub_steps
    );
}
