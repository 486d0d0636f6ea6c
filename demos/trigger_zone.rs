use hymn_physics::*;
use std::sync::Arc;

fn main() {
    env_logger::init();

    let mut world = World::new();
    let mut manager = PhysicsManager::new();

    let player = world.create_entity_at("player", Transform::from_position(Vec3::new(-5.0, 0.0, 0.0)));
    manager.create_shape(player, Shape::sphere(0.5));
    manager.create_rigid_body(&world, player);
    manager.make_kinematic(player);

    let door = world.create_entity("door");
    let zone = manager.create_trigger(Some(Arc::new(Shape::cuboid(2.0, 2.0, 2.0))));

    manager
        .on_trigger_leave(zone, player, |contact: &TriggerContact| {
            println!("{:?} left {:?}", contact.entity, contact.trigger);
        })
        .expect("player has a body");

    let queue = TriggerEventQueue::new();
    register_trigger(&mut manager, &queue, zone, player, door, "Open").expect("zone is live");

    let mut repeat = TriggerRepeat::new(TriggerRepeatConfig {
        name: "chime".into(),
        cooldown: 0.5,
        charges: 1,
        bindings: vec![EventBinding {
            kind: EventKind::OnEnter,
            target_entity: door,
            method: "Chime".into(),
        }],
        ..TriggerRepeatConfig::default()
    });
    repeat.attach(&mut manager, zone, player).expect("player has a body");

    // Walk the player through the zone and back out.
    for frame in 0..120 {
        let x = -5.0 + frame as f32 * 0.1;
        if let Some(entity) = world.get_mut(player) {
            entity.transform.position.x = x;
        }
        manager.update(&world, 1.0 / 60.0);

        for event in queue.drain() {
            println!("frame {frame}: {:?} -> {}", event.script_entity, event.method_name);
        }
        for fired in repeat.sync(&manager, 1.0 / 60.0).unwrap_or_default() {
            println!("frame {frame}: repeat fired {}", fired.method);
        }
    }

    if let Err(error) = manager.release_trigger_volume(zone) {
        println!("release failed: {error}");
    }
}
