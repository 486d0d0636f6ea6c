use hymn_physics::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread;

const DT: f32 = 1.0 / 60.0;

#[test]
fn manager_and_queues_cross_threads() {
    fn assert_send<T: Send>() {}
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send::<PhysicsManager>();
    assert_send_sync::<CommandQueue>();
    assert_send_sync::<TriggerEventQueue>();
    assert_send_sync::<Shape>();
}

#[test]
fn manager_runs_on_worker_thread() {
    let mut world = World::new();
    let mut manager = PhysicsManager::new();
    let ball = world.create_entity_at("ball", Transform::from_position(Vec3::new(0.0, 10.0, 0.0)));
    manager.create_shape(ball, Shape::sphere(0.5));
    manager.create_rigid_body(&world, ball);

    let lease = manager.create_trigger(Some(Arc::new(Shape::cuboid(4.0, 1.0, 4.0))));
    manager.set_position(lease, Vec3::new(0.0, 5.0, 0.0)).expect("live trigger");
    let enters = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&enters);
    manager
        .on_trigger_enter(lease, ball, move |_contact: &TriggerContact| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("live trigger");

    let worker = thread::spawn(move || {
        for _ in 0..120 {
            manager.update(&world, DT);
            manager.update_entity_transforms(&mut world);
        }
        (world, manager)
    });
    let (world, manager) = worker.join().expect("worker finished");

    assert_eq!(enters.load(Ordering::SeqCst), 1);
    let y = world.get(ball).map(|entity| entity.transform.position.y).unwrap_or(10.0);
    assert!(y < 5.0, "ball fell through the trigger, y = {y}");
    assert!(manager.rigid_body(ball).is_some());
}

#[test]
fn commands_queued_from_other_threads_apply_on_update() {
    let mut world = World::new();
    let mut manager = PhysicsManager::new();
    let ball = world.create_entity("ball");
    manager.create_shape(ball, Shape::sphere(0.5));
    manager.create_rigid_body(&world, ball);
    manager.make_kinematic(ball);
    let lease = manager.create_trigger(Some(Arc::new(Shape::sphere(1.0))));

    let enters = Arc::new(AtomicUsize::new(0));
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let commands = manager.commands();
            let counter = Arc::clone(&enters);
            thread::spawn(move || {
                commands.on_trigger_enter(lease, ball, move |_contact: &TriggerContact| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer finished");
    }
    assert_eq!(manager.commands().len(), 4);

    manager.update(&world, DT);
    // Each registration replaced the last, so one handler fires.
    assert_eq!(enters.load(Ordering::SeqCst), 1);
    assert!(manager.commands().is_empty());
}

#[test]
fn scripted_events_drain_on_another_thread() {
    let mut world = World::new();
    let mut manager = PhysicsManager::new();
    let ball = world.create_entity("ball");
    let door = world.create_entity("door");
    manager.create_shape(ball, Shape::sphere(0.5));
    manager.create_rigid_body(&world, ball);
    manager.make_kinematic(ball);
    let lease = manager.create_trigger(Some(Arc::new(Shape::sphere(1.0))));

    let queue = TriggerEventQueue::new();
    register_trigger(&mut manager, &queue, lease, ball, door, "Open").expect("live trigger");
    manager.update(&world, DT);
    manager.update(&world, DT);

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.drain())
    };
    let events = consumer.join().expect("consumer finished");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].script_entity, door);
    assert!(queue.is_empty());
}

#[test]
fn parallel_narrowphase_matches_serial() {
    fn run(parallel: bool) -> Vec<Vec3> {
        let mut world = World::new();
        let mut manager = PhysicsManager::new();
        manager.set_parallel_enabled(parallel);

        let ground = world.create_entity("ground");
        manager.create_shape(ground, Shape::plane(Vec3::Y, 0.0));
        manager.create_rigid_body_with_mass(&world, ground, 0.0);

        let mut balls = Vec::new();
        for i in 0..16 {
            let position = Vec3::new((i % 4) as f32 * 1.5, 1.0 + (i / 4) as f32 * 1.2, 0.0);
            let ball = world.create_entity_at("ball", Transform::from_position(position));
            manager.create_shape(ball, Shape::sphere(0.5));
            manager.create_rigid_body(&world, ball);
            balls.push(ball);
        }
        for _ in 0..90 {
            manager.update(&world, DT);
        }
        balls
            .iter()
            .filter_map(|ball| manager.rigid_body(*ball).map(|view| view.position()))
            .collect()
    }

    let serial = run(false);
    let parallel = run(true);
    assert_eq!(serial.len(), 16);
    assert_eq!(serial, parallel);
}
