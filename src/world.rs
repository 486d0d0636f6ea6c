use glam::Vec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    collision::{
        broadphase::BroadPhase,
        contact::{ContactManifold, ContactResultCallback},
        geometry::CollisionGeometry,
        narrowphase::NarrowPhase,
    },
    config::PhysicsConfig,
    core::{
        body::Body,
        types::{Material, Transform},
    },
    dynamics::{
        integrator::Integrator,
        island::IslandManager,
        solver::{Contact, PGSSolver, SolverStepMetrics},
    },
    utils::{
        allocator::{Arena, BodyHandle},
        logging::ScopedTimer,
    },
};

/// Accumulated time within this margin of a whole step still counts as one.
const STEP_EPSILON: f32 = 1e-6;

/// Rigid-body simulation: body storage, collision pipeline, and solver.
pub struct DynamicsWorld {
    bodies: Arena<Body, BodyHandle>,
    gravity: Vec3,
    integrator: Integrator,
    solver: PGSSolver,
    broadphase: BroadPhase,
    islands: IslandManager,
    sleep_threshold: f32,
    time_accumulated: f32,
    parallel_enabled: bool,
    last_solver_metrics: SolverStepMetrics,
}

impl Default for DynamicsWorld {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl DynamicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            bodies: Arena::new(),
            gravity: config.gravity,
            integrator: Integrator::new(),
            solver: PGSSolver::new(config.solver_iterations),
            broadphase: BroadPhase::new(config.broadphase_cell_size),
            islands: IslandManager::new(),
            sleep_threshold: config.sleep_threshold,
            time_accumulated: 0.0,
            parallel_enabled: cfg!(feature = "parallel"),
            last_solver_metrics: SolverStepMetrics::default(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        for body in self.bodies.values_mut() {
            if body.is_dynamic() {
                body.wake();
            }
        }
    }

    /// Only takes effect when the crate is built with the `parallel` feature.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled && cfg!(feature = "parallel");
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    pub fn add_body(&mut self, mut body: Body) -> BodyHandle {
        let handle = self.bodies.insert_with(|handle| {
            body.handle = handle;
            body
        });
        log::debug!("added body {handle:?}");
        handle
    }

    /// Takes the body out of the simulation; its handle is dead afterwards.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let removed = self.bodies.remove(handle);
        if removed.is_some() {
            log::debug!("removed body {handle:?}");
        }
        removed
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn last_solver_metrics(&self) -> &SolverStepMetrics {
        &self.last_solver_metrics
    }

    /// Advances the simulation by `dt` in steps of `fixed_step`, taking at most
    /// `max_sub_steps` of them; time beyond that is dropped. With
    /// `max_sub_steps == 0` a single step of exactly `dt` is taken instead.
    /// Returns the number of steps simulated.
    pub fn step_simulation(&mut self, dt: f32, max_sub_steps: u32, fixed_step: f32) -> u32 {
        if !(dt > 0.0) {
            return 0;
        }

        if max_sub_steps == 0 {
            self.internal_step(dt);
            return 1;
        }

        if !(fixed_step > 0.0) {
            log::warn!("ignoring step with non-positive fixed step {fixed_step}");
            return 0;
        }

        self.time_accumulated += dt;
        let available = ((self.time_accumulated + STEP_EPSILON) / fixed_step).floor() as u32;
        self.time_accumulated = (self.time_accumulated - available as f32 * fixed_step).max(0.0);

        let steps = available.min(max_sub_steps);
        if steps < available {
            log::debug!(
                "dropping {} physics steps, frame took too long",
                available - steps
            );
        }

        for _ in 0..steps {
            self.internal_step(fixed_step);
        }
        steps
    }

    fn internal_step(&mut self, dt: f32) {
        {
            let _timer = ScopedTimer::new("integrator");
            self.integrator
                .integrate_velocities(&mut self.bodies, self.gravity, dt);
        }

        let mut contacts = {
            let _timer = ScopedTimer::new("contacts::generate");
            self.generate_contacts()
        };

        {
            let _timer = ScopedTimer::new("islands::build");
            self.islands.build_islands(&mut self.bodies, &contacts);
        }

        {
            let _timer = ScopedTimer::new("solver");
            self.last_solver_metrics = self.solver.solve(&mut self.bodies, &mut contacts);
        }

        {
            let _timer = ScopedTimer::new("integrator");
            self.integrator.integrate_positions(&mut self.bodies, dt);
        }

        self.islands
            .update_sleeping(&mut self.bodies, self.sleep_threshold, dt);

        // Kinematic bodies only disturb others in the step after they move.
        for body in self.bodies.values_mut() {
            if body.is_kinematic() {
                body.is_awake = false;
            }
        }
    }

    /// Contacts for the current state without advancing time. Sleeping bodies
    /// touched by moving ones are woken.
    pub fn collect_contacts(&mut self) -> Vec<Contact> {
        self.generate_contacts()
    }

    fn generate_contacts(&mut self) -> Vec<Contact> {
        let pairs: Vec<(BodyHandle, BodyHandle)> = self
            .broadphase
            .find_pairs(&self.bodies)
            .into_iter()
            .filter(|&(a, b)| match (self.bodies.get(a), self.bodies.get(b)) {
                (Some(body_a), Some(body_b)) => wants_contact(body_a, body_b),
                _ => false,
            })
            .collect();

        let manifolds = self.narrow_phase(&pairs);

        let mut contacts = Vec::new();
        for (handle_a, handle_b, manifold) in manifolds {
            let Some((body_a, body_b)) = self.bodies.get2_mut(handle_a, handle_b) else {
                continue;
            };

            if is_mover(body_a) && body_b.is_dynamic() && !body_b.is_awake {
                body_b.wake();
            }
            if is_mover(body_b) && body_a.is_dynamic() && !body_a.is_awake {
                body_a.wake();
            }

            let material = Material::combine_pair(&body_a.material, &body_b.material);
            contacts.extend(manifold.points.iter().map(|point| {
                Contact::new(
                    handle_a,
                    handle_b,
                    point.point,
                    point.normal,
                    point.depth,
                    material,
                )
            }));
        }
        contacts
    }

    #[cfg(feature = "parallel")]
    fn narrow_phase(
        &self,
        pairs: &[(BodyHandle, BodyHandle)],
    ) -> Vec<(BodyHandle, BodyHandle, ContactManifold)> {
        if self.parallel_enabled {
            pairs
                .par_iter()
                .filter_map(|&(a, b)| collide_pair(&self.bodies, a, b))
                .collect()
        } else {
            pairs
                .iter()
                .filter_map(|&(a, b)| collide_pair(&self.bodies, a, b))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn narrow_phase(
        &self,
        pairs: &[(BodyHandle, BodyHandle)],
    ) -> Vec<(BodyHandle, BodyHandle, ContactManifold)> {
        pairs
            .iter()
            .filter_map(|&(a, b)| collide_pair(&self.bodies, a, b))
            .collect()
    }

    /// Tests a free-standing geometry against every enabled body with a shape
    /// and reports each manifold point to `callback`. Normals point from the
    /// tested geometry towards the body. Returns the number of bodies touched.
    pub fn contact_pair_test(
        &self,
        geometry: &CollisionGeometry,
        transform: &Transform,
        callback: &mut dyn ContactResultCallback,
    ) -> usize {
        let transform = transform.rigid();
        let mut touched = 0;

        for (handle, body) in self.bodies.iter() {
            if !body.is_enabled() {
                continue;
            }
            let Some(body_geometry) = body.geometry() else {
                continue;
            };
            if !callback.needs_collision(handle) {
                continue;
            }
            let Some(manifold) =
                NarrowPhase::collide(geometry, &transform, body_geometry, &body.transform)
            else {
                continue;
            };

            touched += 1;
            for point in &manifold.points {
                if callback.add_single_result(handle, point).is_break() {
                    break;
                }
            }
        }

        touched
    }
}

/// Awake and able to push others.
fn is_mover(body: &Body) -> bool {
    body.is_awake && !body.is_static()
}

fn wants_contact(a: &Body, b: &Body) -> bool {
    a.is_enabled()
        && b.is_enabled()
        && (a.is_dynamic() || b.is_dynamic())
        && (is_mover(a) || is_mover(b))
}

fn collide_pair(
    bodies: &Arena<Body, BodyHandle>,
    a: BodyHandle,
    b: BodyHandle,
) -> Option<(BodyHandle, BodyHandle, ContactManifold)> {
    let body_a = bodies.get(a)?;
    let body_b = bodies.get(b)?;
    NarrowPhase::collide(
        body_a.geometry()?,
        &body_a.transform,
        body_b.geometry()?,
        &body_b.transform,
    )
    .map(|manifold| (a, b, manifold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collision::contact::ManifoldPoint, core::types::Velocity, shape::Shape,
        utils::allocator::EntityId,
    };
    use std::{ops::ControlFlow, sync::Arc};

    fn sphere_body(radius: f32, mass: f32, position: Vec3) -> Body {
        Body::new(EntityId::from_index(0), mass)
            .with_shape(Some(Arc::new(Shape::sphere(radius))))
            .with_transform(Transform::from_position(position))
    }

    #[test]
    fn fixed_stepping_counts_whole_steps() {
        let mut world = DynamicsWorld::default();
        let step = 1.0 / 60.0;
        assert_eq!(world.step_simulation(step, 10, step), 1);
        assert_eq!(world.step_simulation(step * 0.5, 10, step), 0);
        assert_eq!(world.step_simulation(step * 0.5, 10, step), 1);
    }

    #[test]
    fn sub_steps_are_clamped() {
        let mut world = DynamicsWorld::default();
        let step = 1.0 / 60.0;
        assert_eq!(world.step_simulation(1.0, 10, step), 10);
        // The excess second was dropped rather than carried over.
        assert_eq!(world.step_simulation(step, 10, step), 1);
    }

    #[test]
    fn zero_max_sub_steps_takes_variable_step() {
        let mut world = DynamicsWorld::default();
        let handle = world.add_body(sphere_body(0.5, 1.0, Vec3::new(0.0, 10.0, 0.0)));
        assert_eq!(world.step_simulation(0.1, 0, 1.0 / 60.0), 1);
        let velocity = world.body(handle).map(|b| b.velocity.linear.y).unwrap_or_default();
        assert!((velocity + 0.982).abs() < 1e-4);
    }

    #[test]
    fn body_rests_on_ground_plane() {
        let mut world = DynamicsWorld::default();
        world.add_body(
            Body::new(EntityId::from_index(0), 0.0)
                .with_shape(Some(Arc::new(Shape::plane(Vec3::Y, 0.0)))),
        );
        let ball = world.add_body(sphere_body(0.5, 1.0, Vec3::new(0.0, 1.0, 0.0)));

        for _ in 0..180 {
            world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
        }

        let y = world.body(ball).map(|b| b.transform.position.y).unwrap_or_default();
        assert!(y > 0.4 && y < 0.6, "ball at {y}");
    }

    #[test]
    fn removed_body_handle_is_dead() {
        let mut world = DynamicsWorld::default();
        let handle = world.add_body(sphere_body(0.5, 1.0, Vec3::ZERO));
        assert!(world.remove_body(handle).is_some());
        assert!(world.body(handle).is_none());
        assert!(world.remove_body(handle).is_none());
        world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
    }

    #[test]
    fn pair_test_reports_overlapping_bodies_only() {
        let mut world = DynamicsWorld::default();
        let near = world.add_body(sphere_body(0.5, 1.0, Vec3::new(1.0, 0.0, 0.0)));
        world.add_body(sphere_body(0.5, 1.0, Vec3::new(5.0, 0.0, 0.0)));

        let query = Shape::sphere(1.0);
        let mut hits: Vec<BodyHandle> = Vec::new();
        let mut callback = |handle: BodyHandle, _point: &ManifoldPoint| {
            hits.push(handle);
            ControlFlow::Break(())
        };
        let touched =
            world.contact_pair_test(query.geometry(), &Transform::default(), &mut callback);

        assert_eq!(touched, 1);
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn disabled_body_is_frozen_and_untestable() {
        let mut world = DynamicsWorld::default();
        let ball = world.add_body(sphere_body(0.5, 1.0, Vec3::ZERO));
        let resting = world.add_body(sphere_body(0.5, 1.0, Vec3::new(0.0, -0.9, 0.0)));
        if let Some(body) = world.body_mut(ball) {
            body.set_enabled(false);
        }

        world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
        assert_eq!(world.body(ball).map(|b| b.transform.position), Some(Vec3::ZERO));
        assert_eq!(world.body(ball).map(|b| b.velocity), Some(Velocity::ZERO));
        assert!(world.collect_contacts().is_empty());

        let query = Shape::sphere(0.25);
        let mut hits: Vec<BodyHandle> = Vec::new();
        let mut callback = |handle: BodyHandle, _point: &ManifoldPoint| {
            hits.push(handle);
            ControlFlow::Break(())
        };
        world.contact_pair_test(query.geometry(), &Transform::default(), &mut callback);
        assert!(!hits.contains(&ball));

        assert!(world.remove_body(resting).is_some());
        if let Some(body) = world.body_mut(ball) {
            body.set_enabled(true);
        }
        world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
        assert!(world.body(ball).map(|b| b.velocity.linear.y < 0.0).unwrap_or(false));
    }

    #[test]
    fn moving_kinematic_wakes_sleeping_body() {
        let mut world = DynamicsWorld::default();
        world.set_gravity(Vec3::ZERO);
        let sleeper = world.add_body(sphere_body(0.5, 1.0, Vec3::ZERO));
        if let Some(body) = world.body_mut(sleeper) {
            body.put_to_sleep();
        }

        let mut pusher = sphere_body(0.5, 1.0, Vec3::new(3.0, 0.0, 0.0));
        pusher.make_kinematic();
        let pusher = world.add_body(pusher);

        world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
        assert_eq!(world.body(sleeper).map(|b| b.is_awake), Some(false));

        if let Some(body) = world.body_mut(pusher) {
            body.set_world_transform(&Transform::from_position(Vec3::new(0.9, 0.0, 0.0)));
        }
        world.step_simulation(1.0 / 60.0, 10, 1.0 / 60.0);
        let sleeper = world.body(sleeper);
        assert_eq!(sleeper.map(|b| b.is_awake), Some(true));
        assert!(sleeper.map(|b| b.transform.position.x < 0.0).unwrap_or(false));
    }
}
