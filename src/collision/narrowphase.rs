use glam::{Mat3, Vec3};

use crate::{
    collision::{
        clipping::{clip_polygon, rectangle_planes},
        contact::{ContactManifold, ManifoldPoint},
        geometry::{CollisionGeometry, ConvexGeometry},
    },
    core::types::Transform,
};

/// Rim samples used when a round shape rests on a plane.
const RIM_SAMPLES: usize = 8;

fn support(shape: &ConvexGeometry, transform: &Transform, direction: Vec3) -> Vec3 {
    let local_dir = transform.rotation.conjugate() * direction;
    transform.position + transform.rotation * shape.local_support(local_dir)
}

fn minkowski_support(
    shape_a: &ConvexGeometry,
    transform_a: &Transform,
    shape_b: &ConvexGeometry,
    transform_b: &Transform,
    direction: Vec3,
) -> Vec3 {
    support(shape_a, transform_a, direction) - support(shape_b, transform_b, -direction)
}

/// Gilbert-Johnson-Keerthi (GJK) intersection test on the Minkowski
/// difference `A - B`, followed by EPA for the penetration depth.
pub struct GJKAlgorithm;

impl GJKAlgorithm {
    const MAX_ITERATIONS: usize = 32;
    const EPSILON: f32 = 1e-6;

    pub fn intersect(
        shape_a: &ConvexGeometry,
        transform_a: &Transform,
        shape_b: &ConvexGeometry,
        transform_b: &Transform,
    ) -> Option<ContactManifold> {
        let mut direction = transform_b.position - transform_a.position;
        if direction.length_squared() < Self::EPSILON {
            direction = Vec3::X;
        }

        let first = minkowski_support(shape_a, transform_a, shape_b, transform_b, direction);
        let mut simplex = vec![first];
        direction = -first;
        if direction.length_squared() < Self::EPSILON {
            // Shapes touch exactly at one point.
            return None;
        }

        for _ in 0..Self::MAX_ITERATIONS {
            let point = minkowski_support(shape_a, transform_a, shape_b, transform_b, direction);
            if point.dot(direction) < 0.0 {
                return None;
            }

            simplex.push(point);
            if Self::update_simplex(&mut simplex, &mut direction) {
                let (depth, normal) = EPAAlgorithm::compute_penetration(
                    &simplex,
                    shape_a,
                    transform_a,
                    shape_b,
                    transform_b,
                )?;
                let contact_point = support(shape_a, transform_a, normal) - normal * depth * 0.5;
                return Some(ContactManifold::single(contact_point, normal, depth));
            }
            if direction.length_squared() < Self::EPSILON {
                return None;
            }
        }

        None
    }

    /// Reduces the simplex towards the origin. The newest point is always last.
    fn update_simplex(simplex: &mut Vec<Vec3>, direction: &mut Vec3) -> bool {
        match simplex.len() {
            2 => {
                Self::line_case(simplex, direction);
                false
            }
            3 => {
                Self::triangle_case(simplex, direction);
                false
            }
            4 => Self::tetrahedron_case(simplex, direction),
            _ => false,
        }
    }

    fn line_case(simplex: &mut Vec<Vec3>, direction: &mut Vec3) {
        let a = simplex[1];
        let b = simplex[0];
        let ab = b - a;
        let ao = -a;

        if ab.dot(ao) > 0.0 {
            let dir = ab.cross(ao).cross(ab);
            if dir.length_squared() < Self::EPSILON {
                // Origin is on the line AB. Pick a direction perpendicular to AB.
                let axis = if ab.x.abs() < 0.1 { Vec3::X } else { Vec3::Y };
                *direction = ab.cross(axis);
            } else {
                *direction = dir;
            }
        } else {
            *simplex = vec![a];
            *direction = ao;
        }
    }

    fn triangle_case(simplex: &mut Vec<Vec3>, direction: &mut Vec3) {
        let a = simplex[2];
        let b = simplex[1];
        let c = simplex[0];
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let abc = ab.cross(ac);

        if abc.cross(ac).dot(ao) > 0.0 {
            if ac.dot(ao) > 0.0 {
                *simplex = vec![c, a];
                *direction = ac.cross(ao).cross(ac);
            } else {
                *simplex = vec![b, a];
                Self::line_case(simplex, direction);
            }
        } else if ab.cross(abc).dot(ao) > 0.0 {
            *simplex = vec![b, a];
            Self::line_case(simplex, direction);
        } else if abc.dot(ao) > 0.0 {
            *direction = abc;
        } else {
            // Keep the winding so that `direction` is the triangle normal.
            *simplex = vec![b, c, a];
            *direction = -abc;
        }
    }

    fn tetrahedron_case(simplex: &mut Vec<Vec3>, direction: &mut Vec3) -> bool {
        let a = simplex[3];
        let b = simplex[2];
        let c = simplex[1];
        let d = simplex[0];
        let ab = b - a;
        let ac = c - a;
        let ad = d - a;
        let ao = -a;

        let abc = ab.cross(ac);
        let acd = ac.cross(ad);
        let adb = ad.cross(ab);

        if abc.dot(ao) > 0.0 {
            *simplex = vec![c, b, a];
            Self::triangle_case(simplex, direction);
            false
        } else if acd.dot(ao) > 0.0 {
            *simplex = vec![d, c, a];
            Self::triangle_case(simplex, direction);
            false
        } else if adb.dot(ao) > 0.0 {
            *simplex = vec![b, d, a];
            Self::triangle_case(simplex, direction);
            false
        } else {
            true
        }
    }
}

/// Expanding Polytope Algorithm for penetration depth calculation.
struct EPAAlgorithm;

impl EPAAlgorithm {
    const MAX_ITERATIONS: usize = 48;
    const TOLERANCE: f32 = 1e-4;

    /// Depth and unit normal pointing from A towards B.
    fn compute_penetration(
        simplex: &[Vec3],
        shape_a: &ConvexGeometry,
        transform_a: &Transform,
        shape_b: &ConvexGeometry,
        transform_b: &Transform,
    ) -> Option<(f32, Vec3)> {
        if simplex.len() < 4 {
            return None;
        }

        let mut polytope = simplex.to_vec();
        let mut faces = Self::build_initial_faces(&polytope);

        for _ in 0..Self::MAX_ITERATIONS {
            let (min_dist, normal) = Self::find_closest_face(&polytope, &faces)?;

            let support =
                minkowski_support(shape_a, transform_a, shape_b, transform_b, normal);
            let distance = support.dot(normal);

            if distance - min_dist < Self::TOLERANCE {
                return Some((min_dist.max(0.0), normal));
            }

            Self::expand_polytope(&mut polytope, &mut faces, support);
        }

        let (min_dist, normal) = Self::find_closest_face(&polytope, &faces)?;
        Some((min_dist.max(0.0), normal))
    }

    fn build_initial_faces(polytope: &[Vec3]) -> Vec<(usize, usize, usize)> {
        let mut faces = vec![(0, 1, 2), (0, 2, 3), (0, 3, 1), (1, 3, 2)];
        let centroid = polytope.iter().copied().sum::<Vec3>() / polytope.len() as f32;

        for face in &mut faces {
            let ab = polytope[face.1] - polytope[face.0];
            let ac = polytope[face.2] - polytope[face.0];
            let normal = ab.cross(ac);
            if (polytope[face.0] - centroid).dot(normal) < 0.0 {
                std::mem::swap(&mut face.1, &mut face.2);
            }
        }
        faces
    }

    fn find_closest_face(polytope: &[Vec3], faces: &[(usize, usize, usize)]) -> Option<(f32, Vec3)> {
        let mut best: Option<(f32, Vec3)> = None;

        for &(a, b, c) in faces {
            let ab = polytope[b] - polytope[a];
            let ac = polytope[c] - polytope[a];
            let normal = ab.cross(ac).normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }

            let dist = polytope[a].dot(normal);
            if best.map_or(true, |(best_dist, _)| dist < best_dist) {
                best = Some((dist, normal));
            }
        }

        best
    }

    fn expand_polytope(
        polytope: &mut Vec<Vec3>,
        faces: &mut Vec<(usize, usize, usize)>,
        support: Vec3,
    ) {
        let new_idx = polytope.len();
        polytope.push(support);

        let mut edges = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            let (a, b, c) = faces[i];
            let ab = polytope[b] - polytope[a];
            let ac = polytope[c] - polytope[a];
            let normal = ab.cross(ac).normalize_or_zero();

            if normal.dot(support - polytope[a]) > 0.0 {
                edges.push((a, b));
                edges.push((b, c));
                edges.push((c, a));
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        let mut boundary_edges: Vec<(usize, usize)> = Vec::new();
        for (u, v) in edges {
            if let Some(pos) = boundary_edges.iter().position(|&edge| edge == (v, u)) {
                boundary_edges.swap_remove(pos);
            } else {
                boundary_edges.push((u, v));
            }
        }

        for (u, v) in boundary_edges {
            faces.push((u, v, new_idx));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SeparatingAxis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

/// Separating axis theorem for oriented boxes, with face clipping for a
/// multi-point manifold.
pub struct SATAlgorithm;

impl SATAlgorithm {
    pub fn intersect_boxes(
        half_extents_a: Vec3,
        transform_a: &Transform,
        half_extents_b: Vec3,
        transform_b: &Transform,
    ) -> Option<ContactManifold> {
        let relative_pos = transform_b.position - transform_a.position;
        let axes_a = box_axes(transform_a);
        let axes_b = box_axes(transform_b);

        let mut best_overlap = f32::MAX;
        let mut best_axis = Vec3::ZERO;
        let mut best_kind = SeparatingAxis::FaceA(0);

        let mut test = |axis: Vec3, kind: SeparatingAxis, bias: f32| -> bool {
            let extent_a = project_box(&axes_a, half_extents_a, axis);
            let extent_b = project_box(&axes_b, half_extents_b, axis);
            let projection = relative_pos.dot(axis);
            let overlap = (extent_a + extent_b) - projection.abs();
            if overlap < 0.0 {
                return false;
            }
            if overlap * bias < best_overlap {
                best_overlap = overlap;
                best_axis = if projection < 0.0 { -axis } else { axis };
                best_kind = kind;
            }
            true
        };

        for (i, axis) in axes_a.iter().enumerate() {
            if !test(*axis, SeparatingAxis::FaceA(i), 1.0) {
                return None;
            }
        }
        for (j, axis) in axes_b.iter().enumerate() {
            // Prefer faces of A on near ties so resting contacts stay stable.
            if !test(*axis, SeparatingAxis::FaceB(j), 1.05) {
                return None;
            }
        }
        for (i, axis_a) in axes_a.iter().enumerate() {
            for (j, axis_b) in axes_b.iter().enumerate() {
                let axis = axis_a.cross(*axis_b);
                if axis.length_squared() > 1e-6
                    && !test(axis.normalize(), SeparatingAxis::Edge(i, j), 1.1)
                {
                    return None;
                }
            }
        }

        let normal = best_axis.normalize_or_zero();
        let manifold = match best_kind {
            SeparatingAxis::FaceA(i) => clip_faces(
                (&axes_a, half_extents_a, transform_a.position, i),
                (&axes_b, half_extents_b, transform_b.position),
                normal,
            ),
            SeparatingAxis::FaceB(j) => clip_faces(
                (&axes_b, half_extents_b, transform_b.position, j),
                (&axes_a, half_extents_a, transform_a.position),
                -normal,
            )
            .map(ContactManifold::flipped),
            SeparatingAxis::Edge(i, j) => Some(edge_contact(
                (&axes_a, half_extents_a, transform_a.position, i),
                (&axes_b, half_extents_b, transform_b.position, j),
                normal,
                best_overlap,
            )),
        };

        manifold.or_else(|| {
            let shape_a = ConvexGeometry::Cuboid {
                half_extents: half_extents_a,
            };
            let point = support(&shape_a, transform_a, normal) - normal * best_overlap * 0.5;
            Some(ContactManifold::single(point, normal, best_overlap))
        })
    }
}

fn box_axes(transform: &Transform) -> [Vec3; 3] {
    let basis = Mat3::from_quat(transform.rotation);
    [basis.x_axis, basis.y_axis, basis.z_axis]
}

fn project_box(axes: &[Vec3; 3], half_extents: Vec3, axis: Vec3) -> f32 {
    axes[0].dot(axis).abs() * half_extents.x
        + axes[1].dot(axis).abs() * half_extents.y
        + axes[2].dot(axis).abs() * half_extents.z
}

/// Clips the incident box face against the reference face. `normal` points
/// from the reference box towards the incident box.
fn clip_faces(
    reference: (&[Vec3; 3], Vec3, Vec3, usize),
    incident: (&[Vec3; 3], Vec3, Vec3),
    normal: Vec3,
) -> Option<ContactManifold> {
    let (ref_axes, ref_half, ref_pos, face) = reference;
    let (inc_axes, inc_half, inc_pos) = incident;

    let ref_normal = ref_axes[face] * ref_axes[face].dot(normal).signum();
    let ref_center = ref_pos + ref_normal * ref_half[face];
    let (u, v) = ((face + 1) % 3, (face + 2) % 3);
    let planes = rectangle_planes(ref_center, ref_axes[u], ref_axes[v], ref_half[u], ref_half[v]);

    let inc_face = (0..3)
        .max_by(|&a, &b| {
            inc_axes[a]
                .dot(ref_normal)
                .abs()
                .total_cmp(&inc_axes[b].dot(ref_normal).abs())
        })
        .unwrap_or(0);
    let inc_normal = -inc_axes[inc_face] * inc_axes[inc_face].dot(ref_normal).signum();
    let inc_center = inc_pos + inc_normal * inc_half[inc_face];
    let (iu, iv) = ((inc_face + 1) % 3, (inc_face + 2) % 3);
    let du = inc_axes[iu] * inc_half[iu];
    let dv = inc_axes[iv] * inc_half[iv];
    let polygon = [
        inc_center + du + dv,
        inc_center - du + dv,
        inc_center - du - dv,
        inc_center + du - dv,
    ];

    let mut manifold = ContactManifold::default();
    for point in clip_polygon(&polygon, &planes) {
        let separation = ref_normal.dot(point - ref_center);
        if separation <= 0.0 {
            manifold.points.push(ManifoldPoint {
                point: point - ref_normal * separation * 0.5,
                normal,
                depth: -separation,
            });
        }
    }
    manifold.reduce();
    (!manifold.is_empty()).then_some(manifold)
}

fn edge_contact(
    a: (&[Vec3; 3], Vec3, Vec3, usize),
    b: (&[Vec3; 3], Vec3, Vec3, usize),
    normal: Vec3,
    depth: f32,
) -> ContactManifold {
    let edge_midpoint = |(axes, half, pos, edge): (&[Vec3; 3], Vec3, Vec3, usize), dir: Vec3| {
        let mut point = pos;
        for k in 0..3 {
            if k != edge {
                point += axes[k] * half[k] * axes[k].dot(dir).signum();
            }
        }
        (point, axes[edge])
    };
    let (pa, da) = edge_midpoint(a, normal);
    let (pb, db) = edge_midpoint(b, -normal);

    // Closest points between the two edge lines.
    let r = pa - pb;
    let a_dot_b = da.dot(db);
    let denom = 1.0 - a_dot_b * a_dot_b;
    let (s, t) = if denom.abs() < 1e-6 {
        (0.0, 0.0)
    } else {
        let d1 = da.dot(r);
        let d2 = db.dot(r);
        ((a_dot_b * d2 - d1) / denom, (d2 - a_dot_b * d1) / denom)
    };
    let point = ((pa + da * s) + (pb + db * t)) * 0.5;
    ContactManifold::single(point, normal, depth)
}

/// Separated pairs return `None`; touching pairs report a zero depth.
fn sphere_sphere(
    radius_a: f32,
    transform_a: &Transform,
    radius_b: f32,
    transform_b: &Transform,
) -> Option<ContactManifold> {
    let delta = transform_b.position - transform_a.position;
    let distance = delta.length();
    let radii = radius_a + radius_b;
    if distance > radii {
        return None;
    }
    let normal = if distance > 1e-6 { delta / distance } else { Vec3::Y };
    let depth = radii - distance;
    let point = transform_a.position + normal * (radius_a - depth * 0.5);
    Some(ContactManifold::single(point, normal, depth))
}

/// Normal points from the box towards the sphere.
fn box_sphere(
    half_extents: Vec3,
    box_transform: &Transform,
    radius: f32,
    sphere_transform: &Transform,
) -> Option<ContactManifold> {
    let local_center =
        box_transform.rotation.conjugate() * (sphere_transform.position - box_transform.position);
    let closest = local_center.clamp(-half_extents, half_extents);
    let offset = local_center - closest;
    let distance = offset.length();

    let (local_normal, depth, local_surface) = if distance > 1e-6 {
        if distance > radius {
            return None;
        }
        (offset / distance, radius - distance, closest)
    } else {
        // Centre inside the box: push out through the nearest face.
        let gaps = half_extents - local_center.abs();
        let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            0
        } else if gaps.y <= gaps.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = if local_center[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut surface = local_center;
        surface[axis] = half_extents[axis] * normal[axis];
        (normal, radius + gaps[axis], surface)
    };

    let normal = box_transform.rotation * local_normal;
    let surface = box_transform.position + box_transform.rotation * local_surface;
    // Midpoint between the box surface and the deepest sphere point.
    let point = surface - normal * depth * 0.5;
    Some(ContactManifold::single(point, normal, depth))
}

/// Candidate points of a convex resting on a plane, in world space.
fn plane_features(shape: &ConvexGeometry, transform: &Transform, plane_normal: Vec3) -> Vec<Vec3> {
    let to_world = |p: Vec3| transform.position + transform.rotation * p;
    let rim = |radius: f32, y: f32| {
        (0..RIM_SAMPLES).map(move |i| {
            let angle = i as f32 / RIM_SAMPLES as f32 * std::f32::consts::TAU;
            Vec3::new(radius * angle.cos(), y, radius * angle.sin())
        })
    };

    let mut points = vec![support(shape, transform, -plane_normal)];
    match *shape {
        ConvexGeometry::Sphere { .. } => {}
        ConvexGeometry::Cuboid { half_extents } => {
            for corner in 0..8 {
                let sign = Vec3::new(
                    if corner & 1 == 0 { -1.0 } else { 1.0 },
                    if corner & 2 == 0 { -1.0 } else { 1.0 },
                    if corner & 4 == 0 { -1.0 } else { 1.0 },
                );
                points.push(to_world(half_extents * sign));
            }
        }
        ConvexGeometry::Cylinder {
            radius,
            half_height,
        } => {
            points.extend(rim(radius, half_height).map(to_world));
            points.extend(rim(radius, -half_height).map(to_world));
        }
        ConvexGeometry::Cone {
            radius,
            half_height,
        } => {
            points.push(to_world(Vec3::new(0.0, half_height, 0.0)));
            points.extend(rim(radius, -half_height).map(to_world));
        }
    }
    points
}

/// Normal points from the half-space towards the convex shape.
fn half_space_convex(
    plane_normal: Vec3,
    plane_offset: f32,
    shape: &ConvexGeometry,
    transform: &Transform,
) -> Option<ContactManifold> {
    let deepest = support(shape, transform, -plane_normal);
    if plane_normal.dot(deepest) - plane_offset > 0.0 {
        return None;
    }

    let mut manifold = ContactManifold::default();
    for point in plane_features(shape, transform, plane_normal) {
        let separation = plane_normal.dot(point) - plane_offset;
        if separation > 0.0 {
            continue;
        }
        let duplicate = manifold
            .points
            .iter()
            .any(|existing| existing.point.distance_squared(point) < 1e-8);
        if !duplicate {
            manifold.points.push(ManifoldPoint {
                point: point - plane_normal * separation * 0.5,
                normal: plane_normal,
                depth: -separation,
            });
        }
    }
    manifold.reduce();
    (!manifold.is_empty()).then_some(manifold)
}

/// Narrow phase dispatcher picking the cheapest exact test for each pair.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Contact manifold between two placed geometries, with normals pointing
    /// from `a` towards `b`. Transforms are treated as rigid.
    pub fn collide(
        geometry_a: &CollisionGeometry,
        transform_a: &Transform,
        geometry_b: &CollisionGeometry,
        transform_b: &Transform,
    ) -> Option<ContactManifold> {
        if let (Some(radius_a), Some(radius_b)) =
            (geometry_a.bounding_radius(), geometry_b.bounding_radius())
        {
            let reach = radius_a + radius_b;
            if transform_a.position.distance_squared(transform_b.position) > reach * reach {
                return None;
            }
        }

        match (geometry_a, geometry_b) {
            (CollisionGeometry::HalfSpace { .. }, CollisionGeometry::HalfSpace { .. }) => None,
            (CollisionGeometry::HalfSpace { .. }, CollisionGeometry::Convex(convex)) => {
                let (normal, offset) = geometry_a.world_plane(transform_a)?;
                half_space_convex(normal, offset, convex, transform_b)
            }
            (CollisionGeometry::Convex(convex), CollisionGeometry::HalfSpace { .. }) => {
                let (normal, offset) = geometry_b.world_plane(transform_b)?;
                half_space_convex(normal, offset, convex, transform_a).map(ContactManifold::flipped)
            }
            (CollisionGeometry::Convex(a), CollisionGeometry::Convex(b)) => {
                Self::collide_convex(a, transform_a, b, transform_b)
            }
        }
    }

    fn collide_convex(
        shape_a: &ConvexGeometry,
        transform_a: &Transform,
        shape_b: &ConvexGeometry,
        transform_b: &Transform,
    ) -> Option<ContactManifold> {
        match (*shape_a, *shape_b) {
            (ConvexGeometry::Sphere { radius: ra }, ConvexGeometry::Sphere { radius: rb }) => {
                sphere_sphere(ra, transform_a, rb, transform_b)
            }
            (ConvexGeometry::Cuboid { half_extents }, ConvexGeometry::Sphere { radius }) => {
                box_sphere(half_extents, transform_a, radius, transform_b)
            }
            (ConvexGeometry::Sphere { radius }, ConvexGeometry::Cuboid { half_extents }) => {
                box_sphere(half_extents, transform_b, radius, transform_a)
                    .map(ContactManifold::flipped)
            }
            (
                ConvexGeometry::Cuboid { half_extents: ha },
                ConvexGeometry::Cuboid { half_extents: hb },
            ) => SATAlgorithm::intersect_boxes(ha, transform_a, hb, transform_b),
            _ => GJKAlgorithm::intersect(shape_a, transform_a, shape_b, transform_b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn sphere(radius: f32) -> CollisionGeometry {
        CollisionGeometry::Convex(ConvexGeometry::Sphere { radius })
    }

    fn cuboid(half: Vec3) -> CollisionGeometry {
        CollisionGeometry::Convex(ConvexGeometry::Cuboid { half_extents: half })
    }

    fn at(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn overlapping_spheres_report_depth_and_normal() {
        let manifold = NarrowPhase::collide(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(1.0), &at(1.5, 0.0, 0.0))
            .expect("overlapping spheres should collide");
        let point = manifold.points[0];
        assert!((point.depth - 0.5).abs() < 1e-5, "depth was {}", point.depth);
        assert!(point.normal.x > 0.99);
        assert!((point.point.x - 0.75).abs() < 1e-5);
    }

    #[test]
    fn separated_spheres_do_not_collide() {
        assert!(
            NarrowPhase::collide(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(1.0), &at(3.0, 0.0, 0.0)).is_none()
        );
    }

    #[test]
    fn touching_spheres_report_zero_depth() {
        let manifold = NarrowPhase::collide(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(0.5), &at(1.5, 0.0, 0.0))
            .expect("touching spheres count as contact");
        assert!(manifold.points[0].depth.abs() < 1e-6);
    }

    #[test]
    fn box_resting_on_plane_yields_four_points() {
        let plane = CollisionGeometry::HalfSpace {
            normal: Vec3::Y,
            offset: 0.0,
        };
        let manifold = NarrowPhase::collide(&plane, &Transform::default(), &cuboid(Vec3::splat(0.5)), &at(0.0, 0.45, 0.0))
            .expect("box sinks into plane");
        assert_eq!(manifold.len(), 4);
        for point in &manifold.points {
            assert_eq!(point.normal, Vec3::Y);
            assert!((point.depth - 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn convex_first_flips_plane_normal() {
        let plane = CollisionGeometry::HalfSpace {
            normal: Vec3::Y,
            offset: 0.0,
        };
        let manifold = NarrowPhase::collide(&sphere(1.0), &at(0.0, 0.9, 0.0), &plane, &Transform::default())
            .expect("sphere overlaps plane");
        assert_eq!(manifold.points[0].normal, -Vec3::Y);
        assert!((manifold.points[0].depth - 0.1).abs() < 1e-5);
    }

    #[test]
    fn stacked_boxes_clip_to_face_manifold() {
        let manifold = NarrowPhase::collide(
            &cuboid(Vec3::splat(0.5)),
            &at(0.0, 0.0, 0.0),
            &cuboid(Vec3::splat(0.5)),
            &at(0.1, 0.95, 0.0),
        )
        .expect("stacked boxes overlap");
        assert_eq!(manifold.len(), 4);
        for point in &manifold.points {
            assert!(point.normal.y > 0.99, "normal was {:?}", point.normal);
            assert!((point.depth - 0.05).abs() < 1e-3, "depth was {}", point.depth);
        }
    }

    #[test]
    fn rotated_boxes_overlap_along_x() {
        let rotated = Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_z(45f32.to_radians()));
        let manifold = NarrowPhase::collide(&cuboid(Vec3::ONE), &rotated, &cuboid(Vec3::ONE), &at(2.1, 0.0, 0.0))
            .expect("rotated boxes should collide");
        let deepest = manifold.deepest().expect("non-empty manifold");
        assert!(deepest.depth > 0.0);
        assert!(deepest.normal.x > 0.9);
    }

    #[test]
    fn sphere_against_box_face() {
        let manifold = NarrowPhase::collide(&sphere(0.5), &at(0.0, 1.4, 0.0), &cuboid(Vec3::ONE), &at(0.0, 0.0, 0.0))
            .expect("sphere touches box top");
        let point = manifold.points[0];
        assert!((point.depth - 0.1).abs() < 1e-5);
        assert!(point.normal.y < -0.99, "normal points from sphere to box");
    }

    #[test]
    fn gjk_handles_sphere_against_cylinder_side() {
        let cylinder = CollisionGeometry::Convex(ConvexGeometry::Cylinder {
            radius: 1.0,
            half_height: 1.0,
        });
        let manifold = NarrowPhase::collide(&cylinder, &at(0.0, 0.0, 0.0), &sphere(0.5), &at(1.3, 0.2, 0.0))
            .expect("sphere overlaps cylinder side");
        let point = manifold.points[0];
        assert!(point.depth > 0.05 && point.depth < 0.35, "depth was {}", point.depth);
        assert!(point.normal.x > 0.8, "normal was {:?}", point.normal);
    }

    #[test]
    fn gjk_rejects_separated_cone() {
        let cone = CollisionGeometry::Convex(ConvexGeometry::Cone {
            radius: 1.0,
            half_height: 1.0,
        });
        assert!(NarrowPhase::collide(&cone, &at(0.0, 0.0, 0.0), &sphere(0.5), &at(0.0, 1.8, 0.0)).is_none());
        assert!(NarrowPhase::collide(&cone, &at(0.0, 0.0, 0.0), &sphere(0.5), &at(0.0, 1.3, 0.0)).is_some());
    }
}
