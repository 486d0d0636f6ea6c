use glam::Vec3;

const EPSILON: f32 = 1e-4;

/// Clipping plane; points with `normal · p > distance` are outside.
#[derive(Debug, Clone, Copy)]
pub struct ClipPlane {
    normal: Vec3,
    distance: f32,
}

impl ClipPlane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: n.dot(point),
        }
    }

    fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Clips the provided polygon against a set of planes using the Sutherland-Hodgman algorithm.
pub fn clip_polygon(vertices: &[Vec3], planes: &[ClipPlane]) -> Vec<Vec3> {
    let mut output = vertices.to_vec();
    for plane in planes {
        output = clip_against_plane(&output, *plane);
        if output.is_empty() {
            break;
        }
    }
    output
}

fn clip_against_plane(vertices: &[Vec3], plane: ClipPlane) -> Vec<Vec3> {
    let mut clipped = Vec::with_capacity(vertices.len() + 1);
    for (i, &current) in vertices.iter().enumerate() {
        let next = vertices[(i + 1) % vertices.len()];

        let current_dist = plane.signed_distance(current);
        let next_dist = plane.signed_distance(next);

        let current_inside = current_dist <= EPSILON;
        let next_inside = next_dist <= EPSILON;

        match (current_inside, next_inside) {
            (true, true) => clipped.push(next),
            (true, false) => {
                if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(hit);
                }
            }
            (false, true) => {
                if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(hit);
                }
                clipped.push(next);
            }
            (false, false) => {}
        }
    }
    clipped
}

fn line_plane_intersection(start: Vec3, end: Vec3, start_dist: f32, end_dist: f32) -> Option<Vec3> {
    let denom = start_dist - end_dist;
    if denom.abs() <= EPSILON {
        return None;
    }
    let t = start_dist / denom;
    Some(start + (end - start) * t)
}

/// Side planes of a rectangular face, used to clip an incident face onto it.
pub fn rectangle_planes(
    center: Vec3,
    tangent_u: Vec3,
    tangent_v: Vec3,
    half_u: f32,
    half_v: f32,
) -> [ClipPlane; 4] {
    [
        ClipPlane::from_point_normal(center + tangent_u * half_u, tangent_u),
        ClipPlane::from_point_normal(center - tangent_u * half_u, -tangent_u),
        ClipPlane::from_point_normal(center + tangent_v * half_v, tangent_v),
        ClipPlane::from_point_normal(center - tangent_v * half_v, -tangent_v),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_square_against_smaller_square() {
        let big = [
            Vec3::new(-2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(-2.0, 0.0, 2.0),
        ];
        let planes = rectangle_planes(Vec3::ZERO, Vec3::X, Vec3::Z, 1.0, 1.0);
        let clipped = clip_polygon(&big, &planes);
        assert_eq!(clipped.len(), 4);
        for p in clipped {
            assert!(p.x.abs() <= 1.0 + 1e-3 && p.z.abs() <= 1.0 + 1e-3);
        }
    }
}
