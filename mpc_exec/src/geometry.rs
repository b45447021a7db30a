//! # Geometry module
//!
//! Changes reference waypoints from the simulator's world frame into the vehicle's local frame.
//! The local frame has its origin at the vehicle's position and its X axis along the vehicle's
//! heading, so after the transform the vehicle always sits at `(0, 0)` with zero heading.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Rotation2};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position and heading of the vehicle in the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    /// Position in the world frame
    pub position_m: Point2<f64>,

    /// Heading, the angle to the world's +ve X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("No reference waypoints to transform")]
    NoWaypoints,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Transform world frame points into the local frame of a vehicle at `pose`.
///
/// Each point is translated by the vehicle position then rotated by the negative heading.
pub fn world_to_local(
    points_m_world: &[Point2<f64>],
    pose: &Pose2
) -> Result<Vec<Point2<f64>>, GeometryError> {
    if points_m_world.is_empty() {
        return Err(GeometryError::NoWaypoints)
    }

    let rot = Rotation2::new(-pose.heading_rad);

    Ok(points_m_world
        .iter()
        .map(|p| Point2::from(rot * (p - pose.position_m)))
        .collect())
}

/// Transform local frame points of a vehicle at `pose` back into the world frame.
pub fn local_to_world(points_m_local: &[Point2<f64>], pose: &Pose2) -> Vec<Point2<f64>> {
    let rot = Rotation2::new(pose.heading_rad);

    points_m_local
        .iter()
        .map(|p| pose.position_m + rot * p.coords)
        .collect()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOL: f64 = 1e-9;

    fn assert_points_eq(a: &[Point2<f64>], b: &[Point2<f64>]) {
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert!((pa - pb).norm() < TOL, "{:?} != {:?}", pa, pb);
        }
    }

    #[test]
    fn test_world_to_local() {
        // Vehicle at (1, 1) facing along +Y
        let pose = Pose2 {
            position_m: Point2::new(1.0, 1.0),
            heading_rad: FRAC_PI_2,
        };

        let local = world_to_local(
            &[Point2::new(1.0, 3.0), Point2::new(0.0, 1.0), Point2::new(1.0, 1.0)],
            &pose
        ).unwrap();

        // Ahead of the vehicle, to its left, and on top of it
        assert_points_eq(
            &local,
            &[Point2::new(2.0, 0.0), Point2::new(0.0, 1.0), Point2::new(0.0, 0.0)]
        );
    }

    #[test]
    fn test_matches_explicit_formula() {
        let pose = Pose2 {
            position_m: Point2::new(-32.16173, 113.361),
            heading_rad: 3.733651,
        };
        let world = vec![
            Point2::new(-43.49173, 105.3008),
            Point2::new(-61.09, 92.88499),
            Point2::new(-78.29172, 78.65997),
        ];

        let local = world_to_local(&world, &pose).unwrap();

        let (sin_t, cos_t) = (-pose.heading_rad).sin_cos();
        for (w, l) in world.iter().zip(local.iter()) {
            let dx = w.x - pose.position_m.x;
            let dy = w.y - pose.position_m.y;
            assert!((l.x - (dx * cos_t - dy * sin_t)).abs() < TOL);
            assert!((l.y - (dx * sin_t + dy * cos_t)).abs() < TOL);
        }
    }

    #[test]
    fn test_round_trip() {
        let world: Vec<Point2<f64>> = (0..8)
            .map(|i| Point2::new(i as f64 * 3.7 - 5.0, (i as f64 * 0.9).sin() * 12.0))
            .collect();

        for heading in [-PI, -2.0, -0.3, 0.0, 0.7, FRAC_PI_2, 3.0].iter() {
            let pose = Pose2 {
                position_m: Point2::new(17.5, -42.25),
                heading_rad: *heading,
            };

            let local = world_to_local(&world, &pose).unwrap();
            assert_points_eq(&local_to_world(&local, &pose), &world);
        }
    }

    #[test]
    fn test_no_waypoints() {
        let pose = Pose2 {
            position_m: Point2::origin(),
            heading_rad: 0.0,
        };

        assert!(matches!(world_to_local(&[], &pose), Err(GeometryError::NoWaypoints)));
    }
}
