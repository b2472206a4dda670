//! One-tick movement with soft local repulsion

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// Upper bound on the summed push, relative to the goal velocity. Below 1 the
/// goal always keeps a forward component.
const MAX_PUSH: f64 = 0.9;

/// Steering parameters shared by every agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Steering {
    /// Neighbors closer than this push back
    pub radius: f64,
    /// Weight of the repulsion relative to the goal velocity
    pub strength: f64,
}

impl Default for Steering {
    fn default() -> Self {
        Self {
            radius: 18.0,
            strength: 0.6,
        }
    }
}

impl Steering {
    /// Move `pos` one step toward `target`, returning whether it arrived.
    ///
    /// Within one step of the target the position snaps onto it exactly.
    pub fn advance(&self, pos: &mut Point, target: Point, speed: f64, neighbors: &[Point]) -> bool {
        let to_target = target - *pos;
        let dist = to_target.length();
        if dist <= speed {
            *pos = target;
            return true;
        }

        let goal = to_target * (speed / dist);
        let push = self.repulsion(*pos, neighbors);
        let blended = goal + push * speed;
        let len = blended.length();

        // Head-on cancellation: keep walking rather than freezing.
        let velocity = if len > f64::EPSILON {
            blended * (speed / len)
        } else {
            goal
        };
        *pos = *pos + velocity;
        false
    }

    /// Sum of unit push-away vectors from close neighbors, each scaled by how
    /// deep the overlap is, capped at [`MAX_PUSH`].
    pub fn repulsion(&self, pos: Point, neighbors: &[Point]) -> Point {
        let push = neighbors.iter().fold(Point::default(), |acc, other| {
            let away = pos - *other;
            let d = away.length();
            if d <= f64::EPSILON || d >= self.radius {
                return acc;
            }
            let depth = (self.radius - d) / self.radius;
            acc + away * (depth * self.strength / d)
        });
        let len = push.length();
        if len > MAX_PUSH {
            push * (MAX_PUSH / len)
        } else {
            push
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snaps_within_one_step() {
        let steering = Steering::default();
        let mut pos = Point::new(0.0, 0.0);
        assert!(steering.advance(&mut pos, Point::new(1.0, 0.5), 1.4, &[]));
        assert_eq!(pos, Point::new(1.0, 0.5));
    }

    #[test]
    fn test_step_is_capped_at_speed() {
        let steering = Steering::default();
        let mut pos = Point::new(0.0, 0.0);
        assert!(!steering.advance(&mut pos, Point::new(100.0, 0.0), 1.5, &[]));
        assert!((pos.length() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_neighbor_deflects_but_speed_holds() {
        let steering = Steering::default();
        let mut pos = Point::new(0.0, 0.0);
        let neighbor = Point::new(2.0, 5.0);
        steering.advance(&mut pos, Point::new(100.0, 0.0), 1.5, &[neighbor]);
        assert!(pos.y < 0.0, "pushed away from the neighbor below");
        assert!((pos.length() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_distant_neighbors_ignored() {
        let steering = Steering::default();
        let push = steering.repulsion(Point::new(0.0, 0.0), &[Point::new(50.0, 0.0)]);
        assert_eq!(push, Point::default());
    }

    #[test]
    fn test_crowded_target_still_reached() {
        let steering = Steering::default();
        let target = Point::new(100.0, 0.0);
        let parked = [target, Point::new(100.0, 0.5)];
        let mut pos = Point::new(0.0, 0.0);
        let arrived = (0..1_000).any(|_| steering.advance(&mut pos, target, 1.5, &parked));
        assert!(arrived);
        assert_eq!(pos, target);
    }

    #[test]
    fn test_push_is_capped() {
        let steering = Steering::default();
        let crowd = [Point::new(1.0, 0.0), Point::new(1.0, 0.1), Point::new(1.0, -0.1)];
        let push = steering.repulsion(Point::new(0.0, 0.0), &crowd);
        assert!(push.length() <= MAX_PUSH + 1e-9);
        assert!(push.x < 0.0);
    }
}
