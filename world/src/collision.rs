//! Axis-separated AABB collision resolution.
//!
//! Resolution always runs the y axis before the x axis within a sub-step, so
//! a corner approached diagonally settles as a top/bottom contact rather than
//! a side contact.

use tilerunner_core::{Side, Vec2};

/// Axis a resolution pass operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    /// Horizontal pass.
    X,
    /// Vertical pass.
    Y,
}

/// Axis-aligned box described by its center and half extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Aabb {
    pub(crate) center: Vec2,
    pub(crate) half_extents: Vec2,
}

impl Aabb {
    pub(crate) const fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Strict overlap test; touching boxes do not overlap.
    pub(crate) fn overlaps(&self, other: &Aabb) -> bool {
        let delta = self.center - other.center;
        let reach = self.half_extents + other.half_extents;
        delta.x.abs() < reach.x && delta.y.abs() < reach.y
    }
}

/// Pushes `mover` out of `obstacle` along the given axis by the penetration
/// depth, zeroing the mover's velocity component along that axis.
///
/// Returns the side of the mover that made contact, or `None` when the boxes
/// do not overlap. The obstacle is never displaced.
pub(crate) fn resolve_axis(
    mover_center: &mut Vec2,
    mover_half: Vec2,
    velocity: &mut Vec2,
    obstacle: &Aabb,
    axis: Axis,
) -> Option<Side> {
    let mover = Aabb::new(*mover_center, mover_half);
    if !mover.overlaps(obstacle) {
        return None;
    }

    let delta = *mover_center - obstacle.center;
    match axis {
        Axis::Y => {
            let penetration = (mover_half.y + obstacle.half_extents.y) - delta.y.abs();
            if delta.y >= 0.0 {
                mover_center.y += penetration;
                velocity.y = 0.0;
                Some(Side::Bottom)
            } else {
                mover_center.y -= penetration;
                velocity.y = 0.0;
                Some(Side::Top)
            }
        }
        Axis::X => {
            let penetration = (mover_half.x + obstacle.half_extents.x) - delta.x.abs();
            if delta.x >= 0.0 {
                mover_center.x += penetration;
                velocity.x = 0.0;
                Some(Side::Left)
            } else {
                mover_center.x -= penetration;
                velocity.x = 0.0;
                Some(Side::Right)
            }
        }
    }
}
