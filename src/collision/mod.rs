//! Collision against static level geometry.
//!
//! The level answers point queries through [`SurfaceQuery`]; the
//! [`CollisionResolver`] turns a desired position into an accepted one.
//! Anything the level can't vouch for (outside its bounds, non-finite
//! coordinates) is treated as blocked.
//!
//! - `height_field`: regular grid of ground heights with blocked cells
//! - `obstacles`:    flat ground with axis-aligned blocked rectangles

pub mod height_field;
pub mod obstacles;

use cgmath::Vector3;

pub use height_field::HeightField;
pub use obstacles::{ObstacleField, Rect};

/// What the level reports for a point on the XZ plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Surface {
    /// Walkable, with the ground height at that point.
    Open { ground: f32 },
    Blocked,
    OutOfBounds,
}

impl Surface {
    pub fn ground(self) -> Option<f32> {
        match self {
            Surface::Open { ground } => Some(ground),
            Surface::Blocked | Surface::OutOfBounds => None,
        }
    }
}

/// Point queries against static level geometry.
pub trait SurfaceQuery {
    fn surface_at(&self, x: f32, z: f32) -> Surface;

    fn is_open(&self, x: f32, z: f32) -> bool {
        self.surface_at(x, z).ground().is_some()
    }
}

impl<T: SurfaceQuery + ?Sized> SurfaceQuery for &T {
    fn surface_at(&self, x: f32, z: f32) -> Surface {
        (**self).surface_at(x, z)
    }
}

/// How a blocked destination is corrected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Drop the whole move.
    RejectDelta,
    /// Keep whichever single axis of the move is still open, X first.
    #[default]
    ClampAxis,
}

/// Outcome of a resolution step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    pub position: Vector3<f32>,
    /// True if the desired position was not accepted as is.
    pub blocked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CollisionResolver {
    pub policy: CollisionPolicy,
    /// Set the accepted position's height to the ground below it.
    pub ground_snap: bool,
    /// Largest upward ground step that is still walkable.
    pub max_step: Option<f32>,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self {
            policy: CollisionPolicy::ClampAxis,
            ground_snap: true,
            max_step: None,
        }
    }
}

impl CollisionResolver {
    /// Ground height at `(x, z)` if a character standing at `from_y` may go there.
    fn walkable<G>(&self, geometry: &G, from_y: f32, x: f32, z: f32) -> Option<f32>
    where
        G: SurfaceQuery + ?Sized,
    {
        let ground = geometry.surface_at(x, z).ground()?;
        match self.max_step {
            Some(step) if ground - from_y > step => None,
            _ => Some(ground),
        }
    }

    /// Correct a move from `from` to `desired`.
    ///
    /// `from` must be an open position; the returned position is either
    /// `from` itself or a point the geometry reported open.
    pub fn resolve<G>(&self, from: Vector3<f32>, desired: Vector3<f32>, geometry: &G) -> Resolution
    where
        G: SurfaceQuery + ?Sized,
    {
        let all = [
            desired,
            Vector3::new(desired.x, desired.y, from.z),
            Vector3::new(from.x, desired.y, desired.z),
        ];
        let candidates = match self.policy {
            CollisionPolicy::RejectDelta => &all[..1],
            CollisionPolicy::ClampAxis => &all[..],
        };
        for (i, &candidate) in candidates.iter().enumerate() {
            if let Some(ground) = self.walkable(geometry, from.y, candidate.x, candidate.z) {
                let mut position = candidate;
                if self.ground_snap {
                    position.y = ground;
                }
                return Resolution {
                    position,
                    blocked: i > 0,
                };
            }
        }
        Resolution {
            position: from,
            blocked: from != desired,
        }
    }
}
