use super::{Surface, SurfaceQuery};

/// Axis-aligned rectangle on the XZ plane, edges included.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

impl Rect {
    /// Rectangle spanning two corners in any order.
    pub fn new(x0: f32, z0: f32, x1: f32, z1: f32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_z: z0.min(z1),
            max_x: x0.max(x1),
            max_z: z0.max(z1),
        }
    }

    pub fn centered(x: f32, z: f32, half_x: f32, half_z: f32) -> Self {
        Self::new(x - half_x, z - half_z, x + half_x, z + half_z)
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Flat ground inside `bounds` with rectangular obstacles standing on it.
#[derive(Clone, Debug)]
pub struct ObstacleField {
    pub bounds: Rect,
    pub ground: f32,
    pub obstacles: Vec<Rect>,
}

impl ObstacleField {
    pub fn new(bounds: Rect, ground: f32) -> Self {
        Self {
            bounds,
            ground,
            obstacles: Vec::new(),
        }
    }

    pub fn with_obstacle(mut self, obstacle: Rect) -> Self {
        self.obstacles.push(obstacle);
        self
    }
}

impl SurfaceQuery for ObstacleField {
    fn surface_at(&self, x: f32, z: f32) -> Surface {
        if !self.bounds.contains(x, z) {
            Surface::OutOfBounds
        } else if self.obstacles.iter().any(|o| o.contains(x, z)) {
            Surface::Blocked
        } else {
            Surface::Open {
                ground: self.ground,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obstacle_edges_block() {
        let field = ObstacleField::new(Rect::new(-100.0, -100.0, 100.0, 100.0), 0.0)
            .with_obstacle(Rect::centered(10.0, 0.0, 2.0, 2.0));
        assert_eq!(field.surface_at(8.0, 0.0), Surface::Blocked);
        assert_eq!(field.surface_at(10.0, 1.0), Surface::Blocked);
        assert_eq!(field.surface_at(7.99, 0.0), Surface::Open { ground: 0.0 });
        assert_eq!(field.surface_at(100.5, 0.0), Surface::OutOfBounds);
        assert_eq!(field.surface_at(f32::NAN, 0.0), Surface::OutOfBounds);
    }
}
