//! Placement of a single object in the world.
//!
//! A [`Transform`] is position, yaw and scale. The GPU never sees it directly;
//! every frame it is flattened into a [`MaterialRaw`] that lives next to the
//! drawable and is rewritten in place.

use cgmath::{InnerSpace, Matrix3, Matrix4, Rad, SquareMatrix, Vector3, Zero};

/// Unit vector the object faces for a given yaw.
///
/// Motion and the trailing camera both go through this function, so the
/// camera always sits behind the direction the character walks.
pub fn forward(rotation: f32) -> Vector3<f32> {
    Vector3::new(rotation.cos(), 0.0, rotation.sin())
}

/// Position, yaw (radians around +Y) and per-axis scale.
///
/// The yaw is free running and never wrapped. Scale components are expected
/// to be positive; use [`Transform::with_scale`] when the scale comes from
/// outside the crate.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: f32,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity placement: origin, facing +X, unit scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: 0.0,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            scale.x > 0.0 && scale.y > 0.0 && scale.z > 0.0,
            "scale components must be positive, got {:?}",
            scale
        );
        self.scale = scale;
        Ok(self)
    }

    pub fn forward(&self) -> Vector3<f32> {
        forward(self.rotation)
    }

    /// Model matrix: translation * yaw * scale.
    ///
    /// The yaw is applied as a rotation of `-rotation` around +Y, which maps
    /// the mesh's local +X onto [`forward`].
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(Rad(-self.rotation))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> MaterialRaw {
        let mut raw = MaterialRaw::identity();
        self.write_raw(&mut raw);
        raw
    }

    /// Normal matrix: the inverse transpose of yaw * scale, which for a
    /// pure rotation is the yaw itself times the reciprocal scale.
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        let inverse = Vector3::new(self.scale.x.recip(), self.scale.y.recip(), self.scale.z.recip());
        let rotation = Matrix3::from_angle_y(Rad(-self.rotation));
        if inverse.x.is_finite() && inverse.y.is_finite() && inverse.z.is_finite() {
            rotation * Matrix3::from_diagonal(inverse)
        } else {
            rotation
        }
    }

    /// Rewrite an existing material record without allocating a new one.
    pub fn write_raw(&self, raw: &mut MaterialRaw) {
        let normal = self.normal_matrix();
        raw.model = self.to_matrix().into();
        let cols: [[f32; 3]; 3] = normal.into();
        for (dst, src) in raw.normal.iter_mut().zip(cols) {
            *dst = [src[0], src[1], src[2], 0.0];
        }
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update of a transform. `None` fields leave the target untouched.
#[derive(Clone, Debug, Default)]
pub struct TransformOverride {
    /// Added to the current position.
    pub translate: Option<Vector3<f32>>,
    /// Replaces the yaw.
    pub rotation: Option<f32>,
    /// Replaces the scale; ignored unless every component is positive.
    pub scale: Option<Vector3<f32>>,
}

impl TransformOverride {
    pub fn apply(&self, transform: &mut Transform) {
        if let Some(offset) = self.translate {
            transform.position += offset;
        }
        if let Some(rotation) = self.rotation {
            transform.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            if scale.x > 0.0 && scale.y > 0.0 && scale.z > 0.0 {
                transform.scale = scale;
            } else {
                log::warn!("ignoring non-positive scale override {:?}", scale);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translate.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

/**
 * The raw material is the per-object matrix data handed to the command executor.
 *
 * The normal matrix columns are padded to four floats so the record can be
 * copied into a uniform buffer as is.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl MaterialRaw {
    pub fn identity() -> Self {
        Self {
            model: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            normal: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model.into()
    }

    /// World space position encoded in the model matrix.
    pub fn translation(&self) -> Vector3<f32> {
        Vector3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }

    /// World space direction of the mesh's local +X axis.
    pub fn facing(&self) -> Vector3<f32> {
        Vector3::new(self.normal[0][0], self.normal[0][1], self.normal[0][2]).normalize()
    }
}
