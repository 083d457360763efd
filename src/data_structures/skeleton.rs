//! Skeletons, poses and pose blending.
//!
//! A [`Pose`] is the full set of local joint transforms at one instant. A
//! [`Skeleton`] owns the joint hierarchy, the pose currently applied to it and
//! the skinning matrices derived from that pose. Mutating the pose marks the
//! matrices stale and they can't be read again until [`Skeleton::update_matrices`]
//! ran.

use cgmath::{Matrix4, One, Quaternion, SquareMatrix, Vector3, VectorSpace, Zero};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("joint {joint} has parent {parent}; parents must precede their children")]
    ParentOrder { joint: usize, parent: usize },
    #[error("skeleton has {joints} joints but {given} {what} were provided")]
    LengthMismatch {
        joints: usize,
        given: usize,
        what: &'static str,
    },
    #[error("could not reserve storage for {0} joint matrices")]
    Allocation(usize),
}

/// Local transform of one joint relative to its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Joint {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zero(),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    fn interpolate(&self, other: &Joint, weight: f32) -> Joint {
        Joint {
            translation: self.translation.lerp(other.translation, weight),
            rotation: self.rotation.slerp(other.rotation, weight),
            scale: self.scale.lerp(other.scale, weight),
        }
    }
}

impl Default for Joint {
    fn default() -> Self {
        Self::identity()
    }
}

/// Clamp a blend weight into [0, 1]. NaN falls back to the base pose.
pub fn sanitize_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        log::warn!("blend weight is NaN, falling back to the base pose");
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub joints: Vec<Joint>,
}

impl Pose {
    pub fn new(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Interpolate between two poses of the same skeleton.
    ///
    /// A weight of 0 yields exactly `base`, 1 yields exactly `secondary`.
    pub fn blend(base: &Pose, secondary: &Pose, weight: f32) -> Pose {
        let mut out = base.clone();
        out.blend_towards(secondary, weight);
        out
    }

    /// In-place variant of [`Pose::blend`] with `self` as the base pose.
    pub fn blend_towards(&mut self, secondary: &Pose, weight: f32) {
        if self.len() != secondary.len() {
            log::warn!(
                "blending poses with {} and {} joints, extra joints keep the base pose",
                self.len(),
                secondary.len()
            );
        }
        let weight = sanitize_weight(weight);
        if weight == 0.0 {
            return;
        }
        for (joint, other) in self.joints.iter_mut().zip(&secondary.joints) {
            if weight == 1.0 {
                joint.clone_from(other);
            } else {
                *joint = joint.interpolate(other, weight);
            }
        }
    }
}

/// Joint hierarchy plus the pose applied to it and its skinning matrices.
#[derive(Clone, Debug)]
pub struct Skeleton {
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    inverse_bind: Vec<Matrix4<f32>>,
    rest: Pose,
    pose: Pose,
    globals: Vec<Matrix4<f32>>,
    matrices: Vec<Matrix4<f32>>,
    stale: bool,
}

impl Skeleton {
    /// Build a skeleton. Joints must be ordered so that every parent index is
    /// smaller than the index of its children.
    pub fn new(
        names: Vec<String>,
        parents: Vec<Option<usize>>,
        inverse_bind: Vec<Matrix4<f32>>,
        rest: Pose,
    ) -> Result<Self, SkeletonError> {
        let joints = parents.len();
        for (what, given) in [
            ("names", names.len()),
            ("inverse bind matrices", inverse_bind.len()),
            ("rest pose joints", rest.len()),
        ] {
            if given != joints {
                return Err(SkeletonError::LengthMismatch {
                    joints,
                    given,
                    what,
                });
            }
        }
        if let Some((joint, parent)) = parents
            .iter()
            .enumerate()
            .find_map(|(joint, parent)| parent.filter(|&p| p >= joint).map(|p| (joint, p)))
        {
            return Err(SkeletonError::ParentOrder { joint, parent });
        }

        let mut skeleton = Self {
            names,
            parents,
            inverse_bind,
            pose: rest.clone(),
            rest,
            globals: matrix_storage(joints)?,
            matrices: matrix_storage(joints)?,
            stale: true,
        };
        skeleton.update_matrices();
        Ok(skeleton)
    }

    pub fn joint_count(&self) -> usize {
        self.parents.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn rest_pose(&self) -> &Pose {
        &self.rest
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Mutable access to the current pose. Marks the matrices stale.
    pub fn pose_mut(&mut self) -> &mut Pose {
        self.stale = true;
        &mut self.pose
    }

    pub fn reset_to_rest(&mut self) {
        self.stale = true;
        self.pose.clone_from(&self.rest);
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recompute every joint's skinning matrix from the current pose.
    pub fn update_matrices(&mut self) {
        for joint in 0..self.joint_count() {
            let local = self
                .pose
                .joints
                .get(joint)
                .unwrap_or(&self.rest.joints[joint])
                .to_matrix();
            let global = match self.parents[joint] {
                Some(parent) => self.globals[parent] * local,
                None => local,
            };
            self.globals[joint] = global;
            self.matrices[joint] = global * self.inverse_bind[joint];
        }
        self.stale = false;
    }

    /// Skinning matrices, or `None` if the pose changed since the last update.
    pub fn matrices(&self) -> Option<&[Matrix4<f32>]> {
        if self.stale {
            None
        } else {
            Some(&self.matrices)
        }
    }

    /// Model space transform of each joint, same staleness rules as [`Skeleton::matrices`].
    pub fn joint_globals(&self) -> Option<&[Matrix4<f32>]> {
        if self.stale { None } else { Some(&self.globals) }
    }
}

fn matrix_storage(joints: usize) -> Result<Vec<Matrix4<f32>>, SkeletonError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(joints)
        .map_err(|_| SkeletonError::Allocation(joints))?;
    storage.resize(joints, Matrix4::identity());
    Ok(storage)
}
