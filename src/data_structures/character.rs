use cgmath::{Matrix4, Vector3, Zero};

use crate::{
    animation::AnimationPlayer,
    camera::CameraRig,
    data_structures::{
        drawable::Drawable,
        skeleton::{Pose, Skeleton},
    },
};

/// The player-controlled pawn.
///
/// Owns its drawable, the rig of the camera following it, its skeleton and
/// a scratch pose the secondary animation samples into before blending.
#[derive(Debug)]
pub struct Character<B> {
    pub mesh: Drawable<B>,
    pub rig: CameraRig,
    pub skeleton: Skeleton,
    pub blend_pose: Pose,
    /// Drives the skeleton's own pose.
    pub base: Option<AnimationPlayer>,
    /// Sampled into `blend_pose` and mixed in by `blend_weight`.
    pub secondary: Option<AnimationPlayer>,
    pub blend_weight: f32,
    /// Last frame's motion, not carried between frames.
    pub velocity: Vector3<f32>,
}

impl<B> Character<B> {
    pub fn new(mesh: Drawable<B>, skeleton: Skeleton, rig: CameraRig) -> Self {
        let blend_pose = skeleton.rest_pose().clone();
        Self {
            mesh,
            rig,
            skeleton,
            blend_pose,
            base: None,
            secondary: None,
            blend_weight: 0.0,
            velocity: Vector3::zero(),
        }
    }

    /// Advance both animation clocks, rebuild the pose and recompute the
    /// joint matrices. The clocks run whether or not blending is enabled.
    pub fn animate(&mut self, dt: f32, blending: bool) {
        // joints no clip animates must not carry last frame's blend
        self.skeleton.reset_to_rest();
        self.blend_pose.clone_from(self.skeleton.rest_pose());
        if let Some(base) = &mut self.base {
            base.advance(dt);
            base.sample_into(self.skeleton.pose_mut());
        }
        if let Some(secondary) = &mut self.secondary {
            secondary.advance(dt);
            if blending {
                secondary.sample_into(&mut self.blend_pose);
                self.skeleton
                    .pose_mut()
                    .blend_towards(&self.blend_pose, self.blend_weight);
            }
        }
        self.skeleton.update_matrices();
    }

    pub fn joint_matrices(&self) -> Option<&[Matrix4<f32>]> {
        self.skeleton.matrices()
    }
}
