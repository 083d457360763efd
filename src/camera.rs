//! Trailing third-person camera.
//!
//! The camera sits `distance` behind the subject along its facing and
//! `height` above it, looking at a point a fixed offset above the subject's
//! origin. [`Projection`] follows the viewport size and [`ViewSetup`] is what
//! gets handed to the command executor each frame.
//!
//! # Key types
//!
//! - [`CameraRig`] tuning values carried by a character
//! - [`Camera`] a solved eye/target/up triple
//! - [`Projection`] perspective parameters
//! - [`CameraUniform`] GPU layout of the view-projection matrix

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::data_structures::transform::{Transform, forward};

/// Height of the look-at point above the subject's origin.
pub const TARGET_VERTICAL_OFFSET: f32 = 10.0;
pub const FOVY: Deg<f32> = Deg(75.0);
pub const ZNEAR: f32 = 2.0;
pub const ZFAR: f32 = 200.0;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Tuning of the trailing camera.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraRig {
    /// Distance behind the subject.
    pub distance: f32,
    /// Height above the subject.
    pub height: f32,
    /// Extra yaw around the subject, radians.
    pub yaw: f32,
    /// Extra elevation of the boom, radians.
    pub pitch: f32,
    /// Time constant of the follow damping in seconds, 0 snaps.
    pub smoothness: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            distance: 30.0,
            height: 15.0,
            yaw: 0.0,
            pitch: 0.0,
            smoothness: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

/// Place the camera behind `subject` according to `rig`.
pub fn solve(subject: &Transform, rig: &CameraRig) -> Camera {
    let heading = subject.rotation + rig.yaw;
    let boom = rig.distance * rig.pitch.cos();
    let lift = rig.height + rig.distance * rig.pitch.sin();
    let eye = subject.position - forward(heading) * boom + Vector3::new(0.0, lift, 0.0);
    let target = subject.position + Vector3::new(0.0, TARGET_VERTICAL_OFFSET, 0.0);
    Camera {
        eye: Point3::from_vec(eye),
        target: Point3::from_vec(target),
        up: Vector3::unit_y(),
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Unit vector from eye to target.
    pub fn direction(&self) -> Vector3<f32> {
        (self.target - self.eye).normalize()
    }

    /// Move towards `solved`, closing `1 - e^(-dt / smoothness)` of the gap.
    pub fn smooth_towards(&self, solved: Camera, smoothness: f32, dt: f32) -> Camera {
        if !(smoothness > 0.0) || !dt.is_finite() || dt < 0.0 {
            return solved;
        }
        let alpha = 1.0 - (-dt / smoothness).exp();
        Camera {
            eye: self.eye + (solved.eye - self.eye) * alpha,
            target: self.target + (solved.target - self.target) * alpha,
            up: solved.up,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Projection and view for one frame, as pushed to the executor.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSetup {
    pub camera: Camera,
    pub projection: Projection,
}

impl ViewSetup {
    pub fn new(camera: Camera, projection: &Projection) -> Self {
        Self {
            camera,
            projection: projection.clone(),
        }
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, view: &ViewSetup) {
        self.view_position = view.camera.eye.to_homogeneous().into();
        self.view_proj = view.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn subject(x: f32, y: f32, z: f32, rotation: f32) -> Transform {
        Transform {
            position: Vector3::new(x, y, z),
            rotation,
            ..Default::default()
        }
    }

    #[test]
    fn sits_behind_and_above() {
        let cam = solve(&subject(-50.0, 0.0, 50.0, 0.0), &CameraRig::default());
        assert_eq!(cam.eye, Point3::new(-80.0, 15.0, 50.0));
        assert_eq!(cam.target, Point3::new(-50.0, 10.0, 50.0));
        assert_eq!(cam.up, Vector3::unit_y());
    }

    #[test]
    fn target_offset_holds_everywhere() {
        for rotation in [0.0_f32, 1.0, -2.5, 40.0] {
            for distance in [0.0_f32, 5.0, 30.0, 1000.0] {
                let rig = CameraRig {
                    distance,
                    ..Default::default()
                };
                let cam = solve(&subject(3.0, 7.25, -1.0, rotation), &rig);
                assert_eq!(cam.target.y, 7.25 + TARGET_VERTICAL_OFFSET);
            }
        }
    }

    #[test]
    fn looks_along_the_subject_facing() {
        for rotation in [0.3_f32, 2.0, -1.2] {
            let body = subject(1.0, 0.0, 2.0, rotation);
            let cam = solve(&body, &CameraRig::default());
            let mut flat = cam.direction();
            flat.y = 0.0;
            assert_relative_eq!(flat.normalize(), body.forward(), epsilon = 1e-5);
        }
    }

    #[test]
    fn pitch_raises_the_boom() {
        let rig = CameraRig {
            pitch: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        let cam = solve(&subject(0.0, 0.0, 0.0, 0.0), &rig);
        assert_relative_eq!(cam.eye, Point3::new(0.0, 45.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn zero_smoothness_snaps() {
        let a = solve(&subject(0.0, 0.0, 0.0, 0.0), &CameraRig::default());
        let b = solve(&subject(10.0, 0.0, 0.0, 0.0), &CameraRig::default());
        assert_eq!(a.smooth_towards(b, 0.0, 1.0 / 60.0), b);
    }

    #[test]
    fn damping_approaches_without_overshoot() {
        let a = solve(&subject(0.0, 0.0, 0.0, 0.0), &CameraRig::default());
        let b = solve(&subject(10.0, 0.0, 0.0, 0.0), &CameraRig::default());
        let mut cam = a;
        let mut last = cam.eye.x;
        for _ in 0..120 {
            cam = cam.smooth_towards(b, 0.25, 1.0 / 60.0);
            assert!(cam.eye.x >= last && cam.eye.x <= b.eye.x);
            last = cam.eye.x;
        }
        assert_relative_eq!(cam.eye, b.eye, epsilon = 1e-2);
    }

    #[test]
    fn projection_follows_resize() {
        let mut projection = Projection::new(320, 240, FOVY, ZNEAR, ZFAR);
        assert_relative_eq!(projection.aspect(), 4.0 / 3.0);
        projection.resize(640, 0);
        assert_eq!(projection.aspect(), 640.0);
    }
}
