use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Vector3};
use std::f32::consts::PI;

fn wrap_angle(a: f32) -> f32 {
    let mut a = a % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// World units moved per rendered frame while a movement key is held.
const CAMERA_SPEED: f32 = 10.0;
const VFOV_DEGREES: f32 = 35.0;
/// Distance from the default eye to the default look-at point; doubles as
/// the initial dolly range.
const DEFAULT_FOCUS: f32 = 900.0;
/// A single dolly event may consume at most this fraction of the remaining
/// focus distance, so the eye never reaches (or crosses) the focus point.
const DOLLY_SCALE_MAX: f32 = 0.9;

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vector3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vector3<f32>,
    pub vfov_degrees: f32,
    pub speed: f32,
    pub focus_distance: f32,
}

impl Camera {
    pub fn new() -> Self {
        Camera {
            position: Vector3::new(278.0, 273.0, -900.0),
            yaw: 1.55,
            pitch: 0.0,
            up: Vector3::new(0.0, 1.0, 0.0),
            vfov_degrees: VFOV_DEGREES,
            speed: CAMERA_SPEED,
            focus_distance: DEFAULT_FOCUS,
        }
    }

    pub fn front(&self) -> Vector3<f32> {
        Vector3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize()
    }

    pub fn look_at(&self) -> Vector3<f32> {
        self.position + self.front() * self.focus_distance
    }

    /// Film-plane basis: W spans eye to look-at (its length is the focal
    /// distance), U and V are scaled so a ray through the film corner
    /// matches the vertical field of view at the given aspect ratio.
    pub fn view_basis(&self, aspect: f32) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let w = self.look_at() - self.position;
        let wlen = w.magnitude();
        let u = w.cross(self.up).normalize();
        let v = u.cross(w).normalize();
        let vlen = wlen * (0.5 * self.vfov_degrees.to_radians()).tan();
        let ulen = vlen * aspect;
        (u * ulen, v * vlen, w)
    }

    /// Fixed per-frame displacement for each held movement axis. The strafe
    /// axis uses the unnormalized front x up cross product, so strafing
    /// slows as the view pitches toward vertical.
    pub fn apply_movement(&mut self, forward: f32, strafe: f32, vertical: f32) {
        let front = self.front();
        let right = front.cross(self.up);
        self.position += front * (forward * self.speed)
            + right * (strafe * self.speed)
            + self.up * (vertical * self.speed);
    }

    /// Look deltas are fractions of the window size: a full-width drag turns
    /// one radian of yaw.
    pub fn apply_mouse_look(&mut self, dx: f32, dy: f32) {
        self.yaw = wrap_angle(self.yaw + dx);
        let max_pitch = 88.0_f32.to_radians();
        self.pitch = (self.pitch - dy).clamp(-max_pitch, max_pitch);
    }

    /// Dolly along the view direction. Positive deltas move toward the focus
    /// point, consuming part of the remaining focus distance; negative
    /// deltas back away and extend it.
    pub fn apply_dolly(&mut self, delta: f32) {
        let scale = delta.min(DOLLY_SCALE_MAX);
        let step = self.focus_distance * scale;
        self.position += self.front() * step;
        self.focus_distance -= step;
    }

    pub fn reset(&mut self) {
        *self = Camera::new();
    }

    pub fn uniform(&self, width: u32, height: u32, frame_number: u32) -> CameraUniform {
        let aspect = width as f32 / height as f32;
        let (u, v, w) = self.view_basis(aspect);
        CameraUniform {
            eye: self.position.into(),
            frame_number,
            u: u.into(),
            width,
            v: v.into(),
            height,
            w: w.into(),
            sqrt_num_samples: SQRT_NUM_SAMPLES,
        }
    }
}

/// Stratification factor for the reference entry point: it shoots
/// sqrt_num_samples^2 jittered rays per pixel per launch.
pub const SQRT_NUM_SAMPLES: u32 = 1;

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    eye: [f32; 3],
    frame_number: u32,
    u: [f32; 3],
    width: u32,
    v: [f32; 3],
    height: u32,
    w: [f32; 3],
    sqrt_num_samples: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn magnitude(v: Vector3<f32>) -> f32 {
        v.magnitude()
    }

    #[test]
    fn default_camera_faces_into_the_box() {
        let cam = Camera::new();
        let front = cam.front();
        assert!(
            front.z > 0.99,
            "default view should look down +z, got {front:?}"
        );
        assert!(front.y.abs() < 1e-6, "default pitch is level");
        assert!((magnitude(front) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn view_basis_is_orthogonal() {
        let mut cam = Camera::new();
        cam.yaw = 0.8;
        cam.pitch = -0.3;
        let (u, v, w) = cam.view_basis(1.5);
        assert!(u.dot(v).abs() < 1e-2, "u.v = {}", u.dot(v));
        assert!(u.dot(w).abs() < 1e-2, "u.w = {}", u.dot(w));
        assert!(v.dot(w).abs() < 1e-2, "v.w = {}", v.dot(w));
    }

    #[test]
    fn view_basis_matches_fov_and_aspect() {
        let cam = Camera::new();
        let aspect = 2.0;
        let (u, v, w) = cam.view_basis(aspect);
        let expected_v = magnitude(w) * (0.5 * cam.vfov_degrees.to_radians()).tan();
        assert!(
            (magnitude(v) - expected_v).abs() < 1e-2,
            "|v| should be |w|*tan(fov/2): got {} want {expected_v}",
            magnitude(v)
        );
        assert!(
            (magnitude(u) - expected_v * aspect).abs() < 1e-2,
            "|u| should scale by aspect: got {} want {}",
            magnitude(u),
            expected_v * aspect
        );
    }

    #[test]
    fn forward_movement_advances_along_front_at_fixed_speed() {
        let mut cam = Camera::new();
        let start = cam.position;
        let front = cam.front();
        cam.apply_movement(1.0, 0.0, 0.0);
        let moved = cam.position - start;
        assert!((magnitude(moved) - cam.speed).abs() < 1e-4);
        assert!(
            moved.normalize().dot(front) > 0.9999,
            "displacement should align with front"
        );
    }

    #[test]
    fn strafe_is_perpendicular_to_front_and_level() {
        let mut cam = Camera::new();
        let start = cam.position;
        let front = cam.front();
        cam.apply_movement(0.0, 1.0, 0.0);
        let moved = cam.position - start;
        assert!(moved.dot(front).abs() < 1e-3);
        assert!(moved.y.abs() < 1e-6, "level strafe should not change height");
    }

    #[test]
    fn vertical_movement_follows_world_up() {
        let mut cam = Camera::new();
        cam.pitch = 0.5;
        let start = cam.position;
        cam.apply_movement(0.0, 0.0, -1.0);
        let moved = cam.position - start;
        assert!((moved.y + cam.speed).abs() < 1e-4);
        assert!(moved.x.abs() < 1e-6 && moved.z.abs() < 1e-6);
    }

    #[test]
    fn mouse_look_wraps_yaw() {
        let mut cam = Camera::new();
        cam.yaw = PI - 0.05;
        cam.apply_mouse_look(0.2, 0.0);
        assert!(
            cam.yaw < 0.0,
            "yaw past +PI should wrap negative, got {}",
            cam.yaw
        );
    }

    #[test]
    fn mouse_look_clamps_pitch_short_of_vertical() {
        let mut cam = Camera::new();
        cam.apply_mouse_look(0.0, -100.0);
        let limit = 88.0_f32.to_radians();
        assert!((cam.pitch - limit).abs() < 1e-6);
        // The basis must stay finite at the clamp.
        let (u, v, w) = cam.view_basis(1.0);
        for value in [u.x, u.y, u.z, v.x, v.y, v.z, w.x, w.y, w.z] {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn dolly_moves_toward_focus_and_shrinks_it() {
        let mut cam = Camera::new();
        let target = cam.look_at();
        let before = magnitude(target - cam.position);
        cam.apply_dolly(0.5);
        let after = magnitude(target - cam.position);
        assert!(
            after < before,
            "positive dolly should close in on the focus point"
        );
        assert!((cam.focus_distance - DEFAULT_FOCUS * 0.5).abs() < 1e-3);
    }

    #[test]
    fn dolly_never_reaches_the_focus_point() {
        let mut cam = Camera::new();
        for _ in 0..8 {
            cam.apply_dolly(10.0);
        }
        assert!(
            cam.focus_distance > 0.0,
            "clamped dolly keeps focus ahead of the eye, got {}",
            cam.focus_distance
        );
    }

    #[test]
    fn backward_dolly_extends_focus() {
        let mut cam = Camera::new();
        cam.apply_dolly(-0.25);
        assert!((cam.focus_distance - DEFAULT_FOCUS * 1.25).abs() < 1e-3);
    }

    #[test]
    fn reset_restores_the_initial_pose() {
        let mut cam = Camera::new();
        cam.apply_movement(1.0, -1.0, 1.0);
        cam.apply_mouse_look(0.7, 0.2);
        cam.apply_dolly(0.3);
        cam.reset();
        let fresh = Camera::new();
        assert_eq!(cam.position, fresh.position);
        assert_eq!(cam.yaw, fresh.yaw);
        assert_eq!(cam.pitch, fresh.pitch);
        assert_eq!(cam.focus_distance, fresh.focus_distance);
    }

    #[test]
    fn uniform_layout_is_sixteen_lanes() {
        assert_eq!(core::mem::size_of::<CameraUniform>(), 64);
        let cam = Camera::new();
        let uniform = cam.uniform(800, 600, 42);
        let lanes: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniform));
        assert_eq!(lanes[3], 42, "frame number rides lane 3");
        assert_eq!(lanes[7], 800, "width rides lane 7");
        assert_eq!(lanes[11], 600, "height rides lane 11");
        assert_eq!(lanes[15], SQRT_NUM_SAMPLES);
        assert_eq!(f32::from_bits(lanes[0]), 278.0);
        assert_eq!(f32::from_bits(lanes[1]), 273.0);
        assert_eq!(f32::from_bits(lanes[2]), -900.0);
    }

    #[test]
    fn wrapped_angles_are_periodic_over_whole_turns() {
        for turns in [-3.0f32, -1.0, 0.0, 2.0, 4.0] {
            let a = wrap_angle(turns * 2.0 * PI + 0.3);
            assert!(a > -PI - 1e-5 && a <= PI + 1e-5, "got {a}");
            assert!((a - 0.3).abs() < 1e-4, "turns={turns} wrapped to {a}");
        }
    }
}
