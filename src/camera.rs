use log::{debug, warn};
use nalgebra::{Isometry3, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3, Vector4};
use rayon::prelude::*;

/// One tick worth of user input, already decoded from whatever windowing layer
/// drives the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Cursor movement in pixels since the previous tick.
    pub mouse_delta: Vector2<f32>,
    /// Mouse look is only active while this is set (e.g. right button held).
    pub looking: bool,
}

pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    rays: Vec<Unit<Vector3<f32>>>,
    viewport: (u32, u32),
}

impl Camera {
    const MOUSE_SENSITIVITY: f32 = 0.002;
    // forward가 위쪽 축과 거의 평행해지면 right 축을 구할 수 없음
    const MAX_PITCH_DOT: f32 = 0.999;

    /// `vertical_fov` is in degrees.
    pub fn new(vertical_fov: f32, near: f32, far: f32) -> Self {
        let position = Point3::new(0.0, 0.0, 6.0);
        let forward = Unit::new_unchecked(Vector3::new(0.0, 0.0, -1.0));

        let mut camera = Self {
            projection: Perspective3::new(1.0, vertical_fov.to_radians(), near, far),
            view: Isometry3::identity(),
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            viewport: (0, 0),
        };
        camera.reevaluate_view();

        camera
    }

    /// Applies movement and mouse look. Returns `true` when the pose changed,
    /// which means any accumulated image is stale.
    pub fn update(&mut self, time_step: f32, input: &CameraInput) -> bool {
        let time_step = time_step.max(0.0);

        let up: Unit<Vector3<f32>> = Vector3::y_axis();
        let right = self.right().into_inner();
        let mut moved = false;

        let mut translation = Vector3::zeros();
        if input.forward {
            translation += self.forward.into_inner();
        }
        if input.backward {
            translation -= self.forward.into_inner();
        }
        if input.left {
            translation -= right;
        }
        if input.right {
            translation += right;
        }
        if input.up {
            translation += up.into_inner();
        }
        if input.down {
            translation -= up.into_inner();
        }
        translation *= self.movement_speed() * time_step;

        if translation != Vector3::zeros() {
            self.position += translation;
            moved = true;
        }

        if input.looking && input.mouse_delta != Vector2::zeros() {
            let delta = input.mouse_delta * Self::MOUSE_SENSITIVITY;

            let yaw_delta = delta.x * self.rotation_speed(); // positive when right

            // pitch는 수직 근처에서 멈춰야 함, 넘어가면 화면이 뒤집힘
            let max_pitch = Self::MAX_PITCH_DOT.asin();
            let pitch = self.forward.y.clamp(-1.0, 1.0).asin();
            let target_pitch = (pitch - delta.y * self.rotation_speed()).clamp(-max_pitch, max_pitch);
            let pitch_delta = pitch - target_pitch; // positive when down

            if pitch_delta != 0.0 || yaw_delta != 0.0 {
                let q = UnitQuaternion::from_axis_angle(&up, -yaw_delta)
                    * UnitQuaternion::from_axis_angle(&Unit::new_unchecked(right), -pitch_delta);

                self.forward = q * self.forward;
                self.forward.renormalize_fast();
                moved = true;
            }
        }

        if moved {
            self.reevaluate_view();
            self.reevaluate_rays();
        }

        moved
    }

    /// Rebuilds the projection and ray table for a new viewport. Returns
    /// `false` for unchanged or zero-area sizes.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || self.viewport == (width, height) {
            return false;
        }

        debug!("camera viewport {}x{}", width, height);
        self.viewport = (width, height);

        self.reevaluate_projection();
        self.reevaluate_rays();
        true
    }

    pub fn set_pose(&mut self, position: Point3<f32>, forward: Vector3<f32>) {
        let Some(forward) = Unit::try_new(forward, 1e-6) else {
            warn!("ignoring zero-length camera direction");
            return;
        };
        if forward.y.abs() > Self::MAX_PITCH_DOT {
            warn!("ignoring camera direction parallel to the up axis");
            return;
        }

        self.position = position;
        self.forward = forward;
        self.reevaluate_view();
        self.reevaluate_rays();
    }

    pub fn set_vertical_fov(&mut self, degrees: f32) {
        if !(degrees > 0.0 && degrees < 180.0) {
            warn!("ignoring vertical fov of {} degrees", degrees);
            return;
        }

        self.vertical_fov = degrees;
        self.reevaluate_projection();
        self.reevaluate_rays();
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        if !(near > 0.0 && far > near) {
            warn!("ignoring clip planes near={} far={}", near, far);
            return;
        }

        self.near = near;
        self.far = far;
        self.reevaluate_projection();
        self.reevaluate_rays();
    }

    /// Cached world-space direction through the center of pixel `(x, y)`.
    /// Row 0 is the bottom of the viewport.
    pub fn ray_direction(&self, x: u32, y: u32) -> Unit<Vector3<f32>> {
        self.rays[(y * self.viewport.0 + x) as usize]
    }

    pub fn ray_directions(&self) -> &[Unit<Vector3<f32>>] {
        &self.rays
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn forward(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    pub fn right(&self) -> Unit<Vector3<f32>> {
        Unit::new_normalize(self.forward.cross(&Vector3::y()))
    }

    pub fn up(&self) -> Unit<Vector3<f32>> {
        Unit::new_normalize(self.right().cross(self.forward.as_ref()))
    }

    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn rotation_speed(&self) -> f32 {
        0.3
    }

    pub fn movement_speed(&self) -> f32 {
        5.0
    }

    fn reevaluate_projection(&mut self) {
        let (width, height) = self.viewport;
        let aspect = if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };

        self.projection =
            Perspective3::new(aspect, self.vertical_fov.to_radians(), self.near, self.far);
    }

    fn reevaluate_view(&mut self) {
        let target = self.position + self.forward.into_inner();
        self.view = Isometry3::look_at_rh(&self.position, &target, &Vector3::y());
    }

    fn reevaluate_rays(&mut self) {
        let (width, height) = self.viewport;
        let inverse_projection = self.projection.inverse();
        let view = self.view;

        self.rays = (0..width * height)
            .into_par_iter()
            .map(|index| {
                let x = index % width;
                let y = index / width;

                let coord = Vector2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                ) * 2.0
                    - Vector2::new(1.0, 1.0);

                // 원근 투영을 되돌려 far 평면 위의 점을 구함 (뷰 좌표계)
                let target = inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);
                let direction = (target.xyz() / target.w).normalize();

                Unit::new_normalize(view.inverse_transform_vector(&direction))
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.resize(width, height);
        camera
    }

    #[test]
    fn zero_area_resize_is_ignored() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        assert!(!camera.resize(0, 0));
        assert!(!camera.resize(0, 10));
        assert!(!camera.resize(10, 0));
        assert_eq!(camera.viewport(), (0, 0));
        assert!(camera.ray_directions().is_empty());

        assert!(camera.resize(4, 3));
        assert!(!camera.resize(0, 3));
        assert_eq!(camera.viewport(), (4, 3));
        assert_eq!(camera.ray_directions().len(), 12);
    }

    #[test]
    fn resize_with_same_size_is_a_no_op() {
        let mut camera = camera(8, 6);
        assert!(!camera.resize(8, 6));
        assert!(camera.resize(6, 8));
        assert_eq!(camera.ray_directions().len(), 48);
    }

    #[test]
    fn center_ray_points_forward() {
        let camera = camera(1, 1);
        let direction = camera.ray_direction(0, 0);
        assert_relative_eq!(direction.into_inner(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn rays_are_normalized_and_oriented() {
        let camera = camera(16, 9);
        for ray in camera.ray_directions() {
            assert_relative_eq!(ray.magnitude(), 1.0, epsilon = 1e-5);
            assert!(ray.z < 0.0);
        }

        assert!(camera.ray_direction(0, 4).x < 0.0);
        assert!(camera.ray_direction(15, 4).x > 0.0);
        assert!(camera.ray_direction(8, 0).y < 0.0);
        assert!(camera.ray_direction(8, 8).y > 0.0);
    }

    #[test]
    fn edge_rays_follow_vertical_fov() {
        let camera = camera(1, 1000);
        let top = camera.ray_direction(0, 999);
        let half_angle = top.y.atan2(-top.z).to_degrees();
        assert_relative_eq!(half_angle, 22.5, epsilon = 0.05);
    }

    #[test]
    fn idle_input_never_reports_movement() {
        let mut camera = camera(4, 4);
        let before = camera.position();
        let idle = CameraInput::default();
        for _ in 0..1000 {
            assert!(!camera.update(1.0 / 60.0, &idle));
        }
        assert_eq!(camera.position(), before);

        let looking = CameraInput {
            looking: true,
            ..Default::default()
        };
        assert!(!camera.update(1.0 / 60.0, &looking));
    }

    #[test]
    fn movement_translates_along_local_axes() {
        let mut camera = camera(4, 4);
        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        assert!(camera.update(0.5, &input));
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, 3.5), epsilon = 1e-5);

        let input = CameraInput {
            right: true,
            up: true,
            ..Default::default()
        };
        assert!(camera.update(0.1, &input));
        assert_relative_eq!(camera.position(), Point3::new(0.5, 0.5, 3.5), epsilon = 1e-5);
    }

    #[test]
    fn opposite_keys_or_zero_time_do_not_move() {
        let mut camera = camera(4, 4);
        let input = CameraInput {
            forward: true,
            backward: true,
            ..Default::default()
        };
        assert!(!camera.update(0.5, &input));

        let input = CameraInput {
            left: true,
            ..Default::default()
        };
        assert!(!camera.update(0.0, &input));
    }

    #[test]
    fn mouse_look_requires_looking() {
        let mut camera = camera(3, 3);
        let mut input = CameraInput {
            mouse_delta: Vector2::new(40.0, 0.0),
            ..Default::default()
        };
        assert!(!camera.update(1.0 / 60.0, &input));

        input.looking = true;
        assert!(camera.update(1.0 / 60.0, &input));
        let forward = camera.forward();
        assert!(forward.x > 0.0, "moving the mouse right should turn right");
        assert_relative_eq!(forward.magnitude(), 1.0, epsilon = 1e-5);

        // 광선 캐시도 새 방향을 따라가야 함
        assert_relative_eq!(
            camera.ray_direction(1, 1).into_inner(),
            forward.into_inner(),
            epsilon = 1e-4
        );
    }

    #[test]
    fn pitch_stops_short_of_vertical() {
        let mut camera = camera(2, 2);
        let input = CameraInput {
            mouse_delta: Vector2::new(0.0, -500.0),
            looking: true,
            ..Default::default()
        };
        for _ in 0..100 {
            camera.update(1.0 / 60.0, &input);
        }
        assert!(camera.forward().y > 0.9);
        assert!(camera.forward().y < Camera::MAX_PITCH_DOT + 1e-4);
        assert!(camera.right().magnitude() > 0.99);
    }

    #[test]
    fn projection_changes_rebuild_rays() {
        let mut camera = camera(5, 5);
        let before = camera.ray_direction(4, 4);
        camera.set_vertical_fov(90.0);
        let after = camera.ray_direction(4, 4);
        assert!(after.y > before.y);

        camera.set_vertical_fov(0.0);
        assert_eq!(camera.vertical_fov(), 90.0);

        camera.set_clip_planes(1.0, 0.5);
        assert_eq!(camera.clip_planes(), (0.1, 100.0));
        camera.set_clip_planes(0.5, 50.0);
        assert_eq!(camera.clip_planes(), (0.5, 50.0));
        assert_relative_eq!(camera.ray_direction(4, 4).into_inner(), after.into_inner(), epsilon = 1e-4);
    }

    #[test]
    fn basis_is_orthonormal() {
        let mut camera = camera(2, 2);
        camera.set_pose(Point3::new(1.0, 2.0, 3.0), Vector3::new(1.0, -0.5, -1.0));
        let (forward, right, up) = (camera.forward(), camera.right(), camera.up());
        assert_relative_eq!(forward.dot(right.as_ref()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.dot(up.as_ref()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(right.dot(up.as_ref()), 0.0, epsilon = 1e-5);
        assert!(up.y > 0.0);

        camera.set_pose(Point3::origin(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(camera.position(), Point3::new(1.0, 2.0, 3.0));
    }
}
