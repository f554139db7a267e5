use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

/// Perspective camera. The projection matrix is cached and only refreshed by
/// [`PerspectiveCamera::update_projection_matrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        );
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

const MIN_POLAR: f32 = 1e-6;

/// Orbit controller bound to one camera: drag to rotate around the target,
/// scroll to dolly. With damping on, input decays over several updates.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    dragging: bool,
    last_pointer: Option<(f32, f32)>,
}

impl OrbitControls {
    /// Binds controls to a camera, orbiting the point it looks at.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        Self {
            target: camera.target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            dragging: false,
            last_pointer: None,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_pointer = Some((x, y));
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last_pointer = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Rotates by the pointer travel; a full viewport height is one turn.
    pub fn pointer_move(&mut self, x: f32, y: f32, viewport_height: f32) {
        let Some((last_x, last_y)) = self.last_pointer else {
            return;
        };
        if self.dragging {
            let height = viewport_height.max(1.0);
            self.rotate_left(TAU * (x - last_x) / height * self.rotate_speed);
            self.rotate_up(TAU * (y - last_y) / height * self.rotate_speed);
        }
        self.last_pointer = Some((x, y));
    }

    /// Positive `lines` scrolls towards the target.
    pub fn wheel(&mut self, lines: f32) {
        if lines == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed);
        if lines > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Applies pending input to the camera. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let weight = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * weight;
        phi = (phi + self.delta_phi * weight).clamp(MIN_POLAR, PI - MIN_POLAR);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let position = self.target + new_offset;
        let moved = position.distance_squared(camera.position) > 1e-12;
        camera.position = position;
        camera.look_at(self.target);

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(35.0, 16.0 / 9.0, 0.1, 100.0);
        camera.position = Vec3::new(0.0, 0.0, 8.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn projection_is_stale_until_updated() {
        let mut camera = demo_camera();
        let before = camera.projection_matrix();
        camera.aspect = 4.0 / 3.0;
        assert_eq!(camera.projection_matrix(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection_matrix(), before);
        let expected = Mat4::perspective_rh(35f32.to_radians(), 4.0 / 3.0, 0.1, 100.0);
        assert_eq!(camera.projection_matrix(), expected);
    }

    #[test]
    fn idle_controls_keep_camera_in_place() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.enable_damping = true;
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(0.0, 0.0, 8.0)).length() < 1e-5);
    }

    #[test]
    fn damping_spreads_rotation_over_updates() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.enable_damping = true;
        controls.rotate_left(1.0);
        controls.update(&mut camera);
        let first = camera.position;
        controls.update(&mut camera);
        let second = camera.position;
        assert!(first.x.abs() > 0.0);
        assert!(second.x.abs() > first.x.abs());
        assert!((camera.position.length() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn wheel_dollies_towards_target() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.wheel(1.0);
        controls.update(&mut camera);
        assert!((camera.position.z - 8.0 * 0.95).abs() < 1e-4);
    }

    #[test]
    fn drag_orbits_around_the_target() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.pointer_down(100.0, 300.0);
        assert!(controls.is_dragging());
        // A quarter of the viewport height is a quarter turn.
        controls.pointer_move(250.0, 300.0, 600.0);
        assert!(controls.update(&mut camera));
        assert!((camera.position - Vec3::new(-8.0, 0.0, 0.0)).length() < 1e-4);

        controls.pointer_up();
        controls.pointer_move(400.0, 300.0, 600.0);
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(-8.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn vertical_drag_tilts_the_orbit() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.pointer_down(0.0, 300.0);
        controls.pointer_move(0.0, 360.0, 600.0);
        controls.update(&mut camera);
        assert!(camera.position.y.abs() > 0.1);
        assert!((camera.position.length() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn drag_without_pointer_down_is_ignored() {
        let mut camera = demo_camera();
        let mut controls = OrbitControls::new(&camera);
        controls.pointer_move(100.0, 0.0, 600.0);
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(0.0, 0.0, 8.0)).length() < 1e-5);
    }
}
