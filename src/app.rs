use std::time::{Duration, Instant};

use log::debug;

use crate::camera::{Camera, CameraInput};
use crate::tracer::{FinalImage, Scene, Settings, Tracer};

/// Drives the tracer the way an interactive viewport would: update the camera,
/// then resize and render, once per tick.
pub struct Application {
    pub scene: Scene,
    pub camera: Camera,
    pub settings: Settings,
    tracer: Tracer,
    last_render: Duration,
}

impl Application {
    pub fn new(scene: Scene, settings: Settings) -> Self {
        Self {
            scene,
            camera: Camera::new(45.0, 0.1, 100.0),
            settings,
            tracer: Tracer::new(),
            last_render: Duration::ZERO,
        }
    }

    /// Returns `true` when the camera moved and the accumulated image was dropped.
    pub fn on_update(&mut self, time_step: f32, input: &CameraInput) -> bool {
        if self.camera.update(time_step, input) {
            self.tracer.reset_frame_index();
            return true;
        }

        false
    }

    /// Renders one frame at the given viewport size. A minimized (zero-area)
    /// viewport renders nothing and keeps the previous image.
    pub fn render(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let start = Instant::now();

        self.tracer.resize(width, height);
        self.camera.resize(width, height);
        self.tracer.render(&self.scene, &self.camera, &self.settings);

        self.last_render = start.elapsed();
        debug!(
            "frame {} rendered in {:.3}ms",
            self.tracer.frame_index().saturating_sub(1),
            self.last_render.as_secs_f64() * 1000.0
        );
    }

    /// Drops the accumulated image, e.g. after the scene was edited.
    pub fn reset(&mut self) {
        self.tracer.reset_frame_index();
    }

    pub fn last_render(&self) -> Duration {
        self.last_render
    }

    pub fn frame_index(&self) -> u32 {
        self.tracer.frame_index()
    }

    pub fn final_image(&self) -> Option<&FinalImage> {
        self.tracer.final_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::{Material, Sphere};
    use nalgebra::{Point3, Vector2, Vector3};

    fn application() -> Application {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::diffuse(Vector3::new(0.5, 0.5, 0.5)));
        scene.add_sphere(Sphere::new(Point3::origin(), 1.0, material));
        Application::new(scene, Settings::default())
    }

    #[test]
    fn frames_accumulate_until_the_camera_moves() {
        let mut app = application();
        assert!(app.final_image().is_none());

        for _ in 0..3 {
            assert!(!app.on_update(1.0 / 60.0, &CameraInput::default()));
            app.render(8, 6);
        }
        assert_eq!(app.frame_index(), 4);
        let image = app.final_image().expect("rendered");
        assert_eq!((image.width(), image.height()), (8, 6));

        let look = CameraInput {
            mouse_delta: Vector2::new(3.0, 1.0),
            looking: true,
            ..Default::default()
        };
        assert!(app.on_update(1.0 / 60.0, &look));
        assert_eq!(app.frame_index(), 1);

        app.render(8, 6);
        assert_eq!(app.frame_index(), 2);
    }

    #[test]
    fn resizing_restarts_accumulation() {
        let mut app = application();
        app.render(4, 4);
        app.render(4, 4);
        assert_eq!(app.frame_index(), 3);

        app.render(5, 4);
        assert_eq!(app.frame_index(), 2);
        assert_eq!(app.final_image().map(|image| image.width()), Some(5));
    }

    #[test]
    fn minimized_viewport_keeps_the_last_image() {
        let mut app = application();
        app.render(4, 4);
        app.render(0, 0);
        assert_eq!(app.frame_index(), 2);
        assert_eq!(app.final_image().map(|image| image.height()), Some(4));
    }

    #[test]
    fn manual_reset() {
        let mut app = application();
        app.render(3, 3);
        app.render(3, 3);
        app.reset();
        assert_eq!(app.frame_index(), 1);
    }
}
