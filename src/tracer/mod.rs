use log::{debug, warn};
use nalgebra::{Point3, Unit, Vector3};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::util::{color_to_rgba, FastRandom, QualityRandom, RandomSource};

pub mod output;
pub mod ray;
pub mod scene;

pub use output::FinalImage;
pub use ray::Ray;
pub use scene::{Material, Scene, Sphere};

/// Per-frame knobs, passed to every [`Tracer::render`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub accumulate: bool,
    pub bounces: u32,
    pub slow_random: bool,
    pub seed: u32,
    pub sky_color: Vector3<f32>,
}

impl Settings {
    pub const MIN_BOUNCES: u32 = 1;
    pub const MAX_BOUNCES: u32 = 10;

    pub fn set_bounces(&mut self, bounces: i64) {
        let clamped = bounces.clamp(Self::MIN_BOUNCES as i64, Self::MAX_BOUNCES as i64);
        if clamped != bounces {
            warn!("bounce count {} clamped to {}", bounces, clamped);
        }
        self.bounces = clamped as u32;
    }

    /// Copy with every field inside the range the tracer supports.
    pub fn validated(&self) -> Self {
        Self {
            bounces: self.bounces.clamp(Self::MIN_BOUNCES, Self::MAX_BOUNCES),
            ..self.clone()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            bounces: 5,
            slow_random: false,
            seed: 0,
            sky_color: Vector3::new(0.6, 0.7, 0.9),
        }
    }
}

/// Progressive path tracer over a sphere [`Scene`].
///
/// Every [`Tracer::render`] adds one sample per pixel into the accumulation
/// buffer and tone-maps the running mean into the [`FinalImage`]. The frame
/// index is the divisor for the frame being rendered: it is 1 right after a
/// reset and N + 1 after N accumulated frames.
pub struct Tracer {
    final_image: FinalImage,
    accumulation: Vec<Vector3<f32>>,
    frame_index: u32,
    rendered: bool,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    // 표면에서 이만큼 띄워서 다음 레이를 쏨
    const SURFACE_OFFSET: f32 = 0.0001;

    pub fn new() -> Self {
        Self {
            final_image: FinalImage::default(),
            accumulation: vec![],
            frame_index: 1,
            rendered: false,
        }
    }

    /// Reallocates both buffers for a new viewport, discarding history.
    /// Zero-area and unchanged sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || self.size() == (width, height) {
            return false;
        }

        debug!("tracer viewport {}x{}", width, height);
        self.final_image = FinalImage::new(width, height);
        self.accumulation = vec![Vector3::zeros(); (width * height) as usize];
        self.frame_index = 1;
        self.rendered = false;
        true
    }

    pub fn reset_frame_index(&mut self) {
        self.accumulation.fill(Vector3::zeros());
        self.frame_index = 1;
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn size(&self) -> (u32, u32) {
        (self.final_image.width(), self.final_image.height())
    }

    /// Summed linear radiance per pixel; divide by the frame index of the last
    /// rendered frame to get the mean.
    pub fn accumulation(&self) -> &[Vector3<f32>] {
        &self.accumulation
    }

    /// `None` until a frame has been rendered at the current size.
    pub fn final_image(&self) -> Option<&FinalImage> {
        self.rendered.then_some(&self.final_image)
    }

    pub fn render(&mut self, scene: &Scene, camera: &Camera, settings: &Settings) {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return;
        }
        if camera.viewport() != (width, height) {
            warn!(
                "skipping render: camera viewport {:?} does not match tracer {:?}",
                camera.viewport(),
                (width, height)
            );
            return;
        }

        let settings = settings.validated();
        if !settings.accumulate {
            self.frame_index = 1;
        }
        if self.frame_index == 1 {
            self.accumulation.fill(Vector3::zeros());
        }

        let frame_index = self.frame_index;
        let row = width as usize;

        // 각 픽셀은 자기 칸만 건드리므로 줄 단위로 나눠서 병렬 처리
        self.accumulation
            .par_chunks_mut(row)
            .zip(self.final_image.pixels.par_chunks_mut(row))
            .enumerate()
            .for_each(|(y, (accumulated_row, image_row))| {
                for (x, (accumulated, pixel)) in accumulated_row
                    .iter_mut()
                    .zip(image_row.iter_mut())
                    .enumerate()
                {
                    *accumulated +=
                        Self::per_pixel(scene, camera, &settings, x as u32, y as u32, frame_index);

                    let average = *accumulated / frame_index as f32;
                    *pixel = color_to_rgba(&average);
                }
            });

        self.rendered = true;
        if settings.accumulate {
            self.frame_index = self.frame_index.saturating_add(1);
        }
    }

    /// The radiance sample pixel `(x, y)` receives in frame `frame_index`.
    /// Deterministic for a given seed, so frames can be replayed.
    pub fn sample(
        scene: &Scene,
        camera: &Camera,
        settings: &Settings,
        x: u32,
        y: u32,
        frame_index: u32,
    ) -> Vector3<f32> {
        Self::per_pixel(scene, camera, &settings.validated(), x, y, frame_index)
    }

    // DirectX의 RayGen 쉐이더와 같음
    fn per_pixel(
        scene: &Scene,
        camera: &Camera,
        settings: &Settings,
        x: u32,
        y: u32,
        frame_index: u32,
    ) -> Vector3<f32> {
        let pixel = y * camera.viewport().0 + x;
        let ray = Ray::new(camera.position(), camera.ray_direction(x, y));

        let light = if settings.slow_random {
            let mut rng = QualityRandom::for_sample(pixel, frame_index, settings.seed);
            Self::trace_path(scene, ray, settings, &mut rng)
        } else {
            let mut rng = FastRandom::for_sample(pixel, frame_index, settings.seed);
            Self::trace_path(scene, ray, settings, &mut rng)
        };

        light.map(|channel| channel.max(0.0))
    }

    /// Follows one path for up to `settings.bounces` segments. Paths still
    /// bouncing when the budget runs out keep only the light gathered so far.
    pub fn trace_path<R: RandomSource>(
        scene: &Scene,
        mut ray: Ray,
        settings: &Settings,
        rng: &mut R,
    ) -> Vector3<f32> {
        let mut light = Vector3::zeros();
        let mut contribution = Vector3::new(1.0, 1.0, 1.0);

        for _ in 0..settings.bounces.clamp(Settings::MIN_BOUNCES, Settings::MAX_BOUNCES) {
            let Some(HitPayload { position, normal, sphere, .. }) = Self::trace_ray(&ray, scene)
            else {
                light += settings.sky_color.component_mul(&contribution);
                break;
            };

            let material = scene.material_for(sphere);
            light += material.emission().component_mul(&contribution);
            contribution.component_mul_assign(&material.albedo);

            if contribution == Vector3::zeros() {
                break;
            }

            // position 자체가 구에 접하기 때문에 조금이라도 옮겨야 함
            ray.origin = position + normal.as_ref() * Self::SURFACE_OFFSET;
            ray.direction = scatter(&material, &ray.direction, &normal, rng);
        }

        light
    }

    pub fn closest_hit<'a>(ray: &Ray, distance: f32, sphere: &'a Sphere) -> HitPayload<'a> {
        let position = ray.at(distance);
        let normal = Unit::new_normalize(position - sphere.position);

        HitPayload {
            distance,
            position,
            normal,
            sphere,
        }
    }

    /// Nearest sphere in front of the ray, by brute force.
    pub fn trace_ray<'a>(ray: &Ray, scene: &'a Scene) -> Option<HitPayload<'a>> {
        let mut closest: Option<(&Sphere, f32)> = None;
        for sphere in &scene.spheres {
            let Some(distance) = sphere.intersect(ray) else {
                continue;
            };

            if closest.map_or(true, |(_, previous)| distance < previous) {
                closest = Some((sphere, distance));
            }
        }

        closest.map(|(sphere, distance)| Self::closest_hit(ray, distance, sphere))
    }
}

// HitPayload는 빛의 경로에 대한 정보만 담고, 색상은 나중에 계산함
#[derive(Debug, Clone, Copy)]
pub struct HitPayload<'a> {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
    pub sphere: &'a Sphere,
}

fn reflect(incoming: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    incoming - normal * (2.0 * incoming.dot(normal))
}

/// Next path direction off a surface.
///
/// A bounce is specular with probability `metallic * (1 - roughness)`: the
/// mirror direction jittered by `roughness`. Otherwise it is a cosine-weighted
/// diffuse bounce around the normal.
fn scatter<R: RandomSource>(
    material: &Material,
    incoming: &Unit<Vector3<f32>>,
    normal: &Unit<Vector3<f32>>,
    rng: &mut R,
) -> Unit<Vector3<f32>> {
    let roughness = material.roughness.clamp(0.0, 1.0);
    let metallic = material.metallic.clamp(0.0, 1.0);

    let direction = if rng.next_f32() < metallic * (1.0 - roughness) {
        reflect(incoming, normal) + rng.in_unit_sphere() * roughness
    } else {
        normal.into_inner() + rng.unit_vector()
    };

    // 표면 안쪽을 향하면 법선 쪽 반구로 뒤집음
    let cosine = direction.dot(normal.as_ref());
    let direction = if cosine < 0.0 {
        reflect(&direction, normal)
    } else {
        direction
    };

    Unit::try_new(direction, 1e-6).unwrap_or(*normal)
}
