use nalgebra::{Point3, Vector3};
use rand::Rng;

use crate::tracer::ray::Ray;
use crate::util::random_vec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub roughness: f32,
    pub metallic: f32,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Material {
    pub fn diffuse(albedo: Vector3<f32>) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    pub fn emissive(color: Vector3<f32>, power: f32) -> Self {
        Self {
            albedo: Vector3::zeros(),
            emission_color: color,
            emission_power: power,
            ..Default::default()
        }
    }

    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power.max(0.0)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    /// Index into [`Scene::materials`]. May be stale while the scene is edited.
    pub material_index: usize,
}

impl Sphere {
    pub fn new(position: Point3<f32>, radius: f32, material_index: usize) -> Self {
        Self {
            position,
            radius,
            material_index,
        }
    }

    /// Distance along `ray` to the nearer surface crossing, if it lies in front
    /// of the origin. Rays starting inside the sphere report no hit.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        if !(self.radius > 0.0) {
            return None;
        }

        // 구가 원점에 있다고 가정하고 풀기 위해 레이 시작점을 그만큼 옮김
        let origin = ray.origin - self.position;

        let first = ray.direction.magnitude_squared();
        let second = 2.0 * origin.dot(ray.direction.as_ref());
        let third = origin.magnitude_squared() - self.radius.powi(2);

        // 판별식
        let discriminant = second.powi(2) - 4.0 * first * third;
        if discriminant < 0.0 {
            return None;
        }

        let distance = (-second - discriminant.sqrt()) / (2.0 * first);
        (distance > 0.0).then_some(distance)
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

/// Spheres plus the materials they reference by index.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> usize {
        self.spheres.push(sphere);
        self.spheres.len() - 1
    }

    pub fn remove_sphere(&mut self, index: usize) -> Option<Sphere> {
        (index < self.spheres.len()).then(|| self.spheres.remove(index))
    }

    pub fn sphere_mut(&mut self, index: usize) -> Option<&mut Sphere> {
        self.spheres.get_mut(index)
    }

    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    /// Material used to shade `sphere`. Out-of-range indices fall back to the
    /// first material, and a scene with no materials shades with the default.
    pub fn material_for(&self, sphere: &Sphere) -> Material {
        // UI가 잠깐 잘못된 인덱스를 만들 수 있음
        self.materials
            .get(sphere.material_index)
            .or_else(|| self.materials.first())
            .copied()
            .unwrap_or_default()
    }

    /// A sun, a floor and `count` small random spheres resting above it.
    pub fn showcase<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut scene = Self::new();

        // sun
        let sun = scene.add_material(Material {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 0.1,
            emission_color: Vector3::new(1.0, 1.0, 1.0),
            emission_power: 100.0,
            ..Default::default()
        });
        scene.add_sphere(Sphere::new(Point3::new(10.0, 20.0, 0.0), 1.0, sun));

        // floor
        let floor = scene.add_material(Material {
            albedo: Vector3::new(0.7, 0.7, 0.7),
            roughness: 0.1,
            ..Default::default()
        });
        scene.add_sphere(Sphere::new(Point3::new(0.0, -251.0, 0.0), 250.0, floor));

        for _ in 0..count {
            let albedo = random_vec(rng, 0.0..1.0);
            let material = scene.add_material(Material {
                albedo,
                roughness: rng.gen_range(0.0..1.0),
                emission_color: albedo,
                ..Default::default()
            });

            let position = Point3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-0.7..-0.5),
                rng.gen_range(-3.0..3.0),
            );
            scene.add_sphere(Sphere::new(position, rng.gen_range(0.1..0.2), material));
        }

        scene
    }
}
