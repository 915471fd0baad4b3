use crate::{
    ray::{Hit, Ray},
    DefaultRng,
};
use glam::Vec3;
use rand::prelude::*;
use rand_distr::{Distribution, UnitBall, UnitSphere};

// Samples a random point on the surface of the unit sphere
pub fn sample_unit_sphere(rng: &mut DefaultRng) -> Vec3 {
    Vec3::from(UnitSphere.sample(rng))
}

// Samples a random point inside the unit ball
pub fn sample_unit_ball(rng: &mut DefaultRng) -> Vec3 {
    Vec3::from(UnitBall.sample(rng))
}

// Reflect vector v around normal n
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

// Refract vector v around normal n and return only if successful
pub fn refract(v: Vec3, n: Vec3, ni_over_nt: f32) -> Option<Vec3> {
    let uv = v.normalize();
    let dt = uv.dot(n);
    let discriminant = 1.0 - ni_over_nt * ni_over_nt * (1.0 - dt * dt);

    if discriminant > 0.0 {
        let refracted = ni_over_nt * (uv - n * dt) - n * f32::sqrt(discriminant);
        Some(refracted)
    } else {
        None
    }
}

// An approximation for reflectivity
pub fn schlick(cosine: f32, refraction_index: f32) -> f32 {
    let r_0 = (1.0 - refraction_index) / (1.0 + refraction_index);
    let r_0 = r_0 * r_0;

    r_0 + (1.0 - r_0) * f32::powf(1.0 - cosine, 5.0)
}

pub struct ScatterResult {
    pub scattered: Ray,
    pub attenuation: Vec3,
}

/// Decides whether and how a ray continues after hitting a surface.
///
/// Materials are immutable and shared between shapes; all randomness comes in
/// through the caller's RNG.
pub trait Material: std::fmt::Debug + Send + Sync {
    /// `None` means the ray was absorbed; nothing is contributed past this
    /// point except the material's own emission.
    fn scatter(&self, ray: Ray, hit: &Hit, rng: &mut DefaultRng) -> Option<ScatterResult>;

    /// Radiance emitted at the hit point. Black for everything that is not a
    /// light source.
    fn emitted(&self, _u: f32, _v: f32, _point: Vec3) -> Vec3 {
        Vec3::zero()
    }
}

#[derive(Debug)]
pub struct Lambertian {
    pub albedo: Vec3,
}

impl Lambertian {
    pub fn new(albedo: Vec3) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter(&self, ray: Ray, hit: &Hit, rng: &mut DefaultRng) -> Option<ScatterResult> {
        let mut direction = hit.normal + sample_unit_sphere(rng);

        // The random unit vector can cancel the normal almost exactly
        if direction.length_squared() < 1e-8 {
            direction = hit.normal;
        }

        Some(ScatterResult {
            scattered: Ray::new(hit.point, direction, ray.time),
            attenuation: self.albedo,
        })
    }
}

#[derive(Debug)]
pub struct Metal {
    pub albedo: Vec3,
    pub fuzz: f32,
}

impl Metal {
    pub fn new(albedo: Vec3, fuzz: f32) -> Self {
        Self {
            albedo,
            fuzz: fuzz.max(0.0).min(1.0),
        }
    }
}

impl Material for Metal {
    fn scatter(&self, ray: Ray, hit: &Hit, rng: &mut DefaultRng) -> Option<ScatterResult> {
        let reflected = reflect(ray.direction.normalize(), hit.normal);
        let scattered = Ray::new(
            hit.point,
            reflected + self.fuzz * sample_unit_ball(rng),
            ray.time,
        );

        if scattered.direction.dot(hit.normal) > 0.0 {
            Some(ScatterResult {
                scattered,
                attenuation: self.albedo,
            })
        } else {
            // The fuzzed reflection dipped below the surface
            None
        }
    }
}

#[derive(Debug)]
pub struct Dielectric {
    refraction_index: f32,
}

impl Dielectric {
    pub fn new(refraction_index: f32) -> Self {
        Self { refraction_index }
    }
}

impl Material for Dielectric {
    fn scatter(&self, ray: Ray, hit: &Hit, rng: &mut DefaultRng) -> Option<ScatterResult> {
        // Entering the medium from outside or leaving it from inside
        let ni_over_nt = if hit.front_face {
            1.0 / self.refraction_index
        } else {
            self.refraction_index
        };

        let unit_direction = ray.direction.normalize();
        let cosine = f32::min(-unit_direction.dot(hit.normal), 1.0);

        // Total internal reflection shows up as a failed refraction;
        // otherwise Schlick decides probabilistically
        let direction = match refract(unit_direction, hit.normal, ni_over_nt) {
            Some(refracted)
                if !rng.gen_bool(f64::from(schlick(cosine, ni_over_nt)).min(1.0)) =>
            {
                refracted
            }
            _ => reflect(unit_direction, hit.normal),
        };

        Some(ScatterResult {
            scattered: Ray::new(hit.point, direction, ray.time),
            attenuation: Vec3::one(),
        })
    }
}

/// A light source: absorbs every incoming ray and only ever emits.
#[derive(Debug)]
pub struct DiffuseLight {
    pub emit: Vec3,
}

impl DiffuseLight {
    pub fn new(emit: Vec3) -> Self {
        Self { emit }
    }
}

impl Material for DiffuseLight {
    fn scatter(&self, _ray: Ray, _hit: &Hit, _rng: &mut DefaultRng) -> Option<ScatterResult> {
        None
    }

    fn emitted(&self, _u: f32, _v: f32, _point: Vec3) -> Vec3 {
        self.emit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn head_on_hit(material: Arc<dyn Material>) -> (Ray, Hit) {
        let ray = Ray::new(vec3(0.0, 0.0, 2.0), vec3(0.0, 0.0, -1.0), 0.25);
        let hit = Hit::new(ray, 2.0, vec3(0.0, 0.0, 1.0), 0.5, 0.5, material);

        (ray, hit)
    }

    #[test]
    fn lambertian_attenuates_by_albedo_and_keeps_time() {
        let albedo = vec3(0.8, 0.1, 0.2);
        let material = Arc::new(Lambertian::new(albedo));
        let (ray, hit) = head_on_hit(material.clone());
        let mut rng = DefaultRng::seed_from_u64(1);

        let scatter = material.scatter(ray, &hit, &mut rng).unwrap();
        assert_eq!(scatter.attenuation, albedo);
        assert_eq!(scatter.scattered.origin, hit.point);
        assert_eq!(scatter.scattered.time, ray.time);
        // Diffuse bounces always leave the surface
        assert!(scatter.scattered.direction.dot(hit.normal) > 0.0);
    }

    #[test]
    fn polished_metal_reflects_exactly() {
        let material = Arc::new(Metal::new(vec3(0.9, 0.9, 0.9), 0.0));
        let ray = Ray::new(vec3(-1.0, 1.0, 0.0), vec3(1.0, -1.0, 0.0).normalize(), 0.0);
        let hit = Hit::new(ray, f32::sqrt(2.0), vec3(0.0, 1.0, 0.0), 0.5, 0.5, material.clone());
        let mut rng = DefaultRng::seed_from_u64(2);

        let scatter = material.scatter(ray, &hit, &mut rng).unwrap();
        let expected = vec3(1.0, 1.0, 0.0).normalize();
        assert!((scatter.scattered.direction.normalize() - expected).length() < 1e-5);
    }

    #[test]
    fn metal_clamps_fuzz() {
        let material = Metal::new(vec3(1.0, 1.0, 1.0), 7.5);
        assert!((material.fuzz - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn index_one_dielectric_passes_straight_through() {
        let material = Arc::new(Dielectric::new(1.0));
        let (ray, hit) = head_on_hit(material.clone());
        let mut rng = DefaultRng::seed_from_u64(3);

        // Head-on: Schlick reflectance is zero, refraction at index 1 is the
        // identity, so the ray must continue unchanged.
        for _ in 0..32 {
            let scatter = material.scatter(ray, &hit, &mut rng).unwrap();
            let out = scatter.scattered.direction.normalize();
            assert!((out - ray.direction.normalize()).length() < 1e-5);
            assert_eq!(scatter.attenuation, Vec3::one());
        }
    }

    #[test]
    fn grazing_dielectric_reflects_on_total_internal_reflection() {
        let material = Arc::new(Dielectric::new(1.5));
        // Leaving glass nearly parallel to the surface, well past the
        // critical angle.
        let ray = Ray::new(
            vec3(0.0, -1.0, -1.0),
            vec3(0.0, 1.0, 0.1).normalize(),
            0.0,
        );
        let hit = Hit::new(ray, 1.0, vec3(0.0, 0.0, 1.0), 0.5, 0.5, material.clone());
        assert!(!hit.front_face);
        let mut rng = DefaultRng::seed_from_u64(4);

        let scatter = material.scatter(ray, &hit, &mut rng).unwrap();
        let reflected = reflect(ray.direction.normalize(), hit.normal);
        assert!((scatter.scattered.direction - reflected).length() < 1e-5);
    }

    #[test]
    fn schlick_at_normal_incidence_matches_fresnel() {
        // r0 = ((1 - 1.5) / (1 + 1.5))^2 = 0.04
        assert!((schlick(1.0, 1.5) - 0.04).abs() < 1e-6);
    }

    #[test]
    fn diffuse_light_absorbs_and_emits() {
        let material = Arc::new(DiffuseLight::new(vec3(4.0, 4.0, 4.0)));
        let (ray, hit) = head_on_hit(material.clone());
        let mut rng = DefaultRng::seed_from_u64(5);

        assert!(material.scatter(ray, &hit, &mut rng).is_none());
        assert_eq!(material.emitted(0.5, 0.5, hit.point), vec3(4.0, 4.0, 4.0));
    }

    #[test]
    fn lambertian_has_no_emission() {
        let material = Lambertian::new(vec3(0.5, 0.5, 0.5));
        assert_eq!(material.emitted(0.0, 0.0, Vec3::zero()), Vec3::zero());
    }
}
