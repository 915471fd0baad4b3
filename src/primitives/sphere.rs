use crate::{
    material::Material,
    primitives::{Intersect, AABB},
    ray::{Hit, Ray},
};
use glam::{vec3, Vec3};
use std::f32::consts::PI;
use std::sync::Arc;

/// Longitude/latitude parameterization of a unit normal on a sphere.
fn sphere_uv(normal: Vec3) -> (f32, f32) {
    // The normal can drift just past unit length from rounding
    let theta = f32::acos(f32::max(-1.0, f32::min(-normal.y(), 1.0)));
    let phi = f32::atan2(-normal.z(), normal.x()) + PI;

    (phi / (2.0 * PI), theta / PI)
}

/// Solve the sphere quadratic and return the nearest root inside
/// `(t_min, t_max)`, preferring the smaller one.
fn nearest_root(oc: Vec3, direction: Vec3, radius: f32, t_min: f32, t_max: f32) -> Option<f32> {
    let a = direction.dot(direction);
    let b = oc.dot(direction);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - a * c;

    if discriminant > 0.0 {
        let sqrt_d = f32::sqrt(discriminant);

        for &t in &[(-b - sqrt_d) / a, (-b + sqrt_d) / a] {
            if t_min < t && t < t_max {
                return Some(t);
            }
        }
    }

    None
}

#[derive(Clone, Debug)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Arc<dyn Material>,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: Arc<dyn Material>) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }
}

impl Intersect for Sphere {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let oc = ray.origin - self.center;
        let t = nearest_root(oc, ray.direction, self.radius, t_min, t_max)?;

        let outward_normal = (ray.point_at_parameter(t) - self.center) / self.radius;
        let (u, v) = sphere_uv(outward_normal);

        Some(Hit::new(ray, t, outward_normal, u, v, self.material.clone()))
    }

    fn bounds(&self, _time0: f32, _time1: f32) -> Option<AABB> {
        let extent = vec3(self.radius, self.radius, self.radius);

        Some(AABB::new(self.center - extent, self.center + extent))
    }
}

/// A sphere whose center moves linearly over the shutter interval.
#[derive(Clone, Debug)]
pub struct MovingSphere {
    center0: Vec3,
    center1: Vec3,
    time0: f32,
    time1: f32,
    radius: f32,
    material: Arc<dyn Material>,
}

impl MovingSphere {
    pub fn new(
        center0: Vec3,
        center1: Vec3,
        time0: f32,
        time1: f32,
        radius: f32,
        material: Arc<dyn Material>,
    ) -> Self {
        Self {
            center0,
            center1,
            time0,
            time1,
            radius,
            material,
        }
    }

    /// Instantaneous center at `time`. A collapsed shutter interval pins the
    /// sphere at `center0`.
    pub fn center(&self, time: f32) -> Vec3 {
        let span = self.time1 - self.time0;
        if span <= 0.0 {
            return self.center0;
        }

        self.center0 + ((time - self.time0) / span) * (self.center1 - self.center0)
    }
}

impl Intersect for MovingSphere {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let center = self.center(ray.time);
        let oc = ray.origin - center;
        let t = nearest_root(oc, ray.direction, self.radius, t_min, t_max)?;

        let outward_normal = (ray.point_at_parameter(t) - center) / self.radius;
        let (u, v) = sphere_uv(outward_normal);

        Some(Hit::new(ray, t, outward_normal, u, v, self.material.clone()))
    }

    // Union of the endpoint boxes. Tight for linear motion.
    fn bounds(&self, time0: f32, time1: f32) -> Option<AABB> {
        let extent = vec3(self.radius, self.radius, self.radius);
        let box0 = AABB::new(self.center(time0) - extent, self.center(time0) + extent);
        let box1 = AABB::new(self.center(time1) - extent, self.center(time1) + extent);

        Some(box0.union(box1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambertian;

    fn gray() -> Arc<dyn Material> {
        Arc::new(Lambertian::new(vec3(0.5, 0.5, 0.5)))
    }

    #[test]
    fn ray_through_center_hits_both_shells() {
        let sphere = Sphere::new(Vec3::zero(), 1.0, gray());
        let ray = Ray::new(vec3(0.0, 0.0, 5.0), vec3(0.0, 0.0, -1.0), 0.0);

        // Near shell at t = d - r, far shell at t = d + r.
        let near = sphere
            .intersection(ray, 0.001, f32::INFINITY)
            .expect("ray through center must hit");
        assert!((near.t - 4.0).abs() < 1e-4);

        let far = sphere
            .intersection(ray, near.t + 0.5, f32::INFINITY)
            .expect("larger root must be found past the near shell");
        assert!((far.t - 6.0).abs() < 1e-4);
    }

    #[test]
    fn offset_ray_misses() {
        let sphere = Sphere::new(Vec3::zero(), 1.0, gray());
        let ray = Ray::new(vec3(0.0, 2.0, 5.0), vec3(0.0, 0.0, -1.0), 0.0);

        assert!(sphere.intersection(ray, 0.001, f32::INFINITY).is_none());
    }

    #[test]
    fn normal_opposes_ray_from_inside() {
        let sphere = Sphere::new(Vec3::zero(), 1.0, gray());
        let ray = Ray::new(Vec3::zero(), vec3(0.0, 0.0, -1.0), 0.0);

        let hit = sphere.intersection(ray, 0.001, f32::INFINITY).unwrap();
        assert!(!hit.front_face);
        assert!(hit.normal.dot(ray.direction) < 0.0);
    }

    #[test]
    fn uv_of_positive_x_axis() {
        let sphere = Sphere::new(Vec3::zero(), 1.0, gray());
        let ray = Ray::new(vec3(5.0, 0.0, 0.0), vec3(-1.0, 0.0, 0.0), 0.0);

        let hit = sphere.intersection(ray, 0.001, f32::INFINITY).unwrap();
        assert!((hit.u - 0.5).abs() < 1e-4);
        assert!((hit.v - 0.5).abs() < 1e-4);
    }

    #[test]
    fn moving_sphere_follows_ray_time() {
        let sphere = MovingSphere::new(
            vec3(-2.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            0.0,
            1.0,
            0.5,
            gray(),
        );

        let at_start = Ray::new(vec3(-2.0, 0.0, 5.0), vec3(0.0, 0.0, -1.0), 0.0);
        assert!(sphere
            .intersection(at_start, 0.001, f32::INFINITY)
            .is_some());

        // Same ray fired at the end of the shutter no longer lines up.
        let too_late = Ray::new(vec3(-2.0, 0.0, 5.0), vec3(0.0, 0.0, -1.0), 1.0);
        assert!(sphere.intersection(too_late, 0.001, f32::INFINITY).is_none());
    }

    #[test]
    fn moving_sphere_bounds_cover_both_endpoints() {
        let sphere = MovingSphere::new(
            vec3(-2.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            0.0,
            1.0,
            0.5,
            gray(),
        );

        let bounds = sphere.bounds(0.0, 1.0).unwrap();
        assert!(bounds.min.x() <= -2.5);
        assert!(bounds.max.x() >= 2.5);
        assert!((bounds.min.y() - -0.5).abs() < 1e-6);
    }
}
