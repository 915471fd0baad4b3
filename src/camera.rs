use crate::{ray::Ray, DefaultRng};
use glam::Vec3;
use rand::prelude::*;
use rand_distr::{Distribution, UnitDisc};
use std::f32::consts::PI;

/// Maps normalized viewport coordinates to primary rays.
///
/// All derived quantities (basis vectors, viewport corners, lens radius) are
/// computed once at construction; ray generation only samples the lens disk
/// and the shutter interval.
#[derive(Debug)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
    time0: f32,
    time1: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        look_from: Vec3,
        look_at: Vec3,
        vup: Vec3,
        vfov: f32,
        aspect: f32,
        aperture: f32,
        focus_dist: f32,
        time0: f32,
        time1: f32,
    ) -> Self {
        let lens_radius = aperture / 2.0;
        let theta = vfov * PI / 180.0;
        let half_height = f32::tan(theta / 2.0);
        let half_width = aspect * half_height;

        let w = (look_from - look_at).normalize();
        let u = vup.cross(w).normalize();
        let v = w.cross(u);

        let lower_left_corner =
            look_from - half_width * focus_dist * u - half_height * focus_dist * v - focus_dist * w;
        let horizontal = 2.0 * half_width * focus_dist * u;
        let vertical = 2.0 * half_height * focus_dist * v;

        Self {
            origin: look_from,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius,
            time0,
            time1,
        }
    }

    /// Primary ray through the viewport at `(s, t)`, both in `[0, 1]`,
    /// measured from the lower left corner.
    pub fn ray(&self, s: f32, t: f32, rng: &mut DefaultRng) -> Ray {
        // A zero aperture is a pinhole; there is no disk to sample
        let offset = if self.lens_radius > 0.0 {
            let [dx, dy]: [f32; 2] = UnitDisc.sample(rng);
            self.u * (self.lens_radius * dx) + self.v * (self.lens_radius * dy)
        } else {
            Vec3::zero()
        };

        let time = if self.time1 > self.time0 {
            rng.gen_range(self.time0, self.time1)
        } else {
            self.time0
        };

        Ray::new(
            self.origin + offset,
            self.lower_left_corner + s * self.horizontal + t * self.vertical - self.origin - offset,
            time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;
    use rand::SeedableRng;

    fn test_camera(aperture: f32, time0: f32, time1: f32) -> Camera {
        Camera::new(
            vec3(0.0, 0.0, 5.0),
            vec3(0.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            60.0,
            16.0 / 9.0,
            aperture,
            5.0,
            time0,
            time1,
        )
    }

    #[test]
    fn pinhole_rays_share_the_camera_origin() {
        let camera = test_camera(0.0, 0.0, 0.0);
        let mut rng = DefaultRng::seed_from_u64(11);

        for i in 0..16 {
            let ray = camera.ray(i as f32 / 16.0, 0.5, &mut rng);
            assert_eq!(ray.origin, vec3(0.0, 0.0, 5.0));
        }
    }

    #[test]
    fn center_ray_points_at_the_target() {
        let camera = test_camera(0.0, 0.0, 0.0);
        let mut rng = DefaultRng::seed_from_u64(12);

        let ray = camera.ray(0.5, 0.5, &mut rng);
        let expected = (vec3(0.0, 0.0, 0.0) - vec3(0.0, 0.0, 5.0)).normalize();
        assert!((ray.direction.normalize() - expected).length() < 1e-5);
    }

    #[test]
    fn lens_rays_start_within_the_aperture() {
        let camera = test_camera(2.0, 0.0, 0.0);
        let mut rng = DefaultRng::seed_from_u64(13);

        for _ in 0..64 {
            let ray = camera.ray(0.5, 0.5, &mut rng);
            assert!((ray.origin - vec3(0.0, 0.0, 5.0)).length() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn ray_times_sample_the_shutter_interval() {
        let camera = test_camera(0.0, 0.25, 0.75);
        let mut rng = DefaultRng::seed_from_u64(14);

        for _ in 0..64 {
            let ray = camera.ray(0.5, 0.5, &mut rng);
            assert!(ray.time >= 0.25 && ray.time < 0.75);
        }
    }

    #[test]
    fn collapsed_shutter_pins_the_time() {
        let camera = test_camera(0.0, 0.5, 0.5);
        let mut rng = DefaultRng::seed_from_u64(15);

        let ray = camera.ray(0.5, 0.5, &mut rng);
        assert_eq!(ray.time, 0.5);
    }
}
