use crate::material::Material;
use glam::{vec3, Vec3};
use std::sync::Arc;

/// The ray data type.
///
/// `time` is the instant within the camera shutter interval this ray samples;
/// only time-varying geometry looks at it. The component-wise inverse of the
/// direction is cached for bounding-box slab tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
    pub time: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, time: f32) -> Self {
        let inv_direction = vec3(
            1.0 / direction.x(),
            1.0 / direction.y(),
            1.0 / direction.z(),
        );

        Self {
            origin,
            direction,
            inv_direction,
            time,
        }
    }

    pub fn point_at_parameter(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

/// Contains data to be used in the generation of a new ray as a result of an
/// intersection.
#[derive(Clone, Debug)]
pub struct Hit {
    pub t: f32,
    pub point: Vec3,
    /// Unit normal, always oriented against the incoming ray.
    pub normal: Vec3,
    /// Surface parameterization of the hit point.
    pub u: f32,
    pub v: f32,
    /// Whether the outward surface normal faced the incoming ray.
    pub front_face: bool,
    pub material: Arc<dyn Material>,
}

impl Hit {
    /// Build a hit record from the outward normal of the surface, flipping it
    /// so the stored normal opposes the incoming ray.
    pub fn new(
        ray: Ray,
        t: f32,
        outward_normal: Vec3,
        u: f32,
        v: f32,
        material: Arc<dyn Material>,
    ) -> Self {
        let point = ray.point_at_parameter(t);
        let front_face = ray.direction.dot(outward_normal) < 0.0;
        let normal = if front_face {
            outward_normal
        } else {
            -outward_normal
        };

        Self {
            t,
            point,
            normal,
            u,
            v,
            front_face,
            material,
        }
    }
}
