use crate::{
    material::Material,
    primitives::{Intersect, PrimitiveList, AABB},
    ray::{Hit, Ray},
};
use glam::{vec3, Vec3};
use std::sync::Arc;

/// Thickness given to a rectangle's bounding box along its normal axis so the
/// accelerator never sees a zero-extent slab.
const PADDING: f32 = 1e-4;

/// The coordinate plane an axis-aligned rectangle lies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Xy,
    Xz,
    Yz,
}

impl Plane {
    /// Outward normal of a rectangle in this plane.
    fn normal(self) -> Vec3 {
        match self {
            Plane::Xy => vec3(0.0, 0.0, 1.0),
            Plane::Xz => vec3(0.0, 1.0, 0.0),
            Plane::Yz => vec3(1.0, 0.0, 0.0),
        }
    }

    /// Split a point into its (in-plane a, in-plane b, off-plane k) parts.
    fn decompose(self, p: Vec3) -> (f32, f32, f32) {
        match self {
            Plane::Xy => (p.x(), p.y(), p.z()),
            Plane::Xz => (p.x(), p.z(), p.y()),
            Plane::Yz => (p.y(), p.z(), p.x()),
        }
    }

    /// Inverse of `decompose`.
    fn compose(self, a: f32, b: f32, k: f32) -> Vec3 {
        match self {
            Plane::Xy => vec3(a, b, k),
            Plane::Xz => vec3(a, k, b),
            Plane::Yz => vec3(k, a, b),
        }
    }
}

/// An axis-aligned rectangle spanning `[a0, a1] x [b0, b1]` in one of the
/// three coordinate planes, at offset `k` along the plane normal.
#[derive(Clone, Debug)]
pub struct AxisRect {
    plane: Plane,
    a0: f32,
    a1: f32,
    b0: f32,
    b1: f32,
    k: f32,
    material: Arc<dyn Material>,
}

impl AxisRect {
    pub fn new(
        plane: Plane,
        a0: f32,
        a1: f32,
        b0: f32,
        b1: f32,
        k: f32,
        material: Arc<dyn Material>,
    ) -> Self {
        Self {
            plane,
            a0: a0.min(a1),
            a1: a0.max(a1),
            b0: b0.min(b1),
            b1: b0.max(b1),
            k,
            material,
        }
    }
}

impl Intersect for AxisRect {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let (_, _, origin_k) = self.plane.decompose(ray.origin);
        let (_, _, dir_k) = self.plane.decompose(ray.direction);

        // A parallel ray produces a non-finite t and fails the range check.
        let t = (self.k - origin_k) / dir_k;
        if !(t_min < t && t < t_max) {
            return None;
        }

        let (a, b, _) = self.plane.decompose(ray.point_at_parameter(t));
        if a < self.a0 || a > self.a1 || b < self.b0 || b > self.b1 {
            return None;
        }

        let u = (a - self.a0) / (self.a1 - self.a0);
        let v = (b - self.b0) / (self.b1 - self.b0);

        Some(Hit::new(
            ray,
            t,
            self.plane.normal(),
            u,
            v,
            self.material.clone(),
        ))
    }

    fn bounds(&self, _time0: f32, _time1: f32) -> Option<AABB> {
        Some(AABB::new(
            self.plane.compose(self.a0, self.b0, self.k - PADDING),
            self.plane.compose(self.a1, self.b1, self.k + PADDING),
        ))
    }
}

/// An axis-aligned box assembled from six rectangles sharing one material.
#[derive(Clone)]
pub struct AxisBox {
    sides: PrimitiveList,
    min: Vec3,
    max: Vec3,
}

impl AxisBox {
    pub fn new(p0: Vec3, p1: Vec3, material: Arc<dyn Material>) -> Self {
        let min = p0.min(p1);
        let max = p0.max(p1);

        let mut sides = PrimitiveList::new();
        for &(plane, k) in &[
            (Plane::Xy, min.z()),
            (Plane::Xz, min.y()),
            (Plane::Yz, min.x()),
        ] {
            let (a0, b0, _) = plane.decompose(min);
            let (a1, b1, _) = plane.decompose(max);
            sides.push(Arc::new(AxisRect::new(
                plane,
                a0,
                a1,
                b0,
                b1,
                k,
                material.clone(),
            )));
        }
        for &(plane, k) in &[
            (Plane::Xy, max.z()),
            (Plane::Xz, max.y()),
            (Plane::Yz, max.x()),
        ] {
            let (a0, b0, _) = plane.decompose(min);
            let (a1, b1, _) = plane.decompose(max);
            sides.push(Arc::new(AxisRect::new(
                plane,
                a0,
                a1,
                b0,
                b1,
                k,
                material.clone(),
            )));
        }

        Self { sides, min, max }
    }
}

impl Intersect for AxisBox {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.sides.intersection(ray, t_min, t_max)
    }

    fn bounds(&self, _time0: f32, _time1: f32) -> Option<AABB> {
        Some(AABB::new(self.min, self.max))
    }
}
