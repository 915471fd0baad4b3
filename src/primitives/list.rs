use crate::{
    primitives::{Intersect, AABB},
    ray::{Hit, Ray},
};
use std::sync::Arc;

/// An ordered collection of primitives tested exhaustively.
///
/// Fine for a handful of objects and as the flat input handed to the BVH
/// builder; scene-sized collections should be wrapped in a BVH instead.
#[derive(Clone, Default)]
pub struct PrimitiveList {
    objects: Vec<Arc<dyn Intersect>>,
}

impl PrimitiveList {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn push(&mut self, object: Arc<dyn Intersect>) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn into_objects(self) -> Vec<Arc<dyn Intersect>> {
        self.objects
    }
}

impl Intersect for PrimitiveList {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let mut nearest = None;
        let mut closest = t_max;

        for object in &self.objects {
            if let Some(hit) = object.intersection(ray, t_min, closest) {
                closest = hit.t;
                nearest = Some(hit);
            }
        }

        nearest
    }

    fn bounds(&self, time0: f32, time1: f32) -> Option<AABB> {
        if self.objects.is_empty() {
            return None;
        }

        let mut bounds = AABB::empty();
        for object in &self.objects {
            bounds = bounds.union(object.bounds(time0, time1)?);
        }

        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{material::Lambertian, primitives::Sphere};
    use glam::vec3;

    fn sphere_at(z: f32) -> Arc<dyn Intersect> {
        Arc::new(Sphere::new(
            vec3(0.0, 0.0, z),
            1.0,
            Arc::new(Lambertian::new(vec3(0.5, 0.5, 0.5))),
        ))
    }

    #[test]
    fn returns_the_closest_member_hit() {
        let mut list = PrimitiveList::new();
        list.push(sphere_at(-10.0));
        list.push(sphere_at(-4.0));

        let ray = Ray::new(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0), 0.0);
        let hit = list.intersection(ray, 0.001, f32::INFINITY).unwrap();

        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    #[test]
    fn empty_list_never_hits_and_has_no_bounds() {
        let list = PrimitiveList::new();
        let ray = Ray::new(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0), 0.0);

        assert!(list.intersection(ray, 0.001, f32::INFINITY).is_none());
        assert!(list.bounds(0.0, 1.0).is_none());
    }

    #[test]
    fn bounds_cover_all_members() {
        let mut list = PrimitiveList::new();
        list.push(sphere_at(-10.0));
        list.push(sphere_at(-4.0));

        let bounds = list.bounds(0.0, 1.0).unwrap();
        assert!(bounds.min.z() <= -11.0);
        assert!(bounds.max.z() >= -3.0);
    }
}
