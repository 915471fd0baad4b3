//! Bounding volume hierarchy over the scene's primitives.

use crate::{
    primitives::{Intersect, AABB},
    ray::{Hit, Ray},
};
use glam::Vec3;
use itertools::Itertools;
use std::{cmp::Ordering, sync::Arc};

/// How many primitives may share a leaf before a split is forced.
const SPLIT_THRESHOLD: usize = 4;

/// Number of candidate buckets per interior node.
const BUCKETS: usize = 12;

#[derive(Clone, Copy, Debug)]
pub enum Axis {
    X,
    Y,
    Z,
}

trait GetAxis {
    type Output;

    fn axis(&self, axis: Axis) -> Self::Output;
}

impl GetAxis for Vec3 {
    type Output = f32;

    fn axis(&self, axis: Axis) -> Self::Output {
        match axis {
            Axis::X => self.x(),
            Axis::Y => self.y(),
            Axis::Z => self.z(),
        }
    }
}

// Returns the axis along which the box extends furthest
fn max_extent(bounds: &AABB) -> Axis {
    let extent = bounds.max - bounds.min;

    if extent.x() > extent.y() && extent.x() > extent.z() {
        Axis::X
    } else if extent.y() > extent.z() {
        Axis::Y
    } else {
        Axis::Z
    }
}

/// A Bounding Volume Hierarchy.
///
/// Built once per scene over the flat primitive collection; traversal prunes
/// whole subtrees with a box test before any primitive is touched. The BVH is
/// itself an [`Intersect`], so hierarchies compose.
pub struct BVH {
    /// The primitives that make up the scene, sorted into leaf order
    geometry: Vec<Arc<dyn Intersect>>,
    /// The tree, flattened in depth-first order with the root first
    tree: Vec<FlatNode>,
}

impl BVH {
    /// Build a hierarchy over `geometry`, bounding time-varying primitives
    /// over the shutter interval `[time0, time1]`.
    ///
    /// Every primitive must be bounded and the collection must not be empty;
    /// scene construction checks both before calling in here.
    pub fn new(geometry: Vec<Arc<dyn Intersect>>, time0: f32, time1: f32) -> Self {
        assert!(!geometry.is_empty(), "cannot build a BVH over zero primitives");

        let mut total_nodes = 0;
        // Converts from node index to geometry index, used to sort the geometry later
        let mut index_to_geometry = Vec::new();
        // Precompute build info about the geometry
        let mut build_geometry = geometry
            .iter()
            .enumerate()
            .map(|(index, geom)| {
                let bounds = geom
                    .bounds(time0, time1)
                    .expect("BVH input primitive must be bounded");
                let center = 0.5 * (bounds.min + bounds.max);
                GeometryInfo {
                    index,
                    center,
                    bounds,
                }
            })
            .collect::<Vec<_>>();

        let root = BVH::build(&mut build_geometry, &mut index_to_geometry, &mut total_nodes);

        // Make a flat tree of FlatNodes from the root node of a BuildNode tree
        let tree = Self::flatten(root, total_nodes);

        // Sort the geometry by the indices in index_to_geometry
        let geometry = index_to_geometry
            .into_iter()
            .map(|i| geometry[i].clone())
            .collect();

        log::debug!("bvh: {} nodes built", total_nodes);

        Self { geometry, tree }
    }

    fn build(
        geometry: &mut [GeometryInfo],
        index_to_geometry: &mut Vec<usize>,
        total_nodes: &mut usize,
    ) -> BuildNode {
        *total_nodes += 1;

        // Bounding box of all geometry in this node
        let bounds = geometry
            .iter()
            .fold(AABB::empty(), |b, g| b.union(g.bounds));

        if geometry.len() == 1 {
            return BVH::build_leaf(geometry, index_to_geometry, bounds);
        }

        // Box of the centroids, used to place the buckets
        let centroids = geometry
            .iter()
            .fold(AABB::empty(), |b, g| b.point_union(g.center));

        let split_axis = max_extent(&centroids);
        let spread = centroids.max.axis(split_axis) - centroids.min.axis(split_axis);

        // All centroids coincide on the split axis; an equal split keeps the
        // tree balanced instead of sorting on garbage
        if !(spread > f32::EPSILON) {
            if geometry.len() <= SPLIT_THRESHOLD {
                return BVH::build_leaf(geometry, index_to_geometry, bounds);
            }
            let mid = geometry.len() / 2;
            return BVH::build_interior(geometry, mid, index_to_geometry, total_nodes);
        }

        let bucket_of = |g: &GeometryInfo| {
            let b = ((g.center.axis(split_axis) - centroids.min.axis(split_axis)) / spread
                * BUCKETS as f32) as usize;
            b.min(BUCKETS - 1)
        };

        // SAH guided partitioning
        let mut buckets = [SAHBucket::default(); BUCKETS];
        for g in geometry.iter() {
            let bucket = &mut buckets[bucket_of(g)];
            bucket.count += 1;
            bucket.bounds = bucket.bounds.union(g.bounds);
        }

        let mut cost = [0.0f32; BUCKETS - 1];
        for (i, c) in cost.iter_mut().enumerate() {
            let left = buckets
                .iter()
                .take(i + 1)
                .fold(SAHBucket::default(), SAHBucket::merge);
            let right = buckets
                .iter()
                .skip(i + 1)
                .fold(SAHBucket::default(), SAHBucket::merge);

            *c = if left.count == 0 || right.count == 0 {
                f32::INFINITY
            } else {
                0.125
                    + (left.count as f32 * left.bounds.surface_area()
                        + right.count as f32 * right.bounds.surface_area())
                        / bounds.surface_area()
            };
        }

        let min_bucket = cost
            .iter()
            .position_min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .unwrap_or(0);
        let min_cost = cost[min_bucket];

        // Check if we should build an interior node based on cost and the split threshold
        if geometry.len() > SPLIT_THRESHOLD || min_cost < geometry.len() as f32 {
            // Partition the geometry into a half that fails the predicate and
            // a half that satisfies it, then find the boundary index
            geometry.sort_unstable_by_key(|g| bucket_of(g) <= min_bucket);
            let mut mid = geometry
                .iter()
                .position(|g| bucket_of(g) <= min_bucket)
                .unwrap_or(geometry.len() / 2);
            if mid == 0 || mid == geometry.len() {
                mid = geometry.len() / 2;
            }

            BVH::build_interior(geometry, mid, index_to_geometry, total_nodes)
        } else {
            BVH::build_leaf(geometry, index_to_geometry, bounds)
        }
    }

    fn build_interior(
        geometry: &mut [GeometryInfo],
        mid: usize,
        index_to_geometry: &mut Vec<usize>,
        total_nodes: &mut usize,
    ) -> BuildNode {
        let left = Box::new(BVH::build(&mut geometry[..mid], index_to_geometry, total_nodes));
        let right = Box::new(BVH::build(&mut geometry[mid..], index_to_geometry, total_nodes));

        BuildNode::interior(left, right)
    }

    fn build_leaf(
        geometry: &mut [GeometryInfo],
        index_to_geometry: &mut Vec<usize>,
        bounds: AABB,
    ) -> BuildNode {
        let geometry_offset = index_to_geometry.len();
        index_to_geometry.extend(geometry.iter().map(|g| g.index));

        BuildNode::leaf(bounds, geometry_offset, geometry.len())
    }

    fn flatten(root: BuildNode, size: usize) -> Vec<FlatNode> {
        let mut tree = Vec::with_capacity(size);
        Self::flatten_impl(root, &mut tree);

        tree
    }

    fn flatten_impl(node: BuildNode, tree: &mut Vec<FlatNode>) -> usize {
        let offset = tree.len();
        match node.inner {
            BuildNodeInner::Interior { left, right } => {
                tree.push(FlatNode::interior(node.bounds, 0, 0));
                let left_idx = Self::flatten_impl(*left, tree);
                let right_idx = Self::flatten_impl(*right, tree);
                match tree[offset].inner {
                    FlatNodeInner::Interior {
                        ref mut left,
                        ref mut right,
                    } => {
                        *left = left_idx;
                        *right = right_idx;
                    }
                    _ => unreachable!("interior placeholder was just pushed at this offset"),
                }
            }
            BuildNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            } => {
                tree.push(FlatNode::leaf(node.bounds, geometry_offset, num_primitives));
            }
        }

        offset
    }

    fn hit_node(&self, node: &FlatNode, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        if !node.bounds.hit(ray, t_min, t_max) {
            return None;
        }

        match node.inner {
            FlatNodeInner::Interior { left, right } => {
                let mut closest = t_max;
                let mut nearest = None;

                // The left subtree's hit tightens the window for the right
                if let Some(hit) = self
                    .tree
                    .get(left)
                    .and_then(|n| self.hit_node(n, ray, t_min, closest))
                {
                    closest = hit.t;
                    nearest = Some(hit);
                }
                if let Some(hit) = self
                    .tree
                    .get(right)
                    .and_then(|n| self.hit_node(n, ray, t_min, closest))
                {
                    nearest = Some(hit);
                }

                nearest
            }
            FlatNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            } => {
                let mut closest = t_max;
                let mut nearest = None;

                // Find the closest intersection
                for primitive in &self.geometry[geometry_offset..geometry_offset + num_primitives] {
                    if let Some(hit) = primitive.intersection(ray, t_min, closest) {
                        closest = hit.t;
                        nearest = Some(hit);
                    }
                }

                nearest
            }
        }
    }
}

impl Intersect for BVH {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.tree
            .first()
            .and_then(|node| self.hit_node(node, ray, t_min, t_max))
    }

    fn bounds(&self, _time0: f32, _time1: f32) -> Option<AABB> {
        self.tree.first().map(|node| node.bounds)
    }
}

struct GeometryInfo {
    index: usize,
    center: Vec3,
    bounds: AABB,
}

#[derive(Copy, Clone, Debug, Default)]
struct SAHBucket {
    count: usize,
    bounds: AABB,
}

impl SAHBucket {
    fn merge(mut self, other: &SAHBucket) -> Self {
        self.bounds = self.bounds.union(other.bounds);
        self.count += other.count;
        self
    }
}

#[derive(Debug)]
enum BuildNodeInner {
    Interior {
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
    Leaf {
        geometry_offset: usize,
        num_primitives: usize,
    },
}

#[derive(Debug)]
struct BuildNode {
    bounds: AABB,
    inner: BuildNodeInner,
}

impl BuildNode {
    fn interior(left: Box<BuildNode>, right: Box<BuildNode>) -> Self {
        let bounds = left.bounds.union(right.bounds);

        Self {
            bounds,
            inner: BuildNodeInner::Interior { left, right },
        }
    }

    fn leaf(bounds: AABB, geometry_offset: usize, num_primitives: usize) -> Self {
        Self {
            bounds,
            inner: BuildNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            },
        }
    }
}

#[derive(Debug)]
enum FlatNodeInner {
    Interior { left: usize, right: usize },
    Leaf {
        geometry_offset: usize,
        num_primitives: usize,
    },
}

#[derive(Debug)]
struct FlatNode {
    bounds: AABB,
    inner: FlatNodeInner,
}

impl FlatNode {
    fn interior(bounds: AABB, left: usize, right: usize) -> Self {
        Self {
            bounds,
            inner: FlatNodeInner::Interior { left, right },
        }
    }

    fn leaf(bounds: AABB, geometry_offset: usize, num_primitives: usize) -> Self {
        Self {
            bounds,
            inner: FlatNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        material::Lambertian,
        primitives::{PrimitiveList, Sphere},
        DefaultRng,
    };
    use glam::vec3;
    use rand::{Rng, SeedableRng};

    fn random_spheres(count: usize, seed: u64) -> Vec<Arc<dyn Intersect>> {
        let mut rng = DefaultRng::seed_from_u64(seed);
        let material = Arc::new(Lambertian::new(vec3(0.5, 0.5, 0.5)));

        (0..count)
            .map(|_| {
                let center = vec3(
                    rng.gen_range(-10.0, 10.0),
                    rng.gen_range(-10.0, 10.0),
                    rng.gen_range(-10.0, 10.0),
                );
                let radius = rng.gen_range(0.1, 1.0);
                Arc::new(Sphere::new(center, radius, material.clone())) as Arc<dyn Intersect>
            })
            .collect()
    }

    #[test]
    fn single_primitive_tree_hits() {
        let objects = vec![Arc::new(Sphere::new(
            vec3(0.0, 0.0, -5.0),
            1.0,
            Arc::new(Lambertian::new(vec3(0.5, 0.5, 0.5))),
        )) as Arc<dyn Intersect>];
        let bvh = BVH::new(objects, 0.0, 1.0);

        let ray = Ray::new(Vec3::zero(), vec3(0.0, 0.0, -1.0), 0.0);
        let hit = bvh.intersection(ray, 0.001, f32::INFINITY).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn traversal_matches_linear_search() {
        let objects = random_spheres(64, 7);

        let mut list = PrimitiveList::new();
        for object in &objects {
            list.push(object.clone());
        }
        let bvh = BVH::new(objects, 0.0, 1.0);

        let mut rng = DefaultRng::seed_from_u64(99);
        for _ in 0..500 {
            let origin = vec3(
                rng.gen_range(-15.0, 15.0),
                rng.gen_range(-15.0, 15.0),
                15.0,
            );
            let target = vec3(rng.gen_range(-10.0, 10.0), rng.gen_range(-10.0, 10.0), -10.0);
            let ray = Ray::new(origin, target - origin, 0.0);

            let linear = list.intersection(ray, 0.001, f32::INFINITY);
            let tree = bvh.intersection(ray, 0.001, f32::INFINITY);

            match (linear, tree) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    assert!((a.t - b.t).abs() < 1e-4);
                    assert!((a.point - b.point).length() < 1e-3);
                    assert!((a.normal - b.normal).length() < 1e-3);
                }
                (a, b) => panic!(
                    "bvh and linear search disagree: linear={:?} bvh={:?}",
                    a.map(|h| h.t),
                    b.map(|h| h.t)
                ),
            }
        }
    }

    #[test]
    fn root_bounds_contain_every_primitive() {
        let objects = random_spheres(32, 3);
        let member_bounds: Vec<AABB> = objects
            .iter()
            .map(|o| o.bounds(0.0, 1.0).unwrap())
            .collect();

        let bvh = BVH::new(objects, 0.0, 1.0);
        let root = bvh.bounds(0.0, 1.0).unwrap();

        for b in member_bounds {
            assert!(root.min.x() <= b.min.x() && root.max.x() >= b.max.x());
            assert!(root.min.y() <= b.min.y() && root.max.y() >= b.max.y());
            assert!(root.min.z() <= b.min.z() && root.max.z() >= b.max.z());
        }
    }

    #[test]
    fn grid_of_spheres_resolves_to_the_right_one() {
        let material = Arc::new(Lambertian::new(vec3(0.5, 0.5, 0.5)));
        let objects: Vec<Arc<dyn Intersect>> = (0..10)
            .map(|i| {
                Arc::new(Sphere::new(vec3(i as f32 * 3.0, 0.0, -5.0), 0.5, material.clone()))
                    as Arc<dyn Intersect>
            })
            .collect();
        let bvh = BVH::new(objects, 0.0, 1.0);

        let ray = Ray::new(vec3(6.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0), 0.0);
        let hit = bvh.intersection(ray, 0.001, f32::INFINITY).unwrap();

        assert!((hit.point.x() - 6.0).abs() < 1e-4);
        assert!((hit.point.z() - -4.5).abs() < 1e-4);
    }
}
