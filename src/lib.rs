//! An offline, physically inspired path tracer.
//!
//! A scene (shapes, materials, camera, background) is loaded from a TOML
//! description, bundled into a BVH, and rendered by stochastic per-pixel
//! sampling. See [`scene::Scene`] for the entry point and [`render::render`]
//! for the driver.

pub mod bvh;
pub mod camera;
pub mod material;
pub mod primitives;
pub mod ray;
pub mod render;
pub mod scene;

/// The RNG used for all sampling decisions.
pub type DefaultRng = rand_xoshiro::Xoshiro256Plus;
