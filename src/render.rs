//! The recursive integrator and the pixel-loop render driver.

use crate::{
    primitives::Intersect,
    ray::Ray,
    scene::{Background, Scene},
    DefaultRng,
};
use glam::Vec3;
use rand::prelude::*;
use rayon::prelude::*;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// Lower edge of the valid hit window; avoids self-intersection acne at the
/// scattering origin.
const T_MIN: f32 = 1e-4;

const GAMMA: f32 = 2.2;

const COLOR_CHANNELS: usize = 3;

/// Settings of the render driver, derived from the scene description.
#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub max_depth: u32,
    pub seed: u64,
}

// Computes the color of a pixel sample based on a ray.
//
// Each bounce adds the emission at the hit point and attenuates whatever the
// scattered ray goes on to collect; `depth` is a hard budget against endless
// bounce chains.
pub fn color(
    ray: Ray,
    world: &dyn Intersect,
    background: &Background,
    depth: u32,
    rays: &mut u64,
    rng: &mut DefaultRng,
) -> Vec3 {
    // Energy budget exhausted
    if depth == 0 {
        return Vec3::zero();
    }

    *rays += 1;

    if let Some(hit) = world.intersection(ray, T_MIN, f32::INFINITY) {
        let emitted = hit.material.emitted(hit.u, hit.v, hit.point);

        // The material of the object we hit decides how the ray scatters
        if let Some(scatter) = hit.material.scatter(ray, &hit, rng) {
            emitted
                + scatter.attenuation
                    * color(scatter.scattered, world, background, depth - 1, rays, rng)
        } else {
            emitted
        }
    } else {
        background.sample(ray.direction)
    }
}

// splitmix-style mix so neighbouring rows land on unrelated streams
fn row_seed(seed: u64, row: u64) -> u64 {
    let mut z = seed ^ row.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Renders the scene into gamma-corrected RGB triples in `[0, 1]`, rows
/// ordered top to bottom.
///
/// Rows are traced in parallel; each row runs its own RNG stream derived from
/// the render seed, so a fixed seed reproduces the image exactly.
pub fn render(scene: &Scene) -> Vec<f32> {
    let RenderSettings {
        width,
        height,
        samples_per_pixel,
        max_depth,
        seed,
    } = scene.settings;

    let mut buffer = vec![0.0f32; width as usize * height as usize * COLOR_CHANNELS];
    let global_ray_count = AtomicU64::new(0);
    let start = Instant::now();

    buffer
        .par_chunks_mut(width as usize * COLOR_CHANNELS)
        .rev()
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = DefaultRng::seed_from_u64(row_seed(seed, y as u64));
            let mut ray_count = 0u64;

            row.chunks_mut(COLOR_CHANNELS)
                .enumerate()
                .for_each(|(x, pixel)| {
                    let mut out = Vec3::zero();

                    // Antialiasing via multisampling
                    for _ in 0..samples_per_pixel {
                        let s = (x as f32 + rng.gen::<f32>()) / width as f32;
                        let t = (y as f32 + rng.gen::<f32>()) / height as f32;

                        let ray = scene.camera.ray(s, t, &mut rng);
                        out += color(
                            ray,
                            &scene.root,
                            &scene.background,
                            max_depth,
                            &mut ray_count,
                            &mut rng,
                        );
                    }

                    out /= samples_per_pixel as f32;

                    // Gamma correct and clamp into the writer's range
                    pixel[0] = out.x().max(0.0).min(1.0).powf(1.0 / GAMMA);
                    pixel[1] = out.y().max(0.0).min(1.0).powf(1.0 / GAMMA);
                    pixel[2] = out.z().max(0.0).min(1.0).powf(1.0 / GAMMA);
                });

            global_ray_count.fetch_add(ray_count, Ordering::Relaxed);
        });

    let duration = start.elapsed();
    let rays = global_ray_count.load(Ordering::Relaxed) as f64 / 1_000_000.0;
    log::info!(
        "rendered {}x{} at {} spp in {:.2?} ({:.2}M rays, {:.2}M rays/s)",
        width,
        height,
        samples_per_pixel,
        duration,
        rays,
        rays / duration.as_secs_f64().max(f64::EPSILON),
    );

    buffer
}

/// Quantize driver output for an 8-bit-per-channel image writer.
pub fn to_rgb8(pixels: &[f32]) -> Vec<u8> {
    pixels.iter().map(|&c| (255.99 * c) as u8).collect()
}
