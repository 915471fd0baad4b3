//! Declarative scene descriptions and their validated, render-ready form.
//!
//! A scene document is a TOML file with a `[camera]` table, an optional
//! `[background]` table and a list of `[[objects]]`, each tagged with a
//! `type` and carrying a nested `material` table. Everything malformed or
//! geometrically degenerate is rejected here, before any pixel work begins;
//! numeric edge cases at trace time are handled by the primitives themselves.

use crate::{
    bvh::BVH,
    camera::Camera,
    material::{Dielectric, DiffuseLight, Lambertian, Material, Metal},
    primitives::{AxisBox, AxisRect, Intersect, MovingSphere, Plane, Sphere},
    render::RenderSettings,
};
use anyhow::{ensure, Context, Result};
use glam::{vec3, Vec3};
use rand::Rng;
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};

/// Recursion budget used when the description does not name one.
const DEFAULT_MAX_DEPTH: u32 = 50;

/// What a ray that leaves the scene sees.
#[derive(Clone, Copy, Debug)]
pub enum Background {
    Solid(Vec3),
    /// Vertical blend over the ray direction, `bottom` below to `top` above.
    Gradient { top: Vec3, bottom: Vec3 },
}

impl Background {
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        match *self {
            Background::Solid(color) => color,
            Background::Gradient { top, bottom } => {
                let t = 0.5 * (direction.normalize().y() + 1.0);
                (1.0 - t) * bottom + t * top
            }
        }
    }
}

/// A fully constructed scene: everything the render driver needs, immutable
/// for the rest of the process.
pub struct Scene {
    pub camera: Camera,
    pub root: BVH,
    pub background: Background,
    pub settings: RenderSettings,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("camera", &self.camera)
            .field("background", &self.background)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Read and build a scene from a TOML description file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene description {:?}", path))?;
        let desc: SceneDesc = toml::from_str(&text)
            .with_context(|| format!("failed to parse scene description {:?}", path))?;

        Self::from_desc(&desc)
    }

    pub fn from_desc(desc: &SceneDesc) -> Result<Self> {
        let (camera, settings) = build_camera(&desc.camera)?;

        ensure!(!desc.objects.is_empty(), "scene contains no objects");
        let objects = desc
            .objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                build_object(object, desc.camera.time0, desc.camera.time1)
                    .with_context(|| format!("object #{} is invalid", i))
            })
            .collect::<Result<Vec<_>>>()?;

        let root = BVH::new(objects, desc.camera.time0, desc.camera.time1);

        let background = match &desc.background {
            // The classic white-to-blue sky
            None => Background::Gradient {
                top: vec3(0.5, 0.7, 1.0),
                bottom: vec3(1.0, 1.0, 1.0),
            },
            Some(BackgroundDesc::Solid { color }) => {
                Background::Solid(finite_color(*color, "background color")?)
            }
            Some(BackgroundDesc::Gradient { top, bottom }) => Background::Gradient {
                top: finite_color(*top, "background top color")?,
                bottom: finite_color(*bottom, "background bottom color")?,
            },
        };

        Ok(Self {
            camera,
            root,
            background,
            settings,
        })
    }
}

/// Root of the declarative scene document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDesc {
    pub camera: CameraDesc,
    pub background: Option<BackgroundDesc>,
    #[serde(default)]
    pub objects: Vec<ObjectDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraDesc {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    #[serde(default = "default_vup")]
    pub vup: [f32; 3],
    /// Vertical field of view in degrees.
    pub vfov: f32,
    pub aspect_ratio: f32,
    #[serde(default)]
    pub aperture: f32,
    /// Defaults to the distance between `look_from` and `look_at`.
    pub focus_dist: Option<f32>,
    pub image_width: u32,
    pub samples_per_pixel: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub time0: f32,
    #[serde(default)]
    pub time1: f32,
    /// Fixing the seed makes the render reproducible.
    pub seed: Option<u64>,
}

fn default_vup() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundDesc {
    Solid { color: [f32; 3] },
    Gradient { top: [f32; 3], bottom: [f32; 3] },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDesc {
    Sphere {
        center: [f32; 3],
        radius: f32,
        material: MaterialDesc,
    },
    /// A sphere translating linearly over the camera shutter interval.
    MovingSphere {
        center0: [f32; 3],
        center1: [f32; 3],
        radius: f32,
        material: MaterialDesc,
    },
    XyRectangle {
        x0: f32,
        x1: f32,
        y0: f32,
        y1: f32,
        k: f32,
        material: MaterialDesc,
    },
    XzRectangle {
        x0: f32,
        x1: f32,
        z0: f32,
        z1: f32,
        k: f32,
        material: MaterialDesc,
    },
    YzRectangle {
        y0: f32,
        y1: f32,
        z0: f32,
        z1: f32,
        k: f32,
        material: MaterialDesc,
    },
    Box {
        min: [f32; 3],
        max: [f32; 3],
        material: MaterialDesc,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialDesc {
    Diffuse {
        albedo: [f32; 3],
    },
    Metal {
        albedo: [f32; 3],
        #[serde(default)]
        fuzz: f32,
    },
    Dielectric {
        refraction_index: f32,
    },
    DiffuseLight {
        emit: [f32; 3],
    },
}

fn build_camera(desc: &CameraDesc) -> Result<(Camera, RenderSettings)> {
    let look_from = finite_vec3(desc.look_from, "camera look_from")?;
    let look_at = finite_vec3(desc.look_at, "camera look_at")?;
    let vup = finite_vec3(desc.vup, "camera vup")?;

    ensure!(
        desc.vfov.is_finite() && desc.vfov > 0.0 && desc.vfov < 180.0,
        "camera vfov must lie in (0, 180) degrees, got {}",
        desc.vfov
    );
    ensure!(
        desc.aspect_ratio.is_finite() && desc.aspect_ratio > 0.0,
        "camera aspect_ratio must be positive, got {}",
        desc.aspect_ratio
    );
    ensure!(
        desc.aperture.is_finite() && desc.aperture >= 0.0,
        "camera aperture must be non-negative, got {}",
        desc.aperture
    );

    let view = look_from - look_at;
    ensure!(
        view.length_squared() > 0.0,
        "camera look_from and look_at coincide"
    );
    ensure!(
        vup.cross(view).length_squared() > 1e-12,
        "camera vup is parallel to the view direction"
    );

    let focus_dist = desc.focus_dist.unwrap_or_else(|| view.length());
    ensure!(
        focus_dist.is_finite() && focus_dist > 0.0,
        "camera focus_dist must be positive, got {}",
        focus_dist
    );

    ensure!(
        desc.time0.is_finite() && desc.time1.is_finite() && desc.time1 >= desc.time0,
        "camera shutter interval is reversed: [{}, {}]",
        desc.time0,
        desc.time1
    );

    ensure!(desc.image_width > 0, "image_width must be at least one pixel");
    ensure!(
        desc.samples_per_pixel > 0,
        "samples_per_pixel must be at least one"
    );
    ensure!(desc.max_depth > 0, "max_depth must be at least one");

    let camera = Camera::new(
        look_from,
        look_at,
        vup,
        desc.vfov,
        desc.aspect_ratio,
        desc.aperture,
        focus_dist,
        desc.time0,
        desc.time1,
    );
    let settings = RenderSettings {
        width: desc.image_width,
        height: ((desc.image_width as f32 / desc.aspect_ratio) as u32).max(1),
        samples_per_pixel: desc.samples_per_pixel,
        max_depth: desc.max_depth,
        seed: desc.seed.unwrap_or_else(|| rand::thread_rng().gen()),
    };

    Ok((camera, settings))
}

fn build_object(desc: &ObjectDesc, time0: f32, time1: f32) -> Result<Arc<dyn Intersect>> {
    match desc {
        ObjectDesc::Sphere {
            center,
            radius,
            material,
        } => {
            let center = finite_vec3(*center, "sphere center")?;
            ensure!(
                radius.is_finite() && *radius > 0.0,
                "sphere radius must be positive, got {}",
                radius
            );

            Ok(Arc::new(Sphere::new(
                center,
                *radius,
                build_material(material)?,
            )))
        }
        ObjectDesc::MovingSphere {
            center0,
            center1,
            radius,
            material,
        } => {
            let center0 = finite_vec3(*center0, "moving sphere center0")?;
            let center1 = finite_vec3(*center1, "moving sphere center1")?;
            ensure!(
                radius.is_finite() && *radius > 0.0,
                "moving sphere radius must be positive, got {}",
                radius
            );

            Ok(Arc::new(MovingSphere::new(
                center0,
                center1,
                time0,
                time1,
                *radius,
                build_material(material)?,
            )))
        }
        ObjectDesc::XyRectangle {
            x0,
            x1,
            y0,
            y1,
            k,
            material,
        } => build_rect(Plane::Xy, [*x0, *x1, *y0, *y1, *k], material),
        ObjectDesc::XzRectangle {
            x0,
            x1,
            z0,
            z1,
            k,
            material,
        } => build_rect(Plane::Xz, [*x0, *x1, *z0, *z1, *k], material),
        ObjectDesc::YzRectangle {
            y0,
            y1,
            z0,
            z1,
            k,
            material,
        } => build_rect(Plane::Yz, [*y0, *y1, *z0, *z1, *k], material),
        ObjectDesc::Box { min, max, material } => {
            let min = finite_vec3(*min, "box min corner")?;
            let max = finite_vec3(*max, "box max corner")?;
            ensure!(
                min.x() < max.x() && min.y() < max.y() && min.z() < max.z(),
                "box corners must span a volume on every axis"
            );

            Ok(Arc::new(AxisBox::new(min, max, build_material(material)?)))
        }
    }
}

fn build_rect(
    plane: Plane,
    params: [f32; 5],
    material: &MaterialDesc,
) -> Result<Arc<dyn Intersect>> {
    ensure!(
        params.iter().all(|p| p.is_finite()),
        "rectangle parameters must be finite, got {:?}",
        params
    );
    let [a0, a1, b0, b1, k] = params;
    ensure!(
        (a1 - a0).abs() > 0.0 && (b1 - b0).abs() > 0.0,
        "rectangle spans must have nonzero extent"
    );

    Ok(Arc::new(AxisRect::new(
        plane,
        a0,
        a1,
        b0,
        b1,
        k,
        build_material(material)?,
    )))
}

fn build_material(desc: &MaterialDesc) -> Result<Arc<dyn Material>> {
    match desc {
        MaterialDesc::Diffuse { albedo } => Ok(Arc::new(Lambertian::new(albedo_color(
            *albedo,
            "diffuse albedo",
        )?))),
        MaterialDesc::Metal { albedo, fuzz } => {
            ensure!(
                fuzz.is_finite() && *fuzz >= 0.0,
                "metal fuzz must be non-negative, got {}",
                fuzz
            );

            Ok(Arc::new(Metal::new(
                albedo_color(*albedo, "metal albedo")?,
                *fuzz,
            )))
        }
        MaterialDesc::Dielectric { refraction_index } => {
            ensure!(
                refraction_index.is_finite() && *refraction_index > 0.0,
                "refraction index must be positive, got {}",
                refraction_index
            );

            Ok(Arc::new(Dielectric::new(*refraction_index)))
        }
        MaterialDesc::DiffuseLight { emit } => Ok(Arc::new(DiffuseLight::new(finite_color(
            *emit,
            "light emission",
        )?))),
    }
}

fn finite_vec3(v: [f32; 3], what: &str) -> Result<Vec3> {
    ensure!(
        v.iter().all(|c| c.is_finite()),
        "{} must be finite, got {:?}",
        what,
        v
    );

    Ok(vec3(v[0], v[1], v[2]))
}

// Non-negative and finite; emission may exceed one
fn finite_color(v: [f32; 3], what: &str) -> Result<Vec3> {
    let color = finite_vec3(v, what)?;
    ensure!(
        v.iter().all(|c| *c >= 0.0),
        "{} components must be non-negative, got {:?}",
        what,
        v
    );

    Ok(color)
}

// Reflectance: every channel in [0, 1]
fn albedo_color(v: [f32; 3], what: &str) -> Result<Vec3> {
    let color = finite_color(v, what)?;
    ensure!(
        v.iter().all(|c| *c <= 1.0),
        "{} components must lie in [0, 1], got {:?}",
        what,
        v
    );

    Ok(color)
}
