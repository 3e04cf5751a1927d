//! Asset collaborator: turns logical paths into shader text, decoded images and meshes.
//!
//! The render core never touches files, it only receives the `SceneAssets` bundle.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::error::{RenderError, Result};
use crate::mesh::MeshData;

pub const MAIN_VERTEX: &str = "vertex_shader.glsl";
pub const MAIN_FRAGMENT: &str = "fragment_shader.glsl";
pub const SKYBOX_VERTEX: &str = "skybox/skybox_vertex.glsl";
pub const SKYBOX_FRAGMENT: &str = "skybox/skybox_fragment.glsl";
pub const LIGHT_VERTEX: &str = "shape/vertex_shader_light.glsl";
pub const LIGHT_FRAGMENT: &str = "shape/fragment_shader_light.glsl";
pub const SHAPE_MESH: &str = "shape/ponchik.obj";
pub const SHAPE_TEXTURE: &str = "shape/texture.png";
pub const SHAPE_NORMAL_MAP: &str = "shape/normal_tex_smooth.png";
/// Cubemap faces in +x, -x, +y, -y, +z, -z order.
pub const SKYBOX_FACES: [&str; 6] = [
    "skybox/right.jpg",
    "skybox/left.jpg",
    "skybox/top.jpg",
    "skybox/bottom.jpg",
    "skybox/front.jpg",
    "skybox/back.jpg",
];

/// Shader sources compiled into the binary.
pub fn builtin_shader(path: &str) -> Option<&'static str> {
    return match path {
        MAIN_VERTEX => Some(include_str!("../assets/vertex_shader.glsl")),
        MAIN_FRAGMENT => Some(include_str!("../assets/fragment_shader.glsl")),
        SKYBOX_VERTEX => Some(include_str!("../assets/skybox/skybox_vertex.glsl")),
        SKYBOX_FRAGMENT => Some(include_str!("../assets/skybox/skybox_fragment.glsl")),
        LIGHT_VERTEX => Some(include_str!("../assets/shape/vertex_shader_light.glsl")),
        LIGHT_FRAGMENT => Some(include_str!("../assets/shape/fragment_shader_light.glsl")),
        _ => None,
    };
}

pub trait AssetLoader {
    fn shader_source(&self, path: &str) -> Result<String>;
    fn image(&self, path: &str) -> Result<RgbaImage>;
    fn mesh(&self, path: &str) -> Result<MeshData>;
}

/// Loads from a directory, optionally deferring missing files to another loader.
pub struct FsAssetLoader {
    root: PathBuf,
    fallback: Option<Box<dyn AssetLoader>>,
}

impl FsAssetLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        return Self {
            root: root.as_ref().to_path_buf(),
            fallback: None,
        };
    }

    pub fn with_fallback(mut self, fallback: Box<dyn AssetLoader>) -> Self {
        self.fallback = Some(fallback);
        return self;
    }

    fn resolve(&self, path: &str) -> PathBuf {
        return self.root.join(path.trim_start_matches('/'));
    }

    /// Runs `load` on the resolved file, or the fallback's `fallback` when the file is missing.
    fn load_or_fallback<T>(
        &self,
        path: &str,
        load: impl FnOnce(&Path) -> Result<T>,
        fallback: impl FnOnce(&dyn AssetLoader) -> Result<T>,
    ) -> Result<T> {
        let full_path = self.resolve(path);
        if full_path.is_file() {
            log::trace!("loading {}", full_path.display());
            return load(&full_path);
        }
        return match &self.fallback {
            Some(loader) => {
                log::warn!("{} not found, using fallback asset", full_path.display());
                fallback(loader.as_ref())
            }
            None => Err(RenderError::AssetNotFound {
                path: full_path.display().to_string(),
            }),
        };
    }
}

impl AssetLoader for FsAssetLoader {
    fn shader_source(&self, path: &str) -> Result<String> {
        return self.load_or_fallback(
            path,
            |file| Ok(std::fs::read_to_string(file)?),
            |loader| loader.shader_source(path),
        );
    }

    fn image(&self, path: &str) -> Result<RgbaImage> {
        return self.load_or_fallback(
            path,
            |file| {
                let image = image::io::Reader::open(file)?.with_guessed_format()?.decode()?;
                Ok(image.to_rgba8())
            },
            |loader| loader.image(path),
        );
    }

    fn mesh(&self, path: &str) -> Result<MeshData> {
        return self.load_or_fallback(
            path,
            |file| MeshData::from_obj_reader(BufReader::new(File::open(file)?)),
            |loader| loader.mesh(path),
        );
    }
}

/// Assets that need no files: embedded shaders and procedural textures and meshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAssets;

impl BuiltinAssets {
    fn checker(size: u32, cell: u32, a: Rgba<u8>, b: Rgba<u8>) -> RgbaImage {
        return RgbaImage::from_fn(size, size, |x, y| if (x / cell + y / cell) % 2 == 0 { a } else { b });
    }

    /// Vertical gradient from a face specific horizon color to a pale zenith.
    fn sky_face(face: usize) -> RgbaImage {
        let tints: [[u8; 3]; 6] = [
            [90, 140, 200],
            [80, 130, 190],
            [150, 190, 235],
            [60, 70, 90],
            [100, 150, 210],
            [70, 120, 180],
        ];
        let size = 64;
        let tint = tints[face];
        return RgbaImage::from_fn(size, size, |_, y| {
            let t = y as f32 / (size - 1) as f32;
            let channel = |c: u8| (c as f32 * (0.6 + 0.4 * t)).round() as u8;
            Rgba([channel(tint[0]), channel(tint[1]), channel(tint[2]), 255])
        });
    }
}

impl AssetLoader for BuiltinAssets {
    fn shader_source(&self, path: &str) -> Result<String> {
        return builtin_shader(path)
            .map(String::from)
            .ok_or_else(|| RenderError::AssetNotFound { path: path.to_string() });
    }

    fn image(&self, path: &str) -> Result<RgbaImage> {
        if path == SHAPE_TEXTURE {
            return Ok(Self::checker(64, 8, Rgba([230, 170, 110, 255]), Rgba([200, 90, 150, 255])));
        }
        if path == SHAPE_NORMAL_MAP {
            // Straight up in tangent space.
            return Ok(RgbaImage::from_pixel(4, 4, Rgba([128, 128, 255, 255])));
        }
        if let Some(face) = SKYBOX_FACES.iter().position(|face| *face == path) {
            return Ok(Self::sky_face(face));
        }
        return Err(RenderError::AssetNotFound { path: path.to_string() });
    }

    fn mesh(&self, path: &str) -> Result<MeshData> {
        if path == SHAPE_MESH {
            return Ok(MeshData::torus(1.0, 0.4, 48, 24));
        }
        return Err(RenderError::AssetNotFound { path: path.to_string() });
    }
}

/// Everything the demo frame is built from.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub main_vertex: String,
    pub main_fragment: String,
    pub skybox_vertex: String,
    pub skybox_fragment: String,
    pub light_vertex: String,
    pub light_fragment: String,
    pub shape_mesh: MeshData,
    pub shape_texture: RgbaImage,
    pub shape_normal_map: Option<RgbaImage>,
    pub skybox_faces: [RgbaImage; 6],
}

impl SceneAssets {
    pub fn load(loader: &dyn AssetLoader) -> Result<Self> {
        let faces: Vec<RgbaImage> = SKYBOX_FACES
            .iter()
            .map(|path| loader.image(path))
            .collect::<Result<_>>()?;
        let skybox_faces: [RgbaImage; 6] = faces.try_into().map_err(|_| {
            RenderError::Io(io::Error::new(io::ErrorKind::InvalidData, "expected six skybox faces"))
        })?;

        let assets = Self {
            main_vertex: loader.shader_source(MAIN_VERTEX)?,
            main_fragment: loader.shader_source(MAIN_FRAGMENT)?,
            skybox_vertex: loader.shader_source(SKYBOX_VERTEX)?,
            skybox_fragment: loader.shader_source(SKYBOX_FRAGMENT)?,
            light_vertex: loader.shader_source(LIGHT_VERTEX)?,
            light_fragment: loader.shader_source(LIGHT_FRAGMENT)?,
            shape_mesh: loader.mesh(SHAPE_MESH)?,
            shape_texture: loader.image(SHAPE_TEXTURE)?,
            shape_normal_map: Some(loader.image(SHAPE_NORMAL_MAP)?),
            skybox_faces,
        };
        log::info!(
            "scene assets loaded: {} vertices, {} triangles",
            assets.shape_mesh.vertices.len(),
            assets.shape_mesh.triangle_count()
        );
        return Ok(assets);
    }

    /// The asset set without touching the filesystem.
    pub fn builtin() -> Result<Self> {
        return Self::load(&BuiltinAssets);
    }
}
