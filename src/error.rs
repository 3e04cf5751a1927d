/// Shader stage a compile error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Everything that can go wrong while building the pipeline.
/// Per-frame draws never return errors, mismatched state there is caught by debug assertions.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile: {message}")]
    ShaderCompile { stage: ShaderStage, message: String },

    #[error("shader program failed to link: {0}")]
    ShaderLink(String),

    #[error("program for adaptor `{adaptor}` does not declare uniform `{name}`")]
    MissingUniform { adaptor: &'static str, name: String },

    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid texture: {0}")]
    InvalidTexture(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid light setup: {0}")]
    InvalidLight(String),

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("asset `{path}` not found")]
    AssetNotFound { path: String },

    #[error("asset io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("obj parsing failed: {0}")]
    Obj(#[from] obj::ObjError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
