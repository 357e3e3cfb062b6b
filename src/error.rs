use thiserror::Error;

/// Failures that stop the director from starting or running.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("container element #{0} not found in the page")]
    MissingContainer(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("host initialization failed: {0}")]
    Host(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failures while fetching or decoding one of the two scene assets.
///
/// These never abort the scene; the affected object is simply not added.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("{0} cannot be fetched by this host")]
    UnsupportedSource(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("malformed font description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid font: {0}")]
    Font(String),
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("unusable model: {0}")]
    Model(String),
}

/// Failures reported by a render surface.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Surface(String),
}
