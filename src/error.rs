use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockupError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Parsing dockerfile {path:?} failed: {message}")]
    DockerfileParse { path: PathBuf, message: String },

    #[error("Querying registry failed: {0}")]
    RegistryQuery(String),

    #[error("Unpinning {image:?} failed: {message}")]
    Unpin { image: String, message: String },

    #[error("could not resolve {0:?}")]
    UnresolvablePlatform(String),

    #[error("Invalid image name: {0}")]
    InvalidImage(String),

    #[error("Walking {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<DockupError>,
    },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Walking filesystem failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl DockupError {
    /// Qualifies an error with the file it was raised for.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // parse errors already carry their path
            err @ DockupError::DockerfileParse { .. } => err,
            err => DockupError::File {
                path: path.into(),
                source: Box::new(err),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, DockupError>;
