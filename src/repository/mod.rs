use crate::error::Result;
use std::fmt;

pub mod factory;
pub use factory::RegistryFactory;

/// A trackable reference found in a Dockerfile.
///
/// `path` is an image coordinate (`alpine`, `ghcr.io/org/app`) or, for
/// release downloads, `github.com/<owner>/<repo>`. `version` is kept exactly
/// as written: a tag, `latest`, a `sha256:` digest or an interpolated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub path: String,
    pub version: String,
}

impl Dependency {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// A pending version change. `previous` and `next` are the literal strings
/// from the file and the registry, never their normalized forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub path: String,
    pub previous: String,
    pub next: String,
}

pub trait TagLister: Send + Sync {
    /// Lists every tag published for a dependency path.
    fn tags(&self, path: &str) -> Result<Vec<String>>;
}

pub trait ImagePinner: Send + Sync {
    /// Resolves `image:tag` to the content digest of its manifest.
    fn pin(&self, image: &str) -> Result<String>;

    /// Finds the tag of `image` whose manifest has the given digest.
    fn unpin(&self, image: &str, digest: &str) -> Result<String>;
}
