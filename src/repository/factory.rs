use crate::config::Mode;
use crate::error::Result;
use crate::registry::{GithubReleases, RemoteRegistries};
use crate::repository::{ImagePinner, TagLister};
use std::sync::Arc;

pub struct RegistryFactory;

impl RegistryFactory {
    /// Builds the tag lister and pinner used for the given extraction mode.
    pub fn create(mode: Mode) -> Result<(Arc<dyn TagLister>, Arc<dyn ImagePinner>)> {
        let registries = Arc::new(RemoteRegistries::new()?);
        let tags: Arc<dyn TagLister> = match mode {
            Mode::Images => registries.clone(),
            Mode::ReleaseUrls => Arc::new(GithubReleases::new()?),
        };
        Ok((tags, registries))
    }
}
