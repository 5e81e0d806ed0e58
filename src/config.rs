use crate::error::Result;
use crate::utils::{PathFilter, PathValidator};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// What the updater extracts from Dockerfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Base images referenced by FROM instructions
    #[default]
    Images,
    /// GitHub release downloads inside RUN instructions
    ReleaseUrls,
}

/// Resolved settings handed to the updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub root: PathBuf,
    pub ignore: Vec<String>,
    pub sha_pinning: bool,
    pub mode: Mode,
}

impl UpdaterConfig {
    pub fn new(root: impl AsRef<Path>, ignore: Vec<String>, sha_pinning: bool, mode: Mode) -> Result<Self> {
        Ok(Self {
            root: PathValidator::validate_root(root)?,
            ignore,
            sha_pinning,
            mode,
        })
    }

    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.ignore)
    }

    /// Digest pinning only applies to image references.
    pub fn pins_images(&self) -> bool {
        self.sha_pinning && self.mode == Mode::Images
    }
}
