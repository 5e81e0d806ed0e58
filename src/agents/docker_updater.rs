use crate::agents::dependency_extractor::DependencyExtractor;
use crate::agents::patch_applier::PatchApplier;
use crate::agents::update_checker::{Accept, UpdateChecker};
use crate::config::{Mode, UpdaterConfig};
use crate::dockerfile::walk_dockerfiles;
use crate::error::{DockupError, Result};
use crate::repository::{Dependency, ImagePinner, RegistryFactory, TagLister, Update};
use crate::utils::PathFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// DockerUpdater finds, checks and rewrites Dockerfile dependencies below a root
pub struct DockerUpdater {
    root: PathBuf,
    path_filter: PathFilter,
    mode: Mode,
    pin_image_sha: bool,
    extractor: DependencyExtractor,
    tags: Arc<dyn TagLister>,
    pinner: Arc<dyn ImagePinner>,
}

impl DockerUpdater {
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let (tags, pinner) = RegistryFactory::create(config.mode)?;
        Self::with_clients(config, tags, pinner)
    }

    pub fn with_clients(
        config: &UpdaterConfig,
        tags: Arc<dyn TagLister>,
        pinner: Arc<dyn ImagePinner>,
    ) -> Result<Self> {
        Ok(Self {
            root: config.root.clone(),
            path_filter: config.path_filter()?,
            mode: config.mode,
            pin_image_sha: config.pins_images(),
            extractor: DependencyExtractor::new(config.mode),
            tags,
            pinner,
        })
    }

    pub fn name(&self) -> &'static str {
        match self.mode {
            Mode::Images => "docker",
            Mode::ReleaseUrls => "dockerurl",
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collects dependencies from every Dockerfile below the root.
    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        let mut deps = Vec::new();
        walk_dockerfiles(&self.root, &self.path_filter, |_, tree| {
            deps.extend(self.extractor.extract(tree));
            Ok(())
        })?;
        Ok(deps)
    }

    pub fn check(&self, dependency: &Dependency, accept: Option<Accept<'_>>) -> Result<Option<Update>> {
        let pinner = self.pin_image_sha.then_some(self.pinner.as_ref());
        UpdateChecker::new(self.tags.as_ref(), pinner).check(dependency, accept)
    }

    /// Rewrites every Dockerfile that references the update and returns the
    /// paths that changed.
    pub fn apply_update(&self, update: &Update) -> Result<Vec<PathBuf>> {
        let pinned = if self.pin_image_sha {
            let image = format!("{}:{}", update.path, update.next);
            let digest = self.pinner.pin(&image).map_err(|err| match err {
                err @ DockupError::UnresolvablePlatform(_) => err,
                err => DockupError::RegistryQuery(format!("pinning image {image}: {err}")),
            })?;
            Some(digest)
        } else {
            None
        };

        let applier = PatchApplier::new(update, self.mode, pinned.as_deref());
        let mut changed = Vec::new();
        walk_dockerfiles(&self.root, &self.path_filter, |path, tree| {
            let replacements = applier.replacements(tree);
            if replacements.is_empty() {
                return Ok(());
            }

            let rewritten = replacements.apply();
            if rewritten != tree.content() {
                fs::write(path, rewritten)?;
                tracing::info!(
                    path = %path.display(),
                    dependency = %update.path,
                    previous = %update.previous,
                    next = %update.next,
                    "updated dockerfile"
                );
                changed.push(path.to_path_buf());
            }
            Ok(())
        })?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::update_checker::tests::{DIGEST, FakeRegistry};
    use tempfile::tempdir;

    const NEXT_DIGEST: &str =
        "sha256:fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

    fn updater(root: &Path, registry: FakeRegistry, sha_pinning: bool) -> DockerUpdater {
        let config = UpdaterConfig::new(root, vec!["ignored".to_string()], sha_pinning, Mode::Images).unwrap();
        let registry = Arc::new(registry);
        DockerUpdater::with_clients(&config, registry.clone(), registry).unwrap()
    }

    #[test]
    fn round_trips_a_tagged_image() {
        let dir = tempdir().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, "# base\nFROM alpine:1.2.3\n\nCMD [\"sh\"]\n").unwrap();
        fs::create_dir(dir.path().join("ignored")).unwrap();
        fs::write(dir.path().join("ignored/Dockerfile"), "FROM alpine:1.2.3\n").unwrap();

        let registry = FakeRegistry::with_tags("alpine", &["1.2.3", "1.3.0", "1.3.0-rc1", "20230101"]);
        let updater = updater(dir.path(), registry, false);

        let deps = updater.dependencies().unwrap();
        assert_eq!(deps, vec![Dependency::new("alpine", "1.2.3")]);

        let update = updater.check(&deps[0], None).unwrap().unwrap();
        assert_eq!(update.next, "1.3.0");

        let changed = updater.apply_update(&update).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(
            fs::read_to_string(&dockerfile).unwrap(),
            "# base\nFROM alpine:1.3.0\n\nCMD [\"sh\"]\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("ignored/Dockerfile")).unwrap(),
            "FROM alpine:1.2.3\n"
        );
    }

    #[test]
    fn unmatched_updates_leave_files_alone() {
        let dir = tempdir().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine:1.2.3\n").unwrap();

        let updater = updater(dir.path(), FakeRegistry::default(), false);
        let update = Update {
            path: "golang".to_string(),
            previous: "1.21.0".to_string(),
            next: "1.22.0".to_string(),
        };
        assert!(updater.apply_update(&update).unwrap().is_empty());
        assert_eq!(fs::read_to_string(&dockerfile).unwrap(), "FROM alpine:1.2.3\n");
    }

    #[test]
    fn pinned_images_round_trip_through_digests() {
        let dir = tempdir().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, format!("FROM alpine@{DIGEST}\n")).unwrap();

        let registry = FakeRegistry::with_tags("alpine", &["3.18.0", "3.19.0"])
            .with_digest("alpine:3.18.0", DIGEST)
            .with_digest("alpine:3.19.0", NEXT_DIGEST);
        let updater = updater(dir.path(), registry, true);

        let deps = updater.dependencies().unwrap();
        let update = updater.check(&deps[0], None).unwrap().unwrap();
        assert_eq!(update.previous, DIGEST);
        assert_eq!(update.next, "3.19.0");

        updater.apply_update(&update).unwrap();
        assert_eq!(
            fs::read_to_string(&dockerfile).unwrap(),
            format!("# alpine:3.19.0\nFROM alpine@{NEXT_DIGEST}\n")
        );
    }

    #[test]
    fn pin_failures_abort_the_update() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine:3.18.0\n").unwrap();

        let updater = updater(dir.path(), FakeRegistry::default(), true);
        let update = Update {
            path: "alpine".to_string(),
            previous: "3.18.0".to_string(),
            next: "3.19.0".to_string(),
        };
        let err = updater.apply_update(&update).unwrap_err();
        assert!(matches!(err, DockupError::UnresolvablePlatform(_)));
    }
}
