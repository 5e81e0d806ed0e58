use crate::error::{DockupError, Result};
use crate::repository::{Dependency, ImagePinner, TagLister, Update};
use crate::version;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static SHA256_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^sha256:[a-f0-9]{64}$").expect("digest pattern is valid"));

/// Caller supplied predicate over normalized candidate versions.
pub type Accept<'a> = &'a dyn Fn(&str) -> bool;

/// Selects the newest tag a dependency can move to.
pub struct UpdateChecker<'a> {
    tags: &'a dyn TagLister,
    pinner: Option<&'a dyn ImagePinner>,
}

impl<'a> UpdateChecker<'a> {
    /// `pinner` is only consulted for digest-pinned dependencies; pass `None`
    /// when pinning is disabled.
    pub fn new(tags: &'a dyn TagLister, pinner: Option<&'a dyn ImagePinner>) -> Self {
        Self { tags, pinner }
    }

    pub fn check(&self, dependency: &Dependency, accept: Option<Accept<'_>>) -> Result<Option<Update>> {
        let Some(previous) = self.resolve_previous(dependency)? else {
            tracing::debug!(
                path = %dependency.path,
                version = %dependency.version,
                "ignoring non-semver dependency"
            );
            return Ok(None);
        };
        let suffix = version::prerelease(&previous);

        let tags = self.tags.tags(&dependency.path).map_err(|err| match err {
            err @ DockupError::RegistryQuery(_) => err,
            err => DockupError::RegistryQuery(format!("querying tags for {}: {err}", dependency.path)),
        })?;

        let mut versions = Vec::with_capacity(tags.len());
        let mut version_map: HashMap<String, String> = HashMap::new();
        for tag in tags {
            if is_date_stamp(&tag) {
                continue;
            }
            let Some(mapped) = version::normalize(&tag) else {
                continue;
            };
            if version::prerelease(&mapped) != suffix {
                continue;
            }
            if accept.is_some_and(|accept| !accept(&mapped)) {
                continue;
            }

            versions.push(mapped.clone());
            version_map.insert(mapped, tag);
        }
        if versions.is_empty() {
            return Ok(None);
        }

        version::sort_descending(&mut versions);
        let latest = &versions[0];
        if version::compare(&previous, latest).is_ge() {
            return Ok(None);
        }

        let Some(next) = version_map.remove(latest) else {
            return Ok(None);
        };
        Ok(Some(Update {
            path: dependency.path.clone(),
            previous: dependency.version.clone(),
            next,
        }))
    }

    /// Normalized current version. Digests are mapped back to a tag when a
    /// pinner is available; anything else is untrackable.
    fn resolve_previous(&self, dependency: &Dependency) -> Result<Option<String>> {
        if let Some(previous) = version::normalize(&dependency.version) {
            return Ok(Some(previous));
        }

        let pinner = match self.pinner {
            Some(pinner) if is_digest(&dependency.version) => pinner,
            _ => return Ok(None),
        };

        let tag = pinner
            .unpin(&dependency.path, &dependency.version)
            .map_err(|err| match err {
                err @ DockupError::Unpin { .. } => err,
                err => DockupError::Unpin {
                    image: dependency.path.clone(),
                    message: err.to_string(),
                },
            })?;

        version::normalize(&tag).map(Some).ok_or_else(|| DockupError::Unpin {
            image: dependency.path.clone(),
            message: format!("resolved tag {tag:?} is not a version"),
        })
    }
}

pub fn is_digest(version: &str) -> bool {
    SHA256_VERSION.is_match(version)
}

/// Calendar stamps such as `20230101` parse as a major version.
fn is_date_stamp(tag: &str) -> bool {
    tag.len() == 8 && tag.starts_with("20")
}
