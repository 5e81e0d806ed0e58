use crate::error::{DockupError, Result};
use std::fmt;

pub const DOCKER_HUB: &str = "registry-1.docker.io";
const DOCKER_HUB_ALIASES: [&str; 2] = ["docker.io", "index.docker.io"];

/// A fully qualified image name, optionally addressing a tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub reference: Option<String>,
}

impl ImageReference {
    /// Parses `[registry/]repository[:tag][@digest]` the way `docker pull`
    /// resolves it.
    pub fn parse(image: &str) -> Result<Self> {
        let invalid = || DockupError::InvalidImage(image.to_string());

        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest)),
            None => (image, None),
        };
        let name_start = name.rfind('/').map_or(0, |index| index + 1);
        let (name, tag) = match name[name_start..].find(':') {
            Some(colon) => (&name[..name_start + colon], Some(&name[name_start + colon + 1..])),
            None => (name, None),
        };

        let (registry, repository) = match name.split_once('/') {
            Some((host, rest)) if is_registry_host(host) => {
                let host = if DOCKER_HUB_ALIASES.contains(&host) { DOCKER_HUB } else { host };
                (host.to_string(), rest.to_string())
            }
            _ => (DOCKER_HUB.to_string(), name.to_string()),
        };
        let repository = if registry == DOCKER_HUB && !repository.contains('/') {
            format!("library/{repository}")
        } else {
            repository
        };

        if !is_valid_repository(&repository) {
            return Err(invalid());
        }
        if tag.is_some_and(str::is_empty) || digest.is_some_and(|d| !d.contains(':')) {
            return Err(invalid());
        }

        Ok(Self {
            registry,
            repository,
            reference: digest.or(tag).map(str::to_string),
        })
    }

    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            reference: Some(tag.to_string()),
            ..self.clone()
        }
    }

    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    pub(crate) fn api_url(&self, suffix: &str) -> String {
        format!("https://{}/v2/{}/{}", self.registry, self.repository, suffix)
    }

    /// Tag or digest used for manifest requests; `latest` when unset.
    pub(crate) fn manifest_reference(&self) -> &str {
        self.reference.as_deref().unwrap_or("latest")
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reference.as_deref() {
            Some(digest) if digest.contains(':') => write!(f, "{}@{}", self.name(), digest),
            Some(tag) => write!(f, "{}:{}", self.name(), tag),
            None => f.write_str(&self.name()),
        }
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains(['.', ':']) || component == "localhost"
}

fn is_valid_repository(repository: &str) -> bool {
    !repository.is_empty()
        && repository.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || "._-".contains(ch))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_images_live_under_library() {
        let reference = ImageReference::parse("alpine:3.19").unwrap();
        assert_eq!(reference.registry, DOCKER_HUB);
        assert_eq!(reference.repository, "library/alpine");
        assert_eq!(reference.reference.as_deref(), Some("3.19"));
        assert_eq!(reference.to_string(), "registry-1.docker.io/library/alpine:3.19");
    }

    #[test]
    fn user_images_stay_on_docker_hub() {
        let reference = ImageReference::parse("grafana/grafana").unwrap();
        assert_eq!(reference.registry, DOCKER_HUB);
        assert_eq!(reference.repository, "grafana/grafana");
        assert_eq!(reference.manifest_reference(), "latest");
    }

    #[test]
    fn registry_hosts_and_ports_are_detected() {
        let reference = ImageReference::parse("localhost:5000/team/app:1.0.0").unwrap();
        assert_eq!(reference.registry, "localhost:5000");
        assert_eq!(reference.repository, "team/app");

        let reference = ImageReference::parse("ghcr.io/owner/tool").unwrap();
        assert_eq!(reference.registry, "ghcr.io");
        assert_eq!(reference.api_url("tags/list"), "https://ghcr.io/v2/owner/tool/tags/list");

        let reference = ImageReference::parse("docker.io/nginx").unwrap();
        assert_eq!(reference.name(), "registry-1.docker.io/library/nginx");
    }

    #[test]
    fn digests_take_precedence_over_tags() {
        let digest = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let reference = ImageReference::parse(&format!("alpine:3.19@{digest}")).unwrap();
        assert_eq!(reference.reference.as_deref(), Some(digest));
        assert_eq!(reference.with_tag("3.20").to_string(), "registry-1.docker.io/library/alpine:3.20");
    }

    #[test]
    fn rejects_invalid_names() {
        for image in ["", "Alpine", "alpine:", "team//app", "alpine@nothex"] {
            let err = ImageReference::parse(image).unwrap_err();
            assert!(matches!(err, DockupError::InvalidImage(_)), "{image}");
        }
    }
}
