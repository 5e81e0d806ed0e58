use crate::config::Mode;
use crate::dockerfile::interpolation::has_variable;
use crate::dockerfile::{Interpolation, InstructionKind, InstructionTree};
use crate::repository::Dependency;
use crate::version;
use regex::Regex;
use std::sync::LazyLock;

static SHA256_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-f0-9]{64}$").expect("sha256 pattern is valid"));

static GITHUB_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/([^/\s]+)/([^/\s]+)/releases/download/([^/\s]+)/")
        .expect("release url pattern is valid")
});

pub const GITHUB_PREFIX: &str = "github.com/";

/// Pulls trackable dependencies out of a parsed Dockerfile.
#[derive(Debug, Clone, Copy)]
pub struct DependencyExtractor {
    mode: Mode,
}

impl DependencyExtractor {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Dependencies in instruction order. Duplicates are kept.
    pub fn extract(&self, tree: &InstructionTree) -> Vec<Dependency> {
        let mut vars = Interpolation::new();
        let mut deps = Vec::new();

        for instruction in tree.iter() {
            match (&instruction.kind, self.mode) {
                (InstructionKind::From, Mode::Images) => {
                    if let Some(dep) = instruction
                        .image
                        .as_ref()
                        .map(|image| image.content.as_str())
                        .and_then(|image| self.parse_image(&vars, image))
                    {
                        deps.push(dep);
                    }
                }
                (InstructionKind::Run, Mode::ReleaseUrls) => {
                    if let Some(command) = &instruction.command {
                        deps.extend(self.release_downloads(&vars.interpolate(command)));
                    }
                }
                _ => {}
            }
            vars.observe(instruction);
        }

        deps
    }

    /// Turns a FROM image token into a dependency, or `None` when its
    /// version cannot be tracked.
    pub fn parse_image(&self, vars: &Interpolation, image: &str) -> Option<Dependency> {
        let Some((path, tag)) = split_image(image) else {
            return Some(Dependency::new(image, "latest"));
        };

        if has_variable(tag) {
            let resolved = vars.interpolate(tag);
            if has_variable(&resolved) {
                tracing::debug!(image, "unresolved variable in image tag");
                return None;
            }
            return Some(Dependency::new(path, resolved));
        }

        if version::normalize(tag).is_some() {
            return Some(Dependency::new(path, tag));
        }

        match path.strip_suffix("@sha256") {
            Some(name) if SHA256_HEX.is_match(tag) => {
                Some(Dependency::new(name, format!("sha256:{tag}")))
            }
            _ => None,
        }
    }

    /// GitHub release downloads referenced by a shell command.
    pub fn release_downloads(&self, command: &str) -> Vec<Dependency> {
        GITHUB_RELEASE
            .captures_iter(command)
            .map(|caps| {
                Dependency::new(
                    format_github_release(&caps[1], &caps[2]),
                    &caps[3],
                )
            })
            .collect()
    }
}

pub fn format_github_release(owner: &str, repo: &str) -> String {
    format!("{GITHUB_PREFIX}{owner}/{repo}")
}

/// Splits at the first `:` of the last path component so registry ports stay
/// part of the path.
fn split_image(image: &str) -> Option<(&str, &str)> {
    let name_start = image.rfind('/').map_or(0, |index| index + 1);
    let colon = name_start + image[name_start..].find(':')?;
    Some((&image[..colon], &image[colon + 1..]))
}
