use super::{build_client, ensure_success, next_page};
use crate::agents::dependency_extractor::GITHUB_PREFIX;
use crate::error::{DockupError, Result};
use crate::repository::TagLister;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

const GITHUB_API: &str = "https://api.github.com";
const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Lists release tags for `github.com/<owner>/<repo>` dependencies.
pub struct GithubReleases {
    client: Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

impl GithubReleases {
    pub fn new() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).ok().filter(|token| !token.is_empty());
        Ok(Self {
            client: build_client()?,
            token,
        })
    }

    fn releases_url(path: &str) -> Result<String> {
        let invalid = || DockupError::InvalidImage(format!("not a GitHub release path: {path}"));
        let (owner, repo) = path
            .strip_prefix(GITHUB_PREFIX)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid());
        }
        Ok(format!("{GITHUB_API}/repos/{owner}/{repo}/releases?per_page=100"))
    }
}

impl TagLister for GithubReleases {
    fn tags(&self, path: &str) -> Result<Vec<String>> {
        tracing::debug!(path, "listing release tags");

        let mut tags = Vec::new();
        let mut url = Some(Self::releases_url(path)?);
        while let Some(current) = url.take() {
            let mut request = self
                .client
                .get(&current)
                .header(ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = ensure_success(request.send()?, &format!("listing releases for {path}"))?;
            url = next_page(&current, &response);

            let releases: Vec<Release> = response.json()?;
            tags.extend(releases.into_iter().map(|release| release.tag_name));
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_release_urls() {
        assert_eq!(
            GithubReleases::releases_url("github.com/mikefarah/yq").unwrap(),
            "https://api.github.com/repos/mikefarah/yq/releases?per_page=100"
        );
    }

    #[test]
    fn rejects_non_release_paths() {
        for path in ["alpine", "github.com/only-owner", "github.com//repo", "github.com/a/b/c"] {
            assert!(GithubReleases::releases_url(path).is_err(), "{path}");
        }
    }

    #[test]
    fn decodes_release_listing() {
        let body = r#"[{"tag_name":"v4.44.1","name":"v4.44.1","draft":false},{"tag_name":"v4.43.1"}]"#;
        let releases: Vec<Release> = serde_json::from_str(body).unwrap();
        let tags: Vec<_> = releases.into_iter().map(|release| release.tag_name).collect();
        assert_eq!(tags, vec!["v4.44.1", "v4.43.1"]);
    }

    #[test]
    #[ignore = "requires network access to api.github.com"]
    fn lists_releases_from_github() {
        let releases = GithubReleases::new().unwrap();
        let tags = releases.tags("github.com/mikefarah/yq").unwrap();
        assert!(!tags.is_empty());
    }
}
