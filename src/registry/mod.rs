pub mod client;
pub mod github;
pub mod reference;

pub use client::RemoteRegistries;
pub use github::GithubReleases;
pub use reference::ImageReference;

use crate::error::{DockupError, Result};
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::LINK;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("link pattern is valid"));

fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("dockup/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Resolves the `rel="next"` target of a paginated response against the
/// URL it was served from.
fn next_page(current: &str, response: &Response) -> Option<String> {
    let header = response.headers().get(LINK)?.to_str().ok()?;
    next_link(current, header)
}

fn next_link(current: &str, header: &str) -> Option<String> {
    let target = NEXT_LINK.captures(header)?.get(1)?.as_str();
    Url::parse(current).ok()?.join(target).ok().map(String::from)
}

fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(DockupError::RegistryQuery(format!("{what}: HTTP {status}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_relative_next_links() {
        let next = next_link(
            "https://ghcr.io/v2/owner/tool/tags/list",
            r#"</v2/owner/tool/tags/list?last=1.2.3&n=100>; rel="next""#,
        );
        assert_eq!(
            next.as_deref(),
            Some("https://ghcr.io/v2/owner/tool/tags/list?last=1.2.3&n=100")
        );
    }

    #[test]
    fn ignores_other_relations() {
        let header = r#"<https://api.github.com/repositories/1/releases?page=1>; rel="first""#;
        assert_eq!(next_link("https://api.github.com/repos/o/r/releases", header), None);

        let header = r#"<https://api.github.com/repositories/1/releases?page=1>; rel="prev", <https://api.github.com/repositories/1/releases?page=3>; rel="next""#;
        assert_eq!(
            next_link("https://api.github.com/repos/o/r/releases", header).as_deref(),
            Some("https://api.github.com/repositories/1/releases?page=3")
        );
    }
}
