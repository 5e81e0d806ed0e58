use super::{build_client, ensure_success, next_page, ImageReference};
use crate::error::{DockupError, Result};
use crate::repository::{ImagePinner, TagLister};
use crate::version;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

const DIGEST_HEADER: &str = "Docker-Content-Digest";

const MANIFEST_LIST_TYPES: [&str; 2] = [
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.index.v1+json",
];
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.list.v2+json, \
    application/vnd.oci.image.index.v1+json, \
    application/vnd.docker.distribution.manifest.v2+json, \
    application/vnd.oci.image.manifest.v1+json";

static CHALLENGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("challenge pattern is valid"));

/// Docker Registry HTTP API v2 client for any registry an image names.
pub struct RemoteRegistries {
    client: Client,
}

impl RemoteRegistries {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }

    pub fn list_tags(&self, image: &ImageReference) -> Result<Vec<String>> {
        tracing::debug!(image = %image.name(), "listing image tags");

        let mut tags = Vec::new();
        let mut url = Some(image.api_url("tags/list"));
        while let Some(current) = url.take() {
            let response = self.get(&current, None)?;
            let response = ensure_success(response, &format!("listing tags for {}", image.name()))?;
            url = next_page(&current, &response);

            let page: TagList = response.json()?;
            tags.extend(page.tags.unwrap_or_default());
        }
        Ok(tags)
    }

    /// Digest of the image manifest `image` addresses, descending into a
    /// manifest list when the reference is multi-platform.
    pub fn resolve_digest(&self, image: &ImageReference) -> Result<String> {
        match self.fetch_manifest(image)? {
            Manifest::Image { digest } => Ok(digest),
            Manifest::List(entries) => select_platform(&entries)
                .map(|entry| entry.digest.clone())
                .ok_or_else(|| DockupError::UnresolvablePlatform(image.to_string())),
        }
    }

    fn fetch_manifest(&self, image: &ImageReference) -> Result<Manifest> {
        let url = image.api_url(&format!("manifests/{}", image.manifest_reference()));
        let response = self.get(&url, Some(MANIFEST_ACCEPT))?;
        let response = ensure_success(response, &format!("getting manifest for {image}"))?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let digest = header(DIGEST_HEADER);
        let content_type = header(CONTENT_TYPE.as_str());
        let body = response.bytes()?;

        parse_manifest(content_type.as_deref(), digest, &body)
    }

    /// GET with a single anonymous bearer-token retry on `401`.
    fn get(&self, url: &str, accept: Option<&str>) -> Result<Response> {
        let response = self.send(url, accept, None)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(BearerChallenge::parse)
        else {
            return Ok(response);
        };

        let token = self.fetch_token(&challenge)?;
        self.send(url, accept, Some(&token))
    }

    fn send(&self, url: &str, accept: Option<&str>, token: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send()?)
    }

    fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String> {
        let mut url = Url::parse(&challenge.realm).map_err(|err| {
            DockupError::RegistryQuery(format!("invalid auth realm {:?}: {err}", challenge.realm))
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &challenge.service {
                query.append_pair("service", service);
            }
            if let Some(scope) = &challenge.scope {
                query.append_pair("scope", scope);
            }
        }

        tracing::debug!(realm = %challenge.realm, "requesting registry token");
        let response = ensure_success(self.client.get(url).send()?, "requesting registry token")?;
        let token: TokenResponse = response.json()?;
        token
            .token
            .or(token.access_token)
            .ok_or_else(|| DockupError::RegistryQuery("token response carried no token".to_string()))
    }
}

impl TagLister for RemoteRegistries {
    fn tags(&self, path: &str) -> Result<Vec<String>> {
        self.list_tags(&ImageReference::parse(path)?)
    }
}

impl ImagePinner for RemoteRegistries {
    fn pin(&self, image: &str) -> Result<String> {
        let reference = ImageReference::parse(image)?;
        self.resolve_digest(&reference)
    }

    fn unpin(&self, image: &str, digest: &str) -> Result<String> {
        let reference = ImageReference::parse(image)?;
        let tags = self.list_tags(&reference)?;
        tracing::info!(image = %reference.name(), digest, tags = tags.len(), "listing tags to identify digest");

        let tag = find_tag_for_digest(image, digest, tags, |tag| {
            self.resolve_digest(&reference.with_tag(tag))
        })?;
        tracing::info!(image = %reference.name(), digest, tag = %tag, "resolved pinned image to tag");
        Ok(tag)
    }
}

/// Resolves version tags newest first until one resolves to `digest`.
///
/// Tags that are not versions are never resolved, and a tag that fails to
/// resolve is skipped.
fn find_tag_for_digest<F>(image: &str, digest: &str, tags: Vec<String>, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let unpin_error = |message: &str| DockupError::Unpin {
        image: image.to_string(),
        message: message.to_string(),
    };
    if tags.is_empty() {
        return Err(unpin_error("tag not found"));
    }

    let mut candidates: Vec<String> = tags
        .into_iter()
        .filter(|tag| version::normalize(tag).is_some())
        .collect();
    version::sort_descending(&mut candidates);

    for tag in candidates {
        match resolve(&tag) {
            Ok(resolved) if resolved == digest => return Ok(tag),
            Ok(resolved) => {
                tracing::debug!(tag = %tag, digest = %resolved, "fetched image details");
            }
            Err(err) => {
                tracing::warn!(tag = %tag, error = %err, "skipping tag");
            }
        }
    }
    Err(unpin_error("manifest not found"))
}

#[derive(Debug, PartialEq)]
enum Manifest {
    Image { digest: String },
    List(Vec<Descriptor>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Descriptor {
    digest: String,
    #[serde(default)]
    platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Platform {
    #[serde(default)]
    architecture: String,
    #[serde(default)]
    os: String,
}

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(rename = "mediaType")]
    media_type: Option<String>,
    manifests: Option<Vec<Descriptor>>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, PartialEq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut params: HashMap<String, String> = CHALLENGE_PARAM
            .captures_iter(params)
            .map(|caps| (caps[1].to_ascii_lowercase(), caps[2].to_string()))
            .collect();
        Some(Self {
            realm: params.remove("realm")?,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }
}

fn parse_manifest(content_type: Option<&str>, digest: Option<String>, body: &[u8]) -> Result<Manifest> {
    let document: ManifestDocument = serde_json::from_slice(body)?;
    let is_list = document.manifests.is_some()
        || [content_type, document.media_type.as_deref()]
            .into_iter()
            .flatten()
            .any(|media_type| MANIFEST_LIST_TYPES.iter().any(|list| media_type.starts_with(list)));

    if is_list {
        return Ok(Manifest::List(document.manifests.unwrap_or_default()));
    }
    Ok(Manifest::Image {
        digest: digest.unwrap_or_else(|| format!("sha256:{:x}", Sha256::digest(body))),
    })
}

/// First manifest list entry built for amd64 or for linux.
///
/// Either condition is enough, so `windows/amd64` and `linux/arm64` both
/// qualify when listed first.
fn select_platform(entries: &[Descriptor]) -> Option<&Descriptor> {
    entries.iter().find(|entry| {
        entry
            .platform
            .as_ref()
            .is_some_and(|platform| platform.architecture == "amd64" || platform.os == "linux")
    })
}
