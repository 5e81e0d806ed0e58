use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::sync::LazyLock;

/// `v`-prefixed semantic version. Minor and patch may be omitted, but only a
/// full `major.minor.patch` may carry a prerelease or build suffix.
static SEMVER: LazyLock<Regex> = LazyLock::new(|| {
    let numeric = r"(0|[1-9][0-9]*)";
    let ident = r"(?:0|[1-9][0-9]*|[0-9]*[A-Za-z-][0-9A-Za-z-]*)";
    let pattern = format!(
        r"^v{numeric}(?:\.{numeric}(?:\.{numeric}(?:-({ident}(?:\.{ident})*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?)?)?$"
    );
    Regex::new(&pattern).expect("semver pattern is valid")
});

/// Coerces a semver-ish string to a `v`-prefixed semantic version.
///
/// Strings with more than three dot separated segments have the trailing
/// segments folded into a prerelease, so `1.2.3.4.5` becomes `v1.2.3-4.5`.
pub fn normalize(s: &str) -> Option<String> {
    if let Some(v) = valid_with_v(s) {
        return Some(v);
    }

    let dots: Vec<&str> = s.split('.').collect();
    if dots.len() > 3 {
        let folded = format!("{}-{}", dots[..3].join("."), dots[3..].join("."));
        return valid_with_v(&folded);
    }

    None
}

fn valid_with_v(s: &str) -> Option<String> {
    if canonical(s).is_some() {
        return Some(s.to_string());
    }

    let prefixed = format!("v{s}");
    canonical(&prefixed).map(|_| prefixed)
}

/// Returns the `-` delimited prerelease of a normalized version, dash included.
pub fn prerelease(v: &str) -> &str {
    SEMVER
        .captures(v)
        .and_then(|caps| caps.get(4))
        .map(|m| &v[m.start() - 1..m.end()])
        .unwrap_or("")
}

/// Major component of a normalized version.
pub fn major(v: &str) -> Option<u64> {
    canonical(v).map(|parsed| parsed.major)
}

/// Semantic version precedence of two normalized versions. Invalid versions
/// sort below valid ones and are equal to each other.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (canonical(a), canonical(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Descending sort of semver-ish strings, latest first. Equal precedence
/// prefers the more specific original string (`1.2.0` before `1.2`).
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| {
        compare_semverish(b, a).then_with(|| dot_count(b).cmp(&dot_count(a)))
    });
}

fn compare_semverish(a: &str, b: &str) -> Ordering {
    compare(
        normalize(a).as_deref().unwrap_or_default(),
        normalize(b).as_deref().unwrap_or_default(),
    )
}

fn dot_count(s: &str) -> usize {
    s.matches('.').count()
}

/// Expands shorthand forms and drops build metadata, leaving only the parts
/// that take part in precedence.
fn canonical(v: &str) -> Option<Version> {
    let caps = SEMVER.captures(v)?;
    let number = |index: usize| -> Option<u64> {
        match caps.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let pre = match caps.get(4) {
        Some(m) => Prerelease::new(m.as_str()).ok()?,
        None => Prerelease::EMPTY,
    };

    Some(Version {
        major: number(1)?,
        minor: number(2)?,
        patch: number(3)?,
        pre,
        build: BuildMetadata::EMPTY,
    })
}
