//! Release version directories and the order they appear in the index.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::{Serialize, Serializer};

/// The version directory an artifact lives under.
///
/// Directory names that read as semver (`0.8.0`, `v1.2.3-rc1`, `1.13`) are
/// releases; anything else (`latest`, `master`) is a channel.
#[derive(Debug, Clone)]
pub struct ReleaseVersion {
    raw: String,
    kind: VersionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionKind {
    Release(Version),
    Channel,
}

impl ReleaseVersion {
    /// Classify a version directory name.
    pub fn parse(raw: &str) -> Self {
        let kind = match parse_semver(raw) {
            Some(v) => VersionKind::Release(v),
            None => VersionKind::Channel,
        };
        Self {
            raw: raw.to_string(),
            kind,
        }
    }

    /// The directory name exactly as it appears in the bucket.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed semver for releases, `None` for channels.
    pub fn semver(&self) -> Option<&Version> {
        match &self.kind {
            VersionKind::Release(v) => Some(v),
            VersionKind::Channel => None,
        }
    }

    pub fn is_channel(&self) -> bool {
        self.kind == VersionKind::Channel
    }

    /// Releases with a pre-release tag (`1.0.0-rc1`). Channels are not pre-releases.
    pub fn is_prerelease(&self) -> bool {
        self.semver().is_some_and(|v| !v.pre.is_empty())
    }
}

/// Accepts `v`-prefixed and two- or one-component versions by padding with zeros.
fn parse_semver(raw: &str) -> Option<Version> {
    let trimmed = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(i) => trimmed.split_at(i),
        None => (trimmed, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 2
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let padded = match parts.len() {
        1 => format!("{core}.0.0{suffix}"),
        _ => format!("{core}.0{suffix}"),
    };
    Version::parse(&padded).ok()
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ReleaseVersion {}

impl std::hash::Hash for ReleaseVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

/// Index order: channels first (by name), then releases newest first.
impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (VersionKind::Channel, VersionKind::Channel) => self.raw.cmp(&other.raw),
            (VersionKind::Channel, VersionKind::Release(_)) => Ordering::Less,
            (VersionKind::Release(_), VersionKind::Channel) => Ordering::Greater,
            (VersionKind::Release(a), VersionKind::Release(b)) => {
                b.cmp(a).then_with(|| self.raw.cmp(&other.raw))
            }
        }
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_component_versions_are_releases() {
        let v = ReleaseVersion::parse("1.13");
        assert_eq!(v.semver(), Some(&Version::new(1, 13, 0)));
        assert_eq!(v.as_str(), "1.13");
    }

    #[test]
    fn leading_v_is_ignored() {
        assert_eq!(
            ReleaseVersion::parse("v0.8.0").semver(),
            Some(&Version::new(0, 8, 0))
        );
    }

    #[test]
    fn words_are_channels() {
        assert!(ReleaseVersion::parse("latest").is_channel());
        assert!(ReleaseVersion::parse("1.x").is_channel());
        assert!(ReleaseVersion::parse("").is_channel());
    }

    #[test]
    fn short_prerelease_is_padded() {
        let v = ReleaseVersion::parse("1.2-rc1");
        assert!(v.is_prerelease());
        assert_eq!(v.semver().unwrap().to_string(), "1.2.0-rc1");
    }
}
