use dlindex_core::version::ReleaseVersion;

fn order(raw: &[&str]) -> Vec<String> {
    let mut v: Vec<ReleaseVersion> = raw.iter().map(|r| ReleaseVersion::parse(r)).collect();
    v.sort();
    v.iter().map(|r| r.to_string()).collect()
}

#[test]
fn test_index_order_channels_then_newest_first() {
    assert_eq!(
        order(&["0.5.0", "latest", "0.10.1", "master", "0.9.0", "1.0.0-rc1", "1.0.0"]),
        vec!["latest", "master", "1.0.0", "1.0.0-rc1", "0.10.1", "0.9.0", "0.5.0"]
    );
}

#[test]
fn test_semver_not_lexicographic() {
    assert_eq!(order(&["0.9.0", "0.10.0"]), vec!["0.10.0", "0.9.0"]);
}

#[test]
fn test_equal_semver_distinct_names_are_both_kept() {
    let a = ReleaseVersion::parse("1.13");
    let b = ReleaseVersion::parse("1.13.0");
    assert_ne!(a, b);
    assert_eq!(a.semver(), b.semver());
    assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);
}

#[test]
fn test_prerelease_flags() {
    assert!(ReleaseVersion::parse("1.0.0-beta.2").is_prerelease());
    assert!(!ReleaseVersion::parse("1.0.0").is_prerelease());
    assert!(!ReleaseVersion::parse("latest").is_prerelease());
}

#[test]
fn test_serializes_as_raw_string() {
    let v = ReleaseVersion::parse("v0.8.0");
    assert_eq!(serde_json::to_string(&v).unwrap(), "\"v0.8.0\"");
}
