use trellis_core::module::RequestedVersion;
use trellis_core::selector::{ComponentStatus, VersionConstraint, VersionRejects, VersionSelector};
use trellis_core::version::{MavenOrder, Version};

#[test]
fn parses_each_selector_kind() {
    assert_eq!(
        VersionSelector::parse("1.2").unwrap(),
        VersionSelector::Exact(Version::new("1.2"))
    );
    assert!(matches!(
        VersionSelector::parse("[1.0,2.0)").unwrap(),
        VersionSelector::Range(_)
    ));
    assert_eq!(
        VersionSelector::parse("1.+").unwrap(),
        VersionSelector::Prefix("1.".to_string())
    );
    assert_eq!(
        VersionSelector::parse("latest.integration").unwrap(),
        VersionSelector::Latest(ComponentStatus::Integration)
    );
}

#[test]
fn rejects_malformed_selectors() {
    assert!(VersionSelector::parse("").is_err());
    assert!(VersionSelector::parse("latest.nightly").is_err());
    assert!(VersionSelector::parse("[1.0,").is_err());
}

#[test]
fn only_exact_is_static() {
    assert!(!VersionSelector::parse("1.2").unwrap().is_dynamic());
    assert!(VersionSelector::parse("1.+").unwrap().is_dynamic());
    assert!(VersionSelector::parse("[1.0,2.0]").unwrap().is_dynamic());
    assert!(VersionSelector::parse("latest.release").unwrap().is_dynamic());
    assert!(VersionSelector::parse("latest.release").unwrap().is_latest());
}

#[test]
fn accept_honours_status_for_latest() {
    let latest = VersionSelector::parse("latest.release").unwrap();
    let v = Version::new("2.0");
    assert!(latest.accept(&v, ComponentStatus::Release, &MavenOrder));
    assert!(!latest.accept(&v, ComponentStatus::Integration, &MavenOrder));

    let any = VersionSelector::parse("latest.integration").unwrap();
    assert!(any.accept(&v, ComponentStatus::Integration, &MavenOrder));
}

#[test]
fn prefix_and_exact_accept() {
    let prefix = VersionSelector::parse("1.+").unwrap();
    assert!(prefix.accept(&"1.9".into(), ComponentStatus::Release, &MavenOrder));
    assert!(!prefix.accept(&"2.0".into(), ComponentStatus::Release, &MavenOrder));

    let exact = VersionSelector::parse("1.0").unwrap();
    assert!(exact.accept(&"1.0.0".into(), ComponentStatus::Release, &MavenOrder));
}

#[test]
fn display_round_trips_text() {
    for s in ["1.2", "1.+", "latest.release", "[1.0,2.0)", "[1.5]"] {
        assert_eq!(VersionSelector::parse(s).unwrap().to_string(), s);
    }
}

#[test]
fn constraint_from_requested_version() {
    let requested = RequestedVersion {
        require: Some("[1.0,2.0)".to_string()),
        prefer: Some("1.4".to_string()),
        strictly: true,
        reject: vec!["1.3".to_string()],
    };
    let constraint = VersionConstraint::resolve(&requested).unwrap();
    assert!(constraint.is_strict());
    assert!(constraint.required_exact().is_none());
    assert_eq!(constraint.preferred_exact(), Some(&Version::new("1.4")));
    assert_eq!(constraint.rejects.len(), 1);
}

#[test]
fn constraint_propagates_parse_errors() {
    let requested = RequestedVersion::require("latest.bogus");
    assert!(VersionConstraint::resolve(&requested).is_err());
}

#[test]
fn rejects_union() {
    let mut rejects = VersionRejects::default();
    assert!(rejects.is_empty());
    let a = VersionSelector::parse("1.3").unwrap();
    let b = VersionSelector::parse("[2.0,3.0)").unwrap();
    rejects.extend([&a, &b, &a]);
    assert!(rejects.rejects(&"1.3".into(), &MavenOrder));
    assert!(rejects.rejects(&"2.5".into(), &MavenOrder));
    assert!(!rejects.rejects(&"1.4".into(), &MavenOrder));
    assert_eq!(rejects, VersionRejects::new(vec![a, b]));
}
