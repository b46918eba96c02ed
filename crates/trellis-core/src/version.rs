//! Version values and the injectable total order over them.
//!
//! A [`Version`] is opaque: nothing in the resolver interprets its text.
//! All comparisons go through a [`VersionOrder`], so callers can plug in a
//! different scheme. [`MavenOrder`] is the default and uses Maven's rules:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - SNAPSHOT versions sort before their release equivalent
//!
//! [`CachedMavenOrder`] applies the same rules but parses each version once.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// An opaque version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_snapshot(&self) -> bool {
        self.0.ends_with("-SNAPSHOT")
    }

    /// The base version without the `-SNAPSHOT` suffix.
    pub fn base_version(&self) -> &str {
        self.0.strip_suffix("-SNAPSHOT").unwrap_or(&self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A total order over versions, injected into everything that ranks them.
pub trait VersionOrder {
    fn compare(&self, a: &Version, b: &Version) -> Ordering;

    /// Compare two possibly-absent versions. An absent version is the
    /// "empty" sentinel and sorts below every real version.
    fn compare_optional(&self, a: Option<&Version>, b: Option<&Version>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self.compare(a, b),
        }
    }

    /// Sort `versions` highest first.
    fn sort_descending(&self, versions: &mut [Version]) {
        versions.sort_by(|a, b| self.compare(b, a));
    }
}

/// Maven's version ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct MavenOrder;

impl VersionOrder for MavenOrder {
    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        compare_parsed(&parse_segments(a.as_str()), &parse_segments(b.as_str()))
    }
}

/// [`MavenOrder`] with the parsed segments of every version memoized.
///
/// Selector ordering and candidate sorting compare the same handful of
/// versions many times over one resolution.
#[derive(Debug, Default)]
pub struct CachedMavenOrder {
    segments: RefCell<HashMap<Version, Rc<[Segment]>>>,
}

impl CachedMavenOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct versions parsed so far.
    pub fn cached(&self) -> usize {
        self.segments.borrow().len()
    }

    fn segments(&self, version: &Version) -> Rc<[Segment]> {
        if let Some(segments) = self.segments.borrow().get(version) {
            return Rc::clone(segments);
        }
        let parsed: Rc<[Segment]> = parse_segments(version.as_str()).into();
        self.segments
            .borrow_mut()
            .insert(version.clone(), Rc::clone(&parsed));
        parsed
    }
}

impl VersionOrder for CachedMavenOrder {
    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        compare_parsed(&self.segments(a), &self.segments(b))
    }
}

fn compare_parsed(a: &[Segment], b: &[Segment]) -> Ordering {
    let max_len = a.len().max(b.len());
    for i in 0..max_len {
        let ord = compare_segments(a.get(i), b.get(i));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known Maven qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(classify)
        .collect()
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// A Maven version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a Maven version range string.
    ///
    /// Returns `None` for bare versions and for malformed ranges.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return None;
        }
        if s.len() < 2 || !(s.ends_with(']') || s.ends_with(')')) {
            return None;
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let lower = lower.trim();
            let upper = upper.trim();
            Some(VersionRange {
                lower: (!lower.is_empty()).then(|| Bound {
                    version: Version::new(lower),
                    inclusive: open_inclusive,
                }),
                upper: (!upper.is_empty()).then(|| Bound {
                    version: Version::new(upper),
                    inclusive: close_inclusive,
                }),
            })
        } else {
            // Exact version: [1.0] means exactly 1.0
            let inner = inner.trim();
            if inner.is_empty() {
                return None;
            }
            let v = Version::new(inner);
            Some(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            })
        }
    }

    /// Check if a version satisfies this range under `order`.
    pub fn contains(&self, version: &Version, order: &dyn VersionOrder) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = order.compare(version, &lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = order.compare(version, &upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            if lower.version == upper.version && lower.inclusive && upper.inclusive {
                return write!(f, "[{}]", lower.version);
            }
        }
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => f.write_str(")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        MavenOrder.compare(&Version::new(a), &Version::new(b))
    }

    #[test]
    fn basic_ordering() {
        assert_eq!(cmp("1.0", "2.0"), Ordering::Less);
        assert_eq!(cmp("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(cmp("1.0.1", "1.1.0"), Ordering::Less);
    }

    #[test]
    fn qualifier_ordering() {
        assert_eq!(cmp("1.0-alpha", "1.0-beta"), Ordering::Less);
        assert_eq!(cmp("1.0-beta", "1.0-rc"), Ordering::Less);
        assert_eq!(cmp("1.0-rc", "1.0"), Ordering::Less);
        assert_eq!(cmp("1.0", "1.0-sp"), Ordering::Less);
    }

    #[test]
    fn snapshot_before_release() {
        assert_eq!(cmp("1.0-SNAPSHOT", "1.0"), Ordering::Less);
        let v = Version::new("1.0-SNAPSHOT");
        assert!(v.is_snapshot());
        assert_eq!(v.base_version(), "1.0");
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(cmp("1.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_beats_text_qualifier() {
        assert_eq!(cmp("1.0.0", "1.0.0-jre"), Ordering::Greater);
        assert_eq!(cmp("31.0-jre", "32.0-jre"), Ordering::Less);
    }

    #[test]
    fn empty_sentinel_sorts_lowest() {
        let v = Version::new("0.0.1");
        assert_eq!(MavenOrder.compare_optional(None, Some(&v)), Ordering::Less);
        assert_eq!(MavenOrder.compare_optional(Some(&v), None), Ordering::Greater);
        assert_eq!(MavenOrder.compare_optional(None, None), Ordering::Equal);
    }

    #[test]
    fn sort_descending_uses_order() {
        let mut versions = vec![
            Version::new("1.10"),
            Version::new("1.9"),
            Version::new("2.0-rc"),
        ];
        MavenOrder.sort_descending(&mut versions);
        let text: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(text, vec!["2.0-rc", "1.10", "1.9"]);
    }

    #[test]
    fn cached_order_agrees_and_parses_once() {
        let order = CachedMavenOrder::new();
        let pairs = [
            ("1.0", "1.0.0"),
            ("1.0-rc", "1.0"),
            ("1.0-SNAPSHOT", "1.0"),
            ("31.0-jre", "32.0-jre"),
            ("1.10", "1.9"),
            ("1.0", "1.0-sp"),
        ];
        for _ in 0..3 {
            for (a, b) in pairs {
                let (a, b) = (Version::new(a), Version::new(b));
                assert_eq!(order.compare(&a, &b), MavenOrder.compare(&a, &b), "{a} vs {b}");
                assert_eq!(order.compare(&b, &a), MavenOrder.compare(&b, &a), "{b} vs {a}");
            }
        }
        assert_eq!(order.cached(), 9);
    }

    #[test]
    fn version_range_inclusive() {
        let range = VersionRange::parse("[1.0,2.0]").unwrap();
        assert!(range.contains(&"1.0".into(), &MavenOrder));
        assert!(range.contains(&"1.5".into(), &MavenOrder));
        assert!(range.contains(&"2.0".into(), &MavenOrder));
        assert!(!range.contains(&"0.9".into(), &MavenOrder));
        assert!(!range.contains(&"2.1".into(), &MavenOrder));
    }

    #[test]
    fn version_range_exclusive_upper() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.contains(&"1.9.9".into(), &MavenOrder));
        assert!(!range.contains(&"2.0".into(), &MavenOrder));
        assert_eq!(range.to_string(), "[1.0,2.0)");
    }

    #[test]
    fn version_range_open_lower() {
        let range = VersionRange::parse("(,2.0)").unwrap();
        assert!(range.contains(&"1.0".into(), &MavenOrder));
        assert!(!range.contains(&"2.0".into(), &MavenOrder));
    }

    #[test]
    fn version_range_exact() {
        let range = VersionRange::parse("[1.5]").unwrap();
        assert!(range.contains(&"1.5".into(), &MavenOrder));
        assert!(!range.contains(&"1.4".into(), &MavenOrder));
        assert_eq!(range.to_string(), "[1.5]");
    }

    #[test]
    fn malformed_ranges_rejected() {
        assert!(VersionRange::parse("1.0").is_none());
        assert!(VersionRange::parse("[1.0,2.0").is_none());
        assert!(VersionRange::parse("[]").is_none());
    }
}
