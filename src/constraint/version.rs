use std::cmp::Ordering;

/// A package version as published by a registry or recorded in a lock file.
///
/// Only the dotted numeric release segments take part in ordering. Anything
/// after them (`-beta2`, `RC1`, `+build`) is read as a stability marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub original: String,
    pub normalized: String,
    release: Option<Vec<u64>>,
    stability: Stability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stability {
    Dev,
    Alpha,
    Beta,
    ReleaseCandidate,
    Stable,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        let normalized = normalize(version);

        if normalized.to_ascii_lowercase().starts_with("dev-") {
            return Version {
                original: version.to_string(),
                normalized,
                release: None,
                stability: Stability::Dev,
            };
        }

        let split_at = normalized
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(normalized.len());
        let (release_part, suffix) = normalized.split_at(split_at);
        let release = Self::parse_numeric(release_part.trim_end_matches('.'));
        let stability = Self::detect_stability(suffix);

        Version {
            original: version.to_string(),
            normalized,
            release,
            stability,
        }
    }

    fn parse_numeric(release: &str) -> Option<Vec<u64>> {
        if release.is_empty() {
            return None;
        }

        let mut numbers = Vec::new();
        for part in release.split('.') {
            numbers.push(part.parse::<u64>().ok()?);
        }
        Some(numbers)
    }

    fn detect_stability(suffix: &str) -> Stability {
        // Build metadata never changes stability
        let suffix = suffix.split('+').next().unwrap_or_default();
        let lower = suffix.to_ascii_lowercase();
        let marker: String = lower
            .trim_start_matches(['-', '_', '.'])
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        match marker.as_str() {
            "" => Stability::Stable,
            "dev" | "x" => Stability::Dev,
            "alpha" | "a" => Stability::Alpha,
            "beta" | "b" => Stability::Beta,
            "rc" => Stability::ReleaseCandidate,
            "patch" | "pl" | "p" => Stability::Stable,
            _ if lower.contains("dev") => Stability::Dev,
            _ => Stability::Stable,
        }
    }

    /// Whether the release part is purely dotted-numeric, i.e. comparable.
    pub fn is_orderable(&self) -> bool {
        self.release.is_some()
    }

    pub fn is_stable(&self) -> bool {
        self.stability == Stability::Stable
    }

    pub fn stability(&self) -> Stability {
        self.stability
    }

    pub fn release(&self) -> Option<&[u64]> {
        self.release.as_deref()
    }

    /// Numeric ordering with implicit zero padding (`1.2` == `1.2.0`).
    /// Returns `None` when either side is not orderable.
    pub fn compare(&self, other: &Version) -> Option<Ordering> {
        let a = self.release.as_ref()?;
        let b = other.release.as_ref()?;
        let len = a.len().max(b.len());

        for i in 0..len {
            let av = a.get(i).copied().unwrap_or(0);
            let bv = b.get(i).copied().unwrap_or(0);
            match av.cmp(&bv) {
                Ordering::Equal => continue,
                other => return Some(other),
            }
        }
        Some(Ordering::Equal)
    }
}

/// Trim whitespace and a single leading `v`.
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
        .to_string()
}

pub struct VersionComparator;

impl VersionComparator {
    pub fn compare(a: &str, b: &str) -> Option<Ordering> {
        Version::parse(a).compare(&Version::parse(b))
    }

    /// Check if version `a` is newer than version `b`
    pub fn is_newer(a: &str, b: &str) -> bool {
        Self::compare(a, b) == Some(Ordering::Greater)
    }

    /// Unique, orderable, stable versions, newest first.
    pub fn stable_descending(versions: &[String]) -> Vec<String> {
        let mut parsed: Vec<Version> = versions
            .iter()
            .map(|v| Version::parse(v))
            .filter(|v| v.is_orderable() && v.is_stable())
            .collect();

        parsed.sort_by(|a, b| b.compare(a).unwrap_or(Ordering::Equal));
        parsed.dedup_by(|a, b| a.compare(b) == Some(Ordering::Equal));
        parsed.into_iter().map(|v| v.original).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_v() {
        let v = Version::parse("v2.4.1");
        assert_eq!(v.normalized, "2.4.1");
        assert_eq!(v.release(), Some(&[2, 4, 1][..]));
    }

    #[test]
    fn compares_with_zero_padding() {
        assert_eq!(VersionComparator::compare("1.2", "1.2.0"), Some(Ordering::Equal));
        assert_eq!(VersionComparator::compare("1.10.0", "1.9.9"), Some(Ordering::Greater));
        assert!(VersionComparator::is_newer("8.2.0", "8.1.5"));
        assert!(!VersionComparator::is_newer("8.1.5", "8.1.5"));
    }

    #[test]
    fn suffixes_do_not_affect_ordering() {
        assert_eq!(
            VersionComparator::compare("2.0.0-beta1", "2.0.0"),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn branches_are_not_orderable() {
        let v = Version::parse("dev-main");
        assert!(!v.is_orderable());
        assert!(!v.is_stable());
        assert_eq!(VersionComparator::compare("dev-main", "1.0.0"), None);
    }

    #[test]
    fn test_stable_detection() {
        assert!(Version::parse("1.0.0").is_stable());
        assert!(Version::parse("1.0.0-p1").is_stable());
        assert!(!Version::parse("1.0.0-alpha").is_stable());
        assert!(!Version::parse("1.0.0-RC2").is_stable());
        assert!(!Version::parse("2.1.x-dev").is_stable());
        assert_eq!(Version::parse("3.0.0beta3").stability(), Stability::Beta);
    }

    #[test]
    fn stable_descending_filters_and_sorts() {
        let versions = vec![
            "8.1.0".to_string(),
            "v8.2.0".to_string(),
            "8.3.0-RC1".to_string(),
            "dev-master".to_string(),
            "8.1.5".to_string(),
            "8.1.5".to_string(),
        ];
        assert_eq!(
            VersionComparator::stable_descending(&versions),
            vec!["v8.2.0", "8.1.5", "8.1.0"]
        );
    }
}
