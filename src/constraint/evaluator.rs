use crate::constraint::version::Version;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static CARET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("caret pattern compiles")
});
static TILDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^~v?(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("tilde pattern compiles")
});
static WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+(?:\.\d+)*)\.[*xX]$").expect("wildcard pattern compiles"));
static OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(>=|<=|<>|!=|==|=|>|<)([^\s,|]+)$").expect("operator pattern compiles")
});
static EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?\d+(?:\.\d+){2,}(?:[-+._]?[A-Za-z][A-Za-z0-9.+-]*)?$")
        .expect("exact pattern compiles")
});
static BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)(?:\.(\d+))?$").expect("bare pattern compiles"));
static HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").expect("hyphen pattern compiles"));
static OPERATOR_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(>=|<=|<>|!=|==|=|>|<|\^|~)\s+").expect("operator gap pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" | "=" => Some(Operator::Equal),
            "!=" | "<>" => Some(Operator::NotEqual),
            ">" => Some(Operator::GreaterThan),
            ">=" => Some(Operator::GreaterThanOrEqual),
            "<" => Some(Operator::LessThan),
            "<=" => Some(Operator::LessThanOrEqual),
            _ => None,
        }
    }

    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match self {
            Operator::Equal => ordering == Some(Ordering::Equal),
            Operator::NotEqual => ordering != Some(Ordering::Equal),
            Operator::GreaterThan => ordering == Some(Ordering::Greater),
            Operator::GreaterThanOrEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::LessThan => ordering == Some(Ordering::Less),
            Operator::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// The evaluated shape of a constraint string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    Any,
    Exact(String),
    Comparison(Operator, String),
    /// `[lower, upper)` produced by caret and tilde ranges.
    Range { lower: Vec<u64>, upper: Vec<u64> },
    /// String prefix match such as `8.1.` for `8.1.*` or bare `8.1`.
    Wildcard(String),
    Branch(String),
    And(Vec<ConstraintKind>),
    Or(Vec<ConstraintKind>),
    Unrecognized,
}

impl ConstraintKind {
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            ConstraintKind::Any => true,
            ConstraintKind::Exact(target) => {
                version.compare(&Version::parse(target)) == Some(Ordering::Equal)
            }
            ConstraintKind::Comparison(op, target) => {
                op.holds(version.compare(&Version::parse(target)))
            }
            ConstraintKind::Range { lower, upper } => match version.release() {
                Some(release) => {
                    compare_segments(release, lower) != Ordering::Less
                        && compare_segments(release, upper) == Ordering::Less
                }
                None => false,
            },
            ConstraintKind::Wildcard(prefix) => version.normalized.starts_with(prefix.as_str()),
            ConstraintKind::Branch(name) => version.normalized.eq_ignore_ascii_case(name),
            ConstraintKind::And(parts) => parts.iter().all(|part| part.matches(version)),
            ConstraintKind::Or(branches) => branches.iter().any(|branch| branch.matches(version)),
            ConstraintKind::Unrecognized => false,
        }
    }
}

fn compare_segments(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let av = a.get(i).copied().unwrap_or(0);
        let bv = b.get(i).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// A raw constraint string together with its parsed kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    kind: ConstraintKind,
}

impl Constraint {
    pub fn parse(raw: &str) -> Self {
        Constraint {
            raw: raw.to_string(),
            kind: parse_constraint(raw),
        }
    }

    /// `self.version` pins a requirement to the version of the requiring package.
    pub fn is_self_version(raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case("self.version")
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.kind.matches(version)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_constraint(raw: &str) -> ConstraintKind {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ConstraintKind::Any;
    }

    // OR first: `^2.5|^3` must be split before either side is read as a caret range
    let unified = trimmed.replace("||", "|");
    if unified.contains('|') {
        return ConstraintKind::Or(unified.split('|').map(parse_branch).collect());
    }

    parse_branch(trimmed)
}

fn parse_branch(branch: &str) -> ConstraintKind {
    let stripped = strip_flags(branch.trim());
    if stripped.is_empty() {
        // A bare stability flag such as `@dev` places no version bound
        return if branch.trim().is_empty() {
            ConstraintKind::Unrecognized
        } else {
            ConstraintKind::Any
        };
    }

    let compact = OPERATOR_GAP.replace_all(stripped, "$1");
    let branch: &str = &compact;

    if branch == "*" || branch.eq_ignore_ascii_case("x") {
        return ConstraintKind::Any;
    }

    if let Some(caps) = CARET.captures(branch) {
        let (major, minor, patch) = capture_triplet(&caps);
        return ConstraintKind::Range {
            lower: vec![major, minor.unwrap_or(0), patch.unwrap_or(0)],
            upper: vec![major.saturating_add(1), 0, 0],
        };
    }

    if let Some(caps) = TILDE.captures(branch) {
        let (major, minor, patch) = capture_triplet(&caps);
        let upper = match (minor, patch) {
            (Some(minor), Some(_)) => vec![major, minor.saturating_add(1), 0],
            _ => vec![major.saturating_add(1), 0, 0],
        };
        return ConstraintKind::Range {
            lower: vec![major, minor.unwrap_or(0), patch.unwrap_or(0)],
            upper,
        };
    }

    if let Some(caps) = WILDCARD.captures(branch) {
        return ConstraintKind::Wildcard(format!("{}.", &caps[1]));
    }

    if let Some(caps) = OPERATOR.captures(branch) {
        let operator = Operator::from_symbol(&caps[1]);
        let target = crate::constraint::version::normalize(&caps[2]);
        return match operator {
            Some(op) if Version::parse(&target).is_orderable() => {
                ConstraintKind::Comparison(op, target)
            }
            Some(Operator::Equal) if is_branch(&target) => ConstraintKind::Branch(target),
            _ => ConstraintKind::Unrecognized,
        };
    }

    if EXACT.is_match(branch) {
        return ConstraintKind::Exact(crate::constraint::version::normalize(branch));
    }

    if let Some(caps) = BARE.captures(branch) {
        let prefix = match caps.get(2) {
            Some(minor) => format!("{}.{}.", &caps[1], minor.as_str()),
            None => format!("{}.", &caps[1]),
        };
        return ConstraintKind::Wildcard(prefix);
    }

    if is_branch(branch) {
        return ConstraintKind::Branch(branch.to_string());
    }

    if let Some(caps) = HYPHEN.captures(branch) {
        return ConstraintKind::And(vec![
            parse_branch(&format!(">={}", &caps[1])),
            parse_branch(&format!("<={}", &caps[2])),
        ]);
    }

    if branch.contains(',') {
        return ConstraintKind::And(branch.split(',').map(parse_branch).collect());
    }

    if branch.split_whitespace().nth(1).is_some() {
        return ConstraintKind::And(branch.split_whitespace().map(parse_branch).collect());
    }

    ConstraintKind::Unrecognized
}

fn capture_triplet(caps: &regex::Captures<'_>) -> (u64, Option<u64>, Option<u64>) {
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    (number(1).unwrap_or(0), number(2), number(3))
}

fn is_branch(value: &str) -> bool {
    value.to_ascii_lowercase().starts_with("dev-")
}

/// Drop `@stability` flags and `#commit` references.
fn strip_flags(branch: &str) -> &str {
    let without_ref = branch.split('#').next().unwrap_or_default();
    match without_ref.find('@') {
        Some(idx) => without_ref[..idx].trim(),
        None => without_ref.trim(),
    }
}

pub struct ConstraintEvaluator;

impl ConstraintEvaluator {
    /// Total: malformed constraints evaluate to `false`, the empty constraint to `true`.
    pub fn satisfies(version: &str, constraint: &str) -> bool {
        Constraint::parse(constraint).matches(&Version::parse(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat(version: &str, constraint: &str) -> bool {
        ConstraintEvaluator::satisfies(version, constraint)
    }

    #[test]
    fn empty_constraint_is_always_satisfied() {
        assert!(sat("1.0.0", ""));
        assert!(sat("dev-main", "   "));
    }

    #[test]
    fn wildcard_matches_by_prefix() {
        assert!(sat("8.1.5", "8.1.*"));
        assert!(sat("8.1.0", "8.1.*"));
        assert!(!sat("8.2.0", "8.1.*"));
        assert!(!sat("8.10.0", "8.1.*"));
        assert!(sat("v8.1.2", "8.1.*"));
    }

    #[test]
    fn bare_major_minor_behaves_like_wildcard() {
        assert!(sat("8.1.5", "8.1"));
        assert!(!sat("8.2.0", "8.1"));
        assert!(sat("3.4.0", "3"));
        assert!(!sat("4.0.0", "3"));
    }

    #[test]
    fn caret_ranges() {
        assert!(sat("8.2.0", "^8.1.0"));
        assert!(sat("8.1.0", "^8.1.0"));
        assert!(!sat("8.0.9", "^8.1.0"));
        assert!(!sat("9.0.0", "^8.1.0"));
        assert!(sat("5.9.1", "^5"));
        assert!(!sat("6.0.0", "^5.6"));
        assert!(!sat("6.0.0", "^5.0"));
    }

    #[test]
    fn tilde_ranges_depend_on_patch_presence() {
        assert!(sat("1.9.0", "~1.2"));
        assert!(sat("1.2.0", "~1.2"));
        assert!(!sat("2.0.0", "~1.2"));
        assert!(!sat("1.1.9", "~1.2"));

        assert!(sat("1.2.9", "~1.2.3"));
        assert!(!sat("1.3.0", "~1.2.3"));
        assert!(!sat("1.2.2", "~1.2.3"));

        assert!(sat("1.5.0", "~1"));
        assert!(!sat("2.0.0", "~1"));
    }

    #[test]
    fn comparison_operators() {
        assert!(sat("2.0.0", ">=2.0"));
        assert!(sat("2.0.1", ">2.0.0"));
        assert!(!sat("2.0.0", ">2.0.0"));
        assert!(sat("1.9.9", "<2.0"));
        assert!(sat("2.0", "<=2.0.0"));
        assert!(sat("2.0.0", "==2.0.0"));
        assert!(sat("2.0.1", "!=2.0.0"));
        assert!(!sat("2.0.0", "!=2.0.0"));
        assert!(sat("2.0.0", ">= 1.5"));
    }

    #[test]
    fn exact_versions() {
        assert!(sat("1.2.3", "1.2.3"));
        assert!(sat("v1.2.3", "1.2.3"));
        assert!(!sat("1.2.4", "1.2.3"));
    }

    #[test]
    fn or_constraints_split_before_ranges() {
        assert!(sat("2.6.0", "^2.5|^3"));
        assert!(sat("3.1.0", "^2.5|^3"));
        assert!(sat("3.1.0", "^2.5 || ^3.0"));
        assert!(!sat("4.0.0", "^2.5|^3"));
    }

    #[test]
    fn or_outcome_is_disjunction_of_branches() {
        let branches = ["^1.0", "~2.3.1", "3.*", ">=5", "bogus"];
        let versions = ["0.9.0", "1.4.2", "2.3.5", "2.4.0", "3.0.1", "5.2.0"];

        for a in branches {
            for b in branches {
                for v in versions {
                    assert_eq!(
                        sat(v, &format!("{a}|{b}")),
                        sat(v, a) || sat(v, b),
                        "{v} against {a}|{b}"
                    );
                }
            }
        }
    }

    #[test]
    fn and_constraints() {
        assert!(sat("1.5.0", ">=1.0,<2.0"));
        assert!(!sat("2.0.0", ">=1.0,<2.0"));
        assert!(sat("1.5.0", ">=1.0 <2.0"));
        assert!(!sat("0.9.0", ">=1.0 <2.0"));
    }

    #[test]
    fn hyphen_range() {
        assert!(sat("1.5.0", "1.0 - 2.0"));
        assert!(sat("2.0.0", "1.0 - 2.0"));
        assert!(!sat("2.0.1", "1.0 - 2.0"));
    }

    #[test]
    fn stability_flags_are_ignored() {
        assert!(sat("1.2.0", "^1.0@dev"));
        assert!(sat("1.2.0", "@stable"));
    }

    #[test]
    fn branches_match_only_themselves() {
        assert!(sat("dev-main", "dev-main"));
        assert!(!sat("1.0.0", "dev-main"));
        assert!(!sat("dev-main", "^1.0"));
    }

    #[test]
    fn unrecognized_forms_reject() {
        assert!(!sat("1.0.0", "latest"));
        assert!(!sat("1.0.0", ">=abc"));
        assert!(!sat("1.0.0", "self.version"));
        assert!(!sat("not-a-version", "^1.0"));
    }

    #[test]
    fn caret_property_holds_over_grid() {
        for major in 0..3u64 {
            for minor in 0..3u64 {
                for patch in 0..3u64 {
                    let v = format!("{major}.{minor}.{patch}");
                    let expected = (major, minor, patch) >= (1, 1, 1) && major < 2;
                    assert_eq!(sat(&v, "^1.1.1"), expected, "{v}");
                }
            }
        }
    }

    #[test]
    fn self_version_marker() {
        assert!(Constraint::is_self_version("self.version"));
        assert!(!Constraint::is_self_version("^1.0"));
    }
}
