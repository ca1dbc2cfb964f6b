//! Installed versions and the constraint expressions declared against them.
//!
//! Versions are ordered on their full public form: epoch, release segments
//! (zero padded), pre-release phase, post-release and dev-release numbers,
//! then the local label. Strict semver strings go through [`semver`] first;
//! looser ecosystem versions (`2.31.0.6`, `1.0.post2`, `2.0rc1`) are parsed
//! by hand. Anything that still does not parse is kept as a raw string whose
//! comparisons are undecidable.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// An installed package version.
///
/// # Example
///
/// ```rust
/// use deptree::registry::Version;
///
/// let v = Version::parse("2.0");
/// assert!(v.is_known());
/// assert_eq!(v.as_str(), "2.0");
/// assert!(Version::parse("1.9.9") < v);
/// assert!(Version::parse("2.0.post1") > v);
/// assert!(Version::parse("2.0.dev1") < Version::parse("2.0a1"));
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parsed: Option<VersionKey>,
}

impl Version {
    /// Parses a version string leniently. Never fails; see [`Version::is_known`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            raw: raw.to_string(),
            parsed: VersionKey::parse(raw),
        }
    }

    /// The version exactly as it was supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release segments, if the version could be parsed.
    pub fn release(&self) -> Option<&[u64]> {
        self.parsed.as_ref().map(|k| k.release.as_slice())
    }

    /// Returns true for pre-releases and dev releases.
    pub fn is_prerelease(&self) -> bool {
        self.parsed.as_ref().is_some_and(VersionKey::is_prerelease)
    }

    /// Returns true if the version parsed into a comparable form.
    pub fn is_known(&self) -> bool {
        self.parsed.is_some()
    }

    fn key(&self) -> Option<&VersionKey> {
        self.parsed.as_ref()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a == b,
            _ => self.raw == other.raw,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ if self.raw == other.raw => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

/// Pre-release phase, in release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Alpha,
    Beta,
    Rc,
}

/// Where a version sits relative to the final release of its segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    /// `1.0.dev1`: before every pre-release of `1.0`
    DevOnly,
    Pre(Phase, u64),
    /// Final release and its post-releases
    Final,
}

/// A dev number sorts before the same version without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DevStage {
    Dev(u64),
    Release,
}

/// Local label segment; numbers sort after text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalPart {
    Text(String),
    Num(u64),
}

impl LocalPart {
    fn parse(part: &str) -> Self {
        match part.parse() {
            Ok(n) => LocalPart::Num(n),
            Err(_) => LocalPart::Text(part.to_ascii_lowercase()),
        }
    }
}

/// Ordering key of a parsed version.
#[derive(Debug, Clone, Default)]
struct VersionKey {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(Phase, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalPart>,
}

impl VersionKey {
    fn parse(raw: &str) -> Option<Self> {
        let s = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        if let Ok(v) = semver::Version::parse(s) {
            return Self::from_semver(&v);
        }

        let (epoch, s) = match s.split_once('!') {
            Some((epoch, rest)) => (epoch.parse().ok()?, rest),
            None => (0, s),
        };
        let (public, local) = match s.split_once('+') {
            Some((public, local)) => (public, Some(local)),
            None => (s, None),
        };

        let release_end = release_len_bytes(public);
        if release_end == 0 {
            return None;
        }
        let release = public[..release_end]
            .split('.')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;

        let mut key = Self {
            epoch,
            release,
            ..Self::default()
        };
        key.apply_suffix(&public[release_end..])?;
        if let Some(local) = local {
            key.apply_local(local)?;
        }
        Some(key)
    }

    fn from_semver(v: &semver::Version) -> Option<Self> {
        let mut key = Self {
            release: vec![v.major, v.minor, v.patch],
            ..Self::default()
        };
        key.apply_suffix(v.pre.as_str())?;
        if !v.build.is_empty() {
            key.apply_local(v.build.as_str())?;
        }
        Some(key)
    }

    /// Reads `a1`, `.post2`, `-dev3`, `-1` and similar tags after the release.
    fn apply_suffix(&mut self, suffix: &str) -> Option<()> {
        let lowered = suffix.to_ascii_lowercase();
        let mut rest = lowered.as_str();
        loop {
            rest = rest.trim_start_matches(['.', '-', '_']);
            if rest.is_empty() {
                return Some(());
            }
            let label_end = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let (label, tail) = rest.split_at(label_end);
            // A separator may sit between a tag and its number: `rc.1`
            let tail = if label.is_empty() {
                tail
            } else {
                match tail.strip_prefix(['.', '-', '_']) {
                    Some(t) if t.starts_with(|c: char| c.is_ascii_digit()) => t,
                    _ => tail,
                }
            };
            let num_end = tail
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(tail.len());
            let (digits, tail) = tail.split_at(num_end);
            if label.is_empty() && digits.is_empty() {
                return None;
            }
            let num: u64 = if digits.is_empty() { 0 } else { digits.parse().ok()? };

            let slot = match label {
                "a" | "alpha" => Self::set_once(&mut self.pre, (Phase::Alpha, num)),
                "b" | "beta" => Self::set_once(&mut self.pre, (Phase::Beta, num)),
                "c" | "rc" | "pre" | "preview" => Self::set_once(&mut self.pre, (Phase::Rc, num)),
                "" | "post" | "rev" | "r" => Self::set_once(&mut self.post, num),
                "dev" => Self::set_once(&mut self.dev, num),
                _ => None,
            };
            slot?;
            rest = tail;
        }
    }

    fn set_once<T>(slot: &mut Option<T>, value: T) -> Option<()> {
        if slot.is_some() {
            return None;
        }
        *slot = Some(value);
        Some(())
    }

    fn apply_local(&mut self, local: &str) -> Option<()> {
        let parts: Vec<&str> = local.split(['.', '-', '_']).collect();
        if parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_alphanumeric())) {
            return None;
        }
        self.local = parts.into_iter().map(LocalPart::parse).collect();
        Some(())
    }

    /// Lowest possible version whose release starts with `release`.
    fn floor_of(epoch: u64, release: Vec<u64>) -> Self {
        Self {
            epoch,
            release,
            dev: Some(0),
            ..Self::default()
        }
    }

    fn stage(&self) -> Stage {
        match (self.pre, self.post, self.dev) {
            (Some((phase, n)), _, _) => Stage::Pre(phase, n),
            (None, None, Some(_)) => Stage::DevOnly,
            _ => Stage::Final,
        }
    }

    fn dev_stage(&self) -> DevStage {
        self.dev.map_or(DevStage::Release, DevStage::Dev)
    }

    fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Release segment at `i`, zero padded.
    fn segment(&self, i: usize) -> u64 {
        self.release.get(i).copied().unwrap_or(0)
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn same_release(&self, other: &Self) -> bool {
        self.epoch == other.epoch && self.cmp_release(other) == Ordering::Equal
    }

    /// Ordering without the local label.
    fn cmp_public(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.cmp_release(other))
            .then_with(|| self.stage().cmp(&other.stage()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_stage().cmp(&other.dev_stage()))
    }

    /// Whether the first `n` release segments equal those of `other`.
    fn prefix_eq(&self, other: &Self, n: usize) -> bool {
        self.epoch == other.epoch && (0..n).all(|i| self.segment(i) == other.segment(i))
    }

    /// Lowest version after every release starting with the first `n`
    /// segments. `None` if the last kept segment cannot be bumped.
    fn prefix_ceiling(&self, n: usize) -> Option<Self> {
        let mut release: Vec<u64> = (0..n).map(|i| self.segment(i)).collect();
        let last = release.last_mut()?;
        *last = last.checked_add(1)?;
        Some(Self::floor_of(self.epoch, release))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey {}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_public(other)
            .then_with(|| self.local.cmp(&other.local))
    }
}

/// Byte length of the leading `N(.N)*` release segment of a version string.
fn release_len_bytes(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            end = i + 1;
        } else if b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            continue;
        } else {
            break;
        }
    }
    end
}

/// Number of numeric release segments written in a version string.
fn release_segments(s: &str) -> usize {
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    let s = s.split_once('!').map_or(s, |(_, rest)| rest);
    let end = release_len_bytes(s);
    if end == 0 {
        0
    } else {
        s[..end].split('.').count()
    }
}

/// Comparison operator of a single constraint clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    /// `==`, optionally with a `.*` prefix wildcard
    Equal,
    /// `!=`, optionally with a `.*` prefix wildcard
    NotEqual,
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `~=` compatible release
    Compatible,
    /// `===` raw string equality
    Arbitrary,
}

impl Operator {
    fn split(clause: &str) -> (Self, &str) {
        const OPS: [(&str, Operator); 8] = [
            ("===", Operator::Arbitrary),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            ("~=", Operator::Compatible),
            (">=", Operator::GreaterEqual),
            ("<=", Operator::LessEqual),
            (">", Operator::Greater),
            ("<", Operator::Less),
        ];
        for (token, op) in OPS {
            if let Some(rest) = clause.strip_prefix(token) {
                return (op, rest.trim());
            }
        }
        (Operator::Equal, clause)
    }
}

#[derive(Debug, Clone)]
struct Clause {
    op: Operator,
    version: Version,
    wildcard: bool,
    /// Release segments that must match for `.*` and `~=`
    prefix: usize,
    /// Exclusive upper bound for `.*` and `~=`
    ceiling: Option<VersionKey>,
}

impl Clause {
    fn parse(text: &str) -> Option<Self> {
        let (op, rest) = Operator::split(text.trim());
        if rest.is_empty() {
            return None;
        }
        if op == Operator::Arbitrary {
            return Some(Self {
                op,
                version: Version::parse(rest),
                wildcard: false,
                prefix: 0,
                ceiling: None,
            });
        }

        let (body, wildcard) = match rest.strip_suffix(".*") {
            Some(body) if matches!(op, Operator::Equal | Operator::NotEqual) => (body, true),
            Some(_) => return None,
            None => (rest, false),
        };
        let segments = release_segments(body);
        let version = Version::parse(body);
        let key = version.key()?;

        let prefix = match op {
            Operator::Compatible if segments < 2 => return None,
            Operator::Compatible => segments - 1,
            _ if wildcard => segments,
            _ => 0,
        };
        let ceiling = if prefix > 0 {
            Some(key.prefix_ceiling(prefix)?)
        } else {
            None
        };

        Some(Self {
            op,
            version,
            wildcard,
            prefix,
            ceiling,
        })
    }

    fn matches(&self, installed: &Version) -> Option<bool> {
        if self.op == Operator::Arbitrary {
            return Some(installed.as_str().eq_ignore_ascii_case(self.version.as_str()));
        }
        let have = installed.key()?;
        let want = self.version.key()?;
        // A clause without a local label ignores the installed one
        let ord = if want.local.is_empty() {
            have.cmp_public(want)
        } else {
            have.cmp(want)
        };

        let result = match self.op {
            Operator::Equal if self.wildcard => have.prefix_eq(want, self.prefix),
            Operator::NotEqual if self.wildcard => !have.prefix_eq(want, self.prefix),
            Operator::Equal => ord == Ordering::Equal,
            Operator::NotEqual => ord != Ordering::Equal,
            Operator::GreaterEqual => ord != Ordering::Less,
            Operator::LessEqual => ord != Ordering::Greater,
            // `>1.0` does not admit `1.0.post1`, `<1.0` does not admit `1.0rc1`
            Operator::Greater => {
                ord == Ordering::Greater
                    && !(have.post.is_some() && want.post.is_none() && have.same_release(want))
            }
            Operator::Less => {
                ord == Ordering::Less
                    && !(have.is_prerelease() && !want.is_prerelease() && have.same_release(want))
            }
            Operator::Compatible => ord != Ordering::Less && have.prefix_eq(want, self.prefix),
            Operator::Arbitrary => return None,
        };
        Some(result)
    }

    fn interval(&self) -> Interval {
        let Some(v) = self.version.key().cloned() else {
            return Interval::UNBOUNDED;
        };
        let ceiling = self.ceiling.clone().map(|c| (c, false));
        match self.op {
            Operator::Equal if self.wildcard => Interval {
                lower: Some((
                    VersionKey::floor_of(v.epoch, (0..self.prefix).map(|i| v.segment(i)).collect()),
                    true,
                )),
                upper: ceiling,
            },
            Operator::Equal => Interval {
                lower: Some((v.clone(), true)),
                upper: Some((v, true)),
            },
            Operator::GreaterEqual => Interval {
                lower: Some((v, true)),
                upper: None,
            },
            Operator::Greater => Interval {
                lower: Some((v, false)),
                upper: None,
            },
            Operator::LessEqual => Interval {
                lower: None,
                upper: Some((v, true)),
            },
            Operator::Less => Interval {
                lower: None,
                upper: Some((v, false)),
            },
            Operator::Compatible => Interval {
                lower: Some((v, true)),
                upper: ceiling,
            },
            Operator::NotEqual | Operator::Arbitrary => Interval::UNBOUNDED,
        }
    }
}

/// Conservative version range implied by a constraint. `!=` and `===`
/// clauses do not narrow it.
#[derive(Debug, Clone)]
struct Interval {
    lower: Option<(VersionKey, bool)>,
    upper: Option<(VersionKey, bool)>,
}

impl Interval {
    const UNBOUNDED: Interval = Interval {
        lower: None,
        upper: None,
    };

    fn intersect(self, other: Interval) -> Interval {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(match a.0.cmp(&b.0) {
                Ordering::Greater => a,
                Ordering::Less => b,
                Ordering::Equal => (a.0, a.1 && b.1),
            }),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(match a.0.cmp(&b.0) {
                Ordering::Less => a,
                Ordering::Greater => b,
                Ordering::Equal => (a.0, a.1 && b.1),
            }),
            (a, b) => a.or(b),
        };
        Interval { lower, upper }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some((lo, lo_inc)), Some((hi, hi_inc))) => match lo.cmp(hi) {
                Ordering::Greater => true,
                Ordering::Equal => !(*lo_inc && *hi_inc),
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

/// A version constraint expression such as `>=1.0,<2.0`.
///
/// An empty expression accepts any version. Clauses that cannot be parsed
/// make the whole expression undecidable: [`VersionConstraint::satisfied_by`]
/// then returns `None` instead of guessing.
///
/// # Example
///
/// ```rust
/// use deptree::registry::{Version, VersionConstraint};
///
/// let c = VersionConstraint::parse(">=1.0,<2.0");
/// assert_eq!(c.satisfied_by(&Version::parse("1.5")), Some(true));
/// assert_eq!(c.satisfied_by(&Version::parse("2.0.0")), Some(false));
/// assert!(VersionConstraint::any().is_any());
/// ```
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    raw: String,
    clauses: Vec<Clause>,
    undecidable: bool,
}

impl VersionConstraint {
    /// Parses a comma-separated constraint expression.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let mut clauses = Vec::new();
        let mut undecidable = false;
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match Clause::parse(part) {
                Some(clause) => clauses.push(clause),
                None => undecidable = true,
            }
        }
        Self {
            raw: raw.to_string(),
            clauses,
            undecidable,
        }
    }

    /// A constraint that accepts every version.
    pub fn any() -> Self {
        Self::parse("")
    }

    /// Returns true if the expression places no restriction on the version.
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty() && !self.undecidable
    }

    /// The expression exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `version` satisfies every clause; `None` when undecidable.
    pub fn satisfied_by(&self, version: &Version) -> Option<bool> {
        if self.undecidable {
            return None;
        }
        let mut decided = true;
        for clause in &self.clauses {
            match clause.matches(version) {
                Some(false) => return Some(false),
                Some(true) => {}
                None => decided = false,
            }
        }
        decided.then_some(true)
    }

    fn interval(&self) -> Interval {
        self.clauses
            .iter()
            .map(Clause::interval)
            .fold(Interval::UNBOUNDED, Interval::intersect)
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for VersionConstraint {}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            f.write_str("Any")
        } else {
            f.write_str(&self.raw)
        }
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Returns true if some version could satisfy all `constraints` at once.
///
/// Only the range implied by each expression is considered; undecidable
/// expressions are skipped.
///
/// # Example
///
/// ```rust
/// use deptree::registry::{constraints_compatible, VersionConstraint};
///
/// let a = VersionConstraint::parse(">=2.0");
/// let b = VersionConstraint::parse("<2.0");
/// assert!(!constraints_compatible([&a, &b]));
/// ```
pub fn constraints_compatible<'a>(
    constraints: impl IntoIterator<Item = &'a VersionConstraint>,
) -> bool {
    !constraints
        .into_iter()
        .filter(|c| !c.undecidable)
        .map(VersionConstraint::interval)
        .fold(Interval::UNBOUNDED, Interval::intersect)
        .is_empty()
}
