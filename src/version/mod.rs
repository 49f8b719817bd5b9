// src/version/mod.rs

//! Package identifiers, version comparison and pattern matching
//!
//! Package records identify themselves with a `pkgver` string of the form
//! `name-version` (for example `libfoo-1.2_3`). Dependencies are expressed
//! as patterns, either version constrained (`libfoo>=1.2<2.0`) or shell
//! globs (`libfoo-1.[0-9]*`).
//!
//! The query engine only ever calls `PatternMatcher::matches`; plug a
//! different grammar in by implementing that trait.

use semver::Version;
use std::cmp::Ordering;

/// Name component of a `name-version` string
///
/// Splits at the last `-`. Returns `None` for strings that carry no
/// version (`"foo"`) or have an empty side (`"-1.0"`, `"foo-"`).
pub fn pkg_name(pkgver: &str) -> Option<&str> {
    split_pkgver(pkgver).map(|(name, _)| name)
}

/// Version component of a `name-version` string
pub fn pkg_version(pkgver: &str) -> Option<&str> {
    split_pkgver(pkgver).map(|(_, version)| version)
}

fn split_pkgver(pkgver: &str) -> Option<(&str, &str)> {
    let (name, version) = pkgver.rsplit_once('-')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// Name component of a version-constrained pattern (`foo>=1.0` → `foo`)
///
/// Returns `None` when the pattern has no relational operator.
pub fn pkgpattern_name(pattern: &str) -> Option<&str> {
    let pos = pattern.find(['<', '>', '='])?;
    let name = &pattern[..pos];
    if name.is_empty() { None } else { Some(name) }
}

/// Compare two version strings
///
/// Semver-compliant versions compare as semver. Anything else is split
/// into runs of digits and runs of letters; digit runs compare
/// numerically, letter runs lexicographically, and a missing component
/// sorts before a present one. The `_N` revision suffix is just another
/// component, so `1.0_2` > `1.0_1` > `1.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if let (Ok(va), Ok(vb)) = (Version::parse(a), Version::parse(b)) {
        return va.cmp(&vb);
    }

    let left = components(a);
    let right = components(b);
    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Component::Number(x), Component::Number(y)) => x.cmp(y),
            (Component::Alpha(x), Component::Alpha(y)) => x.cmp(y),
            // 1.0.1 > 1.0.beta
            (Component::Number(_), Component::Alpha(_)) => Ordering::Greater,
            (Component::Alpha(_), Component::Number(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

#[derive(Debug, PartialEq, Eq)]
enum Component<'a> {
    Number(u64),
    Alpha(&'a str),
}

fn components(version: &str) -> Vec<Component<'_>> {
    let mut out = Vec::new();
    let bytes = version.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i].is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            // Saturate absurdly long digit runs rather than fail
            let n = version[start..i].parse::<u64>().unwrap_or(u64::MAX);
            out.push(Component::Number(n));
        } else if bytes[i].is_ascii_alphabetic() {
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            out.push(Component::Alpha(&version[start..i]));
        } else {
            i += 1;
        }
    }
    out
}

/// Relational operator in a version-constrained pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl Operator {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Operator::Less => ord == Ordering::Less,
            Operator::LessOrEqual => ord != Ordering::Greater,
            Operator::Equal => ord == Ordering::Equal,
            Operator::GreaterOrEqual => ord != Ordering::Less,
            Operator::Greater => ord == Ordering::Greater,
        }
    }
}

/// Parse the constraint tail of a pattern (`>=1.0<2.0`) into operator/version pairs
fn parse_constraints(mut rest: &str) -> Option<Vec<(Operator, &str)>> {
    let mut constraints = Vec::new();
    while !rest.is_empty() {
        let (op, len) = if rest.starts_with(">=") {
            (Operator::GreaterOrEqual, 2)
        } else if rest.starts_with("<=") {
            (Operator::LessOrEqual, 2)
        } else if rest.starts_with("==") {
            (Operator::Equal, 2)
        } else if rest.starts_with('>') {
            (Operator::Greater, 1)
        } else if rest.starts_with('<') {
            (Operator::Less, 1)
        } else if rest.starts_with('=') {
            (Operator::Equal, 1)
        } else {
            return None;
        };
        rest = &rest[len..];
        let end = rest.find(['<', '>', '=']).unwrap_or(rest.len());
        let version = &rest[..end];
        if version.is_empty() {
            return None;
        }
        constraints.push((op, version));
        rest = &rest[end..];
    }
    Some(constraints)
}

/// Predicate deciding whether a `name-version` string satisfies a pattern
pub trait PatternMatcher {
    fn matches(&self, pkgver: &str, pattern: &str) -> bool;
}

/// Default pattern grammar
///
/// - `name<op>version[<op>version]` with operators `<`, `<=`, `>`, `>=`,
///   `=`/`==`: the names must be equal and every constraint must hold;
/// - patterns containing `*`, `?` or `[`: shell glob over the whole `pkgver`;
/// - anything else: exact string equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMatcher;

impl PatternMatcher for DefaultMatcher {
    fn matches(&self, pkgver: &str, pattern: &str) -> bool {
        if let Some(name) = pkgpattern_name(pattern) {
            let Some((pkgname, version)) = split_pkgver(pkgver) else {
                return false;
            };
            if pkgname != name {
                return false;
            }
            return match parse_constraints(&pattern[name.len()..]) {
                Some(constraints) => constraints
                    .iter()
                    .all(|(op, wanted)| op.accepts(compare_versions(version, wanted))),
                None => false,
            };
        }

        if pattern.contains(['*', '?', '[']) {
            return glob::Pattern::new(pattern)
                .map(|p| p.matches(pkgver))
                .unwrap_or(false);
        }

        pkgver == pattern
    }
}
