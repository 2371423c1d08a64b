use std::cmp::Ordering;
use std::fmt;

use itertools::{EitherOrBoth, Itertools};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(
        r"^(?P<major>0|[1-9]\d*)(?:\.(?P<minor>0|[1-9]\d*))?(?:\.(?P<patch>0|[1-9]\d*))?(?:-(?P<prerelease>(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+(?P<build>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$"
    )
    .unwrap();
}

/// A parsed version under the targeting version grammar.
///
/// The grammar is `major(.minor)?(.patch)?(-prerelease)?(+build)?` where missing `minor` and
/// `patch` default to `0`. Unlike strict semver, two-segment (`"2.1"`) and one-segment (`"2"`)
/// forms are valid. Build metadata is carried for display but ignored by equality and
/// ordering.
#[derive(Clone, Debug)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    prerelease: Vec<String>,
    build: Vec<String>,
}

impl Version {
    /// Parse a version string, returning None if the input does not conform to the grammar.
    ///
    /// Parse failure is an ordinary non-match for the version matcher, never an error.
    pub fn parse(value: &str) -> Option<Version> {
        let captures = VERSION_REGEX.captures(value)?;

        // The regex guarantees each numeric segment is digits with no leading zero; parsing
        // can still overflow, which we treat as "not a version".
        let segment = |name: &str| -> Option<u64> {
            match captures.name(name) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };

        let identifiers = |name: &str| -> Vec<String> {
            captures
                .name(name)
                .map(|m| m.as_str().split('.').map(String::from).collect())
                .unwrap_or_default()
        };

        Some(Version {
            major: segment("major")?,
            minor: segment("minor")?,
            patch: segment("patch")?,
            prerelease: identifiers("prerelease"),
            build: identifiers("build"),
        })
    }

    fn compare_prerelease(&self, other: &Version) -> Ordering {
        // A version with no prerelease ranks above any prereleased one.
        match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => (),
        }

        for pair in self.prerelease.iter().zip_longest(other.prerelease.iter()) {
            let ordering = match pair {
                EitherOrBoth::Both(lhs, rhs) => compare_identifiers(lhs, rhs),
                // Shared identifiers are all equal; the longer list is greater.
                EitherOrBoth::Left(_) => Ordering::Greater,
                EitherOrBoth::Right(_) => Ordering::Less,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

/// Numeric identifiers compare numerically and always rank below alphanumeric ones;
/// alphanumeric identifiers compare byte-wise.
fn compare_identifiers(lhs: &str, rhs: &str) -> Ordering {
    match (lhs.parse::<u64>(), rhs.parse::<u64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => lhs.cmp(rhs),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.patch.cmp(&other.patch))
            .then_with(|| self.compare_prerelease(other))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease.join("."))?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}
