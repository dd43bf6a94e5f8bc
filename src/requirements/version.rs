//! Semantic version triples extracted from `--version` output.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

/// A `major.minor.patch` triple. Missing components count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extracts the first version-looking token from free-form text, such as
    /// `v18.17.1`, `Python 3.11` or `Docker version 24.0.5, build ced0996`.
    pub fn extract(text: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
        });

        let captures = pattern.captures(text)?;
        let component = |index: usize| -> Option<u64> {
            match captures.get(index) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// Whether `self` is at least `minimum`.
    pub fn meets(&self, minimum: &Version) -> bool {
        self >= minimum
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_common_outputs() {
        assert_eq!(Version::extract("v18.17.1"), Some(Version::new(18, 17, 1)));
        assert_eq!(Version::extract("9.6.7\n"), Some(Version::new(9, 6, 7)));
        assert_eq!(Version::extract("git version 2.39.2"), Some(Version::new(2, 39, 2)));
        assert_eq!(
            Version::extract("Docker version 24.0.5, build ced0996"),
            Some(Version::new(24, 0, 5))
        );
        assert_eq!(
            Version::extract("pip 23.2.1 from /usr/lib/python3/dist-packages/pip (python 3.11)"),
            Some(Version::new(23, 2, 1))
        );
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(Version::extract("Python 3.11"), Some(Version::new(3, 11, 0)));
        assert_eq!(Version::extract("v20"), Some(Version::new(20, 0, 0)));
    }

    #[test]
    fn test_no_version() {
        assert_eq!(Version::extract("command not found"), None);
    }

    #[test]
    fn test_ordering() {
        let minimum = Version::new(18, 0, 0);
        assert!(Version::new(18, 0, 0).meets(&minimum));
        assert!(Version::new(20, 1, 0).meets(&minimum));
        assert!(!Version::new(16, 20, 2).meets(&minimum));
        assert!(Version::new(3, 10, 0) > Version::new(3, 9, 18));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
    }
}
