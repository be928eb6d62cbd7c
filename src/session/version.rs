//! Server version numbers.

use std::fmt;
use std::str::FromStr;

/// Parsed `@@version` string such as `8.0.36-0ubuntu0.22.04.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Anything after the numeric part, without the leading separator.
    pub extra: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            extra: String::new(),
        }
    }

    /// Whether this version is at least `major.minor.patch`.
    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let numeric_end = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (numeric, rest) = s.split_at(numeric_end);

        let mut parts = numeric.split('.');
        let mut next = |name: &str| -> Result<u32, String> {
            match parts.next() {
                Some(p) if !p.is_empty() => p
                    .parse::<u32>()
                    .map_err(|_| format!("invalid {name} version '{p}' in '{s}'")),
                _ => Err(format!("missing {name} version in '{s}'")),
            }
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch").unwrap_or(0);

        let extra = rest.trim_start_matches(['-', '+', ' ']).to_string();
        Ok(Self {
            major,
            minor,
            patch,
            extra,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.extra.is_empty() {
            write!(f, "-{}", self.extra)?;
        }
        Ok(())
    }
}
