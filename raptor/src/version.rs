use crate::error::RaptorError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A Raptor release number.
///
/// ```
/// use rio_raptor::Version;
///
/// let version: Version = "2.0.15".parse()?;
/// assert_eq!((version.major, version.minor, version.release), (2, 0, 15));
/// # Result::<_, rio_raptor::RaptorError>::Ok(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub release: u32,
}

impl FromStr for Version {
    type Err = RaptorError;

    fn from_str(s: &str) -> Result<Self, RaptorError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(\d+)\.(\d+)\.(\d+)").expect("the version pattern is valid")
        });
        let invalid = || RaptorError::io_other(format!("unexpected Raptor version '{}'", s));
        let captures = pattern.captures(s.trim()).ok_or_else(invalid)?;
        let number = |i: usize| captures[i].parse::<u32>().map_err(|_| invalid());
        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            release: number(3)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}
