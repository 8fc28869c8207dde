use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::constants::GLOBAL_NOPHASE;

/// Lifecycle phase of a test scenario.
///
/// `GlobalNoPhase` is reserved for traffic that cannot be attributed to any test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Setup,
    Testing,
    Cleanup,
    #[serde(rename = "global-nophase")]
    GlobalNoPhase,
}

impl Phase {
    /// Phases that own an indexed artifact directory under the payload root.
    pub const PHASED: [Phase; 3] = [Phase::Setup, Phase::Testing, Phase::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Testing => "testing",
            Self::Cleanup => "cleanup",
            Self::GlobalNoPhase => GLOBAL_NOPHASE,
        }
    }

    pub fn is_phased(&self) -> bool {
        !matches!(self, Self::GlobalNoPhase)
    }

    /// Classifies the `phase` field of test metadata.
    ///
    /// Metadata that names a test always belongs to a phased scenario, so a missing or
    /// unrecognised phase is treated as `Testing`.
    pub fn from_metadata(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Self::Testing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase `{}`", self.0)
    }
}

impl std::error::Error for UnknownPhase {}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "setup" => Ok(Self::Setup),
            "testing" => Ok(Self::Testing),
            "cleanup" => Ok(Self::Cleanup),
            GLOBAL_NOPHASE => Ok(Self::GlobalNoPhase),
            _ => Err(UnknownPhase(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Setup ".parse::<Phase>(), Ok(Phase::Setup));
        assert_eq!("CLEANUP".parse::<Phase>(), Ok(Phase::Cleanup));
        assert!("teardown".parse::<Phase>().is_err());
    }

    #[test]
    fn metadata_without_known_phase_is_testing() {
        assert_eq!(Phase::from_metadata(None), Phase::Testing);
        assert_eq!(Phase::from_metadata(Some("warmup")), Phase::Testing);
        assert_eq!(Phase::from_metadata(Some("setup")), Phase::Setup);
    }

    #[test]
    fn serializes_as_directory_names() {
        assert_eq!(serde_json::to_string(&Phase::Testing).unwrap(), "\"testing\"");
        assert_eq!(serde_json::to_string(&Phase::GlobalNoPhase).unwrap(), "\"global-nophase\"");
        assert!(Phase::PHASED.iter().all(Phase::is_phased));
    }
}
