use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub mod gamification;
pub mod lesson;
pub mod narration;
pub mod progress;
pub mod quiz;

/// Tag attached to every MCP response
pub const MCP_SERVER_NAME: &str = "SkillSprout";

pub const DEFAULT_USER_ID: &str = "default_user";

pub const PREDEFINED_SKILLS: &[&str] = &[
    "Python Programming",
    "Spanish Language",
    "Public Speaking",
    "Data Science",
    "Machine Learning",
    "JavaScript",
    "Project Management",
    "Digital Marketing",
    "Creative Writing",
    "Photography",
];

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            Difficulty::Intermediate | Difficulty::Advanced => Difficulty::Advanced,
        }
    }

    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Advanced => Difficulty::Intermediate,
            Difficulty::Intermediate | Difficulty::Beginner => Difficulty::Beginner,
        }
    }

    pub fn apply(self, recommendation: Recommendation) -> Self {
        match recommendation {
            Recommendation::Increase => self.step_up(),
            Recommendation::Decrease => self.step_down(),
            Recommendation::Hold => self,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("Invalid difficulty: {}", value)),
        }
    }
}

/// Accepts any casing ("Beginner", "ADVANCED").
impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome of the adaptive-difficulty rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Increase,
    Decrease,
    Hold,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Increase => "increase",
            Recommendation::Decrease => "decrease",
            Recommendation::Hold => "hold",
        }
    }
}

/// Why a response was assembled from fallback content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DegradedKind {
    UpstreamUnavailable,
    UpstreamMalformed,
    SynthesisUnavailable,
    SynthesisFailed,
}

impl DegradedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedKind::UpstreamUnavailable => "upstream_unavailable",
            DegradedKind::UpstreamMalformed => "upstream_malformed",
            DegradedKind::SynthesisUnavailable => "synthesis_unavailable",
            DegradedKind::SynthesisFailed => "synthesis_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DegradedNotice {
    pub kind: DegradedKind,
    pub message: String,
}
