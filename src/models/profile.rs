use serde::{Deserialize, Serialize};
use strum::Display;

/// Seniority band derived from total experience years.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Seniority {
    #[default]
    Junior,
    Mid,
    Senior,
}

impl Seniority {
    pub fn from_experience_years(years: u32) -> Self {
        match years {
            0..=1 => Seniority::Junior,
            2..=4 => Seniority::Mid,
            _ => Seniority::Senior,
        }
    }
}

/// Provider-independent candidate profile, cached in `normalized_profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateProfile {
    pub skills: Vec<String>,
    pub roles: Vec<String>,
    pub education: Vec<String>,
    pub experience_years: u32,
    pub seniority: Seniority,
}

/// Where a returned profile came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Cached,
    Generated,
}

/// Answer of the profile read path. Callers always see one of these.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProfileOutcome {
    NotStarted,
    Processing,
    Failed,
    Completed {
        source: ProfileSource,
        profile: CandidateProfile,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seniority_thresholds() {
        assert_eq!(Seniority::from_experience_years(0), Seniority::Junior);
        assert_eq!(Seniority::from_experience_years(1), Seniority::Junior);
        assert_eq!(Seniority::from_experience_years(2), Seniority::Mid);
        assert_eq!(Seniority::from_experience_years(4), Seniority::Mid);
        assert_eq!(Seniority::from_experience_years(5), Seniority::Senior);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let pending = serde_json::to_value(ProfileOutcome::Processing).unwrap();
        assert_eq!(pending, serde_json::json!({ "status": "processing" }));

        let ready = serde_json::to_value(ProfileOutcome::Completed {
            source: ProfileSource::Cached,
            profile: CandidateProfile::default(),
        })
        .unwrap();
        assert_eq!(ready["status"], "completed");
        assert_eq!(ready["source"], "cached");
        assert_eq!(ready["profile"]["seniority"], "junior");
    }
}
