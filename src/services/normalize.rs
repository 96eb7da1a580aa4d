//! Normalization of raw provider output into a [`CandidateProfile`].
//!
//! Everything here is pure: no I/O and no clock. The caller supplies the
//! current year so that ongoing positions resolve deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::profile::{CandidateProfile, Seniority};

/// Built-in skill synonyms: lexical variant → canonical token.
const SKILL_SYNONYMS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("javascript", "javascript"),
    ("node", "node.js"),
    ("nodejs", "node.js"),
    ("node.js", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("react", "react"),
    ("html5", "html"),
    ("css3", "css"),
    ("postgres", "postgresql"),
    ("pg", "postgresql"),
    ("postgresql", "postgresql"),
    ("ts", "typescript"),
    ("golang", "go"),
    ("k8s", "kubernetes"),
];

/// End-date values that mean the position is still held.
const ONGOING_MARKERS: &[&str] = &["present", "current", "now", "ongoing"];

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}").expect("year pattern is valid"));

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("Raw parse result is not a JSON object")]
    NotAnObject,
}

/// Lookup table collapsing skill variants to one canonical token.
#[derive(Debug, Clone)]
pub struct SkillSynonyms {
    table: HashMap<String, String>,
}

impl Default for SkillSynonyms {
    fn default() -> Self {
        Self {
            table: SKILL_SYNONYMS
                .iter()
                .map(|(variant, canonical)| (variant.to_string(), canonical.to_string()))
                .collect(),
        }
    }
}

impl SkillSynonyms {
    /// Adds or replaces a synonym entry. Both sides are lower-cased.
    pub fn with_synonym(mut self, variant: &str, canonical: &str) -> Self {
        self.table
            .insert(variant.trim().to_lowercase(), canonical.trim().to_lowercase());
        self
    }

    /// Canonical form of an already lower-cased skill; unknown skills pass through.
    pub fn canonicalize(&self, skill: &str) -> String {
        self.table
            .get(skill)
            .cloned()
            .unwrap_or_else(|| skill.to_string())
    }
}

/// Normalizes with the built-in synonym table.
pub fn normalize(raw: &Value, current_year: i32) -> Result<CandidateProfile, NormalizeError> {
    normalize_with(raw, &SkillSynonyms::default(), current_year)
}

pub fn normalize_with(
    raw: &Value,
    synonyms: &SkillSynonyms,
    current_year: i32,
) -> Result<CandidateProfile, NormalizeError> {
    let resume = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let positions: &[Value] = resume
        .get("positions")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    let qualifications: &[Value] = resume
        .get("education_qualifications")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let experience_years = experience_years(positions, current_year);

    Ok(CandidateProfile {
        skills: canonical_skills(positions, synonyms),
        roles: roles(positions),
        education: education(qualifications),
        experience_years,
        seniority: Seniority::from_experience_years(experience_years),
    })
}

fn canonical_skills(positions: &[Value], synonyms: &SkillSynonyms) -> Vec<String> {
    let lowered = positions
        .iter()
        .filter_map(|p| p.get("skills").and_then(|s| s.as_array()))
        .flatten()
        .filter_map(|s| s.as_str())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let distinct = dedup_in_order(lowered);
    dedup_in_order(distinct.iter().map(|s| synonyms.canonicalize(s)))
}

fn roles(positions: &[Value]) -> Vec<String> {
    dedup_in_order(
        positions
            .iter()
            .filter_map(|p| p.get("position_name").and_then(|v| v.as_str()))
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty()),
    )
}

fn education(qualifications: &[Value]) -> Vec<String> {
    qualifications
        .iter()
        .map(|q| {
            let degree = q.get("degree_type").and_then(|v| v.as_str()).unwrap_or("");
            let subjects = q
                .get("specialization_subjects")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            format!("{degree} {subjects}").trim().to_lowercase()
        })
        .filter(|e| !e.is_empty())
        .collect()
}

/// Sums per-position spans. Overlapping positions are counted twice.
fn experience_years(positions: &[Value], current_year: i32) -> u32 {
    positions
        .iter()
        .filter_map(|p| {
            let start = p.get("start_date").and_then(year_of)?;
            let end = match p.get("end_date") {
                None | Some(Value::Null) => current_year,
                Some(value) if is_ongoing(value) => current_year,
                Some(value) => year_of(value)?,
            };
            let span = end.checked_sub(start).filter(|years| *years >= 0)?;
            u32::try_from(span).ok()
        })
        .fold(0u32, u32::saturating_add)
}

fn is_ongoing(value: &Value) -> bool {
    value.as_str().is_some_and(|s| {
        let s = s.trim().to_lowercase();
        s.is_empty() || ONGOING_MARKERS.contains(&s.as_str())
    })
}

/// Numeric years accepted as-is; matches the range of `YEAR_PATTERN`.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i64> = 1900..=2099;

/// Year of a date value: a bare number in 1900..=2099, or the first 19xx/20xx run in a string.
fn year_of(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|y| PLAUSIBLE_YEARS.contains(y))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => YEAR_PATTERN
            .find(s)
            .and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

fn dedup_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
