use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Internal meaning of a provider job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderOutcome {
    Pending,
    Done,
    Failed,
}

/// Default vocabulary. ApyHub reports `success` rather than `completed`.
const DEFAULT_VOCABULARY: &[(&str, ProviderOutcome)] = &[
    ("pending", ProviderOutcome::Pending),
    ("queued", ProviderOutcome::Pending),
    ("processing", ProviderOutcome::Pending),
    ("in_progress", ProviderOutcome::Pending),
    ("running", ProviderOutcome::Pending),
    ("success", ProviderOutcome::Done),
    ("succeeded", ProviderOutcome::Done),
    ("completed", ProviderOutcome::Done),
    ("done", ProviderOutcome::Done),
    ("finished", ProviderOutcome::Done),
    ("failed", ProviderOutcome::Failed),
    ("failure", ProviderOutcome::Failed),
    ("error", ProviderOutcome::Failed),
    ("cancelled", ProviderOutcome::Failed),
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StatusMapError {
    #[error("Provider status '{0}' has no mapping")]
    Unmapped(String),

    #[error("Invalid status mapping entry '{0}' (expected value=pending|done|failed)")]
    InvalidEntry(String),
}

/// Data table translating provider status strings into [`ProviderOutcome`].
///
/// Lookups trim and lower-case the provider value. Anything not in the table
/// is an error rather than a silent default.
#[derive(Debug, Clone)]
pub struct StatusMapper {
    table: HashMap<String, ProviderOutcome>,
}

impl Default for StatusMapper {
    fn default() -> Self {
        Self::from_entries(DEFAULT_VOCABULARY.iter().copied())
    }
}

impl StatusMapper {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, ProviderOutcome)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(value, outcome)| (key(value), outcome))
                .collect(),
        }
    }

    /// Adds or replaces one entry.
    pub fn with_entry(mut self, provider_value: &str, outcome: ProviderOutcome) -> Self {
        self.table.insert(key(provider_value), outcome);
        self
    }

    /// Applies overrides written as `value=outcome,value=outcome`.
    pub fn with_overrides(mut self, spec: &str) -> Result<Self, StatusMapError> {
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (value, outcome) = entry
                .split_once('=')
                .ok_or_else(|| StatusMapError::InvalidEntry(entry.to_string()))?;
            let outcome = ProviderOutcome::from_str(outcome.trim())
                .map_err(|_| StatusMapError::InvalidEntry(entry.to_string()))?;
            if value.trim().is_empty() {
                return Err(StatusMapError::InvalidEntry(entry.to_string()));
            }
            self.table.insert(key(value), outcome);
        }
        Ok(self)
    }

    pub fn map(&self, provider_value: &str) -> Result<ProviderOutcome, StatusMapError> {
        self.table
            .get(&key(provider_value))
            .copied()
            .ok_or_else(|| StatusMapError::Unmapped(provider_value.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, ProviderOutcome)> {
        self.table.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

fn key(value: &str) -> String {
    value.trim().to_lowercase()
}
