//! Enrichment ports used by the `AI_*` formula functions.
//!
//! The evaluator never talks to the network directly. Networked functions go
//! through an [`EnrichmentService`], which combines an [`EnrichmentCache`]
//! with an [`EnrichmentProvider`] and absorbs provider failures into
//! documented fallback values.

use serde::{Deserialize, Serialize};
use std::fmt;

mod cache;
mod provider;
mod service;

pub use cache::*;
pub use provider::*;
pub use service::*;

/// Kind of enrichment requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentType {
    CompanyInfo,
    EmailCompletion,
    PhoneCompletion,
    LeadScore,
}

impl EnrichmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentType::CompanyInfo => "company_info",
            EnrichmentType::EmailCompletion => "email_completion",
            EnrichmentType::PhoneCompletion => "phone_completion",
            EnrichmentType::LeadScore => "lead_score",
        }
    }

    /// Path appended to the provider base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            EnrichmentType::CompanyInfo => "company",
            EnrichmentType::EmailCompletion => "email",
            EnrichmentType::PhoneCompletion => "phone",
            EnrichmentType::LeadScore => "lead-score",
        }
    }
}

impl fmt::Display for EnrichmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
