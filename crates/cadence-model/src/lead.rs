//! Leads and contacts
//!
//! A lead is a target company in the pipeline; contacts are the people
//! attached to it, at most one of which is flagged primary and used for
//! outreach. Raw ingestion records pass through [`LeadDraft`] exactly
//! once and come out either fully populated or rejected.

use crate::enrichment::EnrichmentCache;
use crate::error::LeadValidationError;
use crate::ids::{ContactId, LeadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Freshly ingested, untouched
    New,
    /// Enrolled in outreach
    Contacted,
    /// Lead responded
    Replied,
    /// Qualified by a rep
    Qualified,
    /// Ruled out
    Disqualified,
}

impl Default for PipelineStage {
    fn default() -> Self {
        PipelineStage::New
    }
}

/// A target company in the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Lead identifier
    pub id: LeadId,
    /// Company name
    pub company: String,
    /// Industry sector
    pub sector: Option<String>,
    /// City
    pub city: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Annual revenue in whole currency units
    pub revenue: Option<u64>,
    /// Headcount
    pub employees: Option<u32>,
    /// Pipeline stage
    pub stage: PipelineStage,
    /// Cached AI-derived artifacts
    pub enrichment: EnrichmentCache,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// A person attached to a lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact identifier
    pub id: ContactId,
    /// Owning lead
    pub lead_id: LeadId,
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Job title
    pub title: Option<String>,
    /// Whether this is the outreach target for the lead
    pub is_primary: bool,
}

impl Contact {
    /// Create new contact
    #[must_use]
    pub fn new(lead_id: LeadId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: ContactId::new(),
            lead_id,
            name: name.into(),
            email: email.into(),
            title: None,
            is_primary: false,
        }
    }

    /// Flag as the lead's outreach target
    #[inline]
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// With job title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Read model: a lead joined with its primary contact, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadWithContact {
    pub lead: Lead,
    pub primary_contact: Option<Contact>,
}

impl LeadWithContact {
    /// Whether the lead can be enrolled in outreach
    #[inline]
    #[must_use]
    pub fn is_contactable(&self) -> bool {
        self.primary_contact.is_some()
    }
}

/// Raw ingestion record; one validation pass produces a [`Lead`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    pub company: Option<String>,
    pub sector: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// e.g. "$1.2M", "3,400,000", "2.5B"
    pub revenue: Option<String>,
    /// e.g. "120", "50-100", "250+"
    pub employees: Option<String>,
}

impl LeadDraft {
    /// Validate and normalize into a fully-populated lead created at `now`.
    ///
    /// Rejects rather than defaulting: a blank company or an unparseable
    /// numeric string fails the whole record.
    pub fn validate_at(self, now: DateTime<Utc>) -> Result<Lead, LeadValidationError> {
        let company = self
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(LeadValidationError::MissingField("company"))?
            .to_string();

        let revenue = self.revenue.as_deref().map(parse_revenue).transpose()?;
        let employees = self.employees.as_deref().map(parse_employee_count).transpose()?;

        Ok(Lead {
            id: LeadId::new(),
            company,
            sector: none_if_blank(self.sector),
            city: none_if_blank(self.city),
            country: none_if_blank(self.country),
            revenue,
            employees,
            stage: PipelineStage::New,
            enrichment: EnrichmentCache::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate and normalize into a lead created now.
    pub fn validate(self) -> Result<Lead, LeadValidationError> {
        self.validate_at(Utc::now())
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a revenue string like "$1.2M", "3.4B", "750K" or "2,000,000".
fn parse_revenue(raw: &str) -> Result<u64, LeadValidationError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(LeadValidationError::BadRevenue(raw.to_string()));
    }

    let (number, multiplier) = match cleaned.chars().last() {
        Some('k' | 'K') => (&cleaned[..cleaned.len() - 1], 1_000_f64),
        Some('m' | 'M') => (&cleaned[..cleaned.len() - 1], 1_000_000_f64),
        Some('b' | 'B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000_f64),
        _ => (cleaned.as_str(), 1_f64),
    };

    let value: f64 = number
        .parse()
        .map_err(|_| LeadValidationError::BadRevenue(raw.to_string()))?;
    if value < 0.0 || !value.is_finite() {
        return Err(LeadValidationError::BadRevenue(raw.to_string()));
    }
    Ok((value * multiplier).round() as u64)
}

/// Parse an employee-count string like "120", "50-100" or "250+".
///
/// Ranges resolve to their midpoint, "N+" to N.
fn parse_employee_count(raw: &str) -> Result<u32, LeadValidationError> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(LeadValidationError::BadEmployeeCount(raw.to_string()));
    }

    if let Some((low, high)) = cleaned.split_once('-') {
        let low: u32 = low
            .trim()
            .parse()
            .map_err(|_| LeadValidationError::BadEmployeeCount(raw.to_string()))?;
        let high: u32 = high
            .trim()
            .parse()
            .map_err(|_| LeadValidationError::BadEmployeeCount(raw.to_string()))?;
        let midpoint = (u64::from(low) + u64::from(high)) / 2;
        return Ok(midpoint as u32);
    }

    let stripped = cleaned.strip_suffix('+').unwrap_or(&cleaned);
    stripped
        .trim()
        .parse()
        .map_err(|_| LeadValidationError::BadEmployeeCount(raw.to_string()))
}
